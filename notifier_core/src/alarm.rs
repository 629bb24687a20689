/**
 * Destination health alarms.
 *
 * The engine raises `notification_error` when a destination could not be
 * reached and calls `notification_ok` after every successful delivery so a
 * previously raised alarm can be released. Where the alarms end up (log,
 * database, dashboard) is up to the `AlarmSink` implementation.
 *
 * `AlarmManager` is the in-process implementation: it remembers which
 * destinations are in alarm, logs each raise/release transition once, and
 * counts every signal so operators (and tests) can see how often a
 * destination failed.
 */
use std::collections::HashMap;
use std::sync::Mutex;

/// Receiver of destination health signals.
pub trait AlarmSink: Send + Sync {
    /// A delivery to `destination` failed at the transport level.
    fn notification_error(&self, destination: &str, details: &str);

    /// A delivery to `destination` succeeded.
    fn notification_ok(&self, destination: &str);
}

// ---------------------------------------------------------------------------
// AlarmManager
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct AlarmState {
    active: bool,
    raised: u64,
    last_details: String,
}

/**
 * In-memory alarm bookkeeping, safe to share between sending threads.
 */
#[derive(Debug, Default)]
pub struct AlarmManager {
    alarms: Mutex<HashMap<String, AlarmState>>,
}

impl AlarmManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while `destination` has an unreleased alarm.
    pub fn is_active(&self, destination: &str) -> bool {
        self.with_state(destination, |state| state.active)
            .unwrap_or(false)
    }

    /// Total `notification_error` signals received for `destination`.
    pub fn raised_count(&self, destination: &str) -> u64 {
        self.with_state(destination, |state| state.raised)
            .unwrap_or(0)
    }

    pub fn last_details(&self, destination: &str) -> Option<String> {
        self.with_state(destination, |state| state.last_details.clone())
    }

    /// Destinations currently in alarm, sorted.
    pub fn active_destinations(&self) -> Vec<String> {
        let Ok(alarms) = self.alarms.lock() else {
            return Vec::new();
        };
        let mut active: Vec<String> = alarms
            .iter()
            .filter(|(_, state)| state.active)
            .map(|(destination, _)| destination.clone())
            .collect();
        active.sort();
        active
    }

    fn with_state<R>(&self, destination: &str, f: impl FnOnce(&AlarmState) -> R) -> Option<R> {
        let alarms = self.alarms.lock().ok()?;
        alarms.get(destination).map(f)
    }
}

impl AlarmSink for AlarmManager {
    fn notification_error(&self, destination: &str, details: &str) {
        let Ok(mut alarms) = self.alarms.lock() else {
            return;
        };
        let state = alarms.entry(destination.to_string()).or_default();
        state.raised += 1;
        state.last_details = details.to_string();

        if state.active {
            tracing::debug!(destination, details, "Repeated notification error");
        } else {
            state.active = true;
            tracing::warn!(destination, details, "Raising alarm NotificationError");
        }
    }

    fn notification_ok(&self, destination: &str) {
        let Ok(mut alarms) = self.alarms.lock() else {
            return;
        };
        if let Some(state) = alarms.get_mut(destination) {
            if state.active {
                state.active = false;
                tracing::info!(destination, "Releasing alarm NotificationError");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_and_release() {
        let alarms = AlarmManager::new();
        let url = "http://10.0.0.1:1026/notify";

        alarms.notification_error(url, "(connection refused)");
        alarms.notification_error(url, "(timed out)");
        assert!(alarms.is_active(url));
        assert_eq!(alarms.raised_count(url), 2);
        assert_eq!(alarms.last_details(url).as_deref(), Some("(timed out)"));
        assert_eq!(alarms.active_destinations(), vec![url.to_string()]);

        alarms.notification_ok(url);
        assert!(!alarms.is_active(url));
        assert_eq!(alarms.raised_count(url), 2);
        assert!(alarms.active_destinations().is_empty());
    }

    #[test]
    fn test_ok_for_unknown_destination_is_noop() {
        let alarms = AlarmManager::new();
        alarms.notification_ok("http://never-failed/");
        assert!(!alarms.is_active("http://never-failed/"));
        assert_eq!(alarms.raised_count("http://never-failed/"), 0);
    }
}
