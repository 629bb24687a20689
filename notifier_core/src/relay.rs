/*!
 * Relay redirection.
 *
 * A relay is an intermediary that accepts notifications on behalf of the
 * final subscriber. When a request asks for it and the process has a relay
 * configured, the effective destination becomes the relay and the original
 * destination travels in `X-relayer-host` (plus `X-relayer-protocol` for
 * secure subscribers). Without a configured relay the flag is ignored.
 *
 * Resolution never fails; it only decides where the bytes go.
 */
use crate::config::RelayConfig;
use crate::protocol::constants::{RELAYER_HOST, RELAYER_PROTOCOL, SECURE_SCHEME};
use crate::protocol::request::{authority, NotificationRequest};

/**
 * The effective destination of one send.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub host: String,
    pub port: u16,

    /// Whether the URL uses `https`. Always false when relayed: the relay
    /// is reached over plain HTTP and told the protocol via a header.
    pub secure: bool,
    pub relayed: bool,

    /// Forwarding headers to emit ahead of the standard ones.
    pub relay_headers: Vec<(&'static str, String)>,
}

impl Route {
    /// Straight to the subscriber.
    pub fn direct(request: &NotificationRequest) -> Self {
        Self {
            host: request.host.clone(),
            port: request.port,
            secure: request.is_secure(),
            relayed: false,
            relay_headers: Vec::new(),
        }
    }

    /**
     * Picks the relay when `request.use_relay` is set and `relay` is
     * configured; otherwise behaves exactly like `Route::direct`.
     */
    pub fn resolve(request: &NotificationRequest, relay: Option<&RelayConfig>) -> Self {
        let relay = match relay {
            Some(relay) if request.use_relay && relay.is_configured() => relay,
            _ => return Self::direct(request),
        };

        let mut relay_headers = vec![(RELAYER_HOST, request.authority())];
        if request.is_secure() {
            relay_headers.push((RELAYER_PROTOCOL, SECURE_SCHEME.to_string()));
        }

        Self {
            host: relay.host.clone(),
            port: relay.port,
            secure: false,
            relayed: true,
            relay_headers,
        }
    }

    /// `host:port` of the effective destination; also the pool key.
    pub fn authority(&self) -> String {
        authority(&self.host, self.port)
    }

    /**
     * Target URL for `resource`. A separating slash is inserted only when
     * the resource does not already start with one.
     */
    pub fn url(&self, resource: &str) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        let slash = if resource.starts_with('/') { "" } else { "/" };
        format!("{scheme}://{}{slash}{resource}", self.authority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay() -> RelayConfig {
        RelayConfig {
            host: "relay.local".into(),
            port: 9000,
        }
    }

    fn request() -> NotificationRequest {
        let mut request = NotificationRequest::new("10.0.0.1", 1026, "POST", "/notify");
        request.use_relay = true;
        request
    }

    #[test]
    fn test_relay_rewrites_destination() {
        let route = Route::resolve(&request(), Some(&relay()));

        assert!(route.relayed);
        assert_eq!(route.authority(), "relay.local:9000");
        assert_eq!(
            route.relay_headers,
            vec![(RELAYER_HOST, "10.0.0.1:1026".to_string())]
        );
        assert_eq!(route.url("/notify"), "http://relay.local:9000/notify");
    }

    #[test]
    fn test_relay_marks_secure_subscribers() {
        let mut request = request();
        request.scheme = "https:".into();
        let route = Route::resolve(&request, Some(&relay()));

        assert!(!route.secure);
        assert_eq!(route.relay_headers[1], (RELAYER_PROTOCOL, "https".to_string()));
    }

    /**
     * An unconfigured relay (absent, empty host or zero port) forces the
     * flag off: the route equals the direct one.
     */
    #[test]
    fn test_unconfigured_relay_is_ignored() {
        let request = request();
        let direct = Route::direct(&request);

        assert_eq!(Route::resolve(&request, None), direct);
        let empty_host = RelayConfig { host: String::new(), port: 9000 };
        assert_eq!(Route::resolve(&request, Some(&empty_host)), direct);
        let zero_port = RelayConfig { host: "relay.local".into(), port: 0 };
        assert_eq!(Route::resolve(&request, Some(&zero_port)), direct);
    }

    #[test]
    fn test_relay_flag_off_keeps_destination() {
        let mut request = request();
        request.use_relay = false;
        assert_eq!(Route::resolve(&request, Some(&relay())), Route::direct(&request));
    }

    #[test]
    fn test_url_composition() {
        let mut request = NotificationRequest::new("::1", 8080, "POST", "notify");
        let route = Route::direct(&request);
        assert_eq!(route.url("notify"), "http://[::1]:8080/notify");
        assert_eq!(route.url("/notify"), "http://[::1]:8080/notify");

        request.scheme = "https".into();
        assert_eq!(Route::direct(&request).url("/x"), "https://[::1]:8080/x");
    }
}
