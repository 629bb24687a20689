/**
 * The delivery pipeline.
 *
 * One call to `Notifier::send` is one delivery attempt to one destination:
 *
 * ```text
 *  validate ─► relay ─► acquire handle ─► compose headers ─► size budget
 *     │                     │                                   │
 *   -1..-6                 -8                                   -7
 *                                                               │
 *                                  report ◄─ perform (blocking) ◄┘
 *                              (0 / -9, alarm)
 * ```
 *
 * Validation runs before anything is allocated. The pooled handle is held
 * by a guard from acquisition on, so it goes back to the pool on every exit
 * path: oversized payload, transport failure (where it is discarded rather
 * than reused) and success alike.
 */
use std::sync::Arc;

use crate::alarm::AlarmSink;
use crate::config::EngineConfig;
use crate::error::{Result, SendError};
use crate::protocol::headers::compose_headers;
use crate::protocol::request::NotificationRequest;
use crate::relay::Route;
use crate::transport::{ConnectionPool, HttpCall, HttpTransport, Transport};
use crate::validate::validate;

/**
 * Notification sender.
 *
 * Share it between threads behind an `Arc`; every send borrows its own
 * pooled handle, so concurrent sends never step on each other.
 */
pub struct Notifier<T: Transport = HttpTransport> {
    config: Arc<EngineConfig>,
    transport: T,
    pool: ConnectionPool<T::Handle>,
    alarms: Arc<dyn AlarmSink>,
}

impl Notifier<HttpTransport> {
    /// Sender over the default ureq transport.
    pub fn new(config: Arc<EngineConfig>, alarms: Arc<dyn AlarmSink>) -> Self {
        Self::with_transport(config, HttpTransport::new(), alarms)
    }
}

impl<T: Transport> Notifier<T> {
    pub fn with_transport(config: Arc<EngineConfig>, transport: T, alarms: Arc<dyn AlarmSink>) -> Self {
        let pool = ConnectionPool::new(config.max_idle_per_destination);
        Self {
            config,
            transport,
            pool,
            alarms,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pool(&self) -> &ConnectionPool<T::Handle> {
        &self.pool
    }

    /**
     * Sends one notification.
     *
     * On success returns the raw response bytes (empty when the request
     * does not wait for the response). Every failure maps to a `SendError`
     * whose `code()` is the unified result code; transport-level failures
     * additionally raise the destination's alarm, and a success releases it.
     */
    pub fn send(&self, request: &NotificationRequest) -> Result<Vec<u8>> {
        let span = tracing::info_span!(
            "notification",
            destination = %request.authority(),
            verb = %request.verb,
        );
        let _entered = span.enter();

        if let Err(e) = validate(request) {
            tracing::error!(code = e.code(), error = %e, "Notification rejected");
            return Err(e);
        }

        let route = Route::resolve(request, self.config.active_relay());
        let url = route.url(&request.resource);

        let result = self.deliver(request, &route, &url);
        self.report(&url, &result);
        result
    }

    fn deliver(&self, request: &NotificationRequest, route: &Route, url: &str) -> Result<Vec<u8>> {
        let mut handle = self
            .pool
            .acquire(&route.authority(), |destination| self.transport.open_handle(destination))
            .map_err(|e| SendError::TransportInitFailed(e.to_string()))?;

        let headers = compose_headers(request, route, self.transport.version_token());

        let size = headers.outgoing_size(request.body.len());
        if size > self.config.max_message_size {
            return Err(SendError::PayloadTooLarge {
                size,
                max: self.config.max_message_size,
            });
        }

        let call = HttpCall {
            verb: &request.verb,
            url,
            headers: &headers,
            body: &request.body,
            timeout: request.timeout.resolve(self.config.default_timeout),
            capture_response: request.wait_for_response,
            max_response_size: self.config.max_response_size,
        };

        tracing::info!(url, bytes = size, relayed = route.relayed, "Sending notification");

        match self.transport.perform(&mut *handle, &call) {
            Ok(raw) => {
                tracing::info!(url, "Notification successfully sent");
                Ok(raw)
            }
            Err(e) => {
                handle.discard();
                Err(SendError::Transport(e.to_string()))
            }
        }
    }

    /**
     * Turns the outcome into alarm signals. Only -8 and -9 say anything
     * about the destination; size failures are logged as caller errors.
     */
    fn report(&self, url: &str, result: &Result<Vec<u8>>) {
        match result {
            Ok(_) => self.alarms.notification_ok(url),
            Err(e) if e.raises_alarm() => {
                self.alarms.notification_error(url, &format!("({e})"));
            }
            Err(e) => {
                tracing::error!(url, code = e.code(), error = %e, "Notification not sent");
            }
        }
    }
}
