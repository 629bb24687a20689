/**
 * The input of one delivery attempt.
 *
 * A `NotificationRequest` is built by the dispatch layer for exactly one
 * send and never mutated by the engine: relay rewriting and header
 * composition work on derived values, so the caller's request stays intact
 * for logging or for a later attempt of its own.
 */
use std::collections::BTreeMap;
use std::net::Ipv6Addr;
use std::time::Duration;

use super::constants::SECURE_SCHEME;

// ---------------------------------------------------------------------------
// Timeout
// ---------------------------------------------------------------------------

/**
 * Per-call timeout selection.
 *
 * `Default` defers to the process-wide value in `EngineConfig`,
 * `Disabled` removes any bound, and `After` pins an explicit budget.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    #[default]
    Default,
    Disabled,
    After(Duration),
}

impl Timeout {
    /**
     * Maps the millisecond convention used by subscription records:
     * negative means "use the default", zero means "no timeout".
     */
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            ms if ms < 0 => Timeout::Default,
            0 => Timeout::Disabled,
            ms => Timeout::After(Duration::from_millis(ms.unsigned_abs())),
        }
    }

    /// Resolves against the process-wide default. `None` means unbounded.
    pub fn resolve(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            Timeout::Default => default,
            Timeout::Disabled => None,
            Timeout::After(d) => Some(d),
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationRequest
// ---------------------------------------------------------------------------

/**
 * Everything needed to deliver one notification to one subscriber.
 *
 * Empty strings mean "not set" for the optional textual fields (tenant,
 * service-path, auth token, accept, attribute format), matching how
 * subscription records store them.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Destination host name or IP literal (IPv6 without brackets).
    pub host: String,
    pub port: u16,

    /// Scheme token of the subscriber URL, e.g. `"http"` or `"https:"`.
    pub scheme: String,
    pub verb: String,

    /// Tenant, sent as `fiware-service`.
    pub tenant: String,
    pub service_path: String,
    pub auth_token: String,

    /// Request path on the destination; a leading `/` is optional.
    pub resource: String,
    pub content_type: String,
    pub body: Vec<u8>,
    pub correlator: String,

    /// Attribute-format hint, e.g. `"normalized"` or `"keyValues"`.
    pub attrs_format: String,

    /// Accept-format override; empty means `application/json`.
    pub accept: String,

    /// Route through the configured relay, if one exists.
    pub use_relay: bool,

    /// When false, the send completes as soon as the response head arrives.
    pub wait_for_response: bool,

    /// Subscriber-declared headers. Keys keep the caller's spelling; they
    /// are matched case-insensitively against the engine's defaults.
    pub extra_headers: BTreeMap<String, String>,
    pub timeout: Timeout,
}

impl NotificationRequest {
    /**
     * Creates a plain-HTTP request with no body, waiting for the response
     * and using the default timeout.
     */
    pub fn new(
        host: impl Into<String>,
        port: u16,
        verb: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: "http".into(),
            verb: verb.into(),
            resource: resource.into(),
            wait_for_response: true,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = content_type.into();
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// True when the scheme token names a secure transport.
    pub fn is_secure(&self) -> bool {
        self.scheme
            .trim_end_matches(':')
            .eq_ignore_ascii_case(SECURE_SCHEME)
    }

    /// `host:port` of the original destination, IPv6 literals bracketed.
    pub fn authority(&self) -> String {
        authority(&self.host, self.port)
    }
}

/**
 * Formats `host:port`, bracketing the host when it is an IPv6 literal so
 * the result is usable both in a URL and in a `Host` header.
 */
pub fn authority(host: &str, port: u16) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
