/**
 * Header model and composition.
 *
 * The composer works in two steps:
 * 1. Build the ordered list of engine defaults for a request
 *    (`default_headers`).
 * 2. Apply the subscriber's extra headers on top (`apply_overrides`): a
 *    default whose name matches an extra header case-insensitively is
 *    replaced by the caller's name and value, and every extra header not
 *    consumed that way is appended afterwards.
 *
 * Header names are compared through `HeaderKey`, which keeps the original
 * spelling for the wire but hashes and compares ASCII-case-insensitively.
 */
use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};

use super::constants::*;
use super::request::NotificationRequest;
use crate::relay::Route;

// ---------------------------------------------------------------------------
// HeaderKey
// ---------------------------------------------------------------------------

/// A header name that compares and hashes case-insensitively.
#[derive(Debug, Clone)]
pub struct HeaderKey(String);

impl HeaderKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for HeaderKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for HeaderKey {}

impl Hash for HeaderKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

// ---------------------------------------------------------------------------
// HeaderSet
// ---------------------------------------------------------------------------

/**
 * Ordered, duplicate-free (case-insensitively) list of outgoing headers.
 *
 * Alongside the entries it tracks:
 * - the byte size of every emitted `"Name: Value"` line, used by the size
 *   budget check;
 * - which extra-header names were consumed as overrides of a default, so
 *   they are not appended a second time.
 */
#[derive(Debug, Clone, Default)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
    names: HashSet<HeaderKey>,
    consumed: HashSet<HeaderKey>,
    header_bytes: usize,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /**
     * Emits a standard header. If `overrides` holds a case-insensitive match
     * for `name`, the caller's spelling and value are used instead and the
     * override is marked consumed.
     */
    pub fn add_default(
        &mut self,
        name: &str,
        value: impl Into<String>,
        overrides: &BTreeMap<String, String>,
    ) {
        match overrides.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((caller_name, caller_value)) => {
                self.consumed.insert(HeaderKey::new(caller_name.as_str()));
                self.push(caller_name.clone(), caller_value.clone());
            }
            None => {
                self.push(name.to_string(), value.into());
            }
        }
    }

    /**
     * Appends every override that did not replace a default. Names already
     * present (in any letter case) are skipped.
     */
    pub fn append_unconsumed(&mut self, overrides: &BTreeMap<String, String>) {
        for (name, value) in overrides {
            if self.consumed.contains(&HeaderKey::new(name.as_str())) {
                continue;
            }
            self.push(name.clone(), value.clone());
        }
    }

    /// Returns false (and emits nothing) if the name is already present.
    fn push(&mut self, name: String, value: String) -> bool {
        if !self.names.insert(HeaderKey::new(name.as_str())) {
            return false;
        }
        self.header_bytes += line_len(&name, &value);
        self.entries.push((name, value));
        true
    }

    /// Value of the header matching `name` case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&HeaderKey::new(name))
    }

    /// Number of entries whose name matches `name` case-insensitively.
    pub fn count(&self, name: &str) -> usize {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the lengths of all `"Name: Value"` lines.
    pub fn header_bytes(&self) -> usize {
        self.header_bytes
    }

    /// Header bytes plus `body_len`: the figure checked against the budget.
    pub fn outgoing_size(&self, body_len: usize) -> usize {
        self.header_bytes + body_len
    }
}

fn line_len(name: &str, value: &str) -> usize {
    name.len() + ": ".len() + value.len()
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/**
 * Applies `overrides` to an ordered list of defaults.
 *
 * This is the whole precedence rule in one place: defaults keep their
 * position, overrides win on a case-insensitive name match, and leftover
 * overrides follow in map order.
 */
pub fn apply_overrides(
    defaults: &[(&str, String)],
    overrides: &BTreeMap<String, String>,
) -> HeaderSet {
    let mut set = HeaderSet::new();
    for (name, value) in defaults {
        set.add_default(name, value.clone(), overrides);
    }
    set.append_unconsumed(overrides);
    set
}

/**
 * Builds the engine's default headers for `request`, in wire order.
 *
 * `route` supplies the effective destination (used for `Host`) and any relay
 * forwarding headers, which lead the list. `transport_token` is the
 * transport library's version token for `User-Agent`.
 */
pub fn default_headers(
    request: &NotificationRequest,
    route: &Route,
    transport_token: &str,
) -> Vec<(&'static str, String)> {
    let mut defaults: Vec<(&'static str, String)> = route.relay_headers.clone();

    defaults.push((USER_AGENT, format!("{PRODUCT_TOKEN} {transport_token}")));
    defaults.push((HOST, route.authority()));

    if !request.tenant.is_empty() {
        defaults.push((FIWARE_SERVICE, request.tenant.clone()));
    }
    if !request.service_path.is_empty() {
        defaults.push((FIWARE_SERVICE_PATH, request.service_path.clone()));
    }
    if !request.auth_token.is_empty() {
        defaults.push((X_AUTH_TOKEN, request.auth_token.clone()));
    }

    let accept = if request.accept.is_empty() {
        DEFAULT_ACCEPT
    } else {
        request.accept.as_str()
    };
    defaults.push((ACCEPT, accept.to_string()));

    /* An empty Expect keeps the transport from probing with 100-continue */
    defaults.push((EXPECT, String::new()));

    defaults.push((CONTENT_LENGTH, request.body.len().to_string()));
    defaults.push((CONTENT_TYPE, content_type_with_charset(&request.content_type)));
    defaults.push((FIWARE_CORRELATOR, request.correlator.clone()));

    if !request.attrs_format.is_empty()
        && !DEFAULT_ATTRS_FORMATS.contains(&request.attrs_format.as_str())
    {
        defaults.push((ATTRS_FORMAT, request.attrs_format.clone()));
    }

    defaults
}

/// Full header composition for one send.
pub fn compose_headers(
    request: &NotificationRequest,
    route: &Route,
    transport_token: &str,
) -> HeaderSet {
    let defaults = default_headers(request, route, transport_token);
    let headers = apply_overrides(&defaults, &request.extra_headers);

    for (name, value) in headers.iter() {
        tracing::debug!(header = name, value, "Composed notification header");
    }

    headers
}

/// Appends `; charset=utf-8` to exactly `application/json` and `text/plain`.
pub fn content_type_with_charset(content_type: &str) -> String {
    if CHARSET_CONTENT_TYPES.contains(&content_type) {
        format!("{content_type}{CHARSET_SUFFIX}")
    } else {
        content_type.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn direct(request: &NotificationRequest) -> Route {
        Route::direct(request)
    }

    #[test]
    fn test_header_key_ignores_case() {
        let mut set = HashSet::new();
        set.insert(HeaderKey::new("Content-Type"));
        assert!(set.contains(&HeaderKey::new("content-type")));
        assert!(set.contains(&HeaderKey::new("CONTENT-TYPE")));
        assert!(!set.contains(&HeaderKey::new("Content-Length")));
    }

    /**
     * A lowercase `accept` override replaces the default: exactly one
     * Accept header, carrying the caller's value and spelling.
     */
    #[test]
    fn test_override_is_case_insensitive() {
        let request = NotificationRequest::new("10.0.0.1", 1026, "POST", "/notify")
            .with_header("accept", "text/plain");
        let headers = compose_headers(&request, &direct(&request), "ureq/3");

        assert_eq!(headers.count("Accept"), 1);
        assert_eq!(headers.get("ACCEPT"), Some("text/plain"));
        assert!(headers.names().contains(&"accept"));
        assert!(!headers.names().contains(&"Accept"));
    }

    #[test]
    fn test_single_computed_host_header() {
        let request = NotificationRequest::new("10.0.0.1", 1026, "POST", "/notify");
        let headers = compose_headers(&request, &direct(&request), "ureq/3");

        assert_eq!(headers.count("host"), 1);
        assert_eq!(headers.get("Host"), Some("10.0.0.1:1026"));
    }

    #[test]
    fn test_standard_order_and_optional_headers() {
        let mut request = NotificationRequest::new("h", 80, "POST", "/n")
            .with_body("application/json", b"{}".to_vec());
        request.tenant = "smartcity".into();
        request.auth_token = "tok".into();
        request.correlator = "corr-1".into();
        request.attrs_format = "keyValues".into();

        let headers = compose_headers(&request, &direct(&request), "ureq/3");
        assert_eq!(
            headers.names(),
            vec![
                "User-Agent",
                "Host",
                "fiware-service",
                "X-Auth-Token",
                "Accept",
                "Expect",
                "Content-length",
                "Content-type",
                "Fiware-Correlator",
                "Ngsiv2-AttrsFormat",
            ]
        );
        assert_eq!(headers.get("Expect"), Some(""));
        assert_eq!(headers.get("Content-length"), Some("2"));
        assert_eq!(headers.get("Content-type"), Some("application/json; charset=utf-8"));
        assert_eq!(headers.get("Accept"), Some("application/json"));
        assert!(!headers.contains("Fiware-ServicePath"));
    }

    #[test]
    fn test_user_agent_carries_both_tokens() {
        let request = NotificationRequest::new("h", 80, "POST", "/n");
        let headers = compose_headers(&request, &direct(&request), "ureq/3");
        let agent = headers.get("User-Agent").unwrap_or_default();

        assert!(agent.starts_with("notifier/"));
        assert!(agent.ends_with(" ureq/3"));
    }

    #[test]
    fn test_default_attrs_formats_are_not_emitted() {
        for format in ["", "JSON", "legacy"] {
            let mut request = NotificationRequest::new("h", 80, "POST", "/n");
            request.attrs_format = format.into();
            let headers = compose_headers(&request, &direct(&request), "ureq/3");
            assert!(!headers.contains("Ngsiv2-AttrsFormat"), "format {format:?}");
        }
    }

    #[test]
    fn test_charset_only_for_exact_types() {
        assert_eq!(content_type_with_charset("text/plain"), "text/plain; charset=utf-8");
        assert_eq!(content_type_with_charset("application/ld+json"), "application/ld+json");
        assert_eq!(content_type_with_charset("text/plain; charset=latin1"), "text/plain; charset=latin1");
        assert_eq!(content_type_with_charset(""), "");
    }

    #[test]
    fn test_unconsumed_extras_are_appended_once() {
        let defaults = vec![("Accept", "application/json".to_string())];
        let extras = overrides(&[("X-Custom", "1"), ("x-custom", "2"), ("ACCEPT", "text/csv")]);

        let headers = apply_overrides(&defaults, &extras);
        assert_eq!(headers.names(), vec!["ACCEPT", "X-Custom"]);
        assert_eq!(headers.get("x-custom"), Some("1"));
    }

    #[test]
    fn test_no_duplicates_case_insensitively() {
        let mut request = NotificationRequest::new("h", 80, "POST", "/n")
            .with_header("HOST", "override:1")
            .with_header("content-LENGTH", "0")
            .with_header("X-Extra", "yes");
        request.tenant = "t".into();

        let headers = compose_headers(&request, &direct(&request), "ureq/3");
        let mut seen = HashSet::new();
        for name in headers.names() {
            assert!(seen.insert(name.to_ascii_lowercase()), "duplicate {name}");
        }
        assert_eq!(headers.get("host"), Some("override:1"));
        assert_eq!(headers.get("x-extra"), Some("yes"));
    }

    #[test]
    fn test_size_accounts_every_line() {
        let defaults = vec![("Expect", String::new()), ("Host", "h:80".to_string())];
        let extras = overrides(&[("X-A", "b")]);
        let headers = apply_overrides(&defaults, &extras);

        // "Expect: " + "Host: h:80" + "X-A: b"
        assert_eq!(headers.header_bytes(), 8 + 10 + 6);
        assert_eq!(headers.outgoing_size(5), 24 + 5);
    }
}
