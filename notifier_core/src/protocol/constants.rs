/**
 * Engine-wide constants.
 *
 * These values end up on the wire in every notification and identify the
 * engine (and the transport library under it) to subscribers.
 */

/// Product token placed first in the `User-Agent` header.
/// Derived at compile time from the `notifier_core` package version.
pub const PRODUCT_TOKEN: &str = concat!("notifier/", env!("CARGO_PKG_VERSION"));

/// `Accept` value used when the caller does not ask for a specific format.
pub const DEFAULT_ACCEPT: &str = "application/json";

/// Content types that get `; charset=utf-8` appended automatically.
pub const CHARSET_CONTENT_TYPES: [&str; 2] = ["application/json", "text/plain"];

/// Suffix appended to the content types listed above.
pub const CHARSET_SUFFIX: &str = "; charset=utf-8";

/// Attribute-format hints that mean "default rendering" and therefore never
/// produce an `Ngsiv2-AttrsFormat` header.
pub const DEFAULT_ATTRS_FORMATS: [&str; 2] = ["JSON", "legacy"];

/// Scheme token denoting a secure transport. Callers may pass it with or
/// without the trailing colon.
pub const SECURE_SCHEME: &str = "https";

// ---------------------------------------------------------------------------
// Header names, in the order the composer emits them
// ---------------------------------------------------------------------------

pub const RELAYER_HOST: &str = "X-relayer-host";
pub const RELAYER_PROTOCOL: &str = "X-relayer-protocol";
pub const USER_AGENT: &str = "User-Agent";
pub const HOST: &str = "Host";
pub const FIWARE_SERVICE: &str = "fiware-service";
pub const FIWARE_SERVICE_PATH: &str = "Fiware-ServicePath";
pub const X_AUTH_TOKEN: &str = "X-Auth-Token";
pub const ACCEPT: &str = "Accept";
pub const EXPECT: &str = "Expect";
pub const CONTENT_LENGTH: &str = "Content-length";
pub const CONTENT_TYPE: &str = "Content-type";
pub const FIWARE_CORRELATOR: &str = "Fiware-Correlator";
pub const ATTRS_FORMAT: &str = "Ngsiv2-AttrsFormat";
