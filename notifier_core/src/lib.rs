/*!
 * Notifier Core: the outbound notification delivery engine.
 *
 * Given a subscriber endpoint and a rendered payload, the engine builds the
 * HTTP request, enforces size and time budgets, optionally routes it through
 * a relay, performs exactly one blocking delivery attempt and reports a
 * unified result code plus a destination alarm signal.
 *
 * # Module structure
 *
 * - `protocol/`: request model, header composition, constants
 * - `transport/`: ureq transport, handle pool, background queue
 * - `validate`: precondition checks run before any I/O
 * - `relay`: effective destination and forwarding headers
 * - `engine`: the `Notifier` pipeline tying everything together
 * - `alarm`: destination health signals
 * - `config`: immutable engine configuration
 * - `error`: `SendError` and the numeric result codes
 *
 * # Example
 *
 * ```no_run
 * use std::sync::Arc;
 * use notifier_core::{AlarmManager, EngineConfig, NotificationRequest, Notifier};
 *
 * let notifier = Notifier::new(Arc::new(EngineConfig::default()), Arc::new(AlarmManager::new()));
 * let request = NotificationRequest::new("10.0.0.1", 1026, "POST", "/notify")
 *     .with_body("application/json", r#"{"id":"Room1"}"#);
 *
 * match notifier.send(&request) {
 *     Ok(raw) => println!("{}", String::from_utf8_lossy(&raw)),
 *     Err(e) => eprintln!("code {}: {e}", e.code()),
 * }
 * ```
 */

pub mod alarm;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod transport;
pub mod validate;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use alarm::{AlarmManager, AlarmSink};
pub use config::{ConfigError, EngineConfig, RelayConfig};
pub use engine::Notifier;
pub use error::{result_code, SendError, SUCCESS};
pub use protocol::headers::{HeaderKey, HeaderSet};
pub use protocol::request::{NotificationRequest, Timeout};
pub use relay::Route;
pub use transport::{
    HttpTransport, NotificationQueue, QueueError, QueueOptions, Transport, TransportError,
};
