/**
 * Transport layer: how notifications travel.
 *
 * - `http`: the ureq-backed `HttpTransport`
 * - `pool`: per-destination handle pool with RAII release
 * - `buffer`: chunk-growing, size-bounded response buffer
 * - `capture`: connector that records the response as read off the socket
 * - `worker`: bounded queue drained by background sender threads
 *
 * The engine only talks to the `Transport` trait: one fallible handle
 * constructor for the pool and one blocking call. Tests substitute a fake to
 * exercise every outcome without a network.
 */
use std::time::Duration;

use thiserror::Error;

use crate::protocol::headers::HeaderSet;

pub mod buffer;
pub mod capture;
pub mod http;
pub mod pool;
pub mod worker;

pub use buffer::ResponseBuffer;
pub use capture::Capture;
pub use http::{HttpHandle, HttpTransport};
pub use pool::{ConnectionPool, PooledHandle};
pub use worker::{NotificationQueue, QueueError, QueueOptions};

/// Failure reported by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("handle initialization failed: {0}")]
    Init(String),

    #[error("invalid request: {0}")]
    Request(String),

    #[error(transparent)]
    Http(#[from] ureq::Error),

    #[error("reading response failed: {0}")]
    Read(#[from] std::io::Error),
}

/**
 * One fully composed HTTP exchange, ready to hand to a transport.
 */
#[derive(Debug, Clone, Copy)]
pub struct HttpCall<'a> {
    pub verb: &'a str,
    pub url: &'a str,
    pub headers: &'a HeaderSet,
    pub body: &'a [u8],

    /// Bound on the whole exchange. `None` waits indefinitely.
    pub timeout: Option<Duration>,

    /// When false, return as soon as the response head is in; the output
    /// is empty.
    pub capture_response: bool,

    /// Cap on captured response bytes.
    pub max_response_size: u64,
}

/**
 * Capability to perform blocking HTTP calls over reusable handles.
 */
pub trait Transport: Send + Sync {
    /// Reusable per-destination connection state.
    type Handle: Send;

    /// Version token shown after the product token in `User-Agent`.
    fn version_token(&self) -> &str;

    /// Creates a handle for `destination` (`host:port`).
    fn open_handle(&self, destination: &str) -> Result<Self::Handle, TransportError>;

    /**
     * Performs the call and returns the raw response (status line, headers
     * and body). Any HTTP status counts as success.
     */
    fn perform(
        &self,
        handle: &mut Self::Handle,
        call: &HttpCall<'_>,
    ) -> Result<Vec<u8>, TransportError>;
}
