/*!
 * HTTP transport on top of `ureq`, a blocking client with no async runtime.
 * A send runs on the caller's thread.
 *
 * - Each pooled handle is its own `ureq::Agent`, holding one keep-alive
 *   connection to its destination.
 * - The composed headers are the whole request: ureq adds no user-agent,
 *   accept or accept-encoding of its own.
 * - Any verb goes out as given, standard or not.
 * - Any HTTP status is a delivered notification. What the subscriber
 *   answered is the caller's business.
 * - The response is returned as read off the connection (see `capture`).
 * - Ambient proxy settings are ignored.
 */
use std::io;

use ureq::http::{Method, Request};
use ureq::unversioned::resolver::DefaultResolver;
use ureq::unversioned::transport::{Connector as _, DefaultConnector};
use ureq::Agent;

use super::capture::{Capture, CaptureConnector};
use super::{HttpCall, Transport, TransportError};

/// Transport library token for `User-Agent`.
pub const TRANSPORT_TOKEN: &str = "ureq/3";

/// Default redirect budget; the engine follows redirects like a browser would.
const MAX_REDIRECTS: u32 = 10;

/**
 * Blocking HTTP transport. Stateless itself; all connection state lives in
 * the `HttpHandle`s it opens.
 */
#[derive(Debug, Clone)]
pub struct HttpTransport {
    max_redirects: u32,
}

/// Pooled connection state: an agent plus the capture its connections feed.
#[derive(Debug)]
pub struct HttpHandle {
    agent: Agent,
    capture: Capture,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            max_redirects: MAX_REDIRECTS,
        }
    }

    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    type Handle = HttpHandle;

    fn version_token(&self) -> &str {
        TRANSPORT_TOKEN
    }

    fn open_handle(&self, _destination: &str) -> Result<HttpHandle, TransportError> {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .allow_non_standard_methods(true)
            .max_redirects(self.max_redirects)
            .max_idle_connections_per_host(1)
            .proxy(None)
            .user_agent("")
            .accept("")
            .accept_encoding("")
            .build();

        let capture = Capture::default();
        let connector = DefaultConnector::new().chain(CaptureConnector::new(capture.clone()));
        let agent = Agent::with_parts(config, connector, DefaultResolver::default());

        Ok(HttpHandle { agent, capture })
    }

    fn perform(&self, handle: &mut HttpHandle, call: &HttpCall<'_>) -> Result<Vec<u8>, TransportError> {
        let method = Method::from_bytes(call.verb.as_bytes())
            .map_err(|e| TransportError::Request(format!("verb {:?}: {e}", call.verb)))?;

        let mut builder = Request::builder().method(method).uri(call.url);
        for (name, value) in call.headers.iter() {
            builder = builder.header(name, value);
        }
        let request = builder
            .body(call.body)
            .map_err(|e| TransportError::Request(e.to_string()))?;

        /*
         * The timeout is per call, so it rides on the request rather than
         * on the shared agent configuration.
         */
        let request = handle
            .agent
            .configure_request(request)
            .timeout_global(call.timeout)
            .build();

        handle.capture.begin(call.max_response_size);
        let exchanged = exchange(&handle.agent, request, call);
        let raw = handle.capture.finish();
        exchanged?;

        if call.capture_response {
            Ok(raw)
        } else {
            Ok(Vec::new())
        }
    }
}

/**
 * Runs the request and, when the response is wanted, reads the body to its
 * end so every byte passes through the capture.
 */
fn exchange(agent: &Agent, request: Request<&[u8]>, call: &HttpCall<'_>) -> Result<(), TransportError> {
    let response = agent.run(request)?;
    if !call.capture_response {
        return Ok(());
    }

    let mut body = response
        .into_body()
        .into_with_config()
        .limit(call.max_response_size)
        .reader();
    io::copy(&mut body, &mut io::sink())?;
    Ok(())
}
