/**
 * Socket-level response capture.
 *
 * ureq parses what it reads: header names come back normalized, the reason
 * phrase is not kept and encoded bodies may be decoded. The notification
 * output must be the bytes the subscriber actually sent, so every agent is
 * built with `CaptureConnector` at the end of its connector chain. The
 * connector wraps each connection in a `CapturingTransport`, which copies
 * every byte read from the connection into the handle's `Capture` while a
 * call is being recorded.
 *
 * ```text
 *  DefaultConnector (tcp, tls) ──► CaptureConnector ──► CapturingTransport
 *                                                          │ await_input
 *                                                          ▼
 *                                     Capture (shared with the HttpHandle)
 * ```
 */
use std::io;
use std::sync::{Arc, Mutex};

use ureq::unversioned::transport::{Buffers, ConnectionDetails, Connector, NextTimeout, Transport};

use super::buffer::ResponseBuffer;

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/**
 * Recording slot shared by a handle and the connections its agent opens.
 * Idle until `begin`; bytes read while idle are not kept.
 */
#[derive(Debug, Clone, Default)]
pub struct Capture {
    recording: Arc<Mutex<Option<ResponseBuffer>>>,
}

impl Capture {
    /// Starts a fresh recording bounded to `limit` bytes.
    pub fn begin(&self, limit: u64) {
        if let Ok(mut recording) = self.recording.lock() {
            *recording = Some(ResponseBuffer::new(limit));
        }
    }

    /// Appends bytes read from the connection. Fails once the recording
    /// would exceed its limit.
    pub fn record(&self, bytes: &[u8]) -> io::Result<()> {
        let Ok(mut recording) = self.recording.lock() else {
            return Ok(());
        };
        match recording.as_mut() {
            Some(buffer) => buffer.push(bytes),
            None => Ok(()),
        }
    }

    /// Ends the recording and returns what it holds.
    pub fn finish(&self) -> Vec<u8> {
        self.recording
            .lock()
            .ok()
            .and_then(|mut recording| recording.take())
            .map(ResponseBuffer::into_bytes)
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CaptureConnector {
    capture: Capture,
}

impl CaptureConnector {
    pub fn new(capture: Capture) -> Self {
        Self { capture }
    }
}

impl<In: Transport> Connector<In> for CaptureConnector {
    type Out = CapturingTransport<In>;

    fn connect(
        &self,
        _details: &ConnectionDetails,
        chained: Option<In>,
    ) -> Result<Option<Self::Out>, ureq::Error> {
        Ok(chained.map(|inner| CapturingTransport {
            inner,
            capture: self.capture.clone(),
        }))
    }
}

/**
 * Pass-through transport that reports newly read input to its `Capture`.
 *
 * Only bytes appended by `await_input` are new; everything before them in
 * the input buffer was already reported on an earlier read.
 */
#[derive(Debug)]
pub struct CapturingTransport<T> {
    inner: T,
    capture: Capture,
}

impl<T: Transport> Transport for CapturingTransport<T> {
    fn buffers(&mut self) -> &mut dyn Buffers {
        self.inner.buffers()
    }

    fn transmit_output(&mut self, amount: usize, timeout: NextTimeout) -> Result<(), ureq::Error> {
        self.inner.transmit_output(amount, timeout)
    }

    fn await_input(&mut self, timeout: NextTimeout) -> Result<bool, ureq::Error> {
        let before = self.inner.buffers().input().len();
        let progressed = self.inner.await_input(timeout)?;

        let input = self.inner.buffers().input();
        if input.len() > before {
            self.capture
                .record(&input[before..])
                .map_err(ureq::Error::Io)?;
        }
        Ok(progressed)
    }

    fn is_open(&mut self) -> bool {
        self.inner.is_open()
    }

    fn is_tls(&self) -> bool {
        self.inner.is_tls()
    }
}
