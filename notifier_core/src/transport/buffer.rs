/**
 * Growable, size-bounded response buffer.
 *
 * Bytes are appended chunk by chunk as the transport reads them. Each
 * append grows the storage by exactly the incoming chunk's size, so small
 * responses cost one or two allocations while large ones are still taken
 * whole, up to `limit`.
 */
use std::io;

#[derive(Debug)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
    limit: u64,
}

impl ResponseBuffer {
    pub fn new(limit: u64) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
        }
    }

    /**
     * Appends one chunk. Fails without appending anything if the chunk would
     * take the buffer past its limit.
     */
    pub fn push(&mut self, chunk: &[u8]) -> io::Result<()> {
        let new_len = (self.bytes.len() + chunk.len()) as u64;
        if new_len > self.limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("response exceeds {} bytes", self.limit),
            ));
        }
        self.bytes.reserve_exact(chunk.len());
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
