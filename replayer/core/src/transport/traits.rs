//! Transport Traits

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ReplayError, Result};

/// Destination for wire payloads
///
/// Implemented by [`OutboundHalf`](super::OutboundHalf) for real sockets;
/// tests substitute in-memory sinks.
#[async_trait]
pub trait PayloadSink: Send {
    /// Transmit one payload completely
    ///
    /// A zero-length payload is a valid (no-op) send.
    async fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Called once after every line of a cycle has been sent
    async fn finish_cycle(&mut self) -> Result<()>;

    /// Whether further sends can succeed
    fn is_open(&self) -> bool;
}

/// Source of inbound bytes
///
/// Implemented for every async reader, so [`InboundHalf`](super::InboundHalf)
/// and in-memory mocks drain the same way.
#[async_trait]
pub trait PayloadSource: Send {
    /// Read up to `max` bytes; an empty result means nothing arrived
    /// because the peer closed its side
    async fn receive(&mut self, max: usize) -> Result<Vec<u8>>;
}

#[async_trait]
impl<R> PayloadSource for R
where
    R: AsyncRead + Unpin + Send,
{
    async fn receive(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max];
        let n = self
            .read(&mut buf)
            .await
            .map_err(|e| ReplayError::io("receive", e))?;
        buf.truncate(n);
        Ok(buf)
    }
}
