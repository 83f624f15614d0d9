//! StreamSink trait - inbound listener output interface
//!
//! Defines where the listener hands every inbound read.

use crate::ContractError;

/// Inbound byte stream consumer
///
/// The listener calls `write` once per datagram or per stream read, in
/// arrival order, and `close` once when the inbound stream has ended.
#[trait_variant::make(StreamSink: Send)]
pub trait LocalStreamSink {
    /// Sink name (used for logging)
    fn name(&self) -> &str;

    /// Accept one inbound read
    ///
    /// Must not block on slow consumers: a consumer that cannot keep up
    /// loses bytes instead of stalling the listener.
    ///
    /// # Errors
    /// Returns an error only when the sink can no longer accept any input.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ContractError>;

    /// Signal end of the inbound stream
    async fn close(&mut self) -> Result<(), ContractError>;
}
