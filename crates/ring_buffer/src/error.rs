//! Ring buffer error types

use thiserror::Error;

/// Ring buffer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    /// Storage or queue sized to zero
    #[error("ring {what} capacity must be > 0")]
    ZeroCapacity { what: &'static str },

    /// Descriptor queue full - write rejected
    #[error("descriptor queue full ({pending} chunks pending)")]
    QueueFull { pending: usize },

    /// Write after close - write rejected
    #[error("ring buffer closed")]
    Closed,

    /// Second close attempt
    #[error("ring buffer already closed")]
    AlreadyClosed,

    /// Chunk cannot fit in storage at all - write rejected
    #[error("chunk of {size} bytes exceeds ring capacity of {capacity} bytes")]
    ChunkTooLarge { size: usize, capacity: usize },

    /// Caller buffer smaller than the chunk being read
    #[error("read buffer too small: chunk is {need} bytes, buffer is {got} bytes")]
    ShortBuffer { need: usize, got: usize },
}
