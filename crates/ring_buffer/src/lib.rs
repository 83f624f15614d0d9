//! # Ring Buffer
//!
//! Per-route delayed-replay storage.
//!
//! Responsibilities:
//! - Fixed-capacity circular byte store with wraparound copies
//! - Bounded FIFO of chunk descriptors (the only synchronization point)
//! - Per-chunk delay stamping via `DelayPolicy`
//!
//! ## Example
//!
//! ```ignore
//! use ring_buffer::{DelayPolicy, RingBuffer};
//! use std::time::Duration;
//!
//! let ring = RingBuffer::new(1 << 20, 1024, DelayPolicy::Fixed(Duration::from_secs(2)))?;
//! ring.write(b"payload")?;
//!
//! let mut buf = vec![0u8; 65536];
//! while let Some(chunk) = ring.read(&mut buf).await? {
//!     ring.policy().wait_for(&chunk).elapse().await;
//!     // transmit &buf[..chunk.size]
//! }
//! ```

mod buffer;
mod error;
mod policy;

pub use buffer::{Chunk, RingBuffer};
pub use error::RingError;
pub use policy::{DelayPolicy, Wait};
