//! Route sink/source pair - the two ends of a route's buffer
//!
//! Delayed routes store chunks in a [`RingBuffer`]. Pass-through routes use a
//! bounded channel of shared [`Bytes`] so nothing waits before transmission.

use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use bytes::Bytes;
use ring_buffer::{RingBuffer, RingError};

/// Why a route did not take a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    QueueFull,
    Closed,
    TooLarge,
}

impl Rejection {
    /// Metric label
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueueFull => "queue_full",
            Self::Closed => "closed",
            Self::TooLarge => "too_large",
        }
    }
}

impl From<RingError> for Rejection {
    fn from(err: RingError) -> Self {
        match err {
            RingError::ChunkTooLarge { .. } => Self::TooLarge,
            RingError::Closed | RingError::AlreadyClosed => Self::Closed,
            _ => Self::QueueFull,
        }
    }
}

impl<T> From<TrySendError<T>> for Rejection {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Full(_) => Self::QueueFull,
            TrySendError::Closed(_) => Self::Closed,
        }
    }
}

/// Write end, held by the fan-out
#[derive(Debug, Clone)]
pub enum RouteSink {
    Ring(Arc<RingBuffer>),
    Pipe(Sender<Bytes>),
}

impl RouteSink {
    /// Offer a chunk without blocking
    ///
    /// `shared` caches one refcounted copy of `bytes` across pass-through routes.
    pub fn offer(&self, bytes: &[u8], shared: &mut Option<Bytes>) -> Result<(), Rejection> {
        match self {
            Self::Ring(ring) => ring.write(bytes).map_err(Rejection::from),
            Self::Pipe(tx) => {
                let chunk = shared
                    .get_or_insert_with(|| Bytes::copy_from_slice(bytes))
                    .clone();
                tx.try_send(chunk).map_err(Rejection::from)
            }
        }
    }

    /// Mark end of stream; returns true only for the call that closed it
    pub fn close(&self) -> bool {
        match self {
            Self::Ring(ring) => ring.close().is_ok(),
            Self::Pipe(tx) => tx.close(),
        }
    }

    /// Chunks accepted but not yet read
    pub fn pending(&self) -> usize {
        match self {
            Self::Ring(ring) => ring.pending(),
            Self::Pipe(tx) => tx.len(),
        }
    }
}

/// Read end, owned by the route worker
#[derive(Debug)]
pub enum RouteSource {
    Ring(Arc<RingBuffer>),
    Pipe(Receiver<Bytes>),
}

impl RouteSource {
    /// Close from the reader side, so further offers are rejected
    pub fn close(&self) {
        match self {
            Self::Ring(ring) => {
                let _ = ring.close();
            }
            Self::Pipe(rx) => {
                rx.close();
            }
        }
    }
}

/// Create the sink/source pair for a route
pub fn route_channel(
    policy: Option<ring_buffer::DelayPolicy>,
    buffer_capacity: usize,
    queue_capacity: usize,
) -> Result<(RouteSink, RouteSource), RingError> {
    match policy {
        Some(policy) => {
            let ring = Arc::new(RingBuffer::new(buffer_capacity, queue_capacity, policy)?);
            Ok((RouteSink::Ring(Arc::clone(&ring)), RouteSource::Ring(ring)))
        }
        None => {
            if queue_capacity == 0 {
                return Err(RingError::ZeroCapacity { what: "queue" });
            }
            let (tx, rx) = async_channel::bounded(queue_capacity);
            Ok((RouteSink::Pipe(tx), RouteSource::Pipe(rx)))
        }
    }
}
