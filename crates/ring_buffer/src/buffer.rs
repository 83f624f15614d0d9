//! Circular byte store with a bounded descriptor queue.
//!
//! Uses index-based separation:
//! - the descriptor queue carries lightweight `Chunk` metadata (offset, size, delay)
//! - the storage arena holds the actual bytes
//!
//! Bytes are never copied into descriptors. One writer (the fan-out) and one
//! reader (the route worker) share a buffer; the bounded queue is what makes
//! backpressure visible to the writer instead of stalling it.
//!
//! Storage is not reclaimed by the reader: `capacity` must cover the worst-case
//! undrained volume (route delay x ingress rate). An undersized buffer silently
//! overwrites bytes that are still queued.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::trace;

use crate::{DelayPolicy, RingError};

/// Descriptor of one stored chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Start of the chunk in storage
    pub offset: usize,
    /// Chunk length in bytes
    pub size: usize,
    /// Delay resolved by the policy at write time
    pub delay: Duration,
    /// When the chunk was accepted
    pub accepted_at: Instant,
}

struct Storage {
    bytes: Box<[u8]>,
    cursor: usize,
    last_accepted: Option<Instant>,
}

impl Storage {
    /// Copy `src` in at `offset`, wrapping tail then head
    fn copy_in(&mut self, offset: usize, src: &[u8]) {
        let tail = (self.bytes.len() - offset).min(src.len());
        self.bytes[offset..offset + tail].copy_from_slice(&src[..tail]);
        self.bytes[..src.len() - tail].copy_from_slice(&src[tail..]);
    }

    /// Copy `dst.len()` bytes out from `offset`, wrapping tail then head
    fn copy_out(&self, offset: usize, dst: &mut [u8]) {
        let tail = (self.bytes.len() - offset).min(dst.len());
        let rest = dst.len() - tail;
        dst[..tail].copy_from_slice(&self.bytes[offset..offset + tail]);
        dst[tail..].copy_from_slice(&self.bytes[..rest]);
    }
}

/// Fixed-capacity circular buffer for one route
pub struct RingBuffer {
    storage: Mutex<Storage>,
    queue_tx: Sender<Chunk>,
    queue_rx: Receiver<Chunk>,
    policy: DelayPolicy,
    capacity: usize,
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RingBuffer {
    /// Create a ring of `capacity` bytes holding at most `queue_capacity` undrained chunks
    pub fn new(
        capacity: usize,
        queue_capacity: usize,
        policy: DelayPolicy,
    ) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::ZeroCapacity { what: "storage" });
        }
        if queue_capacity == 0 {
            return Err(RingError::ZeroCapacity { what: "queue" });
        }
        let (queue_tx, queue_rx) = bounded(queue_capacity);

        Ok(Self {
            storage: Mutex::new(Storage {
                bytes: vec![0u8; capacity].into_boxed_slice(),
                cursor: 0,
                last_accepted: None,
            }),
            queue_tx,
            queue_rx,
            policy,
            capacity,
        })
    }

    /// Store `bytes` as one chunk
    ///
    /// Never blocks. Rejected when the queue is full, the buffer is closed,
    /// or the chunk is larger than the whole storage.
    pub fn write(&self, bytes: &[u8]) -> Result<(), RingError> {
        if self.queue_tx.is_closed() {
            return Err(RingError::Closed);
        }
        if bytes.len() > self.capacity {
            return Err(RingError::ChunkTooLarge {
                size: bytes.len(),
                capacity: self.capacity,
            });
        }
        if self.queue_tx.is_full() {
            return Err(RingError::QueueFull {
                pending: self.queue_tx.len(),
            });
        }

        let now = Instant::now();
        let mut storage = self.lock();
        let offset = storage.cursor;
        let chunk = Chunk {
            offset,
            size: bytes.len(),
            delay: self.policy.chunk_delay(storage.last_accepted, now),
            accepted_at: now,
        };
        storage.copy_in(offset, bytes);

        match self.queue_tx.try_send(chunk) {
            Ok(()) => {
                storage.cursor = (offset + bytes.len()) % self.capacity;
                storage.last_accepted = Some(now);
                trace!(offset, size = chunk.size, delay = ?chunk.delay, "Chunk stored");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(RingError::QueueFull {
                pending: self.queue_tx.len(),
            }),
            Err(TrySendError::Closed(_)) => Err(RingError::Closed),
        }
    }

    /// Read the next chunk into `buf`
    ///
    /// Suspends until a chunk is queued. Returns `Ok(None)` once the buffer
    /// is closed and every queued chunk has been read.
    pub async fn read(&self, buf: &mut [u8]) -> Result<Option<Chunk>, RingError> {
        let Ok(chunk) = self.queue_rx.recv().await else {
            return Ok(None);
        };
        if buf.len() < chunk.size {
            return Err(RingError::ShortBuffer {
                need: chunk.size,
                got: buf.len(),
            });
        }
        self.lock().copy_out(chunk.offset, &mut buf[..chunk.size]);
        Ok(Some(chunk))
    }

    /// Close the buffer
    ///
    /// Succeeds exactly once; later calls report `AlreadyClosed`. Queued
    /// chunks stay readable, then readers observe end-of-stream.
    pub fn close(&self) -> Result<(), RingError> {
        if self.queue_tx.close() {
            Ok(())
        } else {
            Err(RingError::AlreadyClosed)
        }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.queue_tx.is_closed()
    }

    /// Number of undrained chunks
    pub fn pending(&self) -> usize {
        self.queue_tx.len()
    }

    /// Storage size in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Attached delay policy
    pub fn policy(&self) -> &DelayPolicy {
        &self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Storage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fixed(ms: u64) -> DelayPolicy {
        DelayPolicy::Fixed(Duration::from_millis(ms))
    }

    async fn read_vec(ring: &RingBuffer) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; ring.capacity()];
        ring.read(&mut buf)
            .await
            .unwrap()
            .map(|chunk| buf[..chunk.size].to_vec())
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            RingBuffer::new(0, 4, fixed(1)).unwrap_err(),
            RingError::ZeroCapacity { what: "storage" }
        );
        assert_eq!(
            RingBuffer::new(16, 0, fixed(1)).unwrap_err(),
            RingError::ZeroCapacity { what: "queue" }
        );
    }

    #[tokio::test]
    async fn test_reads_preserve_write_order() {
        let ring = RingBuffer::new(4096, 64, fixed(1)).unwrap();
        let writes: Vec<Vec<u8>> = (0..20u8).map(|i| vec![i; 1 + i as usize * 7]).collect();
        for w in &writes {
            ring.write(w).unwrap();
        }
        for w in &writes {
            assert_eq!(read_vec(&ring).await.as_ref(), Some(w));
        }
    }

    #[tokio::test]
    async fn test_wraparound_600_then_500() {
        let ring = RingBuffer::new(1024, 8, fixed(1)).unwrap();
        let first: Vec<u8> = (0..600).map(|i| (i % 251) as u8).collect();
        let second: Vec<u8> = (0..500).map(|i| (i % 13) as u8 + 100).collect();

        ring.write(&first).unwrap();
        assert_eq!(read_vec(&ring).await, Some(first));

        ring.write(&second).unwrap();
        let mut buf = vec![0u8; 1024];
        let chunk = ring.read(&mut buf).await.unwrap().unwrap();
        assert_eq!(chunk.offset, 600);
        assert_eq!(chunk.size, 500);
        assert_eq!(&buf[..500], &second[..]);
    }

    #[tokio::test]
    async fn test_wraparound_byte_identical_stream() {
        let ring = RingBuffer::new(100, 16, fixed(1)).unwrap();
        let input: Vec<u8> = (0..1000u32).map(|i| (i * 31 % 256) as u8).collect();
        let mut output = Vec::new();

        // Keep at most 3 chunks of 33 bytes undrained so nothing is overwritten.
        for piece in input.chunks(33) {
            ring.write(piece).unwrap();
            if ring.pending() == 3 {
                output.extend(read_vec(&ring).await.unwrap());
            }
        }
        ring.close().unwrap();
        while let Some(bytes) = read_vec(&ring).await {
            output.extend(bytes);
        }
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_blocking() {
        let ring = RingBuffer::new(1024, 2, fixed(1)).unwrap();
        ring.write(b"a").unwrap();
        ring.write(b"b").unwrap();

        let err = ring.write(b"c").unwrap_err();
        assert_eq!(err, RingError::QueueFull { pending: 2 });

        // Rejected write leaves the stream intact
        assert_eq!(read_vec(&ring).await, Some(b"a".to_vec()));
        ring.write(b"d").unwrap();
        assert_eq!(read_vec(&ring).await, Some(b"b".to_vec()));
        assert_eq!(read_vec(&ring).await, Some(b"d".to_vec()));
    }

    #[tokio::test]
    async fn test_oversized_chunk_rejected() {
        let ring = RingBuffer::new(8, 2, fixed(1)).unwrap();
        assert_eq!(
            ring.write(&[0u8; 9]).unwrap_err(),
            RingError::ChunkTooLarge {
                size: 9,
                capacity: 8
            }
        );
        assert_eq!(ring.pending(), 0);
    }

    #[tokio::test]
    async fn test_short_read_buffer() {
        let ring = RingBuffer::new(64, 2, fixed(1)).unwrap();
        ring.write(&[1u8; 10]).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(
            ring.read(&mut buf).await.unwrap_err(),
            RingError::ShortBuffer { need: 10, got: 4 }
        );
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let ring = RingBuffer::new(64, 2, fixed(1)).unwrap();
        assert_eq!(ring.close(), Ok(()));
        assert_eq!(ring.close(), Err(RingError::AlreadyClosed));
        assert!(ring.is_closed());
        assert_eq!(ring.write(b"late").unwrap_err(), RingError::Closed);
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let ring = RingBuffer::new(64, 4, fixed(1)).unwrap();
        ring.write(b"one").unwrap();
        ring.write(b"two").unwrap();
        ring.close().unwrap();

        assert_eq!(read_vec(&ring).await, Some(b"one".to_vec()));
        assert_eq!(read_vec(&ring).await, Some(b"two".to_vec()));
        assert_eq!(read_vec(&ring).await, None);
    }

    #[tokio::test]
    async fn test_close_wakes_blocked_reader() {
        let ring = Arc::new(RingBuffer::new(64, 4, fixed(1)).unwrap());
        let reader = {
            let ring = Arc::clone(&ring);
            tokio::spawn(async move {
                let mut buf = [0u8; 64];
                ring.read(&mut buf).await.unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_finished());

        ring.close().unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("reader not woken")
            .unwrap();
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn test_fixed_delay_stamped_on_every_chunk() {
        let ring = RingBuffer::new(64, 4, fixed(300)).unwrap();
        ring.write(b"x").unwrap();
        ring.write(b"y").unwrap();
        let mut buf = [0u8; 64];
        for _ in 0..2 {
            let chunk = ring.read(&mut buf).await.unwrap().unwrap();
            assert_eq!(chunk.delay, Duration::from_millis(300));
        }
    }

    #[tokio::test]
    async fn test_replay_delay_records_write_gaps() {
        let ring = RingBuffer::new(
            64,
            4,
            DelayPolicy::Replay {
                baseline: Duration::from_millis(500),
                interval: None,
            },
        )
        .unwrap();
        ring.write(b"a").unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        ring.write(b"b").unwrap();

        let mut buf = [0u8; 64];
        let first = ring.read(&mut buf).await.unwrap().unwrap();
        let second = ring.read(&mut buf).await.unwrap().unwrap();
        assert_eq!(first.delay, Duration::from_millis(500));
        assert!(second.delay >= Duration::from_millis(40));
        assert!(second.delay < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_rejected_write_keeps_replay_reference() {
        let ring = RingBuffer::new(
            64,
            1,
            DelayPolicy::Replay {
                baseline: Duration::from_millis(10),
                interval: None,
            },
        )
        .unwrap();
        ring.write(b"a").unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(ring.write(b"dropped").is_err());

        let mut buf = [0u8; 64];
        ring.read(&mut buf).await.unwrap().unwrap();
        ring.write(b"b").unwrap();
        let second = ring.read(&mut buf).await.unwrap().unwrap();
        // Gap measured from "a", not from the rejected write
        assert!(second.delay >= Duration::from_millis(30));
    }
}
