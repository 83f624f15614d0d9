//! Delay policy - when a stored chunk becomes eligible for emission

use std::time::{Duration, Instant};

use crate::Chunk;

/// Per-route delay decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    /// Every chunk waits the same duration after it was accepted
    Fixed(Duration),

    /// Chunks reproduce the gaps at which they were accepted
    ///
    /// The first chunk has no prior reference and waits `baseline`.
    /// When `interval` is set it replaces every recorded gap.
    Replay {
        baseline: Duration,
        interval: Option<Duration>,
    },
}

/// Resolved wait for one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Sleep until an absolute deadline
    Until(Instant),
    /// Sleep for a duration starting now
    After(Duration),
}

impl DelayPolicy {
    /// Build the policy for a route, `None` when the route has no delay
    pub fn from_route(delay: Duration, interval: Option<Duration>, replay: bool) -> Option<Self> {
        if delay.is_zero() {
            return None;
        }
        if replay {
            Some(Self::Replay {
                baseline: delay,
                interval,
            })
        } else {
            Some(Self::Fixed(delay))
        }
    }

    /// Delay recorded for a chunk accepted at `now`
    ///
    /// `previous` is the acceptance time of the previous chunk, if any.
    pub fn chunk_delay(&self, previous: Option<Instant>, now: Instant) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Replay { baseline, interval } => match previous {
                None => baseline,
                Some(prev) => interval.unwrap_or_else(|| now.saturating_duration_since(prev)),
            },
        }
    }

    /// How long the reader must hold `chunk` before transmitting it
    pub fn wait_for(&self, chunk: &Chunk) -> Wait {
        match self {
            Self::Fixed(_) => Wait::Until(chunk.accepted_at + chunk.delay),
            Self::Replay { .. } => Wait::After(chunk.delay),
        }
    }
}

impl Wait {
    /// Absolute instant this wait ends at, measured from `now`
    pub fn deadline(self, now: Instant) -> Instant {
        match self {
            Self::Until(deadline) => deadline,
            Self::After(d) => now + d,
        }
    }

    /// Suspend the calling task for this wait
    pub async fn elapse(self) {
        match self {
            Self::Until(deadline) => tokio::time::sleep_until(deadline.into()).await,
            Self::After(d) if d.is_zero() => {}
            Self::After(d) => tokio::time::sleep(d).await,
        }
    }
}
