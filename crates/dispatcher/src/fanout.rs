//! FanOut - replicates every inbound chunk to all routes

use std::sync::Arc;

use bytes::Bytes;
use contracts::{ContractError, StreamSink};
use tracing::debug;

use crate::handle::RouteHandle;

/// Inbound-facing sink that copies each chunk into every route
///
/// A route that rejects a chunk loses only that chunk. Other routes and the
/// inbound reader are unaffected.
#[derive(Debug, Clone)]
pub struct FanOut {
    handles: Arc<[RouteHandle]>,
}

impl FanOut {
    pub fn new(handles: Vec<RouteHandle>) -> Self {
        Self {
            handles: handles.into(),
        }
    }

    /// Offer `bytes` to every route; returns how many accepted it
    pub fn replicate(&self, bytes: &[u8]) -> usize {
        let mut shared: Option<Bytes> = None;
        self.handles
            .iter()
            .filter(|h| h.try_send(bytes, &mut shared))
            .count()
    }

    /// Close every route sink; safe to call more than once
    pub fn close_all(&self) {
        let closed = self.handles.iter().filter(|h| h.close()).count();
        debug!(closed, routes = self.handles.len(), "Route sinks closed");
    }

    pub fn handles(&self) -> &[RouteHandle] {
        &self.handles
    }
}

impl StreamSink for FanOut {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        self.replicate(bytes);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.close_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RouteMetrics;
    use crate::sink::{route_channel, RouteSource};
    use ring_buffer::DelayPolicy;
    use std::time::Duration;

    fn handle(name: &str, policy: Option<DelayPolicy>, queue: usize) -> (RouteHandle, RouteSource) {
        let (sink, source) = route_channel(policy, 1024, queue).unwrap();
        (
            RouteHandle::new(name, sink, Arc::new(RouteMetrics::new())),
            source,
        )
    }

    #[test]
    fn test_full_route_does_not_affect_others() {
        let (slow, _slow_src) = handle("slow", None, 1);
        let (fast, _fast_src) = handle(
            "fast",
            Some(DelayPolicy::Fixed(Duration::from_millis(1))),
            16,
        );
        let fanout = FanOut::new(vec![slow, fast]);

        assert_eq!(fanout.replicate(b"one"), 2);
        assert_eq!(fanout.replicate(b"two"), 1);
        assert_eq!(fanout.replicate(b"three"), 1);

        let slow = fanout.handles()[0].metrics().snapshot();
        let fast = fanout.handles()[1].metrics().snapshot();
        assert_eq!((slow.accepted_count, slow.dropped_count), (1, 2));
        assert_eq!((fast.accepted_count, fast.dropped_count), (3, 0));
    }

    #[tokio::test]
    async fn test_stream_sink_close_is_idempotent() {
        let (a, src) = handle("a", None, 4);
        let mut fanout = FanOut::new(vec![a]);

        fanout.write(b"payload").await.unwrap();
        fanout.close().await.unwrap();
        fanout.close().await.unwrap();
        fanout.write(b"late").await.unwrap();

        let RouteSource::Pipe(rx) = src else {
            panic!("expected pipe");
        };
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"payload"));
        assert!(rx.recv().await.is_err());
        assert_eq!(fanout.handles()[0].metrics().dropped_count(), 1);
    }
}
