//! RouteHandle - the fan-out's view of one route

use std::sync::Arc;

use bytes::Bytes;
use tracing::{trace, warn};

use crate::metrics::RouteMetrics;
use crate::sink::RouteSink;

/// Write side of a running route
#[derive(Debug, Clone)]
pub struct RouteHandle {
    name: String,
    sink: RouteSink,
    metrics: Arc<RouteMetrics>,
}

impl RouteHandle {
    pub fn new(name: impl Into<String>, sink: RouteSink, metrics: Arc<RouteMetrics>) -> Self {
        Self {
            name: name.into(),
            sink,
            metrics,
        }
    }

    /// Route name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<RouteMetrics> {
        &self.metrics
    }

    /// Hand a chunk to the route (non-blocking)
    ///
    /// Returns true if accepted, false if the route rejected it.
    pub fn try_send(&self, bytes: &[u8], shared: &mut Option<Bytes>) -> bool {
        match self.sink.offer(bytes, shared) {
            Ok(()) => {
                self.metrics.inc_accepted_count();
                let depth = self.sink.pending();
                self.metrics.set_queue_len(depth);
                observability::record_queue_depth(&self.name, depth);
                observability::record_chunk_accepted(&self.name, bytes.len());
                true
            }
            Err(rejection) => {
                let previous = self.metrics.inc_dropped_count();
                observability::record_chunk_dropped(&self.name, rejection.as_str());
                if previous == 0 {
                    warn!(
                        route = %self.name,
                        reason = rejection.as_str(),
                        size = bytes.len(),
                        "Route rejected chunk, dropping"
                    );
                } else {
                    trace!(route = %self.name, reason = rejection.as_str(), "Chunk dropped");
                }
                false
            }
        }
    }

    /// Signal end of stream to the route's worker
    pub fn close(&self) -> bool {
        self.sink.close()
    }
}
