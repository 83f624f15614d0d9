//! RouteWorker - drains one route's buffer into its outbound connection

use std::sync::Arc;
use std::time::Instant;

use async_channel::Receiver;
use bytes::Bytes;
use observability::{RunningStats, StatsSummary};
use ring_buffer::{RingBuffer, RingError};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::metrics::{MetricsSnapshot, RouteMetrics, WorkerState};
use crate::sink::RouteSource;
use crate::transport::Outbound;
use crate::{DispatcherError, Route};

/// Final accounting for a route that drained to completion
#[derive(Debug, Clone)]
pub struct RouteReport {
    /// Position of the route in the configuration
    pub index: usize,
    pub name: String,
    pub metrics: MetricsSnapshot,
    /// Milliseconds between a chunk's due time and its transmission
    pub emit_lag_ms: Option<StatsSummary>,
}

/// Worker task state for one route
pub struct RouteWorker {
    index: usize,
    route: Arc<Route>,
    source: RouteSource,
    metrics: Arc<RouteMetrics>,
    chunk_limit: usize,
    lag: RunningStats,
}

impl RouteWorker {
    pub fn new(
        index: usize,
        route: Arc<Route>,
        source: RouteSource,
        metrics: Arc<RouteMetrics>,
        chunk_limit: usize,
    ) -> Self {
        Self {
            index,
            route,
            source,
            metrics,
            chunk_limit,
            lag: RunningStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        self.route.name()
    }

    /// Dial, drain until end of stream, then close the connection
    ///
    /// UDP send errors are counted and skipped. Any other transport error
    /// ends the route with an error.
    #[instrument(
        name = "route_worker",
        skip(self),
        fields(route = %self.route.name(), transport = self.route.transport())
    )]
    pub async fn run(mut self) -> Result<RouteReport, DispatcherError> {
        self.metrics.set_state(WorkerState::Dialing);
        let mut outbound = match Outbound::dial(&self.route).await {
            Ok(outbound) => outbound,
            Err(source) => {
                error!(address = %self.route.address(), error = %source, "Dial failed");
                self.finish(WorkerState::Failed);
                return Err(DispatcherError::Dial {
                    route: self.route.name().to_string(),
                    address: self.route.address().to_string(),
                    source,
                });
            }
        };

        self.metrics.set_state(WorkerState::Draining);
        info!(address = %self.route.address(), "Route connected");

        let result = match &self.source {
            RouteSource::Ring(ring) => {
                let ring = Arc::clone(ring);
                self.drain_ring(&ring, &mut outbound).await
            }
            RouteSource::Pipe(rx) => {
                let rx = rx.clone();
                self.drain_pipe(&rx, &mut outbound).await
            }
        };

        if let Err(e) = outbound.shutdown().await {
            debug!(error = %e, "Outbound shutdown failed");
        }

        match result {
            Ok(()) => {
                self.finish(WorkerState::Closed);
                let report = self.report();
                info!(
                    sent = report.metrics.sent_count,
                    dropped = report.metrics.dropped_count,
                    failures = report.metrics.failure_count,
                    "Route drained"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Route failed");
                self.finish(WorkerState::Failed);
                Err(e)
            }
        }
    }

    async fn drain_ring(
        &mut self,
        ring: &RingBuffer,
        outbound: &mut Outbound,
    ) -> Result<(), DispatcherError> {
        let mut buf = vec![0u8; ring.capacity().min(self.chunk_limit)];
        loop {
            let chunk = match ring.read(&mut buf).await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => return Ok(()),
                Err(RingError::ShortBuffer { need, got }) => {
                    self.metrics.inc_dropped_count();
                    observability::record_chunk_dropped(self.route.name(), "too_large");
                    warn!(need, got, "Chunk larger than read limit, skipped");
                    continue;
                }
                Err(source) => {
                    return Err(DispatcherError::Ring {
                        route: self.route.name().to_string(),
                        source,
                    });
                }
            };
            self.queue_depth(ring.pending());

            let wait = ring.policy().wait_for(&chunk);
            let due = wait.deadline(Instant::now());
            wait.elapse().await;

            let lag = Instant::now().saturating_duration_since(due);
            let lag_ms = lag.as_secs_f64() * 1000.0;
            self.lag.push(lag_ms);
            observability::record_emit_lag_ms(self.route.name(), lag_ms);
            trace!(size = chunk.size, delay = ?chunk.delay, lag_ms, "Chunk due");

            self.transmit(outbound, &buf[..chunk.size]).await?;
        }
    }

    async fn drain_pipe(
        &mut self,
        rx: &Receiver<Bytes>,
        outbound: &mut Outbound,
    ) -> Result<(), DispatcherError> {
        while let Ok(bytes) = rx.recv().await {
            self.queue_depth(rx.len());
            self.transmit(outbound, &bytes).await?;
        }
        Ok(())
    }

    async fn transmit(
        &mut self,
        outbound: &mut Outbound,
        bytes: &[u8],
    ) -> Result<(), DispatcherError> {
        match outbound.send(bytes).await {
            Ok(()) => {
                self.metrics.inc_sent(bytes.len());
                observability::record_chunk_sent(self.route.name(), bytes.len());
                Ok(())
            }
            Err(e) if outbound.is_datagram() => {
                let previous = self.metrics.inc_failure_count();
                observability::record_send_failure(self.route.name());
                if previous == 0 {
                    warn!(error = %e, "Datagram send failed, continuing");
                } else {
                    debug!(error = %e, failures = previous + 1, "Datagram send failed");
                }
                Ok(())
            }
            Err(source) => Err(DispatcherError::Transmit {
                route: self.route.name().to_string(),
                source,
            }),
        }
    }

    fn finish(&self, state: WorkerState) {
        self.source.close();
        self.queue_depth(0);
        self.metrics.set_state(state);
        if state == WorkerState::Failed {
            observability::record_route_failed(self.route.name());
        }
    }

    fn queue_depth(&self, depth: usize) {
        self.metrics.set_queue_len(depth);
        observability::record_queue_depth(self.route.name(), depth);
    }

    fn report(&self) -> RouteReport {
        RouteReport {
            index: self.index,
            name: self.route.name().to_string(),
            metrics: self.metrics.snapshot(),
            emit_lag_ms: (self.lag.count() > 0).then(|| self.lag.summary()),
        }
    }
}
