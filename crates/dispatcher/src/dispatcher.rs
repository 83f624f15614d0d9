//! Dispatcher - owns the route workers and the fan-out feeding them

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use contracts::{ContractError, RouteConfig, DEFAULT_READ_BUFFER};
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info, instrument, warn};

use crate::error::DispatcherError;
use crate::fanout::FanOut;
use crate::handle::RouteHandle;
use crate::metrics::{MetricsSnapshot, RouteMetrics};
use crate::sink::route_channel;
use crate::worker::{RouteReport, RouteWorker};
use crate::Route;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Route configurations
    pub routes: Vec<RouteConfig>,
    /// Largest chunk the inbound side can produce
    pub chunk_limit: usize,
}

impl DispatcherConfig {
    pub fn new(routes: Vec<RouteConfig>) -> Self {
        Self {
            routes,
            chunk_limit: DEFAULT_READ_BUFFER,
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    routes: Vec<Route>,
    chunk_limit: usize,
}

impl DispatcherBuilder {
    /// Resolve every configured route, loading TLS material
    #[instrument(
        name = "dispatcher_builder_new",
        skip(config),
        fields(route_count = config.routes.len())
    )]
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatcherError> {
        let routes = config
            .routes
            .into_iter()
            .map(Route::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            routes,
            chunk_limit: config.chunk_limit,
        })
    }

    /// Start from already-resolved routes
    pub fn from_routes(routes: Vec<Route>) -> Self {
        Self {
            routes,
            chunk_limit: DEFAULT_READ_BUFFER,
        }
    }

    /// Override the largest chunk a worker can read back
    pub fn chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = limit.max(1);
        self
    }

    /// Create every route buffer, then spawn one worker per route
    ///
    /// Nothing is spawned unless every buffer could be created.
    #[instrument(name = "dispatcher_builder_start", skip(self))]
    pub fn start(self) -> Result<Dispatcher, DispatcherError> {
        if self.routes.is_empty() {
            return Err(DispatcherError::NoRoutes);
        }

        let mut handles = Vec::with_capacity(self.routes.len());
        let mut workers = Vec::with_capacity(self.routes.len());
        for (index, route) in self.routes.into_iter().enumerate() {
            let config = route.config();
            let (sink, source) = route_channel(
                route.policy().copied(),
                config.buffer_capacity,
                config.queue_capacity,
            )
            .map_err(|e| DispatcherError::route_config(route.name(), e))?;

            let metrics = Arc::new(RouteMetrics::new());
            handles.push(RouteHandle::new(route.name(), sink, Arc::clone(&metrics)));
            workers.push(RouteWorker::new(
                index,
                Arc::new(route),
                source,
                metrics,
                self.chunk_limit,
            ));
        }

        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(workers.len());
        for worker in workers {
            let name = worker.name().to_string();
            let abort = tasks.spawn(worker.run());
            names.insert(abort.id(), name);
        }

        info!(routes = names.len(), "Dispatcher started");

        Ok(Dispatcher {
            fanout: FanOut::new(handles),
            tasks,
            names,
        })
    }
}

/// Running route workers plus the fan-out that feeds them
pub struct Dispatcher {
    fanout: FanOut,
    tasks: JoinSet<Result<RouteReport, DispatcherError>>,
    names: HashMap<Id, String>,
}

impl Dispatcher {
    /// Sink to hand to the inbound listener
    pub fn fanout(&self) -> FanOut {
        self.fanout.clone()
    }

    /// Get metrics for all routes
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.fanout
            .handles()
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Drive the dispatcher until the inbound stream ends or a route fails
    ///
    /// On inbound end every route is closed and drained. On the first route
    /// failure the inbound future is dropped and the rest are closed and
    /// joined. Returns the first error, or one report per route in
    /// configuration order.
    #[instrument(name = "dispatcher_wait", skip_all)]
    pub async fn wait<F>(self, inbound: F) -> Result<Vec<RouteReport>, DispatcherError>
    where
        F: Future<Output = Result<(), ContractError>>,
    {
        let Dispatcher {
            fanout,
            mut tasks,
            names,
        } = self;
        tokio::pin!(inbound);

        let mut reports = Vec::with_capacity(names.len());
        let mut failure: Option<DispatcherError> = None;

        loop {
            tokio::select! {
                result = &mut inbound => {
                    match result {
                        Ok(()) => info!("Inbound stream ended"),
                        Err(e) => {
                            error!(error = %e, "Inbound stream failed");
                            failure = Some(DispatcherError::Inbound(e));
                        }
                    }
                    break;
                }
                Some(joined) = tasks.join_next_with_id() => {
                    match flatten(&names, joined) {
                        Ok(report) => reports.push(report),
                        Err(e) => {
                            error!(error = %e, "Route failed, stopping relay");
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }
        }

        fanout.close_all();

        while let Some(joined) = tasks.join_next_with_id().await {
            match flatten(&names, joined) {
                Ok(report) => reports.push(report),
                Err(e) if failure.is_none() => failure = Some(e),
                Err(e) => warn!(error = %e, "Additional route failure"),
            }
        }

        match failure {
            Some(e) => Err(e),
            None => {
                reports.sort_by_key(|r| r.index);
                info!(routes = reports.len(), "Dispatcher shutdown complete");
                Ok(reports)
            }
        }
    }
}

fn flatten(
    names: &HashMap<Id, String>,
    joined: Result<(Id, Result<RouteReport, DispatcherError>), JoinError>,
) -> Result<RouteReport, DispatcherError> {
    match joined {
        Ok((_, result)) => result,
        Err(e) => Err(DispatcherError::WorkerPanicked {
            route: names.get(&e.id()).cloned().unwrap_or_default(),
        }),
    }
}

/// Convenience function to resolve and start a dispatcher from route configs
#[instrument(name = "dispatcher_create", skip(route_configs))]
pub fn create_dispatcher(route_configs: Vec<RouteConfig>) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::new(DispatcherConfig::new(route_configs))?.start()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::WorkerState;
    use contracts::{Protocol, StreamSink};
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, UdpSocket};
    use tokio::time::sleep;

    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_no_routes() {
        assert!(matches!(
            create_dispatcher(Vec::new()),
            Err(DispatcherError::NoRoutes)
        ));
    }

    #[tokio::test]
    async fn test_dispatcher_fanout_to_two_routes() {
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let routes = vec![
            RouteConfig::new("udp", Protocol::Udp, a.local_addr().unwrap().to_string()),
            RouteConfig::new("tcp", Protocol::Tcp, b.local_addr().unwrap().to_string())
                .with_delay(Duration::from_millis(20)),
        ];

        let tcp_reader = tokio::spawn(async move {
            let (mut stream, _) = b.accept().await.unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).await.unwrap();
            received
        });

        let dispatcher = create_dispatcher(routes).unwrap();
        let mut fanout = dispatcher.fanout();
        let inbound = async move {
            for i in 0..5u8 {
                fanout.write(&[i; 4]).await?;
            }
            fanout.close().await
        };

        let reports = dispatcher.wait(inbound).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].name, "udp");
        assert_eq!(reports[1].name, "tcp");
        assert!(reports.iter().all(|r| r.metrics.sent_count == 5));
        assert!(reports.iter().all(|r| r.metrics.state == WorkerState::Closed));

        let expected: Vec<u8> = (0..5u8).flat_map(|i| [i; 4]).collect();
        assert_eq!(tcp_reader.await.unwrap(), expected);

        let mut buf = [0u8; 16];
        let n = a.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0u8; 4]);
    }

    #[tokio::test]
    async fn test_route_failure_ends_wait() {
        let routes = vec![RouteConfig::new("down", Protocol::Tcp, closed_port().await)];
        let dispatcher = create_dispatcher(routes).unwrap();

        let err = dispatcher
            .wait(std::future::pending::<Result<(), ContractError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatcherError::Dial { ref route, .. } if route == "down"));
    }

    #[tokio::test]
    async fn test_transmit_failure_closes_sibling_routes() {
        let peer = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let routes = vec![
            RouteConfig::new("tcp", Protocol::Tcp, peer.local_addr().unwrap().to_string()),
            RouteConfig::new("udp", Protocol::Udp, receiver.local_addr().unwrap().to_string())
                .with_delay(Duration::from_millis(20)),
        ];

        // Peer hangs up right after accepting
        tokio::spawn(async move {
            let (stream, _) = peer.accept().await.unwrap();
            drop(stream);
        });

        let dispatcher = create_dispatcher(routes).unwrap();
        let tcp_metrics = Arc::clone(dispatcher.fanout().handles()[0].metrics());
        let udp_metrics = Arc::clone(dispatcher.fanout().handles()[1].metrics());
        let mut fanout = dispatcher.fanout();
        let inbound = async move {
            for i in 0..200u8 {
                fanout.write(&[i; 8]).await?;
                sleep(Duration::from_millis(20)).await;
            }
            std::future::pending::<Result<(), ContractError>>().await
        };

        let err = tokio::time::timeout(Duration::from_secs(10), dispatcher.wait(inbound))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, DispatcherError::Transmit { ref route, .. } if route == "tcp"));
        assert_eq!(tcp_metrics.state(), WorkerState::Failed);
        assert_eq!(udp_metrics.state(), WorkerState::Closed);
        assert!(udp_metrics.snapshot().sent_count >= 1);
    }

    #[tokio::test]
    async fn test_inbound_error_is_reported() {
        let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let routes = vec![RouteConfig::new(
            "udp",
            Protocol::Udp,
            sink.local_addr().unwrap().to_string(),
        )];
        let dispatcher = create_dispatcher(routes).unwrap();
        let metrics = dispatcher.metrics();
        assert_eq!(metrics.len(), 1);

        let err = dispatcher
            .wait(async { Err(ContractError::inbound("127.0.0.1:1", "reset")) })
            .await
            .unwrap_err();
        assert!(matches!(err, DispatcherError::Inbound(_)));
    }
}
