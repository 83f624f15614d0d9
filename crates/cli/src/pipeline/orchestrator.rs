//! Pipeline orchestrator - wires the inbound listener to the dispatcher.

use std::future::Future;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{ContractError, RelayBlueprint};
use dispatcher::{DispatcherBuilder, DispatcherConfig};
use ingestion::InboundListener;
use tracing::{info, instrument};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The relay blueprint
    pub blueprint: RelayBlueprint,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main relay orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the inbound stream ends, `shutdown` resolves, or a route fails
    ///
    /// `shutdown` is treated like the end of the inbound stream: every route
    /// drains what it already holds before this returns.
    #[instrument(name = "pipeline_run", skip_all)]
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let PipelineConfig {
            blueprint,
            metrics_port,
        } = self.config;

        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
        }

        // Bind first so a busy port fails before any route is dialed
        let listener = InboundListener::bind(&blueprint.inbound)
            .await
            .with_context(|| format!("Failed to bind inbound {}", blueprint.inbound.address))?;
        let inbound_metrics = listener.metrics();
        info!(
            address = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            transport = listener.transport(),
            "Inbound ready"
        );

        let dispatcher = DispatcherBuilder::new(DispatcherConfig {
            routes: blueprint.routes.clone(),
            chunk_limit: blueprint.inbound.read_buffer_size,
        })
        .and_then(DispatcherBuilder::start)
        .context("Failed to start routes")?;

        let mut fanout = dispatcher.fanout();
        let inbound = async move {
            tokio::select! {
                result = listener.run(&mut fanout) => result.map_err(ContractError::from),
                _ = shutdown => {
                    info!("Shutdown signal received, draining routes");
                    Ok(())
                }
            }
        };

        let routes = dispatcher.wait(inbound).await.map_err(CliError::relay)?;

        Ok(PipelineStats {
            duration: start_time.elapsed(),
            inbound: inbound_metrics.snapshot(),
            routes,
        })
    }
}
