//! `relay` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::RelayArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

use super::load_blueprint;

/// Execute the `relay` command
pub async fn run_relay(args: &RelayArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let blueprint = load_blueprint(&args.config)?;

    info!(
        inbound = %blueprint.inbound.address,
        protocol = %blueprint.inbound.protocol,
        routes = blueprint.routes.len(),
        delayed = blueprint.delayed_routes().count(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    info!("Starting relay...");

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Relay execution failed")?;

    info!(
        duration_secs = stats.duration.as_secs_f64(),
        bytes_in = stats.inbound.bytes,
        routes = stats.routes.len(),
        "Relay completed"
    );
    stats.print_summary();

    info!("duplicate finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::RelayBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Inbound:");
    println!(
        "  {} {}{}",
        blueprint.inbound.protocol,
        blueprint.inbound.address,
        if blueprint.inbound.tls.is_some() { " (tls)" } else { "" }
    );
    if let Some(ref ifi) = blueprint.inbound.interface {
        println!("  Interface: {ifi}");
    }

    println!("\nRoutes ({}):", blueprint.routes.len());
    for route in &blueprint.routes {
        let transport = match (route.protocol, route.tls.is_some()) {
            (contracts::Protocol::Tcp, true) => "tls".to_string(),
            (protocol, _) => protocol.to_string(),
        };
        let delay = if route.is_delayed() {
            format!("{} ms{}", route.delay_ms, if route.replay { " replay" } else { "" })
        } else {
            "pass-through".to_string()
        };
        println!("  - {} -> {} {} ({})", route.name, transport, route.address, delay);
    }

    println!();
}
