//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{Protocol, RelayBlueprint, RouteConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

use super::load_blueprint;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    inbound: InboundInfo,
    routes: Vec<RouteInfo>,
}

#[derive(Serialize)]
struct InboundInfo {
    protocol: String,
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    interface: Option<String>,
    tls: bool,
    persistent: bool,
    read_buffer_size: usize,
}

#[derive(Serialize)]
struct RouteInfo {
    name: String,
    transport: String,
    address: String,
    mode: String,
    delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<RouteDetail>,
}

#[derive(Serialize)]
struct RouteDetail {
    buffer_capacity: usize,
    queue_capacity: usize,
    interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tls_trust: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_name: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.resolved {
        let rendered = if args.json {
            ConfigLoader::to_json(&blueprint)
        } else {
            ConfigLoader::to_toml(&blueprint)
        }
        .context("Failed to render resolved configuration")?;
        println!("{}", rendered);
    } else if args.json {
        let info = build_config_info(&blueprint, args.routes);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args.routes);
    }

    Ok(())
}

fn transport(route: &RouteConfig) -> &'static str {
    match (route.protocol, route.tls.is_some()) {
        (Protocol::Udp, _) => "udp",
        (Protocol::Tcp, false) => "tcp",
        (Protocol::Tcp, true) => "tls",
    }
}

fn mode(route: &RouteConfig) -> &'static str {
    match (route.is_delayed(), route.replay) {
        (false, _) => "pass-through",
        (true, false) => "fixed",
        (true, true) => "replay",
    }
}

fn build_config_info(blueprint: &RelayBlueprint, detailed: bool) -> ConfigInfo {
    let inbound = &blueprint.inbound;
    let routes = blueprint
        .routes
        .iter()
        .map(|r| RouteInfo {
            name: r.name.clone(),
            transport: transport(r).to_string(),
            address: r.address.clone(),
            mode: mode(r).to_string(),
            delay_ms: r.delay_ms,
            detail: detailed.then(|| RouteDetail {
                buffer_capacity: r.buffer_capacity,
                queue_capacity: r.queue_capacity,
                interval_ms: r.interval_ms,
                tls_trust: r.tls.as_ref().map(|t| format!("{:?}", t.trust).to_lowercase()),
                server_name: r.tls.as_ref().and_then(|t| t.server_name.clone()),
            }),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        inbound: InboundInfo {
            protocol: inbound.protocol.to_string(),
            address: inbound.address.clone(),
            interface: inbound.interface.clone(),
            tls: inbound.tls.is_some(),
            persistent: inbound.persistent,
            read_buffer_size: inbound.read_buffer_size,
        },
        routes,
    }
}

fn print_config_info(blueprint: &RelayBlueprint, detailed: bool) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Duplicate Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let inbound = &blueprint.inbound;
    println!("📥 Inbound");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!(
        "   ├─ Listen: {} {}{}",
        inbound.protocol,
        inbound.address,
        if inbound.tls.is_some() { " (tls)" } else { "" }
    );
    if let Some(ref ifi) = inbound.interface {
        println!("   ├─ Interface: {}", ifi);
    }
    if inbound.protocol == Protocol::Tcp {
        println!(
            "   ├─ Mode: {}",
            if inbound.persistent { "persistent" } else { "single-shot" }
        );
    }
    println!("   └─ Read buffer: {} bytes", inbound.read_buffer_size);

    println!("\n📤 Routes ({})", blueprint.routes.len());
    for (i, route) in blueprint.routes.iter().enumerate() {
        let is_last = i == blueprint.routes.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} -> {} {} [{}{}]",
            prefix,
            route.name,
            transport(route),
            route.address,
            mode(route),
            if route.is_delayed() {
                format!(", {} ms", route.delay_ms)
            } else {
                String::new()
            }
        );

        if detailed {
            println!(
                "   {}  ├─ Queue: {} chunks",
                child_prefix, route.queue_capacity
            );
            if route.replay && route.interval_ms > 0 {
                println!("   {}  ├─ Interval: {} ms", child_prefix, route.interval_ms);
            }
            match &route.tls {
                Some(tls) => {
                    println!("   {}  ├─ Buffer: {} bytes", child_prefix, route.buffer_capacity);
                    println!(
                        "   {}  └─ TLS: {:?}{}",
                        child_prefix,
                        tls.trust,
                        tls.server_name
                            .as_deref()
                            .map(|n| format!(" (sni {n})"))
                            .unwrap_or_default()
                    );
                }
                None => {
                    println!("   {}  └─ Buffer: {} bytes", child_prefix, route.buffer_capacity);
                }
            }
        }
    }

    println!();
}
