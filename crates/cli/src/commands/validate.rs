//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{Protocol, RelayBlueprint, TrustPolicy};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    inbound: String,
    route_count: usize,
    delayed_route_count: usize,
    tls_route_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::config_validation(result.error.unwrap_or_default()).into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    inbound: format!(
                        "{} {}",
                        blueprint.inbound.protocol, blueprint.inbound.address
                    ),
                    route_count: blueprint.routes.len(),
                    delayed_route_count: blueprint.delayed_routes().count(),
                    tls_route_count: blueprint.routes.iter().filter(|r| r.tls.is_some()).count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let read_size = blueprint.inbound.read_buffer_size;

    for route in &blueprint.routes {
        if route.is_delayed() && route.buffer_capacity < read_size {
            warnings.push(format!(
                "Route '{}' buffer_capacity ({}) is smaller than inbound read_buffer_size ({}) - large reads will be dropped",
                route.name, route.buffer_capacity, read_size
            ));
        }
        if !route.is_delayed() && (route.replay || route.interval_ms > 0) {
            warnings.push(format!(
                "Route '{}' has replay settings but delay_ms = 0 - it is a pass-through",
                route.name
            ));
        }
        if route.interval_ms > 0 && !route.replay {
            warnings.push(format!(
                "Route '{}' sets interval_ms without replay = true - interval is ignored",
                route.name
            ));
        }
        if route
            .tls
            .as_ref()
            .is_some_and(|tls| tls.trust == TrustPolicy::Insecure)
        {
            warnings.push(format!(
                "Route '{}' accepts any server certificate (trust = \"insecure\")",
                route.name
            ));
        }
        if route.address == blueprint.inbound.address
            && route.protocol == blueprint.inbound.protocol
        {
            warnings.push(format!(
                "Route '{}' sends to the inbound address - this loops the stream",
                route.name
            ));
        }
    }

    if blueprint.inbound.protocol == Protocol::Udp && blueprint.inbound.interface.is_some() {
        let multicast = blueprint
            .inbound
            .address
            .rsplit_once(':')
            .and_then(|(host, _)| host.trim_matches(['[', ']']).parse::<std::net::IpAddr>().ok())
            .is_some_and(|ip| ip.is_multicast());
        if !multicast {
            warnings.push("inbound.interface is only used for multicast groups".to_string());
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Inbound: {}", summary.inbound);
            println!("  Routes: {}", summary.route_count);
            println!("  Delayed routes: {}", summary.delayed_route_count);
            println!("  TLS routes: {}", summary.tls_route_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
