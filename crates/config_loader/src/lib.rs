//! # Config Loader
//!
//! Relay configuration loading.
//!
//! Responsibilities:
//! - Parse TOML/JSON relay files into a `RelayBlueprint`
//! - Anchor relative TLS material paths at the config file's directory
//! - Validate the blueprint before any socket is opened
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("/etc/duplicate/relay.toml")).unwrap();
//! println!("Routes: {}", blueprint.routes.len());
//! ```

mod parser;
mod paths;
mod validator;

pub use contracts::RelayBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Relay configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a relay file, format chosen by extension (.toml / .json)
    ///
    /// Relative `cert`, `key` and `ca` paths of the inbound and of every
    /// route are rewritten against the directory holding `path`, so the
    /// relay does not depend on the working directory it was started from.
    ///
    /// # Errors
    /// - Unsupported extension or unreadable file
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RelayBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("cannot read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })?;

        let mut blueprint = parser::parse(&content, format)?;
        if let Some(dir) = path.parent() {
            paths::anchor_tls_paths(&mut blueprint, dir);
        }
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Load a relay blueprint from text
    ///
    /// TLS paths are kept as written.
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RelayBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Render a blueprint as TOML (used by `info` and round trips)
    pub fn to_toml(blueprint: &RelayBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("cannot render TOML: {e}")))
    }

    /// Render a blueprint as JSON
    pub fn to_json(blueprint: &RelayBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("cannot render JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Protocol;
    use std::io::Write;

    const MINIMAL_TOML: &str = r#"
[inbound]
protocol = "udp"
address = "0.0.0.0:31000"

[[routes]]
name = "live"
protocol = "udp"
address = "127.0.0.1:31001"

[[routes]]
name = "archive"
protocol = "tcp"
address = "127.0.0.1:4000"
delay_ms = 2000
replay = true
interval_ms = 5
[routes.tls]
ca = "ca.pem"
server_name = "archive.local"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.inbound.protocol, Protocol::Udp);
        assert_eq!(bp.routes.len(), 2);
        assert_eq!(bp.delayed_routes().count(), 1);
        let archive = bp.route("archive").unwrap();
        assert!(archive.replay);
        assert_eq!(archive.interval_ms, 5);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(MINIMAL_TOML.as_bytes()).unwrap();
        let bp = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(bp.routes[0].name, "live");

        let other = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(other.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_load_from_path_anchors_tls_at_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, MINIMAL_TOML).unwrap();

        let bp = ConfigLoader::load_from_path(&path).unwrap();
        let tls = bp.route("archive").unwrap().tls.as_ref().unwrap();
        assert_eq!(tls.ca.as_deref(), Some(dir.path().join("ca.pem").as_path()));

        // Text has no location to anchor against
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let tls = bp.route("archive").unwrap().tls.as_ref().unwrap();
        assert_eq!(tls.ca.as_deref(), Some(Path::new("ca.pem")));
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[inbound]
protocol = "udp"
address = "0.0.0.0:31000"

[[routes]]
name = "dup"
protocol = "udp"
address = "127.0.0.1:1"

[[routes]]
name = "dup"
protocol = "udp"
address = "127.0.0.1:2"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }
}
