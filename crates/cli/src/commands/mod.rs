//! Command implementations.

mod info;
mod relay;
mod split;
mod validate;

pub use info::run_info;
pub use relay::run_relay;
pub use split::{run_split, DEFAULT_SPLIT_SIZE};
pub(crate) use split::format_iec;
pub use validate::run_validate;

use std::path::Path;

use contracts::RelayBlueprint;

use crate::error::CliError;

/// Load and validate a configuration file, failing early on a missing path
pub(crate) fn load_blueprint(path: &Path) -> anyhow::Result<RelayBlueprint> {
    use anyhow::Context;

    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
