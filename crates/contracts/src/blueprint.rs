//! RelayBlueprint - Config Loader output
//!
//! Describes the complete relay: one inbound stream, N routes.

use serde::{Deserialize, Serialize};

use crate::{InboundConfig, RouteConfig};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Source stream
    pub inbound: InboundConfig,

    /// Destinations, in configuration order
    pub routes: Vec<RouteConfig>,
}

impl RelayBlueprint {
    /// Routes that buffer through a ring
    pub fn delayed_routes(&self) -> impl Iterator<Item = &RouteConfig> {
        self.routes.iter().filter(|r| r.is_delayed())
    }

    /// Look up a route by name
    pub fn route(&self, name: &str) -> Option<&RouteConfig> {
        self.routes.iter().find(|r| r.name == name)
    }
}
