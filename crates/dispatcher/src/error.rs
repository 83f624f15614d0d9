//! Dispatcher error types

use thiserror::Error;

use ring_buffer::RingError;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// No routes to dispatch to
    #[error("no routes configured")]
    NoRoutes,

    /// Route could not be constructed
    #[error("invalid route '{route}': {message}")]
    RouteConfig { route: String, message: String },

    /// Outbound connection could not be established
    #[error("route '{route}' failed to dial {address}: {source}")]
    Dial {
        route: String,
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Connection-oriented transmit failed
    #[error("route '{route}' transmit failed: {source}")]
    Transmit {
        route: String,
        #[source]
        source: std::io::Error,
    },

    /// Ring buffer read failed
    #[error("route '{route}' buffer read failed: {source}")]
    Ring {
        route: String,
        #[source]
        source: RingError,
    },

    /// Worker task panicked
    #[error("route '{route}' worker panicked")]
    WorkerPanicked { route: String },

    /// Inbound stream failed
    #[error("inbound stream failed: {0}")]
    Inbound(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a route construction error
    pub fn route_config(route: impl Into<String>, message: impl ToString) -> Self {
        Self::RouteConfig {
            route: route.into(),
            message: message.to_string(),
        }
    }

    /// Name of the route this error belongs to, if any
    pub fn route(&self) -> Option<&str> {
        match self {
            Self::RouteConfig { route, .. }
            | Self::Dial { route, .. }
            | Self::Transmit { route, .. }
            | Self::Ring { route, .. }
            | Self::WorkerPanicked { route } => Some(route),
            Self::NoRoutes | Self::Inbound(_) => None,
        }
    }
}
