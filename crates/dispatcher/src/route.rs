//! Route - one resolved destination with its delay policy and transport settings

use std::fmt;

use contracts::{Protocol, RouteConfig};
use ring_buffer::DelayPolicy;
use tls_material::{ServerName, TlsConnector, TlsMaterial};
use tracing::debug;

use crate::DispatcherError;

/// TLS client side of a route, built once at construction
#[derive(Clone)]
pub struct TlsClient {
    pub(crate) connector: TlsConnector,
    pub(crate) server_name: ServerName<'static>,
}

impl fmt::Debug for TlsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsClient")
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

/// A fully resolved route, ready to be dispatched to
#[derive(Debug, Clone)]
pub struct Route {
    config: RouteConfig,
    host: String,
    policy: Option<DelayPolicy>,
    tls: Option<TlsClient>,
}

impl Route {
    /// Resolve a route from configuration, loading TLS material if present
    pub fn from_config(config: RouteConfig) -> Result<Self, DispatcherError> {
        let mut route = Self::resolve(config)?;
        if let Some(tls) = route.config.tls.clone() {
            let material = TlsMaterial::load(&tls)
                .map_err(|e| DispatcherError::route_config(&route.config.name, e))?;
            route = route.with_tls_material(material)?;
        }
        Ok(route)
    }

    /// Resolve a route ignoring its TLS section
    ///
    /// Used by callers that supply material directly via [`Route::with_tls_material`].
    pub fn resolve(config: RouteConfig) -> Result<Self, DispatcherError> {
        let name = config.name.clone();
        if name.is_empty() {
            return Err(DispatcherError::route_config(name, "route name must not be empty"));
        }
        let (host, _port) = split_host_port(&config.address).ok_or_else(|| {
            DispatcherError::route_config(
                &name,
                format!("address '{}' is not host:port", config.address),
            )
        })?;
        if config.queue_capacity == 0 {
            return Err(DispatcherError::route_config(&name, "queue_capacity must be > 0"));
        }
        let policy = DelayPolicy::from_route(config.delay(), config.interval(), config.replay);
        if policy.is_some() && config.buffer_capacity == 0 {
            return Err(DispatcherError::route_config(&name, "buffer_capacity must be > 0"));
        }

        Ok(Self {
            host: host.to_string(),
            config,
            policy,
            tls: None,
        })
    }

    /// Wrap the outbound connection in TLS using `material`
    pub fn with_tls_material(mut self, material: TlsMaterial) -> Result<Self, DispatcherError> {
        if self.config.protocol != Protocol::Tcp {
            return Err(DispatcherError::route_config(
                &self.config.name,
                "tls requires protocol = \"tcp\"",
            ));
        }
        let server_name = material
            .server_name(&self.host)
            .map_err(|e| DispatcherError::route_config(&self.config.name, e))?;
        let connector = material
            .connector()
            .map_err(|e| DispatcherError::route_config(&self.config.name, e))?;
        debug!(route = %self.config.name, server_name = ?server_name, "Route TLS configured");
        self.tls = Some(TlsClient {
            connector,
            server_name,
        });
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn protocol(&self) -> Protocol {
        self.config.protocol
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// `None` for pass-through routes
    pub fn policy(&self) -> Option<&DelayPolicy> {
        self.policy.as_ref()
    }

    pub fn tls(&self) -> Option<&TlsClient> {
        self.tls.as_ref()
    }

    /// Transport label for logs and metrics
    pub fn transport(&self) -> &'static str {
        match (self.config.protocol, self.tls.is_some()) {
            (Protocol::Udp, _) => "udp",
            (Protocol::Tcp, false) => "tcp",
            (Protocol::Tcp, true) => "tls",
        }
    }
}

/// Split `host:port`, stripping IPv6 brackets from the host
pub fn split_host_port(address: &str) -> Option<(&str, u16)> {
    let (host, port) = address.rsplit_once(':')?;
    let port = port.parse().ok()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return None;
    }
    Some((host, port))
}
