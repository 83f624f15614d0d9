//! TLS material descriptors
//!
//! Paths and policies only; loading happens in `tls_material`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TLS settings for an outbound route or an inbound listener
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM certificate chain (server identity, or client identity for mutual auth)
    #[serde(default)]
    pub cert: Option<PathBuf>,

    /// PEM private key matching `cert`
    #[serde(default)]
    pub key: Option<PathBuf>,

    /// PEM trust anchors (server roots for routes, client roots for listeners)
    #[serde(default)]
    pub ca: Option<PathBuf>,

    /// SNI / verification name override (routes only)
    #[serde(default)]
    pub server_name: Option<String>,

    /// Server verification policy (routes only)
    #[serde(default)]
    pub trust: TrustPolicy,

    /// Client verification policy (listeners only)
    #[serde(default)]
    pub client_auth: ClientAuth,
}

/// How an outbound route trusts the remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustPolicy {
    /// Verify the server chain against `ca` (or the webpki roots)
    #[default]
    Verify,
    /// Verify the server and present a client certificate
    Mutual,
    /// Accept any server certificate
    Insecure,
}

/// How an inbound TLS listener treats client certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuth {
    /// Do not ask for a client certificate
    #[default]
    None,
    /// Ask for a certificate, accept connections without one, do not verify it
    Request,
    /// Require a certificate, do not verify it
    RequireAny,
    /// Verify a certificate when the client sends one
    VerifyIfGiven,
    /// Require a certificate and verify it against `ca`
    RequireAndVerify,
}

impl ClientAuth {
    /// Whether this policy needs client trust anchors
    pub fn needs_roots(self) -> bool {
        matches!(self, Self::VerifyIfGiven | Self::RequireAndVerify)
    }
}
