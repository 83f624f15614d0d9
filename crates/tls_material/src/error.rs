//! TLS error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors while loading TLS material or building configurations
#[derive(Debug, Error)]
pub enum TlsError {
    /// PEM file could not be read
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PEM content could not be parsed
    #[error("malformed pem in {origin}: {source}")]
    Pem {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    /// PEM content held nothing usable
    #[error("no {what} found in {origin}")]
    Empty { what: &'static str, origin: String },

    /// A policy needs material that was not supplied
    #[error("{policy} requires {what}")]
    Missing {
        policy: &'static str,
        what: &'static str,
    },

    /// Name not usable for SNI / verification
    #[error("invalid server name '{0}'")]
    ServerName(String),

    /// rustls rejected the configuration
    #[error("rustls: {0}")]
    Rustls(#[from] rustls::Error),

    /// Client verifier could not be built
    #[error("client verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

impl From<TlsError> for contracts::ContractError {
    fn from(e: TlsError) -> Self {
        contracts::ContractError::tls(e.to_string())
    }
}
