//! Layered error definitions
//!
//! Categorized by source: config / tls / inbound

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== TLS Errors =====
    /// TLS material could not be loaded or assembled
    #[error("tls error: {message}")]
    Tls { message: String },

    // ===== Inbound Errors =====
    /// Inbound stream error
    #[error("inbound error on {address}: {message}")]
    Inbound { address: String, message: String },
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create TLS error
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls {
            message: message.into(),
        }
    }

    /// Create inbound error
    pub fn inbound(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Inbound {
            address: address.into(),
            message: message.into(),
        }
    }
}
