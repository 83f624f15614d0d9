//! # TLS Material
//!
//! Loads PEM certificates and keys and turns them into rustls client/server
//! configurations according to the configured trust and client-auth policies.
//!
//! The rest of the relay only asks for a `TlsConnector` (outbound routes)
//! or a `TlsAcceptor` (inbound listener).

mod error;
mod material;
mod verifier;

pub use error::TlsError;
pub use material::TlsMaterial;
pub use rustls_pki_types::ServerName;
pub use tokio_rustls::{client, server, TlsAcceptor, TlsConnector};
