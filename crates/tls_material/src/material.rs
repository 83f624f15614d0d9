//! TlsMaterial - loaded certificates, keys and trust anchors

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use contracts::{ClientAuth, TlsConfig, TrustPolicy};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio_rustls::{TlsAcceptor, TlsConnector};
use tracing::{debug, warn};

use crate::verifier::{AcceptAnyServerCert, AnyClientCert};
use crate::TlsError;

/// Certificates, key, trust anchors and policies for one endpoint
pub struct TlsMaterial {
    certs: Vec<CertificateDer<'static>>,
    key: Option<PrivateKeyDer<'static>>,
    roots: Vec<CertificateDer<'static>>,
    server_name: Option<String>,
    trust: TrustPolicy,
    client_auth: ClientAuth,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("certs", &self.certs.len())
            .field("key", &self.key.is_some())
            .field("roots", &self.roots.len())
            .field("server_name", &self.server_name)
            .field("trust", &self.trust)
            .field("client_auth", &self.client_auth)
            .finish()
    }
}

impl TlsMaterial {
    /// Load the PEM files named by `config`
    pub fn load(config: &TlsConfig) -> Result<Self, TlsError> {
        let certs = match &config.cert {
            Some(path) => parse_certs(&read_file(path)?, &path.display().to_string())?,
            None => Vec::new(),
        };
        let key = match &config.key {
            Some(path) => Some(parse_key(&read_file(path)?, &path.display().to_string())?),
            None => None,
        };
        let roots = match &config.ca {
            Some(path) => parse_certs(&read_file(path)?, &path.display().to_string())?,
            None => Vec::new(),
        };

        debug!(
            certs = certs.len(),
            roots = roots.len(),
            trust = ?config.trust,
            client_auth = ?config.client_auth,
            "TLS material loaded"
        );

        Ok(Self {
            certs,
            key,
            roots,
            server_name: config.server_name.clone(),
            trust: config.trust,
            client_auth: config.client_auth,
        })
    }

    /// Build material from in-memory PEM blobs
    pub fn from_pem(
        cert: Option<&[u8]>,
        key: Option<&[u8]>,
        ca: Option<&[u8]>,
    ) -> Result<Self, TlsError> {
        Ok(Self {
            certs: cert.map(|c| parse_certs(c, "certificate pem")).transpose()?.unwrap_or_default(),
            key: key.map(|k| parse_key(k, "key pem")).transpose()?,
            roots: ca.map(|c| parse_certs(c, "ca pem")).transpose()?.unwrap_or_default(),
            server_name: None,
            trust: TrustPolicy::default(),
            client_auth: ClientAuth::default(),
        })
    }

    /// Override the server verification policy
    pub fn with_trust(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    /// Override the client verification policy
    pub fn with_client_auth(mut self, client_auth: ClientAuth) -> Self {
        self.client_auth = client_auth;
        self
    }

    /// Override the SNI / verification name
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Name presented for SNI, falling back to the dialed host
    pub fn server_name(&self, host: &str) -> Result<ServerName<'static>, TlsError> {
        let name = self
            .server_name
            .clone()
            .unwrap_or_else(|| host.to_string());
        ServerName::try_from(name.clone()).map_err(|_| TlsError::ServerName(name))
    }

    /// rustls client configuration for outbound routes
    pub fn client_config(&self) -> Result<ClientConfig, TlsError> {
        install_provider();
        let builder = ClientConfig::builder();

        match self.trust {
            TrustPolicy::Verify => Ok(builder
                .with_root_certificates(self.server_roots()?)
                .with_no_client_auth()),
            TrustPolicy::Mutual => {
                let (certs, key) = self.identity("mutual trust")?;
                Ok(builder
                    .with_root_certificates(self.server_roots()?)
                    .with_client_auth_cert(certs, key)?)
            }
            TrustPolicy::Insecure => {
                warn!("Server certificate verification disabled");
                let builder = builder
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert::new()));
                match self.identity("insecure trust") {
                    Ok((certs, key)) => Ok(builder.with_client_auth_cert(certs, key)?),
                    Err(_) => Ok(builder.with_no_client_auth()),
                }
            }
        }
    }

    /// rustls server configuration for the inbound listener
    pub fn server_config(&self) -> Result<ServerConfig, TlsError> {
        install_provider();
        let (certs, key) = self.identity("tls listener")?;
        let builder = ServerConfig::builder();

        let builder = match self.client_auth {
            ClientAuth::None => builder.with_no_client_auth(),
            ClientAuth::Request => {
                builder.with_client_cert_verifier(Arc::new(AnyClientCert::new(false)))
            }
            ClientAuth::RequireAny => {
                builder.with_client_cert_verifier(Arc::new(AnyClientCert::new(true)))
            }
            ClientAuth::VerifyIfGiven => builder.with_client_cert_verifier(
                WebPkiClientVerifier::builder(Arc::new(self.client_roots()?))
                    .allow_unauthenticated()
                    .build()?,
            ),
            ClientAuth::RequireAndVerify => builder.with_client_cert_verifier(
                WebPkiClientVerifier::builder(Arc::new(self.client_roots()?)).build()?,
            ),
        };

        Ok(builder.with_single_cert(certs, key)?)
    }

    /// Connector wrapping `client_config`
    pub fn connector(&self) -> Result<TlsConnector, TlsError> {
        Ok(TlsConnector::from(Arc::new(self.client_config()?)))
    }

    /// Acceptor wrapping `server_config`
    pub fn acceptor(&self) -> Result<TlsAcceptor, TlsError> {
        Ok(TlsAcceptor::from(Arc::new(self.server_config()?)))
    }

    fn identity(
        &self,
        policy: &'static str,
    ) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsError> {
        if self.certs.is_empty() {
            return Err(TlsError::Missing {
                policy,
                what: "a certificate",
            });
        }
        let key = self.key.as_ref().ok_or(TlsError::Missing {
            policy,
            what: "a private key",
        })?;
        Ok((self.certs.clone(), key.clone_key()))
    }

    fn server_roots(&self) -> Result<RootCertStore, TlsError> {
        let mut store = RootCertStore::empty();
        if self.roots.is_empty() {
            store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        } else {
            for cert in &self.roots {
                store.add(cert.clone())?;
            }
        }
        Ok(store)
    }

    fn client_roots(&self) -> Result<RootCertStore, TlsError> {
        if self.roots.is_empty() {
            return Err(TlsError::Missing {
                policy: "client verification",
                what: "a ca bundle",
            });
        }
        let mut store = RootCertStore::empty();
        for cert in &self.roots {
            store.add(cert.clone())?;
        }
        Ok(store)
    }
}

fn install_provider() {
    // Fails only when a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn read_file(path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_certs(pem: &[u8], origin: &str) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Pem {
            origin: origin.to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::Empty {
            what: "certificate",
            origin: origin.to_string(),
        });
    }
    Ok(certs)
}

fn parse_key(pem: &[u8], origin: &str) -> Result<PrivateKeyDer<'static>, TlsError> {
    rustls_pemfile::private_key(&mut &pem[..])
        .map_err(|source| TlsError::Pem {
            origin: origin.to_string(),
            source,
        })?
        .ok_or_else(|| TlsError::Empty {
            what: "private key",
            origin: origin.to_string(),
        })
}
