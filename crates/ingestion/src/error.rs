//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 地址无法解析
    #[error("cannot resolve inbound address '{address}'")]
    Resolve {
        /// 配置的地址
        address: String,
    },

    /// 绑定失败
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// 加入组播组失败
    #[error("failed to join multicast group {group}: {source}")]
    Multicast {
        group: String,
        #[source]
        source: std::io::Error,
    },

    /// TLS 配置错误
    #[error("inbound tls: {0}")]
    Tls(String),

    /// accept 失败
    #[error("accept on {address} failed: {source}")]
    Accept {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// 连接读取失败
    #[error("read from {peer} failed: {source}")]
    Read {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    /// 下游 sink 拒绝写入
    #[error("sink failed: {0}")]
    Sink(#[from] ContractError),
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        let address = match &err {
            IngestionError::Sink(_) | IngestionError::Tls(_) => None,
            IngestionError::Resolve { address }
            | IngestionError::Bind { address, .. }
            | IngestionError::Accept { address, .. } => Some(address.clone()),
            IngestionError::Multicast { group, .. } => Some(group.clone()),
            IngestionError::Read { peer, .. } => Some(peer.clone()),
        };
        match (err, address) {
            (IngestionError::Sink(inner), _) => inner,
            (IngestionError::Tls(message), _) => ContractError::tls(message),
            (other, address) => {
                ContractError::inbound(address.unwrap_or_default(), other.to_string())
            }
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
