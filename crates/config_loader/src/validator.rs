//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个 route，route name 非空且唯一
//! - 所有地址为 host:port，端口为数字
//! - 容量 > 0（buffer 仅对延迟 route 要求）
//! - tls 仅用于 tcp，interface 仅用于 udp，persistent 仅用于 tcp
//! - TLS 证书/密钥/CA 与所选策略一致

use std::collections::HashSet;

use contracts::{
    ContractError, InboundConfig, Protocol, RelayBlueprint, RouteConfig, TlsConfig, TrustPolicy,
};

/// 校验 RelayBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_inbound(&blueprint.inbound)?;
    validate_route_names(blueprint)?;
    for route in &blueprint.routes {
        validate_route(route)?;
    }
    Ok(())
}

/// 校验入站配置
fn validate_inbound(inbound: &InboundConfig) -> Result<(), ContractError> {
    validate_address("inbound.address", &inbound.address)?;

    if inbound.read_buffer_size == 0 {
        return Err(ContractError::config_validation(
            "inbound.read_buffer_size",
            "read_buffer_size must be > 0",
        ));
    }

    match inbound.protocol {
        Protocol::Udp => {
            if inbound.tls.is_some() {
                return Err(ContractError::config_validation(
                    "inbound.tls",
                    "tls requires protocol = \"tcp\"",
                ));
            }
            if inbound.persistent {
                return Err(ContractError::config_validation(
                    "inbound.persistent",
                    "persistent only applies to protocol = \"tcp\"",
                ));
            }
        }
        Protocol::Tcp => {
            if inbound.interface.is_some() {
                return Err(ContractError::config_validation(
                    "inbound.interface",
                    "interface only applies to protocol = \"udp\"",
                ));
            }
        }
    }

    if let Some(tls) = &inbound.tls {
        validate_server_tls("inbound.tls", tls)?;
        if inbound.handshake_timeout_ms == 0 {
            return Err(ContractError::config_validation(
                "inbound.handshake_timeout_ms",
                "handshake_timeout_ms must be > 0",
            ));
        }
    }
    Ok(())
}

/// 校验 route name 唯一性
fn validate_route_names(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    if blueprint.routes.is_empty() {
        return Err(ContractError::config_validation(
            "routes",
            "at least one route is required",
        ));
    }

    let mut seen = HashSet::new();
    for (i, route) in blueprint.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("routes[{i}].name"),
                "route name must not be empty",
            ));
        }
        if !seen.insert(route.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("routes[name={}]", route.name),
                "duplicate route name",
            ));
        }
    }
    Ok(())
}

/// 校验单个 route
fn validate_route(route: &RouteConfig) -> Result<(), ContractError> {
    let field = |name: &str| format!("routes[{}].{name}", route.name);

    validate_address(&field("address"), &route.address)?;

    if route.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            field("queue_capacity"),
            "queue_capacity must be > 0",
        ));
    }
    if route.is_delayed() && route.buffer_capacity == 0 {
        return Err(ContractError::config_validation(
            field("buffer_capacity"),
            "buffer_capacity must be > 0 for delayed routes",
        ));
    }

    if let Some(tls) = &route.tls {
        if route.protocol != Protocol::Tcp {
            return Err(ContractError::config_validation(
                field("tls"),
                "tls requires protocol = \"tcp\"",
            ));
        }
        if tls.trust == TrustPolicy::Mutual && (tls.cert.is_none() || tls.key.is_none()) {
            return Err(ContractError::config_validation(
                field("tls"),
                "trust = \"mutual\" requires cert and key",
            ));
        }
        if tls.cert.is_some() != tls.key.is_some() {
            return Err(ContractError::config_validation(
                field("tls"),
                "cert and key must be given together",
            ));
        }
    }
    Ok(())
}

/// 校验服务端 TLS 配置
fn validate_server_tls(field: &str, tls: &TlsConfig) -> Result<(), ContractError> {
    if tls.cert.is_none() || tls.key.is_none() {
        return Err(ContractError::config_validation(
            field,
            "inbound tls requires cert and key",
        ));
    }
    if tls.client_auth.needs_roots() && tls.ca.is_none() {
        return Err(ContractError::config_validation(
            format!("{field}.ca"),
            "client certificate verification requires ca",
        ));
    }
    Ok(())
}

/// 校验 host:port 格式
fn validate_address(field: &str, address: &str) -> Result<(), ContractError> {
    let valid = address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if valid {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("'{address}' is not host:port"),
        ))
    }
}
