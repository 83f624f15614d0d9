//! TLS material paths relative to the config file

use std::path::Path;

use contracts::RelayBlueprint;

/// Rewrite relative `cert`/`key`/`ca` paths of the inbound and every route
/// so they point inside `base`. Absolute paths are left alone.
pub(crate) fn anchor_tls_paths(blueprint: &mut RelayBlueprint, base: &Path) {
    let inbound = blueprint.inbound.tls.iter_mut();
    let routes = blueprint.routes.iter_mut().filter_map(|r| r.tls.as_mut());

    for tls in inbound.chain(routes) {
        for path in [&mut tls.cert, &mut tls.key, &mut tls.ca]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{InboundConfig, Protocol, RouteConfig, TlsConfig};
    use std::path::PathBuf;

    fn tls(cert: &str, key: &str, ca: Option<&str>) -> TlsConfig {
        TlsConfig {
            cert: Some(PathBuf::from(cert)),
            key: Some(PathBuf::from(key)),
            ca: ca.map(PathBuf::from),
            ..TlsConfig::default()
        }
    }

    #[test]
    fn test_relative_paths_anchored_everywhere() {
        let mut bp = RelayBlueprint {
            version: Default::default(),
            inbound: InboundConfig::new(Protocol::Tcp, "0.0.0.0:4000")
                .with_tls(tls("server.pem", "/abs/server.key", None)),
            routes: vec![
                RouteConfig::new("plain", Protocol::Udp, "127.0.0.1:1"),
                RouteConfig::new("secure", Protocol::Tcp, "127.0.0.1:2")
                    .with_tls(tls("certs/client.pem", "certs/client.key", Some("ca.pem"))),
            ],
        };

        anchor_tls_paths(&mut bp, Path::new("/etc/duplicate"));

        let inbound = bp.inbound.tls.as_ref().unwrap();
        assert_eq!(inbound.cert, Some(PathBuf::from("/etc/duplicate/server.pem")));
        assert_eq!(inbound.key, Some(PathBuf::from("/abs/server.key")));
        assert_eq!(inbound.ca, None);

        assert!(bp.routes[0].tls.is_none());
        let route = bp.routes[1].tls.as_ref().unwrap();
        assert_eq!(route.cert, Some(PathBuf::from("/etc/duplicate/certs/client.pem")));
        assert_eq!(route.key, Some(PathBuf::from("/etc/duplicate/certs/client.key")));
        assert_eq!(route.ca, Some(PathBuf::from("/etc/duplicate/ca.pem")));
    }
}
