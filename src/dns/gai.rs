//! System DNS resolver using getaddrinfo.
//!
//! Runs `getaddrinfo` on tokio's blocking pool. Every lookup is reported to
//! the predictor as pending, since the blocking task always has to be
//! scheduled before a result exists.

use super::{Addrs, Name, Resolve, Resolving};
use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

/// System DNS resolver using `getaddrinfo` in a thread pool.
#[derive(Clone, Debug, Default)]
pub struct GaiResolver;

impl GaiResolver {
    /// Creates a new `GaiResolver`.
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for GaiResolver {
    fn resolve(&self, name: Name) -> Resolving {
        // IP literals never need a lookup.
        if let Ok(ip) = name.as_str().parse::<IpAddr>() {
            let addrs: Addrs = Box::new(std::iter::once(SocketAddr::new(ip, 0)));
            return Box::pin(std::future::ready(Ok::<_, NetError>(addrs)));
        }

        Box::pin(async move {
            let host = name.as_str().to_string();
            let domain = host.clone();

            let addrs = tokio::task::spawn_blocking(move || {
                tracing::debug!(host = %host, "resolving via getaddrinfo");
                (host.as_str(), 0u16).to_socket_addrs().map(|iter| iter.collect::<Vec<_>>())
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "DNS resolution task failed");
                NetError::Aborted
            })?
            .dns_context(&domain)?;

            if addrs.is_empty() {
                return Err(NetError::NameNotResolved);
            }

            tracing::debug!(domain = %domain, count = addrs.len(), "DNS resolution complete");
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_ip_literal_is_synchronous() {
        let resolver = GaiResolver::new();
        let result = resolver.resolve(Name::new("127.0.0.1")).now_or_never();

        let addrs: Vec<_> = result.expect("literal should be ready").unwrap().collect();
        assert_eq!(addrs.len(), 1);
        assert!(addrs[0].ip().is_loopback());

        let v6 = resolver.resolve(Name::new("[::1]")).now_or_never();
        let addrs: Vec<_> = v6.expect("literal should be ready").unwrap().collect();
        assert!(addrs[0].ip().is_ipv6());
    }

    #[tokio::test]
    async fn test_gai_resolver_localhost() {
        let resolver = GaiResolver::new();
        let result = resolver.resolve(Name::new("localhost")).await;

        // Soft check: some sandboxes have no resolver configuration at all.
        if let Ok(addrs) = result {
            assert!(addrs.count() > 0);
        }
    }
}
