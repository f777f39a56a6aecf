//! Async DNS resolver using hickory-dns.
//!
//! The default resolution service for the predictor. hickory keeps its own
//! record cache, so a speculative lookup for a host resolved moments ago is
//! answered without touching the network.

use super::{Addrs, Name, Resolve, Resolving};
use crate::base::neterror::NetError;
use hickory_resolver::{
    config::{LookupIpStrategy, ResolverConfig},
    name_server::TokioConnectionProvider,
    ResolveError, TokioResolver,
};
use std::{
    net::SocketAddr,
    sync::{Arc, LazyLock},
};

static SYSTEM: LazyLock<Arc<TokioResolver>> = LazyLock::new(|| {
    let mut builder = TokioResolver::builder_tokio().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "no usable system DNS config, using defaults");
        TokioResolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        )
    });
    builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
    Arc::new(builder.build())
});

/// Async DNS resolver backed by hickory-dns.
///
/// [`HickoryResolver::new`] shares one process-wide resolver built from the
/// system configuration on first use. [`HickoryResolver::with_config`]
/// builds a dedicated one, e.g. to point speculative lookups at a specific
/// upstream.
#[derive(Debug, Clone)]
pub struct HickoryResolver {
    inner: Arc<TokioResolver>,
}

impl HickoryResolver {
    pub fn new() -> Self {
        Self { inner: SYSTEM.clone() }
    }

    /// Dedicated resolver for `config`, separate from the shared one.
    pub fn with_config(config: ResolverConfig) -> Self {
        let mut builder =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default());
        builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        Self { inner: Arc::new(builder.build()) }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// An empty answer means the name does not exist; anything else is a
/// failure to reach a verdict.
fn classify(e: &ResolveError) -> NetError {
    if e.is_no_records_found() {
        NetError::NameNotResolved
    } else {
        NetError::NameResolutionFailed
    }
}

impl Resolve for HickoryResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let inner = self.inner.clone();
        Box::pin(async move {
            let host = name.as_str();
            let lookup = inner.lookup_ip(host).await.map_err(|e| {
                tracing::debug!(host = %host, error = %e, "hickory lookup failed");
                classify(&e)
            })?;

            let addrs: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            if addrs.is_empty() {
                return Err(NetError::NameNotResolved);
            }
            tracing::trace!(host = %host, count = addrs.len(), "hickory lookup complete");
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}
