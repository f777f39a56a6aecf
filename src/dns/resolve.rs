//! Core DNS resolution types and traits.
//!
//! This module defines the `Resolve` trait the predictor dispatches
//! speculative lookups through, and the normalized [`Name`] used as the
//! predictor's cache key.

use crate::base::neterror::NetError;
use std::{collections::HashMap, fmt, future::Future, net::SocketAddr, pin::Pin, sync::Arc};
use url::{Host, Url};

/// A normalized hostname.
///
/// Hostnames are ASCII-lowercased and stripped of a trailing root dot, so
/// `Example.COM.` and `example.com` compare equal and hash to the same slot.
/// IPv6 literals are kept bare (`::1`, never `[::1]`).
#[derive(Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    /// Creates a new [`Name`], normalizing the hostname.
    ///
    /// A bracketed IPv6 literal (`[::1]`) loses its brackets, since
    /// resolvers only accept the bare address.
    pub fn new(host: impl AsRef<str>) -> Self {
        let host = host.as_ref();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        let trimmed = host.strip_suffix('.').unwrap_or(host);
        Self { host: trimmed.to_ascii_lowercase().into_boxed_str() }
    }

    /// Extracts the host of `url`, if it has one.
    pub fn from_url(url: &Url) -> Option<Self> {
        match url.host()? {
            Host::Domain(domain) if domain.is_empty() => None,
            Host::Domain(domain) => Some(Self::new(domain)),
            Host::Ipv4(addr) => Some(Self::new(addr.to_string())),
            Host::Ipv6(addr) => Some(Self::new(addr.to_string())),
        }
    }

    /// View the hostname as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.host, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// Alias for an `Iterator` trait object over `SocketAddr`.
pub type Addrs = Box<dyn Iterator<Item = SocketAddr> + Send>;

/// Alias for the `Future` type returned by a DNS resolver.
pub type Resolving = Pin<Box<dyn Future<Output = Result<Addrs, NetError>> + Send>>;

/// Trait for DNS resolution, equivalent to Chromium's `HostResolver`.
///
/// The predictor polls the returned future exactly once when dispatching. A
/// future that is immediately ready (a host cache hit, an override, an
/// immediate failure) is treated as a synchronous completion and does not
/// occupy a concurrency slot. Anything else is spawned and counted as a
/// pending lookup until it finishes.
pub trait Resolve: Send + Sync {
    /// Resolves a domain name to IP addresses.
    ///
    /// The returned addresses will have port 0.
    fn resolve(&self, name: Name) -> Resolving;
}

impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, name: Name) -> Resolving {
        (**self).resolve(name)
    }
}

/// DNS resolver wrapper that answers some hostnames from a fixed table.
///
/// Overridden names complete synchronously, everything else is forwarded to
/// the inner resolver.
pub struct DnsResolverWithOverrides {
    inner: Arc<dyn Resolve>,
    overrides: Arc<HashMap<Name, Vec<SocketAddr>>>,
}

impl DnsResolverWithOverrides {
    /// Creates a new resolver with the given overrides.
    ///
    /// An override with an empty address list makes the name fail with
    /// [`NetError::NameNotResolved`].
    pub fn new(inner: Arc<dyn Resolve>, overrides: HashMap<Name, Vec<SocketAddr>>) -> Self {
        Self { inner, overrides: Arc::new(overrides) }
    }

    /// Returns the number of configured overrides.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }
}

impl Resolve for DnsResolverWithOverrides {
    fn resolve(&self, name: Name) -> Resolving {
        if let Some(addrs) = self.overrides.get(&name) {
            let result = if addrs.is_empty() {
                Err(NetError::NameNotResolved)
            } else {
                Ok(Box::new(addrs.clone().into_iter()) as Addrs)
            };
            return Box::pin(std::future::ready(result));
        }
        self.inner.resolve(name)
    }
}

impl fmt::Debug for DnsResolverWithOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsResolverWithOverrides")
            .field("override_count", &self.overrides.len())
            .finish_non_exhaustive()
    }
}
