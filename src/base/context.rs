//! Ergonomic error context helpers.
//!
//! Converts IO errors coming out of blocking or third-party resolvers into
//! `NetError` values, logging the host they were raised for.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding DNS context to IO Results.
pub trait IoResultExt<T> {
    /// Map an IO error raised while resolving `domain` to a `NetError`.
    ///
    /// # Example
    /// ```ignore
    /// use netpredictor::base::context::IoResultExt;
    ///
    /// let addrs = ("example.com", 0).to_socket_addrs().dns_context("example.com")?;
    /// ```
    fn dns_context(self, domain: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!(domain = %domain, error = %e, "DNS resolution failed");
            match e.kind() {
                io::ErrorKind::TimedOut => NetError::DnsTimedOut,
                io::ErrorKind::NotFound => NetError::NameNotResolved,
                io::ErrorKind::InvalidInput => NetError::InvalidUrl,
                _ => NetError::NameResolutionFailed,
            }
        })
    }
}
