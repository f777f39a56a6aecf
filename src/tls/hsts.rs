//! HTTP Strict Transport Security (HSTS) state.
//!
//! The predictor only ever asks one question of this state: must a plain
//! `http` URL for a host be upgraded before connecting? [`TransportSecurity`]
//! is that read-only seam; [`HstsStore`] is the in-memory implementation,
//! holding preloaded domains. Learning entries from `Strict-Transport-Security`
//! headers belongs to the embedder's own HSTS state, which can be plugged in
//! through the trait instead.
//!
//! Based on Chromium's TransportSecurityState.

use dashmap::DashMap;
use std::sync::Arc;

/// Read-only view of transport security state.
pub trait TransportSecurity: Send + Sync {
    /// True if connections to `host` must use HTTPS.
    fn should_upgrade_to_https(&self, host: &str) -> bool;
}

impl<T: TransportSecurity + ?Sized> TransportSecurity for Arc<T> {
    fn should_upgrade_to_https(&self, host: &str) -> bool {
        (**self).should_upgrade_to_https(host)
    }
}

/// Thread-safe HSTS store.
///
/// Maps a domain to whether its subdomains are covered too.
#[derive(Clone, Default)]
pub struct HstsStore {
    entries: Arc<DashMap<String, bool>>,
}

impl std::fmt::Debug for HstsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HstsStore").field("entries", &self.entries.len()).finish()
    }
}

impl HstsStore {
    /// Create a new empty HSTS store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an HSTS store with a few well-known preloaded domains.
    pub fn with_preload() -> Self {
        let store = Self::new();
        for domain in [
            "google.com",
            "youtube.com",
            "facebook.com",
            "twitter.com",
            "github.com",
            "paypal.com",
            "stripe.com",
            "cloudflare.com",
        ] {
            store.add_preloaded(domain, true);
        }
        store
    }

    /// Add a preloaded (permanent) HSTS entry.
    pub fn add_preloaded(&self, domain: &str, include_subdomains: bool) {
        self.entries.insert(normalize(domain), include_subdomains);
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn covers(&self, domain: &str, via_subdomain: bool) -> bool {
        self.entries
            .get(domain)
            .is_some_and(|include_subdomains| !via_subdomain || *include_subdomains)
    }
}

impl TransportSecurity for HstsStore {
    fn should_upgrade_to_https(&self, host: &str) -> bool {
        let host = normalize(host);
        if self.covers(&host, false) {
            return true;
        }
        host.match_indices('.').any(|(i, _)| self.covers(&host[i + 1..], true))
    }
}

fn normalize(host: &str) -> String {
    host.strip_suffix('.').unwrap_or(host).to_ascii_lowercase()
}
