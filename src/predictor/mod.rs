//! Speculative DNS prefetch and preconnect.
//!
//! Based on Chromium's network predictor. Hosts a page is likely to need are
//! resolved ahead of any real request, and connections can be warmed up for
//! URLs the user is about to visit.
//!
//! # Architecture
//!
//! All mutable state (the per-host cache, the two-class work queue, and the
//! pending-lookup counter) lives in one tokio task. [`Predictor`] is a cheap,
//! cloneable handle that posts commands into that task, so it can be used
//! from any thread. Lookup completions are posted back the same way.
//!
//! - At most `max_concurrent_lookups` lookups are in flight at once.
//! - Rush-class hosts (hover, referral) are dispatched before background
//!   hosts (page scan, address bar, ...) waiting in the queue at the same
//!   time.
//! - If a host waited in the queue longer than `max_queue_delay`, the whole
//!   undispatched backlog is abandoned (congestion control).
//!
//! # Example
//!
//! ```rust,ignore
//! use netpredictor::predictor::{Predictor, ResolutionMotivation};
//!
//! let predictor = Predictor::builder().build();
//! predictor.dns_prefetch_list(["cdn.example.com", "api.example.com"]);
//! predictor.preconnect_url(
//!     "http://example.com/".parse()?,
//!     "https://example.com/".parse()?,
//!     ResolutionMotivation::Omnibox,
//!     true,
//!     1,
//! );
//! ```

pub mod config;
pub mod motivation;
pub mod queue;
mod scheduler;
pub mod urlinfo;

pub use self::config::{FeatureGate, PredictorConfig};
pub use self::scheduler::{PredictorStats, Results};
pub use motivation::{QueueClass, ResolutionMotivation};
pub use queue::HostNameQueue;
pub use urlinfo::{ResolutionState, UrlInfo};

use self::scheduler::{Command, Scheduler};
use crate::base::neterror::NetError;
use crate::dns::{HickoryResolver, Name, Resolve};
use crate::socket::preconnect::{NoPreconnect, Preconnect};
use crate::tls::hsts::{HstsStore, TransportSecurity};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use url::Url;

/// Handle to a running predictor.
///
/// Clones share the same predictor. The predictor task stops once every
/// handle has been dropped; lookups still in flight at that point finish
/// and their results are discarded.
///
/// # Ordering
///
/// Queue class only orders hosts that are waiting in the queue together.
/// Each call is posted to the predictor task on its own, so separate calls
/// race with it: on a multi-threaded runtime the task may handle an earlier
/// background call, and fill a free slot from it, before a later rush call
/// arrives. Calls made back to back on a current-thread runtime, with no
/// `.await` between them, are always handled as one batch.
#[derive(Clone)]
pub struct Predictor {
    sender: mpsc::UnboundedSender<Command>,
    gate: Arc<dyn FeatureGate>,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("enabled", &self.gate.is_prediction_enabled())
            .field("running", &!self.sender.is_closed())
            .finish()
    }
}

impl Predictor {
    /// Create a new predictor builder.
    pub fn builder() -> PredictorBuilder {
        PredictorBuilder::default()
    }

    /// Whether prediction is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.gate.is_prediction_enabled()
    }

    /// Prefetch bare hostnames found while scanning a page.
    ///
    /// Each hostname is treated as `http://<host>:80`. Entries that do not
    /// form a valid URL are skipped.
    pub fn dns_prefetch_list<I, S>(&self, hostnames: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.is_enabled() {
            return;
        }
        let urls: Vec<Url> = hostnames
            .into_iter()
            .filter_map(|host| {
                let host = host.as_ref();
                match Url::parse(&format!("http://{host}:80")) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::debug!(host = %host, error = %e, "skipping invalid prefetch host");
                        None
                    }
                }
            })
            .collect();
        self.dns_prefetch_motivated_list(&urls, ResolutionMotivation::PageScan);
    }

    /// Prefetch the hosts of `urls`. URLs without a host are skipped.
    pub fn dns_prefetch_motivated_list(&self, urls: &[Url], motivation: ResolutionMotivation) {
        if !self.is_enabled() {
            return;
        }
        let names: Vec<Name> = urls
            .iter()
            .filter_map(|url| {
                let name = Name::from_url(url);
                if name.is_none() {
                    tracing::debug!(url = %url, "skipping prefetch for URL without host");
                }
                name
            })
            .collect();
        if names.is_empty() {
            return;
        }
        self.post(Command::ResolveList { names, motivation });
    }

    /// Warm up `count` connections to `url`.
    ///
    /// Bypasses the DNS queue entirely: no deduplication and no concurrency
    /// cap. An `http` URL is upgraded to `https` first when HSTS requires it.
    ///
    /// # Panics
    ///
    /// Panics if `motivation` has no preconnect priority (page scan,
    /// startup list, static referral, no-prefetch). Those motivations never
    /// lead to a preconnect, so reaching here with one is a caller bug.
    pub fn preconnect_url(
        &self,
        url: Url,
        site_for_cookies: Url,
        motivation: ResolutionMotivation,
        allow_credentials: bool,
        count: u32,
    ) {
        let Some(priority) = motivation.request_priority() else {
            panic!("preconnect requested with unsupported motivation {motivation:?}");
        };
        if !self.is_enabled() {
            return;
        }
        if count == 0 {
            tracing::debug!(url = %url, "ignoring preconnect with zero connections");
            return;
        }
        self.post(Command::Preconnect { url, site_for_cookies, priority, allow_credentials, count });
    }

    /// Forget every speculative result and abandon the queue.
    ///
    /// Lookups already in flight still complete; their entries are removed
    /// when they do.
    pub fn discard_all_results(&self) {
        self.post(Command::DiscardAllResults);
    }

    /// Snapshot of the per-host cache.
    pub async fn results(&self) -> Result<Results, NetError> {
        self.query(Command::GetResults).await
    }

    /// Activity counters.
    pub async fn stats(&self) -> Result<PredictorStats, NetError> {
        self.query(Command::GetStats).await
    }

    /// Number of lookups currently in flight at the resolver.
    pub async fn pending_lookups(&self) -> Result<usize, NetError> {
        self.query(Command::GetPendingLookups).await
    }

    fn post(&self, command: Command) {
        if self.sender.send(command).is_err() {
            tracing::trace!("predictor task gone, dropping command");
        }
    }

    async fn query<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, NetError> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(make(tx)).map_err(|_| NetError::ContextShutDown)?;
        rx.await.map_err(|_| NetError::ContextShutDown)
    }
}

/// Builder for [`Predictor`].
///
/// Defaults: hickory-dns resolution, no preconnecting, the built-in HSTS
/// preload list, and a feature gate initialized from
/// [`PredictorConfig::enabled`].
#[derive(Default)]
pub struct PredictorBuilder {
    config: PredictorConfig,
    resolver: Option<Arc<dyn Resolve>>,
    connections: Option<Arc<dyn Preconnect>>,
    transport_security: Option<Arc<dyn TransportSecurity>>,
    gate: Option<Arc<dyn FeatureGate>>,
}

impl fmt::Debug for PredictorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictorBuilder")
            .field("config", &self.config)
            .field("resolver", &self.resolver.is_some())
            .field("connections", &self.connections.is_some())
            .field("transport_security", &self.transport_security.is_some())
            .field("gate", &self.gate.is_some())
            .finish()
    }
}

impl PredictorBuilder {
    pub fn config(mut self, config: PredictorConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolution service for speculative lookups.
    pub fn resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Connection service for preconnects.
    pub fn connections(mut self, connections: Arc<dyn Preconnect>) -> Self {
        self.connections = Some(connections);
        self
    }

    /// HSTS state consulted before preconnecting.
    pub fn transport_security(mut self, transport_security: Arc<dyn TransportSecurity>) -> Self {
        self.transport_security = Some(transport_security);
        self
    }

    /// Replace the default feature gate.
    pub fn feature_gate(mut self, gate: Arc<dyn FeatureGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Spawn the predictor task and return its handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn build(self) -> Predictor {
        let mut config = self.config;
        if config.validate().is_err() {
            tracing::warn!(
                max_concurrent_lookups = config.max_concurrent_lookups,
                "invalid predictor concurrency, clamping to 1"
            );
            config.max_concurrent_lookups = 1;
        }

        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(AtomicBool::new(config.enabled)) as Arc<dyn FeatureGate>);
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(HickoryResolver::new()) as Arc<dyn Resolve>);
        let connections =
            self.connections.unwrap_or_else(|| Arc::new(NoPreconnect) as Arc<dyn Preconnect>);
        let transport_security = self.transport_security.unwrap_or_else(|| {
            Arc::new(HstsStore::with_preload()) as Arc<dyn TransportSecurity>
        });

        let (sender, receiver) = mpsc::unbounded_channel();
        tracing::debug!(
            max_concurrent_lookups = config.max_concurrent_lookups,
            max_queue_delay_ms = config.max_queue_delay.as_millis() as u64,
            "starting predictor"
        );
        let scheduler =
            Scheduler::new(config, resolver, connections, transport_security, sender.downgrade());
        tokio::spawn(run(scheduler, receiver));

        Predictor { sender, gate }
    }
}

/// The predictor task: the only place predictor state is touched.
async fn run(mut scheduler: Scheduler, mut receiver: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = receiver.recv().await {
        scheduler.handle(command);
        while let Ok(command) = receiver.try_recv() {
            scheduler.handle(command);
        }
        scheduler.start_some_queued_resolutions();
    }
    tracing::debug!("predictor shut down");
}
