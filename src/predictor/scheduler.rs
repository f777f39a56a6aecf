//! Single-writer predictor state and the lookup scheduler.
//!
//! Everything here runs on the predictor task. Nothing in this module is
//! locked: the task owns the [`Scheduler`] and applies one command at a time.

use super::config::PredictorConfig;
use super::motivation::ResolutionMotivation;
use super::queue::HostNameQueue;
use super::urlinfo::UrlInfo;
use crate::dns::{Name, Resolve};
use crate::socket::preconnect::{Preconnect, PreconnectRequest, RequestPriority};
use crate::tls::hsts::TransportSecurity;
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use url::Url;

/// Snapshot of every host the predictor knows about.
pub type Results = HashMap<Name, UrlInfo>;

/// Counters describing predictor activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PredictorStats {
    /// Lookups handed to the resolver.
    pub dispatched: u64,
    /// Dispatched lookups whose result was available immediately.
    pub completed_synchronously: u64,
    pub found: u64,
    pub not_found: u64,
    /// Predictions ignored because the host was queued, in flight or fresh.
    pub deduplicated: u64,
    /// Times the whole backlog was abandoned.
    pub congestion_flushes: u64,
    /// Names pulled back out of the queue by congestion control.
    pub discarded_by_congestion: u64,
    /// Cache entries dropped because they expired or were left unresolved.
    pub expired: u64,
    pub preconnects: u64,
}

/// Messages posted into the predictor task.
pub(crate) enum Command {
    ResolveList {
        names: Vec<Name>,
        motivation: ResolutionMotivation,
    },
    Preconnect {
        url: Url,
        site_for_cookies: Url,
        priority: RequestPriority,
        allow_credentials: bool,
        count: u32,
    },
    LookupFinished {
        name: Name,
        found: bool,
    },
    DiscardAllResults,
    GetResults(oneshot::Sender<Results>),
    GetStats(oneshot::Sender<PredictorStats>),
    GetPendingLookups(oneshot::Sender<usize>),
}

pub(crate) struct Scheduler {
    config: PredictorConfig,
    resolver: Arc<dyn Resolve>,
    connections: Arc<dyn Preconnect>,
    transport_security: Arc<dyn TransportSecurity>,
    results: Results,
    work_queue: HostNameQueue,
    pending_lookups: usize,
    stats: PredictorStats,
    /// Route for async completions. Weak so that in-flight lookups do not
    /// keep a torn-down predictor alive.
    inbox: mpsc::WeakUnboundedSender<Command>,
}

impl Scheduler {
    pub(crate) fn new(
        config: PredictorConfig,
        resolver: Arc<dyn Resolve>,
        connections: Arc<dyn Preconnect>,
        transport_security: Arc<dyn TransportSecurity>,
        inbox: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            config,
            resolver,
            connections,
            transport_security,
            results: HashMap::new(),
            work_queue: HostNameQueue::new(),
            pending_lookups: 0,
            stats: PredictorStats::default(),
            inbox,
        }
    }

    /// Applies one command.
    ///
    /// Queueing commands do not drain by themselves; the task calls
    /// [`start_some_queued_resolutions`](Self::start_some_queued_resolutions)
    /// once its inbox is empty, so predictions that arrived in the same
    /// batch are ordered by queue class before anything is dispatched.
    /// Queries drain first so they observe a settled state.
    pub(crate) fn handle(&mut self, command: Command) {
        match command {
            Command::ResolveList { names, motivation } => self.resolve_list(names, motivation),
            Command::Preconnect { url, site_for_cookies, priority, allow_credentials, count } => {
                self.preconnect_url(url, site_for_cookies, priority, allow_credentials, count)
            }
            Command::LookupFinished { name, found } => self.on_lookup_finished(&name, found),
            Command::DiscardAllResults => self.discard_all_results(),
            Command::GetResults(reply) => {
                self.start_some_queued_resolutions();
                let _ = reply.send(self.results.clone());
            }
            Command::GetStats(reply) => {
                self.start_some_queued_resolutions();
                let _ = reply.send(self.stats);
            }
            Command::GetPendingLookups(reply) => {
                self.start_some_queued_resolutions();
                let _ = reply.send(self.pending_lookups);
            }
        }
    }

    fn resolve_list(&mut self, names: Vec<Name>, motivation: ResolutionMotivation) {
        self.prune_expired(Instant::now());
        for name in names {
            self.append_to_resolution_queue(name, motivation);
        }
    }

    /// Drops entries that would be resolved from scratch anyway: expired
    /// results and `Unfound` leftovers of a flush. Queued and in-flight
    /// entries stay, so the cache holds at most the fresh and active hosts.
    fn prune_expired(&mut self, now: Instant) {
        let expiration = self.config.cache_expiration;
        let before = self.results.len();
        self.results.retain(|_, info| !info.needs_dns_update(now, expiration));

        let pruned = (before - self.results.len()) as u64;
        if pruned > 0 {
            self.stats.expired += pruned;
            tracing::trace!(pruned, remaining = self.results.len(), "pruned expired DNS results");
        }
    }

    /// Queues `name` unless it is already queued, in flight, or fresh.
    ///
    /// Returns whether the name was queued.
    pub(crate) fn append_to_resolution_queue(
        &mut self,
        name: Name,
        motivation: ResolutionMotivation,
    ) -> bool {
        let now = Instant::now();
        let info = self.results.entry(name.clone()).or_insert_with(|| UrlInfo::new(name.clone()));

        if !info.needs_dns_update(now, self.config.cache_expiration) {
            tracing::debug!(host = %name, state = ?info.state(), "DNS prefetch not updated");
            self.stats.deduplicated += 1;
            return false;
        }

        info.set_queued(motivation, now);
        self.work_queue.push(name, motivation);
        true
    }

    /// Dispatches queued names until the queue is empty or the concurrency
    /// cap is reached.
    pub(crate) fn start_some_queued_resolutions(&mut self) {
        while self.pending_lookups < self.config.max_concurrent_lookups {
            let Some(name) = self.work_queue.pop() else {
                break;
            };
            let Some(info) = self.results.get_mut(&name) else {
                tracing::warn!(host = %name, "queued host has no cache entry");
                continue;
            };

            let queue_duration = info.set_assigned(Instant::now());
            if self.congestion_control_performed(&name, queue_duration) {
                debug_assert!(self.work_queue.is_empty());
                return;
            }

            self.dispatch(name);
        }
    }

    /// Abandons the whole backlog if `name` waited too long.
    ///
    /// `name` has just been assigned but not dispatched. Lookups already at
    /// the resolver are left to finish.
    fn congestion_control_performed(
        &mut self,
        name: &Name,
        queue_duration: std::time::Duration,
    ) -> bool {
        if queue_duration < self.config.max_queue_delay {
            return false;
        }

        let mut discarded = 0u64;
        let drained: Vec<Name> = std::iter::once(name.clone()).chain(self.work_queue.drain()).collect();
        for queued in drained {
            if let Some(info) = self.results.get_mut(&queued) {
                info.remove_from_queue();
            }
            discarded += 1;
        }

        self.stats.congestion_flushes += 1;
        self.stats.discarded_by_congestion += discarded;
        tracing::info!(
            host = %name,
            queue_duration_ms = queue_duration.as_millis() as u64,
            discarded,
            "speculative DNS congestion, abandoning queued lookups"
        );
        true
    }

    fn dispatch(&mut self, name: Name) {
        self.stats.dispatched += 1;
        let mut resolving = self.resolver.resolve(name.clone());

        match (&mut resolving).now_or_never() {
            Some(result) => {
                // Host cache hit, override, or immediate failure.
                tracing::debug!(host = %name, ok = result.is_ok(), "speculative lookup completed synchronously");
                self.stats.completed_synchronously += 1;
                self.lookup_finished(&name, result.is_ok());
            }
            None => {
                tracing::debug!(host = %name, pending = self.pending_lookups + 1, "speculative lookup dispatched");
                self.pending_lookups += 1;
                let inbox = self.inbox.clone();
                tokio::spawn(async move {
                    let result = resolving.await;
                    if let Err(e) = &result {
                        tracing::debug!(host = %name, error = %e, "speculative lookup failed");
                    }
                    let found = result.is_ok();
                    match inbox.upgrade() {
                        Some(inbox) => {
                            let _ = inbox.send(Command::LookupFinished { name, found });
                        }
                        None => tracing::trace!(host = %name, "predictor gone, dropping lookup result"),
                    }
                });
            }
        }
    }

    /// Completion of an asynchronous lookup.
    pub(crate) fn on_lookup_finished(&mut self, name: &Name, found: bool) {
        debug_assert!(self.pending_lookups > 0);
        self.pending_lookups = self.pending_lookups.saturating_sub(1);
        self.lookup_finished(name, found);
    }

    fn lookup_finished(&mut self, name: &Name, found: bool) {
        if found {
            self.stats.found += 1;
        } else {
            self.stats.not_found += 1;
        }

        let Some(info) = self.results.get_mut(name) else {
            tracing::trace!(host = %name, "lookup finished for evicted host");
            return;
        };
        if !info.is_assigned() {
            tracing::trace!(host = %name, state = ?info.state(), "ignoring stale lookup result");
            return;
        }

        if info.is_marked_for_delete() {
            self.results.remove(name);
        } else if found {
            info.set_found(Instant::now());
        } else {
            info.set_no_such_name(Instant::now());
        }
    }

    /// Forgets every result.
    ///
    /// Entries with a lookup in flight are only marked, and are erased when
    /// that lookup finishes.
    pub(crate) fn discard_all_results(&mut self) {
        let drained: Vec<Name> = self.work_queue.drain().collect();
        for name in &drained {
            if let Some(info) = self.results.get_mut(name) {
                info.remove_from_queue();
            }
        }

        let before = self.results.len();
        self.results.retain(|_, info| {
            if info.is_assigned() {
                info.mark_for_delete();
                true
            } else {
                false
            }
        });

        tracing::info!(
            discarded = before - self.results.len(),
            in_flight = self.results.len(),
            "discarded speculative DNS results"
        );
    }

    fn preconnect_url(
        &mut self,
        url: Url,
        site_for_cookies: Url,
        priority: RequestPriority,
        allow_credentials: bool,
        count: u32,
    ) {
        let url = self.hsts_redirect(url);
        tracing::debug!(url = %url, ?priority, count, "preconnecting");
        self.stats.preconnects += 1;
        self.connections.preconnect(PreconnectRequest {
            url,
            site_for_cookies,
            count,
            allow_credentials,
            priority,
        });
    }

    /// Rewrites `http` to `https` when HSTS requires it for the host.
    fn hsts_redirect(&self, url: Url) -> Url {
        if url.scheme() != "http" {
            return url;
        }
        let Some(host) = url.host_str() else {
            return url;
        };
        if !self.transport_security.should_upgrade_to_https(host) {
            return url;
        }

        let mut upgraded = url.clone();
        if upgraded.set_scheme("https").is_err() {
            return url;
        }
        upgraded
    }
}

#[cfg(test)]
impl Scheduler {
    fn pending_lookups(&self) -> usize {
        self.pending_lookups
    }

    fn results(&self) -> &Results {
        &self.results
    }

    fn queued_len(&self) -> usize {
        self.work_queue.len()
    }
}
