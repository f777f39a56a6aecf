//! Per-host resolution record.

use super::motivation::ResolutionMotivation;
use crate::dns::Name;
use tokio::time::{Duration, Instant};

/// Where a hostname is in its speculative resolution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionState {
    /// Known, but never resolved (or pulled back out of the queue).
    Unfound,
    /// Waiting in the host-name queue.
    Queued,
    /// Popped from the queue and handed to the resolver.
    Assigned,
    /// Last lookup succeeded.
    Found,
    /// Last lookup failed.
    NoSuchName,
}

/// Resolution record for one hostname.
///
/// Transitions:
/// `Unfound -> Queued -> Assigned -> {Found | NoSuchName}`. A resolved
/// entry re-enters `Queued` once it is stale, and an entry pulled out of the
/// queue by congestion control returns to the state it had before queueing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlInfo {
    name: Name,
    state: ResolutionState,
    prequeue_state: ResolutionState,
    motivation: Option<ResolutionMotivation>,
    queued_at: Option<Instant>,
    queue_duration: Duration,
    resolved_at: Option<Instant>,
    marked_for_delete: bool,
}

impl UrlInfo {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            state: ResolutionState::Unfound,
            prequeue_state: ResolutionState::Unfound,
            motivation: None,
            queued_at: None,
            queue_duration: Duration::ZERO,
            resolved_at: None,
            marked_for_delete: false,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// Motivation of the most recent queueing, if any.
    pub fn motivation(&self) -> Option<ResolutionMotivation> {
        self.motivation
    }

    pub fn queued_at(&self) -> Option<Instant> {
        self.queued_at
    }

    /// Time spent in the queue before the last assignment.
    pub fn queue_duration(&self) -> Duration {
        self.queue_duration
    }

    pub fn resolved_at(&self) -> Option<Instant> {
        self.resolved_at
    }

    pub fn is_marked_for_delete(&self) -> bool {
        self.marked_for_delete
    }

    /// True while a lookup for this entry is outstanding at the resolver.
    pub fn is_assigned(&self) -> bool {
        self.state == ResolutionState::Assigned
    }

    /// Whether a new prediction for this host should trigger a lookup.
    ///
    /// Queued or in-flight entries never do. Resolved entries do once their
    /// result is older than `cache_expiration`.
    pub fn needs_dns_update(&self, now: Instant, cache_expiration: Duration) -> bool {
        match self.state {
            ResolutionState::Unfound => true,
            ResolutionState::Queued | ResolutionState::Assigned => false,
            ResolutionState::Found | ResolutionState::NoSuchName => self
                .resolved_at
                .map_or(true, |at| now.saturating_duration_since(at) >= cache_expiration),
        }
    }

    pub(crate) fn set_queued(&mut self, motivation: ResolutionMotivation, now: Instant) {
        debug_assert!(!matches!(self.state, ResolutionState::Queued | ResolutionState::Assigned));
        self.prequeue_state = self.state;
        self.state = ResolutionState::Queued;
        self.motivation = Some(motivation);
        self.queued_at = Some(now);
    }

    /// Moves a queued entry to `Assigned`, returning how long it waited.
    pub(crate) fn set_assigned(&mut self, now: Instant) -> Duration {
        debug_assert_eq!(self.state, ResolutionState::Queued);
        self.state = ResolutionState::Assigned;
        self.queue_duration =
            self.queued_at.map_or(Duration::ZERO, |at| now.saturating_duration_since(at));
        self.queue_duration
    }

    /// Pulls an undispatched entry back out of the queue.
    pub(crate) fn remove_from_queue(&mut self) {
        debug_assert!(matches!(self.state, ResolutionState::Queued | ResolutionState::Assigned));
        self.state = self.prequeue_state;
    }

    pub(crate) fn set_found(&mut self, now: Instant) {
        debug_assert_eq!(self.state, ResolutionState::Assigned);
        self.state = ResolutionState::Found;
        self.resolved_at = Some(now);
    }

    pub(crate) fn set_no_such_name(&mut self, now: Instant) {
        debug_assert_eq!(self.state, ResolutionState::Assigned);
        self.state = ResolutionState::NoSuchName;
        self.resolved_at = Some(now);
    }

    pub(crate) fn mark_for_delete(&mut self) {
        self.marked_for_delete = true;
    }
}
