use crate::socket::preconnect::RequestPriority;
use serde::{Deserialize, Serialize};

/// Why a hostname was predicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMotivation {
    /// The user hovered over a link.
    MouseOver,
    /// The host was found while scanning a page for links.
    PageScan,
    /// The user is typing in the address bar.
    Omnibox,
    /// Replayed from the list of hosts seen at startup.
    StartupList,
    /// A navigation is about to start loading.
    EarlyLoad,
    /// Explicitly not worth prefetching.
    NoPrefetch,
    /// Subresource host from a static referrer table.
    StaticReferral,
    /// Subresource host learned from past navigations.
    LearnedReferral,
    /// The referring host itself.
    SelfReferral,
}

/// The two priority classes of the host-name queue.
///
/// `Rush` orders above `Background`. Everything in the rush class is popped
/// before anything in the background class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueueClass {
    Background,
    Rush,
}

impl ResolutionMotivation {
    /// Queue class for this motivation.
    ///
    /// Referral-driven and hover lookups race against a fetch that is about
    /// to happen; everything else was noticed speculatively.
    pub fn queue_class(self) -> QueueClass {
        match self {
            ResolutionMotivation::MouseOver
            | ResolutionMotivation::StaticReferral
            | ResolutionMotivation::LearnedReferral => QueueClass::Rush,
            ResolutionMotivation::PageScan
            | ResolutionMotivation::Omnibox
            | ResolutionMotivation::StartupList
            | ResolutionMotivation::EarlyLoad
            | ResolutionMotivation::NoPrefetch
            | ResolutionMotivation::SelfReferral => QueueClass::Background,
        }
    }

    /// Socket-pool priority for a preconnect with this motivation.
    ///
    /// `None` means the motivation never produces a preconnect; asking to
    /// preconnect with it is a caller bug.
    pub fn request_priority(self) -> Option<RequestPriority> {
        match self {
            ResolutionMotivation::Omnibox => Some(RequestPriority::Highest),
            ResolutionMotivation::LearnedReferral => Some(RequestPriority::Medium),
            ResolutionMotivation::MouseOver
            | ResolutionMotivation::SelfReferral
            | ResolutionMotivation::EarlyLoad => Some(RequestPriority::Low),
            ResolutionMotivation::PageScan
            | ResolutionMotivation::StartupList
            | ResolutionMotivation::NoPrefetch
            | ResolutionMotivation::StaticReferral => None,
        }
    }
}
