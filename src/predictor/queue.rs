use super::motivation::{QueueClass, ResolutionMotivation};
use crate::dns::Name;
use std::collections::VecDeque;

/// Two-class FIFO of hostnames waiting for a speculative lookup.
///
/// Names pushed with a rush motivation are always popped before any
/// background name, regardless of push order. Order is FIFO within a class.
#[derive(Debug, Default)]
pub struct HostNameQueue {
    rush: VecDeque<Name>,
    background: VecDeque<Name>,
}

impl HostNameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: Name, motivation: ResolutionMotivation) {
        match motivation.queue_class() {
            QueueClass::Rush => self.rush.push_back(name),
            QueueClass::Background => self.background.push_back(name),
        }
    }

    pub fn pop(&mut self) -> Option<Name> {
        self.rush.pop_front().or_else(|| self.background.pop_front())
    }

    pub fn is_empty(&self) -> bool {
        self.rush.is_empty() && self.background.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rush.len() + self.background.len()
    }

    /// Removes every queued name, in pop order.
    pub fn drain(&mut self) -> impl Iterator<Item = Name> + '_ {
        self.rush.drain(..).chain(self.background.drain(..))
    }
}
