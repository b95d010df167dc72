use crate::model::IceCandidate;
use std::collections::VecDeque;

/// Remote candidates received before the remote description was applied.
/// Unbounded: a buffered candidate is never dropped.
#[derive(Debug, Default)]
pub struct PendingCandidates {
    queue: VecDeque<IceCandidate>,
}

impl PendingCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) {
        self.queue.push_back(candidate);
    }

    /// Take everything in arrival order
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        self.queue.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
