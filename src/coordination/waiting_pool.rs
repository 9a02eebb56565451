//! Waiting pool: participants currently seeking a partner, in arrival order.

use std::collections::{HashSet, VecDeque};

use crate::protocol::ParticipantId;

use super::registry::SessionRegistry;

#[derive(Debug, Default)]
pub struct WaitingPool {
    order: VecDeque<ParticipantId>,
    members: HashSet<ParticipantId>,
}

impl WaitingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the back of the queue. Returns `false` if already waiting.
    pub fn enqueue(&mut self, id: ParticipantId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    /// Returns `false` if the participant was not waiting.
    pub fn remove(&mut self, id: &ParticipantId) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|queued| queued != id);
        true
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Members in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &ParticipantId> {
        self.order.iter()
    }

    /// Eligible partners for `id`, earliest arrival first.
    ///
    /// Excludes `id` itself, members no longer registered, and anyone where
    /// either side has blocked the other. Evaluated fresh on every call.
    pub fn candidates_for(
        &self,
        id: &ParticipantId,
        registry: &SessionRegistry,
    ) -> Vec<ParticipantId> {
        self.order
            .iter()
            .filter(|candidate| *candidate != id)
            .filter(|candidate| registry.contains(candidate))
            .filter(|candidate| !registry.blocks_either(id, candidate))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn enqueue_is_idempotent_and_keeps_first_position() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(Utc::now());
        let b = registry.register(Utc::now());

        let mut pool = WaitingPool::new();
        assert!(pool.enqueue(a));
        assert!(pool.enqueue(b));
        assert!(!pool.enqueue(a));

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.iter().copied().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn remove_absent_member_is_a_no_op() {
        let mut pool = WaitingPool::new();
        let ghost = uuid::Uuid::new_v4();
        assert!(!pool.remove(&ghost));
        assert!(pool.is_empty());
    }

    #[test]
    fn candidates_exclude_self_and_blocked_pairs_in_both_directions() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(Utc::now());
        let b = registry.register(Utc::now());
        let c = registry.register(Utc::now());
        let d = registry.register(Utc::now());
        registry.block(&a, b);
        registry.block(&c, a);

        let mut pool = WaitingPool::new();
        for id in [a, b, c, d] {
            pool.enqueue(id);
        }

        assert_eq!(pool.candidates_for(&a, &registry), vec![d]);
        // b never blocked a, but a blocked b, so the pair is excluded from b's side too
        assert_eq!(pool.candidates_for(&b, &registry), vec![c, d]);
    }

    #[test]
    fn candidates_skip_unregistered_members() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(Utc::now());
        let b = registry.register(Utc::now());

        let mut pool = WaitingPool::new();
        pool.enqueue(a);
        pool.enqueue(b);
        registry.unregister(&b);

        assert!(pool.candidates_for(&a, &registry).is_empty());
    }
}
