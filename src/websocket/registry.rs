//! Subscription bookkeeping.
//!
//! [`SubscriptionRegistry`] holds what the caller wants and outlives every
//! connection. [`PendingAcks`] holds what has been asked of one particular
//! session and dies with it.

use std::collections::HashMap;

use crate::types::{AckAction, Topic};

/// Monotonic identifier of one physical connection attempt
pub type SessionGeneration = u64;

/// Desired topics, in the order they were first subscribed
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    topics: Vec<Topic>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a topic; returns `false` if it was already present
    pub fn insert(&mut self, topic: Topic) -> bool {
        if self.topics.contains(&topic) {
            return false;
        }
        self.topics.push(topic);
        true
    }

    /// Remove a topic; returns `false` if it was not present
    pub fn remove(&mut self, topic: &Topic) -> bool {
        let before = self.topics.len();
        self.topics.retain(|t| t != topic);
        self.topics.len() != before
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Requests sent on one session and not yet acknowledged
///
/// Counts per `(topic, action)` so that a forwarded duplicate subscribe
/// expects two acks rather than flagging the second as unsolicited.
#[derive(Debug, Clone, Default)]
pub struct PendingAcks {
    generation: Option<SessionGeneration>,
    outstanding: HashMap<(Topic, AckAction), u32>,
}

impl PendingAcks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation the entries belong to, `None` when no session is live
    pub fn generation(&self) -> Option<SessionGeneration> {
        self.generation
    }

    /// Start tracking a fresh session, forgetting everything from the last one
    pub fn begin(&mut self, generation: SessionGeneration) {
        self.generation = Some(generation);
        self.outstanding.clear();
    }

    /// Drop all entries; used when the session terminates
    pub fn end(&mut self) {
        self.generation = None;
        self.outstanding.clear();
    }

    pub fn record(&mut self, topic: Topic, action: AckAction) {
        *self.outstanding.entry((topic, action)).or_insert(0) += 1;
    }

    /// Resolve one outstanding request
    ///
    /// Returns `false` when nothing matching was pending on `generation`, in
    /// which case the set is left untouched.
    pub fn resolve(
        &mut self,
        generation: SessionGeneration,
        topic: &Topic,
        action: AckAction,
    ) -> bool {
        if self.generation != Some(generation) {
            return false;
        }

        let key = (topic.clone(), action);
        match self.outstanding.get_mut(&key) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.outstanding.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, topic: &Topic, action: AckAction) -> bool {
        self.outstanding.contains_key(&(topic.clone(), action))
    }

    /// Outstanding entries, one per expected ack
    pub fn entries(&self) -> Vec<(Topic, AckAction)> {
        self.outstanding
            .iter()
            .flat_map(|((topic, action), count)| {
                std::iter::repeat((topic.clone(), *action)).take(*count as usize)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outstanding.values().map(|c| *c as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_a_set() {
        let mut registry = SubscriptionRegistry::new();
        assert!(registry.insert(Topic::Balances));
        assert!(!registry.insert(Topic::Balances));
        assert!(registry.insert(Topic::MyOrders));
        assert_eq!(registry.topics(), &[Topic::Balances, Topic::MyOrders]);

        assert!(registry.remove(&Topic::Balances));
        assert!(!registry.remove(&Topic::Balances));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_keeps_insertion_order() {
        let mut registry = SubscriptionRegistry::new();
        registry.insert(Topic::order_book("ETH/USDC"));
        registry.insert(Topic::MyTrades);
        registry.insert(Topic::order_book("BTC/USDC"));
        registry.remove(&Topic::MyTrades);
        registry.insert(Topic::MyTrades);

        assert_eq!(
            registry.topics(),
            &[
                Topic::order_book("ETH/USDC"),
                Topic::order_book("BTC/USDC"),
                Topic::MyTrades
            ]
        );
    }

    #[test]
    fn test_pending_resolves_once_per_request() {
        let mut pending = PendingAcks::new();
        pending.begin(1);
        pending.record(Topic::Balances, AckAction::Subscribe);
        pending.record(Topic::Balances, AckAction::Subscribe);
        assert_eq!(pending.len(), 2);

        assert!(pending.resolve(1, &Topic::Balances, AckAction::Subscribe));
        assert!(pending.resolve(1, &Topic::Balances, AckAction::Subscribe));
        assert!(!pending.resolve(1, &Topic::Balances, AckAction::Subscribe));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_pending_unsolicited_ack_leaves_others_alone() {
        let mut pending = PendingAcks::new();
        pending.begin(1);
        pending.record(Topic::MyOrders, AckAction::Subscribe);

        assert!(!pending.resolve(1, &Topic::Balances, AckAction::Subscribe));
        assert!(!pending.resolve(1, &Topic::MyOrders, AckAction::Unsubscribe));
        assert!(pending.is_pending(&Topic::MyOrders, AckAction::Subscribe));
    }

    #[test]
    fn test_pending_ignores_other_generations() {
        let mut pending = PendingAcks::new();
        pending.begin(1);
        pending.record(Topic::MyOrders, AckAction::Subscribe);
        pending.end();
        assert_eq!(pending.generation(), None);

        pending.begin(2);
        pending.record(Topic::MyOrders, AckAction::Subscribe);

        assert!(!pending.resolve(1, &Topic::MyOrders, AckAction::Subscribe));
        assert!(pending.resolve(2, &Topic::MyOrders, AckAction::Subscribe));
    }
}
