//! Desired-subscription bookkeeping.
//!
//! The registry is the single source of truth for what the caller wants to be
//! subscribed to. It never talks to the network: every method returns the wire
//! operations the supervisor must write, in order.

use super::topic::{parse_keys, SubscriptionKey, Topic};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireAction {
    Subscribe,
    Unsubscribe,
}

impl WireAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

/// A single subscribe/unsubscribe message for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireOp {
    pub action: WireAction,
    pub key: SubscriptionKey,
}

impl WireOp {
    pub const fn subscribe(key: SubscriptionKey) -> Self {
        Self {
            action: WireAction::Subscribe,
            key,
        }
    }

    pub const fn unsubscribe(key: SubscriptionKey) -> Self {
        Self {
            action: WireAction::Unsubscribe,
            key,
        }
    }
}

impl fmt::Display for WireOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.action.as_str(), self.key)
    }
}

/// The caller's desired subscription set plus the reconciliation rules
///
/// Insertion order is kept so a reconnect replays keys in the order the caller
/// asked for them.
#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    desired: Vec<SubscriptionKey>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn desired(&self) -> &[SubscriptionKey] {
        &self.desired
    }

    pub fn contains(&self, key: &SubscriptionKey) -> bool {
        self.desired.contains(key)
    }

    pub fn len(&self) -> usize {
        self.desired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desired.is_empty()
    }

    pub fn clear(&mut self) {
        self.desired.clear();
    }

    /// Plan the wire operations for a caller subscribe request
    ///
    /// Keys already desired are skipped. Unknown topics are ignored.
    pub fn plan_subscribe<S: AsRef<str>>(&mut self, requested: &[S]) -> Vec<WireOp> {
        let mut ops = Vec::new();
        for key in parse_keys(requested) {
            if self.contains(&key) {
                continue;
            }
            self.apply_subscribe(key, &mut ops);
        }
        ops
    }

    /// Plan the operations that rebuild `keys` on a freshly opened connection
    ///
    /// The desired set is rebuilt from scratch and no key is skipped as
    /// "already desired"; the result mirrors `keys` under the same rules as
    /// [`plan_subscribe`](Self::plan_subscribe).
    pub fn plan_replay(&mut self, keys: &[SubscriptionKey]) -> Vec<WireOp> {
        self.desired.clear();
        let mut ops = Vec::with_capacity(keys.len());
        for key in keys {
            self.apply_subscribe(key.clone(), &mut ops);
        }
        ops
    }

    /// Plan the wire operations for a caller unsubscribe request
    ///
    /// Only keys present in the desired set produce an operation.
    pub fn plan_unsubscribe<S: AsRef<str>>(&mut self, requested: &[S]) -> Vec<WireOp> {
        let mut ops = Vec::new();
        for key in parse_keys(requested) {
            if let Some(pos) = self.desired.iter().position(|k| *k == key) {
                self.desired.remove(pos);
                ops.push(WireOp::unsubscribe(key));
            }
        }
        ops
    }

    fn apply_subscribe(&mut self, key: SubscriptionKey, ops: &mut Vec<WireOp>) {
        let topic = key.topic();

        if !topic.is_filterable() {
            ops.push(WireOp::subscribe(key.clone()));
            self.insert(key);
            return;
        }

        if key.is_bare() {
            ops.push(WireOp::subscribe(key.clone()));
            self.purge_symbols(topic);
            self.insert(key);
        } else if !self.contains(&key.bare()) {
            ops.push(WireOp::subscribe(key.clone()));
            self.insert(key);
        }
        // a bare subscription already covers this symbol
    }

    fn insert(&mut self, key: SubscriptionKey) {
        if !self.contains(&key) {
            self.desired.push(key);
        }
    }

    fn purge_symbols(&mut self, topic: Topic) {
        self.desired
            .retain(|k| k.topic() != topic || k.is_bare());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> SubscriptionKey {
        SubscriptionKey::parse(raw).unwrap()
    }

    fn desired(registry: &SubscriptionRegistry) -> Vec<String> {
        registry.desired().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_bare_then_symbol_is_suppressed() {
        for topic in ["orderbook", "trade"] {
            let mut registry = SubscriptionRegistry::new();
            assert_eq!(
                registry.plan_subscribe(&[topic]),
                vec![WireOp::subscribe(key(topic))]
            );

            let scoped = format!("{}:xht-usdt", topic);
            assert!(registry.plan_subscribe(&[scoped.as_str()]).is_empty());
            assert_eq!(desired(&registry), vec![topic.to_string()]);
        }
    }

    #[test]
    fn test_symbol_then_bare_purges() {
        let mut registry = SubscriptionRegistry::new();
        registry.plan_subscribe(&["trade:xht-usdt", "trade:btc-usdt", "orderbook:xht-usdt"]);
        assert_eq!(registry.len(), 3);

        let ops = registry.plan_subscribe(&["trade"]);
        assert_eq!(ops, vec![WireOp::subscribe(key("trade"))]);
        assert_eq!(desired(&registry), vec!["orderbook:xht-usdt", "trade"]);
    }

    #[test]
    fn test_global_topics_always_emit() {
        let mut registry = SubscriptionRegistry::new();
        let ops = registry.plan_subscribe(&["order", "wallet", "deposit"]);
        assert_eq!(
            ops.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["subscribe(order)", "subscribe(wallet)", "subscribe(deposit)"]
        );
    }

    #[test]
    fn test_already_desired_is_skipped() {
        let mut registry = SubscriptionRegistry::new();
        registry.plan_subscribe(&["wallet", "orderbook:xht-usdt"]);
        assert!(registry
            .plan_subscribe(&["wallet", "orderbook:xht-usdt"])
            .is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_topic_ignored() {
        let mut registry = SubscriptionRegistry::new();
        assert!(registry.plan_subscribe(&["ticker", "candles:xht-usdt"]).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe_absent_is_noop() {
        let mut registry = SubscriptionRegistry::new();
        registry.plan_subscribe(&["orderbook"]);

        assert!(registry.plan_unsubscribe(&["orderbook:xht-usdt", "wallet"]).is_empty());
        assert_eq!(desired(&registry), vec!["orderbook"]);
    }

    #[test]
    fn test_unsubscribe_removes_exactly_that_key() {
        let mut registry = SubscriptionRegistry::new();
        registry.plan_subscribe(&["trade:xht-usdt", "trade:btc-usdt"]);

        let ops = registry.plan_unsubscribe(&["trade:xht-usdt"]);
        assert_eq!(ops, vec![WireOp::unsubscribe(key("trade:xht-usdt"))]);
        assert_eq!(desired(&registry), vec!["trade:btc-usdt"]);
    }

    #[test]
    fn test_replay_does_not_skip_and_mirrors_keys() {
        let mut registry = SubscriptionRegistry::new();
        registry.plan_subscribe(&["order", "wallet"]);

        let ops = registry.plan_replay(&[key("order"), key("wallet")]);
        assert_eq!(
            ops,
            vec![WireOp::subscribe(key("order")), WireOp::subscribe(key("wallet"))]
        );
        assert_eq!(desired(&registry), vec!["order", "wallet"]);
    }

    #[test]
    fn test_replay_applies_bare_supersedes_rule() {
        let mut registry = SubscriptionRegistry::new();
        let ops = registry.plan_replay(&[key("orderbook"), key("orderbook:xht-usdt")]);
        assert_eq!(ops, vec![WireOp::subscribe(key("orderbook"))]);
        assert_eq!(desired(&registry), vec!["orderbook"]);

        let ops = registry.plan_replay(&[key("orderbook:xht-usdt"), key("orderbook")]);
        assert_eq!(ops.len(), 2);
        assert_eq!(desired(&registry), vec!["orderbook"]);
    }

    #[test]
    fn test_replay_keeps_symbol_keys() {
        let mut registry = SubscriptionRegistry::new();
        registry.plan_replay(&[key("trade:xht-usdt"), key("usertrade")]);
        assert_eq!(desired(&registry), vec!["trade:xht-usdt", "usertrade"]);
    }
}
