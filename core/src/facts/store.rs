//! Fact store - idempotent, append-mostly storage keyed by fact identity
//!
//! The store is the serialization point for all mutable shared state in the
//! core: loads, retractions and resets take the write lock, queries take the
//! read lock. A batch is validated in full before anything is committed, so
//! a rejected batch leaves no partial state behind.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use tracing::debug;

use super::{Fact, LoadContext, SchemaRegistry};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct StoreInner {
    /// Facts grouped by predicate, in order of first appearance
    by_predicate: BTreeMap<String, Vec<Fact>>,
    /// Identity keys of every stored fact
    seen: HashSet<String>,
}

/// Append-mostly fact storage shared between the compressor and the
/// activation engine.
#[derive(Debug)]
pub struct FactStore {
    schema: SchemaRegistry,
    inner: RwLock<StoreInner>,
}

impl Default for FactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FactStore {
    pub fn new() -> Self {
        Self::with_schema(SchemaRegistry::default())
    }

    pub fn with_schema(schema: SchemaRegistry) -> Self {
        Self {
            schema,
            inner: RwLock::new(StoreInner::default()),
        }
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Append a batch of facts during a live session.
    pub fn load_facts(&self, batch: Vec<Fact>) -> Result<(), StoreError> {
        self.load_facts_with_context(batch, LoadContext::Live)
    }

    /// Append a batch of facts under an explicit load context.
    ///
    /// The whole batch is validated first; only then is anything committed,
    /// so concurrent loaders serialize on the write lock and each batch is
    /// atomic. Duplicate facts (same identity key) are no-ops. Under
    /// [`LoadContext::Boot`], ephemeral facts are dropped rather than loaded.
    pub fn load_facts_with_context(
        &self,
        batch: Vec<Fact>,
        context: LoadContext,
    ) -> Result<(), StoreError> {
        for fact in &batch {
            self.schema.validate(fact)?;
        }

        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Corruption("store lock poisoned".to_string()))?;

        let mut dropped = 0usize;
        for fact in batch {
            if self.schema.drops_at(&fact, context) {
                dropped += 1;
                continue;
            }
            let key = fact.key();
            if inner.seen.contains(&key) {
                continue;
            }
            inner.seen.insert(key);
            inner
                .by_predicate
                .entry(fact.predicate.clone())
                .or_default()
                .push(fact);
        }
        if dropped > 0 {
            debug!(dropped, "dropped ephemeral facts at boot");
        }

        Self::check_consistency(&inner)
    }

    /// Ordered facts for one predicate.
    pub fn query(&self, predicate: &str) -> Vec<Fact> {
        match self.inner.read() {
            Ok(inner) => inner
                .by_predicate
                .get(predicate)
                .cloned()
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Snapshot of all facts grouped by predicate.
    pub fn query_all(&self) -> BTreeMap<String, Vec<Fact>> {
        match self.inner.read() {
            Ok(inner) => inner.by_predicate.clone(),
            Err(_) => BTreeMap::new(),
        }
    }

    /// Best-effort removal of every fact with the given predicate.
    pub fn retract(&self, predicate: &str) {
        if let Ok(mut inner) = self.inner.write() {
            if let Some(facts) = inner.by_predicate.remove(predicate) {
                for fact in &facts {
                    inner.seen.remove(&fact.key());
                }
            }
        }
    }

    /// Best-effort removal of a single fact.
    pub fn retract_fact(&self, fact: &Fact) {
        if let Ok(mut inner) = self.inner.write() {
            let key = fact.key();
            if inner.seen.remove(&key) {
                if let Some(facts) = inner.by_predicate.get_mut(&fact.predicate) {
                    facts.retain(|f| f.key() != key);
                }
            }
        }
    }

    /// Drop all state.
    pub fn reset(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.by_predicate.clear();
            inner.seen.clear();
        }
    }

    /// Total number of stored facts.
    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(inner) => inner.by_predicate.values().map(Vec::len).sum(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest turn index seen across all facts, if any.
    pub fn max_turn_index(&self) -> Option<u64> {
        match self.inner.read() {
            Ok(inner) => inner
                .by_predicate
                .values()
                .flatten()
                .filter_map(Fact::turn_index)
                .max(),
            Err(_) => None,
        }
    }

    /// Invariant check run after every commit: the identity index and the
    /// predicate groups must agree or the store is corrupt.
    fn check_consistency(inner: &StoreInner) -> Result<(), StoreError> {
        let grouped: usize = inner.by_predicate.values().map(Vec::len).sum();
        if grouped != inner.seen.len() {
            return Err(StoreError::Corruption(format!(
                "identity index holds {} keys but predicate groups hold {grouped} facts",
                inner.seen.len(),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::facts::predicate;

    fn turn_fact(i: u64, message: &str) -> Fact {
        Fact::new(
            predicate::CONVERSATION_TURN,
            vec![i.into(), "user".into(), message.into(), "debug".into()],
        )
    }

    #[test]
    fn test_load_then_query_visibility() {
        let store = FactStore::new();
        store.load_facts(vec![turn_fact(0, "hello")]).unwrap();
        let facts = store.query(predicate::CONVERSATION_TURN);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].turn_index(), Some(0));
    }

    #[test]
    fn test_duplicates_are_idempotent() {
        let store = FactStore::new();
        store.load_facts(vec![turn_fact(0, "hello")]).unwrap();
        store.load_facts(vec![turn_fact(0, "hello")]).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_rejected_batch_commits_nothing() {
        let store = FactStore::new();
        let batch = vec![
            turn_fact(0, "hello"),
            Fact::new("bogus_predicate", vec![0u64.into()]),
        ];
        assert!(store.load_facts(batch).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_order_of_first_appearance_preserved() {
        let store = FactStore::new();
        store
            .load_facts(vec![
                Fact::new(predicate::TURN_TOPIC, vec![0u64.into(), "alpha".into()]),
                Fact::new(predicate::TURN_TOPIC, vec![0u64.into(), "beta".into()]),
            ])
            .unwrap();
        // Re-loading alpha must not move it
        store
            .load_facts(vec![Fact::new(
                predicate::TURN_TOPIC,
                vec![0u64.into(), "alpha".into()],
            )])
            .unwrap();
        let topics = store.query(predicate::TURN_TOPIC);
        assert_eq!(topics[0].args[1].as_text(), "alpha");
        assert_eq!(topics[1].args[1].as_text(), "beta");
    }

    #[test]
    fn test_retract_and_reset() {
        let store = FactStore::new();
        store.load_facts(vec![turn_fact(0, "a"), turn_fact(1, "b")]).unwrap();
        store.retract_fact(&turn_fact(0, "a"));
        assert_eq!(store.len(), 1);
        // A retracted fact can be re-loaded
        store.load_facts(vec![turn_fact(0, "a")]).unwrap();
        assert_eq!(store.len(), 2);
        store.reset();
        assert!(store.is_empty());
    }

    #[test]
    fn test_boot_drops_ephemeral_only() {
        let store = FactStore::new();
        store
            .load_facts_with_context(
                vec![
                    turn_fact(0, "hello"),
                    Fact::new(predicate::TURN_SUMMARY, vec![0u64.into(), "greeting".into()]),
                ],
                LoadContext::Boot,
            )
            .unwrap();
        assert_eq!(store.query(predicate::CONVERSATION_TURN).len(), 1);
        assert!(store.query(predicate::TURN_SUMMARY).is_empty());
    }

    #[test]
    fn test_max_turn_index() {
        let store = FactStore::new();
        assert_eq!(store.max_turn_index(), None);
        store
            .load_facts(vec![turn_fact(0, "a"), turn_fact(17, "b")])
            .unwrap();
        assert_eq!(store.max_turn_index(), Some(17));
    }
}
