//! Predicate schema registry and boot guard
//!
//! The active schema set enumerates every predicate the store accepts, the
//! lifetime category of each, and the structural checks applied at load
//! time. Unknown predicates are rejected outright; ephemeral facts are
//! dropped when loading persisted state at session boot.

use super::{predicate, Fact, FactValue};
use crate::error::StoreError;

/// Lifetime category of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactCategory {
    /// Per-turn derivation; decays and does not survive a restart
    Ephemeral,
    /// Lives for the session
    Session,
    /// Survives restart via the persistence collaborator
    Persistent,
}

/// Context a batch of facts is being loaded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadContext {
    /// Normal ingress during a live session
    Live,
    /// Restoring persisted state at session boot
    Boot,
}

/// The active predicate schema set.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entries: Vec<(&'static str, FactCategory)>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self {
            entries: vec![
                (predicate::CONVERSATION_TURN, FactCategory::Session),
                (predicate::TURN_REFERENCES_FILE, FactCategory::Session),
                (predicate::TURN_REFERENCES_SYMBOL, FactCategory::Session),
                (predicate::TURN_ERROR_MESSAGE, FactCategory::Session),
                (predicate::TURN_TOPIC, FactCategory::Session),
                (predicate::TURN_REFERENCES_BACK, FactCategory::Session),
                (predicate::TURN_SUMMARY, FactCategory::Ephemeral),
                (predicate::PROJECT_PATTERN, FactCategory::Persistent),
            ],
        }
    }
}

impl SchemaRegistry {
    /// Category for a predicate, if it is part of the active schema.
    pub fn category(&self, predicate: &str) -> Option<FactCategory> {
        self.entries
            .iter()
            .find(|(name, _)| *name == predicate)
            .map(|(_, cat)| *cat)
    }

    /// True if the predicate is in the active schema set.
    pub fn contains(&self, predicate: &str) -> bool {
        self.category(predicate).is_some()
    }

    /// Validate a single fact against the schema.
    ///
    /// Checks predicate membership and the structural invariants that can be
    /// decided from the fact alone. Back-references must point backwards:
    /// turns are monotonically ordered, so `turn_references_back(i, j)` with
    /// `j > i` would introduce a cycle and is rejected here.
    pub fn validate(&self, fact: &Fact) -> Result<(), StoreError> {
        if !self.contains(&fact.predicate) {
            return Err(StoreError::SchemaViolation(format!(
                "unknown predicate '{}'",
                fact.predicate
            )));
        }

        if fact.predicate == predicate::TURN_REFERENCES_BACK {
            let (i, j) = match (fact.args.first(), fact.args.get(1)) {
                (Some(FactValue::Int(i)), Some(FactValue::Int(j))) => (*i, *j),
                _ => {
                    return Err(StoreError::SchemaViolation(format!(
                        "{} requires two integer args",
                        predicate::TURN_REFERENCES_BACK
                    )))
                }
            };
            if j > i {
                return Err(StoreError::SchemaViolation(format!(
                    "back-reference from turn {i} to future turn {j}"
                )));
            }
        }

        Ok(())
    }

    /// Should this fact be silently dropped under the given load context?
    ///
    /// Ephemeral facts do not survive a restart: at boot, persisted
    /// ephemeral-category facts are discarded instead of loaded.
    pub fn drops_at(&self, fact: &Fact, context: LoadContext) -> bool {
        context == LoadContext::Boot
            && self.category(&fact.predicate) == Some(FactCategory::Ephemeral)
    }
}
