//! Fact model - the atomic unit of compressed context
//!
//! A fact is an immutable `(predicate, args)` statement. Facts are never
//! mutated after creation; supersession is expressed by later facts. The
//! `(predicate, args)` tuple is the fact's identity, so re-loading the same
//! fact is a no-op.

mod schema;
mod store;

pub use schema::{FactCategory, LoadContext, SchemaRegistry};
pub use store::FactStore;

use cortex_common::token_estimator::{estimate_serialized_tokens, FACT_TOKEN_OVERHEAD};
use serde::{Deserialize, Serialize};

/// Well-known predicate names emitted by the compressor.
pub mod predicate {
    pub const CONVERSATION_TURN: &str = "conversation_turn";
    pub const TURN_REFERENCES_FILE: &str = "turn_references_file";
    pub const TURN_REFERENCES_SYMBOL: &str = "turn_references_symbol";
    pub const TURN_ERROR_MESSAGE: &str = "turn_error_message";
    pub const TURN_TOPIC: &str = "turn_topic";
    pub const TURN_REFERENCES_BACK: &str = "turn_references_back";
    pub const TURN_SUMMARY: &str = "turn_summary";
    pub const PROJECT_PATTERN: &str = "project_pattern";
}

/// A single fact argument.
///
/// Args are tagged primitives rather than an open dynamic sequence so the
/// schema registry can constrain each predicate's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    /// Integer argument (turn indices, counts)
    Int(i64),
    /// Floating point argument (scores, ratios)
    Float(f64),
    /// Short string argument (paths, topics, error text)
    Str(String),
}

impl FactValue {
    /// String view used for relevance matching; numbers render via Display.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            FactValue::Int(n) => std::borrow::Cow::Owned(n.to_string()),
            FactValue::Float(f) => std::borrow::Cow::Owned(f.to_string()),
            FactValue::Str(s) => std::borrow::Cow::Borrowed(s),
        }
    }

    /// Integer value, if this arg is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FactValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Serialized length in bytes, as the deterministic estimator counts it.
    fn serialized_len(&self) -> usize {
        match self {
            FactValue::Int(n) => n.to_string().len(),
            FactValue::Float(f) => f.to_string().len(),
            FactValue::Str(s) => s.len(),
        }
    }
}

impl From<i64> for FactValue {
    fn from(n: i64) -> Self {
        FactValue::Int(n)
    }
}

impl From<u64> for FactValue {
    fn from(n: u64) -> Self {
        FactValue::Int(n as i64)
    }
}

impl From<f64> for FactValue {
    fn from(f: f64) -> Self {
        FactValue::Float(f)
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        FactValue::Str(s.to_string())
    }
}

impl From<String> for FactValue {
    fn from(s: String) -> Self {
        FactValue::Str(s)
    }
}

/// An immutable statement about the conversation or project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Short symbolic predicate name (see [`predicate`])
    pub predicate: String,
    /// Ordered arguments; first arg is conventionally the turn index
    pub args: Vec<FactValue>,
}

impl Fact {
    pub fn new(predicate: impl Into<String>, args: Vec<FactValue>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    /// Identity key - two facts with the same key are the same fact.
    pub fn key(&self) -> String {
        let mut key = String::with_capacity(self.predicate.len() + 16);
        key.push_str(&self.predicate);
        for arg in &self.args {
            key.push('\u{1f}');
            match arg {
                FactValue::Int(n) => {
                    key.push('i');
                    key.push_str(&n.to_string());
                }
                FactValue::Float(f) => {
                    key.push('f');
                    key.push_str(&f.to_string());
                }
                FactValue::Str(s) => {
                    key.push('s');
                    key.push_str(s);
                }
            }
        }
        key
    }

    /// Turn index this fact belongs to, when the first arg is one.
    pub fn turn_index(&self) -> Option<u64> {
        match self.args.first() {
            Some(FactValue::Int(n)) if *n >= 0 => Some(*n as u64),
            _ => None,
        }
    }

    /// Deterministic token cost: fixed per-fact overhead plus the serialized
    /// argument lengths. Used both for compression estimates and for budget
    /// admission in the activation engine.
    pub fn token_cost(&self) -> usize {
        let arg_bytes: usize = self.args.iter().map(FactValue::serialized_len).sum();
        FACT_TOKEN_OVERHEAD + estimate_serialized_tokens(arg_bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_identity_is_predicate_plus_args() {
        let a = Fact::new(predicate::TURN_TOPIC, vec![0u64.into(), "original-error".into()]);
        let b = Fact::new(predicate::TURN_TOPIC, vec![0u64.into(), "original-error".into()]);
        let c = Fact::new(predicate::TURN_TOPIC, vec![1u64.into(), "original-error".into()]);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_key_distinguishes_types() {
        // Int 1 and Str "1" must not collide
        let int_fact = Fact::new("p", vec![FactValue::Int(1)]);
        let str_fact = Fact::new("p", vec![FactValue::Str("1".to_string())]);
        assert_ne!(int_fact.key(), str_fact.key());
    }

    #[test]
    fn test_turn_index_from_first_arg() {
        let fact = Fact::new(
            predicate::TURN_ERROR_MESSAGE,
            vec![42u64.into(), "boom".into()],
        );
        assert_eq!(fact.turn_index(), Some(42));

        let no_turn = Fact::new(predicate::PROJECT_PATTERN, vec!["mvc".into()]);
        assert_eq!(no_turn.turn_index(), None);
    }

    #[test]
    fn test_token_cost_is_deterministic_and_monotone() {
        let small = Fact::new(predicate::TURN_TOPIC, vec![0u64.into(), "auth".into()]);
        let large = Fact::new(
            predicate::TURN_TOPIC,
            vec![0u64.into(), "authentication middleware regression".into()],
        );
        assert_eq!(small.token_cost(), small.token_cost());
        assert!(large.token_cost() > small.token_cost());
        assert!(small.token_cost() >= FACT_TOKEN_OVERHEAD);
    }

    #[test]
    fn test_serialize_reparse_round_trip() {
        let fact = Fact::new(
            predicate::CONVERSATION_TURN,
            vec![
                7u64.into(),
                "user".into(),
                "fix the flaky test".into(),
                "debug".into(),
            ],
        );
        let json = serde_json::to_string(&fact).unwrap();
        let back: Fact = serde_json::from_str(&json).unwrap();
        assert_eq!(fact, back);
        assert_eq!(fact.key(), back.key());
    }
}
