//! Typed errors for the context core
//!
//! Input errors (`SchemaViolation`, `InvalidBudget`) are surfaced to the
//! caller and never retried. `Corruption` is fatal: the store's invariants
//! were found broken and the session is expected to terminate. Cancellation
//! is a first-class outcome, not a panic.

use thiserror::Error;

use crate::activation::ScoredFact;

/// Errors raised by the fact store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A fact failed the boot guard or structural validation
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// A store invariant was found broken at load - fatal
    #[error("fact store corruption: {0}")]
    Corruption(String),
}

/// Errors raised by the turn compressor.
#[derive(Debug, Error)]
pub enum CompressError {
    /// The fact store rejected the batch; no partial state was committed
    #[error("fact store rejected facts for turn {turn}")]
    StoreRejection {
        turn: u64,
        #[source]
        source: StoreError,
    },

    /// The caller cancelled before the batch was committed
    #[error("compression cancelled for turn {turn}")]
    Cancelled { turn: u64 },
}

/// Errors raised by the activation engine.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// Budget must be a positive token count
    #[error("invalid token budget: {0}")]
    InvalidBudget(i64),

    /// Scoring was cancelled; carries the facts admitted before the cut
    #[error("scoring cancelled after admitting {} facts", partial.len())]
    Cancelled { partial: Vec<ScoredFact> },

    /// Store failure, wrapped with no information loss
    #[error("fact store failed during scoring")]
    Store(#[from] StoreError),
}
