//! Retrieval metrics for scenario assertions
//!
//! Recall and precision are computed over fact identity keys. The
//! compression ratio compares the core's deterministic estimates against a
//! real tokenizer count of the raw transcript (tiktoken cl100k_base), which
//! is what makes the ratio meaningful as a measurement.

use std::collections::HashSet;

use cortex_core::{Activation, Fact};
use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;

static ENCODER: Lazy<Option<CoreBPE>> = Lazy::new(|| match tiktoken_rs::cl100k_base() {
    Ok(encoder) => Some(encoder),
    Err(err) => {
        tracing::warn!("tiktoken unavailable ({err}), falling back to byte estimate");
        None
    }
});

/// Tokenizer count of raw text; byte-based fallback if the encoder fails
/// to initialize.
pub fn raw_token_count(text: &str) -> usize {
    match ENCODER.as_ref() {
        Some(encoder) => encoder.encode_with_special_tokens(text).len(),
        None => text.len().div_ceil(4),
    }
}

/// Scenario outcome measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalMetrics {
    /// Fraction of expected facts retrieved
    pub recall: f64,
    /// Fraction of retrieved facts that were expected
    pub precision: f64,
    /// Compressed token estimate ÷ raw transcript tokens
    pub compression_ratio: f64,
}

/// Compare an activation result against the expected fact set.
pub fn evaluate(
    activation: &Activation,
    expected: &[Fact],
    compressed_tokens: usize,
    raw_tokens: usize,
) -> RetrievalMetrics {
    let expected_keys: HashSet<String> = expected.iter().map(Fact::key).collect();
    let retrieved_keys: HashSet<String> =
        activation.facts.iter().map(|f| f.fact.key()).collect();

    let hit = expected_keys.intersection(&retrieved_keys).count();
    let recall = if expected_keys.is_empty() {
        1.0
    } else {
        hit as f64 / expected_keys.len() as f64
    };
    let precision = if retrieved_keys.is_empty() {
        0.0
    } else {
        hit as f64 / retrieved_keys.len() as f64
    };
    let compression_ratio = if raw_tokens == 0 {
        0.0
    } else {
        compressed_tokens as f64 / raw_tokens as f64
    };

    RetrievalMetrics {
        recall,
        precision,
        compression_ratio,
    }
}
