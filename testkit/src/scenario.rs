//! Scenario runner - seed a store, run turns, probe, measure
//!
//! Each runner owns a fresh fact store, a compressor and an activation
//! engine, and accumulates the raw transcript so compression ratios can be
//! reported against real tokenizer counts.

use std::sync::Arc;

use cortex_core::{
    Activation, ActivationEngine, ActivationError, ActivationQuery, CompressError, CompressedTurn,
    Compressor, Fact, FactStore, Intent, Speaker, Turn,
};
use tokio_util::sync::CancellationToken;

use crate::metrics::{evaluate, raw_token_count, RetrievalMetrics};

/// Fluent construction of scripted turns.
#[derive(Debug, Clone)]
pub struct TurnBuilder {
    turn: Turn,
}

/// Start building a scripted turn.
pub fn turn(id: u64, speaker: Speaker, message: &str, intent: Intent) -> TurnBuilder {
    TurnBuilder {
        turn: Turn::new(id, speaker, message, intent),
    }
}

impl TurnBuilder {
    pub fn topic(mut self, topic: &str) -> Self {
        self.turn.metadata.topics.push(topic.to_string());
        self
    }

    pub fn file(mut self, file: &str) -> Self {
        self.turn.metadata.files.push(file.to_string());
        self
    }

    pub fn symbol(mut self, symbol: &str) -> Self {
        self.turn.metadata.symbols.push(symbol.to_string());
        self
    }

    pub fn error(mut self, error: &str) -> Self {
        self.turn.metadata.errors.push(error.to_string());
        self
    }

    pub fn refers_back(mut self, index: Option<u64>) -> Self {
        self.turn.metadata.refers_back = true;
        self.turn.metadata.back_reference = index;
        self
    }

    pub fn build(self) -> Turn {
        self.turn
    }
}

/// One scenario run over a fresh store.
pub struct ScenarioRunner {
    store: Arc<FactStore>,
    compressor: Compressor,
    engine: ActivationEngine,
    raw_transcript: String,
    compressed_tokens: usize,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioRunner {
    pub fn new() -> Self {
        let store = Arc::new(FactStore::new());
        let engine = ActivationEngine::new(Arc::clone(&store));
        Self {
            store,
            compressor: Compressor::new(),
            engine,
            raw_transcript: String::new(),
            compressed_tokens: 0,
        }
    }

    pub fn store(&self) -> &Arc<FactStore> {
        &self.store
    }

    pub fn engine(&self) -> &ActivationEngine {
        &self.engine
    }

    /// Compress one turn into the store, accumulating transcript stats.
    pub fn ingest(&mut self, turn: &Turn) -> Result<CompressedTurn, CompressError> {
        let compressed = self.compressor.compress_into(turn, &self.store)?;
        self.raw_transcript.push_str(turn.speaker.as_str());
        self.raw_transcript.push_str(": ");
        self.raw_transcript.push_str(&turn.message);
        self.raw_transcript.push('\n');
        self.compressed_tokens += compressed.token_estimate;
        Ok(compressed)
    }

    /// Ingest a list of turns in order.
    pub fn ingest_all(&mut self, turns: &[Turn]) -> Result<(), CompressError> {
        for turn in turns {
            self.ingest(turn)?;
        }
        Ok(())
    }

    /// Score the store against an explicit query.
    pub fn probe(
        &self,
        query: &ActivationQuery,
        budget: i64,
    ) -> Result<Activation, ActivationError> {
        self.engine
            .score_facts(query, budget, &CancellationToken::new())
    }

    /// Ingest a probing turn, then score with a query derived from it: the
    /// turn's message, its intent, and its first topic as the target.
    pub fn probe_turn(
        &mut self,
        probe: &Turn,
        budget: i64,
    ) -> Result<Activation, ActivationError> {
        self.ingest(probe).map_err(|err| match err {
            CompressError::StoreRejection { source, .. } => ActivationError::Store(source),
            CompressError::Cancelled { .. } => ActivationError::Cancelled {
                partial: Vec::new(),
            },
        })?;
        let mut query = ActivationQuery::new(probe.message.clone(), probe.intent);
        if let Some(topic) = probe.metadata.topics.first() {
            query = query.with_target(topic.clone());
        }
        self.probe(&query, budget)
    }

    /// Measure an activation against the expected facts.
    pub fn evaluate(&self, activation: &Activation, expected: &[Fact]) -> RetrievalMetrics {
        evaluate(
            activation,
            expected,
            self.compressed_tokens,
            raw_token_count(&self.raw_transcript),
        )
    }

    /// Compressed estimate ÷ raw transcript tokens so far.
    pub fn compression_ratio(&self) -> f64 {
        let raw = raw_token_count(&self.raw_transcript);
        if raw == 0 {
            0.0
        } else {
            self.compressed_tokens as f64 / raw as f64
        }
    }
}
