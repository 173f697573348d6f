//! Session orchestration - the per-turn context loop
//!
//! Ties the pieces together the way a running session uses them: each turn
//! is compressed into the shared fact store, working sets are scored on
//! demand, provider control packets feed the learning loop, and conversation
//! histories are prepared (sanitized, and recovered when a thinking trace
//! was lost) before the next upstream call.

use std::sync::Arc;

use cortex_common::{Message, ModelFamily};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::activation::{ingest_packet, Activation, ActivationEngine, ActivationQuery};
use crate::compressor::{CompressedTurn, Compressor, Summarizer, Turn};
use crate::error::{ActivationError, CompressError};
use crate::facts::FactStore;
use crate::thinking::{close_tool_loop_for_thinking, needs_thinking_recovery, sanitize, SanitizeOutcome};

/// One long-running conversation's context state.
///
/// Owns a store, a compressor and one activation engine. Callers that want
/// parallel scoring create additional engines over [`ContextSession::store`];
/// the store itself is the serialization point.
pub struct ContextSession {
    store: Arc<FactStore>,
    compressor: Compressor,
    engine: ActivationEngine,
}

impl Default for ContextSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextSession {
    pub fn new() -> Self {
        Self::with_store(Arc::new(FactStore::new()))
    }

    /// Build a session over an existing store (e.g. one re-hydrated from the
    /// persistence collaborator at boot).
    pub fn with_store(store: Arc<FactStore>) -> Self {
        let engine = ActivationEngine::new(Arc::clone(&store));
        Self {
            store,
            compressor: Compressor::new(),
            engine,
        }
    }

    pub fn store(&self) -> &Arc<FactStore> {
        &self.store
    }

    pub fn engine(&self) -> &ActivationEngine {
        &self.engine
    }

    /// Compress a turn and commit its facts atomically.
    pub fn ingest_turn(&self, turn: &Turn) -> Result<CompressedTurn, CompressError> {
        self.compressor.compress_into(turn, &self.store)
    }

    /// Compress a turn with an optional semantic summary attached.
    pub async fn ingest_turn_with_summary(
        &self,
        turn: &Turn,
        summarizer: Option<&dyn Summarizer>,
        cancel: &CancellationToken,
    ) -> Result<CompressedTurn, CompressError> {
        self.compressor
            .compress_with_summary(turn, &self.store, summarizer, cancel)
            .await
    }

    /// Score the store against a query and return the budgeted working set.
    pub fn working_set(
        &self,
        query: &ActivationQuery,
        budget: i64,
        cancel: &CancellationToken,
    ) -> Result<Activation, ActivationError> {
        self.engine.score_facts(query, budget, cancel)
    }

    /// Feed a provider control packet into the feedback loop. Returns the
    /// number of predicate judgements applied; malformed packets apply none.
    pub fn absorb_control_packet(&self, raw: &str) -> usize {
        ingest_packet(self.engine.feedback(), raw)
    }

    /// Prepare a conversation history for the next call to `target`:
    /// sanitize foreign thinking signatures, then re-seal the turn boundary
    /// if the history is stuck mid-tool-loop without thinking.
    ///
    /// Returns the sanitize outcome and whether a recovery close was
    /// inserted.
    pub fn prepare_history(
        &self,
        history: &mut Vec<Message>,
        target: ModelFamily,
    ) -> (SanitizeOutcome, bool) {
        let outcome = sanitize(history, target);
        let recovered = if needs_thinking_recovery(history) {
            close_tool_loop_for_thinking(history);
            info!("re-sealed a tool loop that lost its thinking trace");
            true
        } else {
            false
        };
        (outcome, recovered)
    }

    /// Store-wide compression stats: (fact count, estimated tokens).
    pub fn stats(&self) -> (usize, usize) {
        Compressor::compression_stats(&self.store)
    }
}
