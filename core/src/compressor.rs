//! Turn compressor - converts raw conversation turns into facts
//!
//! The compressor owns the Turn → Fact conversion and never stores the turn
//! itself. It does not call the LLM: semantic summarization is delegated to
//! an optional [`Summarizer`] collaborator whose output is attached as an
//! extra `turn_summary` fact, off the critical path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::CompressError;
use crate::facts::{predicate, Fact, FactStore};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// Short symbolic verb describing what the turn is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Debug,
    Implement,
    Test,
    Refactor,
    Review,
    Research,
    Explain,
    Plan,
    Recall,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Debug => "debug",
            Intent::Implement => "implement",
            Intent::Test => "test",
            Intent::Refactor => "refactor",
            Intent::Review => "review",
            Intent::Research => "research",
            Intent::Explain => "explain",
            Intent::Plan => "plan",
            Intent::Recall => "recall",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Intent::Debug),
            "implement" => Some(Intent::Implement),
            "test" => Some(Intent::Test),
            "refactor" => Some(Intent::Refactor),
            "review" => Some(Intent::Review),
            "research" => Some(Intent::Research),
            "explain" => Some(Intent::Explain),
            "plan" => Some(Intent::Plan),
            "recall" => Some(Intent::Recall),
            _ => None,
        }
    }
}

/// Structured metadata extracted upstream for one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnMetadata {
    /// Files the turn refers to
    pub files: Vec<String>,
    /// Symbols (functions, types) the turn refers to
    pub symbols: Vec<String>,
    /// Error strings observed in the turn
    pub errors: Vec<String>,
    /// High-level topics
    pub topics: Vec<String>,
    /// The turn refers back to earlier conversation
    pub refers_back: bool,
    /// Specific turn index referred back to, when known
    pub back_reference: Option<u64>,
}

/// A single conversation turn at ingress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: u64,
    pub speaker: Speaker,
    pub message: String,
    pub intent: Intent,
    #[serde(default)]
    pub metadata: TurnMetadata,
}

impl Turn {
    pub fn new(id: u64, speaker: Speaker, message: impl Into<String>, intent: Intent) -> Self {
        Self {
            id,
            speaker,
            message: message.into(),
            intent,
            metadata: TurnMetadata::default(),
        }
    }
}

/// Result of compressing one turn.
#[derive(Debug, Clone)]
pub struct CompressedTurn {
    /// Facts emitted for the turn
    pub facts: Vec<Fact>,
    /// Deterministic token estimate for the emitted facts
    pub token_estimate: usize,
}

/// Optional semantic summarization collaborator.
///
/// Implementations typically call an LLM. The compressor treats the
/// summarizer as best-effort: a failed or cancelled summary never fails the
/// turn, it only skips the `turn_summary` fact.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, turn: &Turn, cancel: &CancellationToken) -> anyhow::Result<String>;
}

/// Turn → fact compression.
#[derive(Debug, Default)]
pub struct Compressor;

impl Compressor {
    pub fn new() -> Self {
        Self
    }

    /// Convert a turn into its fact set.
    ///
    /// Always emits `conversation_turn(id, speaker, message, intent)`, one
    /// reference fact per metadata entry, and `turn_references_back(id, j)`
    /// when the turn refers back to turn `j`.
    pub fn compress(&self, turn: &Turn) -> CompressedTurn {
        let mut facts = Vec::with_capacity(
            1 + turn.metadata.files.len()
                + turn.metadata.symbols.len()
                + turn.metadata.errors.len()
                + turn.metadata.topics.len()
                + 1,
        );

        facts.push(Fact::new(
            predicate::CONVERSATION_TURN,
            vec![
                turn.id.into(),
                turn.speaker.as_str().into(),
                turn.message.clone().into(),
                turn.intent.as_str().into(),
            ],
        ));

        for file in &turn.metadata.files {
            facts.push(Fact::new(
                predicate::TURN_REFERENCES_FILE,
                vec![turn.id.into(), file.clone().into()],
            ));
        }
        for symbol in &turn.metadata.symbols {
            facts.push(Fact::new(
                predicate::TURN_REFERENCES_SYMBOL,
                vec![turn.id.into(), symbol.clone().into()],
            ));
        }
        for error in &turn.metadata.errors {
            facts.push(Fact::new(
                predicate::TURN_ERROR_MESSAGE,
                vec![turn.id.into(), error.clone().into()],
            ));
        }
        for topic in &turn.metadata.topics {
            facts.push(Fact::new(
                predicate::TURN_TOPIC,
                vec![turn.id.into(), topic.clone().into()],
            ));
        }

        if turn.metadata.refers_back {
            if let Some(j) = turn.metadata.back_reference {
                facts.push(Fact::new(
                    predicate::TURN_REFERENCES_BACK,
                    vec![turn.id.into(), j.into()],
                ));
            }
        }

        let token_estimate = facts.iter().map(Fact::token_cost).sum();
        CompressedTurn {
            facts,
            token_estimate,
        }
    }

    /// Compress a turn and load the resulting facts atomically.
    ///
    /// A store rejection surfaces as [`CompressError::StoreRejection`] with
    /// no partial state visible.
    pub fn compress_into(
        &self,
        turn: &Turn,
        store: &FactStore,
    ) -> Result<CompressedTurn, CompressError> {
        let compressed = self.compress(turn);
        store
            .load_facts(compressed.facts.clone())
            .map_err(|source| CompressError::StoreRejection {
                turn: turn.id,
                source,
            })?;
        Ok(compressed)
    }

    /// Compress with an optional semantic summary attached.
    ///
    /// The summary is never on the critical path: a summarizer failure is
    /// logged and skipped. Cancellation before the batch commit returns
    /// [`CompressError::Cancelled`] and commits nothing.
    pub async fn compress_with_summary(
        &self,
        turn: &Turn,
        store: &FactStore,
        summarizer: Option<&dyn Summarizer>,
        cancel: &CancellationToken,
    ) -> Result<CompressedTurn, CompressError> {
        let mut compressed = self.compress(turn);

        if let Some(summarizer) = summarizer {
            tokio::select! {
                summary = summarizer.summarize(turn, cancel) => match summary {
                    Ok(text) if !text.is_empty() => {
                        compressed.facts.push(Fact::new(
                            predicate::TURN_SUMMARY,
                            vec![turn.id.into(), text.into()],
                        ));
                        compressed.token_estimate =
                            compressed.facts.iter().map(Fact::token_cost).sum();
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(turn = turn.id, error = %err, "summarizer failed, skipping summary fact");
                    }
                },
                _ = cancel.cancelled() => {
                    return Err(CompressError::Cancelled { turn: turn.id });
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(CompressError::Cancelled { turn: turn.id });
        }

        store
            .load_facts(compressed.facts.clone())
            .map_err(|source| CompressError::StoreRejection {
                turn: turn.id,
                source,
            })?;
        Ok(compressed)
    }

    /// Store-wide compression stats: (fact count, estimated tokens).
    pub fn compression_stats(store: &FactStore) -> (usize, usize) {
        let all = store.query_all();
        let count = all.values().map(Vec::len).sum();
        let tokens = all
            .values()
            .flatten()
            .map(Fact::token_cost)
            .sum();
        (count, tokens)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn debug_turn() -> Turn {
        let mut turn = Turn::new(
            3,
            Speaker::User,
            "nil pointer dereference in handler.go line 142",
            Intent::Debug,
        );
        turn.metadata.files = vec!["handler.go".to_string()];
        turn.metadata.symbols = vec!["handleRequest".to_string()];
        turn.metadata.errors = vec!["nil pointer dereference".to_string()];
        turn.metadata.topics = vec!["original-error".to_string()];
        turn
    }

    #[test]
    fn test_always_emits_conversation_turn() {
        let compressed = Compressor::new().compress(&Turn::new(
            0,
            Speaker::Assistant,
            "done",
            Intent::Implement,
        ));
        assert_eq!(compressed.facts.len(), 1);
        assert_eq!(compressed.facts[0].predicate, predicate::CONVERSATION_TURN);
    }

    #[test]
    fn test_emits_one_fact_per_metadata_entry() {
        let compressed = Compressor::new().compress(&debug_turn());
        let predicates: Vec<&str> = compressed
            .facts
            .iter()
            .map(|f| f.predicate.as_str())
            .collect();
        assert_eq!(
            predicates,
            vec![
                predicate::CONVERSATION_TURN,
                predicate::TURN_REFERENCES_FILE,
                predicate::TURN_REFERENCES_SYMBOL,
                predicate::TURN_ERROR_MESSAGE,
                predicate::TURN_TOPIC,
            ]
        );
    }

    #[test]
    fn test_back_reference_requires_index() {
        let mut turn = Turn::new(45, Speaker::User, "what was the original error?", Intent::Recall);
        turn.metadata.refers_back = true;
        // No index: no back-reference fact
        let compressed = Compressor::new().compress(&turn);
        assert!(compressed
            .facts
            .iter()
            .all(|f| f.predicate != predicate::TURN_REFERENCES_BACK));

        turn.metadata.back_reference = Some(0);
        let compressed = Compressor::new().compress(&turn);
        let back = compressed
            .facts
            .iter()
            .find(|f| f.predicate == predicate::TURN_REFERENCES_BACK)
            .unwrap();
        assert_eq!(back.args[1].as_int(), Some(0));
    }

    #[test]
    fn test_token_estimate_matches_fact_costs() {
        let compressed = Compressor::new().compress(&debug_turn());
        let expected: usize = compressed.facts.iter().map(Fact::token_cost).sum();
        assert_eq!(compressed.token_estimate, expected);
        // Deterministic across calls
        let again = Compressor::new().compress(&debug_turn());
        assert_eq!(again.token_estimate, compressed.token_estimate);
    }

    #[test]
    fn test_compress_into_loads_atomically() {
        let store = FactStore::new();
        let compressed = Compressor::new()
            .compress_into(&debug_turn(), &store)
            .unwrap();
        for fact in &compressed.facts {
            let stored = store.query(&fact.predicate);
            assert!(stored.iter().any(|f| f.key() == fact.key()));
        }
    }

    #[tokio::test]
    async fn test_cancelled_compression_commits_nothing() {
        let store = FactStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = Compressor::new()
            .compress_with_summary(&debug_turn(), &store, None, &cancel)
            .await;
        assert!(matches!(result, Err(CompressError::Cancelled { turn: 3 })));
        assert!(store.is_empty());
    }

    struct FixedSummarizer;

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(&self, _: &Turn, _: &CancellationToken) -> anyhow::Result<String> {
            Ok("user reported the original nil pointer error".to_string())
        }
    }

    #[tokio::test]
    async fn test_summary_fact_attached_when_summarizer_present() {
        let store = FactStore::new();
        let cancel = CancellationToken::new();
        let compressed = Compressor::new()
            .compress_with_summary(&debug_turn(), &store, Some(&FixedSummarizer), &cancel)
            .await
            .unwrap();
        assert!(compressed
            .facts
            .iter()
            .any(|f| f.predicate == predicate::TURN_SUMMARY));
        assert_eq!(store.query(predicate::TURN_SUMMARY).len(), 1);
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _: &Turn, _: &CancellationToken) -> anyhow::Result<String> {
            anyhow::bail!("upstream unavailable")
        }
    }

    #[tokio::test]
    async fn test_summarizer_failure_is_not_fatal() {
        let store = FactStore::new();
        let cancel = CancellationToken::new();
        let compressed = Compressor::new()
            .compress_with_summary(&debug_turn(), &store, Some(&FailingSummarizer), &cancel)
            .await
            .unwrap();
        assert!(compressed
            .facts
            .iter()
            .all(|f| f.predicate != predicate::TURN_SUMMARY));
        assert!(!store.is_empty());
    }

    #[test]
    fn test_compression_stats_empty_store() {
        let store = FactStore::new();
        assert_eq!(Compressor::compression_stats(&store), (0, 0));
    }
}
