//! Context management core
//!
//! Gives a long-running LLM session the illusion of unbounded context:
//! - the [`compressor`] turns each conversation turn into a typed fact
//!   stream held by the [`facts`] store,
//! - the [`activation`] engine scores those facts against the current
//!   intent and selects a budget-bounded working set,
//! - the [`thinking`] machinery sanitizes cross-family reasoning traces and
//!   re-seals turns whose thinking was lost,
//! - the [`retrieval`] tier builder selects issue-relevant files whose
//!   tiers feed back into activation scoring.

pub mod activation;
pub mod compressor;
pub mod error;
pub mod facts;
pub mod retrieval;
pub mod session;
pub mod thinking;

pub use activation::{
    Activation, ActivationEngine, ActivationQuery, CampaignContext, CampaignPhase, FeedbackStore,
    IssueContext, ScoredFact,
};
pub use compressor::{CompressedTurn, Compressor, Intent, Speaker, Summarizer, Turn, TurnMetadata};
pub use error::{ActivationError, CompressError, StoreError};
pub use facts::{Fact, FactCategory, FactStore, FactValue, LoadContext, SchemaRegistry};
pub use retrieval::{TieredContextBuilder, TieredFile};
pub use session::ContextSession;
pub use thinking::{ConversationAnalysis, SanitizeOutcome};

// Re-export the conversation types the thinking machinery operates on
pub use cortex_common::{ContentPart, Message, MessageContent, MessageRole, ModelFamily};
