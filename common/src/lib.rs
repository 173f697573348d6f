//! Common utilities for cortex
//!
//! This crate provides shared functionality used across all cortex crates:
//! - Logging infrastructure with file rotation
//! - Shared types for LLM conversations
//! - Deterministic token estimation

pub mod logging;
pub mod model;
pub mod token_estimator;
pub mod types;

// Re-export common types for convenience
pub use model::ModelFamily;
pub use types::{ContentPart, GoogleMetadata, Message, MessageContent, MessageRole, PartMetadata};
