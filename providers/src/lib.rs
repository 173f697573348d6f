//! Provider-facing layer for cortex
//!
//! Model name resolution, per-family thinking configuration, the external
//! CLI subprocess transport, and usage accounting. Upstream HTTP transports
//! live outside this workspace; this crate owns everything the context core
//! needs to address a model and interpret what comes back.

pub mod error;
pub mod resolver;
pub mod subprocess;
pub mod thinking_config;
pub mod usage;

pub use error::ProviderError;
pub use resolver::{resolve_model, ResolvedModel, RoutingPreference, ThinkingTier};
pub use subprocess::{CliRequest, CliResult, CliTransport, CliTransportConfig, OutputFormat};
pub use thinking_config::{
    budget_to_gemini_level, build_thinking_config, THINKING_BUDGET_HIGH, THINKING_BUDGET_LOW,
    THINKING_BUDGET_MEDIUM,
};
pub use usage::{new_session_id, UsageAggregate, UsageDocument, UsageStore};

// The family enum lives in cortex-common so the sanitizer shares it
pub use cortex_common::ModelFamily;
