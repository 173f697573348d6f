//! Test harness for the cortex context core
//!
//! A scenario runner that seeds a fresh fact store, scripts turns through
//! the compressor, probes the activation engine, and reports retrieval
//! metrics (recall, precision, compression ratio against a real tokenizer).

pub mod metrics;
pub mod scenario;

pub use metrics::{evaluate, raw_token_count, RetrievalMetrics};
pub use scenario::{turn, ScenarioRunner, TurnBuilder};
