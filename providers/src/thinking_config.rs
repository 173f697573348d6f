//! Provider-specific thinking configuration blocks
//!
//! The two families take thinking configuration in different shapes and
//! casings: Gemini wants camelCase keys with a symbolic level, Claude wants
//! snake_case keys with an integer budget. Exactly one shape is ever
//! emitted for a resolved model.

use cortex_common::ModelFamily;
use serde_json::json;

use crate::resolver::{ResolvedModel, ThinkingTier};

/// Claude thinking budgets by tier (tokens).
pub const THINKING_BUDGET_LOW: u32 = 8192;
pub const THINKING_BUDGET_MEDIUM: u32 = 16384;
pub const THINKING_BUDGET_HIGH: u32 = 32768;

/// Budget for a symbolic tier; minimal rides the low budget.
pub fn thinking_budget_for(tier: ThinkingTier) -> u32 {
    match tier {
        ThinkingTier::Minimal | ThinkingTier::Low => THINKING_BUDGET_LOW,
        ThinkingTier::Medium => THINKING_BUDGET_MEDIUM,
        ThinkingTier::High => THINKING_BUDGET_HIGH,
    }
}

/// Bin an integer budget into a Gemini symbolic level.
///
/// Inclusive upper bounds: ≤ 8192 → low, ≤ 16384 → medium, else high.
/// The bounds are kept as-is rather than re-derived from the Claude budget
/// table.
pub fn budget_to_gemini_level(budget: u32) -> ThinkingTier {
    if budget <= 8192 {
        ThinkingTier::Low
    } else if budget <= 16384 {
        ThinkingTier::Medium
    } else {
        ThinkingTier::High
    }
}

/// Build the provider thinking-config block for a resolved model.
///
/// Gemini: `{"includeThoughts": true, "thinkingLevel": "low"|"medium"|"high"}`.
/// Claude: `{"include_thoughts": true, "thinking_budget": <int>}`.
/// Non-thinking models get no block.
pub fn build_thinking_config(resolved: &ResolvedModel) -> Option<serde_json::Value> {
    if !resolved.supports_thinking {
        return None;
    }
    match resolved.family {
        ModelFamily::Gemini => {
            let level = resolved.thinking_level.unwrap_or(ThinkingTier::Low);
            Some(json!({
                "includeThoughts": true,
                "thinkingLevel": level.as_gemini_level(),
            }))
        }
        ModelFamily::Claude => Some(json!({
            "include_thoughts": true,
            "thinking_budget": resolved.thinking_budget,
        })),
        ModelFamily::Unknown => None,
    }
}
