//! Model resolution - requested name → canonical descriptor
//!
//! A requested model name may carry a routing prefix ("cli/...") and a
//! trailing effort tier ("...-high"). Resolution strips the prefix, detects
//! the family, and extracts the tier only when the base model is actually
//! thinking-capable: a tier token on a non-thinking model stays in the name
//! rather than being silently dropped.

use cortex_common::ModelFamily;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::thinking_config::{thinking_budget_for, THINKING_BUDGET_HIGH};

/// Routing prefix selecting the subprocess CLI transport.
pub const ROUTING_PREFIX: &str = "cli/";

/// Suffix marking a Claude model as thinking-capable.
pub const CLAUDE_THINKING_SUFFIX: &str = "-thinking";

/// How the transport layer should reach the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingPreference {
    /// Through the external CLI subprocess
    Subprocess,
    /// Through the direct API transport
    Direct,
}

/// Discrete thinking effort tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingTier {
    Minimal,
    Low,
    Medium,
    High,
}

impl ThinkingTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ThinkingTier::Minimal => "minimal",
            ThinkingTier::Low => "low",
            ThinkingTier::Medium => "medium",
            ThinkingTier::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minimal" => Some(ThinkingTier::Minimal),
            "low" => Some(ThinkingTier::Low),
            "medium" => Some(ThinkingTier::Medium),
            "high" => Some(ThinkingTier::High),
            _ => None,
        }
    }

    /// Gemini's wire format only knows low/medium/high; minimal rides the
    /// low level.
    pub fn as_gemini_level(self) -> &'static str {
        match self {
            ThinkingTier::Minimal | ThinkingTier::Low => "low",
            ThinkingTier::Medium => "medium",
            ThinkingTier::High => "high",
        }
    }
}

/// Canonical model descriptor produced by resolution. Per-request; never
/// cached beyond the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedModel {
    /// Name as requested, routing prefix included
    pub requested: String,
    /// Canonical name sent to the provider (prefix and tier stripped)
    pub actual_model: String,
    pub family: ModelFamily,
    pub supports_thinking: bool,
    /// Claude thinking budget in tokens; zero when the level representation
    /// applies instead
    pub thinking_budget: u32,
    /// Gemini symbolic thinking level; None when the budget representation
    /// applies instead
    pub thinking_level: Option<ThinkingTier>,
    pub routing: RoutingPreference,
}

/// Family of a bare model name (prefix and tier already stripped).
fn family_of(name: &str) -> ModelFamily {
    if name.contains("gemini") {
        ModelFamily::Gemini
    } else if name.contains("claude") && name.ends_with(CLAUDE_THINKING_SUFFIX) {
        ModelFamily::Claude
    } else {
        ModelFamily::Unknown
    }
}

fn supports_thinking(family: ModelFamily) -> bool {
    matches!(family, ModelFamily::Gemini | ModelFamily::Claude)
}

/// Resolve a requested model name into its canonical descriptor.
///
/// Pipeline: strip the routing prefix, try to split a trailing tier token,
/// keep the split only if the remaining base is thinking-capable, then pick
/// the family's thinking representation - symbolic level for Gemini,
/// integer budget for Claude, mutually exclusive. Defaults when no tier is
/// given: Gemini → low, Claude → the high tier's budget.
pub fn resolve_model(requested: &str) -> Result<ResolvedModel, ProviderError> {
    if requested.trim().is_empty() {
        return Err(ProviderError::UnknownModel {
            model: requested.to_string(),
        });
    }

    let (routing, name) = match requested.strip_prefix(ROUTING_PREFIX) {
        Some(rest) => (RoutingPreference::Subprocess, rest),
        None => (RoutingPreference::Direct, requested),
    };

    let mut actual = name.to_string();
    let mut tier: Option<ThinkingTier> = None;

    if let Some((base, suffix)) = name.rsplit_once('-') {
        if let Some(candidate) = ThinkingTier::parse(suffix) {
            if supports_thinking(family_of(base)) {
                actual = base.to_string();
                tier = Some(candidate);
            } else {
                debug!(
                    model = name,
                    tier = suffix,
                    "tier suffix on non-thinking model, keeping it in the name"
                );
            }
        }
    }

    let family = family_of(&actual);
    let supports = supports_thinking(family);

    let (thinking_budget, thinking_level) = match family {
        ModelFamily::Gemini => (0, Some(tier.unwrap_or(ThinkingTier::Low))),
        ModelFamily::Claude => (
            tier.map_or(THINKING_BUDGET_HIGH, thinking_budget_for),
            None,
        ),
        ModelFamily::Unknown => (0, None),
    };

    Ok(ResolvedModel {
        requested: requested.to_string(),
        actual_model: actual,
        family,
        supports_thinking: supports,
        thinking_budget,
        thinking_level,
        routing,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::thinking_config::{THINKING_BUDGET_LOW, THINKING_BUDGET_MEDIUM};

    #[test]
    fn test_gemini_tier_stripped() {
        let resolved = resolve_model("gemini-3-pro-high").unwrap();
        assert_eq!(resolved.actual_model, "gemini-3-pro");
        assert_eq!(resolved.family, ModelFamily::Gemini);
        assert!(resolved.supports_thinking);
        assert_eq!(resolved.thinking_level, Some(ThinkingTier::High));
        // Exactly one representation set
        assert_eq!(resolved.thinking_budget, 0);
        assert_eq!(resolved.routing, RoutingPreference::Direct);
    }

    #[test]
    fn test_gemini_default_level_is_low() {
        let resolved = resolve_model("gemini-3-flash").unwrap();
        assert_eq!(resolved.actual_model, "gemini-3-flash");
        assert_eq!(resolved.thinking_level, Some(ThinkingTier::Low));
    }

    #[test]
    fn test_claude_thinking_budget_from_tier() {
        let resolved = resolve_model("claude-sonnet-4-thinking-medium").unwrap();
        assert_eq!(resolved.actual_model, "claude-sonnet-4-thinking");
        assert_eq!(resolved.family, ModelFamily::Claude);
        assert_eq!(resolved.thinking_budget, THINKING_BUDGET_MEDIUM);
        assert_eq!(resolved.thinking_level, None);

        let low = resolve_model("claude-sonnet-4-thinking-low").unwrap();
        assert_eq!(low.thinking_budget, THINKING_BUDGET_LOW);
    }

    #[test]
    fn test_claude_default_budget_is_high_tier() {
        let resolved = resolve_model("claude-sonnet-4-thinking").unwrap();
        assert_eq!(resolved.thinking_budget, THINKING_BUDGET_HIGH);
    }

    #[test]
    fn test_claude_without_thinking_suffix_is_unknown_family() {
        let resolved = resolve_model("claude-sonnet-4").unwrap();
        assert_eq!(resolved.family, ModelFamily::Unknown);
        assert!(!resolved.supports_thinking);
        assert_eq!(resolved.thinking_budget, 0);
        assert_eq!(resolved.thinking_level, None);
    }

    #[test]
    fn test_tier_on_non_thinking_model_stays_in_name() {
        let resolved = resolve_model("cli/gpt-obscure-high").unwrap();
        // Routing prefix stripped, tier NOT stripped
        assert_eq!(resolved.actual_model, "gpt-obscure-high");
        assert_eq!(resolved.family, ModelFamily::Unknown);
        assert_eq!(resolved.routing, RoutingPreference::Subprocess);
    }

    #[test]
    fn test_routing_prefix_detection() {
        let subprocess = resolve_model("cli/gemini-3-pro").unwrap();
        assert_eq!(subprocess.routing, RoutingPreference::Subprocess);
        assert_eq!(subprocess.actual_model, "gemini-3-pro");

        let direct = resolve_model("gemini-3-pro").unwrap();
        assert_eq!(direct.routing, RoutingPreference::Direct);
    }

    #[test]
    fn test_minimal_tier_extracts() {
        let resolved = resolve_model("gemini-3-pro-minimal").unwrap();
        assert_eq!(resolved.actual_model, "gemini-3-pro");
        assert_eq!(resolved.thinking_level, Some(ThinkingTier::Minimal));
    }

    #[test]
    fn test_empty_name_is_unknown_model() {
        assert!(matches!(
            resolve_model(""),
            Err(ProviderError::UnknownModel { .. })
        ));
    }
}
