//! Scoring contexts - query, campaign, and issue state
//!
//! All mutable configuration consulted during scoring lives in explicit
//! context structs handed to the engine, never in module globals. Campaign
//! and issue contexts are optional; scoring works with neither.

use serde::{Deserialize, Serialize};

use crate::compressor::Intent;
use crate::retrieval::keywords::normalize_tokens;

/// The query a scoring pass ranks facts against.
#[derive(Debug, Clone)]
pub struct ActivationQuery {
    /// Free text of the probing turn
    pub text: String,
    /// Parsed intent verb
    pub intent: Intent,
    /// Optional intent target (a topic, file, or symbol being recalled)
    pub target: Option<String>,
}

impl ActivationQuery {
    pub fn new(text: impl Into<String>, intent: Intent) -> Self {
        Self {
            text: text.into(),
            intent,
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Normalized keyword set for relevance matching: query text plus the
    /// intent target, case-folded and hyphen-normalized.
    pub fn keywords(&self) -> Vec<String> {
        let mut tokens = normalize_tokens(&self.text);
        if let Some(target) = &self.target {
            for token in normalize_tokens(target) {
                if !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
        }
        tokens
    }
}

/// One phase of a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignPhase {
    pub name: String,
    /// Keywords identifying facts that belong to this phase
    pub keywords: Vec<String>,
}

/// Session-level grouping of turns by high-level goal.
///
/// Facts matching the current phase are boosted; facts matching other
/// phases keep only a decayed fraction, so a phase transition revokes the
/// old phase's full boost on the very next scoring pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignContext {
    pub name: String,
    pub phases: Vec<CampaignPhase>,
    pub current_phase: String,
}

impl CampaignContext {
    /// Phase whose keywords match any of the given fact tokens.
    pub fn matching_phase(&self, fact_tokens: &[String]) -> Option<&CampaignPhase> {
        self.phases.iter().find(|phase| {
            phase
                .keywords
                .iter()
                .any(|kw| fact_tokens.iter().any(|t| t == &kw.to_ascii_lowercase()))
        })
    }
}

/// Tiered file relevance derived from an issue description.
///
/// `tiers[0]` holds the tier-1 files (explicitly named in the issue) down
/// to `tiers[3]` (symbol-definition expansion). Facts naming a tier-1 file
/// receive the strongest issue boost, lower tiers progressively weaker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueContext {
    pub tiers: Vec<Vec<String>>,
}

impl IssueContext {
    /// Earliest (strongest) tier containing the given file, zero-based.
    pub fn tier_of(&self, file: &str) -> Option<usize> {
        self.tiers.iter().position(|tier| {
            tier.iter()
                .any(|f| f == file || f.ends_with(file) || file.ends_with(f.as_str()))
        })
    }
}
