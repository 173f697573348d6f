//! Score components for spreading activation
//!
//! Every fact receives the sum of eight additive components, each bounded.
//! The bounds matter: they keep any single signal from drowning the rest,
//! and the activation threshold is calibrated against them so that base +
//! full recency alone is never enough to select a fact.

use std::collections::HashSet;

use crate::compressor::Intent;
use crate::facts::{predicate, Fact};
use crate::retrieval::keywords::normalize_tokens;

use super::context::{CampaignContext, IssueContext};
use super::feedback::FeedbackStore;

/// Constant per-fact floor so recent non-matching facts still compete.
pub const BASE_SCORE: f64 = 50.0;
/// Ceiling of the recency component.
pub const RECENCY_WEIGHT: f64 = 40.0;
/// Flat relevance contribution; once per fact, not once per match.
pub const RELEVANCE_WEIGHT: f64 = 30.0;
/// Ceiling of the predicate prior (error facts).
pub const PREDICATE_PRIOR_MAX: f64 = 30.0;
/// Back-reference dependency boost.
pub const DEPENDENCY_BOOST: f64 = 50.0;
/// Boost for facts matching the current campaign phase.
pub const CAMPAIGN_BOOST: f64 = 50.0;
/// Fraction of the campaign boost retained by non-current phases.
pub const CAMPAIGN_DECAY: f64 = 0.25;
/// Strongest issue boost (tier-1 files); lower tiers divide it down.
pub const ISSUE_BOOST: f64 = 50.0;
/// Feedback scale: usefulness in [-1, +1] maps to [-20, +20].
pub const FEEDBACK_SCALE: f64 = 20.0;
/// Default eligibility threshold. Base (50) + full recency (40) = 90 stays
/// below it, and so does a maximally recent plain turn (90 + 8): a fact
/// needs relevance, dependency, campaign or issue signal, or a strong
/// predicate prior riding high recency, to be selected.
pub const DEFAULT_ACTIVATION_THRESHOLD: f64 = 100.0;

/// Per-component score record kept alongside each selected fact.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub recency: f64,
    pub relevance: f64,
    pub predicate_prior: f64,
    pub dependency: f64,
    pub campaign: f64,
    pub issue: f64,
    pub feedback: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.base
            + self.recency
            + self.relevance
            + self.predicate_prior
            + self.dependency
            + self.campaign
            + self.issue
            + self.feedback
    }
}

/// Fixed boost by predicate kind: errors outrank topics, topics outrank
/// file and symbol references, plain turns sit near the bottom, and the
/// back-reference bookkeeping fact itself gets only a nominal reward.
pub fn predicate_prior(pred: &str) -> f64 {
    match pred {
        predicate::TURN_ERROR_MESSAGE => PREDICATE_PRIOR_MAX,
        predicate::TURN_TOPIC => 22.0,
        predicate::PROJECT_PATTERN => 16.0,
        predicate::TURN_REFERENCES_FILE => 15.0,
        predicate::TURN_REFERENCES_SYMBOL => 14.0,
        predicate::TURN_SUMMARY => 10.0,
        predicate::CONVERSATION_TURN => 8.0,
        predicate::TURN_REFERENCES_BACK => 4.0,
        _ => 0.0,
    }
}

/// Monotone-increasing recency in [0, RECENCY_WEIGHT].
///
/// Facts without a turn index (project-level facts) carry no recency; they
/// compete on relevance and priors instead.
pub fn recency_score(turn_index: Option<u64>, max_turn: u64) -> f64 {
    match turn_index {
        Some(index) if max_turn > 0 => RECENCY_WEIGHT * (index.min(max_turn) as f64 / max_turn as f64),
        Some(_) => RECENCY_WEIGHT,
        None => 0.0,
    }
}

/// Normalized token view of a fact's arguments.
pub fn fact_tokens(fact: &Fact) -> Vec<String> {
    let mut tokens = Vec::new();
    for arg in &fact.args {
        for token in normalize_tokens(&arg.as_text()) {
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
    }
    tokens
}

/// Bidirectional keyword match: two tokens match when equal, or when the
/// shorter one (at least 4 chars) is contained in the longer.
fn tokens_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= 4 && long.contains(short)
}

/// Relevance: query keywords and the intent verb against the fact's args.
/// Contributes the full weight once per fact, regardless of match count.
pub fn relevance_score(fact_tokens: &[String], keywords: &[String], intent: Intent) -> f64 {
    let intent_verb = intent.as_str();
    let matched = fact_tokens.iter().any(|token| {
        token == intent_verb || keywords.iter().any(|kw| tokens_match(token, kw))
    });
    if matched {
        RELEVANCE_WEIGHT
    } else {
        0.0
    }
}

/// Dependency boost: facts belonging to a turn that a later fact refers
/// back to. The referenced set is collected once per scoring pass.
pub fn dependency_score(fact: &Fact, referenced_turns: &HashSet<u64>) -> f64 {
    match fact.turn_index() {
        Some(index) if referenced_turns.contains(&index) => DEPENDENCY_BOOST,
        _ => 0.0,
    }
}

/// Collect R = { j | turn_references_back(_, j) } from a fact snapshot.
pub fn collect_referenced_turns<'a>(facts: impl Iterator<Item = &'a Fact>) -> HashSet<u64> {
    facts
        .filter(|f| f.predicate == predicate::TURN_REFERENCES_BACK)
        .filter_map(|f| f.args.get(1).and_then(|v| v.as_int()))
        .filter(|j| *j >= 0)
        .map(|j| j as u64)
        .collect()
}

/// Campaign boost: full for the current phase, decayed for other phases so
/// a transition revokes the old phase's advantage immediately.
pub fn campaign_score(fact_tokens: &[String], campaign: Option<&CampaignContext>) -> f64 {
    let Some(campaign) = campaign else {
        return 0.0;
    };
    match campaign.matching_phase(fact_tokens) {
        Some(phase) if phase.name == campaign.current_phase => CAMPAIGN_BOOST,
        Some(_) => CAMPAIGN_BOOST * CAMPAIGN_DECAY,
        None => 0.0,
    }
}

/// Issue boost: strongest for tier-1 files, divided down per tier.
pub fn issue_score(fact: &Fact, issue: Option<&IssueContext>) -> f64 {
    let Some(issue) = issue else {
        return 0.0;
    };
    let mut best: Option<usize> = None;
    for arg in &fact.args {
        if let Some(tier) = issue.tier_of(&arg.as_text()) {
            best = Some(best.map_or(tier, |b| b.min(tier)));
        }
    }
    match best {
        Some(tier) => ISSUE_BOOST / (tier as f64 + 1.0),
        None => 0.0,
    }
}

/// Signed feedback component in [-FEEDBACK_SCALE, +FEEDBACK_SCALE].
pub fn feedback_score(fact: &Fact, feedback: &FeedbackStore) -> f64 {
    (feedback.usefulness(&fact.predicate) * FEEDBACK_SCALE).clamp(-FEEDBACK_SCALE, FEEDBACK_SCALE)
}
