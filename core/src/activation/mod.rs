//! Activation engine - scores facts and selects a budget-bounded working set
//!
//! Spreading activation over the fact store: a probe query's relevance
//! propagates through back-references, shared predicates and shared files,
//! letting a 50-turn-old error fact outrank an overwhelming recency signal
//! when something later refers back to it.

pub mod context;
pub mod feedback;
pub mod scoring;

pub use context::{ActivationQuery, CampaignContext, CampaignPhase, IssueContext};
pub use feedback::{ingest_packet, ControlPacket, FeedbackEntry, FeedbackStore, PredicateFeedback};
pub use scoring::{ScoreBreakdown, DEFAULT_ACTIVATION_THRESHOLD};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ActivationError;
use crate::facts::{Fact, FactStore};

/// A fact together with its score record and estimated token cost.
#[derive(Debug, Clone)]
pub struct ScoredFact {
    pub fact: Fact,
    pub breakdown: ScoreBreakdown,
    pub cost: usize,
    /// Stable insertion order used as the final tie-break
    order: usize,
}

impl ScoredFact {
    pub fn score(&self) -> f64 {
        self.breakdown.total()
    }
}

/// Result of one scoring pass.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    /// Selected facts, highest score first
    pub facts: Vec<ScoredFact>,
    /// Sum of the selected facts' token costs (≤ the budget)
    pub total_cost: usize,
    /// Facts examined before selection
    pub considered: usize,
}

#[derive(Debug, Default)]
struct EngineContexts {
    campaign: Option<CampaignContext>,
    issue: Option<IssueContext>,
}

/// Scratch state reused across scoring passes.
///
/// Held under a mutex for the whole pass: one `score_facts` at a time per
/// engine instance. Callers wanting parallel scoring instantiate separate
/// engines over the same store.
#[derive(Debug, Default)]
struct ScoreScratch {
    candidates: Vec<ScoredFact>,
}

/// Environment variable overriding the default activation threshold.
pub const THRESHOLD_ENV_VAR: &str = "CORTEX_ACTIVATION_THRESHOLD";

/// Threshold from the environment, falling back to the default.
pub fn env_threshold() -> f64 {
    std::env::var(THRESHOLD_ENV_VAR)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_ACTIVATION_THRESHOLD)
}

/// Scores all facts in a store against a query and admits the best under a
/// token budget.
pub struct ActivationEngine {
    store: Arc<FactStore>,
    threshold: f64,
    contexts: RwLock<EngineContexts>,
    feedback: Arc<FeedbackStore>,
    budget_violations: AtomicU64,
    scratch: Mutex<ScoreScratch>,
}

impl ActivationEngine {
    pub fn new(store: Arc<FactStore>) -> Self {
        Self::with_threshold(store, DEFAULT_ACTIVATION_THRESHOLD)
    }

    /// Engine with the threshold taken from `CORTEX_ACTIVATION_THRESHOLD`.
    pub fn from_env(store: Arc<FactStore>) -> Self {
        Self::with_threshold(store, env_threshold())
    }

    pub fn with_threshold(store: Arc<FactStore>, threshold: f64) -> Self {
        Self {
            store,
            threshold,
            contexts: RwLock::new(EngineContexts::default()),
            feedback: Arc::new(FeedbackStore::new()),
            budget_violations: AtomicU64::new(0),
            scratch: Mutex::new(ScoreScratch::default()),
        }
    }

    pub fn store(&self) -> &Arc<FactStore> {
        &self.store
    }

    /// Shared feedback store read during scoring; updated by the ingestion
    /// path, never by the engine itself.
    pub fn feedback(&self) -> &Arc<FeedbackStore> {
        &self.feedback
    }

    /// Replace the campaign context. Takes effect on the next `score_facts`
    /// call; the previous phase's full boost is revoked in that same call.
    pub fn set_campaign_context(&self, campaign: CampaignContext) {
        if let Ok(mut contexts) = self.contexts.write() {
            contexts.campaign = Some(campaign);
        }
    }

    pub fn clear_campaign_context(&self) {
        if let Ok(mut contexts) = self.contexts.write() {
            contexts.campaign = None;
        }
    }

    pub fn set_issue_context(&self, issue: IssueContext) {
        if let Ok(mut contexts) = self.contexts.write() {
            contexts.issue = Some(issue);
        }
    }

    pub fn clear_issue_context(&self) {
        if let Ok(mut contexts) = self.contexts.write() {
            contexts.issue = None;
        }
    }

    /// Times the selection came up empty because even the single top-scored
    /// fact exceeded the budget. A metric, never a failure.
    pub fn budget_violations(&self) -> u64 {
        self.budget_violations.load(Ordering::Relaxed)
    }

    /// Score every stored fact against the query and select the best subset
    /// whose total estimated cost fits the budget.
    ///
    /// Empty stores yield empty results. A budget ≤ 0 is an input error.
    /// On cancellation the facts admitted so far travel inside the error.
    pub fn score_facts(
        &self,
        query: &ActivationQuery,
        budget: i64,
        cancel: &CancellationToken,
    ) -> Result<Activation, ActivationError> {
        if budget <= 0 {
            return Err(ActivationError::InvalidBudget(budget));
        }
        let budget = budget as usize;

        let mut scratch = self
            .scratch
            .lock()
            .map_err(|_| ActivationError::Store(crate::error::StoreError::Corruption(
                "engine scratch lock poisoned".to_string(),
            )))?;
        scratch.candidates.clear();

        // Snapshot contexts so a mid-pass setter cannot tear the view.
        let (campaign, issue) = match self.contexts.read() {
            Ok(contexts) => (contexts.campaign.clone(), contexts.issue.clone()),
            Err(_) => (None, None),
        };

        let grouped = self.store.query_all();
        let facts: Vec<&Fact> = grouped.values().flatten().collect();
        if facts.is_empty() {
            return Ok(Activation::default());
        }

        let max_turn = facts.iter().filter_map(|f| f.turn_index()).max().unwrap_or(0);
        let referenced = scoring::collect_referenced_turns(facts.iter().copied());
        let keywords = query.keywords();

        let considered = facts.len();
        for (order, fact) in facts.into_iter().enumerate() {
            if order % 64 == 0 && cancel.is_cancelled() {
                let partial = Self::select(&mut scratch.candidates, budget, &self.budget_violations);
                warn!(scored = order, "scoring cancelled mid-pass");
                return Err(ActivationError::Cancelled {
                    partial: partial.facts,
                });
            }

            let tokens = scoring::fact_tokens(fact);
            let breakdown = ScoreBreakdown {
                base: scoring::BASE_SCORE,
                recency: scoring::recency_score(fact.turn_index(), max_turn),
                relevance: scoring::relevance_score(&tokens, &keywords, query.intent),
                predicate_prior: scoring::predicate_prior(&fact.predicate),
                dependency: scoring::dependency_score(fact, &referenced),
                campaign: scoring::campaign_score(&tokens, campaign.as_ref()),
                issue: scoring::issue_score(fact, issue.as_ref()),
                feedback: scoring::feedback_score(fact, &self.feedback),
            };

            if breakdown.total() >= self.threshold {
                scratch.candidates.push(ScoredFact {
                    fact: fact.clone(),
                    breakdown,
                    cost: fact.token_cost(),
                    order,
                });
            }
        }

        let mut activation = Self::select(&mut scratch.candidates, budget, &self.budget_violations);
        activation.considered = considered;
        debug!(
            considered,
            selected = activation.facts.len(),
            total_cost = activation.total_cost,
            "activation pass complete"
        );
        Ok(activation)
    }

    /// Sort candidates and admit in score order until the budget would be
    /// exceeded. The budget is a hard ceiling; partial facts are never
    /// admitted.
    fn select(
        candidates: &mut Vec<ScoredFact>,
        budget: usize,
        budget_violations: &AtomicU64,
    ) -> Activation {
        candidates.sort_by(|a, b| {
            b.score()
                .total_cmp(&a.score())
                .then(b.breakdown.recency.total_cmp(&a.breakdown.recency))
                .then(
                    b.breakdown
                        .predicate_prior
                        .total_cmp(&a.breakdown.predicate_prior),
                )
                .then(a.order.cmp(&b.order))
        });

        if let Some(top) = candidates.first() {
            if top.cost > budget {
                budget_violations.fetch_add(1, Ordering::Relaxed);
                warn!(
                    top_cost = top.cost,
                    budget, "top-scored fact exceeds budget, returning empty set"
                );
                candidates.clear();
                return Activation::default();
            }
        }

        let mut selected = Vec::new();
        let mut total_cost = 0usize;
        for candidate in candidates.drain(..) {
            if total_cost + candidate.cost > budget {
                break;
            }
            total_cost += candidate.cost;
            selected.push(candidate);
        }

        Activation {
            facts: selected,
            total_cost,
            considered: 0,
        }
    }
}
