//! Feedback learning - predicate usefulness from prior LLM feedback
//!
//! Some providers piggyback an in-band JSON control packet alongside their
//! surface text, reporting which predicates helped and which were noise.
//! The ingestion path updates the feedback store; scoring only ever reads
//! it. Usefulness is kept in [-1, +1] and scaled by the engine.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Learned signal for one predicate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub helpful_count: u64,
    pub noise_count: u64,
    /// (helpful - noise) / (helpful + noise), in [-1, +1]
    pub usefulness: f64,
}

impl FeedbackEntry {
    fn recompute(&mut self) {
        let total = self.helpful_count + self.noise_count;
        self.usefulness = if total == 0 {
            0.0
        } else {
            (self.helpful_count as f64 - self.noise_count as f64) / total as f64
        };
    }
}

/// Shared predicate → usefulness store.
///
/// Safe for concurrent read during scoring and write during ingestion.
#[derive(Debug, Default)]
pub struct FeedbackStore {
    entries: RwLock<HashMap<String, FeedbackEntry>>,
}

impl FeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_helpful(&self, predicate: &str) {
        if let Ok(mut entries) = self.entries.write() {
            let entry = entries.entry(predicate.to_string()).or_default();
            entry.helpful_count += 1;
            entry.recompute();
        }
    }

    pub fn record_noise(&self, predicate: &str) {
        if let Ok(mut entries) = self.entries.write() {
            let entry = entries.entry(predicate.to_string()).or_default();
            entry.noise_count += 1;
            entry.recompute();
        }
    }

    /// Usefulness in [-1, +1]; unknown predicates are neutral.
    pub fn usefulness(&self, predicate: &str) -> f64 {
        match self.entries.read() {
            Ok(entries) => entries.get(predicate).map_or(0.0, |e| e.usefulness),
            Err(_) => 0.0,
        }
    }

    pub fn entry(&self, predicate: &str) -> Option<FeedbackEntry> {
        self.entries.read().ok()?.get(predicate).copied()
    }

    pub fn snapshot(&self) -> HashMap<String, FeedbackEntry> {
        match self.entries.read() {
            Ok(entries) => entries.clone(),
            Err(_) => HashMap::new(),
        }
    }
}

/// One predicate judgement inside a control packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredicateFeedback {
    pub predicate: String,
    pub helpful: bool,
}

/// In-band control packet carried alongside provider surface text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlPacket {
    #[serde(default)]
    pub context_feedback: Vec<PredicateFeedback>,
}

/// Apply a raw control packet to the store.
///
/// Returns the number of judgements applied. Malformed packets are ignored;
/// feedback ingestion never fails the turn.
pub fn ingest_packet(store: &FeedbackStore, raw: &str) -> usize {
    let packet: ControlPacket = match serde_json::from_str(raw) {
        Ok(packet) => packet,
        Err(err) => {
            debug!(error = %err, "ignoring malformed control packet");
            return 0;
        }
    };

    for judgement in &packet.context_feedback {
        if judgement.helpful {
            store.record_helpful(&judgement.predicate);
        } else {
            store.record_noise(&judgement.predicate);
        }
    }
    packet.context_feedback.len()
}
