//! Tiered context builder - file-level retrieval for issue-driven work
//!
//! Selects which source files to offer the model for a given issue
//! description. Four additive tiers share a fractional file budget;
//! each file lands in its earliest tier with a per-tier relevance score.
//! The tier lists feed the activation engine's issue boost.

pub mod cache;
pub mod keywords;
pub mod search;

pub use cache::SearchCache;
pub use search::{KeywordSearchConfig, KeywordSearchEngine, SearchHit};

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::activation::IssueContext;
use keywords::{extract_file_references, extract_keywords, extract_symbol_candidates};

/// Share of the file budget each tier may spend.
pub const TIER_FRACTIONS: [f64; 4] = [0.30, 0.40, 0.20, 0.10];

/// Fixed relevance scores for tiers 1, 3 and 4; tier 2 is weighted by hit
/// frequency.
pub const TIER_ONE_SCORE: f64 = 1.0;
pub const TIER_THREE_SCORE: f64 = 0.5;
pub const TIER_FOUR_SCORE: f64 = 0.3;

/// One selected file with its tier and relevance.
#[derive(Debug, Clone, PartialEq)]
pub struct TieredFile {
    /// Path relative to the project root
    pub path: String,
    /// 1-based tier the file was selected in
    pub tier: u8,
    pub score: f64,
}

/// Issue description → tiered file selection.
pub struct TieredContextBuilder {
    engine: KeywordSearchEngine,
}

impl TieredContextBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            engine: KeywordSearchEngine::new(root),
        }
    }

    pub fn with_engine(engine: KeywordSearchEngine) -> Self {
        Self { engine }
    }

    /// Build the tiered selection for an issue description.
    ///
    /// Tier 1: files named in the issue text. Tier 2: keyword-search hits.
    /// Tier 3: one-hop import neighbors of tiers 1∪2. Tier 4: files
    /// defining symbols mentioned in the issue. Tiers are deduplicated;
    /// a file stays in its earliest tier.
    pub async fn build(
        &self,
        issue_text: &str,
        max_total: usize,
        cancel: &CancellationToken,
    ) -> Vec<TieredFile> {
        if max_total == 0 {
            return Vec::new();
        }
        let caps = tier_caps(max_total);
        let root = self.engine.root().to_path_buf();
        let tree = {
            let root = root.clone();
            tokio::task::spawn_blocking(move || list_tree(&root))
                .await
                .unwrap_or_default()
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut selected: Vec<TieredFile> = Vec::new();

        // Tier 1: explicit mentions - highest confidence
        for mentioned in extract_file_references(issue_text) {
            if selected.iter().filter(|f| f.tier == 1).count() >= caps[0] {
                break;
            }
            if let Some(path) = resolve_in_tree(&tree, &mentioned) {
                if seen.insert(path.clone()) {
                    selected.push(TieredFile {
                        path,
                        tier: 1,
                        score: TIER_ONE_SCORE,
                    });
                }
            }
        }

        // Tier 2: keyword search, weighted by hit frequency
        let issue_keywords = extract_keywords(issue_text, 8);
        let hits = self.engine.search_keywords(&issue_keywords, cancel).await;
        let mut hit_counts: BTreeMap<String, usize> = BTreeMap::new();
        for hit in &hits {
            if let Some(rel) = relativize(&root, &hit.path) {
                *hit_counts.entry(rel).or_default() += 1;
            }
        }
        let max_count = hit_counts.values().copied().max().unwrap_or(1);
        let mut ranked: Vec<(String, usize)> = hit_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        for (path, count) in ranked {
            if selected.iter().filter(|f| f.tier == 2).count() >= caps[1] {
                break;
            }
            if seen.insert(path.clone()) {
                selected.push(TieredFile {
                    path,
                    tier: 2,
                    score: 0.9 * (count as f64 / max_count as f64),
                });
            }
        }

        if cancel.is_cancelled() {
            return selected;
        }

        // Tier 3: one-hop import neighbors of what we have so far
        let neighbor_sources: Vec<String> = selected.iter().map(|f| f.path.clone()).collect();
        let neighbors = {
            let root = root.clone();
            tokio::task::spawn_blocking(move || import_neighbors(&root, &tree, &neighbor_sources))
                .await
                .unwrap_or_default()
        };
        for path in neighbors {
            if selected.iter().filter(|f| f.tier == 3).count() >= caps[2] {
                break;
            }
            if seen.insert(path.clone()) {
                selected.push(TieredFile {
                    path,
                    tier: 3,
                    score: TIER_THREE_SCORE,
                });
            }
        }

        // Tier 4: symbol-definition files (stand-in for semantic expansion)
        let symbols = extract_symbol_candidates(issue_text);
        let definition_files =
            tokio::task::spawn_blocking(move || symbol_definition_files(&root, &symbols))
                .await
                .unwrap_or_default();
        for path in definition_files {
            if selected.iter().filter(|f| f.tier == 4).count() >= caps[3] {
                break;
            }
            if seen.insert(path.clone()) {
                selected.push(TieredFile {
                    path,
                    tier: 4,
                    score: TIER_FOUR_SCORE,
                });
            }
        }

        debug!(
            total = selected.len(),
            budget = max_total,
            "tiered context selection complete"
        );
        selected
    }

    /// Tier lists in the shape the activation engine's issue boost consumes.
    pub fn issue_context(files: &[TieredFile]) -> IssueContext {
        let mut tiers = vec![Vec::new(), Vec::new(), Vec::new(), Vec::new()];
        for file in files {
            let idx = (file.tier.clamp(1, 4) - 1) as usize;
            tiers[idx].push(file.path.clone());
        }
        IssueContext { tiers }
    }
}

/// Per-tier file caps from the fractional budget; every tier gets at least
/// one slot while the budget allows.
fn tier_caps(max_total: usize) -> [usize; 4] {
    let mut caps = [0usize; 4];
    for (i, fraction) in TIER_FRACTIONS.iter().enumerate() {
        caps[i] = ((max_total as f64 * fraction).floor() as usize).max(1);
    }
    caps
}

/// All files under the root, repo-relative.
fn list_tree(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    for entry in ignore::WalkBuilder::new(root).build().flatten() {
        if entry.file_type().is_some_and(|t| t.is_file()) {
            if let Some(rel) = relativize(root, entry.path()) {
                files.push(rel);
            }
        }
    }
    files.sort();
    files
}

fn relativize(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

/// Match a mentioned path against the tree: exact relative match first,
/// then unique suffix match.
fn resolve_in_tree(tree: &[String], mentioned: &str) -> Option<String> {
    if tree.iter().any(|f| f == mentioned) {
        return Some(mentioned.to_string());
    }
    let mut matches = tree.iter().filter(|f| f.ends_with(mentioned));
    let first = matches.next()?;
    if matches.next().is_some() {
        // Ambiguous suffix - mentioning "util.rs" in a tree with ten of
        // them carries no signal
        return None;
    }
    Some(first.clone())
}

#[allow(clippy::expect_used)]
static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    // Covers use/mod (Rust), import (Go/TS/Python), require, #include
    Regex::new(
        r#"(?m)^\s*(?:use\s+([A-Za-z0-9_:]+)|mod\s+([A-Za-z0-9_]+)|import\s+[^"'\n]*["']([^"']+)["']|import\s+([A-Za-z0-9_./]+)|from\s+([A-Za-z0-9_.]+)\s+import|require\s*\(\s*["']([^"']+)["']|#include\s+["<]([^">]+)[">])"#,
    )
    .expect("import pattern is valid")
});

/// One-hop import neighbors: files whose stem matches an import target of
/// any source file.
fn import_neighbors(root: &Path, tree: &[String], sources: &[String]) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for source in sources {
        let content = match std::fs::read_to_string(root.join(source)) {
            Ok(content) => content,
            Err(err) => {
                warn!(file = source.as_str(), error = %err, "skipping unreadable import source");
                continue;
            }
        };
        for caps in IMPORT_LINE.captures_iter(&content) {
            let target = caps.iter().skip(1).flatten().map(|m| m.as_str()).last();
            if let Some(target) = target {
                let stem = target
                    .rsplit(['/', ':', '.'])
                    .find(|s| !s.is_empty())
                    .unwrap_or(target);
                if stem.len() >= 2 && !targets.iter().any(|t| t == stem) {
                    targets.push(stem.to_string());
                }
            }
        }
    }

    let mut neighbors = Vec::new();
    for target in &targets {
        for file in tree {
            let stem = Path::new(file)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            if &stem == target && !sources.contains(file) && !neighbors.contains(file) {
                neighbors.push(file.clone());
            }
        }
    }
    neighbors
}

/// Files that define any of the given symbols, found by regex search.
fn symbol_definition_files(root: &Path, symbols: &[String]) -> Vec<String> {
    use grep_regex::RegexMatcherBuilder;
    use grep_searcher::{Searcher, SearcherBuilder, Sink, SinkMatch};

    if symbols.is_empty() {
        return Vec::new();
    }
    let pattern = format!(
        r"(?:fn|func|def|class|struct|enum|trait|type|interface)\s+(?:{})\b",
        symbols
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|")
    );
    let Ok(matcher) = RegexMatcherBuilder::new().build(&pattern) else {
        return Vec::new();
    };

    struct FoundSink {
        found: bool,
    }
    impl Sink for FoundSink {
        type Error = std::io::Error;
        fn matched(&mut self, _: &Searcher, _: &SinkMatch<'_>) -> Result<bool, Self::Error> {
            self.found = true;
            Ok(false)
        }
    }

    let mut searcher = SearcherBuilder::new().build();
    let mut files = Vec::new();
    for entry in ignore::WalkBuilder::new(root).build().flatten() {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let mut sink = FoundSink { found: false };
        if searcher.search_path(&matcher, entry.path(), &mut sink).is_ok() && sink.found {
            if let Some(rel) = relativize(root, entry.path()) {
                files.push(rel);
            }
        }
    }
    files.sort();
    files
}
