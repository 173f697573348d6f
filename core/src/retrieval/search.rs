//! Keyword search engine over a source tree
//!
//! Uses grep-regex and grep-searcher for content search with an
//! ignore-aware walk, fanned out across keywords on tokio tasks. Each
//! keyword search gets its own timeout; individual failures are logged and
//! dropped, never fatal. Cancelling the caller's token cancels all peer
//! searches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use grep_regex::RegexMatcherBuilder;
use grep_searcher::{Searcher, SearcherBuilder, Sink, SinkMatch};
use ignore::WalkBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::cache::SearchCache;

/// One keyword match in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub path: PathBuf,
    pub line: u64,
    pub keyword: String,
}

/// Tuning for the search fan-out.
#[derive(Debug, Clone)]
pub struct KeywordSearchConfig {
    /// Maximum keywords searched concurrently
    pub parallelism: usize,
    /// Per-keyword search timeout
    pub search_timeout: Duration,
    /// Hits kept per keyword
    pub max_hits_per_keyword: usize,
    /// Cache capacity (keywords)
    pub cache_capacity: usize,
    /// Cache entry lifetime
    pub cache_ttl: Duration,
}

impl Default for KeywordSearchConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            search_timeout: Duration::from_secs(5),
            max_hits_per_keyword: 50,
            cache_capacity: 64,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Fan-out keyword search over a project root.
pub struct KeywordSearchEngine {
    root: PathBuf,
    config: KeywordSearchConfig,
    cache: Arc<SearchCache>,
}

impl KeywordSearchEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, KeywordSearchConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: KeywordSearchConfig) -> Self {
        let cache = Arc::new(SearchCache::new(config.cache_capacity, config.cache_ttl));
        Self {
            root: root.into(),
            config,
            cache,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Search all keywords, merging per-keyword hit lists in keyword order.
    ///
    /// Cached keywords are served without touching the tree. A cancelled
    /// token stops the fan-out and returns whatever already completed.
    pub async fn search_keywords(
        &self,
        keywords: &[String],
        cancel: &CancellationToken,
    ) -> Vec<SearchHit> {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.parallelism.max(1)));
        let mut pending = Vec::with_capacity(keywords.len());

        for keyword in keywords {
            if let Some(hits) = self.cache.get(keyword) {
                debug!(keyword = keyword.as_str(), hits = hits.len(), "keyword cache hit");
                pending.push(PendingSearch::Ready(hits));
                continue;
            }

            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let root = self.root.clone();
            let keyword = keyword.clone();
            let timeout = self.config.search_timeout;
            let max_hits = self.config.max_hits_per_keyword;

            pending.push(PendingSearch::Task(
                keyword.clone(),
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let search = tokio::task::spawn_blocking(move || {
                        search_one_keyword(&root, &keyword, max_hits)
                    });
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        _ = tokio::time::sleep(timeout) => None,
                        result = search => result.ok()?.ok(),
                    }
                }),
            ));
        }

        let mut merged = Vec::new();
        for entry in pending {
            match entry {
                PendingSearch::Ready(hits) => merged.extend(hits),
                PendingSearch::Task(keyword, task) => match task.await {
                    Ok(Some(hits)) => {
                        self.cache.insert(keyword, hits.clone());
                        merged.extend(hits);
                    }
                    Ok(None) => {
                        warn!(
                            keyword = keyword.as_str(),
                            "keyword search timed out, failed, or was cancelled"
                        );
                    }
                    Err(err) => {
                        warn!(keyword = keyword.as_str(), error = %err, "keyword search task panicked");
                    }
                },
            }
        }
        merged
    }
}

enum PendingSearch {
    Ready(Vec<SearchHit>),
    Task(String, tokio::task::JoinHandle<Option<Vec<SearchHit>>>),
}

/// Blocking single-keyword search over the ignore-aware walk.
fn search_one_keyword(
    root: &Path,
    keyword: &str,
    max_hits: usize,
) -> Result<Vec<SearchHit>, anyhow::Error> {
    let matcher = RegexMatcherBuilder::new()
        .case_insensitive(true)
        .build(&regex::escape(keyword))?;

    let mut searcher = SearcherBuilder::new().line_number(true).build();
    let mut hits = Vec::new();

    for entry in WalkBuilder::new(root).build() {
        if hits.len() >= max_hits {
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let mut sink = HitSink {
            path: entry.path(),
            keyword,
            hits: &mut hits,
            max_hits,
        };
        // Binary files and read errors are skipped silently
        let _ = searcher.search_path(&matcher, entry.path(), &mut sink);
    }

    Ok(hits)
}

struct HitSink<'a> {
    path: &'a Path,
    keyword: &'a str,
    hits: &'a mut Vec<SearchHit>,
    max_hits: usize,
}

impl Sink for HitSink<'_> {
    type Error = std::io::Error;

    fn matched(&mut self, _searcher: &Searcher, mat: &SinkMatch<'_>) -> Result<bool, Self::Error> {
        self.hits.push(SearchHit {
            path: self.path.to_path_buf(),
            line: mat.line_number().unwrap_or(0),
            keyword: self.keyword.to_string(),
        });
        Ok(self.hits.len() < self.max_hits)
    }
}
