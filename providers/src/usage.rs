//! Usage accounting persistence
//!
//! Aggregate token counters persisted as a JSON document keyed `version`
//! and `aggregate`, with per-provider, per-model and per-session breakdown
//! maps. The file is rewritten atomically (temp file + rename) so a crash
//! mid-save never corrupts the counters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;

/// Current on-disk document version.
pub const USAGE_STORE_VERSION: u32 = 1;

/// Fresh random session identifier.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Default location: ~/.cortex/usage.json
pub fn default_usage_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cortex").join("usage.json"))
}

/// Aggregate counters across all dimensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageAggregate {
    pub total_tokens: u64,
    #[serde(default)]
    pub by_provider: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_model: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_session: BTreeMap<String, u64>,
}

/// The persisted document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageDocument {
    pub version: u32,
    pub aggregate: UsageAggregate,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for UsageDocument {
    fn default() -> Self {
        Self {
            version: USAGE_STORE_VERSION,
            aggregate: UsageAggregate::default(),
            updated_at: None,
        }
    }
}

/// File-backed usage counter store.
#[derive(Debug)]
pub struct UsageStore {
    path: PathBuf,
    document: UsageDocument,
}

impl UsageStore {
    /// Load the store, starting fresh when the file is missing.
    ///
    /// A corrupted document is an error rather than a silent reset; the
    /// caller decides whether to discard history.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let path = path.into();
        let document = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                ProviderError::parse("usage", format!("corrupt usage document: {e}"))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no usage document, starting fresh");
                UsageDocument::default()
            }
            Err(err) => {
                return Err(ProviderError::transport(
                    "usage",
                    format!("failed to read {}: {err}", path.display()),
                    "",
                ))
            }
        };
        Ok(Self { path, document })
    }

    pub fn aggregate(&self) -> &UsageAggregate {
        &self.document.aggregate
    }

    /// Add tokens across every dimension.
    pub fn record(&mut self, provider: &str, model: &str, session: &str, tokens: u64) {
        let aggregate = &mut self.document.aggregate;
        aggregate.total_tokens += tokens;
        *aggregate.by_provider.entry(provider.to_string()).or_default() += tokens;
        *aggregate.by_model.entry(model.to_string()).or_default() += tokens;
        *aggregate.by_session.entry(session.to_string()).or_default() += tokens;
        self.document.updated_at = Some(Utc::now());
    }

    /// Atomic rewrite: serialize to a sibling temp file, then rename over
    /// the target.
    pub fn save(&self) -> Result<(), ProviderError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ProviderError::transport(
                    "usage",
                    format!("failed to create {}: {e}", parent.display()),
                    "",
                )
            })?;
        }
        let raw = serde_json::to_string_pretty(&self.document)
            .map_err(|e| ProviderError::parse("usage", format!("serialize failed: {e}")))?;

        let tmp = temp_sibling(&self.path);
        std::fs::write(&tmp, raw).map_err(|e| {
            ProviderError::transport("usage", format!("failed to write {}: {e}", tmp.display()), "")
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            ProviderError::transport(
                "usage",
                format!("failed to replace {}: {e}", self.path.display()),
                "",
            )
        })
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "usage.json".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}
