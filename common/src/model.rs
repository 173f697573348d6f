//! Model family identification shared by the context core and providers.

use serde::{Deserialize, Serialize};

/// Reasoning-model family a model name resolves to.
///
/// The two families disagree on the wire format of thinking traces: Gemini
/// marks parts with a `thought` flag and `thoughtSignature`, Claude uses
/// `thinking` / `redacted_thinking` typed parts with a `signature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Gemini,
    Claude,
    Unknown,
}

impl ModelFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Gemini => "gemini",
            ModelFamily::Claude => "claude",
            ModelFamily::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
