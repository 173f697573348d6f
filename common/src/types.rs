//! Shared types used across cortex crates
//!
//! These types represent the core data structures for LLM conversations
//! and are used by both the context core and the provider layer. Thinking
//! traces are modelled as tagged content parts rather than open maps so the
//! sanitizer can operate on variants instead of string keys.

use serde::{Deserialize, Serialize};

/// Message role in conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

/// Message content types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Structured content with multiple parts
    Parts(Vec<ContentPart>),
}

/// Provider-specific metadata attached to a content part.
///
/// Gemini nests thought signatures under `metadata.google`; unknown fields
/// are preserved verbatim so sanitization never loses foreign metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PartMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleMetadata>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PartMetadata {
    /// True when stripping left nothing worth serializing.
    pub fn is_empty(&self) -> bool {
        self.google.is_none() && self.extra.is_empty()
    }
}

/// The `metadata.google` sub-object carried by Gemini content parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GoogleMetadata {
    #[serde(
        rename = "thoughtSignature",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thought_signature: Option<String>,
    #[serde(
        rename = "thinkingMetadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thinking_metadata: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GoogleMetadata {
    /// True when no signature material or extra fields remain.
    pub fn is_empty(&self) -> bool {
        self.thought_signature.is_none()
            && self.thinking_metadata.is_none()
            && self.extra.is_empty()
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Content part for structured messages
///
/// Covers both reasoning-model wire shapes: Gemini marks thinking with a
/// `thought` flag plus `thoughtSignature` on otherwise-ordinary parts, while
/// Claude uses dedicated `thinking` / `redacted_thinking` part types with a
/// `signature` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    /// Text content
    #[serde(rename = "text")]
    Text {
        text: String,
        /// Gemini thinking marker - a truthy flag makes this a thought part
        #[serde(default, skip_serializing_if = "is_false")]
        thought: bool,
        /// Gemini top-level thought signature
        #[serde(
            rename = "thoughtSignature",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        thought_signature: Option<String>,
        /// Gemini thinking metadata container
        #[serde(
            rename = "thinkingMetadata",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        thinking_metadata: Option<serde_json::Value>,
        /// Loose Claude-style signature some payloads carry on plain parts
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        /// Provider metadata (nested signature location for Gemini)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<PartMetadata>,
    },
    /// Claude extended-thinking block
    #[serde(rename = "thinking")]
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Claude redacted thinking block (content withheld by the provider)
    #[serde(rename = "redacted_thinking")]
    RedactedThinking {
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Reasoning block emitted by OpenAI-compatible reasoning models
    #[serde(rename = "reasoning")]
    Reasoning {
        reasoning: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Tool call request
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
        /// Gemini thought signature attached to the function call
        #[serde(
            rename = "thoughtSignature",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        thought_signature: Option<String>,
        /// Loose signature field, stripped defensively on family switches
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Tool call result
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentPart {
    /// Plain text part with no thinking metadata
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text {
            text: text.into(),
            thought: false,
            thought_signature: None,
            thinking_metadata: None,
            signature: None,
            metadata: None,
        }
    }

    /// Claude thinking part
    pub fn thinking(thinking: impl Into<String>, signature: Option<String>) -> Self {
        ContentPart::Thinking {
            thinking: thinking.into(),
            signature,
        }
    }

    /// Tool call part
    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        ContentPart::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
            thought_signature: None,
            signature: None,
        }
    }

    /// Tool result part
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentPart::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// True for tool call parts
    pub fn is_tool_use(&self) -> bool {
        matches!(self, ContentPart::ToolUse { .. })
    }

    /// True for tool result parts
    pub fn is_tool_result(&self) -> bool {
        matches!(self, ContentPart::ToolResult { .. })
    }
}

/// Conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: MessageRole,
    /// Message content
    pub content: MessageContent,
}

impl Message {
    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create an assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a system message with text content
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a message from structured parts
    pub fn from_parts(role: MessageRole, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: MessageContent::Parts(parts),
        }
    }

    /// View the message content as parts, if structured
    pub fn parts(&self) -> &[ContentPart] {
        match &self.content {
            MessageContent::Parts(parts) => parts,
            MessageContent::Text(_) => &[],
        }
    }

    /// True if the message carries any visible text
    pub fn has_text(&self) -> bool {
        match &self.content {
            MessageContent::Text(text) => !text.is_empty(),
            MessageContent::Parts(parts) => parts.iter().any(
                |p| matches!(p, ContentPart::Text { text, thought, .. } if !text.is_empty() && !thought),
            ),
        }
    }

    /// True if the message contains a tool call part
    pub fn has_tool_use(&self) -> bool {
        self.parts().iter().any(ContentPart::is_tool_use)
    }

    /// True if the message contains a tool result part
    pub fn has_tool_result(&self) -> bool {
        self.parts().iter().any(ContentPart::is_tool_result)
    }
}
