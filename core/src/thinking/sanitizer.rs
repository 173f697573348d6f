//! Cross-family thinking-trace sanitizer
//!
//! Thought signatures are provider-session tokens: a history that carries
//! one family's signatures is rejected by the other family's API. When the
//! model family for the next call differs from the family that produced the
//! traces in history, the foreign signatures are stripped - sanitizing for
//! Claude removes Gemini artifacts and vice versa. The sanitizer is a total
//! function over malformed input and never errors.

use cortex_common::{ContentPart, Message, MessageContent, ModelFamily};

/// Signatures shorter than this are not real provider tokens and are left
/// alone.
pub const MIN_VALID_SIGNATURE_LEN: usize = 50;

/// What a sanitize pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeOutcome {
    /// Anything at all changed (signatures, metadata containers)
    pub modified: bool,
    /// Number of valid signatures removed
    pub signatures_stripped: usize,
}

fn is_valid_signature(sig: &Option<String>) -> bool {
    sig.as_deref().is_some_and(|s| s.len() >= MIN_VALID_SIGNATURE_LEN)
}

/// Strip the other family's thinking signatures from a conversation history.
///
/// Idempotent: sanitizing an already-clean history reports
/// `modified = false`. An unknown target family is a no-op.
pub fn sanitize(history: &mut [Message], target: ModelFamily) -> SanitizeOutcome {
    let mut outcome = SanitizeOutcome::default();
    match target {
        ModelFamily::Claude => {
            for message in history.iter_mut() {
                strip_gemini_artifacts(message, &mut outcome);
            }
        }
        ModelFamily::Gemini => {
            for message in history.iter_mut() {
                strip_claude_artifacts(message, &mut outcome);
            }
        }
        ModelFamily::Unknown => {}
    }
    outcome
}

/// Remove Gemini thought signatures and thinking metadata so a Claude
/// endpoint accepts the history. Empty metadata containers left behind by
/// the stripping are removed; every other field is preserved.
fn strip_gemini_artifacts(message: &mut Message, outcome: &mut SanitizeOutcome) {
    let MessageContent::Parts(parts) = &mut message.content else {
        return;
    };
    for part in parts.iter_mut() {
        match part {
            ContentPart::Text {
                thought_signature,
                thinking_metadata,
                metadata,
                ..
            } => {
                if is_valid_signature(thought_signature) {
                    *thought_signature = None;
                    outcome.signatures_stripped += 1;
                    outcome.modified = true;
                }
                if thinking_metadata.is_some() {
                    *thinking_metadata = None;
                    outcome.modified = true;
                }
                if let Some(meta) = metadata {
                    if let Some(google) = &mut meta.google {
                        if is_valid_signature(&google.thought_signature) {
                            google.thought_signature = None;
                            outcome.signatures_stripped += 1;
                            outcome.modified = true;
                        }
                        if google.thinking_metadata.is_some() {
                            google.thinking_metadata = None;
                            outcome.modified = true;
                        }
                        if google.is_empty() {
                            meta.google = None;
                            outcome.modified = true;
                        }
                    }
                    if meta.is_empty() {
                        *metadata = None;
                        outcome.modified = true;
                    }
                }
            }
            ContentPart::ToolUse {
                thought_signature, ..
            } => {
                if is_valid_signature(thought_signature) {
                    *thought_signature = None;
                    outcome.signatures_stripped += 1;
                    outcome.modified = true;
                }
            }
            _ => {}
        }
    }
}

/// Remove Claude signatures (thinking-typed parts plus any loose signature
/// field) so a Gemini endpoint accepts the history.
fn strip_claude_artifacts(message: &mut Message, outcome: &mut SanitizeOutcome) {
    let MessageContent::Parts(parts) = &mut message.content else {
        return;
    };
    for part in parts.iter_mut() {
        let signature = match part {
            ContentPart::Thinking { signature, .. }
            | ContentPart::RedactedThinking { signature, .. }
            | ContentPart::Reasoning { signature, .. }
            | ContentPart::Text { signature, .. }
            | ContentPart::ToolUse { signature, .. } => signature,
            ContentPart::ToolResult { .. } => continue,
        };
        if is_valid_signature(signature) {
            *signature = None;
            outcome.signatures_stripped += 1;
            outcome.modified = true;
        }
    }
}

/// True iff the part is a thinking part in either family's encoding.
pub fn is_thinking_part(part: &ContentPart) -> bool {
    match part {
        ContentPart::Text { thought, .. } => *thought,
        ContentPart::Thinking { .. }
        | ContentPart::RedactedThinking { .. }
        | ContentPart::Reasoning { .. } => true,
        ContentPart::ToolUse { .. } | ContentPart::ToolResult { .. } => false,
    }
}

/// True iff either family's signature field holds a plausibly real token.
pub fn has_valid_signature(part: &ContentPart) -> bool {
    match part {
        ContentPart::Text {
            thought_signature,
            signature,
            metadata,
            ..
        } => {
            is_valid_signature(thought_signature)
                || is_valid_signature(signature)
                || metadata
                    .as_ref()
                    .and_then(|m| m.google.as_ref())
                    .is_some_and(|g| is_valid_signature(&g.thought_signature))
        }
        ContentPart::Thinking { signature, .. }
        | ContentPart::RedactedThinking { signature, .. }
        | ContentPart::Reasoning { signature, .. } => is_valid_signature(signature),
        ContentPart::ToolUse {
            thought_signature,
            signature,
            ..
        } => is_valid_signature(thought_signature) || is_valid_signature(signature),
        ContentPart::ToolResult { .. } => false,
    }
}

/// Remove every thinking part from every message.
///
/// A message whose parts would all be removed is kept intact instead: the
/// history never gains an empty message. Returns true if anything changed.
pub fn strip_all_thinking_blocks(history: &mut [Message]) -> bool {
    let mut modified = false;
    for message in history.iter_mut() {
        let MessageContent::Parts(parts) = &message.content else {
            continue;
        };
        let kept: Vec<ContentPart> = parts
            .iter()
            .filter(|p| !is_thinking_part(p))
            .cloned()
            .collect();
        if kept.len() != parts.len() && !kept.is_empty() {
            message.content = MessageContent::Parts(kept);
            modified = true;
        }
    }
    modified
}

/// Remove thinking parts that lack a valid signature; signed thinking and
/// all non-thinking parts are kept.
pub fn filter_unsigned_thinking(history: &mut [Message]) -> bool {
    let mut modified = false;
    for message in history.iter_mut() {
        let MessageContent::Parts(parts) = &mut message.content else {
            continue;
        };
        let before = parts.len();
        parts.retain(|p| !is_thinking_part(p) || has_valid_signature(p));
        if parts.len() != before {
            modified = true;
        }
    }
    modified
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use cortex_common::{GoogleMetadata, MessageRole, PartMetadata};

    fn gemini_thought_part(signature: &str) -> ContentPart {
        ContentPart::Text {
            text: "the model considered three approaches".to_string(),
            thought: true,
            thought_signature: Some(signature.to_string()),
            thinking_metadata: None,
            signature: None,
            metadata: None,
        }
    }

    #[test]
    fn test_sanitize_for_claude_strips_gemini_signature() {
        let mut history = vec![Message::from_parts(
            MessageRole::Assistant,
            vec![gemini_thought_part(&"g".repeat(64)), ContentPart::text("answer")],
        )];
        let outcome = sanitize(&mut history, ModelFamily::Claude);
        assert!(outcome.modified);
        assert_eq!(outcome.signatures_stripped, 1);

        let ContentPart::Text {
            text,
            thought,
            thought_signature,
            ..
        } = &history[0].parts()[0]
        else {
            panic!("expected text part");
        };
        // Signature gone, everything else untouched
        assert!(thought_signature.is_none());
        assert!(*thought);
        assert_eq!(text, "the model considered three approaches");
    }

    #[test]
    fn test_short_signature_left_alone() {
        let mut history = vec![Message::from_parts(
            MessageRole::Assistant,
            vec![gemini_thought_part("short")],
        )];
        let outcome = sanitize(&mut history, ModelFamily::Claude);
        assert!(!outcome.modified);
        assert_eq!(outcome.signatures_stripped, 0);
    }

    #[test]
    fn test_nested_google_metadata_cleanup_preserves_other_fields() {
        let mut extra = serde_json::Map::new();
        extra.insert("otherField".to_string(), serde_json::json!("keep-me"));
        let part = ContentPart::Text {
            text: "answer".to_string(),
            thought: false,
            thought_signature: None,
            thinking_metadata: None,
            signature: None,
            metadata: Some(PartMetadata {
                google: Some(GoogleMetadata {
                    thought_signature: Some("g".repeat(64)),
                    thinking_metadata: Some(serde_json::json!({"tokens": 120})),
                    extra,
                }),
                extra: serde_json::Map::new(),
            }),
        };
        let mut history = vec![Message::from_parts(MessageRole::Assistant, vec![part])];

        let outcome = sanitize(&mut history, ModelFamily::Claude);
        assert!(outcome.modified);
        assert_eq!(outcome.signatures_stripped, 1);

        let ContentPart::Text { metadata, .. } = &history[0].parts()[0] else {
            panic!("expected text part");
        };
        let google = metadata.as_ref().unwrap().google.as_ref().unwrap();
        assert!(google.thought_signature.is_none());
        assert!(google.thinking_metadata.is_none());
        assert_eq!(google.extra["otherField"], "keep-me");
    }

    #[test]
    fn test_emptied_metadata_containers_removed() {
        let part = ContentPart::Text {
            text: "answer".to_string(),
            thought: false,
            thought_signature: None,
            thinking_metadata: None,
            signature: None,
            metadata: Some(PartMetadata {
                google: Some(GoogleMetadata {
                    thought_signature: Some("g".repeat(64)),
                    thinking_metadata: None,
                    extra: serde_json::Map::new(),
                }),
                extra: serde_json::Map::new(),
            }),
        };
        let mut history = vec![Message::from_parts(MessageRole::Assistant, vec![part])];
        sanitize(&mut history, ModelFamily::Claude);

        let ContentPart::Text { metadata, .. } = &history[0].parts()[0] else {
            panic!("expected text part");
        };
        assert!(metadata.is_none());
    }

    #[test]
    fn test_sanitize_for_gemini_strips_claude_signatures() {
        let mut history = vec![Message::from_parts(
            MessageRole::Assistant,
            vec![
                ContentPart::thinking("let me check", Some("c".repeat(80))),
                ContentPart::RedactedThinking {
                    data: "redacted".to_string(),
                    signature: Some("c".repeat(80)),
                },
                ContentPart::text("done"),
            ],
        )];
        let outcome = sanitize(&mut history, ModelFamily::Gemini);
        assert_eq!(outcome.signatures_stripped, 2);
        for part in history[0].parts() {
            assert!(!has_valid_signature(part));
        }
    }

    #[test]
    fn test_loose_signature_stripped_defensively() {
        let mut history = vec![Message::from_parts(
            MessageRole::Assistant,
            vec![ContentPart::Text {
                text: "answer".to_string(),
                thought: false,
                thought_signature: None,
                thinking_metadata: None,
                signature: Some("c".repeat(64)),
                metadata: None,
            }],
        )];
        let outcome = sanitize(&mut history, ModelFamily::Gemini);
        assert_eq!(outcome.signatures_stripped, 1);
    }

    #[test]
    fn test_unknown_family_is_noop() {
        let mut history = vec![Message::from_parts(
            MessageRole::Assistant,
            vec![gemini_thought_part(&"g".repeat(64))],
        )];
        let outcome = sanitize(&mut history, ModelFamily::Unknown);
        assert!(!outcome.modified);
        assert_eq!(outcome.signatures_stripped, 0);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let mut history = vec![Message::from_parts(
            MessageRole::Assistant,
            vec![
                gemini_thought_part(&"g".repeat(64)),
                ContentPart::thinking("hm", Some("c".repeat(64))),
            ],
        )];
        let first = sanitize(&mut history, ModelFamily::Claude);
        assert!(first.modified);
        let second = sanitize(&mut history, ModelFamily::Claude);
        assert!(!second.modified);
        assert_eq!(second.signatures_stripped, 0);
    }

    #[test]
    fn test_cross_family_round_trip_law() {
        // Claude-target sanitize removes the Gemini signature; a follow-up
        // Gemini-target sanitize finds nothing Claude-shaped to strip.
        let mut history = vec![Message::from_parts(
            MessageRole::Assistant,
            vec![gemini_thought_part(&"g".repeat(64))],
        )];
        let first = sanitize(&mut history, ModelFamily::Claude);
        assert_eq!(first.signatures_stripped, 1);
        let second = sanitize(&mut history, ModelFamily::Gemini);
        assert!(!second.modified);
    }

    #[test]
    fn test_strip_all_never_empties_a_message() {
        let mut history = vec![
            Message::from_parts(
                MessageRole::Assistant,
                vec![ContentPart::thinking("only thinking", Some("c".repeat(64)))],
            ),
            Message::from_parts(
                MessageRole::Assistant,
                vec![
                    ContentPart::thinking("thinking", None),
                    ContentPart::text("visible"),
                ],
            ),
        ];
        strip_all_thinking_blocks(&mut history);
        // All-thinking message kept intact
        assert_eq!(history[0].parts().len(), 1);
        // Mixed message loses only the thinking part
        assert_eq!(history[1].parts().len(), 1);
        assert!(matches!(history[1].parts()[0], ContentPart::Text { .. }));
    }

    #[test]
    fn test_filter_unsigned_thinking() {
        let mut history = vec![Message::from_parts(
            MessageRole::Assistant,
            vec![
                ContentPart::thinking("signed", Some("c".repeat(64))),
                ContentPart::thinking("unsigned", None),
                ContentPart::text("visible"),
            ],
        )];
        filter_unsigned_thinking(&mut history);
        let parts = history[0].parts();
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], ContentPart::Thinking { .. }));
        assert!(matches!(&parts[1], ContentPart::Text { .. }));
    }

    #[test]
    fn test_is_thinking_part_both_families() {
        assert!(is_thinking_part(&gemini_thought_part("x")));
        assert!(is_thinking_part(&ContentPart::thinking("t", None)));
        assert!(is_thinking_part(&ContentPart::Reasoning {
            reasoning: "r".to_string(),
            signature: None,
        }));
        assert!(!is_thinking_part(&ContentPart::text("plain")));
        assert!(!is_thinking_part(&ContentPart::tool_use(
            "1",
            "read",
            serde_json::json!({})
        )));
    }
}
