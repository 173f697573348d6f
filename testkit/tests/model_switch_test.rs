//! Cross-family model switch: resolve the next model, build its thinking
//! config, and sanitize the running history for the new family - the exact
//! sequence the upstream caller performs on provider fallback.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use cortex_common::{ContentPart, Message, MessageRole, ModelFamily};
use cortex_core::thinking::sanitize;
use cortex_providers::{build_thinking_config, resolve_model};

fn gemini_history() -> Vec<Message> {
    vec![
        Message::user("why does the worker pool stall?"),
        Message::from_parts(
            MessageRole::Assistant,
            vec![
                ContentPart::Text {
                    text: "considering the semaphore ordering".to_string(),
                    thought: true,
                    thought_signature: Some("g".repeat(96)),
                    thinking_metadata: None,
                    signature: None,
                    metadata: None,
                },
                ContentPart::text("The pool stalls because permits leak on panic."),
            ],
        ),
    ]
}

#[test]
fn fallback_from_gemini_to_claude_keeps_history_acceptable() {
    let mut history = gemini_history();

    // The session had been running on Gemini
    let gemini = resolve_model("gemini-3-pro-high").unwrap();
    assert_eq!(gemini.family, ModelFamily::Gemini);
    let config = build_thinking_config(&gemini).unwrap();
    assert_eq!(config["thinkingLevel"], "high");

    // Rate-limited; fall back to Claude without losing conversation state
    let claude = resolve_model("claude-sonnet-4-thinking-medium").unwrap();
    assert_eq!(claude.family, ModelFamily::Claude);
    let config = build_thinking_config(&claude).unwrap();
    assert_eq!(config["thinking_budget"], 16384);

    let outcome = sanitize(&mut history, claude.family);
    assert_eq!(outcome.signatures_stripped, 1);

    // Nothing Gemini-signed remains on the wire
    let wire = serde_json::to_value(&history).unwrap();
    assert!(wire.to_string().contains("permits leak"));
    assert!(!wire.to_string().contains(&"g".repeat(96)));
}

#[test]
fn exactly_one_thinking_representation_per_family() {
    for (name, wants_level) in [
        ("gemini-3-flash-low", true),
        ("claude-opus-4-thinking-high", false),
    ] {
        let resolved = resolve_model(name).unwrap();
        assert!(resolved.supports_thinking);
        assert_eq!(resolved.thinking_level.is_some(), wants_level);
        assert_eq!(resolved.thinking_budget > 0, !wants_level);
    }
}

#[test]
fn switching_to_unknown_family_leaves_history_alone() {
    let mut history = gemini_history();
    let other = resolve_model("gpt-5-codex").unwrap();
    assert_eq!(other.family, ModelFamily::Unknown);
    assert!(build_thinking_config(&other).is_none());

    let outcome = sanitize(&mut history, other.family);
    assert!(!outcome.modified);
}
