//! Thinking recovery - re-sealing turns whose reasoning trace was lost
//!
//! A conversation stuck mid-tool-loop with thinking disabled or corrupted
//! cannot simply be repaired: provider state behind a broken signature is
//! gone. Recovery abandons the current turn instead - it strips remnants,
//! closes the loop with a synthetic assistant message, and appends a
//! synthetic user nudge so the next assistant turn starts a fresh, valid
//! thinking block.

use cortex_common::{ContentPart, Message, MessageContent, MessageRole};

use super::sanitizer::{is_thinking_part, strip_all_thinking_blocks};

/// Synthetic user message appended after a recovery close.
pub const CONTINUE_MESSAGE: &str = "[Continue]";

/// Derived view of the conversation tail. Recomputed per call, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversationAnalysis {
    /// The tail is a user message carrying tool results (mid-tool-loop)
    pub in_tool_loop: bool,
    /// First assistant message after the last real user message - the start
    /// of the current turn, which may span several assistant messages
    pub turn_start_idx: Option<usize>,
    /// The current turn's *first* assistant message opened with thinking
    pub turn_has_thinking: bool,
    /// Index of the last assistant message
    pub last_model_idx: Option<usize>,
    pub last_model_has_thinking: bool,
    pub last_model_has_tool_calls: bool,
}

/// Walk the tail of the conversation and derive its state.
///
/// A "turn" spans from the last real user message (one with visible text,
/// not just tool results) through every assistant message after it. The
/// thinking block, when present, appears on the first of those assistant
/// messages - not necessarily the last.
pub fn analyze_conversation_state(history: &[Message]) -> ConversationAnalysis {
    let in_tool_loop = history
        .last()
        .is_some_and(|m| m.role == MessageRole::User && m.has_tool_result());

    let last_real_user = history
        .iter()
        .rposition(|m| m.role == MessageRole::User && m.has_text());
    let turn_search_start = last_real_user.map_or(0, |i| i + 1);
    let turn_start_idx = history
        .iter()
        .enumerate()
        .skip(turn_search_start)
        .find(|(_, m)| m.role == MessageRole::Assistant)
        .map(|(i, _)| i);
    let turn_has_thinking =
        turn_start_idx.is_some_and(|i| history[i].parts().iter().any(is_thinking_part));

    let last_model_idx = history
        .iter()
        .rposition(|m| m.role == MessageRole::Assistant);
    let (last_model_has_thinking, last_model_has_tool_calls) = match last_model_idx {
        Some(i) => (
            history[i].parts().iter().any(is_thinking_part),
            history[i].has_tool_use(),
        ),
        None => (false, false),
    };

    ConversationAnalysis {
        in_tool_loop,
        turn_start_idx,
        turn_has_thinking,
        last_model_idx,
        last_model_has_thinking,
        last_model_has_tool_calls,
    }
}

/// True when the conversation is mid-tool-loop and the current turn never
/// opened a thinking block - the signal that reasoning was lost and a clean
/// close is needed before the next call.
pub fn needs_thinking_recovery(history: &[Message]) -> bool {
    let analysis = analyze_conversation_state(history);
    analysis.in_tool_loop && !analysis.turn_has_thinking
}

/// Abandon the current tool loop and re-seal the turn boundary.
///
/// Strips any thinking remnants, acknowledges the trailing tool results
/// with a synthetic assistant message, and appends a synthetic user
/// "[Continue]" so the upstream drives a clean new turn.
pub fn close_tool_loop_for_thinking(history: &mut Vec<Message>) {
    strip_all_thinking_blocks(history);

    let trailing_responses = count_trailing_tool_responses(history);
    let close_text = match trailing_responses {
        0 => "[Processing previous context.]".to_string(),
        1 => "[Tool execution completed.]".to_string(),
        n => format!("[{n} tool executions completed.]"),
    };

    history.push(Message::assistant(close_text));
    history.push(Message::user(CONTINUE_MESSAGE));
}

/// Tool-response parts that arrived after the last assistant message.
fn count_trailing_tool_responses(history: &[Message]) -> usize {
    let after = history
        .iter()
        .rposition(|m| m.role == MessageRole::Assistant)
        .map_or(0, |i| i + 1);
    history[after..]
        .iter()
        .map(|m| m.parts().iter().filter(|p| p.is_tool_result()).count())
        .sum()
}

/// Heuristic for turns that were compacted away from their reasoning
/// prelude: a tool call with no thinking part and no text before the first
/// call.
pub fn looks_like_compacted_thinking_turn(message: &Message) -> bool {
    let parts = match &message.content {
        MessageContent::Parts(parts) => parts,
        MessageContent::Text(_) => return false,
    };

    let mut saw_tool_call = false;
    for part in parts {
        if is_thinking_part(part) {
            return false;
        }
        match part {
            ContentPart::ToolUse { .. } => {
                saw_tool_call = true;
            }
            ContentPart::Text { text, .. } if !saw_tool_call && !text.is_empty() => {
                // Text preceding the first call means the prelude survived
                return false;
            }
            _ => {}
        }
    }
    saw_tool_call
}
