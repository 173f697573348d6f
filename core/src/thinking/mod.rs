//! Thinking-trace machinery: cross-family sanitization and turn recovery.

pub mod recovery;
pub mod sanitizer;

pub use recovery::{
    analyze_conversation_state, close_tool_loop_for_thinking, looks_like_compacted_thinking_turn,
    needs_thinking_recovery, ConversationAnalysis, CONTINUE_MESSAGE,
};
pub use sanitizer::{
    filter_unsigned_thinking, has_valid_signature, is_thinking_part, sanitize,
    strip_all_thinking_blocks, SanitizeOutcome, MIN_VALID_SIGNATURE_LEN,
};
