//! Unified provider error type
//!
//! One error enum for everything provider-facing, distinguishing rate
//! limits (a structured value carrying retry advice, not a stringly-typed
//! error), cancellation, timeouts and transport failures so callers can
//! drive retry and fallback logic from the type alone.

use thiserror::Error;

/// Maximum stderr bytes carried inside a transport error.
pub const STDERR_CAPTURE_LIMIT: usize = 500;

/// Unified error type for the provider layer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Rate limit - too many requests; retry after the given delay
    #[error("[{provider}] Rate limit exceeded: {message}")]
    RateLimit {
        provider: String,
        message: String,
        /// Suggested retry delay in seconds (if derivable)
        retry_after_secs: Option<u64>,
    },

    /// The caller's cancellation token fired
    #[error("[{provider}] Cancelled")]
    Cancelled { provider: String },

    /// Request or subprocess timed out
    #[error("[{provider}] Timeout: {message}")]
    Timeout { provider: String, message: String },

    /// Transport failure - wraps the OS-level error and captured stderr
    #[error("[{provider}] Transport error: {message}")]
    Transport { provider: String, message: String },

    /// Provider payload could not be parsed
    #[error("[{provider}] Parse error: {message}")]
    Parse { provider: String, message: String },

    /// Requested model could not be resolved
    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    /// Invalid configuration or missing required settings
    #[error("[{provider}] Configuration error: {message}")]
    Configuration { provider: String, message: String },
}

impl ProviderError {
    /// Check if this error is retryable
    ///
    /// Retryable errors are those that might succeed if tried again:
    /// rate limits (after the advised delay) and timeouts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit { .. } | ProviderError::Timeout { .. }
        )
    }

    /// Suggested retry delay in seconds for rate limit errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimit {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// Provider name attached to this error, when there is one.
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            ProviderError::RateLimit { provider, .. }
            | ProviderError::Cancelled { provider }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Parse { provider, .. }
            | ProviderError::Configuration { provider, .. } => Some(provider),
            ProviderError::UnknownModel { .. } => None,
        }
    }

    pub fn rate_limit(
        provider: impl Into<String>,
        message: impl Into<String>,
        retry_after_secs: Option<u64>,
    ) -> Self {
        ProviderError::RateLimit {
            provider: provider.into(),
            message: message.into(),
            retry_after_secs,
        }
    }

    pub fn cancelled(provider: impl Into<String>) -> Self {
        ProviderError::Cancelled {
            provider: provider.into(),
        }
    }

    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Timeout {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Transport error wrapping an OS-level failure plus any captured
    /// stderr, truncated to [`STDERR_CAPTURE_LIMIT`].
    pub fn transport(
        provider: impl Into<String>,
        message: impl Into<String>,
        stderr: &str,
    ) -> Self {
        let mut message = message.into();
        if !stderr.is_empty() {
            let truncated: String = stderr.chars().take(STDERR_CAPTURE_LIMIT).collect();
            message.push_str("; stderr: ");
            message.push_str(truncated.trim_end());
        }
        ProviderError::Transport {
            provider: provider.into(),
            message,
        }
    }

    pub fn parse(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Parse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Configuration {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
