//! Subprocess CLI transport
//!
//! Drives an external LLM CLI (`cli -p <prompt> --model <m> ...`) and
//! parses its JSON responses. Rate limiting is detected both in the
//! response payload and by a stderr signature scan; either path raises a
//! structured [`ProviderError::RateLimit`]. The child process is owned by
//! the call that spawned it and killed on cancellation.

use std::process::Stdio;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde_json::Value;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ProviderError;

/// Provider tag used in errors raised by this transport.
const PROVIDER: &str = "cli";

#[allow(clippy::expect_used)]
static RATE_LIMIT_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)rate limit|rate_limit|too many requests|429")
        .expect("rate limit pattern is valid")
});

#[allow(clippy::expect_used)]
static RETRY_AFTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)retry[-_ ]?after\D{0,3}(\d+)").expect("retry-after pattern is valid")
});

/// Output format requested from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    StreamJson,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::StreamJson => "stream-json",
        }
    }
}

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct CliTransportConfig {
    /// CLI binary to invoke
    pub binary: String,
    /// --max-turns passed to the CLI
    pub max_turns: u32,
    /// Wall-clock limit for one invocation
    pub timeout: Duration,
    /// Pass `--tools ""` to disable the CLI's own tools
    pub disable_tools: bool,
    pub output_format: OutputFormat,
}

impl Default for CliTransportConfig {
    fn default() -> Self {
        Self {
            binary: "cli".to_string(),
            max_turns: 1,
            timeout: Duration::from_secs(120),
            disable_tools: true,
            output_format: OutputFormat::Json,
        }
    }
}

/// One CLI invocation.
#[derive(Debug, Clone)]
pub struct CliRequest {
    pub prompt: String,
    pub model: String,
    pub system_prompt: Option<String>,
    /// JSON schema for structured output, serialized onto --json-schema
    pub json_schema: Option<Value>,
}

impl CliRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system_prompt: None,
            json_schema: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_schema_for<T: JsonSchema>(mut self) -> Self {
        self.json_schema = Some(json_schema_for::<T>());
        self
    }
}

/// Parsed CLI response.
#[derive(Debug, Clone, PartialEq)]
pub enum CliResult {
    /// Surface text
    Text(String),
    /// Opaque structured output, forwarded verbatim to the caller's parser
    Structured(Value),
}

/// JSON schema for a type, in the shape the CLI's --json-schema flag takes.
pub fn json_schema_for<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
}

/// The subprocess transport itself.
#[derive(Debug, Clone, Default)]
pub struct CliTransport {
    config: CliTransportConfig,
}

impl CliTransport {
    pub fn new(config: CliTransportConfig) -> Self {
        Self { config }
    }

    /// Invoke the CLI once.
    ///
    /// Cancellation kills the child process. A timeout is a retryable
    /// [`ProviderError::Timeout`]; a nonzero exit is either a rate limit
    /// (when stderr carries a known signature) or a transport error
    /// wrapping the captured stderr.
    pub async fn invoke(
        &self,
        request: &CliRequest,
        cancel: &CancellationToken,
    ) -> Result<CliResult, ProviderError> {
        let mut command = Command::new(&self.config.binary);
        command
            .arg("-p")
            .arg(&request.prompt)
            .arg("--model")
            .arg(&request.model)
            .arg("--max-turns")
            .arg(self.config.max_turns.to_string());
        if self.config.disable_tools {
            command.arg("--tools").arg("");
        }
        command
            .arg("--output-format")
            .arg(self.config.output_format.as_str());
        if let Some(system_prompt) = &request.system_prompt {
            command.arg("--system-prompt").arg(system_prompt);
        }
        if let Some(schema) = &request.json_schema {
            command.arg("--json-schema").arg(schema.to_string());
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(model = request.model.as_str(), "spawning CLI subprocess");
        let child = command
            .spawn()
            .map_err(|e| ProviderError::transport(PROVIDER, format!("spawn failed: {e}"), ""))?;

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Dropping the wait future drops the child; kill_on_drop reaps it
                return Err(ProviderError::cancelled(PROVIDER));
            }
            _ = tokio::time::sleep(self.config.timeout) => {
                return Err(ProviderError::timeout(
                    PROVIDER,
                    format!("no result after {:?}", self.config.timeout),
                ));
            }
            output = child.wait_with_output() => output
                .map_err(|e| ProviderError::transport(PROVIDER, format!("wait failed: {e}"), ""))?,
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if detect_rate_limit(&stderr) {
            warn!("CLI stderr carries a rate-limit signature");
            return Err(ProviderError::rate_limit(
                PROVIDER,
                "rate limited (stderr signature)",
                derive_retry_after(&stderr),
            ));
        }
        if !output.status.success() {
            return Err(ProviderError::transport(
                PROVIDER,
                format!("exit status {}", output.status),
                &stderr,
            ));
        }

        parse_cli_response(&String::from_utf8_lossy(&output.stdout))
    }
}

/// True if the stderr stream carries a rate-limit signature.
pub fn detect_rate_limit(stderr: &str) -> bool {
    RATE_LIMIT_SIGNATURE.is_match(stderr)
}

/// Retry-after seconds, when derivable from the text.
pub fn derive_retry_after(text: &str) -> Option<u64> {
    RETRY_AFTER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse the CLI's JSON response into a [`CliResult`].
///
/// Accepts the success form (`result` as string or content object), the
/// structured-output form (forwarded opaque), the error object form, and
/// the `is_rate_limited` flag.
pub fn parse_cli_response(stdout: &str) -> Result<CliResult, ProviderError> {
    let value: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| ProviderError::parse(PROVIDER, format!("invalid response JSON: {e}")))?;

    if value.get("is_rate_limited").and_then(Value::as_bool) == Some(true) {
        let message = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("rate limited");
        return Err(ProviderError::rate_limit(
            PROVIDER,
            message,
            derive_retry_after(message),
        ));
    }

    if let Some(error) = value.get("error") {
        let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        if detect_rate_limit(kind) || detect_rate_limit(message) {
            return Err(ProviderError::rate_limit(
                PROVIDER,
                message,
                derive_retry_after(message),
            ));
        }
        return Err(ProviderError::transport(
            PROVIDER,
            format!("{kind}: {message}"),
            "",
        ));
    }

    if let Some(structured) = value.get("structured_output") {
        return Ok(CliResult::Structured(structured.clone()));
    }

    if value.get("type").and_then(Value::as_str) == Some("result") {
        match value.get("result") {
            Some(Value::String(text)) => return Ok(CliResult::Text(text.clone())),
            Some(Value::Object(object)) => {
                let text = object
                    .get("content")
                    .and_then(Value::as_array)
                    .map(|parts| {
                        parts
                            .iter()
                            .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
                            .filter_map(|p| p.get("text").and_then(Value::as_str))
                            .collect::<Vec<_>>()
                            .join("")
                    })
                    .unwrap_or_default();
                return Ok(CliResult::Text(text));
            }
            _ => {
                return Err(ProviderError::parse(
                    PROVIDER,
                    "result payload is neither string nor object",
                ))
            }
        }
    }

    Err(ProviderError::parse(
        PROVIDER,
        "unrecognized response shape",
    ))
}
