//! Configuration for the triage pipeline
//!
//! Retry knobs are injected values rather than process-wide globals so
//! tests can shrink the backoff to zero.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the Anthropic model client
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Anthropic API key
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// Max tokens for responses
    pub max_tokens: usize,

    /// Temperature for sampling
    pub temperature: f32,

    /// API base URL
    pub base_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }
}

/// Retry policy for classifier model invocations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Backoff base; attempt N sleeps `base_delay * 2^N` after failure
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Zero-delay policy for tests
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }
}

/// Default database path under the platform data directory
fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feedback-triage")
        .join("feedback.db")
}

/// Resolve the database path from CLI arg, env var, or default
pub fn resolve_db_path(cli_path: Option<String>) -> String {
    cli_path
        .or_else(|| env::var("FEEDBACK_TRIAGE_DB").ok())
        .unwrap_or_else(|| default_db_path().to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_cli_path_takes_precedence() {
        let resolved = resolve_db_path(Some("/tmp/custom.db".to_string()));
        assert_eq!(resolved, "/tmp/custom.db");
    }
}
