//! Sentiment classification via a language model
//!
//! Wraps a single model invocation with bounded retry, exponential
//! backoff, and defensive parsing of the semi-structured text response.
//! `Classifier::classify` never fails: transient invocation errors retry
//! up to the configured budget, then degrade to a sentinel `Unknown`
//! result; malformed output degrades locally and is never retried.

use crate::config::{ModelConfig, RetryConfig};
use crate::error::{Result, TriageError};
use crate::types::{Classification, Sentiment};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Request timeout duration
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum summary length taken from an unparsable response
const RAW_SUMMARY_MAX_CHARS: usize = 200;

/// Neutral confidence when the model responded but omitted the field;
/// distinct from the 0.0 hard-failure sentinel.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Model invocation boundary
///
/// Any error is treated as retryable by the classifier; no structured
/// error taxonomy is assumed.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a prompt and return the raw text response
    async fn invoke(&self, prompt: &str) -> Result<String>;
}

/// Anthropic Messages API message format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic Messages API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    text: String,
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    config: ModelConfig,
    client: Client,
}

impl AnthropicClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(TriageError::Config(
                "ANTHROPIC_API_KEY not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TriageError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        debug!("Calling Anthropic API: model {}", self.config.model);

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| TriageError::Network(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body = response
                    .json::<AnthropicResponse>()
                    .await
                    .map_err(|e| TriageError::ModelApi(e.to_string()))?;

                let text = body
                    .content
                    .into_iter()
                    .map(|c| c.text)
                    .collect::<Vec<_>>()
                    .join("");

                if text.is_empty() {
                    return Err(TriageError::ModelApi(
                        "Empty response from model".to_string(),
                    ));
                }

                Ok(text)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                TriageError::Authentication("Invalid or missing API key".to_string()),
            ),
            StatusCode::TOO_MANY_REQUESTS => Err(TriageError::RateLimitExceeded(
                "Anthropic rate limit exceeded".to_string(),
            )),
            _ => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                Err(TriageError::ModelApi(format!(
                    "API error (status {}): {}",
                    status, error_text
                )))
            }
        }
    }
}

/// Sentiment classifier with bounded retry and defensive parsing
pub struct Classifier {
    client: Arc<dyn ModelClient>,
    retry: RetryConfig,
}

impl Classifier {
    pub fn new(client: Arc<dyn ModelClient>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Classify a piece of feedback text
    ///
    /// Always returns a value. The first successful model response is
    /// terminal: a response that fails to parse degrades to an `Unknown`
    /// result but is not a retry trigger. Only invocation errors retry.
    pub async fn classify(&self, content: &str) -> Classification {
        let prompt = build_prompt(content);
        let mut last_error: Option<TriageError> = None;

        for attempt in 0..self.retry.max_attempts {
            match self.client.invoke(&prompt).await {
                Ok(text) => {
                    debug!(attempt, response_len = text.len(), "Model responded");
                    return parse_model_response(&text);
                }
                Err(e) => {
                    warn!(attempt, err = %e, "Model invocation failed");
                    last_error = Some(e);

                    if attempt + 1 < self.retry.max_attempts {
                        let delay = self.retry.base_delay * 2u32.pow(attempt);
                        sleep(delay).await;
                    }
                }
            }
        }

        if let Some(e) = last_error {
            error!(err = %e, "Classification failed after retries");
        }

        Classification {
            sentiment: Sentiment::Unknown,
            confidence: 0.0,
            summary: "AI analysis failed after multiple attempts".to_string(),
        }
    }
}

/// Build the fixed instructional prompt, embedding the feedback verbatim
fn build_prompt(content: &str) -> String {
    format!(
        r#"Analyze the following user feedback and provide:
1. Sentiment: Classify as exactly one of: Negative, Neutral, or Positive
2. Confidence: A number between 0.0 and 1.0 indicating how confident you are in the sentiment classification
3. Summary: Summarize the problem or feedback in 1 sentence

Feedback: "{content}"

Respond in this exact JSON format only, no other text:
{{"sentiment": "Negative|Neutral|Positive", "confidence": 0.85, "summary": "one sentence summary"}}"#
    )
}

/// Parse a raw model response into a classification
///
/// The response is untrusted text: the first `{...}` substring (greedy
/// to the last `}`) is parsed as JSON, with per-field validation. No JSON
/// at all falls back to an `Unknown` result carrying the raw text.
fn parse_model_response(text: &str) -> Classification {
    if let Some(value) = extract_json_object(text) {
        let sentiment = value
            .get("sentiment")
            .and_then(|v| v.as_str())
            .map(Sentiment::from_model_label)
            .unwrap_or(Sentiment::Unknown);

        let confidence = parse_confidence(value.get("confidence"));

        let summary = value
            .get("summary")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Unable to summarize".to_string());

        return Classification {
            sentiment,
            confidence,
            summary,
        };
    }

    Classification {
        sentiment: Sentiment::Unknown,
        confidence: 0.0,
        summary: text.trim().chars().take(RAW_SUMMARY_MAX_CHARS).collect(),
    }
}

/// Extract and parse the first-to-last brace substring of the response
fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    serde_json::from_str(&text[start..=end]).ok()
}

/// Normalize the model-reported confidence into [0, 1]
///
/// Numbers clamp directly. Numeric strings parse as floats; a parsed
/// value above 1 is taken as a percentage and divided by 100. Anything
/// else falls back to the neutral default.
fn parse_confidence(value: Option<&serde_json::Value>) -> f64 {
    match value {
        Some(serde_json::Value::Number(n)) => match n.as_f64() {
            Some(num) => num.clamp(0.0, 1.0),
            None => DEFAULT_CONFIDENCE,
        },
        Some(serde_json::Value::String(s)) => match s.parse::<f64>() {
            Ok(num) if num.is_finite() => {
                let num = if num > 1.0 { num / 100.0 } else { num };
                num.clamp(0.0, 1.0)
            }
            _ => DEFAULT_CONFIDENCE,
        },
        _ => DEFAULT_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted model client: pops one canned outcome per invocation
    struct ScriptedClient {
        outcomes: Mutex<VecDeque<Result<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(outcomes: Vec<Result<String>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn invoke(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TriageError::Network("exhausted".to_string())))
        }
    }

    fn classifier_with(outcomes: Vec<Result<String>>) -> (Classifier, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::new(outcomes));
        let classifier = Classifier::new(client.clone(), RetryConfig::immediate());
        (classifier, client)
    }

    fn net_err() -> Result<String> {
        Err(TriageError::Network("connection reset".to_string()))
    }

    #[tokio::test]
    async fn test_all_attempts_fail_returns_sentinel() {
        let (classifier, client) = classifier_with(vec![net_err(), net_err(), net_err()]);

        let result = classifier.classify("the product is broken").await;

        assert_eq!(result.sentiment, Sentiment::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.summary, "AI analysis failed after multiple attempts");
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let (classifier, client) = classifier_with(vec![
            net_err(),
            net_err(),
            Ok(r#"{"sentiment": "Negative", "confidence": 0.9, "summary": "Broken login"}"#
                .to_string()),
        ]);

        let result = classifier.classify("login is broken").await;

        assert_eq!(result.sentiment, Sentiment::Negative);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.summary, "Broken login");
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unparsable_response_is_terminal_not_retried() {
        let (classifier, client) = classifier_with(vec![
            Ok("I could not produce JSON for this one, sorry.".to_string()),
            Ok(r#"{"sentiment": "Positive", "confidence": 1.0, "summary": "never reached"}"#
                .to_string()),
        ]);

        let result = classifier.classify("hello").await;

        assert_eq!(client.call_count(), 1);
        assert_eq!(result.sentiment, Sentiment::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.summary, "I could not produce JSON for this one, sorry.");
    }

    #[tokio::test]
    async fn test_percentage_string_confidence() {
        let (classifier, _) = classifier_with(vec![Ok(
            r#"Sure! {"sentiment": "Positive", "confidence": "85", "summary": "Loves the product"}"#
                .to_string(),
        )]);

        let result = classifier.classify("love it").await;

        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.summary, "Loves the product");
    }

    #[test]
    fn test_numeric_confidence_clamped() {
        let parsed = parse_model_response(
            r#"{"sentiment": "Neutral", "confidence": 3.2, "summary": "ok"}"#,
        );
        assert_eq!(parsed.confidence, 1.0);

        let parsed = parse_model_response(
            r#"{"sentiment": "Neutral", "confidence": -0.4, "summary": "ok"}"#,
        );
        assert_eq!(parsed.confidence, 0.0);
    }

    #[test]
    fn test_fractional_string_confidence_not_divided() {
        // Numeric strings already <= 1 are taken as fractions as-is
        let parsed = parse_model_response(
            r#"{"sentiment": "Neutral", "confidence": "0.7", "summary": "ok"}"#,
        );
        assert_eq!(parsed.confidence, 0.7);

        let parsed = parse_model_response(
            r#"{"sentiment": "Neutral", "confidence": "1", "summary": "ok"}"#,
        );
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn test_missing_or_invalid_confidence_defaults() {
        let parsed = parse_model_response(r#"{"sentiment": "Negative", "summary": "ok"}"#);
        assert_eq!(parsed.confidence, DEFAULT_CONFIDENCE);

        let parsed = parse_model_response(
            r#"{"sentiment": "Negative", "confidence": "very sure", "summary": "ok"}"#,
        );
        assert_eq!(parsed.confidence, DEFAULT_CONFIDENCE);

        let parsed = parse_model_response(
            r#"{"sentiment": "Negative", "confidence": true, "summary": "ok"}"#,
        );
        assert_eq!(parsed.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_invalid_sentiment_collapses_to_unknown() {
        let parsed = parse_model_response(
            r#"{"sentiment": "ecstatic", "confidence": 0.9, "summary": "ok"}"#,
        );
        assert_eq!(parsed.sentiment, Sentiment::Unknown);
        // Confidence and summary still honored from the parsed body
        assert_eq!(parsed.confidence, 0.9);
        assert_eq!(parsed.summary, "ok");
    }

    #[test]
    fn test_missing_or_empty_summary_placeholder() {
        let parsed =
            parse_model_response(r#"{"sentiment": "Positive", "confidence": 0.8}"#);
        assert_eq!(parsed.summary, "Unable to summarize");

        let parsed = parse_model_response(
            r#"{"sentiment": "Positive", "confidence": 0.8, "summary": ""}"#,
        );
        assert_eq!(parsed.summary, "Unable to summarize");
    }

    #[test]
    fn test_no_json_fallback_truncates_raw_text() {
        let long = format!("  {}  ", "x".repeat(400));
        let parsed = parse_model_response(&long);

        assert_eq!(parsed.sentiment, Sentiment::Unknown);
        assert_eq!(parsed.confidence, 0.0);
        assert_eq!(parsed.summary.chars().count(), RAW_SUMMARY_MAX_CHARS);
    }

    #[test]
    fn test_surrounding_prose_stripped() {
        let parsed = parse_model_response(
            r#"Here is the analysis you asked for:
{"sentiment": "Negative", "confidence": 0.3, "summary": "Slow dashboard"}
Hope this helps!"#,
        );
        assert_eq!(parsed.sentiment, Sentiment::Negative);
        assert_eq!(parsed.confidence, 0.3);
        assert_eq!(parsed.summary, "Slow dashboard");
    }

    #[test]
    fn test_prompt_embeds_content_verbatim() {
        let prompt = build_prompt("the \"search\" page 500s");
        assert!(prompt.contains("the \"search\" page 500s"));
        assert!(prompt.contains("Negative, Neutral, or Positive"));
    }
}
