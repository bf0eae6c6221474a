//! Core data types for the feedback triage pipeline
//!
//! Defines the sentiment classification axis, submitted feedback items,
//! classification results, and stored feedback records. These types flow
//! through every component of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User tier granted prioritized treatment in review ordering
pub const ENTERPRISE_TIER: &str = "Enterprise";

/// Placeholder persisted when a submission omits a metadata field
pub const UNKNOWN_FIELD: &str = "unknown";

/// Default review page size
pub const DEFAULT_PER_PAGE: u64 = 15;

/// Sentiment classification axis for feedback
///
/// `Unknown` is never requested from the model; it is the collapse target
/// for invalid model output and the sentinel for failed invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
    Unknown,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Positive => "Positive",
            Sentiment::Unknown => "Unknown",
        }
    }

    /// Accept a sentiment label from model output
    ///
    /// Only the three literals the prompt requests are accepted; anything
    /// else (including "Unknown" itself, case variants, or garbage)
    /// collapses to `Unknown`.
    pub fn from_model_label(label: &str) -> Self {
        match label {
            "Negative" => Sentiment::Negative,
            "Neutral" => Sentiment::Neutral,
            "Positive" => Sentiment::Positive,
            _ => Sentiment::Unknown,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Sentiment {
    type Err = ();

    /// Exact match on the four valid labels; used for human corrections.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Negative" => Ok(Sentiment::Negative),
            "Neutral" => Ok(Sentiment::Neutral),
            "Positive" => Ok(Sentiment::Positive),
            "Unknown" => Ok(Sentiment::Unknown),
            _ => Err(()),
        }
    }
}

/// Raw feedback item as supplied by an external producer
///
/// Metadata fields are untrusted and optional; only `content` is required.
/// Absent or empty metadata persists as `"unknown"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub user_tier: Option<String>,
    #[serde(default)]
    pub product_area: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl FeedbackSubmission {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            source: None,
            user_tier: None,
            product_area: None,
            content: content.into(),
        }
    }

    /// A submission is ingestible iff its content is non-empty text
    pub fn is_valid(&self) -> bool {
        !self.content.is_empty()
    }
}

/// Result of one classification attempt
///
/// Invariant: `confidence` is always within [0, 1] and `sentiment` is one
/// of the four enum values, regardless of what the model returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub summary: String,
}

/// Persisted feedback record
///
/// Created once per successful classification attempt; `human_sentiment`
/// is the only field ever mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub source: String,
    pub user_tier: String,
    pub product_area: String,
    pub content: String,
    pub sentiment: Sentiment,
    pub confidence: Option<f64>,
    pub summary: Option<String>,
    pub human_sentiment: Option<Sentiment>,
    pub created_at: DateTime<Utc>,
}

/// One page of query results with pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}
