//! Storage layer for the feedback triage pipeline
//!
//! Defines the persistence boundary consumed by the ingestion consumer,
//! review selector, and correction applier, plus the libSQL-backed
//! implementation.

pub mod libsql;

pub use self::libsql::{ConnectionMode, LibsqlStorage};

use crate::error::Result;
use crate::types::{Classification, FeedbackRecord, FeedbackSubmission, Sentiment};
use async_trait::async_trait;

/// Persistence boundary for feedback records
///
/// Each operation is a single atomic statement; the store is the
/// pipeline's sole synchronization point, and no multi-statement
/// transactions are required.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert a new feedback record pairing a submission with its
    /// classification outcome. Errors propagate to the caller untried.
    async fn insert_feedback(
        &self,
        submission: &FeedbackSubmission,
        classification: &Classification,
    ) -> Result<()>;

    /// Fetch one page of review-eligible records plus the total count,
    /// ordered by ascending confidence with Enterprise-tier tie-break.
    async fn select_review_page(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<FeedbackRecord>, u64)>;

    /// Set the human-supplied sentiment on a record, returning the number
    /// of rows affected (0 when the id does not exist).
    async fn update_human_sentiment(&self, id: i64, sentiment: Sentiment) -> Result<u64>;

    /// Fetch a single record by id
    async fn get_feedback(&self, id: i64) -> Result<FeedbackRecord>;

    /// Total number of stored feedback records
    async fn count_feedback(&self) -> Result<u64>;
}
