//! Feedback triage - AI-assisted feedback classification pipeline
//!
//! Ingests free-text user feedback, classifies it by sentiment with a
//! language model, persists the result, and surfaces low-confidence
//! classifications through a paginated review queue with a
//! human-correction workflow.
//!
//! # Architecture
//!
//! - **Types**: core data structures (`Sentiment`, `FeedbackRecord`, ...)
//! - **Classifier**: retrying model invocation with defensive parsing
//! - **Queue / Consumer**: at-least-once ingestion of feedback batches
//! - **Review / Corrections**: low-confidence triage and human labels
//! - **Storage**: libSQL persistence behind the `Storage` trait
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use feedback_triage::{
//!     AnthropicClient, Classifier, FeedbackQueue, FeedbackSubmission,
//!     IngestionConsumer, LibsqlStorage, ModelConfig, RetryConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(LibsqlStorage::new_local("feedback.db").await?);
//!     let client = Arc::new(AnthropicClient::new(ModelConfig::default())?);
//!     let classifier = Classifier::new(client, RetryConfig::default());
//!
//!     let queue = FeedbackQueue::new();
//!     queue.enqueue_batch(vec![FeedbackSubmission::new("the app crashes on login")])?;
//!
//!     let consumer = IngestionConsumer::new(classifier, storage.clone());
//!     consumer.drain(&queue).await;
//!
//!     let page = feedback_triage::select_for_review(storage.as_ref(), 1, 15).await?;
//!     println!("{} records awaiting review", page.total);
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod consumer;
pub mod corrections;
pub mod error;
pub mod queue;
pub mod review;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use classifier::{AnthropicClient, Classifier, ModelClient};
pub use config::{ModelConfig, RetryConfig};
pub use consumer::{BatchOutcome, IngestionConsumer};
pub use corrections::apply_correction;
pub use error::{Result, TriageError};
pub use queue::{Delivery, FeedbackQueue};
pub use review::{is_critical, is_review_eligible, select_for_review};
pub use storage::{ConnectionMode, LibsqlStorage, Storage};
pub use types::{
    Classification, FeedbackRecord, FeedbackSubmission, Page, Sentiment,
};
