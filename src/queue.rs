//! In-process feedback queue with at-least-once delivery
//!
//! Producers enqueue validated submissions; the ingestion consumer pulls
//! batches and acknowledges or retries each message independently. A
//! retried message is re-enqueued and redelivered on a later pull, so
//! duplicate processing is possible.

use crate::error::{Result, TriageError};
use crate::types::FeedbackSubmission;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// One queued message with its delivery controls
///
/// Exactly one of `ack` or `retry` should be called; dropping a delivery
/// without either loses the message (the consumer never does this).
pub struct Delivery {
    submission: FeedbackSubmission,
    redeliver: mpsc::UnboundedSender<FeedbackSubmission>,
}

impl Delivery {
    pub fn submission(&self) -> &FeedbackSubmission {
        &self.submission
    }

    /// Acknowledge successful processing
    pub fn ack(self) {}

    /// Mark the message for redelivery on a later batch
    pub fn retry(self) {
        // Send fails only when the queue is gone, at which point the
        // message has nowhere to go anyway.
        let _ = self.redeliver.send(self.submission);
    }
}

/// Thread-safe feedback queue
#[derive(Clone)]
pub struct FeedbackQueue {
    sender: mpsc::UnboundedSender<FeedbackSubmission>,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<FeedbackSubmission>>>,
}

impl FeedbackQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
        }
    }

    /// Validate and enqueue a batch of submissions
    ///
    /// Items without non-empty `content` are dropped at the ingress
    /// boundary; a batch with zero valid items is rejected entirely.
    /// Returns the number of items accepted.
    pub fn enqueue_batch(&self, items: Vec<FeedbackSubmission>) -> Result<usize> {
        let valid: Vec<FeedbackSubmission> =
            items.into_iter().filter(|item| item.is_valid()).collect();

        if valid.is_empty() {
            return Err(TriageError::Validation(
                "No valid feedback items with content found".to_string(),
            ));
        }

        let accepted = valid.len();
        for item in valid {
            self.sender
                .send(item)
                .map_err(|_| TriageError::Validation("Queue is closed".to_string()))?;
        }

        debug!(accepted, "Enqueued feedback batch");
        Ok(accepted)
    }

    /// Drain currently pending messages, up to `max`, without blocking
    ///
    /// Messages retried during processing of the returned batch land
    /// behind it and are only seen by a later call.
    pub async fn try_recv_batch(&self, max: usize) -> Vec<Delivery> {
        let mut receiver = self.receiver.lock().await;
        let mut batch = Vec::new();

        while batch.len() < max {
            match receiver.try_recv() {
                Ok(submission) => batch.push(Delivery {
                    submission,
                    redeliver: self.sender.clone(),
                }),
                Err(_) => break,
            }
        }

        batch
    }

    /// Check whether any messages are pending
    pub async fn has_pending(&self) -> bool {
        let receiver = self.receiver.lock().await;
        !receiver.is_empty()
    }
}

impl Default for FeedbackQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(content: &str) -> FeedbackSubmission {
        FeedbackSubmission::new(content)
    }

    #[tokio::test]
    async fn test_enqueue_filters_invalid_items() {
        let queue = FeedbackQueue::new();

        let accepted = queue
            .enqueue_batch(vec![item("good"), item(""), item("also good")])
            .unwrap();

        assert_eq!(accepted, 2);
        let batch = queue.try_recv_batch(10).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].submission().content, "good");
        assert_eq!(batch[1].submission().content, "also good");
    }

    #[tokio::test]
    async fn test_all_invalid_batch_rejected() {
        let queue = FeedbackQueue::new();

        let result = queue.enqueue_batch(vec![item(""), item("")]);
        assert!(matches!(result, Err(TriageError::Validation(_))));
        assert!(!queue.has_pending().await);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let queue = FeedbackQueue::new();
        assert!(queue.enqueue_batch(vec![]).is_err());
    }

    #[tokio::test]
    async fn test_retry_redelivers_behind_current_batch() {
        let queue = FeedbackQueue::new();
        queue
            .enqueue_batch(vec![item("first"), item("second")])
            .unwrap();

        let mut batch = queue.try_recv_batch(10).await;
        assert_eq!(batch.len(), 2);

        // Retry the first, ack the second
        let first = batch.remove(0);
        first.retry();
        batch.remove(0).ack();

        // Retried message was not part of the drained batch
        let redelivered = queue.try_recv_batch(10).await;
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].submission().content, "first");
    }

    #[tokio::test]
    async fn test_batch_respects_max() {
        let queue = FeedbackQueue::new();
        queue
            .enqueue_batch(vec![item("a"), item("b"), item("c")])
            .unwrap();

        let batch = queue.try_recv_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert!(queue.has_pending().await);
    }
}
