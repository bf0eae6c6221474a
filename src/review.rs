//! Review queue selection policy
//!
//! Decides which stored records qualify for human review and in what
//! order they surface: least-confident first, Enterprise tier breaking
//! ties, independent of arrival time. The ordering itself is executed in
//! SQL by the storage backend; this module owns the thresholds and the
//! pagination contract.

use crate::error::Result;
use crate::storage::Storage;
use crate::types::{FeedbackRecord, Page, Sentiment, DEFAULT_PER_PAGE, ENTERPRISE_TIER};

/// Records below this automated confidence qualify for human review
pub const REVIEW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Upper bound on review page size
pub const MAX_PER_PAGE: u64 = 100;

/// Whether a record qualifies for the review queue
///
/// Eligible iff the automated confidence is present and low, and no
/// human correction has been applied yet. A corrected record is resolved
/// and never reappears.
pub fn is_review_eligible(record: &FeedbackRecord) -> bool {
    match record.confidence {
        Some(confidence) => {
            confidence < REVIEW_CONFIDENCE_THRESHOLD && record.human_sentiment.is_none()
        }
        None => false,
    }
}

/// Whether a record is critical: Enterprise tier with Negative automated
/// sentiment. Used for prioritized display only, never stored. A later
/// human correction does not change criticality.
pub fn is_critical(record: &FeedbackRecord) -> bool {
    record.user_tier == ENTERPRISE_TIER && record.sentiment == Sentiment::Negative
}

/// Clamp pagination inputs: page is 1-indexed with minimum 1, per_page
/// is bounded to [1, MAX_PER_PAGE] (0 falls back to the default size).
fn clamp_page_params(page: u64, per_page: u64) -> (u64, u64) {
    let page = page.max(1);
    let per_page = if per_page == 0 {
        DEFAULT_PER_PAGE
    } else {
        per_page.min(MAX_PER_PAGE)
    };
    (page, per_page)
}

fn total_pages(total: u64, per_page: u64) -> u64 {
    total.div_ceil(per_page).max(1)
}

/// Fetch one page of review-eligible records
///
/// Read-only; ordering is ascending confidence with Enterprise-first
/// tie-break, so the least-confident, highest-impact items surface first.
pub async fn select_for_review(
    storage: &dyn Storage,
    page: u64,
    per_page: u64,
) -> Result<Page<FeedbackRecord>> {
    let (page, per_page) = clamp_page_params(page, per_page);
    let offset = (page - 1) * per_page;

    let (data, total) = storage.select_review_page(per_page, offset).await?;

    Ok(Page {
        data,
        total,
        page,
        per_page,
        total_pages: total_pages(total, per_page),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LibsqlStorage;
    use crate::types::{Classification, FeedbackSubmission};
    use chrono::Utc;

    fn record(confidence: Option<f64>, human: Option<Sentiment>) -> FeedbackRecord {
        FeedbackRecord {
            id: 1,
            source: "Discord".to_string(),
            user_tier: "Free".to_string(),
            product_area: "General/Billing".to_string(),
            content: "feedback".to_string(),
            sentiment: Sentiment::Neutral,
            confidence,
            summary: None,
            human_sentiment: human,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_review_eligibility() {
        assert!(is_review_eligible(&record(Some(0.59), None)));
        assert!(is_review_eligible(&record(Some(0.0), None)));
        assert!(!is_review_eligible(&record(Some(0.6), None)));
        assert!(!is_review_eligible(&record(Some(0.9), None)));
        assert!(!is_review_eligible(&record(None, None)));
        // Corrected records are resolved regardless of confidence
        assert!(!is_review_eligible(&record(Some(0.1), Some(Sentiment::Negative))));
    }

    #[test]
    fn test_criticality_uses_automated_sentiment_only() {
        let mut rec = record(Some(0.9), None);
        rec.user_tier = ENTERPRISE_TIER.to_string();
        rec.sentiment = Sentiment::Negative;
        assert!(is_critical(&rec));

        // Correcting to Positive does not clear criticality
        rec.human_sentiment = Some(Sentiment::Positive);
        assert!(is_critical(&rec));

        rec.sentiment = Sentiment::Positive;
        assert!(!is_critical(&rec));

        let mut free = record(Some(0.9), None);
        free.sentiment = Sentiment::Negative;
        assert!(!is_critical(&free));
    }

    #[test]
    fn test_page_param_clamping() {
        assert_eq!(clamp_page_params(0, 10), (1, 10));
        assert_eq!(clamp_page_params(3, 10), (3, 10));
        assert_eq!(clamp_page_params(1, 500), (1, MAX_PER_PAGE));
        assert_eq!(clamp_page_params(1, 0), (1, DEFAULT_PER_PAGE));
    }

    #[test]
    fn test_total_pages_minimum_one() {
        assert_eq!(total_pages(0, 15), 1);
        assert_eq!(total_pages(15, 15), 1);
        assert_eq!(total_pages(16, 15), 2);
        assert_eq!(total_pages(45, 15), 3);
    }

    #[tokio::test]
    async fn test_select_for_review_pagination_metadata() {
        let storage = LibsqlStorage::in_memory().await.unwrap();

        for i in 0..4 {
            let classification = Classification {
                sentiment: Sentiment::Neutral,
                confidence: 0.1 * i as f64,
                summary: "s".to_string(),
            };
            storage
                .insert_feedback(&FeedbackSubmission::new("item"), &classification)
                .await
                .unwrap();
        }

        let page = select_for_review(&storage, 1, 3).await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.data.len(), 3);
        assert_eq!(page.per_page, 3);
        assert_eq!(page.total_pages, 2);

        let page2 = select_for_review(&storage, 2, 3).await.unwrap();
        assert_eq!(page2.data.len(), 1);
        assert_eq!(page2.page, 2);

        // Page 0 clamps to 1
        let clamped = select_for_review(&storage, 0, 3).await.unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.data[0].confidence, page.data[0].confidence);
    }

    #[tokio::test]
    async fn test_empty_store_returns_single_empty_page() {
        let storage = LibsqlStorage::in_memory().await.unwrap();
        let page = select_for_review(&storage, 1, 15).await.unwrap();

        assert_eq!(page.total, 0);
        assert!(page.data.is_empty());
        assert_eq!(page.total_pages, 1);
    }
}
