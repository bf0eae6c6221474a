//! Human correction workflow
//!
//! Validates and applies a human-supplied sentiment label onto an
//! existing record. Fails closed: an invalid label or unknown id yields
//! `Ok(false)` with no mutation, reserving `Err` for storage failures.

use crate::error::Result;
use crate::storage::Storage;
use crate::types::Sentiment;
use tracing::{debug, warn};

/// Apply a human sentiment correction to a record
///
/// The label must be exactly one of the four valid sentiment values.
/// Applying a correction to an already-corrected record overwrites the
/// prior correction (last-write-wins); the automated `sentiment` field is
/// never touched. Repeating the identical correction is idempotent.
pub async fn apply_correction(storage: &dyn Storage, id: i64, label: &str) -> Result<bool> {
    let Ok(sentiment) = label.parse::<Sentiment>() else {
        warn!(id, label, "Rejected correction with invalid sentiment label");
        return Ok(false);
    };

    let affected = storage.update_human_sentiment(id, sentiment).await?;
    if affected == 0 {
        debug!(id, "Correction targeted a missing record");
        return Ok(false);
    }

    debug!(id, sentiment = %sentiment, "Applied human correction");
    Ok(true)
}
