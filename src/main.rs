//! Feedback triage CLI
//!
//! Operational entry point for the classification pipeline: initialize
//! the database, ingest a JSON batch of feedback, inspect the review
//! queue, and apply human corrections.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use feedback_triage::{
    apply_correction, config, is_critical, select_for_review, AnthropicClient, Classifier,
    FeedbackQueue, FeedbackSubmission, IngestionConsumer, LibsqlStorage, ModelConfig, RetryConfig,
    Storage,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "feedback-triage", version, about = "AI-assisted feedback triage pipeline")]
struct Cli {
    /// Database path (overrides FEEDBACK_TRIAGE_DB)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the database and run migrations
    Init,

    /// Classify and store a JSON array of feedback items
    Ingest {
        /// Path to a JSON file containing an array of feedback items
        file: String,
    },

    /// Show the human review queue (least-confident first)
    Review {
        #[arg(long, default_value_t = 1)]
        page: u64,

        #[arg(long, default_value_t = 15)]
        per_page: u64,
    },

    /// Apply a human sentiment correction to a record
    Correct {
        id: i64,

        /// One of: Negative, Neutral, Positive, Unknown
        sentiment: String,
    },

    /// Show a single feedback record
    Show { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = config::resolve_db_path(cli.db);
    let storage = Arc::new(LibsqlStorage::new_local(&db_path).await?);

    match cli.command {
        Command::Init => {
            println!("Database ready at {}", db_path);
        }
        Command::Ingest { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file))?;
            let items: Vec<FeedbackSubmission> =
                serde_json::from_str(&raw).context("Expected a JSON array of feedback items")?;

            let queue = FeedbackQueue::new();
            let accepted = queue.enqueue_batch(items)?;

            let client = Arc::new(AnthropicClient::new(ModelConfig::default())?);
            let classifier = Classifier::new(client, RetryConfig::default());
            let consumer = IngestionConsumer::new(classifier, storage.clone());

            // Keep passing until redeliveries settle
            let mut processed = 0;
            let mut passes = 0;
            while queue.has_pending().await {
                let outcome = consumer.drain(&queue).await;
                processed += outcome.processed;
                passes += 1;
                if passes >= 5 && outcome.processed == 0 {
                    bail!("Giving up after {} passes; messages still pending", passes);
                }
            }

            println!("Accepted {} items, stored {} records", accepted, processed);
        }
        Command::Review { page, per_page } => {
            let result = select_for_review(storage.as_ref(), page, per_page).await?;
            println!(
                "Review queue: {} total, page {}/{}",
                result.total, result.page, result.total_pages
            );
            for record in &result.data {
                let marker = if is_critical(record) { " [CRITICAL]" } else { "" };
                println!(
                    "#{} {:.2} {} ({} / {}){} - {}",
                    record.id,
                    record.confidence.unwrap_or(0.0),
                    record.sentiment,
                    record.user_tier,
                    record.product_area,
                    marker,
                    record.summary.as_deref().unwrap_or(""),
                );
            }
        }
        Command::Correct { id, sentiment } => {
            if apply_correction(storage.as_ref(), id, &sentiment).await? {
                println!("Record {} corrected to {}", id, sentiment);
            } else {
                bail!(
                    "Correction rejected: invalid sentiment or unknown record (id {}, {:?})",
                    id,
                    sentiment
                );
            }
        }
        Command::Show { id } => {
            let record = storage.get_feedback(id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}
