//! LibSQL storage backend
//!
//! Persists feedback records in a local or in-memory libSQL database.
//! A single connection is opened at construction and cloned per
//! operation so in-memory databases keep their contents across calls.

use crate::error::{Result, TriageError};
use crate::review::REVIEW_CONFIDENCE_THRESHOLD;
use crate::storage::Storage;
use crate::types::{Classification, FeedbackRecord, FeedbackSubmission, Sentiment, UNKNOWN_FIELD};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{params, Builder, Connection, Database};
use tracing::{debug, info};

const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

/// Migration files applied in order at startup
const MIGRATIONS: &[(&str, &str)] = &[("001_initial_schema.sql", INITIAL_SCHEMA)];

const RECORD_COLUMNS: &str =
    "id, source, user_tier, product_area, content, sentiment, confidence, summary, human_sentiment, created_at";

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// In-memory database (for testing)
    InMemory,
}

/// LibSQL storage backend
pub struct LibsqlStorage {
    _db: Database,
    conn: Connection,
}

impl LibsqlStorage {
    /// Create a new storage backend and run pending migrations
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        info!("Connecting to libSQL database: {:?}", mode);

        let db = match mode {
            ConnectionMode::Local(ref path) => {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        TriageError::Database(format!(
                            "Failed to create database directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }

                Builder::new_local(path).build().await.map_err(|e| {
                    TriageError::Database(format!("Failed to open local database: {}", e))
                })?
            }
            ConnectionMode::InMemory => {
                Builder::new_local(":memory:").build().await.map_err(|e| {
                    TriageError::Database(format!("Failed to create in-memory database: {}", e))
                })?
            }
        };

        let conn = db
            .connect()
            .map_err(|e| TriageError::Database(format!("Failed to get connection: {}", e)))?;

        let storage = Self { _db: db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a local database file
    pub async fn new_local(path: &str) -> Result<Self> {
        Self::new(ConnectionMode::Local(path.to_string())).await
    }

    /// Open a fresh in-memory database
    pub async fn in_memory() -> Result<Self> {
        Self::new(ConnectionMode::InMemory).await
    }

    fn get_conn(&self) -> Connection {
        self.conn.clone()
    }

    /// Apply pending schema migrations, tracking applied names
    async fn run_migrations(&self) -> Result<()> {
        let conn = self.get_conn();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations_applied (
                migration_name TEXT PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )",
            params![],
        )
        .await
        .map_err(|e| TriageError::Migration(format!("Failed to create migrations table: {}", e)))?;

        for (name, sql) in MIGRATIONS {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM _migrations_applied WHERE migration_name = ?",
                    params![*name],
                )
                .await?;

            let already_applied = match rows.next().await? {
                Some(row) => row.get::<i64>(0).unwrap_or(0) > 0,
                None => false,
            };

            if already_applied {
                debug!("Skipping already applied migration: {}", name);
                continue;
            }

            for statement in split_statements(sql) {
                conn.execute(&statement, params![]).await.map_err(|e| {
                    TriageError::Migration(format!("Failed to execute {}: {}", name, e))
                })?;
            }

            conn.execute(
                "INSERT INTO _migrations_applied (migration_name, applied_at) VALUES (?, ?)",
                params![*name, Utc::now().timestamp()],
            )
            .await
            .map_err(|e| TriageError::Migration(format!("Failed to record migration: {}", e)))?;

            info!("Applied migration: {}", name);
        }

        Ok(())
    }

    fn row_to_record(row: &libsql::Row) -> Result<FeedbackRecord> {
        let sentiment_str: String = row.get(5)?;
        let sentiment: Sentiment = sentiment_str.parse().map_err(|_| {
            TriageError::Database(format!("Invalid stored sentiment: {}", sentiment_str))
        })?;

        let human_sentiment = match row.get::<Option<String>>(8)? {
            Some(s) => Some(s.parse::<Sentiment>().map_err(|_| {
                TriageError::Database(format!("Invalid stored human sentiment: {}", s))
            })?),
            None => None,
        };

        let created_at_str: String = row.get(9)?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| TriageError::Database(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(FeedbackRecord {
            id: row.get(0)?,
            source: row.get(1)?,
            user_tier: row.get(2)?,
            product_area: row.get(3)?,
            content: row.get(4)?,
            sentiment,
            confidence: row.get(6)?,
            summary: row.get(7)?,
            human_sentiment,
            created_at,
        })
    }
}

/// Split a migration file into individual statements, dropping comments
fn split_statements(sql: &str) -> Vec<String> {
    let body: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    body.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn field_or_unknown(value: &Option<String>) -> &str {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_FIELD)
}

#[async_trait]
impl Storage for LibsqlStorage {
    async fn insert_feedback(
        &self,
        submission: &FeedbackSubmission,
        classification: &Classification,
    ) -> Result<()> {
        debug!(
            sentiment = %classification.sentiment,
            confidence = classification.confidence,
            "Inserting feedback record"
        );

        let conn = self.get_conn();
        conn.execute(
            r#"
            INSERT INTO feedback (source, user_tier, product_area, content, sentiment, confidence, summary, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                field_or_unknown(&submission.source),
                field_or_unknown(&submission.user_tier),
                field_or_unknown(&submission.product_area),
                submission.content.clone(),
                classification.sentiment.as_str(),
                classification.confidence,
                classification.summary.clone(),
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;

        Ok(())
    }

    async fn select_review_page(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<FeedbackRecord>, u64)> {
        let conn = self.get_conn();

        let mut count_rows = conn
            .query(
                "SELECT COUNT(*) FROM feedback
                 WHERE confidence IS NOT NULL AND confidence < ? AND human_sentiment IS NULL",
                params![REVIEW_CONFIDENCE_THRESHOLD],
            )
            .await?;

        let total = match count_rows.next().await? {
            Some(row) => row.get::<i64>(0)? as u64,
            None => 0,
        };

        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM feedback
            WHERE confidence IS NOT NULL AND confidence < ? AND human_sentiment IS NULL
            ORDER BY confidence ASC, (CASE WHEN user_tier = 'Enterprise' THEN 0 ELSE 1 END) ASC
            LIMIT ? OFFSET ?
            "#
        );

        let mut rows = conn
            .query(
                &sql,
                params![REVIEW_CONFIDENCE_THRESHOLD, limit as i64, offset as i64],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::row_to_record(&row)?);
        }

        Ok((records, total))
    }

    async fn update_human_sentiment(&self, id: i64, sentiment: Sentiment) -> Result<u64> {
        debug!(id, sentiment = %sentiment, "Applying human sentiment");

        let conn = self.get_conn();
        let affected = conn
            .execute(
                "UPDATE feedback SET human_sentiment = ? WHERE id = ?",
                params![sentiment.as_str(), id],
            )
            .await?;

        Ok(affected)
    }

    async fn get_feedback(&self, id: i64) -> Result<FeedbackRecord> {
        let conn = self.get_conn();
        let sql = format!("SELECT {RECORD_COLUMNS} FROM feedback WHERE id = ?");
        let mut rows = conn.query(&sql, params![id]).await?;

        let row = rows.next().await?.ok_or(TriageError::NotFound(id))?;
        Self::row_to_record(&row)
    }

    async fn count_feedback(&self) -> Result<u64> {
        let conn = self.get_conn();
        let mut rows = conn.query("SELECT COUNT(*) FROM feedback", params![]).await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }
}
