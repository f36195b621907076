//! Persistence — libSQL-backed storage for email records and sender history.
//!
//! A single connection is opened at startup and borrowed per operation;
//! `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
//! Errors are returned to the caller, never swallowed here.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{debug, info};

use crate::analysis::{Sentiment, ToneAnalysis};
use crate::error::DatabaseError;
use crate::model::{EmailMessage, EmailStatus};

/// Default number of prior messages fetched for template selection.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS emails (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_address TEXT NOT NULL,
        to_address TEXT NOT NULL,
        subject TEXT,
        content TEXT,
        received_date TIMESTAMP,
        processed_date TIMESTAMP,
        tone_analysis TEXT,
        status TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_emails_from ON emails(from_address);
    CREATE INDEX IF NOT EXISTS idx_emails_status ON emails(status);
"#;

/// A read-only projection of a past message for one sender. Produced by the
/// store, consumed by the reply engine to infer familiarity and sentiment
/// trend.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub subject: Option<String>,
    pub received_date: Option<String>,
    pub processed_date: Option<String>,
    pub tone_analysis: Option<String>,
    pub status: Option<String>,
}

impl HistoryEntry {
    /// Sentiment recorded in the serialized analysis, if it deserializes.
    pub fn sentiment(&self) -> Option<Sentiment> {
        self.tone_analysis
            .as_deref()
            .and_then(|s| serde_json::from_str::<ToneAnalysis>(s).ok())
            .map(|a| a.sentiment)
    }
}

/// Convert `Option<String>` to a libsql value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Email record store.
pub struct EmailStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl EmailStore {
    /// Open (or create) a local database file and ensure the schema exists.
    /// Schema failure here is fatal to startup.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Email database opened");
        Ok(store)
    }

    /// In-memory database for tests.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("failed to create in-memory database: {e}"))
            })?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn()
            .execute_batch(SCHEMA)
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::Schema(e.to_string()))
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Insert a new message record. Returns the store-assigned id.
    pub async fn insert(&self, email: &EmailMessage) -> Result<i64, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO emails (from_address, to_address, subject, content, received_date, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                email.from_addr.as_str(),
                email.to_addr.as_str(),
                opt_text(email.subject.as_deref()),
                opt_text(email.body.as_deref()),
                email.received_at.to_rfc3339(),
                email.status.as_str(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let id = conn.last_insert_rowid();
        debug!(id, from = %email.from_addr, "Email inserted");
        Ok(id)
    }

    /// Update a message's status.
    pub async fn update_status(&self, id: i64, status: EmailStatus) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "UPDATE emails SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        debug!(id, status = status.as_str(), "Email status updated");
        Ok(())
    }

    /// Store the analysis result, processed timestamp, and new status in one
    /// statement.
    pub async fn update_analysis(
        &self,
        id: i64,
        analysis: &ToneAnalysis,
        processed_at: DateTime<Utc>,
        status: EmailStatus,
    ) -> Result<(), DatabaseError> {
        let serialized = serde_json::to_string(analysis)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        let conn = self.conn();
        conn.execute(
            "UPDATE emails SET tone_analysis = ?1, processed_date = ?2, status = ?3 WHERE id = ?4",
            params![serialized, processed_at.to_rfc3339(), status.as_str(), id],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        debug!(id, "Analysis results stored");
        Ok(())
    }

    /// Prior messages from one sender, most recent first. Reads reflect only
    /// committed writes.
    pub async fn history(
        &self,
        sender: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, subject, received_date, processed_date, tone_analysis, status
                 FROM emails
                 WHERE from_address = ?1
                 ORDER BY received_date DESC
                 LIMIT ?2",
                params![sender, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut history = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            history.push(HistoryEntry {
                id: row.get(0).map_err(|e| DatabaseError::Query(e.to_string()))?,
                subject: row.get(1).ok(),
                received_date: row.get(2).ok(),
                processed_date: row.get(3).ok(),
                tone_analysis: row.get(4).ok(),
                status: row.get(5).ok(),
            });
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::analysis::Sentiment;

    fn message_at(sender: &str, received_at: DateTime<Utc>) -> EmailMessage {
        EmailMessage::received(
            sender,
            "support@example.com",
            Some("Question".into()),
            Some("Where is my order?".into()),
            received_at,
        )
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = EmailStore::new_memory().await.unwrap();
        let id1 = store
            .insert(&message_at("a@x.com", Utc::now()))
            .await
            .unwrap();
        let id2 = store
            .insert(&message_at("a@x.com", Utc::now()))
            .await
            .unwrap();
        assert!(id2 > id1);
    }

    #[tokio::test]
    async fn history_round_trip_reflects_updated_analysis() {
        let store = EmailStore::new_memory().await.unwrap();
        let id = store
            .insert(&message_at("alice@x.com", Utc::now()))
            .await
            .unwrap();

        let analysis = ToneAnalysis {
            sentiment: Sentiment::Negative,
            ..ToneAnalysis::fallback()
        };
        store
            .update_analysis(id, &analysis, Utc::now(), EmailStatus::Processed)
            .await
            .unwrap();

        let history = store
            .history("alice@x.com", DEFAULT_HISTORY_LIMIT)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, id);
        assert_eq!(history[0].status.as_deref(), Some("PROCESSED"));
        assert!(history[0].processed_date.is_some());
        assert_eq!(history[0].sentiment(), Some(Sentiment::Negative));
    }

    #[tokio::test]
    async fn history_sorted_descending_and_limited() {
        let store = EmailStore::new_memory().await.unwrap();
        for day in 1..=4 {
            let at = Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap();
            store.insert(&message_at("bob@x.com", at)).await.unwrap();
        }

        let history = store.history("bob@x.com", 3).await.unwrap();
        assert_eq!(history.len(), 3);
        let dates: Vec<_> = history
            .iter()
            .map(|h| h.received_date.clone().unwrap())
            .collect();
        let mut sorted = dates.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(dates, sorted);
    }

    #[tokio::test]
    async fn history_is_per_sender() {
        let store = EmailStore::new_memory().await.unwrap();
        store
            .insert(&message_at("one@x.com", Utc::now()))
            .await
            .unwrap();
        store
            .insert(&message_at("two@x.com", Utc::now()))
            .await
            .unwrap();

        let history = store.history("one@x.com", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(store.history("nobody@x.com", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_status_is_visible() {
        let store = EmailStore::new_memory().await.unwrap();
        let id = store
            .insert(&message_at("c@x.com", Utc::now()))
            .await
            .unwrap();
        store.update_status(id, EmailStatus::Error).await.unwrap();

        let history = store.history("c@x.com", 10).await.unwrap();
        assert_eq!(history[0].status.as_deref(), Some("ERROR"));
    }

    #[test]
    fn history_entry_sentiment_tolerates_garbage() {
        let entry = HistoryEntry {
            id: 1,
            subject: None,
            received_date: None,
            processed_date: None,
            tone_analysis: Some("not json".into()),
            status: None,
        };
        assert!(entry.sentiment().is_none());
    }
}
