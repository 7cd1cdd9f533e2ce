//! Persisted conversation memory.
//!
//! Two record kinds live in sqlite: full chat turns, kept forever, and
//! truncated context summaries, of which only the newest `summary_limit`
//! per session survive. Recording an answer writes both and trims the
//! summaries inside one transaction, so concurrent answers can never leave
//! more than `summary_limit` summaries behind.

pub mod summary;

use std::path::Path;
use std::sync::Arc;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::config::settings::MemorySettings;
pub use summary::{truncate_context, DEFAULT_SUMMARY_MAX_CHARS};

pub const DEFAULT_SUMMARY_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to open memory database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to initialize memory schema: {0}")]
    Schema(#[source] sqlx::Error),
    #[error("memory query failed: {0}")]
    Query(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: i64,
    pub session_id: String,
    pub user_input: String,
    pub bot_reply: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub id: i64,
    pub session_id: String,
    pub summary: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy)]
pub struct MemoryLimits {
    /// Summaries kept per session after each insert.
    pub summary_limit: usize,
    /// Character budget of one summary before the ellipsis.
    pub summary_max_chars: usize,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            summary_limit: DEFAULT_SUMMARY_LIMIT,
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
        }
    }
}

impl From<&MemorySettings> for MemoryLimits {
    fn from(settings: &MemorySettings) -> Self {
        Self {
            summary_limit: settings.summary_limit.max(1),
            summary_max_chars: settings.summary_max_chars,
        }
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    pool: SqlitePool,
    limits: MemoryLimits,
    write_lock: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub async fn new(db_path: &Path, limits: MemoryLimits) -> Result<Self, MemoryError> {
        let conn_str = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&conn_str)
            .await
            .map_err(MemoryError::Connect)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                user_input TEXT NOT NULL,
                bot_reply TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(MemoryError::Schema)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS context_memory (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                summary TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(MemoryError::Schema)?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_chat_history_session ON chat_history(session_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_context_memory_session ON context_memory(session_id, created_at)",
        ] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(MemoryError::Schema)?;
        }

        Ok(Self {
            pool,
            limits,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn limits(&self) -> MemoryLimits {
        self.limits
    }

    /// Stores the chat turn and a truncated summary of `context_used`, then
    /// trims the session's summaries to the newest `summary_limit`.
    ///
    /// Everything happens in one transaction, and writers are serialized so
    /// the trim always sees every earlier insert. On error nothing is
    /// written. Returns the number of summaries pruned.
    pub async fn record_answer(
        &self,
        session_id: &str,
        context_used: &str,
        question: &str,
        answer: &str,
    ) -> Result<u64, MemoryError> {
        let summary = truncate_context(context_used, self.limits.summary_max_chars);

        let _guard = self.write_lock.lock().await;
        let now = timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO chat_history (session_id, user_input, bot_reply, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(question)
        .bind(answer)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO context_memory (session_id, summary, created_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(&summary)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        let pruned = sqlx::query(
            "DELETE FROM context_memory WHERE session_id = ? AND id NOT IN (
                SELECT id FROM context_memory WHERE session_id = ?
                ORDER BY created_at DESC, id DESC LIMIT ?
            )",
        )
        .bind(session_id)
        .bind(session_id)
        .bind(self.limits.summary_limit as i64)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if pruned > 0 {
            tracing::debug!("Pruned {} memory summaries for session {}", pruned, session_id);
        }
        Ok(pruned)
    }

    /// Up to `limit` newest summaries, newest first.
    pub async fn recent_summaries(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<MemorySummary>, MemoryError> {
        let rows = sqlx::query(
            "SELECT id, session_id, summary, created_at FROM context_memory
             WHERE session_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    /// Up to `limit` newest chat turns, returned oldest first.
    pub async fn recent_chat_turns(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, MemoryError> {
        let rows = sqlx::query(
            "SELECT * FROM (
                SELECT id, session_id, user_input, bot_reply, created_at FROM chat_history
                WHERE session_id = ? ORDER BY created_at DESC, id DESC LIMIT ?
             ) ORDER BY created_at ASC, id ASC",
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(chat_turn_from_row).collect()
    }

    pub async fn summary_count(&self, session_id: &str) -> Result<i64, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) FROM context_memory WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get(0)?)
    }

    pub async fn chat_turn_count(&self, session_id: &str) -> Result<i64, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) FROM chat_history WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get(0)?)
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn summary_from_row(row: &SqliteRow) -> Result<MemorySummary, MemoryError> {
    Ok(MemorySummary {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        summary: row.try_get("summary")?,
        created_at: row.try_get("created_at")?,
    })
}

fn chat_turn_from_row(row: &SqliteRow) -> Result<ChatTurn, MemoryError> {
    Ok(ChatTurn {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        user_input: row.try_get("user_input")?,
        bot_reply: row.try_get("bot_reply")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store(dir: &tempfile::TempDir) -> MemoryStore {
        MemoryStore::new(&dir.path().join("memory.db"), MemoryLimits::default())
            .await
            .expect("open store")
    }

    #[tokio::test]
    async fn retention_keeps_only_five_newest_summaries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir).await;

        for i in 1..=7 {
            store
                .record_answer("default", &format!("context {}", i), &format!("Q{}", i), "A")
                .await
                .expect("record");
        }

        assert_eq!(store.summary_count("default").await.expect("count"), 5);
        let summaries = store.recent_summaries("default", 10).await.expect("summaries");
        let texts: Vec<&str> = summaries.iter().map(|s| s.summary.as_str()).collect();
        assert_eq!(
            texts,
            vec!["context 7", "context 6", "context 5", "context 4", "context 3"]
        );
    }

    #[tokio::test]
    async fn chat_turns_are_never_pruned_and_read_back_oldest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir).await;

        for i in 1..=7 {
            store
                .record_answer("default", "ctx", &format!("Q{}", i), &format!("A{}", i))
                .await
                .expect("record");
        }

        assert_eq!(store.chat_turn_count("default").await.expect("count"), 7);
        let turns = store.recent_chat_turns("default", 5).await.expect("turns");
        let questions: Vec<&str> = turns.iter().map(|t| t.user_input.as_str()).collect();
        assert_eq!(questions, vec!["Q3", "Q4", "Q5", "Q6", "Q7"]);
    }

    #[tokio::test]
    async fn fewer_turns_than_limit_come_back_in_chronological_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir).await;

        for q in ["Q1", "Q2", "Q3"] {
            store.record_answer("default", "ctx", q, "A").await.expect("record");
        }

        let turns = store.recent_chat_turns("default", 5).await.expect("turns");
        let questions: Vec<&str> = turns.iter().map(|t| t.user_input.as_str()).collect();
        assert_eq!(questions, vec!["Q1", "Q2", "Q3"]);
    }

    #[tokio::test]
    async fn summaries_store_truncated_context() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir).await;

        store
            .record_answer("default", &"x".repeat(600), "Q", "A")
            .await
            .expect("record");

        let summaries = store.recent_summaries("default", 5).await.expect("summaries");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].summary, format!("{}...", "x".repeat(500)));
    }

    #[tokio::test]
    async fn sessions_keep_separate_windows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir).await;

        for i in 0..6 {
            store
                .record_answer("a", &format!("a{}", i), "Q", "A")
                .await
                .expect("record");
        }
        store.record_answer("b", "b0", "Q", "A").await.expect("record");

        assert_eq!(store.summary_count("a").await.expect("count"), 5);
        assert_eq!(store.summary_count("b").await.expect("count"), 1);
        assert!(store.recent_chat_turns("c", 5).await.expect("turns").is_empty());
    }

    #[tokio::test]
    async fn concurrent_answers_never_exceed_the_summary_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir).await;

        let mut handles = Vec::new();
        for i in 0..12 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .record_answer("default", &format!("ctx {}", i), "Q", "A")
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("record");
        }

        assert_eq!(store.summary_count("default").await.expect("count"), 5);
        assert_eq!(store.chat_turn_count("default").await.expect("count"), 12);
    }

    #[tokio::test]
    async fn concurrent_answers_keep_timestamps_in_insertion_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir).await;

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .record_answer("default", &format!("ctx {}", i), &format!("Q{}", i), "A")
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("record");
        }

        let turns = store.recent_chat_turns("default", 16).await.expect("turns");
        assert_eq!(turns.len(), 16);
        for pair in turns.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert!(pair[0].created_at <= pair[1].created_at);
        }

        let summaries = store.recent_summaries("default", 5).await.expect("summaries");
        let max_id = summaries.iter().map(|s| s.id).max().expect("summaries");
        assert_eq!(summaries[0].id, max_id);
        for pair in summaries.windows(2) {
            assert!(pair[0].id > pair[1].id);
        }
    }
}
