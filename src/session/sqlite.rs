//! Durable session backend.
//!
//! Same contract as the in-memory store, but exchanges survive restarts.
//! The question/answer pair is written in one transaction so a crash can
//! never leave a half-recorded turn behind.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use super::{SessionStore, Turn};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub async fn new(db_path: &Path) -> Result<Self, ApiError> {
        let conn_str = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&conn_str)
            .await
            .map_err(|e| ApiError::internal(format!("failed to connect to session db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("failed to init sessions table: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(session_id) REFERENCES sessions(id) ON DELETE CASCADE
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("failed to init turns table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_turns_session_id ON turns(session_id)")
            .execute(&pool)
            .await
            .map_err(|e| ApiError::internal(format!("failed to create index: {}", e)))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn history(&self, session_id: &str) -> Result<Vec<Turn>, ApiError> {
        let rows = sqlx::query(
            "SELECT question, answer FROM turns WHERE session_id = ? ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows
            .into_iter()
            .map(|row| Turn {
                question: row.try_get::<String, _>("question").unwrap_or_default(),
                answer: row.try_get::<String, _>("answer").unwrap_or_default(),
            })
            .collect())
    }

    async fn append(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<(), ApiError> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("INSERT OR IGNORE INTO sessions (id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query("INSERT INTO turns (session_id, question, answer, created_at) VALUES (?, ?, ?, ?)")
            .bind(session_id)
            .bind(question)
            .bind(answer)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, SqliteSessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSessionStore::new(&dir.path().join("sessions.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn unknown_session_has_empty_history() {
        let (_dir, store) = temp_store().await;
        assert!(store.history("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_then_read_back_in_order() {
        let (_dir, store) = temp_store().await;
        store.append("1abc", "first?", "one").await.unwrap();
        store.append("1abc", "second?", "two").await.unwrap();
        store.append("other", "hi?", "hello").await.unwrap();

        let turns = store.history("1abc").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].question, "first?");
        assert_eq!(turns[1].answer, "two");

        assert_eq!(store.history("other").await.unwrap().len(), 1);
    }
}
