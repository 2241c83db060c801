//! Persistence gateway over a pooled SQLite connection.
//!
//! Schema lives in `src/storage/migrations/` and is applied at connect time.
//! All writes are single statements, so a record is either fully persisted
//! with all its fields and timestamps or not at all.

use anyhow::{anyhow, Context as _, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions as _, SqlitePool};
use std::str::FromStr;

use crate::tasks::{NewTask, TaskPatch, TaskRow, TaskStatus};

/// Default timeout for individual SQLite queries.
/// Prevents a hung query from blocking a request indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Queries slower than this are logged at WARN level.
const SLOW_QUERY_THRESHOLD: std::time::Duration = std::time::Duration::from_millis(100);

/// Execute a future with the standard query timeout.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (or create) the database at `database_url` and apply migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database URL: {database_url}"))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .create_if_missing(true)
            .log_slow_statements(log::LevelFilter::Warn, SLOW_QUERY_THRESHOLD);

        let pool = SqlitePool::connect_with(opts)
            .await
            .with_context(|| format!("failed to open database at {database_url}"))?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("src/storage/migrations")
            .run(pool)
            .await
            .context("failed to run database migrations")
    }

    // ─── Tasks ──────────────────────────────────────────────────────────────

    /// Persist a validated create payload. Both timestamps are bound to the
    /// same instant, so a fresh record always has `created_at == updated_at`.
    pub async fn create_task(&self, task: &NewTask) -> Result<TaskRow> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO tasks (title, description, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        self.get_task(id)
            .await?
            .ok_or_else(|| anyhow!("task not found after insert"))
    }

    pub async fn get_task(&self, id: i64) -> Result<Option<TaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// List all tasks, optionally filtered to an exact status. Rows come back
    /// in `id` order so a given storage state always lists the same way.
    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<TaskRow>> {
        with_timeout(async {
            let rows = match status {
                Some(status) => {
                    sqlx::query_as("SELECT * FROM tasks WHERE status = ? ORDER BY id")
                        .bind(status)
                        .fetch_all(&self.pool)
                        .await?
                }
                None => {
                    sqlx::query_as("SELECT * FROM tasks ORDER BY id")
                        .fetch_all(&self.pool)
                        .await?
                }
            };
            Ok(rows)
        })
        .await
    }

    /// Apply `patch` to the task with `id`, refreshing `updated_at`. Returns
    /// `None` when no such task exists. Fields absent from the patch keep
    /// their stored value.
    pub async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<Option<TaskRow>> {
        let Some(current) = self.get_task(id).await? else {
            return Ok(None);
        };
        let merged = patch.apply(&current);
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&merged.title)
        .bind(&merged.description)
        .bind(merged.status)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        self.get_task(id).await
    }

    /// Hard-delete the task with `id`. Returns `false` when no row matched.
    pub async fn delete_task(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
