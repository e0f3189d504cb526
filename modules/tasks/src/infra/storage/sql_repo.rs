//! SQL-backed repository over an `sqlx` SQLite pool.
//!
//! Concurrency is bounded by the pool size; there is no application-level
//! locking. Pool exhaustion surfaces as `RepoError::Unavailable` once the
//! acquire timeout elapses.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};
use uuid::Uuid;

use super::{next_update_stamp, now_utc};
use crate::contract::model::{ListQuery, Pagination, StatusFilter, Task, TaskPage};
use crate::domain::error::RepoError;
use crate::domain::repo::TaskRepository;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY NOT NULL,
        title TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_completed ON tasks (completed)",
];

const SELECT_COLUMNS: &str = "SELECT id, title, completed, created_at, updated_at FROM tasks";

/// Pool knobs for [`SqlTaskRepository::connect`].
#[derive(Debug, Clone)]
pub struct SqlRepoOptions {
    pub max_conns: u32,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for SqlRepoOptions {
    fn default() -> Self {
        Self {
            max_conns: 10,
            busy_timeout: Duration::from_millis(5000),
            acquire_timeout: Duration::from_millis(5000),
        }
    }
}

pub struct SqlTaskRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    title: String,
    completed: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = RepoError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            created_at: decode_ts(&row.created_at)?,
            updated_at: decode_ts(&row.updated_at)?,
            id: row.id,
            title: row.title,
            completed: row.completed,
        })
    }
}

/// Fixed-width UTC text so that lexical order equals chronological order.
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepoError::storage(format!("invalid timestamp '{raw}': {e}")))
}

/// Escape `LIKE` wildcards so the caller's text matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &ListQuery) {
    let mut clause = " WHERE ";
    if !query.query.is_empty() {
        qb.push(clause)
            .push("title LIKE ")
            .push_bind(format!("%{}%", escape_like(&query.query)))
            .push(" ESCAPE '\\'");
        clause = " AND ";
    }
    match query.status {
        StatusFilter::All => {}
        StatusFilter::Completed => {
            qb.push(clause).push("completed = 1");
        }
        StatusFilter::Pending => {
            qb.push(clause).push("completed = 0");
        }
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_) => RepoError::unavailable(e.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::conflict(db.message().to_string())
            }
            // SQLITE_BUSY / SQLITE_LOCKED, including their extended codes
            sqlx::Error::Database(db)
                if db
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .is_some_and(|c| matches!(c & 0xff, 5 | 6)) =>
            {
                RepoError::unavailable(db.message().to_string())
            }
            _ => RepoError::storage(e.to_string()),
        }
    }
}

impl SqlTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `url` and make sure the schema exists.
    pub async fn connect(url: &str, opts: &SqlRepoOptions) -> Result<Self, RepoError> {
        let in_memory = is_memory_url(url);

        let mut connect_opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(opts.busy_timeout);
        if !in_memory {
            connect_opts = connect_opts.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to a memory database is a separate database, so
        // keep exactly one alive for the lifetime of the pool.
        let pool_opts = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(opts.max_conns.max(1))
        };

        let pool = pool_opts
            .acquire_timeout(opts.acquire_timeout)
            .connect_with(connect_opts)
            .await?;

        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        info!(in_memory, "Task store ready");
        Ok(repo)
    }

    /// Create the table and its indexes if missing.
    pub async fn ensure_schema(&self) -> Result<(), RepoError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TaskRepository for SqlTaskRepository {
    async fn create(&self, title: &str) -> Result<Task, RepoError> {
        let id = Uuid::new_v4().to_string();
        let now = encode_ts(now_utc());

        sqlx::query(
            "INSERT INTO tasks (id, title, completed, created_at, updated_at) VALUES (?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        // Server-assigned fields come from the stored row.
        self.get_by_id(&id).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Task, RepoError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Task::try_from(row),
            None => Err(RepoError::not_found(id)),
        }
    }

    async fn list(&self, query: &ListQuery) -> Result<TaskPage, RepoError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tasks");
        push_filters(&mut count, query);
        let total_items: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);
        let dir = query.sort_order.keyword();

        let mut select = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        push_filters(&mut select, query);
        select
            .push(format_args!(
                " ORDER BY {} {dir}, id {dir}",
                query.sort_by.column()
            ))
            .push(" LIMIT ")
            .push_bind(i64::from(query.page_size))
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<TaskRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let tasks = rows
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(total_items, returned = tasks.len(), "list query executed");
        Ok(TaskPage {
            tasks,
            pagination: Pagination::new(
                query.page,
                query.page_size,
                u64::try_from(total_items).unwrap_or(0),
            ),
        })
    }

    async fn update(
        &self,
        id: &str,
        title: Option<&str>,
        completed: bool,
    ) -> Result<Task, RepoError> {
        // Existence probe: a missing row is NotFound, not a silent no-op.
        let current = self.get_by_id(id).await?;
        let stamp = encode_ts(next_update_stamp(current.updated_at));

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE tasks SET ");
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            qb.push("title = ").push_bind(title.to_string()).push(", ");
        }
        qb.push("completed = ")
            .push_bind(completed)
            .push(", updated_at = ")
            .push_bind(stamp)
            .push(" WHERE id = ")
            .push_bind(id.to_string());

        let res = qb.build().execute(&self.pool).await?;
        if res.rows_affected() == 0 {
            return Err(RepoError::not_found(id));
        }

        self.get_by_id(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), RepoError> {
        let res = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(RepoError::not_found(id));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
