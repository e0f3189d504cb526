use async_trait::async_trait;

use crate::contract::model::{ListQuery, Task, TaskPage};
use crate::domain::error::RepoError;

/// Port for the domain layer: persistence operations on the task table.
/// Object-safe and async-friendly via `async_trait`.
///
/// Implementations must behave identically; the shared behavior suite in
/// `tests/repository_contract.rs` runs against each of them.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new pending task with a fresh id and timestamps, then return
    /// the stored row as read back.
    async fn create(&self, title: &str) -> Result<Task, RepoError>;

    async fn get_by_id(&self, id: &str) -> Result<Task, RepoError>;

    /// Filter, count, then sort and window. `query` is already normalized.
    async fn list(&self, query: &ListQuery) -> Result<TaskPage, RepoError>;

    /// Confirms the row exists first, rewrites `title` only when given, always
    /// rewrites `completed` and refreshes `updated_at`.
    async fn update(&self, id: &str, title: Option<&str>, completed: bool)
        -> Result<Task, RepoError>;

    /// Not-found is decided by the number of rows removed.
    async fn delete(&self, id: &str) -> Result<(), RepoError>;

    /// Connectivity probe, independent of table contents.
    async fn health_check(&self) -> Result<(), RepoError>;
}
