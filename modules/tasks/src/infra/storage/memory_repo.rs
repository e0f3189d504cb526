//! In-memory repository used by tests and `--mock` runs.
//!
//! A single reader/writer lock guards the map: reads take the read lock,
//! mutations the write lock. The lock is never held across an `.await`.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{next_update_stamp, now_utc, title_matches};
use crate::contract::model::{
    ListQuery, Pagination, SortField, SortOrder, StatusFilter, Task, TaskPage,
};
use crate::domain::error::RepoError;
use crate::domain::repo::TaskRepository;

#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn status_matches(task: &Task, status: StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Completed => task.completed,
        StatusFilter::Pending => !task.completed,
    }
}

fn compare(a: &Task, b: &Task, field: SortField, order: SortOrder) -> Ordering {
    let primary = match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Title => a.title.as_bytes().cmp(b.title.as_bytes()),
    };
    let ord = primary.then_with(|| a.id.cmp(&b.id));
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, title: &str) -> Result<Task, RepoError> {
        let now = now_utc();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        };

        let mut tasks = self.tasks.write();
        if tasks.contains_key(&task.id) {
            return Err(RepoError::conflict(format!("duplicate id {}", task.id)));
        }
        tasks.insert(task.id.clone(), task.clone());
        tasks
            .get(&task.id)
            .cloned()
            .ok_or_else(|| RepoError::storage("row vanished after insert"))
    }

    async fn get_by_id(&self, id: &str) -> Result<Task, RepoError> {
        self.tasks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::not_found(id))
    }

    async fn list(&self, query: &ListQuery) -> Result<TaskPage, RepoError> {
        let tasks = self.tasks.read();

        let mut matching: Vec<&Task> = tasks
            .values()
            .filter(|t| title_matches(&t.title, &query.query))
            .filter(|t| status_matches(t, query.status))
            .collect();
        let total_items = matching.len() as u64;

        matching.sort_by(|a, b| compare(a, b, query.sort_by, query.sort_order));

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let page: Vec<Task> = matching
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .cloned()
            .collect();

        Ok(TaskPage {
            tasks: page,
            pagination: Pagination::new(query.page, query.page_size, total_items),
        })
    }

    async fn update(
        &self,
        id: &str,
        title: Option<&str>,
        completed: bool,
    ) -> Result<Task, RepoError> {
        let mut tasks = self.tasks.write();
        let task = tasks.get_mut(id).ok_or_else(|| RepoError::not_found(id))?;

        if let Some(title) = title.filter(|t| !t.is_empty()) {
            task.title = title.to_string();
        }
        task.completed = completed;
        task.updated_at = next_update_stamp(task.updated_at);

        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), RepoError> {
        match self.tasks.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(RepoError::not_found(id)),
        }
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        let _guard = self.tasks.read();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get() {
        let repo = InMemoryTaskRepository::new();
        let created = repo.create("Buy milk").await.unwrap();
        assert!(!created.completed);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = repo.get_by_id(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(repo.tasks.read().len(), 1);
    }

    #[tokio::test]
    async fn update_keeps_title_when_absent() {
        let repo = InMemoryTaskRepository::new();
        let created = repo.create("Keep me").await.unwrap();

        let updated = repo.update(&created.id, None, true).await.unwrap();
        assert_eq!(updated.title, "Keep me");
        assert!(updated.completed);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let repo = InMemoryTaskRepository::new();
        assert!(matches!(
            repo.get_by_id("nope").await,
            Err(RepoError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update("nope", Some("x"), true).await,
            Err(RepoError::NotFound { .. })
        ));
        assert!(matches!(
            repo.delete("nope").await,
            Err(RepoError::NotFound { .. })
        ));
    }

    #[test]
    fn compare_breaks_ties_by_id() {
        let now = now_utc();
        let mk = |id: &str| Task {
            id: id.to_string(),
            title: "same".into(),
            completed: false,
            created_at: now,
            updated_at: now,
        };
        let (a, b) = (mk("a"), mk("b"));
        assert_eq!(compare(&a, &b, SortField::Title, SortOrder::Asc), Ordering::Less);
        assert_eq!(compare(&a, &b, SortField::Title, SortOrder::Desc), Ordering::Greater);
    }
}
