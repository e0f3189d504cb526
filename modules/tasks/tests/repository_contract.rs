//! Behavior every `TaskRepository` must share. Each case runs once against
//! the in-memory store and once against SQLite on disk.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tempfile::TempDir;

use tasks::domain::error::RepoError;
use tasks::domain::repo::TaskRepository;
use tasks::model::{ListQuery, SortField, SortOrder, StatusFilter};
use tasks::{InMemoryTaskRepository, SqlRepoOptions, SqlTaskRepository};

fn memory_repo() -> (Arc<dyn TaskRepository>, Option<TempDir>) {
    (Arc::new(InMemoryTaskRepository::new()), None)
}

async fn sql_repo() -> (Arc<dyn TaskRepository>, Option<TempDir>) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("tasks.db").display());
    let repo = SqlTaskRepository::connect(&url, &SqlRepoOptions::default())
        .await
        .unwrap();
    (Arc::new(repo), Some(dir))
}

macro_rules! contract_tests {
    ($($case:ident),* $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $case() {
                    let (repo, _dir) = super::memory_repo();
                    super::$case(repo).await;
                }
            )*
        }

        mod sql {
            $(
                #[tokio::test]
                async fn $case() {
                    let (repo, _dir) = super::sql_repo().await;
                    super::$case(repo).await;
                }
            )*
        }
    };
}

contract_tests!(
    create_then_get_returns_stored_row,
    status_filters_partition_the_set,
    pagination_metadata_is_consistent,
    title_query_is_case_insensitive_substring,
    title_sort_breaks_ties_by_id,
    default_sort_is_newest_first,
    update_refreshes_only_what_it_should,
    update_missing_row_is_not_found,
    delete_twice_is_not_found,
    concurrent_creates_yield_distinct_ids,
    health_check_succeeds,
);

fn query(page: u32, page_size: u32) -> ListQuery {
    ListQuery {
        page,
        page_size,
        ..ListQuery::default()
    }
}

async fn ids_for(repo: &Arc<dyn TaskRepository>, status: StatusFilter) -> HashSet<String> {
    let page = repo
        .list(&ListQuery {
            status,
            ..query(1, 100)
        })
        .await
        .unwrap();
    for task in &page.tasks {
        match status {
            StatusFilter::Completed => assert!(task.completed),
            StatusFilter::Pending => assert!(!task.completed),
            StatusFilter::All => {}
        }
    }
    page.tasks.into_iter().map(|t| t.id).collect()
}

async fn create_then_get_returns_stored_row(repo: Arc<dyn TaskRepository>) {
    let created = repo.create("Buy milk").await.unwrap();
    assert!(!created.id.is_empty());
    assert!(!created.completed);
    assert_eq!(created.created_at, created.updated_at);

    let fetched = repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(fetched, created);
}

async fn status_filters_partition_the_set(repo: Arc<dyn TaskRepository>) {
    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(repo.create(&format!("task {i}")).await.unwrap().id);
    }
    for id in ids.iter().step_by(2) {
        repo.update(id, None, true).await.unwrap();
    }

    let all = ids_for(&repo, StatusFilter::All).await;
    let completed = ids_for(&repo, StatusFilter::Completed).await;
    let pending = ids_for(&repo, StatusFilter::Pending).await;

    assert_eq!(all.len(), 6);
    assert_eq!(completed.len(), 3);
    assert!(completed.is_disjoint(&pending));
    assert_eq!(&completed | &pending, all);
}

async fn pagination_metadata_is_consistent(repo: Arc<dyn TaskRepository>) {
    for i in 0..45 {
        repo.create(&format!("item {i:02}")).await.unwrap();
    }

    let first = repo.list(&query(1, 20)).await.unwrap();
    assert_eq!(first.tasks.len(), 20);
    assert_eq!(first.pagination.total_items, 45);
    assert_eq!(first.pagination.total_pages, 3);
    assert!(first.pagination.has_next);
    assert!(!first.pagination.has_previous);

    let last = repo.list(&query(3, 20)).await.unwrap();
    assert_eq!(last.tasks.len(), 5);
    assert_eq!(last.pagination.page, 3);
    assert!(!last.pagination.has_next);
    assert!(last.pagination.has_previous);

    let beyond = repo.list(&query(4, 20)).await.unwrap();
    assert!(beyond.tasks.is_empty());
    assert_eq!(beyond.pagination.total_items, 45);

    // Pages cover the set exactly once.
    let mut seen = HashSet::new();
    for page in 1..=3 {
        for task in repo.list(&query(page, 20)).await.unwrap().tasks {
            assert!(seen.insert(task.id));
        }
    }
    assert_eq!(seen.len(), 45);
}

async fn title_query_is_case_insensitive_substring(repo: Arc<dyn TaskRepository>) {
    repo.create("Buy milk").await.unwrap();
    repo.create("buy bread").await.unwrap();
    repo.create("Walk the dog").await.unwrap();
    repo.create("under_score").await.unwrap();

    let page = repo
        .list(&ListQuery {
            query: "BUY".into(),
            ..query(1, 20)
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 2);

    // `_` is not a wildcard.
    let page = repo
        .list(&ListQuery {
            query: "r_s".into(),
            ..query(1, 20)
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 1);
    assert_eq!(page.tasks[0].title, "under_score");

    // Leading whitespace is part of the needle.
    repo.create("milkshake").await.unwrap();
    let page = repo
        .list(&ListQuery {
            query: " milk".into(),
            ..query(1, 20)
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 1);
    assert_eq!(page.tasks[0].title, "Buy milk");
}

async fn title_sort_breaks_ties_by_id(repo: Arc<dyn TaskRepository>) {
    repo.create("b").await.unwrap();
    repo.create("a").await.unwrap();
    repo.create("a").await.unwrap();
    repo.create("c").await.unwrap();

    let asc = repo
        .list(&ListQuery {
            sort_by: SortField::Title,
            sort_order: SortOrder::Asc,
            ..query(1, 20)
        })
        .await
        .unwrap()
        .tasks;
    let titles: Vec<&str> = asc.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["a", "a", "b", "c"]);
    assert!(asc[0].id < asc[1].id);

    let desc = repo
        .list(&ListQuery {
            sort_by: SortField::Title,
            sort_order: SortOrder::Desc,
            ..query(1, 20)
        })
        .await
        .unwrap()
        .tasks;
    let reversed: Vec<String> = desc.iter().rev().map(|t| t.id.clone()).collect();
    let forward: Vec<String> = asc.iter().map(|t| t.id.clone()).collect();
    assert_eq!(reversed, forward);
}

async fn default_sort_is_newest_first(repo: Arc<dyn TaskRepository>) {
    for i in 0..5 {
        repo.create(&format!("t{i}")).await.unwrap();
    }
    let tasks = repo.list(&ListQuery::default()).await.unwrap().tasks;
    assert_eq!(tasks.len(), 5);
    assert!(tasks.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

async fn update_refreshes_only_what_it_should(repo: Arc<dyn TaskRepository>) {
    let created = repo.create("Original").await.unwrap();

    let done = repo.update(&created.id, None, true).await.unwrap();
    assert_eq!(done.title, "Original");
    assert!(done.completed);
    assert_eq!(done.created_at, created.created_at);
    assert!(done.updated_at > created.updated_at);

    let renamed = repo.update(&created.id, Some("Renamed"), false).await.unwrap();
    assert_eq!(renamed.title, "Renamed");
    assert!(!renamed.completed);
    assert!(renamed.updated_at > done.updated_at);

    assert_eq!(repo.get_by_id(&created.id).await.unwrap(), renamed);
}

async fn update_missing_row_is_not_found(repo: Arc<dyn TaskRepository>) {
    let err = repo.update("missing", Some("x"), true).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound { ref id } if id == "missing"));
    assert!(matches!(
        repo.get_by_id("missing").await,
        Err(RepoError::NotFound { .. })
    ));
}

async fn delete_twice_is_not_found(repo: Arc<dyn TaskRepository>) {
    let created = repo.create("short lived").await.unwrap();
    repo.delete(&created.id).await.unwrap();
    assert!(matches!(
        repo.delete(&created.id).await,
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        repo.get_by_id(&created.id).await,
        Err(RepoError::NotFound { .. })
    ));
}

async fn concurrent_creates_yield_distinct_ids(repo: Arc<dyn TaskRepository>) {
    const N: u32 = 25;
    let created = join_all((0..N).map(|i| {
        let repo = Arc::clone(&repo);
        async move { repo.create(&format!("concurrent {i}")).await }
    }))
    .await;

    let ids: HashSet<String> = created.into_iter().map(|r| r.unwrap().id).collect();
    assert_eq!(ids.len(), N as usize);

    let page = repo.list(&query(1, N)).await.unwrap();
    let titles: HashSet<String> = page.tasks.into_iter().map(|t| t.title).collect();
    let expected: HashSet<String> = (0..N).map(|i| format!("concurrent {i}")).collect();
    assert_eq!(titles, expected);
}

async fn health_check_succeeds(repo: Arc<dyn TaskRepository>) {
    repo.health_check().await.unwrap();
}
