use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::TasksConfig;
use crate::contract::messages::*;
use crate::contract::model::ListQuery;
use crate::contract::{CallMeta, RpcError};
use crate::domain::error::RepoError;
use crate::domain::repo::TaskRepository;
use crate::domain::translate;
use crate::domain::validation::Validator;

/// Orchestrates every task operation: validate, call the repository once,
/// shape the response. Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
    validator: Validator,
    config: TasksConfig,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>, config: TasksConfig) -> Self {
        Self {
            repo,
            validator: Validator::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &TasksConfig {
        &self.config
    }

    #[instrument(name = "tasks.service.create_task", skip_all, fields(request_id = %meta.request_id))]
    pub async fn create_task(
        &self,
        meta: &CallMeta,
        req: CreateTaskRequest,
    ) -> Result<CreateTaskResponse, RpcError> {
        self.validator
            .create(&req)
            .map_err(|e| translate::validation_failure(&e, meta))?;

        let task = self
            .bounded(meta, self.repo.create(req.title.trim()))
            .await
            .map_err(|e| translate::repository_failure(&e, meta))?;

        info!(task_id = %task.id, "Task created");
        Ok(CreateTaskResponse { task })
    }

    #[instrument(name = "tasks.service.get_task", skip_all, fields(request_id = %meta.request_id, task_id = %req.id))]
    pub async fn get_task(
        &self,
        meta: &CallMeta,
        req: GetTaskRequest,
    ) -> Result<GetTaskResponse, RpcError> {
        self.validator
            .get(&req)
            .map_err(|e| translate::validation_failure(&e, meta))?;

        let task = self
            .bounded(meta, self.repo.get_by_id(&req.id))
            .await
            .map_err(|e| translate::repository_failure(&e, meta))?;

        Ok(GetTaskResponse { task })
    }

    #[instrument(name = "tasks.service.list_tasks", skip_all, fields(request_id = %meta.request_id))]
    pub async fn list_tasks(
        &self,
        meta: &CallMeta,
        req: ListTasksRequest,
    ) -> Result<ListTasksResponse, RpcError> {
        self.validator
            .list(&req)
            .map_err(|e| translate::validation_failure(&e, meta))?;

        let query = ListQuery {
            page: req.page,
            page_size: req.page_size,
            query: req.query,
            status: req.status_filter,
            sort_by: req.sort_by,
            sort_order: req.sort_order,
        }
        .normalized(self.config.default_page_size, self.config.max_page_size);

        let page = self
            .bounded(meta, self.repo.list(&query))
            .await
            .map_err(|e| translate::repository_failure(&e, meta))?;

        debug!(
            returned = page.tasks.len(),
            total_items = page.pagination.total_items,
            "Listed tasks"
        );
        Ok(ListTasksResponse {
            tasks: page.tasks,
            pagination: page.pagination,
        })
    }

    #[instrument(name = "tasks.service.update_task", skip_all, fields(request_id = %meta.request_id, task_id = %req.id))]
    pub async fn update_task(
        &self,
        meta: &CallMeta,
        req: UpdateTaskRequest,
    ) -> Result<UpdateTaskResponse, RpcError> {
        self.validator
            .update(&req)
            .map_err(|e| translate::validation_failure(&e, meta))?;

        let title = req
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let task = self
            .bounded(meta, self.repo.update(&req.id, title, req.completed))
            .await
            .map_err(|e| translate::repository_failure(&e, meta))?;

        info!(completed = task.completed, "Task updated");
        Ok(UpdateTaskResponse { task })
    }

    #[instrument(name = "tasks.service.delete_task", skip_all, fields(request_id = %meta.request_id, task_id = %req.id))]
    pub async fn delete_task(
        &self,
        meta: &CallMeta,
        req: DeleteTaskRequest,
    ) -> Result<DeleteTaskResponse, RpcError> {
        self.validator
            .delete(&req)
            .map_err(|e| translate::validation_failure(&e, meta))?;

        self.bounded(meta, self.repo.delete(&req.id))
            .await
            .map_err(|e| translate::repository_failure(&e, meta))?;

        info!("Task deleted");
        Ok(DeleteTaskResponse {})
    }

    #[instrument(name = "tasks.service.health_check", skip_all, fields(request_id = %meta.request_id))]
    pub async fn health_check(
        &self,
        meta: &CallMeta,
        _req: HealthCheckRequest,
    ) -> Result<HealthCheckResponse, RpcError> {
        self.bounded(meta, self.repo.health_check())
            .await
            .map_err(|e| translate::repository_failure(&e, meta))?;

        Ok(HealthCheckResponse {
            status: "ok".to_string(),
        })
    }

    /// Runs one repository call under the call's deadline.
    async fn bounded<T, F>(&self, meta: &CallMeta, fut: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        let Some(deadline) = meta.deadline else {
            return fut.await;
        };
        if meta.is_expired() {
            return Err(RepoError::unavailable("deadline exceeded before storage call"));
        }
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(res) => res,
            Err(_) => Err(RepoError::unavailable("deadline exceeded during storage call")),
        }
    }
}
