//! Structural checks on request messages, run before any storage access.
//!
//! Each check returns the first violation it finds; violations are never
//! aggregated.

use crate::config::TasksConfig;
use crate::contract::messages::{
    CreateTaskRequest, DeleteTaskRequest, GetTaskRequest, ListTasksRequest, UpdateTaskRequest,
};
use crate::domain::error::ValidationError;

#[derive(Debug, Clone)]
pub struct Validator {
    max_title_len: usize,
    max_page_size: u32,
}

impl Validator {
    pub fn new(config: &TasksConfig) -> Self {
        Self {
            max_title_len: config.max_title_len,
            max_page_size: config.max_page_size,
        }
    }

    pub fn create(&self, req: &CreateTaskRequest) -> Result<(), ValidationError> {
        let title = req.title.trim();
        if title.is_empty() {
            return Err(ValidationError::new("title", "title is required"));
        }
        self.title_length(title)
    }

    pub fn get(&self, req: &GetTaskRequest) -> Result<(), ValidationError> {
        require_id(&req.id)
    }

    pub fn update(&self, req: &UpdateTaskRequest) -> Result<(), ValidationError> {
        require_id(&req.id)?;
        // A blank title means "leave unchanged".
        match req.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => self.title_length(title),
            _ => Ok(()),
        }
    }

    pub fn delete(&self, req: &DeleteTaskRequest) -> Result<(), ValidationError> {
        require_id(&req.id)
    }

    /// Oversized pages are rejected here; zero page/page_size are normalized later.
    pub fn list(&self, req: &ListTasksRequest) -> Result<(), ValidationError> {
        if req.page_size > self.max_page_size {
            return Err(ValidationError::new(
                "page_size",
                format!("page_size must not exceed {}", self.max_page_size),
            ));
        }
        Ok(())
    }

    fn title_length(&self, trimmed: &str) -> Result<(), ValidationError> {
        let len = trimmed.chars().count();
        if len > self.max_title_len {
            return Err(ValidationError::new(
                "title",
                format!(
                    "title must be at most {} characters (got {})",
                    self.max_title_len, len
                ),
            ));
        }
        Ok(())
    }
}

fn require_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::new("id", "id is required"));
    }
    Ok(())
}
