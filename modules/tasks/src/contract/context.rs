use tokio::time::Instant;

/// Per-call metadata passed explicitly alongside every service call.
#[derive(Debug, Clone)]
pub struct CallMeta {
    pub request_id: String,
    pub procedure: String,
    /// Storage work for this call must finish before this instant.
    pub deadline: Option<Instant>,
}

impl CallMeta {
    pub fn new(request_id: impl Into<String>, procedure: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            procedure: procedure.into(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
