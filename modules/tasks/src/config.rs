use serde::{Deserialize, Serialize};

/// Configuration for the tasks module (`modules.tasks` in the app config).
///
/// Immutable after startup; the service and the validator receive a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TasksConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_title_len: default_max_title_len(),
        }
    }
}

impl TasksConfig {
    /// Reject limits the service could not honor.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.max_page_size >= 1, "max_page_size must be at least 1");
        anyhow::ensure!(
            (1..=self.max_page_size).contains(&self.default_page_size),
            "default_page_size must be between 1 and max_page_size ({})",
            self.max_page_size
        );
        anyhow::ensure!(self.max_title_len >= 1, "max_title_len must be at least 1");
        Ok(())
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    100
}

fn default_max_title_len() -> usize {
    255
}
