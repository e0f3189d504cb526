use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP host configuration, derived from the server section at start-up.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_sec() -> u64 {
    30
}

fn default_service_name() -> String {
    "taskd".to_string()
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            cors_enabled: default_true(),
            request_timeout_sec: default_request_timeout_sec(),
            service_name: default_service_name(),
        }
    }
}

/// Slack between the per-call deadline and the host's own timeout, so an
/// expired call is answered by the service before the host gives up on it.
pub const BACKSTOP_GRACE: Duration = Duration::from_secs(1);

impl ApiIngressConfig {
    /// Budget handed to each RPC call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec.max(1))
    }

    /// Host-level timeout; always later than [`Self::request_timeout`].
    pub fn backstop_timeout(&self) -> Duration {
        self.request_timeout() + BACKSTOP_GRACE
    }
}
