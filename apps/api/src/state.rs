use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ModelInvoker;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Stateless model client shared read-only by every request.
    pub llm: Arc<dyn ModelInvoker>,
    pub config: Config,
}

#[cfg(test)]
impl AppState {
    pub fn for_tests(llm: Arc<dyn ModelInvoker>) -> Self {
        Self {
            llm,
            config: Config {
                gemini_api_key: "test-key".to_string(),
                port: 0,
                rust_log: "debug".to_string(),
                llm_timeout_secs: 5,
                llm_max_attempts: 1,
                max_upload_bytes: 64 * 1024,
            },
        }
    }
}
