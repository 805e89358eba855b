//! Deterministic `ModelInvoker` for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{Citation, InvocationConfig, LlmError, ModelInvoker, RawModelOutput};

enum Reply {
    Output(RawModelOutput),
    Failure { status: u16, message: String },
}

/// Returns a canned reply and records every prompt and config it receives.
pub struct StubInvoker {
    reply: Reply,
    calls: Mutex<Vec<(String, InvocationConfig)>>,
}

impl StubInvoker {
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_citations(text, Vec::new())
    }

    pub fn with_citations(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            reply: Reply::Output(RawModelOutput {
                text: text.into(),
                citations,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Failure {
                status,
                message: message.into(),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, InvocationConfig)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.calls().last().map(|(p, _)| p.clone()).unwrap_or_default()
    }
}

pub fn citation(title: Option<&str>, uri: Option<&str>) -> Citation {
    Citation {
        title: title.map(str::to_string),
        uri: uri.map(str::to_string),
    }
}

#[async_trait]
impl ModelInvoker for StubInvoker {
    async fn invoke(
        &self,
        prompt: &str,
        config: &InvocationConfig,
    ) -> Result<RawModelOutput, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), *config));

        match &self.reply {
            Reply::Output(output) => Ok(output.clone()),
            Reply::Failure { status, message } => Err(LlmError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}
