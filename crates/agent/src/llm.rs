use async_trait::async_trait;
use intake_core::ApplicationError;
use thiserror::Error;

/// Seam between the runtime and whichever model backs the conversation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm transport failed: {0}")]
    Transport(String),
    #[error("llm request timed out after {0}s")]
    Timeout(u64),
    #[error("llm returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response carried no candidate text")]
    EmptyResponse,
    #[error("llm response could not be decoded: {0}")]
    InvalidResponse(String),
    #[error("llm client misconfigured: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Transport failures, timeouts, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::EmptyResponse | Self::InvalidResponse(_) | Self::Configuration(_) => false,
        }
    }
}

impl From<LlmError> for ApplicationError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::Configuration(message) => Self::Configuration(message),
            other => Self::Integration(other.to_string()),
        }
    }
}
