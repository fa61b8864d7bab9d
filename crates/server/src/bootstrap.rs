use std::sync::Arc;

use intake_agent::{AgentRuntime, GeminiClient, LlmError, PromptBuilder};
use intake_core::config::{AppConfig, ConfigError};
use intake_core::form::{loader, FormLoadError};
use intake_core::CompletionTracker;
use thiserror::Error;
use tracing::info;

use crate::routes::{AppState, LlmStatus};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("form definition could not be loaded: {0}")]
    FormLoad(#[from] FormLoadError),
    #[error("llm client could not be built: {0}")]
    Llm(#[from] LlmError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.require_llm_api_key()?;

    let form = loader::load(config.form.path.as_deref())?;
    let form_source = match &config.form.path {
        Some(path) => path.display().to_string(),
        None => "built-in admissions preset".to_string(),
    };
    info!(
        event_name = "system.bootstrap.form_loaded",
        correlation_id = "bootstrap",
        form_fields = form.len(),
        form_source = %form_source,
        "form definition loaded"
    );

    let llm = GeminiClient::from_config(&config.llm)?;
    info!(
        event_name = "system.bootstrap.llm_ready",
        correlation_id = "bootstrap",
        model = %llm.model(),
        max_retries = config.llm.max_retries,
        "llm client initialized"
    );

    let state = AppState {
        tracker: Arc::new(CompletionTracker::new(form)),
        runtime: AgentRuntime::new(
            Arc::new(llm),
            PromptBuilder::new(config.form.assistant_name.clone()),
        ),
        llm: LlmStatus { model: config.llm.model.clone() },
        form_source,
    };

    Ok(Application { config, state })
}
