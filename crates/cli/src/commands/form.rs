use std::path::PathBuf;

use intake_core::config::{AppConfig, LoadOptions};
use intake_core::form::{loader, FormLoadError};
use serde_json::json;

use crate::commands::CommandResult;

const COMMAND: &str = "form";

/// Validates and prints a form: `--path` wins, then `form.path` from config,
/// then the built-in preset.
pub fn run(options: LoadOptions, path: Option<PathBuf>) -> CommandResult {
    let path = match path {
        Some(path) => Some(path),
        None => match AppConfig::load(options) {
            Ok(config) => config.form.path,
            Err(error) => {
                return CommandResult::config_failure(
                    COMMAND,
                    format!("config validation failed: {error}"),
                )
            }
        },
    };

    let form = match loader::load(path.as_deref()) {
        Ok(form) => form,
        Err(error) => return load_failure(COMMAND, &error),
    };

    let source = path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in admissions preset".to_string());
    let fields = match serde_json::to_value(&form) {
        Ok(value) => value["fields"].clone(),
        Err(error) => {
            return CommandResult::failure(COMMAND, "serialization", error.to_string(), 1)
        }
    };

    CommandResult::success_with_data(
        COMMAND,
        format!("form is valid: {} fields", form.len()),
        json!({ "source": source, "fields": fields }),
    )
}

pub(crate) fn load_failure(command: &str, error: &FormLoadError) -> CommandResult {
    match error {
        FormLoadError::ReadFile { .. } => CommandResult::input_failure(command, error.to_string()),
        _ => CommandResult::failure(
            command,
            "form_validation",
            error.to_string(),
            crate::commands::EXIT_VALIDATION,
        ),
    }
}
