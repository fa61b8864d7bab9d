use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use intake_core::config::{AppConfig, LoadOptions};
use intake_core::form::loader;
use intake_core::form::record::{extraction_from_json, record_from_json};
use intake_core::CompletionTracker;
use serde_json::Value;

use crate::commands::form::load_failure;
use crate::commands::CommandResult;

const COMMAND: &str = "status";

#[derive(Debug, Clone, Default)]
pub struct StatusArgs {
    pub record: PathBuf,
    pub extracted: Option<PathBuf>,
    pub form_path: Option<PathBuf>,
}

/// Runs one offline tracker turn: the record file, merged with the optional
/// extraction file, judged against the form.
pub fn run(options: LoadOptions, args: StatusArgs) -> CommandResult {
    let form_path = match args.form_path {
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

    let form = match loader::load(form_path.as_deref()) {
        Ok(form) => form,
        Err(error) => return load_failure(COMMAND, &error),
    };

    let record = match read_json(&args.record) {
        Ok(value) => record_from_json(&value),
        Err(error) => return CommandResult::input_failure(COMMAND, format!("{error:#}")),
    };
    let extracted = match args.extracted.as_deref().map(read_json).transpose() {
        Ok(value) => value.map(|value| extraction_from_json(&value)).unwrap_or_default(),
        Err(error) => return CommandResult::input_failure(COMMAND, format!("{error:#}")),
    };

    let outcome = CompletionTracker::new(form).apply_turn(&record, &extracted);
    let message = match &outcome.next_field {
        Some(next) => format!("{} field(s) missing; next: {next}", outcome.missing_fields.len()),
        None => "record is complete".to_string(),
    };

    match serde_json::to_value(&outcome) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, data),
        Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 1),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("`{}` is not valid JSON", path.display()))
}
