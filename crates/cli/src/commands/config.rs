use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use intake_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};

use crate::commands::CommandResult;

const COMMAND: &str = "config";

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = options.config_path.clone().or_else(detect_config_path);
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::config_failure(
                COMMAND,
                format!("config validation failed: {error}"),
            );
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = Sources { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };
    let mut entries = Map::new();

    let mut push = |key: &str, value: Value, env_keys: &[&str]| {
        let source = sources.of(key, env_keys);
        entries.insert(key.to_string(), json!({ "value": value, "source": source }));
    };

    push(
        "llm.api_key",
        json!(redact_key(config.llm.api_key.as_ref())),
        &["INTAKE_LLM_API_KEY", "GEMINI_API_KEY"],
    );
    push("llm.base_url", json!(config.llm.base_url), &["INTAKE_LLM_BASE_URL"]);
    push("llm.model", json!(config.llm.model), &["INTAKE_LLM_MODEL"]);
    push("llm.timeout_secs", json!(config.llm.timeout_secs), &["INTAKE_LLM_TIMEOUT_SECS"]);
    push("llm.max_retries", json!(config.llm.max_retries), &["INTAKE_LLM_MAX_RETRIES"]);
    push("llm.temperature", json!(config.llm.temperature), &["INTAKE_LLM_TEMPERATURE"]);

    push("server.bind_address", json!(config.server.bind_address), &["INTAKE_SERVER_BIND_ADDRESS"]);
    push("server.port", json!(config.server.port), &["INTAKE_SERVER_PORT"]);
    push(
        "server.cors_allow_origins",
        json!(config.server.cors_allow_origins),
        &["INTAKE_SERVER_CORS_ALLOW_ORIGINS"],
    );
    push(
        "server.graceful_shutdown_secs",
        json!(config.server.graceful_shutdown_secs),
        &["INTAKE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    );

    let form_path = config
        .form
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in admissions preset>".to_string());
    push("form.path", json!(form_path), &["INTAKE_FORM_PATH"]);
    push("form.assistant_name", json!(config.form.assistant_name), &["INTAKE_FORM_ASSISTANT_NAME"]);

    push(
        "logging.level",
        json!(config.logging.level),
        &["INTAKE_LOGGING_LEVEL", "INTAKE_LOG_LEVEL"],
    );
    push(
        "logging.format",
        json!(config.logging.format),
        &["INTAKE_LOGGING_FORMAT", "INTAKE_LOG_FORMAT"],
    );

    CommandResult::success_with_data(
        COMMAND,
        "effective config (source precedence: env > file > default)",
        Value::Object(entries),
    )
}

struct Sources<'a> {
    doc: Option<&'a toml::Value>,
    path: Option<&'a Path>,
}

impl Sources<'_> {
    fn of(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("intake.toml"), PathBuf::from("config/intake.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<toml::Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<toml::Value>().ok()
}

fn contains_path(root: &toml::Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps the provider prefix visible so operators can tell keys apart.
fn redact_key(key: Option<&SecretString>) -> String {
    let Some(key) = key else {
        return "<unset>".to_string();
    };

    let trimmed = key.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.len() > 8 {
        let prefix: String = trimmed.chars().take(4).collect();
        return format!("{prefix}***");
    }

    "<redacted>".to_string()
}
