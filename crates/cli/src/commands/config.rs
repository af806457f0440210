use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use saldo_core::config::{AppConfig, ConfigOverrides};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "config";

/// Effective configuration with source attribution and secret redaction.
pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let config = match load_config(COMMAND, config_path.clone(), ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let file_path = config_path.or_else(detect_config_path);
    let file_doc = load_config_file_doc(file_path.as_deref());
    let sources = Sources { file_doc: file_doc.as_ref(), file_path: file_path.as_deref() };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        lines.push(render_line(entry.key, &entry.value, sources.of(entry.key, entry.env_keys)));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

struct Entry {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    Entry { key, value, env_keys }
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let database = &config.database;
    let agent = &config.agent;

    vec![
        entry("aws.region", config.aws.region.clone(), &["AWS_REGION"]),
        entry("model.id", config.model.id.clone(), &["BEDROCK_MODEL_ID"]),
        entry("database.name", database.name.clone(), &["DB_NAME"]),
        entry(
            "database.cluster_arn",
            or_unset(database.cluster_arn.as_deref()),
            &["AURORA_CLUSTER_ARN"],
        ),
        entry(
            "database.secret_arn",
            redact_arn(database.secret_arn.as_deref()),
            &["DB_SECRET_ARN"],
        ),
        entry("database.endpoint", config.data_api_endpoint(), &["SALDO_DATA_API_ENDPOINT"]),
        entry("agent.runtime_arn", or_unset(agent.runtime_arn.as_deref()), &["AGENT_RUNTIME_ARN"]),
        entry("agent.name", agent.name.clone(), &["AGENT_NAME"]),
        entry("agent.session_id", or_unset(agent.session_id.as_deref()), &["AGENT_SESSION_ID"]),
        entry("agent.endpoint", config.agent_endpoint(), &["SALDO_AGENT_ENDPOINT"]),
        entry(
            "agent.control_endpoint",
            config.control_endpoint(),
            &["SALDO_AGENT_CONTROL_ENDPOINT"],
        ),
        entry("agent.qualifier", agent.qualifier.clone(), &["SALDO_AGENT_QUALIFIER"]),
        entry("agent.transport", format!("{:?}", agent.transport), &["SALDO_AGENT_TRANSPORT"]),
        entry(
            "agent.bearer_token",
            redact_token(agent.bearer_token.as_ref()),
            &["SALDO_AGENT_BEARER_TOKEN"],
        ),
        entry("agent.max_attempts", agent.max_attempts.to_string(), &["SALDO_AGENT_MAX_ATTEMPTS"]),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["SALDO_LOGGING_LEVEL", "SALDO_LOG_LEVEL"],
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SALDO_LOGGING_FORMAT", "SALDO_LOG_FORMAT"],
        ),
    ]
}

struct Sources<'a> {
    file_doc: Option<&'a Value>,
    file_path: Option<&'a Path>,
}

impl Sources<'_> {
    fn of(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(**key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("saldo.toml"), PathBuf::from("config/saldo.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn or_unset(value: Option<&str>) -> String {
    value.unwrap_or("<unset>").to_string()
}

fn redact_token(token: Option<&SecretString>) -> String {
    match token.map(|token| token.expose_secret().trim().to_string()) {
        None => "<unset>".to_string(),
        Some(token) if token.is_empty() => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}

/// Keeps the ARN prefix up to the resource name, which is enough to tell
/// secrets apart without printing the random suffix.
fn redact_arn(arn: Option<&str>) -> String {
    let Some(arn) = arn else {
        return "<unset>".to_string();
    };
    match arn.rsplit_once('-') {
        Some((prefix, _)) if prefix.starts_with("arn:") => format!("{prefix}-***"),
        _ => "<redacted>".to_string(),
    }
}
