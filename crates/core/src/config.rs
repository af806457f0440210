use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_MODEL_ID: &str = "us.amazon.nova-micro-v1:0";
pub const DEFAULT_DATABASE_NAME: &str = "bankdb";
pub const DEFAULT_AGENT_NAME: &str = "saldo_agent";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub aws: AwsConfig,
    pub model: ModelConfig,
    pub database: DatabaseConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct AwsConfig {
    pub region: String,
}

#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub id: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub name: String,
    pub cluster_arn: Option<String>,
    pub secret_arn: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub runtime_arn: Option<String>,
    pub name: String,
    pub session_id: Option<String>,
    pub endpoint: Option<String>,
    pub control_endpoint: Option<String>,
    pub qualifier: String,
    pub transport: AgentTransport,
    pub bearer_token: Option<SecretString>,
    pub max_attempts: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentTransport {
    Runtime,
    Converse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub agent_runtime_arn: Option<String>,
    pub agent_transport: Option<AgentTransport>,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            aws: AwsConfig { region: DEFAULT_REGION.to_string() },
            model: ModelConfig { id: DEFAULT_MODEL_ID.to_string() },
            database: DatabaseConfig {
                name: DEFAULT_DATABASE_NAME.to_string(),
                cluster_arn: None,
                secret_arn: None,
                endpoint: None,
            },
            agent: AgentConfig {
                runtime_arn: None,
                name: DEFAULT_AGENT_NAME.to_string(),
                session_id: None,
                endpoint: None,
                control_endpoint: None,
                qualifier: "DEFAULT".to_string(),
                transport: AgentTransport::Runtime,
                bearer_token: None,
                max_attempts: 3,
            },
            logging: LoggingConfig { level: "warn".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for AgentTransport {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "runtime" => Ok(Self::Runtime),
            "converse" => Ok(Self::Converse),
            other => Err(ConfigError::Validation(format!(
                "unsupported agent transport `{other}` (expected runtime|converse)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("saldo.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Data API endpoint, derived from the region unless configured.
    pub fn data_api_endpoint(&self) -> String {
        self.database
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://rds-data.{}.amazonaws.com", self.aws.region))
    }

    pub fn agent_endpoint(&self) -> String {
        self.agent
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-agentcore.{}.amazonaws.com", self.aws.region))
    }

    pub fn control_endpoint(&self) -> String {
        self.agent.control_endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-agentcore-control.{}.amazonaws.com", self.aws.region)
        })
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(aws) = patch.aws {
            if let Some(region) = aws.region {
                self.aws.region = region;
            }
        }

        if let Some(model) = patch.model {
            if let Some(id) = model.id {
                self.model.id = id;
            }
        }

        if let Some(database) = patch.database {
            if let Some(name) = database.name {
                self.database.name = name;
            }
            if let Some(cluster_arn) = database.cluster_arn {
                self.database.cluster_arn = Some(cluster_arn);
            }
            if let Some(secret_arn) = database.secret_arn {
                self.database.secret_arn = Some(secret_arn);
            }
            if let Some(endpoint) = database.endpoint {
                self.database.endpoint = Some(endpoint);
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(runtime_arn) = agent.runtime_arn {
                self.agent.runtime_arn = Some(runtime_arn);
            }
            if let Some(name) = agent.name {
                self.agent.name = name;
            }
            if let Some(session_id) = agent.session_id {
                self.agent.session_id = Some(session_id);
            }
            if let Some(endpoint) = agent.endpoint {
                self.agent.endpoint = Some(endpoint);
            }
            if let Some(control_endpoint) = agent.control_endpoint {
                self.agent.control_endpoint = Some(control_endpoint);
            }
            if let Some(qualifier) = agent.qualifier {
                self.agent.qualifier = qualifier;
            }
            if let Some(transport) = agent.transport {
                self.agent.transport = transport;
            }
            if let Some(agent_bearer_token_value) = agent.bearer_token {
                self.agent.bearer_token = Some(secret_value(agent_bearer_token_value));
            }
            if let Some(max_attempts) = agent.max_attempts {
                self.agent.max_attempts = max_attempts;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AWS_REGION") {
            self.aws.region = value;
        }
        if let Some(value) = read_env("BEDROCK_MODEL_ID") {
            self.model.id = value;
        }

        if let Some(value) = read_env("DB_NAME") {
            self.database.name = value;
        }
        if let Some(value) = read_env("AURORA_CLUSTER_ARN") {
            self.database.cluster_arn = Some(value);
        }
        if let Some(value) = read_env("DB_SECRET_ARN") {
            self.database.secret_arn = Some(value);
        }
        if let Some(value) = read_env("SALDO_DATA_API_ENDPOINT") {
            self.database.endpoint = Some(value);
        }

        if let Some(value) = read_env("AGENT_RUNTIME_ARN") {
            self.agent.runtime_arn = Some(value);
        }
        if let Some(value) = read_env("AGENT_NAME") {
            self.agent.name = value;
        }
        if let Some(value) = read_env("AGENT_SESSION_ID") {
            self.agent.session_id = Some(value);
        }
        if let Some(value) = read_env("SALDO_AGENT_ENDPOINT") {
            self.agent.endpoint = Some(value);
        }
        if let Some(value) = read_env("SALDO_AGENT_CONTROL_ENDPOINT") {
            self.agent.control_endpoint = Some(value);
        }
        if let Some(value) = read_env("SALDO_AGENT_QUALIFIER") {
            self.agent.qualifier = value;
        }
        if let Some(value) = read_env("SALDO_AGENT_TRANSPORT") {
            self.agent.transport = value.parse()?;
        }
        if let Some(value) = read_env("SALDO_AGENT_BEARER_TOKEN") {
            self.agent.bearer_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("SALDO_AGENT_MAX_ATTEMPTS") {
            self.agent.max_attempts = parse_u32("SALDO_AGENT_MAX_ATTEMPTS", &value)?;
        }

        let log_level = read_env("SALDO_LOGGING_LEVEL").or_else(|| read_env("SALDO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("SALDO_LOGGING_FORMAT").or_else(|| read_env("SALDO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(runtime_arn) = overrides.agent_runtime_arn {
            self.agent.runtime_arn = Some(runtime_arn);
        }
        if let Some(transport) = overrides.agent_transport {
            self.agent.transport = transport;
        }
        if let Some(session_id) = overrides.session_id {
            self.agent.session_id = Some(session_id);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_aws(&self.aws)?;
        validate_database(&self.database)?;
        validate_agent(&self.agent)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("saldo.toml"), PathBuf::from("config/saldo.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_aws(aws: &AwsConfig) -> Result<(), ConfigError> {
    if aws.region.trim().is_empty() {
        return Err(ConfigError::Validation("aws.region must not be empty".to_string()));
    }
    Ok(())
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    if database.name.trim().is_empty() {
        return Err(ConfigError::Validation("database.name must not be empty".to_string()));
    }
    validate_endpoint("database.endpoint", database.endpoint.as_deref())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    validate_endpoint("agent.endpoint", agent.endpoint.as_deref())?;
    validate_endpoint("agent.control_endpoint", agent.control_endpoint.as_deref())?;

    if agent.max_attempts == 0 || agent.max_attempts > 10 {
        return Err(ConfigError::Validation(
            "agent.max_attempts must be in range 1..=10".to_string(),
        ));
    }

    if agent.qualifier.trim().is_empty() {
        return Err(ConfigError::Validation("agent.qualifier must not be empty".to_string()));
    }

    let blank_token =
        agent.bearer_token.as_ref().map(|token| token.expose_secret().trim().is_empty());
    if blank_token == Some(true) {
        return Err(ConfigError::Validation(
            "agent.bearer_token is set but empty; remove it or provide a token".to_string(),
        ));
    }

    Ok(())
}

fn validate_endpoint(key: &str, endpoint: Option<&str>) -> Result<(), ConfigError> {
    if let Some(endpoint) = endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    aws: Option<AwsPatch>,
    model: Option<ModelPatch>,
    database: Option<DatabasePatch>,
    agent: Option<AgentPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AwsPatch {
    region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelPatch {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    name: Option<String>,
    cluster_arn: Option<String>,
    secret_arn: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    runtime_arn: Option<String>,
    name: Option<String>,
    session_id: Option<String>,
    endpoint: Option<String>,
    control_endpoint: Option<String>,
    qualifier: Option<String>,
    transport: Option<AgentTransport>,
    bearer_token: Option<String>,
    max_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

/// Every environment variable `AppConfig::load` reads.
pub const ENV_KEYS: &[&str] = &[
    "AWS_REGION",
    "BEDROCK_MODEL_ID",
    "DB_NAME",
    "AURORA_CLUSTER_ARN",
    "DB_SECRET_ARN",
    "SALDO_DATA_API_ENDPOINT",
    "AGENT_RUNTIME_ARN",
    "AGENT_NAME",
    "AGENT_SESSION_ID",
    "SALDO_AGENT_ENDPOINT",
    "SALDO_AGENT_CONTROL_ENDPOINT",
    "SALDO_AGENT_QUALIFIER",
    "SALDO_AGENT_TRANSPORT",
    "SALDO_AGENT_BEARER_TOKEN",
    "SALDO_AGENT_MAX_ATTEMPTS",
    "SALDO_LOGGING_LEVEL",
    "SALDO_LOG_LEVEL",
    "SALDO_LOGGING_FORMAT",
    "SALDO_LOG_FORMAT",
];

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AgentTransport, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, ENV_KEYS,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_documented_fallbacks() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_KEYS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.aws.region == "us-east-1", "region should default to us-east-1")?;
        ensure(config.model.id == "us.amazon.nova-micro-v1:0", "model id should have a default")?;
        ensure(config.database.name == "bankdb", "database name should default to bankdb")?;
        ensure(config.agent.name == "saldo_agent", "agent name should default to saldo_agent")?;
        ensure(config.agent.max_attempts == 3, "transport retries should default to 3 attempts")?;
        ensure(config.database.cluster_arn.is_none(), "cluster arn has no default")?;
        ensure(
            config.agent_endpoint() == "https://bedrock-agentcore.us-east-1.amazonaws.com",
            "agent endpoint should derive from region",
        )?;
        ensure(
            config.data_api_endpoint() == "https://rds-data.us-east-1.amazonaws.com",
            "data api endpoint should derive from region",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_KEYS);

        env::set_var("TEST_SALDO_CLUSTER", "arn:aws:rds:us-east-1:1:cluster:bank");
        env::set_var("TEST_SALDO_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("saldo.toml");
            fs::write(
                &path,
                r#"
[database]
cluster_arn = "${TEST_SALDO_CLUSTER}"

[agent]
bearer_token = "${TEST_SALDO_TOKEN}"
transport = "converse"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.cluster_arn.as_deref()
                    == Some("arn:aws:rds:us-east-1:1:cluster:bank"),
                "cluster arn should be interpolated from environment",
            )?;
            ensure(
                config.agent.bearer_token.as_ref().map(|token| token.expose_secret())
                    == Some("token-from-env"),
                "bearer token should be interpolated from environment",
            )?;
            ensure(
                config.agent.transport == AgentTransport::Converse,
                "transport should be read from file",
            )
        })();

        clear_vars(&["TEST_SALDO_CLUSTER", "TEST_SALDO_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_KEYS);

        env::set_var("SALDO_LOG_LEVEL", "debug");
        env::set_var("SALDO_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "debug", "log level should be set from env alias")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env alias",
            )
        })();

        clear_vars(&["SALDO_LOG_LEVEL", "SALDO_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_KEYS);

        env::set_var("AWS_REGION", "eu-west-1");
        env::set_var("DB_NAME", "from_env");
        env::set_var("SALDO_AGENT_TRANSPORT", "runtime");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("saldo.toml");
            fs::write(
                &path,
                r#"
[aws]
region = "us-west-2"

[database]
name = "from_file"
secret_arn = "arn:secret:file"

[agent]
runtime_arn = "arn:runtime:file"

[logging]
level = "info"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    agent_runtime_arn: Some("arn:runtime:flag".to_string()),
                    agent_transport: Some(AgentTransport::Converse),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.agent.runtime_arn.as_deref() == Some("arn:runtime:flag"),
                "override runtime arn should win over file",
            )?;
            ensure(
                config.agent.transport == AgentTransport::Converse,
                "override transport should win over env",
            )?;
            ensure(config.aws.region == "eu-west-1", "env region should win over file")?;
            ensure(config.logging.level == "info", "file log level should win over default")?;
            ensure(config.database.name == "from_env", "env should win over file")?;
            ensure(
                config.database.secret_arn.as_deref() == Some("arn:secret:file"),
                "file value should win over default",
            )
        })();

        clear_vars(&["AWS_REGION", "DB_NAME", "SALDO_AGENT_TRANSPORT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_KEYS);

        env::set_var("SALDO_AGENT_ENDPOINT", "bedrock-agentcore.local");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("agent.endpoint")
            );
            ensure(has_message, "validation failure should mention agent.endpoint")
        })();

        clear_vars(&["SALDO_AGENT_ENDPOINT"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_KEYS);

        env::set_var("SALDO_AGENT_MAX_ATTEMPTS", "many");
        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "SALDO_AGENT_MAX_ATTEMPTS", "error should name the variable")
            }
            _ => Err("expected invalid env override error".to_string()),
        };

        clear_vars(&["SALDO_AGENT_MAX_ATTEMPTS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_KEYS);

        env::set_var("SALDO_AGENT_BEARER_TOKEN", "eyJ-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("eyJ-secret-value"), "debug output should not contain token")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(&["SALDO_AGENT_BEARER_TOKEN"]);
        result
    }
}
