use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use saldo_core::config::AppConfig;
use saldo_core::domain::account::AccountNumber;
use saldo_core::errors::ApplicationError;
use saldo_db::{AccountRepository, DataApiClient, QueryBoundary, RepositoryError};
use serde_json::{json, Value};
use tracing::{info, warn};

pub const GET_BALANCE: &str = "get_balance";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self.tools.get(name).ok_or_else(|| anyhow!("unknown tool `{name}`"))?;
        tool.execute(input).await
    }
}

/// Looks up an account's balance through the query boundary.
///
/// Expected failures (missing credentials, missing input, unknown account)
/// come back as `{"error": …}` payloads the agent can relay; only query
/// boundary faults are returned as `Err`.
pub struct BalanceTool<Q> {
    repository: Result<AccountRepository<Q>, String>,
}

impl BalanceTool<DataApiClient> {
    pub fn from_config(config: &AppConfig) -> Self {
        match DataApiClient::connect(config) {
            Ok(client) => Self::new(AccountRepository::new(client)),
            Err(RepositoryError::Configuration(reason)) => Self::unconfigured(reason),
            Err(other) => Self::unconfigured(other.to_string()),
        }
    }
}

impl<Q> BalanceTool<Q>
where
    Q: QueryBoundary,
{
    pub fn new(repository: AccountRepository<Q>) -> Self {
        Self { repository: Ok(repository) }
    }

    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self { repository: Err(reason.into()) }
    }

    pub async fn get_balance(&self, account_number: &str) -> Result<Value> {
        let repository = match &self.repository {
            Ok(repository) => repository,
            Err(reason) => {
                warn!(event_name = "tool.get_balance.unconfigured", %reason, "query boundary unavailable");
                return Ok(error_payload(ApplicationError::Configuration(reason.clone())));
            }
        };

        let account_number = account_number.trim();
        if account_number.is_empty() {
            return Ok(json!({ "error": "account_number is required" }));
        }

        let number = AccountNumber(account_number.to_string());
        match repository.find_by_number(&number).await? {
            Some(record) => {
                info!(event_name = "tool.get_balance.found", account_number, "account found");
                Ok(serde_json::to_value(record)?)
            }
            None => {
                info!(event_name = "tool.get_balance.not_found", account_number, "account missing");
                Ok(error_payload(ApplicationError::NotFound(format!(
                    "account {account_number} does not exist"
                ))))
            }
        }
    }
}

#[async_trait]
impl<Q> Tool for BalanceTool<Q>
where
    Q: QueryBoundary + 'static,
{
    fn name(&self) -> &'static str {
        GET_BALANCE
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let account_number = match input.get("account_number") {
            Some(Value::String(number)) => number.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => String::new(),
        };
        self.get_balance(&account_number).await
    }
}

fn error_payload(error: ApplicationError) -> Value {
    let class = error.error_class();
    let message = match error {
        ApplicationError::Configuration(message) | ApplicationError::NotFound(message) => message,
        other @ ApplicationError::Config(_) => other.to_string(),
    };
    json!({ "error": message, "error_class": class })
}
