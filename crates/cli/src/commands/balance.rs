use std::path::PathBuf;

use saldo_agent::tools::{BalanceTool, ToolRegistry, GET_BALANCE};
use saldo_core::config::ConfigOverrides;
use serde_json::{json, Value};

use crate::commands::{current_thread_runtime, load_config, CommandResult};

const COMMAND: &str = "balance";

/// Runs the `get_balance` tool once, outside any conversation.
pub fn run(config_path: Option<PathBuf>, account_number: &str) -> CommandResult {
    let config = match load_config(COMMAND, config_path, ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let mut tools = ToolRegistry::default();
    tools.register(BalanceTool::from_config(&config));

    let input = json!({ "account_number": account_number });
    match runtime.block_on(tools.execute(GET_BALANCE, input)) {
        Ok(payload) => outcome(payload),
        Err(error) => {
            CommandResult::failure(COMMAND, "query", format!("balance lookup failed: {error:#}"), 4)
        }
    }
}

fn outcome(payload: Value) -> CommandResult {
    if payload.get("error").is_none() {
        return CommandResult::success(COMMAND, "account found", Some(payload));
    }

    let message = payload["error"].as_str().unwrap_or("balance lookup failed");
    let error_class = payload.get("error_class").and_then(Value::as_str).unwrap_or("invalid_input");
    let exit_code = if error_class == "config_validation" { 2 } else { 4 };
    CommandResult::failure(COMMAND, error_class, message, exit_code)
}
