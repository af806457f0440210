use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

pub mod account;
pub mod memory;

pub use account::AccountRepository;
pub use memory::InMemoryQueryBoundary;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("data api transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("data api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Named statement parameter; `value` is a typed cell such as
/// `{"stringValue": "…"}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

impl SqlParameter {
    pub fn string(name: &str, value: &str) -> Self {
        Self { name: name.to_string(), value: json!({ "stringValue": value }) }
    }
}

/// Single-statement SQL execution returning rows of typed cells.
#[async_trait]
pub trait QueryBoundary: Send + Sync {
    async fn execute_statement(
        &self,
        sql: &str,
        parameters: &[SqlParameter],
    ) -> Result<Vec<Vec<Value>>, RepositoryError>;
}
