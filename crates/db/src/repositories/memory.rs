use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use super::{QueryBoundary, RepositoryError, SqlParameter};

/// Query boundary backed by canned rows, keyed by the first parameter's
/// string value.
#[derive(Default)]
pub struct InMemoryQueryBoundary {
    rows: RwLock<HashMap<String, Vec<Vec<Value>>>>,
    statements: RwLock<Vec<(String, Vec<SqlParameter>)>>,
}

impl InMemoryQueryBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: &str, row: Vec<Value>) {
        let mut rows = self.rows.write().await;
        rows.entry(key.to_string()).or_default().push(row);
    }

    /// Every statement executed so far, in order.
    pub async fn statements(&self) -> Vec<(String, Vec<SqlParameter>)> {
        self.statements.read().await.clone()
    }
}

#[async_trait::async_trait]
impl QueryBoundary for InMemoryQueryBoundary {
    async fn execute_statement(
        &self,
        sql: &str,
        parameters: &[SqlParameter],
    ) -> Result<Vec<Vec<Value>>, RepositoryError> {
        self.statements.write().await.push((sql.to_string(), parameters.to_vec()));

        let key = parameters
            .first()
            .and_then(|parameter| parameter.value.get("stringValue"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let rows = self.rows.read().await;
        Ok(rows.get(key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::repositories::{InMemoryQueryBoundary, QueryBoundary, SqlParameter};

    #[tokio::test]
    async fn in_memory_boundary_returns_rows_for_matching_key_and_records_calls() {
        let boundary = InMemoryQueryBoundary::new();
        boundary.insert("7", vec![json!({"stringValue": "7"})]).await;

        let hit = boundary
            .execute_statement("SELECT", &[SqlParameter::string("n", "7")])
            .await
            .expect("in-memory query succeeds");
        let miss = boundary
            .execute_statement("SELECT", &[SqlParameter::string("n", "8")])
            .await
            .expect("in-memory query succeeds");

        assert_eq!(hit.len(), 1);
        assert!(miss.is_empty());
        assert_eq!(boundary.statements().await.len(), 2);
    }
}
