use async_trait::async_trait;
use reqwest::Client;
use saldo_core::config::AppConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::repositories::{QueryBoundary, RepositoryError, SqlParameter};

/// Target of the Data API `ExecuteStatement` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataApiSettings {
    pub endpoint: String,
    pub resource_arn: String,
    pub secret_arn: String,
    pub database: String,
}

impl DataApiSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, RepositoryError> {
        let (Some(resource_arn), Some(secret_arn)) =
            (config.database.cluster_arn.clone(), config.database.secret_arn.clone())
        else {
            return Err(RepositoryError::Configuration(
                "missing AURORA_CLUSTER_ARN or DB_SECRET_ARN".to_string(),
            ));
        };

        Ok(Self {
            endpoint: config.data_api_endpoint(),
            resource_arn,
            secret_arn,
            database: config.database.name.clone(),
        })
    }
}

/// SQL-over-HTTP client for the managed Data API.
///
/// Requests go to `{endpoint}/Execute`. Request signing is left to the
/// endpoint (a signing proxy or a local emulator).
#[derive(Clone, Debug)]
pub struct DataApiClient {
    client: Client,
    settings: DataApiSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteStatementRequest<'a> {
    resource_arn: &'a str,
    secret_arn: &'a str,
    database: &'a str,
    sql: &'a str,
    parameters: &'a [SqlParameter],
}

#[derive(Debug, Default, Deserialize)]
struct ExecuteStatementResponse {
    #[serde(default)]
    records: Vec<Vec<Value>>,
}

impl DataApiClient {
    pub fn new(settings: DataApiSettings) -> Self {
        Self { client: Client::new(), settings }
    }

    pub fn connect(config: &AppConfig) -> Result<Self, RepositoryError> {
        DataApiSettings::from_config(config).map(Self::new)
    }
}

#[async_trait]
impl QueryBoundary for DataApiClient {
    async fn execute_statement(
        &self,
        sql: &str,
        parameters: &[SqlParameter],
    ) -> Result<Vec<Vec<Value>>, RepositoryError> {
        let url = format!("{}/Execute", self.settings.endpoint.trim_end_matches('/'));
        let body = ExecuteStatementRequest {
            resource_arn: &self.settings.resource_arn,
            secret_arn: &self.settings.secret_arn,
            database: &self.settings.database,
            sql,
            parameters,
        };

        debug!(
            event_name = "db.data_api.execute",
            database = %self.settings.database,
            parameter_count = parameters.len(),
            "executing statement"
        );

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Status { status: status.as_u16(), body });
        }

        let payload: ExecuteStatementResponse = response.json().await?;
        Ok(payload.records)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use saldo_core::config::AppConfig;
    use serde_json::{json, Value};

    use super::{DataApiClient, DataApiSettings};
    use crate::repositories::{QueryBoundary, RepositoryError, SqlParameter};

    async fn serve(app: Router) -> String {
        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let address = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{address}")
    }

    fn settings(endpoint: String) -> DataApiSettings {
        DataApiSettings {
            endpoint,
            resource_arn: "arn:aws:rds:us-east-1:123456789012:cluster:bank".to_string(),
            secret_arn: "arn:aws:secretsmanager:us-east-1:123456789012:secret:bank".to_string(),
            database: "bankdb".to_string(),
        }
    }

    #[test]
    fn settings_require_both_arns() {
        let mut config = AppConfig::default();
        config.database.cluster_arn = Some("arn:cluster".to_string());

        let error = DataApiSettings::from_config(&config).expect_err("secret arn is missing");
        assert!(matches!(
            error,
            RepositoryError::Configuration(ref message) if message.contains("DB_SECRET_ARN")
        ));

        config.database.secret_arn = Some("arn:secret".to_string());
        let settings = DataApiSettings::from_config(&config).expect("both arns present");
        assert_eq!(settings.endpoint, "https://rds-data.us-east-1.amazonaws.com");
        assert_eq!(settings.database, "bankdb");
    }

    #[tokio::test]
    async fn execute_statement_posts_named_parameters_and_returns_records() {
        let app = Router::new().route(
            "/Execute",
            post(|Json(body): Json<Value>| async move {
                let account = body["parameters"][0]["value"]["stringValue"].clone();
                let records = if body["database"] == "bankdb" && account == "001" {
                    json!([[
                        {"stringValue": "001"},
                        {"stringValue": "Ana"},
                        {"stringValue": "PEN"},
                        {"doubleValue": 150.5}
                    ]])
                } else {
                    json!([])
                };
                Json(json!({ "records": records, "numberOfRecordsUpdated": 0 }))
            }),
        );
        let client = DataApiClient::new(settings(serve(app).await));

        let found = client
            .execute_statement("SELECT 1", &[SqlParameter::string("n", "001")])
            .await
            .expect("statement executes");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0][3], json!({"doubleValue": 150.5}));

        let missing = client
            .execute_statement("SELECT 1", &[SqlParameter::string("n", "999")])
            .await
            .expect("statement executes");
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_body() {
        let app = Router::new().route(
            "/Execute",
            post(|| async { (StatusCode::BAD_REQUEST, "BadRequestException: bad sql") }),
        );
        let client = DataApiClient::new(settings(serve(app).await));

        let error = client.execute_statement("SELEC", &[]).await.expect_err("should fail");
        assert!(matches!(
            error,
            RepositoryError::Status { status: 400, ref body } if body.contains("bad sql")
        ));
    }
}
