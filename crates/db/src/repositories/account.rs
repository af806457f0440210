use saldo_core::cell::decode_row;
use saldo_core::domain::account::{AccountNumber, AccountRecord};
use serde_json::Value;
use tracing::warn;

use super::{QueryBoundary, RepositoryError, SqlParameter};

pub const FIND_ACCOUNT_SQL: &str = "SELECT account_number, owner_name, currency, balance \
                                    FROM accounts WHERE account_number = :n";

pub struct AccountRepository<Q> {
    boundary: Q,
}

impl<Q> AccountRepository<Q>
where
    Q: QueryBoundary,
{
    pub fn new(boundary: Q) -> Self {
        Self { boundary }
    }

    pub fn boundary(&self) -> &Q {
        &self.boundary
    }

    pub async fn find_by_number(
        &self,
        number: &AccountNumber,
    ) -> Result<Option<AccountRecord>, RepositoryError> {
        let rows = self
            .boundary
            .execute_statement(FIND_ACCOUNT_SQL, &[SqlParameter::string("n", &number.0)])
            .await?;

        rows.first().map(|row| map_account(row)).transpose()
    }
}

/// Maps the fixed `(account_number, owner_name, currency, balance)` row.
pub fn map_account(row: &[Value]) -> Result<AccountRecord, RepositoryError> {
    let decoded = decode_row(row);
    let [account_number, owner_name, currency, balance, ..] = decoded.as_slice() else {
        return Err(RepositoryError::Decode(format!(
            "account row has {} columns, expected 4",
            row.len()
        )));
    };

    Ok(AccountRecord {
        account_number: text_column(account_number),
        owner_name: text_column(owner_name),
        currency: text_column(currency),
        balance: balance_column(balance),
    })
}

fn text_column(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric columns may come back as doubles or as decimal strings.
fn balance_column(value: &Value) -> Option<f64> {
    match value {
        Value::Null => None,
        Value::Number(number) => number.as_f64(),
        Value::String(text) => match text.trim().parse::<f64>() {
            Ok(balance) => Some(balance),
            Err(_) => {
                warn!(
                    event_name = "db.account.balance_unparseable",
                    value = %text,
                    "balance is not numeric"
                );
                None
            }
        },
        other => {
            warn!(
                event_name = "db.account.balance_unparseable",
                value = %other,
                "balance is not numeric"
            );
            None
        }
    }
}
