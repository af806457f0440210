use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountNumber(pub String);

/// One row of the `accounts` table as returned to the agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_number: String,
    pub owner_name: String,
    pub currency: String,
    pub balance: Option<f64>,
}
