use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest identifier the agent runtime accepts.
pub const MIN_SESSION_ID_LEN: usize = 33;
pub const MAX_SESSION_ID_LEN: usize = 64;

/// Correlates turns into one conversation on the hosted runtime.
///
/// Always between [`MIN_SESSION_ID_LEN`] and [`MAX_SESSION_ID_LEN`] characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts a caller-supplied identifier, padding short ones with a random
    /// suffix and truncating long ones.
    pub fn normalize(raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).filter(|value| !value.is_empty());
        let Some(raw) = raw else {
            return Self::generate();
        };

        let padded = if raw.chars().count() < MIN_SESSION_ID_LEN {
            format!("{raw}-{}", Uuid::new_v4())
        } else {
            raw.to_string()
        };

        Self(padded.chars().take(MAX_SESSION_ID_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
