use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl ApplicationError {
    /// Stable class name used in structured command outcomes.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Configuration(_) => "config_validation",
            Self::NotFound(_) => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConfigError;
    use crate::errors::ApplicationError;

    #[test]
    fn config_errors_share_the_config_validation_class() {
        let from_loader = ApplicationError::from(ConfigError::Validation("bad".to_owned()));
        let from_caller = ApplicationError::Configuration("missing DB_SECRET_ARN".to_owned());

        assert_eq!(from_loader.error_class(), "config_validation");
        assert_eq!(from_caller.error_class(), "config_validation");
    }

    #[test]
    fn not_found_has_its_own_class() {
        let error = ApplicationError::NotFound("account 42".to_owned());
        assert_eq!(error.error_class(), "not_found");
        assert_eq!(error.to_string(), "not found: account 42");
    }
}
