//! Crate-wide error types.
//!
//! Connector failures are split by how the orchestrator reacts to them:
//! authentication failures park the account until the next re-login,
//! transient failures are retried on the next tick, and permanent failures
//! move the affected transaction to `ERROR`.

use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors reported by exchange connectors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// Login or session rejected by the exchange.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network failure, timeout or server-side throttling.
    #[error("transient connector error: {0}")]
    Transient(String),

    /// The exchange refused the request itself (bad parameters, unknown order).
    #[error("permanent connector error: {0}")]
    Permanent(String),
}

impl ConnectorError {
    /// Whether the failed call may succeed when repeated later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent(_))
    }

    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// A receipt arrived without a field the matcher requires.
    #[error("receipt extraction incomplete: missing {field}")]
    ExtractionIncomplete { field: &'static str },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// The connector failure behind this error, if any.
    #[must_use]
    pub fn as_connector(&self) -> Option<&ConnectorError> {
        match self {
            Self::Connector(err) => Some(err),
            _ => None,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_connector_errors_are_not_retryable() {
        assert!(ConnectorError::Transient("timeout".into()).is_retryable());
        assert!(ConnectorError::Authentication("expired".into()).is_retryable());
        assert!(!ConnectorError::Permanent("bad amount".into()).is_retryable());
    }

    #[test]
    fn connector_error_is_exposed_through_top_level_error() {
        let err: Error = ConnectorError::Permanent("bad".into()).into();
        assert_eq!(
            err.as_connector(),
            Some(&ConnectorError::Permanent("bad".into()))
        );
        assert!(Error::not_found("account", "a-1").as_connector().is_none());
    }

    #[test]
    fn extraction_incomplete_names_missing_field() {
        let err = Error::ExtractionIncomplete { field: "amount" };
        assert_eq!(err.to_string(), "receipt extraction incomplete: missing amount");
    }
}
