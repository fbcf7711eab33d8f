use crate::domain::model::{Domain, OperationFailure};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TxnError {
    #[error("operation in domain '{domain}' failed: {source}")]
    Domain {
        domain: Domain,
        #[source]
        source: OperationFailure,
    },

    #[error(transparent)]
    Operation(#[from] OperationFailure),

    #[error("deadline exceeded for '{scope}' after {elapsed:?}")]
    DeadlineExceeded {
        scope: String,
        elapsed: Duration,
        last: Option<OperationFailure>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Contention,
    Integrity,
    Timeout,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TxnError {
    /// 取得底層的操作失敗（若有）
    pub fn failure(&self) -> Option<&OperationFailure> {
        match self {
            TxnError::Domain { source, .. } => Some(source),
            TxnError::Operation(failure) => Some(failure),
            TxnError::DeadlineExceeded { last, .. } => last.as_ref(),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TxnError::DeadlineExceeded { .. } => ErrorCategory::Timeout,
            TxnError::Domain { source, .. } | TxnError::Operation(source) => {
                if source.kind().is_contention() {
                    ErrorCategory::Contention
                } else if source.kind().is_constraint_violation() {
                    ErrorCategory::Integrity
                } else {
                    ErrorCategory::System
                }
            }
            TxnError::IoError(_) => ErrorCategory::System,
            TxnError::ConfigValidationError { .. }
            | TxnError::InvalidConfigValueError { .. }
            | TxnError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Contention | ErrorCategory::Timeout => ErrorSeverity::Medium,
            ErrorCategory::Integrity | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Contention => {
                "The store reported lock contention twice in a row; retry the request later"
            }
            ErrorCategory::Timeout => {
                "The lock was held for too long; check for long-running operations in the same domain"
            }
            ErrorCategory::Integrity => "Fix the conflicting data before retrying",
            ErrorCategory::Configuration => "Check the configuration file and environment variables",
            ErrorCategory::System => "Inspect the logs for the underlying failure",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            TxnError::Domain { domain, source } => {
                format!("Operation on {} could not be completed: {}", domain, source)
            }
            TxnError::Operation(failure) => format!("Operation failed: {}", failure),
            TxnError::DeadlineExceeded { scope, elapsed, .. } => format!(
                "Gave up on {} after {:.1}s",
                scope,
                elapsed.as_secs_f64()
            ),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TxnError>;
