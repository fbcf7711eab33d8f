use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of database-mutating work that gets its own lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    StageSummary,
    FinancialStatement,
    Expense,
    BusinessPlan,
    TeamManagement,
    Default,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::StageSummary,
        Domain::FinancialStatement,
        Domain::Expense,
        Domain::BusinessPlan,
        Domain::TeamManagement,
        Domain::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::StageSummary => "stage_summary",
            Domain::FinancialStatement => "financial_statement",
            Domain::Expense => "expense",
            Domain::BusinessPlan => "business_plan",
            Domain::TeamManagement => "team_management",
            Domain::Default => "default",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Domain::ALL
            .iter()
            .copied()
            .find(|domain| domain.as_str() == normalized)
            .ok_or_else(|| format!("unknown domain: {}", s))
    }
}

/// Flavour of lock contention reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contention {
    Deadlock,
    LockTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TransientContention(Contention),
    ConstraintViolation,
    Other,
}

impl FailureKind {
    pub fn is_contention(&self) -> bool {
        matches!(self, FailureKind::TransientContention(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, FailureKind::ConstraintViolation)
    }
}

/// Failure raised by a unit of work.
///
/// The kind is set once, where the failure is produced (normally the
/// persistence adapter). Retry decisions read the kind and never re-parse
/// the message.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct OperationFailure {
    kind: FailureKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl OperationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// 依照訊息內容分類（用於沒有結構化錯誤碼的來源）
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = crate::core::classifier::classify(Some(&message));
        Self::new(kind, message)
    }

    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let message = error.to_string();
        let kind = crate::core::classifier::classify(Some(&message));
        Self {
            kind,
            message,
            source: Some(Box::new(error)),
        }
    }

    pub fn deadlock(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TransientContention(Contention::Deadlock), message)
    }

    pub fn lock_timeout(message: impl Into<String>) -> Self {
        Self::new(
            FailureKind::TransientContention(Contention::LockTimeout),
            message,
        )
    }

    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ConstraintViolation, message)
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
