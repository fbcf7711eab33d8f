//! Textual contention classifier.
//!
//! Failures that arrive without a structured kind (driver messages, foreign
//! errors) are classified here once, when they are turned into an
//! [`OperationFailure`](crate::domain::model::OperationFailure). Matching is a
//! case-insensitive substring search.

use crate::domain::model::{Contention, FailureKind};

/// MySQL error 1213 and SQLSTATE 40001 both mean "deadlock, try again".
const DEADLOCK_MARKERS: [&str; 3] = ["deadlock", "1213", "40001"];

const LOCK_TIMEOUT_MARKERS: [&str; 3] = ["lock wait timeout", "timeout", "expired"];

const INTEGRITY_MARKERS: [&str; 3] = ["constraint", "duplicate", "unique"];

/// Which contention kinds count as retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentionClassifier {
    /// Deadlocks only. Used by the global interceptor.
    Strict,
    /// Deadlocks and lock-wait timeouts. Used by the domain executor.
    Lenient,
}

impl ContentionClassifier {
    pub fn is_transient(&self, description: Option<&str>) -> bool {
        self.accepts(classify(description))
    }

    pub fn accepts(&self, kind: FailureKind) -> bool {
        match (self, kind) {
            (_, FailureKind::TransientContention(Contention::Deadlock)) => true,
            (
                ContentionClassifier::Lenient,
                FailureKind::TransientContention(Contention::LockTimeout),
            ) => true,
            _ => false,
        }
    }

    pub fn markers(&self) -> Vec<&'static str> {
        let mut markers = DEADLOCK_MARKERS.to_vec();
        if *self == ContentionClassifier::Lenient {
            markers.extend_from_slice(&LOCK_TIMEOUT_MARKERS);
        }
        markers
    }
}

pub fn classify(description: Option<&str>) -> FailureKind {
    let Some(description) = description else {
        return FailureKind::Other;
    };
    let lowered = description.to_lowercase();
    let contains_any = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));

    // 死鎖優先於逾時判斷
    if contains_any(&DEADLOCK_MARKERS[..]) {
        FailureKind::TransientContention(Contention::Deadlock)
    } else if contains_any(&LOCK_TIMEOUT_MARKERS[..]) {
        FailureKind::TransientContention(Contention::LockTimeout)
    } else if contains_any(&INTEGRITY_MARKERS[..]) {
        FailureKind::ConstraintViolation
    } else {
        FailureKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_recognizes_all_contention_markers() {
        let classifier = ContentionClassifier::Lenient;
        assert!(classifier.is_transient(Some("Error 1213: Deadlock found")));
        assert!(classifier.is_transient(Some("SQLSTATE=40001")));
        assert!(classifier.is_transient(Some("Lock wait timeout exceeded")));
        assert!(classifier.is_transient(Some("Transaction EXPIRED")));
    }

    #[test]
    fn test_absent_or_unrelated_description_is_not_transient() {
        for classifier in [ContentionClassifier::Strict, ContentionClassifier::Lenient] {
            assert!(!classifier.is_transient(None));
            assert!(!classifier.is_transient(Some("connection refused")));
            assert!(!classifier.is_transient(Some("unique constraint violation")));
        }
    }

    #[test]
    fn test_strict_ignores_timeouts() {
        let classifier = ContentionClassifier::Strict;
        assert!(classifier.is_transient(Some("DEADLOCK detected")));
        assert!(classifier.is_transient(Some("SQLSTATE=40001")));
        assert!(!classifier.is_transient(Some("Lock wait timeout exceeded")));
        assert!(!classifier.is_transient(Some("session expired")));
    }

    #[test]
    fn test_classify_prefers_deadlock_over_timeout() {
        assert_eq!(
            classify(Some("deadlock while waiting; lock wait timeout")),
            FailureKind::TransientContention(Contention::Deadlock)
        );
        assert_eq!(
            classify(Some("Duplicate entry 'x' for key 'PRIMARY'")),
            FailureKind::ConstraintViolation
        );
        assert_eq!(classify(Some("connection refused")), FailureKind::Other);
        assert_eq!(classify(None), FailureKind::Other);
    }

    #[test]
    fn test_marker_sets() {
        assert_eq!(ContentionClassifier::Strict.markers().len(), 3);
        assert!(ContentionClassifier::Lenient
            .markers()
            .contains(&"lock wait timeout"));
    }
}
