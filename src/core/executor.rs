use crate::core::backoff::JitterBackoff;
use crate::core::classifier::ContentionClassifier;
use crate::core::registry::DomainLockRegistry;
use crate::core::retry::{RetryFailure, SerializedRun};
use crate::domain::model::{Domain, OperationFailure};
use crate::domain::ports::Backoff;
use crate::utils::error::{Result, TxnError};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_millis(200);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_millis(500);
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Runs operations while holding their domain's lock.
///
/// Two operations on the same domain never overlap; different domains run
/// freely in parallel. A failure whose kind is lock contention (deadlock or
/// lock-wait timeout) is retried exactly once after a jittered delay, still
/// under the same lock.
#[derive(Clone)]
pub struct DomainExecutor {
    registry: Arc<DomainLockRegistry>,
    backoff: Arc<dyn Backoff>,
    deadline: Option<Duration>,
    classifier: ContentionClassifier,
}

impl DomainExecutor {
    pub fn new(registry: Arc<DomainLockRegistry>) -> Self {
        Self {
            registry,
            backoff: Arc::new(JitterBackoff::new(DEFAULT_BACKOFF_MIN, DEFAULT_BACKOFF_MAX)),
            deadline: Some(DEFAULT_DEADLINE),
            classifier: ContentionClassifier::Lenient,
        }
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    /// `None` waits for the lock indefinitely.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn registry(&self) -> &Arc<DomainLockRegistry> {
        &self.registry
    }

    pub fn run<T, F>(&self, domain: Domain, op: F) -> Result<T>
    where
        F: FnMut() -> std::result::Result<T, OperationFailure>,
    {
        let scope = format!("domain:{}", domain);
        let runner = SerializedRun {
            lock: self.registry.handle(domain),
            scope: &scope,
            backoff: self.backoff.as_ref(),
            deadline: self.deadline,
        };

        let classifier = self.classifier;
        runner
            .execute(|failure: &OperationFailure| classifier.accepts(failure.kind()), op)
            .map_err(|failure| match failure {
                RetryFailure::Fatal(source) => TxnError::Domain { domain, source },
                RetryFailure::AfterRetry(source) => TxnError::Operation(source),
                RetryFailure::Deadline { last, elapsed } => TxnError::DeadlineExceeded {
                    scope,
                    elapsed,
                    last,
                },
            })
    }

    pub fn run_void<F>(&self, domain: Domain, op: F) -> Result<()>
    where
        F: FnMut() -> std::result::Result<(), OperationFailure>,
    {
        self.run(domain, op)
    }
}

impl std::fmt::Debug for DomainExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainExecutor")
            .field("deadline", &self.deadline)
            .field("classifier", &self.classifier)
            .finish()
    }
}
