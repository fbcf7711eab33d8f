use crate::core::backoff::JitterBackoff;
use crate::core::classifier::ContentionClassifier;
use crate::core::registry::LockHandle;
use crate::core::retry::{RetryFailure, SerializedRun};
use crate::domain::model::OperationFailure;
use crate::domain::ports::{Backoff, Transactional, TransactionalFn};
use crate::utils::error::{Result, TxnError};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_millis(100);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_millis(300);

/// Serializes every transactional operation in the process behind one lock.
///
/// Deadlocks are retried once after a short jitter; lock-wait timeouts are
/// not. All other failures propagate unchanged.
#[derive(Clone)]
pub struct TransactionalInterceptor {
    lock: LockHandle,
    backoff: Arc<dyn Backoff>,
    classifier: ContentionClassifier,
}

impl TransactionalInterceptor {
    pub fn new(lock: LockHandle) -> Self {
        Self {
            lock,
            backoff: Arc::new(JitterBackoff::new(DEFAULT_BACKOFF_MIN, DEFAULT_BACKOFF_MAX)),
            classifier: ContentionClassifier::Strict,
        }
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn lock(&self) -> &LockHandle {
        &self.lock
    }

    pub fn proceed<O: Transactional>(&self, target: &mut O) -> Result<O::Output> {
        let owner = target.owner();
        let name = target.name();
        let classifier = self.classifier;
        self.around(owner, name, |e: &TxnError| is_strict_transient(classifier, e), || {
            target.execute().map_err(TxnError::Operation)
        })
    }

    pub fn invoke<T, F>(&self, owner: &'static str, name: &'static str, op: F) -> Result<T>
    where
        F: FnMut() -> std::result::Result<T, OperationFailure>,
    {
        self.proceed(&mut TransactionalFn::new(owner, name, op))
    }

    /// Holds the global lock around `op`, which may itself return any
    /// [`TxnError`]. The coordinator uses this to nest the domain executor
    /// inside the global lock.
    pub(crate) fn around<T, P, F>(
        &self,
        owner: &str,
        name: &str,
        is_transient: P,
        op: F,
    ) -> Result<T>
    where
        P: Fn(&TxnError) -> bool,
        F: FnMut() -> Result<T>,
    {
        tracing::debug!("transactional call: {}.{}", owner, name);
        let scope = format!("{}.{}", owner, name);
        let runner = SerializedRun {
            lock: &self.lock,
            scope: &scope,
            backoff: self.backoff.as_ref(),
            deadline: None,
        };

        runner.execute(is_transient, op).map_err(|failure| match failure {
            RetryFailure::Fatal(error) | RetryFailure::AfterRetry(error) => error,
            RetryFailure::Deadline { last, elapsed } => last.unwrap_or(TxnError::DeadlineExceeded {
                scope,
                elapsed,
                last: None,
            }),
        })
    }

    pub(crate) fn classifier(&self) -> ContentionClassifier {
        self.classifier
    }
}

/// Only a bare operation failure can be retried by the global layer; errors
/// already wrapped by an inner layer are final.
pub(crate) fn is_strict_transient(classifier: ContentionClassifier, error: &TxnError) -> bool {
    match error {
        TxnError::Operation(failure) => classifier.accepts(failure.kind()),
        _ => false,
    }
}

impl std::fmt::Debug for TransactionalInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalInterceptor")
            .field("lock", &self.lock)
            .field("classifier", &self.classifier)
            .finish()
    }
}
