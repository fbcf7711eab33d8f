use crate::core::executor::DomainExecutor;
use crate::core::interceptor::{is_strict_transient, TransactionalInterceptor};
use crate::domain::ports::Transactional;
use crate::utils::error::{Result, TxnError};
use serde::{Deserialize, Serialize};

/// Which serialization layers a transactional operation passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationMode {
    /// Only the operation's domain lock. Distinct domains run in parallel.
    #[default]
    PerDomain,
    /// Only the process-wide lock.
    Global,
    /// Process-wide lock outside, domain lock inside. Each layer keeps its
    /// own single retry, so an operation may run up to four times.
    Layered,
}

/// Routes [`Transactional`] operations through the configured layers.
#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    mode: SerializationMode,
    executor: DomainExecutor,
    interceptor: TransactionalInterceptor,
}

impl TransactionCoordinator {
    pub fn new(
        mode: SerializationMode,
        executor: DomainExecutor,
        interceptor: TransactionalInterceptor,
    ) -> Self {
        if mode == SerializationMode::Layered {
            tracing::warn!(
                "layered serialization enabled: every transactional operation is serialized \
                 against all others regardless of domain"
            );
        }
        Self {
            mode,
            executor,
            interceptor,
        }
    }

    pub fn mode(&self) -> SerializationMode {
        self.mode
    }

    pub fn executor(&self) -> &DomainExecutor {
        &self.executor
    }

    pub fn interceptor(&self) -> &TransactionalInterceptor {
        &self.interceptor
    }

    pub fn run<O: Transactional>(&self, target: &mut O) -> Result<O::Output> {
        match self.mode {
            SerializationMode::Global => self.interceptor.proceed(target),
            SerializationMode::PerDomain => {
                tracing::debug!("transactional call: {}.{}", target.owner(), target.name());
                let domain = target.domain();
                self.executor.run(domain, || target.execute())
            }
            SerializationMode::Layered => {
                let owner = target.owner();
                let name = target.name();
                let domain = target.domain();
                let classifier = self.interceptor.classifier();
                self.interceptor.around(
                    owner,
                    name,
                    |e: &TxnError| is_strict_transient(classifier, e),
                    || self.executor.run(domain, || target.execute()),
                )
            }
        }
    }
}
