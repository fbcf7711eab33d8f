pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::InMemoryStore;
pub use config::GuardConfig;
pub use crate::core::{
    coordinator::{SerializationMode, TransactionCoordinator},
    executor::DomainExecutor,
    interceptor::TransactionalInterceptor,
    registry::{DomainLockRegistry, LockHandle},
};
pub use domain::model::{Domain, FailureKind, OperationFailure};
pub use domain::ports::{Transactional, TransactionalFn};
pub use utils::error::{Result, TxnError};
