pub mod backoff;
pub mod classifier;
pub mod coordinator;
pub mod executor;
pub mod interceptor;
pub mod registry;
pub mod retry;

pub use crate::domain::model::{Contention, Domain, FailureKind, OperationFailure};
pub use crate::domain::ports::{Backoff, Transactional, TransactionalFn};
pub use crate::utils::error::Result;
