use crate::domain::model::{Domain, OperationFailure};
use std::time::Duration;

/// Delay applied between a transient failure and the retry attempt.
pub trait Backoff: Send + Sync {
    fn delay(&self) -> Duration;
}

/// A unit of work tagged as "runs inside a managed transaction".
///
/// Implementors are picked up by the transactional interceptor and the
/// coordinator. `execute` may be called twice when the first attempt hits
/// transient contention.
pub trait Transactional {
    type Output;

    /// Simple name of the owning type, used in diagnostics.
    fn owner(&self) -> &'static str {
        simple_type_name::<Self>()
    }

    fn name(&self) -> &'static str;

    fn domain(&self) -> Domain {
        Domain::Default
    }

    fn execute(&mut self) -> Result<Self::Output, OperationFailure>;
}

/// Last path segment of a type name, generics stripped.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Adapts a closure to [`Transactional`].
pub struct TransactionalFn<F> {
    owner: &'static str,
    name: &'static str,
    domain: Domain,
    op: F,
}

impl<F, T> TransactionalFn<F>
where
    F: FnMut() -> Result<T, OperationFailure>,
{
    pub fn new(owner: &'static str, name: &'static str, op: F) -> Self {
        Self {
            owner,
            name,
            domain: Domain::Default,
            op,
        }
    }

    pub fn in_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }
}

impl<F, T> Transactional for TransactionalFn<F>
where
    F: FnMut() -> Result<T, OperationFailure>,
{
    type Output = T;

    fn owner(&self) -> &'static str {
        self.owner
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn domain(&self) -> Domain {
        self.domain
    }

    fn execute(&mut self) -> Result<T, OperationFailure> {
        (self.op)()
    }
}
