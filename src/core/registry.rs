//! Lock handles and the per-domain registry.
//!
//! # Invariants
//!
//! - One handle per [`Domain`], created when the registry is built and never
//!   replaced.
//! - Handles compare by identity, not by name.
//! - A held lock is released when its [`LockGuard`] drops, on every exit path
//!   including panics.

use crate::domain::model::Domain;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared mutual-exclusion handle. Cloning shares the same lock.
#[derive(Clone)]
pub struct LockHandle {
    name: Arc<str>,
    inner: Arc<Mutex<()>>,
}

impl LockHandle {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until the lock is free.
    pub fn lock(&self) -> LockGuard<'_> {
        tracing::debug!(lock = %self.name, "acquiring lock");
        let guard = self.inner.lock();
        self.acquired(guard)
    }

    /// Waits at most `timeout` for the lock.
    pub fn try_lock_for(&self, timeout: Duration) -> Option<LockGuard<'_>> {
        tracing::debug!(lock = %self.name, ?timeout, "acquiring lock");
        self.inner
            .try_lock_for(timeout)
            .map(|guard| self.acquired(guard))
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    pub fn same_handle(&self, other: &LockHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn acquired<'a>(&'a self, guard: MutexGuard<'a, ()>) -> LockGuard<'a> {
        tracing::debug!(lock = %self.name, "lock acquired");
        LockGuard {
            name: &self.name,
            acquired_at: Instant::now(),
            _guard: guard,
        }
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle")
            .field("name", &self.name)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// RAII guard; the lock is released on drop.
pub struct LockGuard<'a> {
    name: &'a str,
    acquired_at: Instant,
    _guard: MutexGuard<'a, ()>,
}

impl LockGuard<'_> {
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        tracing::debug!(lock = %self.name, held = ?self.held_for(), "lock released");
    }
}

/// Fixed table of one lock per domain.
///
/// Build once at startup and share it (`Arc`) with every component that
/// needs domain-scoped serialization.
#[derive(Debug)]
pub struct DomainLockRegistry {
    handles: HashMap<Domain, LockHandle>,
}

impl DomainLockRegistry {
    pub fn new() -> Self {
        let handles = Domain::ALL
            .iter()
            .map(|domain| (*domain, LockHandle::new(format!("domain:{}", domain))))
            .collect();
        Self { handles }
    }

    pub fn handle(&self, domain: Domain) -> &LockHandle {
        // 表格在建構時已填滿所有 Domain
        self.handles
            .get(&domain)
            .unwrap_or_else(|| self.default_handle())
    }

    pub fn handle_for(&self, domain: Option<Domain>) -> &LockHandle {
        domain.map_or_else(|| self.default_handle(), |d| self.handle(d))
    }

    /// Looks up a domain by name; unknown names fall back to the default lock.
    pub fn resolve(&self, name: &str) -> &LockHandle {
        self.handle_for(name.parse::<Domain>().ok())
    }

    pub fn default_handle(&self) -> &LockHandle {
        &self.handles[&Domain::Default]
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Default for DomainLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_handle_per_domain() {
        let registry = DomainLockRegistry::new();
        assert_eq!(registry.len(), Domain::ALL.len());

        let expense = registry.handle(Domain::Expense);
        assert!(expense.same_handle(registry.handle(Domain::Expense)));
        assert!(!expense.same_handle(registry.handle(Domain::BusinessPlan)));
        assert_eq!(expense.name(), "domain:expense");
    }

    #[test]
    fn test_absent_or_unknown_domain_uses_default() {
        let registry = DomainLockRegistry::new();
        let default = registry.default_handle();

        assert!(registry.handle_for(None).same_handle(default));
        assert!(registry.resolve("revenue_distribution").same_handle(default));
        assert!(registry
            .resolve("stage_summary")
            .same_handle(registry.handle(Domain::StageSummary)));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let handle = LockHandle::new("test");
        {
            let _guard = handle.lock();
            assert!(handle.is_locked());
            assert!(handle.try_lock_for(Duration::from_millis(10)).is_none());
        }
        assert!(!handle.is_locked());
        assert!(handle.try_lock_for(Duration::from_millis(10)).is_some());
    }

    #[test]
    fn test_clones_share_the_lock() {
        let handle = LockHandle::new("shared");
        let clone = handle.clone();
        let _guard = handle.lock();
        assert!(clone.is_locked());
        assert!(clone.same_handle(&handle));
    }

    #[test]
    fn test_separate_registries_are_independent() {
        let a = DomainLockRegistry::new();
        let b = DomainLockRegistry::new();
        let _guard = a.handle(Domain::Expense).lock();
        assert!(!b.handle(Domain::Expense).is_locked());
    }
}
