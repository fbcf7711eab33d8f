use crate::domain::model::{FailureKind, OperationFailure};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// In-memory key/value store standing in for the relational backend.
///
/// Writes can be made to fail through a fault queue. Each queued fault is
/// turned into an [`OperationFailure`] at the point of failure, so callers
/// receive an already-classified error.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    rows: Arc<RwLock<HashMap<String, Value>>>,
    faults: Arc<Mutex<VecDeque<OperationFailure>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注入一筆以驅動程式訊息描述的錯誤，由訊息內容判斷種類
    pub fn inject_fault(&self, driver_message: impl Into<String>) {
        self.faults
            .lock()
            .push_back(OperationFailure::from_message(driver_message));
    }

    pub fn inject_failure(&self, kind: FailureKind, message: impl Into<String>) {
        self.faults
            .lock()
            .push_back(OperationFailure::new(kind, message));
    }

    pub fn pending_faults(&self) -> usize {
        self.faults.lock().len()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.rows.read().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: Value) -> Result<(), OperationFailure> {
        self.take_fault()?;
        let mut rows = self.rows.write();
        if rows.contains_key(key) {
            return Err(OperationFailure::constraint_violation(format!(
                "duplicate key '{}' violates unique constraint",
                key
            )));
        }
        rows.insert(key.to_string(), value);
        Ok(())
    }

    pub fn upsert(&self, key: &str, value: Value) -> Result<Option<Value>, OperationFailure> {
        self.take_fault()?;
        Ok(self.rows.write().insert(key.to_string(), value))
    }

    pub fn delete(&self, key: &str) -> Result<Option<Value>, OperationFailure> {
        self.take_fault()?;
        Ok(self.rows.write().remove(key))
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn take_fault(&self) -> Result<(), OperationFailure> {
        match self.faults.lock().pop_front() {
            Some(failure) => {
                tracing::debug!(kind = ?failure.kind(), "store write failed: {}", failure);
                Err(failure)
            }
            None => Ok(()),
        }
    }
}
