use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use uuid::Uuid;

use crate::db::store::{StoreError, ViolationStore};
use crate::models::violation::{Violation, ViolationStatus};

/// In-process violation store for local runs and tests.
///
/// Records keep insertion order, which is also the pickup order.
#[derive(Default)]
pub struct InMemoryViolationStore {
    records: Mutex<Vec<Violation>>,
    reject_commits: AtomicBool,
    reject_fetches: AtomicBool,
}

impl InMemoryViolationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, violation: Violation) {
        self.lock().push(violation);
    }

    pub fn get(&self, id: Uuid) -> Option<Violation> {
        self.lock().iter().find(|v| v.id == id).cloned()
    }

    pub fn snapshot(&self) -> Vec<Violation> {
        self.lock().clone()
    }

    /// Make full commits fail while `mark_error` keeps working.
    pub fn reject_commits(&self, reject: bool) {
        self.reject_commits.store(reject, Ordering::SeqCst);
    }

    /// Make polls fail as if the backing database were unreachable.
    pub fn reject_fetches(&self, reject: bool) {
        self.reject_fetches.store(reject, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Violation>> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ViolationStore for InMemoryViolationStore {
    async fn fetch_eligible(&self) -> Result<Vec<Violation>, StoreError> {
        if self.reject_fetches.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("fetches rejected".to_string()));
        }
        Ok(self.lock().iter().filter(|v| v.is_eligible()).cloned().collect())
    }

    async fn commit(&self, violation: &Violation) -> Result<(), StoreError> {
        if self.reject_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commits rejected".to_string()));
        }
        let mut records = self.lock();
        let slot = records
            .iter_mut()
            .find(|v| v.id == violation.id)
            .ok_or(StoreError::NotFound(violation.id))?;
        *slot = violation.clone();
        Ok(())
    }

    async fn mark_error(&self, id: Uuid) -> Result<(), StoreError> {
        let mut records = self.lock();
        let slot = records
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(StoreError::NotFound(id))?;
        slot.status = ViolationStatus::Error;
        Ok(())
    }
}
