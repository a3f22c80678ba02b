use std::future::Future;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries;
use crate::models::violation::Violation;

/// Backlog of violation records the worker polls and commits into.
///
/// Each commit is independent: one record's failure never rolls back
/// another's. There is no claim step, so only one worker may poll a store.
pub trait ViolationStore {
    /// Every record currently eligible for pickup, in processing order.
    fn fetch_eligible(&self) -> impl Future<Output = Result<Vec<Violation>, StoreError>> + Send;

    /// Persist the worker-owned fields of `violation`.
    fn commit(&self, violation: &Violation) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Set the status of `id` to `error` without touching anything else.
    fn mark_error(&self, id: Uuid) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Store backed by the `violations` table.
#[derive(Clone)]
pub struct PgViolationStore {
    pool: PgPool,
}

impl PgViolationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ViolationStore for PgViolationStore {
    async fn fetch_eligible(&self) -> Result<Vec<Violation>, StoreError> {
        Ok(queries::fetch_eligible_violations(&self.pool).await?)
    }

    async fn commit(&self, violation: &Violation) -> Result<(), StoreError> {
        Ok(queries::update_violation(&self.pool, violation).await?)
    }

    async fn mark_error(&self, id: Uuid) -> Result<(), StoreError> {
        Ok(queries::mark_violation_error(&self.pool, id).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Violation {0} not found")]
    NotFound(Uuid),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
