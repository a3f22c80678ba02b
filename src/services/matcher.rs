use std::collections::HashSet;
use std::future::Future;

use sqlx::PgPool;

use crate::db::queries;

/// Plate recorded when extraction produced no admissible candidate.
pub const UNKNOWN_PLATE: &str = "UNKNOWN";

/// Read-only lookup of registered plates by exact string.
pub trait VehicleRegistry {
    fn is_registered(&self, plate: &str)
        -> impl Future<Output = Result<bool, RegistryError>> + Send;
}

/// Registry backed by the `vehicles` table.
#[derive(Clone)]
pub struct PgVehicleRegistry {
    pool: PgPool,
}

impl PgVehicleRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl VehicleRegistry for PgVehicleRegistry {
    async fn is_registered(&self, plate: &str) -> Result<bool, RegistryError> {
        Ok(queries::vehicle_exists(&self.pool, plate).await?)
    }
}

/// A fixed snapshot of registered plates.
impl VehicleRegistry for HashSet<String> {
    async fn is_registered(&self, plate: &str) -> Result<bool, RegistryError> {
        Ok(self.contains(plate))
    }
}

/// Outcome of resolving candidates against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateMatch {
    pub plate: String,
    pub matched: bool,
}

/// Pick a single plate out of the ordered candidates.
///
/// The first candidate that is a registry key wins. Otherwise the first
/// candidate is returned unverified, or [`UNKNOWN_PLATE`] when there are none.
/// Matching is exact; a partial read is never mapped to a registered plate.
pub async fn resolve_plate<R: VehicleRegistry>(
    candidates: &[String],
    registry: &R,
) -> Result<PlateMatch, RegistryError> {
    for candidate in candidates {
        if registry.is_registered(candidate).await? {
            return Ok(PlateMatch {
                plate: candidate.clone(),
                matched: true,
            });
        }
    }

    Ok(PlateMatch {
        plate: candidates
            .first()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PLATE.to_string()),
        matched: false,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Vehicle registry lookup failed: {0}")]
    Database(#[from] sqlx::Error),
}
