//! Polling loop that drives violation records through recognition.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use crate::db::store::{StoreError, ViolationStore};
use crate::models::violation::{Violation, ViolationStatus};
use crate::services::matcher::VehicleRegistry;
use crate::services::ocr::OcrEngine;
use crate::services::pipeline::PlatePipeline;
use crate::services::state_machine::{apply_outcome, PassOutcome};

/// Pause after a poll that found nothing to do.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Pause after a cycle that processed at least one record.
pub const ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Single sequential consumer of the violation backlog.
pub struct Worker<S, R, E> {
    store: S,
    registry: R,
    pipeline: PlatePipeline<E>,
    idle_interval: Duration,
    active_interval: Duration,
}

impl<S, R, E> Worker<S, R, E>
where
    S: ViolationStore,
    R: VehicleRegistry,
    E: OcrEngine,
{
    pub fn new(store: S, registry: R, pipeline: PlatePipeline<E>) -> Self {
        Self {
            store,
            registry,
            pipeline,
            idle_interval: IDLE_POLL_INTERVAL,
            active_interval: ACTIVE_POLL_INTERVAL,
        }
    }

    pub fn with_poll_intervals(mut self, idle: Duration, active: Duration) -> Self {
        self.idle_interval = idle;
        self.active_interval = active;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Poll forever. Per-record failures are recorded on the record and never
    /// end the loop; a failed poll is retried after the idle interval.
    pub async fn run(&self) {
        info!("Worker ready, polling for pending violations");

        loop {
            let cycle = self.run_cycle().await;
            match &cycle {
                Ok(0) => trace!("No pending violations, sleeping"),
                Ok(processed) => debug!(processed, "Cycle complete"),
                Err(e) => error!(error = %e, "Failed to fetch pending violations, will retry"),
            }
            sleep(self.next_pause(&cycle)).await;
        }
    }

    /// Pause before the next poll: the active interval only after a cycle
    /// that processed something.
    pub fn next_pause(&self, cycle: &Result<usize, StoreError>) -> Duration {
        match cycle {
            Ok(processed) if *processed > 0 => self.active_interval,
            Ok(_) | Err(_) => self.idle_interval,
        }
    }

    /// Fetch the current backlog and process it in order, one record at a time.
    ///
    /// Returns how many records were processed.
    pub async fn run_cycle(&self) -> Result<usize, StoreError> {
        let pending = self.store.fetch_eligible().await?;
        metrics::gauge!("anpr_backlog_depth").set(pending.len() as f64);

        let count = pending.len();
        for violation in pending {
            self.process_violation(violation).await;
        }
        Ok(count)
    }

    /// Run one pass over `violation` and commit its new status.
    pub async fn process_violation(&self, mut violation: Violation) -> ViolationStatus {
        let started = Instant::now();
        let id = violation.id;
        info!(violation_id = %id, image_path = %violation.image_path, "Processing violation");

        let outcome = match self.pipeline.run_pass(&violation, &self.registry).await {
            Ok((plate, extraction)) => PassOutcome::Resolved {
                plate,
                cropped_plate_path: extraction
                    .cropped_plate_path
                    .map(|p| p.to_string_lossy().into_owned()),
            },
            Err(e) => {
                error!(violation_id = %id, error = %e, "Violation processing failed");
                PassOutcome::Failed
            }
        };

        let mut status = apply_outcome(&mut violation, outcome);
        if let Err(e) = self.commit(&violation).await {
            error!(violation_id = %id, error = %e, "Failed to commit violation");
            status = ViolationStatus::Error;
            if let Err(e) = self.store.mark_error(id).await {
                // Still pending in the store; the next poll sees it again.
                warn!(violation_id = %id, error = %e, "Failed to mark violation as error");
                status = ViolationStatus::Pending;
            }
        }

        match status {
            ViolationStatus::Processed => info!(
                violation_id = %id,
                plate = violation.vehicle_number.as_deref().unwrap_or_default(),
                fine = violation.fine_amount,
                "Matched registered vehicle"
            ),
            ViolationStatus::NeedsReview => info!(
                violation_id = %id,
                plate = violation.vehicle_number.as_deref().unwrap_or_default(),
                "Could not match vehicle definitively"
            ),
            ViolationStatus::Error | ViolationStatus::Pending => {}
        }

        metrics::counter!("anpr_violations_total", "status" => status.to_string()).increment(1);
        metrics::histogram!("anpr_processing_seconds").record(started.elapsed().as_secs_f64());

        status
    }

    async fn commit(&self, violation: &Violation) -> Result<(), StoreError> {
        match violation.status {
            ViolationStatus::Error => self.store.mark_error(violation.id).await,
            _ => self.store.commit(violation).await,
        }
    }
}
