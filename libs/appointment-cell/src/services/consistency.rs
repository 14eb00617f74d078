// libs/appointment-cell/src/services/consistency.rs
//
// Makes the appointment + calendar mutation of a reservation or cancellation
// behave as one atomic unit, and serializes work on the same slot.
//

use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::StoreError;
use shared_models::slot::SlotKey;

use crate::models::{BookingError, ConsistencyReport, Entity};
use crate::services::locks::SlotLockRegistry;
use crate::services::store::SchedulingStore;

/// Outcome of one attempt inside [`SchedulingConsistencyService::execute`].
#[derive(Debug)]
pub enum AttemptError {
    /// A concurrent write invalidated this attempt. Retried from the top.
    Conflict(String),
    /// Final answer for the caller, never retried.
    Rejected(BookingError),
}

impl From<BookingError> for AttemptError {
    fn from(err: BookingError) -> Self {
        AttemptError::Rejected(err)
    }
}

impl From<StoreError> for AttemptError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => AttemptError::Conflict(reason),
            other => AttemptError::Rejected(BookingError::from(other)),
        }
    }
}

pub type Attempt<T> = BoxFuture<'static, Result<T, AttemptError>>;

pub struct SchedulingConsistencyService {
    store: Arc<dyn SchedulingStore>,
    locks: SlotLockRegistry,
    max_retry_attempts: u32,
    retry_backoff: Duration,
}

impl SchedulingConsistencyService {
    pub fn new(store: Arc<dyn SchedulingStore>, config: &AppConfig) -> Self {
        Self {
            store,
            locks: SlotLockRegistry::new(),
            max_retry_attempts: config.booking_max_retry_attempts.max(1),
            retry_backoff: Duration::from_millis(config.booking_retry_backoff_ms),
        }
    }

    pub fn store(&self) -> Arc<dyn SchedulingStore> {
        Arc::clone(&self.store)
    }

    pub fn locks(&self) -> &SlotLockRegistry {
        &self.locks
    }

    pub fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    /// Run `attempt` while holding the lock for `key`.
    ///
    /// Every attempt must re-read whatever it checks, because a conflicting
    /// commit from another process (which this lock cannot see) sends it back
    /// to the top. Conflicts are retried with linear backoff up to the
    /// configured bound; exhausting it is a storage failure. Rejections
    /// return immediately.
    #[instrument(skip(self, attempt), fields(slot = %key))]
    pub async fn execute<T, F>(&self, key: SlotKey, mut attempt: F) -> Result<T, BookingError>
    where
        F: FnMut() -> Attempt<T>,
    {
        let _guard = self.locks.acquire(key).await;

        for attempt_number in 1..=self.max_retry_attempts {
            debug!("Atomic attempt {} for {}", attempt_number, key);

            match attempt().await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Rejected(err)) => {
                    if err.is_rejection() {
                        debug!("Attempt for {} rejected: {}", key, err);
                    } else {
                        error!("Attempt for {} failed: {}", key, err);
                    }
                    return Err(err);
                }
                Err(AttemptError::Conflict(reason)) if attempt_number < self.max_retry_attempts => {
                    warn!(
                        "Conflict on {} ({}), retrying attempt {}/{}",
                        key, reason, attempt_number, self.max_retry_attempts
                    );
                    tokio::time::sleep(self.retry_backoff * attempt_number).await;
                }
                Err(AttemptError::Conflict(reason)) => {
                    error!(
                        "Conflict on {} persisted after {} attempts: {}",
                        key, self.max_retry_attempts, reason
                    );
                }
            }
        }

        Err(BookingError::StorageFailure(format!(
            "Failed to commit {} after {} attempts",
            key, self.max_retry_attempts
        )))
    }

    /// Compare a doctor's calendar against that doctor's appointments.
    #[instrument(skip(self))]
    pub async fn audit_doctor(&self, doctor_id: Uuid) -> Result<ConsistencyReport, BookingError> {
        let doctor = self
            .store
            .find_doctor(doctor_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Doctor(doctor_id)))?;

        let appointments = self.store.appointments_for_doctor(doctor_id).await?;

        let mut holders: HashMap<SlotKey, Vec<Uuid>> = HashMap::new();
        for appointment in appointments.iter().filter(|a| a.is_active()) {
            holders.entry(appointment.slot_key()).or_default().push(appointment.id);
        }

        let booked: HashSet<SlotKey> = doctor
            .calendar
            .iter()
            .map(|(date, time)| SlotKey::new(doctor_id, date, time))
            .collect();

        let mut orphaned_slots: Vec<SlotKey> = booked
            .iter()
            .filter(|slot| !holders.contains_key(*slot))
            .copied()
            .collect();
        orphaned_slots.sort_by_key(|slot| (slot.date, slot.time));

        let mut unrecorded_appointments: Vec<Uuid> = holders
            .iter()
            .filter(|(slot, _)| !booked.contains(*slot))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        unrecorded_appointments.sort();

        let mut double_bookings: Vec<SlotKey> = holders
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(slot, _)| *slot)
            .collect();
        double_bookings.sort_by_key(|slot| (slot.date, slot.time));

        let report = ConsistencyReport {
            doctor_id,
            orphaned_slots,
            unrecorded_appointments,
            double_bookings,
            checked_at: Some(Utc::now()),
        };

        if report.is_consistent() {
            info!("Doctor {} calendar consistent ({} booked slots)", doctor_id, booked.len());
        } else {
            warn!(
                "Doctor {} calendar inconsistent: {} orphaned, {} unrecorded, {} double-booked",
                doctor_id,
                report.orphaned_slots.len(),
                report.unrecorded_appointments.len(),
                report.double_bookings.len()
            );
        }

        Ok(report)
    }
}
