// libs/appointment-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use doctor_cell::models::Doctor;
use shared_models::error::StoreError;
use shared_models::slot::SlotKey;

use crate::models::Appointment;

/// A two-record mutation (appointment + doctor calendar) that a store must
/// apply entirely or not at all.
///
/// Each unit carries its own commit-time precondition. When the precondition
/// no longer holds the store answers [`StoreError::Conflict`] and writes
/// nothing; the caller re-reads and decides again.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicUnit {
    /// Requires the slot to be absent from the doctor's calendar.
    /// Inserts the appointment and marks the slot booked.
    Reserve { appointment: Appointment },

    /// Requires the appointment to exist and not be cancelled.
    /// Sets `cancelled` (stamped with `cancelled_at`) and releases the slot.
    Release {
        appointment_id: Uuid,
        slot: SlotKey,
        cancelled_at: DateTime<Utc>,
    },
}

impl AtomicUnit {
    pub fn kind(&self) -> &'static str {
        match self {
            AtomicUnit::Reserve { .. } => "reserve",
            AtomicUnit::Release { .. } => "release",
        }
    }

    pub fn slot(&self) -> SlotKey {
        match self {
            AtomicUnit::Reserve { appointment } => appointment.slot_key(),
            AtomicUnit::Release { slot, .. } => *slot,
        }
    }
}

/// Storage collaborator for the scheduling core: the doctor/patient directory
/// plus appointment persistence.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError>;

    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, StoreError>;

    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Newest first.
    async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    async fn commit(&self, unit: AtomicUnit) -> Result<(), StoreError>;
}
