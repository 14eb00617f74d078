// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::StoreError;
use shared_models::slot::{DateKey, SlotKey, TimeString};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_date: DateKey,
    pub slot_time: TimeString,
    pub amount: f64,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub payment: PaymentState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// A fresh, unpaid, not-yet-cancelled booking of `slot` for `patient_id`.
    pub fn new(patient_id: Uuid, slot: SlotKey, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: slot.doctor_id,
            slot_date: slot.date,
            slot_time: slot.time,
            amount,
            cancelled: false,
            is_completed: false,
            payment: PaymentState::Pending,
            created_at: Utc::now(),
            cancelled_at: None,
        }
    }

    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.doctor_id, self.slot_date, self.slot_time)
    }

    /// Holds its slot, i.e. has not been cancelled.
    pub fn is_active(&self) -> bool {
        !self.cancelled
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    #[default]
    Pending,
    Completed,
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentState::Pending => write!(f, "pending"),
            PaymentState::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_date: DateKey,
    pub slot_time: TimeString,
}

impl BookSlotRequest {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.doctor_id, self.slot_date, self.slot_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "appointment", rename_all = "snake_case")]
pub enum CancellationOutcome {
    /// This call cancelled the appointment and released its slot.
    Cancelled(Appointment),
    /// The appointment was already terminal; nothing was written.
    AlreadyCancelled(Appointment),
}

impl CancellationOutcome {
    pub fn appointment(&self) -> &Appointment {
        match self {
            CancellationOutcome::Cancelled(appointment)
            | CancellationOutcome::AlreadyCancelled(appointment) => appointment,
        }
    }
}

/// Mismatches between a doctor's calendar and that doctor's appointments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub doctor_id: Uuid,
    /// Calendar entries with no active appointment behind them.
    pub orphaned_slots: Vec<SlotKey>,
    /// Active appointments whose slot is missing from the calendar.
    pub unrecorded_appointments: Vec<Uuid>,
    /// Slots held by more than one active appointment.
    pub double_bookings: Vec<SlotKey>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_slots.is_empty()
            && self.unrecorded_appointments.is_empty()
            && self.double_bookings.is_empty()
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Doctor(Uuid),
    Patient(Uuid),
    Appointment(Uuid),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Doctor(id) => write!(f, "Doctor {}", id),
            Entity::Patient(id) => write!(f, "Patient {}", id),
            Entity::Appointment(id) => write!(f, "Appointment {}", id),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("Doctor {0} is not available")]
    Unavailable(Uuid),

    #[error("Slot already booked: {0}")]
    SlotTaken(SlotKey),

    #[error("User {requester_id} may not modify appointment {appointment_id}")]
    Forbidden { requester_id: Uuid, appointment_id: Uuid },

    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl BookingError {
    /// Stable identifier of the error kind for callers that map errors onto
    /// their own transport.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::NotFound(_) => "not_found",
            BookingError::Unavailable(_) => "unavailable",
            BookingError::SlotTaken(_) => "slot_taken",
            BookingError::Forbidden { .. } => "forbidden",
            BookingError::StorageFailure(_) => "storage_failure",
        }
    }

    /// Business-rule rejections, as opposed to infrastructure failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, BookingError::StorageFailure(_))
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        BookingError::StorageFailure(err.to_string())
    }
}
