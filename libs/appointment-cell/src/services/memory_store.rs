// libs/appointment-cell/src/services/memory_store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use doctor_cell::calendar::SlotCalendar;
use doctor_cell::models::Doctor;
use shared_models::error::StoreError;
use shared_models::slot::SlotKey;

use crate::models::Appointment;
use crate::services::store::{AtomicUnit, SchedulingStore};

#[derive(Default)]
struct SchedulingState {
    doctors: HashMap<Uuid, Doctor>,
    patients: HashSet<Uuid>,
    appointments: HashMap<Uuid, Appointment>,
}

/// Process-local store. Every commit runs under one write guard, so both
/// halves of an [`AtomicUnit`] become visible together. The guard is held
/// only for the in-memory apply, never across an await on another slot.
#[derive(Default)]
pub struct InMemorySchedulingStore {
    state: RwLock<SchedulingState>,
}

impl InMemorySchedulingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_doctor(&self, doctor: Doctor) {
        self.state.write().await.doctors.insert(doctor.id, doctor);
    }

    pub async fn insert_patient(&self, patient_id: Uuid) {
        self.state.write().await.patients.insert(patient_id);
    }

    pub async fn doctor_calendar(&self, doctor_id: Uuid) -> Option<SlotCalendar> {
        self.state
            .read()
            .await
            .doctors
            .get(&doctor_id)
            .map(|doctor| doctor.calendar.clone())
    }

    pub async fn all_appointments(&self) -> Vec<Appointment> {
        self.state.read().await.appointments.values().cloned().collect()
    }

    fn apply_reserve(state: &mut SchedulingState, appointment: Appointment) -> Result<(), StoreError> {
        if state.appointments.contains_key(&appointment.id) {
            return Err(StoreError::Backend(format!(
                "Appointment {} already exists",
                appointment.id
            )));
        }

        let doctor = state.doctors.get_mut(&appointment.doctor_id).ok_or_else(|| {
            StoreError::Conflict(format!("Doctor {} disappeared before commit", appointment.doctor_id))
        })?;

        if doctor.calendar.is_booked(&appointment.slot_date, &appointment.slot_time) {
            return Err(StoreError::Conflict(format!(
                "{} was booked concurrently",
                appointment.slot_key()
            )));
        }

        doctor.calendar.mark_booked(appointment.slot_date, appointment.slot_time);
        debug!("Reserved {} for appointment {}", appointment.slot_key(), appointment.id);
        state.appointments.insert(appointment.id, appointment);

        Ok(())
    }

    fn apply_release(
        state: &mut SchedulingState,
        appointment_id: Uuid,
        slot: SlotKey,
        cancelled_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let appointment = state
            .appointments
            .get_mut(&appointment_id)
            .ok_or_else(|| StoreError::NotFound(format!("Appointment {}", appointment_id)))?;

        if appointment.cancelled {
            return Err(StoreError::Conflict(format!(
                "Appointment {} was cancelled concurrently",
                appointment_id
            )));
        }

        appointment.cancelled = true;
        appointment.cancelled_at = Some(cancelled_at);

        match state.doctors.get_mut(&slot.doctor_id) {
            Some(doctor) => {
                if !doctor.calendar.release(&slot.date, &slot.time) {
                    warn!("Released {} but it was not marked in the calendar", slot);
                }
            }
            None => warn!("Doctor {} missing while releasing {}", slot.doctor_id, slot),
        }

        debug!("Released {} for appointment {}", slot, appointment_id);
        Ok(())
    }
}

#[async_trait]
impl SchedulingStore for InMemorySchedulingStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError> {
        Ok(self.state.read().await.doctors.get(&doctor_id).cloned())
    }

    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.read().await.patients.contains(&patient_id))
    }

    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.state.read().await.appointments.get(&appointment_id).cloned())
    }

    async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let mut appointments: Vec<Appointment> = self
            .state
            .read()
            .await
            .appointments
            .values()
            .filter(|appointment| appointment.patient_id == patient_id)
            .cloned()
            .collect();

        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .appointments
            .values()
            .filter(|appointment| appointment.doctor_id == doctor_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, unit: AtomicUnit) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        match unit {
            AtomicUnit::Reserve { appointment } => Self::apply_reserve(&mut state, appointment),
            AtomicUnit::Release { appointment_id, slot, cancelled_at } => {
                Self::apply_release(&mut state, appointment_id, slot, cancelled_at)
            }
        }
    }
}
