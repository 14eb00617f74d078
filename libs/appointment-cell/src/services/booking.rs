// libs/appointment-cell/src/services/booking.rs
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::slot::{DateKey, TimeString};

use crate::models::{Appointment, BookSlotRequest, BookingError, Entity};
use crate::services::consistency::{AttemptError, SchedulingConsistencyService};
use crate::services::notifier::{self, AppointmentNotifier, NotificationKind, TracingNotifier};
use crate::services::store::{AtomicUnit, SchedulingStore};

pub struct AppointmentBookingService {
    consistency: Arc<SchedulingConsistencyService>,
    store: Arc<dyn SchedulingStore>,
    notifier: Arc<dyn AppointmentNotifier>,
    default_fee: f64,
}

impl AppointmentBookingService {
    pub fn new(consistency: Arc<SchedulingConsistencyService>, config: &AppConfig) -> Self {
        Self {
            store: consistency.store(),
            consistency,
            notifier: Arc::new(TracingNotifier),
            default_fee: config.default_consultation_fee,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AppointmentNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Reserve a slot for a patient.
    ///
    /// Checked in order: doctor exists, doctor is available, slot is free,
    /// patient exists. On success the appointment and the calendar entry are
    /// committed together. Of any number of concurrent calls for the same
    /// slot exactly one succeeds; the rest see `SlotTaken`.
    #[instrument(skip(self), fields(patient_id = %request.patient_id, slot = %request.slot_key()))]
    pub async fn book_slot(&self, request: BookSlotRequest) -> Result<Appointment, BookingError> {
        let store = Arc::clone(&self.store);
        let default_fee = self.default_fee;

        let appointment = self
            .consistency
            .execute(request.slot_key(), move || {
                let store = Arc::clone(&store);
                async move { Self::try_book(store.as_ref(), request, default_fee).await }.boxed()
            })
            .await?;

        info!(
            "Appointment {} booked with doctor {} on {} at {}",
            appointment.id, appointment.doctor_id, appointment.slot_date, appointment.slot_time
        );
        notifier::dispatch(&self.notifier, NotificationKind::Booked, appointment.clone());

        Ok(appointment)
    }

    async fn try_book(
        store: &dyn SchedulingStore,
        request: BookSlotRequest,
        default_fee: f64,
    ) -> Result<Appointment, AttemptError> {
        let key = request.slot_key();

        let doctor = store
            .find_doctor(request.doctor_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Doctor(request.doctor_id)))?;

        if !doctor.available {
            return Err(BookingError::Unavailable(doctor.id).into());
        }

        if doctor.calendar.is_booked(&request.slot_date, &request.slot_time) {
            return Err(BookingError::SlotTaken(key).into());
        }

        if !store.patient_exists(request.patient_id).await? {
            return Err(BookingError::NotFound(Entity::Patient(request.patient_id)).into());
        }

        let appointment = Appointment::new(request.patient_id, key, doctor.fee_or(default_fee));
        debug!("Committing appointment {} for {}", appointment.id, key);

        store
            .commit(AtomicUnit::Reserve { appointment: appointment.clone() })
            .await?;

        Ok(appointment)
    }

    /// Read-only availability query.
    pub async fn is_booked(
        &self,
        doctor_id: Uuid,
        date: DateKey,
        time: TimeString,
    ) -> Result<bool, BookingError> {
        let doctor = self
            .store
            .find_doctor(doctor_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Doctor(doctor_id)))?;

        Ok(doctor.calendar.is_booked(&date, &time))
    }

    pub async fn booked_times(&self, doctor_id: Uuid, date: DateKey) -> Result<Vec<TimeString>, BookingError> {
        let doctor = self
            .store
            .find_doctor(doctor_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Doctor(doctor_id)))?;

        Ok(doctor.calendar.booked_times(&date))
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.store
            .find_appointment(appointment_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Appointment(appointment_id)))
    }

    /// All of a patient's appointments, cancelled ones included, newest first.
    pub async fn patient_appointments(&self, patient_id: Uuid) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.store.appointments_for_patient(patient_id).await?)
    }
}
