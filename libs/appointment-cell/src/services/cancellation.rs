// libs/appointment-cell/src/services/cancellation.rs
use chrono::Utc;
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::models::{Appointment, BookingError, CancellationOutcome, Entity};
use crate::services::consistency::{AttemptError, SchedulingConsistencyService};
use crate::services::notifier::{self, AppointmentNotifier, NotificationKind, TracingNotifier};
use crate::services::store::{AtomicUnit, SchedulingStore};

pub struct AppointmentCancellationService {
    consistency: Arc<SchedulingConsistencyService>,
    store: Arc<dyn SchedulingStore>,
    notifier: Arc<dyn AppointmentNotifier>,
}

impl AppointmentCancellationService {
    pub fn new(consistency: Arc<SchedulingConsistencyService>) -> Self {
        Self {
            store: consistency.store(),
            consistency,
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AppointmentNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Cancel an appointment on behalf of its patient and free its slot.
    ///
    /// Cancelling an appointment that is already cancelled succeeds with
    /// [`CancellationOutcome::AlreadyCancelled`] and changes nothing.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(
        &self,
        requester_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<CancellationOutcome, BookingError> {
        let current = self.load_owned(requester_id, appointment_id).await?;

        let store = Arc::clone(&self.store);
        let outcome = self
            .consistency
            .execute(current.slot_key(), move || {
                let store = Arc::clone(&store);
                async move { Self::try_cancel(store.as_ref(), requester_id, appointment_id).await }.boxed()
            })
            .await?;

        match &outcome {
            CancellationOutcome::Cancelled(appointment) => {
                info!(
                    "Appointment {} cancelled, released {} {} for doctor {}",
                    appointment.id, appointment.slot_date, appointment.slot_time, appointment.doctor_id
                );
                notifier::dispatch(&self.notifier, NotificationKind::Cancelled, appointment.clone());
            }
            CancellationOutcome::AlreadyCancelled(appointment) => {
                debug!("Appointment {} was already cancelled", appointment.id);
            }
        }

        Ok(outcome)
    }

    async fn load_owned(&self, requester_id: Uuid, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Appointment(appointment_id)))?;

        if appointment.patient_id != requester_id {
            return Err(BookingError::Forbidden { requester_id, appointment_id });
        }

        Ok(appointment)
    }

    async fn try_cancel(
        store: &dyn SchedulingStore,
        requester_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<CancellationOutcome, AttemptError> {
        let mut appointment = store
            .find_appointment(appointment_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Appointment(appointment_id)))?;

        if appointment.patient_id != requester_id {
            return Err(BookingError::Forbidden { requester_id, appointment_id }.into());
        }

        if appointment.cancelled {
            return Ok(CancellationOutcome::AlreadyCancelled(appointment));
        }

        let cancelled_at = Utc::now();
        store
            .commit(AtomicUnit::Release {
                appointment_id,
                slot: appointment.slot_key(),
                cancelled_at,
            })
            .await?;

        appointment.cancelled = true;
        appointment.cancelled_at = Some(cancelled_at);

        Ok(CancellationOutcome::Cancelled(appointment))
    }
}
