// libs/appointment-cell/src/services/notifier.rs
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::Appointment;

/// Receives committed booking events. Delivery is fire-and-forget: a failed
/// notification never undoes the booking or cancellation it describes.
#[async_trait]
pub trait AppointmentNotifier: Send + Sync {
    async fn appointment_booked(&self, appointment: &Appointment) -> Result<()>;

    async fn appointment_cancelled(&self, appointment: &Appointment) -> Result<()>;
}

/// Writes events to the log.
pub struct TracingNotifier;

#[async_trait]
impl AppointmentNotifier for TracingNotifier {
    async fn appointment_booked(&self, appointment: &Appointment) -> Result<()> {
        info!(
            appointment_id = %appointment.id,
            patient_id = %appointment.patient_id,
            "Appointment booked for {} at {}",
            appointment.slot_date,
            appointment.slot_time
        );
        Ok(())
    }

    async fn appointment_cancelled(&self, appointment: &Appointment) -> Result<()> {
        info!(
            appointment_id = %appointment.id,
            patient_id = %appointment.patient_id,
            "Appointment cancelled for {} at {}",
            appointment.slot_date,
            appointment.slot_time
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum NotificationKind {
    Booked,
    Cancelled,
}

/// Hand `appointment` to the notifier on a background task.
pub(crate) fn dispatch(
    notifier: &Arc<dyn AppointmentNotifier>,
    kind: NotificationKind,
    appointment: Appointment,
) {
    let notifier = Arc::clone(notifier);

    tokio::spawn(async move {
        let result = match kind {
            NotificationKind::Booked => notifier.appointment_booked(&appointment).await,
            NotificationKind::Cancelled => notifier.appointment_cancelled(&appointment).await,
        };

        if let Err(e) = result {
            warn!("Failed to send {:?} notification for {}: {}", kind, appointment.id, e);
        }
    });
}
