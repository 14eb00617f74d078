// libs/appointment-cell/tests/booking_test.rs
mod common;

use assert_matches::assert_matches;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use appointment_cell::models::{Appointment, BookingError, Entity, PaymentState};
use appointment_cell::services::{AppointmentBookingService, AppointmentNotifier};
use doctor_cell::models::Doctor;
use shared_models::slot::SlotKey;

use common::{date, request, time, TestSetup};

// ==============================================================================
// RESERVATION
// ==============================================================================

#[tokio::test]
async fn test_book_free_slot_creates_appointment_and_marks_calendar() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Rao").with_fees(100.0)).await;
    let patient_id = setup.add_patient().await;

    let appointment = setup
        .booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "10:00"))
        .await
        .unwrap();

    assert_eq!(appointment.patient_id, patient_id);
    assert_eq!(appointment.doctor_id, doctor_id);
    assert_eq!(appointment.amount, 100.0);
    assert!(!appointment.cancelled);
    assert!(!appointment.is_completed);
    assert_eq!(appointment.payment, PaymentState::Pending);

    let calendar = setup.store.doctor_calendar(doctor_id).await.unwrap();
    assert_eq!(calendar.booked_times(&date("2024-05-01")), vec![time("10:00")]);

    let stored = setup.booking.get_appointment(appointment.id).await.unwrap();
    assert_eq!(stored, appointment);
}

#[tokio::test]
async fn test_second_booking_of_same_slot_is_rejected() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Rao").with_fees(100.0)).await;
    let first = setup.add_patient().await;
    let second = setup.add_patient().await;

    setup
        .booking
        .book_slot(request(first, doctor_id, "2024-05-01", "10:00"))
        .await
        .unwrap();

    let result = setup
        .booking
        .book_slot(request(second, doctor_id, "2024-05-01", "10:00"))
        .await;

    let expected = SlotKey::new(doctor_id, date("2024-05-01"), time("10:00"));
    assert_matches!(result, Err(BookingError::SlotTaken(key)) if key == expected);
    assert!(setup.booking.patient_appointments(second).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_doctor_is_rejected_without_side_effects() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Mehta").unavailable()).await;
    let patient_id = setup.add_patient().await;

    let result = setup
        .booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "10:00"))
        .await;

    assert_matches!(result, Err(BookingError::Unavailable(id)) if id == doctor_id);
    assert!(setup.store.all_appointments().await.is_empty());
    assert!(setup.store.doctor_calendar(doctor_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_doctor_is_not_found() {
    let setup = TestSetup::new();
    let patient_id = setup.add_patient().await;
    let doctor_id = Uuid::new_v4();

    let result = setup
        .booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "10:00"))
        .await;

    assert_matches!(result, Err(BookingError::NotFound(Entity::Doctor(id))) if id == doctor_id);
}

#[tokio::test]
async fn test_unknown_patient_is_not_found() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Rao")).await;
    let patient_id = Uuid::new_v4();

    let result = setup
        .booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "10:00"))
        .await;

    assert_matches!(result, Err(BookingError::NotFound(Entity::Patient(id))) if id == patient_id);
    assert!(setup.store.doctor_calendar(doctor_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_taken_slot_is_reported_before_unknown_patient() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Rao")).await;
    let patient_id = setup.add_patient().await;

    setup
        .booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "10:00"))
        .await
        .unwrap();

    let result = setup
        .booking
        .book_slot(request(Uuid::new_v4(), doctor_id, "2024-05-01", "10:00"))
        .await;

    assert_matches!(result, Err(BookingError::SlotTaken(_)));
}

#[tokio::test]
async fn test_doctor_without_fee_uses_configured_default() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Iyer")).await;
    let patient_id = setup.add_patient().await;

    let appointment = setup
        .booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "11:30"))
        .await
        .unwrap();

    assert_eq!(appointment.amount, setup.config.default_consultation_fee);
}

#[tokio::test]
async fn test_legacy_date_and_twelve_hour_time_address_the_same_slot() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Rao")).await;
    let first = setup.add_patient().await;
    let second = setup.add_patient().await;

    setup
        .booking
        .book_slot(request(first, doctor_id, "2024-05-01", "14:00"))
        .await
        .unwrap();

    let result = setup
        .booking
        .book_slot(request(second, doctor_id, "1_5_2024", "2:00 PM"))
        .await;

    assert_matches!(result, Err(BookingError::SlotTaken(_)));
}

#[tokio::test]
async fn test_distinct_times_on_one_date_are_independent() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Rao")).await;
    let patient_id = setup.add_patient().await;

    for slot_time in ["09:00", "10:30", "10:00"] {
        setup
            .booking
            .book_slot(request(patient_id, doctor_id, "2024-05-01", slot_time))
            .await
            .unwrap();
    }

    let booked = setup
        .booking
        .booked_times(doctor_id, date("2024-05-01"))
        .await
        .unwrap();
    assert_eq!(booked, vec![time("09:00"), time("10:00"), time("10:30")]);

    assert!(setup
        .booking
        .is_booked(doctor_id, date("2024-05-01"), time("10:30"))
        .await
        .unwrap());
    assert!(!setup
        .booking
        .is_booked(doctor_id, date("2024-05-02"), time("10:30"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_patient_appointments_are_newest_first() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Rao")).await;
    let patient_id = setup.add_patient().await;

    let older = setup
        .booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "09:00"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let newer = setup
        .booking
        .book_slot(request(patient_id, doctor_id, "2024-05-03", "09:00"))
        .await
        .unwrap();

    let ids: Vec<Uuid> = setup
        .booking
        .patient_appointments(patient_id)
        .await
        .unwrap()
        .into_iter()
        .map(|appointment| appointment.id)
        .collect();

    assert_eq!(ids, vec![newer.id, older.id]);
}

#[tokio::test]
async fn test_get_unknown_appointment_is_not_found() {
    let setup = TestSetup::new();
    let appointment_id = Uuid::new_v4();

    let result = setup.booking.get_appointment(appointment_id).await;

    assert_matches!(result, Err(BookingError::NotFound(Entity::Appointment(id))) if id == appointment_id);
}

// ==============================================================================
// NOTIFICATIONS
// ==============================================================================

struct ChannelNotifier {
    booked: mpsc::UnboundedSender<Appointment>,
}

#[async_trait]
impl AppointmentNotifier for ChannelNotifier {
    async fn appointment_booked(&self, appointment: &Appointment) -> anyhow::Result<()> {
        self.booked.send(appointment.clone())?;
        Ok(())
    }

    async fn appointment_cancelled(&self, _appointment: &Appointment) -> anyhow::Result<()> {
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl AppointmentNotifier for FailingNotifier {
    async fn appointment_booked(&self, _appointment: &Appointment) -> anyhow::Result<()> {
        anyhow::bail!("mail relay down")
    }

    async fn appointment_cancelled(&self, _appointment: &Appointment) -> anyhow::Result<()> {
        anyhow::bail!("mail relay down")
    }
}

#[tokio::test]
async fn test_successful_booking_notifies() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Rao")).await;
    let patient_id = setup.add_patient().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let booking = AppointmentBookingService::new(Arc::clone(&setup.consistency), &setup.config)
        .with_notifier(Arc::new(ChannelNotifier { booked: tx }));

    let appointment = booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "10:00"))
        .await
        .unwrap();

    let notified = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notified.id, appointment.id);

    // Rejected bookings send nothing.
    let _ = booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "10:00"))
        .await;
    assert!(tokio::time::timeout(Duration::from_millis(50), rx.recv()).await.is_err());
}

#[tokio::test]
async fn test_failing_notifier_does_not_undo_booking() {
    let setup = TestSetup::new();
    let doctor_id = setup.add_doctor(Doctor::new("Dr. Rao")).await;
    let patient_id = setup.add_patient().await;

    let booking = AppointmentBookingService::new(Arc::clone(&setup.consistency), &setup.config)
        .with_notifier(Arc::new(FailingNotifier));

    let appointment = booking
        .book_slot(request(patient_id, doctor_id, "2024-05-01", "10:00"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(setup.booking.get_appointment(appointment.id).await.unwrap().is_active());
    assert!(setup
        .booking
        .is_booked(doctor_id, date("2024-05-01"), time("10:00"))
        .await
        .unwrap());
}
