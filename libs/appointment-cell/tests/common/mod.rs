// libs/appointment-cell/tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;
use uuid::Uuid;

use appointment_cell::models::BookSlotRequest;
use appointment_cell::services::{
    AppointmentBookingService, AppointmentCancellationService, InMemorySchedulingStore,
    SchedulingConsistencyService,
};
use doctor_cell::models::Doctor;
use shared_config::AppConfig;
use shared_models::slot::{DateKey, TimeString};
use shared_utils::test_utils::TestConfig;

// ==============================================================================
// TEST FIXTURES
// ==============================================================================

pub struct TestSetup {
    pub config: AppConfig,
    pub store: Arc<InMemorySchedulingStore>,
    pub consistency: Arc<SchedulingConsistencyService>,
    pub booking: AppointmentBookingService,
    pub cancellation: AppointmentCancellationService,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemorySchedulingStore::new()))
    }

    /// A second coordinator over an existing store, as another process would be.
    pub fn with_store(store: Arc<InMemorySchedulingStore>) -> Self {
        let config = TestConfig::default().to_app_config();
        let consistency = Arc::new(SchedulingConsistencyService::new(store.clone(), &config));
        let booking = AppointmentBookingService::new(Arc::clone(&consistency), &config);
        let cancellation = AppointmentCancellationService::new(Arc::clone(&consistency));

        Self {
            config,
            store,
            consistency,
            booking,
            cancellation,
        }
    }

    pub async fn add_doctor(&self, doctor: Doctor) -> Uuid {
        let id = doctor.id;
        self.store.insert_doctor(doctor).await;
        id
    }

    pub async fn add_patient(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_patient(id).await;
        id
    }
}

pub fn date(value: &str) -> DateKey {
    value.parse().unwrap()
}

pub fn time(value: &str) -> TimeString {
    value.parse().unwrap()
}

pub fn request(patient_id: Uuid, doctor_id: Uuid, slot_date: &str, slot_time: &str) -> BookSlotRequest {
    BookSlotRequest {
        patient_id,
        doctor_id,
        slot_date: date(slot_date),
        slot_time: time(slot_time),
    }
}
