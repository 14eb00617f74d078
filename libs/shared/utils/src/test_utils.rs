use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub max_retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub default_consultation_fee: f64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            max_retry_attempts: 3,
            // Keep conflict retries fast in tests.
            retry_backoff_ms: 1,
            default_consultation_fee: 100.0,
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            booking_max_retry_attempts: self.max_retry_attempts,
            booking_retry_backoff_ms: self.retry_backoff_ms,
            storage_timeout_seconds: 5,
            default_consultation_fee: self.default_consultation_fee,
        }
    }
}

/// Row shapes returned by PostgREST for the scheduling tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_row(doctor_id: Uuid, available: bool, fees: Option<f64>, slots_booked: Value) -> Value {
        json!({
            "id": doctor_id,
            "name": "Dr. Test",
            "speciality": "General Physician",
            "available": available,
            "fees": fees,
            "slots_booked": slots_booked
        })
    }

    pub fn patient_row(patient_id: Uuid) -> Value {
        json!({ "id": patient_id })
    }

    pub fn appointment_row(
        appointment_id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        slot_date: &str,
        slot_time: &str,
        cancelled: bool,
    ) -> Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "slot_date": slot_date,
            "slot_time": slot_time,
            "amount": 100.0,
            "cancelled": cancelled,
            "is_completed": false,
            "payment": "pending",
            "created_at": Utc::now().to_rfc3339(),
            "cancelled_at": if cancelled { Some(Utc::now().to_rfc3339()) } else { None }
        })
    }

    /// Body PostgREST sends when a function raises `PT409`.
    pub fn conflict_error(message: &str) -> Value {
        json!({
            "code": "PT409",
            "details": null,
            "hint": null,
            "message": message
        })
    }
}
