// libs/appointment-cell/src/services/supabase_store.rs
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::Doctor;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::StoreError;

use crate::models::Appointment;
use crate::services::store::{AtomicUnit, SchedulingStore};

const DOCTOR_COLUMNS: &str = "id,name,speciality,available,fees,slots_booked";

/// Store backed by Supabase/PostgREST.
///
/// Reads go through the REST tables. Commits call the `reserve_slot` and
/// `release_slot` functions (see `sql/slot_reservation.sql`), which lock the
/// doctor row, check the precondition and write both records in one
/// transaction. They raise `PT409` when the precondition fails, which
/// PostgREST answers with HTTP 409.
pub struct SupabaseSchedulingStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl SchedulingStore for SupabaseSchedulingStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError> {
        let query = format!("id=eq.{}&select={}", doctor_id, DOCTOR_COLUMNS);
        let doctors: Vec<Doctor> = self.supabase.select("doctors", &query).await?;
        Ok(doctors.into_iter().next())
    }

    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, StoreError> {
        let query = format!("id=eq.{}&select=id", patient_id);
        let rows: Vec<Value> = self.supabase.select("patients", &query).await?;
        Ok(!rows.is_empty())
    }

    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let query = format!("id=eq.{}&select=*", appointment_id);
        let appointments: Vec<Appointment> = self.supabase.select("appointments", &query).await?;
        Ok(appointments.into_iter().next())
    }

    async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let query = format!("patient_id=eq.{}&select=*&order=created_at.desc", patient_id);
        self.supabase.select("appointments", &query).await
    }

    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let query = format!("doctor_id=eq.{}&select=*", doctor_id);
        self.supabase.select("appointments", &query).await
    }

    async fn commit(&self, unit: AtomicUnit) -> Result<(), StoreError> {
        debug!("Committing {} for {}", unit.kind(), unit.slot());

        let _: Value = match unit {
            AtomicUnit::Reserve { appointment } => {
                let args = json!({ "p_appointment": serde_json::to_value(&appointment)? });
                self.supabase.rpc("reserve_slot", args).await?
            }
            AtomicUnit::Release { appointment_id, slot, cancelled_at } => {
                let args = json!({
                    "p_appointment_id": appointment_id,
                    "p_doctor_id": slot.doctor_id,
                    "p_slot_date": slot.date.to_string(),
                    "p_slot_time": slot.time.to_string(),
                    "p_cancelled_at": cancelled_at.to_rfc3339(),
                });
                self.supabase.rpc("release_slot", args).await?
            }
        };

        Ok(())
    }
}
