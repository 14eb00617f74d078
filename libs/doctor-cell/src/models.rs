use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::calendar::SlotCalendar;

fn default_available() -> bool {
    true
}

fn default_speciality() -> String {
    "General Physician".to_string()
}

// Rows created outside the booking path may carry `slots_booked: null`.
fn calendar_or_empty<'de, D>(deserializer: D) -> Result<SlotCalendar, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<SlotCalendar>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_speciality")]
    pub speciality: String,
    #[serde(default = "default_available")]
    pub available: bool,
    /// Consultation fee. Unset means the configured default applies.
    #[serde(default)]
    pub fees: Option<f64>,
    #[serde(default, rename = "slots_booked", deserialize_with = "calendar_or_empty")]
    pub calendar: SlotCalendar,
}

impl Doctor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            speciality: default_speciality(),
            available: default_available(),
            fees: None,
            calendar: SlotCalendar::new(),
        }
    }

    pub fn with_fees(mut self, fees: f64) -> Self {
        self.fees = Some(fees);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn fee_or(&self, default_fee: f64) -> f64 {
        self.fees.unwrap_or(default_fee)
    }
}
