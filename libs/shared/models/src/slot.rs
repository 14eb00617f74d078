use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotParseError {
    #[error("Invalid slot date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid slot time '{0}', expected HH:MM")]
    InvalidTime(String),
}

// ==============================================================================
// DATE KEY
// ==============================================================================

/// Calendar date of a slot, rendered as `YYYY-MM-DD`.
///
/// Also accepts the `D_M_YYYY` form older clients send, so both spellings of
/// the same day land on the same calendar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, SlotParseError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| SlotParseError::InvalidDate(format!("{}-{}-{}", year, month, day)))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl FromStr for DateKey {
    type Err = SlotParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        let invalid = || SlotParseError::InvalidDate(raw.to_string());

        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Ok(Self(date));
        }

        let parts: Vec<&str> = value.split('_').collect();
        if let [day, month, year] = parts.as_slice() {
            let day = day.parse::<u32>().map_err(|_| invalid())?;
            let month = month.parse::<u32>().map_err(|_| invalid())?;
            let year = year.parse::<i32>().map_err(|_| invalid())?;
            return NaiveDate::from_ymd_opt(year, month, day)
                .map(Self)
                .ok_or_else(invalid);
        }

        Err(invalid())
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

// ==============================================================================
// TIME STRING
// ==============================================================================

/// Time of day of a slot at minute precision, rendered as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeString(NaiveTime);

impl TimeString {
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, SlotParseError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| SlotParseError::InvalidTime(format!("{}:{:02}", hour, minute)))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

fn parse_clock(value: &str) -> Option<(u32, u32)> {
    let (hour, minute) = value.split_once(':')?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if hour.len() > 2 || minute.len() != 2 || !all_digits(hour) || !all_digits(minute) {
        return None;
    }

    Some((hour.parse().ok()?, minute.parse().ok()?))
}

impl FromStr for TimeString {
    type Err = SlotParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || SlotParseError::InvalidTime(raw.to_string());
        let value = raw.trim().to_ascii_uppercase();

        let (clock, meridiem) = if let Some(rest) = value.strip_suffix("AM") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = value.strip_suffix("PM") {
            (rest.trim_end(), Some(true))
        } else {
            (value.as_str(), None)
        };

        let (hour, minute) = parse_clock(clock).ok_or_else(invalid)?;

        let hour = match meridiem {
            None => hour,
            Some(_) if hour == 0 || hour > 12 => return Err(invalid()),
            Some(false) => hour % 12,
            Some(true) => hour % 12 + 12,
        };

        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for TimeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(DateKey);
string_serde!(TimeString);

// ==============================================================================
// SLOT KEY
// ==============================================================================

/// A (doctor, date, time) tuple. Reservations and cancellations touching the
/// same key are serialized against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: Uuid,
    pub date: DateKey,
    pub time: TimeString,
}

impl SlotKey {
    pub fn new(doctor_id: Uuid, date: DateKey, time: TimeString) -> Self {
        Self { doctor_id, date, time }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot:{}:{}:{}", self.doctor_id, self.date, self.time)
    }
}
