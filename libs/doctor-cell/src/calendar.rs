// libs/doctor-cell/src/calendar.rs
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use shared_models::slot::{DateKey, TimeString};

/// Booked times of one doctor, keyed by date. A time that is absent is free.
///
/// Serializes as `{"2024-05-01": ["10:00", "10:30"]}`, the shape kept on the
/// doctor record. Set semantics make a duplicate entry for the same slot
/// unrepresentable; deciding *whether* a slot may be taken is the job of the
/// reservation path, not of this type.
///
/// Stored rows may spell one date several ways (`1_5_2024` next to
/// `2024-05-01`). Decoding unions every spelling into the one normalized key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlotCalendar {
    booked: BTreeMap<DateKey, BTreeSet<TimeString>>,
}

impl SlotCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_booked(&self, date: &DateKey, time: &TimeString) -> bool {
        self.booked
            .get(date)
            .map(|times| times.contains(time))
            .unwrap_or(false)
    }

    /// Insert `time` under `date`, creating the date entry when absent.
    /// Returns `false` when the slot was already present.
    ///
    /// Only storage backends applying a committed reservation should call this.
    pub fn mark_booked(&mut self, date: DateKey, time: TimeString) -> bool {
        let inserted = self.booked.entry(date).or_default().insert(time);
        if !inserted {
            debug!("Slot {} {} already present in calendar", date, time);
        }
        inserted
    }

    /// Remove `time` from `date`. A date left without times is dropped, so an
    /// emptied date reads the same as one never booked.
    /// Returns `false` when there was nothing to release.
    ///
    /// Only storage backends applying a committed cancellation should call this.
    pub fn release(&mut self, date: &DateKey, time: &TimeString) -> bool {
        let Some(times) = self.booked.get_mut(date) else {
            return false;
        };

        let removed = times.remove(time);
        if times.is_empty() {
            self.booked.remove(date);
        }
        removed
    }

    /// Booked times for `date` in ascending order.
    pub fn booked_times(&self, date: &DateKey) -> Vec<TimeString> {
        self.booked
            .get(date)
            .map(|times| times.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn dates(&self) -> impl Iterator<Item = &DateKey> {
        self.booked.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateKey, TimeString)> + '_ {
        self.booked
            .iter()
            .flat_map(|(date, times)| times.iter().map(move |time| (*date, *time)))
    }

    /// Number of booked slots across all dates.
    pub fn len(&self) -> usize {
        self.booked.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.booked.is_empty()
    }
}

/// Seeds a calendar from booked slots, e.g. when loading fixtures.
impl FromIterator<(DateKey, TimeString)> for SlotCalendar {
    fn from_iter<I: IntoIterator<Item = (DateKey, TimeString)>>(slots: I) -> Self {
        let mut booked: BTreeMap<DateKey, BTreeSet<TimeString>> = BTreeMap::new();
        for (date, time) in slots {
            booked.entry(date).or_default().insert(time);
        }
        Self { booked }
    }
}

struct CalendarVisitor;

impl<'de> Visitor<'de> for CalendarVisitor {
    type Value = SlotCalendar;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of dates to lists of booked times")
    }

    fn visit_map<A>(self, mut entries: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut booked: BTreeMap<DateKey, BTreeSet<TimeString>> = BTreeMap::new();

        while let Some((date, times)) = entries.next_entry::<DateKey, Vec<TimeString>>()? {
            // Empty lists are left behind by older writers; they hold nothing.
            if times.is_empty() {
                continue;
            }
            booked.entry(date).or_default().extend(times);
        }

        Ok(SlotCalendar { booked })
    }
}

impl<'de> Deserialize<'de> for SlotCalendar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CalendarVisitor)
    }
}
