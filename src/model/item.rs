// File: ./src/model/item.rs
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Placeholder used when an event leaves a descriptive field empty.
pub const MISSING_FIELD: &str = "-";

/// Number of days before an event's start at which a reminder fires.
///
/// Only meaningful together with the `EventRecord` it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerOffset(pub i64);

impl TriggerOffset {
    pub fn days(self) -> i64 {
        self.0
    }

    /// The date this reminder fires for an event starting at `start`.
    /// `None` when that date is outside the representable calendar; such a
    /// reminder never fires.
    pub fn fire_date(self, start: NaiveDateTime) -> Option<NaiveDate> {
        start
            .date()
            .checked_sub_signed(TimeDelta::try_days(self.0)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub summary: String,
    pub start: NaiveDateTime,
    pub location: String,
    pub description: String,
    pub triggers: Vec<TriggerOffset>,
}

impl EventRecord {
    pub fn new(summary: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            summary: summary.into(),
            start,
            location: MISSING_FIELD.to_string(),
            description: MISSING_FIELD.to_string(),
            triggers: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_trigger(mut self, days: i64) -> Self {
        self.triggers.push(TriggerOffset(days));
        self
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn occurs_on(&self, day: NaiveDate) -> bool {
        self.start_date() == day
    }

    /// Triggers of this event that fire on `day`, in parsed order.
    pub fn triggers_on(&self, day: NaiveDate) -> impl Iterator<Item = TriggerOffset> + '_ {
        self.triggers
            .iter()
            .copied()
            .filter(move |t| t.fire_date(self.start) == Some(day))
    }
}
