// File: ./src/model/display.rs
use crate::model::item::{EventRecord, TriggerOffset};
use std::fmt;

pub const REMINDER_PREFIX: &str = "ERINNERUNG AN: \n";
pub const DATE_FORMAT: &str = "%d-%m-%Y %H:%M";

/// One notification owed for a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueItem<'a> {
    /// The event itself starts on the reference date.
    Occurrence(&'a EventRecord),
    /// One of the event's triggers fires on the reference date.
    Reminder(&'a EventRecord, TriggerOffset),
}

impl DueItem<'_> {
    pub fn event(&self) -> &EventRecord {
        match self {
            DueItem::Occurrence(ev) | DueItem::Reminder(ev, _) => ev,
        }
    }

    pub fn is_reminder(&self) -> bool {
        matches!(self, DueItem::Reminder(..))
    }
}

impl fmt::Display for DueItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reminder() {
            f.write_str(REMINDER_PREFIX)?;
        }
        write_event(f, self.event())
    }
}

fn write_event(f: &mut fmt::Formatter<'_>, ev: &EventRecord) -> fmt::Result {
    write!(
        f,
        "Termin: {}\nDatum: {}\nLocation: {}\nBeschreibung: {}",
        ev.summary,
        ev.start.format(DATE_FORMAT),
        ev.location,
        ev.description
    )
}
