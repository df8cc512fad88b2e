// File: ./src/model/matcher.rs
// Decides which events and reminders are due on a given day.
//
// Output order is deterministic: events in parsed order, and for each event the
// direct occurrence first, then its matching triggers in parsed order. A trigger
// with offset 0 fires alongside the occurrence; both are reported.
use crate::model::display::DueItem;
use crate::model::item::EventRecord;
use chrono::NaiveDate;

pub fn due_items(events: &[EventRecord], today: NaiveDate) -> Vec<DueItem<'_>> {
    let mut due = Vec::new();
    for event in events {
        if event.occurs_on(today) {
            due.push(DueItem::Occurrence(event));
        }
        due.extend(
            event
                .triggers_on(today)
                .map(|offset| DueItem::Reminder(event, offset)),
        );
    }
    due
}

/// The notification batch for `today`.
pub fn due_today(events: &[EventRecord], today: NaiveDate) -> Vec<String> {
    due_items(events, today)
        .iter()
        .map(ToString::to_string)
        .collect()
}
