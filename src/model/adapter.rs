// File: ./src/model/adapter.rs
// Turns a raw iCalendar document into `EventRecord`s.
//
// The document is walked structurally: every VEVENT at any nesting depth becomes
// a record, and the TRIGGER of each of its sub-components (VALARM) becomes a
// day offset. Relative triggers are reduced to a whole-day magnitude that is
// always subtracted from the start date; absolute triggers keep their sign.
use crate::error::ParseError;
use crate::model::item::{EventRecord, MISSING_FIELD, TriggerOffset};
use chrono::{NaiveDate, NaiveDateTime};
use icalendar::parser::{Component, read_calendar, unfold};

const SECS_PER_DAY: i64 = 24 * 60 * 60;
/// Triggers further than this from the start are dropped.
const MAX_TRIGGER_DAYS: u64 = 100 * 366;
const CALENDAR_HEADER: &str = "BEGIN:VCALENDAR";

/// Parses a calendar document.
///
/// Events without a readable DTSTART are skipped, not reported as errors.
pub fn parse(document: &[u8]) -> Result<Vec<EventRecord>, ParseError> {
    let text = std::str::from_utf8(document).map_err(|_| ParseError::Encoding)?;
    let text = text.trim_start_matches('\u{feff}').trim_start();

    let looks_like_calendar = text
        .get(..CALENDAR_HEADER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(CALENDAR_HEADER));
    if !looks_like_calendar {
        return Err(ParseError::NotACalendar);
    }

    let unfolded = unfold(text);
    let calendar = read_calendar(&unfolded).map_err(|e| ParseError::Grammar(e.to_string()))?;

    let mut events = Vec::new();
    for component in &calendar.components {
        collect_events(component, &mut events);
    }
    log::debug!("Parsed {} events from calendar", events.len());
    Ok(events)
}

fn collect_events(component: &Component<'_>, out: &mut Vec<EventRecord>) {
    if component.name.as_str().eq_ignore_ascii_case("VEVENT")
        && let Some(event) = event_from_component(component)
    {
        out.push(event);
    }
    for child in &component.components {
        collect_events(child, out);
    }
}

fn property<'c>(component: &'c Component<'_>, key: &str) -> Option<&'c str> {
    component
        .properties
        .iter()
        .find(|p| p.name.as_str().eq_ignore_ascii_case(key))
        .map(|p| p.val.as_str())
}

fn event_from_component(component: &Component<'_>) -> Option<EventRecord> {
    let Some(raw_start) = property(component, "DTSTART") else {
        log::debug!("Skipping VEVENT without DTSTART");
        return None;
    };
    let Some(start) = parse_date_time(raw_start) else {
        log::warn!("Skipping VEVENT with unreadable DTSTART {:?}", raw_start);
        return None;
    };

    let text = |key: &str| -> String {
        property(component, key)
            .map(unescape_text)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| MISSING_FIELD.to_string())
    };

    let mut triggers = Vec::new();
    for sub in &component.components {
        let Some(raw) = property(sub, "TRIGGER") else {
            continue;
        };
        match trigger_offset(raw, start) {
            Some(offset) if offset.days().unsigned_abs() > MAX_TRIGGER_DAYS => log::warn!(
                "Ignoring TRIGGER {:?} on {:?}: more than {} days from the start",
                raw,
                property(component, "SUMMARY").unwrap_or_default(),
                MAX_TRIGGER_DAYS
            ),
            Some(offset) => triggers.push(offset),
            None => log::warn!(
                "Ignoring unreadable TRIGGER {:?} on {:?}",
                raw,
                property(component, "SUMMARY").unwrap_or_default()
            ),
        }
    }

    Some(EventRecord {
        summary: text("SUMMARY"),
        start,
        location: text("LOCATION"),
        description: text("DESCRIPTION"),
        triggers,
    })
}

/// Accepts `YYYYMMDD`, `YYYYMMDDTHHMMSS` and `YYYYMMDDTHHMMSSZ`.
/// The wall-clock value is kept as written.
fn parse_date_time(val: &str) -> Option<NaiveDateTime> {
    let val = val.trim();
    if val.len() == 8 {
        NaiveDate::parse_from_str(val, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    } else {
        NaiveDateTime::parse_from_str(val.trim_end_matches(['Z', 'z']), "%Y%m%dT%H%M%S").ok()
    }
}

fn trigger_offset(raw: &str, start: NaiveDateTime) -> Option<TriggerOffset> {
    let raw = raw.trim();
    let unsigned = raw.trim_start_matches(['+', '-']);
    if unsigned.starts_with(['P', 'p']) {
        let secs = parse_duration_secs(unsigned)?;
        return Some(TriggerOffset(secs / SECS_PER_DAY));
    }
    // VALUE=DATE-TIME
    let fire = parse_date_time(raw)?;
    Some(TriggerOffset((start.date() - fire.date()).num_days()))
}

/// Total length of an RFC 5545 duration (`P1W`, `P2DT3H`, `PT15M`), sign excluded.
fn parse_duration_secs(val: &str) -> Option<i64> {
    let body = val.get(1..)?;
    let mut total: i64 = 0;
    let mut digits = String::new();
    let mut in_time = false;
    let mut saw_unit = false;

    for c in body.chars() {
        match c.to_ascii_uppercase() {
            'T' if digits.is_empty() && !in_time => in_time = true,
            d if d.is_ascii_digit() => digits.push(d),
            unit => {
                let n: i64 = digits.parse().ok()?;
                digits.clear();
                let scale = match (unit, in_time) {
                    ('W', false) => 7 * SECS_PER_DAY,
                    ('D', false) => SECS_PER_DAY,
                    ('H', true) => 60 * 60,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                total = total.checked_add(n.checked_mul(scale)?)?;
                saw_unit = true;
            }
        }
    }

    if !digits.is_empty() || !saw_unit {
        return None;
    }
    Some(total)
}

fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parses_event_fields_and_alarms() {
        let ics = "BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//test//EN
BEGIN:VEVENT
UID:ev-1
SUMMARY:Elternabend
DTSTART:20240605T193000
LOCATION:Aula
DESCRIPTION:Bitte pünktlich
BEGIN:VALARM
ACTION:DISPLAY
TRIGGER:-P3D
END:VALARM
BEGIN:VALARM
ACTION:DISPLAY
TRIGGER:-P1D
END:VALARM
END:VEVENT
END:VCALENDAR
";
        let events = parse(ics.as_bytes()).expect("Parse failed");
        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.summary, "Elternabend");
        assert_eq!(ev.start, dt(2024, 6, 5, 19, 30));
        assert_eq!(ev.location, "Aula");
        assert_eq!(ev.description, "Bitte pünktlich");
        assert_eq!(ev.triggers, vec![TriggerOffset(3), TriggerOffset(1)]);
    }

    #[test]
    fn test_missing_optional_fields_use_placeholder() {
        let ics = "BEGIN:VCALENDAR
BEGIN:VEVENT
DTSTART;VALUE=DATE:20240601
END:VEVENT
END:VCALENDAR
";
        let events = parse(ics.as_bytes()).expect("Parse failed");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, MISSING_FIELD);
        assert_eq!(events[0].location, MISSING_FIELD);
        assert_eq!(events[0].description, MISSING_FIELD);
        assert_eq!(events[0].start, dt(2024, 6, 1, 0, 0));
    }

    #[test]
    fn test_event_without_start_is_skipped() {
        let ics = "BEGIN:VCALENDAR
BEGIN:VEVENT
SUMMARY:No start
END:VEVENT
BEGIN:VEVENT
SUMMARY:Bad start
DTSTART:tomorrow
END:VEVENT
BEGIN:VEVENT
SUMMARY:Kept
DTSTART:20240601T100000Z
END:VEVENT
END:VCALENDAR
";
        let events = parse(ics.as_bytes()).expect("Parse failed");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Kept");
        assert_eq!(events[0].start, dt(2024, 6, 1, 10, 0));
    }

    #[test]
    fn test_folded_and_escaped_text() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:Sommerfest\\, Grillen\r\nDESCRIPTION:Zeile eins\\nZeile \r\n zwei\r\nDTSTART:20240701T150000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let events = parse(ics.as_bytes()).expect("Parse failed");
        assert_eq!(events[0].summary, "Sommerfest, Grillen");
        assert_eq!(events[0].description, "Zeile eins\nZeile zwei");
    }

    #[test]
    fn test_rejects_non_calendar_input() {
        assert!(matches!(
            parse(b"this is not a calendar"),
            Err(ParseError::NotACalendar)
        ));
        assert!(matches!(parse(b""), Err(ParseError::NotACalendar)));
        assert!(matches!(
            parse(&[0x42, 0xff, 0xfe, 0x00]),
            Err(ParseError::Encoding)
        ));
    }

    #[test]
    fn test_relative_triggers_are_day_magnitudes() {
        let start = dt(2024, 6, 5, 12, 0);
        assert_eq!(trigger_offset("-P3D", start), Some(TriggerOffset(3)));
        assert_eq!(trigger_offset("P3D", start), Some(TriggerOffset(3)));
        assert_eq!(trigger_offset("+P1W", start), Some(TriggerOffset(7)));
        assert_eq!(trigger_offset("-PT36H", start), Some(TriggerOffset(1)));
        assert_eq!(trigger_offset("-P1DT12H", start), Some(TriggerOffset(1)));
        assert_eq!(trigger_offset("-PT15M", start), Some(TriggerOffset(0)));
        assert_eq!(trigger_offset("PT0S", start), Some(TriggerOffset(0)));
    }

    #[test]
    fn test_absolute_trigger_is_signed_day_difference() {
        let start = dt(2024, 6, 5, 12, 0);
        assert_eq!(
            trigger_offset("20240602T090000Z", start),
            Some(TriggerOffset(3))
        );
        assert_eq!(
            trigger_offset("20240606T090000", start),
            Some(TriggerOffset(-1))
        );
    }

    #[test]
    fn test_malformed_triggers_are_rejected() {
        let start = dt(2024, 6, 5, 12, 0);
        assert_eq!(trigger_offset("-P", start), None);
        assert_eq!(trigger_offset("-P3", start), None);
        assert_eq!(trigger_offset("-P3H", start), None);
        assert_eq!(trigger_offset("-PT3D", start), None);
        assert_eq!(trigger_offset("soon", start), None);
    }

    #[test]
    fn test_far_away_triggers_are_dropped() {
        let ics = "BEGIN:VCALENDAR
BEGIN:VEVENT
SUMMARY:Weit weg
DTSTART:20240605T100000
BEGIN:VALARM
TRIGGER:-P100000000D
END:VALARM
BEGIN:VALARM
TRIGGER;VALUE=DATE-TIME:19000101T000000Z
END:VALARM
BEGIN:VALARM
TRIGGER:-P36600D
END:VALARM
END:VEVENT
END:VCALENDAR
";
        let events = parse(ics.as_bytes()).expect("Parse failed");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].triggers, vec![TriggerOffset(36600)]);
    }

    #[test]
    fn test_calendar_edge_dates_are_kept() {
        let ics = "BEGIN:VCALENDAR
BEGIN:VEVENT
SUMMARY:Letzter Tag
DTSTART:99991231T235959
BEGIN:VALARM
TRIGGER:P30000D
END:VALARM
END:VEVENT
BEGIN:VEVENT
SUMMARY:Erster Tag
DTSTART;VALUE=DATE:00010101
BEGIN:VALARM
TRIGGER:-P1D
END:VALARM
END:VEVENT
END:VCALENDAR
";
        let events = parse(ics.as_bytes()).expect("Parse failed");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, dt(9999, 12, 31, 23, 59) + chrono::Duration::seconds(59));
        assert_eq!(events[1].triggers, vec![TriggerOffset(1)]);
    }

    #[test]
    fn test_bad_trigger_does_not_drop_event() {
        let ics = "BEGIN:VCALENDAR
BEGIN:VEVENT
SUMMARY:Robust
DTSTART:20240605T100000
BEGIN:VALARM
TRIGGER:whenever
END:VALARM
BEGIN:VALARM
TRIGGER:-P2D
END:VALARM
END:VEVENT
END:VCALENDAR
";
        let events = parse(ics.as_bytes()).expect("Parse failed");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].triggers, vec![TriggerOffset(2)]);
    }
}
