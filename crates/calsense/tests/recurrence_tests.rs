//! Tests for recurring definitions and occurrence sources.

use calsense::recurrence::MAX_INSTANCES;
use calsense::source::{CompositeSource, RecurringSource, StaticSource};
use calsense::{CalendarOccurrence, EngineError, OccurrenceSource, RecurringEvent, Window};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

fn daily(rrule: &str) -> RecurringEvent {
    RecurringEvent {
        summary: "Test".to_string(),
        rrule: rrule.to_string(),
        dtstart: "2018-01-30T10:00:00".to_string(),
        duration_minutes: 15,
        timezone: "UTC".to_string(),
        exdates: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// RecurringEvent expansion
// ---------------------------------------------------------------------------

#[test]
fn daily_event_expands_one_occurrence_per_day() {
    let event = daily("FREQ=DAILY;COUNT=7");
    let occurrences = event
        .occurrences_between(utc(2018, 1, 30, 0, 0), utc(2018, 2, 6, 0, 0))
        .expect("should expand successfully");

    assert_eq!(occurrences.len(), 7);
    let first = utc(2018, 1, 30, 10, 0);
    for (i, occurrence) in occurrences.iter().enumerate() {
        let start = first + Duration::days(i as i64);
        assert_eq!(occurrence.start, start, "day {} start", i);
        assert_eq!(occurrence.end, start + Duration::minutes(15), "day {} end", i);
        assert_eq!(occurrence.summary, "Test");
    }
}

#[test]
fn unbounded_rule_is_clipped_to_window() {
    let event = daily("FREQ=DAILY");
    let occurrences = event
        .occurrences_between(utc(2018, 2, 1, 0, 0), utc(2018, 2, 3, 23, 59))
        .unwrap();

    let starts: Vec<DateTime<Utc>> = occurrences.iter().map(|o| o.start).collect();
    assert_eq!(
        starts,
        vec![
            utc(2018, 2, 1, 10, 0),
            utc(2018, 2, 2, 10, 0),
            utc(2018, 2, 3, 10, 0),
        ]
    );
}

#[test]
fn local_times_follow_the_event_timezone() {
    let mut event = daily("FREQ=DAILY;COUNT=1");
    event.timezone = "Europe/Berlin".to_string();
    let occurrences = event
        .occurrences_between(utc(2018, 1, 29, 0, 0), utc(2018, 2, 6, 0, 0))
        .unwrap();

    assert_eq!(occurrences.len(), 1);
    // 10:00 CET (UTC+1) is 09:00 UTC.
    assert_eq!(occurrences[0].start, utc(2018, 1, 30, 9, 0));
}

#[test]
fn exdates_are_excluded() {
    let mut event = daily("FREQ=DAILY;COUNT=5");
    event.exdates = vec!["2018-02-01T10:00:00".to_string()];
    let occurrences = event
        .occurrences_between(utc(2018, 1, 30, 0, 0), utc(2018, 2, 10, 0, 0))
        .unwrap();

    assert_eq!(occurrences.len(), 4);
    assert!(occurrences.iter().all(|o| o.start != utc(2018, 2, 1, 10, 0)));
}

#[test]
fn expansion_stops_at_instance_limit() {
    let event = daily("FREQ=MINUTELY");
    let occurrences = event
        .occurrences_between(utc(2018, 1, 30, 0, 0), utc(2018, 2, 6, 0, 0))
        .unwrap();

    assert_eq!(occurrences.len(), usize::from(MAX_INSTANCES));
    assert_eq!(occurrences[0].start, utc(2018, 1, 30, 10, 0));
}

#[test]
fn reversed_window_is_empty() {
    let event = daily("FREQ=DAILY");
    let occurrences = event
        .occurrences_between(utc(2018, 2, 6, 0, 0), utc(2018, 1, 30, 0, 0))
        .unwrap();
    assert!(occurrences.is_empty());
}

#[test]
fn empty_rule_is_rejected() {
    let err = daily("").validate().unwrap_err();
    assert!(matches!(err, EngineError::InvalidRule(_)));
}

#[test]
fn garbage_rule_is_rejected() {
    let err = daily("FREQ=SOMETIMES").validate().unwrap_err();
    assert!(matches!(err, EngineError::InvalidRule(_)));
}

#[test]
fn unknown_timezone_is_rejected() {
    let mut event = daily("FREQ=DAILY");
    event.timezone = "Not/AZone".to_string();
    let err = event.validate().unwrap_err();
    assert!(matches!(err, EngineError::InvalidTimezone(ref tz) if tz == "Not/AZone"));
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[test]
fn recurring_source_looks_back_twice_the_duration() {
    // One week-long instance that started three days before the window.
    let long = RecurringEvent {
        summary: "Long".to_string(),
        rrule: "FREQ=WEEKLY;INTERVAL=2;COUNT=1".to_string(),
        dtstart: "2018-03-19T07:00:00".to_string(),
        duration_minutes: (7 * 24 - 1) * 60,
        timezone: "UTC".to_string(),
        exdates: Vec::new(),
    };
    let source = RecurringSource::new(vec![long]);
    let window = Window::lookahead(utc(2018, 3, 22, 12, 0), Duration::days(7));

    let occurrences = source.occurrences(&window).unwrap();
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].start, utc(2018, 3, 19, 7, 0));
    assert_eq!(occurrences[0].end, utc(2018, 3, 26, 6, 0));
}

#[test]
fn window_end_saturates_instead_of_overflowing() {
    let now = utc(2018, 1, 30, 0, 0);
    let window = Window::lookahead(now, Duration::MAX);
    assert_eq!(window.start, now);
    assert_eq!(window.end, DateTime::<Utc>::MAX_UTC);
}

#[test]
fn recurring_source_reports_upstream_unavailable() {
    let source = RecurringSource::new(vec![daily("FREQ=SOMETIMES")]);
    let window = Window::lookahead(utc(2018, 1, 30, 0, 0), Duration::days(7));
    let err = source.occurrences(&window).unwrap_err();
    assert!(matches!(err, EngineError::UpstreamUnavailable(_)));
}

#[test]
fn static_source_delivers_everything() {
    let occurrences = vec![
        CalendarOccurrence::new(utc(2017, 1, 1, 0, 0), utc(2017, 1, 1, 1, 0), "Old"),
        CalendarOccurrence::new(utc(2030, 1, 1, 0, 0), utc(2030, 1, 1, 1, 0), "Far"),
    ];
    let source = StaticSource::new(occurrences.clone());
    let window = Window::lookahead(utc(2018, 1, 30, 0, 0), Duration::days(7));
    assert_eq!(source.occurrences(&window).unwrap(), occurrences);
}

#[test]
fn composite_source_concatenates_in_order() {
    let single = CalendarOccurrence::new(utc(2018, 1, 30, 8, 0), utc(2018, 1, 30, 9, 0), "Single");
    let source = CompositeSource::new()
        .with(StaticSource::new(vec![single.clone()]))
        .with(RecurringSource::new(vec![daily("FREQ=DAILY;COUNT=2")]));
    assert_eq!(source.len(), 2);

    let window = Window::lookahead(utc(2018, 1, 30, 0, 0), Duration::days(7));
    let occurrences = source.occurrences(&window).unwrap();
    assert_eq!(occurrences.len(), 3);
    assert_eq!(occurrences[0], single);
    assert!(occurrences[1..].iter().all(|o| o.summary == "Test"));
}

#[test]
fn composite_source_fails_as_a_whole() {
    let source = CompositeSource::new()
        .with(StaticSource::default())
        .with(RecurringSource::new(vec![daily("")]));
    let window = Window::lookahead(utc(2018, 1, 30, 0, 0), Duration::days(7));
    assert!(source.occurrences(&window).is_err());
}
