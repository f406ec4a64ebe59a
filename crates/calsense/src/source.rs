//! Occurrence sources -- the calendar collaborator boundary.
//!
//! A source delivers the concrete occurrences relevant to a lookahead window.
//! It may also return occurrences outside the window; the timeline filters
//! those out.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::action::CalendarOccurrence;
use crate::error::{EngineError, Result};
use crate::recurrence::RecurringEvent;

/// The span an occurrence source is asked to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[now, now + lookahead]`, saturating at the latest representable instant.
    pub fn lookahead(now: DateTime<Utc>, lookahead: Duration) -> Self {
        let end = now
            .checked_add_signed(lookahead)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(now, end)
    }
}

/// Delivers concrete occurrences for a window.
pub trait OccurrenceSource {
    /// # Errors
    /// `EngineError::UpstreamUnavailable` when occurrences cannot be delivered.
    fn occurrences(&self, window: &Window) -> Result<Vec<CalendarOccurrence>>;
}

/// A fixed list of single occurrences.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    occurrences: Vec<CalendarOccurrence>,
}

impl StaticSource {
    pub fn new(occurrences: Vec<CalendarOccurrence>) -> Self {
        Self { occurrences }
    }
}

impl OccurrenceSource for StaticSource {
    fn occurrences(&self, _window: &Window) -> Result<Vec<CalendarOccurrence>> {
        Ok(self.occurrences.clone())
    }
}

/// Recurring definitions expanded per window.
///
/// Each definition is expanded from `window.start - 2 × duration`, so an
/// instance that started before the window but is still running is delivered.
#[derive(Debug, Clone, Default)]
pub struct RecurringSource {
    events: Vec<RecurringEvent>,
}

impl RecurringSource {
    pub fn new(events: Vec<RecurringEvent>) -> Self {
        Self { events }
    }
}

impl OccurrenceSource for RecurringSource {
    fn occurrences(&self, window: &Window) -> Result<Vec<CalendarOccurrence>> {
        let mut occurrences = Vec::new();
        for event in &self.events {
            let from = window
                .start
                .checked_sub_signed(event.duration() * 2)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let expanded = event
                .occurrences_between(from, window.end)
                .map_err(|e| {
                    EngineError::UpstreamUnavailable(format!(
                        "cannot expand {:?}: {}",
                        event.summary, e
                    ))
                })?;
            debug!(summary = %event.summary, instances = expanded.len(), "recurring event expanded");
            occurrences.extend(expanded);
        }
        Ok(occurrences)
    }
}

/// Concatenates several sources; the first failure fails the whole delivery.
#[derive(Default)]
pub struct CompositeSource {
    sources: Vec<Box<dyn OccurrenceSource + Send + Sync>>,
}

impl CompositeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl OccurrenceSource + Send + Sync + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl OccurrenceSource for CompositeSource {
    fn occurrences(&self, window: &Window) -> Result<Vec<CalendarOccurrence>> {
        let mut occurrences = Vec::new();
        for source in &self.sources {
            occurrences.extend(source.occurrences(window)?);
        }
        Ok(occurrences)
    }
}
