//! Recurring calendar definitions -- RRULE → concrete occurrences in a window.
//!
//! Wraps the `rrule` crate (v0.13) and `chrono-tz`; recurrence semantics and DST
//! handling are entirely theirs. This module only builds the iCalendar text,
//! bounds the expansion, and attaches each occurrence's end time and summary.

use chrono::{DateTime, Duration, Utc};
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::action::CalendarOccurrence;
use crate::error::{EngineError, Result};

/// Upper bound on instances produced per definition per expansion.
pub const MAX_INSTANCES: u16 = 500;

/// A recurring event as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringEvent {
    pub summary: String,
    /// RFC 5545 RRULE body, e.g. `"FREQ=WEEKLY;BYDAY=TU,TH"`.
    pub rrule: String,
    /// Local start of the first instance, e.g. `"2026-02-17T14:00:00"`.
    #[serde(rename = "start")]
    pub dtstart: String,
    pub duration_minutes: u32,
    /// IANA timezone the local times are expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Local start times to exclude (same format as `dtstart`).
    #[serde(default)]
    pub exdates: Vec<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl RecurringEvent {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Check that the rule and timezone parse, without expanding.
    ///
    /// # Errors
    /// `EngineError::InvalidRule` or `EngineError::InvalidTimezone`.
    pub fn validate(&self) -> Result<()> {
        self.rule_set().map(|_| ())
    }

    /// Expand instances whose start lies in `[from, to]`.
    ///
    /// # Errors
    /// `EngineError::InvalidRule` or `EngineError::InvalidTimezone`.
    pub fn occurrences_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarOccurrence>> {
        if from > to {
            return Ok(Vec::new());
        }

        let rule_set = self
            .rule_set()?
            .after(from.with_timezone(&rrule::Tz::UTC))
            .before(to.with_timezone(&rrule::Tz::UTC));

        let expanded = rule_set.all(MAX_INSTANCES);
        if expanded.limited {
            warn!(
                summary = %self.summary,
                limit = MAX_INSTANCES,
                "recurring event exceeds the instance limit; later instances dropped"
            );
        }

        let duration = self.duration();
        let occurrences = expanded
            .dates
            .into_iter()
            .map(|dt| dt.with_timezone(&Utc))
            // The rrule crate's after/before bounds are not relied on for inclusivity.
            .filter(|start| *start >= from && *start <= to)
            .map(|start| CalendarOccurrence::new(start, start + duration, self.summary.clone()))
            .collect();

        Ok(occurrences)
    }

    fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(self.timezone.clone()))
    }

    fn rule_set(&self) -> Result<RRuleSet> {
        if self.rrule.is_empty() {
            return Err(EngineError::InvalidRule("empty RRULE string".to_string()));
        }
        self.tz()?;

        // "2026-02-17T14:00:00" → iCalendar "20260217T140000".
        let dtstart_ical = self.dtstart.replace(['-', ':'], "");
        let mut text = format!(
            "DTSTART;TZID={}:{}\nRRULE:{}",
            self.timezone, dtstart_ical, self.rrule
        );

        if !self.exdates.is_empty() {
            let exdates: Vec<String> = self
                .exdates
                .iter()
                .map(|d| d.replace(['-', ':'], ""))
                .collect();
            text.push_str(&format!(
                "\nEXDATE;TZID={}:{}",
                self.timezone,
                exdates.join(",")
            ));
        }

        text.parse::<RRuleSet>()
            .map_err(|e| EngineError::InvalidRule(format!("{}", e)))
    }
}
