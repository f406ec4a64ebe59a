//! JSON configuration loading and validation.
//!
//! ```json
//! {
//!   "calendars": [
//!     {
//!       "name": "Work",
//!       "offset": "-5m",
//!       "pollingInterval": 15,
//!       "sensors": ["Standup"],
//!       "events": [
//!         { "summary": "Standup", "start": "2026-03-02T09:00:00Z", "end": "2026-03-02T09:15:00Z" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::action::CalendarOccurrence;
use crate::error::{EngineError, Result};
use crate::offset::LeadOffset;
use crate::recurrence::RecurringEvent;
use crate::source::{CompositeSource, RecurringSource, StaticSource};

/// Minutes between calendar refreshes when not configured.
pub const DEFAULT_POLLING_INTERVAL_MINUTES: u64 = 15;

/// Days of recurring instances expanded ahead of now when not configured.
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 7;

/// Largest accepted `lookaheadDays`.
pub const MAX_LOOKAHEAD_DAYS: u32 = 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub calendars: Vec<CalendarConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarConfig {
    /// Also the name of the all-events sensor.
    pub name: String,
    #[serde(default)]
    pub offset: Option<String>,
    /// Minutes.
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,
    /// Named sensor groups, matched by summary prefix.
    #[serde(default)]
    pub sensors: Vec<String>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

/// A configured event: recurring definitions carry an `rrule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventConfig {
    Recurring(RecurringEvent),
    Single(CalendarOccurrence),
}

fn default_polling_interval() -> u64 {
    DEFAULT_POLLING_INTERVAL_MINUTES
}

fn default_lookahead_days() -> u32 {
    DEFAULT_LOOKAHEAD_DAYS
}

impl CalendarConfig {
    pub fn lead_offset(&self) -> Result<LeadOffset> {
        LeadOffset::parse(self.offset.as_deref())
    }

    pub fn polling_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.polling_interval.saturating_mul(60))
    }

    pub fn lookahead(&self) -> Duration {
        Duration::days(i64::from(self.lookahead_days))
    }

    /// The occurrence source for this calendar's configured events.
    pub fn source(&self) -> CompositeSource {
        let mut singles = Vec::new();
        let mut recurring = Vec::new();
        for event in &self.events {
            match event {
                EventConfig::Single(occurrence) => singles.push(occurrence.clone()),
                EventConfig::Recurring(definition) => recurring.push(definition.clone()),
            }
        }
        CompositeSource::new()
            .with(StaticSource::new(singles))
            .with(RecurringSource::new(recurring))
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let label = if self.name.is_empty() {
            "<unnamed>"
        } else {
            self.name.as_str()
        };

        if self.name.is_empty() {
            errors.push("calendar name is invalid".to_string());
        }

        if self.polling_interval == 0 {
            errors.push(format!("calendar '{}': pollingInterval must be > 0", label));
        }

        if self.lookahead_days > MAX_LOOKAHEAD_DAYS {
            errors.push(format!(
                "calendar '{}': lookaheadDays must be <= {}",
                label, MAX_LOOKAHEAD_DAYS
            ));
        }

        if let Err(e) = self.lead_offset() {
            errors.push(format!("calendar '{}': {}", label, e));
        }

        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            if sensor.is_empty() {
                errors.push(format!("calendar '{}': sensor name cannot be empty", label));
            } else if sensor == &self.name {
                errors.push(format!(
                    "calendar '{}': sensor '{}' collides with the calendar sensor",
                    label, sensor
                ));
            } else if !seen.insert(sensor.as_str()) {
                errors.push(format!(
                    "calendar '{}': duplicate sensor '{}'",
                    label, sensor
                ));
            }
        }

        for event in &self.events {
            match event {
                EventConfig::Recurring(definition) => {
                    if let Err(e) = definition.validate() {
                        errors.push(format!(
                            "calendar '{}': event '{}': {}",
                            label, definition.summary, e
                        ));
                    }
                }
                EventConfig::Single(occurrence) => {
                    if occurrence.end < occurrence.start {
                        errors.push(format!(
                            "calendar '{}': event '{}': end is before start",
                            label, occurrence.summary
                        ));
                    }
                }
            }
        }

        errors
    }
}

/// Collect every validation problem in the config.
pub fn validate_config(config: &Config) -> Vec<String> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for calendar in &config.calendars {
        if !calendar.name.is_empty() && !seen.insert(calendar.name.as_str()) {
            errors.push(format!("duplicate calendar name '{}'", calendar.name));
        }
        errors.extend(calendar.validate());
    }

    errors
}

/// Load and validate configuration from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a JSON string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_json::from_str(content)
        .map_err(|e| EngineError::Configuration(format!("invalid JSON: {}", e)))?;

    let errors = validate_config(&config);
    if !errors.is_empty() {
        return Err(EngineError::Configuration(errors.join("; ")));
    }

    Ok(config)
}
