//! Calendar occurrences and the actions derived from them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One concrete time interval of a calendar event, already expanded from any
/// recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarOccurrence {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarOccurrence {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A single scheduled state transition derived from an occurrence.
///
/// `expires` is always the occurrence's unshifted end time, so an activation
/// satisfies `trigger <= expires` for any occurrence with `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub trigger: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub activate: bool,
    pub summary: String,
}

impl Action {
    /// `trigger <= now <= expires`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.trigger <= now && now <= self.expires
    }

    /// Strictly past expiry; an action expiring exactly at `now` is still live.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires < now
    }

    /// Signed contribution of this action to a group count.
    pub fn weight(&self) -> i64 {
        if self.activate {
            1
        } else {
            -1
        }
    }
}
