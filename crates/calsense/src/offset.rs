//! Lead-time offsets for activation actions.
//!
//! An offset is written as an optional sign followed by one or more
//! `<integer><unit>` segments, e.g. `"-5m"`, `"2h"`, `"1h30m"`, `"-0s"`.
//! Supported units: `ms`, `s`, `m`, `h`, `d`, `w`.
//!
//! The sign is normalized away: `"2h"` and `"-2h"` both mean "two hours before
//! the occurrence starts". The offset only ever moves an activation earlier.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::error::{EngineError, Result};

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: i64 = 7 * MILLIS_PER_DAY;

/// Longest accepted lead time.
pub const MAX_LEAD_DAYS: i64 = 366;

/// How far before an occurrence's start its activation fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadOffset {
    lead: Duration,
}

impl Default for LeadOffset {
    fn default() -> Self {
        Self::zero()
    }
}

impl LeadOffset {
    /// No shift; activations fire at the literal start time.
    pub fn zero() -> Self {
        Self {
            lead: Duration::zero(),
        }
    }

    /// Parse an optional offset string. `None` is equivalent to zero.
    ///
    /// # Errors
    /// Returns `EngineError::Configuration` if the string is not a relative
    /// duration in the grammar described in the module docs.
    pub fn parse(offset: Option<&str>) -> Result<Self> {
        match offset {
            None => Ok(Self::zero()),
            Some(raw) => raw.parse(),
        }
    }

    /// Build an offset from a duration; the sign is ignored.
    pub fn from_duration(duration: Duration) -> Self {
        let lead = if duration < Duration::zero() {
            -duration
        } else {
            duration
        };
        Self { lead }
    }

    /// The (non-negative) lead time.
    pub fn lead(&self) -> Duration {
        self.lead
    }

    /// Shift a start time backwards by the lead, saturating at the earliest
    /// representable instant.
    pub fn apply(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start
            .checked_sub_signed(self.lead)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl FromStr for LeadOffset {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self> {
        let millis = parse_millis(raw).ok_or_else(|| {
            EngineError::Configuration(format!("invalid relative time format: {:?}", raw))
        })?;
        if millis > MAX_LEAD_DAYS * MILLIS_PER_DAY {
            return Err(EngineError::Configuration(format!(
                "offset out of range (max {} days): {:?}",
                MAX_LEAD_DAYS, raw
            )));
        }
        Ok(Self {
            lead: Duration::milliseconds(millis),
        })
    }
}

impl fmt::Display for LeadOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}ms", self.lead.num_milliseconds())
    }
}

/// Sum the segments of an offset string into non-negative milliseconds.
fn parse_millis(raw: &str) -> Option<i64> {
    let body = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    if body.is_empty() {
        return None;
    }

    let mut total: i64 = 0;
    let mut rest = body;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: i64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let per_unit = unit_millis(&rest[..unit_len])?;
        rest = &rest[unit_len..];

        total = total.checked_add(value.checked_mul(per_unit)?)?;
    }

    Some(total)
}

fn unit_millis(unit: &str) -> Option<i64> {
    match unit {
        "ms" => Some(1),
        "s" => Some(MILLIS_PER_SECOND),
        "m" => Some(MILLIS_PER_MINUTE),
        "h" => Some(MILLIS_PER_HOUR),
        "d" => Some(MILLIS_PER_DAY),
        "w" => Some(MILLIS_PER_WEEK),
        _ => None,
    }
}
