//! Occurrence expansion -- converts calendar occurrences into start/end actions.

use tracing::warn;

use crate::action::{Action, CalendarOccurrence};
use crate::error::Result;
use crate::offset::LeadOffset;

/// Builds activation/deactivation action pairs from occurrences.
///
/// The lead offset is validated once at construction; [`EventExpander::expand`]
/// itself cannot fail and holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct EventExpander {
    offset: LeadOffset,
}

impl EventExpander {
    /// Create an expander from an optional offset string (`"-5m"`, `"2h"`).
    ///
    /// # Errors
    /// Returns `EngineError::Configuration` if the offset cannot be parsed.
    pub fn new(offset: Option<&str>) -> Result<Self> {
        Ok(Self::with_offset(LeadOffset::parse(offset)?))
    }

    pub fn with_offset(offset: LeadOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> LeadOffset {
        self.offset
    }

    /// Expand occurrences into an unsorted action list.
    ///
    /// Every occurrence with `start <= end` yields exactly two actions, in
    /// this order:
    /// - an activation at `start - lead`, expiring at `end`
    /// - a deactivation at `end`, expiring at `end`
    ///
    /// Occurrences ending before they start yield nothing.
    pub fn expand(&self, occurrences: &[CalendarOccurrence]) -> Vec<Action> {
        let mut actions = Vec::with_capacity(occurrences.len() * 2);

        for occurrence in occurrences {
            if occurrence.end < occurrence.start {
                warn!(
                    summary = %occurrence.summary,
                    start = %occurrence.start,
                    end = %occurrence.end,
                    "occurrence ends before it starts; skipped"
                );
                continue;
            }
            let trigger = self.offset.apply(occurrence.start);

            actions.push(Action {
                trigger,
                expires: occurrence.end,
                activate: true,
                summary: occurrence.summary.clone(),
            });
            actions.push(Action {
                trigger: occurrence.end,
                expires: occurrence.end,
                activate: false,
                summary: occurrence.summary.clone(),
            });
        }

        actions
    }
}
