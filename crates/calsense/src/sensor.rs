//! Reference-counted sensor groups.
//!
//! Each evaluation recomputes every group count from scratch over the live
//! timeline, so a missed wake-up or a restart in the middle of an event never
//! leaves a count drifting. Pushing to the sensor surface is a separate step
//! that only reports groups whose state changed, unless forced.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::action::Action;
use crate::timeline::Timeline;

/// Group name → on/off.
pub type GroupStates = BTreeMap<String, bool>;

/// The output surface for group states.
pub trait SensorSink {
    /// Reset the sensor for `group` to off.
    fn reset(&mut self, group: &str);

    /// Push the current state for `group`.
    fn push(&mut self, group: &str, on: bool);
}

impl<S: SensorSink + ?Sized> SensorSink for &mut S {
    fn reset(&mut self, group: &str) {
        (**self).reset(group);
    }

    fn push(&mut self, group: &str, on: bool) {
        (**self).push(group, on);
    }
}

/// Which occurrence summaries count towards a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMatcher {
    /// Every occurrence.
    All,
    /// Summaries starting with this prefix (case-sensitive; `"Test"` matches
    /// `"Testing"`).
    Prefix(String),
}

impl GroupMatcher {
    pub fn matches(&self, summary: &str) -> bool {
        match self {
            GroupMatcher::All => true,
            GroupMatcher::Prefix(prefix) => summary.starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorGroup {
    name: String,
    matcher: GroupMatcher,
    ref_count: u32,
    last_pushed: bool,
}

impl SensorGroup {
    pub fn new(name: impl Into<String>, matcher: GroupMatcher) -> Self {
        Self {
            name: name.into(),
            matcher,
            ref_count: 0,
            last_pushed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matcher(&self) -> &GroupMatcher {
        &self.matcher
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn state(&self) -> bool {
        self.ref_count > 0
    }

    pub fn last_pushed(&self) -> bool {
        self.last_pushed
    }
}

/// Count open occurrences per matcher at `now`.
///
/// Every action open at `now` contributes its weight (+1 activation, -1
/// deactivation) to each matcher it satisfies. An occurrence that is running
/// has only its activation open; at its exact end instant both actions are
/// open and cancel out. Negative sums are clamped to zero.
pub fn open_counts<'a, I>(matchers: &[&GroupMatcher], actions: I, now: DateTime<Utc>) -> Vec<u32>
where
    I: IntoIterator<Item = &'a Action>,
{
    let sums = actions
        .into_iter()
        .filter(|a| a.is_open_at(now))
        .fold(vec![0i64; matchers.len()], |mut sums, action| {
            for (sum, matcher) in sums.iter_mut().zip(matchers) {
                if matcher.matches(&action.summary) {
                    *sum += action.weight();
                }
            }
            sums
        });

    sums.into_iter()
        .map(|sum| u32::try_from(sum.max(0)).unwrap_or(u32::MAX))
        .collect()
}

/// Holds the implicit all-events group plus any named prefix groups.
#[derive(Debug, Clone)]
pub struct SensorAggregator {
    groups: Vec<SensorGroup>,
}

impl SensorAggregator {
    /// The all-events group is named `all_name` and always listed first.
    pub fn new<S: AsRef<str>>(all_name: &str, named: &[S]) -> Self {
        let mut groups = Vec::with_capacity(named.len() + 1);
        groups.push(SensorGroup::new(all_name, GroupMatcher::All));
        for name in named {
            let name = name.as_ref();
            groups.push(SensorGroup::new(name, GroupMatcher::Prefix(name.to_string())));
        }
        Self { groups }
    }

    pub fn groups(&self) -> &[SensorGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&SensorGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Current derived states.
    pub fn states(&self) -> GroupStates {
        self.groups
            .iter()
            .map(|g| (g.name.clone(), g.state()))
            .collect()
    }

    /// Recompute every group count from the live timeline at `now`.
    pub fn evaluate(&mut self, timeline: &Timeline, now: DateTime<Utc>) -> GroupStates {
        let matchers: Vec<&GroupMatcher> = self.groups.iter().map(|g| &g.matcher).collect();
        let counts = open_counts(&matchers, timeline, now);

        for (group, count) in self.groups.iter_mut().zip(counts) {
            group.ref_count = count;
        }

        debug!(
            groups = self.groups.len(),
            open = self.groups.first().map(|g| g.ref_count).unwrap_or(0),
            "sensor groups evaluated"
        );
        self.states()
    }

    /// Push states that changed since the last push, or all when `force`.
    /// Returns how many groups were pushed.
    pub fn push<S: SensorSink + ?Sized>(&mut self, sink: &mut S, force: bool) -> usize {
        let mut pushed = 0;
        for group in &mut self.groups {
            let state = group.state();
            if force || state != group.last_pushed {
                sink.push(&group.name, state);
                group.last_pushed = state;
                pushed += 1;
            }
        }
        pushed
    }

    /// Evaluate then push in one step.
    pub fn apply<S: SensorSink + ?Sized>(
        &mut self,
        timeline: &Timeline,
        now: DateTime<Utc>,
        sink: &mut S,
        force: bool,
    ) -> usize {
        self.evaluate(timeline, now);
        self.push(sink, force)
    }

    /// Reset every group (and its sensor) to off.
    pub fn reset_all<S: SensorSink + ?Sized>(&mut self, sink: &mut S) {
        for group in &mut self.groups {
            group.ref_count = 0;
            group.last_pushed = false;
            sink.reset(&group.name);
        }
    }
}

/// Reports sensor changes through `tracing`.
#[derive(Debug, Clone)]
pub struct LogSink {
    calendar: String,
}

impl LogSink {
    pub fn new(calendar: impl Into<String>) -> Self {
        Self {
            calendar: calendar.into(),
        }
    }
}

impl SensorSink for LogSink {
    fn reset(&mut self, group: &str) {
        info!(calendar = %self.calendar, sensor = %group, "sensor reset to off");
    }

    fn push(&mut self, group: &str, on: bool) {
        info!(
            calendar = %self.calendar,
            sensor = %group,
            state = if on { "on" } else { "off" },
            "setting calendar sensor state"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Reset(String),
    Push(String, bool),
}

/// Records every call, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the push calls, as `(group, state)`.
    pub fn pushes(&self) -> Vec<(String, bool)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Push(group, on) => Some((group.clone(), *on)),
                SinkCall::Reset(_) => None,
            })
            .collect()
    }

    /// The most recently pushed state per group.
    pub fn latest(&self) -> GroupStates {
        self.pushes().into_iter().collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl SensorSink for RecordingSink {
    fn reset(&mut self, group: &str) {
        self.calls.push(SinkCall::Reset(group.to_string()));
    }

    fn push(&mut self, group: &str, on: bool) {
        self.calls.push(SinkCall::Push(group.to_string(), on));
    }
}
