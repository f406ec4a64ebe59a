//! Orchestrator for one calendar.
//!
//! Wires refreshes into expander → timeline → scheduler, and scheduler
//! wake-ups into the sensor aggregator. Refreshes and wake-ups must be
//! delivered from a single execution context; nothing here locks.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::action::CalendarOccurrence;
use crate::config::CalendarConfig;
use crate::error::Result;
use crate::expander::EventExpander;
use crate::offset::LeadOffset;
use crate::scheduler::{ActionScheduler, DeadlineTimer, SchedulerState, WakeTimer};
use crate::sensor::{GroupStates, SensorAggregator, SensorSink};
use crate::source::Window;
use crate::timeline::Timeline;

/// Result of delivering a refresh to a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The live timeline was replaced; `actions` is its new length.
    Replaced { actions: usize },
    /// Delivery failed; the previous timeline and sensor state were kept.
    Retained { error: String },
}

pub struct Calendar<T: WakeTimer = DeadlineTimer> {
    name: String,
    expander: EventExpander,
    scheduler: ActionScheduler<T>,
    aggregator: SensorAggregator,
    lookahead: Duration,
    reachable: bool,
    loaded: bool,
}

impl Calendar<DeadlineTimer> {
    /// Build a calendar from validated configuration.
    ///
    /// # Errors
    /// `EngineError::Configuration` if the offset cannot be parsed.
    pub fn from_config(config: &CalendarConfig) -> Result<Self> {
        let calendar = Self::new(
            &config.name,
            config.lead_offset()?,
            &config.sensors,
            DeadlineTimer::new(),
        );
        Ok(calendar.with_lookahead(config.lookahead()))
    }
}

impl<T: WakeTimer> Calendar<T> {
    pub fn new<S: AsRef<str>>(name: &str, offset: LeadOffset, sensors: &[S], timer: T) -> Self {
        Self {
            name: name.to_string(),
            expander: EventExpander::with_offset(offset),
            scheduler: ActionScheduler::new(timer),
            aggregator: SensorAggregator::new(name, sensors),
            lookahead: Duration::days(i64::from(crate::config::DEFAULT_LOOKAHEAD_DAYS)),
            reachable: false,
            loaded: false,
        }
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The window to request occurrences for at `now`.
    pub fn window(&self, now: DateTime<Utc>) -> Window {
        Window::lookahead(now, self.lookahead)
    }

    pub fn timeline(&self) -> &Timeline {
        self.scheduler.timeline()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn next_wake(&self) -> Option<DateTime<Utc>> {
        self.scheduler.timer().deadline()
    }

    pub fn timer(&self) -> &T {
        self.scheduler.timer()
    }

    pub fn states(&self) -> GroupStates {
        self.aggregator.states()
    }

    pub fn aggregator(&self) -> &SensorAggregator {
        &self.aggregator
    }

    /// Whether the last refresh delivered occurrences.
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Reset every sensor to off. Call once before the first refresh.
    pub fn init<S: SensorSink + ?Sized>(&mut self, sink: &mut S) {
        self.aggregator.reset_all(sink);
    }

    /// Deliver a refresh.
    ///
    /// On success the timeline is replaced wholesale (last write wins), the
    /// scheduler re-armed, and sensors re-evaluated; the first successful load
    /// pushes every group. On failure nothing changes except reachability.
    pub fn refresh<S: SensorSink + ?Sized>(
        &mut self,
        delivered: Result<Vec<CalendarOccurrence>>,
        now: DateTime<Utc>,
        sink: &mut S,
    ) -> RefreshOutcome {
        let occurrences = match delivered {
            Ok(occurrences) => occurrences,
            Err(e) => {
                self.reachable = false;
                warn!(
                    calendar = %self.name,
                    error = %e,
                    live_actions = self.scheduler.timeline().len(),
                    "failed to load calendar; keeping previous timeline"
                );
                return RefreshOutcome::Retained {
                    error: e.to_string(),
                };
            }
        };

        self.reachable = true;
        let actions = self.expander.expand(&occurrences);
        self.scheduler.set_timeline(actions, now);

        let force = !self.loaded;
        self.loaded = true;
        let pushed = self
            .aggregator
            .apply(self.scheduler.timeline(), now, sink, force);

        let live = self.scheduler.timeline().len();
        info!(
            calendar = %self.name,
            occurrences = occurrences.len(),
            live_actions = live,
            pushed,
            "calendar updated"
        );
        RefreshOutcome::Replaced { actions: live }
    }

    /// Forward a timer fire. Returns the size of the applied batch, or `None`
    /// if the scheduler was idle or not yet due.
    pub fn wake<S: SensorSink + ?Sized>(&mut self, now: DateTime<Utc>, sink: &mut S) -> Option<usize> {
        let aggregator = &mut self.aggregator;
        self.scheduler.fire(now, |_due, live| {
            aggregator.apply(live, now, sink, false);
        })
    }

    /// Cancel the pending wake-up; nothing fires until the next refresh.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        info!(calendar = %self.name, "calendar stopped");
    }
}
