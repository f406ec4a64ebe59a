//! Single-timer scheduler over the live action timeline.
//!
//! States:
//!
//! | from          | event                 | to              |
//! |---------------|-----------------------|-----------------|
//! | Idle / Armed  | `set_timeline`        | Armed or Idle   |
//! | Armed         | `fire` (deadline hit) | Firing          |
//! | Firing        | apply + trim done     | Armed or Idle   |
//! | any           | `stop`                | Idle            |
//!
//! The scheduler owns exactly one [`WakeTimer`] and cancels it before every
//! re-arm, so there is never more than one outstanding wake-up. All actions
//! sharing a trigger time are due on the same wake-up.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::action::Action;
use crate::timeline::{normalize, Timeline};

/// Longest single sleep the runtime takes before re-checking its deadline.
pub const MAX_TIMER_SLEEP: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// An owned "next wake-up" primitive.
pub trait WakeTimer {
    /// Arm the timer for `at`, replacing any previous deadline.
    fn arm(&mut self, at: DateTime<Utc>);

    /// Cancel the pending wake-up, if any.
    fn cancel(&mut self);

    /// The pending wake-up, if armed.
    fn deadline(&self) -> Option<DateTime<Utc>>;
}

/// Production timer: holds the single deadline the async driver sleeps towards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeadlineTimer {
    deadline: Option<DateTime<Utc>>,
}

impl DeadlineTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long to sleep from `now`, capped at [`MAX_TIMER_SLEEP`].
    /// `None` when the timer is not armed.
    pub fn sleep_duration(&self, now: DateTime<Utc>) -> Option<StdDuration> {
        let deadline = self.deadline?;
        let remaining = (deadline - now).to_std().unwrap_or(StdDuration::ZERO);
        Some(remaining.min(MAX_TIMER_SLEEP))
    }
}

impl WakeTimer for DeadlineTimer {
    fn arm(&mut self, at: DateTime<Utc>) {
        self.deadline = Some(at);
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No timeline, no future actions, or stopped.
    Idle,
    /// One wake-up pending for the earliest future trigger.
    Armed { at: DateTime<Utc> },
    /// Inside a wake-up; applying the due batch.
    Firing,
}

/// Owns the live timeline and its single wake-up timer.
#[derive(Debug)]
pub struct ActionScheduler<T: WakeTimer = DeadlineTimer> {
    timer: T,
    timeline: Timeline,
    state: SchedulerState,
}

impl Default for ActionScheduler<DeadlineTimer> {
    fn default() -> Self {
        Self::new(DeadlineTimer::new())
    }
}

impl<T: WakeTimer> ActionScheduler<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            timeline: Timeline::default(),
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Replace the timeline wholesale and re-arm for the earliest trigger
    /// strictly after `now`. The previous timer is cancelled first.
    pub fn set_timeline(&mut self, actions: Vec<Action>, now: DateTime<Utc>) -> SchedulerState {
        self.timer.cancel();
        self.timeline = normalize(actions, now);
        debug!(live_actions = self.timeline.len(), "timeline replaced");
        self.rearm(now)
    }

    /// Handle a timer fire at `now`.
    ///
    /// Gathers every action with `trigger <= now`, hands the whole batch and the
    /// live timeline to `apply` in a single call, trims expired actions, then
    /// re-arms. Returns the batch size, or `None` if the scheduler was not
    /// armed or its deadline has not been reached.
    pub fn fire<F>(&mut self, now: DateTime<Utc>, apply: F) -> Option<usize>
    where
        F: FnOnce(&[Action], &Timeline),
    {
        let SchedulerState::Armed { at } = self.state else {
            trace!("wake-up ignored; scheduler is not armed");
            return None;
        };
        if now < at {
            trace!(deadline = %at, "wake-up ignored; deadline not reached");
            return None;
        }

        self.state = SchedulerState::Firing;
        self.timer.cancel();

        let due = self.timeline.due(now);
        let batch = due.len();
        debug!(batch, at = %at, "applying due actions");
        apply(due, &self.timeline);

        let expired = self.timeline.expire(now);
        trace!(expired, "expired actions trimmed");

        self.rearm(now);
        Some(batch)
    }

    /// Cancel any pending wake-up and go idle until the next `set_timeline`.
    pub fn stop(&mut self) {
        self.timer.cancel();
        self.state = SchedulerState::Idle;
        debug!("scheduler stopped");
    }

    fn rearm(&mut self, now: DateTime<Utc>) -> SchedulerState {
        self.timer.cancel();
        self.state = match self.timeline.next_trigger_after(now) {
            Some(at) => {
                self.timer.arm(at);
                debug!(next = %at, in_ms = (at - now).num_milliseconds(), "scheduling next action");
                SchedulerState::Armed { at }
            }
            None => {
                debug!("no next action found; scheduler idle");
                SchedulerState::Idle
            }
        };
        self.state
    }
}
