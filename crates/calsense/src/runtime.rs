//! Tokio driver for a single calendar.
//!
//! One task per calendar: refreshes on the polling interval (first one
//! immediately), sleeps towards the scheduler's single deadline, and stops
//! on the shutdown signal. Refreshes and wake-ups are handled in the same
//! loop, so they never interleave.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};

use crate::calendar::Calendar;
use crate::clock::Clock;
use crate::scheduler::{DeadlineTimer, MAX_TIMER_SLEEP};
use crate::sensor::SensorSink;
use crate::source::OccurrenceSource;

/// Shared, thread-safe occurrence source.
pub type SharedSource = Arc<dyn OccurrenceSource + Send + Sync>;

/// Everything a calendar task needs.
pub struct CalendarTask<S, C> {
    pub calendar: Calendar<DeadlineTimer>,
    pub source: SharedSource,
    pub polling_interval: StdDuration,
    pub sink: S,
    pub clock: C,
}

/// Run until `shutdown` becomes `true` (or its sender is dropped).
///
/// Returns the calendar and sink so callers can inspect final state.
pub async fn run<S, C>(
    task: CalendarTask<S, C>,
    mut shutdown: watch::Receiver<bool>,
) -> (Calendar<DeadlineTimer>, S)
where
    S: SensorSink + Send,
    C: Clock,
{
    let CalendarTask {
        mut calendar,
        source,
        polling_interval,
        mut sink,
        clock,
    } = task;

    calendar.init(&mut sink);

    let mut polling = interval(polling_interval);
    polling.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        calendar = %calendar.name(),
        polling_secs = polling_interval.as_secs(),
        "calendar task started"
    );

    loop {
        let pending = calendar.timer().sleep_duration(clock.now());
        let nap = pending.unwrap_or(MAX_TIMER_SLEEP);

        tokio::select! {
            _ = polling.tick() => {
                let now = clock.now();
                debug!(calendar = %calendar.name(), "updating calendar information");
                let delivered = source.occurrences(&calendar.window(now));
                calendar.refresh(delivered, clock.now(), &mut sink);
            }

            _ = sleep(nap), if pending.is_some() => {
                let now = clock.now();
                match calendar.next_wake() {
                    Some(deadline) if deadline <= now => {
                        calendar.wake(now, &mut sink);
                    }
                    _ => debug!(calendar = %calendar.name(), "woke before deadline; re-arming sleep"),
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    calendar.stop();
    info!(calendar = %calendar.name(), "calendar task stopped");
    (calendar, sink)
}
