//! # calsense
//!
//! Turns calendar occurrences into a timeline of start/end actions and drives
//! on/off sensors from it. Each sensor group reflects whether any matching
//! occurrence is currently open, so overlapping events never flicker.
//!
//! ## Modules
//!
//! - [`offset`]: lead-time offset grammar (`"-5m"`, `"2h"`, `"1h30m"`)
//! - [`action`]: `CalendarOccurrence` input and derived `Action` records
//! - [`expander`]: occurrences → unsorted start/end actions
//! - [`timeline`]: stable sort + expiry filtering into a live timeline
//! - [`scheduler`]: single-timer state machine over the live timeline
//! - [`sensor`]: recompute-from-scratch group aggregation and sensor sinks
//! - [`recurrence`]: RRULE expansion for recurring calendar definitions
//! - [`source`]: occurrence collaborators (static, recurring, composite)
//! - [`calendar`]: orchestrator wiring refreshes and wake-ups together
//! - [`config`]: JSON configuration loading and validation
//! - [`clock`]: system and fake clocks
//! - [`runtime`]: tokio driver for a single calendar
//! - [`error`]: Error types

pub mod action;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod expander;
pub mod offset;
pub mod recurrence;
pub mod runtime;
pub mod scheduler;
pub mod sensor;
pub mod source;
pub mod timeline;

pub use action::{Action, CalendarOccurrence};
pub use calendar::{Calendar, RefreshOutcome};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{load_config, parse_config, CalendarConfig, Config};
pub use error::EngineError;
pub use expander::EventExpander;
pub use offset::LeadOffset;
pub use recurrence::RecurringEvent;
pub use scheduler::{ActionScheduler, DeadlineTimer, SchedulerState, WakeTimer};
pub use sensor::{GroupStates, LogSink, RecordingSink, SensorAggregator, SensorSink, SinkCall};
pub use source::{OccurrenceSource, Window};
pub use timeline::{normalize, Timeline};
