//! Job scheduling
//!
//! Jobs pair a [`JobAction`] with a [`Trigger`]. The [`Scheduler`] polls a
//! [`Clock`] and runs due jobs one at a time through a [`JobExecutor`].

mod clock;
mod engine;
mod job;
mod trigger;


pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{JobRun, JobStatus, Scheduler, SchedulerBuilder, TickSummary};
pub use job::{Job, JobAction, JobConfig, JobExecutor, JobOutcome, JobState};
pub use trigger::{Trigger, TriggerConfig};
