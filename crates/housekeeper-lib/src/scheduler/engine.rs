//! Scheduler engine
//!
//! Holds the job table and runs due jobs sequentially in registration order.
//! After every run the job's next due instant is recomputed from the clock,
//! whether the run succeeded or failed; a failure never disables a job.

use super::clock::{Clock, SystemClock};
use super::job::{Job, JobExecutor, JobState};
use crate::error::{HousekeeperError, Result};
use crate::health::{components, HealthRegistry};
use crate::observability::{HousekeeperMetrics, StructuredLogger};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Runtime bookkeeping for one registered job
#[derive(Debug, Clone)]
struct ScheduledJob {
    job: Job,
    next_due: DateTime<Utc>,
    state: JobState,
    last_run: Option<DateTime<Utc>>,
    run_count: u64,
    failure_count: u64,
    last_error: Option<String>,
}

impl ScheduledJob {
    fn new(job: Job, now: DateTime<Utc>) -> Self {
        let next_due = job.trigger.next_after(now);
        Self {
            job,
            next_due,
            state: JobState::Idle,
            last_run: None,
            run_count: 0,
            failure_count: 0,
            last_error: None,
        }
    }

    fn state_at(&self, now: DateTime<Utc>) -> JobState {
        match self.state {
            JobState::Running => JobState::Running,
            _ if now >= self.next_due => JobState::Due,
            state => state,
        }
    }

    fn status_at(&self, now: DateTime<Utc>) -> JobStatus {
        JobStatus {
            name: self.job.name.clone(),
            action: self.job.action.label().to_string(),
            trigger: self.job.trigger.describe(),
            state: self.state_at(now),
            next_due: self.next_due,
            last_run: self.last_run,
            run_count: self.run_count,
            failure_count: self.failure_count,
            last_error: self.last_error.clone(),
        }
    }
}

/// Point-in-time view of a job, for listings and APIs
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub name: String,
    pub action: String,
    pub trigger: String,
    pub state: JobState,
    pub next_due: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub failure_count: u64,
    pub last_error: Option<String>,
}

/// Record of a single job execution
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
    pub job: String,
    pub success: bool,
    pub summary: String,
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

/// Jobs executed during one scheduler pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickSummary {
    pub runs: Vec<JobRun>,
}

impl TickSummary {
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.runs.iter().filter(|r| !r.success).count()
    }
}

/// Sequential job scheduler
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    executor: Arc<dyn JobExecutor>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    health: Option<HealthRegistry>,
    metrics: Option<HousekeeperMetrics>,
    logger: StructuredLogger,
}

impl Scheduler {
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Status of every job, in registration order
    pub fn jobs(&self) -> Vec<JobStatus> {
        let now = self.clock.now();
        self.jobs.iter().map(|j| j.status_at(now)).collect()
    }

    pub fn job_state(&self, name: &str) -> Option<JobState> {
        let now = self.clock.now();
        self.find(name).map(|j| j.state_at(now))
    }

    pub fn next_due(&self, name: &str) -> Option<DateTime<Utc>> {
        self.find(name).map(|j| j.next_due)
    }

    fn find(&self, name: &str) -> Option<&ScheduledJob> {
        self.jobs.iter().find(|j| j.job.name == name)
    }

    /// Run every job whose due instant has passed
    ///
    /// Due-ness is decided once per pass, against the time at its start.
    pub fn run_pending(&mut self) -> TickSummary {
        let now = self.clock.now();
        let due: Vec<usize> = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| now >= j.next_due)
            .map(|(i, _)| i)
            .collect();

        let runs = due.into_iter().map(|i| self.run_job(i)).collect();
        TickSummary { runs }
    }

    /// Run every job once, regardless of its trigger
    pub fn run_all(&mut self) -> TickSummary {
        let runs = (0..self.jobs.len()).map(|i| self.run_job(i)).collect();
        TickSummary { runs }
    }

    fn run_job(&mut self, index: usize) -> JobRun {
        let executor = Arc::clone(&self.executor);
        let scheduled = &mut self.jobs[index];
        let name = scheduled.job.name.clone();

        scheduled.state = JobState::Running;
        self.logger
            .log_job_started(&name, scheduled.job.action.label());

        let started = Instant::now();
        let result = executor.execute(&name, &scheduled.job.action);
        let elapsed = started.elapsed();

        let finished_at = self.clock.now();
        scheduled.last_run = Some(finished_at);
        scheduled.run_count += 1;
        scheduled.next_due = scheduled.job.trigger.next_after(finished_at);

        let run = match result {
            Ok(outcome) => {
                scheduled.state = JobState::Idle;
                scheduled.last_error = None;
                self.logger.log_job_completed(
                    &name,
                    &outcome.summary,
                    outcome.warnings.len(),
                    elapsed.as_millis(),
                );
                if let Some(health) = &self.health {
                    health.set_healthy(&components::job(&name));
                }
                JobRun {
                    job: name,
                    success: true,
                    summary: outcome.summary,
                    warnings: outcome.warnings,
                    elapsed_ms: elapsed.as_millis() as u64,
                }
            }
            Err(e) => {
                scheduled.state = JobState::Failed;
                scheduled.failure_count += 1;
                scheduled.last_error = Some(e.to_string());
                self.logger.log_job_failed(&name, &e, elapsed.as_millis());
                if let Some(health) = &self.health {
                    health.set_degraded(&components::job(&name), e.to_string());
                }
                JobRun {
                    job: name,
                    success: false,
                    summary: e.to_string(),
                    warnings: Vec::new(),
                    elapsed_ms: elapsed.as_millis() as u64,
                }
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.observe_job(&run.job, run.success, elapsed.as_secs_f64());
        }
        debug!(job = %run.job, next_due = %scheduled.next_due, "Job rescheduled");

        run
    }

    /// Poll for due jobs until a shutdown signal arrives
    ///
    /// Each pass runs on the blocking pool so slow jobs do not stall other
    /// tasks on the runtime. A job that is running when the signal arrives
    /// completes first.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            jobs = self.jobs.len(),
            poll_interval_secs = self.poll_interval.as_secs(),
            "Starting scheduler loop"
        );
        let health = self.health.clone();
        if let Some(health) = &health {
            health.set_healthy(components::SCHEDULER);
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut scheduler = self;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pass = tokio::task::spawn_blocking(move || {
                        let summary = scheduler.run_pending();
                        (scheduler, summary)
                    })
                    .await;

                    match pass {
                        Ok((returned, summary)) => {
                            scheduler = returned;
                            scheduler.record_pass(&summary);
                        }
                        Err(e) => {
                            error!(error = %e, "Scheduler pass aborted, stopping loop");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down scheduler loop");
                    break;
                }
            }
        }

        if let Some(health) = &health {
            health.set_unhealthy(components::SCHEDULER, "scheduler stopped");
        }
    }

    /// Reflect the outcome of a loop pass in the scheduler health component
    fn record_pass(&self, summary: &TickSummary) {
        if !summary.is_empty() {
            debug!(
                ran = summary.runs.len(),
                failed = summary.failed(),
                "Scheduler pass complete"
            );
        }

        let Some(health) = &self.health else {
            return;
        };
        if summary.failed() > 0 {
            health.set_degraded(
                components::SCHEDULER,
                format!(
                    "{} of {} jobs failed in the last pass",
                    summary.failed(),
                    summary.runs.len()
                ),
            );
        } else {
            health.set_healthy(components::SCHEDULER);
        }
    }
}

/// Builder for [`Scheduler`]
pub struct SchedulerBuilder {
    jobs: Vec<Job>,
    executor: Option<Arc<dyn JobExecutor>>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    health: Option<HealthRegistry>,
    metrics: Option<HousekeeperMetrics>,
    logger: Option<StructuredLogger>,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            executor: None,
            clock: Arc::new(SystemClock),
            poll_interval: Duration::from_secs(60),
            health: None,
            metrics: None,
            logger: None,
        }
    }
}

impl SchedulerBuilder {
    pub fn executor(mut self, executor: Arc<dyn JobExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Register a job; registration order is execution order
    pub fn job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn jobs(mut self, jobs: impl IntoIterator<Item = Job>) -> Self {
        self.jobs.extend(jobs);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn metrics(mut self, metrics: HousekeeperMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validate the job table and compute initial due instants
    pub fn build(self) -> Result<Scheduler> {
        let executor = self
            .executor
            .ok_or_else(|| HousekeeperError::Config("scheduler requires an executor".to_string()))?;

        if self.poll_interval.is_zero() {
            return Err(HousekeeperError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for job in &self.jobs {
            if !seen.insert(job.name.as_str()) {
                return Err(HousekeeperError::DuplicateJob(job.name.clone()));
            }
            job.trigger.validate(&job.name)?;
        }

        let now = self.clock.now();
        let jobs: Vec<ScheduledJob> = self
            .jobs
            .into_iter()
            .map(|job| ScheduledJob::new(job, now))
            .collect();

        if let Some(health) = &self.health {
            health.register(components::SCHEDULER);
            for scheduled in &jobs {
                health.register(&components::job(&scheduled.job.name));
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.set_jobs_registered(jobs.len() as i64);
        }

        Ok(Scheduler {
            jobs,
            executor,
            clock: self.clock,
            poll_interval: self.poll_interval,
            health: self.health,
            metrics: self.metrics,
            logger: self.logger.unwrap_or_else(StructuredLogger::for_local_host),
        })
    }
}
