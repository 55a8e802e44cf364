//! Housekeeping library for periodic file lifecycle management
//!
//! This crate provides the core functionality for:
//! - File inventory and age-based retention
//! - Timestamped directory backups
//! - Host resource sampling
//! - Structured report persistence
//! - Job scheduling with daily, weekly and interval triggers
//! - Health checks and observability

pub mod backup;
pub mod config;
pub mod error;
pub mod health;
pub mod housekeeper;
pub mod inventory;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod report;
pub mod scheduler;
pub mod shutdown;

pub use crate::config::HousekeeperConfig;
pub use error::{HousekeeperError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use housekeeper::Housekeeper;
pub use models::*;
pub use monitor::{DiskSpaceStatus, ResourceMonitor};
pub use observability::{HousekeeperMetrics, StructuredLogger};
pub use report::ReportWriter;
pub use shutdown::ShutdownSignals;
pub use scheduler::{
    Job, JobAction, JobConfig, JobExecutor, JobOutcome, JobState, JobStatus, Scheduler, Trigger,
    TriggerConfig,
};
