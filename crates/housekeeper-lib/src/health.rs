//! Health tracking for the housekeeping daemon
//!
//! The scheduler reports each job's latest outcome here; the daemon exposes
//! the aggregate through its liveness and readiness endpoints. Updates come
//! from the synchronous job loop, so the registry uses blocking locks that are
//! only held for a map insert or clone.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Last run failed but the component keeps being scheduled
    Degraded,
    /// Component cannot do its work
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status wins; an empty registry is healthy
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|health| health.status)
            .max_by_key(|status| match status {
                ComponentStatus::Healthy => 0,
                ComponentStatus::Degraded => 1,
                ComponentStatus::Unhealthy => 2,
            })
            .unwrap_or(ComponentStatus::Healthy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const SCHEDULER: &str = "scheduler";

    /// Component key for an individual job
    pub fn job(name: &str) -> String {
        format!("job:{}", name)
    }
}

/// Shared registry of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_components(&self) -> RwLockReadGuard<'_, HashMap<String, ComponentHealth>> {
        self.components.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_components(&self) -> RwLockWriteGuard<'_, HashMap<String, ComponentHealth>> {
        self.components.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a component with initial healthy status
    pub fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy());
    }

    pub fn update(&self, name: &str, health: ComponentHealth) {
        self.write_components().insert(name.to_string(), health);
    }

    pub fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy());
    }

    pub fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message));
    }

    pub fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message));
    }

    pub fn set_ready(&self, ready: bool) {
        *self.ready.write().unwrap_or_else(|e| e.into_inner()) = ready;
    }

    pub fn component(&self, name: &str) -> Option<ComponentHealth> {
        self.read_components().get(name).cloned()
    }

    pub fn health(&self) -> HealthResponse {
        let components = self.read_components().clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once startup completed and nothing is unhealthy
    ///
    /// Degraded jobs do not affect readiness: a failed run is retried at its
    /// next trigger.
    pub fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().unwrap_or_else(|e| e.into_inner());

        if !ready {
            return ReadinessResponse {
                ready: false,
                reason: Some("Housekeeper not yet initialized".to_string()),
            };
        }
        if self.health().status == ComponentStatus::Unhealthy {
            return ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            };
        }
        ReadinessResponse {
            ready: true,
            reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health();

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[test]
    fn test_job_failure_degrades_overall_status() {
        let registry = HealthRegistry::new();
        registry.register(components::SCHEDULER);
        registry.register(&components::job("daily-backup"));

        registry.set_degraded(&components::job("daily-backup"), "source missing");

        let health = registry.health();
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components["job:daily-backup"].message.as_deref(),
            Some("source missing")
        );
    }

    #[test]
    fn test_unhealthy_wins_over_degraded() {
        let registry = HealthRegistry::new();
        registry.set_degraded("a", "slow");
        registry.set_unhealthy(components::SCHEDULER, "scheduler stopped");

        assert_eq!(registry.health().status, ComponentStatus::Unhealthy);
    }

    #[test]
    fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness();

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[test]
    fn test_readiness_ignores_degraded_jobs() {
        let registry = HealthRegistry::new();
        registry.set_ready(true);
        registry.set_degraded(&components::job("report"), "disk full");

        assert!(registry.readiness().ready);
    }

    #[test]
    fn test_readiness_not_ready_when_unhealthy() {
        let registry = HealthRegistry::new();
        registry.set_ready(true);
        registry.set_unhealthy(components::SCHEDULER, "stopped");

        assert!(!registry.readiness().ready);
    }
}
