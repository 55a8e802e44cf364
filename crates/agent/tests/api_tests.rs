//! Integration tests for the agent API endpoints

#[path = "../src/api.rs"]
#[allow(dead_code)]
mod api;

use api::{create_router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use housekeeper_lib::{
    health::{components, HealthRegistry},
    observability::HousekeeperMetrics,
};
use std::sync::Arc;
use tower::ServiceExt;

fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SCHEDULER);
    health_registry.register(&components::job("daily-backup"));

    let state = Arc::new(AppState::new(health_registry));
    let router = create_router(state.clone());

    (router, state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app();

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_job_failed() {
    let (app, state) = setup_test_app();
    state
        .health_registry
        .set_degraded(&components::job("daily-backup"), "source missing");

    let (status, health) = get_json(app, "/healthz").await;

    // A failed job is retried at its next trigger, the daemon stays operational
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(
        health["components"]["job:daily-backup"]["message"],
        "source missing"
    );
}

#[tokio::test]
async fn test_healthz_returns_503_when_scheduler_stopped() {
    let (app, state) = setup_test_app();
    state
        .health_registry
        .set_unhealthy(components::SCHEDULER, "scheduler stopped");

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let (app, _state) = setup_test_app();

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state) = setup_test_app();
    state.health_registry.set_ready(true);

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state) = setup_test_app();

    let metrics = HousekeeperMetrics::new();
    metrics.observe_job("daily-backup", true, 0.5);
    metrics.record_backup(2048);
    metrics.add_files_deleted(2);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("housekeeper_job_runs_total"));
    assert!(metrics_text.contains("housekeeper_job_duration_seconds_bucket"));
    assert!(metrics_text.contains("housekeeper_last_backup_bytes"));
    assert!(metrics_text.contains("housekeeper_files_deleted_total"));
}
