use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{JobId, WorkerId};
use super::engine::SweepTrigger;
use super::scheduler::{SchedulerError, SweepScheduler};
use super::store::{MatchStore, NotificationStore, StoreError};

/// Handles the HTTP read projections and the manual sweep trigger need.
pub struct MatchingApi<M, N> {
    matches: Arc<M>,
    notifications: Arc<N>,
    scheduler: Arc<SweepScheduler>,
}

impl<M, N> MatchingApi<M, N>
where
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    pub fn new(matches: Arc<M>, notifications: Arc<N>, scheduler: Arc<SweepScheduler>) -> Self {
        Self {
            matches,
            notifications,
            scheduler,
        }
    }
}

/// Router exposing match and notification projections plus sweep control.
pub fn matching_router<M, N>(api: Arc<MatchingApi<M, N>>) -> Router
where
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/workers/:worker_id/matches",
            get(worker_matches_handler::<M, N>),
        )
        .route(
            "/api/v1/workers/:worker_id/notifications",
            get(worker_notifications_handler::<M, N>),
        )
        .route("/api/v1/jobs/:job_id/matches", get(job_matches_handler::<M, N>))
        .route("/api/v1/sweeps", post(trigger_sweep_handler::<M, N>))
        .route("/api/v1/sweeps/last", get(sweep_status_handler::<M, N>))
        .with_state(api)
}

pub(crate) async fn worker_matches_handler<M, N>(
    State(api): State<Arc<MatchingApi<M, N>>>,
    Path(worker_id): Path<String>,
) -> Response
where
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    let worker_id = WorkerId(worker_id);
    match api.matches.for_worker(&worker_id) {
        Ok(matches) => {
            let payload = json!({
                "worker_id": worker_id,
                "matches": matches,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => store_failure(error),
    }
}

pub(crate) async fn job_matches_handler<M, N>(
    State(api): State<Arc<MatchingApi<M, N>>>,
    Path(job_id): Path<String>,
) -> Response
where
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    let job_id = JobId(job_id);
    match api.matches.for_job(&job_id) {
        Ok(matches) => {
            let payload = json!({
                "job_id": job_id,
                "match_count": matches.len(),
                "matches": matches,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => store_failure(error),
    }
}

pub(crate) async fn worker_notifications_handler<M, N>(
    State(api): State<Arc<MatchingApi<M, N>>>,
    Path(worker_id): Path<String>,
) -> Response
where
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    let worker_id = WorkerId(worker_id);
    match api.notifications.for_worker(&worker_id) {
        Ok(notifications) => {
            let payload = json!({
                "worker_id": worker_id,
                "notifications": notifications,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => store_failure(error),
    }
}

pub(crate) async fn trigger_sweep_handler<M, N>(
    State(api): State<Arc<MatchingApi<M, N>>>,
) -> Response
where
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    match api.scheduler.run_now(SweepTrigger::Manual).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(SchedulerError::Busy) => {
            let payload = json!({
                "error": "a sweep is already running",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn sweep_status_handler<M, N>(
    State(api): State<Arc<MatchingApi<M, N>>>,
) -> Response
where
    M: MatchStore + 'static,
    N: NotificationStore + 'static,
{
    (StatusCode::OK, axum::Json(api.scheduler.status())).into_response()
}

fn store_failure(error: StoreError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
}
