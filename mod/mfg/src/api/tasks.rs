use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use stitcherp_core::{Actor, ServiceError};

use crate::model::StageTask;
use crate::service::MfgService;

type S = Arc<MfgService>;

pub fn router(service: S) -> Router {
    Router::new()
        .route("/tasks/{id}", get(get_one))
        .route("/tasks/{id}/@start", post(start))
        .route("/tasks/{id}/@progress", post(progress))
        .route("/tasks/{id}/@complete", post(complete))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorBody {
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressBody {
    #[serde(default)]
    completed_delta: i64,
    #[serde(default)]
    reject_delta: i64,
    #[serde(default)]
    notes: Option<String>,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteBody {
    #[serde(default)]
    final_completed: Option<i64>,
    #[serde(default)]
    final_reject: Option<i64>,
    #[serde(default)]
    notes: Option<String>,
    actor: Actor,
}

async fn get_one(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<StageTask>, ServiceError> {
    Ok(Json(svc.get_task(&id)?))
}

async fn start(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<StageTask>, ServiceError> {
    Ok(Json(svc.start_task(&id, &body.actor)?))
}

async fn progress(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ProgressBody>,
) -> Result<Json<StageTask>, ServiceError> {
    Ok(Json(svc.record_progress(
        &id,
        body.completed_delta,
        body.reject_delta,
        body.notes,
        &body.actor,
    )?))
}

async fn complete(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<CompleteBody>,
) -> Result<Json<StageTask>, ServiceError> {
    Ok(Json(svc.complete_task(
        &id,
        body.final_completed,
        body.final_reject,
        body.notes,
        &body.actor,
    )?))
}
