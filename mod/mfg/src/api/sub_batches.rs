use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use stitcherp_core::{Actor, ServiceError};

use crate::model::SubBatch;
use crate::service::MfgService;
use crate::service::workflow::VerifyDecision;

type S = Arc<MfgService>;

pub fn router(service: S) -> Router {
    Router::new()
        .route("/sub-batches/{id}", get(get_one))
        .route("/sub-batches/{id}/@start-sewing", post(start_sewing))
        .route("/sub-batches/{id}/@complete-sewing", post(complete_sewing))
        .route("/sub-batches/{id}/@confirm-sewing", post(confirm_sewing))
        .route("/sub-batches/{id}/@assign-finisher", post(assign_finisher))
        .route("/sub-batches/{id}/@start-finishing", post(start_finishing))
        .route("/sub-batches/{id}/@complete-finishing", post(complete_finishing))
        .route("/sub-batches/{id}/@confirm-finishing", post(confirm_finishing))
        .route("/sub-batches/{id}/@submit", post(submit))
        .route("/sub-batches/{id}/@verify", post(verify))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorBody {
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputBody {
    output: i64,
    #[serde(default)]
    reject: i64,
    #[serde(default)]
    notes: Option<String>,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmBody {
    decision: VerifyDecision,
    #[serde(default)]
    notes: String,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignBody {
    worker: String,
    actor: Actor,
}

async fn get_one(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.get_sub_batch(&id)?))
}

async fn start_sewing(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.start_sub_sewing(&id, &body.actor)?))
}

async fn complete_sewing(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<OutputBody>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.complete_sub_sewing(&id, body.output, body.reject, body.notes, &body.actor)?))
}

async fn confirm_sewing(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ConfirmBody>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.confirm_sub_sewing(&id, body.decision, &body.notes, &body.actor)?))
}

async fn assign_finisher(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<AssignBody>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.assign_sub_finisher(&id, &body.worker, &body.actor)?))
}

async fn start_finishing(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.start_sub_finishing(&id, &body.actor)?))
}

async fn complete_finishing(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<OutputBody>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.complete_sub_finishing(&id, body.output, body.reject, body.notes, &body.actor)?))
}

async fn confirm_finishing(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ConfirmBody>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.confirm_sub_finishing(&id, body.decision, &body.notes, &body.actor)?))
}

async fn submit(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.submit_sub_to_warehouse(&id, &body.actor)?))
}

async fn verify(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<SubBatch>, ServiceError> {
    Ok(Json(svc.verify_sub_warehouse(&id, &body.actor)?))
}
