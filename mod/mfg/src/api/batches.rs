use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use stitcherp_core::{Actor, ListParams, ListResult, ServiceError};

use crate::model::{BatchAggregate, CuttingResult, ProductionBatch, StageTask, SubBatch, TimelineEvent};
use crate::service::MfgService;
use crate::service::split::SubBatchGroupInput;
use crate::service::workflow::{
    BatchFilters, CreateBatchInput, CuttingResultInput, VerifyDecision,
};

type S = Arc<MfgService>;

pub fn router(service: S) -> Router {
    Router::new()
        .route("/batches", post(create).get(list))
        .route("/batches/{id}", get(get_one).delete(delete))
        .route("/batches/{id}/aggregate", get(aggregate))
        .route("/batches/{id}/timeline", get(timeline))
        .route("/batches/{id}/sub-batches", get(list_sub_batches))
        .route("/batches/{id}/@request-materials", post(request_materials))
        .route("/batches/{id}/@confirm-materials", post(confirm_materials))
        .route("/batches/{id}/@assign-cutter", post(assign_cutter))
        .route("/batches/{id}/@cutting-results", post(cutting_results))
        .route("/batches/{id}/@confirm-cutting-result", post(confirm_cutting_result))
        .route("/batches/{id}/@verify-cutting", post(verify_cutting))
        .route("/batches/{id}/@assign-sewer", post(assign_sewer))
        .route("/batches/{id}/@verify-sewing", post(verify_sewing))
        .route("/batches/{id}/@assign-finisher", post(assign_finisher))
        .route("/batches/{id}/@sub-batches", post(create_sub_batches))
        .route("/batches/{id}/@warehouse-verify", post(warehouse_verify))
        .route("/batches/{id}/@complete", post(complete))
        .route("/batches/{id}/@cancel", post(cancel))
        .with_state(service)
}

// ---------------------------------------------------------------------------
// Request bodies — every mutating call carries the acting identity
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBatchRequest {
    actor: Actor,
    #[serde(flatten)]
    input: CreateBatchInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorBody {
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignBody {
    worker: String,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CuttingResultsBody {
    rows: Vec<CuttingResultInput>,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmCuttingResultBody {
    product_size: String,
    color: String,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody {
    decision: VerifyDecision,
    #[serde(default)]
    notes: String,
    actor: Actor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubBatchesBody {
    groups: Vec<SubBatchGroupInput>,
    actor: Actor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchListQuery {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    product_id: Option<String>,
}

// ---------------------------------------------------------------------------
// CRUD / reads
// ---------------------------------------------------------------------------

async fn create(
    State(svc): State<S>,
    Json(req): Json<CreateBatchRequest>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.create_batch(req.input, &req.actor)?))
}

async fn list(
    State(svc): State<S>,
    Query(q): Query<BatchListQuery>,
) -> Result<Json<ListResult<ProductionBatch>>, ServiceError> {
    let params = ListParams {
        limit: q.limit.unwrap_or(50),
        offset: q.offset.unwrap_or(0),
    };
    let filters = BatchFilters {
        status: q.status,
        product_id: q.product_id,
    };
    Ok(Json(svc.list_batches(&params, &filters)?))
}

async fn get_one(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.get_batch(&id)?))
}

async fn aggregate(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<BatchAggregate>, ServiceError> {
    Ok(Json(svc.load_batch_aggregate(&id)?))
}

async fn timeline(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TimelineEvent>>, ServiceError> {
    Ok(Json(svc.list_timeline(&id)?))
}

async fn list_sub_batches(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SubBatch>>, ServiceError> {
    Ok(Json(svc.list_sub_batches(&id)?))
}

async fn delete(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.delete_batch(&id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Workflow transitions
// ---------------------------------------------------------------------------

async fn request_materials(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.request_materials(&id, &body.actor)?))
}

async fn confirm_materials(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.confirm_materials(&id, &body.actor)?))
}

async fn assign_cutter(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<AssignBody>,
) -> Result<Json<StageTask>, ServiceError> {
    Ok(Json(svc.assign_cutter(&id, &body.worker, &body.actor)?))
}

async fn cutting_results(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<CuttingResultsBody>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.input_cutting_results(&id, body.rows, &body.actor)?))
}

async fn confirm_cutting_result(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ConfirmCuttingResultBody>,
) -> Result<Json<CuttingResult>, ServiceError> {
    Ok(Json(svc.confirm_cutting_result(
        &id,
        &body.product_size,
        &body.color,
        &body.actor,
    )?))
}

async fn verify_cutting(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.verify_cutting(&id, body.decision, &body.notes, &body.actor)?))
}

async fn assign_sewer(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<AssignBody>,
) -> Result<Json<StageTask>, ServiceError> {
    Ok(Json(svc.assign_sewer(&id, &body.worker, &body.actor)?))
}

async fn verify_sewing(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.verify_sewing(&id, body.decision, &body.notes, &body.actor)?))
}

async fn assign_finisher(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<AssignBody>,
) -> Result<Json<StageTask>, ServiceError> {
    Ok(Json(svc.assign_finisher(&id, &body.worker, &body.actor)?))
}

async fn create_sub_batches(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<CreateSubBatchesBody>,
) -> Result<Json<Vec<SubBatch>>, ServiceError> {
    Ok(Json(svc.create_sub_batches(&id, body.groups, &body.actor)?))
}

async fn warehouse_verify(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.warehouse_verify(&id, &body.actor)?))
}

async fn complete(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.complete_batch(&id, &body.actor)?))
}

async fn cancel(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ProductionBatch>, ServiceError> {
    Ok(Json(svc.cancel_batch(&id, &body.actor)?))
}
