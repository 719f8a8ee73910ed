use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use stitcherp_core::{ListParams, ListResult, ServiceError};

use crate::model::{MaterialVariant, Product, StockTransaction, StockTxnType};
use crate::service::MfgService;
use crate::service::catalog::{CreateProductInput, CreateVariantInput};

type S = Arc<MfgService>;

pub fn router(service: S) -> Router {
    Router::new()
        .route("/products", post(create_product).get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/materials", post(create_variant).get(list_variants))
        .route("/materials/{id}", get(get_variant))
        .route("/materials/{id}/@transaction", post(record_transaction))
        .route("/materials/{id}/transactions", get(list_transactions))
        .with_state(service)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

async fn create_product(
    State(svc): State<S>,
    Json(input): Json<CreateProductInput>,
) -> Result<Json<Product>, ServiceError> {
    Ok(Json(svc.create_product(input)?))
}

async fn get_product(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ServiceError> {
    Ok(Json(svc.get_product(&id)?))
}

async fn list_products(
    State(svc): State<S>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<Product>>, ServiceError> {
    Ok(Json(svc.list_products(&params)?))
}

// ---------------------------------------------------------------------------
// Material variants / stock ledger
// ---------------------------------------------------------------------------

async fn create_variant(
    State(svc): State<S>,
    Json(input): Json<CreateVariantInput>,
) -> Result<Json<MaterialVariant>, ServiceError> {
    Ok(Json(svc.create_material_variant(input)?))
}

async fn get_variant(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<MaterialVariant>, ServiceError> {
    Ok(Json(svc.get_variant(&id)?))
}

async fn list_variants(
    State(svc): State<S>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<MaterialVariant>>, ServiceError> {
    Ok(Json(svc.list_variants(&params)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockTxnRequest {
    #[serde(rename = "type")]
    txn_type: StockTxnType,
    qty: f64,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

async fn record_transaction(
    State(svc): State<S>,
    Path(id): Path<String>,
    Json(req): Json<StockTxnRequest>,
) -> Result<Json<StockTransaction>, ServiceError> {
    Ok(Json(svc.record_transaction(
        &id,
        req.txn_type,
        req.qty,
        req.reference,
        req.note,
    )?))
}

async fn list_transactions(
    State(svc): State<S>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StockTransaction>>, ServiceError> {
    Ok(Json(svc.list_transactions(&id)?))
}
