//! BatchWorkflow — the production batch state machine.
//!
//! One operation per transition, each executed as one atomic unit of work:
//! load the batch, check the transition table, apply effects across stock /
//! tasks / results, write the new status under a CAS guard, append the
//! timeline event. A failing precondition rolls the whole transaction back.

use tracing::info;

use stitcherp_core::{Actor, ListParams, ListResult, ServiceError, new_id, now_rfc3339};
use stitcherp_sql::{SqlExec, Value};

use super::split::load_sub_batches;
use super::tasks::{create_stage_task, load_stage_task, save_task};
use super::timeline::record_event;
use super::{MfgService, stock};
use crate::model::{
    BatchAggregate, BatchStatus, CuttingResult, MaterialColorAllocation, MaterialVariant,
    PipelineMode, PipelineState, ProductionBatch, SizeColorRequest, Stage, StageTaskStatus,
    StageTask, SubBatchStatus, WorkflowOp, event_kind,
};
use crate::store;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchInput {
    pub sku: String,
    pub product_id: String,
    /// Planned good output; defaults to the sum of size/color requests.
    #[serde(default)]
    pub target_quantity: Option<i64>,
    pub size_color_requests: Vec<SizeColorRequest>,
    #[serde(default)]
    pub allocations: Vec<AllocationInput>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationInput {
    pub variant_id: String,
    pub roll_quantity: i64,
    pub meter_per_roll: f64,
    pub allocated_qty: f64,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuttingResultInput {
    pub product_size: String,
    pub color: String,
    pub actual_pieces: i64,
}

/// Outcome of a supervisor verification. Reject always requires notes and
/// returns the work to the matching in-progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyDecision {
    Approve,
    Reject,
}

#[derive(Debug, Default)]
pub struct BatchFilters {
    pub status: Option<String>,
    pub product_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Shared loading helpers
// ---------------------------------------------------------------------------

pub(crate) fn load_allocations(
    tx: &dyn SqlExec,
    batch_id: &str,
) -> Result<Vec<MaterialColorAllocation>, ServiceError> {
    store::list_records_by(
        tx,
        "material_allocations",
        &[("batch_id", Value::Text(batch_id.to_string()))],
    )
}

pub(crate) fn load_cutting_results(
    tx: &dyn SqlExec,
    batch_id: &str,
) -> Result<Vec<CuttingResult>, ServiceError> {
    store::list_records_by(
        tx,
        "cutting_results",
        &[("batch_id", Value::Text(batch_id.to_string()))],
    )
}

/// Total pieces across confirmed cutting result rows — what the sewing
/// stage (or the splitter) has to work with.
pub(crate) fn confirmed_cut_total(results: &[CuttingResult]) -> i64 {
    results
        .iter()
        .filter(|r| r.is_confirmed)
        .map(|r| r.actual_pieces)
        .sum()
}

fn save_allocation(tx: &dyn SqlExec, alloc: &MaterialColorAllocation) -> Result<(), ServiceError> {
    store::update_record(
        tx,
        "material_allocations",
        &alloc.id,
        alloc,
        &[
            ("confirmed", Value::Integer(alloc.confirmed as i64)),
            ("update_at", Value::Text(alloc.update_at.clone())),
        ],
    )
}

fn save_cutting_result(tx: &dyn SqlExec, row: &CuttingResult) -> Result<(), ServiceError> {
    store::update_record(
        tx,
        "cutting_results",
        &row.id,
        row,
        &[
            ("confirmed", Value::Integer(row.is_confirmed as i64)),
            ("update_at", Value::Text(row.update_at.clone())),
        ],
    )
}

/// Reject notes are a server-side invariant: empty or whitespace-only notes
/// fail validation.
fn require_notes(notes: &str) -> Result<(), ServiceError> {
    if notes.trim().is_empty() {
        return Err(ServiceError::Validation(
            "rejection requires non-empty notes".into(),
        ));
    }
    Ok(())
}

impl MfgService {
    // =======================================================================
    // Creation / reads
    // =======================================================================

    /// Create a batch in PENDING with its size/color requests and material
    /// allocations. Allocations only reserve — stock is not touched until
    /// `confirm_materials`, so a batch may be planned against stock that is
    /// still on order.
    pub fn create_batch(
        &self,
        input: CreateBatchInput,
        actor: &Actor,
    ) -> Result<ProductionBatch, ServiceError> {
        if input.sku.trim().is_empty() {
            return Err(ServiceError::Validation("batch sku is required".into()));
        }
        if input.size_color_requests.is_empty() {
            return Err(ServiceError::Validation(
                "at least one size/color request is required".into(),
            ));
        }
        for r in &input.size_color_requests {
            if r.requested_pieces <= 0 {
                return Err(ServiceError::Validation(format!(
                    "requested pieces for {}/{} must be positive",
                    r.product_size, r.color
                )));
            }
        }
        for a in &input.allocations {
            if a.allocated_qty <= 0.0 {
                return Err(ServiceError::Validation(format!(
                    "allocated quantity for variant {} must be positive",
                    a.variant_id
                )));
            }
        }

        self.in_txn(|tx| {
            // Referential checks before any write.
            let _: crate::model::Product = store::get_record(tx, "products", &input.product_id)?;
            for a in &input.allocations {
                let _: MaterialVariant = store::get_record(tx, "material_variants", &a.variant_id)?;
            }

            let now = now_rfc3339();
            let requested_total: i64 = input
                .size_color_requests
                .iter()
                .map(|r| r.requested_pieces)
                .sum();
            let batch = ProductionBatch {
                id: new_id(),
                sku: input.sku.clone(),
                product_id: input.product_id.clone(),
                target_quantity: input.target_quantity.unwrap_or(requested_total),
                actual_quantity: 0,
                reject_quantity: 0,
                total_rolls: input.allocations.iter().map(|a| a.roll_quantity).sum(),
                status: BatchStatus::Pending,
                pipeline: None,
                size_color_requests: input.size_color_requests.clone(),
                start_date: now.clone(),
                completed_date: None,
                notes: input.notes.clone(),
                create_at: now.clone(),
                update_at: now.clone(),
            };

            store::insert_record(
                tx,
                "batches",
                &batch.id,
                &batch,
                &[
                    ("sku", Value::Text(batch.sku.clone())),
                    ("product_id", Value::Text(batch.product_id.clone())),
                    ("status", Value::Text(batch.status.as_str().to_string())),
                    ("create_at", Value::Text(now.clone())),
                    ("update_at", Value::Text(now.clone())),
                ],
            )?;

            for a in &input.allocations {
                let alloc = MaterialColorAllocation {
                    id: new_id(),
                    batch_id: batch.id.clone(),
                    variant_id: a.variant_id.clone(),
                    roll_quantity: a.roll_quantity,
                    allocated_qty: a.allocated_qty,
                    meter_per_roll: a.meter_per_roll,
                    stock_at_allocation: None,
                    roll_quantity_at_allocation: None,
                    confirmed: false,
                    create_at: now.clone(),
                    update_at: now.clone(),
                };
                store::insert_record(
                    tx,
                    "material_allocations",
                    &alloc.id,
                    &alloc,
                    &[
                        ("batch_id", Value::Text(alloc.batch_id.clone())),
                        ("variant_id", Value::Text(alloc.variant_id.clone())),
                        ("confirmed", Value::Integer(0)),
                        ("create_at", Value::Text(now.clone())),
                        ("update_at", Value::Text(now.clone())),
                    ],
                )?;
            }

            record_event(
                tx,
                &batch.id,
                event_kind::BATCH_CREATED,
                actor,
                format!(
                    "batch {} created, target {} pieces, {} material lines",
                    batch.sku,
                    batch.target_quantity,
                    input.allocations.len()
                ),
            )?;

            info!(sku = %batch.sku, "batch created");
            Ok(batch)
        })
    }

    pub fn get_batch(&self, id: &str) -> Result<ProductionBatch, ServiceError> {
        store::get_record(self.db(), "batches", id)
    }

    pub fn list_batches(
        &self,
        params: &ListParams,
        filters: &BatchFilters,
    ) -> Result<ListResult<ProductionBatch>, ServiceError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref s) = filters.status {
            f.push(("status", Value::Text(s.clone())));
        }
        if let Some(ref p) = filters.product_id {
            f.push(("product_id", Value::Text(p.clone())));
        }
        store::list_records_paginated(self.db(), "batches", &f, params.limit.min(500), params.offset)
    }

    /// Load everything known about a batch in one consistent snapshot.
    pub fn load_batch_aggregate(&self, id: &str) -> Result<BatchAggregate, ServiceError> {
        self.in_txn(|tx| {
            let batch = Self::load_batch(tx, id)?;
            let allocations = load_allocations(tx, id)?;
            let cutting_task = load_stage_task(tx, id, Stage::Cutting)?;
            let cutting_results = load_cutting_results(tx, id)?;
            let pipeline = match batch.pipeline {
                None => PipelineState::NotStarted,
                Some(PipelineMode::Direct) => PipelineState::Direct {
                    sewing_task: load_stage_task(tx, id, Stage::Sewing)?,
                    finishing_task: load_stage_task(tx, id, Stage::Finishing)?,
                },
                Some(PipelineMode::Split) => PipelineState::Split {
                    sub_batches: load_sub_batches(tx, id)?,
                },
            };
            let timeline = store::list_records_by(
                tx,
                "timeline_events",
                &[("batch_id", Value::Text(id.to_string()))],
            )?;
            Ok(BatchAggregate {
                batch,
                allocations,
                cutting_task,
                cutting_results,
                pipeline,
                timeline,
            })
        })
    }

    // =======================================================================
    // Material stage
    // =======================================================================

    /// PENDING → MATERIAL_REQUESTED: the planner hands the bill of materials
    /// to the warehouse.
    pub fn request_materials(
        &self,
        batch_id: &str,
        actor: &Actor,
    ) -> Result<ProductionBatch, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::RequestMaterials)?;

            let allocations = load_allocations(tx, batch_id)?;
            let expected = batch.status;
            batch.status = BatchStatus::MaterialRequested;
            batch.update_at = now_rfc3339();
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event_kind::MATERIAL_REQUESTED,
                actor,
                format!("{} material lines requested", allocations.len()),
            )?;
            Ok(batch)
        })
    }

    /// PENDING/MATERIAL_REQUESTED → MATERIAL_ALLOCATED.
    ///
    /// Two-phase over every material line: validate all sufficiency checks
    /// first, then deduct all. One short line fails the whole operation with
    /// `InsufficientStock` and nothing is deducted.
    pub fn confirm_materials(
        &self,
        batch_id: &str,
        actor: &Actor,
    ) -> Result<ProductionBatch, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::ConfirmMaterials)?;

            let mut allocations = load_allocations(tx, batch_id)?;
            if allocations.is_empty() {
                return Err(ServiceError::Validation(format!(
                    "batch {} has no material allocations",
                    batch.sku
                )));
            }
            if allocations.iter().any(|a| a.confirmed) {
                return Err(ServiceError::InvalidState(format!(
                    "batch {}: materials already confirmed",
                    batch.sku
                )));
            }

            // Phase 1: validate every line before any write.
            let mut variants: Vec<MaterialVariant> = Vec::with_capacity(allocations.len());
            for alloc in &allocations {
                let variant: MaterialVariant =
                    store::get_record(tx, "material_variants", &alloc.variant_id)?;
                if variant.stock < alloc.allocated_qty {
                    return Err(ServiceError::InsufficientStock(format!(
                        "variant {} ({} {}): batch {} needs {}, stock has {}",
                        variant.id,
                        variant.material_name,
                        variant.color,
                        batch.sku,
                        alloc.allocated_qty,
                        variant.stock
                    )));
                }
                variants.push(variant);
            }

            // Phase 2: apply every line. Snapshots freeze the pre-deduction
            // level for audit.
            let now = now_rfc3339();
            let mut total_qty = 0.0;
            for (alloc, variant) in allocations.iter_mut().zip(&variants) {
                alloc.stock_at_allocation = Some(variant.stock);
                alloc.roll_quantity_at_allocation = Some(variant.roll_quantity);

                stock::confirm_deduction(
                    tx,
                    &variant.id,
                    alloc.allocated_qty,
                    Some(batch.sku.clone()),
                )?;

                if alloc.roll_quantity > 0 {
                    let mut v: MaterialVariant =
                        store::get_record(tx, "material_variants", &variant.id)?;
                    // Roll counts tolerate planning drift; stock is the hard
                    // invariant.
                    v.roll_quantity = (v.roll_quantity - alloc.roll_quantity).max(0);
                    v.update_at = now.clone();
                    store::update_record(
                        tx,
                        "material_variants",
                        &v.id,
                        &v,
                        &[
                            ("stock", Value::Real(v.stock)),
                            ("update_at", Value::Text(v.update_at.clone())),
                        ],
                    )?;
                }

                alloc.confirmed = true;
                alloc.update_at = now.clone();
                save_allocation(tx, alloc)?;
                total_qty += alloc.allocated_qty;
            }

            let expected = batch.status;
            batch.status = BatchStatus::MaterialAllocated;
            batch.update_at = now;
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event_kind::MATERIAL_ALLOCATED,
                actor,
                format!(
                    "{} material lines deducted, {} total",
                    allocations.len(),
                    total_qty
                ),
            )?;

            info!(sku = %batch.sku, lines = allocations.len(), "materials allocated");
            Ok(batch)
        })
    }

    // =======================================================================
    // Cutting stage
    // =======================================================================

    /// MATERIAL_ALLOCATED → ASSIGNED_TO_CUTTER: bind a cutter, create the
    /// cutting task with the planned piece count as its input.
    pub fn assign_cutter(
        &self,
        batch_id: &str,
        worker: &str,
        actor: &Actor,
    ) -> Result<StageTask, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::AssignCutter)?;

            let received = batch.requested_total();
            if received <= 0 {
                return Err(ServiceError::Validation(format!(
                    "batch {} has no requested pieces to cut",
                    batch.sku
                )));
            }

            let task = create_stage_task(tx, &batch.id, Stage::Cutting, worker, received)?;

            let expected = batch.status;
            batch.status = BatchStatus::AssignedToCutter;
            batch.update_at = now_rfc3339();
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event_kind::CUTTER_ASSIGNED,
                actor,
                format!("cutting assigned to {}, {} pieces planned", worker, received),
            )?;
            Ok(task)
        })
    }

    /// ASSIGNED_TO_CUTTER/IN_CUTTING → CUTTING_COMPLETED: record the actual
    /// cut output per size × color and close the cutting task.
    ///
    /// Rows are upserted on (size, color); re-recording after a verification
    /// reject replaces earlier figures and clears their confirmation.
    pub fn input_cutting_results(
        &self,
        batch_id: &str,
        rows: Vec<CuttingResultInput>,
        actor: &Actor,
    ) -> Result<ProductionBatch, ServiceError> {
        if rows.is_empty() {
            return Err(ServiceError::Validation(
                "at least one cutting result row is required".into(),
            ));
        }
        for r in &rows {
            if r.actual_pieces < 0 {
                return Err(ServiceError::Validation(format!(
                    "actual pieces for {}/{} must be non-negative",
                    r.product_size, r.color
                )));
            }
        }
        for (i, r) in rows.iter().enumerate() {
            if rows[..i]
                .iter()
                .any(|p| p.product_size == r.product_size && p.color == r.color)
            {
                return Err(ServiceError::Validation(format!(
                    "duplicate cutting result row for {}/{}",
                    r.product_size, r.color
                )));
            }
        }
        let total: i64 = rows.iter().map(|r| r.actual_pieces).sum();
        if total == 0 {
            return Err(ServiceError::Validation(
                "total cut output is zero".into(),
            ));
        }

        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::InputCuttingResults)?;

            let mut task = load_stage_task(tx, batch_id, Stage::Cutting)?.ok_or_else(|| {
                ServiceError::InvalidState(format!("batch {} has no cutting task", batch.sku))
            })?;
            if total + task.reject_pieces > task.pieces_received {
                return Err(ServiceError::OverReceived(format!(
                    "cut output {} + reject {} exceeds {} pieces received",
                    total, task.reject_pieces, task.pieces_received
                )));
            }

            let now = now_rfc3339();
            let existing = load_cutting_results(tx, batch_id)?;
            for input in &rows {
                match existing
                    .iter()
                    .find(|e| e.product_size == input.product_size && e.color == input.color)
                {
                    Some(e) => {
                        let mut row = e.clone();
                        row.actual_pieces = input.actual_pieces;
                        row.is_confirmed = false;
                        row.confirmed_by = None;
                        row.update_at = now.clone();
                        save_cutting_result(tx, &row)?;
                    }
                    None => {
                        let row = CuttingResult {
                            id: new_id(),
                            batch_id: batch.id.clone(),
                            product_size: input.product_size.clone(),
                            color: input.color.clone(),
                            actual_pieces: input.actual_pieces,
                            is_confirmed: false,
                            confirmed_by: None,
                            create_at: now.clone(),
                            update_at: now.clone(),
                        };
                        store::insert_record(
                            tx,
                            "cutting_results",
                            &row.id,
                            &row,
                            &[
                                ("batch_id", Value::Text(row.batch_id.clone())),
                                ("product_size", Value::Text(row.product_size.clone())),
                                ("color", Value::Text(row.color.clone())),
                                ("confirmed", Value::Integer(0)),
                                ("create_at", Value::Text(now.clone())),
                                ("update_at", Value::Text(now.clone())),
                            ],
                        )?;
                    }
                }
            }

            task.pieces_completed = total;
            task.status = StageTaskStatus::Completed;
            if task.started_at.is_none() {
                task.started_at = Some(now.clone());
            }
            task.completed_at = Some(now.clone());
            task.update_at = now.clone();
            save_task(tx, &task)?;

            let expected = batch.status;
            batch.status = BatchStatus::CuttingCompleted;
            batch.update_at = now;
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event_kind::CUTTING_RESULTS_RECORDED,
                actor,
                format!("{} size/color rows, {} pieces cut", rows.len(), total),
            )?;
            Ok(batch)
        })
    }

    /// Confirm one cutting result row ahead of verification.
    pub fn confirm_cutting_result(
        &self,
        batch_id: &str,
        product_size: &str,
        color: &str,
        actor: &Actor,
    ) -> Result<CuttingResult, ServiceError> {
        self.in_txn(|tx| {
            let batch = Self::load_batch(tx, batch_id)?;
            if batch.status != BatchStatus::CuttingCompleted {
                return Err(ServiceError::InvalidState(format!(
                    "batch {}: cutting results can only be confirmed from CUTTING_COMPLETED, not {}",
                    batch.sku, batch.status
                )));
            }

            let results = load_cutting_results(tx, batch_id)?;
            let mut row = results
                .into_iter()
                .find(|r| r.product_size == product_size && r.color == color)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "cutting result {}/{} for batch {}",
                        product_size, color, batch.sku
                    ))
                })?;

            row.is_confirmed = true;
            row.confirmed_by = Some(actor.name.clone());
            row.update_at = now_rfc3339();
            save_cutting_result(tx, &row)?;

            record_event(
                tx,
                &batch.id,
                event_kind::CUTTING_RESULT_CONFIRMED,
                actor,
                format!("{}/{}: {} pieces confirmed", product_size, color, row.actual_pieces),
            )?;
            Ok(row)
        })
    }

    /// CUTTING_COMPLETED → CUTTING_VERIFIED (approve) or → IN_CUTTING
    /// (reject, notes required).
    ///
    /// Approval confirms every result row. A repeated reject while already
    /// IN_CUTTING changes nothing but the timeline.
    pub fn verify_cutting(
        &self,
        batch_id: &str,
        decision: VerifyDecision,
        notes: &str,
        actor: &Actor,
    ) -> Result<ProductionBatch, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::VerifyCutting)?;

            match decision {
                VerifyDecision::Approve => {
                    if batch.status != BatchStatus::CuttingCompleted {
                        return Err(ServiceError::InvalidState(format!(
                            "batch {}: cannot approve cutting while work is in progress",
                            batch.sku
                        )));
                    }
                    let mut task =
                        load_stage_task(tx, batch_id, Stage::Cutting)?.ok_or_else(|| {
                            ServiceError::InvalidState(format!(
                                "batch {} has no cutting task",
                                batch.sku
                            ))
                        })?;

                    let now = now_rfc3339();
                    let mut confirmed_rows = 0usize;
                    let mut confirmed_pieces = 0i64;
                    for result in load_cutting_results(tx, batch_id)? {
                        let mut row = result;
                        if !row.is_confirmed {
                            row.is_confirmed = true;
                            row.confirmed_by = Some(actor.name.clone());
                            row.update_at = now.clone();
                            save_cutting_result(tx, &row)?;
                        }
                        confirmed_rows += 1;
                        confirmed_pieces += row.actual_pieces;
                    }

                    task.status = StageTaskStatus::Verified;
                    task.update_at = now.clone();
                    save_task(tx, &task)?;

                    let expected = batch.status;
                    batch.status = BatchStatus::CuttingVerified;
                    batch.update_at = now;
                    Self::save_batch(tx, &batch, expected)?;

                    record_event(
                        tx,
                        &batch.id,
                        event_kind::CUTTING_VERIFIED,
                        actor,
                        format!(
                            "{} pieces approved across {} size/color rows",
                            confirmed_pieces, confirmed_rows
                        ),
                    )?;
                }
                VerifyDecision::Reject => {
                    require_notes(notes)?;
                    if batch.status == BatchStatus::InCutting {
                        // Already rejected; only the timeline grows.
                        record_event(
                            tx,
                            &batch.id,
                            event_kind::CUTTING_REJECTED,
                            actor,
                            notes.to_string(),
                        )?;
                        return Ok(batch);
                    }

                    let mut task =
                        load_stage_task(tx, batch_id, Stage::Cutting)?.ok_or_else(|| {
                            ServiceError::InvalidState(format!(
                                "batch {} has no cutting task",
                                batch.sku
                            ))
                        })?;
                    let now = now_rfc3339();
                    task.status = StageTaskStatus::InProgress;
                    task.completed_at = None;
                    task.update_at = now.clone();
                    save_task(tx, &task)?;

                    let expected = batch.status;
                    batch.status = BatchStatus::InCutting;
                    batch.update_at = now;
                    Self::save_batch(tx, &batch, expected)?;

                    record_event(
                        tx,
                        &batch.id,
                        event_kind::CUTTING_REJECTED,
                        actor,
                        notes.to_string(),
                    )?;
                }
            }
            Ok(batch)
        })
    }

    // =======================================================================
    // Sewing stage (direct path)
    // =======================================================================

    /// CUTTING_VERIFIED → ASSIGNED_TO_SEWER, selecting the direct pipeline.
    /// Mutually exclusive with `create_sub_batches`.
    pub fn assign_sewer(
        &self,
        batch_id: &str,
        worker: &str,
        actor: &Actor,
    ) -> Result<StageTask, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::AssignSewer)?;

            if let Some(mode) = batch.pipeline {
                return Err(ServiceError::InvalidState(format!(
                    "batch {} already follows the {:?} pipeline",
                    batch.sku, mode
                )));
            }

            let results = load_cutting_results(tx, batch_id)?;
            let received = confirmed_cut_total(&results);
            if received == 0 {
                return Err(ServiceError::Validation(format!(
                    "batch {} has no confirmed cut output",
                    batch.sku
                )));
            }

            let task = create_stage_task(tx, &batch.id, Stage::Sewing, worker, received)?;

            let expected = batch.status;
            batch.status = BatchStatus::AssignedToSewer;
            batch.pipeline = Some(PipelineMode::Direct);
            batch.update_at = now_rfc3339();
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event_kind::SEWER_ASSIGNED,
                actor,
                format!("sewing assigned to {}, {} pieces handed over", worker, received),
            )?;
            Ok(task)
        })
    }

    /// SEWING_COMPLETED → SEWING_VERIFIED (approve) or → IN_SEWING (reject).
    pub fn verify_sewing(
        &self,
        batch_id: &str,
        decision: VerifyDecision,
        notes: &str,
        actor: &Actor,
    ) -> Result<ProductionBatch, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::VerifySewing)?;

            match decision {
                VerifyDecision::Approve => {
                    if batch.status != BatchStatus::SewingCompleted {
                        return Err(ServiceError::InvalidState(format!(
                            "batch {}: cannot approve sewing while work is in progress",
                            batch.sku
                        )));
                    }
                    let mut task =
                        load_stage_task(tx, batch_id, Stage::Sewing)?.ok_or_else(|| {
                            ServiceError::InvalidState(format!(
                                "batch {} has no sewing task",
                                batch.sku
                            ))
                        })?;
                    let now = now_rfc3339();
                    task.status = StageTaskStatus::Verified;
                    task.update_at = now.clone();
                    save_task(tx, &task)?;

                    let expected = batch.status;
                    batch.status = BatchStatus::SewingVerified;
                    batch.update_at = now;
                    Self::save_batch(tx, &batch, expected)?;

                    record_event(
                        tx,
                        &batch.id,
                        event_kind::SEWING_VERIFIED,
                        actor,
                        format!("{} sewn pieces approved", task.pieces_completed),
                    )?;
                }
                VerifyDecision::Reject => {
                    require_notes(notes)?;
                    if batch.status == BatchStatus::InSewing {
                        record_event(
                            tx,
                            &batch.id,
                            event_kind::SEWING_REJECTED,
                            actor,
                            notes.to_string(),
                        )?;
                        return Ok(batch);
                    }

                    let mut task =
                        load_stage_task(tx, batch_id, Stage::Sewing)?.ok_or_else(|| {
                            ServiceError::InvalidState(format!(
                                "batch {} has no sewing task",
                                batch.sku
                            ))
                        })?;
                    let now = now_rfc3339();
                    task.status = StageTaskStatus::InProgress;
                    task.completed_at = None;
                    task.update_at = now.clone();
                    save_task(tx, &task)?;

                    let expected = batch.status;
                    batch.status = BatchStatus::InSewing;
                    batch.update_at = now;
                    Self::save_batch(tx, &batch, expected)?;

                    record_event(
                        tx,
                        &batch.id,
                        event_kind::SEWING_REJECTED,
                        actor,
                        notes.to_string(),
                    )?;
                }
            }
            Ok(batch)
        })
    }

    // =======================================================================
    // Finishing stage (direct path)
    // =======================================================================

    /// SEWING_VERIFIED → IN_FINISHING: bind a finisher; the finishing task
    /// receives the sewing stage's good output.
    pub fn assign_finisher(
        &self,
        batch_id: &str,
        worker: &str,
        actor: &Actor,
    ) -> Result<StageTask, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::AssignFinisher)?;

            let sewing = load_stage_task(tx, batch_id, Stage::Sewing)?.ok_or_else(|| {
                ServiceError::InvalidState(format!("batch {} has no sewing task", batch.sku))
            })?;

            let task = create_stage_task(
                tx,
                &batch.id,
                Stage::Finishing,
                worker,
                sewing.pieces_completed,
            )?;

            let expected = batch.status;
            batch.status = BatchStatus::InFinishing;
            batch.update_at = now_rfc3339();
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event_kind::FINISHER_ASSIGNED,
                actor,
                format!(
                    "finishing assigned to {}, {} pieces handed over",
                    worker, sewing.pieces_completed
                ),
            )?;
            Ok(task)
        })
    }

    // =======================================================================
    // Warehouse / completion
    // =======================================================================

    /// FINISHING_COMPLETED → WAREHOUSE_VERIFIED on the direct path.
    ///
    /// On the split path the batch sits in CUTTING_VERIFIED while its
    /// sub-batches run; warehouse verification is the join barrier and only
    /// passes once every sub-batch is WAREHOUSE_VERIFIED. Sets the batch's
    /// actual/reject quantities from the finishing totals.
    pub fn warehouse_verify(
        &self,
        batch_id: &str,
        actor: &Actor,
    ) -> Result<ProductionBatch, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::WarehouseVerify)?;

            let now = now_rfc3339();
            let (actual, reject) = match batch.status {
                BatchStatus::FinishingCompleted => {
                    let sewing =
                        load_stage_task(tx, batch_id, Stage::Sewing)?.ok_or_else(|| {
                            ServiceError::InvalidState(format!(
                                "batch {} has no sewing task",
                                batch.sku
                            ))
                        })?;
                    let mut finishing =
                        load_stage_task(tx, batch_id, Stage::Finishing)?.ok_or_else(|| {
                            ServiceError::InvalidState(format!(
                                "batch {} has no finishing task",
                                batch.sku
                            ))
                        })?;

                    finishing.status = StageTaskStatus::Verified;
                    finishing.update_at = now.clone();
                    save_task(tx, &finishing)?;

                    (
                        finishing.pieces_completed,
                        sewing.reject_pieces + finishing.reject_pieces,
                    )
                }
                BatchStatus::CuttingVerified => {
                    if batch.pipeline != Some(PipelineMode::Split) {
                        return Err(ServiceError::InvalidState(format!(
                            "batch {} has not entered finishing",
                            batch.sku
                        )));
                    }
                    let subs = load_sub_batches(tx, batch_id)?;
                    if subs.is_empty() {
                        return Err(ServiceError::InvalidState(format!(
                            "batch {} has no sub-batches",
                            batch.sku
                        )));
                    }
                    let unverified = subs
                        .iter()
                        .filter(|s| s.status != SubBatchStatus::WarehouseVerified)
                        .count();
                    if unverified > 0 {
                        return Err(ServiceError::InvalidState(format!(
                            "batch {}: {} of {} sub-batches not yet warehouse-verified",
                            batch.sku,
                            unverified,
                            subs.len()
                        )));
                    }
                    (
                        subs.iter().map(|s| s.finishing_output).sum(),
                        subs.iter()
                            .map(|s| s.sewing_reject + s.finishing_reject)
                            .sum(),
                    )
                }
                // Unreachable: the transition table admits no other source.
                other => {
                    return Err(ServiceError::InvalidState(format!(
                        "batch {}: warehouse_verify not allowed from {}",
                        batch.sku, other
                    )));
                }
            };

            let expected = batch.status;
            batch.actual_quantity = actual;
            batch.reject_quantity = reject;
            batch.status = BatchStatus::WarehouseVerified;
            batch.update_at = now;
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event_kind::WAREHOUSE_VERIFIED,
                actor,
                format!("{} good pieces received, {} rejected", actual, reject),
            )?;

            info!(sku = %batch.sku, actual, reject, "warehouse verified");
            Ok(batch)
        })
    }

    /// WAREHOUSE_VERIFIED → COMPLETED.
    pub fn complete_batch(
        &self,
        batch_id: &str,
        actor: &Actor,
    ) -> Result<ProductionBatch, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::Complete)?;

            let now = now_rfc3339();
            let expected = batch.status;
            batch.completed_date = Some(now.clone());
            batch.status = BatchStatus::Completed;
            batch.update_at = now;
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event_kind::BATCH_COMPLETED,
                actor,
                format!(
                    "batch {} completed: {} of {} target pieces",
                    batch.sku, batch.actual_quantity, batch.target_quantity
                ),
            )?;
            Ok(batch)
        })
    }

    /// PENDING/MATERIAL_REQUESTED → CANCELLED. Nothing has been deducted or
    /// cut yet, so cancellation has no side effects beyond the status.
    pub fn cancel_batch(
        &self,
        batch_id: &str,
        actor: &Actor,
    ) -> Result<ProductionBatch, ServiceError> {
        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::Cancel)?;

            let expected = batch.status;
            batch.status = BatchStatus::Cancelled;
            batch.update_at = now_rfc3339();
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event_kind::BATCH_CANCELLED,
                actor,
                format!("batch {} cancelled", batch.sku),
            )?;
            Ok(batch)
        })
    }

    /// Hard-delete a PENDING or CANCELLED batch and all its children. No
    /// stage work has started, so removal is referentially safe.
    pub fn delete_batch(&self, batch_id: &str) -> Result<(), ServiceError> {
        self.in_txn(|tx| {
            let batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::Delete)?;

            for table in [
                "material_allocations",
                "stage_tasks",
                "cutting_results",
                "sub_batches",
                "timeline_events",
            ] {
                store::delete_records_by(tx, table, "batch_id", &batch.id)?;
            }
            store::delete_record(tx, "batches", &batch.id)?;

            info!(sku = %batch.sku, "batch deleted");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{
        actor, batch_assigned_to_cutter, batch_cutting_verified, pending_batch, svc,
        variant_with_stock,
    };
    use super::*;
    use crate::model::event_kind;

    // Scenario: allocation of 50m against 30m stock — confirm fails, stock
    // untouched, status unchanged.
    #[test]
    fn confirm_fails_on_insufficient_stock() {
        let svc = svc();
        let v = variant_with_stock(&svc, "Cotton", "Red", 30.0);
        let batch = pending_batch(&svc, "TSH-001", &[("M", "Red", 100)], &[(&v.id, 50.0)]);

        let err = svc.confirm_materials(&batch.id, &actor()).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock(_)));

        assert_eq!(svc.get_variant(&v.id).unwrap().stock, 30.0);
        assert_eq!(svc.get_batch(&batch.id).unwrap().status, BatchStatus::Pending);
    }

    // Scenario: allocation of 50m against 100m stock — confirm succeeds,
    // stock drops to 50m, one MATERIAL_ALLOCATED timeline event appended.
    #[test]
    fn confirm_deducts_and_logs() {
        let svc = svc();
        let v = variant_with_stock(&svc, "Cotton", "Red", 100.0);
        let batch = pending_batch(&svc, "TSH-001", &[("M", "Red", 100)], &[(&v.id, 50.0)]);

        let updated = svc.confirm_materials(&batch.id, &actor()).unwrap();
        assert_eq!(updated.status, BatchStatus::MaterialAllocated);
        assert_eq!(svc.get_variant(&v.id).unwrap().stock, 50.0);

        let events = svc.list_timeline(&batch.id).unwrap();
        let allocated: Vec<_> = events
            .iter()
            .filter(|e| e.event == event_kind::MATERIAL_ALLOCATED)
            .collect();
        assert_eq!(allocated.len(), 1);

        // Snapshots froze the pre-deduction level.
        let agg = svc.load_batch_aggregate(&batch.id).unwrap();
        assert_eq!(agg.allocations[0].stock_at_allocation, Some(100.0));
        assert!(agg.allocations[0].confirmed);
    }

    #[test]
    fn confirm_is_all_or_nothing_across_lines() {
        let svc = svc();
        let ok = variant_with_stock(&svc, "Cotton", "Red", 100.0);
        let short = variant_with_stock(&svc, "Cotton", "Blue", 10.0);
        let batch = pending_batch(
            &svc,
            "TSH-002",
            &[("M", "Red", 100)],
            &[(&ok.id, 50.0), (&short.id, 20.0)],
        );

        let err = svc.confirm_materials(&batch.id, &actor()).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock(_)));

        // The sufficient line was not deducted either.
        assert_eq!(svc.get_variant(&ok.id).unwrap().stock, 100.0);
        assert_eq!(svc.get_variant(&short.id).unwrap().stock, 10.0);
        assert_eq!(svc.get_batch(&batch.id).unwrap().status, BatchStatus::Pending);
    }

    #[test]
    fn request_materials_then_confirm() {
        let svc = svc();
        let v = variant_with_stock(&svc, "Cotton", "Red", 100.0);
        let batch = pending_batch(&svc, "TSH-003", &[("M", "Red", 50)], &[(&v.id, 40.0)]);

        let b = svc.request_materials(&batch.id, &actor()).unwrap();
        assert_eq!(b.status, BatchStatus::MaterialRequested);
        let b = svc.confirm_materials(&batch.id, &actor()).unwrap();
        assert_eq!(b.status, BatchStatus::MaterialAllocated);
    }

    // Scenario: cutting results with all zeros — validation failure, status
    // stays ASSIGNED_TO_CUTTER.
    #[test]
    fn zero_cut_output_rejected() {
        let svc = svc();
        let (batch, _task) = batch_assigned_to_cutter(&svc, 100);

        let err = svc
            .input_cutting_results(
                &batch.id,
                vec![
                    CuttingResultInput {
                        product_size: "M".into(),
                        color: "Red".into(),
                        actual_pieces: 0,
                    },
                    CuttingResultInput {
                        product_size: "L".into(),
                        color: "Red".into(),
                        actual_pieces: 0,
                    },
                ],
                &actor(),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(
            svc.get_batch(&batch.id).unwrap().status,
            BatchStatus::AssignedToCutter
        );
    }

    // Scenario: verify-reject with empty notes — validation failure, status
    // unchanged.
    #[test]
    fn reject_requires_notes() {
        let svc = svc();
        let (batch, _task) = batch_assigned_to_cutter(&svc, 100);
        svc.input_cutting_results(
            &batch.id,
            vec![CuttingResultInput {
                product_size: "M".into(),
                color: "Red".into(),
                actual_pieces: 95,
            }],
            &actor(),
        )
        .unwrap();

        let err = svc
            .verify_cutting(&batch.id, VerifyDecision::Reject, "   ", &actor())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(
            svc.get_batch(&batch.id).unwrap().status,
            BatchStatus::CuttingCompleted
        );
    }

    #[test]
    fn reject_returns_work_to_in_cutting_and_repeats_idempotently() {
        let svc = svc();
        let (batch, task) = batch_assigned_to_cutter(&svc, 100);
        svc.input_cutting_results(
            &batch.id,
            vec![CuttingResultInput {
                product_size: "M".into(),
                color: "Red".into(),
                actual_pieces: 95,
            }],
            &actor(),
        )
        .unwrap();

        let b = svc
            .verify_cutting(&batch.id, VerifyDecision::Reject, "edges frayed", &actor())
            .unwrap();
        assert_eq!(b.status, BatchStatus::InCutting);
        let t = svc.get_task(&task.id).unwrap();
        assert_eq!(t.status, StageTaskStatus::InProgress);
        assert_eq!(t.pieces_completed, 95);

        let before_events = svc.list_timeline(&batch.id).unwrap().len();

        // Rejecting again without intervening progress: same state, same
        // counts, one more timeline entry.
        let b = svc
            .verify_cutting(&batch.id, VerifyDecision::Reject, "still frayed", &actor())
            .unwrap();
        assert_eq!(b.status, BatchStatus::InCutting);
        let t = svc.get_task(&task.id).unwrap();
        assert_eq!(t.status, StageTaskStatus::InProgress);
        assert_eq!(t.pieces_completed, 95);
        assert_eq!(svc.list_timeline(&batch.id).unwrap().len(), before_events + 1);

        // Approving from IN_CUTTING is not possible.
        assert!(matches!(
            svc.verify_cutting(&batch.id, VerifyDecision::Approve, "", &actor()),
            Err(ServiceError::InvalidState(_))
        ));

        // Worker re-records and verification approves.
        svc.input_cutting_results(
            &batch.id,
            vec![CuttingResultInput {
                product_size: "M".into(),
                color: "Red".into(),
                actual_pieces: 97,
            }],
            &actor(),
        )
        .unwrap();
        let b = svc
            .verify_cutting(&batch.id, VerifyDecision::Approve, "", &actor())
            .unwrap();
        assert_eq!(b.status, BatchStatus::CuttingVerified);
    }

    #[test]
    fn direct_pipeline_happy_path() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-010", &[("M", "Red", 100)]);

        // Sewing: assigned with the confirmed cut output as input.
        let sewing = svc.assign_sewer(&batch.id, "Rina", &actor()).unwrap();
        assert_eq!(sewing.pieces_received, 100);
        assert_eq!(
            svc.get_batch(&batch.id).unwrap().status,
            BatchStatus::AssignedToSewer
        );

        svc.record_progress(&sewing.id, 60, 2, None, &actor()).unwrap();
        assert_eq!(svc.get_batch(&batch.id).unwrap().status, BatchStatus::InSewing);
        svc.record_progress(&sewing.id, 35, 3, None, &actor()).unwrap();
        svc.complete_task(&sewing.id, None, None, None, &actor()).unwrap();
        assert_eq!(
            svc.get_batch(&batch.id).unwrap().status,
            BatchStatus::SewingCompleted
        );

        let b = svc
            .verify_sewing(&batch.id, VerifyDecision::Approve, "", &actor())
            .unwrap();
        assert_eq!(b.status, BatchStatus::SewingVerified);

        // Finishing receives the sewing good output.
        let finishing = svc.assign_finisher(&batch.id, "Yanti", &actor()).unwrap();
        assert_eq!(finishing.pieces_received, 95);
        assert_eq!(svc.get_batch(&batch.id).unwrap().status, BatchStatus::InFinishing);

        svc.complete_task(&finishing.id, Some(90), Some(3), None, &actor())
            .unwrap();
        assert_eq!(
            svc.get_batch(&batch.id).unwrap().status,
            BatchStatus::FinishingCompleted
        );

        // Warehouse verification aggregates the finishing totals plus the
        // sewing-stage reject.
        let b = svc.warehouse_verify(&batch.id, &actor()).unwrap();
        assert_eq!(b.status, BatchStatus::WarehouseVerified);
        assert_eq!(b.actual_quantity, 90);
        assert_eq!(b.reject_quantity, 5 + 3);

        let b = svc.complete_batch(&batch.id, &actor()).unwrap();
        assert_eq!(b.status, BatchStatus::Completed);
        assert!(b.completed_date.is_some());

        // Terminal: nothing moves anymore.
        assert!(matches!(
            svc.warehouse_verify(&batch.id, &actor()),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn aggregate_exposes_pipeline_branch() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-011", &[("M", "Red", 40)]);

        let agg = svc.load_batch_aggregate(&batch.id).unwrap();
        assert!(matches!(agg.pipeline, PipelineState::NotStarted));
        assert!(agg.cutting_task.is_some());
        assert_eq!(agg.cutting_results.len(), 1);

        svc.assign_sewer(&batch.id, "Rina", &actor()).unwrap();
        let agg = svc.load_batch_aggregate(&batch.id).unwrap();
        match agg.pipeline {
            PipelineState::Direct { sewing_task, finishing_task } => {
                assert!(sewing_task.is_some());
                assert!(finishing_task.is_none());
            }
            other => panic!("expected direct pipeline, got {:?}", other),
        }
    }

    #[test]
    fn illegal_transitions_rejected() {
        let svc = svc();
        let v = variant_with_stock(&svc, "Cotton", "Red", 100.0);
        let batch = pending_batch(&svc, "TSH-020", &[("M", "Red", 10)], &[(&v.id, 5.0)]);

        // Can't skip ahead.
        assert!(matches!(
            svc.complete_batch(&batch.id, &actor()),
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            svc.assign_cutter(&batch.id, "Ujang", &actor()),
            Err(ServiceError::InvalidState(_))
        ));
        assert!(matches!(
            svc.warehouse_verify(&batch.id, &actor()),
            Err(ServiceError::InvalidState(_))
        ));

        // Confirm twice: the second sees MATERIAL_ALLOCATED and refuses.
        svc.confirm_materials(&batch.id, &actor()).unwrap();
        assert!(matches!(
            svc.confirm_materials(&batch.id, &actor()),
            Err(ServiceError::InvalidState(_))
        ));
        // The deduction happened exactly once.
        assert_eq!(svc.get_variant(&v.id).unwrap().stock, 95.0);
    }

    #[test]
    fn cancel_only_before_allocation() {
        let svc = svc();
        let v = variant_with_stock(&svc, "Cotton", "Red", 100.0);
        let batch = pending_batch(&svc, "TSH-021", &[("M", "Red", 10)], &[(&v.id, 5.0)]);

        svc.confirm_materials(&batch.id, &actor()).unwrap();
        assert!(matches!(
            svc.cancel_batch(&batch.id, &actor()),
            Err(ServiceError::InvalidState(_))
        ));

        let other = pending_batch(&svc, "TSH-022", &[("M", "Red", 10)], &[(&v.id, 5.0)]);
        let b = svc.cancel_batch(&other.id, &actor()).unwrap();
        assert_eq!(b.status, BatchStatus::Cancelled);
    }

    #[test]
    fn delete_removes_batch_and_children() {
        let svc = svc();
        let v = variant_with_stock(&svc, "Cotton", "Red", 100.0);
        let batch = pending_batch(&svc, "TSH-023", &[("M", "Red", 10)], &[(&v.id, 5.0)]);

        svc.delete_batch(&batch.id).unwrap();
        assert!(matches!(
            svc.get_batch(&batch.id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            svc.list_timeline(&batch.id),
            Err(ServiceError::NotFound(_))
        ));

        // An in-flight batch refuses deletion.
        let (busy, _task) = batch_assigned_to_cutter(&svc, 10);
        assert!(matches!(
            svc.delete_batch(&busy.id),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn duplicate_sku_conflicts() {
        let svc = svc();
        let v = variant_with_stock(&svc, "Cotton", "Red", 100.0);
        pending_batch(&svc, "TSH-030", &[("M", "Red", 10)], &[(&v.id, 5.0)]);

        let product = svc
            .create_product(super::super::catalog::CreateProductInput {
                name: "Tee".into(),
                description: None,
            })
            .unwrap();
        let err = svc
            .create_batch(
                CreateBatchInput {
                    sku: "TSH-030".into(),
                    product_id: product.id,
                    target_quantity: None,
                    size_color_requests: vec![SizeColorRequest {
                        product_size: "M".into(),
                        color: "Red".into(),
                        requested_pieces: 10,
                    }],
                    allocations: vec![],
                    notes: None,
                },
                &actor(),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn cut_output_bounded_by_received() {
        let svc = svc();
        let (batch, _task) = batch_assigned_to_cutter(&svc, 100);
        let err = svc
            .input_cutting_results(
                &batch.id,
                vec![CuttingResultInput {
                    product_size: "M".into(),
                    color: "Red".into(),
                    actual_pieces: 101,
                }],
                &actor(),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::OverReceived(_)));
    }

    #[test]
    fn every_transition_appends_one_event() {
        let svc = svc();
        let v = variant_with_stock(&svc, "Cotton", "Red", 100.0);
        let batch = pending_batch(&svc, "TSH-040", &[("M", "Red", 50)], &[(&v.id, 25.0)]);
        svc.confirm_materials(&batch.id, &actor()).unwrap();
        svc.assign_cutter(&batch.id, "Ujang", &actor()).unwrap();

        let events = svc.list_timeline(&batch.id).unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                event_kind::BATCH_CREATED,
                event_kind::MATERIAL_ALLOCATED,
                event_kind::CUTTER_ASSIGNED,
            ]
        );
        // Actor identity is captured in each entry.
        assert!(events.iter().all(|e| e.actor == "Dewi (production_chief)"));
    }
}
