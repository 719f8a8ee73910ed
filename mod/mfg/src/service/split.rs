//! SubBatchSplitter — fan a verified cut output across multiple sewers and
//! finishers, then join the results back into the parent batch.
//!
//! Each sub-batch runs its own nine-edge pipeline independently; the parent
//! batch stays in CUTTING_VERIFIED until `warehouse_verify` passes the join
//! barrier (every sub-batch WAREHOUSE_VERIFIED).

use std::collections::HashMap;

use tracing::info;

use stitcherp_core::{Actor, ServiceError, new_id, now_rfc3339};
use stitcherp_sql::{SqlExec, Value};

use super::timeline::record_event;
use super::workflow::{VerifyDecision, load_cutting_results};
use super::MfgService;
use crate::model::{
    PipelineMode, SubBatch, SubBatchItem, SubBatchOp, SubBatchStatus, WorkflowOp, event_kind,
};
use crate::store;

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubBatchGroupInput {
    /// Sewer this slice is destined for.
    pub sewer: String,
    pub items: Vec<SubBatchItemInput>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubBatchItemInput {
    pub product_size: String,
    pub color: String,
    pub pieces: i64,
}

pub(crate) fn load_sub_batches(
    tx: &dyn SqlExec,
    batch_id: &str,
) -> Result<Vec<SubBatch>, ServiceError> {
    store::list_records_by(
        tx,
        "sub_batches",
        &[("batch_id", Value::Text(batch_id.to_string()))],
    )
}

fn save_sub_batch(tx: &dyn SqlExec, sub: &SubBatch) -> Result<(), ServiceError> {
    store::update_record(
        tx,
        "sub_batches",
        &sub.id,
        sub,
        &[
            ("status", Value::Text(sub.status.as_str().to_string())),
            ("update_at", Value::Text(sub.update_at.clone())),
        ],
    )
}

fn require_sub_status(sub: &SubBatch, op: SubBatchOp) -> Result<(), ServiceError> {
    let allowed = SubBatchStatus::allowed_from(op);
    if !allowed.contains(&sub.status) {
        return Err(ServiceError::InvalidState(format!(
            "sub-batch {}: {} not allowed from status {}",
            sub.sku, op, sub.status
        )));
    }
    Ok(())
}

impl MfgService {
    // =======================================================================
    // Splitting
    // =======================================================================

    /// Partition (part of) the confirmed cut output into sub-batches, one
    /// per group, each bound to a sewer. The batch stays CUTTING_VERIFIED.
    ///
    /// For every (size, color) the group pieces must fit into what remains
    /// unassigned across all sub-batches already created — a piece unit
    /// belongs to at most one sub-batch. Fails with `OverAllocation`
    /// otherwise and creates nothing.
    pub fn create_sub_batches(
        &self,
        batch_id: &str,
        groups: Vec<SubBatchGroupInput>,
        actor: &Actor,
    ) -> Result<Vec<SubBatch>, ServiceError> {
        if groups.is_empty() {
            return Err(ServiceError::Validation(
                "at least one sub-batch group is required".into(),
            ));
        }
        for g in &groups {
            if g.sewer.trim().is_empty() {
                return Err(ServiceError::Validation("sub-batch sewer is required".into()));
            }
            if g.items.is_empty() {
                return Err(ServiceError::Validation(
                    "sub-batch group has no items".into(),
                ));
            }
            for item in &g.items {
                if item.pieces <= 0 {
                    return Err(ServiceError::Validation(format!(
                        "pieces for {}/{} must be positive",
                        item.product_size, item.color
                    )));
                }
            }
        }

        self.in_txn(|tx| {
            let mut batch = Self::load_batch(tx, batch_id)?;
            Self::require_status(&batch, WorkflowOp::CreateSubBatches)?;
            if batch.pipeline == Some(PipelineMode::Direct) {
                return Err(ServiceError::InvalidState(format!(
                    "batch {} already has a directly assigned sewer",
                    batch.sku
                )));
            }

            // Confirmed output minus everything already carved out, keyed by
            // (size, color).
            let mut remaining: HashMap<(String, String), i64> = HashMap::new();
            for r in load_cutting_results(tx, batch_id)? {
                if r.is_confirmed {
                    *remaining
                        .entry((r.product_size.clone(), r.color.clone()))
                        .or_insert(0) += r.actual_pieces;
                }
            }
            let existing = load_sub_batches(tx, batch_id)?;
            for sub in &existing {
                for item in &sub.items {
                    *remaining
                        .entry((item.product_size.clone(), item.color.clone()))
                        .or_insert(0) -= item.pieces;
                }
            }

            // Validate the whole request before creating anything.
            for g in &groups {
                for item in &g.items {
                    let key = (item.product_size.clone(), item.color.clone());
                    let left = remaining.get(&key).copied().unwrap_or(0);
                    if item.pieces > left {
                        return Err(ServiceError::OverAllocation(format!(
                            "batch {}: {}/{} has {} unassigned pieces, group for {} wants {}",
                            batch.sku, item.product_size, item.color, left, g.sewer, item.pieces
                        )));
                    }
                    *remaining.entry(key).or_insert(0) -= item.pieces;
                }
            }

            let now = now_rfc3339();
            let mut created = Vec::with_capacity(groups.len());
            let mut total_pieces = 0i64;
            for (i, g) in groups.iter().enumerate() {
                let items: Vec<SubBatchItem> = g
                    .items
                    .iter()
                    .map(|it| SubBatchItem {
                        product_size: it.product_size.clone(),
                        color: it.color.clone(),
                        pieces: it.pieces,
                    })
                    .collect();
                let pieces_assigned: i64 = items.iter().map(|it| it.pieces).sum();
                total_pieces += pieces_assigned;

                let sub = SubBatch {
                    id: new_id(),
                    batch_id: batch.id.clone(),
                    sku: format!("{}-S{}", batch.sku, existing.len() + i + 1),
                    pieces_assigned,
                    sewing_output: 0,
                    sewing_reject: 0,
                    finishing_output: 0,
                    finishing_reject: 0,
                    status: SubBatchStatus::AssignedToSewer,
                    assigned_sewer: g.sewer.clone(),
                    assigned_finisher: None,
                    items,
                    notes: None,
                    create_at: now.clone(),
                    update_at: now.clone(),
                };
                store::insert_record(
                    tx,
                    "sub_batches",
                    &sub.id,
                    &sub,
                    &[
                        ("batch_id", Value::Text(sub.batch_id.clone())),
                        ("sku", Value::Text(sub.sku.clone())),
                        ("status", Value::Text(sub.status.as_str().to_string())),
                        ("create_at", Value::Text(now.clone())),
                        ("update_at", Value::Text(now.clone())),
                    ],
                )?;
                created.push(sub);
            }

            if batch.pipeline.is_none() {
                let expected = batch.status;
                batch.pipeline = Some(PipelineMode::Split);
                batch.update_at = now;
                Self::save_batch(tx, &batch, expected)?;
            }

            record_event(
                tx,
                &batch.id,
                event_kind::SUB_BATCHES_CREATED,
                actor,
                format!(
                    "{} sub-batches created, {} pieces assigned",
                    created.len(),
                    total_pieces
                ),
            )?;

            info!(sku = %batch.sku, count = created.len(), "sub-batches created");
            Ok(created)
        })
    }

    pub fn get_sub_batch(&self, id: &str) -> Result<SubBatch, ServiceError> {
        store::get_record(self.db(), "sub_batches", id)
    }

    pub fn list_sub_batches(&self, batch_id: &str) -> Result<Vec<SubBatch>, ServiceError> {
        let _ = self.get_batch(batch_id)?;
        load_sub_batches(self.db(), batch_id)
    }

    // =======================================================================
    // Sub-batch pipeline — one transition per operation
    // =======================================================================

    /// Shared transition runner: load, check the mini transition table, let
    /// `mutate` set the new status and fields, persist, append the event.
    fn sub_transition(
        &self,
        sub_id: &str,
        op: SubBatchOp,
        event: &'static str,
        actor: &Actor,
        mutate: impl FnOnce(&mut SubBatch) -> Result<String, ServiceError>,
    ) -> Result<SubBatch, ServiceError> {
        self.in_txn(|tx| {
            let mut sub: SubBatch = store::get_record(tx, "sub_batches", sub_id)?;
            require_sub_status(&sub, op)?;

            let details = mutate(&mut sub)?;
            sub.update_at = now_rfc3339();
            save_sub_batch(tx, &sub)?;

            record_event(tx, &sub.batch_id, event, actor, details)?;
            Ok(sub)
        })
    }

    pub fn start_sub_sewing(&self, sub_id: &str, actor: &Actor) -> Result<SubBatch, ServiceError> {
        self.sub_transition(
            sub_id,
            SubBatchOp::StartSewing,
            event_kind::SUB_BATCH_SEWING_STARTED,
            actor,
            |sub| {
                sub.status = SubBatchStatus::SewingInProgress;
                Ok(format!(
                    "{}: sewing started by {} on {} pieces",
                    sub.sku, sub.assigned_sewer, sub.pieces_assigned
                ))
            },
        )
    }

    /// Record the sewing outcome and close the sewing half.
    ///
    /// Short output is allowed; zero output is not; output + reject is
    /// bounded by the pieces assigned.
    pub fn complete_sub_sewing(
        &self,
        sub_id: &str,
        output: i64,
        reject: i64,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<SubBatch, ServiceError> {
        self.sub_transition(
            sub_id,
            SubBatchOp::CompleteSewing,
            event_kind::SUB_BATCH_SEWING_COMPLETED,
            actor,
            |sub| {
                if output <= 0 || reject < 0 {
                    return Err(ServiceError::Validation(format!(
                        "sub-batch {}: sewing output must be positive and reject non-negative",
                        sub.sku
                    )));
                }
                if output + reject > sub.pieces_assigned {
                    return Err(ServiceError::OverReceived(format!(
                        "sub-batch {}: output {} + reject {} exceeds {} assigned",
                        sub.sku, output, reject, sub.pieces_assigned
                    )));
                }
                sub.sewing_output = output;
                sub.sewing_reject = reject;
                sub.status = SubBatchStatus::SewingCompleted;
                if let Some(n) = notes {
                    sub.notes = Some(n);
                }
                Ok(format!(
                    "{}: sewing done, {} good / {} reject of {}",
                    sub.sku, output, reject, sub.pieces_assigned
                ))
            },
        )
    }

    /// Supervisor decision on the sewing outcome. Reject (notes required)
    /// returns the sub-batch to SEWING_IN_PROGRESS.
    pub fn confirm_sub_sewing(
        &self,
        sub_id: &str,
        decision: VerifyDecision,
        notes: &str,
        actor: &Actor,
    ) -> Result<SubBatch, ServiceError> {
        match decision {
            VerifyDecision::Approve => self.sub_transition(
                sub_id,
                SubBatchOp::ConfirmSewing,
                event_kind::SUB_BATCH_SEWING_CONFIRMED,
                actor,
                |sub| {
                    sub.status = SubBatchStatus::SewingConfirmed;
                    Ok(format!("{}: {} sewn pieces confirmed", sub.sku, sub.sewing_output))
                },
            ),
            VerifyDecision::Reject => {
                if notes.trim().is_empty() {
                    return Err(ServiceError::Validation(
                        "rejection requires non-empty notes".into(),
                    ));
                }
                self.sub_transition(
                    sub_id,
                    SubBatchOp::ConfirmSewing,
                    event_kind::SUB_BATCH_SEWING_REJECTED,
                    actor,
                    |sub| {
                        sub.status = SubBatchStatus::SewingInProgress;
                        Ok(format!("{}: sewing rejected — {}", sub.sku, notes))
                    },
                )
            }
        }
    }

    pub fn assign_sub_finisher(
        &self,
        sub_id: &str,
        worker: &str,
        actor: &Actor,
    ) -> Result<SubBatch, ServiceError> {
        if worker.trim().is_empty() {
            return Err(ServiceError::Validation("finisher is required".into()));
        }
        let worker = worker.to_string();
        self.sub_transition(
            sub_id,
            SubBatchOp::AssignFinisher,
            event_kind::SUB_BATCH_FINISHER_ASSIGNED,
            actor,
            move |sub| {
                sub.assigned_finisher = Some(worker.clone());
                sub.status = SubBatchStatus::AssignedToFinisher;
                Ok(format!(
                    "{}: finishing assigned to {}, {} pieces handed over",
                    sub.sku, worker, sub.sewing_output
                ))
            },
        )
    }

    pub fn start_sub_finishing(
        &self,
        sub_id: &str,
        actor: &Actor,
    ) -> Result<SubBatch, ServiceError> {
        self.sub_transition(
            sub_id,
            SubBatchOp::StartFinishing,
            event_kind::SUB_BATCH_FINISHING_STARTED,
            actor,
            |sub| {
                sub.status = SubBatchStatus::FinishingInProgress;
                Ok(format!("{}: finishing started", sub.sku))
            },
        )
    }

    /// Record the finishing outcome; bounded by the sewing good output.
    pub fn complete_sub_finishing(
        &self,
        sub_id: &str,
        output: i64,
        reject: i64,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<SubBatch, ServiceError> {
        self.sub_transition(
            sub_id,
            SubBatchOp::CompleteFinishing,
            event_kind::SUB_BATCH_FINISHING_COMPLETED,
            actor,
            |sub| {
                if output <= 0 || reject < 0 {
                    return Err(ServiceError::Validation(format!(
                        "sub-batch {}: finishing output must be positive and reject non-negative",
                        sub.sku
                    )));
                }
                if output + reject > sub.sewing_output {
                    return Err(ServiceError::OverReceived(format!(
                        "sub-batch {}: output {} + reject {} exceeds {} received from sewing",
                        sub.sku, output, reject, sub.sewing_output
                    )));
                }
                sub.finishing_output = output;
                sub.finishing_reject = reject;
                sub.status = SubBatchStatus::FinishingCompleted;
                if let Some(n) = notes {
                    sub.notes = Some(n);
                }
                Ok(format!(
                    "{}: finishing done, {} good / {} reject of {}",
                    sub.sku, output, reject, sub.sewing_output
                ))
            },
        )
    }

    /// Supervisor decision on the finishing outcome. Reject (notes required)
    /// returns the sub-batch to FINISHING_IN_PROGRESS.
    pub fn confirm_sub_finishing(
        &self,
        sub_id: &str,
        decision: VerifyDecision,
        notes: &str,
        actor: &Actor,
    ) -> Result<SubBatch, ServiceError> {
        match decision {
            VerifyDecision::Approve => self.sub_transition(
                sub_id,
                SubBatchOp::ConfirmFinishing,
                event_kind::SUB_BATCH_FINISHING_CONFIRMED,
                actor,
                |sub| {
                    sub.status = SubBatchStatus::FinishingConfirmed;
                    Ok(format!(
                        "{}: {} finished pieces confirmed",
                        sub.sku, sub.finishing_output
                    ))
                },
            ),
            VerifyDecision::Reject => {
                if notes.trim().is_empty() {
                    return Err(ServiceError::Validation(
                        "rejection requires non-empty notes".into(),
                    ));
                }
                self.sub_transition(
                    sub_id,
                    SubBatchOp::ConfirmFinishing,
                    event_kind::SUB_BATCH_FINISHING_REJECTED,
                    actor,
                    |sub| {
                        sub.status = SubBatchStatus::FinishingInProgress;
                        Ok(format!("{}: finishing rejected — {}", sub.sku, notes))
                    },
                )
            }
        }
    }

    pub fn submit_sub_to_warehouse(
        &self,
        sub_id: &str,
        actor: &Actor,
    ) -> Result<SubBatch, ServiceError> {
        self.sub_transition(
            sub_id,
            SubBatchOp::SubmitToWarehouse,
            event_kind::SUB_BATCH_SUBMITTED,
            actor,
            |sub| {
                sub.status = SubBatchStatus::SubmittedToWarehouse;
                Ok(format!(
                    "{}: {} pieces submitted to warehouse",
                    sub.sku, sub.finishing_output
                ))
            },
        )
    }

    /// Warehouse counts the sub-batch in; the last verification unblocks the
    /// parent's `warehouse_verify`.
    pub fn verify_sub_warehouse(
        &self,
        sub_id: &str,
        actor: &Actor,
    ) -> Result<SubBatch, ServiceError> {
        self.sub_transition(
            sub_id,
            SubBatchOp::VerifyWarehouse,
            event_kind::SUB_BATCH_WAREHOUSE_VERIFIED,
            actor,
            |sub| {
                sub.status = SubBatchStatus::WarehouseVerified;
                Ok(format!(
                    "{}: verified, {} good / {} total reject",
                    sub.sku,
                    sub.finishing_output,
                    sub.sewing_reject + sub.finishing_reject
                ))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{actor, batch_cutting_verified, svc};
    use super::*;
    use crate::model::BatchStatus;
    use stitcherp_core::ServiceError;

    fn group(sewer: &str, size: &str, color: &str, pieces: i64) -> SubBatchGroupInput {
        SubBatchGroupInput {
            sewer: sewer.into(),
            items: vec![SubBatchItemInput {
                product_size: size.into(),
                color: color.into(),
                pieces,
            }],
        }
    }

    /// Drive one sub-batch through its whole pipeline.
    fn run_sub_to_verified(svc: &super::MfgService, sub_id: &str, output: i64, reject: i64) {
        svc.start_sub_sewing(sub_id, &actor()).unwrap();
        svc.complete_sub_sewing(sub_id, output, reject, None, &actor()).unwrap();
        svc.confirm_sub_sewing(sub_id, VerifyDecision::Approve, "", &actor()).unwrap();
        svc.assign_sub_finisher(sub_id, "Yanti", &actor()).unwrap();
        svc.start_sub_finishing(sub_id, &actor()).unwrap();
        svc.complete_sub_finishing(sub_id, output, 0, None, &actor()).unwrap();
        svc.confirm_sub_finishing(sub_id, VerifyDecision::Approve, "", &actor()).unwrap();
        svc.submit_sub_to_warehouse(sub_id, &actor()).unwrap();
        svc.verify_sub_warehouse(sub_id, &actor()).unwrap();
    }

    // Scenario: 100 confirmed (M, Red) pieces; 60 then 50 for the same pair
    // — the second creation over-allocates.
    #[test]
    fn second_split_over_allocates() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-100", &[("M", "Red", 100)]);

        let first = svc
            .create_sub_batches(&batch.id, vec![group("Rina", "M", "Red", 60)], &actor())
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].pieces_assigned, 60);

        let err = svc
            .create_sub_batches(&batch.id, vec![group("Sari", "M", "Red", 50)], &actor())
            .unwrap_err();
        assert!(matches!(err, ServiceError::OverAllocation(_)));

        // A fitting remainder still works.
        let second = svc
            .create_sub_batches(&batch.id, vec![group("Sari", "M", "Red", 40)], &actor())
            .unwrap();
        assert_eq!(second[0].pieces_assigned, 40);
    }

    #[test]
    fn over_allocation_within_one_call_creates_nothing() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-101", &[("M", "Red", 100)]);

        let err = svc
            .create_sub_batches(
                &batch.id,
                vec![group("Rina", "M", "Red", 60), group("Sari", "M", "Red", 50)],
                &actor(),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::OverAllocation(_)));
        assert!(svc.list_sub_batches(&batch.id).unwrap().is_empty());
    }

    #[test]
    fn unknown_size_color_over_allocates() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-102", &[("M", "Red", 100)]);
        let err = svc
            .create_sub_batches(&batch.id, vec![group("Rina", "XL", "Red", 1)], &actor())
            .unwrap_err();
        assert!(matches!(err, ServiceError::OverAllocation(_)));
    }

    #[test]
    fn sub_batch_skus_number_sequentially() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-103", &[("M", "Red", 100)]);
        let first = svc
            .create_sub_batches(&batch.id, vec![group("Rina", "M", "Red", 30)], &actor())
            .unwrap();
        let second = svc
            .create_sub_batches(&batch.id, vec![group("Sari", "M", "Red", 30)], &actor())
            .unwrap();
        assert_eq!(first[0].sku, "TSH-103-S1");
        assert_eq!(second[0].sku, "TSH-103-S2");
    }

    #[test]
    fn split_and_direct_paths_are_exclusive() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-104", &[("M", "Red", 100)]);
        svc.create_sub_batches(&batch.id, vec![group("Rina", "M", "Red", 50)], &actor())
            .unwrap();

        // Still CUTTING_VERIFIED, but the branch is taken.
        let b = svc.get_batch(&batch.id).unwrap();
        assert_eq!(b.status, BatchStatus::CuttingVerified);
        assert!(matches!(
            svc.assign_sewer(&batch.id, "Sari", &actor()),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn direct_path_refuses_split() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-105", &[("M", "Red", 100)]);
        svc.assign_sewer(&batch.id, "Rina", &actor()).unwrap();

        // Status moved off CUTTING_VERIFIED, so the transition table rejects.
        assert!(matches!(
            svc.create_sub_batches(&batch.id, vec![group("Sari", "M", "Red", 10)], &actor()),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn sub_pipeline_enforces_order_and_bounds() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-106", &[("M", "Red", 100)]);
        let subs = svc
            .create_sub_batches(&batch.id, vec![group("Rina", "M", "Red", 60)], &actor())
            .unwrap();
        let sub = &subs[0];

        // Completing before starting is out of order.
        assert!(matches!(
            svc.complete_sub_sewing(&sub.id, 60, 0, None, &actor()),
            Err(ServiceError::InvalidState(_))
        ));

        svc.start_sub_sewing(&sub.id, &actor()).unwrap();

        // Output bounded by assignment.
        assert!(matches!(
            svc.complete_sub_sewing(&sub.id, 58, 3, None, &actor()),
            Err(ServiceError::OverReceived(_))
        ));
        // Zero output is not a completion.
        assert!(matches!(
            svc.complete_sub_sewing(&sub.id, 0, 5, None, &actor()),
            Err(ServiceError::Validation(_))
        ));

        svc.complete_sub_sewing(&sub.id, 55, 5, None, &actor()).unwrap();

        // Sewing reject requires notes, then sends work back.
        assert!(matches!(
            svc.confirm_sub_sewing(&sub.id, VerifyDecision::Reject, "", &actor()),
            Err(ServiceError::Validation(_))
        ));
        let s = svc
            .confirm_sub_sewing(&sub.id, VerifyDecision::Reject, "loose seams", &actor())
            .unwrap();
        assert_eq!(s.status, SubBatchStatus::SewingInProgress);

        svc.complete_sub_sewing(&sub.id, 56, 4, None, &actor()).unwrap();
        svc.confirm_sub_sewing(&sub.id, VerifyDecision::Approve, "", &actor())
            .unwrap();
        svc.assign_sub_finisher(&sub.id, "Yanti", &actor()).unwrap();
        svc.start_sub_finishing(&sub.id, &actor()).unwrap();

        // Finishing bounded by the sewing good output.
        assert!(matches!(
            svc.complete_sub_finishing(&sub.id, 55, 2, None, &actor()),
            Err(ServiceError::OverReceived(_))
        ));
        let s = svc
            .complete_sub_finishing(&sub.id, 54, 2, None, &actor())
            .unwrap();
        assert_eq!(s.status, SubBatchStatus::FinishingCompleted);
        assert_eq!(s.finishing_output, 54);
    }

    #[test]
    fn parent_joins_only_after_every_sub_batch_verified() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-107", &[("M", "Red", 60), ("L", "Red", 40)]);
        let subs = svc
            .create_sub_batches(
                &batch.id,
                vec![group("Rina", "M", "Red", 60), group("Sari", "L", "Red", 40)],
                &actor(),
            )
            .unwrap();

        run_sub_to_verified(&svc, &subs[0].id, 58, 2);

        // One sub-batch still unverified: the barrier holds.
        let err = svc.warehouse_verify(&batch.id, &actor()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(
            svc.get_batch(&batch.id).unwrap().status,
            BatchStatus::CuttingVerified
        );

        run_sub_to_verified(&svc, &subs[1].id, 37, 3);

        let b = svc.warehouse_verify(&batch.id, &actor()).unwrap();
        assert_eq!(b.status, BatchStatus::WarehouseVerified);
        // Good output sums finishing outputs; reject accumulates sewing and
        // finishing rejects across sub-batches.
        assert_eq!(b.actual_quantity, 58 + 37);
        assert_eq!(b.reject_quantity, 2 + 3);

        let b = svc.complete_batch(&batch.id, &actor()).unwrap();
        assert_eq!(b.status, BatchStatus::Completed);
    }

    #[test]
    fn split_completeness_never_exceeds_confirmed_output() {
        let svc = svc();
        let batch = batch_cutting_verified(&svc, "TSH-108", &[("M", "Red", 100)]);
        svc.create_sub_batches(&batch.id, vec![group("A", "M", "Red", 40)], &actor())
            .unwrap();
        svc.create_sub_batches(&batch.id, vec![group("B", "M", "Red", 40)], &actor())
            .unwrap();
        svc.create_sub_batches(&batch.id, vec![group("C", "M", "Red", 20)], &actor())
            .unwrap();

        let total_assigned: i64 = svc
            .list_sub_batches(&batch.id)
            .unwrap()
            .iter()
            .map(|s| s.pieces_assigned)
            .sum();
        assert_eq!(total_assigned, 100);

        // Fully carved: nothing left for a fourth.
        assert!(matches!(
            svc.create_sub_batches(&batch.id, vec![group("D", "M", "Red", 1)], &actor()),
            Err(ServiceError::OverAllocation(_))
        ));
    }
}
