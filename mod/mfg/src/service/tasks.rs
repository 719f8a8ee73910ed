//! Stage task operations — the worker-facing side of the pipeline.
//!
//! Cutting, sewing and finishing tasks share one contract: `start`,
//! `record_progress` (accumulating, bounded by pieces received) and
//! `complete` (sewing/finishing only; cutting completes through its result
//! rows). A stage's first activity also bumps the batch from its ASSIGNED
//! state to the matching in-progress state.

use stitcherp_core::{Actor, ServiceError, new_id, now_rfc3339};
use stitcherp_sql::{SqlExec, Value};

use super::timeline::record_event;
use super::MfgService;
use crate::model::{
    BatchStatus, ProductionBatch, Stage, StageTask, StageTaskStatus, WorkflowOp, event_kind,
};
use crate::store;

/// How each stage couples to the batch state machine.
struct StageBinding {
    record_op: WorkflowOp,
    /// ASSIGNED state bumped to `active` on first activity; finishing has
    /// none (the batch enters IN_FINISHING at assignment).
    assigned: Option<BatchStatus>,
    active: BatchStatus,
    started_event: &'static str,
    progress_event: &'static str,
}

fn binding(stage: Stage) -> StageBinding {
    match stage {
        Stage::Cutting => StageBinding {
            record_op: WorkflowOp::RecordCutting,
            assigned: Some(BatchStatus::AssignedToCutter),
            active: BatchStatus::InCutting,
            started_event: event_kind::CUTTING_STARTED,
            progress_event: event_kind::CUTTING_PROGRESS,
        },
        Stage::Sewing => StageBinding {
            record_op: WorkflowOp::RecordSewing,
            assigned: Some(BatchStatus::AssignedToSewer),
            active: BatchStatus::InSewing,
            started_event: event_kind::SEWING_STARTED,
            progress_event: event_kind::SEWING_PROGRESS,
        },
        Stage::Finishing => StageBinding {
            record_op: WorkflowOp::RecordFinishing,
            assigned: None,
            active: BatchStatus::InFinishing,
            started_event: event_kind::FINISHING_STARTED,
            progress_event: event_kind::FINISHING_PROGRESS,
        },
    }
}

/// Load the (single) task for a batch stage, if created.
pub(crate) fn load_stage_task(
    tx: &dyn SqlExec,
    batch_id: &str,
    stage: Stage,
) -> Result<Option<StageTask>, ServiceError> {
    let tasks: Vec<StageTask> = store::list_records_by(
        tx,
        "stage_tasks",
        &[
            ("batch_id", Value::Text(batch_id.to_string())),
            ("stage", Value::Text(stage.as_str().to_string())),
        ],
    )?;
    Ok(tasks.into_iter().next())
}

/// Create a stage task at its ASSIGN transition.
pub(crate) fn create_stage_task(
    tx: &dyn SqlExec,
    batch_id: &str,
    stage: Stage,
    assigned_to: &str,
    pieces_received: i64,
) -> Result<StageTask, ServiceError> {
    let now = now_rfc3339();
    let task = StageTask {
        id: new_id(),
        batch_id: batch_id.to_string(),
        stage,
        assigned_to: assigned_to.to_string(),
        status: StageTaskStatus::Pending,
        pieces_received,
        pieces_completed: 0,
        reject_pieces: 0,
        started_at: None,
        completed_at: None,
        notes: None,
        create_at: now.clone(),
        update_at: now,
    };
    save_task_insert(tx, &task)?;
    Ok(task)
}

fn save_task_insert(tx: &dyn SqlExec, task: &StageTask) -> Result<(), ServiceError> {
    store::insert_record(
        tx,
        "stage_tasks",
        &task.id,
        task,
        &[
            ("batch_id", Value::Text(task.batch_id.clone())),
            ("stage", Value::Text(task.stage.as_str().to_string())),
            ("status", Value::Text(task.status.as_str().to_string())),
            ("assigned_to", Value::Text(task.assigned_to.clone())),
            ("create_at", Value::Text(task.create_at.clone())),
            ("update_at", Value::Text(task.update_at.clone())),
        ],
    )
}

pub(crate) fn save_task(tx: &dyn SqlExec, task: &StageTask) -> Result<(), ServiceError> {
    store::update_record(
        tx,
        "stage_tasks",
        &task.id,
        task,
        &[
            ("status", Value::Text(task.status.as_str().to_string())),
            ("assigned_to", Value::Text(task.assigned_to.clone())),
            ("update_at", Value::Text(task.update_at.clone())),
        ],
    )
}

/// Bump the batch from its ASSIGNED state into the stage's in-progress
/// state on first activity. No-op when already in progress.
fn bump_batch_active(
    tx: &dyn SqlExec,
    batch: &mut ProductionBatch,
    b: &StageBinding,
) -> Result<(), ServiceError> {
    if let Some(assigned) = b.assigned {
        if batch.status == assigned {
            let expected = batch.status;
            batch.status = b.active;
            batch.update_at = now_rfc3339();
            MfgService::save_batch(tx, batch, expected)?;
        }
    }
    Ok(())
}

impl MfgService {
    pub fn get_task(&self, task_id: &str) -> Result<StageTask, ServiceError> {
        store::get_record(self.db(), "stage_tasks", task_id)
    }

    /// Worker starts a stage task: PENDING → IN_PROGRESS.
    pub fn start_task(&self, task_id: &str, actor: &Actor) -> Result<StageTask, ServiceError> {
        self.in_txn(|tx| {
            let mut task: StageTask = store::get_record(tx, "stage_tasks", task_id)?;
            if task.status != StageTaskStatus::Pending {
                return Err(ServiceError::InvalidState(format!(
                    "{} task {}: cannot start from status {}",
                    task.stage, task.id, task.status
                )));
            }
            let b = binding(task.stage);
            let mut batch = Self::load_batch(tx, &task.batch_id)?;
            Self::require_status(&batch, b.record_op)?;

            let now = now_rfc3339();
            task.status = StageTaskStatus::InProgress;
            task.started_at = Some(now.clone());
            task.update_at = now;
            save_task(tx, &task)?;

            bump_batch_active(tx, &mut batch, &b)?;
            record_event(
                tx,
                &batch.id,
                b.started_event,
                actor,
                format!("{} started, {} pieces received", task.stage, task.pieces_received),
            )?;
            Ok(task)
        })
    }

    /// Worker records progress: accumulate completed/reject deltas.
    ///
    /// First call on a PENDING task starts it implicitly. Fails with
    /// `OverReceived` when the cumulative counts would exceed what the stage
    /// received.
    pub fn record_progress(
        &self,
        task_id: &str,
        completed_delta: i64,
        reject_delta: i64,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<StageTask, ServiceError> {
        self.in_txn(|tx| {
            let mut task: StageTask = store::get_record(tx, "stage_tasks", task_id)?;
            if !task.status.accepts_progress() {
                return Err(ServiceError::InvalidState(format!(
                    "{} task {}: cannot record progress from status {}",
                    task.stage, task.id, task.status
                )));
            }
            let b = binding(task.stage);
            let mut batch = Self::load_batch(tx, &task.batch_id)?;
            Self::require_status(&batch, b.record_op)?;

            task.apply_progress(completed_delta, reject_delta)?;

            let now = now_rfc3339();
            if task.status == StageTaskStatus::Pending {
                task.status = StageTaskStatus::InProgress;
                task.started_at = Some(now.clone());
            }
            if let Some(n) = notes {
                task.notes = Some(n);
            }
            task.update_at = now;
            save_task(tx, &task)?;

            bump_batch_active(tx, &mut batch, &b)?;
            record_event(
                tx,
                &batch.id,
                b.progress_event,
                actor,
                format!(
                    "+{} good, +{} reject ({}/{} accounted)",
                    completed_delta,
                    reject_delta,
                    task.pieces_completed + task.reject_pieces,
                    task.pieces_received
                ),
            )?;
            Ok(task)
        })
    }

    /// Worker marks a sewing/finishing task complete.
    ///
    /// `final_completed` / `final_reject`, when given, replace the cumulative
    /// totals. Completion requires a strictly positive good output; short
    /// output (completed < received) is allowed. Cutting is excluded — it
    /// completes through its per-size/color result rows.
    pub fn complete_task(
        &self,
        task_id: &str,
        final_completed: Option<i64>,
        final_reject: Option<i64>,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<StageTask, ServiceError> {
        self.in_txn(|tx| {
            let mut task: StageTask = store::get_record(tx, "stage_tasks", task_id)?;

            let (op, next, event) = match task.stage {
                Stage::Cutting => {
                    return Err(ServiceError::InvalidState(
                        "cutting completes through cutting results, not complete_task".into(),
                    ));
                }
                Stage::Sewing => (
                    WorkflowOp::CompleteSewing,
                    BatchStatus::SewingCompleted,
                    event_kind::SEWING_COMPLETED,
                ),
                Stage::Finishing => (
                    WorkflowOp::CompleteFinishing,
                    BatchStatus::FinishingCompleted,
                    event_kind::FINISHING_COMPLETED,
                ),
            };

            if !task.status.accepts_progress() {
                return Err(ServiceError::InvalidState(format!(
                    "{} task {}: cannot complete from status {}",
                    task.stage, task.id, task.status
                )));
            }

            let mut batch = Self::load_batch(tx, &task.batch_id)?;
            Self::require_status(&batch, op)?;

            let completed = final_completed.unwrap_or(task.pieces_completed);
            let reject = final_reject.unwrap_or(task.reject_pieces);
            if completed < 0 || reject < 0 {
                return Err(ServiceError::Validation(
                    "final totals must be non-negative".into(),
                ));
            }
            if completed == 0 {
                return Err(ServiceError::Validation(format!(
                    "{} task {}: cannot complete with zero good output",
                    task.stage, task.id
                )));
            }
            if completed + reject > task.pieces_received {
                return Err(ServiceError::OverReceived(format!(
                    "{} task {}: completed {} + reject {} exceeds received {}",
                    task.stage, task.id, completed, reject, task.pieces_received
                )));
            }

            let now = now_rfc3339();
            task.pieces_completed = completed;
            task.reject_pieces = reject;
            task.status = StageTaskStatus::Completed;
            if task.started_at.is_none() {
                task.started_at = Some(now.clone());
            }
            task.completed_at = Some(now.clone());
            if let Some(n) = notes {
                task.notes = Some(n);
            }
            task.update_at = now.clone();
            save_task(tx, &task)?;

            let expected = batch.status;
            batch.status = next;
            batch.update_at = now;
            Self::save_batch(tx, &batch, expected)?;

            record_event(
                tx,
                &batch.id,
                event,
                actor,
                format!(
                    "{} completed: {} good, {} reject of {} received",
                    task.stage, completed, reject, task.pieces_received
                ),
            )?;
            Ok(task)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{actor, batch_assigned_to_cutter, svc};
    use crate::model::StageTaskStatus;
    use stitcherp_core::ServiceError;

    // Scenario: task received 100 pieces; progress accumulates to the bound
    // and one more piece fails.
    #[test]
    fn progress_accumulates_and_bounds() {
        let svc = svc();
        let (batch, task) = batch_assigned_to_cutter(&svc, 100);

        svc.record_progress(&task.id, 40, 5, None, &actor()).unwrap();
        let t = svc.record_progress(&task.id, 45, 5, None, &actor()).unwrap();
        assert_eq!(t.pieces_completed, 85);
        assert_eq!(t.reject_pieces, 10);

        // Filling up to exactly the received count succeeds.
        let t = svc.record_progress(&task.id, 5, 0, None, &actor()).unwrap();
        assert_eq!(t.pieces_completed + t.reject_pieces, 100);

        // One more piece fails OverReceived and changes nothing.
        let err = svc.record_progress(&task.id, 1, 0, None, &actor()).unwrap_err();
        assert!(matches!(err, ServiceError::OverReceived(_)));
        let t = svc.get_task(&task.id).unwrap();
        assert_eq!(t.pieces_completed, 90);
        assert_eq!(t.reject_pieces, 10);

        // Batch went to IN_CUTTING on first progress.
        let b = svc.get_batch(&batch.id).unwrap();
        assert_eq!(b.status.as_str(), "IN_CUTTING");
    }

    #[test]
    fn first_progress_starts_pending_task() {
        let svc = svc();
        let (_batch, task) = batch_assigned_to_cutter(&svc, 50);
        assert_eq!(task.status, StageTaskStatus::Pending);

        let t = svc.record_progress(&task.id, 10, 0, None, &actor()).unwrap();
        assert_eq!(t.status, StageTaskStatus::InProgress);
        assert!(t.started_at.is_some());
    }

    #[test]
    fn explicit_start_then_double_start_fails() {
        let svc = svc();
        let (_batch, task) = batch_assigned_to_cutter(&svc, 50);
        svc.start_task(&task.id, &actor()).unwrap();
        assert!(matches!(
            svc.start_task(&task.id, &actor()),
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[test]
    fn cutting_cannot_use_complete_task() {
        let svc = svc();
        let (_batch, task) = batch_assigned_to_cutter(&svc, 50);
        svc.record_progress(&task.id, 50, 0, None, &actor()).unwrap();
        let err = svc
            .complete_task(&task.id, None, None, None, &actor())
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[test]
    fn negative_deltas_rejected() {
        let svc = svc();
        let (_batch, task) = batch_assigned_to_cutter(&svc, 50);
        assert!(matches!(
            svc.record_progress(&task.id, -1, 0, None, &actor()),
            Err(ServiceError::Validation(_))
        ));
    }
}
