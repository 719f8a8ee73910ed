pub mod catalog;
pub mod schema;
pub mod split;
pub mod stock;
pub mod tasks;
pub mod timeline;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testutil;

use std::sync::Arc;

use stitcherp_core::ServiceError;
use stitcherp_sql::{SQLError, SQLStore, SqlExec, Value};

use crate::model::{BatchStatus, ProductionBatch, WorkflowOp};
use crate::store;

/// Manufacturing service — owns the production batch workflow.
///
/// Every mutating operation runs inside one transaction ([`Self::in_txn`]):
/// it loads the batch aggregate, checks preconditions against the transition
/// table, applies effects, and appends the timeline event. A failed
/// precondition leaves no partial state behind.
pub struct MfgService {
    pub(crate) sql: Arc<dyn SQLStore>,
}

impl MfgService {
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Self { sql })
    }

    /// Statement surface for plain (non-transactional) reads.
    pub(crate) fn db(&self) -> &dyn SqlExec {
        self.sql.as_ref()
    }

    /// Run `f` inside one all-or-nothing transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back on `Err` and returns the
    /// domain error untouched — the storage-level abort never masks it.
    pub(crate) fn in_txn<T>(
        &self,
        f: impl FnOnce(&dyn SqlExec) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut slot: Option<Result<T, ServiceError>> = None;
        let mut f = Some(f);

        let txn_result = self.sql.transact(&mut |tx| {
            let Some(f) = f.take() else {
                return Err(SQLError::Aborted);
            };
            match f(tx) {
                Ok(v) => {
                    slot = Some(Ok(v));
                    Ok(())
                }
                Err(e) => {
                    slot = Some(Err(e));
                    Err(SQLError::Aborted)
                }
            }
        });

        match slot {
            Some(result) => {
                // Commit itself can still fail after `f` succeeded.
                if let (Ok(_), Err(e)) = (&result, &txn_result) {
                    if !matches!(e, SQLError::Aborted) {
                        return Err(ServiceError::Storage(e.to_string()));
                    }
                }
                result
            }
            None => Err(match txn_result {
                Err(e) => ServiceError::Storage(e.to_string()),
                Ok(()) => ServiceError::Internal("transaction produced no result".into()),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Batch plumbing shared by workflow / tasks / split
    // -----------------------------------------------------------------------

    /// Load a batch inside the current statement surface.
    pub(crate) fn load_batch(tx: &dyn SqlExec, id: &str) -> Result<ProductionBatch, ServiceError> {
        store::get_record(tx, "batches", id)
    }

    /// Check the transition table: is `op` legal from the batch's status?
    ///
    /// This is the only place legal edges are checked — every operation goes
    /// through here before touching anything.
    pub(crate) fn require_status(
        batch: &ProductionBatch,
        op: WorkflowOp,
    ) -> Result<(), ServiceError> {
        let allowed = BatchStatus::allowed_from(op);
        if !allowed.contains(&batch.status) {
            return Err(ServiceError::InvalidState(format!(
                "batch {}: {} not allowed from status {}",
                batch.sku, op, batch.status
            )));
        }
        Ok(())
    }

    /// Persist a batch, guarded by a compare-and-swap on the status column.
    ///
    /// `expected` is the status the batch had when this operation loaded it.
    /// A concurrent writer that got in first makes the guard miss; the loser
    /// sees `InvalidState` and the whole transaction rolls back.
    pub(crate) fn save_batch(
        tx: &dyn SqlExec,
        batch: &ProductionBatch,
        expected: BatchStatus,
    ) -> Result<(), ServiceError> {
        let updated = store::update_record_guarded(
            tx,
            "batches",
            &batch.id,
            batch,
            &[
                ("status", Value::Text(batch.status.as_str().to_string())),
                ("update_at", Value::Text(batch.update_at.clone())),
            ],
            ("status", Value::Text(expected.as_str().to_string())),
        )?;
        if !updated {
            return Err(ServiceError::InvalidState(format!(
                "batch {} was modified concurrently, reload and retry",
                batch.sku
            )));
        }
        Ok(())
    }
}
