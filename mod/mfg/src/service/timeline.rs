//! TimelineRecorder — append-only audit log per batch.
//!
//! Pure side-effect log: no business logic, never mutated, never deleted
//! (except together with a hard-deleted batch).

use stitcherp_core::{Actor, ServiceError, new_id, now_rfc3339};
use stitcherp_sql::{SqlExec, Value};

use super::MfgService;
use crate::model::{ProductionBatch, TimelineEvent};
use crate::store;

/// Append one event to a batch's timeline. Runs inside the caller's
/// transaction so the event commits or rolls back with the transition it
/// describes.
pub(crate) fn record_event(
    tx: &dyn SqlExec,
    batch_id: &str,
    event: &str,
    actor: &Actor,
    details: String,
) -> Result<(), ServiceError> {
    let ev = TimelineEvent {
        id: new_id(),
        batch_id: batch_id.to_string(),
        event: event.to_string(),
        actor: actor.to_string(),
        details,
        create_at: now_rfc3339(),
    };
    store::insert_record(
        tx,
        "timeline_events",
        &ev.id,
        &ev,
        &[
            ("batch_id", Value::Text(ev.batch_id.clone())),
            ("event", Value::Text(ev.event.clone())),
            ("create_at", Value::Text(ev.create_at.clone())),
        ],
    )
}

impl MfgService {
    /// Full timeline of a batch, oldest first.
    pub fn list_timeline(&self, batch_id: &str) -> Result<Vec<TimelineEvent>, ServiceError> {
        // 404 for a bad batch id, not an empty list.
        let _: ProductionBatch = store::get_record(self.db(), "batches", batch_id)?;
        store::list_records_by(
            self.db(),
            "timeline_events",
            &[("batch_id", Value::Text(batch_id.to_string()))],
        )
    }
}
