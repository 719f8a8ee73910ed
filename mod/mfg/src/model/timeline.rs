use serde::{Deserialize, Serialize};

// ── Event kinds ─────────────────────────────────────────────────────
//
// Stable identifiers for timeline entries. The dashboard groups and icons
// events by these; details text is free-form.

/// Stable timeline event kind constants.
pub mod event_kind {
    pub const BATCH_CREATED: &str = "BATCH_CREATED";
    pub const MATERIAL_REQUESTED: &str = "MATERIAL_REQUESTED";
    pub const MATERIAL_ALLOCATED: &str = "MATERIAL_ALLOCATED";
    pub const CUTTER_ASSIGNED: &str = "CUTTER_ASSIGNED";
    pub const CUTTING_STARTED: &str = "CUTTING_STARTED";
    pub const CUTTING_PROGRESS: &str = "CUTTING_PROGRESS";
    pub const CUTTING_RESULTS_RECORDED: &str = "CUTTING_RESULTS_RECORDED";
    pub const CUTTING_RESULT_CONFIRMED: &str = "CUTTING_RESULT_CONFIRMED";
    pub const CUTTING_VERIFIED: &str = "CUTTING_VERIFIED";
    pub const CUTTING_REJECTED: &str = "CUTTING_REJECTED";
    pub const SEWER_ASSIGNED: &str = "SEWER_ASSIGNED";
    pub const SEWING_STARTED: &str = "SEWING_STARTED";
    pub const SEWING_PROGRESS: &str = "SEWING_PROGRESS";
    pub const SEWING_COMPLETED: &str = "SEWING_COMPLETED";
    pub const SEWING_VERIFIED: &str = "SEWING_VERIFIED";
    pub const SEWING_REJECTED: &str = "SEWING_REJECTED";
    pub const FINISHER_ASSIGNED: &str = "FINISHER_ASSIGNED";
    pub const FINISHING_STARTED: &str = "FINISHING_STARTED";
    pub const FINISHING_PROGRESS: &str = "FINISHING_PROGRESS";
    pub const FINISHING_COMPLETED: &str = "FINISHING_COMPLETED";
    pub const WAREHOUSE_VERIFIED: &str = "WAREHOUSE_VERIFIED";
    pub const BATCH_COMPLETED: &str = "BATCH_COMPLETED";
    pub const BATCH_CANCELLED: &str = "BATCH_CANCELLED";
    pub const SUB_BATCHES_CREATED: &str = "SUB_BATCHES_CREATED";
    pub const SUB_BATCH_SEWING_STARTED: &str = "SUB_BATCH_SEWING_STARTED";
    pub const SUB_BATCH_SEWING_COMPLETED: &str = "SUB_BATCH_SEWING_COMPLETED";
    pub const SUB_BATCH_SEWING_CONFIRMED: &str = "SUB_BATCH_SEWING_CONFIRMED";
    pub const SUB_BATCH_SEWING_REJECTED: &str = "SUB_BATCH_SEWING_REJECTED";
    pub const SUB_BATCH_FINISHER_ASSIGNED: &str = "SUB_BATCH_FINISHER_ASSIGNED";
    pub const SUB_BATCH_FINISHING_STARTED: &str = "SUB_BATCH_FINISHING_STARTED";
    pub const SUB_BATCH_FINISHING_COMPLETED: &str = "SUB_BATCH_FINISHING_COMPLETED";
    pub const SUB_BATCH_FINISHING_CONFIRMED: &str = "SUB_BATCH_FINISHING_CONFIRMED";
    pub const SUB_BATCH_FINISHING_REJECTED: &str = "SUB_BATCH_FINISHING_REJECTED";
    pub const SUB_BATCH_SUBMITTED: &str = "SUB_BATCH_SUBMITTED";
    pub const SUB_BATCH_WAREHOUSE_VERIFIED: &str = "SUB_BATCH_WAREHOUSE_VERIFIED";
}

/// Append-only audit entry for a batch. Never mutated or deleted (batch
/// hard-delete removes the whole history with the batch).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub batch_id: String,

    /// Event kind, one of [`event_kind`].
    pub event: String,

    /// Who performed the operation, "name (role)".
    pub actor: String,

    /// Human-readable details, counts included where relevant.
    pub details: String,

    pub create_at: String,
}
