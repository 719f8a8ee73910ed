use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SubBatchStatus — the sewing+finishing mini pipeline
// ---------------------------------------------------------------------------

/// Lifecycle state of a sub-batch.
///
/// ```text
/// ASSIGNED_TO_SEWER → SEWING_IN_PROGRESS → SEWING_COMPLETED
///   → SEWING_CONFIRMED → ASSIGNED_TO_FINISHER → FINISHING_IN_PROGRESS
///   → FINISHING_COMPLETED → FINISHING_CONFIRMED → SUBMITTED_TO_WAREHOUSE
///   → WAREHOUSE_VERIFIED
/// ```
///
/// Confirmation rejects move back to the matching in-progress state, same
/// rule as the parent batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubBatchStatus {
    AssignedToSewer,
    SewingInProgress,
    SewingCompleted,
    SewingConfirmed,
    AssignedToFinisher,
    FinishingInProgress,
    FinishingCompleted,
    FinishingConfirmed,
    SubmittedToWarehouse,
    WarehouseVerified,
}

impl SubBatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssignedToSewer => "ASSIGNED_TO_SEWER",
            Self::SewingInProgress => "SEWING_IN_PROGRESS",
            Self::SewingCompleted => "SEWING_COMPLETED",
            Self::SewingConfirmed => "SEWING_CONFIRMED",
            Self::AssignedToFinisher => "ASSIGNED_TO_FINISHER",
            Self::FinishingInProgress => "FINISHING_IN_PROGRESS",
            Self::FinishingCompleted => "FINISHING_COMPLETED",
            Self::FinishingConfirmed => "FINISHING_CONFIRMED",
            Self::SubmittedToWarehouse => "SUBMITTED_TO_WAREHOUSE",
            Self::WarehouseVerified => "WAREHOUSE_VERIFIED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WarehouseVerified)
    }

    /// Legal source states per sub-batch operation — the mini pipeline's own
    /// transition table.
    pub fn allowed_from(op: SubBatchOp) -> &'static [SubBatchStatus] {
        use SubBatchStatus::*;
        match op {
            SubBatchOp::StartSewing => &[AssignedToSewer],
            SubBatchOp::CompleteSewing => &[SewingInProgress],
            SubBatchOp::ConfirmSewing => &[SewingCompleted],
            SubBatchOp::AssignFinisher => &[SewingConfirmed],
            SubBatchOp::StartFinishing => &[AssignedToFinisher],
            SubBatchOp::CompleteFinishing => &[FinishingInProgress],
            SubBatchOp::ConfirmFinishing => &[FinishingCompleted],
            SubBatchOp::SubmitToWarehouse => &[FinishingConfirmed],
            SubBatchOp::VerifyWarehouse => &[SubmittedToWarehouse],
        }
    }
}

impl std::fmt::Display for SubBatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations on a sub-batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubBatchOp {
    StartSewing,
    CompleteSewing,
    ConfirmSewing,
    AssignFinisher,
    StartFinishing,
    CompleteFinishing,
    ConfirmFinishing,
    SubmitToWarehouse,
    VerifyWarehouse,
}

impl SubBatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartSewing => "start_sewing",
            Self::CompleteSewing => "complete_sewing",
            Self::ConfirmSewing => "confirm_sewing",
            Self::AssignFinisher => "assign_finisher",
            Self::StartFinishing => "start_finishing",
            Self::CompleteFinishing => "complete_finishing",
            Self::ConfirmFinishing => "confirm_finishing",
            Self::SubmitToWarehouse => "submit_to_warehouse",
            Self::VerifyWarehouse => "verify_warehouse",
        }
    }
}

impl std::fmt::Display for SubBatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SubBatchItem / SubBatch
// ---------------------------------------------------------------------------

/// Pieces of one size × color inside a sub-batch. Items across all
/// sub-batches of a parent partition (a subset of) the parent's confirmed
/// cutting output — a piece belongs to at most one sub-batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubBatchItem {
    pub product_size: String,
    pub color: String,
    pub pieces: i64,
}

/// An independently trackable slice of a batch's verified cut output,
/// carved out so multiple sewers/finishers can work in parallel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubBatch {
    pub id: String,
    pub batch_id: String,

    /// Derived from the parent SKU, e.g. "TSH-2026-031-S2".
    pub sku: String,

    /// Total pieces carved into this sub-batch (sum of items).
    pub pieces_assigned: i64,

    #[serde(default)]
    pub sewing_output: i64,
    #[serde(default)]
    pub sewing_reject: i64,
    #[serde(default)]
    pub finishing_output: i64,
    #[serde(default)]
    pub finishing_reject: i64,

    pub status: SubBatchStatus,

    pub assigned_sewer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_finisher: Option<String>,

    pub items: Vec<SubBatchItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub create_at: String,
    pub update_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serde() {
        assert_eq!(
            serde_json::to_string(&SubBatchStatus::SubmittedToWarehouse).unwrap(),
            "\"SUBMITTED_TO_WAREHOUSE\""
        );
        let back: SubBatchStatus = serde_json::from_str("\"SEWING_CONFIRMED\"").unwrap();
        assert_eq!(back, SubBatchStatus::SewingConfirmed);
    }

    #[test]
    fn mini_pipeline_is_linear() {
        use SubBatchStatus::*;
        // Each op accepts exactly one source state; chained they cover the
        // whole pipeline in order.
        let chain = [
            (SubBatchOp::StartSewing, AssignedToSewer),
            (SubBatchOp::CompleteSewing, SewingInProgress),
            (SubBatchOp::ConfirmSewing, SewingCompleted),
            (SubBatchOp::AssignFinisher, SewingConfirmed),
            (SubBatchOp::StartFinishing, AssignedToFinisher),
            (SubBatchOp::CompleteFinishing, FinishingInProgress),
            (SubBatchOp::ConfirmFinishing, FinishingCompleted),
            (SubBatchOp::SubmitToWarehouse, FinishingConfirmed),
            (SubBatchOp::VerifyWarehouse, SubmittedToWarehouse),
        ];
        for (op, source) in chain {
            assert_eq!(SubBatchStatus::allowed_from(op), &[source]);
        }
    }

    #[test]
    fn only_warehouse_verified_is_terminal() {
        assert!(SubBatchStatus::WarehouseVerified.is_terminal());
        assert!(!SubBatchStatus::SubmittedToWarehouse.is_terminal());
        assert!(!SubBatchStatus::AssignedToSewer.is_terminal());
    }
}
