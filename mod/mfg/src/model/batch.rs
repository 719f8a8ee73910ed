use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BatchStatus — the production pipeline state machine
// ---------------------------------------------------------------------------

/// Lifecycle state of a production batch.
///
/// ```text
/// PENDING → MATERIAL_REQUESTED → MATERIAL_ALLOCATED → ASSIGNED_TO_CUTTER
///         → IN_CUTTING → CUTTING_COMPLETED → CUTTING_VERIFIED
///         → (direct)  ASSIGNED_TO_SEWER → IN_SEWING → SEWING_COMPLETED
///                     → SEWING_VERIFIED → IN_FINISHING → FINISHING_COMPLETED
///                     → WAREHOUSE_VERIFIED → COMPLETED
///         → (split)   sub-batches run their own pipeline; the batch joins at
///                     WAREHOUSE_VERIFIED once every sub-batch is verified
/// ```
///
/// Verification rejects move backward to the matching in-progress state
/// (CUTTING_COMPLETED → IN_CUTTING, SEWING_COMPLETED → IN_SEWING); work
/// resumes, it does not restart from assignment. CANCELLED is reachable only
/// before material has been deducted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Pending,
    MaterialRequested,
    MaterialAllocated,
    AssignedToCutter,
    InCutting,
    CuttingCompleted,
    CuttingVerified,
    AssignedToSewer,
    InSewing,
    SewingCompleted,
    SewingVerified,
    InFinishing,
    FinishingCompleted,
    WarehouseVerified,
    Completed,
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::MaterialRequested => "MATERIAL_REQUESTED",
            Self::MaterialAllocated => "MATERIAL_ALLOCATED",
            Self::AssignedToCutter => "ASSIGNED_TO_CUTTER",
            Self::InCutting => "IN_CUTTING",
            Self::CuttingCompleted => "CUTTING_COMPLETED",
            Self::CuttingVerified => "CUTTING_VERIFIED",
            Self::AssignedToSewer => "ASSIGNED_TO_SEWER",
            Self::InSewing => "IN_SEWING",
            Self::SewingCompleted => "SEWING_COMPLETED",
            Self::SewingVerified => "SEWING_VERIFIED",
            Self::InFinishing => "IN_FINISHING",
            Self::FinishingCompleted => "FINISHING_COMPLETED",
            Self::WarehouseVerified => "WAREHOUSE_VERIFIED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the batch has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Legal source states for a workflow operation.
    ///
    /// This is the single table of legal edges: every transition operation
    /// checks its precondition here and nowhere else. `WarehouseVerify` lists
    /// CUTTING_VERIFIED for the split path only — the workflow additionally
    /// requires the split pipeline with every sub-batch verified.
    pub fn allowed_from(op: WorkflowOp) -> &'static [BatchStatus] {
        use BatchStatus::*;
        match op {
            WorkflowOp::RequestMaterials => &[Pending],
            WorkflowOp::ConfirmMaterials => &[Pending, MaterialRequested],
            WorkflowOp::AssignCutter => &[MaterialAllocated],
            WorkflowOp::RecordCutting => &[AssignedToCutter, InCutting],
            WorkflowOp::InputCuttingResults => &[AssignedToCutter, InCutting],
            // IN_CUTTING admits only a repeated reject (no-op apart from the
            // timeline entry); approval still requires CUTTING_COMPLETED.
            WorkflowOp::VerifyCutting => &[CuttingCompleted, InCutting],
            WorkflowOp::AssignSewer => &[CuttingVerified],
            WorkflowOp::CreateSubBatches => &[CuttingVerified],
            WorkflowOp::RecordSewing => &[AssignedToSewer, InSewing],
            WorkflowOp::CompleteSewing => &[AssignedToSewer, InSewing],
            WorkflowOp::VerifySewing => &[SewingCompleted, InSewing],
            WorkflowOp::AssignFinisher => &[SewingVerified],
            WorkflowOp::RecordFinishing => &[InFinishing],
            WorkflowOp::CompleteFinishing => &[InFinishing],
            WorkflowOp::WarehouseVerify => &[FinishingCompleted, CuttingVerified],
            WorkflowOp::Complete => &[WarehouseVerified],
            WorkflowOp::Cancel => &[Pending, MaterialRequested],
            WorkflowOp::Delete => &[Pending, Cancelled],
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every exposed batch workflow operation, for the transition table and for
/// error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOp {
    RequestMaterials,
    ConfirmMaterials,
    AssignCutter,
    RecordCutting,
    InputCuttingResults,
    VerifyCutting,
    AssignSewer,
    CreateSubBatches,
    RecordSewing,
    CompleteSewing,
    VerifySewing,
    AssignFinisher,
    RecordFinishing,
    CompleteFinishing,
    WarehouseVerify,
    Complete,
    Cancel,
    Delete,
}

impl WorkflowOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestMaterials => "request_materials",
            Self::ConfirmMaterials => "confirm_materials",
            Self::AssignCutter => "assign_cutter",
            Self::RecordCutting => "record_cutting",
            Self::InputCuttingResults => "input_cutting_results",
            Self::VerifyCutting => "verify_cutting",
            Self::AssignSewer => "assign_sewer",
            Self::CreateSubBatches => "create_sub_batches",
            Self::RecordSewing => "record_sewing",
            Self::CompleteSewing => "complete_sewing",
            Self::VerifySewing => "verify_sewing",
            Self::AssignFinisher => "assign_finisher",
            Self::RecordFinishing => "record_finishing",
            Self::CompleteFinishing => "complete_finishing",
            Self::WarehouseVerify => "warehouse_verify",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for WorkflowOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PipelineMode — chosen once at the CUTTING_VERIFIED boundary
// ---------------------------------------------------------------------------

/// How the batch proceeds after cutting verification.
///
/// Set exactly once: `assign_sewer` selects `Direct`, `create_sub_batches`
/// selects `Split`. The two paths never mix on one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineMode {
    /// One sewing task, one finishing task, bound to the batch itself.
    Direct,
    /// Cut output partitioned into sub-batches, each with its own
    /// sewer/finisher pipeline.
    Split,
}

// ---------------------------------------------------------------------------
// SizeColorRequest — the production target per size × color
// ---------------------------------------------------------------------------

/// Target pieces for one size × color combination. The sum across rows is
/// the batch's production target baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeColorRequest {
    pub product_size: String,
    pub color: String,
    pub requested_pieces: i64,
}

// ---------------------------------------------------------------------------
// ProductionBatch
// ---------------------------------------------------------------------------

/// One manufacturing run of a product, from raw material to finished pieces.
///
/// Mutated exclusively through workflow operations; hard-deleted only while
/// PENDING or CANCELLED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionBatch {
    pub id: String,

    /// Unique, human-readable batch SKU (e.g. "TSH-2026-031").
    pub sku: String,

    pub product_id: String,

    /// Planned good output.
    #[serde(default)]
    pub target_quantity: i64,

    /// Final good output; set by warehouse verification.
    #[serde(default)]
    pub actual_quantity: i64,

    /// Total rejected pieces; set by warehouse verification.
    #[serde(default)]
    pub reject_quantity: i64,

    /// Total material rolls allocated.
    #[serde(default)]
    pub total_rolls: i64,

    pub status: BatchStatus,

    /// Post-cutting pipeline branch; `None` until the branch is chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineMode>,

    /// Target pieces per size × color.
    #[serde(default)]
    pub size_color_requests: Vec<SizeColorRequest>,

    pub start_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub create_at: String,
    pub update_at: String,
}

impl ProductionBatch {
    /// Sum of requested pieces across all size/color rows.
    pub fn requested_total(&self) -> i64 {
        self.size_color_requests
            .iter()
            .map(|r| r.requested_pieces)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// CuttingResult — actual cut output per size × color
// ---------------------------------------------------------------------------

/// Actual pieces cut for one size × color, one row per (batch, size, color).
/// Individually confirmable; the sum over confirmed rows is what the sewing
/// stage receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuttingResult {
    pub id: String,
    pub batch_id: String,
    pub product_size: String,
    pub color: String,
    pub actual_pieces: i64,
    #[serde(default)]
    pub is_confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_by: Option<String>,
    pub create_at: String,
    pub update_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serde_roundtrip() {
        for s in &[
            BatchStatus::Pending,
            BatchStatus::MaterialRequested,
            BatchStatus::CuttingVerified,
            BatchStatus::WarehouseVerified,
            BatchStatus::Completed,
            BatchStatus::Cancelled,
        ] {
            let json = serde_json::to_string(s).unwrap();
            let back: BatchStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(*s, back);
        }
        assert_eq!(
            serde_json::to_string(&BatchStatus::AssignedToCutter).unwrap(),
            "\"ASSIGNED_TO_CUTTER\""
        );
    }

    #[test]
    fn terminal_states() {
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Cancelled.is_terminal());
        assert!(!BatchStatus::WarehouseVerified.is_terminal());
        assert!(!BatchStatus::Pending.is_terminal());
    }

    #[test]
    fn transition_table_forward_edges() {
        use BatchStatus::*;
        assert_eq!(BatchStatus::allowed_from(WorkflowOp::ConfirmMaterials), &[Pending, MaterialRequested]);
        assert_eq!(BatchStatus::allowed_from(WorkflowOp::AssignCutter), &[MaterialAllocated]);
        assert_eq!(BatchStatus::allowed_from(WorkflowOp::Complete), &[WarehouseVerified]);
    }

    #[test]
    fn cancel_only_before_allocation() {
        use BatchStatus::*;
        let allowed = BatchStatus::allowed_from(WorkflowOp::Cancel);
        assert!(allowed.contains(&Pending));
        assert!(allowed.contains(&MaterialRequested));
        assert!(!allowed.contains(&MaterialAllocated));
        assert!(!allowed.contains(&InCutting));
    }

    #[test]
    fn delete_only_pending_or_cancelled() {
        use BatchStatus::*;
        assert_eq!(BatchStatus::allowed_from(WorkflowOp::Delete), &[Pending, Cancelled]);
    }

    #[test]
    fn requested_total_sums_rows() {
        let batch = ProductionBatch {
            id: "b1".into(),
            sku: "TSH-001".into(),
            product_id: "p1".into(),
            target_quantity: 100,
            actual_quantity: 0,
            reject_quantity: 0,
            total_rolls: 0,
            status: BatchStatus::Pending,
            pipeline: None,
            size_color_requests: vec![
                SizeColorRequest {
                    product_size: "M".into(),
                    color: "Red".into(),
                    requested_pieces: 60,
                },
                SizeColorRequest {
                    product_size: "L".into(),
                    color: "Red".into(),
                    requested_pieces: 40,
                },
            ],
            start_date: "2026-02-01T00:00:00Z".into(),
            completed_date: None,
            notes: None,
            create_at: "2026-02-01T00:00:00Z".into(),
            update_at: "2026-02-01T00:00:00Z".into(),
        };
        assert_eq!(batch.requested_total(), 100);
    }
}
