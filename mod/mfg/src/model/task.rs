use serde::{Deserialize, Serialize};

use stitcherp_core::ServiceError;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// A production stage with its own task record and worker assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Cutting,
    Sewing,
    Finishing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cutting => "CUTTING",
            Self::Sewing => "SEWING",
            Self::Finishing => "FINISHING",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StageTaskStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a stage task.
///
/// ```text
/// PENDING → IN_PROGRESS → COMPLETED → VERIFIED
/// ```
///
/// A verification reject moves COMPLETED back to IN_PROGRESS with counts
/// intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageTaskStatus {
    Pending,
    InProgress,
    Completed,
    Verified,
}

impl StageTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Verified => "VERIFIED",
        }
    }

    /// Whether the worker may still record progress.
    pub fn accepts_progress(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl std::fmt::Display for StageTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StageTask — one assignment record per stage per batch
// ---------------------------------------------------------------------------

/// One worker assignment for one stage of a batch.
///
/// Cutting, sewing and finishing share this shape; `stage` discriminates.
/// The counting invariant holds at every observed point:
/// `pieces_completed + reject_pieces <= pieces_received`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTask {
    pub id: String,
    pub batch_id: String,
    pub stage: Stage,

    /// Worker this task is bound to.
    pub assigned_to: String,

    pub status: StageTaskStatus,

    /// Input handed to this stage.
    #[serde(default)]
    pub pieces_received: i64,
    /// Cumulative good output.
    #[serde(default)]
    pub pieces_completed: i64,
    /// Cumulative reject.
    #[serde(default)]
    pub reject_pieces: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub create_at: String,
    pub update_at: String,
}

impl StageTask {
    /// Pieces not yet accounted for as completed or rejected.
    pub fn remaining(&self) -> i64 {
        self.pieces_received - self.pieces_completed - self.reject_pieces
    }

    /// Accumulate progress deltas, enforcing the receive bound.
    pub fn apply_progress(
        &mut self,
        completed_delta: i64,
        reject_delta: i64,
    ) -> Result<(), ServiceError> {
        if completed_delta < 0 || reject_delta < 0 {
            return Err(ServiceError::Validation(
                "progress deltas must be non-negative".into(),
            ));
        }
        let new_completed = self.pieces_completed + completed_delta;
        let new_reject = self.reject_pieces + reject_delta;
        if new_completed + new_reject > self.pieces_received {
            return Err(ServiceError::OverReceived(format!(
                "{} task {}: completed {} + reject {} would exceed received {}",
                self.stage, self.id, new_completed, new_reject, self.pieces_received
            )));
        }
        self.pieces_completed = new_completed;
        self.reject_pieces = new_reject;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(received: i64) -> StageTask {
        StageTask {
            id: "t1".into(),
            batch_id: "b1".into(),
            stage: Stage::Cutting,
            assigned_to: "worker-1".into(),
            status: StageTaskStatus::InProgress,
            pieces_received: received,
            pieces_completed: 0,
            reject_pieces: 0,
            started_at: None,
            completed_at: None,
            notes: None,
            create_at: "2026-02-01T00:00:00Z".into(),
            update_at: "2026-02-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn progress_accumulates_within_bound() {
        let mut t = task(100);
        t.apply_progress(40, 5).unwrap();
        t.apply_progress(45, 5).unwrap();
        assert_eq!(t.pieces_completed, 85);
        assert_eq!(t.reject_pieces, 10);
        // Exactly reaching the bound is fine.
        t.apply_progress(5, 0).unwrap();
        assert_eq!(t.remaining(), 0);
    }

    #[test]
    fn progress_beyond_received_is_over_received() {
        let mut t = task(100);
        t.apply_progress(90, 10).unwrap();
        let err = t.apply_progress(1, 0).unwrap_err();
        assert!(matches!(err, ServiceError::OverReceived(_)));
        // Counts unchanged after the failed call.
        assert_eq!(t.pieces_completed, 90);
        assert_eq!(t.reject_pieces, 10);
    }

    #[test]
    fn negative_deltas_rejected() {
        let mut t = task(10);
        assert!(matches!(
            t.apply_progress(-1, 0),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn status_accepts_progress() {
        assert!(StageTaskStatus::Pending.accepts_progress());
        assert!(StageTaskStatus::InProgress.accepts_progress());
        assert!(!StageTaskStatus::Completed.accepts_progress());
        assert!(!StageTaskStatus::Verified.accepts_progress());
    }

    #[test]
    fn task_json_roundtrip() {
        let t = task(50);
        let json = serde_json::to_string(&t).unwrap();
        let back: StageTask = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stage, Stage::Cutting);
        assert_eq!(back.pieces_received, 50);
        assert!(!json.contains("\"startedAt\""));
    }
}
