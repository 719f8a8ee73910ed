pub mod batch;
pub mod material;
pub mod product;
pub mod subbatch;
pub mod task;
pub mod timeline;

pub use batch::{
    BatchStatus, CuttingResult, PipelineMode, ProductionBatch, SizeColorRequest, WorkflowOp,
};
pub use material::{MaterialColorAllocation, MaterialVariant, StockTransaction, StockTxnType};
pub use product::Product;
pub use subbatch::{SubBatch, SubBatchItem, SubBatchOp, SubBatchStatus};
pub use task::{Stage, StageTask, StageTaskStatus};
pub use timeline::{TimelineEvent, event_kind};

use serde::Serialize;

/// Everything known about one batch, loaded in one shot.
///
/// The post-cutting branch is an enum, not a pair of nullable task fields —
/// a batch is on exactly one path and matches on it are exhaustive.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAggregate {
    pub batch: ProductionBatch,
    pub allocations: Vec<MaterialColorAllocation>,
    pub cutting_task: Option<StageTask>,
    pub cutting_results: Vec<CuttingResult>,
    pub pipeline: PipelineState,
    pub timeline: Vec<TimelineEvent>,
}

/// The post-cutting half of a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Cutting not yet verified, or branch not yet chosen.
    NotStarted,
    /// One sewing task and one finishing task bound to the batch.
    Direct {
        sewing_task: Option<StageTask>,
        finishing_task: Option<StageTask>,
    },
    /// Work fanned out across sub-batches.
    Split { sub_batches: Vec<SubBatch> },
}
