mod batches;
mod materials;
mod sub_batches;
mod tasks;

use std::sync::Arc;

use axum::Router;

use crate::service::MfgService;

/// Build the complete manufacturing module router.
///
/// Routes (nested under `/mfg` by the server):
/// - `/products`, `/materials` — catalog and stock ledger
/// - `/batches` — batch CRUD plus one `@action` route per workflow transition
/// - `/tasks` — worker-facing stage task operations
/// - `/sub-batches` — the sub-batch mini pipeline
pub fn router(service: Arc<MfgService>) -> Router {
    Router::new()
        .merge(materials::router(Arc::clone(&service)))
        .merge(batches::router(Arc::clone(&service)))
        .merge(tasks::router(Arc::clone(&service)))
        .merge(sub_batches::router(service))
}
