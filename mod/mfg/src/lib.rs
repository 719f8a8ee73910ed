pub mod api;
pub mod model;
pub mod service;
pub(crate) mod store;

use std::sync::Arc;

use axum::Router;
use stitcherp_core::Module;
use stitcherp_sql::SQLStore;

use service::MfgService;

/// The manufacturing module — production batch workflow, stage tasks,
/// material stock ledger, sub-batch splitting and the batch timeline.
pub struct MfgModule {
    service: Arc<MfgService>,
}

impl MfgModule {
    /// Create the module and initialise its schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, stitcherp_core::ServiceError> {
        let service = Arc::new(MfgService::new(db)?);
        Ok(Self { service })
    }

    /// Access the service for programmatic (non-HTTP) use.
    pub fn service(&self) -> &Arc<MfgService> {
        &self.service
    }
}

impl Module for MfgModule {
    fn name(&self) -> &str {
        "mfg"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.service))
    }
}
