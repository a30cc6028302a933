use std::fmt;
use std::sync::Arc;

use crate::database::ports::{
    catalog::CatalogRepository, watches::WatchRepository,
};

/// Aggregates the repository ports used by application services.
#[derive(Clone)]
pub struct AppUnitOfWork {
    pub catalog: Arc<dyn CatalogRepository>,
    pub watches: Arc<dyn WatchRepository>,
}

impl AppUnitOfWork {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        watches: Arc<dyn WatchRepository>,
    ) -> Self {
        Self { catalog, watches }
    }
}

impl fmt::Debug for AppUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppUnitOfWork").finish_non_exhaustive()
    }
}
