use std::{fmt, sync::Arc};

use binge_core::{AppUnitOfWork, MetadataProvider, RequestLoaders};

use crate::graphql::{BingeSchema, build_schema};

#[derive(Clone)]
pub struct AppState {
    pub schema: BingeSchema,
    pub unit_of_work: Arc<AppUnitOfWork>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("unit_of_work", &self.unit_of_work)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        unit_of_work: AppUnitOfWork,
        provider: Arc<dyn MetadataProvider>,
    ) -> Self {
        let schema = build_schema(&unit_of_work, provider);
        Self {
            schema,
            unit_of_work: Arc::new(unit_of_work),
        }
    }

    /// Fresh loaders for one GraphQL request.
    pub fn request_loaders(&self) -> RequestLoaders {
        RequestLoaders::new(&self.unit_of_work)
    }
}
