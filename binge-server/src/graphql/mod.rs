//! async-graphql schema for the Binge API.
//!
//! Schema-wide data holds the [`AppUnitOfWork`], the [`IngestionEngine`] and
//! the [`WatchService`]. Each request additionally carries its own
//! [`RequestLoaders`].

pub mod errors;
pub mod mutation;
pub mod query;
pub mod types;

use std::sync::Arc;

use async_graphql::{EmptySubscription, Schema};
use binge_core::{
    AppUnitOfWork, IngestionEngine, MetadataProvider, RequestLoaders,
    WatchService,
};

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type BingeSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(
    unit_of_work: &AppUnitOfWork,
    provider: Arc<dyn MetadataProvider>,
) -> BingeSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(unit_of_work.clone())
        .data(IngestionEngine::new(provider, unit_of_work.catalog.clone()))
        .data(WatchService::new(unit_of_work))
        .finish()
}

/// Runs one GraphQL request with loaders scoped to it.
pub async fn execute(
    schema: &BingeSchema,
    loaders: RequestLoaders,
    request: impl Into<async_graphql::Request>,
) -> async_graphql::Response {
    schema.execute(request.into().data(loaders)).await
}
