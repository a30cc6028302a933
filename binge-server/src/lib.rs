//! # Binge Server
//!
//! GraphQL API over the Binge catalog and watch history.
//!
//! - [`graphql`]: schema, object wrappers and resolvers
//! - [`routes`]: axum router serving `/graphql` and `/health`
//! - [`infra`]: configuration, shared state and HTTP errors

pub mod graphql;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
