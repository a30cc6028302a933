//! PostgreSQL infrastructure adapters implementing the database ports.

pub mod repositories;

pub use repositories::catalog::PostgresCatalogRepository;
pub use repositories::watches::PostgresWatchRepository;
