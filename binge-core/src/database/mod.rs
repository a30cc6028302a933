//! Persistence: repository ports and their PostgreSQL adapters.

pub mod infrastructure;
pub mod ports;
pub mod postgres;

pub use ports::catalog::{
    CatalogRepository, NewEpisode, NewSeason, NewSeriesTree, SERIES_TMDB_ID_KEY,
};
pub use ports::watches::{
    EpisodeBoundary, EpisodeSlice, NewSkip, NewWatch, NewWatchThrough,
    WatchRepository,
};
pub use postgres::PostgresDatabase;

#[cfg(test)]
pub use ports::{catalog::MockCatalogRepository, watches::MockWatchRepository};
