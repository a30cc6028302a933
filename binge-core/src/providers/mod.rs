//! External metadata providers (TMDB integration)

pub mod tmdb;
pub mod traits;

pub use tmdb::TmdbClient;
pub use traits::{
    EpisodeMetadata, MetadataProvider, ProviderError, SeasonMetadata,
    SeriesMetadata,
};

#[cfg(test)]
pub use traits::MockMetadataProvider;
