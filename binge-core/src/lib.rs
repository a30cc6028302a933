//! # Binge Core
//!
//! Business logic for the Binge watch-tracking service:
//!
//! - [`providers`]: TMDB client and the [`providers::MetadataProvider`] port
//! - [`ingest`]: lazy, idempotent import of series trees into the catalog
//! - [`progress`]: next episode, last action and unfinished counts derived
//!   from a watch-through's episode sequence
//! - [`watch`]: watch-through, watch and skip mutations
//! - [`loaders`]: request-scoped batching caches
//! - [`database`]: repository ports and their PostgreSQL adapters

#![allow(missing_docs)]

pub mod application;
pub mod database;
pub mod error;
pub mod ingest;
pub mod loaders;
pub mod progress;
pub mod providers;
pub mod watch;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use application::AppUnitOfWork;
pub use database::PostgresDatabase;
pub use error::{CoreError, Result};
pub use ingest::IngestionEngine;
pub use loaders::{BatchFetch, BatchLoader, RequestLoaders};
pub use progress::{EpisodeFilter, WatchedFilter};
pub use providers::{MetadataProvider, ProviderError, TmdbClient};
pub use watch::{
    EpisodeSelection, SkipEpisodeRequest, WatchEpisodeRequest, WatchService,
};

pub use binge_model;
