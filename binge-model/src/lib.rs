//! Core data model definitions shared across Binge crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod catalog;
pub mod error;
pub mod gid;
pub mod ids;
pub mod watch;

// Intentionally curated re-exports for downstream consumers.
pub use catalog::{Episode, Season, SeasonStatus, Series, SeriesStatus};
pub use error::{ModelError, Result as ModelResult};
pub use gid::{GID_NAMESPACE, GlobalId, GlobalIdentifiable};
pub use ids::{
    EpisodeID, SeasonID, SeriesID, SkipID, WatchID, WatchThroughEpisodeID,
    WatchThroughID,
};
pub use watch::{
    ActionRef, EpisodeProgress, Skip, Watch, WatchThrough, WatchThroughAction,
    WatchThroughEpisode, WatchThroughStatus,
};
