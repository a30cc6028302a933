use async_trait::async_trait;
use binge_model::{
    EpisodeID, SeriesID, Skip, SkipID, Watch, WatchID, WatchThrough,
    WatchThroughEpisode, WatchThroughID,
};
use chrono::{DateTime, Utc};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct NewWatchThrough {
    pub series_id: SeriesID,
    /// Episodes in viewing order; position becomes the join row index.
    pub episode_ids: Vec<EpisodeID>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWatch {
    pub episode_id: EpisodeID,
    pub watch_through_id: Option<WatchThroughID>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Stamped onto the watch-through as `updated_at`.
    pub activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSkip {
    pub episode_id: EpisodeID,
    pub watch_through_id: Option<WatchThroughID>,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

/// Inclusive (season, episode) position inside a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeBoundary {
    pub season_number: i32,
    pub episode_number: i32,
}

/// Inclusive episode range; an absent bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeSlice {
    pub from: Option<EpisodeBoundary>,
    pub to: Option<EpisodeBoundary>,
}

/// Watch-throughs, their join rows, watches and skips.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WatchRepository: Send + Sync {
    async fn watches_by_ids(&self, ids: &[WatchID]) -> Result<Vec<Watch>>;

    async fn skips_by_ids(&self, ids: &[SkipID]) -> Result<Vec<Skip>>;

    async fn watch_throughs_by_ids(
        &self,
        ids: &[WatchThroughID],
    ) -> Result<Vec<WatchThrough>>;

    /// Join rows of the given watch-throughs ordered by index, each carrying
    /// its episode's air date.
    async fn watch_through_sequences(
        &self,
        ids: &[WatchThroughID],
    ) -> Result<Vec<WatchThroughEpisode>>;

    /// Most recently updated watch-throughs that are not finished.
    async fn unfinished_watch_throughs(
        &self,
        limit: i64,
    ) -> Result<Vec<WatchThrough>>;

    async fn watches_for_watch_through(
        &self,
        watch_through_id: WatchThroughID,
        limit: i64,
    ) -> Result<Vec<Watch>>;

    async fn watches_for_episode(
        &self,
        episode_id: EpisodeID,
        limit: i64,
    ) -> Result<Vec<Watch>>;

    /// The most recently created watch of each episode that has one.
    async fn latest_watches_for_episodes(
        &self,
        episode_ids: &[EpisodeID],
    ) -> Result<Vec<Watch>>;

    /// Creates an ONGOING watch-through and its join rows atomically.
    async fn create_watch_through(
        &self,
        new: &NewWatchThrough,
    ) -> Result<WatchThrough>;

    /// Inserts the watch, links the matching join row, touches the
    /// watch-through and finishes it when nothing is pending.
    async fn record_watch(&self, new: &NewWatch) -> Result<Watch>;

    /// Skip counterpart of [`WatchRepository::record_watch`].
    async fn record_skip(&self, new: &NewSkip) -> Result<Skip>;

    /// Deletes the watch and reopens the watch-through it belonged to.
    /// Returns the deleted row, `None` when it did not exist.
    async fn delete_watch(&self, id: WatchID) -> Result<Option<Watch>>;

    async fn delete_watch_through(&self, id: WatchThroughID) -> Result<bool>;

    /// Inserts one watch, outside any watch-through, per series episode in
    /// `slice`. Returns the number of watches created.
    async fn insert_watches_for_series(
        &self,
        series_id: SeriesID,
        slice: &EpisodeSlice,
    ) -> Result<u64>;
}
