use async_trait::async_trait;
use binge_model::{
    Episode, EpisodeID, Season, SeasonID, SeasonStatus, Series, SeriesID,
    SeriesStatus,
};
use chrono::NaiveDate;

use crate::error::Result;

/// Unique constraint on `series.tmdb_id`.
pub const SERIES_TMDB_ID_KEY: &str = "series_tmdb_id_key";

/// A complete series tree ready to be persisted by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSeriesTree {
    pub tmdb_id: String,
    pub imdb_id: Option<String>,
    pub name: String,
    pub first_aired: Option<NaiveDate>,
    pub status: SeriesStatus,
    pub overview: Option<String>,
    pub poster: Option<String>,
    pub seasons: Vec<NewSeason>,
    /// Episodes refer to their season by number.
    pub episodes: Vec<NewEpisode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSeason {
    pub number: i32,
    pub first_aired: Option<NaiveDate>,
    pub status: SeasonStatus,
    pub overview: Option<String>,
    pub poster: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEpisode {
    pub season_number: i32,
    pub number: i32,
    pub title: String,
    pub first_aired: Option<NaiveDate>,
    pub overview: Option<String>,
    pub still: Option<String>,
}

/// Series, seasons and episodes. Written once by ingestion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_series_by_tmdb_id(
        &self,
        tmdb_id: &str,
    ) -> Result<Option<Series>>;

    async fn find_series_by_tmdb_ids(
        &self,
        tmdb_ids: &[String],
    ) -> Result<Vec<Series>>;

    /// Inserts the series with all of its seasons and episodes atomically.
    /// Fails with `CoreError::Conflict` when the tmdb id already exists.
    async fn insert_series_tree(&self, tree: &NewSeriesTree) -> Result<Series>;

    async fn series_by_ids(&self, ids: &[SeriesID]) -> Result<Vec<Series>>;

    async fn seasons_by_ids(&self, ids: &[SeasonID]) -> Result<Vec<Season>>;

    async fn episodes_by_ids(&self, ids: &[EpisodeID]) -> Result<Vec<Episode>>;

    /// Seasons ordered by number.
    async fn seasons_for_series(
        &self,
        series_id: SeriesID,
    ) -> Result<Vec<Season>>;

    async fn season_by_number(
        &self,
        series_id: SeriesID,
        number: i32,
    ) -> Result<Option<Season>>;

    /// Episodes ordered by season number, then episode number.
    async fn episodes_for_series(
        &self,
        series_id: SeriesID,
    ) -> Result<Vec<Episode>>;

    /// Episodes of one season ordered by number.
    async fn episodes_for_season(
        &self,
        season_id: SeasonID,
    ) -> Result<Vec<Episode>>;

    async fn episode_by_number(
        &self,
        series_id: SeriesID,
        season_number: i32,
        number: i32,
    ) -> Result<Option<Episode>>;

    /// Episode ids of the given seasons ordered by (season number, episode number).
    async fn episode_ids_for_seasons(
        &self,
        season_ids: &[SeasonID],
    ) -> Result<Vec<EpisodeID>>;

    /// Episode ids of a series ordered by (season number, episode number).
    /// Season 0 is only included with `include_specials`.
    async fn episode_ids_for_series(
        &self,
        series_id: SeriesID,
        include_specials: bool,
    ) -> Result<Vec<EpisodeID>>;
}
