//! GraphQL object wrappers around the model types.
//!
//! Relations resolve through the request's [`RequestLoaders`] so sibling
//! fields share one bulk query per entity type.

use std::sync::Arc;

use async_graphql::{Context, Enum, ID, InputObject, Object, Result, Union};
use binge_core::database::{EpisodeBoundary, EpisodeSlice};
use binge_core::{
    AppUnitOfWork, EpisodeFilter, RequestLoaders, WatchedFilter, progress,
};
use binge_model::{
    Episode, EpisodeID, Season, SeasonStatus, Series, SeriesStatus, Skip, Watch,
    WatchThrough, WatchThroughAction, WatchThroughEpisode, WatchThroughID,
    WatchThroughStatus,
};
use chrono::{DateTime, NaiveDate, Utc};

use super::errors::{GqlResultExt, to_id};

/// Cap on watch lists hanging off an episode or a watch-through.
pub const WATCH_LIST_LIMIT: i64 = 50;

pub(crate) fn loaders<'a>(ctx: &Context<'a>) -> &'a RequestLoaders {
    ctx.data_unchecked::<RequestLoaders>()
}

pub(crate) fn unit_of_work<'a>(ctx: &Context<'a>) -> &'a AppUnitOfWork {
    ctx.data_unchecked::<AppUnitOfWork>()
}

pub(crate) async fn load_episode(
    ctx: &Context<'_>,
    id: Option<EpisodeID>,
) -> Result<Option<EpisodeObject>> {
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(loaders(ctx).episodes.load(id).await.gql()?.map(EpisodeObject))
}

pub(crate) async fn load_watch_through(
    ctx: &Context<'_>,
    id: Option<WatchThroughID>,
) -> Result<Option<WatchThroughObject>> {
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(loaders(ctx)
        .watch_throughs
        .load(id)
        .await
        .gql()?
        .map(WatchThroughObject))
}

// --- Enums ---

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(name = "SeriesStatus")]
pub enum GqlSeriesStatus {
    Returning,
    Ended,
    Cancelled,
}

impl From<SeriesStatus> for GqlSeriesStatus {
    fn from(status: SeriesStatus) -> Self {
        match status {
            SeriesStatus::Returning => GqlSeriesStatus::Returning,
            SeriesStatus::Ended => GqlSeriesStatus::Ended,
            SeriesStatus::Cancelled => GqlSeriesStatus::Cancelled,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(name = "SeasonStatus")]
pub enum GqlSeasonStatus {
    Continuing,
    Ended,
}

impl From<SeasonStatus> for GqlSeasonStatus {
    fn from(status: SeasonStatus) -> Self {
        match status {
            SeasonStatus::Continuing => GqlSeasonStatus::Continuing,
            SeasonStatus::Ended => GqlSeasonStatus::Ended,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(name = "WatchThroughStatus")]
pub enum GqlWatchThroughStatus {
    Ongoing,
    Finished,
}

impl From<WatchThroughStatus> for GqlWatchThroughStatus {
    fn from(status: WatchThroughStatus) -> Self {
        match status {
            WatchThroughStatus::Ongoing => GqlWatchThroughStatus::Ongoing,
            WatchThroughStatus::Finished => GqlWatchThroughStatus::Finished,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(name = "WatchedFilter")]
pub enum GqlWatchedFilter {
    Watched,
    Unwatched,
}

impl From<GqlWatchedFilter> for WatchedFilter {
    fn from(filter: GqlWatchedFilter) -> Self {
        match filter {
            GqlWatchedFilter::Watched => WatchedFilter::Watched,
            GqlWatchedFilter::Unwatched => WatchedFilter::Unwatched,
        }
    }
}

// --- Inputs ---

#[derive(InputObject, Debug, Clone, Copy)]
pub struct EpisodeBoundaryInput {
    pub season_number: i32,
    pub episode_number: i32,
}

/// Inclusive (season, episode) range. A missing bound is open.
#[derive(InputObject, Debug, Clone, Copy, Default)]
pub struct EpisodeSliceInput {
    pub from: Option<EpisodeBoundaryInput>,
    pub to: Option<EpisodeBoundaryInput>,
}

impl From<EpisodeBoundaryInput> for EpisodeBoundary {
    fn from(input: EpisodeBoundaryInput) -> Self {
        EpisodeBoundary {
            season_number: input.season_number,
            episode_number: input.episode_number,
        }
    }
}

impl From<EpisodeSliceInput> for EpisodeSlice {
    fn from(input: EpisodeSliceInput) -> Self {
        EpisodeSlice {
            from: input.from.map(Into::into),
            to: input.to.map(Into::into),
        }
    }
}

// --- Unions ---

#[derive(Union)]
#[graphql(name = "WatchThroughEpisodeAction")]
pub enum GqlWatchThroughAction {
    Watch(WatchObject),
    Skip(SkipObject),
}

impl From<WatchThroughAction> for GqlWatchThroughAction {
    fn from(action: WatchThroughAction) -> Self {
        match action {
            WatchThroughAction::Watch(watch) => {
                GqlWatchThroughAction::Watch(WatchObject(watch))
            }
            WatchThroughAction::Skip(skip) => {
                GqlWatchThroughAction::Skip(SkipObject(skip))
            }
        }
    }
}

/// Anything a watch or skip can point at.
#[derive(Union)]
pub enum Watchable {
    Episode(EpisodeObject),
}

// --- Image ---

pub struct ImageObject {
    source: String,
}

impl ImageObject {
    fn from_source(source: &Option<String>) -> Option<Self> {
        source.clone().map(|source| ImageObject { source })
    }
}

#[Object(name = "Image")]
impl ImageObject {
    async fn source(&self) -> &str {
        &self.source
    }
}

// --- Series ---

pub struct SeriesObject(pub Series);

#[Object(name = "Series")]
impl SeriesObject {
    async fn id(&self) -> ID {
        to_id(&self.0.id)
    }

    async fn tmdb_id(&self) -> &str {
        &self.0.tmdb_id
    }

    async fn imdb_id(&self) -> Option<&str> {
        self.0.imdb_id.as_deref()
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn first_aired(&self) -> Option<NaiveDate> {
        self.0.first_aired
    }

    async fn status(&self) -> GqlSeriesStatus {
        self.0.status.into()
    }

    async fn overview(&self) -> Option<&str> {
        self.0.overview.as_deref()
    }

    async fn poster(&self) -> Option<ImageObject> {
        ImageObject::from_source(&self.0.poster)
    }

    async fn season(
        &self,
        ctx: &Context<'_>,
        number: i32,
    ) -> Result<Option<SeasonObject>> {
        let season = unit_of_work(ctx)
            .catalog
            .season_by_number(self.0.id, number)
            .await
            .gql()?;
        if let Some(season) = &season {
            loaders(ctx).seasons.prime(season.id, season.clone());
        }
        Ok(season.map(SeasonObject))
    }

    async fn seasons(&self, ctx: &Context<'_>) -> Result<Vec<SeasonObject>> {
        let seasons = unit_of_work(ctx)
            .catalog
            .seasons_for_series(self.0.id)
            .await
            .gql()?;
        let loaders = loaders(ctx);
        for season in &seasons {
            loaders.seasons.prime(season.id, season.clone());
        }
        Ok(seasons.into_iter().map(SeasonObject).collect())
    }

    async fn episode(
        &self,
        ctx: &Context<'_>,
        season_number: i32,
        number: i32,
    ) -> Result<Option<EpisodeObject>> {
        let episode = unit_of_work(ctx)
            .catalog
            .episode_by_number(self.0.id, season_number, number)
            .await
            .gql()?;
        if let Some(episode) = &episode {
            loaders(ctx).episodes.prime(episode.id, episode.clone());
        }
        Ok(episode.map(EpisodeObject))
    }

    async fn episodes(&self, ctx: &Context<'_>) -> Result<Vec<EpisodeObject>> {
        let episodes = unit_of_work(ctx)
            .catalog
            .episodes_for_series(self.0.id)
            .await
            .gql()?;
        Ok(prime_episodes(ctx, episodes))
    }
}

fn prime_episodes(
    ctx: &Context<'_>,
    episodes: Vec<Episode>,
) -> Vec<EpisodeObject> {
    let loaders = loaders(ctx);
    episodes
        .into_iter()
        .map(|episode| {
            loaders.episodes.prime(episode.id, episode.clone());
            EpisodeObject(episode)
        })
        .collect()
}

fn prime_watches(ctx: &Context<'_>, watches: Vec<Watch>) -> Vec<WatchObject> {
    let loaders = loaders(ctx);
    watches
        .into_iter()
        .map(|watch| {
            loaders.watches.prime(watch.id, watch.clone());
            WatchObject(watch)
        })
        .collect()
}

// --- Season ---

pub struct SeasonObject(pub Season);

#[Object(name = "Season")]
impl SeasonObject {
    async fn id(&self) -> ID {
        to_id(&self.0.id)
    }

    async fn number(&self) -> i32 {
        self.0.number
    }

    async fn first_aired(&self) -> Option<NaiveDate> {
        self.0.first_aired
    }

    async fn status(&self) -> GqlSeasonStatus {
        self.0.status.into()
    }

    async fn overview(&self) -> Option<&str> {
        self.0.overview.as_deref()
    }

    async fn poster(&self) -> Option<ImageObject> {
        ImageObject::from_source(&self.0.poster)
    }

    /// Season 0 holds specials.
    async fn is_specials(&self) -> bool {
        self.0.is_specials()
    }

    async fn series(&self, ctx: &Context<'_>) -> Result<Option<SeriesObject>> {
        Ok(loaders(ctx)
            .series
            .load(self.0.series_id)
            .await
            .gql()?
            .map(SeriesObject))
    }

    async fn episodes(&self, ctx: &Context<'_>) -> Result<Vec<EpisodeObject>> {
        let episodes = unit_of_work(ctx)
            .catalog
            .episodes_for_season(self.0.id)
            .await
            .gql()?;
        Ok(prime_episodes(ctx, episodes))
    }
}

// --- Episode ---

pub struct EpisodeObject(pub Episode);

#[Object(name = "Episode")]
impl EpisodeObject {
    async fn id(&self) -> ID {
        to_id(&self.0.id)
    }

    async fn number(&self) -> i32 {
        self.0.number
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn first_aired(&self) -> Option<NaiveDate> {
        self.0.first_aired
    }

    async fn overview(&self) -> Option<&str> {
        self.0.overview.as_deref()
    }

    async fn still(&self) -> Option<ImageObject> {
        ImageObject::from_source(&self.0.still)
    }

    async fn series(&self, ctx: &Context<'_>) -> Result<Option<SeriesObject>> {
        Ok(loaders(ctx)
            .series
            .load(self.0.series_id)
            .await
            .gql()?
            .map(SeriesObject))
    }

    async fn season(&self, ctx: &Context<'_>) -> Result<Option<SeasonObject>> {
        Ok(loaders(ctx)
            .seasons
            .load(self.0.season_id)
            .await
            .gql()?
            .map(SeasonObject))
    }

    async fn watches(&self, ctx: &Context<'_>) -> Result<Vec<WatchObject>> {
        let watches = unit_of_work(ctx)
            .watches
            .watches_for_episode(self.0.id, WATCH_LIST_LIMIT)
            .await
            .gql()?;
        Ok(prime_watches(ctx, watches))
    }

    async fn latest_watch(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Option<WatchObject>> {
        Ok(loaders(ctx)
            .latest_watches
            .load(self.0.id)
            .await
            .gql()?
            .map(WatchObject))
    }
}

// --- WatchThrough ---

pub struct WatchThroughObject(pub WatchThrough);

impl WatchThroughObject {
    async fn sequence(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Arc<Vec<WatchThroughEpisode>>> {
        Ok(loaders(ctx)
            .sequences
            .load(self.0.id)
            .await
            .gql()?
            .unwrap_or_default())
    }
}

#[Object(name = "WatchThrough")]
impl WatchThroughObject {
    async fn id(&self) -> ID {
        to_id(&self.0.id)
    }

    async fn status(&self) -> GqlWatchThroughStatus {
        self.0.status.into()
    }

    async fn started_at(&self) -> Option<DateTime<Utc>> {
        self.0.started_at
    }

    async fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.0.updated_at
    }

    async fn series(&self, ctx: &Context<'_>) -> Result<Option<SeriesObject>> {
        Ok(loaders(ctx)
            .series
            .load(self.0.series_id)
            .await
            .gql()?
            .map(SeriesObject))
    }

    async fn watches(&self, ctx: &Context<'_>) -> Result<Vec<WatchObject>> {
        let watches = unit_of_work(ctx)
            .watches
            .watches_for_watch_through(self.0.id, WATCH_LIST_LIMIT)
            .await
            .gql()?;
        Ok(prime_watches(ctx, watches))
    }

    /// Positions in index order, at most 50.
    async fn episodes(
        &self,
        ctx: &Context<'_>,
        watched: Option<GqlWatchedFilter>,
        finished: Option<bool>,
    ) -> Result<Vec<WatchThroughEpisodeObject>> {
        let rows = self.sequence(ctx).await?;
        let filter = EpisodeFilter {
            watched: watched.map(Into::into),
            finished,
        };
        Ok(progress::filter_episodes(&rows, &filter)
            .into_iter()
            .cloned()
            .map(WatchThroughEpisodeObject)
            .collect())
    }

    /// Pending episodes that have already aired.
    async fn unfinished_episode_count(&self, ctx: &Context<'_>) -> Result<i32> {
        let rows = self.sequence(ctx).await?;
        let count =
            progress::unfinished_episode_count(&rows, Utc::now().date_naive());
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    async fn next_episode(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Option<EpisodeObject>> {
        let rows = self.sequence(ctx).await?;
        let next = progress::next_episode(&rows).and_then(|row| row.episode_id);
        load_episode(ctx, next).await
    }

    async fn last_action(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Option<GqlWatchThroughAction>> {
        let rows = self.sequence(ctx).await?;
        let Some(action) = progress::last_action(&rows) else {
            return Ok(None);
        };
        Ok(loaders(ctx).action(action).await.gql()?.map(Into::into))
    }

    async fn last_episode(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Option<WatchThroughEpisodeObject>> {
        let rows = self.sequence(ctx).await?;
        Ok(progress::last_episode(&rows)
            .cloned()
            .map(WatchThroughEpisodeObject))
    }
}

// --- WatchThroughEpisode ---

pub struct WatchThroughEpisodeObject(pub WatchThroughEpisode);

#[Object(name = "WatchThroughEpisode")]
impl WatchThroughEpisodeObject {
    async fn id(&self) -> ID {
        to_id(&self.0.id)
    }

    async fn index(&self) -> i32 {
        self.0.index
    }

    /// Watched or skipped.
    async fn finished(&self) -> bool {
        self.0.is_finished()
    }

    async fn episode(&self, ctx: &Context<'_>) -> Result<Option<EpisodeObject>> {
        load_episode(ctx, self.0.episode_id).await
    }

    async fn watch_through(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Option<WatchThroughObject>> {
        load_watch_through(ctx, Some(self.0.watch_through_id)).await
    }

    async fn action(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Option<GqlWatchThroughAction>> {
        let Some(action) = self.0.action() else {
            return Ok(None);
        };
        Ok(loaders(ctx).action(action).await.gql()?.map(Into::into))
    }
}

// --- Watch / Skip ---

pub struct WatchObject(pub Watch);

#[Object(name = "Watch")]
impl WatchObject {
    async fn id(&self) -> ID {
        to_id(&self.0.id)
    }

    async fn rating(&self) -> Option<f64> {
        self.0.rating
    }

    async fn notes(&self) -> Option<&str> {
        self.0.notes.as_deref()
    }

    async fn started_at(&self) -> Option<DateTime<Utc>> {
        self.0.started_at
    }

    async fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.0.finished_at
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn media(&self, ctx: &Context<'_>) -> Result<Option<Watchable>> {
        Ok(load_episode(ctx, self.0.episode_id)
            .await?
            .map(Watchable::Episode))
    }

    async fn watch_through(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Option<WatchThroughObject>> {
        load_watch_through(ctx, self.0.watch_through_id).await
    }
}

pub struct SkipObject(pub Skip);

#[Object(name = "Skip")]
impl SkipObject {
    async fn id(&self) -> ID {
        to_id(&self.0.id)
    }

    async fn notes(&self) -> Option<&str> {
        self.0.notes.as_deref()
    }

    async fn at(&self) -> Option<DateTime<Utc>> {
        self.0.at
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn media(&self, ctx: &Context<'_>) -> Result<Option<Watchable>> {
        Ok(load_episode(ctx, self.0.episode_id)
            .await?
            .map(Watchable::Episode))
    }

    async fn watch_through(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Option<WatchThroughObject>> {
        load_watch_through(ctx, self.0.watch_through_id).await
    }
}
