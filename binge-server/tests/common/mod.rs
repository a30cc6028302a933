//! In-memory repositories and fixtures for exercising the GraphQL layer
//! without PostgreSQL.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use binge_core::database::{
    CatalogRepository, EpisodeSlice, NewSeriesTree, NewSkip, NewWatch,
    NewWatchThrough, SERIES_TMDB_ID_KEY, WatchRepository,
};
use binge_core::providers::{MetadataProvider, ProviderError, SeriesMetadata};
use binge_core::{AppUnitOfWork, CoreError, Result};
use binge_model::{
    Episode, EpisodeID, Season, SeasonID, SeasonStatus, Series, SeriesID,
    SeriesStatus, Skip, SkipID, Watch, WatchID, WatchThrough,
    WatchThroughEpisode, WatchThroughEpisodeID, WatchThroughID,
    WatchThroughStatus,
};
use binge_server::AppState;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Default)]
struct Store {
    series: Vec<Series>,
    seasons: Vec<Season>,
    episodes: Vec<Episode>,
    watch_throughs: Vec<WatchThrough>,
    rows: Vec<WatchThroughEpisode>,
    watches: Vec<Watch>,
    skips: Vec<Skip>,
}

#[derive(Clone, Copy)]
enum Link {
    Watch(WatchID),
    Skip(SkipID),
}

impl Store {
    fn season_number(&self, season_id: SeasonID) -> i32 {
        self.seasons
            .iter()
            .find(|season| season.id == season_id)
            .map(|season| season.number)
            .unwrap_or_default()
    }

    fn ordered_episodes(&self, series_id: SeriesID) -> Vec<Episode> {
        let mut episodes: Vec<Episode> = self
            .episodes
            .iter()
            .filter(|episode| episode.series_id == series_id)
            .cloned()
            .collect();
        episodes.sort_by_key(|episode| {
            (self.season_number(episode.season_id), episode.number)
        });
        episodes
    }

    fn link(
        &mut self,
        watch_through_id: WatchThroughID,
        episode_id: EpisodeID,
        link: Link,
        at: DateTime<Utc>,
    ) -> Result<()> {
        for row in self.rows.iter_mut().filter(|row| {
            row.watch_through_id == watch_through_id
                && row.episode_id == Some(episode_id)
        }) {
            match link {
                Link::Watch(id) => row.watch_id = Some(id),
                Link::Skip(id) => row.skip_id = Some(id),
            }
        }

        let pending = self.rows.iter().any(|row| {
            row.watch_through_id == watch_through_id && !row.is_finished()
        });
        let watch_through = self
            .watch_throughs
            .iter_mut()
            .find(|wt| wt.id == watch_through_id)
            .ok_or_else(|| {
                CoreError::not_found(format!("watch-through {watch_through_id}"))
            })?;
        watch_through.updated_at = Some(at);
        if !pending {
            watch_through.status = WatchThroughStatus::Finished;
        }
        Ok(())
    }
}

/// Implements both repository ports over vectors and counts every access.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<Store>,
    calls: AtomicUsize,
}

impl InMemoryRepository {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap()
    }
}

fn by_ids<T: Clone, K: PartialEq>(
    items: &[T],
    ids: &[K],
    key: impl Fn(&T) -> K,
) -> Vec<T> {
    items
        .iter()
        .filter(|item| ids.contains(&key(item)))
        .cloned()
        .collect()
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn find_series_by_tmdb_id(
        &self,
        tmdb_id: &str,
    ) -> Result<Option<Series>> {
        Ok(self
            .store()
            .series
            .iter()
            .find(|series| series.tmdb_id == tmdb_id)
            .cloned())
    }

    async fn find_series_by_tmdb_ids(
        &self,
        tmdb_ids: &[String],
    ) -> Result<Vec<Series>> {
        Ok(by_ids(&self.store().series, tmdb_ids, |series| {
            series.tmdb_id.clone()
        }))
    }

    async fn insert_series_tree(&self, tree: &NewSeriesTree) -> Result<Series> {
        let mut store = self.store();
        if store.series.iter().any(|series| series.tmdb_id == tree.tmdb_id) {
            return Err(CoreError::Conflict {
                constraint: Some(SERIES_TMDB_ID_KEY.to_string()),
                message: format!("tmdb id {}", tree.tmdb_id),
            });
        }

        let series = Series {
            id: SeriesID(Uuid::new_v4()),
            tmdb_id: tree.tmdb_id.clone(),
            imdb_id: tree.imdb_id.clone(),
            name: tree.name.clone(),
            first_aired: tree.first_aired,
            status: tree.status,
            overview: tree.overview.clone(),
            poster: tree.poster.clone(),
            created_at: Utc::now(),
        };

        let mut season_ids = HashMap::new();
        for season in &tree.seasons {
            let id = SeasonID(Uuid::new_v4());
            season_ids.insert(season.number, id);
            store.seasons.push(Season {
                id,
                series_id: series.id,
                number: season.number,
                first_aired: season.first_aired,
                status: season.status,
                overview: season.overview.clone(),
                poster: season.poster.clone(),
            });
        }

        for episode in &tree.episodes {
            let Some(season_id) = season_ids.get(&episode.season_number) else {
                continue;
            };
            store.episodes.push(Episode {
                id: EpisodeID(Uuid::new_v4()),
                series_id: series.id,
                season_id: *season_id,
                number: episode.number,
                title: episode.title.clone(),
                first_aired: episode.first_aired,
                overview: episode.overview.clone(),
                still: episode.still.clone(),
            });
        }

        store.series.push(series.clone());
        Ok(series)
    }

    async fn series_by_ids(&self, ids: &[SeriesID]) -> Result<Vec<Series>> {
        Ok(by_ids(&self.store().series, ids, |series| series.id))
    }

    async fn seasons_by_ids(&self, ids: &[SeasonID]) -> Result<Vec<Season>> {
        Ok(by_ids(&self.store().seasons, ids, |season| season.id))
    }

    async fn episodes_by_ids(&self, ids: &[EpisodeID]) -> Result<Vec<Episode>> {
        Ok(by_ids(&self.store().episodes, ids, |episode| episode.id))
    }

    async fn seasons_for_series(
        &self,
        series_id: SeriesID,
    ) -> Result<Vec<Season>> {
        let mut seasons: Vec<Season> = self
            .store()
            .seasons
            .iter()
            .filter(|season| season.series_id == series_id)
            .cloned()
            .collect();
        seasons.sort_by_key(|season| season.number);
        Ok(seasons)
    }

    async fn season_by_number(
        &self,
        series_id: SeriesID,
        number: i32,
    ) -> Result<Option<Season>> {
        Ok(self
            .store()
            .seasons
            .iter()
            .find(|season| {
                season.series_id == series_id && season.number == number
            })
            .cloned())
    }

    async fn episodes_for_series(
        &self,
        series_id: SeriesID,
    ) -> Result<Vec<Episode>> {
        Ok(self.store().ordered_episodes(series_id))
    }

    async fn episodes_for_season(
        &self,
        season_id: SeasonID,
    ) -> Result<Vec<Episode>> {
        let mut episodes: Vec<Episode> = self
            .store()
            .episodes
            .iter()
            .filter(|episode| episode.season_id == season_id)
            .cloned()
            .collect();
        episodes.sort_by_key(|episode| episode.number);
        Ok(episodes)
    }

    async fn episode_by_number(
        &self,
        series_id: SeriesID,
        season_number: i32,
        number: i32,
    ) -> Result<Option<Episode>> {
        let store = self.store();
        Ok(store
            .episodes
            .iter()
            .find(|episode| {
                episode.series_id == series_id
                    && episode.number == number
                    && store.season_number(episode.season_id) == season_number
            })
            .cloned())
    }

    async fn episode_ids_for_seasons(
        &self,
        season_ids: &[SeasonID],
    ) -> Result<Vec<EpisodeID>> {
        let store = self.store();
        let mut episodes: Vec<&Episode> = store
            .episodes
            .iter()
            .filter(|episode| season_ids.contains(&episode.season_id))
            .collect();
        episodes.sort_by_key(|episode| {
            (store.season_number(episode.season_id), episode.number)
        });
        Ok(episodes.into_iter().map(|episode| episode.id).collect())
    }

    async fn episode_ids_for_series(
        &self,
        series_id: SeriesID,
        include_specials: bool,
    ) -> Result<Vec<EpisodeID>> {
        let store = self.store();
        Ok(store
            .ordered_episodes(series_id)
            .into_iter()
            .filter(|episode| {
                include_specials || store.season_number(episode.season_id) != 0
            })
            .map(|episode| episode.id)
            .collect())
    }
}

#[async_trait]
impl WatchRepository for InMemoryRepository {
    async fn watches_by_ids(&self, ids: &[WatchID]) -> Result<Vec<Watch>> {
        Ok(by_ids(&self.store().watches, ids, |watch| watch.id))
    }

    async fn skips_by_ids(&self, ids: &[SkipID]) -> Result<Vec<Skip>> {
        Ok(by_ids(&self.store().skips, ids, |skip| skip.id))
    }

    async fn watch_throughs_by_ids(
        &self,
        ids: &[WatchThroughID],
    ) -> Result<Vec<WatchThrough>> {
        Ok(by_ids(&self.store().watch_throughs, ids, |wt| wt.id))
    }

    async fn watch_through_sequences(
        &self,
        ids: &[WatchThroughID],
    ) -> Result<Vec<WatchThroughEpisode>> {
        let store = self.store();
        let mut rows: Vec<WatchThroughEpisode> = store
            .rows
            .iter()
            .filter(|row| ids.contains(&row.watch_through_id))
            .map(|row| {
                let aired = store
                    .episodes
                    .iter()
                    .find(|episode| Some(episode.id) == row.episode_id)
                    .and_then(|episode| episode.first_aired);
                WatchThroughEpisode {
                    episode_first_aired: aired,
                    ..row.clone()
                }
            })
            .collect();
        rows.sort_by_key(|row| row.index);
        Ok(rows)
    }

    async fn unfinished_watch_throughs(
        &self,
        limit: i64,
    ) -> Result<Vec<WatchThrough>> {
        let mut open: Vec<WatchThrough> = self
            .store()
            .watch_throughs
            .iter()
            .filter(|wt| wt.status != WatchThroughStatus::Finished)
            .cloned()
            .collect();
        open.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        open.truncate(limit as usize);
        Ok(open)
    }

    async fn watches_for_watch_through(
        &self,
        watch_through_id: WatchThroughID,
        limit: i64,
    ) -> Result<Vec<Watch>> {
        Ok(self
            .store()
            .watches
            .iter()
            .filter(|watch| watch.watch_through_id == Some(watch_through_id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn watches_for_episode(
        &self,
        episode_id: EpisodeID,
        limit: i64,
    ) -> Result<Vec<Watch>> {
        Ok(self
            .store()
            .watches
            .iter()
            .filter(|watch| watch.episode_id == Some(episode_id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn latest_watches_for_episodes(
        &self,
        episode_ids: &[EpisodeID],
    ) -> Result<Vec<Watch>> {
        let store = self.store();
        let mut latest: HashMap<EpisodeID, Watch> = HashMap::new();
        for watch in &store.watches {
            let Some(episode_id) = watch.episode_id else {
                continue;
            };
            if !episode_ids.contains(&episode_id) {
                continue;
            }
            let newer = latest
                .get(&episode_id)
                .is_none_or(|current| watch.created_at >= current.created_at);
            if newer {
                latest.insert(episode_id, watch.clone());
            }
        }
        Ok(latest.into_values().collect())
    }

    async fn create_watch_through(
        &self,
        new: &NewWatchThrough,
    ) -> Result<WatchThrough> {
        let mut store = self.store();
        let watch_through = WatchThrough {
            id: WatchThroughID(Uuid::new_v4()),
            series_id: new.series_id,
            status: WatchThroughStatus::Ongoing,
            started_at: Some(new.started_at),
            updated_at: Some(new.started_at),
            created_at: Utc::now(),
        };

        for (index, episode_id) in new.episode_ids.iter().enumerate() {
            store.rows.push(WatchThroughEpisode {
                id: WatchThroughEpisodeID(Uuid::new_v4()),
                watch_through_id: watch_through.id,
                episode_id: Some(*episode_id),
                index: index as i32,
                watch_id: None,
                skip_id: None,
                episode_first_aired: None,
            });
        }

        store.watch_throughs.push(watch_through.clone());
        Ok(watch_through)
    }

    async fn record_watch(&self, new: &NewWatch) -> Result<Watch> {
        let mut store = self.store();
        let watch = Watch {
            id: WatchID(Uuid::new_v4()),
            episode_id: Some(new.episode_id),
            watch_through_id: new.watch_through_id,
            rating: new.rating,
            notes: new.notes.clone(),
            started_at: new.started_at,
            finished_at: new.finished_at,
            created_at: Utc::now(),
        };

        if let Some(watch_through_id) = new.watch_through_id {
            store.link(
                watch_through_id,
                new.episode_id,
                Link::Watch(watch.id),
                new.activity_at,
            )?;
        }

        store.watches.push(watch.clone());
        Ok(watch)
    }

    async fn record_skip(&self, new: &NewSkip) -> Result<Skip> {
        let mut store = self.store();
        let skip = Skip {
            id: SkipID(Uuid::new_v4()),
            episode_id: Some(new.episode_id),
            watch_through_id: new.watch_through_id,
            notes: new.notes.clone(),
            at: Some(new.at),
            created_at: Utc::now(),
        };

        if let Some(watch_through_id) = new.watch_through_id {
            store.link(
                watch_through_id,
                new.episode_id,
                Link::Skip(skip.id),
                new.at,
            )?;
        }

        store.skips.push(skip.clone());
        Ok(skip)
    }

    async fn delete_watch(&self, id: WatchID) -> Result<Option<Watch>> {
        let mut store = self.store();
        let Some(position) = store.watches.iter().position(|w| w.id == id) else {
            return Ok(None);
        };
        let watch = store.watches.remove(position);

        let mut touched = Vec::new();
        for row in store.rows.iter_mut().filter(|row| row.watch_id == Some(id)) {
            row.watch_id = None;
            touched.push(row.watch_through_id);
        }
        for wt in store
            .watch_throughs
            .iter_mut()
            .filter(|wt| touched.contains(&wt.id))
        {
            wt.status = WatchThroughStatus::Ongoing;
        }

        Ok(Some(watch))
    }

    async fn delete_watch_through(&self, id: WatchThroughID) -> Result<bool> {
        let mut store = self.store();
        let before = store.watch_throughs.len();
        store.watch_throughs.retain(|wt| wt.id != id);
        store.rows.retain(|row| row.watch_through_id != id);
        Ok(store.watch_throughs.len() != before)
    }

    async fn insert_watches_for_series(
        &self,
        series_id: SeriesID,
        slice: &EpisodeSlice,
    ) -> Result<u64> {
        let mut store = self.store();
        let selected: Vec<EpisodeID> = store
            .ordered_episodes(series_id)
            .into_iter()
            .filter(|episode| {
                let season_number = store.season_number(episode.season_id);
                slice.contains(season_number, episode.number)
            })
            .map(|episode| episode.id)
            .collect();

        for episode_id in &selected {
            store.watches.push(Watch {
                id: WatchID(Uuid::new_v4()),
                episode_id: Some(*episode_id),
                watch_through_id: None,
                rating: None,
                notes: None,
                started_at: None,
                finished_at: None,
                created_at: Utc::now(),
            });
        }

        Ok(selected.len() as u64)
    }
}

/// Provider that only knows the ids it was built with.
#[derive(Default)]
pub struct StaticProvider {
    pub series: Vec<SeriesMetadata>,
    pub calls: AtomicUsize,
}

impl StaticProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for StaticProvider {
    async fn search_series(
        &self,
        _query: &str,
    ) -> std::result::Result<Vec<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.series.iter().map(|s| s.tmdb_id.clone()).collect())
    }

    async fn fetch_series(
        &self,
        tmdb_id: &str,
    ) -> std::result::Result<SeriesMetadata, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.series
            .iter()
            .find(|series| series.tmdb_id == tmdb_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(tmdb_id.to_string()))
    }
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// A stored series with a specials season and one regular season of four
/// episodes, the last of which has not aired yet.
pub struct Fixture {
    pub repo: Arc<InMemoryRepository>,
    pub series: Series,
    pub seasons: Vec<Season>,
    /// Season 1 episodes in order.
    pub episodes: Vec<Episode>,
}

impl Fixture {
    pub async fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::default());
        let tree = NewSeriesTree {
            tmdb_id: "1399".into(),
            imdb_id: Some("tt0944947".into()),
            name: "Fixture Show".into(),
            first_aired: date(2020, 1, 1),
            status: SeriesStatus::Returning,
            overview: None,
            poster: Some("https://image.tmdb.org/t/p/original/poster.jpg".into()),
            seasons: [0, 1]
                .into_iter()
                .map(|number| binge_core::database::NewSeason {
                    number,
                    first_aired: date(2020, 1, 1),
                    status: if number == 1 {
                        SeasonStatus::Continuing
                    } else {
                        SeasonStatus::Ended
                    },
                    overview: None,
                    poster: None,
                })
                .collect(),
            episodes: [(0, 1, date(2020, 6, 1))]
                .into_iter()
                .chain((1..=3).map(|n| (1, n, date(2020, 1, n as u32))))
                .chain([(1, 4, date(2999, 1, 1))])
                .map(|(season_number, number, first_aired)| {
                    binge_core::database::NewEpisode {
                        season_number,
                        number,
                        title: format!("{season_number}x{number}"),
                        first_aired,
                        overview: None,
                        still: None,
                    }
                })
                .collect(),
        };

        let series = repo.insert_series_tree(&tree).await.unwrap();
        let seasons = repo.seasons_for_series(series.id).await.unwrap();
        let episodes = repo.episodes_for_season(seasons[1].id).await.unwrap();

        Self {
            repo,
            series,
            seasons,
            episodes,
        }
    }

    pub fn state(&self) -> AppState {
        self.state_with_provider(Arc::new(StaticProvider::default()))
    }

    pub fn state_with_provider(
        &self,
        provider: Arc<dyn MetadataProvider>,
    ) -> AppState {
        AppState::new(self.unit_of_work(), provider)
    }

    pub fn unit_of_work(&self) -> AppUnitOfWork {
        AppUnitOfWork::new(self.repo.clone(), self.repo.clone())
    }
}
