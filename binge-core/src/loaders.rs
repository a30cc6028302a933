//! Request-scoped batching caches.
//!
//! A [`BatchLoader`] collects the keys requested by sibling resolvers while
//! they are polled together, then issues one bulk fetch for all of them. Each
//! key is fetched at most once per loader unless it is
//! [forgotten](BatchLoader::forget). Loaders are built per GraphQL request
//! through [`RequestLoaders`] and are never shared between requests.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use binge_model::{
    ActionRef, Episode, EpisodeID, Season, SeasonID, Series, SeriesID, Skip,
    SkipID, Watch, WatchID, WatchThrough, WatchThroughAction,
    WatchThroughEpisode, WatchThroughID,
};
use futures::future::try_join_all;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    application::unit_of_work::AppUnitOfWork,
    database::ports::{catalog::CatalogRepository, watches::WatchRepository},
    error::{CoreError, Result},
};

/// Bulk lookup behind a [`BatchLoader`]. Keys missing from the returned map
/// resolve to `None`.
#[async_trait]
pub trait BatchFetch: Send + Sync + 'static {
    type Key: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;

    async fn fetch(
        &self,
        keys: &[Self::Key],
    ) -> Result<HashMap<Self::Key, Self::Value>>;
}

type BatchOutcome<K, V> = std::result::Result<Arc<HashMap<K, V>>, String>;

struct Batch<K, V> {
    keys: Mutex<Vec<K>>,
    outcome: OnceCell<BatchOutcome<K, V>>,
}

impl<K, V> Batch<K, V> {
    fn new() -> Self {
        Self {
            keys: Mutex::new(Vec::new()),
            outcome: OnceCell::new(),
        }
    }
}

struct LoaderState<K, V> {
    resolved: HashMap<K, Option<V>>,
    in_flight: HashMap<K, Arc<Batch<K, V>>>,
    /// Batch still accepting keys.
    open: Option<Arc<Batch<K, V>>>,
    fetches: usize,
}

pub struct BatchLoader<F: BatchFetch> {
    fetcher: F,
    state: Mutex<LoaderState<F::Key, F::Value>>,
}

impl<F: BatchFetch> fmt::Debug for BatchLoader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BatchLoader")
            .field("fetcher", &std::any::type_name::<F>())
            .field("cached", &state.resolved.len())
            .field("in_flight", &state.in_flight.len())
            .field("fetches", &state.fetches)
            .finish()
    }
}

impl<F: BatchFetch> BatchLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            state: Mutex::new(LoaderState {
                resolved: HashMap::new(),
                in_flight: HashMap::new(),
                open: None,
                fetches: 0,
            }),
        }
    }

    pub async fn load(&self, key: F::Key) -> Result<Option<F::Value>> {
        let batch = {
            let mut state = self.state.lock();
            if let Some(cached) = state.resolved.get(&key) {
                return Ok(cached.clone());
            }

            match state.in_flight.get(&key) {
                Some(batch) => batch.clone(),
                None => {
                    let batch = state
                        .open
                        .get_or_insert_with(|| Arc::new(Batch::new()))
                        .clone();
                    batch.keys.lock().push(key.clone());
                    state.in_flight.insert(key.clone(), batch.clone());
                    batch
                }
            }
        };

        // Let sibling futures enqueue their keys before the batch closes.
        tokio::task::yield_now().await;

        match batch.outcome.get_or_init(|| self.flush(&batch)).await {
            Ok(found) => Ok(found.get(&key).cloned()),
            Err(message) => Err(CoreError::Internal(format!(
                "batched load failed: {message}"
            ))),
        }
    }

    /// Loads every key, preserving order.
    pub async fn load_many(
        &self,
        keys: impl IntoIterator<Item = F::Key>,
    ) -> Result<Vec<Option<F::Value>>> {
        try_join_all(keys.into_iter().map(|key| self.load(key))).await
    }

    /// Seeds the cache, typically with a row a mutation just wrote.
    pub fn prime(&self, key: F::Key, value: F::Value) {
        self.state.lock().resolved.insert(key, Some(value));
    }

    /// Drops a cached entry so the next load fetches it again.
    pub fn forget(&self, key: &F::Key) {
        self.state.lock().resolved.remove(key);
    }

    #[cfg(test)]
    fn fetch_count(&self) -> usize {
        self.state.lock().fetches
    }

    async fn flush(
        &self,
        batch: &Arc<Batch<F::Key, F::Value>>,
    ) -> BatchOutcome<F::Key, F::Value> {
        let keys = {
            let mut state = self.state.lock();
            if state
                .open
                .as_ref()
                .is_some_and(|open| Arc::ptr_eq(open, batch))
            {
                state.open = None;
            }
            state.fetches += 1;
            batch.keys.lock().clone()
        };

        debug!(
            "Flushing {} batch of {} keys",
            std::any::type_name::<F>(),
            keys.len()
        );

        let fetched = self.fetcher.fetch(&keys).await;

        let mut state = self.state.lock();
        for key in &keys {
            state.in_flight.remove(key);
        }

        match fetched {
            Ok(found) => {
                for key in &keys {
                    state.resolved.insert(key.clone(), found.get(key).cloned());
                }
                Ok(Arc::new(found))
            }
            Err(err) => Err(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct SeriesFetcher(pub Arc<dyn CatalogRepository>);

#[async_trait]
impl BatchFetch for SeriesFetcher {
    type Key = SeriesID;
    type Value = Series;

    async fn fetch(&self, keys: &[SeriesID]) -> Result<HashMap<SeriesID, Series>> {
        let rows = self.0.series_by_ids(keys).await?;
        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }
}

#[derive(Clone)]
pub struct SeasonFetcher(pub Arc<dyn CatalogRepository>);

#[async_trait]
impl BatchFetch for SeasonFetcher {
    type Key = SeasonID;
    type Value = Season;

    async fn fetch(&self, keys: &[SeasonID]) -> Result<HashMap<SeasonID, Season>> {
        let rows = self.0.seasons_by_ids(keys).await?;
        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }
}

#[derive(Clone)]
pub struct EpisodeFetcher(pub Arc<dyn CatalogRepository>);

#[async_trait]
impl BatchFetch for EpisodeFetcher {
    type Key = EpisodeID;
    type Value = Episode;

    async fn fetch(
        &self,
        keys: &[EpisodeID],
    ) -> Result<HashMap<EpisodeID, Episode>> {
        let rows = self.0.episodes_by_ids(keys).await?;
        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }
}

#[derive(Clone)]
pub struct WatchFetcher(pub Arc<dyn WatchRepository>);

#[async_trait]
impl BatchFetch for WatchFetcher {
    type Key = WatchID;
    type Value = Watch;

    async fn fetch(&self, keys: &[WatchID]) -> Result<HashMap<WatchID, Watch>> {
        let rows = self.0.watches_by_ids(keys).await?;
        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }
}

#[derive(Clone)]
pub struct SkipFetcher(pub Arc<dyn WatchRepository>);

#[async_trait]
impl BatchFetch for SkipFetcher {
    type Key = SkipID;
    type Value = Skip;

    async fn fetch(&self, keys: &[SkipID]) -> Result<HashMap<SkipID, Skip>> {
        let rows = self.0.skips_by_ids(keys).await?;
        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }
}

#[derive(Clone)]
pub struct WatchThroughFetcher(pub Arc<dyn WatchRepository>);

#[async_trait]
impl BatchFetch for WatchThroughFetcher {
    type Key = WatchThroughID;
    type Value = WatchThrough;

    async fn fetch(
        &self,
        keys: &[WatchThroughID],
    ) -> Result<HashMap<WatchThroughID, WatchThrough>> {
        let rows = self.0.watch_throughs_by_ids(keys).await?;
        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }
}

/// Join rows of each watch-through, in index order. Every requested key
/// resolves, to an empty sequence when it has no rows.
#[derive(Clone)]
pub struct SequenceFetcher(pub Arc<dyn WatchRepository>);

#[async_trait]
impl BatchFetch for SequenceFetcher {
    type Key = WatchThroughID;
    type Value = Arc<Vec<WatchThroughEpisode>>;

    async fn fetch(
        &self,
        keys: &[WatchThroughID],
    ) -> Result<HashMap<WatchThroughID, Arc<Vec<WatchThroughEpisode>>>> {
        let mut grouped: HashMap<WatchThroughID, Vec<WatchThroughEpisode>> =
            keys.iter().map(|key| (*key, Vec::new())).collect();

        for row in self.0.watch_through_sequences(keys).await? {
            grouped.entry(row.watch_through_id).or_default().push(row);
        }

        Ok(grouped
            .into_iter()
            .map(|(key, mut rows)| {
                rows.sort_by_key(|row| row.index);
                (key, Arc::new(rows))
            })
            .collect())
    }
}

/// Most recent watch of each episode.
#[derive(Clone)]
pub struct LatestWatchFetcher(pub Arc<dyn WatchRepository>);

#[async_trait]
impl BatchFetch for LatestWatchFetcher {
    type Key = EpisodeID;
    type Value = Watch;

    async fn fetch(&self, keys: &[EpisodeID]) -> Result<HashMap<EpisodeID, Watch>> {
        let rows = self.0.latest_watches_for_episodes(keys).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.episode_id.map(|episode_id| (episode_id, row)))
            .collect())
    }
}

/// One loader per entity, created fresh for every GraphQL request.
#[derive(Debug)]
pub struct RequestLoaders {
    pub series: BatchLoader<SeriesFetcher>,
    pub seasons: BatchLoader<SeasonFetcher>,
    pub episodes: BatchLoader<EpisodeFetcher>,
    pub watches: BatchLoader<WatchFetcher>,
    pub skips: BatchLoader<SkipFetcher>,
    pub watch_throughs: BatchLoader<WatchThroughFetcher>,
    pub sequences: BatchLoader<SequenceFetcher>,
    pub latest_watches: BatchLoader<LatestWatchFetcher>,
}

impl RequestLoaders {
    pub fn new(uow: &AppUnitOfWork) -> Self {
        Self {
            series: BatchLoader::new(SeriesFetcher(uow.catalog.clone())),
            seasons: BatchLoader::new(SeasonFetcher(uow.catalog.clone())),
            episodes: BatchLoader::new(EpisodeFetcher(uow.catalog.clone())),
            watches: BatchLoader::new(WatchFetcher(uow.watches.clone())),
            skips: BatchLoader::new(SkipFetcher(uow.watches.clone())),
            watch_throughs: BatchLoader::new(WatchThroughFetcher(
                uow.watches.clone(),
            )),
            sequences: BatchLoader::new(SequenceFetcher(uow.watches.clone())),
            latest_watches: BatchLoader::new(LatestWatchFetcher(
                uow.watches.clone(),
            )),
        }
    }

    /// Loads the row behind an action reference.
    pub async fn action(
        &self,
        action: ActionRef,
    ) -> Result<Option<WatchThroughAction>> {
        Ok(match action {
            ActionRef::Watch(id) => {
                self.watches.load(id).await?.map(WatchThroughAction::Watch)
            }
            ActionRef::Skip(id) => {
                self.skips.load(id).await?.map(WatchThroughAction::Skip)
            }
        })
    }

    /// Drops everything cached about a watch-through after a mutation.
    pub fn forget_watch_through(&self, id: &WatchThroughID) {
        self.watch_throughs.forget(id);
        self.sequences.forget(id);
    }
}
