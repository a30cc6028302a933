//! On-demand import of provider series trees into the local catalog.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use binge_model::{SeasonStatus, Series};
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::{
    database::ports::catalog::{
        CatalogRepository, NewEpisode, NewSeason, NewSeriesTree,
        SERIES_TMDB_ID_KEY,
    },
    error::{CoreError, Result},
    providers::{MetadataProvider, SeriesMetadata},
};

/// Provider results considered by [`IngestionEngine::search`].
pub const SEARCH_RESULT_LIMIT: usize = 5;

#[derive(Clone)]
pub struct IngestionEngine {
    provider: Arc<dyn MetadataProvider>,
    catalog: Arc<dyn CatalogRepository>,
}

impl fmt::Debug for IngestionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionEngine").finish_non_exhaustive()
    }
}

impl IngestionEngine {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        catalog: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self { provider, catalog }
    }

    /// Returns the local series for `tmdb_id`, importing the whole tree from
    /// the provider first when it is not stored yet. Stored series are never
    /// re-synced.
    pub async fn ensure_series(&self, tmdb_id: &str) -> Result<Series> {
        if let Some(series) = self.catalog.find_series_by_tmdb_id(tmdb_id).await?
        {
            debug!("Series {} already ingested", tmdb_id);
            return Ok(series);
        }

        let metadata = self.provider.fetch_series(tmdb_id).await?;
        let tree = build_series_tree(metadata);

        match self.catalog.insert_series_tree(&tree).await {
            Ok(series) => {
                info!("Ingested series {} ({})", series.name, tmdb_id);
                Ok(series)
            }
            Err(err) if err.violates(SERIES_TMDB_ID_KEY) => {
                warn!(
                    "Series {} was ingested concurrently ({}), using the stored row",
                    tmdb_id, err
                );
                self.catalog
                    .find_series_by_tmdb_id(tmdb_id)
                    .await?
                    .ok_or_else(|| {
                        CoreError::not_found(format!(
                            "series with tmdb id {tmdb_id}"
                        ))
                    })
            }
            Err(err) => Err(err),
        }
    }

    /// Searches the provider and makes sure every hit exists locally.
    /// Results keep the provider's order.
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<Series>> {
        let query = match query.map(str::trim) {
            Some(query) if !query.is_empty() => query,
            _ => return Ok(Vec::new()),
        };

        let mut seen = HashSet::new();
        let tmdb_ids: Vec<String> = self
            .provider
            .search_series(query)
            .await?
            .into_iter()
            .take(SEARCH_RESULT_LIMIT)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        if tmdb_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_tmdb_id: HashMap<String, Series> = self
            .catalog
            .find_series_by_tmdb_ids(&tmdb_ids)
            .await?
            .into_iter()
            .map(|series| (series.tmdb_id.clone(), series))
            .collect();

        let missing: Vec<&String> = tmdb_ids
            .iter()
            .filter(|id| !by_tmdb_id.contains_key(id.as_str()))
            .collect();

        debug!(
            "Search {:?}: {} stored, {} to ingest",
            query,
            tmdb_ids.len() - missing.len(),
            missing.len()
        );

        let ingested =
            try_join_all(missing.into_iter().map(|id| self.ensure_series(id)))
                .await?;
        by_tmdb_id.extend(
            ingested
                .into_iter()
                .map(|series| (series.tmdb_id.clone(), series)),
        );

        Ok(tmdb_ids
            .iter()
            .filter_map(|id| by_tmdb_id.remove(id))
            .collect())
    }
}

/// Flattens provider metadata into an insertable tree, deriving season status.
/// Repeated season numbers and repeated (season, episode) pairs keep their
/// first occurrence.
pub fn build_series_tree(metadata: SeriesMetadata) -> NewSeriesTree {
    let SeriesMetadata {
        tmdb_id,
        imdb_id,
        name,
        first_aired,
        status,
        overview,
        poster,
        number_of_seasons,
        seasons,
    } = metadata;

    let mut new_seasons = Vec::with_capacity(seasons.len());
    let mut new_episodes = Vec::new();
    let mut season_numbers = HashSet::new();
    let mut episode_numbers = HashSet::new();

    for season in seasons {
        if !season_numbers.insert(season.number) {
            warn!(
                "Series {} lists season {} twice, keeping the first",
                tmdb_id, season.number
            );
            continue;
        }

        new_seasons.push(NewSeason {
            number: season.number,
            first_aired: season.first_aired,
            status: SeasonStatus::derive(season.number, number_of_seasons, status),
            overview: season.overview,
            poster: season.poster,
        });

        for episode in season.episodes {
            if !episode_numbers.insert((episode.season_number, episode.number)) {
                warn!(
                    "Series {} lists episode {}x{} twice, keeping the first",
                    tmdb_id, episode.season_number, episode.number
                );
                continue;
            }

            new_episodes.push(NewEpisode {
                season_number: episode.season_number,
                number: episode.number,
                title: episode.title,
                first_aired: episode.first_aired,
                overview: episode.overview,
                still: episode.still,
            });
        }
    }

    NewSeriesTree {
        tmdb_id,
        imdb_id,
        name,
        first_aired,
        status,
        overview,
        poster,
        seasons: new_seasons,
        episodes: new_episodes,
    }
}
