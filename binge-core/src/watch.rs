//! Watch-through mutations.

use std::fmt;
use std::sync::Arc;

use binge_model::{
    EpisodeID, SeasonID, SeriesID, Skip, Watch, WatchID, WatchThrough,
    WatchThroughID,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    application::unit_of_work::AppUnitOfWork,
    database::ports::{
        catalog::CatalogRepository,
        watches::{
            EpisodeSlice, NewSkip, NewWatch, NewWatchThrough, WatchRepository,
        },
    },
    error::{CoreError, Result},
};

/// Which episodes a new watch-through walks through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeSelection {
    /// Exactly these episodes, in this order.
    Episodes(Vec<EpisodeID>),
    /// Every episode of these seasons by (season, episode) number.
    Seasons(Vec<SeasonID>),
    /// The whole series by (season, episode) number.
    Series { include_specials: bool },
}

impl EpisodeSelection {
    /// Explicit episodes win over seasons, which win over the whole series.
    pub fn resolve(
        seasons: Option<Vec<SeasonID>>,
        episodes: Option<Vec<EpisodeID>>,
        include_specials: bool,
    ) -> Self {
        match (episodes, seasons) {
            (Some(episodes), _) => EpisodeSelection::Episodes(episodes),
            (None, Some(seasons)) => EpisodeSelection::Seasons(seasons),
            (None, None) => EpisodeSelection::Series { include_specials },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchEpisodeRequest {
    pub watch_through_id: Option<WatchThroughID>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkipEpisodeRequest {
    pub watch_through_id: Option<WatchThroughID>,
    pub notes: Option<String>,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct WatchService {
    catalog: Arc<dyn CatalogRepository>,
    watches: Arc<dyn WatchRepository>,
}

impl fmt::Debug for WatchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchService").finish_non_exhaustive()
    }
}

impl WatchService {
    pub fn new(uow: &AppUnitOfWork) -> Self {
        Self {
            catalog: uow.catalog.clone(),
            watches: uow.watches.clone(),
        }
    }

    pub async fn start_watch_through(
        &self,
        series_id: SeriesID,
        selection: EpisodeSelection,
    ) -> Result<WatchThrough> {
        let episode_ids = match selection {
            EpisodeSelection::Episodes(episodes) => episodes,
            EpisodeSelection::Seasons(seasons) => {
                self.catalog.episode_ids_for_seasons(&seasons).await?
            }
            EpisodeSelection::Series { include_specials } => {
                self.catalog
                    .episode_ids_for_series(series_id, include_specials)
                    .await?
            }
        };

        debug!(
            "Starting watch-through of series {} over {} episodes",
            series_id,
            episode_ids.len()
        );

        self.watches
            .create_watch_through(&NewWatchThrough {
                series_id,
                episode_ids,
                started_at: Utc::now(),
            })
            .await
    }

    pub async fn watch_episode(
        &self,
        episode_id: EpisodeID,
        request: WatchEpisodeRequest,
    ) -> Result<Watch> {
        let activity_at = request
            .finished_at
            .or(request.started_at)
            .unwrap_or_else(Utc::now);

        let watch = self
            .watches
            .record_watch(&NewWatch {
                episode_id,
                watch_through_id: request.watch_through_id,
                rating: request.rating,
                notes: request.notes,
                started_at: request.started_at,
                finished_at: request.finished_at,
                activity_at,
            })
            .await?;

        info!("Recorded watch {} of episode {}", watch.id, episode_id);
        Ok(watch)
    }

    pub async fn skip_episode(
        &self,
        episode_id: EpisodeID,
        request: SkipEpisodeRequest,
    ) -> Result<Skip> {
        let skip = self
            .watches
            .record_skip(&NewSkip {
                episode_id,
                watch_through_id: request.watch_through_id,
                notes: request.notes,
                at: request.at.unwrap_or_else(Utc::now),
            })
            .await?;

        info!("Recorded skip {} of episode {}", skip.id, episode_id);
        Ok(skip)
    }

    /// Deletes a watch and returns the watch-through it belonged to.
    pub async fn delete_watch(
        &self,
        id: WatchID,
    ) -> Result<Option<WatchThroughID>> {
        let deleted = self
            .watches
            .delete_watch(id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("watch {id}")))?;

        info!("Deleted watch {}", id);
        Ok(deleted.watch_through_id)
    }

    /// Returns whether the watch-through existed.
    pub async fn delete_watch_through(&self, id: WatchThroughID) -> Result<bool> {
        let existed = self.watches.delete_watch_through(id).await?;
        if existed {
            info!("Deleted watch-through {}", id);
        }
        Ok(existed)
    }

    /// Marks every episode of the series inside `slice` as watched.
    pub async fn watch_episodes_from_series(
        &self,
        series_id: SeriesID,
        slice: Option<EpisodeSlice>,
    ) -> Result<u64> {
        self.watches
            .insert_watches_for_series(series_id, &slice.unwrap_or_default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ports::{
        catalog::MockCatalogRepository,
        watches::{EpisodeBoundary, MockWatchRepository},
    };
    use binge_model::{SkipID, WatchThroughStatus};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn service(
        catalog: MockCatalogRepository,
        watches: MockWatchRepository,
    ) -> WatchService {
        WatchService::new(&AppUnitOfWork::new(
            Arc::new(catalog),
            Arc::new(watches),
        ))
    }

    fn watch_through(new: &NewWatchThrough) -> WatchThrough {
        WatchThrough {
            id: WatchThroughID(Uuid::new_v4()),
            series_id: new.series_id,
            status: WatchThroughStatus::Ongoing,
            started_at: Some(new.started_at),
            updated_at: Some(new.started_at),
            created_at: new.started_at,
        }
    }

    fn episode_ids(count: usize) -> Vec<EpisodeID> {
        (0..count).map(|_| EpisodeID(Uuid::new_v4())).collect()
    }

    #[test]
    fn explicit_episodes_take_precedence() {
        let episodes = episode_ids(2);
        let seasons = vec![SeasonID(Uuid::new_v4())];

        assert_eq!(
            EpisodeSelection::resolve(
                Some(seasons.clone()),
                Some(episodes.clone()),
                true
            ),
            EpisodeSelection::Episodes(episodes)
        );
        assert_eq!(
            EpisodeSelection::resolve(Some(seasons.clone()), None, true),
            EpisodeSelection::Seasons(seasons)
        );
        assert_eq!(
            EpisodeSelection::resolve(None, None, false),
            EpisodeSelection::Series {
                include_specials: false
            }
        );
    }

    #[tokio::test]
    async fn explicit_episodes_keep_the_given_order() {
        let series_id = SeriesID(Uuid::new_v4());
        let episodes = episode_ids(3);
        let expected = episodes.clone();

        let mut catalog = MockCatalogRepository::new();
        catalog.expect_episode_ids_for_seasons().never();
        catalog.expect_episode_ids_for_series().never();

        let mut watches = MockWatchRepository::new();
        watches
            .expect_create_watch_through()
            .withf(move |new| {
                new.series_id == series_id && new.episode_ids == expected
            })
            .times(1)
            .returning(|new| Ok(watch_through(new)));

        let created = service(catalog, watches)
            .start_watch_through(
                series_id,
                EpisodeSelection::resolve(
                    Some(vec![SeasonID(Uuid::new_v4())]),
                    Some(episodes),
                    true,
                ),
            )
            .await
            .unwrap();

        assert_eq!(created.series_id, series_id);
        assert_eq!(created.status, WatchThroughStatus::Ongoing);
    }

    #[tokio::test]
    async fn whole_series_respects_include_specials() {
        let series_id = SeriesID(Uuid::new_v4());
        let ordered = episode_ids(4);
        let expected = ordered.clone();

        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_episode_ids_for_series()
            .withf(move |id, include_specials| {
                id == &series_id && !include_specials
            })
            .times(1)
            .returning(move |_, _| Ok(ordered.clone()));

        let mut watches = MockWatchRepository::new();
        watches
            .expect_create_watch_through()
            .withf(move |new| new.episode_ids == expected)
            .times(1)
            .returning(|new| Ok(watch_through(new)));

        service(catalog, watches)
            .start_watch_through(
                series_id,
                EpisodeSelection::Series {
                    include_specials: false,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn watch_activity_prefers_finished_then_started() {
        let episode_id = EpisodeID(Uuid::new_v4());
        let watch_through_id = WatchThroughID(Uuid::new_v4());
        let started = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let finished = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap();

        let mut watches = MockWatchRepository::new();
        watches
            .expect_record_watch()
            .withf(move |new| {
                new.activity_at == finished
                    && new.watch_through_id == Some(watch_through_id)
                    && new.rating == Some(8.5)
            })
            .times(1)
            .returning(|new| {
                Ok(Watch {
                    id: WatchID(Uuid::new_v4()),
                    episode_id: Some(new.episode_id),
                    watch_through_id: new.watch_through_id,
                    rating: new.rating,
                    notes: new.notes.clone(),
                    started_at: new.started_at,
                    finished_at: new.finished_at,
                    created_at: Utc::now(),
                })
            });
        watches
            .expect_record_watch()
            .withf(move |new| {
                new.activity_at == started && new.finished_at.is_none()
            })
            .times(1)
            .returning(|new| {
                Ok(Watch {
                    id: WatchID(Uuid::new_v4()),
                    episode_id: Some(new.episode_id),
                    watch_through_id: None,
                    rating: None,
                    notes: None,
                    started_at: new.started_at,
                    finished_at: None,
                    created_at: Utc::now(),
                })
            });

        let service = service(MockCatalogRepository::new(), watches);

        let watch = service
            .watch_episode(
                episode_id,
                WatchEpisodeRequest {
                    watch_through_id: Some(watch_through_id),
                    rating: Some(8.5),
                    started_at: Some(started),
                    finished_at: Some(finished),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(watch.watch_through_id, Some(watch_through_id));

        service
            .watch_episode(
                episode_id,
                WatchEpisodeRequest {
                    started_at: Some(started),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn skip_defaults_at_to_now() {
        let before = Utc::now();
        let episode_id = EpisodeID(Uuid::new_v4());

        let mut watches = MockWatchRepository::new();
        watches
            .expect_record_skip()
            .withf(move |new| new.at >= before && new.watch_through_id.is_none())
            .times(1)
            .returning(|new| {
                Ok(Skip {
                    id: SkipID(Uuid::new_v4()),
                    episode_id: Some(new.episode_id),
                    watch_through_id: None,
                    notes: new.notes.clone(),
                    at: Some(new.at),
                    created_at: Utc::now(),
                })
            });

        let skip = service(MockCatalogRepository::new(), watches)
            .skip_episode(episode_id, SkipEpisodeRequest::default())
            .await
            .unwrap();

        assert!(skip.at.is_some_and(|at| at >= before));
    }

    #[tokio::test]
    async fn deleting_a_missing_watch_is_not_found() {
        let mut watches = MockWatchRepository::new();
        watches.expect_delete_watch().returning(|_| Ok(None));

        let err = service(MockCatalogRepository::new(), watches)
            .delete_watch(WatchID(Uuid::new_v4()))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn deleting_a_watch_reports_its_watch_through() {
        let watch_through_id = WatchThroughID(Uuid::new_v4());

        let mut watches = MockWatchRepository::new();
        watches.expect_delete_watch().times(1).returning(move |id| {
            Ok(Some(Watch {
                id,
                episode_id: None,
                watch_through_id: Some(watch_through_id),
                rating: None,
                notes: None,
                started_at: None,
                finished_at: None,
                created_at: Utc::now(),
            }))
        });

        let reported = service(MockCatalogRepository::new(), watches)
            .delete_watch(WatchID(Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(reported, Some(watch_through_id));
    }

    #[tokio::test]
    async fn series_watches_default_to_an_open_slice() {
        let series_id = SeriesID(Uuid::new_v4());
        let bounded = EpisodeSlice {
            from: Some(EpisodeBoundary {
                season_number: 1,
                episode_number: 3,
            }),
            to: None,
        };

        let mut watches = MockWatchRepository::new();
        watches
            .expect_insert_watches_for_series()
            .withf(|_, slice| slice.from.is_none() && slice.to.is_none())
            .times(1)
            .returning(|_, _| Ok(10));
        watches
            .expect_insert_watches_for_series()
            .withf(move |_, slice| slice.from == bounded.from && slice.to.is_none())
            .times(1)
            .returning(|_, _| Ok(7));

        let service = service(MockCatalogRepository::new(), watches);

        assert_eq!(
            service
                .watch_episodes_from_series(series_id, None)
                .await
                .unwrap(),
            10
        );
        assert_eq!(
            service
                .watch_episodes_from_series(series_id, Some(bounded))
                .await
                .unwrap(),
            7
        );
    }

}
