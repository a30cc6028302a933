use async_graphql::{Context, ID, Object, Result, SimpleObject};
use binge_core::{
    EpisodeSelection, SkipEpisodeRequest, WatchEpisodeRequest, WatchService,
};
use binge_model::{EpisodeID, SeasonID, SeriesID, WatchID, WatchThroughID};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::errors::{GqlResultExt, decode_id, decode_ids, to_id};
use super::types::{
    EpisodeObject, EpisodeSliceInput, SeriesObject, SkipObject, WatchObject,
    WatchThroughObject, load_episode, load_watch_through, loaders,
};

#[derive(SimpleObject)]
pub struct WatchEpisodePayload {
    pub watch: WatchObject,
    pub episode: Option<EpisodeObject>,
    pub watch_through: Option<WatchThroughObject>,
}

#[derive(SimpleObject)]
pub struct SkipEpisodePayload {
    pub skip: SkipObject,
    pub episode: Option<EpisodeObject>,
    pub watch_through: Option<WatchThroughObject>,
}

#[derive(SimpleObject)]
pub struct StartWatchThroughPayload {
    pub watch_through: WatchThroughObject,
}

#[derive(SimpleObject)]
pub struct DeleteWatchPayload {
    pub deleted_watch_id: ID,
    pub watch_through: Option<WatchThroughObject>,
}

#[derive(SimpleObject)]
pub struct DeleteWatchThroughPayload {
    pub deleted_watch_through_id: ID,
}

#[derive(SimpleObject)]
pub struct WatchEpisodesFromSeriesPayload {
    pub series: Option<SeriesObject>,
}

fn watch_service<'a>(ctx: &Context<'a>) -> &'a WatchService {
    ctx.data_unchecked::<WatchService>()
}

#[derive(Debug, Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Records a watch, advancing the watch-through when one is given.
    #[allow(clippy::too_many_arguments)]
    async fn watch_episode(
        &self,
        ctx: &Context<'_>,
        episode: ID,
        watch_through: Option<ID>,
        rating: Option<f64>,
        notes: Option<String>,
        started_at: Option<DateTime<Utc>>,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<WatchEpisodePayload> {
        let episode_id: EpisodeID = decode_id(&episode)?;
        let watch_through_id = watch_through
            .as_ref()
            .map(decode_id::<WatchThroughID>)
            .transpose()?;

        let watch = watch_service(ctx)
            .watch_episode(
                episode_id,
                WatchEpisodeRequest {
                    watch_through_id,
                    rating,
                    notes,
                    started_at,
                    finished_at,
                },
            )
            .await
            .gql()?;

        let loaders = loaders(ctx);
        loaders.watches.prime(watch.id, watch.clone());
        loaders.latest_watches.forget(&episode_id);
        if let Some(id) = &watch_through_id {
            loaders.forget_watch_through(id);
        }

        Ok(WatchEpisodePayload {
            watch: WatchObject(watch),
            episode: load_episode(ctx, Some(episode_id)).await?,
            watch_through: load_watch_through(ctx, watch_through_id).await?,
        })
    }

    async fn skip_episode(
        &self,
        ctx: &Context<'_>,
        episode: ID,
        watch_through: Option<ID>,
        notes: Option<String>,
        at: Option<DateTime<Utc>>,
    ) -> Result<SkipEpisodePayload> {
        let episode_id: EpisodeID = decode_id(&episode)?;
        let watch_through_id = watch_through
            .as_ref()
            .map(decode_id::<WatchThroughID>)
            .transpose()?;

        let skip = watch_service(ctx)
            .skip_episode(
                episode_id,
                SkipEpisodeRequest {
                    watch_through_id,
                    notes,
                    at,
                },
            )
            .await
            .gql()?;

        let loaders = loaders(ctx);
        loaders.skips.prime(skip.id, skip.clone());
        if let Some(id) = &watch_through_id {
            loaders.forget_watch_through(id);
        }

        Ok(SkipEpisodePayload {
            skip: SkipObject(skip),
            episode: load_episode(ctx, Some(episode_id)).await?,
            watch_through: load_watch_through(ctx, watch_through_id).await?,
        })
    }

    /// Starts a watch-through over explicit episodes, explicit seasons or the
    /// whole series, in that order of precedence.
    async fn start_watch_through(
        &self,
        ctx: &Context<'_>,
        series: ID,
        seasons: Option<Vec<ID>>,
        episodes: Option<Vec<ID>>,
        #[graphql(default = false)] include_specials: bool,
    ) -> Result<StartWatchThroughPayload> {
        let series_id: SeriesID = decode_id(&series)?;
        let seasons = seasons
            .as_deref()
            .map(decode_ids::<SeasonID>)
            .transpose()?;
        let episodes = episodes
            .as_deref()
            .map(decode_ids::<EpisodeID>)
            .transpose()?;

        let watch_through = watch_service(ctx)
            .start_watch_through(
                series_id,
                EpisodeSelection::resolve(seasons, episodes, include_specials),
            )
            .await
            .gql()?;

        loaders(ctx)
            .watch_throughs
            .prime(watch_through.id, watch_through.clone());

        Ok(StartWatchThroughPayload {
            watch_through: WatchThroughObject(watch_through),
        })
    }

    async fn delete_watch(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> Result<DeleteWatchPayload> {
        let watch_id: WatchID = decode_id(&id)?;
        let watch_through_id =
            watch_service(ctx).delete_watch(watch_id).await.gql()?;

        let loaders = loaders(ctx);
        loaders.watches.forget(&watch_id);
        if let Some(id) = &watch_through_id {
            loaders.forget_watch_through(id);
        }

        Ok(DeleteWatchPayload {
            deleted_watch_id: to_id(&watch_id),
            watch_through: load_watch_through(ctx, watch_through_id).await?,
        })
    }

    async fn delete_watch_through(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> Result<DeleteWatchThroughPayload> {
        let watch_through_id: WatchThroughID = decode_id(&id)?;
        let existed = watch_service(ctx)
            .delete_watch_through(watch_through_id)
            .await
            .gql()?;
        if !existed {
            debug!("Watch-through {} was already gone", watch_through_id);
        }

        loaders(ctx).forget_watch_through(&watch_through_id);

        Ok(DeleteWatchThroughPayload {
            deleted_watch_through_id: to_id(&watch_through_id),
        })
    }

    /// Marks every episode of the series in `slice` as watched.
    async fn watch_episodes_from_series(
        &self,
        ctx: &Context<'_>,
        series: ID,
        slice: Option<EpisodeSliceInput>,
    ) -> Result<WatchEpisodesFromSeriesPayload> {
        let series_id: SeriesID = decode_id(&series)?;
        let inserted = watch_service(ctx)
            .watch_episodes_from_series(series_id, slice.map(Into::into))
            .await
            .gql()?;
        debug!("Inserted {} watches for series {}", inserted, series_id);

        Ok(WatchEpisodesFromSeriesPayload {
            series: loaders(ctx)
                .series
                .load(series_id)
                .await
                .gql()?
                .map(SeriesObject),
        })
    }
}
