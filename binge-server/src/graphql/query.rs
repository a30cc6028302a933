use async_graphql::{Context, ID, Object, Result, SimpleObject};
use binge_core::IngestionEngine;
use binge_model::{SeriesID, WatchID, WatchThroughID};

use super::errors::{GqlResultExt, decode_id};
use super::types::{
    SeriesObject, WATCH_LIST_LIMIT, WatchObject, WatchThroughObject, loaders,
    load_watch_through, unit_of_work,
};

#[derive(SimpleObject)]
pub struct SearchResults {
    pub series: Vec<SeriesObject>,
}

#[derive(Debug, Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Searches TMDB and imports every hit that is not stored yet.
    async fn search(
        &self,
        ctx: &Context<'_>,
        query: Option<String>,
    ) -> Result<SearchResults> {
        let engine = ctx.data_unchecked::<IngestionEngine>();
        let found = engine.search(query.as_deref()).await.gql()?;

        let loaders = loaders(ctx);
        for series in &found {
            loaders.series.prime(series.id, series.clone());
        }

        Ok(SearchResults {
            series: found.into_iter().map(SeriesObject).collect(),
        })
    }

    async fn watch(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> Result<Option<WatchObject>> {
        let id: WatchID = decode_id(&id)?;
        Ok(loaders(ctx).watches.load(id).await.gql()?.map(WatchObject))
    }

    async fn series(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> Result<Option<SeriesObject>> {
        let id: SeriesID = decode_id(&id)?;
        Ok(loaders(ctx).series.load(id).await.gql()?.map(SeriesObject))
    }

    async fn watch_through(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> Result<Option<WatchThroughObject>> {
        let id: WatchThroughID = decode_id(&id)?;
        load_watch_through(ctx, Some(id)).await
    }

    /// Watch-throughs that are not finished, most recently updated first.
    async fn watch_throughs(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<WatchThroughObject>> {
        let watch_throughs = unit_of_work(ctx)
            .watches
            .unfinished_watch_throughs(WATCH_LIST_LIMIT)
            .await
            .gql()?;

        let loaders = loaders(ctx);
        Ok(watch_throughs
            .into_iter()
            .map(|watch_through| {
                loaders
                    .watch_throughs
                    .prime(watch_through.id, watch_through.clone());
                WatchThroughObject(watch_through)
            })
            .collect())
    }
}
