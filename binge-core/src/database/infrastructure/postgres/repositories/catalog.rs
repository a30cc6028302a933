use async_trait::async_trait;
use binge_model::{
    Episode, EpisodeID, Season, SeasonID, Series, SeriesID,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    database::ports::catalog::{CatalogRepository, NewEpisode, NewSeriesTree},
    error::{CoreError, Result},
};

/// Episodes per multi-row INSERT, well under the bind parameter limit.
const EPISODE_INSERT_CHUNK: usize = 1000;

#[derive(Clone, Debug)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn find_series_by_tmdb_id(
        &self,
        tmdb_id: &str,
    ) -> Result<Option<Series>> {
        let row = sqlx::query_as::<_, SeriesRow>(
            r#"
            SELECT id, tmdb_id, imdb_id, name, first_aired, status, overview,
                   poster, created_at
            FROM series
            WHERE tmdb_id = $1
            "#,
        )
        .bind(tmdb_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Series::try_from).transpose()
    }

    async fn find_series_by_tmdb_ids(
        &self,
        tmdb_ids: &[String],
    ) -> Result<Vec<Series>> {
        if tmdb_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, SeriesRow>(
            r#"
            SELECT id, tmdb_id, imdb_id, name, first_aired, status, overview,
                   poster, created_at
            FROM series
            WHERE tmdb_id = ANY($1)
            "#,
        )
        .bind(tmdb_ids)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Series::try_from).collect()
    }

    async fn insert_series_tree(&self, tree: &NewSeriesTree) -> Result<Series> {
        let mut tx = self.pool().begin().await?;

        let series: Series = sqlx::query_as::<_, SeriesRow>(
            r#"
            INSERT INTO series (
                tmdb_id, imdb_id, name, first_aired, status, overview, poster
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, tmdb_id, imdb_id, name, first_aired, status,
                      overview, poster, created_at
            "#,
        )
        .bind(&tree.tmdb_id)
        .bind(tree.imdb_id.as_deref())
        .bind(&tree.name)
        .bind(tree.first_aired)
        .bind(tree.status.as_str())
        .bind(tree.overview.as_deref())
        .bind(tree.poster.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| CoreError::from_write(e, "insert series"))?
        .try_into()?;

        let mut season_ids: HashMap<i32, Uuid> = HashMap::new();
        if !tree.seasons.is_empty() {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO seasons (series_id, number, first_aired, status, overview, poster) ",
            );
            builder.push_values(&tree.seasons, |mut b, season| {
                b.push_bind(series.id.to_uuid())
                    .push_bind(season.number)
                    .push_bind(season.first_aired)
                    .push_bind(season.status.as_str())
                    .push_bind(season.overview.as_deref())
                    .push_bind(season.poster.as_deref());
            });
            builder.push(" RETURNING id, number");

            let rows: Vec<(Uuid, i32)> = builder
                .build_query_as()
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| CoreError::from_write(e, "insert seasons"))?;

            season_ids.extend(rows.into_iter().map(|(id, number)| (number, id)));
        }

        let episodes: Vec<(Uuid, &NewEpisode)> = tree
            .episodes
            .iter()
            .filter_map(|episode| match season_ids.get(&episode.season_number) {
                Some(season_id) => Some((*season_id, episode)),
                None => {
                    warn!(
                        "Dropping episode {}x{} of {}: season {} was not persisted",
                        episode.season_number,
                        episode.number,
                        tree.tmdb_id,
                        episode.season_number
                    );
                    None
                }
            })
            .collect();

        for chunk in episodes.chunks(EPISODE_INSERT_CHUNK) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO episodes (series_id, season_id, number, title, first_aired, overview, still) ",
            );
            builder.push_values(chunk, |mut b, (season_id, episode)| {
                b.push_bind(series.id.to_uuid())
                    .push_bind(*season_id)
                    .push_bind(episode.number)
                    .push_bind(episode.title.as_str())
                    .push_bind(episode.first_aired)
                    .push_bind(episode.overview.as_deref())
                    .push_bind(episode.still.as_deref());
            });

            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| CoreError::from_write(e, "insert episodes"))?;
        }

        tx.commit().await?;

        info!(
            "Inserted series {} ({}) with {} seasons and {} episodes",
            series.name,
            series.tmdb_id,
            season_ids.len(),
            episodes.len()
        );

        Ok(series)
    }

    async fn series_by_ids(&self, ids: &[SeriesID]) -> Result<Vec<Series>> {
        let ids: Vec<Uuid> = ids.iter().map(SeriesID::to_uuid).collect();
        debug!("Loading {} series", ids.len());

        let rows = sqlx::query_as::<_, SeriesRow>(
            r#"
            SELECT id, tmdb_id, imdb_id, name, first_aired, status, overview,
                   poster, created_at
            FROM series
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Series::try_from).collect()
    }

    async fn seasons_by_ids(&self, ids: &[SeasonID]) -> Result<Vec<Season>> {
        let ids: Vec<Uuid> = ids.iter().map(SeasonID::to_uuid).collect();

        let rows = sqlx::query_as::<_, SeasonRow>(
            r#"
            SELECT id, series_id, number, first_aired, status, overview, poster
            FROM seasons
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Season::try_from).collect()
    }

    async fn episodes_by_ids(&self, ids: &[EpisodeID]) -> Result<Vec<Episode>> {
        let ids: Vec<Uuid> = ids.iter().map(EpisodeID::to_uuid).collect();

        let rows = sqlx::query_as::<_, EpisodeRow>(
            r#"
            SELECT id, series_id, season_id, number, title, first_aired,
                   overview, still
            FROM episodes
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Episode::from).collect())
    }

    async fn seasons_for_series(
        &self,
        series_id: SeriesID,
    ) -> Result<Vec<Season>> {
        let rows = sqlx::query_as::<_, SeasonRow>(
            r#"
            SELECT id, series_id, number, first_aired, status, overview, poster
            FROM seasons
            WHERE series_id = $1
            ORDER BY number
            "#,
        )
        .bind(series_id.to_uuid())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Season::try_from).collect()
    }

    async fn season_by_number(
        &self,
        series_id: SeriesID,
        number: i32,
    ) -> Result<Option<Season>> {
        let row = sqlx::query_as::<_, SeasonRow>(
            r#"
            SELECT id, series_id, number, first_aired, status, overview, poster
            FROM seasons
            WHERE series_id = $1 AND number = $2
            "#,
        )
        .bind(series_id.to_uuid())
        .bind(number)
        .fetch_optional(self.pool())
        .await?;

        row.map(Season::try_from).transpose()
    }

    async fn episodes_for_series(
        &self,
        series_id: SeriesID,
    ) -> Result<Vec<Episode>> {
        let rows = sqlx::query_as::<_, EpisodeRow>(
            r#"
            SELECT e.id, e.series_id, e.season_id, e.number, e.title,
                   e.first_aired, e.overview, e.still
            FROM episodes e
            JOIN seasons s ON s.id = e.season_id
            WHERE e.series_id = $1
            ORDER BY s.number, e.number
            "#,
        )
        .bind(series_id.to_uuid())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Episode::from).collect())
    }

    async fn episodes_for_season(
        &self,
        season_id: SeasonID,
    ) -> Result<Vec<Episode>> {
        let rows = sqlx::query_as::<_, EpisodeRow>(
            r#"
            SELECT id, series_id, season_id, number, title, first_aired,
                   overview, still
            FROM episodes
            WHERE season_id = $1
            ORDER BY number
            "#,
        )
        .bind(season_id.to_uuid())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Episode::from).collect())
    }

    async fn episode_by_number(
        &self,
        series_id: SeriesID,
        season_number: i32,
        number: i32,
    ) -> Result<Option<Episode>> {
        let row = sqlx::query_as::<_, EpisodeRow>(
            r#"
            SELECT e.id, e.series_id, e.season_id, e.number, e.title,
                   e.first_aired, e.overview, e.still
            FROM episodes e
            JOIN seasons s ON s.id = e.season_id
            WHERE e.series_id = $1 AND s.number = $2 AND e.number = $3
            "#,
        )
        .bind(series_id.to_uuid())
        .bind(season_number)
        .bind(number)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Episode::from))
    }

    async fn episode_ids_for_seasons(
        &self,
        season_ids: &[SeasonID],
    ) -> Result<Vec<EpisodeID>> {
        let season_ids: Vec<Uuid> =
            season_ids.iter().map(SeasonID::to_uuid).collect();

        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT e.id
            FROM episodes e
            JOIN seasons s ON s.id = e.season_id
            WHERE e.season_id = ANY($1)
            ORDER BY s.number, e.number
            "#,
        )
        .bind(&season_ids)
        .fetch_all(self.pool())
        .await?;

        Ok(ids.into_iter().map(EpisodeID).collect())
    }

    async fn episode_ids_for_series(
        &self,
        series_id: SeriesID,
        include_specials: bool,
    ) -> Result<Vec<EpisodeID>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT e.id
            FROM episodes e
            JOIN seasons s ON s.id = e.season_id
            WHERE e.series_id = $1 AND ($2 OR s.number <> 0)
            ORDER BY s.number, e.number
            "#,
        )
        .bind(series_id.to_uuid())
        .bind(include_specials)
        .fetch_all(self.pool())
        .await?;

        Ok(ids.into_iter().map(EpisodeID).collect())
    }
}

#[derive(sqlx::FromRow)]
struct SeriesRow {
    id: Uuid,
    tmdb_id: String,
    imdb_id: Option<String>,
    name: String,
    first_aired: Option<NaiveDate>,
    status: String,
    overview: Option<String>,
    poster: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SeriesRow> for Series {
    type Error = CoreError;

    fn try_from(row: SeriesRow) -> Result<Self> {
        Ok(Series {
            id: SeriesID(row.id),
            tmdb_id: row.tmdb_id,
            imdb_id: row.imdb_id,
            name: row.name,
            first_aired: row.first_aired,
            status: row.status.parse()?,
            overview: row.overview,
            poster: row.poster,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeasonRow {
    id: Uuid,
    series_id: Uuid,
    number: i32,
    first_aired: Option<NaiveDate>,
    status: String,
    overview: Option<String>,
    poster: Option<String>,
}

impl TryFrom<SeasonRow> for Season {
    type Error = CoreError;

    fn try_from(row: SeasonRow) -> Result<Self> {
        Ok(Season {
            id: SeasonID(row.id),
            series_id: SeriesID(row.series_id),
            number: row.number,
            first_aired: row.first_aired,
            status: row.status.parse()?,
            overview: row.overview,
            poster: row.poster,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EpisodeRow {
    id: Uuid,
    series_id: Uuid,
    season_id: Uuid,
    number: i32,
    title: String,
    first_aired: Option<NaiveDate>,
    overview: Option<String>,
    still: Option<String>,
}

impl From<EpisodeRow> for Episode {
    fn from(row: EpisodeRow) -> Self {
        Episode {
            id: EpisodeID(row.id),
            series_id: SeriesID(row.series_id),
            season_id: SeasonID(row.season_id),
            number: row.number,
            title: row.title,
            first_aired: row.first_aired,
            overview: row.overview,
            still: row.still,
        }
    }
}
