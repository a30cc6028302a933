use async_trait::async_trait;
use binge_model::{
    EpisodeID, SeriesID, Skip, SkipID, Watch, WatchID, WatchThrough,
    WatchThroughEpisode, WatchThroughEpisodeID, WatchThroughID,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    database::ports::watches::{
        EpisodeSlice, NewSkip, NewWatch, NewWatchThrough, WatchRepository,
    },
    error::{CoreError, Result},
};

#[derive(Clone, Debug)]
pub struct PostgresWatchRepository {
    pool: PgPool,
}

impl PostgresWatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Which column of the join row an action is linked through.
#[derive(Debug, Clone, Copy)]
enum ActionLink {
    Watch(Uuid),
    Skip(Uuid),
}

/// Links the join rows of `episode_id`, stamps `updated_at` and finishes the
/// watch-through once no position is pending.
async fn link_action(
    conn: &mut PgConnection,
    watch_through_id: Uuid,
    episode_id: Uuid,
    link: ActionLink,
    activity_at: DateTime<Utc>,
) -> Result<()> {
    let (statement, action_id) = match link {
        ActionLink::Watch(id) => (
            r#"
            UPDATE watch_through_episodes
            SET watch_id = $3
            WHERE watch_through_id = $1 AND episode_id = $2
            "#,
            id,
        ),
        ActionLink::Skip(id) => (
            r#"
            UPDATE watch_through_episodes
            SET skip_id = $3
            WHERE watch_through_id = $1 AND episode_id = $2
            "#,
            id,
        ),
    };

    let linked = sqlx::query(statement)
        .bind(watch_through_id)
        .bind(episode_id)
        .bind(action_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if linked == 0 {
        debug!(
            "Episode {} is not part of watch-through {}; nothing linked",
            episode_id, watch_through_id
        );
    }

    let status: String = sqlx::query_scalar(
        r#"
        UPDATE watch_throughs
        SET updated_at = $2,
            status = CASE
                WHEN EXISTS (
                    SELECT 1 FROM watch_through_episodes
                    WHERE watch_through_id = $1
                      AND watch_id IS NULL
                      AND skip_id IS NULL
                ) THEN status
                ELSE 'FINISHED'
            END
        WHERE id = $1
        RETURNING status
        "#,
    )
    .bind(watch_through_id)
    .bind(activity_at)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        CoreError::not_found(format!("watch-through {watch_through_id}"))
    })?;

    if status == "FINISHED" {
        info!("Watch-through {} finished", watch_through_id);
    }

    Ok(())
}

#[async_trait]
impl WatchRepository for PostgresWatchRepository {
    async fn watches_by_ids(&self, ids: &[WatchID]) -> Result<Vec<Watch>> {
        let ids: Vec<Uuid> = ids.iter().map(WatchID::to_uuid).collect();

        let rows = sqlx::query_as::<_, WatchRow>(
            r#"
            SELECT id, episode_id, watch_through_id, rating, notes,
                   started_at, finished_at, created_at
            FROM watches
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Watch::from).collect())
    }

    async fn skips_by_ids(&self, ids: &[SkipID]) -> Result<Vec<Skip>> {
        let ids: Vec<Uuid> = ids.iter().map(SkipID::to_uuid).collect();

        let rows = sqlx::query_as::<_, SkipRow>(
            r#"
            SELECT id, episode_id, watch_through_id, notes, at, created_at
            FROM skips
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Skip::from).collect())
    }

    async fn watch_throughs_by_ids(
        &self,
        ids: &[WatchThroughID],
    ) -> Result<Vec<WatchThrough>> {
        let ids: Vec<Uuid> = ids.iter().map(WatchThroughID::to_uuid).collect();

        let rows = sqlx::query_as::<_, WatchThroughRow>(
            r#"
            SELECT id, series_id, status, started_at, updated_at, created_at
            FROM watch_throughs
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(WatchThrough::try_from).collect()
    }

    async fn watch_through_sequences(
        &self,
        ids: &[WatchThroughID],
    ) -> Result<Vec<WatchThroughEpisode>> {
        let ids: Vec<Uuid> = ids.iter().map(WatchThroughID::to_uuid).collect();

        let rows = sqlx::query_as::<_, WatchThroughEpisodeRow>(
            r#"
            SELECT wte.id, wte.watch_through_id, wte.episode_id, wte.index,
                   wte.watch_id, wte.skip_id,
                   e.first_aired AS episode_first_aired
            FROM watch_through_episodes wte
            LEFT JOIN episodes e ON e.id = wte.episode_id
            WHERE wte.watch_through_id = ANY($1)
            ORDER BY wte.watch_through_id, wte.index
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(WatchThroughEpisode::from).collect())
    }

    async fn unfinished_watch_throughs(
        &self,
        limit: i64,
    ) -> Result<Vec<WatchThrough>> {
        let rows = sqlx::query_as::<_, WatchThroughRow>(
            r#"
            SELECT id, series_id, status, started_at, updated_at, created_at
            FROM watch_throughs
            WHERE status <> 'FINISHED'
            ORDER BY updated_at DESC NULLS LAST, created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(WatchThrough::try_from).collect()
    }

    async fn watches_for_watch_through(
        &self,
        watch_through_id: WatchThroughID,
        limit: i64,
    ) -> Result<Vec<Watch>> {
        let rows = sqlx::query_as::<_, WatchRow>(
            r#"
            SELECT id, episode_id, watch_through_id, rating, notes,
                   started_at, finished_at, created_at
            FROM watches
            WHERE watch_through_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(watch_through_id.to_uuid())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Watch::from).collect())
    }

    async fn watches_for_episode(
        &self,
        episode_id: EpisodeID,
        limit: i64,
    ) -> Result<Vec<Watch>> {
        let rows = sqlx::query_as::<_, WatchRow>(
            r#"
            SELECT id, episode_id, watch_through_id, rating, notes,
                   started_at, finished_at, created_at
            FROM watches
            WHERE episode_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(episode_id.to_uuid())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Watch::from).collect())
    }

    async fn latest_watches_for_episodes(
        &self,
        episode_ids: &[EpisodeID],
    ) -> Result<Vec<Watch>> {
        let ids: Vec<Uuid> = episode_ids.iter().map(EpisodeID::to_uuid).collect();

        let rows = sqlx::query_as::<_, WatchRow>(
            r#"
            SELECT DISTINCT ON (episode_id)
                   id, episode_id, watch_through_id, rating, notes,
                   started_at, finished_at, created_at
            FROM watches
            WHERE episode_id = ANY($1)
            ORDER BY episode_id, created_at DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Watch::from).collect())
    }

    async fn create_watch_through(
        &self,
        new: &NewWatchThrough,
    ) -> Result<WatchThrough> {
        let mut tx = self.pool().begin().await?;

        let watch_through: WatchThrough = sqlx::query_as::<_, WatchThroughRow>(
            r#"
            INSERT INTO watch_throughs (series_id, status, started_at, updated_at)
            VALUES ($1, 'ONGOING', $2, $2)
            RETURNING id, series_id, status, started_at, updated_at, created_at
            "#,
        )
        .bind(new.series_id.to_uuid())
        .bind(new.started_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| CoreError::from_write(e, "insert watch-through"))?
        .try_into()?;

        let episode_ids: Vec<Uuid> =
            new.episode_ids.iter().map(EpisodeID::to_uuid).collect();

        sqlx::query(
            r#"
            INSERT INTO watch_through_episodes (watch_through_id, episode_id, index)
            SELECT $1, sequence.episode_id, (sequence.position - 1)::INTEGER
            FROM UNNEST($2::UUID[]) WITH ORDINALITY AS sequence(episode_id, position)
            "#,
        )
        .bind(watch_through.id.to_uuid())
        .bind(&episode_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| CoreError::from_write(e, "insert watch-through episodes"))?;

        tx.commit().await?;

        info!(
            "Started watch-through {} of series {} with {} episodes",
            watch_through.id,
            new.series_id,
            episode_ids.len()
        );

        Ok(watch_through)
    }

    async fn record_watch(&self, new: &NewWatch) -> Result<Watch> {
        let mut tx = self.pool().begin().await?;

        let watch: Watch = sqlx::query_as::<_, WatchRow>(
            r#"
            INSERT INTO watches (
                episode_id, watch_through_id, rating, notes, started_at, finished_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, episode_id, watch_through_id, rating, notes,
                      started_at, finished_at, created_at
            "#,
        )
        .bind(new.episode_id.to_uuid())
        .bind(new.watch_through_id.map(|id| id.to_uuid()))
        .bind(new.rating)
        .bind(new.notes.as_deref())
        .bind(new.started_at)
        .bind(new.finished_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| CoreError::from_write(e, "insert watch"))?
        .into();

        if let Some(watch_through_id) = new.watch_through_id {
            link_action(
                &mut *tx,
                watch_through_id.to_uuid(),
                new.episode_id.to_uuid(),
                ActionLink::Watch(watch.id.to_uuid()),
                new.activity_at,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(watch)
    }

    async fn record_skip(&self, new: &NewSkip) -> Result<Skip> {
        let mut tx = self.pool().begin().await?;

        let skip: Skip = sqlx::query_as::<_, SkipRow>(
            r#"
            INSERT INTO skips (episode_id, watch_through_id, notes, at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, episode_id, watch_through_id, notes, at, created_at
            "#,
        )
        .bind(new.episode_id.to_uuid())
        .bind(new.watch_through_id.map(|id| id.to_uuid()))
        .bind(new.notes.as_deref())
        .bind(new.at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| CoreError::from_write(e, "insert skip"))?
        .into();

        if let Some(watch_through_id) = new.watch_through_id {
            link_action(
                &mut *tx,
                watch_through_id.to_uuid(),
                new.episode_id.to_uuid(),
                ActionLink::Skip(skip.id.to_uuid()),
                new.at,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(skip)
    }

    async fn delete_watch(&self, id: WatchID) -> Result<Option<Watch>> {
        let mut tx = self.pool().begin().await?;

        // The join rows are unlinked by the foreign key, so remember them first.
        let linked: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT watch_through_id
            FROM watch_through_episodes
            WHERE watch_id = $1
            "#,
        )
        .bind(id.to_uuid())
        .fetch_all(&mut *tx)
        .await?;

        let Some(row) = sqlx::query_as::<_, WatchRow>(
            r#"
            DELETE FROM watches
            WHERE id = $1
            RETURNING id, episode_id, watch_through_id, rating, notes,
                      started_at, finished_at, created_at
            "#,
        )
        .bind(id.to_uuid())
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        if !linked.is_empty() {
            let reopened = sqlx::query(
                r#"
                UPDATE watch_throughs wt
                SET status = 'ONGOING'
                WHERE wt.id = ANY($1)
                  AND wt.status = 'FINISHED'
                  AND EXISTS (
                      SELECT 1 FROM watch_through_episodes wte
                      WHERE wte.watch_through_id = wt.id
                        AND wte.watch_id IS NULL
                        AND wte.skip_id IS NULL
                  )
                "#,
            )
            .bind(&linked)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            debug!("Deleting watch {} reopened {} watch-throughs", id, reopened);
        }

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn delete_watch_through(&self, id: WatchThroughID) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM watch_throughs WHERE id = $1")
            .bind(id.to_uuid())
            .execute(self.pool())
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn insert_watches_for_series(
        &self,
        series_id: SeriesID,
        slice: &EpisodeSlice,
    ) -> Result<u64> {
        let mut tx = self.pool().begin().await?;

        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            INSERT INTO watches (episode_id)
            SELECT e.id
            FROM episodes e
            JOIN seasons s ON s.id = e.season_id
            WHERE e.series_id = "#,
        );
        builder.push_bind(series_id.to_uuid());

        if let Some(from) = slice.from {
            builder.push(" AND (s.number, e.number) >= (");
            builder.push_bind(from.season_number);
            builder.push(", ");
            builder.push_bind(from.episode_number);
            builder.push(")");
        }

        if let Some(to) = slice.to {
            builder.push(" AND (s.number, e.number) <= (");
            builder.push_bind(to.season_number);
            builder.push(", ");
            builder.push_bind(to.episode_number);
            builder.push(")");
        }

        builder.push(" ORDER BY s.number, e.number");

        let inserted = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::from_write(e, "insert series watches"))?
            .rows_affected();

        tx.commit().await?;

        info!("Recorded {} watches for series {}", inserted, series_id);
        Ok(inserted)
    }
}

#[derive(sqlx::FromRow)]
struct WatchRow {
    id: Uuid,
    episode_id: Option<Uuid>,
    watch_through_id: Option<Uuid>,
    rating: Option<f64>,
    notes: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<WatchRow> for Watch {
    fn from(row: WatchRow) -> Self {
        Watch {
            id: WatchID(row.id),
            episode_id: row.episode_id.map(EpisodeID),
            watch_through_id: row.watch_through_id.map(WatchThroughID),
            rating: row.rating,
            notes: row.notes,
            started_at: row.started_at,
            finished_at: row.finished_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SkipRow {
    id: Uuid,
    episode_id: Option<Uuid>,
    watch_through_id: Option<Uuid>,
    notes: Option<String>,
    at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<SkipRow> for Skip {
    fn from(row: SkipRow) -> Self {
        Skip {
            id: SkipID(row.id),
            episode_id: row.episode_id.map(EpisodeID),
            watch_through_id: row.watch_through_id.map(WatchThroughID),
            notes: row.notes,
            at: row.at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WatchThroughRow {
    id: Uuid,
    series_id: Uuid,
    status: String,
    started_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<WatchThroughRow> for WatchThrough {
    type Error = CoreError;

    fn try_from(row: WatchThroughRow) -> Result<Self> {
        Ok(WatchThrough {
            id: WatchThroughID(row.id),
            series_id: SeriesID(row.series_id),
            status: row.status.parse()?,
            started_at: row.started_at,
            updated_at: row.updated_at,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WatchThroughEpisodeRow {
    id: Uuid,
    watch_through_id: Uuid,
    episode_id: Option<Uuid>,
    index: i32,
    watch_id: Option<Uuid>,
    skip_id: Option<Uuid>,
    episode_first_aired: Option<NaiveDate>,
}

impl From<WatchThroughEpisodeRow> for WatchThroughEpisode {
    fn from(row: WatchThroughEpisodeRow) -> Self {
        WatchThroughEpisode {
            id: WatchThroughEpisodeID(row.id),
            watch_through_id: WatchThroughID(row.watch_through_id),
            episode_id: row.episode_id.map(EpisodeID),
            index: row.index,
            watch_id: row.watch_id.map(WatchID),
            skip_id: row.skip_id.map(SkipID),
            episode_first_aired: row.episode_first_aired,
        }
    }
}
