use async_trait::async_trait;
use binge_model::SeriesStatus;
use chrono::NaiveDate;
use futures::future::try_join_all;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::fmt;
use tracing::{debug, info};

use super::traits::{
    EpisodeMetadata, MetadataProvider, ProviderError, SeasonMetadata,
    SeriesMetadata,
};

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/original";

/// TMDB v3 client authenticated with a v4 read access token.
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl TmdbClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, TMDB_API_BASE)
    }

    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("TMDB request: GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                return Err(ProviderError::InvalidAccessToken);
            }
            StatusCode::NOT_FOUND => {
                return Err(ProviderError::NotFound(path.to_string()));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ProviderError::RateLimited);
            }
            status if !status.is_success() => {
                return Err(ProviderError::Api(format!(
                    "TMDB API returned status {status} for {path}"
                )));
            }
            _ => {}
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn search_series(
        &self,
        query: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let response: TmdbSearchResponse =
            self.get("/search/tv", &[("query", query)]).await?;

        debug!(
            "TMDB search for {:?} returned {} results",
            query,
            response.results.len()
        );

        Ok(response
            .results
            .into_iter()
            .map(|result| result.id.to_string())
            .collect())
    }

    async fn fetch_series(
        &self,
        tmdb_id: &str,
    ) -> Result<SeriesMetadata, ProviderError> {
        let series_path = format!("/tv/{tmdb_id}");
        let external_ids_path = format!("/tv/{tmdb_id}/external_ids");

        let (series, external_ids) = tokio::try_join!(
            self.get::<TmdbSeries>(&series_path, &[]),
            self.get::<TmdbExternalIds>(&external_ids_path, &[]),
        )?;

        let seasons = try_join_all(
            series
                .seasons
                .iter()
                .filter_map(|season| season.season_number)
                .map(|number| {
                    let path = format!("/tv/{tmdb_id}/season/{number}");
                    async move { self.get::<TmdbSeason>(&path, &[]).await }
                }),
        )
        .await?;

        info!(
            "Fetched TMDB series {} ({}) with {} seasons",
            tmdb_id,
            series.name,
            seasons.len()
        );

        normalize_series(tmdb_id, series, external_ids, seasons)
    }
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbSearchResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResult {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct TmdbSeries {
    name: String,
    status: Option<String>,
    #[serde(default)]
    seasons: Vec<TmdbSeriesSeason>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    number_of_seasons: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeriesSeason {
    season_number: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct TmdbExternalIds {
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeason {
    season_number: Option<i32>,
    #[serde(default)]
    episodes: Vec<TmdbEpisode>,
    air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisode {
    name: Option<String>,
    overview: Option<String>,
    air_date: Option<String>,
    episode_number: i32,
    season_number: i32,
    still_path: Option<String>,
}

fn normalize_series(
    tmdb_id: &str,
    series: TmdbSeries,
    external_ids: TmdbExternalIds,
    seasons: Vec<TmdbSeason>,
) -> Result<SeriesMetadata, ProviderError> {
    let status = series_status_from_tmdb(series.status.as_deref().unwrap_or(""))?;

    let seasons = seasons
        .into_iter()
        .filter_map(|season| {
            let number = season.season_number?;
            Some(SeasonMetadata {
                number,
                first_aired: parse_air_date(season.air_date.as_deref()),
                overview: non_empty(season.overview),
                poster: image_url(season.poster_path.as_deref()),
                episodes: season
                    .episodes
                    .into_iter()
                    .map(|episode| EpisodeMetadata {
                        season_number: episode.season_number,
                        number: episode.episode_number,
                        title: episode.name.unwrap_or_default(),
                        first_aired: parse_air_date(episode.air_date.as_deref()),
                        overview: non_empty(episode.overview),
                        still: image_url(episode.still_path.as_deref()),
                    })
                    .collect(),
            })
        })
        .collect();

    Ok(SeriesMetadata {
        tmdb_id: tmdb_id.to_string(),
        imdb_id: non_empty(external_ids.imdb_id),
        name: series.name,
        first_aired: parse_air_date(series.first_air_date.as_deref()),
        status,
        overview: non_empty(series.overview),
        poster: image_url(series.poster_path.as_deref()),
        number_of_seasons: series.number_of_seasons,
        seasons,
    })
}

/// Maps TMDB's free-form series status onto [`SeriesStatus`].
pub fn series_status_from_tmdb(
    status: &str,
) -> Result<SeriesStatus, ProviderError> {
    match status {
        "Returning Series" => Ok(SeriesStatus::Returning),
        "Ended" => Ok(SeriesStatus::Ended),
        "Canceled" => Ok(SeriesStatus::Cancelled),
        other => Err(ProviderError::UnrecognizedStatus(other.to_string())),
    }
}

/// Parses TMDB's `YYYY-MM-DD` dates. Missing or malformed input is `None`.
pub fn parse_air_date(date: Option<&str>) -> Option<NaiveDate> {
    let date = date?.trim();
    NaiveDate::parse_from_str(date.get(..10)?, "%Y-%m-%d").ok()
}

fn image_url(path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{TMDB_IMAGE_BASE}{p}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
