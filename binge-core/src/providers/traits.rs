use async_trait::async_trait;
use binge_model::SeriesStatus;
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid access token")]
    InvalidAccessToken,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unrecognized status: {0}")]
    UnrecognizedStatus(String),
}

/// Normalized series tree as returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesMetadata {
    pub tmdb_id: String,
    pub imdb_id: Option<String>,
    pub name: String,
    pub first_aired: Option<NaiveDate>,
    pub status: SeriesStatus,
    pub overview: Option<String>,
    pub poster: Option<String>,
    /// Season count as reported by the provider; drives season status.
    pub number_of_seasons: Option<i32>,
    pub seasons: Vec<SeasonMetadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonMetadata {
    pub number: i32,
    pub first_aired: Option<NaiveDate>,
    pub overview: Option<String>,
    pub poster: Option<String>,
    pub episodes: Vec<EpisodeMetadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeMetadata {
    pub season_number: i32,
    pub number: i32,
    pub title: String,
    pub first_aired: Option<NaiveDate>,
    pub overview: Option<String>,
    pub still: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider ids of the series matching `query`, in provider order.
    async fn search_series(
        &self,
        query: &str,
    ) -> Result<Vec<String>, ProviderError>;

    /// Full series tree including every season and its episodes.
    async fn fetch_series(
        &self,
        tmdb_id: &str,
    ) -> Result<SeriesMetadata, ProviderError>;
}
