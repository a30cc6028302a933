//! Series, season and episode records ingested from the metadata provider.

use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;

use crate::error::ModelError;
use crate::ids::{EpisodeID, SeasonID, SeriesID};

/// Airing status of a series as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum SeriesStatus {
    Returning,
    Ended,
    Cancelled,
}

impl SeriesStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesStatus::Returning => "RETURNING",
            SeriesStatus::Ended => "ENDED",
            SeriesStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for SeriesStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RETURNING" => Ok(SeriesStatus::Returning),
            "ENDED" => Ok(SeriesStatus::Ended),
            "CANCELLED" => Ok(SeriesStatus::Cancelled),
            other => Err(ModelError::UnknownVariant {
                kind: "series status",
                value: other.to_string(),
            }),
        }
    }
}

/// Airing status of a single season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum SeasonStatus {
    Continuing,
    Ended,
}

impl SeasonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonStatus::Continuing => "CONTINUING",
            SeasonStatus::Ended => "ENDED",
        }
    }

    /// Status of season `season_number` given the series status and the
    /// number of seasons the provider reports. Only the latest season of a
    /// returning series is still continuing.
    pub fn derive(
        season_number: i32,
        reported_season_count: Option<i32>,
        series_status: SeriesStatus,
    ) -> Self {
        if Some(season_number) == reported_season_count
            && series_status == SeriesStatus::Returning
        {
            SeasonStatus::Continuing
        } else {
            SeasonStatus::Ended
        }
    }
}

impl FromStr for SeasonStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONTINUING" => Ok(SeasonStatus::Continuing),
            "ENDED" => Ok(SeasonStatus::Ended),
            other => Err(ModelError::UnknownVariant {
                kind: "season status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Series {
    pub id: SeriesID,
    pub tmdb_id: String,
    pub imdb_id: Option<String>,
    pub name: String,
    pub first_aired: Option<NaiveDate>,
    pub status: SeriesStatus,
    pub overview: Option<String>,
    pub poster: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Season {
    pub id: SeasonID,
    pub series_id: SeriesID,
    /// Season number; 0 holds specials.
    pub number: i32,
    pub first_aired: Option<NaiveDate>,
    pub status: SeasonStatus,
    pub overview: Option<String>,
    pub poster: Option<String>,
}

impl Season {
    pub fn is_specials(&self) -> bool {
        self.number == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Episode {
    pub id: EpisodeID,
    pub series_id: SeriesID,
    pub season_id: SeasonID,
    pub number: i32,
    pub title: String,
    pub first_aired: Option<NaiveDate>,
    pub overview: Option<String>,
    pub still: Option<String>,
}
