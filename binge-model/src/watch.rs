use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;

use crate::error::ModelError;
use crate::ids::{
    EpisodeID, SeriesID, SkipID, WatchID, WatchThroughEpisodeID, WatchThroughID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum WatchThroughStatus {
    Ongoing,
    Finished,
}

impl WatchThroughStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchThroughStatus::Ongoing => "ONGOING",
            WatchThroughStatus::Finished => "FINISHED",
        }
    }
}

impl FromStr for WatchThroughStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONGOING" => Ok(WatchThroughStatus::Ongoing),
            "FINISHED" => Ok(WatchThroughStatus::Finished),
            other => Err(ModelError::UnknownVariant {
                kind: "watch-through status",
                value: other.to_string(),
            }),
        }
    }
}

/// A user's ordered traversal of an episode sequence for one series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchThrough {
    pub id: WatchThroughID,
    pub series_id: SeriesID,
    pub status: WatchThroughStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One position in a watch-through's sequence.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchThroughEpisode {
    pub id: WatchThroughEpisodeID,
    pub watch_through_id: WatchThroughID,
    pub episode_id: Option<EpisodeID>,
    pub index: i32,
    pub watch_id: Option<WatchID>,
    pub skip_id: Option<SkipID>,
    /// Air date of the referenced episode, joined in when the sequence is read.
    pub episode_first_aired: Option<NaiveDate>,
}

impl WatchThroughEpisode {
    pub fn progress(&self) -> EpisodeProgress {
        match (self.watch_id, self.skip_id) {
            (Some(watch_id), _) => EpisodeProgress::Watched(watch_id),
            (None, Some(skip_id)) => EpisodeProgress::Skipped(skip_id),
            (None, None) => EpisodeProgress::Pending,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.watch_id.is_some() || self.skip_id.is_some()
    }

    /// The action that resolved this position, if any.
    pub fn action(&self) -> Option<ActionRef> {
        match self.progress() {
            EpisodeProgress::Watched(id) => Some(ActionRef::Watch(id)),
            EpisodeProgress::Skipped(id) => Some(ActionRef::Skip(id)),
            EpisodeProgress::Pending => None,
        }
    }
}

/// Per-position state. `Pending` moves to `Watched` or `Skipped` once and only
/// returns to `Pending` when the underlying watch or skip row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodeProgress {
    Pending,
    Watched(WatchID),
    Skipped(SkipID),
}

/// A single viewing event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Watch {
    pub id: WatchID,
    pub episode_id: Option<EpisodeID>,
    pub watch_through_id: Option<WatchThroughID>,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A deliberate decision not to watch an episode.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skip {
    pub id: SkipID,
    pub episode_id: Option<EpisodeID>,
    pub watch_through_id: Option<WatchThroughID>,
    pub notes: Option<String>,
    pub at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Reference to the row that resolved a watch-through position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionRef {
    Watch(WatchID),
    Skip(SkipID),
}

/// Loaded form of [`ActionRef`].
#[derive(Debug, Clone, PartialEq)]
pub enum WatchThroughAction {
    Watch(Watch),
    Skip(Skip),
}

impl From<Watch> for WatchThroughAction {
    fn from(watch: Watch) -> Self {
        WatchThroughAction::Watch(watch)
    }
}

impl From<Skip> for WatchThroughAction {
    fn from(skip: Skip) -> Self {
        WatchThroughAction::Skip(skip)
    }
}
