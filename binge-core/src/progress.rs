//! Derived watch-through fields computed over a sequence of join rows.
//!
//! Every function takes the rows of a single watch-through in any order and
//! looks at `index` rather than slice position.

use binge_model::{ActionRef, WatchThroughEpisode};
use chrono::NaiveDate;

/// Upper bound on rows returned by [`filter_episodes`].
pub const EPISODE_FILTER_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedFilter {
    /// A watch is linked.
    Watched,
    /// No watch is linked, skipped rows included.
    Unwatched,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeFilter {
    pub watched: Option<WatchedFilter>,
    /// `true`: watched or skipped. `false`: neither.
    pub finished: Option<bool>,
}

impl EpisodeFilter {
    pub fn matches(&self, row: &WatchThroughEpisode) -> bool {
        let watched = match self.watched {
            Some(WatchedFilter::Watched) => row.watch_id.is_some(),
            Some(WatchedFilter::Unwatched) => row.watch_id.is_none(),
            None => true,
        };
        let finished = self
            .finished
            .is_none_or(|finished| row.is_finished() == finished);
        watched && finished
    }
}

/// Lowest-index row that is neither watched nor skipped.
pub fn next_episode(rows: &[WatchThroughEpisode]) -> Option<&WatchThroughEpisode> {
    rows.iter()
        .filter(|row| !row.is_finished())
        .min_by_key(|row| row.index)
}

/// Highest-index row that was watched or skipped.
pub fn last_episode(rows: &[WatchThroughEpisode]) -> Option<&WatchThroughEpisode> {
    rows.iter()
        .filter(|row| row.is_finished())
        .max_by_key(|row| row.index)
}

/// The action that resolved [`last_episode`].
pub fn last_action(rows: &[WatchThroughEpisode]) -> Option<ActionRef> {
    last_episode(rows).and_then(WatchThroughEpisode::action)
}

/// Pending rows whose episode has already aired as of `today` (UTC).
/// Rows without an episode or an air date never count.
pub fn unfinished_episode_count(
    rows: &[WatchThroughEpisode],
    today: NaiveDate,
) -> usize {
    rows.iter()
        .filter(|row| !row.is_finished() && row.episode_id.is_some())
        .filter(|row| row.episode_first_aired.is_some_and(|aired| aired <= today))
        .count()
}

/// Rows matching `filter` in index order, at most [`EPISODE_FILTER_LIMIT`].
pub fn filter_episodes<'a>(
    rows: &'a [WatchThroughEpisode],
    filter: &EpisodeFilter,
) -> Vec<&'a WatchThroughEpisode> {
    let mut matching: Vec<&WatchThroughEpisode> =
        rows.iter().filter(|row| filter.matches(row)).collect();
    matching.sort_by_key(|row| row.index);
    matching.truncate(EPISODE_FILTER_LIMIT);
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use binge_model::{
        EpisodeID, SkipID, WatchID, WatchThroughEpisodeID, WatchThroughID,
    };
    use uuid::Uuid;

    enum State {
        Pending,
        Watched,
        Skipped,
        Both,
    }

    fn row(
        index: i32,
        state: State,
        aired: Option<NaiveDate>,
    ) -> WatchThroughEpisode {
        let (watch_id, skip_id) = match state {
            State::Pending => (None, None),
            State::Watched => (Some(WatchID(Uuid::new_v4())), None),
            State::Skipped => (None, Some(SkipID(Uuid::new_v4()))),
            State::Both => (
                Some(WatchID(Uuid::new_v4())),
                Some(SkipID(Uuid::new_v4())),
            ),
        };

        WatchThroughEpisode {
            id: WatchThroughEpisodeID(Uuid::new_v4()),
            watch_through_id: WatchThroughID(Uuid::nil()),
            episode_id: Some(EpisodeID(Uuid::new_v4())),
            index,
            watch_id,
            skip_id,
            episode_first_aired: aired,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn watched_pending_skipped_scenario() {
        let aired = Some(date(2020, 1, 1));
        let rows = vec![
            row(0, State::Watched, aired),
            row(1, State::Pending, aired),
            row(2, State::Skipped, aired),
        ];

        assert_eq!(next_episode(&rows).map(|r| r.index), Some(1));
        assert_eq!(last_episode(&rows).map(|r| r.index), Some(2));
        assert_eq!(
            last_action(&rows),
            Some(ActionRef::Skip(rows[2].skip_id.unwrap()))
        );
        assert_eq!(unfinished_episode_count(&rows, date(2024, 1, 1)), 1);
    }

    #[test]
    fn next_episode_ignores_slice_order() {
        let rows = vec![
            row(3, State::Pending, None),
            row(1, State::Pending, None),
            row(0, State::Watched, None),
        ];
        assert_eq!(next_episode(&rows).map(|r| r.index), Some(1));
    }

    #[test]
    fn nothing_next_when_every_row_is_resolved() {
        let rows = vec![row(0, State::Watched, None), row(1, State::Skipped, None)];
        assert!(next_episode(&rows).is_none());
        assert!(next_episode(&[]).is_none());
        assert!(last_action(&[]).is_none());
    }

    #[test]
    fn watch_wins_over_skip_for_last_action() {
        let rows = vec![row(0, State::Both, None)];
        assert_eq!(
            last_action(&rows),
            Some(ActionRef::Watch(rows[0].watch_id.unwrap()))
        );
    }

    #[test]
    fn unaired_and_undated_episodes_are_not_unfinished() {
        let today = date(2024, 5, 10);
        let mut missing_episode = row(4, State::Pending, Some(date(2024, 1, 1)));
        missing_episode.episode_id = None;

        let rows = vec![
            row(0, State::Pending, Some(date(2024, 5, 9))),
            row(1, State::Pending, Some(today)),
            row(2, State::Pending, Some(date(2024, 5, 11))),
            row(3, State::Pending, None),
            missing_episode,
            row(5, State::Watched, Some(date(2024, 1, 1))),
        ];

        assert_eq!(unfinished_episode_count(&rows, today), 2);
    }

    #[test]
    fn filters_combine_and_keep_index_order() {
        let rows = vec![
            row(2, State::Skipped, None),
            row(0, State::Watched, None),
            row(1, State::Pending, None),
            row(3, State::Pending, None),
        ];

        let indices = |filter: EpisodeFilter| -> Vec<i32> {
            filter_episodes(&rows, &filter)
                .iter()
                .map(|r| r.index)
                .collect()
        };

        assert_eq!(indices(EpisodeFilter::default()), vec![0, 1, 2, 3]);
        assert_eq!(
            indices(EpisodeFilter {
                watched: Some(WatchedFilter::Watched),
                finished: None,
            }),
            vec![0]
        );
        assert_eq!(
            indices(EpisodeFilter {
                watched: Some(WatchedFilter::Unwatched),
                finished: None,
            }),
            vec![1, 2, 3]
        );
        assert_eq!(
            indices(EpisodeFilter {
                watched: None,
                finished: Some(false),
            }),
            vec![1, 3]
        );
        assert_eq!(
            indices(EpisodeFilter {
                watched: Some(WatchedFilter::Unwatched),
                finished: Some(true),
            }),
            vec![2]
        );
    }

    #[test]
    fn filter_is_capped() {
        let rows: Vec<_> = (0..120).map(|i| row(i, State::Pending, None)).collect();
        let filtered = filter_episodes(&rows, &EpisodeFilter::default());
        assert_eq!(filtered.len(), EPISODE_FILTER_LIMIT);
        assert_eq!(filtered.last().map(|r| r.index), Some(49));
    }
}
