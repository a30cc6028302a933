use uuid::Uuid;

/// Declares a strongly typed id over a database generated UUID.
///
/// Every id also names the entity type used in its global id, see
/// [`crate::gid::GlobalIdentifiable`].
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident => $type_name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub Uuid);

        impl $name {
            pub const fn from_uuid(id: Uuid) -> Self {
                $name(id)
            }

            pub fn as_str(&self) -> String {
                self.0.to_string()
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                $name(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl crate::gid::GlobalIdentifiable for $name {
            const TYPE_NAME: &'static str = $type_name;

            fn local_id(&self) -> String {
                self.0.to_string()
            }

            fn from_local_id(id: &str) -> Option<Self> {
                Uuid::parse_str(id).ok().map($name)
            }
        }
    };
}

entity_id!(
    /// Strongly typed ID for series
    SeriesID => "Series"
);
entity_id!(
    /// Strongly typed ID for seasons
    SeasonID => "Season"
);
entity_id!(
    /// Strongly typed ID for episodes
    EpisodeID => "Episode"
);
entity_id!(
    /// Strongly typed ID for watch-throughs
    WatchThroughID => "WatchThrough"
);
entity_id!(
    /// Strongly typed ID for a watch-through's per-episode join rows
    WatchThroughEpisodeID => "WatchThroughEpisode"
);
entity_id!(
    /// Strongly typed ID for recorded watches
    WatchID => "Watch"
);
entity_id!(
    /// Strongly typed ID for recorded skips
    SkipID => "Skip"
);
