//! Strongly typed identifiers for catalog entities.
//!
//! Every persisted entity is keyed by a random UUID, mirroring the on-disk
//! artifact naming (`{id}.ts`, `{id}.m3u8`, `{id}.jpg`).

use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identity of a top-level catalog entry.
    WatchableId
);
entity_id!(MovieId);
entity_id!(SeasonId);
entity_id!(EpisodeId);
entity_id!(StreamId);
entity_id!(
    /// Identity of a persisted playlist or segment artifact.
    StreamPartId
);
entity_id!(ThumbnailId);
entity_id!(ImageId);
entity_id!(GenreId);
entity_id!(CastMemberId);
entity_id!(ContentRatingId);
entity_id!(IndexLogId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(StreamPartId::new(), StreamPartId::new());
    }

    #[test]
    fn display_matches_uuid() {
        let id = ImageId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
