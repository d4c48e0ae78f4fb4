//! Core data model definitions shared across Reelvault crates.

pub mod catalog;
pub mod ids;
pub mod index_log;
pub mod quality;
pub mod stream;

pub use catalog::{
    CastMember, ContentRating, Episode, Genre, Movie, Season, Show, Watchable,
    WatchableKind, WatchablePayload,
};
pub use ids::{
    CastMemberId, ContentRatingId, EpisodeId, GenreId, ImageId, IndexLogId, MovieId,
    SeasonId, StreamId, StreamPartId, ThumbnailId, WatchableId,
};
pub use index_log::IndexLog;
pub use quality::QualityLevel;
pub use stream::{Image, Stream, StreamPart, Thumbnail};
