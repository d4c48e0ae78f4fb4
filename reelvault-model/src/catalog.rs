//! Catalog aggregates: watchables and their movie/show payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{
    CastMemberId, ContentRatingId, EpisodeId, GenreId, ImageId, MovieId, SeasonId,
    StreamId, WatchableId,
};

/// Whether a watchable is a standalone movie or an episodic show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchableKind {
    Movie,
    Show,
}

/// Media payload owned by a watchable, selected once at indexing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WatchablePayload {
    Movie(Movie),
    Show(Show),
}

/// Top-level catalog entry representing a movie or show.
///
/// A watchable with a remote-catalog id is unique per id across the catalog;
/// the resolver reuses an existing entry instead of creating a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watchable {
    pub id: WatchableId,
    pub tmdb_id: Option<u64>,
    pub kind: WatchableKind,
    pub title: String,
    pub description: Option<String>,
    pub year: Option<u16>,
    pub creator: Option<String>,
    pub adult: bool,
    pub rating: Option<f64>,
    /// Source quality label derived from the probed video stream, e.g. `1920x1080`.
    pub quality: Option<String>,
    pub genres: Vec<Genre>,
    pub cast: Vec<CastMember>,
    pub directors: Vec<CastMember>,
    pub writers: Vec<CastMember>,
    pub content_ratings: Vec<ContentRating>,
    pub poster: Option<ImageId>,
    pub backdrop: Option<ImageId>,
    pub logo: Option<ImageId>,
    /// YouTube key of the official trailer, when one was resolved.
    pub trailer_key: Option<String>,
    pub payload: Option<WatchablePayload>,
    pub created_at: DateTime<Utc>,
}

impl Watchable {
    pub fn new(kind: WatchableKind, title: impl Into<String>) -> Self {
        Self {
            id: WatchableId::new(),
            tmdb_id: None,
            kind,
            title: title.into(),
            description: None,
            year: None,
            creator: None,
            adult: false,
            rating: None,
            quality: None,
            genres: Vec::new(),
            cast: Vec::new(),
            directors: Vec::new(),
            writers: Vec::new(),
            content_ratings: Vec::new(),
            poster: None,
            backdrop: None,
            logo: None,
            trailer_key: None,
            payload: None,
            created_at: Utc::now(),
        }
    }

    pub fn movie_content(&self) -> Option<&Movie> {
        match &self.payload {
            Some(WatchablePayload::Movie(movie)) => Some(movie),
            _ => None,
        }
    }

    pub fn show_content(&self) -> Option<&Show> {
        match &self.payload {
            Some(WatchablePayload::Show(show)) => Some(show),
            _ => None,
        }
    }

    pub fn show_content_mut(&mut self) -> Option<&mut Show> {
        match &mut self.payload {
            Some(WatchablePayload::Show(show)) => Some(show),
            _ => None,
        }
    }
}

/// Movie payload: one playable stream plus its runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub duration_secs: f64,
    pub stream: StreamId,
}

impl Movie {
    pub fn new(stream: StreamId, duration_secs: f64) -> Self {
        Self {
            id: MovieId::new(),
            duration_secs,
            stream,
        }
    }
}

/// Show payload: ordered seasons, plus the year the show ended (if it has).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub until_year: Option<u16>,
    pub seasons: Vec<Season>,
}

impl Show {
    pub fn new() -> Self {
        Self {
            until_year: None,
            seasons: Vec::new(),
        }
    }

    /// Find a season by its number. Season numbers are unique within a show.
    pub fn season_by_number(&self, season_number: u32) -> Option<&Season> {
        self.seasons
            .iter()
            .find(|season| season.season_number == season_number)
    }
}

impl Default for Show {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub season_number: u32,
    pub name: String,
    pub air_date: Option<String>,
    pub description: Option<String>,
    pub episodes: Vec<Episode>,
}

impl Season {
    pub fn new(season_number: u32) -> Self {
        Self {
            id: SeasonId::new(),
            season_number,
            name: format!("Season {season_number}"),
            air_date: None,
            description: None,
            episodes: Vec::new(),
        }
    }

    /// Find an episode by its number. Episode numbers are unique within a season.
    pub fn episode_by_number(&self, episode_number: u32) -> Option<&Episode> {
        self.episodes
            .iter()
            .find(|episode| episode.episode_number == episode_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub episode_number: u32,
    pub name: String,
    pub description: Option<String>,
    pub duration_secs: f64,
    pub stream: StreamId,
    pub poster: Option<ImageId>,
}

impl Episode {
    pub fn new(episode_number: u32, name: impl Into<String>, stream: StreamId) -> Self {
        Self {
            id: EpisodeId::new(),
            episode_number,
            name: name.into(),
            description: None,
            duration_secs: 0.0,
            stream,
            poster: None,
        }
    }
}

/// Reference row deduplicated by the remote catalog's genre id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub tmdb_id: u64,
    pub name: String,
}

/// Reference row deduplicated by the remote catalog's person id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: CastMemberId,
    pub tmdb_id: u64,
    pub name: String,
    pub popularity: f64,
}

/// Reference row deduplicated by (country, name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRating {
    pub id: ContentRatingId,
    pub country: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::StreamId;

    #[test]
    fn season_lookup_by_number() {
        let mut show = Show::new();
        show.seasons.push(Season::new(1));
        show.seasons.push(Season::new(2));

        assert_eq!(show.season_by_number(2).unwrap().season_number, 2);
        assert!(show.season_by_number(3).is_none());
    }

    #[test]
    fn episode_lookup_by_number() {
        let mut season = Season::new(1);
        season
            .episodes
            .push(Episode::new(4, "Pilot", StreamId::new()));

        assert_eq!(season.episode_by_number(4).unwrap().name, "Pilot");
        assert!(season.episode_by_number(1).is_none());
    }

    #[test]
    fn payload_accessors() {
        let mut watchable = Watchable::new(WatchableKind::Show, "Test");
        assert!(watchable.show_content().is_none());

        watchable.payload = Some(WatchablePayload::Show(Show::new()));
        assert!(watchable.show_content().is_some());
        assert!(watchable.movie_content().is_none());
    }
}
