//! Wire types for the remote metadata catalog.
//!
//! Every field the pipeline does not strictly need is defaulted, so schema
//! drift on the remote side degrades to missing data instead of parse errors.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    pub images: ImageConfiguration,
}

/// Image host and the size variants it accepts per artwork kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageConfiguration {
    #[serde(default)]
    pub secure_base_url: String,
    #[serde(default)]
    pub poster_sizes: Vec<String>,
    #[serde(default)]
    pub backdrop_sizes: Vec<String>,
    #[serde(default)]
    pub logo_sizes: Vec<String>,
    #[serde(default)]
    pub still_sizes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub vote_average: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowSummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbGenre {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CastCredit {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrewCredit {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub department: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastCredit>,
    #[serde(default)]
    pub crew: Vec<CrewCredit>,
}

/// Per-country theatrical release entries appended to movie details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Releases {
    #[serde(default)]
    pub countries: Vec<ReleaseCountry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseCountry {
    #[serde(default)]
    pub iso_3166_1: String,
    #[serde(default)]
    pub certification: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// Per-country broadcast ratings appended to show details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentRatings {
    #[serde(default)]
    pub results: Vec<ContentRatingEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentRatingEntry {
    #[serde(default)]
    pub iso_3166_1: String,
    #[serde(default)]
    pub rating: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub releases: Option<Releases>,
    #[serde(default)]
    pub credits: Option<Credits>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowDetails {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub last_air_date: Option<String>,
    #[serde(default)]
    pub in_production: bool,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub created_by: Vec<Creator>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub content_ratings: Option<ContentRatings>,
    #[serde(default)]
    pub credits: Option<Credits>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonDetails {
    #[serde(default)]
    pub season_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub episodes: Vec<EpisodeDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeDetails {
    #[serde(default)]
    pub episode_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub still_path: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageCollection {
    #[serde(default)]
    pub posters: Vec<ArtworkEntry>,
    #[serde(default)]
    pub backdrops: Vec<ArtworkEntry>,
    #[serde(default)]
    pub logos: Vec<ArtworkEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtworkEntry {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub iso_639_1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoCollection {
    #[serde(default)]
    pub results: Vec<VideoEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoEntry {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub site: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub official: bool,
    #[serde(default)]
    pub name: String,
}

/// First four characters of a `YYYY-MM-DD` date string, parsed as a year.
pub fn year_of(date: Option<&str>) -> Option<u16> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_extraction() {
        assert_eq!(year_of(Some("2008-07-18")), Some(2008));
        assert_eq!(year_of(Some("")), None);
        assert_eq!(year_of(None), None);
    }

    #[test]
    fn search_page_tolerates_missing_fields() {
        let page: SearchPage<MovieSummary> =
            serde_json::from_str(r#"{"results": [{"id": 155, "title": "The Dark Knight"}]}"#)
                .unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, 155);
    }
}
