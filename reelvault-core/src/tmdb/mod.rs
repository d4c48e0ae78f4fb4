//! Client for the remote metadata catalog.
//!
//! Thin wrapper over the v3 HTTP API with a per-process cache of the image
//! configuration, so repeated lookups do not refetch the host and size lists.

pub mod types;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{MediaError, Result};
use types::{
    Configuration, ImageCollection, ImageConfiguration, MovieDetails, MovieSummary,
    SearchPage, SeasonDetails, ShowDetails, ShowSummary, VideoCollection,
};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Which side of the catalog a title lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleKind {
    Movie,
    Show,
}

impl TitleKind {
    fn path(self) -> &'static str {
        match self {
            TitleKind::Movie => "movie",
            TitleKind::Show => "tv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkKind {
    Poster,
    Backdrop,
    Logo,
    Still,
}

pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    image_config: Mutex<Option<ImageConfiguration>>,
    /// Per-process response cache keyed by (path, query). No expiry; lives
    /// for the life of the client so repeated lookups across files in one
    /// run skip the network.
    responses: Mutex<HashMap<String, serde_json::Value>>,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different host. Used to exercise the client
    /// against a local stub server.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            image_config: Mutex::new(None),
            responses: Mutex::new(HashMap::new()),
        }
    }

    /// Shared HTTP client, also used for artwork downloads.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let cache_key = query.iter().fold(path.to_string(), |mut key, (k, v)| {
            key.push_str(&format!("&{k}={v}"));
            key
        });
        {
            let cached = self.responses.lock().await;
            if let Some(value) = cached.get(&cache_key) {
                return Ok(serde_json::from_value(value.clone())?);
            }
        }

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "tmdb request");

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Lookup(format!(
                "{path} returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let value: serde_json::Value = response.json().await?;
        self.responses
            .lock()
            .await
            .insert(cache_key, value.clone());
        Ok(serde_json::from_value(value)?)
    }

    /// Image host configuration, fetched once per process.
    pub async fn image_configuration(&self) -> Result<ImageConfiguration> {
        let mut cached = self.image_config.lock().await;
        if let Some(config) = cached.as_ref() {
            return Ok(config.clone());
        }
        let config: Configuration = self.get("/configuration", &[]).await?;
        *cached = Some(config.images.clone());
        Ok(config.images)
    }

    /// Full URL for an artwork file at the requested size. The size must be
    /// one the host advertises for that artwork kind.
    pub async fn image_url(
        &self,
        file_path: &str,
        kind: ArtworkKind,
        size: &str,
    ) -> Result<String> {
        let config = self.image_configuration().await?;
        build_image_url(&config, file_path, kind, size)
    }

    pub async fn search_movie(
        &self,
        query: &str,
        page: u32,
    ) -> Result<SearchPage<MovieSummary>> {
        let page = page.to_string();
        self.get("/search/movie", &[("query", query), ("page", &page)])
            .await
    }

    pub async fn search_show(&self, query: &str, page: u32) -> Result<SearchPage<ShowSummary>> {
        let page = page.to_string();
        self.get("/search/tv", &[("query", query), ("page", &page)])
            .await
    }

    pub async fn movie(&self, id: u64) -> Result<MovieDetails> {
        self.get(
            &format!("/movie/{id}"),
            &[("append_to_response", "releases,credits")],
        )
        .await
    }

    pub async fn show(&self, id: u64) -> Result<ShowDetails> {
        self.get(
            &format!("/tv/{id}"),
            &[("append_to_response", "content_ratings,credits")],
        )
        .await
    }

    pub async fn season(&self, show_id: u64, season_number: u32) -> Result<SeasonDetails> {
        self.get(&format!("/tv/{show_id}/season/{season_number}"), &[])
            .await
    }

    /// Artwork for a title, each list ordered best-voted first.
    pub async fn images(&self, kind: TitleKind, id: u64) -> Result<ImageCollection> {
        let mut collection: ImageCollection = self
            .get(&format!("/{}/{id}/images", kind.path()), &[])
            .await?;
        sort_by_votes(&mut collection);
        Ok(collection)
    }

    /// YouTube key of the best trailer for a title, preferring official ones.
    pub async fn trailer(&self, kind: TitleKind, id: u64) -> Result<Option<String>> {
        let videos: VideoCollection = self
            .get(&format!("/{}/{id}/videos", kind.path()), &[])
            .await?;
        Ok(pick_trailer(&videos))
    }
}

fn build_image_url(
    config: &ImageConfiguration,
    file_path: &str,
    kind: ArtworkKind,
    size: &str,
) -> Result<String> {
    let sizes = match kind {
        ArtworkKind::Poster => &config.poster_sizes,
        ArtworkKind::Backdrop => &config.backdrop_sizes,
        ArtworkKind::Logo => &config.logo_sizes,
        ArtworkKind::Still => &config.still_sizes,
    };
    if !sizes.iter().any(|s| s == size) {
        return Err(MediaError::Lookup(format!(
            "size {size} not offered for {kind:?} artwork (have {sizes:?})"
        )));
    }
    let file_path = file_path.trim_start_matches('/');
    Ok(format!("{}{size}/{file_path}", config.secure_base_url))
}

fn sort_by_votes(collection: &mut ImageCollection) {
    for list in [
        &mut collection.posters,
        &mut collection.backdrops,
        &mut collection.logos,
    ] {
        list.sort_by(|a, b| {
            b.vote_average
                .partial_cmp(&a.vote_average)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

fn pick_trailer(videos: &VideoCollection) -> Option<String> {
    let trailers = videos
        .results
        .iter()
        .filter(|v| v.site == "YouTube" && v.kind == "Trailer");
    trailers
        .clone()
        .find(|v| v.official)
        .or_else(|| trailers.clone().next())
        .map(|v| v.key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ArtworkEntry, VideoEntry};

    fn config() -> ImageConfiguration {
        ImageConfiguration {
            secure_base_url: "https://image.tmdb.org/t/p/".into(),
            poster_sizes: vec!["w185".into(), "w500".into(), "original".into()],
            backdrop_sizes: vec!["w780".into(), "original".into()],
            logo_sizes: vec!["original".into()],
            still_sizes: vec!["w300".into()],
        }
    }

    #[test]
    fn image_url_joins_host_size_and_path() {
        let url =
            build_image_url(&config(), "/abc123.jpg", ArtworkKind::Poster, "w500").unwrap();
        assert_eq!(url, "https://image.tmdb.org/t/p/w500/abc123.jpg");
    }

    #[test]
    fn image_url_rejects_unknown_size() {
        let err = build_image_url(&config(), "/abc.jpg", ArtworkKind::Backdrop, "w500");
        assert!(matches!(err, Err(MediaError::Lookup(_))));
    }

    #[test]
    fn artwork_sorted_best_first() {
        let mut collection = ImageCollection {
            posters: vec![
                ArtworkEntry {
                    file_path: "/low.jpg".into(),
                    vote_average: 2.0,
                    ..Default::default()
                },
                ArtworkEntry {
                    file_path: "/high.jpg".into(),
                    vote_average: 7.5,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        sort_by_votes(&mut collection);
        assert_eq!(collection.posters[0].file_path, "/high.jpg");
    }

    #[test]
    fn trailer_prefers_official_youtube() {
        let videos = VideoCollection {
            results: vec![
                VideoEntry {
                    key: "fan".into(),
                    site: "YouTube".into(),
                    kind: "Trailer".into(),
                    official: false,
                    ..Default::default()
                },
                VideoEntry {
                    key: "vimeo".into(),
                    site: "Vimeo".into(),
                    kind: "Trailer".into(),
                    official: true,
                    ..Default::default()
                },
                VideoEntry {
                    key: "official".into(),
                    site: "YouTube".into(),
                    kind: "Trailer".into(),
                    official: true,
                    ..Default::default()
                },
            ],
        };
        assert_eq!(pick_trailer(&videos).as_deref(), Some("official"));

        let only_fan = VideoCollection {
            results: vec![VideoEntry {
                key: "fan".into(),
                site: "YouTube".into(),
                kind: "Trailer".into(),
                official: false,
                ..Default::default()
            }],
        };
        assert_eq!(pick_trailer(&only_fan).as_deref(), Some("fan"));
    }
}
