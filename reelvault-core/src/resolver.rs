//! Remote-catalog enrichment and catalog reconciliation.
//!
//! Turns a parsed release name plus a finished stream into a fully
//! populated `Watchable`. Shows are reconciled against the existing
//! catalog: a remote id that already has a local entry gets the new
//! season/episode appended instead of a duplicate entry.

use std::collections::HashSet;

use reelvault_model::{
    CastMember, ContentRating, Episode, Image, ImageId, Movie, Season, Show, Stream,
    Watchable, WatchableKind, WatchablePayload,
};
use tracing::{debug, info, warn};

use crate::error::{MediaError, Result};
use crate::filename::{ParsedEpisode, ParsedMedia, ParsedMovie};
use crate::store::Catalog;
use crate::tmdb::types::{
    year_of, ContentRatings, Credits, Releases, SeasonDetails,
};
use crate::tmdb::{ArtworkKind, TitleKind, TmdbClient};
use crate::vault::MediaVault;

const MAX_CAST: usize = 20;
const POSTER_SIZE: &str = "w500";
const BACKDROP_SIZE: &str = "original";
const LOGO_SIZE: &str = "original";
const STILL_SIZE: &str = "w300";

pub struct MetadataResolver {
    tmdb: TmdbClient,
    vault: MediaVault,
}

impl MetadataResolver {
    pub fn new(tmdb: TmdbClient, vault: MediaVault) -> Self {
        Self { tmdb, vault }
    }

    /// Resolve `parsed` into a saved watchable owning `stream`.
    pub async fn resolve(
        &self,
        parsed: &ParsedMedia,
        stream: &Stream,
        quality: Option<String>,
        catalog: &dyn Catalog,
    ) -> Result<Watchable> {
        match parsed {
            ParsedMedia::Movie(movie) => {
                self.resolve_movie(movie, stream, quality, catalog).await
            }
            ParsedMedia::Episode(episode) => {
                self.resolve_episode(episode, stream, quality, catalog).await
            }
        }
    }

    async fn resolve_movie(
        &self,
        parsed: &ParsedMovie,
        stream: &Stream,
        quality: Option<String>,
        catalog: &dyn Catalog,
    ) -> Result<Watchable> {
        let page = self.tmdb.search_movie(&parsed.title, 1).await?;
        let Some(summary) = page.results.into_iter().next() else {
            warn!(title = %parsed.title, "no remote match, cataloging with local fields only");
            let watchable = fallback_movie(parsed, stream, quality);
            catalog.save_watchable(&watchable).await?;
            return Ok(watchable);
        };
        let details = self.tmdb.movie(summary.id).await?;
        debug!(tmdb_id = details.id, title = %details.title, "resolved movie");

        let mut watchable = Watchable::new(WatchableKind::Movie, &details.title);
        watchable.tmdb_id = Some(details.id);
        watchable.description = details.overview.clone();
        watchable.year = year_of(details.release_date.as_deref());
        watchable.adult = details.adult;
        watchable.rating = Some(details.vote_average);
        watchable.quality = quality;
        watchable.genres = self.genres(&details.genres, catalog).await?;
        if let Some(releases) = &details.releases {
            watchable.content_ratings =
                self.release_ratings(releases, catalog).await?;
        }
        if let Some(credits) = &details.credits {
            self.apply_credits(&mut watchable, credits, catalog).await?;
        }
        self.apply_artwork(&mut watchable, TitleKind::Movie, details.id, catalog)
            .await?;
        watchable.trailer_key = self.tmdb.trailer(TitleKind::Movie, details.id).await?;
        watchable.payload = Some(WatchablePayload::Movie(Movie::new(
            stream.id,
            stream.duration_secs,
        )));

        catalog.save_watchable(&watchable).await?;
        info!(title = %watchable.title, "movie added to catalog");
        Ok(watchable)
    }

    async fn resolve_episode(
        &self,
        parsed: &ParsedEpisode,
        stream: &Stream,
        quality: Option<String>,
        catalog: &dyn Catalog,
    ) -> Result<Watchable> {
        let page = self.tmdb.search_show(&parsed.show_name, 1).await?;
        let Some(summary) = page.results.into_iter().next() else {
            warn!(show = %parsed.show_name, "no remote match, cataloging with local fields only");
            let mut watchable = fallback_show(parsed, quality);
            if let Some(show) = watchable.show_content_mut() {
                attach_episode(
                    show,
                    &SeasonDetails::default(),
                    parsed.season,
                    parsed.episode,
                    stream,
                    None,
                );
            }
            catalog.save_watchable(&watchable).await?;
            return Ok(watchable);
        };

        let mut watchable = match catalog.find_watchable_by_tmdb(summary.id).await? {
            Some(existing) if existing.kind == WatchableKind::Show => {
                debug!(tmdb_id = summary.id, "reusing existing show");
                existing
            }
            _ => self.new_show(summary.id, quality, catalog).await?,
        };

        let season_details = self.tmdb.season(summary.id, parsed.season).await?;
        let still = match episode_still(&season_details, parsed.episode) {
            Some(path) => {
                let url = self
                    .tmdb
                    .image_url(&path, ArtworkKind::Still, STILL_SIZE)
                    .await?;
                Some(self.cached_image(&url, catalog).await?)
            }
            None => None,
        };

        let show = watchable
            .show_content_mut()
            .ok_or_else(|| MediaError::Internal("show watchable has no show payload".into()))?;
        attach_episode(
            show,
            &season_details,
            parsed.season,
            parsed.episode,
            stream,
            still,
        );

        catalog.save_watchable(&watchable).await?;
        info!(
            title = %watchable.title,
            season = parsed.season,
            episode = parsed.episode,
            "episode added to catalog"
        );
        Ok(watchable)
    }

    async fn new_show(
        &self,
        tmdb_id: u64,
        quality: Option<String>,
        catalog: &dyn Catalog,
    ) -> Result<Watchable> {
        let details = self.tmdb.show(tmdb_id).await?;
        debug!(tmdb_id, title = %details.name, "resolved new show");

        let mut watchable = Watchable::new(WatchableKind::Show, &details.name);
        watchable.tmdb_id = Some(details.id);
        watchable.description = details.overview.clone();
        watchable.year = year_of(details.first_air_date.as_deref());
        watchable.creator = details.created_by.first().map(|c| c.name.clone());
        watchable.adult = details.adult;
        watchable.rating = Some(details.vote_average);
        watchable.quality = quality;
        watchable.genres = self.genres(&details.genres, catalog).await?;
        if let Some(ratings) = &details.content_ratings {
            watchable.content_ratings = self.broadcast_ratings(ratings, catalog).await?;
        }
        if let Some(credits) = &details.credits {
            self.apply_credits(&mut watchable, credits, catalog).await?;
        }
        self.apply_artwork(&mut watchable, TitleKind::Show, details.id, catalog)
            .await?;
        watchable.trailer_key = self.tmdb.trailer(TitleKind::Show, details.id).await?;

        let mut show = Show::new();
        if !details.in_production {
            show.until_year = year_of(details.last_air_date.as_deref());
        }
        watchable.payload = Some(WatchablePayload::Show(show));
        Ok(watchable)
    }

    async fn genres(
        &self,
        genres: &[crate::tmdb::types::TmdbGenre],
        catalog: &dyn Catalog,
    ) -> Result<Vec<reelvault_model::Genre>> {
        let mut out = Vec::with_capacity(genres.len());
        for genre in genres {
            out.push(catalog.get_or_create_genre(genre.id, &genre.name).await?);
        }
        Ok(out)
    }

    async fn release_ratings(
        &self,
        releases: &Releases,
        catalog: &dyn Catalog,
    ) -> Result<Vec<ContentRating>> {
        let mut out = Vec::new();
        for (country, certification) in newest_certifications(releases) {
            out.push(
                catalog
                    .get_or_create_content_rating(&country, &certification)
                    .await?,
            );
        }
        Ok(out)
    }

    async fn broadcast_ratings(
        &self,
        ratings: &ContentRatings,
        catalog: &dyn Catalog,
    ) -> Result<Vec<ContentRating>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for entry in &ratings.results {
            if entry.rating.is_empty() || !seen.insert(entry.iso_3166_1.clone()) {
                continue;
            }
            out.push(
                catalog
                    .get_or_create_content_rating(&entry.iso_3166_1, &entry.rating)
                    .await?,
            );
        }
        Ok(out)
    }

    async fn apply_credits(
        &self,
        watchable: &mut Watchable,
        credits: &Credits,
        catalog: &dyn Catalog,
    ) -> Result<()> {
        let mut cast = credits.cast.clone();
        cast.sort_by_key(|c| c.order);
        for member in cast.into_iter().take(MAX_CAST) {
            watchable.cast.push(
                catalog
                    .get_or_create_cast_member(member.id, &member.name, member.popularity)
                    .await?,
            );
        }

        for person in &credits.crew {
            let target: Option<&mut Vec<CastMember>> = match person.department.as_str() {
                "Directing" => Some(&mut watchable.directors),
                "Writing" => Some(&mut watchable.writers),
                _ => None,
            };
            if let Some(list) = target {
                let member = catalog
                    .get_or_create_cast_member(person.id, &person.name, person.popularity)
                    .await?;
                if !list.iter().any(|m| m.id == member.id) {
                    list.push(member);
                }
            }
        }
        Ok(())
    }

    async fn apply_artwork(
        &self,
        watchable: &mut Watchable,
        kind: TitleKind,
        tmdb_id: u64,
        catalog: &dyn Catalog,
    ) -> Result<()> {
        let images = self.tmdb.images(kind, tmdb_id).await?;

        if let Some(best) = images.posters.first() {
            let url = self
                .tmdb
                .image_url(&best.file_path, ArtworkKind::Poster, POSTER_SIZE)
                .await?;
            watchable.poster = Some(self.cached_image(&url, catalog).await?);
        }
        if let Some(best) = images.backdrops.first() {
            let url = self
                .tmdb
                .image_url(&best.file_path, ArtworkKind::Backdrop, BACKDROP_SIZE)
                .await?;
            watchable.backdrop = Some(self.cached_image(&url, catalog).await?);
        }
        if let Some(best) = images.logos.first() {
            let url = self
                .tmdb
                .image_url(&best.file_path, ArtworkKind::Logo, LOGO_SIZE)
                .await?;
            watchable.logo = Some(self.cached_image(&url, catalog).await?);
        }
        Ok(())
    }

    /// Download an image once per source URL; later requests for the same
    /// URL reuse the stored copy.
    async fn cached_image(&self, url: &str, catalog: &dyn Catalog) -> Result<ImageId> {
        if let Some(existing) = catalog.find_image_by_source(url).await? {
            return Ok(existing.id);
        }

        let response = self.tmdb.http().get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Lookup(format!(
                "image download {url} returned {status}"
            )));
        }
        let bytes = response.bytes().await?;

        let image = Image::new(
            Some(reelvault_model::stream::mime_for_path(url).to_string()),
            Some(url.to_string()),
        );
        tokio::fs::write(self.vault.image_path(&image), &bytes).await?;
        catalog.save_image(&image).await?;
        Ok(image.id)
    }
}

/// Watchable built from local fields alone when the remote catalog has no
/// match for the parsed title.
fn fallback_movie(parsed: &ParsedMovie, stream: &Stream, quality: Option<String>) -> Watchable {
    let mut watchable = Watchable::new(WatchableKind::Movie, &parsed.title);
    watchable.year = parsed.year;
    watchable.quality = quality;
    watchable.payload = Some(WatchablePayload::Movie(Movie::new(
        stream.id,
        stream.duration_secs,
    )));
    watchable
}

fn fallback_show(parsed: &ParsedEpisode, quality: Option<String>) -> Watchable {
    let mut watchable = Watchable::new(WatchableKind::Show, &parsed.show_name);
    watchable.year = parsed.year;
    watchable.quality = quality;
    watchable.payload = Some(WatchablePayload::Show(Show::new()));
    watchable
}

/// Latest non-empty certification per country, newest release first.
fn newest_certifications(releases: &Releases) -> Vec<(String, String)> {
    let mut entries: Vec<_> = releases
        .countries
        .iter()
        .filter(|c| !c.certification.is_empty())
        .collect();
    entries.sort_by(|a, b| b.release_date.cmp(&a.release_date));

    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|c| seen.insert(c.iso_3166_1.clone()))
        .map(|c| (c.iso_3166_1.clone(), c.certification.clone()))
        .collect()
}

fn episode_still(season: &SeasonDetails, episode_number: u32) -> Option<String> {
    season
        .episodes
        .iter()
        .find(|e| e.episode_number == episode_number)
        .and_then(|e| e.still_path.clone())
}

/// Attach one episode to a show: the season is reused when its number
/// already exists, the episode is always created.
fn attach_episode(
    show: &mut Show,
    season_details: &SeasonDetails,
    season_number: u32,
    episode_number: u32,
    stream: &Stream,
    still: Option<ImageId>,
) {
    let index = match show
        .seasons
        .iter()
        .position(|s| s.season_number == season_number)
    {
        Some(index) => index,
        None => {
            let mut season = Season::new(season_number);
            if !season_details.name.is_empty() {
                season.name = season_details.name.clone();
            }
            season.air_date = season_details.air_date.clone();
            season.description = season_details.overview.clone();
            show.seasons.push(season);
            show.seasons.len() - 1
        }
    };
    let season = &mut show.seasons[index];

    let remote = season_details
        .episodes
        .iter()
        .find(|e| e.episode_number == episode_number);
    let name = remote
        .map(|e| e.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Episode {episode_number}"));

    let mut episode = Episode::new(episode_number, name, stream.id);
    episode.description = remote.and_then(|e| e.overview.clone());
    episode.duration_secs = stream.duration_secs;
    episode.poster = still;
    season.episodes.push(episode);
}
