//! Persistence contract for the catalog, plus an in-memory implementation.
//!
//! The pipeline only talks to [`Catalog`], so a durable backend can be
//! swapped in without touching the indexing path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use reelvault_model::{
    CastMember, CastMemberId, ContentRating, ContentRatingId, Genre, GenreId, Image,
    IndexLog, Stream, StreamPart, Watchable,
};

use crate::error::{MediaError, Result};

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Audit record for a source path, if one exists.
    async fn find_index_log(&self, path: &Path) -> Result<Option<IndexLog>>;

    /// Insert or update the audit record keyed by its source path.
    async fn save_index_log(&self, log: &IndexLog) -> Result<()>;

    /// Genres are deduplicated by the remote catalog's genre id.
    async fn get_or_create_genre(&self, tmdb_id: u64, name: &str) -> Result<Genre>;

    /// People are deduplicated by the remote catalog's person id.
    async fn get_or_create_cast_member(
        &self,
        tmdb_id: u64,
        name: &str,
        popularity: f64,
    ) -> Result<CastMember>;

    /// Content ratings are deduplicated by (country, name).
    async fn get_or_create_content_rating(
        &self,
        country: &str,
        name: &str,
    ) -> Result<ContentRating>;

    /// Look up an image by the remote URL it was fetched from.
    async fn find_image_by_source(&self, source: &str) -> Result<Option<Image>>;

    async fn save_image(&self, image: &Image) -> Result<()>;

    async fn save_stream_part(&self, part: &StreamPart) -> Result<()>;

    async fn save_stream(&self, stream: &Stream) -> Result<()>;

    /// A watchable with a remote id is unique per id across the catalog.
    async fn find_watchable_by_tmdb(&self, tmdb_id: u64) -> Result<Option<Watchable>>;

    /// Insert or update a watchable keyed by its identity.
    async fn save_watchable(&self, watchable: &Watchable) -> Result<()>;
}

/// In-memory catalog. Suitable for tests and single-process runs; contents
/// are lost on shutdown.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    index_logs: HashMap<PathBuf, IndexLog>,
    genres: HashMap<u64, Genre>,
    cast_members: HashMap<u64, CastMember>,
    content_ratings: HashMap<(String, String), ContentRating>,
    images: Vec<Image>,
    stream_parts: Vec<StreamPart>,
    streams: Vec<Stream>,
    watchables: Vec<Watchable>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.inner
            .read()
            .map_err(|_| MediaError::Store("catalog lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryState>> {
        self.inner
            .write()
            .map_err(|_| MediaError::Store("catalog lock poisoned".into()))
    }

    pub fn watchables(&self) -> Vec<Watchable> {
        self.inner
            .read()
            .map(|state| state.watchables.clone())
            .unwrap_or_default()
    }

    pub fn streams(&self) -> Vec<Stream> {
        self.inner
            .read()
            .map(|state| state.streams.clone())
            .unwrap_or_default()
    }

    pub fn stream_parts(&self) -> Vec<StreamPart> {
        self.inner
            .read()
            .map(|state| state.stream_parts.clone())
            .unwrap_or_default()
    }

    pub fn images(&self) -> Vec<Image> {
        self.inner
            .read()
            .map(|state| state.images.clone())
            .unwrap_or_default()
    }

    pub fn index_logs(&self) -> Vec<IndexLog> {
        self.inner
            .read()
            .map(|state| state.index_logs.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_index_log(&self, path: &Path) -> Result<Option<IndexLog>> {
        Ok(self.read()?.index_logs.get(path).cloned())
    }

    async fn save_index_log(&self, log: &IndexLog) -> Result<()> {
        self.write()?
            .index_logs
            .insert(log.filepath.clone(), log.clone());
        Ok(())
    }

    async fn get_or_create_genre(&self, tmdb_id: u64, name: &str) -> Result<Genre> {
        let mut state = self.write()?;
        let genre = state.genres.entry(tmdb_id).or_insert_with(|| Genre {
            id: GenreId::new(),
            tmdb_id,
            name: name.to_string(),
        });
        Ok(genre.clone())
    }

    async fn get_or_create_cast_member(
        &self,
        tmdb_id: u64,
        name: &str,
        popularity: f64,
    ) -> Result<CastMember> {
        let mut state = self.write()?;
        let member = state
            .cast_members
            .entry(tmdb_id)
            .or_insert_with(|| CastMember {
                id: CastMemberId::new(),
                tmdb_id,
                name: name.to_string(),
                popularity,
            });
        Ok(member.clone())
    }

    async fn get_or_create_content_rating(
        &self,
        country: &str,
        name: &str,
    ) -> Result<ContentRating> {
        let mut state = self.write()?;
        let key = (country.to_string(), name.to_string());
        let rating = state
            .content_ratings
            .entry(key)
            .or_insert_with(|| ContentRating {
                id: ContentRatingId::new(),
                country: country.to_string(),
                name: name.to_string(),
            });
        Ok(rating.clone())
    }

    async fn find_image_by_source(&self, source: &str) -> Result<Option<Image>> {
        Ok(self
            .read()?
            .images
            .iter()
            .find(|image| image.source.as_deref() == Some(source))
            .cloned())
    }

    async fn save_image(&self, image: &Image) -> Result<()> {
        let mut state = self.write()?;
        match state.images.iter_mut().find(|e| e.id == image.id) {
            Some(existing) => *existing = image.clone(),
            None => state.images.push(image.clone()),
        }
        Ok(())
    }

    async fn save_stream_part(&self, part: &StreamPart) -> Result<()> {
        let mut state = self.write()?;
        match state.stream_parts.iter_mut().find(|e| e.id == part.id) {
            Some(existing) => *existing = part.clone(),
            None => state.stream_parts.push(part.clone()),
        }
        Ok(())
    }

    async fn save_stream(&self, stream: &Stream) -> Result<()> {
        let mut state = self.write()?;
        match state.streams.iter_mut().find(|e| e.id == stream.id) {
            Some(existing) => *existing = stream.clone(),
            None => state.streams.push(stream.clone()),
        }
        Ok(())
    }

    async fn find_watchable_by_tmdb(&self, tmdb_id: u64) -> Result<Option<Watchable>> {
        Ok(self
            .read()?
            .watchables
            .iter()
            .find(|watchable| watchable.tmdb_id == Some(tmdb_id))
            .cloned())
    }

    async fn save_watchable(&self, watchable: &Watchable) -> Result<()> {
        let mut state = self.write()?;
        match state
            .watchables
            .iter_mut()
            .find(|existing| existing.id == watchable.id)
        {
            Some(existing) => *existing = watchable.clone(),
            None => state.watchables.push(watchable.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelvault_model::{Watchable, WatchableKind};

    #[tokio::test]
    async fn index_log_is_keyed_by_path() {
        let catalog = MemoryCatalog::new();
        let log = IndexLog::started("/media/a.mkv");
        catalog.save_index_log(&log).await.unwrap();

        let found = catalog
            .find_index_log(Path::new("/media/a.mkv"))
            .await
            .unwrap();
        assert_eq!(found.map(|l| l.id), Some(log.id));

        assert!(catalog
            .find_index_log(Path::new("/media/b.mkv"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn reference_rows_deduplicate() {
        let catalog = MemoryCatalog::new();
        let first = catalog.get_or_create_genre(28, "Action").await.unwrap();
        let second = catalog.get_or_create_genre(28, "Action").await.unwrap();
        assert_eq!(first.id, second.id);

        let a = catalog
            .get_or_create_content_rating("US", "PG-13")
            .await
            .unwrap();
        let b = catalog
            .get_or_create_content_rating("US", "PG-13")
            .await
            .unwrap();
        let c = catalog
            .get_or_create_content_rating("DE", "PG-13")
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[tokio::test]
    async fn watchable_save_updates_in_place() {
        let catalog = MemoryCatalog::new();
        let mut watchable = Watchable::new(WatchableKind::Movie, "Heat");
        watchable.tmdb_id = Some(949);
        catalog.save_watchable(&watchable).await.unwrap();

        watchable.rating = Some(8.3);
        catalog.save_watchable(&watchable).await.unwrap();

        let found = catalog.find_watchable_by_tmdb(949).await.unwrap().unwrap();
        assert_eq!(found.rating, Some(8.3));
        assert_eq!(catalog.watchables().len(), 1);
    }
}
