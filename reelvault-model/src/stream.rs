//! Playable streams and their on-disk artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ImageId, StreamId, StreamPartId, ThumbnailId};

/// A playable unit: one master playlist part, the ordered collection of
/// variant playlists and segments, and the preview thumbnails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub id: StreamId,
    /// The master playlist part handed to players first.
    pub first_part: StreamPartId,
    /// Variant playlists and media segments, in rendition order.
    pub parts: Vec<StreamPartId>,
    pub duration_secs: f64,
    pub thumbnails: Vec<Thumbnail>,
}

impl Stream {
    pub fn new(first_part: StreamPartId, parts: Vec<StreamPartId>, duration_secs: f64) -> Self {
        Self {
            id: StreamId::new(),
            first_part,
            parts,
            duration_secs,
            thumbnails: Vec::new(),
        }
    }
}

/// A persisted playlist (text) or media segment (binary), stored on disk
/// keyed by its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamPart {
    pub id: StreamPartId,
    pub playlist: bool,
    pub has_subtitles: bool,
}

impl StreamPart {
    pub fn new_playlist() -> Self {
        Self {
            id: StreamPartId::new(),
            playlist: true,
            has_subtitles: false,
        }
    }

    pub fn new_segment() -> Self {
        Self {
            id: StreamPartId::new(),
            playlist: false,
            has_subtitles: false,
        }
    }

    /// On-disk file name inside the video vault.
    pub fn file_name(&self) -> String {
        if self.playlist {
            format!("{}.m3u8", self.id)
        } else {
            format!("{}.ts", self.id)
        }
    }
}

/// A preview frame covering the inclusive time range `[from, to]` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub id: ThumbnailId,
    pub from_secs: u32,
    pub to_secs: u32,
    pub image: ImageId,
}

impl Thumbnail {
    pub fn new(from_secs: u32, to_secs: u32, image: ImageId) -> Self {
        Self {
            id: ThumbnailId::new(),
            from_secs,
            to_secs,
            image,
        }
    }
}

/// Stored image metadata. The binary payload lives on disk keyed by identity;
/// `source` makes remote artwork content-addressable so the same URL is never
/// downloaded twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub mime: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Image {
    pub fn new(mime: Option<String>, source: Option<String>) -> Self {
        Self {
            id: ImageId::new(),
            mime,
            source,
            created_at: Utc::now(),
        }
    }

    pub fn jpeg() -> Self {
        Self::new(Some("image/jpeg".to_string()), None)
    }

    /// File extension for the on-disk payload, derived from the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime.as_deref() {
            Some("image/png") => "png",
            Some("image/gif") => "gif",
            Some("image/webp") => "webp",
            Some("image/tiff") => "tiff",
            Some("image/svg+xml") => "svg",
            _ => "jpg",
        }
    }

    /// On-disk file name inside the image vault.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.extension())
    }
}

/// Best-effort MIME lookup for an image URL or file name.
pub fn mime_for_path(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    let ext = lower.rsplit('.').next().unwrap_or("");
    match ext {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_file_names() {
        let playlist = StreamPart::new_playlist();
        assert_eq!(playlist.file_name(), format!("{}.m3u8", playlist.id));

        let segment = StreamPart::new_segment();
        assert_eq!(segment.file_name(), format!("{}.ts", segment.id));
    }

    #[test]
    fn image_extension_follows_mime() {
        assert_eq!(Image::jpeg().extension(), "jpg");
        assert_eq!(
            Image::new(Some("image/png".into()), None).extension(),
            "png"
        );
        assert_eq!(Image::new(None, None).extension(), "jpg");
    }

    #[test]
    fn mime_lookup_defaults_to_jpeg() {
        assert_eq!(mime_for_path("/t/p/w500/abc.png"), "image/png");
        assert_eq!(mime_for_path("poster.JPG"), "image/jpeg");
        assert_eq!(mime_for_path("no-extension"), "image/jpeg");
    }
}
