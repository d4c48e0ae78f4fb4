//! Structured media inspection via the external probe tool.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, Result};

/// Container-level metadata reported by the probe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    /// Total duration in seconds; the probe reports it as a decimal string.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub format_name: Option<String>,
}

/// One elementary stream inside the container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    pub index: u32,
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub channels: Option<u32>,
}

/// Parsed probe output for one source file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: ProbeFormat,
}

impl ProbeReport {
    pub fn video_streams(&self) -> Vec<&ProbeStream> {
        self.streams_of_type("video")
    }

    pub fn audio_streams(&self) -> Vec<&ProbeStream> {
        self.streams_of_type("audio")
    }

    pub fn subtitle_streams(&self) -> Vec<&ProbeStream> {
        self.streams_of_type("subtitle")
    }

    fn streams_of_type(&self, kind: &str) -> Vec<&ProbeStream> {
        self.streams
            .iter()
            .filter(|stream| stream.codec_type.as_deref() == Some(kind))
            .collect()
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.format
            .duration
            .as_deref()
            .and_then(|raw| raw.parse::<f64>().ok())
    }

    /// `{width}x{height}` of the first video stream, used as the source
    /// quality label on the watchable.
    pub fn quality_label(&self) -> Option<String> {
        let video = self.video_streams().into_iter().next()?;
        match (video.width, video.height) {
            (Some(width), Some(height)) => Some(format!("{width}x{height}")),
            _ => None,
        }
    }

    /// Height of the first video stream, the no-upscale reference.
    pub fn source_height(&self) -> Option<u32> {
        self.video_streams().into_iter().next()?.height
    }
}

/// Wraps external probe invocation.
#[derive(Debug, Clone)]
pub struct Prober {
    ffprobe_path: String,
}

impl Default for Prober {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl Prober {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Run the probe against one file and parse its JSON report.
    pub async fn probe(&self, path: &Path) -> Result<ProbeReport> {
        debug!(path = %path.display(), "probing media file");

        let output = Command::new(&self.ffprobe_path)
            .arg("-v")
            .arg("error")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| MediaError::Probe(format!("failed to spawn ffprobe: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let report: ProbeReport = serde_json::from_slice(&output.stdout)?;
        if report.streams.is_empty() {
            return Err(MediaError::InvalidMedia(format!(
                "no streams found in {}",
                path.display()
            )));
        }
        Ok(report)
    }
}
