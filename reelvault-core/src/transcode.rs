//! Adaptive-bitrate HLS rendition of a source file.
//!
//! One encoder invocation produces every quality level: the ladder is mapped
//! into numbered output streams, grouped by a variant stream map, and
//! segmented into per-variant playlists plus a master playlist. The
//! temporary artifacts are then imported into the vault under persisted
//! `StreamPart` identities, with playlist text rewritten to match.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use reelvault_model::{QualityLevel, Stream, StreamPart, StreamPartId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, Result};
use crate::probe::ProbeReport;
use crate::store::Catalog;
use crate::vault::MediaVault;

/// Pipeline phase reports fired while a rendition is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TranscodeUpdate {
    /// Fraction of the source encoded so far.
    Encoding(f32),
    /// Encoder finished; artifacts are being imported into the vault.
    Importing,
}

/// Callback fired from the encoder's event stream. Must not block.
pub type ProgressSink = Arc<dyn Fn(TranscodeUpdate) + Send + Sync>;

const MASTER_PLAYLIST: &str = "master.m3u8";
const SEGMENT_SECONDS: u32 = 5;

#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    pub ffmpeg_path: String,
    pub hardware_accel: bool,
    pub quality_levels: Vec<QualityLevel>,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            hardware_accel: false,
            quality_levels: reelvault_model::quality::default_ladder(),
        }
    }
}

pub struct TranscodePipeline {
    options: TranscodeOptions,
}

impl TranscodePipeline {
    pub fn new(options: TranscodeOptions) -> Self {
        Self { options }
    }

    /// Transcode `source` into a persisted [`Stream`].
    ///
    /// The temporary working directory is removed on every exit path, the
    /// drop guard takes care of failures.
    pub async fn transcode(
        &self,
        source: &Path,
        report: &ProbeReport,
        vault: &MediaVault,
        catalog: &dyn Catalog,
        progress: ProgressSink,
    ) -> Result<Stream> {
        let ladder = &self.options.quality_levels;
        if ladder.is_empty() {
            return Err(MediaError::Transcode(
                "quality ladder is empty".to_string(),
            ));
        }

        let work_dir = tempfile::tempdir()?;
        let args = build_encode_args(
            source,
            work_dir.path(),
            ladder,
            report,
            self.options.hardware_accel,
        );
        debug!(source = %source.display(), variants = ladder.len(), "starting transcode");

        self.run_encoder(&args, report.duration_secs(), Arc::clone(&progress))
            .await?;
        progress(TranscodeUpdate::Importing);

        let duration = report.duration_secs().unwrap_or(0.0);
        let has_subtitles = !report.subtitle_streams().is_empty();
        import_rendition(work_dir.path(), duration, has_subtitles, vault, catalog).await
    }

    async fn run_encoder(
        &self,
        args: &[String],
        total_secs: Option<f64>,
        progress: ProgressSink,
    ) -> Result<()> {
        let mut child = Command::new(&self.options.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| MediaError::Transcode(format!("failed to spawn ffmpeg: {err}")))?;

        let stderr = child.stderr.take().ok_or_else(|| {
            MediaError::Transcode("ffmpeg stderr was not captured".to_string())
        })?;

        let monitor = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail: Vec<String> = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if let (Some(done), Some(total)) = (parse_progress_secs(&line), total_secs) {
                    if total > 0.0 {
                        progress(TranscodeUpdate::Encoding(
                            (done / total).clamp(0.0, 1.0) as f32,
                        ));
                    }
                }
                tail.push(line);
                if tail.len() > 40 {
                    tail.remove(0);
                }
            }
            tail.join("\n")
        });

        let status = child.wait().await?;
        let tail = monitor.await.unwrap_or_default();

        if !status.success() {
            warn!(%status, "ffmpeg exited with failure");
            return Err(MediaError::Transcode(format!(
                "ffmpeg exited with {status}: {tail}"
            )));
        }
        Ok(())
    }
}

/// Full encoder argument list for one multi-variant invocation.
///
/// Every rung maps every probed video and audio stream, so a ladder of K
/// rungs always yields K variants; rungs at or above the source height
/// simply skip the scale filter and encode at the source resolution.
fn build_encode_args(
    source: &Path,
    out_dir: &Path,
    ladder: &[QualityLevel],
    report: &ProbeReport,
    hardware_accel: bool,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-y".into()];
    if hardware_accel {
        args.push("-hwaccel".into());
        args.push("auto".into());
    }
    args.push("-i".into());
    args.push(source.display().to_string());

    let threads = num_cpus::get().saturating_sub(1).max(1);
    args.push("-threads".into());
    args.push(threads.to_string());

    let video_streams = report.video_streams();
    let audio_streams = report.audio_streams();

    for (i, level) in ladder.iter().enumerate() {
        for (v, stream) in video_streams.iter().enumerate() {
            args.push("-map".into());
            args.push(format!("0:v:{v}"));

            let out = i * video_streams.len() + v;
            let needs_scale = stream.height.map_or(true, |h| h > level.height);
            if needs_scale {
                args.push(format!("-filter:v:{out}"));
                args.push(scale_filter(level.height));
            }

            if !needs_scale && stream.codec_name.as_deref() == Some("h264") {
                args.push(format!("-c:v:{out}"));
                args.push("copy".into());
            } else {
                args.push(format!("-c:v:{out}"));
                args.push("libx264".into());
                args.push(format!("-crf:v:{out}"));
                args.push(level.crf.to_string());
                args.push(format!("-b:v:{out}"));
                args.push(format!("{}k", level.bitrate));
                args.push(format!("-maxrate:v:{out}"));
                args.push(format!("{}k", level.bitrate));
                args.push(format!("-bufsize:v:{out}"));
                args.push(format!("{}k", level.bitrate * 2));
            }
        }

        for (a, stream) in audio_streams.iter().enumerate() {
            args.push("-map".into());
            args.push(format!("0:a:{a}"));

            let out = i * audio_streams.len() + a;
            if stream.codec_name.as_deref() == Some("aac") {
                args.push(format!("-c:a:{out}"));
                args.push("copy".into());
            } else {
                args.push(format!("-c:a:{out}"));
                args.push("aac".into());
                args.push(format!("-b:a:{out}"));
                args.push(format!("{}k", level.audio_bitrate));
            }
        }
    }

    args.push("-f".into());
    args.push("hls".into());
    args.push("-hls_time".into());
    args.push(SEGMENT_SECONDS.to_string());
    args.push("-hls_playlist_type".into());
    args.push("event".into());
    args.push("-hls_flags".into());
    args.push("independent_segments".into());
    args.push("-hls_segment_type".into());
    args.push("mpegts".into());
    args.push("-start_number".into());
    args.push("0".into());
    args.push("-hls_list_size".into());
    args.push("0".into());
    args.push("-master_pl_name".into());
    args.push(MASTER_PLAYLIST.into());
    args.push("-hls_segment_filename".into());
    args.push(out_dir.join("output-%v-%04d.ts").display().to_string());
    args.push("-var_stream_map".into());
    args.push(build_stream_map(
        ladder,
        video_streams.len(),
        audio_streams.len(),
    ));
    args.push(out_dir.join("output-%v.m3u8").display().to_string());

    args
}

/// `v:0,a:0,name:480p v:1,a:1,name:720p ...`, with every mapped video and
/// audio stream of a rung grouped into that rung's variant.
fn build_stream_map(ladder: &[QualityLevel], video_count: usize, audio_count: usize) -> String {
    ladder
        .iter()
        .enumerate()
        .map(|(i, level)| {
            let mut entries: Vec<String> = (0..video_count)
                .map(|v| format!("v:{}", i * video_count + v))
                .collect();
            entries.extend((0..audio_count).map(|a| format!("a:{}", i * audio_count + a)));
            entries.push(format!("name:{}", level.variant_name()));
            entries.join(",")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Even-width scale preserving aspect ratio.
fn scale_filter(height: u32) -> String {
    format!("scale=-2:{height}")
}

static TIME_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").unwrap());

/// Seconds of media processed so far, from an encoder status line.
pub(crate) fn parse_progress_secs(line: &str) -> Option<f64> {
    let caps = TIME_FIELD.captures(line)?;
    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Non-comment file references in a playlist, in order.
fn playlist_references(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Replace temporary artifact names with persisted identities.
fn rewrite_playlist(text: &str, rename: &HashMap<String, String>) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            match rename.get(trimmed) {
                Some(new_name) if !trimmed.starts_with('#') => new_name.clone(),
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Import the finished rendition from the working directory: copy every
/// segment and playlist into the vault under a fresh identity and rewrite
/// playlist references accordingly.
async fn import_rendition(
    work_dir: &Path,
    duration_secs: f64,
    has_subtitles: bool,
    vault: &MediaVault,
    catalog: &dyn Catalog,
) -> Result<Stream> {
    let master_text = tokio::fs::read_to_string(work_dir.join(MASTER_PLAYLIST)).await?;

    let mut part_ids: Vec<StreamPartId> = Vec::new();
    let mut master_rename: HashMap<String, String> = HashMap::new();

    for variant_name in playlist_references(&master_text) {
        let variant_text = tokio::fs::read_to_string(work_dir.join(&variant_name)).await?;

        let mut segment_rename: HashMap<String, String> = HashMap::new();
        for segment_name in playlist_references(&variant_text) {
            let part = StreamPart::new_segment();
            tokio::fs::copy(work_dir.join(&segment_name), vault.stream_part_path(&part))
                .await?;
            catalog.save_stream_part(&part).await?;
            segment_rename.insert(segment_name, part.file_name());
            part_ids.push(part.id);
        }

        let mut playlist_part = StreamPart::new_playlist();
        playlist_part.has_subtitles = has_subtitles;
        let rewritten = rewrite_playlist(&variant_text, &segment_rename);
        tokio::fs::write(vault.stream_part_path(&playlist_part), rewritten).await?;
        catalog.save_stream_part(&playlist_part).await?;
        master_rename.insert(variant_name, playlist_part.file_name());
        part_ids.push(playlist_part.id);
    }

    let mut master_part = StreamPart::new_playlist();
    master_part.has_subtitles = has_subtitles;
    let rewritten_master = rewrite_playlist(&master_text, &master_rename);
    tokio::fs::write(vault.stream_part_path(&master_part), rewritten_master).await?;
    catalog.save_stream_part(&master_part).await?;
    part_ids.push(master_part.id);

    let stream = Stream::new(master_part.id, part_ids, duration_secs);
    catalog.save_stream(&stream).await?;
    Ok(stream)
}
