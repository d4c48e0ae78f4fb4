//! Adaptive-bitrate quality ladder definitions.

use serde::{Deserialize, Serialize};

/// One rung of the adaptive-bitrate ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    /// Target frame height in pixels. Sources are never upscaled to reach it.
    pub height: u32,
    /// Video bitrate cap in kbit/s.
    pub bitrate: u32,
    /// Audio bitrate in kbit/s.
    pub audio_bitrate: u32,
    /// Constant rate factor for the encoder.
    pub crf: u32,
}

impl QualityLevel {
    /// Variant name used in stream maps and playlist file names, e.g. `720p`.
    pub fn variant_name(&self) -> String {
        format!("{}p", self.height)
    }
}

/// The stock ladder used when configuration does not override it.
pub fn default_ladder() -> Vec<QualityLevel> {
    vec![
        QualityLevel {
            height: 480,
            bitrate: 1500,
            audio_bitrate: 128,
            crf: 30,
        },
        QualityLevel {
            height: 720,
            bitrate: 3000,
            audio_bitrate: 160,
            crf: 25,
        },
        QualityLevel {
            height: 1080,
            bitrate: 4500,
            audio_bitrate: 192,
            crf: 23,
        },
    ]
}
