//! Editor configuration, loadable from JSON.
//!
//! Every field has a default, so a partial document such as `{"face_expansion": 1.5}` is valid.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::detect::ChromaKeyDetector;
use crate::foundation::error::{SemanticError, SemanticResult};

/// Settings shared by every operation of a [`crate::SemanticImage`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Growth factor applied around a detected face before cropping.
    pub face_expansion: f64,
    /// Inward crop of the blurred background, as a fraction of each axis.
    pub blur_inset_fraction: f64,
    /// Gaussian sigma used when a caller does not pick one.
    pub default_blur_intensity: f32,
    /// Video encoder settings.
    pub encoder: EncoderConfig,
    /// Audio decode layout.
    pub audio: AudioConfig,
    /// Key-colour segmentation used by the command-line front end.
    pub chroma_key: ChromaKeyDetector,
    /// Directory for video outputs; the system temp dir when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            face_expansion: 2.0,
            blur_inset_fraction: crate::effects::composite::BLUR_INSET_FRACTION,
            default_blur_intensity: 10.0,
            encoder: EncoderConfig::default(),
            audio: AudioConfig::default(),
            chroma_key: ChromaKeyDetector::default(),
            output_dir: None,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> SemanticResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| SemanticError::validation(format!("invalid config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse, and validate a JSON file.
    pub fn from_json_path(path: &Path) -> SemanticResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Check every field is in range.
    pub fn validate(&self) -> SemanticResult<()> {
        if !(self.face_expansion.is_finite() && self.face_expansion >= 1.0) {
            return Err(SemanticError::validation("face_expansion must be finite and >= 1"));
        }
        if !(self.blur_inset_fraction.is_finite() && (0.0..0.5).contains(&self.blur_inset_fraction)) {
            return Err(SemanticError::validation(
                "blur_inset_fraction must be in [0, 0.5)",
            ));
        }
        if !(self.default_blur_intensity.is_finite() && self.default_blur_intensity >= 0.0) {
            return Err(SemanticError::validation(
                "default_blur_intensity must be finite and >= 0",
            ));
        }
        self.encoder.validate()?;
        self.audio.validate()?;
        self.chroma_key.validate()?;
        Ok(())
    }

    /// Directory video outputs are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// H.264/AAC encoder settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// x264 constant rate factor, `0..=51`.
    pub crf: u8,
    /// x264 preset name.
    pub preset: String,
    /// AAC bitrate in kbit/s.
    pub audio_bitrate_k: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            crf: 18,
            preset: "fast".to_owned(),
            audio_bitrate_k: 128,
        }
    }
}

impl EncoderConfig {
    /// Check the settings are usable by ffmpeg.
    pub fn validate(&self) -> SemanticResult<()> {
        const PRESETS: [&str; 10] = [
            "ultrafast",
            "superfast",
            "veryfast",
            "faster",
            "fast",
            "medium",
            "slow",
            "slower",
            "veryslow",
            "placebo",
        ];
        if self.crf > 51 {
            return Err(SemanticError::validation("encoder crf must be in 0..=51"));
        }
        if !PRESETS.contains(&self.preset.as_str()) {
            return Err(SemanticError::validation(format!(
                "unknown encoder preset '{}'",
                self.preset
            )));
        }
        if self.audio_bitrate_k == 0 {
            return Err(SemanticError::validation("audio bitrate must be > 0"));
        }
        Ok(())
    }
}

/// Layout audio is decoded into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Sample frames per block handed to the audio lane.
    pub block_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            block_frames: 1024,
        }
    }
}

impl AudioConfig {
    /// Reject zero values.
    pub fn validate(&self) -> SemanticResult<()> {
        if self.sample_rate == 0 || self.channels == 0 || self.block_frames == 0 {
            return Err(SemanticError::validation(
                "audio sample_rate, channels, and block_frames must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
