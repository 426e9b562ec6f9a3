//! Audio format normalization.
//!
//! The recognition engine consumes 16 kHz mono wav. Anything else is
//! converted through ffmpeg into a sibling `.wav` file; an existing file at
//! the target path is treated as a valid cached conversion and reused
//! without re-invoking the encoder.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::PipelineError;

/// File extension the recognition engine consumes without conversion.
pub const NATIVE_EXTENSION: &str = "wav";

/// Sample rate normalized audio is resampled to.
pub const SAMPLE_RATE: u32 = 16_000;

const CHANNELS: u32 = 1;
const DEFAULT_ENCODER: &str = "ffmpeg";

/// An audio file resolved at job start. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    path: PathBuf,
    extension: String,
    recognizable: bool,
}

impl AudioAsset {
    /// Resolve an asset from a path. The path is made absolute so every
    /// derived artifact lands next to the audio regardless of the working
    /// directory.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = std::path::absolute(path)?;
        let extension = path
            .extension()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let recognizable = extension == NATIVE_EXTENSION;
        Ok(Self {
            path,
            extension,
            recognizable,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether the engine accepts this file without conversion.
    pub fn is_recognizable(&self) -> bool {
        self.recognizable
    }
}

/// Converts audio into the engine's native format via an external encoder.
pub struct Normalizer {
    encoder: PathBuf,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            encoder: PathBuf::from(DEFAULT_ENCODER),
        }
    }

    /// Use a specific encoder executable instead of `ffmpeg` from PATH.
    pub fn with_encoder(encoder: impl Into<PathBuf>) -> Self {
        Self {
            encoder: encoder.into(),
        }
    }

    /// Ensure `asset` is in the engine's native format, converting if
    /// necessary. Writes at most one new file next to the input.
    pub async fn normalize(&self, asset: &AudioAsset) -> Result<AudioAsset, PipelineError> {
        if asset.is_recognizable() {
            return Ok(asset.clone());
        }

        let target = asset.path().with_extension(NATIVE_EXTENSION);
        if target.exists() {
            debug!(path = %target.display(), "reusing previously converted audio");
            return AudioAsset::resolve(target);
        }

        // Locate the encoder before touching anything on disk.
        let encoder = which::which(&self.encoder)
            .map_err(|_| PipelineError::EncoderUnavailable(self.encoder.display().to_string()))?;

        info!(
            input = %asset.path().display(),
            output = %target.display(),
            "converting audio to 16 kHz mono wav"
        );

        // -y overwrites any partial file a failed prior attempt left behind.
        let output = Command::new(&encoder)
            .arg("-y")
            .arg("-i")
            .arg(asset.path())
            .arg("-ar")
            .arg(SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg(CHANNELS.to_string())
            .arg(&target)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                output.status.to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(PipelineError::Conversion {
                input: asset.path().to_path_buf(),
                detail,
            });
        }

        AudioAsset::resolve(target)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "audio_test.rs"]
mod tests;
