//! Local Whisper model cache.
//!
//! The recognition engine downloads model weights on first use; this module
//! pins that download location to a job-independent local directory so
//! repeated runs reuse weights, and exposes what is cached for the CLI.

use std::path::{Path, PathBuf};

use anyhow::Result;

/// Model sizes the Whisper CLI ships with, and what they trade off.
/// Anything else found in the cache directory is listed as-is.
pub const KNOWN_MODELS: &[(&str, &str)] = &[
    ("tiny", "fastest, lowest accuracy (~39 MB)"),
    ("base", "fast, medium accuracy (~74 MB)"),
    ("small", "balanced speed and accuracy (~244 MB)"),
    ("medium", "high accuracy, slower (~769 MB)"),
    ("large", "best accuracy, slowest (~1.5 GB)"),
];

/// Manages the local model weights directory.
#[derive(Debug, Clone)]
pub struct ModelCache {
    dir: PathBuf,
}

impl ModelCache {
    /// Create a cache rooted at the default models directory,
    /// `~/.local/share/transcriptor/models/`.
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: crate::config::Config::models_dir()?,
        })
    }

    /// Create a cache rooted at a custom directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if it does not exist yet.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Where the engine stores the weights for `model`: `<dir>/<model>.pt`.
    pub fn weights_path(&self, model: &str) -> PathBuf {
        self.dir.join(format!("{model}.pt"))
    }

    /// Environment variables pinning the engine's download cache to this
    /// directory. Two aliases cover both cache-resolution conventions the
    /// underlying library understands.
    pub fn cache_env(&self) -> [(&'static str, &Path); 2] {
        [
            ("WHISPER_CACHE_DIR", self.dir.as_path()),
            ("XDG_CACHE_HOME", self.dir.as_path()),
        ]
    }

    /// Names of models whose weights are present locally, sorted.
    pub fn local_models(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "pt") {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        names
    }

    /// Remove a cached model's weights. Returns `Ok(false)` when no weights
    /// for that name exist.
    pub fn delete_model(&self, name: &str) -> std::io::Result<bool> {
        let path = self.weights_path(name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
