//! Progress reporting and live output classification.
//!
//! The recognition engine's merged output stream carries three kinds of
//! lines: model-download progress, a benign hardware-precision warning, and
//! free-form log text. [`StreamClassifier`] turns them into
//! [`ProgressEvent`]s as they arrive, so callers see feedback while the
//! process is still running.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use regex::Regex;
use tracing::debug;

/// A single progress update, consumed by a [`StatusSink`] and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Free-text engine output forwarded verbatim.
    Log(String),
    /// Model weights download progress, 0–100.
    Downloading { percent: u8 },
    /// The audio is being converted to the engine's native format.
    Converting,
    /// Recognition proper has started.
    Transcribing,
    /// The output artifact is being validated and renamed.
    Finalizing,
    /// Speaker labels are being assigned to the transcript.
    Diarizing,
    /// The job finished and the artifact passed validation.
    Finished,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Log(line) => f.write_str(line),
            ProgressEvent::Downloading { percent } => {
                write!(f, "downloading model {percent}%")
            }
            ProgressEvent::Converting => f.write_str("converting audio"),
            ProgressEvent::Transcribing => f.write_str("transcribing"),
            ProgressEvent::Finalizing => f.write_str("finalizing transcript"),
            ProgressEvent::Diarizing => f.write_str("assigning speakers"),
            ProgressEvent::Finished => f.write_str("transcription finished"),
        }
    }
}

/// Consumer of progress updates.
///
/// Implementations are called from whatever stage is currently executing and
/// must contain their own failures; nothing they do can fail the job.
pub trait StatusSink: Send + Sync {
    /// Accept one progress update.
    fn accept(&self, event: &ProgressEvent);
}

/// Sink that discards everything.
pub struct NullSink;

impl StatusSink for NullSink {
    fn accept(&self, _event: &ProgressEvent) {}
}

/// Sink that records every event, for tests and batch callers.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl StatusSink for RecordingSink {
    fn accept(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Warning whisper prints when falling back from FP16 on CPU. Harmless, so
/// it is kept out of user-facing status and only logged.
const PRECISION_FALLBACK_WARNING: &str = "FP16 is not supported on CPU; using FP32 instead";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Downloading,
    Transcribing,
}

/// Classifies raw engine output lines into [`ProgressEvent`]s.
///
/// Starts in the download phase, where `NN%` matches become download
/// progress. Once the model weights file appears on disk the classifier
/// flips to the transcribing phase and percentages pass through as plain
/// log lines. Download progress is monotonically non-decreasing; regressed
/// percentages are dropped.
pub struct StreamClassifier {
    weights_path: PathBuf,
    phase: Phase,
    last_percent: u8,
    percent: Regex,
}

impl StreamClassifier {
    /// Create a classifier watching for `weights_path` to appear.
    pub fn new(weights_path: impl Into<PathBuf>) -> Self {
        Self {
            weights_path: weights_path.into(),
            phase: Phase::Downloading,
            last_percent: 0,
            percent: Regex::new(r"(\d{1,3})%").expect("static percent pattern"),
        }
    }

    /// Classify one output line. `None` means the line produces no
    /// user-facing event.
    pub fn classify(&mut self, line: &str) -> Option<ProgressEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if line.contains(PRECISION_FALLBACK_WARNING) {
            debug!(line, "suppressed precision fallback warning");
            return None;
        }

        if self.phase == Phase::Downloading {
            if self.weights_path.exists() {
                self.phase = Phase::Transcribing;
                return Some(ProgressEvent::Transcribing);
            }
            if let Some(captures) = self.percent.captures(line) {
                let percent = captures[1].parse::<u32>().unwrap_or(0).min(100) as u8;
                if percent < self.last_percent {
                    return None;
                }
                self.last_percent = percent;
                return Some(ProgressEvent::Downloading { percent });
            }
        }

        Some(ProgressEvent::Log(line.to_string()))
    }
}

#[cfg(test)]
#[path = "progress_test.rs"]
mod tests;
