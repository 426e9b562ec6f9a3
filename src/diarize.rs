//! Speaker diarization post-processing.
//!
//! Re-processes the original audio with pyannote through a helper script run
//! in the selected interpreter, assigns a speaker label to every recognized
//! segment, and writes a `<speaker>: <text>` line per segment to a sibling
//! `_spk.txt` file. The already-produced transcript is only used to derive
//! that output filename, never read.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::PipelineError;

/// Modules the helper script needs, probed in order before any computation.
const REQUIRED_MODULES: &[&str] = &["torch", "pyannote.audio"];

/// Model size used for the internal recognition pass. Fixed small for speed;
/// diarization accuracy depends on pyannote, not on this pass.
const DIARIZATION_MODEL: &str = "base";

/// Label assigned to segments the diarization engine left unattributed.
const UNATTRIBUTED_SPEAKER: &str = "UNKNOWN";

/// Helper program handed to the interpreter via `-c`. Transcribes the audio,
/// diarizes it, matches each recognized segment to the speaker turn with the
/// largest time overlap, and prints one `speaker<TAB>text` line per segment
/// in the engine's temporal order. An empty speaker field means no turn
/// overlapped the segment.
const DIARIZE_PROGRAM: &str = r#"
import sys
import torch
import whisper
from pyannote.audio import Pipeline

audio, model_name = sys.argv[1], sys.argv[2]
device = "cuda" if torch.cuda.is_available() else "cpu"
model = whisper.load_model(model_name, device=device)
result = model.transcribe(audio)
pipeline = Pipeline.from_pretrained("pyannote/speaker-diarization")
if device == "cuda":
    pipeline.to(torch.device(device))
turns = [
    (turn.start, turn.end, speaker)
    for turn, _, speaker in pipeline(audio).itertracks(yield_label=True)
]
for segment in result["segments"]:
    best, best_overlap = "", 0.0
    for start, end, speaker in turns:
        overlap = min(end, segment["end"]) - max(start, segment["start"])
        if overlap > best_overlap:
            best, best_overlap = speaker, overlap
    sys.stdout.write("%s\t%s\n" % (best, segment["text"].strip()))
"#;

/// A speaker-labeled transcript derived from a transcription artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiarizedArtifact {
    pub path: PathBuf,
}

/// One recognized segment with its (possibly missing) speaker label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub speaker: Option<String>,
    pub text: String,
}

/// Derived output path: `<transcript_stem>_spk.txt` next to the transcript.
pub fn diarized_output_path(transcript: &Path) -> PathBuf {
    let stem = transcript
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    transcript.with_file_name(format!("{stem}_spk.txt"))
}

/// Parse one `speaker<TAB>text` line from the helper script. Lines without
/// the separator or without text are not segments.
pub fn parse_segment(line: &str) -> Option<Segment> {
    let (speaker, text) = line.split_once('\t')?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let speaker = match speaker.trim() {
        "" => None,
        s => Some(s.to_string()),
    };
    Some(Segment {
        speaker,
        text: text.to_string(),
    })
}

/// Render segments as the diarized file body, one `<speaker>: <text>` line
/// per segment in the given order. Unattributed segments keep a placeholder
/// label instead of being dropped.
pub fn render_segments(segments: &[Segment]) -> String {
    let mut body = String::new();
    for segment in segments {
        let speaker = segment.speaker.as_deref().unwrap_or(UNATTRIBUTED_SPEAKER);
        body.push_str(speaker);
        body.push_str(": ");
        body.push_str(&segment.text);
        body.push('\n');
    }
    body
}

/// Runs the diarization pass through an external interpreter.
pub struct Diarizer {
    interpreter: PathBuf,
}

impl Diarizer {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Verify the diarization engine and its runtime dependency import
    /// cleanly, naming the first module that does not. Runs before any
    /// computation so unavailability fails fast.
    pub async fn check_available(&self) -> Result<(), PipelineError> {
        for module in REQUIRED_MODULES {
            let output = Command::new(&self.interpreter)
                .arg("-c")
                .arg(format!("import {module}"))
                .stdin(Stdio::null())
                .output()
                .await?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = stderr
                    .lines()
                    .last()
                    .unwrap_or("import failed")
                    .trim()
                    .to_string();
                return Err(PipelineError::DiarizationUnavailable {
                    module: module.to_string(),
                    detail,
                });
            }
            debug!(module, "diarization dependency available");
        }
        Ok(())
    }

    /// Diarize `audio` and write the speaker-labeled variant next to
    /// `transcript`.
    pub async fn diarize(
        &self,
        audio: &Path,
        transcript: &Path,
    ) -> Result<DiarizedArtifact, PipelineError> {
        self.check_available().await?;

        let target = diarized_output_path(transcript);
        info!(
            audio = %audio.display(),
            output = %target.display(),
            "running speaker diarization"
        );

        let output = Command::new(&self.interpreter)
            .arg("-c")
            .arg(DIARIZE_PROGRAM)
            .arg(audio)
            .arg(DIARIZATION_MODEL)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(PipelineError::ProcessExecution {
                status: output.status.to_string(),
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let segments: Vec<Segment> = stdout.lines().filter_map(parse_segment).collect();

        tokio::fs::write(&target, render_segments(&segments)).await?;
        info!(segments = segments.len(), path = %target.display(), "diarized transcript written");
        Ok(DiarizedArtifact { path: target })
    }
}

#[cfg(test)]
#[path = "diarize_test.rs"]
mod tests;
