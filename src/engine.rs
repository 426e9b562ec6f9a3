//! Job orchestration.
//!
//! Sequences the pipeline stages for one transcription job:
//! `Idle → Normalizing → Transcribing → (Diarizing) → Completed`, with
//! `Failed` reachable from any non-terminal stage. Transitions are strictly
//! sequential and forward-only; the first stage failure terminates the job
//! and surfaces the originating error wrapped with stage context.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::audio::{AudioAsset, Normalizer};
use crate::config::Config;
use crate::diarize::{DiarizedArtifact, Diarizer};
use crate::error::PipelineError;
use crate::models::ModelCache;
use crate::progress::{ProgressEvent, StatusSink};
use crate::runner::{ProcessRunner, TranscriptionArtifact, resolve_interpreter};

/// Pipeline stage of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Normalizing,
    Transcribing,
    Diarizing,
    Completed,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Normalizing => "normalizing",
            Stage::Transcribing => "transcribing",
            Stage::Diarizing => "diarizing",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One transcription job. Constructed once; not mutated while running.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Audio file to transcribe.
    pub audio: PathBuf,
    /// Whisper model name, e.g. "base" or "small".
    pub model: String,
    /// Language hint (ISO code). `None` lets the engine auto-detect.
    pub language: Option<String>,
    /// Isolated environment root whose interpreter runs the engine. When set
    /// and its interpreter is missing, the job fails instead of falling back.
    pub env_root: Option<PathBuf>,
    /// Run the speaker diarization pass after transcription.
    pub diarize: bool,
}

impl TranscriptionRequest {
    /// Request with the given audio and model, no language hint, default
    /// interpreter, no diarization.
    pub fn new(audio: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            audio: audio.into(),
            model: model.into(),
            language: None,
            env_root: None,
            diarize: false,
        }
    }
}

/// What a completed job produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub transcript: TranscriptionArtifact,
    pub diarized: Option<DiarizedArtifact>,
}

impl JobOutcome {
    /// The artifact the caller should consume: the diarized transcript when
    /// diarization ran, otherwise the plain one.
    pub fn final_path(&self) -> &std::path::Path {
        match &self.diarized {
            Some(artifact) => &artifact.path,
            None => &self.transcript.final_path,
        }
    }
}

/// Coordinates normalization, recognition, and diarization for one job at a
/// time. Owns every artifact's lifecycle for the duration of a job; nothing
/// is retained across jobs.
pub struct Orchestrator {
    normalizer: Normalizer,
    cache: ModelCache,
    default_interpreter: PathBuf,
}

impl Orchestrator {
    /// Build an orchestrator from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let cache = match &config.runtime.models_dir {
            Some(dir) => ModelCache::with_dir(dir),
            None => ModelCache::new()?,
        };
        Ok(Self {
            normalizer: Normalizer::new(),
            cache,
            default_interpreter: config.runtime.interpreter.clone(),
        })
    }

    /// Build an orchestrator from explicit components, for tests and
    /// embedders that manage their own paths.
    pub fn with_components(
        normalizer: Normalizer,
        cache: ModelCache,
        default_interpreter: impl Into<PathBuf>,
    ) -> Self {
        Self {
            normalizer,
            cache,
            default_interpreter: default_interpreter.into(),
        }
    }

    /// Run one job to completion. Blocking stages execute in order; the sink
    /// receives progress throughout. Callers embedding this in an
    /// interactive application should run it on a dedicated worker.
    pub async fn run_job(
        &self,
        request: &TranscriptionRequest,
        sink: &dyn StatusSink,
    ) -> Result<JobOutcome> {
        let result = self.run_stages(request, sink).await;
        match &result {
            Ok(outcome) => {
                info!(stage = %Stage::Completed, artifact = %outcome.final_path().display(), "job finished");
            }
            Err(e) => {
                error!(stage = %Stage::Failed, error = %e, "job failed");
            }
        }
        result
    }

    async fn run_stages(
        &self,
        request: &TranscriptionRequest,
        sink: &dyn StatusSink,
    ) -> Result<JobOutcome> {
        let asset = AudioAsset::resolve(&request.audio)
            .with_context(|| format!("failed to resolve audio file {}", request.audio.display()))?;
        let interpreter =
            resolve_interpreter(request.env_root.as_deref(), &self.default_interpreter)
                .context("failed to select an interpreter for the recognition engine")?;

        info!(stage = %Stage::Normalizing, audio = %asset.path().display(), "job started");
        if !asset.is_recognizable() {
            sink.accept(&ProgressEvent::Converting);
        }
        let normalized = self
            .normalizer
            .normalize(&asset)
            .await
            .context("audio normalization failed")?;

        info!(stage = %Stage::Transcribing, model = %request.model);
        let runner = ProcessRunner::new(&interpreter, self.cache.clone());
        let transcript = runner
            .run(
                &normalized,
                &request.model,
                request.language.as_deref(),
                sink,
            )
            .await
            .context("transcription failed")?;

        let diarized = if request.diarize {
            info!(stage = %Stage::Diarizing);
            sink.accept(&ProgressEvent::Diarizing);
            let artifact = Diarizer::new(&interpreter)
                .diarize(asset.path(), &transcript.final_path)
                .await
                .context("speaker diarization failed")?;
            Some(artifact)
        } else {
            None
        };

        Ok(JobOutcome {
            transcript,
            diarized,
        })
    }
}

/// Convenience wrapper for callers that only need the typed pipeline error,
/// not stage context: downcast back out of the anyhow chain.
pub fn pipeline_error(err: &anyhow::Error) -> Option<&PipelineError> {
    err.downcast_ref::<PipelineError>()
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
