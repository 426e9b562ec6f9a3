//! Error taxonomy for the transcription pipeline.
//!
//! Every variant is terminal for the current job; nothing is retried. Each
//! carries enough context (offending path, captured process output, missing
//! dependency name) to render an actionable message on its own.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate a transcription job.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The external audio encoder is not reachable on the search path.
    /// Checked before any conversion is attempted.
    #[error("audio encoder '{0}' not found on PATH; install ffmpeg to convert non-wav audio")]
    EncoderUnavailable(String),

    /// The encoder ran but exited with a non-zero status.
    #[error("audio conversion of {input} failed: {detail}")]
    Conversion { input: PathBuf, detail: String },

    /// An explicit environment root was given but holds no interpreter.
    /// No silent fallback happens in this branch.
    #[error("no interpreter at {interpreter} (environment root {env_root})")]
    InterpreterNotFound {
        env_root: PathBuf,
        interpreter: PathBuf,
    },

    /// The recognition process exited with a non-zero status. `output` holds
    /// the tail of its merged stdout/stderr stream.
    #[error("recognition process failed ({status}): {output}")]
    ProcessExecution { status: String, output: String },

    /// The engine exited cleanly but its expected output file is absent.
    #[error("expected transcript not found: {0}")]
    MissingOutput(PathBuf),

    /// Renaming the engine output to its final path failed.
    #[error("failed to move transcript {from} to {to}: {source}")]
    OutputMove {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The renamed transcript exists but has zero bytes.
    #[error("transcript {0} is empty")]
    EmptyOutput(PathBuf),

    /// The diarization engine or its runtime dependency cannot be imported
    /// by the selected interpreter.
    #[error("diarization unavailable: '{module}' cannot be imported ({detail})")]
    DiarizationUnavailable { module: String, detail: String },

    /// Spawning or reading an external process failed at the I/O level.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
