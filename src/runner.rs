//! External recognition process execution.
//!
//! Builds the Whisper CLI invocation, streams its merged stdout/stderr
//! line-by-line through a [`StreamClassifier`] while the process runs, and
//! validates the resulting transcript before handing it to the caller.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::audio::AudioAsset;
use crate::error::PipelineError;
use crate::models::ModelCache;
use crate::progress::{ProgressEvent, StatusSink, StreamClassifier};

/// Module invoked as `<interpreter> -m whisper`.
const RECOGNITION_MODULE: &str = "whisper";
const OUTPUT_FORMAT: &str = "txt";

/// How many trailing output lines are retained for error reporting.
const OUTPUT_TAIL_LINES: usize = 40;

/// Paths produced by one recognition run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionArtifact {
    /// Where the engine wrote its output: `<stem>.txt` next to the audio.
    pub default_path: PathBuf,
    /// Model-qualified final path: `<stem>_<model>.txt`.
    pub final_path: PathBuf,
}

/// Engine output path before rename: `<stem>.txt` in the audio's directory.
pub fn default_output_path(audio: &Path) -> PathBuf {
    audio.with_extension("txt")
}

/// Final artifact path: `<stem>_<model>.txt` in the audio's directory. The
/// model name keeps repeated runs with different models from colliding.
pub fn final_output_path(audio: &Path, model: &str) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    audio.with_file_name(format!("{stem}_{model}.txt"))
}

/// Select the interpreter for the recognition process.
///
/// An explicit environment root is strict: if its interpreter binary is
/// missing the job fails instead of silently falling back to the default.
pub fn resolve_interpreter(
    env_root: Option<&Path>,
    default: &Path,
) -> Result<PathBuf, PipelineError> {
    match env_root {
        Some(root) => {
            let interpreter = if cfg!(windows) {
                root.join("Scripts").join("python.exe")
            } else {
                root.join("bin").join("python")
            };
            if interpreter.is_file() {
                Ok(interpreter)
            } else {
                Err(PipelineError::InterpreterNotFound {
                    env_root: root.to_path_buf(),
                    interpreter,
                })
            }
        }
        None => Ok(default.to_path_buf()),
    }
}

/// Runs the Whisper CLI over a normalized asset.
pub struct ProcessRunner {
    interpreter: PathBuf,
    cache: ModelCache,
}

impl ProcessRunner {
    pub fn new(interpreter: impl Into<PathBuf>, cache: ModelCache) -> Self {
        Self {
            interpreter: interpreter.into(),
            cache,
        }
    }

    /// Argument list for the recognition invocation. Language is passed only
    /// when the caller provided one; omission lets the engine auto-detect.
    pub fn build_args(&self, audio: &Path, model: &str, language: Option<&str>) -> Vec<String> {
        let output_dir = audio.parent().unwrap_or_else(|| Path::new("."));
        let mut args = vec![
            "-m".to_string(),
            RECOGNITION_MODULE.to_string(),
            audio.display().to_string(),
            "--model".to_string(),
            model.to_string(),
            "--model_dir".to_string(),
            self.cache.dir().display().to_string(),
            "--output_format".to_string(),
            OUTPUT_FORMAT.to_string(),
            "--output_dir".to_string(),
            output_dir.display().to_string(),
        ];
        if let Some(language) = language {
            args.push("--language".to_string());
            args.push(language.to_string());
        }
        args
    }

    /// Execute recognition and validate the artifact. The sink receives
    /// progress while the process is still producing output.
    pub async fn run(
        &self,
        asset: &AudioAsset,
        model: &str,
        language: Option<&str>,
        sink: &dyn StatusSink,
    ) -> Result<TranscriptionArtifact, PipelineError> {
        self.cache.ensure_dir()?;

        let args = self.build_args(asset.path(), model, language);
        debug!(
            interpreter = %self.interpreter.display(),
            ?args,
            "spawning recognition process"
        );

        let mut child = Command::new(&self.interpreter)
            .args(&args)
            .envs(self.cache.cache_env())
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::other("recognition process stdout not captured")
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            std::io::Error::other("recognition process stderr not captured")
        })?;

        // Merge both streams into one ordered line channel and classify
        // incrementally; blocking until exit would starve the sink.
        let (tx, mut rx) = mpsc::channel::<String>(64);
        tokio::spawn(pump_lines(stdout, tx.clone()));
        tokio::spawn(pump_lines(stderr, tx));

        let mut classifier = StreamClassifier::new(self.cache.weights_path(model));
        let mut tail: VecDeque<String> = VecDeque::with_capacity(OUTPUT_TAIL_LINES);
        while let Some(line) = rx.recv().await {
            if tail.len() == OUTPUT_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.clone());
            if let Some(event) = classifier.classify(&line) {
                sink.accept(&event);
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(PipelineError::ProcessExecution {
                status: status.to_string(),
                output: tail.into_iter().collect::<Vec<_>>().join("\n"),
            });
        }

        self.finalize(asset.path(), model, sink).await
    }

    /// Validate the engine's output and rename it to its final path.
    async fn finalize(
        &self,
        audio: &Path,
        model: &str,
        sink: &dyn StatusSink,
    ) -> Result<TranscriptionArtifact, PipelineError> {
        let default_path = default_output_path(audio);
        let final_path = final_output_path(audio, model);

        if !default_path.exists() {
            return Err(PipelineError::MissingOutput(default_path));
        }

        sink.accept(&ProgressEvent::Finalizing);
        tokio::fs::rename(&default_path, &final_path)
            .await
            .map_err(|source| PipelineError::OutputMove {
                from: default_path.clone(),
                to: final_path.clone(),
                source,
            })?;

        let size = tokio::fs::metadata(&final_path).await?.len();
        if size == 0 {
            return Err(PipelineError::EmptyOutput(final_path));
        }

        info!(path = %final_path.display(), size, "transcript written");
        sink.accept(&ProgressEvent::Finished);
        Ok(TranscriptionArtifact {
            default_path,
            final_path,
        })
    }
}

/// Forward every line of `reader` into the channel until EOF.
async fn pump_lines(reader: impl AsyncRead + Unpin + Send + 'static, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
