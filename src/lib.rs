pub mod audio;
pub mod cli;
pub mod config;
pub mod diarize;
pub mod engine;
pub mod error;
pub mod models;
pub mod progress;
pub mod runner;

pub use engine::{JobOutcome, Orchestrator, TranscriptionRequest};
pub use error::PipelineError;
pub use progress::{ProgressEvent, StatusSink};
