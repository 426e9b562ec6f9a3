//! Command-line interface.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Config;
use crate::engine::{Orchestrator, TranscriptionRequest};
use crate::models::{KNOWN_MODELS, ModelCache};
use crate::progress::{ProgressEvent, StatusSink};

#[derive(Parser)]
#[command(name = "transcriptor")]
#[command(about = "Transcribe audio files with Whisper, optionally speaker-labeled")]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of ~/.config/transcriptor/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe an audio file to text
    Transcribe {
        /// Audio file to transcribe
        audio: PathBuf,
        /// Whisper model to use (tiny, base, small, medium, large)
        #[arg(short, long)]
        model: Option<String>,
        /// Language hint as an ISO code; omit to auto-detect
        #[arg(short, long)]
        language: Option<String>,
        /// Environment root whose interpreter runs the engine
        #[arg(long, value_name = "DIR")]
        env_root: Option<PathBuf>,
        /// Model weights cache directory
        #[arg(long, value_name = "DIR")]
        models_dir: Option<PathBuf>,
        /// Assign speaker labels after transcription
        #[arg(long)]
        diarize: bool,
    },
    /// List known and locally cached models
    Models {
        /// Delete the cached weights for a model
        #[arg(long, value_name = "NAME")]
        delete: Option<String>,
    },
}

/// Run the parsed command against the loaded configuration.
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Transcribe {
            audio,
            model,
            language,
            env_root,
            models_dir,
            diarize,
        } => {
            let mut config = config;
            if let Some(dir) = models_dir {
                config.runtime.models_dir = Some(dir);
            }
            if let Some(root) = env_root {
                config.runtime.env_root = Some(root);
            }

            let request = TranscriptionRequest {
                audio,
                model: model.unwrap_or_else(|| config.model.model.clone()),
                language: language.or_else(|| config.model.language.clone()),
                env_root: config.runtime.env_root.clone(),
                diarize,
            };

            let orchestrator = Orchestrator::new(&config)?;
            let sink = ConsoleSink::new();
            let outcome = orchestrator.run_job(&request, &sink).await?;
            sink.finish();
            println!("{}", outcome.final_path().display());
            Ok(())
        }
        Commands::Models { delete } => {
            let cache = match &config.runtime.models_dir {
                Some(dir) => ModelCache::with_dir(dir),
                None => ModelCache::new()?,
            };
            match delete {
                Some(name) => {
                    let removed = cache.delete_model(&name).with_context(|| {
                        format!("failed to delete cached model '{name}'")
                    })?;
                    if removed {
                        println!("deleted {name}");
                    } else {
                        println!("no cached weights for '{name}'");
                    }
                }
                None => {
                    let local = cache.local_models();
                    for (name, description) in KNOWN_MODELS {
                        let marker = if local.iter().any(|m| m == name) {
                            "[cached]"
                        } else {
                            "        "
                        };
                        println!("{marker} {name:<8} {description}");
                    }
                    for name in local
                        .iter()
                        .filter(|m| !KNOWN_MODELS.iter().any(|(k, _)| *k == m.as_str()))
                    {
                        println!("[cached] {name}");
                    }
                }
            }
            Ok(())
        }
    }
}

/// Status sink that renders progress on the terminal. Download percentages
/// drive an indicatif bar; everything else prints above it.
pub struct ConsoleSink {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    /// Tear down any live progress bar.
    pub fn finish(&self) {
        if let Ok(mut bar) = self.bar.lock()
            && let Some(bar) = bar.take()
        {
            bar.finish_and_clear();
        }
    }

    fn download_bar() -> ProgressBar {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("downloading model {bar:30} {pos}%")
                .expect("static progress template"),
        );
        bar
    }

    fn print(&self, message: &str) {
        match self.bar.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(bar) => bar.println(message),
                None => eprintln!("{message}"),
            },
            Err(_) => eprintln!("{message}"),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for ConsoleSink {
    fn accept(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Downloading { percent } => {
                if let Ok(mut guard) = self.bar.lock() {
                    let bar = guard.get_or_insert_with(Self::download_bar);
                    bar.set_position(u64::from(*percent));
                }
            }
            other => {
                self.finish();
                self.print(&other.to_string());
            }
        }
    }
}
