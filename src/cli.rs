use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "batchscribe",
    version,
    about = "Batch audio/video transcription via Google Cloud Speech-to-Text v2"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe one audio or video file
    Transcribe {
        /// Input media file
        input: PathBuf,

        /// Transcript destination (default: input path with .txt extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured recognition language code
        #[arg(long)]
        language: Option<String>,
    },

    /// Write a commented default config file
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Validate credentials and bucket configuration without submitting
    Check,
}
