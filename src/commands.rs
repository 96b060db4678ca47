use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::gcp::credentials::ServiceAccountKey;
use crate::gcp::speech::HttpSpeechClient;
use crate::gcp::storage::GcsClient;
use crate::media::convert::FfmpegConverter;
use crate::pipeline::{runner, PipelineDeps, PipelineEvent};

/// Run the transcription pipeline on one file, rendering its progress and
/// outcome. Ctrl-C flips the cancellation flag; the worker notices at the
/// next stage boundary or poll slice.
pub fn run_transcribe(
    config: Config,
    input: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let token = crate::gcp::resolve_access_token(&config.gcp)?;
    let deps = PipelineDeps {
        converter: Box::new(FfmpegConverter::new(&config.conversion)),
        store: Box::new(GcsClient::new(token.clone())?),
        speech: Box::new(HttpSpeechClient::new(token)?),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            tracing::warn!("Interrupt received, cancelling run");
            cancel.store(true, Ordering::Relaxed);
        })?;
    }

    let (events, worker) = runner::spawn(input, output, config, deps, cancel);

    let mut outcome: Result<()> = Ok(());
    for event in events {
        match event {
            PipelineEvent::Progress(pct) => {
                tracing::info!("Progress: {}%", pct);
            }
            PipelineEvent::Finished(message) => {
                println!("{}", message);
            }
            PipelineEvent::Failed(e) => {
                outcome = Err(e.into());
            }
        }
    }

    worker
        .join()
        .map_err(|_| anyhow::anyhow!("pipeline worker panicked"))?;
    outcome
}

/// Write a commented default config file to the platform config directory.
pub fn init_config(force: bool) -> Result<()> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("batchscribe");
    std::fs::create_dir_all(&config_dir)?;

    let path = config_dir.join("config.toml");
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    std::fs::write(&path, Config::generate_default_commented())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

/// Validate the resolved configuration without touching the network:
/// credentials file parses, a project id is known, buckets are set.
pub fn check(config: &Config) -> Result<()> {
    let key = ServiceAccountKey::load(&config.gcp.credentials_path)?;
    let project_id = if config.gcp.project_id.is_empty() {
        key.project_id.as_str()
    } else {
        config.gcp.project_id.as_str()
    };
    println!("Credentials OK (project: {})", project_id);

    check_bucket("input", &config.buckets.input)?;
    check_bucket("output", &config.buckets.output)?;
    println!(
        "Buckets OK (input: {}, output: {})",
        config.buckets.input, config.buckets.output
    );

    match crate::gcp::resolve_access_token(&config.gcp) {
        Ok(_) => println!("Access token configured"),
        Err(e) => println!("Warning: {}", e),
    }

    Ok(())
}

fn check_bucket(which: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("Missing {} bucket name in configuration", which);
    }
    Ok(())
}
