// Pipeline coordinator: convert -> stage -> submit -> poll -> fetch -> assemble.
//
// Runs on its own worker thread and reports over an mpsc channel, so the
// front-end (CLI today) stays responsive while the remote job grinds.
// Stages execute strictly in order; the first failure short-circuits the
// rest and becomes the run's single `Failed` event.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::Config;
use crate::error::PipelineError;
use crate::gcp::credentials::ServiceAccountKey;
use crate::gcp::speech::{
    BatchRecognizeRequest, BatchRecognizeResponse, OperationHandle, OperationStatus,
    SpeechClient,
};
use crate::gcp::storage::unique_object_name;
use crate::media;
use crate::pipeline::{results, PipelineDeps, PipelineEvent};

/// How often the poll loop re-checks the cancellation flag while sleeping.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Spawn a pipeline run on a worker thread. The returned receiver yields
/// the run's event sequence; the join handle resolves when the run is over.
pub fn spawn(
    input: PathBuf,
    output: Option<PathBuf>,
    config: Config,
    deps: PipelineDeps,
    cancel: Arc<AtomicBool>,
) -> (Receiver<PipelineEvent>, std::thread::JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel();
    let handle = std::thread::spawn(move || {
        run(&input, output.as_deref(), &config, &deps, &sender, &cancel);
    });
    (receiver, handle)
}

/// Execute one run on the calling thread, emitting events on `sender`.
pub fn run(
    input: &Path,
    output: Option<&Path>,
    config: &Config,
    deps: &PipelineDeps,
    sender: &Sender<PipelineEvent>,
    cancel: &AtomicBool,
) {
    match run_stages(input, output, config, deps, sender, cancel) {
        Ok(message) => {
            tracing::info!("{}", message);
            let _ = sender.send(PipelineEvent::Finished(message));
        }
        Err(e) => {
            tracing::error!("Pipeline failed: {}", e);
            let _ = sender.send(PipelineEvent::Failed(e));
        }
    }
}

fn run_stages(
    input: &Path,
    output: Option<&Path>,
    config: &Config,
    deps: &PipelineDeps,
    sender: &Sender<PipelineEvent>,
    cancel: &AtomicBool,
) -> Result<String, PipelineError> {
    let progress = |pct: u8| {
        let _ = sender.send(PipelineEvent::Progress(pct));
    };

    check_cancelled(cancel)?;
    progress(5);

    // Stage 1: normalize to 16 kHz mono PCM WAV.
    let wav_path = media::normalize(deps.converter.as_ref(), input)?;
    progress(33);

    check_cancelled(cancel)?;

    // Credentials and bucket configuration are verified before anything
    // leaves the machine.
    let key = ServiceAccountKey::load(&config.gcp.credentials_path)?;
    let project_id = if config.gcp.project_id.is_empty() {
        key.project_id.clone()
    } else {
        config.gcp.project_id.clone()
    };
    if config.buckets.input.is_empty() || config.buckets.output.is_empty() {
        return Err(PipelineError::MissingConfiguration(
            "input and output bucket names must be set".to_string(),
        ));
    }

    // Stage 2: stage the waveform under a collision-free key.
    let object_name = unique_object_name(&wav_path);
    let audio_uri = deps
        .store
        .upload(&wav_path, &config.buckets.input, &object_name)?;
    tracing::info!("Staged audio at {}", audio_uri);
    progress(40);

    // Fresh output object per run; prior runs' transcripts stay untouched.
    let output_uri = format!(
        "gs://{}/transcript-{}.json",
        config.buckets.output,
        Uuid::new_v4().simple()
    );
    progress(42);

    check_cancelled(cancel)?;

    // Stage 3: build and submit the batch recognize job.
    let request = BatchRecognizeRequest::new(
        &project_id,
        &config.recognition,
        &audio_uri,
        &output_uri,
    );
    progress(50);

    let handle = deps.speech.submit(&request)?;
    tracing::info!("Submitted batch recognize operation {}", handle.name);
    progress(55);

    // Stage 4: wait for the operation to reach a terminal state.
    let response = wait_for_completion(
        deps.speech.as_ref(),
        &handle,
        Duration::from_secs(config.recognition.timeout_secs),
        Duration::from_secs(config.recognition.poll_interval_secs),
        cancel,
    )?;
    progress(75);

    // Stage 5: locate, fetch, and assemble the results.
    let file_result = response
        .results
        .get(&audio_uri)
        .ok_or(PipelineError::NoResults)?;
    if let Some(err) = &file_result.error {
        return Err(PipelineError::JobFailed(err.message.clone()));
    }
    let result_uri = file_result.output_uri().ok_or(PipelineError::NoResults)?;

    let (bucket, object) = results::parse_gs_uri(result_uri)?;
    let bytes = deps.store.download(&bucket, &object)?;
    let transcript = results::assemble_transcript(&bytes)?;
    progress(90);

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| media::format::transcript_path(input));
    results::write_transcript(&transcript, &output_path)?;
    progress(100);

    // The temporary waveform is only removed on success; on failure it is
    // left in place for diagnosis.
    if let Err(e) = std::fs::remove_file(&wav_path) {
        tracing::warn!(
            "Failed to remove temporary file {}: {}",
            wav_path.display(),
            e
        );
    }

    Ok(format!("Transcription saved to {}", output_path.display()))
}

/// Poll the operation until it is done, it fails, the ceiling elapses, or
/// the run is cancelled. Sleeps only on the worker thread, in short slices
/// so cancellation is honored promptly.
fn wait_for_completion(
    speech: &dyn SpeechClient,
    handle: &OperationHandle,
    timeout: Duration,
    poll_interval: Duration,
    cancel: &AtomicBool,
) -> Result<BatchRecognizeResponse, PipelineError> {
    let deadline = Instant::now() + timeout;

    loop {
        check_cancelled(cancel)?;

        match speech.poll(handle)? {
            OperationStatus::Done(response) => return Ok(response),
            OperationStatus::Failed(detail) => {
                return Err(PipelineError::JobFailed(detail))
            }
            OperationStatus::Running => {
                tracing::debug!("Operation {} still running", handle.name);
            }
        }

        if Instant::now() >= deadline {
            return Err(PipelineError::JobTimeout(timeout.as_secs()));
        }

        let mut remaining = poll_interval.min(deadline.saturating_duration_since(Instant::now()));
        while !remaining.is_zero() {
            check_cancelled(cancel)?;
            let slice = remaining.min(CANCEL_CHECK_INTERVAL);
            std::thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
    }
}

fn check_cancelled(cancel: &AtomicBool) -> Result<(), PipelineError> {
    if cancel.load(Ordering::Relaxed) {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}
