pub mod convert;
pub mod format;

use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use convert::MediaConverter;
use format::MediaKind;

/// Normalize an input media file to a 16 kHz mono PCM WAV at the derived
/// temporary path. Classifies the extension first, so unsupported inputs
/// fail before any file is created.
pub fn normalize(
    converter: &dyn MediaConverter,
    input: &Path,
) -> Result<PathBuf, PipelineError> {
    let kind = format::classify(input)?;
    let output = format::temp_wav_path(input);
    tracing::info!(
        "Normalizing {} ({}) -> {}",
        input.display(),
        match kind {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        },
        output.display()
    );

    if let Err(e) = converter.normalize(input, &output) {
        // Never leave a half-written waveform behind.
        remove_partial(&output);
        return Err(e);
    }

    if let Err(e) = verify_waveform(&output) {
        remove_partial(&output);
        return Err(e);
    }

    Ok(output)
}

/// Reject converter output that is not the canonical 16 kHz mono shape.
/// Catches a converter that exits cleanly but wrote the wrong format.
fn verify_waveform(path: &Path) -> Result<(), PipelineError> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| PipelineError::Conversion(format!("invalid WAV output: {}", e)))?;
    let spec = reader.spec();
    if spec.sample_rate != 16000 || spec.channels != 1 {
        return Err(PipelineError::Conversion(format!(
            "converter produced {} Hz / {} channel audio, expected 16000 Hz mono",
            spec.sample_rate, spec.channels
        )));
    }
    Ok(())
}

fn remove_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove partial file {}: {}", path.display(), e);
        }
    }
}
