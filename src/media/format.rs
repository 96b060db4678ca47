use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Recognized video container extensions.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "flv", "wmv"];

/// Recognized audio extensions.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "aac", "m4a"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

/// Classify an input path by its extension (case-insensitive).
pub fn classify(path: &Path) -> Result<MediaKind, PipelineError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Video)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(MediaKind::Audio)
    } else {
        Err(PipelineError::UnsupportedFormat(format!(".{}", ext)))
    }
}

/// Temporary waveform path derived from the input: `<base>_temp.wav`.
pub fn temp_wav_path(input: &Path) -> PathBuf {
    with_stem_suffix(input, "_temp.wav")
}

/// Final transcript path derived from the input: `<base>.txt`.
pub fn transcript_path(input: &Path) -> PathBuf {
    with_stem_suffix(input, ".txt")
}

fn with_stem_suffix(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", stem, suffix))
}
