use std::path::Path;
use std::process::Command;

use crate::config::ConversionConfig;
use crate::error::PipelineError;

/// Media decode/re-encode capability. The pipeline only needs one
/// operation: turn arbitrary audio/video into the canonical waveform.
pub trait MediaConverter: Send {
    fn normalize(&self, input: &Path, output: &Path) -> Result<(), PipelineError>;
}

/// ffmpeg-backed converter. Strips any video stream and re-encodes the
/// audio as 16 kHz mono s16le PCM.
pub struct FfmpegConverter {
    ffmpeg_path: String,
    preset: String,
}

impl FfmpegConverter {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            preset: config.preset.clone(),
        }
    }
}

impl MediaConverter for FfmpegConverter {
    fn normalize(&self, input: &Path, output: &Path) -> Result<(), PipelineError> {
        let result = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg("-ar")
            .arg("16000")
            .arg("-ac")
            .arg("1")
            .arg("-c:a")
            .arg("pcm_s16le")
            .arg("-preset")
            .arg(&self.preset)
            .arg(output)
            .output();

        let output_info = match result {
            Ok(o) => o,
            Err(e) => {
                return Err(PipelineError::Conversion(format!(
                    "failed to run {}: {}",
                    self.ffmpeg_path, e
                )))
            }
        };

        if !output_info.status.success() {
            let stderr = String::from_utf8_lossy(&output_info.stderr);
            // Keep only the tail; ffmpeg errors end with the useful part.
            let tail: String = stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(PipelineError::Conversion(format!(
                "{} exited with {}: {}",
                self.ffmpeg_path, output_info.status, tail
            )));
        }

        Ok(())
    }
}
