use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gcp: GcpConfig,
    pub buckets: BucketsConfig,
    pub recognition: RecognitionConfig,
    pub conversion: ConversionConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpConfig {
    /// Path to the service-account JSON key file.
    pub credentials_path: PathBuf,
    /// GCP project id. Empty = read from the credentials file.
    pub project_id: String,
    /// OAuth bearer token for REST calls (or set BATCHSCRIBE_ACCESS_TOKEN).
    pub access_token: String,
}

impl fmt::Debug for GcpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpConfig")
            .field("credentials_path", &self.credentials_path)
            .field("project_id", &self.project_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketsConfig {
    /// Bucket the normalized audio is uploaded to.
    pub input: String,
    /// Bucket the service writes transcription results to.
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub language_code: String,
    pub model: String,
    /// Seconds between polls of the long-running operation.
    pub poll_interval_secs: u64,
    /// Ceiling on total wait for the job to reach a terminal state.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// ffmpeg executable (name on PATH or absolute path).
    pub ffmpeg_path: String,
    /// Encoder preset. The WAV is transient, so favor speed.
    pub preset: String,
}

// --- Default implementations ---

impl Default for Config {
    fn default() -> Self {
        Self {
            gcp: GcpConfig::default(),
            buckets: BucketsConfig::default(),
            recognition: RecognitionConfig::default(),
            conversion: ConversionConfig::default(),
        }
    }
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::new(),
            project_id: String::new(),
            access_token: String::new(),
        }
    }
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: String::new(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language_code: "id-ID".to_string(),
            model: "long".to_string(),
            poll_interval_secs: 5,
            timeout_secs: 3600,
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            preset: "ultrafast".to_string(),
        }
    }
}

// --- Config loading ---

impl Config {
    /// Load config and return the resolved file path (if any).
    pub fn load_with_path(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        // 1. Check explicit path
        if let Some(p) = path {
            let content = std::fs::read_to_string(p).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", p.display(), e)
            })?;
            let config: Config = toml::from_str(&content)?;
            return Ok((config, Some(p.to_path_buf())));
        }

        // 2. Check beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let beside_exe = exe_path.parent().map(|p| p.join("batchscribe.toml"));
            if let Some(p) = beside_exe {
                if p.exists() {
                    let content = std::fs::read_to_string(&p)?;
                    let config: Config = toml::from_str(&content)?;
                    return Ok((config, Some(p)));
                }
            }
        }

        // 3. Check platform config directory (e.g. ~/.config/batchscribe/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_config = config_dir.join("batchscribe").join("config.toml");
            if platform_config.exists() {
                let content = std::fs::read_to_string(&platform_config)?;
                let config: Config = toml::from_str(&content)?;
                return Ok((config, Some(platform_config)));
            }
        }

        // 4. Fall back to defaults
        tracing::info!("No config file found, using defaults");
        Ok((Config::default(), None))
    }

    /// Load config (without tracking the resolved path).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_path(path).map(|(config, _)| config)
    }

    /// Generate a default config file with all fields and inline documentation.
    pub fn generate_default_commented() -> String {
        r#"# batchscribe configuration
# Edit this file to point at your GCP project and buckets.

[gcp]
# Path to the service-account JSON key file.
credentials_path = ""
# GCP project id. Leave empty to read it from the credentials file.
project_id = ""
# OAuth bearer token for REST calls (or set BATCHSCRIBE_ACCESS_TOKEN).
# access_token = ""

[buckets]
# Cloud Storage bucket the converted audio is uploaded to.
input = ""
# Cloud Storage bucket the service writes transcription results to.
output = ""

[recognition]
# BCP-47 language code for recognition.
language_code = "id-ID"
# Recognition model name.
model = "long"
# Seconds between polls of the transcription operation.
poll_interval_secs = 5
# Give up waiting for the job after this many seconds.
timeout_secs = 3600

[conversion]
# ffmpeg executable (name on PATH or absolute path).
ffmpeg_path = "ffmpeg"
# Encoder preset passed to ffmpeg. The intermediate WAV is transient,
# so the fastest preset is the default.
preset = "ultrafast"
"#
        .to_string()
    }
}
