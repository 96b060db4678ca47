use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RecognitionConfig;
use crate::error::PipelineError;

/// One batch recognition job, fully specified. Built once per run; the
/// recognizer path goes in the request URL, everything else in the body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecognizeRequest {
    #[serde(skip)]
    pub recognizer: String,
    pub config: RecognitionRequestConfig,
    pub files: Vec<FileMetadata>,
    pub recognition_output_config: RecognitionOutputConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionRequestConfig {
    /// Empty object: let the service sniff the encoding.
    pub auto_decoding_config: AutoDetectDecodingConfig,
    pub language_codes: Vec<String>,
    pub model: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AutoDetectDecodingConfig {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub uri: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionOutputConfig {
    pub gcs_output_config: GcsOutputConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsOutputConfig {
    pub uri: String,
}

impl BatchRecognizeRequest {
    /// Assemble the fixed-per-run request: the default global recognizer
    /// for the project, auto decoding, one language, one model, one input
    /// file, results to the given GCS URI.
    pub fn new(
        project_id: &str,
        recognition: &RecognitionConfig,
        audio_uri: &str,
        output_uri: &str,
    ) -> Self {
        Self {
            recognizer: format!(
                "projects/{}/locations/global/recognizers/_",
                project_id
            ),
            config: RecognitionRequestConfig {
                auto_decoding_config: AutoDetectDecodingConfig::default(),
                language_codes: vec![recognition.language_code.clone()],
                model: recognition.model.clone(),
            },
            files: vec![FileMetadata {
                uri: audio_uri.to_string(),
            }],
            recognition_output_config: RecognitionOutputConfig {
                gcs_output_config: GcsOutputConfig {
                    uri: output_uri.to_string(),
                },
            },
        }
    }
}

/// Handle to a submitted long-running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub name: String,
}

/// Snapshot of a long-running operation: still running, done with a
/// response, or terminally failed with the remote-reported detail.
#[derive(Debug, Clone)]
pub enum OperationStatus {
    Running,
    Done(BatchRecognizeResponse),
    Failed(String),
}

/// Per-file result map keyed by the input audio URI. Unknown fields in the
/// service response are ignored for forward compatibility.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecognizeResponse {
    #[serde(default)]
    pub results: HashMap<String, BatchRecognizeFileResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecognizeFileResult {
    /// Where the service wrote this file's results document.
    #[serde(default)]
    pub uri: Option<String>,
    /// Newer schema nests the output location here instead.
    #[serde(default)]
    pub cloud_storage_result: Option<CloudStorageResult>,
    #[serde(default)]
    pub error: Option<RpcStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudStorageResult {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl BatchRecognizeFileResult {
    /// The results-document URI, wherever the schema put it.
    pub fn output_uri(&self) -> Option<&str> {
        self.uri
            .as_deref()
            .or_else(|| self.cloud_storage_result.as_ref()?.uri.as_deref())
    }
}

/// The results document the service writes to the output bucket: an ordered
/// list of segments, each carrying ranked alternatives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecognizeResults {
    #[serde(default)]
    pub results: Vec<SpeechRecognitionResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<SpeechRecognitionAlternative>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecognitionAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Async recognition capability: submit once, poll until terminal.
pub trait SpeechClient: Send + Sync {
    fn submit(
        &self,
        request: &BatchRecognizeRequest,
    ) -> Result<OperationHandle, PipelineError>;

    fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, PipelineError>;
}

// --- REST wire types for the operations endpoint ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<RpcStatus>,
    #[serde(default)]
    response: Option<BatchRecognizeResponse>,
}

const SPEECH_ENDPOINT: &str = "https://speech.googleapis.com/v2";

/// Speech-to-Text v2 REST client with a bearer token.
pub struct HttpSpeechClient {
    client: reqwest::blocking::Client,
    token: String,
    endpoint: String,
}

impl HttpSpeechClient {
    pub fn new(token: String) -> Result<Self, PipelineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PipelineError::Submission(e.to_string()))?;
        Ok(Self {
            client,
            token,
            endpoint: SPEECH_ENDPOINT.to_string(),
        })
    }
}

impl SpeechClient for HttpSpeechClient {
    fn submit(
        &self,
        request: &BatchRecognizeRequest,
    ) -> Result<OperationHandle, PipelineError> {
        let url = format!(
            "{}/{}:batchRecognize",
            self.endpoint, request.recognizer
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .map_err(|e| PipelineError::Submission(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::Submission(format!(
                "{} returned {}: {}",
                request.recognizer, status, body
            )));
        }

        let operation: Operation = response
            .json()
            .map_err(|e| PipelineError::Submission(e.to_string()))?;
        Ok(OperationHandle {
            name: operation.name,
        })
    }

    fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, PipelineError> {
        let url = format!("{}/{}", self.endpoint, handle.name);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| PipelineError::JobFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::JobFailed(format!(
                "polling {} returned {}: {}",
                handle.name, status, body
            )));
        }

        let operation: Operation = response
            .json()
            .map_err(|e| PipelineError::JobFailed(e.to_string()))?;

        if let Some(err) = operation.error {
            return Ok(OperationStatus::Failed(err.message));
        }
        if operation.done {
            return Ok(OperationStatus::Done(
                operation.response.unwrap_or_default(),
            ));
        }
        Ok(OperationStatus::Running)
    }
}
