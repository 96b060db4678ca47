use std::path::Path;
use std::time::Duration;

use uuid::Uuid;

use crate::error::PipelineError;

/// Object store capability: stage local files and fetch result objects.
pub trait ObjectStore: Send + Sync {
    /// Upload `local` to `bucket` under `object`. Returns the full
    /// `gs://bucket/object` address.
    fn upload(&self, local: &Path, bucket: &str, object: &str)
        -> Result<String, PipelineError>;

    /// Download an object's raw bytes.
    fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, PipelineError>;
}

/// Object key for a staged file: `<basename>-<uuid4 hex>.wav`. The random
/// suffix guarantees concurrent or repeated runs never collide.
pub fn unique_object_name(local: &Path) -> String {
    let base = local
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    format!("{}-{}.wav", base, Uuid::new_v4().simple())
}

/// GCS client over the JSON/XML REST APIs with a bearer token.
pub struct GcsClient {
    client: reqwest::blocking::Client,
    token: String,
}

impl GcsClient {
    pub fn new(token: String) -> Result<Self, PipelineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| PipelineError::Staging(e.to_string()))?;
        Ok(Self { client, token })
    }
}

impl ObjectStore for GcsClient {
    fn upload(
        &self,
        local: &Path,
        bucket: &str,
        object: &str,
    ) -> Result<String, PipelineError> {
        let bytes = std::fs::read(local)
            .map_err(|e| PipelineError::Staging(format!("{}: {}", local.display(), e)))?;

        let url = format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o",
            bucket
        );
        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", object)])
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(bytes)
            .send()
            .map_err(|e| PipelineError::Staging(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::Staging(format!(
                "upload to gs://{}/{} failed with {}: {}",
                bucket, object, status, truncate(&body, 300)
            )));
        }

        Ok(format!("gs://{}/{}", bucket, object))
    }

    fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, PipelineError> {
        let url = format!("https://storage.googleapis.com/{}/{}", bucket, object);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| PipelineError::Download(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::Download(format!(
                "gs://{}/{} returned {}: {}",
                bucket, object, status, truncate(&body, 300)
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| PipelineError::Download(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
