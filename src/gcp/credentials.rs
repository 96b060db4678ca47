use std::path::Path;

use serde::Deserialize;

use crate::error::PipelineError;

/// The fields of a service-account key file this tool actually reads.
/// The file contains more (private key material etc.); those stay on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    #[serde(default)]
    pub client_email: String,
}

impl ServiceAccountKey {
    /// Load and parse the key file. Any failure here (unset path, missing
    /// file, malformed JSON) is a credential error: the pipeline must not
    /// attempt an upload without one.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if path.as_os_str().is_empty() {
            return Err(PipelineError::MissingCredential(
                "credentials_path is not set".to_string(),
            ));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::MissingCredential(format!("{}: {}", path.display(), e))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&content).map_err(|e| {
            PipelineError::MissingCredential(format!("{}: {}", path.display(), e))
        })?;
        if key.project_id.is_empty() {
            return Err(PipelineError::MissingCredential(format!(
                "{}: no project_id in key file",
                path.display()
            )));
        }
        Ok(key)
    }
}
