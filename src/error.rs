use thiserror::Error;

/// Every way a pipeline run can fail. One variant per stage-level failure
/// so callers (and tests) can match on the exact condition instead of
/// string-scraping.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input extension is not in the recognized audio or video sets.
    #[error("Unsupported file type '{0}'. Please select a valid audio or video file.")]
    UnsupportedFormat(String),

    /// The media decode/re-encode step failed.
    #[error("Audio conversion failed: {0}")]
    Conversion(String),

    /// Service-account credentials file is absent or unreadable.
    #[error("Missing or invalid GCP credentials: {0}")]
    MissingCredential(String),

    /// A required configuration value (bucket name, project id) is empty.
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    /// Upload of the normalized audio to the input bucket failed.
    #[error("Failed to upload audio to input bucket: {0}")]
    Staging(String),

    /// The batch recognize request was rejected on submission.
    #[error("Batch recognize submission rejected: {0}")]
    Submission(String),

    /// The job did not reach a terminal state within the ceiling.
    #[error("Transcription job did not complete within {0} seconds")]
    JobTimeout(u64),

    /// The remote job reached a terminal failure state.
    #[error("Transcription job failed: {0}")]
    JobFailed(String),

    /// The job finished but reported nothing for the submitted input.
    #[error("No results found for the input file.")]
    NoResults,

    /// The reported output address does not look like gs://bucket/object.
    #[error("Failed to parse output URI: {0}")]
    MalformedOutputUri(String),

    /// Fetching the results object failed.
    #[error("Failed to download results: {0}")]
    Download(String),

    /// The results document is not a well-formed recognition response.
    #[error("Failed to parse results document: {0}")]
    Parse(String),

    /// Writing the final transcript text file failed.
    #[error("Failed to write transcript file: {0}")]
    FileWrite(String),

    /// The run was cancelled before reaching a terminal state.
    #[error("Transcription cancelled")]
    Cancelled,
}
