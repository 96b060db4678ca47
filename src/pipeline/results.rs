use std::path::Path;

use url::Url;

use crate::error::PipelineError;
use crate::gcp::speech::BatchRecognizeResults;

/// Split a `gs://bucket/object` address into its bucket and object parts.
pub fn parse_gs_uri(uri: &str) -> Result<(String, String), PipelineError> {
    let parsed =
        Url::parse(uri).map_err(|e| PipelineError::MalformedOutputUri(format!("{}: {}", uri, e)))?;

    if parsed.scheme() != "gs" {
        return Err(PipelineError::MalformedOutputUri(format!(
            "{}: expected gs:// scheme",
            uri
        )));
    }

    let bucket = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            PipelineError::MalformedOutputUri(format!("{}: missing bucket", uri))
        })?;

    let object = parsed.path().trim_start_matches('/');
    if object.is_empty() {
        return Err(PipelineError::MalformedOutputUri(format!(
            "{}: missing object name",
            uri
        )));
    }

    Ok((bucket.to_string(), object.to_string()))
}

/// Parse a results document and join the top alternative of each segment,
/// in document order, one line per segment with a trailing newline.
pub fn assemble_transcript(bytes: &[u8]) -> Result<String, PipelineError> {
    let document: BatchRecognizeResults =
        serde_json::from_slice(bytes).map_err(|e| PipelineError::Parse(e.to_string()))?;

    let mut transcript = String::new();
    for (index, segment) in document.results.iter().enumerate() {
        // A segment with no alternatives means the document is broken,
        // not that the segment was silent.
        let top = segment.alternatives.first().ok_or_else(|| {
            PipelineError::Parse(format!("segment {} has no alternatives", index))
        })?;
        transcript.push_str(&top.transcript);
        transcript.push('\n');
    }

    Ok(transcript)
}

/// Write the transcript to `path`, replacing any existing file. The
/// content is materialized in full before this call; a failure here never
/// leaves the pipeline half-done elsewhere.
pub fn write_transcript(transcript: &str, path: &Path) -> Result<(), PipelineError> {
    std::fs::write(path, transcript)
        .map_err(|e| PipelineError::FileWrite(format!("{}: {}", path.display(), e)))
}
