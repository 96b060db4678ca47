pub mod credentials;
pub mod speech;
pub mod storage;

use crate::config::GcpConfig;
use crate::error::PipelineError;

/// Resolve the bearer token used for REST calls: config value first, then
/// the BATCHSCRIBE_ACCESS_TOKEN environment variable. Resolved once before
/// a run starts; pipeline stages never touch the environment.
pub fn resolve_access_token(config: &GcpConfig) -> Result<String, PipelineError> {
    if !config.access_token.is_empty() {
        return Ok(config.access_token.clone());
    }
    std::env::var("BATCHSCRIBE_ACCESS_TOKEN").map_err(|_| {
        PipelineError::MissingCredential(
            "no access token configured (set [gcp] access_token or BATCHSCRIBE_ACCESS_TOKEN)"
                .to_string(),
        )
    })
}
