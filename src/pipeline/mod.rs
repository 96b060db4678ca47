pub mod results;
pub mod runner;

use crate::error::PipelineError;
use crate::gcp::speech::SpeechClient;
use crate::gcp::storage::ObjectStore;
use crate::media::convert::MediaConverter;

/// Events emitted by a pipeline run, in order: zero or more `Progress`
/// ticks (monotonically increasing), then exactly one of `Finished` or
/// `Failed`.
#[derive(Debug)]
pub enum PipelineEvent {
    Progress(u8),
    Finished(String),
    Failed(PipelineError),
}

/// The external capabilities a run needs. Production code wires the
/// ffmpeg/GCS/Speech implementations; tests substitute mocks.
pub struct PipelineDeps {
    pub converter: Box<dyn MediaConverter>,
    pub store: Box<dyn ObjectStore>,
    pub speech: Box<dyn SpeechClient>,
}
