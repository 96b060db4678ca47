// End-to-end pipeline runs against mock capabilities: no ffmpeg, no
// network, no GCP. The mocks record what the pipeline asked of them so the
// tests can assert ordering and short-circuit behavior.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use batchscribe::config::Config;
use batchscribe::error::PipelineError;
use batchscribe::gcp::speech::{
    BatchRecognizeRequest, OperationHandle, OperationStatus, SpeechClient,
};
use batchscribe::gcp::storage::ObjectStore;
use batchscribe::media::convert::MediaConverter;
use batchscribe::pipeline::{runner, PipelineDeps, PipelineEvent};

/// Writes a minimal valid 16 kHz mono WAV wherever asked.
struct WavConverter;

impl MediaConverter for WavConverter {
    fn normalize(&self, _input: &Path, output: &Path) -> Result<(), PipelineError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(output, spec)
            .map_err(|e| PipelineError::Conversion(e.to_string()))?;
        for _ in 0..160 {
            writer
                .write_sample(0i16)
                .map_err(|e| PipelineError::Conversion(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| PipelineError::Conversion(e.to_string()))?;
        Ok(())
    }
}

/// Records uploads/downloads and serves a canned results document.
#[derive(Default)]
struct RecordingStore {
    uploads: Mutex<Vec<String>>,
    downloads: Mutex<Vec<String>>,
    document: Vec<u8>,
}

impl ObjectStore for RecordingStore {
    fn upload(
        &self,
        _local: &Path,
        bucket: &str,
        object: &str,
    ) -> Result<String, PipelineError> {
        self.uploads.lock().unwrap().push(object.to_string());
        Ok(format!("gs://{}/{}", bucket, object))
    }

    fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, PipelineError> {
        self.downloads
            .lock()
            .unwrap()
            .push(format!("{}/{}", bucket, object));
        Ok(self.document.clone())
    }
}

/// Completes immediately, reporting `result_uri` for whatever input URI
/// the pipeline submitted.
#[derive(Default)]
struct InstantSpeech {
    submitted_uri: Mutex<Option<String>>,
    result_uri: String,
}

impl SpeechClient for InstantSpeech {
    fn submit(
        &self,
        request: &BatchRecognizeRequest,
    ) -> Result<OperationHandle, PipelineError> {
        *self.submitted_uri.lock().unwrap() = Some(request.files[0].uri.clone());
        Ok(OperationHandle {
            name: "projects/test-project/operations/op-1".to_string(),
        })
    }

    fn poll(&self, _handle: &OperationHandle) -> Result<OperationStatus, PipelineError> {
        let audio_uri = self
            .submitted_uri
            .lock()
            .unwrap()
            .clone()
            .expect("poll before submit");
        let response = serde_json::from_value(serde_json::json!({
            "results": { audio_uri: { "uri": self.result_uri } }
        }))
        .unwrap();
        Ok(OperationStatus::Done(response))
    }
}

/// Orphan-rule workaround: the trait and `Arc` are both foreign to this
/// test crate, so a mock shared between the test and the pipeline is
/// wrapped in a local newtype that forwards the capability traits.
struct Shared<T>(Arc<T>);

impl<T: ObjectStore> ObjectStore for Shared<T> {
    fn upload(
        &self,
        local: &Path,
        bucket: &str,
        object: &str,
    ) -> Result<String, PipelineError> {
        self.0.upload(local, bucket, object)
    }

    fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, PipelineError> {
        self.0.download(bucket, object)
    }
}

impl<T: SpeechClient> SpeechClient for Shared<T> {
    fn submit(
        &self,
        request: &BatchRecognizeRequest,
    ) -> Result<OperationHandle, PipelineError> {
        self.0.submit(request)
    }

    fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, PipelineError> {
        self.0.poll(handle)
    }
}

/// Never reaches a terminal state.
struct NeverDoneSpeech;

impl SpeechClient for NeverDoneSpeech {
    fn submit(
        &self,
        _request: &BatchRecognizeRequest,
    ) -> Result<OperationHandle, PipelineError> {
        Ok(OperationHandle {
            name: "projects/test-project/operations/op-stuck".to_string(),
        })
    }

    fn poll(&self, _handle: &OperationHandle) -> Result<OperationStatus, PipelineError> {
        Ok(OperationStatus::Running)
    }
}

fn test_config(tmp: &TempDir) -> Config {
    let key_path = tmp.path().join("key.json");
    std::fs::write(
        &key_path,
        r#"{"type": "service_account", "project_id": "test-project"}"#,
    )
    .unwrap();

    let mut config = Config::default();
    config.gcp.credentials_path = key_path;
    config.buckets.input = "in".to_string();
    config.buckets.output = "out".to_string();
    config.recognition.poll_interval_secs = 0;
    config
}

fn write_input(tmp: &TempDir, name: &str) -> PathBuf {
    let input = tmp.path().join(name);
    std::fs::write(&input, b"fake media").unwrap();
    input
}

/// Run the pipeline on the current thread and collect its full event
/// sequence.
fn run_collect(
    input: &Path,
    config: &Config,
    deps: &PipelineDeps,
) -> Vec<PipelineEvent> {
    let (sender, receiver) = mpsc::channel();
    let cancel = AtomicBool::new(false);
    runner::run(input, None, config, deps, &sender, &cancel);
    drop(sender);
    receiver.iter().collect()
}

fn progress_ticks(events: &[PipelineEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

#[test]
fn test_end_to_end_success() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let input = write_input(&tmp, "sample.mp3");

    let store = Arc::new(RecordingStore {
        document: br#"{"results": [{"alternatives": [{"transcript": "test transcript"}]}]}"#
            .to_vec(),
        ..Default::default()
    });
    let speech = Arc::new(InstantSpeech {
        result_uri: "gs://out/transcript-result.json".to_string(),
        ..Default::default()
    });
    let deps = PipelineDeps {
        converter: Box::new(WavConverter),
        store: Box::new(Shared(store.clone())),
        speech: Box::new(Shared(speech.clone())),
    };

    let events = run_collect(&input, &config, &deps);

    // The fixed tick sequence, then a success message.
    assert_eq!(progress_ticks(&events), vec![5, 33, 40, 42, 50, 55, 75, 90, 100]);
    match events.last().unwrap() {
        PipelineEvent::Finished(message) => {
            assert!(message.contains("sample.txt"), "message: {}", message);
        }
        other => panic!("Expected Finished, got {:?}", other),
    }

    // Transcript content is exactly the joined top alternatives.
    let transcript = std::fs::read_to_string(tmp.path().join("sample.txt")).unwrap();
    assert_eq!(transcript, "test transcript\n");

    // Temp waveform removed on success.
    assert!(!tmp.path().join("sample_temp.wav").exists());

    // One staged object, derived from the temp waveform name.
    let uploads = store.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].starts_with("sample_temp.wav-"));
    assert!(uploads[0].ends_with(".wav"));

    // The results document was fetched from the reported address.
    assert_eq!(
        store.downloads.lock().unwrap().as_slice(),
        ["out/transcript-result.json"]
    );
}

#[test]
fn test_missing_credential_fails_before_staging() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.gcp.credentials_path = tmp.path().join("absent.json");
    let input = write_input(&tmp, "sample.mp3");

    let store = Arc::new(RecordingStore::default());
    let deps = PipelineDeps {
        converter: Box::new(WavConverter),
        store: Box::new(Shared(store.clone())),
        speech: Box::new(NeverDoneSpeech),
    };

    let events = run_collect(&input, &config, &deps);

    match events.last().unwrap() {
        PipelineEvent::Failed(PipelineError::MissingCredential(_)) => {}
        other => panic!("Expected MissingCredential, got {:?}", other),
    }
    assert!(
        store.uploads.lock().unwrap().is_empty(),
        "stager must never be invoked without credentials"
    );
    // Conversion already happened; the temp file stays for diagnosis.
    assert!(tmp.path().join("sample_temp.wav").exists());
}

#[test]
fn test_unsupported_extension_fails_immediately() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let input = write_input(&tmp, "notes.pdf");

    let store = Arc::new(RecordingStore::default());
    let deps = PipelineDeps {
        converter: Box::new(WavConverter),
        store: Box::new(Shared(store.clone())),
        speech: Box::new(NeverDoneSpeech),
    };

    let events = run_collect(&input, &config, &deps);

    assert_eq!(progress_ticks(&events), vec![5]);
    match events.last().unwrap() {
        PipelineEvent::Failed(PipelineError::UnsupportedFormat(_)) => {}
        other => panic!("Expected UnsupportedFormat, got {:?}", other),
    }
    assert!(!tmp.path().join("notes_temp.wav").exists());
}

#[test]
fn test_timeout_does_not_block_the_caller() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.recognition.timeout_secs = 1;
    config.recognition.poll_interval_secs = 1;
    let input = write_input(&tmp, "sample.mp3");

    let deps = PipelineDeps {
        converter: Box::new(WavConverter),
        store: Box::new(Shared(Arc::new(RecordingStore::default()))),
        speech: Box::new(NeverDoneSpeech),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let (events, worker) = runner::spawn(input, None, config, deps, cancel);

    // The caller keeps receiving progress while the job is stuck; the run
    // ends with a timeout instead of hanging.
    let mut ticks = Vec::new();
    let mut outcome = None;
    loop {
        match events.recv_timeout(Duration::from_secs(30)).unwrap() {
            PipelineEvent::Progress(p) => ticks.push(p),
            terminal => {
                outcome = Some(terminal);
                break;
            }
        }
    }
    worker.join().unwrap();

    assert_eq!(ticks, vec![5, 33, 40, 42, 50, 55]);
    match outcome.unwrap() {
        PipelineEvent::Failed(PipelineError::JobTimeout(secs)) => assert_eq!(secs, 1),
        other => panic!("Expected JobTimeout, got {:?}", other),
    }
}

#[test]
fn test_staged_object_names_are_unique_across_runs() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let input = write_input(&tmp, "sample.mp3");

    let store = Arc::new(RecordingStore {
        document: br#"{"results": []}"#.to_vec(),
        ..Default::default()
    });

    for _ in 0..2 {
        let speech = Arc::new(InstantSpeech {
            result_uri: "gs://out/transcript-result.json".to_string(),
            ..Default::default()
        });
        let deps = PipelineDeps {
            converter: Box::new(WavConverter),
            store: Box::new(Shared(store.clone())),
            speech: Box::new(Shared(speech)),
        };
        let events = run_collect(&input, &config, &deps);
        assert!(matches!(events.last().unwrap(), PipelineEvent::Finished(_)));
    }

    let uploads = store.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 2);
    assert_ne!(uploads[0], uploads[1], "staged keys must never repeat");
}

#[test]
fn test_job_succeeded_with_no_results_entry() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let input = write_input(&tmp, "sample.mp3");

    // Done, but the per-file result map is empty.
    struct EmptySpeech;
    impl SpeechClient for EmptySpeech {
        fn submit(
            &self,
            _request: &BatchRecognizeRequest,
        ) -> Result<OperationHandle, PipelineError> {
            Ok(OperationHandle {
                name: "projects/test-project/operations/op-2".to_string(),
            })
        }
        fn poll(
            &self,
            _handle: &OperationHandle,
        ) -> Result<OperationStatus, PipelineError> {
            Ok(OperationStatus::Done(Default::default()))
        }
    }

    let store = Arc::new(RecordingStore::default());
    let deps = PipelineDeps {
        converter: Box::new(WavConverter),
        store: Box::new(Shared(store.clone())),
        speech: Box::new(EmptySpeech),
    };

    let events = run_collect(&input, &config, &deps);
    match events.last().unwrap() {
        PipelineEvent::Failed(PipelineError::NoResults) => {}
        other => panic!("Expected NoResults, got {:?}", other),
    }
    assert!(store.downloads.lock().unwrap().is_empty());
}

#[test]
fn test_malformed_output_uri_skips_download() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let input = write_input(&tmp, "sample.mp3");

    let store = Arc::new(RecordingStore::default());
    let speech = Arc::new(InstantSpeech {
        result_uri: "not-a-gs-uri".to_string(),
        ..Default::default()
    });
    let deps = PipelineDeps {
        converter: Box::new(WavConverter),
        store: Box::new(Shared(store.clone())),
        speech: Box::new(Shared(speech)),
    };

    let events = run_collect(&input, &config, &deps);
    match events.last().unwrap() {
        PipelineEvent::Failed(PipelineError::MalformedOutputUri(_)) => {}
        other => panic!("Expected MalformedOutputUri, got {:?}", other),
    }
    assert!(
        store.downloads.lock().unwrap().is_empty(),
        "no download may be attempted for an unparseable address"
    );
}

#[test]
fn test_cancelled_run_stops_at_first_boundary() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let input = write_input(&tmp, "sample.mp3");

    let store = Arc::new(RecordingStore::default());
    let deps = PipelineDeps {
        converter: Box::new(WavConverter),
        store: Box::new(Shared(store.clone())),
        speech: Box::new(NeverDoneSpeech),
    };

    let (sender, receiver) = mpsc::channel();
    let cancel = AtomicBool::new(true);
    runner::run(&input, None, &config, &deps, &sender, &cancel);
    drop(sender);

    let events: Vec<PipelineEvent> = receiver.iter().collect();
    match events.last().unwrap() {
        PipelineEvent::Failed(PipelineError::Cancelled) => {}
        other => panic!("Expected Cancelled, got {:?}", other),
    }
    assert!(store.uploads.lock().unwrap().is_empty());
}

#[test]
fn test_progress_is_monotonic_in_all_scenarios() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let input = write_input(&tmp, "sample.m4a");

    let store = Arc::new(RecordingStore {
        document: br#"{"results": [{"alternatives": [{"transcript": "hello"}]}, {"alternatives": [{"transcript": "world"}]}]}"#.to_vec(),
        ..Default::default()
    });
    let speech = Arc::new(InstantSpeech {
        result_uri: "gs://out/transcript-result.json".to_string(),
        ..Default::default()
    });
    let deps = PipelineDeps {
        converter: Box::new(WavConverter),
        store: Box::new(Shared(store.clone())),
        speech: Box::new(Shared(speech)),
    };

    let events = run_collect(&input, &config, &deps);
    let ticks = progress_ticks(&events);
    assert!(ticks.windows(2).all(|w| w[0] < w[1]), "ticks: {:?}", ticks);

    let transcript = std::fs::read_to_string(tmp.path().join("sample.txt")).unwrap();
    assert_eq!(transcript, "hello\nworld\n");
}
