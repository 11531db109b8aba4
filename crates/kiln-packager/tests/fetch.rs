use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use kiln_packager::{
    BackendResponse, CacheAddress, DependencySet, FetchError, Method, PackagerBackend, PackagerClient, PackagerConfig,
    Phase, ProgressEvent, ProgressSink, RangeMap, DEFAULT_MAX_ATTEMPTS,
};
use parking_lot::Mutex;

const BUCKET: &str = "https://bucket.test";
const PACKAGER: &str = "https://packager.test/packages";
const REGISTRY: &str = "https://registry.test";
const MANIFEST: &str = r#"{"contents":{"/node_modules/react/index.js":{"content":"module.exports = {};"}},"dependencies":[{"name":"react","version":"18.2.0"}]}"#;

/// Bucket misses, the packager hands out a pointer, and the pointer answers
/// `building_polls` times with `building_status` before the manifest appears.
struct BuildingBackend {
    building_polls: u32,
    building_status: u16,
    polls: AtomicU32,
    calls: Mutex<Vec<(Method, String)>>,
}

impl BuildingBackend {
    fn new(building_polls: u32) -> Arc<Self> {
        Self::with_status(building_polls, 403)
    }

    fn with_status(building_polls: u32, building_status: u16) -> Arc<Self> {
        Arc::new(Self {
            building_polls,
            building_status,
            polls: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackagerBackend for BuildingBackend {
    async fn request(&self, method: Method, url: &str) -> Result<BackendResponse, FetchError> {
        self.calls.lock().push((method, url.to_string()));

        if url.starts_with(REGISTRY) {
            let body = r#"{"dist-tags":{"latest":"1.3.0"},"versions":{"1.2.0":{},"1.2.9":{},"1.3.0":{},"2.0.0":{}}}"#;
            return Ok(BackendResponse::new(200, body));
        }
        if url.starts_with(PACKAGER) {
            return Ok(BackendResponse::new(200, r#"{"url":"builds/abc.json"}"#));
        }
        if url.contains("/combinations/") {
            return Ok(BackendResponse::new(404, "").with_reason("Not Found"));
        }

        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if poll <= self.building_polls {
            Ok(BackendResponse::new(self.building_status, "").with_reason("Still Building"))
        } else {
            Ok(BackendResponse::new(200, MANIFEST))
        }
    }
}

#[derive(Default)]
struct RecordingProgress(Mutex<Vec<ProgressEvent>>);

impl ProgressSink for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.0.lock().push(event);
    }
}

fn config() -> PackagerConfig {
    PackagerConfig {
        bucket_url: BUCKET.to_string(),
        packager_url: PACKAGER.to_string(),
        registry_url: REGISTRY.to_string(),
        schema_version: 1,
    }
}

fn ranges(pairs: &[(&str, &str)]) -> RangeMap {
    pairs
        .iter()
        .map(|(name, range)| (name.to_string(), range.to_string()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_the_last_allowed_poll() {
    let backend = BuildingBackend::new(DEFAULT_MAX_ATTEMPTS - 1);
    let client = PackagerClient::with_backend(config(), backend.clone());

    let manifest = client.fetch(&ranges(&[("react", "18.2.0")])).await.unwrap().unwrap();

    assert_eq!(backend.polls(), DEFAULT_MAX_ATTEMPTS);
    assert_eq!(manifest.dependencies[0].name, "react");
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_attempts() {
    let backend = BuildingBackend::new(DEFAULT_MAX_ATTEMPTS + 1);
    let client = PackagerClient::with_backend(config(), backend.clone());

    let failure = client.fetch(&ranges(&[("react", "18.2.0")])).await.unwrap_err();

    assert_eq!(backend.polls(), DEFAULT_MAX_ATTEMPTS);
    assert_eq!(
        failure.inner(),
        &FetchError::Exhausted {
            attempts: DEFAULT_MAX_ATTEMPTS,
            last_error: "Still Building".into(),
        }
    );
    assert!(client.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn gateway_timeout_is_also_retried() {
    let backend = BuildingBackend::with_status(3, 504);
    let client = PackagerClient::with_backend(config(), backend.clone());

    assert!(client.fetch(&ranges(&[("react", "18.2.0")])).await.unwrap().is_some());
    assert_eq!(backend.polls(), 4);
}

#[tokio::test]
async fn empty_range_map_fetches_nothing() {
    let backend = BuildingBackend::new(0);
    let client = PackagerClient::with_backend(config(), backend.clone());

    assert!(client.fetch(&RangeMap::new()).await.unwrap().is_none());
    assert!(backend.calls.lock().is_empty());
}

#[tokio::test]
async fn hard_failure_aborts_with_backend_message() {
    struct FailingBackend(AtomicU32);

    #[async_trait]
    impl PackagerBackend for FailingBackend {
        async fn request(&self, method: Method, _url: &str) -> Result<BackendResponse, FetchError> {
            if method == Method::Post {
                return Ok(BackendResponse::new(200, r#"{"url":"builds/abc.json"}"#));
            }
            let calls = self.0.fetch_add(1, Ordering::SeqCst);
            if calls == 0 {
                // The bucket read
                return Ok(BackendResponse::new(404, ""));
            }
            Ok(BackendResponse::new(422, r#"{"error":"Could not find package left-pad@99.0.0"}"#))
        }
    }

    let backend = Arc::new(FailingBackend(AtomicU32::new(0)));
    let client = PackagerClient::with_backend(config(), backend.clone());

    let failure = client.fetch(&ranges(&[("left-pad", "99.0.0")])).await.unwrap_err();

    assert_eq!(backend.0.load(Ordering::SeqCst), 2);
    assert_eq!(
        failure.to_string(),
        "Could not fetch dependencies, please try again in a couple seconds: Could not find package left-pad@99.0.0"
    );
}

#[tokio::test]
async fn whitespace_in_ranges_resolves_to_the_same_set() {
    let backend = BuildingBackend::new(0);
    let client = PackagerClient::with_backend(config(), backend.clone());

    let first = client.fetch(&ranges(&[("lib", "^1.2.0 ")])).await.unwrap().unwrap();
    let second = client.fetch(&ranges(&[("lib", "^1.2.0")])).await.unwrap().unwrap();

    // The second fetch is served from memory
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(backend.polls(), 1);

    let set: DependencySet = [("lib", "1.3.0")].into_iter().collect();
    let address = CacheAddress::new(&set, 1);
    assert!(client.cache().get(&address).is_some());
    assert!(client.invalidate(&set));
}

#[tokio::test]
async fn progress_phases_follow_the_fetch() {
    let backend = BuildingBackend::new(0);
    let progress = Arc::new(RecordingProgress::default());
    let client = PackagerClient::with_backend(config(), backend)
        .with_progress(progress.clone())
        .with_full_screen(true);

    client.fetch(&ranges(&[("react", "18.2.0")])).await.unwrap();

    let phases: Vec<Phase> = progress.0.lock().iter().map(|event| event.phase).collect();
    assert_eq!(
        phases,
        vec![Phase::Downloading, Phase::Resolving, Phase::Downloading, Phase::Transpiling]
    );
    assert!(progress.0.lock().iter().all(|event| event.full_screen));
}

#[tokio::test]
async fn request_sequence_hits_bucket_then_packager() {
    let backend = BuildingBackend::new(0);
    let client = PackagerClient::with_backend(config(), backend.clone());

    client
        .fetch(&ranges(&[("react", "18.2.0"), ("@babel/runtime", "7.22.5")]))
        .await
        .unwrap();

    let calls = backend.calls.lock().clone();
    assert_eq!(
        calls,
        vec![
            (
                Method::Get,
                format!("{}/v1/combinations/babel-runtime@7.22.5%2Breact@18.2.0.json", BUCKET)
            ),
            (
                Method::Post,
                format!("{}/%40babel%2Fruntime%407.22.5+react%4018.2.0", PACKAGER)
            ),
            (Method::Get, format!("{}/builds/abc.json", BUCKET)),
        ]
    );
}
