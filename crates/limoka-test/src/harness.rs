//! A fully wired service over scripted seams.

use std::sync::Arc;

use limoka_config::Config;
use limoka_search::{HttpResponse, LimokaService};
use limoka_storage::JsonFileKvStore;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use crate::fixtures::{PING_BANNER, PING_SOURCE, SAMPLE_MANIFEST, TEST_BASE_URL, TestPublisher};
use crate::mocks::{MockHttpClient, MockPluginLoader, RecordingChat};

/// Install a test-writer subscriber honouring `RUST_LOG`. Safe to call more
/// than once.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config pointing at [`TEST_BASE_URL`] with all state under `data_dir`.
#[must_use]
pub fn test_config(data_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.catalog.base_url = TEST_BASE_URL.to_owned();
    config.storage.data_dir = Some(data_dir.display().to_string());
    config.install.error_grace_secs = 0;
    config
}

/// A service with the sample catalog loaded, a recording chat and loader,
/// and a trusted [`TestPublisher`].
///
/// Owns a `TempDir` holding the persisted index and per-user state; it is
/// removed when the harness is dropped.
pub struct TestHarness {
    /// The service under test.
    pub service: Arc<LimokaService>,
    /// Scripted network.
    pub http: MockHttpClient,
    /// Recording plugin loader.
    pub loader: MockPluginLoader,
    /// Recording chat transport.
    pub chat: RecordingChat,
    /// Trusted publisher.
    pub publisher: TestPublisher,
    /// Config the service was built from.
    pub config: Config,
    dir: TempDir,
}

impl TestHarness {
    /// Build the harness and load the sample catalog.
    ///
    /// # Panics
    ///
    /// Panics if the temp dir or state file cannot be created, or the
    /// sample catalog fails to load.
    pub async fn new() -> Self {
        init_test_logging();
        let dir = TempDir::new().expect("failed to create tempdir");
        let config = test_config(dir.path());

        let http = MockHttpClient::new()
            .with_body(config.catalog.manifest_url(), SAMPLE_MANIFEST.as_bytes().to_vec())
            .with_body(format!("{TEST_BASE_URL}tools/ping.py"), PING_SOURCE.to_vec())
            .with_response(
                PING_BANNER,
                HttpResponse::ok(Vec::new()).with_content_type("image/png"),
            );
        let loader = MockPluginLoader::new();
        let chat = RecordingChat::new();
        let publisher = TestPublisher::new();

        let service = build_service(&config, &http, &loader, &chat, &publisher);
        let modules = service
            .refresh()
            .await
            .expect("sample catalog failed to load");
        assert_eq!(modules, crate::fixtures::SAMPLE_PATHS.len());

        Self {
            service: Arc::new(service),
            http,
            loader,
            chat,
            publisher,
            config,
            dir,
        }
    }

    /// A new persistent service over the same data directory and mocks, as
    /// after a process restart. Nothing is fetched.
    ///
    /// # Panics
    ///
    /// Panics if the state file cannot be opened.
    #[must_use]
    pub fn open_service(&self) -> LimokaService {
        build_service(
            &self.config,
            &self.http,
            &self.loader,
            &self.chat,
            &self.publisher,
        )
    }

    /// Data directory of this harness.
    #[must_use]
    pub fn data_dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}

fn build_service(
    config: &Config,
    http: &MockHttpClient,
    loader: &MockPluginLoader,
    chat: &RecordingChat,
    publisher: &TestPublisher,
) -> LimokaService {
    let kv = JsonFileKvStore::open(config.kv_path()).expect("failed to open state file");
    LimokaService::open(config, Arc::new(http.clone()), Arc::new(kv)).with_installer(
        publisher.anchor(),
        Arc::new(loader.clone()),
        Arc::new(chat.clone()),
    )
}
