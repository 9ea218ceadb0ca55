//! The Limoka service: one owner for the engine, banner resolver, history
//! and install pipeline, shared with the transport by `Arc`.

use std::sync::Arc;
use std::time::Duration;

use limoka_config::Config;
use limoka_storage::KvStore;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::banner::BannerResolver;
use crate::error::SearchResult;
use crate::fetcher::CatalogFetcher;
use crate::format::html_escape;
use crate::history::SearchHistory;
use crate::http::HttpClient;
use crate::index::{SearchEngine, SearchOptions};
use crate::install::{
    DirectiveChat, InboundMessage, InstallOutcome, InstallPipeline, PipelineTimings, TrustAnchor,
};
use crate::loader::PluginLoader;
use crate::nav::render::RenderSettings;
use crate::nav::{NavOutcome, Navigator, QueryMode, strings};

/// Search, navigation, history and signed installs over one catalog.
pub struct LimokaService {
    engine: Arc<SearchEngine>,
    fetcher: CatalogFetcher,
    navigator: Navigator,
    history: SearchHistory,
    http: Arc<dyn HttpClient>,
    base_url: String,
    timings: PipelineTimings,
    install_allowed: bool,
    refresh_interval: Option<Duration>,
    installer: Option<InstallPipeline>,
}

impl LimokaService {
    /// A service with an in-memory index.
    #[must_use]
    pub fn new(config: &Config, http: Arc<dyn HttpClient>, kv: Arc<dyn KvStore>) -> Self {
        Self::with_engine(
            config,
            http,
            kv,
            SearchEngine::new(SearchOptions::from(&config.search)),
        )
    }

    /// A service whose index persists to [`Config::index_path`]. A
    /// previously persisted snapshot is published immediately so search
    /// works before the first fetch.
    #[must_use]
    pub fn open(config: &Config, http: Arc<dyn HttpClient>, kv: Arc<dyn KvStore>) -> Self {
        let engine =
            SearchEngine::persistent(config.index_path(), SearchOptions::from(&config.search));
        if let Err(e) = engine.restore() {
            warn!(error = %e, "ignoring persisted index");
        }
        Self::with_engine(config, http, kv, engine)
    }

    fn with_engine(
        config: &Config,
        http: Arc<dyn HttpClient>,
        kv: Arc<dyn KvStore>,
        engine: SearchEngine,
    ) -> Self {
        let engine = Arc::new(engine);
        let banners = Arc::new(BannerResolver::new(
            Arc::clone(&http),
            Duration::from_secs(config.display.banner_timeout_secs),
            config.display.banner_cache_limit,
        ));
        Self {
            fetcher: CatalogFetcher::new(Arc::clone(&http), &config.catalog),
            navigator: Navigator::new(
                Arc::clone(&engine),
                banners,
                RenderSettings::from(config),
            ),
            engine,
            history: SearchHistory::new(kv, config.search.history_limit),
            http,
            base_url: config.catalog.base_url.clone(),
            timings: PipelineTimings::from(config),
            install_allowed: config.install.external_install_allowed,
            refresh_interval: Some(config.catalog.refresh_interval_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            installer: None,
        }
    }

    /// Enable the signed install watcher.
    #[must_use]
    pub fn with_installer(
        mut self,
        anchor: TrustAnchor,
        loader: Arc<dyn PluginLoader>,
        chat: Arc<dyn DirectiveChat>,
    ) -> Self {
        self.installer = Some(InstallPipeline::new(
            anchor,
            Arc::clone(&self.engine),
            Arc::clone(&self.http),
            loader,
            chat,
            self.base_url.clone(),
            self.timings,
            self.install_allowed,
        ));
        self
    }

    /// The search engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<SearchEngine> {
        &self.engine
    }

    /// How often the catalog should be refreshed, if at all.
    #[must_use]
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }

    /// Fetch the manifest and rebuild the index. The previous snapshot stays
    /// live when this fails.
    ///
    /// # Errors
    ///
    /// Returns the fetch, validation or index error.
    pub async fn refresh(&self) -> SearchResult<usize> {
        let catalog = self.fetcher.fetch().await?;
        let snapshot = self.engine.build(catalog).await?;
        Ok(snapshot.catalog().len())
    }

    /// Number of modules in the live catalog.
    #[must_use]
    pub fn catalog_size(&self) -> usize {
        self.engine.snapshot().catalog().len()
    }

    /// The idle start form.
    #[must_use]
    pub fn start(&self) -> NavOutcome {
        self.navigator.start()
    }

    /// "Searching…" placeholder shown while a top-level search runs.
    #[must_use]
    pub fn wait_text(&self, query: &str) -> String {
        let fact = strings::FACTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default();
        strings::WAIT
            .replace("{count}", &self.catalog_size().to_string())
            .replace("{query}", &html_escape(query))
            .replace("{fact}", fact)
    }

    /// Top-level search. A blank query shows the start form; a query with
    /// results is recorded in the user's history.
    pub async fn search(&self, user_id: i64, query: &str) -> NavOutcome {
        let opened = self.navigator.open(query).await;
        if opened.found
            && let Err(e) = self.history.push(user_id, query.trim()).await
        {
            warn!(user_id, error = %e, "failed to record search history");
        }
        opened.outcome
    }

    /// Free text typed in answer to a query prompt.
    pub async fn submit_query(&self, mode: QueryMode, text: &str) -> NavOutcome {
        self.navigator.submit(mode, text).await
    }

    /// A pressed control.
    pub async fn handle_callback(&self, payload: &str) -> NavOutcome {
        self.navigator.handle(payload).await
    }

    /// The history command: list, or `clear`.
    pub async fn history(&self, user_id: i64, arg: &str) -> String {
        let arg = arg.trim();
        if arg.eq_ignore_ascii_case("clear") {
            return match self.history.clear(user_id).await {
                Ok(()) => strings::HISTORY_CLEARED.to_owned(),
                Err(e) => {
                    warn!(user_id, error = %e, "failed to clear search history");
                    strings::HISTORY_UNAVAILABLE.to_owned()
                },
            };
        }
        if !arg.is_empty() {
            return strings::HISTORY_USAGE.to_owned();
        }

        match self.history.list(user_id).await {
            Ok(queries) if queries.is_empty() => strings::HISTORY_EMPTY.to_owned(),
            Ok(queries) => {
                let lines = queries
                    .iter()
                    .enumerate()
                    .map(|(i, q)| format!("{}. <code>{}</code>", i.saturating_add(1), html_escape(q)))
                    .collect::<Vec<_>>()
                    .join("\n");
                strings::HISTORY.replace("{history}", &lines)
            },
            Err(e) => {
                warn!(user_id, error = %e, "failed to read search history");
                strings::HISTORY_UNAVAILABLE.to_owned()
            },
        }
    }

    /// Feed a chat message to the install watcher.
    pub async fn handle_inbound(&self, message: &InboundMessage) -> InstallOutcome {
        match &self.installer {
            Some(pipeline) => pipeline.handle(message).await,
            None => InstallOutcome::Ignored,
        }
    }

    /// Flip the external install switch. Returns `false` when no installer
    /// is configured.
    pub fn set_external_install(&self, enabled: bool) -> bool {
        match &self.installer {
            Some(pipeline) => {
                pipeline.set_enabled(enabled);
                true
            },
            None => false,
        }
    }

    /// State of the external install switch, `None` without an installer.
    #[must_use]
    pub fn external_install_enabled(&self) -> Option<bool> {
        self.installer.as_ref().map(InstallPipeline::is_enabled)
    }

    /// Log the startup summary.
    pub fn log_summary(&self) {
        info!(
            modules = self.catalog_size(),
            fingerprint = %self.engine.snapshot().catalog().short_fingerprint(),
            installer = self.installer.is_some(),
            refresh_secs = self.refresh_interval.map(|d| d.as_secs()),
            "limoka service ready"
        );
    }
}
