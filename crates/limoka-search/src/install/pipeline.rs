//! The install watcher.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use limoka_config::Config;
use limoka_crypto::InstallVerifier;
use tracing::{debug, error, info, warn};

use crate::error::{DirectiveError, HttpError};
use crate::format::{html_escape, take_chars};
use crate::http::HttpClient;
use crate::index::SearchEngine;
use crate::install::directive::{self, InstallDirective};
use crate::install::{DirectiveChat, InboundMessage, InstallOutcome, TrustAnchor};
use crate::loader::PluginLoader;

const INVALID_FORMAT: &str = "❌ Invalid format. Expected: #limoka:path:signature";
const SIGNATURE_INVALID: &str = "❌ Signature invalid! Installation aborted.";
const LOADER_UNAVAILABLE: &str = "❌ Loader unavailable.";
const MODULE_NOT_FOUND: &str = "❌ Module not found in Limoka database: <code>{path}</code>";
const CRITICAL: &str = "❌ Critical error: {error}";
const CRITICAL_ERROR_CHARS: usize = 100;

/// Timeouts of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTimings {
    /// Plugin download timeout.
    pub download: Duration,
    /// Delay before deleting the message after a critical error.
    pub error_grace: Duration,
}

impl From<&Config> for PipelineTimings {
    fn from(config: &Config) -> Self {
        Self {
            download: Duration::from_secs(config.install.download_timeout_secs),
            error_grace: Duration::from_secs(config.install.error_grace_secs),
        }
    }
}

/// Verifies and executes signed install directives.
pub struct InstallPipeline {
    anchor: TrustAnchor,
    verifier: InstallVerifier,
    engine: Arc<SearchEngine>,
    http: Arc<dyn HttpClient>,
    loader: Arc<dyn PluginLoader>,
    chat: Arc<dyn DirectiveChat>,
    base_url: String,
    timings: PipelineTimings,
    enabled: AtomicBool,
}

impl InstallPipeline {
    /// Create a pipeline resolving paths against `engine`'s live catalog and
    /// downloading from `base_url`.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        anchor: TrustAnchor,
        engine: Arc<SearchEngine>,
        http: Arc<dyn HttpClient>,
        loader: Arc<dyn PluginLoader>,
        chat: Arc<dyn DirectiveChat>,
        base_url: impl Into<String>,
        timings: PipelineTimings,
        enabled: bool,
    ) -> Self {
        Self {
            verifier: InstallVerifier::new(anchor.public_key),
            anchor,
            engine,
            http,
            loader,
            chat,
            base_url: base_url.into(),
            timings,
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Whether directives are honoured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn directive handling on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        info!(enabled, "external installs switched");
    }

    /// The trusted publisher.
    #[must_use]
    pub fn anchor(&self) -> &TrustAnchor {
        &self.anchor
    }

    /// Handle one inbound message. Never panics and never returns an error;
    /// every failure is reported in chat and reflected in the outcome.
    pub async fn handle(&self, message: &InboundMessage) -> InstallOutcome {
        let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) else {
            return InstallOutcome::Ignored;
        };
        if message.sender_id != Some(self.anchor.sender_id) {
            debug!(message_id = message.id, "message not from publisher, ignoring");
            return InstallOutcome::Ignored;
        }
        if !self.is_enabled() {
            debug!(message_id = message.id, "external installs disabled, ignoring");
            return InstallOutcome::Ignored;
        }

        let cause = match AssertUnwindSafe(self.process(message, text))
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        error!(message_id = message.id, error = %cause, "install pipeline failed");
        self.report_crash(message, &cause).await;
        InstallOutcome::Crashed(cause)
    }

    async fn process(
        &self,
        message: &InboundMessage,
        text: &str,
    ) -> Result<InstallOutcome, DirectiveError> {
        let cleaned = directive::clean_text(text, message.has_entities);
        let Some(tag) = directive::extract_tag(&cleaned) else {
            debug!(message_id = message.id, "no install tag");
            return Ok(InstallOutcome::NoDirective);
        };

        match self.verify(tag).await {
            Ok((path, url, source)) => self.install(message, path, &url, &source).await,
            Err(DirectiveError::Chat(e)) => Err(DirectiveError::Chat(e)),
            Err(rejection) => {
                warn!(message_id = message.id, error = %rejection, "install directive rejected");
                self.chat.reply(message, &rejection_text(&rejection)).await?;
                Ok(InstallOutcome::Rejected(rejection))
            },
        }
    }

    /// Parse, resolve, download and verify. Returns the resolved path, its
    /// URL and the verified bytes.
    async fn verify(&self, tag: &str) -> Result<(String, String, Vec<u8>), DirectiveError> {
        let InstallDirective { path, signature } = directive::parse(tag)?;

        let snapshot = self.engine.snapshot();
        let path = snapshot
            .catalog()
            .resolve(&path)
            .map(|entry| entry.path.clone())
            .ok_or(DirectiveError::ModuleNotFound(path))?;

        let url = format!("{}{path}", self.base_url);
        let response = self.http.get(&url, self.timings.download).await?;
        if !response.is_success() {
            return Err(HttpError::Status {
                url,
                status: response.status,
            }
            .into());
        }

        let digest = self
            .verifier
            .verify_content(&path, &response.body, &signature)
            .map_err(|_| DirectiveError::SignatureInvalid { path: path.clone() })?;
        info!(path = %path, sha256 = %digest.to_hex(), "install signature verified");
        Ok((path, url, response.body))
    }

    async fn install(
        &self,
        message: &InboundMessage,
        path: String,
        url: &str,
        source: &[u8],
    ) -> Result<InstallOutcome, DirectiveError> {
        let installed = match self.loader.install(&path, url, source).await {
            Ok(()) => true,
            Err(e) => {
                error!(path = %path, error = %e, "loader failed");
                false
            },
        };

        if let Err(e) = self.chat.delete(message).await {
            warn!(message_id = message.id, error = %e, "failed to delete directive message");
        }

        let ack = if installed {
            format!("#limoka:success:{}", message.id)
        } else {
            format!("#limoka:failed:{}", message.id)
        };
        if let Err(e) = self.chat.notify(self.anchor.sender_id, &ack).await {
            warn!(error = %e, ack = %ack, "failed to acknowledge install");
        }

        Ok(if installed {
            InstallOutcome::Installed { path }
        } else {
            InstallOutcome::Failed { path }
        })
    }

    async fn report_crash(&self, message: &InboundMessage, cause: &str) {
        let text = CRITICAL.replace(
            "{error}",
            &html_escape(&take_chars(cause, CRITICAL_ERROR_CHARS)),
        );
        if let Err(e) = self.chat.reply(message, &text).await {
            warn!(error = %e, "failed to report critical error");
        }
        tokio::time::sleep(self.timings.error_grace).await;
        if let Err(e) = self.chat.delete(message).await {
            warn!(error = %e, "failed to delete message after critical error");
        }
    }
}

fn rejection_text(rejection: &DirectiveError) -> String {
    match rejection {
        DirectiveError::InvalidFormat => INVALID_FORMAT.to_owned(),
        DirectiveError::ModuleNotFound(path) => MODULE_NOT_FOUND.replace("{path}", &html_escape(path)),
        DirectiveError::Download(_) => LOADER_UNAVAILABLE.to_owned(),
        DirectiveError::SignatureInvalid { .. } => SIGNATURE_INVALID.to_owned(),
        DirectiveError::Chat(e) => CRITICAL.replace("{error}", &html_escape(e)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_owned())
}
