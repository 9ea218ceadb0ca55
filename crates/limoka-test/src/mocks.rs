//! Mock implementations for testing.
//!
//! All mocks use `std::sync::Mutex` so builders work without a runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use limoka_search::{
    DirectiveChat, DirectiveError, HttpClient, HttpError, HttpResponse, InboundMessage,
    LoaderError, PluginLoader,
};

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
}

/// Scripted [`HttpClient`]: a URL → response map. Unknown URLs answer 404;
/// URLs marked offline fail with a transport error.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, HttpResponse>>>,
    offline: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<(Method, String)>>>,
}

impl MockHttpClient {
    /// An empty client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` at `url`.
    #[must_use]
    pub fn with_response(self, url: impl Into<String>, response: HttpResponse) -> Self {
        self.set_response(url, response);
        self
    }

    /// Serve `body` with status 200 at `url`.
    #[must_use]
    pub fn with_body(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.with_response(url, HttpResponse::ok(body))
    }

    /// Replace the response at `url`.
    pub fn set_response(&self, url: impl Into<String>, response: HttpResponse) {
        let url = url.into();
        if let Ok(mut guard) = self.offline.lock() {
            guard.retain(|u| *u != url);
        }
        if let Ok(mut guard) = self.responses.lock() {
            guard.insert(url, response);
        }
    }

    /// Make requests to `url` fail as if the host were unreachable.
    pub fn set_offline(&self, url: impl Into<String>) {
        let url = url.into();
        if let Ok(mut guard) = self.responses.lock() {
            guard.remove(&url);
        }
        if let Ok(mut guard) = self.offline.lock() {
            guard.push(url);
        }
    }

    /// Every request so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of requests with `method` to `url`.
    #[must_use]
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(m, u)| *m == method && u == url)
            .count()
    }

    fn respond(&self, method: Method, url: &str) -> Result<HttpResponse, HttpError> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push((method, url.to_owned()));
        }
        if self
            .offline
            .lock()
            .is_ok_and(|g| g.iter().any(|u| u == url))
        {
            return Err(HttpError::Transport {
                url: url.to_owned(),
                message: "host unreachable".to_owned(),
            });
        }
        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|g| g.get(url).cloned())
            .unwrap_or(HttpResponse {
                status: 404,
                content_type: None,
                body: Vec::new(),
            });
        Ok(match method {
            Method::Get => response,
            Method::Head => HttpResponse {
                body: Vec::new(),
                ..response
            },
        })
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.respond(Method::Get, url)
    }

    async fn head(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, HttpError> {
        self.respond(Method::Head, url)
    }
}

/// One plugin handed to the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    /// Catalog path.
    pub path: String,
    /// Download URL.
    pub url: String,
    /// Verified source bytes.
    pub source: Vec<u8>,
}

/// Recording [`PluginLoader`] that can be told to reject or crash on
/// everything.
#[derive(Debug, Clone, Default)]
pub struct MockPluginLoader {
    installed: Arc<Mutex<Vec<InstalledPlugin>>>,
    failure: Arc<Mutex<Option<String>>>,
    panic: Arc<Mutex<Option<String>>>,
}

impl MockPluginLoader {
    /// A loader that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every install with `reason`.
    #[must_use]
    pub fn failing(self, reason: impl Into<String>) -> Self {
        self.set_failure(Some(reason.into()));
        self
    }

    /// Reject installs with `reason` from now on, or accept them again.
    pub fn set_failure(&self, reason: Option<String>) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = reason;
        }
    }

    /// Panic with `message` on every install from now on.
    pub fn set_panic(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.panic.lock() {
            *guard = Some(message.into());
        }
    }

    /// Accepted installs, in order.
    #[must_use]
    pub fn installed(&self) -> Vec<InstalledPlugin> {
        self.installed.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PluginLoader for MockPluginLoader {
    async fn install(&self, path: &str, url: &str, source: &[u8]) -> Result<(), LoaderError> {
        let panic = self.panic.lock().ok().and_then(|g| g.clone());
        if let Some(message) = panic {
            panic!("{message}");
        }
        if let Some(reason) = self.failure.lock().ok().and_then(|g| g.clone()) {
            return Err(LoaderError::Rejected(reason));
        }
        if let Ok(mut guard) = self.installed.lock() {
            guard.push(InstalledPlugin {
                path: path.to_owned(),
                url: url.to_owned(),
                source: source.to_vec(),
            });
        }
        Ok(())
    }
}

/// Recording [`DirectiveChat`]. Replies can be made to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingChat {
    replies: Arc<Mutex<Vec<(i64, String)>>>,
    deleted: Arc<Mutex<Vec<i64>>>,
    notifications: Arc<Mutex<Vec<(i64, String)>>>,
    reply_failure: Arc<Mutex<Option<String>>>,
}

impl RecordingChat {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every reply with `reason` from now on, or accept them again.
    pub fn set_reply_failure(&self, reason: Option<String>) {
        if let Ok(mut guard) = self.reply_failure.lock() {
            *guard = reason;
        }
    }

    /// `(message id, html)` of every reply.
    #[must_use]
    pub fn replies(&self) -> Vec<(i64, String)> {
        self.replies.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Ids of deleted messages.
    #[must_use]
    pub fn deleted(&self) -> Vec<i64> {
        self.deleted.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// `(user id, text)` of every direct notification.
    #[must_use]
    pub fn notifications(&self) -> Vec<(i64, String)> {
        self.notifications
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DirectiveChat for RecordingChat {
    async fn reply(&self, message: &InboundMessage, html: &str) -> Result<(), DirectiveError> {
        if let Some(reason) = self.reply_failure.lock().ok().and_then(|g| g.clone()) {
            return Err(DirectiveError::Chat(reason));
        }
        if let Ok(mut guard) = self.replies.lock() {
            guard.push((message.id, html.to_owned()));
        }
        Ok(())
    }

    async fn delete(&self, message: &InboundMessage) -> Result<(), DirectiveError> {
        if let Ok(mut guard) = self.deleted.lock() {
            guard.push(message.id);
        }
        Ok(())
    }

    async fn notify(&self, user_id: i64, text: &str) -> Result<(), DirectiveError> {
        if let Ok(mut guard) = self.notifications.lock() {
            guard.push((user_id, text.to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn http_mock_scripts_and_records() {
        let http = MockHttpClient::new().with_body("https://a/x", b"hello".to_vec());
        let t = Duration::from_secs(1);

        assert_eq!(http.get("https://a/x", t).await.unwrap().body, b"hello");
        assert!(http.head("https://a/x", t).await.unwrap().body.is_empty());
        assert_eq!(http.get("https://a/y", t).await.unwrap().status, 404);

        http.set_offline("https://a/x");
        assert!(http.get("https://a/x", t).await.is_err());
        assert_eq!(http.count(Method::Get, "https://a/x"), 2);
        assert_eq!(http.count(Method::Head, "https://a/x"), 1);
    }

    #[tokio::test]
    async fn failing_loader_records_nothing() {
        let loader = MockPluginLoader::new().failing("nope");
        assert!(loader.install("a.py", "u", b"x").await.is_err());
        assert!(loader.installed().is_empty());
    }

    #[tokio::test]
    async fn failing_chat_records_no_reply() {
        let chat = RecordingChat::new();
        chat.set_reply_failure(Some("forbidden".to_owned()));
        let msg = crate::fixtures::message(1, None, "x");
        assert!(chat.reply(&msg, "hi").await.is_err());
        assert!(chat.replies().is_empty());
        assert!(chat.delete(&msg).await.is_ok());
        assert_eq!(chat.deleted(), vec![1]);
    }
}
