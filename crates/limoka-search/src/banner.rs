//! Banner image validation with a negative cache.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::http::HttpClient;

/// Validates claimed banner URLs with a `HEAD` probe.
///
/// URLs that fail once are remembered for the life of the process and never
/// probed again. The cache is cleared wholesale when it reaches its cap.
pub struct BannerResolver {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
    cap: usize,
    invalid: RwLock<HashSet<String>>,
}

impl BannerResolver {
    /// Create a resolver.
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, timeout: Duration, cap: usize) -> Self {
        Self {
            http,
            timeout,
            cap: cap.max(1),
            invalid: RwLock::new(HashSet::new()),
        }
    }

    /// Return `url` if it answers 2xx with an `image/*` content type.
    ///
    /// Empty URLs and cached failures return `None` without a network call.
    pub async fn resolve(&self, url: Option<&str>) -> Option<String> {
        let url = url.map(str::trim).filter(|u| !u.is_empty())?;
        if self.invalid.read().await.contains(url) {
            return None;
        }

        let valid = match self.http.head(url, self.timeout).await {
            Ok(response) => {
                response.is_success()
                    && response
                        .content_type
                        .as_deref()
                        .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            },
            Err(e) => {
                debug!(url, error = %e, "banner probe failed");
                false
            },
        };

        if valid {
            return Some(url.to_owned());
        }

        let mut invalid = self.invalid.write().await;
        if invalid.len() >= self.cap {
            debug!(cap = self.cap, "invalid banner cache full, clearing");
            invalid.clear();
        }
        invalid.insert(url.to_owned());
        None
    }

    /// Whether `url` is cached as invalid.
    pub async fn is_known_invalid(&self, url: &str) -> bool {
        self.invalid.read().await.contains(url)
    }

    /// Number of cached invalid URLs.
    pub async fn invalid_count(&self) -> usize {
        self.invalid.read().await.len()
    }
}
