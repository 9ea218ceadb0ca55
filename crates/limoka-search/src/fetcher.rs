//! Catalog manifest retrieval.

use std::sync::Arc;
use std::time::Duration;

use limoka_config::CatalogSection;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::{CatalogError, HttpError};
use crate::http::HttpClient;

/// Downloads `modules.json` and validates it into a [`Catalog`].
pub struct CatalogFetcher {
    http: Arc<dyn HttpClient>,
    manifest_url: String,
    timeout: Duration,
}

impl CatalogFetcher {
    /// Create a fetcher for the manifest described by `section`.
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, section: &CatalogSection) -> Self {
        Self {
            http,
            manifest_url: section.manifest_url(),
            timeout: Duration::from_secs(section.fetch_timeout_secs),
        }
    }

    /// Manifest URL.
    #[must_use]
    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    /// Fetch and validate the manifest. No retries.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] on transport failure or a non-2xx
    /// status, and the parse errors of [`Catalog::from_manifest`].
    pub async fn fetch(&self) -> Result<Catalog, CatalogError> {
        debug!(url = %self.manifest_url, "fetching catalog manifest");
        let response = self.http.get(&self.manifest_url, self.timeout).await?;
        if !response.is_success() {
            return Err(HttpError::Status {
                url: self.manifest_url.clone(),
                status: response.status,
            }
            .into());
        }

        let catalog = Catalog::from_manifest(&response.body)?;
        info!(
            modules = catalog.len(),
            fingerprint = %catalog.short_fingerprint(),
            "catalog fetched"
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::http::HttpResponse;

    struct StaticHttp(Mutex<HashMap<String, HttpResponse>>);

    #[async_trait]
    impl HttpClient for StaticHttp {
        async fn get(&self, url: &str, _: Duration) -> Result<HttpResponse, HttpError> {
            self.0
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| HttpError::Transport {
                    url: url.to_owned(),
                    message: "unreachable".into(),
                })
        }

        async fn head(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
            self.get(url, timeout).await
        }
    }

    fn fetcher(routes: &[(&str, HttpResponse)]) -> CatalogFetcher {
        let map = routes
            .iter()
            .map(|(u, r)| ((*u).to_owned(), r.clone()))
            .collect();
        let section = CatalogSection {
            base_url: "https://cat/".into(),
            ..CatalogSection::default()
        };
        CatalogFetcher::new(Arc::new(StaticHttp(Mutex::new(map))), &section)
    }

    #[tokio::test]
    async fn fetches_and_parses() {
        let f = fetcher(&[(
            "https://cat/modules.json",
            HttpResponse::ok(r#"{"a.py": {"name": "A"}}"#),
        )]);
        assert_eq!(f.manifest_url(), "https://cat/modules.json");
        let catalog = f.fetch().await.unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let mut resp = HttpResponse::ok("");
        resp.status = 503;
        let f = fetcher(&[("https://cat/modules.json", resp)]);
        assert!(matches!(
            f.fetch().await,
            Err(CatalogError::Http(HttpError::Status { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_error() {
        let f = fetcher(&[]);
        assert!(matches!(
            f.fetch().await,
            Err(CatalogError::Http(HttpError::Transport { .. }))
        ));
    }
}
