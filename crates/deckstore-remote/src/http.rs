// ABOUTME: HTTP implementation of RemoteLibrary backed by reqwest.
// ABOUTME: Resolves manifest locations and deck keys against a fixed library root URL.

use async_trait::async_trait;
use deckstore_core::Manifest;
use reqwest::Url;
use reqwest::header::CACHE_CONTROL;

use crate::library::{RemoteError, RemoteLibrary};

/// Fetches manifests and deck bodies from `<root>/<key>` with plain GETs.
#[derive(Debug, Clone)]
pub struct HttpLibrary {
    client: reqwest::Client,
    root: Url,
}

impl HttpLibrary {
    /// Create a library rooted at `root` using a default client.
    pub fn new(root: &str) -> Result<Self, RemoteError> {
        Self::with_client(reqwest::Client::new(), root)
    }

    /// Create a library with an explicitly configured client.
    pub fn with_client(client: reqwest::Client, root: &str) -> Result<Self, RemoteError> {
        let mut root =
            Url::parse(root).map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", root, e)))?;
        if root.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(root.to_string()));
        }
        // Joining relative paths against ".../library" would drop the last segment.
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        Ok(Self { client, root })
    }

    /// The library root, always ending in `/`.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// URL of the manifest; absolute locations are used as given.
    pub fn manifest_url(&self, location: &str) -> Result<Url, RemoteError> {
        self.root
            .join(location)
            .map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", location, e)))
    }

    /// URL of a deck body. Each key segment is appended as a path segment, so
    /// keys that look like schemes or contain `?`/`#` stay inside the root.
    pub fn file_url(&self, key: &str) -> Result<Url, RemoteError> {
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(self.root.to_string()))?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<String, RemoteError> {
        let response = self
            .client
            .get(url.clone())
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl RemoteLibrary for HttpLibrary {
    async fn fetch_manifest(&self, location: &str) -> Result<Manifest, RemoteError> {
        let url = self.manifest_url(location)?;
        tracing::debug!("fetching manifest {}", url);
        let body = self.get_text(url).await?;
        Ok(Manifest::parse(body.as_bytes())?)
    }

    async fn fetch_text(&self, key: &str) -> Result<String, RemoteError> {
        let url = self.file_url(key)?;
        tracing::debug!("fetching deck {}", url);
        self.get_text(url).await
    }

    fn describe(&self) -> String {
        self.root.to_string()
    }
}
