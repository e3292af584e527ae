//! Box art download from the thumbnail repositories.

use crate::asset_key::AssetKey;
use crate::http::{truncate_url, HttpClient};
use anyhow::{bail, Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::debug;

/// Retrieves raw image bytes for an asset key.
pub trait ArtworkFetcher {
    /// Returns `Ok(None)` when the repository has no image under `key`.
    fn fetch(&self, key: &AssetKey) -> Result<Option<Vec<u8>>>;
}

/// Fetches from libretro-thumbnails (or a mirror with the same layout).
pub struct HttpArtworkFetcher {
    client: HttpClient,
    base_url: String,
}

impl HttpArtworkFetcher {
    pub fn new(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    pub fn url(&self, key: &AssetKey) -> String {
        key.url(&self.base_url)
    }
}

impl ArtworkFetcher for HttpArtworkFetcher {
    fn fetch(&self, key: &AssetKey) -> Result<Option<Vec<u8>>> {
        let url = self.url(key);
        debug!("Trying: {}", url);

        let response = self
            .client
            .inner()
            .get(&url)
            .send()
            .with_context(|| format!("Failed to fetch image: {}", truncate_url(&url)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            bail!("HTTP {} - {}", status.as_u16(), truncate_url(&url));
        }

        // GitHub answers some missing raw paths with an HTML page
        let is_image = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("image"));
        if !is_image {
            debug!("Not an image at {}", url);
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read image: {}", truncate_url(&url)))?;
        Ok(Some(bytes.to_vec()))
    }
}
