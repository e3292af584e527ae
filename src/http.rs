//! Blocking HTTP client shared by the catalog downloader and the artwork
//! fetcher.

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Connection timeout: time to establish TCP connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Overall request timeout. DAT files are a few MB at most.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("twilight-boxart/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &reqwest::blocking::Client {
        &self.client
    }
}

/// Download `url` to `output_path`, reporting progress on `progress_bar`.
///
/// The file is written to a `.part` sibling first and renamed on success so
/// an interrupted download never leaves a truncated file behind.
pub fn download_file(
    client: &HttpClient,
    url: &str,
    output_path: &Path,
    progress_bar: Option<&ProgressBar>,
) -> Result<u64> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let response = client
        .inner()
        .get(url)
        .send()
        .with_context(|| format!("Connection failed: {}", truncate_url(url)))?;

    let status = response.status();
    if !status.is_success() {
        bail!("HTTP {} - {}", status.as_u16(), truncate_url(url));
    }

    if let (Some(pb), Some(len)) = (progress_bar, response.content_length()) {
        pb.set_length(len);
    }

    let part_path = output_path.with_extension("part");
    let file = File::create(&part_path)
        .with_context(|| format!("Failed to create {}", part_path.display()))?;
    let mut writer = BufWriter::new(file);

    let copied = match progress_bar {
        Some(pb) => std::io::copy(&mut pb.wrap_read(response), &mut writer),
        None => {
            let mut response = response;
            std::io::copy(&mut response, &mut writer)
        }
    };
    let total = copied.with_context(|| format!("Failed to download {}", truncate_url(url)))?;
    writer.flush().context("Failed to flush file")?;
    drop(writer);

    std::fs::rename(&part_path, output_path)
        .with_context(|| format!("Failed to move download to {}", output_path.display()))?;

    debug!("Downloaded {} bytes from {}", total, url);
    Ok(total)
}

/// Truncate URL for error messages
pub fn truncate_url(url: &str) -> String {
    if url.chars().count() > 80 {
        let head: String = url.chars().take(77).collect();
        format!("{}...", head)
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_truncate_url() {
        assert_eq!(truncate_url("https://a/b"), "https://a/b");
        let long = format!("https://example.com/{}", "x".repeat(100));
        let short = truncate_url(&long);
        assert_eq!(short.chars().count(), 80);
        assert!(short.ends_with("..."));
    }
}
