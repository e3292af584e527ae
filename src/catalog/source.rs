//! Where catalog bytes come from.

use crate::console::Console;
use crate::http::{download_file, HttpClient};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};
use tracing::info;

/// libretro-database No-Intro DATs
pub const DEFAULT_CATALOG_BASE_URL: &str =
    "https://raw.githubusercontent.com/libretro/libretro-database/master/metadat/no-intro";

/// Characters left alone when encoding a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Supplies raw catalog bytes per console.
pub trait CatalogSource {
    fn fetch(&self, console: Console) -> Result<Vec<u8>>;
}

/// DAT files cached in a local directory as `<DAT name>.dat`, downloaded on
/// first use when a client is configured.
pub struct DatDirectory {
    dir: PathBuf,
    base_url: String,
    client: Option<HttpClient>,
}

impl DatDirectory {
    /// Local-only directory; missing DATs are unavailable.
    pub fn offline(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            base_url: DEFAULT_CATALOG_BASE_URL.to_string(),
            client: None,
        }
    }

    /// Directory backed by a remote mirror.
    pub fn with_download(dir: impl Into<PathBuf>, base_url: &str, client: HttpClient) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Some(client),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local path of a console's DAT.
    pub fn dat_path(&self, console: Console) -> PathBuf {
        self.dir.join(format!("{}.dat", console.spec().dat_name))
    }

    /// Remote URL of a console's DAT.
    pub fn dat_url(&self, console: Console) -> String {
        format!(
            "{}/{}.dat",
            self.base_url,
            utf8_percent_encode(console.spec().dat_name, SEGMENT)
        )
    }

    fn download(&self, client: &HttpClient, console: Console, path: &Path) -> Result<()> {
        let url = self.dat_url(console);
        info!("Downloading {} catalog from {}", console, url);

        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_message(format!("DAT {}", console));

        let result = download_file(client, &url, path, Some(&pb));
        pb.finish_and_clear();
        result.map(|_| ())
    }
}

impl CatalogSource for DatDirectory {
    fn fetch(&self, console: Console) -> Result<Vec<u8>> {
        let path = self.dat_path(console);

        if !path.exists() {
            match &self.client {
                Some(client) => self.download(client, console, &path)?,
                None => anyhow::bail!("{} not found", path.display()),
            }
        }

        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dat_url_is_encoded() {
        let dir = DatDirectory::offline("/tmp");
        assert_eq!(
            dir.dat_url(Console::Gb),
            format!("{}/Nintendo%20-%20Game%20Boy.dat", DEFAULT_CATALOG_BASE_URL)
        );
    }

    #[test]
    fn test_reads_cached_dat() -> Result<()> {
        let tmp = TempDir::new()?;
        let dir = DatDirectory::offline(tmp.path());
        std::fs::write(dir.dat_path(Console::Gba), b"game ( name x )")?;

        assert_eq!(dir.fetch(Console::Gba)?, b"game ( name x )");
        Ok(())
    }

    #[test]
    fn test_missing_dat_offline_fails() {
        let tmp = TempDir::new().unwrap();
        let dir = DatDirectory::offline(tmp.path());
        let err = dir.fetch(Console::Nds).unwrap_err();
        assert!(err.to_string().contains("Nintendo - Nintendo DS.dat"));
    }
}
