//! Run results and the error log.

use crate::console::Console;
use crate::hash::ChecksumDigest;
use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Why a file has no identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// Neither the checksum nor the name matched the catalog.
    NoMatch { digest: ChecksumDigest },
    /// The console's catalog could not be loaded.
    CatalogUnavailable,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NoMatch { digest } => write!(f, "no catalog match (sha1 {})", digest),
            UnresolvedReason::CatalogUnavailable => write!(f, "catalog unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedFile {
    pub path: PathBuf,
    pub console: Console,
    pub reason: UnresolvedReason,
}

/// A file that could not be hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub path: PathBuf,
    pub console: Console,
    pub message: String,
}

/// A resolved file for which no candidate image was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingArtwork {
    pub file_name: String,
    pub digest: ChecksumDigest,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameStatus {
    Renamed(PathBuf),
    Unchanged,
    TargetExists(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub path: PathBuf,
    pub status: RenameStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtworkStats {
    pub saved: usize,
    pub skipped_existing: usize,
    pub not_found: usize,
}

/// Everything a run produced. Lists keep scan order.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub processed: usize,
    pub resolved_exact: usize,
    pub resolved_fuzzy: usize,
    pub unresolved: Vec<UnresolvedFile>,
    pub errors: Vec<FileError>,
    /// Consoles whose catalog failed to load, with the reason.
    pub catalog_failures: Vec<(Console, String)>,
    pub artwork: ArtworkStats,
    pub missing_artwork: Vec<MissingArtwork>,
    /// Only filled when renaming was requested.
    pub renames: Vec<RenameOutcome>,
}

impl PipelineReport {
    pub fn resolved(&self) -> usize {
        self.resolved_exact + self.resolved_fuzzy
    }

    pub fn has_problems(&self) -> bool {
        !self.unresolved.is_empty()
            || !self.errors.is_empty()
            || !self.catalog_failures.is_empty()
            || !self.missing_artwork.is_empty()
    }

    /// Write the flat, human-readable error log.
    pub fn write_error_log<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for (console, reason) in &self.catalog_failures {
            writeln!(out, "# catalog {} unavailable: {}", console, reason)?;
        }
        for file in &self.unresolved {
            writeln!(out, "{} | {} | {}", file.path.display(), file.console, file.reason)?;
        }
        for error in &self.errors {
            writeln!(out, "{} | {} | error: {}", error.path.display(), error.console, error.message)?;
        }
        for missing in &self.missing_artwork {
            writeln!(out, "{} | {} | {}", missing.file_name, missing.digest, missing.title)?;
        }
        Ok(())
    }

    /// Write the error log to `path`, replacing it.
    pub fn save_error_log(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_error_log(&mut writer)
            .and_then(|_| writer.flush())
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
