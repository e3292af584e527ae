//! Hash utilities for catalog matching.
//!
//! No-Intro catalogs identify ROMs by SHA-1 of the ROM content, encoded as
//! lowercase hex. The digest must be computed over exactly the bytes the
//! catalog hashed: containers are unwrapped and copier headers removed
//! before hashing, otherwise the lookup silently misses.
//!
//! Payloads are streamed, so memory use does not grow with ROM size.

use crate::console::{Console, HeaderRule};
use crate::container::{self, ContainerKind, ExtractError};
use sha1::{Digest, Sha1};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Length of a hex-encoded SHA-1 digest.
pub const DIGEST_HEX_LEN: usize = 40;

/// Lowercase hex SHA-1 of a ROM payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChecksumDigest(String);

impl ChecksumDigest {
    /// Parses a hex digest, accepting either case.
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        if hex.len() == DIGEST_HEX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(hex.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChecksumDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashing failures. Both are per-file: the file is skipped and reported.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No hashable ROM in {kind} container {}: {reason}", .path.display())]
    UnsupportedContainer {
        path: PathBuf,
        kind: ContainerKind,
        reason: String,
    },
}

/// Computes the SHA-1 of a byte slice.
pub fn digest_bytes(data: &[u8]) -> ChecksumDigest {
    let mut hasher = Sha1::new();
    hasher.update(data);
    ChecksumDigest(hex::encode(hasher.finalize()))
}

/// Streaming SHA-1 that applies a header rule.
///
/// Whether a copier header is present depends on the total length, which a
/// compressed stream only reveals at the end. While the rule could still
/// apply, the bytes after the header are hashed separately and the right
/// digest is picked in [`finish`](Self::finish).
pub struct PayloadHasher {
    header: HeaderRule,
    full: Sha1,
    headerless: Option<Sha1>,
    len: u64,
}

impl PayloadHasher {
    pub fn new(header: HeaderRule) -> Self {
        Self {
            header,
            full: Sha1::new(),
            headerless: (header.max_len() > 0).then(Sha1::new),
            len: 0,
        }
    }

    pub fn finish(self) -> ChecksumDigest {
        let digest = match self.headerless {
            Some(headerless) if self.header.header_len(self.len) > 0 => headerless.finalize(),
            _ => self.full.finalize(),
        };
        ChecksumDigest(hex::encode(digest))
    }
}

impl Write for PayloadHasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Digest::update(&mut self.full, buf);

        if let Some(headerless) = &mut self.headerless {
            let header_len = self.header.max_len() as u64;
            let end = self.len + buf.len() as u64;
            if end > header_len {
                let skip = header_len.saturating_sub(self.len) as usize;
                Digest::update(headerless, &buf[skip..]);
            }
        }

        self.len += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Compute the catalog digest of a ROM file.
///
/// The file is streamed through its container extractor and the console's
/// header rule is applied while hashing.
pub fn hash_file(path: &Path, console: Console) -> Result<ChecksumDigest, HashError> {
    let kind = container::detect_container(path).map_err(|source| HashError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extractor = container::extractor_for(kind);
    trace!("Hashing {} as {} {}", path.display(), extractor.kind(), console);

    let mut hasher = PayloadHasher::new(console.spec().header);
    extractor
        .write_hashable_payload(path, console, &mut hasher)
        .map_err(|e| match e {
            ExtractError::Io(source) => HashError::Io {
                path: path.to_path_buf(),
                source,
            },
            ExtractError::NoPayload(reason) => HashError::UnsupportedContainer {
                path: path.to_path_buf(),
                kind,
                reason,
            },
        })?;

    Ok(hasher.finish())
}
