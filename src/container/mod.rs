//! Container handling for hashing.
//!
//! Catalogs index ROMs by the content of the ROM itself, so a game stored
//! inside a ZIP or gzip wrapper has to be unwrapped before hashing. Each
//! format implements [`PayloadExtractor`]; [`extractor_for`] picks one by
//! magic bytes so a mislabeled file is still handled correctly.
//!
//! Payloads are streamed into a sink (the hasher), never buffered whole.

mod gzipped;
mod zipped;

pub use gzipped::GzipExtractor;
pub use zipped::ZipExtractor;

use crate::console::Console;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;

/// Read buffer for payload streams (1MB)
const READ_BUFFER: usize = 1024 * 1024;

/// Container type detected by magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// ZIP archive (PK signature)
    Zip,
    /// gzip stream (1F 8B)
    Gzip,
    /// Not a container, the file is the ROM
    Raw,
}

impl ContainerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Zip => "zip",
            ContainerKind::Gzip => "gzip",
            ContainerKind::Raw => "raw",
        }
    }

    /// Returns true for extensions the scanner should look inside.
    pub fn is_container_extension(ext: &str) -> bool {
        matches!(ext.to_lowercase().trim_start_matches('.'), "zip" | "gz")
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Failure to produce the bytes the catalog hashed.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    NoPayload(String),
}

/// Produces the bytes a catalog checksum is computed over.
pub trait PayloadExtractor {
    fn kind(&self) -> ContainerKind;

    /// Streams the canonical payload of `path` for a ROM of `console` into
    /// `sink`. Returns the payload length.
    fn write_hashable_payload(&self, path: &Path, console: Console, sink: &mut dyn Write) -> Result<u64, ExtractError>;
}

/// Open a file with the payload read buffer.
pub(crate) fn open_buffered(path: &Path) -> std::io::Result<BufReader<File>> {
    Ok(BufReader::with_capacity(READ_BUFFER, File::open(path)?))
}

/// Copy a decoded stream into `sink`. Decoder failures mean the container
/// is damaged, not that the disk failed.
fn copy_decoded(reader: &mut dyn Read, sink: &mut dyn Write, format: &str) -> Result<u64, ExtractError> {
    std::io::copy(reader, sink).map_err(|e| match e.kind() {
        ErrorKind::InvalidData | ErrorKind::InvalidInput | ErrorKind::UnexpectedEof => {
            ExtractError::NoPayload(format!("corrupt {} stream: {}", format, e))
        }
        _ => ExtractError::Io(e),
    })
}

/// Plain ROM files: the payload is the whole file.
pub struct RawExtractor;

impl PayloadExtractor for RawExtractor {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Raw
    }

    fn write_hashable_payload(&self, path: &Path, _console: Console, sink: &mut dyn Write) -> Result<u64, ExtractError> {
        let mut reader = open_buffered(path)?;
        Ok(std::io::copy(&mut reader, sink)?)
    }
}

/// Detect container type by reading magic bytes.
pub fn detect_container(path: &Path) -> std::io::Result<ContainerKind> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        let n = file.read(&mut magic[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    if filled < 2 {
        return Ok(ContainerKind::Raw);
    }

    // ZIP: PK\x03\x04 (local header) or PK\x05\x06 (empty archive)
    if filled == 4 && magic[0..2] == [0x50, 0x4B] && matches!(magic[2..4], [0x03, 0x04] | [0x05, 0x06]) {
        return Ok(ContainerKind::Zip);
    }

    if magic[0..2] == [0x1F, 0x8B] {
        return Ok(ContainerKind::Gzip);
    }

    Ok(ContainerKind::Raw)
}

/// Returns the extractor for `kind`.
pub fn extractor_for(kind: ContainerKind) -> &'static dyn PayloadExtractor {
    match kind {
        ContainerKind::Zip => &ZipExtractor,
        ContainerKind::Gzip => &GzipExtractor,
        ContainerKind::Raw => &RawExtractor,
    }
}

/// Names of the ROM files inside a container, used for console detection.
pub fn inner_names(path: &Path) -> Result<Vec<String>, ExtractError> {
    match detect_container(path)? {
        ContainerKind::Zip => zipped::entry_names(path),
        ContainerKind::Gzip => Ok(gzipped::inner_name(path).into_iter().collect()),
        ContainerKind::Raw => Ok(Vec::new()),
    }
}
