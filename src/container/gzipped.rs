//! gzip-wrapped ROMs (`Game (USA).sfc.gz`).

use super::{copy_decoded, open_buffered, ContainerKind, ExtractError, PayloadExtractor};
use crate::console::Console;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

pub struct GzipExtractor;

impl PayloadExtractor for GzipExtractor {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Gzip
    }

    fn write_hashable_payload(&self, path: &Path, _console: Console, sink: &mut dyn Write) -> Result<u64, ExtractError> {
        let mut decoder = MultiGzDecoder::new(open_buffered(path)?);
        copy_decoded(&mut decoder, sink, "gzip")
    }
}

/// Name of the wrapped file: the header's original name, or the file name
/// with `.gz` removed.
pub(super) fn inner_name(path: &Path) -> Option<String> {
    let from_header = File::open(path).ok().and_then(|file| {
        let decoder = MultiGzDecoder::new(BufReader::new(file));
        decoder
            .header()
            .and_then(|h| h.filename())
            .map(|name| String::from_utf8_lossy(name).into_owned())
    });

    from_header.or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    })
}
