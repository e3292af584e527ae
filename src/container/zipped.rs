//! ZIP-wrapped ROMs.

use super::{copy_decoded, open_buffered, ContainerKind, ExtractError, PayloadExtractor};
use crate::console::Console;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

pub struct ZipExtractor;

fn open(path: &Path) -> Result<ZipArchive<BufReader<File>>, ExtractError> {
    ZipArchive::new(open_buffered(path)?).map_err(zip_error)
}

fn zip_error(err: ZipError) -> ExtractError {
    match err {
        ZipError::Io(e) => ExtractError::Io(e),
        other => ExtractError::NoPayload(format!("unreadable zip: {}", other)),
    }
}

/// Names of the file entries in the archive (directories skipped).
pub(super) fn entry_names(path: &Path) -> Result<Vec<String>, ExtractError> {
    let mut archive = open(path)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(zip_error)?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }
    Ok(names)
}

/// Picks the entry holding the ROM: the only file, or the first file with
/// one of the console's extensions.
fn select_entry(names: &[String], console: Console) -> Option<&str> {
    if let [only] = names {
        return Some(only.as_str());
    }
    names
        .iter()
        .find(|name| console.owns_file_name(name))
        .map(|s| s.as_str())
}

impl PayloadExtractor for ZipExtractor {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Zip
    }

    fn write_hashable_payload(&self, path: &Path, console: Console, sink: &mut dyn Write) -> Result<u64, ExtractError> {
        let names = entry_names(path)?;
        let selected = select_entry(&names, console).ok_or_else(|| {
            ExtractError::NoPayload(format!(
                "no {} ROM among {} entries",
                console,
                names.len()
            ))
        })?;

        let mut archive = open(path)?;
        let mut entry = archive.by_name(selected).map_err(zip_error)?;
        copy_decoded(&mut entry, sink, "zip")
    }
}
