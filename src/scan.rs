//! ROM discovery.
//!
//! Walks a directory tree and keeps every file whose console can be
//! detected: from its extension, from the name of the ROM inside a `.zip` or
//! `.gz` wrapper, or from an enclosing folder named after a console id
//! (`roms/gba/...`). Results come back in path order so runs are
//! reproducible.

use crate::console::Console;
use crate::container::{self, ContainerKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A ROM found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameFile {
    pub path: PathBuf,
    pub console: Console,
    /// Size on disk in bytes.
    pub size: u64,
}

impl GameFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Detect the console of a file below `root`.
pub fn detect_console(root: &Path, path: &Path) -> Option<Console> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    if let Some(console) = Console::from_extension(ext) {
        return Some(console);
    }

    if ContainerKind::is_container_extension(ext) {
        match container::inner_names(path) {
            Ok(names) => {
                if let Some(console) = names.iter().find_map(|n| Console::from_file_name(n)) {
                    return Some(console);
                }
            }
            Err(e) => debug!("Cannot list {}: {}", path.display(), e),
        }
        return console_from_folders(root, path);
    }

    None
}

/// Closest enclosing folder (below `root`) named after a console id.
fn console_from_folders(root: &Path, path: &Path) -> Option<Console> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .parent()?
        .components()
        .rev()
        .find_map(|c| Console::from_id(&c.as_os_str().to_string_lossy()))
}

/// Find every ROM under `root`, sorted by path.
pub fn scan_directory(root: &Path) -> Vec<GameFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(console) = detect_console(root, path) else {
            continue;
        };

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        files.push(GameFile { path, console, size });
    }

    debug!("Found {} ROMs under {}", files.len(), root.display());
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    #[test]
    fn test_scan_detects_by_extension_and_sorts() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/b.gba"), b"b").unwrap();
        fs::write(tmp.path().join("a.nes"), b"a").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let files = scan_directory(tmp.path());
        let names: Vec<_> = files.iter().map(|f| (f.file_name(), f.console)).collect();
        assert_eq!(
            names,
            vec![("a.nes".to_string(), Console::Nes), ("b.gba".to_string(), Console::Gba)]
        );
        assert_eq!(files[0].size, 1);
        assert!(files[0].path.is_absolute());
    }

    #[test]
    fn test_zip_console_from_inner_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Game.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        writer.start_file("Game (USA).sfc", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"rom").unwrap();
        writer.finish().unwrap();

        assert_eq!(detect_console(tmp.path(), &path), Some(Console::Snes));
    }

    #[test]
    fn test_container_console_from_folder() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("GBA/set")).unwrap();
        let path = tmp.path().join("GBA/set/odd.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        writer.start_file("rom.dat", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"rom").unwrap();
        writer.finish().unwrap();

        assert_eq!(detect_console(tmp.path(), &path), Some(Console::Gba));
    }

    #[test]
    fn test_unknown_extension_is_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("nes")).unwrap();
        let path = tmp.path().join("nes/readme.txt");
        fs::write(&path, b"x").unwrap();
        assert_eq!(detect_console(tmp.path(), &path), None);
    }
}
