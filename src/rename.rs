//! Renaming ROMs to their canonical titles.
//!
//! The decision lives here; the filesystem operation sits behind
//! [`Renamer`] so the pipeline can run against a fake.

use crate::names;
use crate::resolver::ResolvedIdentity;
use crate::scan::GameFile;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Characters FAT-formatted SD cards reject in file names.
const FAT_FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// What to do with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameDecision {
    Rename(PathBuf),
    /// Already carries its canonical name.
    Unchanged,
    /// Another file already has the canonical name.
    TargetExists(PathBuf),
    /// Unresolved files are never renamed.
    NotEligible,
}

/// Canonical file name: sanitized title plus the original extension(s),
/// so `game.sfc.gz` keeps `.sfc.gz`.
pub fn canonical_file_name(file: &GameFile, title: &str) -> String {
    let file_name = file.file_name();
    let stem_len = names::display_name(&file.path).len();
    let extension = &file_name[stem_len.min(file_name.len())..];

    let title: String = title
        .chars()
        .map(|c| if FAT_FORBIDDEN.contains(&c) { '_' } else { c })
        .collect();
    format!("{}{}", title.trim(), extension)
}

pub fn rename_target(file: &GameFile, identity: &ResolvedIdentity) -> RenameDecision {
    let Some(title) = identity.title.as_deref().filter(|_| identity.is_resolved()) else {
        return RenameDecision::NotEligible;
    };

    let target = file.path.with_file_name(canonical_file_name(file, title));
    if target == file.path {
        RenameDecision::Unchanged
    } else if target.exists() {
        RenameDecision::TargetExists(target)
    } else {
        RenameDecision::Rename(target)
    }
}

/// Performs a rename.
pub trait Renamer {
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

pub struct FsRenamer;

impl Renamer for FsRenamer {
    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to)
            .with_context(|| format!("Failed to rename {} to {}", from.display(), to.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Console;
    use tempfile::TempDir;

    fn game(path: PathBuf, console: Console) -> GameFile {
        GameFile { path, console, size: 0 }
    }

    #[test]
    fn test_canonical_file_name_keeps_extensions() {
        let file = game(PathBuf::from("/roms/smw.sfc.gz"), Console::Snes);
        assert_eq!(
            canonical_file_name(&file, "Super Mario World (USA)"),
            "Super Mario World (USA).sfc.gz"
        );

        let file = game(PathBuf::from("/roms/zelda.nds"), Console::Nds);
        assert_eq!(
            canonical_file_name(&file, "Zelda: Spirit Tracks (USA)"),
            "Zelda_ Spirit Tracks (USA).nds"
        );
    }

    #[test]
    fn test_rename_decisions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tetris.gb");
        std::fs::write(&path, b"x").unwrap();
        let file = game(path.clone(), Console::Gb);

        assert_eq!(
            rename_target(&file, &ResolvedIdentity::exact(Console::Gb, "Tetris (World)")),
            RenameDecision::Rename(tmp.path().join("Tetris (World).gb"))
        );
        assert_eq!(
            rename_target(&file, &ResolvedIdentity::exact(Console::Gb, "tetris")),
            RenameDecision::Unchanged
        );
        assert_eq!(
            rename_target(&file, &ResolvedIdentity::unresolved(Console::Gb)),
            RenameDecision::NotEligible
        );

        std::fs::write(tmp.path().join("Tetris (World).gb"), b"y").unwrap();
        assert_eq!(
            rename_target(&file, &ResolvedIdentity::fuzzy(Console::Gb, "Tetris (World)")),
            RenameDecision::TargetExists(tmp.path().join("Tetris (World).gb"))
        );
    }

    #[test]
    fn test_fs_renamer() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a.gba");
        let to = tmp.path().join("b.gba");
        std::fs::write(&from, b"x").unwrap();

        FsRenamer.rename(&from, &to).unwrap();
        assert!(!from.exists());
        assert!(to.exists());
        assert!(FsRenamer.rename(&from, &to).is_err());
    }
}
