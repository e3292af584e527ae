//! Resolution of a hashed ROM to its canonical catalog identity.
//!
//! The checksum lookup is authoritative. Only when it misses does the
//! resolver fall back to comparing the file name against catalog titles, and
//! then only the best candidate, only above a fixed threshold. A miss is a
//! normal outcome, not an error.

use crate::catalog::CatalogIndex;
use crate::console::Console;
use crate::hash::ChecksumDigest;
use crate::names;
use crate::scan::GameFile;
use tracing::debug;

/// Default fuzzy acceptance threshold. A candidate's Jaccard score must be
/// strictly greater than this.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

/// How an identity was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    ExactHash,
    FuzzyName,
    Unresolved,
}

impl MatchKind {
    pub fn name(&self) -> &'static str {
        match self {
            MatchKind::ExactHash => "exact-hash",
            MatchKind::FuzzyName => "fuzzy-name",
            MatchKind::Unresolved => "unresolved",
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of resolving one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedIdentity {
    pub console: Console,
    /// Canonical title; `None` exactly when unresolved.
    pub title: Option<String>,
    pub kind: MatchKind,
}

impl ResolvedIdentity {
    pub fn exact(console: Console, title: impl Into<String>) -> Self {
        Self {
            console,
            title: Some(title.into()),
            kind: MatchKind::ExactHash,
        }
    }

    pub fn fuzzy(console: Console, title: impl Into<String>) -> Self {
        Self {
            console,
            title: Some(title.into()),
            kind: MatchKind::FuzzyName,
        }
    }

    pub fn unresolved(console: Console) -> Self {
        Self {
            console,
            title: None,
            kind: MatchKind::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.kind != MatchKind::Unresolved
    }
}

/// Resolves files against a catalog.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    threshold: f64,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_THRESHOLD)
    }
}

impl Resolver {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn resolve(&self, file: &GameFile, digest: &ChecksumDigest, index: &CatalogIndex) -> ResolvedIdentity {
        if let Some(entry) = index.lookup_by_checksum(digest) {
            return ResolvedIdentity::exact(file.console, entry.title.clone());
        }

        let name = names::display_name(&file.path);
        match index.lookup_by_name(&name).next() {
            Some(best) if best.score > self.threshold => {
                debug!(
                    "Fuzzy match for {}: {} (score {:.2})",
                    name, best.entry.title, best.score
                );
                ResolvedIdentity::fuzzy(file.console, best.entry.title.clone())
            }
            Some(best) => {
                debug!(
                    "Best candidate for {} below threshold: {} (score {:.2})",
                    name, best.entry.title, best.score
                );
                ResolvedIdentity::unresolved(file.console)
            }
            None => ResolvedIdentity::unresolved(file.console),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::entry;
    use crate::catalog::CatalogEntry;
    use crate::hash::digest_bytes;
    use std::path::PathBuf;

    fn game(path: &str, console: Console) -> GameFile {
        GameFile {
            path: PathBuf::from(path),
            console,
            size: 0,
        }
    }

    fn nes_index() -> CatalogIndex {
        CatalogIndex::from_entries(
            Console::Nes,
            [
                CatalogEntry {
                    checksum: digest_bytes(b"abc123"),
                    title: "Super Mario Bros".to_string(),
                    console: Console::Nes,
                },
                entry(Console::Nes, "duck", "Duck Hunt (World)"),
            ],
        )
    }

    #[test]
    fn test_exact_hash_match() {
        let identity = Resolver::default().resolve(
            &game("/roms/whatever.nes", Console::Nes),
            &digest_bytes(b"abc123"),
            &nes_index(),
        );
        assert_eq!(identity, ResolvedIdentity::exact(Console::Nes, "Super Mario Bros"));
    }

    #[test]
    fn test_exact_hash_wins_over_name() {
        // File name points at another title, the checksum decides
        let identity = Resolver::default().resolve(
            &game("/roms/Duck Hunt (World).nes", Console::Nes),
            &digest_bytes(b"abc123"),
            &nes_index(),
        );
        assert_eq!(identity.kind, MatchKind::ExactHash);
        assert_eq!(identity.title.as_deref(), Some("Super Mario Bros"));
    }

    #[test]
    fn test_fuzzy_name_fallback() {
        let identity = Resolver::default().resolve(
            &game("/roms/Super_Mario_Bros_(USA).nes", Console::Nes),
            &digest_bytes(b"redump"),
            &nes_index(),
        );
        assert_eq!(identity, ResolvedIdentity::fuzzy(Console::Nes, "Super Mario Bros"));
    }

    #[test]
    fn test_no_overlap_is_unresolved() {
        let identity = Resolver::default().resolve(
            &game("/roms/Random Homebrew Test.nes", Console::Nes),
            &digest_bytes(b"homebrew"),
            &nes_index(),
        );
        assert_eq!(identity, ResolvedIdentity::unresolved(Console::Nes));
        assert!(!identity.is_resolved());
    }

    #[test]
    fn test_below_threshold_is_unresolved() {
        // "super mario" vs "super mario bros": 2/3 < 0.7
        let identity = Resolver::default().resolve(
            &game("/roms/Super Mario.nes", Console::Nes),
            &digest_bytes(b"x"),
            &nes_index(),
        );
        assert_eq!(identity.kind, MatchKind::Unresolved);

        let lenient = Resolver::new(0.5).resolve(
            &game("/roms/Super Mario.nes", Console::Nes),
            &digest_bytes(b"x"),
            &nes_index(),
        );
        assert_eq!(lenient.kind, MatchKind::FuzzyName);
    }
}
