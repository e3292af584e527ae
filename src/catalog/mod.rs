//! Per-console reference catalogs.
//!
//! A [`CatalogIndex`] holds one console's No-Intro DAT, keyed by SHA-1 for
//! exact matching, plus a token index over normalized titles for the fuzzy
//! fallback. It is built once per console per run and read-only afterwards.

pub mod dat;
pub mod source;

pub use source::{CatalogSource, DatDirectory};

use crate::console::Console;
use crate::hash::ChecksumDigest;
use crate::names::{self, Similarity};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Catalog failures. Fatal for the console's batch only.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog for {console} is unavailable: {reason}")]
    Unavailable { console: Console, reason: String },

    #[error("Catalog for {console} is malformed at line {line}: {message}")]
    Parse {
        console: Console,
        line: usize,
        message: String,
    },
}

/// One ROM known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub checksum: ChecksumDigest,
    /// Canonical title, e.g. `Tetris (World) (Rev 1)`.
    pub title: String,
    pub console: Console,
}

/// A fuzzy name candidate.
#[derive(Debug, Clone, Copy)]
pub struct NameMatch<'a> {
    pub entry: &'a CatalogEntry,
    pub score: f64,
    pub overlap: usize,
}

/// Ranking: score, then overlap, then shorter title, then title order.
fn rank(a: &NameMatch<'_>, b: &NameMatch<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.overlap.cmp(&a.overlap))
        .then_with(|| a.entry.title.chars().count().cmp(&b.entry.title.chars().count()))
        .then_with(|| a.entry.title.cmp(&b.entry.title))
}

/// In-memory catalog for a single console.
#[derive(Debug)]
pub struct CatalogIndex {
    console: Console,
    entries: Vec<CatalogEntry>,
    by_checksum: HashMap<ChecksumDigest, usize>,
    /// Token sets of name-indexed entries, parallel to `entries`.
    title_tokens: Vec<BTreeSet<String>>,
    by_token: HashMap<String, Vec<usize>>,
}

impl CatalogIndex {
    /// Load a console's catalog from a source.
    pub fn load(console: Console, source: &dyn CatalogSource) -> Result<Self, CatalogError> {
        let bytes = source
            .fetch(console)
            .map_err(|e| CatalogError::Unavailable {
                console,
                reason: format!("{:#}", e),
            })?;
        Self::parse(console, &bytes)
    }

    /// Build an index from raw DAT bytes. Invalid UTF-8 is replaced.
    pub fn parse(console: Console, bytes: &[u8]) -> Result<Self, CatalogError> {
        let text = String::from_utf8_lossy(bytes);
        let games = dat::parse_dat(&text).map_err(|e| CatalogError::Parse {
            console,
            line: e.line,
            message: e.message,
        })?;

        let entries = games.into_iter().flat_map(|game| {
            let title = game.title();
            game.roms.into_iter().filter_map(move |rom| {
                Some(CatalogEntry {
                    checksum: rom.sha1?,
                    title: title.clone()?,
                    console,
                })
            })
        });

        Ok(Self::from_entries(console, entries))
    }

    /// Build an index from entries. A checksum seen twice keeps the first
    /// entry.
    pub fn from_entries(console: Console, entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut index = Self {
            console,
            entries: Vec::new(),
            by_checksum: HashMap::new(),
            title_tokens: Vec::new(),
            by_token: HashMap::new(),
        };
        let mut indexed_titles = HashSet::new();

        for entry in entries {
            if index.by_checksum.contains_key(&entry.checksum) {
                debug!(
                    "Duplicate checksum {} in {} catalog ({}), keeping first",
                    entry.checksum, console, entry.title
                );
                continue;
            }

            let id = index.entries.len();
            index.by_checksum.insert(entry.checksum.clone(), id);

            // Several ROMs can share a title; only the first one is name-indexed
            let tokens = if indexed_titles.insert(entry.title.clone()) {
                names::tokens(&entry.title)
            } else {
                BTreeSet::new()
            };
            for token in &tokens {
                index.by_token.entry(token.clone()).or_default().push(id);
            }
            index.title_tokens.push(tokens);
            index.entries.push(entry);
        }

        debug!("Indexed {} {} catalog entries", index.entries.len(), console);
        index
    }

    pub fn console(&self) -> Console {
        self.console
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Exact lookup by checksum.
    pub fn lookup_by_checksum(&self, digest: &ChecksumDigest) -> Option<&CatalogEntry> {
        self.by_checksum.get(digest).map(|&id| &self.entries[id])
    }

    /// Ranked fuzzy candidates for a raw name.
    ///
    /// Only entries sharing at least one normalized token are returned.
    /// The ranking is recomputed on every call.
    pub fn lookup_by_name(&self, raw_name: &str) -> impl Iterator<Item = NameMatch<'_>> + '_ {
        let query = names::tokens(raw_name);

        let mut candidates: Vec<usize> = query
            .iter()
            .filter_map(|token| self.by_token.get(token))
            .flatten()
            .copied()
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let mut matches: Vec<NameMatch<'_>> = candidates
            .into_iter()
            .map(|id| {
                let Similarity { score, overlap } = names::similarity(&query, &self.title_tokens[id]);
                NameMatch {
                    entry: &self.entries[id],
                    score,
                    overlap,
                }
            })
            .collect();
        matches.sort_by(rank);
        matches.into_iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::hash::digest_bytes;

    pub(crate) fn entry(console: Console, seed: &str, title: &str) -> CatalogEntry {
        CatalogEntry {
            checksum: digest_bytes(seed.as_bytes()),
            title: title.to_string(),
            console,
        }
    }

    #[test]
    fn test_lookup_by_checksum() {
        let index = CatalogIndex::from_entries(
            Console::Nes,
            [
                entry(Console::Nes, "smb", "Super Mario Bros"),
                entry(Console::Nes, "zelda", "Legend of Zelda, The (USA)"),
            ],
        );
        assert_eq!(index.len(), 2);
        let hit = index.lookup_by_checksum(&digest_bytes(b"smb")).unwrap();
        assert_eq!(hit.title, "Super Mario Bros");
        assert!(index.lookup_by_checksum(&digest_bytes(b"other")).is_none());
    }

    #[test]
    fn test_duplicate_checksum_keeps_first() {
        let index = CatalogIndex::from_entries(
            Console::Gb,
            [
                entry(Console::Gb, "same", "First (World)"),
                entry(Console::Gb, "same", "Second (World)"),
            ],
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup_by_checksum(&digest_bytes(b"same")).unwrap().title, "First (World)");
    }

    #[test]
    fn test_lookup_by_name_ranking() {
        let index = CatalogIndex::from_entries(
            Console::Nes,
            [
                entry(Console::Nes, "3", "Super Mario Bros. 3 (USA)"),
                entry(Console::Nes, "1", "Super Mario Bros. (World)"),
                entry(Console::Nes, "z", "Zelda II (USA)"),
            ],
        );

        let matches: Vec<_> = index.lookup_by_name("Super_Mario_Bros_(USA)").collect();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].entry.title, "Super Mario Bros. (World)");
        assert_eq!(matches[0].score, 1.0);
        assert_eq!(matches[1].entry.title, "Super Mario Bros. 3 (USA)");

        assert_eq!(index.lookup_by_name("Random Homebrew Test").count(), 0);
    }

    #[test]
    fn test_tie_break_prefers_shorter_then_lexicographic() {
        let index = CatalogIndex::from_entries(
            Console::Gba,
            [
                entry(Console::Gba, "b", "Golf Beta (USA)"),
                entry(Console::Gba, "a", "Golf Alpha (USA)"),
                entry(Console::Gba, "long", "Golf Charlie (Europe)"),
            ],
        );
        // All three score 1/3 with one shared token
        let titles: Vec<_> = index.lookup_by_name("Golf Delta").map(|m| m.entry.title.clone()).collect();
        assert_eq!(titles, vec!["Golf Beta (USA)", "Golf Alpha (USA)", "Golf Charlie (Europe)"]);
    }

    #[test]
    fn test_parse_dat_bytes() {
        let dat = br#"game (
            name "Tetris (World) (Rev 1)"
            rom ( name "Tetris (World) (Rev 1).gb" size 32768 sha1 74591CC9501AF93873F9A5D3EB12DA12C0723BBC )
        )
        game (
            name "No Hash (World)"
            rom ( name "No Hash (World).gb" size 1 )
        )"#;
        let index = CatalogIndex::parse(Console::Gb, dat).unwrap();
        assert_eq!(index.len(), 1);
        let digest = ChecksumDigest::parse("74591cc9501af93873f9a5d3eb12da12c0723bbc").unwrap();
        assert_eq!(index.lookup_by_checksum(&digest).unwrap().title, "Tetris (World) (Rev 1)");
    }

    #[test]
    fn test_parse_error_carries_console_and_line() {
        let err = CatalogIndex::parse(Console::Snes, b"game (\n rom ( sha1 nothex )\n)").unwrap_err();
        match err {
            CatalogError::Parse { console, line, .. } => {
                assert_eq!(console, Console::Snes);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
