//! Title normalization and similarity scoring.
//!
//! Used by the fuzzy fallback when a ROM's hash is not in the catalog, and by
//! the asset key builder to derive alternate spellings of a title.
//!
//! Normalization: lowercase, fold accents, drop `(...)`/`[...]` tags, drop
//! apostrophes, turn every other non-alphanumeric character into a space,
//! collapse whitespace. It is idempotent.
//!
//! Similarity is the Jaccard index of the two normalized token sets.

use crate::console::Console;
use crate::container::ContainerKind;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

fn tag_re() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").unwrap())
}

/// Compatibility decomposition without combining marks.
fn fold(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Normalize a title or file name for comparison.
pub fn normalize(name: &str) -> String {
    // Compatibility forms can decompose to uppercase (ℌ -> H) and
    // lowercasing can emit combining marks (İ -> i̇), so fold on both sides.
    let folded = fold(&fold(name).to_lowercase());

    let untagged = tag_re().replace_all(&folded, " ");

    let spaced: String = untagged
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized tokens of a name.
pub fn tokens(name: &str) -> BTreeSet<String> {
    normalize(name)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Similarity of two token sets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    /// Jaccard index in `[0, 1]`.
    pub score: f64,
    /// Number of shared tokens.
    pub overlap: usize,
}

pub fn similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Similarity {
    let overlap = a.intersection(b).count();
    let union = a.len() + b.len() - overlap;
    let score = if union == 0 {
        0.0
    } else {
        overlap as f64 / union as f64
    };
    Similarity { score, overlap }
}

/// Display name of a ROM file: the file name without its ROM extension,
/// and without the container extension for wrapped ROMs.
pub fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    strip_known_extensions(&name).to_string()
}

fn strip_known_extensions(name: &str) -> &str {
    let mut name = name;
    if let Some((stem, ext)) = name.rsplit_once('.') {
        if ContainerKind::is_container_extension(ext) {
            name = stem;
        }
    }
    if let Some((stem, ext)) = name.rsplit_once('.') {
        if Console::from_extension(ext).is_some() {
            return stem;
        }
    }
    name
}

/// Alternate spellings of a catalog title, most specific first.
///
/// libretro-thumbnails does not always carry an image for every region or
/// revision, so the fetcher falls back to:
/// - multi-region tags reduced to the first region, `(USA, Europe)` -> `(USA)`
/// - the title without `(Rev ...)` tags
/// - the title without `(Rev ...)`, `(Beta ...)` and `(Proto ...)` tags
pub fn title_variants(title: &str) -> Vec<String> {
    static MULTI_REGION_RE: OnceLock<Regex> = OnceLock::new();
    static REV_RE: OnceLock<Regex> = OnceLock::new();
    static VARIANT_RE: OnceLock<Regex> = OnceLock::new();

    let multi_region = MULTI_REGION_RE.get_or_init(|| Regex::new(r"\(([^)]+?),[^)]*\)").unwrap());
    let rev = REV_RE.get_or_init(|| Regex::new(r"\s*\(Rev[^)]+\)").unwrap());
    let variant = VARIANT_RE.get_or_init(|| Regex::new(r"\s*\((Rev|Beta|Proto)[^)]+\)").unwrap());

    let candidates = [
        title.to_string(),
        multi_region.replace_all(title, "(${1})").into_owned(),
        rev.replace_all(title, "").trim().to_string(),
        variant.replace_all(title, "").trim().to_string(),
    ];

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Super_Mario_Bros_(USA)"), "super mario bros");
        assert_eq!(normalize("Legend of Zelda, The (USA) (Rev 1)"), "legend of zelda the");
        assert_eq!(normalize("Kirby's Adventure [!]"), "kirbys adventure");
        assert_eq!(normalize("Pokémon - Edición Roja"), "pokemon edicion roja");
        assert_eq!(normalize("  Mega   Man  2 "), "mega man 2");
        assert_eq!(normalize("ℌello World"), "hello world");
        assert_eq!(normalize("İstanbul"), "istanbul");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for name in [
            "Super_Mario_Bros_(USA)",
            "Pokémon - Version Rouge (France) (SGB Enhanced)",
            "Kirby's Dream Land 2 [b1]",
            "Mario & Luigi: Superstar Saga",
            "(Unbalanced tag",
            "ℌello World",
            "İstanbul Rally",
            "",
        ] {
            let once = normalize(name);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", name);
        }
    }

    #[test]
    fn test_similarity() {
        let a = tokens("Super Mario Bros");
        let b = tokens("Super Mario Bros. 3 (USA)");
        let sim = similarity(&a, &b);
        assert_eq!(sim.overlap, 3);
        assert!((sim.score - 0.75).abs() < f64::EPSILON);

        let none = similarity(&tokens("Random Homebrew Test"), &a);
        assert_eq!(none.overlap, 0);
        assert_eq!(none.score, 0.0);

        assert_eq!(similarity(&BTreeSet::new(), &BTreeSet::new()).score, 0.0);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/roms/Super_Mario_Bros_(USA).nes")), "Super_Mario_Bros_(USA)");
        assert_eq!(display_name(Path::new("Game (USA).sfc.gz")), "Game (USA)");
        assert_eq!(display_name(Path::new("Game (USA).zip")), "Game (USA)");
        assert_eq!(display_name(Path::new("v1.2 notes")), "v1.2 notes");
    }

    #[test]
    fn test_title_variants() {
        assert_eq!(
            title_variants("Sonic the Hedgehog (USA, Europe) (Rev 1)"),
            vec![
                "Sonic the Hedgehog (USA, Europe) (Rev 1)",
                "Sonic the Hedgehog (USA) (Rev 1)",
                "Sonic the Hedgehog (USA, Europe)",
            ]
        );
        assert_eq!(
            title_variants("Metroid II (World) (Beta 2)"),
            vec!["Metroid II (World) (Beta 2)", "Metroid II (World)"]
        );
        assert_eq!(title_variants("Tetris (World)"), vec!["Tetris (World)"]);
    }
}
