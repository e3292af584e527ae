//! Remote thumbnail naming.
//!
//! libretro-thumbnails stores box art as
//! `<repository>/Named_Boxarts/<sanitized title>.png`. The repository and the
//! sanitization rule come from the console table, so this module holds no
//! per-console logic.

use crate::console::Console;
use crate::names;
use crate::resolver::{MatchKind, ResolvedIdentity};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// libretro-thumbnails organisation on GitHub
pub const DEFAULT_THUMBNAIL_BASE_URL: &str = "https://github.com/libretro-thumbnails";

/// Folder holding box art in every thumbnail repository.
pub const BOXART_FOLDER: &str = "Named_Boxarts";

/// Extension of every remote thumbnail.
pub const THUMBNAIL_EXTENSION: &str = "png";

/// Characters left alone when encoding the asset path.
const ASSET_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetKeyError {
    #[error("Cannot build an asset key for an unresolved {console} file")]
    InvalidIdentity { console: Console },
}

/// Exact location of a thumbnail in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey {
    pub repository: &'static str,
    /// Path inside the repository, e.g. `Named_Boxarts/Tetris (World).png`.
    pub path: String,
}

impl AssetKey {
    /// Raw download URL under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/raw/master/{}",
            base_url.trim_end_matches('/'),
            self.repository,
            utf8_percent_encode(&self.path, ASSET_PATH)
        )
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.repository, self.path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssetKeyBuilder;

impl AssetKeyBuilder {
    fn key(repository: &'static str, console: Console, title: &str) -> AssetKey {
        let file_name = console.spec().sanitize.apply(title);
        AssetKey {
            repository,
            path: format!("{}/{}.{}", BOXART_FOLDER, file_name, THUMBNAIL_EXTENSION),
        }
    }

    fn title(identity: &ResolvedIdentity) -> Result<&str, AssetKeyError> {
        match (&identity.title, identity.kind) {
            (Some(title), MatchKind::ExactHash | MatchKind::FuzzyName) => Ok(title),
            _ => Err(AssetKeyError::InvalidIdentity {
                console: identity.console,
            }),
        }
    }

    /// Primary asset key of a resolved identity.
    pub fn build(&self, identity: &ResolvedIdentity) -> Result<AssetKey, AssetKeyError> {
        let title = Self::title(identity)?;
        let spec = identity.console.spec();
        Ok(Self::key(spec.thumbnail_repo, identity.console, title))
    }

    /// Every key worth trying, in order: for each title variant, the primary
    /// repository and then the fallback repositories. The first element is
    /// always [`build`](Self::build)'s result.
    pub fn candidates(&self, identity: &ResolvedIdentity) -> Result<Vec<AssetKey>, AssetKeyError> {
        let title = Self::title(identity)?;
        let spec = identity.console.spec();
        let variants = names::title_variants(title);

        let mut keys = Vec::new();
        for variant in &variants {
            for repository in std::iter::once(spec.thumbnail_repo).chain(spec.fallback_repos.iter().copied()) {
                let key = Self::key(repository, identity.console, variant);
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_exact() {
        let identity = ResolvedIdentity::exact(Console::Gba, "Metroid Fusion (USA)");
        let key = AssetKeyBuilder.build(&identity).unwrap();
        assert_eq!(key.repository, "Nintendo_-_Game_Boy_Advance");
        assert_eq!(key.path, "Named_Boxarts/Metroid Fusion (USA).png");
        assert_eq!(
            key.url(DEFAULT_THUMBNAIL_BASE_URL),
            "https://github.com/libretro-thumbnails/Nintendo_-_Game_Boy_Advance/raw/master/Named_Boxarts/Metroid%20Fusion%20%28USA%29.png"
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let identity = ResolvedIdentity::fuzzy(Console::Snes, "Chrono Trigger (USA)");
        assert_eq!(
            AssetKeyBuilder.build(&identity).unwrap(),
            AssetKeyBuilder.build(&identity.clone()).unwrap()
        );
    }

    #[test]
    fn test_colon_is_substituted() {
        let identity = ResolvedIdentity::exact(Console::Nds, "Zelda: Spirit Tracks & More");
        let key = AssetKeyBuilder.build(&identity).unwrap();
        assert_eq!(key.path, "Named_Boxarts/Zelda_ Spirit Tracks _ More.png");
    }

    #[test]
    fn test_unresolved_is_rejected() {
        let err = AssetKeyBuilder
            .build(&ResolvedIdentity::unresolved(Console::Nes))
            .unwrap_err();
        assert_eq!(err, AssetKeyError::InvalidIdentity { console: Console::Nes });
        assert!(AssetKeyBuilder
            .candidates(&ResolvedIdentity::unresolved(Console::Nes))
            .is_err());
    }

    #[test]
    fn test_never_fails_on_resolved_identities() {
        for console in Console::all() {
            let identity = ResolvedIdentity::exact(console, "A:B/C\\D|E?F*G<H>I\"J`K");
            let key = AssetKeyBuilder.build(&identity).unwrap();
            assert_eq!(key.path, "Named_Boxarts/A_B_C_D_E_F_G_H_I_J_K.png");
        }
    }

    #[test]
    fn test_candidates_include_fallback_repos() {
        let identity = ResolvedIdentity::exact(Console::Gbc, "Wario Land II (USA, Europe) (Rev 1)");
        let keys = AssetKeyBuilder.candidates(&identity).unwrap();
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "Nintendo_-_Game_Boy_Color/Named_Boxarts/Wario Land II (USA, Europe) (Rev 1).png",
                "Nintendo_-_Game_Boy/Named_Boxarts/Wario Land II (USA, Europe) (Rev 1).png",
                "Nintendo_-_Game_Boy_Color/Named_Boxarts/Wario Land II (USA) (Rev 1).png",
                "Nintendo_-_Game_Boy/Named_Boxarts/Wario Land II (USA) (Rev 1).png",
                "Nintendo_-_Game_Boy_Color/Named_Boxarts/Wario Land II (USA, Europe).png",
                "Nintendo_-_Game_Boy/Named_Boxarts/Wario Land II (USA, Europe).png",
            ]
        );
        assert_eq!(keys[0], AssetKeyBuilder.build(&identity).unwrap());
    }
}
