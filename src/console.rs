//! Console definitions.
//!
//! Every supported system has one row in [`CONSOLES`]. The row carries
//! everything the pipeline needs to know about a console: which file
//! extensions belong to it, which No-Intro DAT describes it, which
//! libretro-thumbnails repositories hold its box art and how titles must be
//! rewritten to match the file names in those repositories.
//!
//! Adding a console is a data change: add a variant and a table row.

use std::path::Path;

/// Supported consoles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Console {
    Nds,
    Snes,
    Nes,
    Gb,
    Gbc,
    Gba,
    GameGear,
    MasterSystem,
    MegaDrive,
}

/// Header that some dumps carry but the catalog hashes never include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRule {
    /// Hash the payload unchanged.
    None,
    /// Strip a copier header of `len` bytes when `size % modulus == len`.
    Copier { len: usize, modulus: usize },
}

impl HeaderRule {
    /// Largest header this rule can remove.
    pub fn max_len(&self) -> usize {
        match *self {
            HeaderRule::None => 0,
            HeaderRule::Copier { len, .. } => len,
        }
    }

    /// Bytes to skip at the start of a payload of `size` bytes.
    pub fn header_len(&self, size: u64) -> usize {
        match *self {
            HeaderRule::None => 0,
            HeaderRule::Copier { len, modulus } => {
                if size > len as u64 && size % modulus as u64 == len as u64 {
                    len
                } else {
                    0
                }
            }
        }
    }
}

/// Naming convention of a thumbnail repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeRule {
    /// Characters that never appear in remote file names.
    pub forbidden: &'static str,
    /// Character written in their place.
    pub substitute: char,
}

impl SanitizeRule {
    pub fn apply(&self, title: &str) -> String {
        title
            .chars()
            .map(|c| if self.forbidden.contains(c) { self.substitute } else { c })
            .collect()
    }
}

/// libretro-thumbnails naming: `&*/:`<>?\|"` become underscores.
pub const LIBRETRO_SANITIZE: SanitizeRule = SanitizeRule {
    forbidden: "&*/:`<>?\\|\"",
    substitute: '_',
};

/// Static properties of a console.
#[derive(Debug)]
pub struct ConsoleSpec {
    pub console: Console,
    /// Short id used on the command line and in folder names.
    pub id: &'static str,
    /// Lowercase extensions including the leading dot.
    pub extensions: &'static [&'static str],
    /// No-Intro DAT name as published by libretro-database.
    pub dat_name: &'static str,
    /// Primary libretro-thumbnails repository.
    pub thumbnail_repo: &'static str,
    /// Repositories tried after the primary one.
    pub fallback_repos: &'static [&'static str],
    pub header: HeaderRule,
    pub sanitize: SanitizeRule,
}

pub static CONSOLES: &[ConsoleSpec] = &[
    ConsoleSpec {
        console: Console::Nds,
        id: "nds",
        extensions: &[".nds"],
        dat_name: "Nintendo - Nintendo DS",
        thumbnail_repo: "Nintendo_-_Nintendo_DS",
        fallback_repos: &[],
        header: HeaderRule::None,
        sanitize: LIBRETRO_SANITIZE,
    },
    ConsoleSpec {
        console: Console::Snes,
        id: "snes",
        extensions: &[".smc", ".sfc"],
        dat_name: "Nintendo - Super Nintendo Entertainment System",
        thumbnail_repo: "Nintendo_-_Super_Nintendo_Entertainment_System",
        fallback_repos: &[],
        header: HeaderRule::Copier { len: 512, modulus: 1024 },
        sanitize: LIBRETRO_SANITIZE,
    },
    ConsoleSpec {
        console: Console::Nes,
        id: "nes",
        extensions: &[".nes"],
        dat_name: "Nintendo - Nintendo Entertainment System",
        thumbnail_repo: "Nintendo_-_Nintendo_Entertainment_System",
        fallback_repos: &[],
        header: HeaderRule::None,
        sanitize: LIBRETRO_SANITIZE,
    },
    ConsoleSpec {
        console: Console::Gb,
        id: "gb",
        extensions: &[".gb"],
        dat_name: "Nintendo - Game Boy",
        thumbnail_repo: "Nintendo_-_Game_Boy",
        fallback_repos: &[],
        header: HeaderRule::None,
        sanitize: LIBRETRO_SANITIZE,
    },
    ConsoleSpec {
        console: Console::Gbc,
        id: "gbc",
        extensions: &[".gbc"],
        dat_name: "Nintendo - Game Boy Color",
        thumbnail_repo: "Nintendo_-_Game_Boy_Color",
        // Dual-mode carts are often only in the Game Boy set
        fallback_repos: &["Nintendo_-_Game_Boy"],
        header: HeaderRule::None,
        sanitize: LIBRETRO_SANITIZE,
    },
    ConsoleSpec {
        console: Console::Gba,
        id: "gba",
        extensions: &[".gba"],
        dat_name: "Nintendo - Game Boy Advance",
        thumbnail_repo: "Nintendo_-_Game_Boy_Advance",
        fallback_repos: &[],
        header: HeaderRule::None,
        sanitize: LIBRETRO_SANITIZE,
    },
    ConsoleSpec {
        console: Console::GameGear,
        id: "gg",
        extensions: &[".gg"],
        dat_name: "Sega - Game Gear",
        thumbnail_repo: "Sega_-_Game_Gear",
        fallback_repos: &[],
        header: HeaderRule::None,
        sanitize: LIBRETRO_SANITIZE,
    },
    ConsoleSpec {
        console: Console::MasterSystem,
        id: "sms",
        extensions: &[".sms"],
        dat_name: "Sega - Master System",
        thumbnail_repo: "Sega_-_Master_System",
        fallback_repos: &[],
        header: HeaderRule::None,
        sanitize: LIBRETRO_SANITIZE,
    },
    ConsoleSpec {
        console: Console::MegaDrive,
        id: "md",
        extensions: &[".gen", ".smd", ".bin", ".md"],
        dat_name: "Sega - Mega Drive - Genesis",
        thumbnail_repo: "Sega_-_Mega_Drive_-_Genesis",
        fallback_repos: &[],
        header: HeaderRule::None,
        sanitize: LIBRETRO_SANITIZE,
    },
];

impl Console {
    /// Returns the table row for this console.
    pub fn spec(&self) -> &'static ConsoleSpec {
        CONSOLES
            .iter()
            .find(|row| row.console == *self)
            .unwrap_or_else(|| unreachable!("console {:?} missing from CONSOLES", self))
    }

    pub fn id(&self) -> &'static str {
        self.spec().id
    }

    /// Returns the display name (the DAT name).
    pub fn name(&self) -> &'static str {
        self.spec().dat_name
    }

    /// All consoles in table order.
    pub fn all() -> impl Iterator<Item = Console> {
        CONSOLES.iter().map(|row| row.console)
    }

    /// Parses a console from its short id (case-insensitive).
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.to_lowercase();
        CONSOLES.iter().find(|row| row.id == id).map(|row| row.console)
    }

    /// Detects the console from a file extension (with or without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        let ext = ext.trim_start_matches('.');
        CONSOLES
            .iter()
            .find(|row| row.extensions.iter().any(|e| &e[1..] == ext))
            .map(|row| row.console)
    }

    /// Detects the console from the extension of a file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns true if `name` has one of this console's extensions.
    pub fn owns_file_name(&self, name: &str) -> bool {
        Self::from_file_name(name) == Some(*self)
    }
}

impl std::fmt::Display for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_console_has_a_row() {
        for console in [
            Console::Nds,
            Console::Snes,
            Console::Nes,
            Console::Gb,
            Console::Gbc,
            Console::Gba,
            Console::GameGear,
            Console::MasterSystem,
            Console::MegaDrive,
        ] {
            assert_eq!(console.spec().console, console);
        }
        assert_eq!(Console::all().count(), CONSOLES.len());
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(Console::from_extension(".SFC"), Some(Console::Snes));
        assert_eq!(Console::from_extension("smc"), Some(Console::Snes));
        assert_eq!(Console::from_extension("bin"), Some(Console::MegaDrive));
        assert_eq!(Console::from_extension("zip"), None);
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(Console::from_file_name("Tetris (World).gb"), Some(Console::Gb));
        assert_eq!(Console::from_file_name("noext"), None);
        assert!(Console::Gba.owns_file_name("Metroid Fusion (USA).GBA"));
        assert!(!Console::Gb.owns_file_name("Metroid Fusion (USA).gba"));
    }

    #[test]
    fn test_from_id() {
        assert_eq!(Console::from_id("GBC"), Some(Console::Gbc));
        assert_eq!(Console::from_id("psx"), None);
        assert_eq!(Console::MegaDrive.to_string(), "md");
    }

    #[test]
    fn test_repository_names_follow_dat_names() {
        for row in CONSOLES {
            assert_eq!(row.thumbnail_repo, row.dat_name.replace(' ', "_"));
        }
    }

    #[test]
    fn test_copier_header_rule() {
        let rule = Console::Snes.spec().header;
        assert_eq!(rule.header_len(1024 + 512), 512);
        assert_eq!(rule.header_len(2048), 0);
        assert_eq!(rule.header_len(512), 0);
        assert_eq!(rule.max_len(), 512);
        assert_eq!(HeaderRule::None.header_len(1536), 0);
    }

    #[test]
    fn test_libretro_sanitize() {
        assert_eq!(
            LIBRETRO_SANITIZE.apply("Mario & Luigi: Superstar Saga"),
            "Mario _ Luigi_ Superstar Saga"
        );
        assert_eq!(LIBRETRO_SANITIZE.apply("A/B?C*D"), "A_B_C_D");
    }
}
