//! clrmamepro DAT parser.
//!
//! No-Intro DATs published by libretro-database use the clrmamepro text
//! format:
//!
//! ```text
//! clrmamepro (
//!     name "Nintendo - Game Boy"
//! )
//!
//! game (
//!     name "Tetris (World) (Rev 1)"
//!     rom ( name "Tetris (World) (Rev 1).gb" size 32768 crc 46DF91AD sha1 74591CC9501AF93873F9A5D3EB12DA12C0723BBC )
//! )
//! ```
//!
//! Values are bare words or double-quoted strings (no escapes); blocks nest
//! with parentheses. Only `game`/`machine` blocks and their `rom` entries
//! are kept.

use crate::hash::ChecksumDigest;

/// Parse failure with the 1-based line it was detected on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct DatError {
    pub line: usize,
    pub message: String,
}

impl DatError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A ROM entry of a game block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatRom {
    pub name: Option<String>,
    pub size: Option<u64>,
    pub sha1: Option<ChecksumDigest>,
}

/// A game block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatGame {
    pub name: Option<String>,
    pub roms: Vec<DatRom>,
}

impl DatGame {
    /// Canonical title: the game name, or the first ROM name without its
    /// extension when the block has no name.
    pub fn title(&self) -> Option<String> {
        if let Some(name) = &self.name {
            return Some(name.clone());
        }
        self.roms.iter().find_map(|rom| {
            rom.name.as_deref().map(|n| match n.rsplit_once('.') {
                Some((stem, _)) => stem.to_string(),
                None => n.to_string(),
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Word(String),
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, DatError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '(' => tokens.push((Token::Open, line)),
            ')' => tokens.push((Token::Close, line)),
            '"' => {
                let start = line;
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\n') => {
                            line += 1;
                            value.push('\n');
                        }
                        Some(ch) => value.push(ch),
                        None => return Err(DatError::new(start, "unterminated string")),
                    }
                }
                tokens.push((Token::Word(value), start));
            }
            c => {
                let mut value = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || next == '(' || next == ')' || next == '"' {
                        break;
                    }
                    value.push(next);
                    chars.next();
                }
                tokens.push((Token::Word(value), line));
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug)]
enum Value {
    Word(String, usize),
    Block(Vec<(String, Value)>),
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    /// Parses `key value` pairs until `)` (inside a block) or end of input.
    fn pairs(&mut self, opened_at: Option<usize>) -> Result<Vec<(String, Value)>, DatError> {
        let mut pairs = Vec::new();
        loop {
            let Some((token, line)) = self.tokens.get(self.pos).cloned() else {
                return match opened_at {
                    Some(open_line) => Err(DatError::new(
                        open_line,
                        "block is never closed",
                    )),
                    None => Ok(pairs),
                };
            };
            self.pos += 1;

            let key = match token {
                Token::Close => {
                    return match opened_at {
                        Some(_) => Ok(pairs),
                        None => Err(DatError::new(line, "unexpected ')'")),
                    };
                }
                Token::Open => return Err(DatError::new(line, "block without a key")),
                Token::Word(key) => key,
            };

            let value = match self.tokens.get(self.pos).cloned() {
                Some((Token::Word(word), value_line)) => {
                    self.pos += 1;
                    Value::Word(word, value_line)
                }
                Some((Token::Open, open_line)) => {
                    self.pos += 1;
                    Value::Block(self.pairs(Some(open_line))?)
                }
                Some((Token::Close, _)) | None => {
                    return Err(DatError::new(line, format!("missing value for '{}'", key)));
                }
            };
            pairs.push((key, value));
        }
    }
}

fn word<'a>(pairs: &'a [(String, Value)], key: &str) -> Option<(&'a str, usize)> {
    pairs.iter().find_map(|(k, v)| match v {
        Value::Word(w, line) if k == key => Some((w.as_str(), *line)),
        _ => None,
    })
}

fn parse_rom(pairs: &[(String, Value)]) -> Result<DatRom, DatError> {
    let sha1 = match word(pairs, "sha1") {
        Some((value, line)) => Some(
            ChecksumDigest::parse(value)
                .ok_or_else(|| DatError::new(line, format!("invalid sha1 '{}'", value)))?,
        ),
        None => None,
    };

    Ok(DatRom {
        name: word(pairs, "name").map(|(n, _)| n.to_string()),
        size: word(pairs, "size").and_then(|(s, _)| s.parse().ok()),
        sha1,
    })
}

/// Parse DAT text into game blocks.
pub fn parse_dat(text: &str) -> Result<Vec<DatGame>, DatError> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
    };
    let top = parser.pairs(None)?;

    let mut games = Vec::new();
    for (key, value) in &top {
        let Value::Block(pairs) = value else { continue };
        if key != "game" && key != "machine" {
            continue;
        }

        let mut roms = Vec::new();
        for (k, v) in pairs {
            match v {
                Value::Block(rom_pairs) if k == "rom" => roms.push(parse_rom(rom_pairs)?),
                _ => {}
            }
        }

        games.push(DatGame {
            name: word(pairs, "name").map(|(n, _)| n.to_string()),
            roms,
        });
    }

    if games.is_empty() && !text.trim().is_empty() && top.iter().all(|(k, _)| k != "clrmamepro") {
        return Err(DatError::new(1, "no game entries found"));
    }

    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"clrmamepro (
	name "Nintendo - Game Boy"
	description "Nintendo - Game Boy"
)

game (
	name "Tetris (World) (Rev 1)"
	description "Tetris (World) (Rev 1)"
	rom ( name "Tetris (World) (Rev 1).gb" size 32768 crc 46DF91AD md5 982ED5D2B12A0377EB14BCDC4123744E sha1 74591CC9501AF93873F9A5D3EB12DA12C0723BBC )
)

game (
	name "Kirby's Dream Land (USA, Europe)"
	rom ( name "Kirby's Dream Land (USA, Europe).gb" size 262144 )
)
"#;

    #[test]
    fn test_parse_sample() {
        let games = parse_dat(SAMPLE).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].title().as_deref(), Some("Tetris (World) (Rev 1)"));
        assert_eq!(games[0].roms[0].size, Some(32768));
        assert_eq!(
            games[0].roms[0].sha1.as_ref().map(|d| d.as_str()),
            Some("74591cc9501af93873f9a5d3eb12da12c0723bbc")
        );
        assert_eq!(games[1].roms[0].sha1, None);
    }

    #[test]
    fn test_title_falls_back_to_rom_name() {
        let games = parse_dat(r#"game ( rom ( name "Solo (Japan).gb" ) )"#).unwrap();
        assert_eq!(games[0].title().as_deref(), Some("Solo (Japan)"));
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse_dat("game (\n name \"x\"\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_unexpected_close() {
        let err = parse_dat("game ( name x )\n)").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse_dat("game (\n name \"broken\n)").unwrap_err();
        assert_eq!(err.message, "unterminated string");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_invalid_sha1() {
        let err = parse_dat("game (\n rom ( name a sha1 XYZ )\n)").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("XYZ"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_dat("<html>404 Not Found</html>").is_err());
        assert!(parse_dat("").unwrap().is_empty());
    }
}
