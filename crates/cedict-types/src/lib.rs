//! Shared types for CC-CEDICT segmentation.
//!
//! [`Token`] and [`TokenKind`] describe the output of the lexer; every token
//! carries its surface text, an entry string in CC-CEDICT line format, and a
//! half-open `[start, end)` span counted in code points. [`CedictEntry`] is a
//! zero-copy view of one dictionary line, and [`Form`] selects whether the
//! traditional or the simplified headword keys a trie.
//!
//! ```rust
//! use cedict_types::{Form, parse_entry_line};
//!
//! let entry = parse_entry_line("葉 叶 [Yè] /surname Ye/").unwrap();
//! assert_eq!(entry.headword(Form::Simplified), "叶");
//! assert_eq!(entry.senses, vec!["surname Ye"]);
//! ```

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Classification of a lexer token.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TokenKind {
    /// Longest dictionary match at the token start.
    Dictionary,
    /// A single line feed.
    Newline,
    /// A single character from the configured punctuation set.
    Punctuation,
    /// Any other single character without a dictionary entry.
    Unknown,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Dictionary => "DICTIONARY",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Punctuation => "PUNCTUATION",
            TokenKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One element of a token stream. Spans are code-point offsets into the
/// tokenized text.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub word: String,
    pub entry: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        word: impl Into<String>,
        entry: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Self {
        Self {
            kind,
            word: word.into(),
            entry: entry.into(),
            start,
            end,
        }
    }

    /// Build a one-character token whose entry is synthesized with
    /// [`synthetic_entry`].
    pub fn single_char(kind: TokenKind, ch: char, start: usize) -> Self {
        Self {
            kind,
            word: ch.to_string(),
            entry: synthetic_entry(ch),
            start,
            end: start + 1,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Length in code points.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({:?}, kind={}, start={}, end={})",
            self.word, self.kind, self.start, self.end
        )
    }
}

/// Entry text for characters that have no dictionary entry, shaped like a
/// CC-CEDICT line: `"<c> <c> [<c>] /<c>/"`.
pub fn synthetic_entry(ch: char) -> String {
    format!("{ch} {ch} [{ch}] /{ch}/")
}

/// Which headword of a CC-CEDICT line keys the trie.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Form {
    #[default]
    Traditional,
    Simplified,
}

impl Form {
    pub fn as_str(self) -> &'static str {
        match self {
            Form::Traditional => "traditional",
            Form::Simplified => "simplified",
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when parsing an unknown [`Form`] name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownForm(pub String);

impl fmt::Display for UnknownForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown hanzi form {:?} (expected traditional or simplified)",
            self.0
        )
    }
}

impl std::error::Error for UnknownForm {}

impl FromStr for Form {
    type Err = UnknownForm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "traditional" | "trad" | "t" => Ok(Form::Traditional),
            "simplified" | "simp" | "s" => Ok(Form::Simplified),
            _ => Err(UnknownForm(s.to_string())),
        }
    }
}

/// A CC-CEDICT line split into its fields. All text borrows from the line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CedictEntry<'a> {
    /// The whole line without its line ending.
    pub raw: &'a str,
    pub traditional: &'a str,
    pub simplified: &'a str,
    /// Numbered pinyin as written between the brackets.
    pub pinyin: &'a str,
    pub senses: Vec<&'a str>,
}

impl<'a> CedictEntry<'a> {
    pub fn headword(&self, form: Form) -> &'a str {
        match form {
            Form::Traditional => self.traditional,
            Form::Simplified => self.simplified,
        }
    }
}

/// Parse `TRAD SIMP [PINYIN] /sense/.../`.
///
/// Returns `None` for blank lines, comments (`#...`) and lines that do not
/// follow the entry layout.
pub fn parse_entry_line(line: &str) -> Option<CedictEntry<'_>> {
    let raw = line.trim_end_matches(['\r', '\n']);
    if raw.trim().is_empty() || raw.starts_with('#') {
        return None;
    }

    let (traditional, rest) = raw.split_once(' ')?;
    let (simplified, rest) = rest.split_once(' ')?;
    if traditional.is_empty() || simplified.is_empty() {
        return None;
    }

    let rest = rest.strip_prefix('[')?;
    let (pinyin, rest) = rest.split_once(']')?;

    let body = rest.trim_start().strip_prefix('/')?.trim_end();
    let body = body.strip_suffix('/')?;
    let senses = body.split('/').filter(|s| !s.is_empty()).collect();

    Some(CedictEntry {
        raw,
        traditional,
        simplified,
        pinyin,
        senses,
    })
}
