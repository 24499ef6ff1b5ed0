//! Dictionary trie, greedy segmentation and canonical trie files.
//!
//! A [`Trie`] maps character sequences to dictionary values; inserting the
//! same key twice joins both values with a newline. The [`Lexer`] walks a
//! text with [`Trie::lookup`], always taking the longest key that holds a
//! value, and falls back to single-character tokens otherwise, so the token
//! spans tile the whole text. [`serialize`] and [`write_trie_file`] render a
//! trie deterministically for storage and diffing; [`parse_trie`] and
//! [`parse_trie_file`] read any of the formats back. [`extract`] reduces a
//! trie to the entries used by one text.
//!
//! Construction is single-writer and batch; afterwards a trie is shared
//! read-only and needs no locking.
//!
//! # Example
//! ```rust
//! use cedict_trie::{Format, Trie, parse_trie, serialize, tokenize};
//! use cedict_types::TokenKind;
//!
//! # fn main() -> Result<(), cedict_trie::TrieError> {
//! let mut trie = Trie::new();
//! trie.insert("她", "她 她 [ta1] /she/");
//! trie.insert("不太好", "不太好 不太好 [bu4 tai4 hao3] /not so good/");
//!
//! let tokens = tokenize(&trie, "她不太好。");
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[1].word, "不太好");
//! assert_eq!(tokens[2].kind, TokenKind::Punctuation);
//!
//! let text = serialize(&trie, Format::Pretty)?;
//! assert_eq!(parse_trie(&text)?, trie);
//! # Ok(()) }
//! ```

pub mod extract;
pub mod lexer;
pub mod load;
pub mod trie;
pub mod write;

use thiserror::Error;

pub use extract::{extract, extract_with};
pub use lexer::{DEFAULT_PUNCTUATION, Lexer, LexerConfig, Tokens, is_newline, tokenize};
pub use load::{TrieFile, parse_trie, parse_trie_file};
pub use trie::{Match, Trie, TrieNode};
pub use write::{Format, Preamble, serialize, write_trie, write_trie_file};

#[derive(Debug, Error)]
pub enum TrieError {
    #[error("unsupported trie format {0:?} (expected compact, readable or pretty)")]
    FormatUnsupported(String),
    #[error("malformed trie at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("header line {0:?} cannot be stored in a trie file")]
    HeaderLine(String),
    #[error("failed to encode trie string: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write trie: {0}")]
    Io(#[from] std::io::Error),
}
