//! Greedy longest-match tokenizer.
//!
//! At each position the lexer takes the longest dictionary key with a value.
//! When nothing matches it emits a single-character token classified as a
//! newline, punctuation, or unknown character. The resulting spans tile the
//! text with no gaps and no overlaps.

use cedict_types::{Token, TokenKind};

use crate::trie::Trie;

/// Full-width comma and full-width period.
pub const DEFAULT_PUNCTUATION: [char; 2] = ['，', '。'];

/// Lexer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerConfig {
    /// Characters emitted as [`TokenKind::Punctuation`] when they have no
    /// dictionary entry.
    pub punctuation: Vec<char>,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            punctuation: DEFAULT_PUNCTUATION.to_vec(),
        }
    }
}

impl LexerConfig {
    pub fn with_punctuation(chars: impl IntoIterator<Item = char>) -> Self {
        let mut punctuation: Vec<char> = chars.into_iter().collect();
        punctuation.sort_unstable();
        punctuation.dedup();
        Self { punctuation }
    }

    pub fn is_punctuation(&self, ch: char) -> bool {
        self.punctuation.contains(&ch)
    }
}

pub fn is_newline(ch: char) -> bool {
    ch == '\n'
}

/// Tokenizer over a built trie.
#[derive(Debug, Clone)]
pub struct Lexer<'t> {
    trie: &'t Trie,
    config: LexerConfig,
}

impl<'t> Lexer<'t> {
    pub fn new(trie: &'t Trie) -> Self {
        Self::with_config(trie, LexerConfig::default())
    }

    pub fn with_config(trie: &'t Trie, config: LexerConfig) -> Self {
        Self { trie, config }
    }

    pub fn trie(&self) -> &'t Trie {
        self.trie
    }

    pub fn config(&self) -> &LexerConfig {
        &self.config
    }

    /// Kind of a character that has no dictionary match.
    pub fn classify(&self, ch: char) -> TokenKind {
        if is_newline(ch) {
            TokenKind::Newline
        } else if self.config.is_punctuation(ch) {
            TokenKind::Punctuation
        } else {
            TokenKind::Unknown
        }
    }

    /// Lazily tokenize `text` from the beginning.
    pub fn tokens(&self, text: &str) -> Tokens<'_, 't> {
        self.tokens_from(text, 0)
    }

    /// Lazily tokenize `text` from code-point offset `start`. An offset past
    /// the end yields no tokens.
    pub fn tokens_from(&self, text: &str, start: usize) -> Tokens<'_, 't> {
        let chars: Vec<char> = text.chars().collect();
        let pos = start.min(chars.len());
        Tokens {
            lexer: self,
            chars,
            pos,
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokens(text).collect()
    }

    pub fn tokenize_from(&self, text: &str, start: usize) -> Vec<Token> {
        self.tokens_from(text, start).collect()
    }

    fn next_token(&self, chars: &[char], start: usize) -> Token {
        match self.trie.lookup(chars, start) {
            Some(found) => Token::new(
                TokenKind::Dictionary,
                found.word,
                found.value,
                start,
                found.end,
            ),
            None => {
                let ch = chars[start];
                Token::single_char(self.classify(ch), ch, start)
            }
        }
    }
}

/// Iterator returned by [`Lexer::tokens`].
#[derive(Debug)]
pub struct Tokens<'l, 't> {
    lexer: &'l Lexer<'t>,
    chars: Vec<char>,
    pos: usize,
}

impl Tokens<'_, '_> {
    /// Code-point offset of the next token.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for Tokens<'_, '_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.chars.len() {
            return None;
        }
        let token = self.lexer.next_token(&self.chars, self.pos);
        debug_assert!(token.end > self.pos);
        self.pos = token.end;
        Some(token)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.chars.len() - self.pos;
        (usize::from(remaining > 0), Some(remaining))
    }
}

/// Tokenize `text` with the default punctuation set.
pub fn tokenize(trie: &Trie, text: &str) -> Vec<Token> {
    Lexer::new(trie).tokenize(text)
}
