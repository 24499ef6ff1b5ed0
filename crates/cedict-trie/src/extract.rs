use cedict_types::TokenKind;
use tracing::debug;

use crate::lexer::Lexer;
use crate::trie::Trie;

/// Build the smallest trie that tokenizes `text` exactly like `trie` does.
///
/// Every dictionary token found in `text` is copied with its full value.
/// Tokenizing `text` again with the result yields the same dictionary
/// tokens, which makes the result a stable fixture for tests.
pub fn extract(trie: &Trie, text: &str) -> Trie {
    extract_with(&Lexer::new(trie), text)
}

/// [`extract`] with an explicitly configured lexer.
pub fn extract_with(lexer: &Lexer<'_>, text: &str) -> Trie {
    let mut sub = Trie::new();
    let mut tokens = 0usize;
    for token in lexer.tokens(text) {
        if token.kind != TokenKind::Dictionary {
            continue;
        }
        tokens += 1;
        // A repeated word already carries its complete value.
        if !sub.contains_key(&token.word) {
            sub.insert(&token.word, &token.entry);
        }
    }
    debug!(tokens, keys = sub.len(), "extracted sub-trie");
    sub
}
