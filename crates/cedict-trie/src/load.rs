//! Parse tries written by [`crate::write`].
//!
//! All three formats share one grammar, so a single parser reads them back.
//! Child order in the input does not matter.

use std::collections::hash_map::Entry;

use tracing::debug;

use crate::TrieError;
use crate::trie::{Trie, TrieNode};
use crate::write::{FOOTER, HEADER_MARKER, Preamble, TERMINAL_KEY, TRIE_NAME, VARIABLES_NAME};

/// Contents of a trie file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrieFile {
    pub preamble: Preamble,
    pub trie: Trie,
}

/// Parse a bare trie body such as the output of [`crate::serialize`].
pub fn parse_trie(text: &str) -> Result<Trie, TrieError> {
    let mut parser = Parser::new(text, 0, 1);
    parser.skip_trivia();
    let trie = parser.trie()?;
    parser.skip_trivia();
    parser.expect_end()?;
    Ok(trie)
}

/// Parse a full trie file written by [`crate::write_trie_file`].
pub fn parse_trie_file(text: &str) -> Result<TrieFile, TrieError> {
    let (header, body_offset, body_line) = split_header(text)?;

    let mut parser = Parser::new(text, body_offset, body_line);
    parser.skip_trivia();
    parser.expect_word(VARIABLES_NAME)?;
    parser.skip_trivia();
    parser.expect('=')?;
    parser.skip_trivia();
    let variables = parser.variables()?;
    parser.skip_trivia();
    parser.expect_word(TRIE_NAME)?;
    parser.skip_trivia();
    parser.expect('=')?;
    parser.skip_trivia();
    let trie = parser.trie()?;
    parser.skip_trivia();
    parser.expect_end()?;

    let last_line = text.lines().rev().find(|line| !line.trim().is_empty());
    if last_line.map(str::trim_end) != Some(FOOTER) {
        return Err(TrieError::Parse {
            line: text.lines().count(),
            column: 1,
            message: format!("missing trailing {FOOTER:?} line"),
        });
    }

    debug!(keys = trie.len(), "parsed trie file");
    Ok(TrieFile {
        preamble: Preamble { header, variables },
        trie,
    })
}

/// Collect the header lines between the two `# --` markers. Returns the
/// header, the byte offset just past it, and the line number at that offset.
fn split_header(text: &str) -> Result<(Vec<String>, usize, usize), TrieError> {
    let mut header = Vec::new();
    let mut offset = 0usize;
    let mut opened_at: Option<usize> = None;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        offset += line.len();
        let content = line.trim_end_matches(['\r', '\n']);
        match opened_at {
            None if content == HEADER_MARKER => opened_at = Some(idx + 1),
            None => {
                if !(content.is_empty() || content.starts_with('#')) {
                    // No header block; the body starts at the top.
                    return Ok((Vec::new(), 0, 1));
                }
            }
            Some(_) if content == HEADER_MARKER => return Ok((header, offset, idx + 2)),
            Some(_) => header.push(content.to_string()),
        }
    }
    match opened_at {
        Some(line) => Err(TrieError::Parse {
            line,
            column: 1,
            message: "unterminated header block".to_string(),
        }),
        None => Ok((Vec::new(), 0, 1)),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    keys: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, pos: usize, line: usize) -> Self {
        Self {
            src,
            pos,
            line,
            column: 1,
            keys: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> TrieError {
        TrieError::Parse {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    /// Skip whitespace and `#` comments.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TrieError> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected {expected:?}, found {ch:?}"))),
            None => Err(self.error(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), TrieError> {
        if self.src[self.pos..].starts_with(word) {
            for _ in word.chars() {
                self.bump();
            }
            Ok(())
        } else {
            Err(self.error(format!("expected `{word}`")))
        }
    }

    fn expect_end(&self) -> Result<(), TrieError> {
        match self.peek() {
            None => Ok(()),
            Some(ch) => Err(self.error(format!("unexpected {ch:?} after trie"))),
        }
    }

    /// A JSON string literal, decoded.
    fn string(&mut self) -> Result<String, TrieError> {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        self.expect('"')?;
        let mut escaped = false;
        loop {
            match self.bump() {
                None => {
                    return Err(TrieError::Parse {
                        line,
                        column,
                        message: "unterminated string".to_string(),
                    });
                }
                Some('\\') if !escaped => escaped = true,
                Some('"') if !escaped => break,
                Some(_) => escaped = false,
            }
        }
        serde_json::from_str(&self.src[start..self.pos]).map_err(|e| TrieError::Parse {
            line,
            column,
            message: format!("invalid string literal: {e}"),
        })
    }

    fn variables(&mut self) -> Result<Vec<(String, String)>, TrieError> {
        let mut variables = Vec::new();
        self.expect('{')?;
        self.skip_trivia();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(variables);
        }
        loop {
            self.skip_trivia();
            let name = self.string()?;
            self.skip_trivia();
            self.expect(':')?;
            self.skip_trivia();
            let value = self.string()?;
            variables.push((name, value));
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(variables),
                _ => return Err(self.error("expected ',' or '}' in variables")),
            }
        }
    }

    fn trie(&mut self) -> Result<Trie, TrieError> {
        self.keys = 0;
        let root = self.node()?;
        Ok(Trie::from_root(root, self.keys))
    }

    fn node(&mut self) -> Result<TrieNode, TrieError> {
        let mut node = TrieNode::default();
        self.expect('{')?;
        self.skip_trivia();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(node);
        }
        loop {
            self.skip_trivia();
            if self.peek() == Some(TERMINAL_KEY) {
                self.bump();
                self.skip_trivia();
                self.expect(':')?;
                self.skip_trivia();
                if node.value.is_some() {
                    return Err(self.error("duplicate value in node"));
                }
                node.value = Some(self.string()?);
                self.keys += 1;
            } else {
                let key = self.string()?;
                let mut chars = key.chars();
                let (Some(ch), None) = (chars.next(), chars.next()) else {
                    return Err(self.error(format!("child key {key:?} is not one character")));
                };
                self.skip_trivia();
                self.expect(':')?;
                self.skip_trivia();
                let child = self.node()?;
                match node.children.entry(ch) {
                    Entry::Occupied(_) => {
                        return Err(self.error(format!("duplicate child key {key:?}")));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(child);
                    }
                }
            }
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(node),
                _ => return Err(self.error("expected ',' or '}' in trie node")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::{Format, serialize, write_trie_file};

    fn sample_trie() -> Trie {
        [
            ("她", "她 她 [tā] /she/"),
            ("李", "李 李 [Lǐ] /surname Li/"),
            ("李", "李 李 [lǐ] /plum/"),
            ("不太好", "不太好 不太好 [bù tài hǎo] /not so good/"),
            ("的", "的 的 [de] /of; ~'s (possessive particle)/"),
            ("#", "# # [#] /hash/"),
            ("$", "$ $ [$] /dollar/"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn every_format_round_trips() {
        let trie = sample_trie();
        for format in [Format::Compact, Format::Readable, Format::Pretty] {
            let text = serialize(&trie, format).unwrap();
            let loaded = parse_trie(&text).unwrap();
            assert_eq!(loaded, trie, "format {format}");
            assert_eq!(loaded.len(), trie.len());
        }
    }

    #[test]
    fn round_trips_full_file() {
        let preamble = Preamble {
            header: vec!["# CC-CEDICT".into(), "#".into()],
            variables: vec![
                ("version".into(), "1".into()),
                ("license".into(), "https://creativecommons.org/licenses/by-sa/4.0/".into()),
            ],
        };
        let trie = sample_trie();
        let mut out = Vec::new();
        write_trie_file(&mut out, &preamble, &trie, Format::Readable).unwrap();
        let text = String::from_utf8(out).unwrap();

        let file = parse_trie_file(&text).unwrap();
        assert_eq!(file.preamble, preamble);
        assert_eq!(file.trie, trie);
    }

    #[test]
    fn accepts_empty_variables_and_trie() {
        let text = "# --\n# --\n\nvariables = {\n}\n\ntrie = {}\n\n# fin.\n";
        let file = parse_trie_file(text).unwrap();
        assert!(file.preamble.header.is_empty());
        assert!(file.preamble.variables.is_empty());
        assert!(file.trie.is_empty());
    }

    #[test]
    fn rejects_missing_footer() {
        let text = "variables = {}\ntrie = {}\n";
        let err = parse_trie_file(text).unwrap_err();
        assert!(err.to_string().contains("# fin."));
    }

    #[test]
    fn reports_position_of_errors() {
        let err = parse_trie("{\n  \"ab\": {}\n}").unwrap_err();
        match err {
            TrieError::Parse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("not one character"));
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(parse_trie("{$: \"a\", $: \"b\"}").is_err());
        assert!(parse_trie("{\"a\": {}, \"a\": {}}").is_err());
        assert!(parse_trie("{\"a\": {$: \"x\"}").is_err());
        assert!(parse_trie("{} trailing").is_err());
        assert!(parse_trie("{\"a\": {$: \"unterminated}}").is_err());
    }

    #[test]
    fn header_lines_are_numbered_for_body_errors() {
        let text = "# --\n# h\n# --\nvariables = {}\ntrie = {\"ab\": {}}\n# fin.\n";
        match parse_trie_file(text).unwrap_err() {
            TrieError::Parse { line, .. } => assert_eq!(line, 5),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_unterminated_header() {
        assert!(parse_trie_file("# --\n# open\n").is_err());
    }

    #[test]
    fn header_lines_resembling_markers_round_trip() {
        let preamble = Preamble {
            header: vec![
                "# a".into(),
                "# ---".into(),
                "# -- b".into(),
                "#--".into(),
                "# c".into(),
            ],
            variables: vec![("version".into(), "1".into())],
        };
        let trie: Trie = [("小", "small")].into_iter().collect();
        let mut out = Vec::new();
        write_trie_file(&mut out, &preamble, &trie, Format::Readable).unwrap();
        let loaded = parse_trie_file(&String::from_utf8(out).unwrap()).unwrap();
        assert_eq!(loaded.preamble, preamble);
        assert_eq!(loaded.trie, trie);
    }
}
