//! Canonical textual form of a trie.
//!
//! A node is written as `{` items `}` where the terminal slot is the item
//! `$: "<value>"` and every child is `"<char>": <node>`. Strings use JSON
//! escaping, and `#` starts a comment running to the end of the line.
//!
//! * [`Format::Compact`] is a single unindented line in map order.
//! * [`Format::Readable`] puts the terminal slot first, sorts children by
//!   character, and precedes every value with a `# <headword>` comment.
//! * [`Format::Pretty`] has the same ordering, no comments, and four spaces
//!   of indentation per level.
//!
//! A full trie file wraps the body in a header, a `variables` block and a
//! trailing `# fin.` line; see [`write_trie_file`].

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use tracing::debug;

use crate::TrieError;
use crate::trie::{Trie, TrieNode};

pub(crate) const TERMINAL_KEY: char = '$';
pub(crate) const HEADER_MARKER: &str = "# --";
pub(crate) const FOOTER: &str = "# fin.";
pub(crate) const VARIABLES_NAME: &str = "variables";
pub(crate) const TRIE_NAME: &str = "trie";

const TITLE: &[&str] = &[
    "# CC-CEDICT trie",
    "#",
    "# Generated from the CC-CEDICT text file published by MDBG",
    "#",
    "# Original header of the CC-CEDICT text file:",
];

const INDENT: &str = "    ";

/// Output layout for a serialized trie.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Format {
    Compact,
    #[default]
    Readable,
    Pretty,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Compact => "compact",
            Format::Readable => "readable",
            Format::Pretty => "pretty",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = TrieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" => Ok(Format::Compact),
            "readable" => Ok(Format::Readable),
            "pretty" => Ok(Format::Pretty),
            other => Err(TrieError::FormatUnsupported(other.to_string())),
        }
    }
}

/// Dictionary metadata written ahead of the trie body.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Preamble {
    /// Comment lines copied from the dictionary source.
    pub header: Vec<String>,
    /// `name = value` pairs such as `version`, `license` and `date`.
    pub variables: Vec<(String, String)>,
}

impl Preamble {
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Serialize only the trie body.
pub fn serialize(trie: &Trie, format: Format) -> Result<String, TrieError> {
    let mut buf = Vec::new();
    write_trie(&mut buf, trie, format)?;
    String::from_utf8(buf)
        .map_err(|e| TrieError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Write the trie body to `out`.
pub fn write_trie<W: Write>(out: &mut W, trie: &Trie, format: Format) -> Result<(), TrieError> {
    match format {
        Format::Compact => write_compact(out, trie.root()),
        Format::Readable => write_readable(out, trie.root(), &mut String::new()),
        Format::Pretty => write_pretty(out, trie.root(), 0),
    }
}

/// Write a complete trie file: header, variables, body and footer.
pub fn write_trie_file<W: Write>(
    out: &mut W,
    preamble: &Preamble,
    trie: &Trie,
    format: Format,
) -> Result<(), TrieError> {
    let header = preamble
        .header
        .iter()
        .map(|line| header_line(line))
        .collect::<Result<Vec<_>, _>>()?;

    for line in TITLE {
        writeln!(out, "{line}")?;
    }
    writeln!(out, "{HEADER_MARKER}")?;
    for line in &header {
        writeln!(out, "{line}")?;
    }
    writeln!(out, "{HEADER_MARKER}")?;
    writeln!(out)?;

    writeln!(out, "{VARIABLES_NAME} = {{")?;
    for (i, (name, value)) in preamble.variables.iter().enumerate() {
        if i > 0 {
            writeln!(out, ",")?;
        }
        write!(out, "  ")?;
        write_string(out, name)?;
        write!(out, ": ")?;
        write_string(out, value)?;
    }
    if !preamble.variables.is_empty() {
        writeln!(out)?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;

    write!(out, "{TRIE_NAME} = ")?;
    write_trie(out, trie, format)?;
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "{FOOTER}")?;

    debug!(keys = trie.len(), %format, "wrote trie file");
    Ok(())
}

/// Comment form of a header line. Lines that would end the header block
/// early, or span several lines, cannot be stored.
fn header_line(line: &str) -> Result<Cow<'_, str>, TrieError> {
    if line.contains(['\n', '\r']) {
        return Err(TrieError::HeaderLine(line.to_string()));
    }
    let comment = if line.starts_with('#') {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(format!("# {line}"))
    };
    if comment == HEADER_MARKER {
        return Err(TrieError::HeaderLine(line.to_string()));
    }
    Ok(comment)
}

fn write_string<W: Write>(out: &mut W, s: &str) -> Result<(), TrieError> {
    serde_json::to_writer(&mut *out, s)?;
    Ok(())
}

fn write_key<W: Write>(out: &mut W, ch: char) -> Result<(), TrieError> {
    let mut buf = [0u8; 4];
    write_string(out, ch.encode_utf8(&mut buf))
}

fn write_compact<W: Write>(out: &mut W, node: &TrieNode) -> Result<(), TrieError> {
    write!(out, "{{")?;
    let mut first = true;
    if let Some(value) = node.value() {
        write!(out, "{TERMINAL_KEY}: ")?;
        write_string(out, value)?;
        first = false;
    }
    for (ch, child) in node.children() {
        if !first {
            write!(out, ", ")?;
        }
        write_key(out, ch)?;
        write!(out, ": ")?;
        write_compact(out, child)?;
        first = false;
    }
    write!(out, "}}")?;
    Ok(())
}

fn write_readable<W: Write>(
    out: &mut W,
    node: &TrieNode,
    headword: &mut String,
) -> Result<(), TrieError> {
    write!(out, "{{")?;
    let mut first = true;
    if let Some(value) = node.value() {
        writeln!(out, "{TERMINAL_KEY}:")?;
        writeln!(out, "# {}", headword.escape_debug())?;
        write_string(out, value)?;
        writeln!(out)?;
        first = false;
    }
    for (ch, child) in node.sorted_children() {
        if !first {
            write!(out, ", ")?;
        }
        write_key(out, ch)?;
        write!(out, ": ")?;
        headword.push(ch);
        write_readable(out, child, headword)?;
        headword.pop();
        first = false;
    }
    write!(out, "}}")?;
    Ok(())
}

fn write_pretty<W: Write>(out: &mut W, node: &TrieNode, depth: usize) -> Result<(), TrieError> {
    let pad = INDENT.repeat(depth + 1);
    write!(out, "{{")?;
    let mut items = 0usize;
    if let Some(value) = node.value() {
        write!(out, "\n{pad}{TERMINAL_KEY}: ")?;
        write_string(out, value)?;
        items += 1;
    }
    for (ch, child) in node.sorted_children() {
        if items > 0 {
            write!(out, ",")?;
        }
        write!(out, "\n{pad}")?;
        write_key(out, ch)?;
        write!(out, ": ")?;
        write_pretty(out, child, depth + 1)?;
        items += 1;
    }
    if items > 0 {
        write!(out, "\n{}", INDENT.repeat(depth))?;
    }
    write!(out, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trie() -> Trie {
        [
            ("王子", "王子 王子 [wáng zǐ] /prince/son of a king/"),
            ("王", "王 王 [wáng] /king or monarch/"),
            ("小", "小 小 [xiǎo] /small/tiny/few/young/"),
            ("子", "子 子 [zǐ] /son/child/"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("compact".parse::<Format>().unwrap(), Format::Compact);
        assert_eq!("readable".parse::<Format>().unwrap(), Format::Readable);
        assert_eq!("pretty".parse::<Format>().unwrap(), Format::Pretty);
        let err = "yaml".parse::<Format>().unwrap_err();
        assert!(matches!(err, TrieError::FormatUnsupported(ref name) if name == "yaml"));
    }

    #[test]
    fn readable_orders_terminal_first_and_comments_headwords() {
        let text = serialize(&sample_trie(), Format::Readable).unwrap();
        let expected = concat!(
            "{\"子\": {$:\n",
            "# 子\n",
            "\"子 子 [zǐ] /son/child/\"\n",
            "}, \"小\": {$:\n",
            "# 小\n",
            "\"小 小 [xiǎo] /small/tiny/few/young/\"\n",
            "}, \"王\": {$:\n",
            "# 王\n",
            "\"王 王 [wáng] /king or monarch/\"\n",
            ", \"子\": {$:\n",
            "# 王子\n",
            "\"王子 王子 [wáng zǐ] /prince/son of a king/\"\n",
            "}}}",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn pretty_indents_by_depth() {
        let trie: Trie = [("女孩", "girl"), ("她", "she"), ("女", "woman")]
            .into_iter()
            .collect();
        let text = serialize(&trie, Format::Pretty).unwrap();
        let expected = "{
    \"女\": {
        $: \"woman\",
        \"孩\": {
            $: \"girl\"
        }
    },
    \"她\": {
        $: \"she\"
    }
}";
        assert_eq!(text, expected);
    }

    #[test]
    fn escapes_values() {
        let mut trie = Trie::new();
        trie.insert("的", "的 的 [de] /of; ~'s \"particle\"/");
        trie.insert("的", "second");
        let text = serialize(&trie, Format::Compact).unwrap();
        assert_eq!(
            text,
            "{\"的\": {$: \"的 的 [de] /of; ~'s \\\"particle\\\"/\\nsecond\"}}"
        );
    }

    #[test]
    fn empty_trie_forms() {
        let trie = Trie::new();
        for format in [Format::Compact, Format::Readable, Format::Pretty] {
            assert_eq!(serialize(&trie, format).unwrap(), "{}");
        }
    }

    #[test]
    fn writes_full_file_layout() {
        let preamble = Preamble {
            header: vec!["# CC-CEDICT".into(), "#".into(), "plain line".into()],
            variables: vec![
                ("version".into(), "1".into()),
                ("date".into(), "2023-05-14T06:17:53Z".into()),
            ],
        };
        let trie: Trie = [("小", "small")].into_iter().collect();
        let mut out = Vec::new();
        write_trie_file(&mut out, &preamble, &trie, Format::Pretty).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "# CC-CEDICT trie
#
# Generated from the CC-CEDICT text file published by MDBG
#
# Original header of the CC-CEDICT text file:
# --
# CC-CEDICT
#
# plain line
# --

variables = {
  \"version\": \"1\",
  \"date\": \"2023-05-14T06:17:53Z\"
}

trie = {
    \"小\": {
        $: \"small\"
    }
}

# fin.
";
        assert_eq!(text, expected);
        assert_eq!(preamble.variable("date"), Some("2023-05-14T06:17:53Z"));
        assert_eq!(preamble.variable("missing"), None);
    }

    #[test]
    fn rejects_header_lines_that_would_close_the_block() {
        let trie: Trie = [("小", "small")].into_iter().collect();
        for bad in ["# --", "--", "# a\n# --", "# a\r"] {
            let preamble = Preamble {
                header: vec!["# a".into(), bad.into(), "# b".into()],
                variables: Vec::new(),
            };
            let mut out = Vec::new();
            let err = write_trie_file(&mut out, &preamble, &trie, Format::Readable).unwrap_err();
            assert!(matches!(err, TrieError::HeaderLine(ref line) if line == bad));
            assert!(out.is_empty(), "nothing is written for {bad:?}");
        }
    }
}
