//! Load CC-CEDICT dictionaries and persisted tries.
//!
//! [`CedictSource`] reads the published `cedict_ts.u8` text file: its leading
//! comment header, the `#! name=value` variables, and one entry per line.
//! Text is kept in the original buffer (memory-mapped or owned, chosen with
//! [`LoadMode`]) and handed out as borrowed `&str`.
//!
//! A source becomes a [`Trie`] with [`CedictSource::build_trie`]; the trie can
//! be stored with [`save_trie_file`] and read back with [`load_trie_file`].
//! [`open_trie`] accepts either kind of file.
//!
//! # Example
//! ```no_run
//! use cedict_db::{CedictSource, LoadMode};
//! use cedict_trie::tokenize;
//! use cedict_types::Form;
//!
//! # fn main() -> anyhow::Result<()> {
//! let source = CedictSource::load_with_mode("/path/to/cedict_ts.u8", LoadMode::Mmap)?;
//! let trie = source.build_trie(Form::Simplified);
//! for token in tokenize(&trie, "她叫李叶。") {
//!     println!("{token}: {}", token.entry);
//! }
//! # Ok(()) }
//! ```
//!
//! For a runnable demo, see `cargo run -p cedict-db --example stats -- <cedict_ts.u8>`.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use cedict_trie::{Format, Preamble, Trie, TrieFile, parse_trie_file, write_trie_file};
use cedict_types::{CedictEntry, Form, parse_entry_line};
use memmap2::Mmap;
use tracing::{debug, info, warn};

/// First line of every trie file written by [`save_trie_file`].
pub const TRIE_FILE_MAGIC: &str = "# CC-CEDICT trie";

/// Strategy for loading dictionary files.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the file (fast, zero-copy).
    #[default]
    Mmap,
    /// Read the file into an owned buffer (portable fallback).
    Owned,
}

impl LoadMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mmap" => Some(LoadMode::Mmap),
            "owned" => Some(LoadMode::Owned),
            _ => None,
        }
    }
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct TextRef {
    start: usize,
    len: usize,
}

/// A CC-CEDICT source file backed by mmap or an owned buffer.
pub struct CedictSource {
    buffer: Buffer,
    header: Vec<TextRef>,
    variables: Vec<(TextRef, TextRef)>,
    entries: Vec<TextRef>,
    skipped: usize,
}

impl CedictSource {
    /// Load a source file, memory-mapping it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_mode(path, LoadMode::Mmap)
    }

    pub fn load_with_mode(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let buffer = load_file(path, mode)?;
        let mut source = Self {
            buffer,
            header: Vec::new(),
            variables: Vec::new(),
            entries: Vec::new(),
            skipped: 0,
        };
        source
            .index_lines()
            .with_context(|| format!("parse {}", path.display()))?;
        info!(
            "loaded {} entries from {} ({} malformed lines skipped)",
            source.entries.len(),
            path.display(),
            source.skipped
        );
        Ok(source)
    }

    /// Parse a source held in memory, e.g. for tests.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut source = Self {
            buffer: Buffer::Owned(bytes),
            header: Vec::new(),
            variables: Vec::new(),
            entries: Vec::new(),
            skipped: 0,
        };
        source.index_lines()?;
        Ok(source)
    }

    fn index_lines(&mut self) -> Result<()> {
        let bytes = self.buffer.as_slice();
        let mut header = Vec::new();
        let mut variables = Vec::new();
        let mut entries = Vec::new();
        let mut skipped = 0usize;

        for (lineno, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
            let line = strip_cr(raw_line);
            let line_str = std::str::from_utf8(line)
                .with_context(|| format!("line {} is not valid UTF-8", lineno + 1))?;
            if line_str.trim().is_empty() {
                continue;
            }

            if let Some(assignment) = line_str.strip_prefix("#!") {
                match assignment.split_once('=') {
                    Some((name, value)) => variables.push((
                        text_ref_str(bytes, name.trim()),
                        text_ref_str(bytes, value.trim()),
                    )),
                    None => warn!("line {}: variable without '=': {line_str}", lineno + 1),
                }
            } else if line_str.starts_with('#') {
                header.push(text_ref_str(bytes, line_str));
            } else if parse_entry_line(line_str).is_some() {
                entries.push(text_ref_str(bytes, line_str));
            } else {
                warn!("line {}: skipping malformed entry", lineno + 1);
                skipped += 1;
            }
        }

        self.header = header;
        self.variables = variables;
        self.entries = entries;
        self.skipped = skipped;
        Ok(())
    }

    fn text(&self, r: TextRef) -> &str {
        let slice = &self.buffer.as_slice()[r.start..r.start + r.len];
        std::str::from_utf8(slice).expect("source text validated at load")
    }

    /// Comment lines of the source, excluding `#!` variable lines.
    pub fn header(&self) -> Vec<&str> {
        self.header.iter().map(|r| self.text(*r)).collect()
    }

    /// `#! name=value` variables in file order.
    pub fn variables(&self) -> Vec<(&str, &str)> {
        self.variables
            .iter()
            .map(|(name, value)| (self.text(*name), self.text(*value)))
            .collect()
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(n, _)| self.text(*n) == name)
            .map(|(_, value)| self.text(*value))
    }

    /// Parsed entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = CedictEntry<'_>> + '_ {
        self.entries
            .iter()
            .filter_map(|r| parse_entry_line(self.text(*r)))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Non-comment lines that did not parse as entries.
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }

    /// Build a trie keyed by the chosen headword form. The value of each key
    /// is the full entry line; repeated headwords accumulate in file order.
    pub fn build_trie(&self, form: Form) -> Trie {
        let trie: Trie = self
            .entries()
            .map(|entry| (entry.headword(form), entry.raw))
            .collect();
        debug!(
            %form,
            keys = trie.len(),
            nodes = trie.node_count(),
            "built trie"
        );
        trie
    }

    /// Header and variables in the shape stored ahead of a trie body.
    pub fn preamble(&self) -> Preamble {
        Preamble {
            header: self.header().into_iter().map(str::to_string).collect(),
            variables: self
                .variables()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }
}

/// Read a trie file written by [`save_trie_file`].
pub fn load_trie_file(path: impl AsRef<Path>, mode: LoadMode) -> Result<TrieFile> {
    let path = path.as_ref();
    let buffer = load_file(path, mode)?;
    let text = std::str::from_utf8(buffer.as_slice())
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    let file = parse_trie_file(text).with_context(|| format!("parse {}", path.display()))?;
    info!(
        "loaded trie with {} keys from {}",
        file.trie.len(),
        path.display()
    );
    Ok(file)
}

/// Write `trie` with its preamble to `path`, replacing any existing file.
pub fn save_trie_file(
    path: impl AsRef<Path>,
    preamble: &Preamble,
    trie: &Trie,
    format: Format,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_trie_file(&mut out, preamble, trie, format)
        .with_context(|| format!("write {}", path.display()))?;
    out.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    info!(
        "wrote {} trie with {} keys to {}",
        format,
        trie.len(),
        path.display()
    );
    Ok(())
}

/// Open either a trie file or a CC-CEDICT source. Sources are keyed by
/// `form`; trie files keep whatever form they were built with.
pub fn open_trie(path: impl AsRef<Path>, form: Form, mode: LoadMode) -> Result<TrieFile> {
    let path = path.as_ref();
    if is_trie_file(path)? {
        return load_trie_file(path, mode);
    }
    let source = CedictSource::load_with_mode(path, mode)?;
    Ok(TrieFile {
        preamble: source.preamble(),
        trie: source.build_trie(form),
    })
}

fn is_trie_file(path: &Path) -> Result<bool> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut head = [0u8; TRIE_FILE_MAGIC.len()];
    let mut filled = 0;
    while filled < head.len() {
        let n = file
            .read(&mut head[filled..])
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(&head[..filled] == TRIE_FILE_MAGIC.as_bytes())
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

fn text_ref_str(root: &[u8], token: &str) -> TextRef {
    let start = token.as_ptr() as usize - root.as_ptr() as usize;
    TextRef {
        start,
        len: token.len(),
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r") {
        &line[..line.len() - 1]
    } else {
        line
    }
}
