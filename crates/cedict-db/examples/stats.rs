use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cedict_db::{CedictSource, LoadMode};
use cedict_types::Form;

fn main() -> Result<()> {
    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: cargo run -p cedict-db --example stats -- <path-to-cedict_ts.u8>")?;

    let source = CedictSource::load_with_mode(&path, LoadMode::Mmap)
        .with_context(|| format!("loading CC-CEDICT from {}", path.display()))?;

    let mut sense_count = 0usize;
    let mut by_length: BTreeMap<usize, usize> = BTreeMap::new();
    for entry in source.entries() {
        sense_count += entry.senses.len();
        *by_length.entry(entry.simplified.chars().count()).or_default() += 1;
    }

    println!("Dictionary: {}", path.display());
    for (name, value) in source.variables() {
        println!("  {name:<12}: {value}");
    }
    println!("Entries      : {}", source.entry_count());
    println!("Skipped lines: {}", source.skipped_lines());
    println!("Senses       : {}", sense_count);

    for form in [Form::Traditional, Form::Simplified] {
        let trie = source.build_trie(form);
        println!(
            "{form:<11} trie: {} keys, {} nodes",
            trie.len(),
            trie.node_count()
        );
    }

    println!("Headword lengths (simplified):");
    for (len, count) in by_length {
        println!("  {len:>2} chars: {count}");
    }

    Ok(())
}
