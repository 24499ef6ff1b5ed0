use std::fmt::Write as _;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use cedict_db::{CedictSource, LoadMode, open_trie, save_trie_file};
use cedict_trie::{Format, Lexer, LexerConfig, Match, extract_with, serialize, write_trie_file};
use cedict_types::{Form, Token};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cedict")]
#[command(about = "Segment Chinese text with a CC-CEDICT dictionary trie")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a trie file from a CC-CEDICT source file.
    Build {
        #[arg(long)]
        source: PathBuf,
        #[arg(long, default_value_t = Form::Traditional)]
        form: Form,
        #[arg(long, default_value_t = Format::Readable)]
        format: Format,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print the tokens of TEXT (or stdin), one per line.
    Tokenize {
        #[command(flatten)]
        dict: DictArgs,
        /// Characters to report as punctuation instead of the default set.
        #[arg(long)]
        punctuation: Option<String>,
        /// Print each entry line on its own indented line.
        #[arg(long, default_value_t = false)]
        pretty: bool,
        text: Option<String>,
    },
    /// Print the longest dictionary word starting at a character offset.
    Lookup {
        #[command(flatten)]
        dict: DictArgs,
        #[arg(long, default_value_t = 0)]
        start: usize,
        text: String,
    },
    /// Print the sub-trie needed to tokenize TEXT (or stdin).
    Extract {
        #[command(flatten)]
        dict: DictArgs,
        #[arg(long, default_value_t = Format::Readable)]
        format: Format,
        /// Write a complete trie file, header included.
        #[arg(long, default_value_t = false)]
        with_preamble: bool,
        text: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct DictArgs {
    /// Trie file or CC-CEDICT source file.
    #[arg(long)]
    trie: PathBuf,
    /// Headword form used when `--trie` is a source file.
    #[arg(long, default_value_t = Form::Traditional)]
    form: Form,
    #[arg(long, default_value_t = false)]
    owned: bool,
}

impl DictArgs {
    fn load_mode(&self) -> LoadMode {
        if self.owned {
            LoadMode::Owned
        } else {
            LoadMode::Mmap
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Build {
            source,
            form,
            format,
            output,
        } => build(&source, form, format, &output)?,
        Commands::Tokenize {
            dict,
            punctuation,
            pretty,
            text,
        } => {
            let loaded = open_trie(&dict.trie, dict.form, dict.load_mode())?;
            let config = punctuation
                .map(|chars| LexerConfig::with_punctuation(chars.chars()))
                .unwrap_or_default();
            let lexer = Lexer::with_config(&loaded.trie, config);
            let text = text_or_stdin(text)?;
            out.write_all(render_tokens(lexer.tokens(&text), pretty).as_bytes())?;
        }
        Commands::Lookup { dict, start, text } => {
            let loaded = open_trie(&dict.trie, dict.form, dict.load_mode())?;
            let chars: Vec<char> = text.chars().collect();
            if start >= chars.len() {
                bail!(
                    "start {start} is outside the text ({} characters)",
                    chars.len()
                );
            }
            writeln!(out, "{}", render_match(loaded.trie.lookup(&chars, start)))?;
        }
        Commands::Extract {
            dict,
            format,
            with_preamble,
            text,
        } => {
            let loaded = open_trie(&dict.trie, dict.form, dict.load_mode())?;
            let text = text_or_stdin(text)?;
            let sub = extract_with(&Lexer::new(&loaded.trie), &text);
            info!("extracted {} of {} keys", sub.len(), loaded.trie.len());
            if with_preamble {
                write_trie_file(&mut out, &loaded.preamble, &sub, format)?;
            } else {
                writeln!(out, "{}", serialize(&sub, format)?)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn build(source: &Path, form: Form, format: Format, output: &Path) -> Result<()> {
    let cedict = CedictSource::load(source)
        .with_context(|| format!("loading CC-CEDICT from {}", source.display()))?;
    let trie = cedict.build_trie(form);
    save_trie_file(output, &cedict.preamble(), &trie, format)?;
    println!(
        "Wrote {} keys ({} form, {} format) to {}",
        trie.len(),
        form,
        format,
        output.display()
    );
    Ok(())
}

fn text_or_stdin(text: Option<String>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("read text from stdin")?;
    Ok(buf)
}

fn render_tokens(tokens: impl Iterator<Item = Token>, pretty: bool) -> String {
    let mut rendered = String::new();
    for token in tokens {
        if pretty {
            let _ = writeln!(rendered, "{token}");
            for line in token.entry.lines() {
                let _ = writeln!(rendered, "    {line}");
            }
        } else {
            let _ = writeln!(rendered, "{token}: {}", token.entry.replace('\n', "\\n"));
        }
    }
    rendered
}

fn render_match(found: Option<Match<'_>>) -> String {
    match found {
        Some(m) => format!(
            "{:?} [{}, {}): {}",
            m.word,
            m.start,
            m.end,
            m.value.replace('\n', "\\n")
        ),
        None => "no match".to_string(),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use cedict_trie::{Trie, parse_trie_file};

    fn sample_trie() -> Trie {
        [
            ("她", "她 她 [ta1] /she/"),
            ("李", "李 李 [Li3] /surname Li/"),
            ("李", "李 李 [li3] /plum/"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn parses_tokenize_arguments() {
        let cli = Cli::try_parse_from([
            "cedict",
            "tokenize",
            "--trie",
            "cedict.trie",
            "--form",
            "simplified",
            "--punctuation",
            "，。！",
            "她叫李叶",
        ])
        .unwrap();
        let Commands::Tokenize {
            dict,
            punctuation,
            pretty,
            text,
        } = cli.command
        else {
            panic!("expected tokenize");
        };
        assert_eq!(dict.trie, PathBuf::from("cedict.trie"));
        assert_eq!(dict.form, Form::Simplified);
        assert_eq!(dict.load_mode(), LoadMode::Mmap);
        assert_eq!(punctuation.as_deref(), Some("，。！"));
        assert!(!pretty);
        assert_eq!(text.as_deref(), Some("她叫李叶"));
    }

    #[test]
    fn rejects_unknown_format() {
        let err = Cli::try_parse_from([
            "cedict", "build", "--source", "a.u8", "--format", "yaml", "--output", "a.trie",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("yaml"));
    }

    #[test]
    fn renders_tokens_on_single_lines() {
        let trie = sample_trie();
        let rendered = render_tokens(Lexer::new(&trie).tokens("她李。"), false);
        assert_eq!(
            rendered,
            "Token(\"她\", kind=DICTIONARY, start=0, end=1): 她 她 [ta1] /she/\n\
             Token(\"李\", kind=DICTIONARY, start=1, end=2): 李 李 [Li3] /surname Li/\\n李 李 [li3] /plum/\n\
             Token(\"。\", kind=PUNCTUATION, start=2, end=3): 。 。 [。] /。/\n"
        );
    }

    #[test]
    fn renders_tokens_pretty() {
        let trie = sample_trie();
        let rendered = render_tokens(Lexer::new(&trie).tokens("李"), true);
        assert_eq!(
            rendered,
            "Token(\"李\", kind=DICTIONARY, start=0, end=1)\n    李 李 [Li3] /surname Li/\n    李 李 [li3] /plum/\n"
        );
    }

    #[test]
    fn renders_lookup_results() {
        let trie = sample_trie();
        let chars: Vec<char> = "看她".chars().collect();
        assert_eq!(render_match(trie.lookup(&chars, 0)), "no match");
        assert_eq!(
            render_match(trie.lookup(&chars, 1)),
            "\"她\" [1, 2): 她 她 [ta1] /she/"
        );
    }

    #[test]
    fn build_writes_loadable_trie_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cedict_ts.u8");
        std::fs::write(
            &source,
            "# CC-CEDICT\n#! version=1\n葉 叶 [ye4] /leaf/\n李 李 [li3] /plum/\n",
        )
        .unwrap();
        let output = dir.path().join("cedict.trie");
        build(&source, Form::Simplified, Format::Pretty, &output).unwrap();

        let loaded = parse_trie_file(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(loaded.trie.len(), 2);
        assert!(loaded.trie.contains_key("叶"));
        assert_eq!(loaded.preamble.variable("version"), Some("1"));
    }
}
