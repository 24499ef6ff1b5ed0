use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::http::HeaderName;
use cedict_db::{LoadMode, open_trie};
use cedict_trie::LexerConfig;
use cedict_types::Form;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use cedict_server::rate_limit::RateLimiterLayer;
use cedict_server::{AppState, DEFAULT_MAX_TEXT_LEN, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_CEDICT_FILE: &str = "cedict_ts.u8";
const DEFAULT_CEDICT_IMAGE_FILE: &str = "/app/cedict/cedict_ts.u8";
const DEFAULT_RATE_LIMIT_RPS: u32 = 5;
const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config();
    info!("binding to {}:{}", config.host, config.port);
    info!(
        "using dictionary at {} (form: {}, mode: {:?})",
        config.cedict_file.display(),
        config.form,
        config.load_mode
    );
    if config.disable_cache {
        info!("cache headers disabled");
    }
    info!(
        "rate limit: {} req/s (burst {}) keyed on {}",
        config.rate_limit_rps,
        config.rate_limit_burst,
        config
            .client_header
            .as_ref()
            .map_or("peer address", HeaderName::as_str)
    );

    let start = Instant::now();
    let loaded = open_trie(&config.cedict_file, config.form, config.load_mode)?;
    info!(
        "trie with {} keys ready in {} ms",
        loaded.trie.len(),
        start.elapsed().as_millis()
    );

    let state = AppState {
        trie: Arc::new(loaded.trie),
        lexer_config: config.lexer_config,
        max_text_len: config.max_text_len,
        disable_cache: config.disable_cache,
    };

    let mut rate_limiter = RateLimiterLayer::new(config.rate_limit_rps, config.rate_limit_burst);
    if let Some(header) = config.client_header {
        rate_limiter = rate_limiter.with_client_header(header);
    }
    let app = router(state)
        .layer(rate_limiter)
        .layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    cedict_file: PathBuf,
    form: Form,
    load_mode: LoadMode,
    lexer_config: LexerConfig,
    max_text_len: usize,
    disable_cache: bool,
    rate_limit_rps: u32,
    rate_limit_burst: u32,
    client_header: Option<HeaderName>,
}

fn load_config() -> Config {
    let mut disable_cache = false;
    let mut cli_cedict_file: Option<PathBuf> = None;
    let mut cli_form: Option<Form> = None;
    let mut cli_load_mode: Option<LoadMode> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--no-cache" => disable_cache = true,
            "--cedict-file" => {
                if let Some(path) = args.next() {
                    cli_cedict_file = Some(PathBuf::from(path));
                }
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--cedict-file=") {
                    cli_cedict_file = Some(PathBuf::from(path));
                } else if let Some(form) = arg.strip_prefix("--form=") {
                    cli_form = parse_form(form);
                } else if let Some(mode) = arg.strip_prefix("--load-mode=") {
                    cli_load_mode = LoadMode::parse(mode);
                } else {
                    warn!("ignoring unknown argument {arg}");
                }
            }
        }
    }

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let cedict_file = cli_cedict_file
        .or_else(|| env::var("CEDICT_FILE").ok().map(PathBuf::from))
        .unwrap_or_else(default_cedict_file);
    let form = cli_form
        .or_else(|| env::var("CEDICT_FORM").ok().as_deref().and_then(parse_form))
        .unwrap_or_default();
    let load_mode = cli_load_mode
        .or_else(|| {
            env::var("CEDICT_LOAD_MODE")
                .ok()
                .as_deref()
                .and_then(LoadMode::parse)
        })
        .unwrap_or(LoadMode::Mmap);
    let lexer_config = env::var("CEDICT_PUNCTUATION")
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| LexerConfig::with_punctuation(v.chars()))
        .unwrap_or_default();
    let max_text_len = env::var("MAX_TEXT_LEN")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_TEXT_LEN);
    let rate_limit_rps = env::var("RATE_LIMIT_RPS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_RPS);
    let rate_limit_burst = env::var("RATE_LIMIT_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_BURST);
    let client_header = env::var("CLIENT_IP_HEADER")
        .ok()
        .and_then(|v| HeaderName::try_from(v.trim()).ok());

    Config {
        host,
        port,
        cedict_file,
        form,
        load_mode,
        lexer_config,
        max_text_len,
        disable_cache,
        rate_limit_rps,
        rate_limit_burst,
        client_header,
    }
}

fn default_cedict_file() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CEDICT_FILE);
    if local.exists() {
        return local;
    }
    PathBuf::from(DEFAULT_CEDICT_IMAGE_FILE)
}

fn parse_form(raw: &str) -> Option<Form> {
    raw.parse().ok()
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
