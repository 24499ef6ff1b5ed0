use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cedict_trie::{Format, Lexer, LexerConfig, Match, Trie, extract_with, serialize};
use cedict_types::Token;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub const DEFAULT_MAX_TEXT_LEN: usize = 4096;

#[derive(Clone)]
pub struct AppState {
    pub trie: Arc<Trie>,
    pub lexer_config: LexerConfig,
    /// Longest accepted `text`, in characters.
    pub max_text_len: usize,
    pub disable_cache: bool,
}

impl AppState {
    pub fn new(trie: Arc<Trie>) -> Self {
        Self {
            trie,
            lexer_config: LexerConfig::default(),
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            disable_cache: false,
        }
    }

    fn lexer(&self) -> Lexer<'_> {
        Lexer::with_config(&self.trie, self.lexer_config.clone())
    }

    /// Validate `text` and return its length in characters.
    fn checked_len(&self, text: &str) -> Result<usize, ApiError> {
        if text.is_empty() {
            return Err(ApiError::bad_request("text is required"));
        }
        let len = text.chars().count();
        if len > self.max_text_len {
            return Err(ApiError::bad_request(format!(
                "text must be at most {} characters",
                self.max_text_len
            )));
        }
        Ok(len)
    }
}

#[derive(Deserialize)]
pub struct TextQuery {
    pub text: String,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub text: String,
    pub start: Option<usize>,
}

#[derive(Deserialize)]
pub struct ExtractQuery {
    pub text: String,
    pub format: Option<String>,
}

#[derive(Serialize)]
pub struct TokenView {
    kind: &'static str,
    word: String,
    entry: String,
    start: usize,
    end: usize,
}

impl From<Token> for TokenView {
    fn from(token: Token) -> Self {
        Self {
            kind: token.kind.as_str(),
            word: token.word,
            entry: token.entry,
            start: token.start,
            end: token.end,
        }
    }
}

#[derive(Serialize)]
pub struct TokenizeResponse {
    text: String,
    tokens: Vec<TokenView>,
}

#[derive(Serialize)]
pub struct MatchView {
    word: String,
    entry: String,
    start: usize,
    end: usize,
}

impl From<Match<'_>> for MatchView {
    fn from(m: Match<'_>) -> Self {
        Self {
            word: m.word,
            entry: m.value.to_string(),
            start: m.start,
            end: m.end,
        }
    }
}

#[derive(Serialize)]
pub struct LookupResponse {
    text: String,
    start: usize,
    #[serde(rename = "match")]
    matched: Option<MatchView>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/tokenize", get(tokenize))
        .route("/v1/lookup", get(lookup))
        .route("/v1/extract", get(extract))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn tokenize(
    State(state): State<AppState>,
    Query(params): Query<TextQuery>,
) -> Result<Response, ApiError> {
    state.checked_len(&params.text)?;
    let tokens = state
        .lexer()
        .tokens(&params.text)
        .map(TokenView::from)
        .collect();
    let response = TokenizeResponse {
        text: params.text,
        tokens,
    };
    Ok(with_cache_headers(&state, Json(response)))
}

async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> Result<Response, ApiError> {
    let len = state.checked_len(&params.text)?;
    let start = params.start.unwrap_or(0);
    if start >= len {
        return Err(ApiError::bad_request(format!(
            "start must be less than the text length ({len})"
        )));
    }
    let matched = state
        .trie
        .lookup_str(&params.text, start)
        .map(MatchView::from);
    let response = LookupResponse {
        text: params.text,
        start,
        matched,
    };
    Ok(with_cache_headers(&state, Json(response)))
}

async fn extract(
    State(state): State<AppState>,
    Query(params): Query<ExtractQuery>,
) -> Result<Response, ApiError> {
    state.checked_len(&params.text)?;
    let format = match params.format.as_deref() {
        Some(name) => name
            .parse::<Format>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => Format::default(),
    };
    let sub = extract_with(&state.lexer(), &params.text);
    let body = serialize(&sub, format).map_err(|e| {
        error!("failed to serialize extracted trie: {e}");
        ApiError::Internal
    })?;
    let text = (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        body,
    );
    Ok(with_cache_headers(&state, text))
}

fn with_cache_headers(state: &AppState, body: impl IntoResponse) -> Response {
    if state.disable_cache {
        return body.into_response();
    }
    (
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=300"),
        )],
        body,
    )
        .into_response()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_len_counts_characters_not_bytes() {
        let mut state = AppState::new(Arc::new(Trie::new()));
        state.max_text_len = 3;
        assert_eq!(state.checked_len("她叫李").unwrap(), 3);
        assert!(matches!(
            state.checked_len("她叫李叶"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(state.checked_len(""), Err(ApiError::BadRequest(_))));
    }
}
