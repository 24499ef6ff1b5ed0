use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request, Response, StatusCode};
use axum::response::IntoResponse;
use dashmap::DashMap;
use tower::{Layer, Service};
use tracing::{debug, warn};

const LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Bucket key for requests with neither a trusted header nor a peer address.
const UNIDENTIFIED_CLIENT: &str = "unidentified";

#[derive(Clone)]
pub struct RateLimiter<S> {
    inner: S,
    state: Arc<SharedState>,
    client_header: Option<HeaderName>,
    rate_per_sec: f64,
    burst: f64,
}

struct SharedState {
    buckets: DashMap<String, Bucket>,
    dropped_since_log: AtomicU64,
    last_sweep: Mutex<Instant>,
}

impl SharedState {
    fn new(now: Instant) -> Self {
        Self {
            buckets: DashMap::new(),
            dropped_since_log: AtomicU64::new(0),
            last_sweep: Mutex::new(now),
        }
    }

    /// Drop buckets that have refilled completely; a fresh bucket behaves the
    /// same, so evicting them loses nothing.
    fn evict_idle(&self, now: Instant, rate_per_sec: f64, burst: f64) {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| !bucket.is_full_at(now, rate_per_sec, burst));
        let evicted = before.saturating_sub(self.buckets.len());
        if evicted > 0 {
            debug!("rate limiter evicted {evicted} idle clients");
        }
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(burst: f64, now: Instant) -> Self {
        Self {
            tokens: burst,
            last_refill: now,
        }
    }

    /// Refill for the time elapsed since the last call, then take one token
    /// if available.
    fn try_take(&mut self, now: Instant, rate_per_sec: f64, burst: f64) -> bool {
        let elapsed = now
            .saturating_duration_since(self.last_refill)
            .as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * rate_per_sec).min(burst);
            self.last_refill = now;
        }
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_full_at(&self, now: Instant, rate_per_sec: f64, burst: f64) -> bool {
        let elapsed = now
            .saturating_duration_since(self.last_refill)
            .as_secs_f64();
        self.tokens + elapsed * rate_per_sec >= burst
    }
}

/// Per-client token-bucket limiter shared by every route it wraps.
///
/// Clients are keyed by peer address, which requires serving with
/// `into_make_service_with_connect_info::<SocketAddr>()`. A trusted proxy
/// header can be configured instead; its first comma-separated value is the
/// client. Requests that carry neither share one bucket.
#[derive(Clone)]
pub struct RateLimiterLayer {
    state: Arc<SharedState>,
    client_header: Option<HeaderName>,
    rate_per_sec: f64,
    burst: f64,
}

impl RateLimiterLayer {
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        Self {
            state: Arc::new(SharedState::new(Instant::now())),
            client_header: None,
            rate_per_sec: rate_per_sec as f64,
            burst: burst as f64,
        }
    }

    /// Key clients on `header`, set by a proxy in front of the service.
    pub fn with_client_header(mut self, header: HeaderName) -> Self {
        self.client_header = Some(header);
        self
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            state: Arc::clone(&self.state),
            client_header: self.client_header.clone(),
            rate_per_sec: self.rate_per_sec,
            burst: self.burst,
        }
    }
}

impl<S, ReqBody> Service<Request<ReqBody>> for RateLimiter<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let now = Instant::now();
        let client_id = self.client_id(&req);
        let allowed = self.check_and_consume(&client_id, now);
        if !allowed {
            self.state.dropped_since_log.fetch_add(1, Ordering::Relaxed);
        }
        self.sweep_if_due(now);
        if !allowed {
            return Box::pin(async move {
                Ok((StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response())
            });
        }

        let fut = self.inner.call(req);
        Box::pin(fut)
    }
}

impl<S> RateLimiter<S> {
    fn client_id<B>(&self, req: &Request<B>) -> String {
        if let Some(header) = &self.client_header
            && let Some(client) = req
                .headers()
                .get(header)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        {
            return client.to_string();
        }
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNIDENTIFIED_CLIENT.to_string())
    }

    fn check_and_consume(&self, client: &str, now: Instant) -> bool {
        let mut entry = self
            .state
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| Bucket::full(self.burst, now));
        entry.try_take(now, self.rate_per_sec, self.burst)
    }

    /// Once a minute: report drops and evict idle buckets.
    fn sweep_if_due(&self, now: Instant) {
        let Ok(mut last) = self.state.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last) < LOG_INTERVAL {
            return;
        }
        *last = now;
        drop(last);

        let dropped = self.state.dropped_since_log.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!("rate limiter dropped {dropped} requests in the last minute");
        }
        self.state.evict_idle(now, self.rate_per_sec, self.burst);
    }
}
