pub mod handlers;
pub mod rate_limit;

pub use handlers::{AppState, DEFAULT_MAX_TEXT_LEN, router};
pub use rate_limit::RateLimiterLayer;
