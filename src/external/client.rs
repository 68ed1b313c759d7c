use std::time::Duration;

use crate::config::settings::ApiConfig;
use crate::error::{AppError, AppResult};

/// Desktop Chrome on macOS, sent on every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// Connection settings shared by every client this crate builds.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl ClientOptions {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout),
            connect_timeout: Duration::from_secs(config.connect_timeout),
            user_agent: config.user_agent.clone(),
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Builds a reqwest client.
///
/// With `cookie_store` set the client gets its own empty cookie jar, so the
/// `Set-Cookie` values of one response are never mixed with an earlier one.
///
/// # Features
/// - **Compression**: gzip, deflate, brotli and zstd
/// - **HTTP/2**: adaptive window sizing and keep-alive
/// - **Security**: Rustls for TLS (no OpenSSL dependency)
pub fn build_client(options: &ClientOptions, cookie_store: bool) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        // Timeouts
        .timeout(options.timeout)
        .connect_timeout(options.connect_timeout)
        // Connection pooling
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        // HTTP/2 settings
        .http2_adaptive_window(true)
        .http2_keep_alive_interval(Duration::from_secs(10))
        .http2_keep_alive_timeout(Duration::from_secs(20))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .zstd(true)
        .use_rustls_tls()
        .cookie_store(cookie_store)
        .user_agent(options.user_agent.as_str())
        .build()
        .map_err(|e| AppError::transport(format!("failed to build HTTP client: {e}"), Some(e.into())))
}
