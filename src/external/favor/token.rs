//! Guest-token bootstrap with single-flight refresh.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use jiff::SignedDuration;
use regex::Regex;
use reqwest::Url;

use crate::cache::Clock;
use crate::error::{AppError, AppResult};
use crate::external::favor::jwt::Token;
use crate::external::http::{HttpExchange, HttpRequest};

static TOKEN_COOKIE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"token=(.*?);").unwrap());

type RefreshFuture = Shared<BoxFuture<'static, Result<Token, Arc<AppError>>>>;

#[derive(Default)]
struct TokenState {
    current: Option<Token>,
    refresh: Option<RefreshFuture>,
}

/// Owns the current bearer token and hands out one that stays valid for at
/// least the configured margin.
///
/// At most one refresh runs at a time; every caller that finds the token
/// stale while a refresh is in flight awaits that same refresh.
pub struct TokenManager {
    exchange: Arc<HttpExchange>,
    token_url: Url,
    margin: SignedDuration,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<TokenState>>,
}

impl TokenManager {
    pub fn new(
        exchange: Arc<HttpExchange>,
        token_url: Url,
        margin: SignedDuration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            exchange,
            token_url,
            margin,
            clock,
            state: Arc::new(Mutex::new(TokenState::default())),
        }
    }

    /// Seeds the manager with a token obtained elsewhere. It is used as long
    /// as its expiry clears the margin.
    pub fn with_token(self, token: Token) -> Self {
        lock(&self.state).current = Some(token);
        self
    }

    pub fn margin(&self) -> SignedDuration {
        self.margin
    }

    pub fn current_token(&self) -> Option<Token> {
        lock(&self.state).current.clone()
    }

    pub async fn ensure_valid_token(&self) -> Result<Token, Arc<AppError>> {
        let refresh = {
            let mut state = lock(&self.state);
            let now = self.clock.now();
            let margin = self.margin;
            if let Some(token) = state.current.as_ref().filter(|t| t.is_valid_for(now, margin)) {
                tracing::debug!(expires_at = ?token.expires_at(), "using cached guest token");
                return Ok(token.clone());
            }

            match &state.refresh {
                Some(refresh) => {
                    tracing::debug!("joining in-flight token refresh");
                    refresh.clone()
                }
                None => {
                    tracing::info!(
                        expires_at = ?state.current.as_ref().and_then(Token::expires_at),
                        "guest token missing or expiring, refreshing"
                    );
                    let refresh = self.start_refresh();
                    state.refresh = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    /// Spawns the refresh so it completes even when every caller stops
    /// awaiting. Must be called with the state lock held.
    fn start_refresh(&self) -> RefreshFuture {
        let exchange = Arc::clone(&self.exchange);
        let url = self.token_url.clone();
        let task_state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(fetch_guest_token(&exchange, url))
                .catch_unwind()
                .await
            {
                Ok(result) => result.map_err(Arc::new),
                Err(_) => Err(Arc::new(AppError::from(anyhow::anyhow!(
                    "token refresh panicked"
                )))),
            };

            let mut state = lock(&task_state);
            match &outcome {
                Ok(token) => state.current = Some(token.clone()),
                Err(e) => tracing::warn!(error = %e, "guest token refresh failed"),
            }
            state.refresh = None;
            outcome
        });

        let state = Arc::clone(&self.state);
        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    lock(&state).refresh = None;
                    Err(Arc::new(AppError::from(anyhow::Error::new(e))))
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn lock(state: &Mutex<TokenState>) -> MutexGuard<'_, TokenState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Requests the provider's web front door through an isolated cookie jar and
/// pulls the guest token out of the combined `Set-Cookie` value.
pub async fn fetch_guest_token(exchange: &HttpExchange, url: Url) -> AppResult<Token> {
    let request = HttpRequest::get(url).with_cookie_capture();
    let response = exchange.perform(request).await?;

    let cookies = response
        .header("set-cookie")
        .ok_or_else(|| AppError::token_extraction("response has no Set-Cookie header"))?;
    let value = extract_token(&cookies)
        .ok_or_else(|| AppError::token_extraction("Set-Cookie has no token= value"))?;

    let token = Token::new(value);
    match token.expires_at() {
        Some(exp) => tracing::info!(expires_at = %exp, "acquired guest token"),
        None => tracing::warn!("guest token has no readable expiry, it will be refreshed on next use"),
    }
    Ok(token)
}

/// First `token=...;` value in a (possibly combined) cookie header.
pub fn extract_token(cookies: &str) -> Option<&str> {
    TOKEN_COOKIE
        .captures(cookies)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}
