use thiserror::Error;

/// Every failure a fetch, a token refresh or a request build can produce.
///
/// None of these are fatal to the process: a failure is local to one cache
/// entry or one token refresh attempt, and the next fetch retries.
#[derive(Error, Debug)]
pub enum AppError {
    /// No HTTP response was obtained (DNS, TLS, socket, timeout, ...)
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The server answered outside 200-299; the body is kept for diagnostics
    #[error("HTTP status {status}: {}", body_preview(.body))]
    HttpStatus { status: u16, body: Vec<u8> },

    /// The body did not match the expected payload shape
    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The body is not valid text under the requested encoding
    #[error("Body is not valid {encoding} text")]
    Encoding { encoding: &'static str },

    /// The guest token bootstrap response carried no usable token cookie
    #[error("Token extraction failed: {reason}")]
    TokenExtraction { reason: String },

    /// A request URL could not be built from the base URL and path
    #[error("Bad URL: {path} relative to {base}")]
    BadUrl { base: String, path: String },

    /// Internal error for unexpected failures (e.g. a panicked fetch task)
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn transport(message: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::Transport {
            message: message.into(),
            source,
        }
    }

    pub fn decode(message: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::Decode {
            message: message.into(),
            source,
        }
    }

    pub fn token_extraction(reason: impl Into<String>) -> Self {
        Self::TokenExtraction {
            reason: reason.into(),
        }
    }

    /// HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

fn body_preview(body: &[u8]) -> String {
    const MAX: usize = 200;
    let text = String::from_utf8_lossy(body);
    if text.chars().count() > MAX {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        text.into_owned()
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
