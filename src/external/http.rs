//! One request/response cycle over an abstract transport.

use std::any::type_name;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};
use crate::external::client::{ClientOptions, build_client};
use crate::external::request_log::{RequestLogEntry, RequestLogSink};

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    /// Send through a client with a fresh, isolated cookie jar
    pub capture_cookies: bool,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            capture_cookies: false,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cookie_capture(mut self) -> Self {
        self.capture_cookies = true;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

impl HttpResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
            elapsed: Duration::ZERO,
        }
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a header joined with `", "`, the way multi-valued
    /// headers such as `Set-Cookie` are folded into a single field.
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self.header_values(name).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            status: self.status,
            elapsed: self.elapsed,
        }
    }
}

/// What a cache loader reports about the response behind its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub elapsed: Duration,
}

/// The "perform HTTP request" primitive.
///
/// Implementations return any response the server produced, whatever its
/// status, and fail with [`AppError::Transport`] only when no HTTP response
/// was obtained.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> AppResult<HttpResponse>;
}

/// Transport backed by a pooled reqwest client.
pub struct ReqwestTransport {
    client: reqwest::Client,
    options: ClientOptions,
}

impl ReqwestTransport {
    pub fn new(options: ClientOptions) -> AppResult<Self> {
        let client = build_client(&options, false)?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> AppResult<HttpResponse> {
        let client = if request.capture_cookies {
            build_client(&self.options, true)?
        } else {
            self.client.clone()
        };

        let mut builder = client.request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await.map_err(|e| {
            AppError::transport(
                format!("{} {} request failed: {e}", request.method, request.url),
                Some(e.into()),
            )
        })?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await.map_err(|e| {
            AppError::transport(
                format!("{} {} read body failed: {e}", request.method, request.url),
                Some(e.into()),
            )
        })?;

        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Ascii,
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "us-ascii",
            TextEncoding::Latin1 => "iso-8859-1",
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> AppResult<String> {
        let invalid = || AppError::Encoding {
            encoding: self.as_str(),
        };
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| invalid()),
            TextEncoding::Ascii if bytes.is_ascii() => {
                Ok(bytes.iter().map(|&b| b as char).collect())
            }
            TextEncoding::Ascii => Err(invalid()),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Performs requests, times them, reports them to an optional request log
/// and turns non-2xx answers into [`AppError::HttpStatus`].
pub struct HttpExchange {
    transport: Arc<dyn HttpTransport>,
    log: Option<Arc<dyn RequestLogSink>>,
}

impl HttpExchange {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            log: None,
        }
    }

    pub fn with_log(mut self, log: Arc<dyn RequestLogSink>) -> Self {
        self.log = Some(log);
        self
    }

    pub async fn perform(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        let started = Instant::now();
        let result = self.transport.send(&request).await;
        let elapsed = started.elapsed();

        let mut response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(method = %request.method, url = %request.url, error = %e, "request failed");
                return Err(e);
            }
        };
        response.elapsed = elapsed;

        if let Some(log) = &self.log {
            log.record(RequestLogEntry::new(elapsed, &request, &response));
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );

        if !response.is_success() {
            tracing::warn!(url = %request.url, status = response.status, "unexpected HTTP status");
            return Err(AppError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }

        Ok(response)
    }

    pub async fn perform_text(
        &self,
        request: HttpRequest,
        encoding: TextEncoding,
    ) -> AppResult<(String, HttpResponse)> {
        let response = self.perform(request).await?;
        let text = encoding.decode(&response.body)?;
        Ok((text, response))
    }

    pub async fn perform_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> AppResult<(T, HttpResponse)> {
        let url = request.url.clone();
        let response = self.perform(request).await?;
        let value = serde_json::from_slice::<T>(&response.body).map_err(|e| {
            AppError::decode(
                format!("{} from {url}: {e}", type_name::<T>()),
                Some(e.into()),
            )
        })?;
        Ok((value, response))
    }
}
