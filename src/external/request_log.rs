//! Passive collector of HTTP exchanges, for inspection while developing.

use std::sync::Mutex;
use std::time::Duration;

use uuid::Uuid;

use crate::external::http::{HttpRequest, HttpResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummary {
    pub method: String,
    pub url: String,
    pub authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSummary {
    pub status: u16,
    pub content_length: usize,
}

#[derive(Debug, Clone)]
pub struct RequestLogEntry {
    pub id: Uuid,
    pub elapsed: Duration,
    pub request: RequestSummary,
    pub response: ResponseSummary,
}

impl RequestLogEntry {
    pub fn new(elapsed: Duration, request: &HttpRequest, response: &HttpResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            elapsed,
            request: RequestSummary {
                method: request.method.to_string(),
                url: request.url.to_string(),
                authenticated: request.header_value("authorization").is_some(),
            },
            response: ResponseSummary {
                status: response.status,
                content_length: response.body.len(),
            },
        }
    }
}

/// Write-only destination for exchange records. Recording never fails the
/// request it describes.
pub trait RequestLogSink: Send + Sync {
    fn record(&self, entry: RequestLogEntry);
}

/// Append-only in-memory log.
#[derive(Debug, Default)]
pub struct RequestLog {
    entries: Mutex<Vec<RequestLogEntry>>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<RequestLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequestLogSink for RequestLog {
    fn record(&self, entry: RequestLogEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(_) => tracing::warn!(url = %entry.request.url, "request log poisoned, entry dropped"),
        }
    }
}
