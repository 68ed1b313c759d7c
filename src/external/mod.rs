//! Everything that talks to the outside world over HTTP.

pub mod client;
pub mod favor;
pub mod http;
pub mod request_log;

pub use http::{HttpExchange, HttpRequest, HttpResponse, HttpTransport, ResponseMeta, TextEncoding};
pub use request_log::{RequestLog, RequestLogEntry, RequestLogSink};
