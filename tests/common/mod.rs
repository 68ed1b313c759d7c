//! Scripted transport and fixtures for client integration tests
//!
//! Routes are matched on the request path only, so the token front door
//! (`/`) and the API endpoints can share one transport.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jiff::Timestamp;
use serde_json::{Value, json};

use favor_rs::cache::ManualClock;
use favor_rs::config::ApiConfig;
use favor_rs::error::{AppError, AppResult};
use favor_rs::external::favor::{FavorClient, GeoLocation};
use favor_rs::external::{HttpExchange, HttpRequest, HttpResponse, HttpTransport, RequestLog};

pub const T0: i64 = 1_700_000_000;
pub const TOKEN_PATH: &str = "/";
pub const BROWSE_PATH: &str = "/page-layouts/v2/browse";
pub const COLLECTION_PATH: &str = "/page-layouts/v2/filters/collection";
pub const MENU_URL_PATH: &str = "/menu-hydration/public/v2/locations/10370/menu_url";
pub const MENU_OVERVIEW_PATH: &str = "/menu-hydration/public/v2/locations/10370/menu/4yhZd9QI/overview";

/// In-memory transport answering from a path -> response table
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, HttpResponse>>,
    /// Every request seen, in order
    requests: Mutex<Vec<HttpRequest>>,
    delay: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::from_millis(20),
        }
    }

    /// How long each response takes; keeps fetches in flight long enough
    /// for concurrent callers to pile up
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn route(self, path: &str, response: HttpResponse) -> Self {
        self.set_route(path, response);
        self
    }

    pub fn set_route(&self, path: &str, response: HttpResponse) {
        self.routes.lock().unwrap().insert(path.to_string(), response);
    }

    pub fn json_route(self, path: &str, body: Value) -> Self {
        self.route(path, json_response(200, body))
    }

    pub fn calls(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> AppResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;

        let path = request.url.path();
        self.routes
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::transport(format!("no route for {path}"), None))
    }
}

pub fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(
        status,
        vec![("Content-Type".to_string(), "application/json".to_string())],
        body.to_string().into_bytes(),
    )
}

/// Unsigned JWT whose payload carries `exp`
pub fn fake_jwt(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"guest","exp":{exp}}}"#));
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// Front door response: a session cookie and the token cookie, as two
/// separate `Set-Cookie` headers
pub fn token_response(jwt: &str) -> HttpResponse {
    HttpResponse::new(
        200,
        vec![
            ("Set-Cookie".to_string(), "session=s3ss10n; Path=/; HttpOnly".to_string()),
            ("Set-Cookie".to_string(), format!("token={jwt}; Path=/; Secure")),
        ],
        b"<html></html>".to_vec(),
    )
}

pub fn merchant(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "franchise_id": 1,
        "name": name,
        "is_open": true,
        "image_url": "https://img.example/merchant.png",
        "distance_display_string": "0.8 mi",
        "delivery_fee": {
            "display_delivery_fee": "$2.99",
            "strike_through_fee": null,
            "is_loyalty": false,
            "text_color": "#333333"
        },
        "origin_tracking": {},
        "badge": null,
        "rating": 4.7
    })
}

fn browse_category(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "slug": id,
        "category_pinned": false,
        "category_pinned_date": null,
        "icon_url": format!("https://img.example/{id}.svg"),
        "images": {
            "search_icon": "",
            "hero_image": "",
            "card_image": "",
            "card_mobile_image": ""
        }
    })
}

/// Browse payload with `pizza` and `burgers`, one known carousel and one
/// section layout the client does not understand
pub fn browse_body() -> Value {
    json!({
        "categories": [browse_category("pizza", "Pizza"), browse_category("burgers", "Burgers")],
        "filters": [],
        "sections": [
            { "layout": "video_carousel", "videos": ["a", "b"] },
            {
                "layout": "merchant_carousel",
                "title": "Popular near you",
                "merchants": [merchant(10370, "Tacodeli"), merchant(2210, "Home Slice")]
            }
        ],
        "is_empty": false
    })
}

pub fn category_body(title: &str) -> Value {
    json!({
        "title": title,
        "merchants": [merchant(2210, "Home Slice")],
        "layout": "list",
        "pagination": { "page_size": 100, "page": 1, "total": 1 }
    })
}

pub fn menu_url_body() -> Value {
    json!({ "menu_url": "/locations/10370/menu/4yhZd9QI" })
}

pub fn menu_overview_body() -> Value {
    json!({
        "id": 10370,
        "menu_items": [
            {
                "base_price": 399, "id": "taco-1", "is_quantifiable": true, "name": "Don Juan",
                "price": 399, "min_item_display_price": 399, "sub_menu_ids": ["all-day"]
            }
        ],
        "sub_menus": [
            {
                "id": "all-day",
                "name": "All Day",
                "sections": [
                    { "id": "tacos", "name": "Tacos", "item_count": 1, "menu_items": ["taco-1"] }
                ]
            }
        ]
    })
}

/// Transport with every endpoint answering; the token expires a day after T0
pub fn full_transport() -> ScriptedTransport {
    ScriptedTransport::new()
        .route(TOKEN_PATH, token_response(&fake_jwt(T0 + 86_400)))
        .json_route(BROWSE_PATH, browse_body())
        .json_route(COLLECTION_PATH, category_body("Pizza"))
        .json_route(MENU_URL_PATH, menu_url_body())
        .json_route(MENU_OVERVIEW_PATH, menu_overview_body())
}

pub struct Harness {
    pub client: FavorClient,
    pub transport: Arc<ScriptedTransport>,
    pub clock: Arc<ManualClock>,
    pub log: Arc<RequestLog>,
}

pub fn harness(transport: ScriptedTransport) -> Harness {
    harness_with(transport, ApiConfig::default())
}

pub fn harness_with(transport: ScriptedTransport, config: ApiConfig) -> Harness {
    let transport = Arc::new(transport);
    let clock = Arc::new(ManualClock::new(Timestamp::from_second(T0).unwrap()));
    let log = Arc::new(RequestLog::new());
    let exchange = HttpExchange::new(transport.clone()).with_log(log.clone());

    let client =
        FavorClient::from_parts(&config, GeoLocation::FAVOR_HQ, Arc::new(exchange), clock.clone())
            .unwrap();

    Harness {
        client,
        transport,
        clock,
        log,
    }
}
