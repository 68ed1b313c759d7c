use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use super::jwt::Token;
use super::token::TokenManager;
use super::types::{Browse, Category, GeoLocation, MenuOverview, MenuUrl};
use crate::cache::{Clock, FetchResult, FetchState, Fetched, ResourceCache, SystemClock};
use crate::config::settings::{ApiConfig, Settings};
use crate::error::{AppError, AppResult};
use crate::external::client::ClientOptions;
use crate::external::http::{HttpExchange, HttpRequest, ReqwestTransport};
use crate::external::request_log::RequestLogSink;

const BROWSE_PATH: &str = "/page-layouts/v2/browse";
const COLLECTION_PATH: &str = "/page-layouts/v2/filters/collection";
const MENU_HYDRATION_PATH: &str = "/menu-hydration/public/v2";
const CATEGORY_PAGE_SIZE: u32 = 100;
const SECTION_ITEM_LIMIT: u32 = 100;

/// Key of the single browse resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BrowseKey;

/// Everything a loader needs, shared with the spawned fetch tasks.
struct ApiContext {
    exchange: Arc<HttpExchange>,
    tokens: TokenManager,
    base_url: Url,
    location: GeoLocation,
    user_agent: String,
}

/// Caching, request-deduplicating client for the Favor catalog API.
///
/// Each resource (browse page, cuisine category, merchant menu) is served
/// from cache for the configured TTL; concurrent requests for the same key
/// share one fetch, and the guest token is refreshed at most once at a time.
pub struct FavorClient {
    api: Arc<ApiContext>,
    browse: ResourceCache<BrowseKey, Browse>,
    categories: ResourceCache<String, Category>,
    menus: ResourceCache<u64, MenuOverview>,
}

impl FavorClient {
    /// Client over HTTPS with the wall clock.
    pub fn new(settings: &Settings) -> AppResult<Self> {
        Self::with_request_log(settings, None)
    }

    pub fn with_request_log(
        settings: &Settings,
        log: Option<Arc<dyn RequestLogSink>>,
    ) -> AppResult<Self> {
        let transport = ReqwestTransport::new(ClientOptions::from_config(&settings.api))?;
        let mut exchange = HttpExchange::new(Arc::new(transport));
        if let Some(log) = log {
            exchange = exchange.with_log(log);
        }
        Self::from_parts(
            &settings.api,
            settings.location.geo(),
            Arc::new(exchange),
            Arc::new(SystemClock),
        )
    }

    /// Assembles a client from an existing exchange and clock.
    pub fn from_parts(
        config: &ApiConfig,
        location: GeoLocation,
        exchange: Arc<HttpExchange>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let base_url = parse_url(&config.base_url)?;
        let token_url = parse_url(&config.token_url)?;

        let mut tokens = TokenManager::new(
            Arc::clone(&exchange),
            token_url,
            config.token_refresh_margin(),
            Arc::clone(&clock),
        );
        if let Some(seed) = &config.token {
            tokens = tokens.with_token(Token::new(seed.as_str()));
        }

        let ttl = config.cache_ttl();
        Ok(Self {
            api: Arc::new(ApiContext {
                exchange,
                tokens,
                base_url,
                location,
                user_agent: config.user_agent.clone(),
            }),
            browse: ResourceCache::new("browse", ttl, Arc::clone(&clock)),
            categories: ResourceCache::new("category", ttl, Arc::clone(&clock)),
            menus: ResourceCache::new("menu", ttl, clock),
        })
    }

    pub fn location(&self) -> GeoLocation {
        self.api.location
    }

    /// A token valid beyond the refresh margin, fetched only if needed.
    pub async fn ensure_valid_token(&self) -> Result<Token, Arc<AppError>> {
        self.api.tokens.ensure_valid_token().await
    }

    /// Categories, filters and home page sections.
    pub async fn fetch_browse_if_needed(&self) -> FetchResult<Browse> {
        let api = Arc::clone(&self.api);
        self.browse
            .fetch_if_needed(BrowseKey, move || async move { api.get_browse().await })
            .await
    }

    /// Merchants of one cuisine, e.g. `"pizza"`.
    pub async fn fetch_category_if_needed(&self, category_id: &str) -> FetchResult<Category> {
        let api = Arc::clone(&self.api);
        let id = category_id.to_string();
        self.categories
            .fetch_if_needed(category_id.to_string(), move || async move {
                api.get_category(&id).await
            })
            .await
    }

    /// Full menu of a merchant. A miss costs two requests: the menu URL
    /// lookup, then the overview it points to.
    pub async fn fetch_menu_if_needed(&self, merchant_id: u64) -> FetchResult<MenuOverview> {
        let api = Arc::clone(&self.api);
        self.menus
            .fetch_if_needed(merchant_id, move || async move {
                api.get_menu(merchant_id).await
            })
            .await
    }

    pub fn browse_state(&self) -> FetchState<Browse> {
        self.browse.state(&BrowseKey)
    }

    pub fn category_state(&self, category_id: &str) -> FetchState<Category> {
        self.categories.state(&category_id.to_string())
    }

    pub fn menu_state(&self, merchant_id: u64) -> FetchState<MenuOverview> {
        self.menus.state(&merchant_id)
    }

    pub fn subscribe_browse(&self) -> watch::Receiver<FetchState<Browse>> {
        self.browse.subscribe(BrowseKey)
    }

    pub fn subscribe_category(&self, category_id: &str) -> watch::Receiver<FetchState<Category>> {
        self.categories.subscribe(category_id.to_string())
    }

    pub fn subscribe_menu(&self, merchant_id: u64) -> watch::Receiver<FetchState<MenuOverview>> {
        self.menus.subscribe(merchant_id)
    }
}

impl ApiContext {
    async fn get_browse(&self) -> Result<Fetched<Browse>, Arc<AppError>> {
        let token = self.tokens.ensure_valid_token().await?;
        let url = self.api_url(BROWSE_PATH, &self.location_query())?;
        Ok(self.get_json(url, &token).await?)
    }

    async fn get_category(&self, id: &str) -> Result<Fetched<Category>, Arc<AppError>> {
        let token = self.tokens.ensure_valid_token().await?;
        let mut query = vec![
            ("page", "1".to_string()),
            ("page_size", CATEGORY_PAGE_SIZE.to_string()),
            ("cuisine", id.to_string()),
        ];
        query.extend(self.location_query());
        let url = self.api_url(COLLECTION_PATH, &query)?;
        Ok(self.get_json(url, &token).await?)
    }

    async fn get_menu(&self, merchant_id: u64) -> Result<Fetched<MenuOverview>, Arc<AppError>> {
        let token = self.tokens.ensure_valid_token().await?;

        let url = self.api_url(
            &format!("{MENU_HYDRATION_PATH}/locations/{merchant_id}/menu_url"),
            &[("publication_type", "PUBLISHED".to_string())],
        )?;
        let menu_url: Fetched<MenuUrl> = self.get_json(url, &token).await?;
        tracing::debug!(merchant_id, subpath = %menu_url.content.menu_url, "resolved menu url");

        let subpath = menu_url.content.menu_url.trim_matches('/');
        let url = self.api_url(
            &format!("{MENU_HYDRATION_PATH}/{subpath}/overview"),
            &[("section_item_limit", SECTION_ITEM_LIMIT.to_string())],
        )?;
        Ok(self.get_json(url, &token).await?)
    }

    fn location_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("lat", self.location.latitude.to_string()),
            ("lng", self.location.longitude.to_string()),
        ]
    }

    fn api_url(&self, path: &str, query: &[(&str, String)]) -> AppResult<Url> {
        let mut url = self.base_url.join(path).map_err(|_| AppError::BadUrl {
            base: self.base_url.to_string(),
            path: path.to_string(),
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, token: &Token) -> AppResult<Fetched<T>> {
        let request = HttpRequest::get(url)
            .header("Authorization", format!("JWT {}", token.value()))
            .header("User-Agent", self.user_agent.as_str());
        let (content, response) = self.exchange.perform_json::<T>(request).await?;
        Ok(Fetched {
            content,
            response: response.meta(),
        })
    }
}

fn parse_url(value: &str) -> AppResult<Url> {
    Url::parse(value).map_err(|_| AppError::BadUrl {
        base: value.to_string(),
        path: String::new(),
    })
}
