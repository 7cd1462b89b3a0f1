//! Reqwest-backed Opticon API client.

use super::error::{ApiError, NetworkErrorKind};
use super::session::{CookieSession, SessionCookies, SessionStore};
use super::wire::{
    ALERTS_PATH, AUTH_PATH, AlertCreate, AuthAction, Credentials, HISTORY_PATH, MARKETS_PATH,
    PORTFOLIO_PATH, STOCKS_PATH, WATCHLIST_PATH, WatchlistAdd,
};
use super::{Api, ApiResult};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::state::{
    AlertDirection, HistoryRange, Portfolio, PredictionMarket, PriceAlert, PriceHistory, Stock,
    User, WatchlistItem,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builder for creating an API client.
pub struct ApiClientBuilder {
    config: ApiConfig,
    session: Option<Arc<dyn SessionStore>>,
}

impl ApiClientBuilder {
    /// Create a new builder with default config.
    pub fn new() -> Self {
        Self {
            config: ApiConfig::default(),
            session: None,
        }
    }

    /// Set the API configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a session store, e.g. one the caller wants to inspect.
    pub fn session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the API client.
    pub fn build(self) -> Result<ApiClient> {
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(CookieSession::new()));
        ApiClient::with_session(self.config, session)
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// High-level API client for Opticon.
#[derive(Debug)]
pub struct ApiClient {
    config: ApiConfig,
    base_url: Url,
    http: Client,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    /// Create a client with a fresh in-memory session.
    pub fn new(config: ApiConfig) -> Result<Self> {
        ApiClientBuilder::new().config(config).build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Create a client around an existing session store.
    pub fn with_session(config: ApiConfig, session: Arc<dyn SessionStore>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("invalid base url {}: {e}", config.base_url)))?;

        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .cookie_provider(Arc::new(SessionCookies(session.clone())))
            .build()?;

        Ok(Self {
            config,
            base_url,
            http,
            session,
        })
    }

    /// Origin all endpoints resolve against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Session store carrying the login cookie.
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::invalid_request(format!("{path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn auth_endpoint(&self, action: AuthAction) -> ApiResult<Url> {
        self.endpoint(AUTH_PATH, &[("action", action.as_str())])
    }

    /// Perform one exchange and return the raw body of a 2xx response.
    ///
    /// Cookies are read from and written to the session store by reqwest.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> ApiResult<String> {
        let request_id = Uuid::new_v4();
        debug!(%method, path = url.path(), %request_id, "sending request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| ApiError::from_transport(&e))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| ApiError::from_body_read(&e))?;
            Ok::<_, ApiError>((status, text))
        };

        let resource_timeout = self.config.resource_timeout();
        let (status, text) = tokio::time::timeout(resource_timeout, exchange)
            .await
            .map_err(|_| {
                ApiError::network(
                    NetworkErrorKind::Timeout,
                    format!("no complete response within {}s", resource_timeout.as_secs()),
                )
            })??;

        debug!(
            %method,
            path = url.path(),
            %request_id,
            status = status.as_u16(),
            "response received"
        );
        if !status.is_success() {
            warn!(%method, path = url.path(), status = status.as_u16(), "request rejected");
            return Err(ApiError::from_status(status, text));
        }
        Ok(text)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let text = self.execute(Method::GET, url, None).await?;
        decode(&text)
    }

    async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> ApiResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| ApiError::invalid_request(format!("unencodable body: {e}")))?;
        let text = self.execute(method, url, Some(payload)).await?;
        decode(&text)
    }

    async fn authenticate(
        &self,
        action: AuthAction,
        email: &str,
        password: &str,
    ) -> ApiResult<User> {
        let url = self.auth_endpoint(action)?;
        let body = Credentials { email, password };
        self.send_json(Method::POST, url, &body).await
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> ApiResult<T> {
    serde_json::from_str(text).map_err(|e| ApiError::decoding(e.to_string()))
}

#[async_trait]
impl Api for ApiClient {
    async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        self.authenticate(AuthAction::Login, email, password).await
    }

    async fn register(&self, email: &str, password: &str) -> ApiResult<User> {
        self.authenticate(AuthAction::Register, email, password).await
    }

    async fn logout(&self) -> ApiResult<()> {
        let url = self.auth_endpoint(AuthAction::Logout)?;
        let result = self.execute(Method::POST, url, None).await.map(|_| ());
        self.session.clear();
        result
    }

    async fn current_session(&self) -> ApiResult<User> {
        let url = self.auth_endpoint(AuthAction::Me)?;
        self.get_json(url).await
    }

    async fn list_stocks(&self) -> ApiResult<Vec<Stock>> {
        let url = self.endpoint(STOCKS_PATH, &[])?;
        self.get_json(url).await
    }

    async fn price_history(&self, symbol: &str, range: &HistoryRange) -> ApiResult<PriceHistory> {
        let query = [("symbol", symbol), ("range", range.as_str())];
        let url = self.endpoint(HISTORY_PATH, &query)?;
        self.get_json(url).await
    }

    async fn fetch_portfolio(&self) -> ApiResult<Portfolio> {
        let url = self.endpoint(PORTFOLIO_PATH, &[("action", "get")])?;
        self.get_json(url).await
    }

    async fn list_watchlist(&self) -> ApiResult<Vec<WatchlistItem>> {
        let url = self.endpoint(WATCHLIST_PATH, &[])?;
        self.get_json(url).await
    }

    async fn add_watchlist(&self, symbol: &str) -> ApiResult<WatchlistItem> {
        let url = self.endpoint(WATCHLIST_PATH, &[])?;
        self.send_json(Method::POST, url, &WatchlistAdd { symbol }).await
    }

    async fn remove_watchlist(&self, symbol: &str) -> ApiResult<()> {
        let url = self.endpoint(WATCHLIST_PATH, &[("symbol", symbol)])?;
        self.execute(Method::DELETE, url, None).await.map(|_| ())
    }

    async fn list_alerts(&self) -> ApiResult<Vec<PriceAlert>> {
        let url = self.endpoint(ALERTS_PATH, &[])?;
        self.get_json(url).await
    }

    async fn create_alert(
        &self,
        symbol: &str,
        target_price: Decimal,
        direction: AlertDirection,
    ) -> ApiResult<PriceAlert> {
        let url = self.endpoint(ALERTS_PATH, &[])?;
        let body = AlertCreate {
            symbol,
            target_price,
            direction,
        };
        self.send_json(Method::POST, url, &body).await
    }

    async fn delete_alert(&self, id: &str) -> ApiResult<()> {
        let url = self.endpoint(ALERTS_PATH, &[("id", id)])?;
        self.execute(Method::DELETE, url, None).await.map(|_| ())
    }

    async fn list_markets(&self, limit: u32, order: &str) -> ApiResult<Vec<PredictionMarket>> {
        let limit = limit.to_string();
        let url = self.endpoint(
            MARKETS_PATH,
            &[
                ("limit", limit.as_str()),
                ("order", order),
                ("closed", "false"),
                ("ascending", "false"),
            ],
        )?;
        self.get_json(url).await
    }
}
