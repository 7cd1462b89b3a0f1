//! Opticon API integration.
//!
//! This module provides the typed contract for every remote endpoint
//! ([`Api`]), its reqwest-backed implementation ([`ApiClient`]), the
//! closed failure taxonomy ([`ApiError`]) and the session capability that
//! carries the login cookie between requests ([`SessionStore`]).

mod client;
mod error;
mod session;
mod wire;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::{ApiError, NetworkErrorKind};
pub use session::{CookieSession, SessionStore};

use crate::state::{
    AlertDirection, HistoryRange, Portfolio, PredictionMarket, PriceAlert, PriceHistory, Stock,
    User, WatchlistItem,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Result of a single remote call.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// One method per remote operation; each issues exactly one HTTP request.
///
/// The state manager only ever talks to this trait, so tests can swap in a
/// mock and the transport can change without touching state logic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Api: Send + Sync {
    /// Sign in and start a cookie session.
    async fn login(&self, email: &str, password: &str) -> ApiResult<User>;

    /// Create an account and start a cookie session.
    async fn register(&self, email: &str, password: &str) -> ApiResult<User>;

    /// End the session on the server. The local session is dropped either way.
    async fn logout(&self) -> ApiResult<()>;

    /// Resolve the user behind the stored session, if it is still valid.
    async fn current_session(&self) -> ApiResult<User>;

    async fn list_stocks(&self) -> ApiResult<Vec<Stock>>;

    async fn price_history(&self, symbol: &str, range: &HistoryRange) -> ApiResult<PriceHistory>;

    async fn fetch_portfolio(&self) -> ApiResult<Portfolio>;

    async fn list_watchlist(&self) -> ApiResult<Vec<WatchlistItem>>;

    /// Add a symbol. A symbol already on the list fails with HTTP 409.
    async fn add_watchlist(&self, symbol: &str) -> ApiResult<WatchlistItem>;

    async fn remove_watchlist(&self, symbol: &str) -> ApiResult<()>;

    async fn list_alerts(&self) -> ApiResult<Vec<PriceAlert>>;

    async fn create_alert(
        &self,
        symbol: &str,
        target_price: Decimal,
        direction: AlertDirection,
    ) -> ApiResult<PriceAlert>;

    async fn delete_alert(&self, id: &str) -> ApiResult<()>;

    /// Open prediction markets, highest `order` first.
    async fn list_markets(&self, limit: u32, order: &str) -> ApiResult<Vec<PredictionMarket>>;
}
