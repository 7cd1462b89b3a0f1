//! State management for Opticon.
//!
//! [`Store`] is the only writer of [`AppState`]. Every mutation is an
//! [`Action`] applied by [`AppState::reduce`], so data flows one way:
//! presentation calls a store operation, the store calls the [`Api`], and
//! the outcome comes back as an action.
//!
//! The state lock is never held across a network call. Operations may
//! therefore overlap; when two of them write the same field, the one that
//! completes last wins, regardless of which started first.

mod alert_state;
mod app_state;
mod market_state;
mod portfolio_state;
mod watchlist_state;

pub use alert_state::{AlertDirection, PriceAlert};
pub use app_state::{AppState, Tier, User};
pub use market_state::{DataPoint, HistoryRange, MarketEvent, PredictionMarket, PriceHistory, Stock};
pub use portfolio_state::{Holding, Portfolio};
pub use watchlist_state::WatchlistItem;

use crate::api::{Api, ApiError};
use crate::config::ApiConfig;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Actions that can be applied to modify state.
#[derive(Debug, Clone)]
pub enum Action {
    // Session
    SessionRestored(Option<User>),
    AuthStarted,
    LoggedIn(User),
    AuthFinished,
    LoggedOut,
    ShowLogin(bool),

    // Market data
    StocksLoaded(Vec<Stock>),
    PriceHistoryLoaded(PriceHistory),
    MarketsLoaded(Vec<PredictionMarket>),

    // Portfolio
    PortfolioLoaded(Portfolio),

    // Watchlist
    WatchlistLoaded(Vec<WatchlistItem>),
    WatchlistItemAdded(WatchlistItem),
    WatchlistSymbolRemoved(String),

    // Alerts
    AlertsLoaded(Vec<PriceAlert>),
    AlertCreated(PriceAlert),
    AlertDeleted(String),

    // Error handling
    SetError(String),
    ClearError,
}

impl AppState {
    /// Apply an action to update state.
    pub fn reduce(&mut self, action: Action) {
        match action {
            // Session
            Action::SessionRestored(user) => self.user = user,
            Action::AuthStarted => {
                self.is_loading = true;
                self.error = None;
            }
            Action::LoggedIn(user) => {
                self.user = Some(user);
                self.show_login = false;
            }
            Action::AuthFinished => self.is_loading = false,
            Action::LoggedOut => {
                self.user = None;
                self.portfolio = None;
                self.watchlist.clear();
                self.alerts.clear();
            }
            Action::ShowLogin(show) => self.show_login = show,

            // Market data
            Action::StocksLoaded(stocks) => self.stocks = stocks,
            Action::PriceHistoryLoaded(history) => self.price_history = history,
            Action::MarketsLoaded(markets) => self.markets = markets,

            // Portfolio
            Action::PortfolioLoaded(portfolio) => self.portfolio = Some(portfolio),

            // Watchlist
            Action::WatchlistLoaded(items) => self.watchlist = items,
            Action::WatchlistItemAdded(item) => self.watchlist.push(item),
            Action::WatchlistSymbolRemoved(symbol) => {
                self.watchlist.retain(|item| item.symbol != symbol);
            }

            // Alerts
            Action::AlertsLoaded(alerts) => self.alerts = alerts,
            Action::AlertCreated(alert) => self.alerts.push(alert),
            Action::AlertDeleted(id) => self.alerts.retain(|a| a.id != id),

            // Error handling
            Action::SetError(error) => self.error = Some(error),
            Action::ClearError => self.error = None,
        }
    }
}

/// The single owner of application state.
///
/// Cheap to clone; clones share the same state and API handle. Every
/// operation records failures in [`AppState::error`] instead of returning
/// them.
#[derive(Clone)]
pub struct Store {
    api: Arc<dyn Api>,
    state: Arc<RwLock<AppState>>,
    markets_limit: u32,
    markets_order: String,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("markets_limit", &self.markets_limit)
            .field("markets_order", &self.markets_order)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Create a store with default market listing parameters.
    pub fn new(api: Arc<dyn Api>) -> Self {
        Self::with_config(api, &ApiConfig::default())
    }

    /// Create a store taking market listing parameters from `config`.
    pub fn with_config(api: Arc<dyn Api>, config: &ApiConfig) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(AppState::default())),
            markets_limit: config.markets_limit,
            markets_order: config.markets_order.clone(),
        }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    /// Compute a view from the current state without cloning it.
    pub async fn read<R>(&self, view: impl FnOnce(&AppState) -> R) -> R {
        view(&*self.state.read().await)
    }

    pub async fn is_logged_in(&self) -> bool {
        self.read(AppState::is_logged_in).await
    }

    async fn reduce(&self, action: Action) {
        self.state.write().await.reduce(action);
    }

    async fn fail(&self, operation: &'static str, err: ApiError) {
        warn!(operation, error = %err, "operation failed");
        self.reduce(Action::SetError(err.to_string())).await;
    }

    /// Short-circuits protected operations before any network call.
    async fn signed_in(&self, operation: &'static str) -> bool {
        let signed_in = self.is_logged_in().await;
        if !signed_in {
            debug!(operation, "skipped: not signed in");
        }
        signed_in
    }

    // Session

    /// Restore a session from an existing cookie. Failure means "no session".
    pub async fn check_session(&self) {
        match self.api.current_session().await {
            Ok(user) => {
                info!(email = %user.email, "session restored");
                self.reduce(Action::SessionRestored(Some(user))).await;
            }
            Err(err) => {
                debug!(error = %err, "no active session");
                self.reduce(Action::SessionRestored(None)).await;
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) {
        self.reduce(Action::AuthStarted).await;
        let result = self.api.login(email, password).await;
        self.finish_auth("login", result).await;
    }

    pub async fn register(&self, email: &str, password: &str) {
        self.reduce(Action::AuthStarted).await;
        let result = self.api.register(email, password).await;
        self.finish_auth("register", result).await;
    }

    async fn finish_auth(&self, operation: &'static str, result: Result<User, ApiError>) {
        match result {
            Ok(user) => {
                info!(email = %user.email, operation, "signed in");
                self.reduce(Action::LoggedIn(user)).await;
            }
            Err(err) => self.fail(operation, err).await,
        }
        self.reduce(Action::AuthFinished).await;
    }

    /// Sign out. Local state is cleared even if the server call fails.
    pub async fn logout(&self) {
        if let Err(err) = self.api.logout().await {
            debug!(error = %err, "remote logout failed; clearing local session anyway");
        }
        self.reduce(Action::LoggedOut).await;
        info!("signed out");
    }

    /// Ask the presentation layer to show the login prompt.
    pub async fn request_login(&self) {
        self.reduce(Action::ShowLogin(true)).await;
    }

    /// Close the login prompt and drop any error it was showing.
    pub async fn dismiss_login(&self) {
        self.reduce(Action::ShowLogin(false)).await;
        self.reduce(Action::ClearError).await;
    }

    pub async fn clear_error(&self) {
        self.reduce(Action::ClearError).await;
    }

    // Market data

    pub async fn load_stocks(&self) {
        match self.api.list_stocks().await {
            Ok(stocks) => self.reduce(Action::StocksLoaded(stocks)).await,
            Err(err) => self.fail("load_stocks", err).await,
        }
    }

    /// Replace the price series. On failure the previous series stays.
    pub async fn fetch_price_history(&self, symbol: &str, range: HistoryRange) {
        match self.api.price_history(symbol, &range).await {
            Ok(history) => self.reduce(Action::PriceHistoryLoaded(history)).await,
            Err(err) => self.fail("fetch_price_history", err).await,
        }
    }

    pub async fn load_markets(&self) {
        match self
            .api
            .list_markets(self.markets_limit, &self.markets_order)
            .await
        {
            Ok(markets) => self.reduce(Action::MarketsLoaded(markets)).await,
            Err(err) => self.fail("load_markets", err).await,
        }
    }

    // Portfolio

    pub async fn load_portfolio(&self) {
        if !self.signed_in("load_portfolio").await {
            return;
        }
        match self.api.fetch_portfolio().await {
            Ok(portfolio) => self.reduce(Action::PortfolioLoaded(portfolio)).await,
            Err(err) => self.fail("load_portfolio", err).await,
        }
    }

    // Watchlist

    pub async fn load_watchlist(&self) {
        if !self.signed_in("load_watchlist").await {
            return;
        }
        match self.api.list_watchlist().await {
            Ok(items) => self.reduce(Action::WatchlistLoaded(items)).await,
            Err(err) => self.fail("load_watchlist", err).await,
        }
    }

    /// Add a symbol. A symbol the server already has is not an error.
    pub async fn add_watchlist_symbol(&self, symbol: &str) {
        if !self.signed_in("add_watchlist_symbol").await {
            return;
        }
        match self.api.add_watchlist(symbol).await {
            Ok(item) => self.reduce(Action::WatchlistItemAdded(item)).await,
            Err(err) if err.is_conflict() => {
                debug!(symbol, "already on watchlist");
            }
            Err(err) => self.fail("add_watchlist_symbol", err).await,
        }
    }

    pub async fn remove_watchlist_symbol(&self, symbol: &str) {
        if !self.signed_in("remove_watchlist_symbol").await {
            return;
        }
        match self.api.remove_watchlist(symbol).await {
            Ok(()) => {
                self.reduce(Action::WatchlistSymbolRemoved(symbol.to_string()))
                    .await
            }
            Err(err) => self.fail("remove_watchlist_symbol", err).await,
        }
    }

    // Alerts

    pub async fn load_alerts(&self) {
        if !self.signed_in("load_alerts").await {
            return;
        }
        match self.api.list_alerts().await {
            Ok(alerts) => self.reduce(Action::AlertsLoaded(alerts)).await,
            Err(err) => self.fail("load_alerts", err).await,
        }
    }

    pub async fn create_alert(
        &self,
        symbol: &str,
        target_price: Decimal,
        direction: AlertDirection,
    ) {
        if !self.signed_in("create_alert").await {
            return;
        }
        match self.api.create_alert(symbol, target_price, direction).await {
            Ok(alert) => self.reduce(Action::AlertCreated(alert)).await,
            Err(err) => self.fail("create_alert", err).await,
        }
    }

    pub async fn delete_alert(&self, id: &str) {
        if !self.signed_in("delete_alert").await {
            return;
        }
        match self.api.delete_alert(id).await {
            Ok(()) => self.reduce(Action::AlertDeleted(id.to_string())).await,
            Err(err) => self.fail("delete_alert", err).await,
        }
    }

    // Data refresh

    /// Reload everything concurrently. Protected collections are only
    /// fetched when signed in.
    pub async fn refresh_all(&self) {
        futures::join!(
            self.load_stocks(),
            self.load_markets(),
            self.load_portfolio(),
            self.load_watchlist(),
            self.load_alerts(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResult, MockApi, NetworkErrorKind};
    use async_trait::async_trait;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn user() -> User {
        User::new("test@example.com").with_tier(Tier::Pro)
    }

    fn stocks(symbols: &[&str]) -> Vec<Stock> {
        symbols
            .iter()
            .map(|s| Stock::new(*s, *s, dec!(100)))
            .collect()
    }

    fn alert(id: &str, symbol: &str) -> PriceAlert {
        PriceAlert {
            id: id.to_string(),
            user_email: None,
            symbol: symbol.to_string(),
            target_price: dec!(250),
            direction: AlertDirection::Above,
            triggered: false,
            created_at: None,
        }
    }

    fn portfolio() -> Portfolio {
        Portfolio {
            total_value: dec!(10000),
            day_change: dec!(100),
            day_change_percent: dec!(1),
            holdings: vec![],
        }
    }

    fn network_down() -> ApiError {
        ApiError::network(NetworkErrorKind::NoConnectivity, "offline")
    }

    fn store(api: MockApi) -> Store {
        Store::new(Arc::new(api))
    }

    async fn signed_in_store(api: MockApi) -> Store {
        let store = store(api);
        store.reduce(Action::LoggedIn(user())).await;
        store
    }

    /// State a signed-in user typically has after a full load.
    async fn populated_store(api: MockApi) -> Store {
        let store = signed_in_store(api).await;
        store.reduce(Action::PortfolioLoaded(portfolio())).await;
        store.reduce(Action::WatchlistLoaded(vec![WatchlistItem::new("1", "AAPL")])).await;
        store.reduce(Action::AlertsLoaded(vec![alert("1", "AAPL")])).await;
        store
    }

    async fn assert_logged_out(store: &Store) {
        let state = store.snapshot().await;
        assert!(state.user.is_none());
        assert!(!state.is_logged_in());
        assert!(state.portfolio.is_none());
        assert!(state.watchlist.is_empty());
        assert!(state.alerts.is_empty());
    }

    // Session

    #[tokio::test]
    async fn test_check_session_restores_user() {
        let mut api = MockApi::new();
        api.expect_current_session().times(1).returning(|| Ok(user()));

        let store = store(api);
        store.check_session().await;

        let state = store.snapshot().await;
        assert_eq!(state.user, Some(user()));
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_check_session_failure_is_silent() {
        let mut api = MockApi::new();
        api.expect_current_session()
            .returning(|| Err(ApiError::Unauthorized));

        let store = signed_in_store(api).await;
        store.check_session().await;

        let state = store.snapshot().await;
        assert!(state.user.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut api = MockApi::new();
        api.expect_login()
            .withf(|email, password| email == "test@example.com" && password == "secret")
            .times(1)
            .returning(|_, _| Ok(user()));

        let store = store(api);
        store.request_login().await;
        store.reduce(Action::SetError("stale".to_string())).await;
        store.login("test@example.com", "secret").await;

        let state = store.snapshot().await;
        assert_eq!(state.user, Some(user()));
        assert!(!state.show_login);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_login_failure_keeps_user_and_sets_error() {
        let mut api = MockApi::new();
        api.expect_login().returning(|_, _| Err(ApiError::Unauthorized));

        let store = store(api);
        store.request_login().await;
        store.login("test@example.com", "wrong").await;

        let state = store.snapshot().await;
        assert!(state.user.is_none());
        assert!(state.show_login);
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("Not authenticated"));
    }

    #[tokio::test]
    async fn test_register_uses_register_endpoint() {
        let mut api = MockApi::new();
        api.expect_login().never();
        api.expect_register()
            .times(1)
            .returning(|email, _| Ok(User::new(email)));

        let store = store(api);
        store.register("new@example.com", "secret").await;

        let state = store.snapshot().await;
        assert_eq!(state.user, Some(User::new("new@example.com")));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_register_failure_sets_http_message() {
        let mut api = MockApi::new();
        api.expect_register().returning(|_, _| {
            Err(ApiError::Http {
                status: 400,
                body: "email taken".to_string(),
            })
        });

        let store = store(api);
        store.register("taken@example.com", "secret").await;

        let state = store.snapshot().await;
        assert!(state.user.is_none());
        assert_eq!(state.error.as_deref(), Some("HTTP 400: email taken"));
    }

    #[tokio::test]
    async fn test_logout_clears_state_when_remote_succeeds() {
        let mut api = MockApi::new();
        api.expect_logout().times(1).returning(|| Ok(()));

        let store = populated_store(api).await;
        store.logout().await;

        assert_logged_out(&store).await;
    }

    #[tokio::test]
    async fn test_logout_clears_state_when_remote_fails() {
        let mut api = MockApi::new();
        api.expect_logout().times(1).returning(|| Err(network_down()));

        let store = populated_store(api).await;
        store.logout().await;

        assert_logged_out(&store).await;
        assert!(store.snapshot().await.error.is_none());
    }

    #[tokio::test]
    async fn test_logged_in_flips_once_per_login_logout() {
        let mut api = MockApi::new();
        let mut seq = Sequence::new();
        api.expect_login()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(user()));
        api.expect_logout()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        let store = store(api);
        assert!(!store.is_logged_in().await);
        store.login("test@example.com", "secret").await;
        assert!(store.is_logged_in().await);
        store.logout().await;
        assert!(!store.is_logged_in().await);
    }

    // Auth guards

    #[tokio::test]
    async fn test_protected_operations_skip_network_when_signed_out() {
        let mut api = MockApi::new();
        api.expect_fetch_portfolio().never();
        api.expect_list_watchlist().never();
        api.expect_list_alerts().never();
        api.expect_add_watchlist().never();
        api.expect_remove_watchlist().never();
        api.expect_create_alert().never();
        api.expect_delete_alert().never();

        let store = store(api);
        store.reduce(Action::WatchlistLoaded(vec![WatchlistItem::new("1", "AAPL")])).await;
        store.reduce(Action::AlertsLoaded(vec![alert("1", "AAPL")])).await;
        let before = store.snapshot().await;

        store.load_portfolio().await;
        store.load_watchlist().await;
        store.load_alerts().await;
        store.add_watchlist_symbol("NVDA").await;
        store.remove_watchlist_symbol("AAPL").await;
        store.create_alert("AAPL", dec!(250), AlertDirection::Above).await;
        store.delete_alert("1").await;

        assert_eq!(store.snapshot().await, before);
    }

    // Market data

    #[tokio::test]
    async fn test_load_stocks_is_idempotent() {
        let mut api = MockApi::new();
        api.expect_list_stocks()
            .times(2)
            .returning(|| Ok(stocks(&["AAPL", "MSFT", "NVDA"])));

        let store = store(api);
        store.load_stocks().await;
        let first = store.snapshot().await.stocks;
        store.load_stocks().await;
        let second = store.snapshot().await.stocks;

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.price, b.price);
        }
    }

    #[tokio::test]
    async fn test_load_stocks_failure_keeps_previous() {
        let mut api = MockApi::new();
        let mut seq = Sequence::new();
        api.expect_list_stocks()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(stocks(&["AAPL"])));
        api.expect_list_stocks()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(ApiError::decoding("missing field `price`")));

        let store = store(api);
        store.load_stocks().await;
        store.load_stocks().await;

        let state = store.snapshot().await;
        assert_eq!(state.stocks, stocks(&["AAPL"]));
        assert_eq!(
            state.error.as_deref(),
            Some("Decode error: missing field `price`")
        );
    }

    #[tokio::test]
    async fn test_success_does_not_clear_error() {
        let mut api = MockApi::new();
        api.expect_list_stocks().returning(|| Ok(stocks(&["AAPL"])));

        let store = store(api);
        store.reduce(Action::SetError("earlier failure".to_string())).await;
        store.load_stocks().await;
        assert_eq!(
            store.snapshot().await.error.as_deref(),
            Some("earlier failure")
        );

        store.clear_error().await;
        assert!(store.snapshot().await.error.is_none());
    }

    #[tokio::test]
    async fn test_last_error_overwrites_previous() {
        let mut api = MockApi::new();
        api.expect_list_stocks().returning(|| Err(network_down()));
        api.expect_list_markets().returning(|_, _| {
            Err(ApiError::Http {
                status: 503,
                body: "maintenance".to_string(),
            })
        });

        let store = store(api);
        store.load_stocks().await;
        store.load_markets().await;
        assert_eq!(
            store.snapshot().await.error.as_deref(),
            Some("HTTP 503: maintenance")
        );
    }

    #[tokio::test]
    async fn test_fetch_price_history_replaces_and_keeps_stale_on_failure() {
        let history = PriceHistory {
            history: vec![DataPoint {
                date: "2026-01-01".to_string(),
                close: dec!(250),
                volume: None,
            }],
        };

        let mut api = MockApi::new();
        let mut seq = Sequence::new();
        let first = history.clone();
        api.expect_price_history()
            .withf(|symbol, range| symbol == "AAPL" && *range == HistoryRange::Month)
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| Ok(first.clone()));
        api.expect_price_history()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(ApiError::network(NetworkErrorKind::Timeout, "timed out")));

        let store = store(api);
        store.fetch_price_history("AAPL", HistoryRange::Month).await;
        assert_eq!(store.snapshot().await.price_history, history);

        store.fetch_price_history("MSFT", HistoryRange::Year).await;
        let state = store.snapshot().await;
        assert_eq!(state.price_history, history);
        assert_eq!(state.error.as_deref(), Some("Network error: timed out"));
    }

    #[tokio::test]
    async fn test_load_markets_uses_configured_listing() {
        let mut api = MockApi::new();
        api.expect_list_markets()
            .withf(|limit, order| *limit == 10 && order == "liquidity")
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    serde_json::from_str(r#"{"id": "m1", "question": "Q?"}"#).unwrap(),
                ])
            });

        let config = ApiConfig {
            markets_limit: 10,
            markets_order: "liquidity".to_string(),
            ..ApiConfig::default()
        };
        let store = Store::with_config(Arc::new(api), &config);
        store.load_markets().await;

        let state = store.snapshot().await;
        assert_eq!(state.markets.len(), 1);
        assert_eq!(state.markets[0].id, "m1");
    }

    // Portfolio, watchlist, alerts

    #[tokio::test]
    async fn test_load_protected_collections_when_signed_in() {
        let mut api = MockApi::new();
        api.expect_fetch_portfolio()
            .times(1)
            .returning(|| Ok(portfolio()));
        api.expect_list_watchlist()
            .times(1)
            .returning(|| Ok(vec![WatchlistItem::new("1", "NVDA")]));
        api.expect_list_alerts()
            .times(1)
            .returning(|| Ok(vec![alert("7", "TSLA")]));

        let store = signed_in_store(api).await;
        store.load_portfolio().await;
        store.load_watchlist().await;
        store.load_alerts().await;

        let state = store.snapshot().await;
        assert_eq!(state.portfolio, Some(portfolio()));
        assert!(state.is_in_watchlist("NVDA"));
        assert_eq!(state.alerts, vec![alert("7", "TSLA")]);
    }

    #[tokio::test]
    async fn test_load_portfolio_failure_sets_error() {
        let mut api = MockApi::new();
        api.expect_fetch_portfolio()
            .returning(|| Err(ApiError::Unauthorized));

        let store = signed_in_store(api).await;
        store.load_portfolio().await;

        let state = store.snapshot().await;
        assert!(state.portfolio.is_none());
        assert_eq!(state.error.as_deref(), Some("Not authenticated"));
    }

    #[tokio::test]
    async fn test_add_watchlist_appends_item() {
        let mut api = MockApi::new();
        api.expect_add_watchlist()
            .withf(|symbol| symbol == "NVDA")
            .times(1)
            .returning(|symbol| Ok(WatchlistItem::new("2", symbol)));

        let store = signed_in_store(api).await;
        store.reduce(Action::WatchlistLoaded(vec![WatchlistItem::new("1", "AAPL")])).await;
        store.add_watchlist_symbol("NVDA").await;

        let state = store.snapshot().await;
        assert_eq!(
            state.watchlist,
            vec![WatchlistItem::new("1", "AAPL"), WatchlistItem::new("2", "NVDA")]
        );
    }

    #[tokio::test]
    async fn test_add_watchlist_conflict_is_silent() {
        let mut api = MockApi::new();
        api.expect_add_watchlist().times(1).returning(|_| {
            Err(ApiError::Http {
                status: 409,
                body: "already in watchlist".to_string(),
            })
        });

        let store = signed_in_store(api).await;
        store.reduce(Action::WatchlistLoaded(vec![WatchlistItem::new("1", "AAPL")])).await;
        let before = store.snapshot().await;
        store.add_watchlist_symbol("AAPL").await;

        let after = store.snapshot().await;
        assert_eq!(after.watchlist, before.watchlist);
        assert!(after.error.is_none());
    }

    #[tokio::test]
    async fn test_add_watchlist_other_failure_sets_error() {
        let mut api = MockApi::new();
        api.expect_add_watchlist().returning(|_| Err(network_down()));

        let store = signed_in_store(api).await;
        store.add_watchlist_symbol("AAPL").await;

        let state = store.snapshot().await;
        assert!(state.watchlist.is_empty());
        assert_eq!(state.error.as_deref(), Some("Network error: offline"));
    }

    #[tokio::test]
    async fn test_remove_watchlist_drops_all_matching() {
        let mut api = MockApi::new();
        api.expect_remove_watchlist()
            .withf(|symbol| symbol == "AAPL")
            .times(1)
            .returning(|_| Ok(()));

        let store = signed_in_store(api).await;
        store
            .reduce(Action::WatchlistLoaded(vec![
                WatchlistItem::new("1", "AAPL"),
                WatchlistItem::new("2", "MSFT"),
                WatchlistItem::new("3", "AAPL"),
            ]))
            .await;
        store.remove_watchlist_symbol("AAPL").await;

        assert_eq!(
            store.snapshot().await.watchlist,
            vec![WatchlistItem::new("2", "MSFT")]
        );
    }

    #[tokio::test]
    async fn test_remove_watchlist_failure_leaves_list() {
        let mut api = MockApi::new();
        api.expect_remove_watchlist()
            .returning(|_| Err(ApiError::Http {
                status: 500,
                body: "boom".to_string(),
            }));

        let store = signed_in_store(api).await;
        store.reduce(Action::WatchlistLoaded(vec![WatchlistItem::new("1", "AAPL")])).await;
        store.remove_watchlist_symbol("AAPL").await;

        let state = store.snapshot().await;
        assert_eq!(state.watchlist.len(), 1);
        assert_eq!(state.error.as_deref(), Some("HTTP 500: boom"));
    }

    #[tokio::test]
    async fn test_create_and_delete_alert() {
        let mut api = MockApi::new();
        api.expect_create_alert()
            .withf(|symbol, price, direction| {
                symbol == "NVDA" && *price == dec!(150) && *direction == AlertDirection::Below
            })
            .times(1)
            .returning(|symbol, price, direction| {
                Ok(PriceAlert {
                    id: "9".to_string(),
                    user_email: Some("test@example.com".to_string()),
                    symbol: symbol.to_string(),
                    target_price: price,
                    direction,
                    triggered: false,
                    created_at: None,
                })
            });
        api.expect_delete_alert()
            .withf(|id| id == "1")
            .times(1)
            .returning(|_| Ok(()));

        let store = signed_in_store(api).await;
        store.reduce(Action::AlertsLoaded(vec![alert("1", "AAPL")])).await;
        store.create_alert("NVDA", dec!(150), AlertDirection::Below).await;
        store.delete_alert("1").await;

        let state = store.snapshot().await;
        assert_eq!(state.alerts.len(), 1);
        assert_eq!(state.alerts[0].id, "9");
        assert_eq!(state.active_alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_alert_failure_leaves_alerts() {
        let mut api = MockApi::new();
        api.expect_delete_alert().returning(|_| Err(network_down()));

        let store = signed_in_store(api).await;
        store.reduce(Action::AlertsLoaded(vec![alert("1", "AAPL")])).await;
        store.delete_alert("1").await;

        let state = store.snapshot().await;
        assert_eq!(state.alerts, vec![alert("1", "AAPL")]);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_dismiss_login_clears_prompt_and_error() {
        let store = store(MockApi::new());
        store.request_login().await;
        store.reduce(Action::SetError("bad".to_string())).await;
        store.dismiss_login().await;

        let state = store.snapshot().await;
        assert!(!state.show_login);
        assert!(state.error.is_none());
    }

    // Data refresh

    #[tokio::test]
    async fn test_refresh_all_signed_out_loads_public_data_only() {
        let mut api = MockApi::new();
        api.expect_list_stocks()
            .times(1)
            .returning(|| Ok(stocks(&["AAPL"])));
        api.expect_list_markets().times(1).returning(|_, _| Ok(vec![]));
        api.expect_fetch_portfolio().never();
        api.expect_list_watchlist().never();
        api.expect_list_alerts().never();

        let store = store(api);
        store.refresh_all().await;
        assert_eq!(store.snapshot().await.stocks.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_all_signed_in_loads_everything() {
        let mut api = MockApi::new();
        api.expect_list_stocks()
            .times(1)
            .returning(|| Ok(stocks(&["AAPL", "MSFT"])));
        api.expect_list_markets().times(1).returning(|_, _| Ok(vec![]));
        api.expect_fetch_portfolio()
            .times(1)
            .returning(|| Ok(portfolio()));
        api.expect_list_watchlist()
            .times(1)
            .returning(|| Ok(vec![WatchlistItem::new("1", "MSFT")]));
        api.expect_list_alerts().times(1).returning(|| Ok(vec![]));

        let store = signed_in_store(api).await;
        store.refresh_all().await;

        let state = store.snapshot().await;
        assert!(state.portfolio.is_some());
        let watched: Vec<&str> = state
            .watchlist_stocks()
            .iter()
            .map(|s| s.symbol.as_str())
            .collect();
        assert_eq!(watched, vec!["MSFT"]);
    }

    // Overlapping calls

    /// Api whose `list_stocks` calls resolve when the test says so.
    #[derive(Default)]
    struct GatedApi {
        pending: Mutex<VecDeque<oneshot::Receiver<Vec<Stock>>>>,
    }

    fn unused<T>() -> ApiResult<T> {
        Err(ApiError::invalid_request("not used in this test"))
    }

    #[async_trait]
    impl Api for GatedApi {
        async fn login(&self, _: &str, _: &str) -> ApiResult<User> {
            unused()
        }
        async fn register(&self, _: &str, _: &str) -> ApiResult<User> {
            unused()
        }
        async fn logout(&self) -> ApiResult<()> {
            unused()
        }
        async fn current_session(&self) -> ApiResult<User> {
            unused()
        }
        async fn list_stocks(&self) -> ApiResult<Vec<Stock>> {
            let gate = self.pending.lock().unwrap().pop_front();
            match gate {
                Some(rx) => rx.await.map_err(|_| {
                    ApiError::network(NetworkErrorKind::ConnectionLost, "gate dropped")
                }),
                None => unused(),
            }
        }
        async fn price_history(&self, _: &str, _: &HistoryRange) -> ApiResult<PriceHistory> {
            unused()
        }
        async fn fetch_portfolio(&self) -> ApiResult<Portfolio> {
            unused()
        }
        async fn list_watchlist(&self) -> ApiResult<Vec<WatchlistItem>> {
            unused()
        }
        async fn add_watchlist(&self, _: &str) -> ApiResult<WatchlistItem> {
            unused()
        }
        async fn remove_watchlist(&self, _: &str) -> ApiResult<()> {
            unused()
        }
        async fn list_alerts(&self) -> ApiResult<Vec<PriceAlert>> {
            unused()
        }
        async fn create_alert(
            &self,
            _: &str,
            _: Decimal,
            _: AlertDirection,
        ) -> ApiResult<PriceAlert> {
            unused()
        }
        async fn delete_alert(&self, _: &str) -> ApiResult<()> {
            unused()
        }
        async fn list_markets(&self, _: u32, _: &str) -> ApiResult<Vec<PredictionMarket>> {
            unused()
        }
    }

    #[tokio::test]
    async fn test_overlapping_loads_last_to_complete_wins() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let api = GatedApi::default();
        api.pending.lock().unwrap().extend([first_rx, second_rx]);

        let store = Store::new(Arc::new(api));
        let release = async {
            tokio::task::yield_now().await;
            second_tx.send(stocks(&["MSFT"])).unwrap();
            tokio::task::yield_now().await;
            first_tx.send(stocks(&["AAPL"])).unwrap();
        };

        futures::join!(store.load_stocks(), store.load_stocks(), release);

        assert_eq!(store.snapshot().await.stocks, stocks(&["AAPL"]));
    }
}
