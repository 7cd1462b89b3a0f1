//! Request bodies and endpoint paths.

use crate::state::AlertDirection;
use rust_decimal::Decimal;
use serde::Serialize;

pub(crate) const AUTH_PATH: &str = "/api/auth";
pub(crate) const STOCKS_PATH: &str = "/api/stocks";
pub(crate) const HISTORY_PATH: &str = "/api/history";
pub(crate) const PORTFOLIO_PATH: &str = "/api/portfolio";
pub(crate) const WATCHLIST_PATH: &str = "/api/watchlist";
pub(crate) const ALERTS_PATH: &str = "/api/alerts";
pub(crate) const MARKETS_PATH: &str = "/api/markets";

/// `action` query values understood by the auth endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthAction {
    Login,
    Register,
    Logout,
    Me,
}

impl AuthAction {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::Logout => "logout",
            Self::Me => "me",
        }
    }
}

/// Body for login and register.
#[derive(Debug, Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body for adding a watchlist symbol.
#[derive(Debug, Serialize)]
pub(crate) struct WatchlistAdd<'a> {
    pub symbol: &'a str,
}

/// Body for creating an alert; the price goes out as a JSON number.
#[derive(Debug, Serialize)]
pub(crate) struct AlertCreate<'a> {
    pub symbol: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub target_price: Decimal,
    pub direction: AlertDirection,
}
