//! Application-level state and the views derived from it.

use super::watchlist_state;
use super::{Portfolio, PredictionMarket, PriceAlert, PriceHistory, Stock, WatchlistItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    None,
    Starter,
    Pro,
    /// A tier this client does not know about yet.
    #[serde(other)]
    Unknown,
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default)]
    pub tier: Option<Tier>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            tier: None,
        }
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }
}

/// Snapshot of everything the client knows.
///
/// Only the [`Store`](super::Store) writes this; readers get clones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    /// Signed-in user, if any.
    pub user: Option<User>,
    /// Whether the login prompt should be shown.
    pub show_login: bool,
    pub stocks: Vec<Stock>,
    pub portfolio: Option<Portfolio>,
    pub watchlist: Vec<WatchlistItem>,
    pub alerts: Vec<PriceAlert>,
    pub markets: Vec<PredictionMarket>,
    /// Most recently fetched price series.
    pub price_history: PriceHistory,
    /// An auth request is in flight.
    pub is_loading: bool,
    /// Last user-visible error message.
    pub error: Option<String>,
}

impl AppState {
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn watchlist_symbols(&self) -> HashSet<&str> {
        watchlist_state::symbols(&self.watchlist)
    }

    pub fn is_in_watchlist(&self, symbol: &str) -> bool {
        self.watchlist.iter().any(|item| item.symbol == symbol)
    }

    /// Stocks on the watchlist, in stock-list order.
    pub fn watchlist_stocks(&self) -> Vec<&Stock> {
        let symbols = self.watchlist_symbols();
        self.stocks
            .iter()
            .filter(|s| symbols.contains(s.symbol.as_str()))
            .collect()
    }

    /// Stocks not on the watchlist, in stock-list order.
    pub fn non_watchlist_stocks(&self) -> Vec<&Stock> {
        let symbols = self.watchlist_symbols();
        self.stocks
            .iter()
            .filter(|s| !symbols.contains(s.symbol.as_str()))
            .collect()
    }

    pub fn active_alerts(&self) -> Vec<&PriceAlert> {
        self.alerts.iter().filter(|a| !a.triggered).collect()
    }

    pub fn triggered_alerts(&self) -> Vec<&PriceAlert> {
        self.alerts.iter().filter(|a| a.triggered).collect()
    }

    /// Stocks whose symbol or name contains `query`, ignoring case.
    pub fn search_stocks(&self, query: &str) -> Vec<&Stock> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.stocks.iter().collect();
        }
        self.stocks
            .iter()
            .filter(|s| {
                s.symbol.to_lowercase().contains(&query) || s.name.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Unrealized gain across all holdings; zero without a portfolio.
    pub fn holdings_total_gain_loss(&self) -> Decimal {
        self.portfolio
            .as_ref()
            .map(Portfolio::total_gain_loss)
            .unwrap_or_default()
    }

    /// Look up a loaded quote.
    pub fn stock(&self, symbol: &str) -> Option<&Stock> {
        self.stocks.iter().find(|s| s.symbol == symbol)
    }
}
