//! Watchlist entries.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A symbol the user follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub id: String,
    #[serde(default)]
    pub user_email: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub added_at: Option<String>,
}

impl WatchlistItem {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_email: None,
            symbol: symbol.into(),
            added_at: None,
        }
    }
}

/// Set of symbols present in a watchlist.
pub fn symbols(items: &[WatchlistItem]) -> HashSet<&str> {
    items.iter().map(|item| item.symbol.as_str()).collect()
}
