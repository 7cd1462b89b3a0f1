//! Portfolio and holding state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A position in one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    /// Ticker symbol, unique within a portfolio.
    pub symbol: String,
    /// Number of shares held.
    #[serde(with = "rust_decimal::serde::float")]
    pub shares: Decimal,
    /// Average cost per share.
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_cost: Decimal,
    /// Current market price.
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,
}

impl Holding {
    /// Current market value.
    pub fn market_value(&self) -> Decimal {
        self.shares * self.current_price
    }

    /// Total cost basis.
    pub fn cost_basis(&self) -> Decimal {
        self.shares * self.avg_cost
    }

    /// Unrealized gain or loss.
    pub fn gain_loss(&self) -> Decimal {
        (self.current_price - self.avg_cost) * self.shares
    }

    /// Unrealized gain or loss as a percentage of cost basis.
    pub fn gain_loss_percent(&self) -> Decimal {
        let basis = self.cost_basis();
        if basis.is_zero() {
            Decimal::ZERO
        } else {
            (self.gain_loss() / basis) * Decimal::ONE_HUNDRED
        }
    }

    /// Check if position is profitable.
    pub fn is_profitable(&self) -> bool {
        self.gain_loss() > Decimal::ZERO
    }
}

/// The signed-in user's portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub day_change: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub day_change_percent: Decimal,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

impl Portfolio {
    /// Look up a holding by symbol.
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    /// Sum of unrealized gain or loss across holdings.
    pub fn total_gain_loss(&self) -> Decimal {
        self.holdings.iter().map(Holding::gain_loss).sum()
    }

    /// Sum of market value across holdings.
    pub fn holdings_value(&self) -> Decimal {
        self.holdings.iter().map(Holding::market_value).sum()
    }

    /// Holdings currently showing a gain.
    pub fn profitable_holdings(&self) -> Vec<&Holding> {
        self.holdings.iter().filter(|h| h.is_profitable()).collect()
    }

    /// Holdings at or below cost.
    pub fn losing_holdings(&self) -> Vec<&Holding> {
        self.holdings.iter().filter(|h| !h.is_profitable()).collect()
    }
}
