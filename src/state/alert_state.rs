//! Price alerts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the target price fires the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Above,
    Below,
}

impl AlertDirection {
    /// Wire token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

impl fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold alert on a symbol's price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: String,
    #[serde(default)]
    pub user_email: Option<String>,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub target_price: Decimal,
    pub direction: AlertDirection,
    pub triggered: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl PriceAlert {
    /// Check if the alert is still armed.
    pub fn is_active(&self) -> bool {
        !self.triggered
    }
}
