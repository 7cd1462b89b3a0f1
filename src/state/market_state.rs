//! Market data: stock quotes, price history and prediction markets.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A stock quote.
///
/// Identity is the ticker symbol: two quotes for the same symbol compare
/// equal even if their prices differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StockWire", into = "StockWire")]
pub struct Stock {
    /// Ticker symbol.
    pub symbol: String,
    /// Company name (falls back to the symbol).
    pub name: String,
    /// Last price.
    pub price: Decimal,
    /// Absolute change on the day.
    pub change: Decimal,
    /// Percent change on the day.
    pub change_percent: Decimal,
    /// Traded volume.
    pub volume: Decimal,
    /// 52-week high.
    pub high52: Decimal,
    /// 52-week low.
    pub low52: Decimal,
}

impl Stock {
    /// Create a quote with only the required fields set.
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            volume: Decimal::ZERO,
            high52: Decimal::ZERO,
            low52: Decimal::ZERO,
        }
    }

    /// Check if the stock is up on the day.
    pub fn is_up(&self) -> bool {
        self.change >= Decimal::ZERO
    }
}

impl PartialEq for Stock {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Stock {}

impl Hash for Stock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

/// Quote layout as served by `/api/stocks`.
#[derive(Serialize, Deserialize)]
struct StockWire {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    change: Decimal,
    #[serde(
        rename = "changesPercentage",
        default,
        with = "rust_decimal::serde::float"
    )]
    change_percent: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    volume: Decimal,
    #[serde(rename = "yearHigh", default, with = "rust_decimal::serde::float")]
    high52: Decimal,
    #[serde(rename = "yearLow", default, with = "rust_decimal::serde::float")]
    low52: Decimal,
}

impl From<StockWire> for Stock {
    fn from(wire: StockWire) -> Self {
        let name = wire.name.unwrap_or_else(|| wire.symbol.clone());
        Self {
            symbol: wire.symbol,
            name,
            price: wire.price,
            change: wire.change,
            change_percent: wire.change_percent,
            volume: wire.volume,
            high52: wire.high52,
            low52: wire.low52,
        }
    }
}

impl From<Stock> for StockWire {
    fn from(stock: Stock) -> Self {
        Self {
            symbol: stock.symbol,
            name: Some(stock.name),
            price: stock.price,
            change: stock.change,
            change_percent: stock.change_percent,
            volume: stock.volume,
            high52: stock.high52,
            low52: stock.low52,
        }
    }
}

/// Time window for a price history request.
///
/// The server accepts a free-form token; the named variants are the ones
/// it is known to understand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HistoryRange {
    Day,
    Week,
    Month,
    ThreeMonths,
    #[default]
    Year,
    Other(String),
}

impl HistoryRange {
    /// All recognized ranges, shortest first.
    pub const KNOWN: [HistoryRange; 5] = [
        Self::Day,
        Self::Week,
        Self::Month,
        Self::ThreeMonths,
        Self::Year,
    ];

    /// The query token sent to the server.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Day => "1d",
            Self::Week => "1w",
            Self::Month => "1mo",
            Self::ThreeMonths => "3mo",
            Self::Year => "1y",
            Self::Other(token) => token,
        }
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "1d" => Self::Day,
            "1w" => Self::Week,
            "1mo" => Self::Month,
            "3mo" => Self::ThreeMonths,
            "1y" => Self::Year,
            other => Self::Other(other.to_string()),
        })
    }
}

/// A single close in a price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub close: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub volume: Option<Decimal>,
}

impl DataPoint {
    /// Parse the date key, if well formed.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

/// Price series for one symbol. Order is whatever the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    #[serde(default)]
    pub history: Vec<DataPoint>,
}

impl PriceHistory {
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Points ordered by date; unparseable dates sort first.
    pub fn sorted_by_date(&self) -> Vec<&DataPoint> {
        let mut points: Vec<&DataPoint> = self.history.iter().collect();
        points.sort_by_key(|p| p.parsed_date());
        points
    }

    /// Highest and lowest close in the series.
    pub fn close_range(&self) -> Option<(Decimal, Decimal)> {
        let mut closes = self.history.iter().map(|p| p.close);
        let first = closes.next()?;
        Some(closes.fold((first, first), |(lo, hi), c| (lo.min(c), hi.max(c))))
    }
}

/// An event a prediction market belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    #[serde(default)]
    pub slug: Option<String>,
}

/// A prediction market listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionMarket {
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub question: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "volume24hr", default)]
    pub volume_24hr: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub liquidity: Option<Decimal>,
    #[serde(default)]
    pub events: Option<Vec<MarketEvent>>,
    #[serde(default)]
    pub event_slug: Option<String>,
}

const EVENT_BASE_URL: &str = "https://polymarket.com/event/";

impl PredictionMarket {
    /// Slug used for the external event page.
    pub fn external_slug(&self) -> Option<&str> {
        self.event_slug.as_deref().or_else(|| {
            self.events
                .as_ref()
                .and_then(|events| events.first())
                .and_then(|event| event.slug.as_deref())
        })
    }

    /// Link to the market's event page.
    pub fn event_url(&self) -> Option<url::Url> {
        let slug = self.external_slug()?;
        url::Url::parse(EVENT_BASE_URL).ok()?.join(slug).ok()
    }

    /// 24h volume, else lifetime volume, else zero.
    pub fn display_volume(&self) -> Decimal {
        self.volume_24hr.or(self.volume).unwrap_or_default()
    }

    /// Compact dollar volume, e.g. `$1.5M`, `$50K`, `$500`.
    pub fn formatted_volume(&self) -> String {
        let volume = self.display_volume();
        let million = Decimal::from(1_000_000);
        let thousand = Decimal::from(1_000);

        if volume >= million {
            format!("${:.1}M", (volume / million).round_dp(1))
        } else if volume >= thousand {
            format!("${:.0}K", (volume / thousand).round_dp(0))
        } else {
            format!("${:.0}", volume.round_dp(0))
        }
    }
}
