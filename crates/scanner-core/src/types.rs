use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub adj_close: Option<f64>,
}

/// Bar interval an indicator series is computed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Daily,
    Weekly,
}

impl Timeframe {
    /// Interval parameter understood by the chart endpoint
    pub fn interval_param(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1wk",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
        }
    }

    pub fn all() -> Vec<Timeframe> {
        vec![Timeframe::Daily, Timeframe::Weekly]
    }
}

/// Lookback period for a data request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchPeriod {
    SixMonths,
    OneYear,
    TwoYears,
    ThreeYears,
    FiveYears,
    TenYears,
}

impl FetchPeriod {
    /// Range parameter understood by the chart endpoint
    pub fn range_param(&self) -> &'static str {
        match self {
            FetchPeriod::SixMonths => "6mo",
            FetchPeriod::OneYear => "1y",
            FetchPeriod::TwoYears => "2y",
            FetchPeriod::ThreeYears => "3y",
            FetchPeriod::FiveYears => "5y",
            FetchPeriod::TenYears => "10y",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchPeriod::SixMonths => "6 months",
            FetchPeriod::OneYear => "1 year",
            FetchPeriod::TwoYears => "2 years",
            FetchPeriod::ThreeYears => "3 years",
            FetchPeriod::FiveYears => "5 years",
            FetchPeriod::TenYears => "10 years",
        }
    }

    /// Parse a range argument ("6mo", "1y", ... "10y")
    pub fn parse(s: &str) -> Option<FetchPeriod> {
        match s {
            "6mo" => Some(FetchPeriod::SixMonths),
            "1y" => Some(FetchPeriod::OneYear),
            "2y" => Some(FetchPeriod::TwoYears),
            "3y" => Some(FetchPeriod::ThreeYears),
            "5y" => Some(FetchPeriod::FiveYears),
            "10y" => Some(FetchPeriod::TenYears),
            _ => None,
        }
    }

    pub fn all() -> Vec<FetchPeriod> {
        vec![
            FetchPeriod::SixMonths,
            FetchPeriod::OneYear,
            FetchPeriod::TwoYears,
            FetchPeriod::ThreeYears,
            FetchPeriod::FiveYears,
            FetchPeriod::TenYears,
        ]
    }
}

impl Default for FetchPeriod {
    fn default() -> Self {
        FetchPeriod::OneYear
    }
}

/// Market an instrument trades on; drives provider symbol formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    /// B3 listings; chart symbols carry a ".SA" suffix
    Domestic,
    Foreign,
    Crypto,
}

impl Market {
    pub fn symbol_suffix(&self) -> &'static str {
        match self {
            Market::Domestic => ".SA",
            Market::Foreign => "",
            Market::Crypto => "-USD",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Market::Domestic => "domestic",
            Market::Foreign => "foreign",
            Market::Crypto => "crypto",
        }
    }

    pub fn parse(s: &str) -> Option<Market> {
        match s {
            "domestic" => Some(Market::Domestic),
            "foreign" => Some(Market::Foreign),
            "crypto" => Some(Market::Crypto),
            _ => None,
        }
    }
}

/// Instrument category as grouped in the catalog files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetCategory {
    Equity,
    RealEstateFund,
    Etf,
    DepositaryReceipt,
}

impl AssetCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AssetCategory::Equity => "Equity",
            AssetCategory::RealEstateFund => "Real-estate fund",
            AssetCategory::Etf => "ETF",
            AssetCategory::DepositaryReceipt => "Depositary receipt",
        }
    }

    /// Parse a category argument; accepts the common aliases
    pub fn parse(s: &str) -> Option<AssetCategory> {
        match s {
            "equity" | "stock" => Some(AssetCategory::Equity),
            "fund" | "fii" => Some(AssetCategory::RealEstateFund),
            "etf" => Some(AssetCategory::Etf),
            "receipt" | "bdr" => Some(AssetCategory::DepositaryReceipt),
            _ => None,
        }
    }

    pub fn all() -> Vec<AssetCategory> {
        vec![
            AssetCategory::Equity,
            AssetCategory::RealEstateFund,
            AssetCategory::Etf,
            AssetCategory::DepositaryReceipt,
        ]
    }
}

/// A tradable instrument loaded from the asset catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: String,
    pub name: String,
    pub market: Market,
    pub category: AssetCategory,
}

impl Instrument {
    /// Symbol as the chart endpoint expects it (market suffix applied)
    pub fn provider_symbol(&self) -> String {
        let suffix = self.market.symbol_suffix();
        if !suffix.is_empty() && self.ticker.ends_with(suffix) {
            self.ticker.clone()
        } else {
            format!("{}{}", self.ticker, suffix)
        }
    }
}

/// Sign of (mid − fast) on one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl SignalDirection {
    /// Compare the channel midline against the fast average. A tie counts
    /// as neither side.
    pub fn from_levels(mid: f64, fast: f64) -> SignalDirection {
        if mid > fast {
            SignalDirection::Bullish
        } else if mid < fast {
            SignalDirection::Bearish
        } else {
            SignalDirection::Neutral
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            SignalDirection::Bullish => "bullish",
            SignalDirection::Bearish => "bearish",
            SignalDirection::Neutral => "neutral",
        }
    }
}

/// Final per-instrument classification of a scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Wait,
}

impl Signal {
    pub fn to_label(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Wait => "WAIT",
        }
    }
}
