use serde::{Deserialize, Serialize};

use crate::channel::defined;

pub const MONTHLY_WINDOW: usize = 21;
pub const QUARTERLY_WINDOW: usize = 63;
pub const ANNUAL_WINDOW: usize = 252;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized historical volatility in percent, from the rolling sample
/// standard deviation of log returns. Index-aligned with the closes; the
/// first `window` entries are undefined (one extra bar feeds the first
/// return).
pub fn historical_volatility(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if window < 2 || closes.len() < window + 1 {
        return result;
    }

    for i in window..closes.len() {
        let returns: Vec<f64> = (i + 1 - window..=i)
            .map(|j| (closes[j] / closes[j - 1]).ln())
            .collect();
        result[i] = defined(sample_std(&returns) * TRADING_DAYS_PER_YEAR.sqrt() * 100.0);
    }
    result
}

/// Volatility at the newest bar
pub fn latest_volatility(closes: &[f64], window: usize) -> Option<f64> {
    historical_volatility(closes, window).last().copied().flatten()
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

pub const TREND_SHORT_WINDOW: usize = 50;
pub const TREND_LONG_WINDOW: usize = 200;

/// Long-term trend read from SMA(50) against SMA(200)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

impl Trend {
    pub fn to_label(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Sideways => "sideways",
        }
    }
}

/// Trend at the newest bar. Less history than the long window reads as
/// sideways, as does an exact tie.
pub fn detect_trend(closes: &[f64]) -> Trend {
    if closes.len() < TREND_LONG_WINDOW {
        return Trend::Sideways;
    }

    let short = tail_mean(closes, TREND_SHORT_WINDOW);
    let long = tail_mean(closes, TREND_LONG_WINDOW);

    if short > long {
        Trend::Up
    } else if short < long {
        Trend::Down
    } else {
        Trend::Sideways
    }
}

fn tail_mean(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len() - window..];
    tail.iter().sum::<f64>() / window as f64
}
