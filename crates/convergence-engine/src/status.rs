use channel_indicator::Crossover;
use scanner_core::{Signal, SignalDirection};
use serde::{Deserialize, Serialize};

/// Latest state of one timeframe as the classifier sees it: the channel
/// direction on the newest bar plus whether that bar itself flipped it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeReading {
    pub direction: SignalDirection,
    pub fresh_cross: Option<Crossover>,
}

impl TimeframeReading {
    pub fn new(direction: SignalDirection, fresh_cross: Option<Crossover>) -> Self {
        Self {
            direction,
            fresh_cross,
        }
    }
}

/// Joint daily/weekly classification of one instrument. Exactly one
/// status applies per scan; lower priority numbers sort first in the
/// results table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// Daily crossed bullish on the newest bar and weekly agrees.
    FreshBuy,
    /// Daily crossed bearish on the newest bar and weekly agrees.
    FreshSell,
    /// Both timeframes bullish, no fresh daily cross.
    AlignedBuy,
    /// Both timeframes bearish, no fresh daily cross.
    AlignedSell,
    /// Weekly bullish while daily is still bearish.
    AwaitingBullish,
    /// Daily bullish against a bearish weekly.
    CounterTrend,
    /// Any other disagreement, or an undefined timeframe.
    Waiting,
    /// Both timeframes tied on the midline.
    Neutral,
    /// Instrument could not be evaluated at all.
    NoData,
}

impl ConvergenceStatus {
    /// Table sort key. Actionable setups first, unevaluated rows last.
    pub fn priority(&self) -> u8 {
        match self {
            ConvergenceStatus::FreshBuy => 1,
            ConvergenceStatus::FreshSell => 2,
            ConvergenceStatus::AlignedBuy => 3,
            ConvergenceStatus::AlignedSell => 4,
            ConvergenceStatus::AwaitingBullish => 5,
            ConvergenceStatus::CounterTrend => 6,
            ConvergenceStatus::Waiting => 7,
            ConvergenceStatus::Neutral => 8,
            ConvergenceStatus::NoData => 9,
        }
    }

    /// Actionable signal this status maps to. `None` means the row never
    /// reaches the signal table.
    pub fn signal(&self) -> Option<Signal> {
        match self {
            ConvergenceStatus::FreshBuy | ConvergenceStatus::AlignedBuy => Some(Signal::Buy),
            ConvergenceStatus::FreshSell | ConvergenceStatus::AlignedSell => Some(Signal::Sell),
            ConvergenceStatus::NoData => None,
            _ => Some(Signal::Wait),
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            ConvergenceStatus::FreshBuy => "FRESH BUY",
            ConvergenceStatus::FreshSell => "FRESH SELL",
            ConvergenceStatus::AlignedBuy => "ALIGNED BUY",
            ConvergenceStatus::AlignedSell => "ALIGNED SELL",
            ConvergenceStatus::AwaitingBullish => "AWAITING BULL",
            ConvergenceStatus::CounterTrend => "COUNTER TREND",
            ConvergenceStatus::Waiting => "WAITING",
            ConvergenceStatus::Neutral => "NEUTRAL",
            ConvergenceStatus::NoData => "NO DATA",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::FreshBuy => "daily channel crossed bullish with weekly confirmation",
            ConvergenceStatus::FreshSell => "daily channel crossed bearish with weekly confirmation",
            ConvergenceStatus::AlignedBuy => "daily and weekly channels both bullish",
            ConvergenceStatus::AlignedSell => "daily and weekly channels both bearish",
            ConvergenceStatus::AwaitingBullish => "weekly bullish, daily has not turned yet",
            ConvergenceStatus::CounterTrend => "daily bullish against a bearish weekly",
            ConvergenceStatus::Waiting => "timeframes disagree or are not fully defined",
            ConvergenceStatus::Neutral => "both timeframes sitting on the midline",
            ConvergenceStatus::NoData => "not enough usable history to evaluate",
        }
    }
}

/// Combines the two timeframe readings into a single status.
///
/// A missing reading means the series was fetched but its newest bar has
/// no defined direction yet. That is a waiting condition, not an error;
/// truly unavailable instruments never reach this function.
pub fn classify(
    daily: Option<TimeframeReading>,
    weekly: Option<TimeframeReading>,
) -> ConvergenceStatus {
    let (daily, weekly) = match (daily, weekly) {
        (Some(d), Some(w)) => (d, w),
        _ => return ConvergenceStatus::Waiting,
    };

    match (weekly.direction, daily.direction) {
        (SignalDirection::Bullish, SignalDirection::Bullish) => {
            if daily.fresh_cross == Some(Crossover::Bullish) {
                ConvergenceStatus::FreshBuy
            } else {
                ConvergenceStatus::AlignedBuy
            }
        }
        (SignalDirection::Bearish, SignalDirection::Bearish) => {
            if daily.fresh_cross == Some(Crossover::Bearish) {
                ConvergenceStatus::FreshSell
            } else {
                ConvergenceStatus::AlignedSell
            }
        }
        (SignalDirection::Bullish, SignalDirection::Bearish) => ConvergenceStatus::AwaitingBullish,
        (SignalDirection::Bearish, SignalDirection::Bullish) => ConvergenceStatus::CounterTrend,
        (SignalDirection::Neutral, SignalDirection::Neutral) => ConvergenceStatus::Neutral,
        _ => ConvergenceStatus::Waiting,
    }
}
