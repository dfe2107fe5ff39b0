use channel_indicator::ChannelConfig;
use chrono::{DateTime, Utc};
use scanner_core::ScannerError;
use serde::{Deserialize, Serialize};

/// Configuration for a historical replay of the channel strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub channel: ChannelConfig,
    /// ATR multiple between entry and stop.
    pub stop_multiplier: f64,
    /// Risk multiple between entry and target.
    pub target_multiplier: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            stop_multiplier: 1.5,
            target_multiplier: 2.0,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ScannerError> {
        self.channel.validate()?;
        if !self.stop_multiplier.is_finite() || self.stop_multiplier <= 0.0 {
            return Err(ScannerError::InvalidParameter(
                "stop_multiplier must be a positive number".to_string(),
            ));
        }
        if !self.target_multiplier.is_finite() || self.target_multiplier <= 0.0 {
            return Err(ScannerError::InvalidParameter(
                "target_multiplier must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a simulated position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    Target,
    /// Position still open when the series ran out; closed at the final close.
    EndOfData,
}

impl ExitReason {
    pub fn to_label(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop loss",
            ExitReason::Target => "target",
            ExitReason::EndOfData => "end of data",
        }
    }
}

/// One completed round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub exit_price: f64,
    pub return_percent: f64,
    pub holding_days: i64,
    pub exit_reason: ExitReason,
}

/// Aggregate outcome of one replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of all closed trades that made money.
    pub win_rate: f64,
    /// Percent of resolved brackets that hit the target. Trades closed by
    /// running out of data are excluded; `None` when nothing resolved.
    pub adjusted_win_rate: Option<f64>,
    /// Compounded across trades, percent.
    pub total_return_percent: f64,
    pub avg_return_percent: Option<f64>,
    pub avg_holding_days: Option<f64>,
    /// Gross gains over gross losses. Infinite when nothing was lost.
    pub profit_factor: Option<f64>,
    /// Worst peak-to-trough drop of the compounded trade curve, percent.
    pub max_drawdown_percent: f64,
    pub sharpe_ratio: Option<f64>,
    /// Expected return per trade, percent.
    pub expectancy_percent: Option<f64>,
    pub avg_win_percent: Option<f64>,
    pub avg_loss_percent: Option<f64>,
    pub best_trade_percent: Option<f64>,
    pub worst_trade_percent: Option<f64>,
    pub target_exits: usize,
    pub stop_exits: usize,
    pub end_of_data_exits: usize,
    pub trades: Vec<TradeRecord>,
}
