use channel_indicator::compute_channel;
use chrono::{DateTime, Utc};
use scanner_core::{Bar, ScannerError, SignalDirection};

use crate::models::{BacktestConfig, BacktestResult, ExitReason, TradeRecord};

/// Fraction of the close used for the stop distance when the ATR is not
/// defined yet at entry time.
const FALLBACK_ATR_FRACTION: f64 = 0.02;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

struct OpenTrade {
    entry_date: DateTime<Utc>,
    entry: f64,
    stop: f64,
    target: f64,
}

/// Replays the dual-timeframe channel strategy over historical bars.
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Result<Self, ScannerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Runs the replay for one symbol.
    ///
    /// Entries are long only, taken at the daily close when both
    /// timeframes read bullish and no position is open. A weekly bar
    /// applies from its label date onward, so a week only influences
    /// decisions once it has completed. Within a bar the stop is checked
    /// before the target; whatever is still open at the end of the
    /// series is closed at the final close.
    pub fn run(
        &self,
        symbol: &str,
        daily: &[Bar],
        weekly: &[Bar],
    ) -> Result<BacktestResult, ScannerError> {
        let daily_series = compute_channel(daily, &self.config.channel)?;
        let weekly_series = compute_channel(weekly, &self.config.channel)?;

        let mut trades: Vec<TradeRecord> = Vec::new();
        let mut open: Option<OpenTrade> = None;
        let mut weekly_idx = 0usize;

        for (i, bar) in daily.iter().enumerate() {
            // Advance to the newest weekly bar completed by this day.
            while weekly_idx < weekly.len() && weekly[weekly_idx].timestamp <= bar.timestamp {
                weekly_idx += 1;
            }
            let weekly_direction = weekly_idx
                .checked_sub(1)
                .and_then(|j| weekly_series.direction(j));

            // 1. Manage the open position. No re-entry on the exit bar.
            if let Some(trade) = open.take() {
                if bar.low <= trade.stop {
                    trades.push(close_trade(trade, bar.timestamp, None, ExitReason::StopLoss));
                } else if bar.high >= trade.target {
                    trades.push(close_trade(trade, bar.timestamp, None, ExitReason::Target));
                } else if i + 1 == daily.len() {
                    trades.push(close_trade(
                        trade,
                        bar.timestamp,
                        Some(bar.close),
                        ExitReason::EndOfData,
                    ));
                } else {
                    open = Some(trade);
                }
                continue;
            }

            // 2. Look for a fresh entry; never on the final bar.
            if i + 1 < daily.len()
                && daily_series.direction(i) == Some(SignalDirection::Bullish)
                && weekly_direction == Some(SignalDirection::Bullish)
            {
                let entry = bar.close;
                let atr = match daily_series.atr[i] {
                    Some(atr) if atr > 0.0 => atr,
                    _ => entry * FALLBACK_ATR_FRACTION,
                };
                let risk = self.config.stop_multiplier * atr;
                open = Some(OpenTrade {
                    entry_date: bar.timestamp,
                    entry,
                    stop: entry - risk,
                    target: entry + self.config.target_multiplier * risk,
                });
            }
        }

        Ok(summarize(symbol, trades))
    }
}

// --- Helpers ---

/// Builds the trade record. Stop and target exits fill at their level;
/// an explicit price overrides that for end-of-data closes.
fn close_trade(
    trade: OpenTrade,
    exit_date: DateTime<Utc>,
    price_override: Option<f64>,
    exit_reason: ExitReason,
) -> TradeRecord {
    let exit_price = match (exit_reason, price_override) {
        (_, Some(price)) => price,
        (ExitReason::StopLoss, None) => trade.stop,
        (ExitReason::Target, None) => trade.target,
        (ExitReason::EndOfData, None) => trade.entry,
    };
    TradeRecord {
        entry_date: trade.entry_date,
        exit_date,
        entry: trade.entry,
        stop: trade.stop,
        target: trade.target,
        exit_price,
        return_percent: (exit_price / trade.entry - 1.0) * 100.0,
        holding_days: (exit_date - trade.entry_date).num_days(),
        exit_reason,
    }
}

fn summarize(symbol: &str, trades: Vec<TradeRecord>) -> BacktestResult {
    let total_trades = trades.len();
    let winning_trades = trades
        .iter()
        .filter(|trade| trade.return_percent > 0.0)
        .count();
    let losing_trades = total_trades - winning_trades;

    let target_exits = trades
        .iter()
        .filter(|trade| trade.exit_reason == ExitReason::Target)
        .count();
    let stop_exits = trades
        .iter()
        .filter(|trade| trade.exit_reason == ExitReason::StopLoss)
        .count();
    let resolved = target_exits + stop_exits;
    let adjusted_win_rate = (resolved > 0).then(|| percent(target_exits, resolved));

    // Compound the per-trade returns and track the worst drawdown.
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut max_drawdown_percent = 0.0_f64;
    for trade in &trades {
        equity *= 1.0 + trade.return_percent / 100.0;
        peak = peak.max(equity);
        max_drawdown_percent = max_drawdown_percent.max((peak - equity) / peak * 100.0);
    }
    let total_return_percent = (equity - 1.0) * 100.0;

    let returns: Vec<f64> = trades.iter().map(|trade| trade.return_percent).collect();
    let holding: Vec<f64> = trades
        .iter()
        .map(|trade| trade.holding_days as f64)
        .collect();
    let avg_return_percent = mean(&returns);
    let avg_holding_days = mean(&holding);

    let gross_gain: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let gross_loss: f64 = -returns.iter().filter(|r| **r < 0.0).sum::<f64>();
    let profit_factor = if total_trades == 0 {
        None
    } else if gross_loss > 0.0 {
        Some(gross_gain / gross_loss)
    } else if gross_gain > 0.0 {
        Some(f64::INFINITY)
    } else {
        None
    };

    let winners: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
    let losers: Vec<f64> = returns.iter().copied().filter(|r| *r <= 0.0).collect();
    let avg_win_percent = mean(&winners);
    let avg_loss_percent = mean(&losers);
    let expectancy_percent = if total_trades == 0 {
        None
    } else {
        let win_fraction = winning_trades as f64 / total_trades as f64;
        Some(
            win_fraction * avg_win_percent.unwrap_or(0.0)
                + (1.0 - win_fraction) * avg_loss_percent.unwrap_or(0.0),
        )
    };

    BacktestResult {
        symbol: symbol.to_string(),
        total_trades,
        winning_trades,
        losing_trades,
        win_rate: percent(winning_trades, total_trades),
        adjusted_win_rate,
        total_return_percent,
        avg_return_percent,
        avg_holding_days,
        profit_factor,
        max_drawdown_percent,
        sharpe_ratio: sharpe_ratio(&returns, avg_holding_days),
        expectancy_percent,
        avg_win_percent,
        avg_loss_percent,
        best_trade_percent: returns.iter().copied().reduce(f64::max),
        worst_trade_percent: returns.iter().copied().reduce(f64::min),
        target_exits,
        stop_exits,
        end_of_data_exits: total_trades - resolved,
        trades,
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Per-trade Sharpe annualized by the average holding period.
fn sharpe_ratio(returns: &[f64], avg_holding_days: Option<f64>) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let avg_days = avg_holding_days.filter(|days| *days > 0.0)?;
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / (returns.len() - 1) as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return None;
    }
    Some(mean / std_dev * (TRADING_DAYS_PER_YEAR / avg_days).sqrt())
}
