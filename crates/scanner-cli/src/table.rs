use convergence_engine::{ScanReport, ScanRow};
use scanner_core::SignalDirection;
use strategy_backtest::BacktestResult;

/// Formats the scan outcome as a fixed-width terminal table, followed by
/// the summary line and the instruments that could not be evaluated.
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<8} {:<22} {:<14} {:<9} {:>9} {:>9} {:>9} {:>9} {:>5} {:>6} {:<9}\n",
        "TICKER", "NAME", "STATUS", "D/W", "CLOSE", "ENTRY", "STOP", "TARGET", "R:R", "VOL%", "TREND"
    ));
    out.push_str(&"-".repeat(118));
    out.push('\n');

    for row in report.signal_rows() {
        let plan = row.plan.as_ref();
        out.push_str(&format!(
            "{:<8} {:<22} {:<14} {:<9} {:>9} {:>9} {:>9} {:>9} {:>5} {:>6} {:<9}\n",
            clip(&row.ticker, 8),
            clip(&row.name, 22),
            row.status.to_label(),
            direction_pair(row.daily_direction, row.weekly_direction),
            money(row.last_close),
            money(plan.map(|p| p.entry)),
            money(plan.map(|p| p.stop)),
            money(plan.map(|p| p.primary_target)),
            ratio(plan.map(|p| p.risk_reward)),
            ratio(row.volatility),
            row.trend.map(|t| t.to_label()).unwrap_or("-"),
        ));
    }

    let summary = &report.summary;
    out.push_str(&format!(
        "\n{} scanned: {} buy, {} sell, {} waiting, {} fresh setups, {} without data\n",
        summary.scanned,
        summary.buys,
        summary.sells,
        summary.waits,
        summary.fresh_setups,
        summary.no_data
    ));

    let skipped = report.no_data_rows();
    if !skipped.is_empty() {
        out.push_str("\nwithout data:\n");
        for row in skipped {
            out.push_str(&format!(
                "  {:<8} {}\n",
                row.ticker,
                row.note.as_deref().unwrap_or("no usable history")
            ));
        }
    }

    out
}

/// Formats the per-symbol replay results.
pub fn render_backtests(results: &[BacktestResult]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<8} {:>6} {:>6} {:>6} {:>6} {:>9} {:>7} {:>7} {:>7} {:>7}\n",
        "SYMBOL", "TRADES", "WINS", "WIN%", "ADJ%", "RETURN%", "PF", "MAXDD%", "SHARPE", "EXP%"
    ));
    out.push_str(&"-".repeat(79));
    out.push('\n');

    for result in results {
        out.push_str(&format!(
            "{:<8} {:>6} {:>6} {:>6} {:>6} {:>9} {:>7} {:>7} {:>7} {:>7}\n",
            clip(&result.symbol, 8),
            result.total_trades,
            result.winning_trades,
            one_decimal(Some(result.win_rate)),
            one_decimal(result.adjusted_win_rate),
            two_decimals(Some(result.total_return_percent)),
            factor(result.profit_factor),
            two_decimals(Some(result.max_drawdown_percent)),
            two_decimals(result.sharpe_ratio),
            two_decimals(result.expectancy_percent),
        ));
    }

    out
}

/// Long-form report for a single symbol replay, trade by trade.
pub fn render_backtest_report(result: &BacktestResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{} replay: {} trades ({} wins, {} losses)\n",
        result.symbol, result.total_trades, result.winning_trades, result.losing_trades
    ));
    out.push_str(&format!(
        "  win rate {}%   adjusted {}%   profit factor {}\n",
        one_decimal(Some(result.win_rate)),
        one_decimal(result.adjusted_win_rate),
        factor(result.profit_factor),
    ));
    out.push_str(&format!(
        "  total return {}%   avg trade {}%   expectancy {}%\n",
        two_decimals(Some(result.total_return_percent)),
        two_decimals(result.avg_return_percent),
        two_decimals(result.expectancy_percent),
    ));
    out.push_str(&format!(
        "  avg win {}%   avg loss {}%   best {}%   worst {}%\n",
        two_decimals(result.avg_win_percent),
        two_decimals(result.avg_loss_percent),
        two_decimals(result.best_trade_percent),
        two_decimals(result.worst_trade_percent),
    ));
    out.push_str(&format!(
        "  max drawdown {}%   sharpe {}   avg holding {} days\n",
        two_decimals(Some(result.max_drawdown_percent)),
        two_decimals(result.sharpe_ratio),
        one_decimal(result.avg_holding_days),
    ));
    out.push_str(&format!(
        "  exits: {} target, {} stop, {} end of data\n",
        result.target_exits, result.stop_exits, result.end_of_data_exits
    ));

    if !result.trades.is_empty() {
        out.push_str(&format!(
            "\n  {:<12} {:<12} {:>9} {:>9} {:>8} {:>5}  {}\n",
            "ENTRY", "EXIT", "IN", "OUT", "RET%", "DAYS", "REASON"
        ));
        for trade in &result.trades {
            out.push_str(&format!(
                "  {:<12} {:<12} {:>9.2} {:>9.2} {:>8.2} {:>5}  {}\n",
                trade.entry_date.format("%Y-%m-%d"),
                trade.exit_date.format("%Y-%m-%d"),
                trade.entry,
                trade.exit_price,
                trade.return_percent,
                trade.holding_days,
                trade.exit_reason.to_label(),
            ));
        }
    }

    out
}

fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn money(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn ratio(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}

fn one_decimal(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}

fn two_decimals(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn factor(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_infinite() => "inf".to_string(),
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

fn direction_pair(daily: Option<SignalDirection>, weekly: Option<SignalDirection>) -> String {
    format!("{}/{}", direction_short(daily), direction_short(weekly))
}

fn direction_short(direction: Option<SignalDirection>) -> &'static str {
    match direction {
        Some(SignalDirection::Bullish) => "bull",
        Some(SignalDirection::Bearish) => "bear",
        Some(SignalDirection::Neutral) => "flat",
        None => "-",
    }
}
