#[cfg(test)]
mod backtest_tests {
    use chrono::{Duration, TimeZone, Utc};

    use channel_indicator::{AtrSmoothing, ChannelConfig};
    use scanner_core::Bar;

    use super::super::engine::BacktestEngine;
    use super::super::models::{BacktestConfig, ExitReason};

    fn bar_at(day: i64, close: f64) -> Bar {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Bar {
            timestamp: start + Duration::days(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
            adj_close: None,
        }
    }

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| bar_at(i as i64, *close))
            .collect()
    }

    /// Weekly bars reaching back far enough that their channel is fully
    /// defined before the daily series starts.
    fn bullish_weekly() -> Vec<Bar> {
        (0..12)
            .map(|i| bar_at(-40 + i as i64 * 7, 160.0 - i as f64))
            .collect()
    }

    fn bearish_weekly() -> Vec<Bar> {
        (0..12)
            .map(|i| bar_at(-40 + i as i64 * 7, 100.0 + i as f64))
            .collect()
    }

    fn small_config() -> BacktestConfig {
        BacktestConfig {
            channel: ChannelConfig {
                upper_window: 3,
                under_window: 4,
                fast_window: 2,
                atr_window: 2,
                atr_smoothing: AtrSmoothing::Simple,
            },
            stop_multiplier: 1.5,
            target_multiplier: 2.0,
        }
    }

    fn assert_close(value: f64, want: f64) {
        assert!((value - want).abs() < 1e-9, "{} != {}", value, want);
    }

    #[test]
    fn test_target_exit() {
        let engine = BacktestEngine::new(small_config()).unwrap();
        let daily = bars_from_closes(&[100.0, 99.0, 98.0, 97.0, 104.0, 110.0, 111.0, 112.0]);

        let result = engine.run("ALPHA", &daily, &bullish_weekly()).unwrap();

        assert_eq!(result.total_trades, 1);
        assert_eq!(result.winning_trades, 1);
        let trade = &result.trades[0];
        assert_close(trade.entry, 97.0);
        assert_close(trade.stop, 94.0);
        assert_close(trade.target, 103.0);
        assert_close(trade.exit_price, 103.0);
        assert_eq!(trade.exit_reason, ExitReason::Target);
        assert_eq!(trade.holding_days, 1);

        assert_close(result.win_rate, 100.0);
        assert_eq!(result.adjusted_win_rate, Some(100.0));
        assert_close(result.total_return_percent, (103.0 / 97.0 - 1.0) * 100.0);
        assert_close(result.max_drawdown_percent, 0.0);
        assert!(result.profit_factor.unwrap().is_infinite());
        // A single trade has no return dispersion to annualize.
        assert!(result.sharpe_ratio.is_none());
        assert_close(
            result.expectancy_percent.unwrap(),
            (103.0 / 97.0 - 1.0) * 100.0,
        );
        assert_eq!(result.target_exits, 1);
        assert_eq!(result.stop_exits, 0);
        assert_eq!(result.end_of_data_exits, 0);
        assert_close(result.avg_win_percent.unwrap(), (103.0 / 97.0 - 1.0) * 100.0);
        assert_eq!(result.avg_loss_percent, None);
        assert_eq!(result.best_trade_percent, result.worst_trade_percent);
    }

    #[test]
    fn test_stop_exit() {
        let engine = BacktestEngine::new(small_config()).unwrap();
        let daily = bars_from_closes(&[100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 94.0]);

        let result = engine.run("ALPHA", &daily, &bullish_weekly()).unwrap();

        assert_eq!(result.total_trades, 1);
        assert_eq!(result.losing_trades, 1);
        let trade = &result.trades[0];
        assert_close(trade.exit_price, 94.0);
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.holding_days, 2);

        assert_close(result.win_rate, 0.0);
        assert_eq!(result.adjusted_win_rate, Some(0.0));
        assert_eq!(result.profit_factor, Some(0.0));
        assert_close(result.total_return_percent, (94.0 / 97.0 - 1.0) * 100.0);
    }

    #[test]
    fn test_end_of_data_exit() {
        let engine = BacktestEngine::new(small_config()).unwrap();
        let daily = bars_from_closes(&[100.0, 99.0, 98.0, 97.0, 96.5, 96.2]);

        let result = engine.run("ALPHA", &daily, &bullish_weekly()).unwrap();

        assert_eq!(result.total_trades, 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_close(trade.exit_price, 96.2);
        // No bracket resolved, so the adjusted rate has no sample.
        assert_eq!(result.adjusted_win_rate, None);
        assert_eq!(result.end_of_data_exits, 1);
    }

    #[test]
    fn test_stop_checked_before_target_within_bar() {
        let engine = BacktestEngine::new(small_config()).unwrap();
        let mut daily = bars_from_closes(&[100.0, 99.0, 98.0, 97.0]);
        daily.push(Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
            open: 100.0,
            high: 104.0,
            low: 93.0,
            close: 100.0,
            volume: 1_000.0,
            adj_close: None,
        });

        let result = engine.run("ALPHA", &daily, &bullish_weekly()).unwrap();

        assert_eq!(result.total_trades, 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
        assert_close(result.trades[0].exit_price, 94.0);
    }

    #[test]
    fn test_no_entries_when_daily_bearish() {
        let engine = BacktestEngine::new(small_config()).unwrap();
        let daily = bars_from_closes(&[
            100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0, 107.0, 108.0, 109.0,
        ]);

        let result = engine.run("ALPHA", &daily, &bullish_weekly()).unwrap();

        assert_eq!(result.total_trades, 0);
        assert_close(result.total_return_percent, 0.0);
        assert_eq!(result.adjusted_win_rate, None);
        assert_eq!(result.profit_factor, None);
        assert_eq!(result.sharpe_ratio, None);
        assert_eq!(result.expectancy_percent, None);
    }

    #[test]
    fn test_bearish_weekly_vetoes_entries() {
        let engine = BacktestEngine::new(small_config()).unwrap();
        let daily = bars_from_closes(&[100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 94.0]);

        let result = engine.run("ALPHA", &daily, &bearish_weekly()).unwrap();

        assert_eq!(result.total_trades, 0);
    }

    #[test]
    fn test_atr_fallback_uses_close_fraction() {
        let mut config = small_config();
        // Push the ATR window past the entry bar so it is undefined there.
        config.channel.atr_window = 8;
        let engine = BacktestEngine::new(config).unwrap();
        let daily = bars_from_closes(&[100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 94.0]);

        let result = engine.run("ALPHA", &daily, &bullish_weekly()).unwrap();

        assert_eq!(result.total_trades, 1);
        let trade = &result.trades[0];
        // Risk collapses to 1.5 times 2 percent of the 97.0 entry.
        assert_close(trade.stop, 97.0 - 1.5 * 0.02 * 97.0);
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_close(trade.return_percent, -3.0);
    }

    #[test]
    fn test_repeated_stops_compound() {
        let engine = BacktestEngine::new(small_config()).unwrap();
        let daily = bars_from_closes(&[
            100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 94.0, 93.0, 92.0, 91.0,
        ]);

        let result = engine.run("ALPHA", &daily, &bullish_weekly()).unwrap();

        assert_eq!(result.total_trades, 2);
        assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(result.trades[1].exit_reason, ExitReason::StopLoss);
        // 97 -> 94 and then 94 -> 91 telescope to 91/97 overall.
        assert_close(result.total_return_percent, (91.0 / 97.0 - 1.0) * 100.0);
        assert_close(result.max_drawdown_percent, (1.0 - 91.0 / 97.0) * 100.0);
        assert_eq!(result.avg_holding_days, Some(2.0));
        assert!(result.sharpe_ratio.unwrap() < 0.0);
        let expectancy = result.expectancy_percent.unwrap();
        let avg_loss =
            ((94.0 / 97.0 - 1.0) * 100.0 + (91.0 / 94.0 - 1.0) * 100.0) / 2.0;
        assert_close(expectancy, avg_loss);
        assert_eq!(result.stop_exits, 2);
        assert_eq!(result.avg_win_percent, None);
        // The later stop is deeper in percent terms.
        assert_close(
            result.best_trade_percent.unwrap(),
            (94.0 / 97.0 - 1.0) * 100.0,
        );
        assert_close(
            result.worst_trade_percent.unwrap(),
            (91.0 / 94.0 - 1.0) * 100.0,
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BacktestConfig {
            stop_multiplier: 0.0,
            ..BacktestConfig::default()
        };
        assert!(BacktestEngine::new(config).is_err());

        let config = BacktestConfig {
            target_multiplier: -1.0,
            ..BacktestConfig::default()
        };
        assert!(BacktestEngine::new(config).is_err());
    }

    #[test]
    fn test_empty_series_yields_empty_result() {
        let engine = BacktestEngine::new(small_config()).unwrap();
        let result = engine.run("ALPHA", &[], &[]).unwrap();
        assert_eq!(result.total_trades, 0);
        assert!(result.trades.is_empty());
    }
}
