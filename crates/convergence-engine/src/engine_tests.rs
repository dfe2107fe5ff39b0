#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    use channel_indicator::{AtrSmoothing, ChannelConfig};
    use risk_planner::TradeDirection;
    use scanner_core::{
        AssetCategory, Bar, FetchPeriod, Instrument, Market, MarketDataProvider, ScannerError,
        Signal, SignalDirection, Timeframe,
    };

    use super::super::engine::*;
    use super::super::status::ConvergenceStatus;

    #[derive(Default)]
    struct MockProvider {
        daily: HashMap<String, Vec<Bar>>,
        weekly: HashMap<String, Vec<Bar>>,
        calls: AtomicUsize,
        weekly_calls: AtomicUsize,
    }

    impl MockProvider {
        fn with_daily(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
            self.daily.insert(symbol.to_string(), bars);
            self
        }

        fn with_weekly(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
            self.weekly.insert(symbol.to_string(), bars);
            self
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn fetch_bars(
            &self,
            symbol: &str,
            timeframe: Timeframe,
            _period: FetchPeriod,
        ) -> Result<Vec<Bar>, ScannerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let table = match timeframe {
                Timeframe::Daily => &self.daily,
                Timeframe::Weekly => {
                    self.weekly_calls.fetch_add(1, Ordering::SeqCst);
                    &self.weekly
                }
            };
            table
                .get(symbol)
                .cloned()
                .ok_or_else(|| ScannerError::ProviderError(format!("{} not wired", symbol)))
        }
    }

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

    fn falling_daily(len: usize) -> Vec<Bar> {
        (0..len).map(|i| bar_at(i as i64, 200.0 - i as f64)).collect()
    }

    fn rising_daily(len: usize) -> Vec<Bar> {
        (0..len).map(|i| bar_at(i as i64, 100.0 + i as f64)).collect()
    }

    fn falling_weekly(len: usize) -> Vec<Bar> {
        (0..len)
            .map(|i| bar_at(i as i64 * 7, 160.0 - i as f64))
            .collect()
    }

    fn instrument(ticker: &str) -> Instrument {
        Instrument {
            ticker: ticker.to_string(),
            name: format!("{} Test Asset", ticker),
            market: Market::Foreign,
            category: AssetCategory::Equity,
        }
    }

    fn small_config() -> ScanConfig {
        ScanConfig {
            channel: ChannelConfig {
                upper_window: 3,
                under_window: 4,
                fast_window: 2,
                atr_window: 2,
                atr_smoothing: AtrSmoothing::Simple,
            },
            ..ScanConfig::default()
        }
    }

    fn engine(provider: Arc<MockProvider>, config: ScanConfig) -> ScanEngine {
        ScanEngine::new(provider, config).unwrap()
    }

    #[tokio::test]
    async fn test_scan_classifies_aligned_buy() {
        let provider = Arc::new(MockProvider::default().with_daily("ALPHA", falling_daily(30)));
        let engine = engine(provider.clone(), small_config());

        let report = engine.scan(&[instrument("ALPHA")]).await;

        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.status, ConvergenceStatus::AlignedBuy);
        assert_eq!(row.signal, Some(Signal::Buy));
        assert_eq!(row.daily_direction, Some(SignalDirection::Bullish));
        assert_eq!(row.weekly_direction, Some(SignalDirection::Bullish));
        assert_eq!(row.last_close, Some(171.0));

        let plan = row.plan.as_ref().unwrap();
        assert_eq!(plan.direction, TradeDirection::Long);
        assert!(plan.stop < plan.entry);
        assert!(plan.primary_target > plan.entry);

        // Weekly bars came from resampling, never from the provider.
        assert_eq!(provider.weekly_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scan_classifies_aligned_sell() {
        let provider = Arc::new(MockProvider::default().with_daily("BETA", rising_daily(30)));
        let engine = engine(provider, small_config());

        let report = engine.scan(&[instrument("BETA")]).await;

        let row = &report.rows[0];
        assert_eq!(row.status, ConvergenceStatus::AlignedSell);
        assert_eq!(row.signal, Some(Signal::Sell));

        let plan = row.plan.as_ref().unwrap();
        assert_eq!(plan.direction, TradeDirection::Short);
        assert!(plan.stop > plan.entry);
        assert!(plan.primary_target < plan.entry);
    }

    #[tokio::test]
    async fn test_fresh_buy_on_last_bar_crossover() {
        // Eleven rising closes keep the daily channel bearish, then the
        // final bar collapses far enough to flip it bullish on that bar.
        let mut daily = rising_daily(11);
        daily.push(bar_at(11, 80.0));
        let provider = Arc::new(
            MockProvider::default()
                .with_daily("GAMMA", daily)
                .with_weekly("GAMMA", falling_weekly(8)),
        );
        let engine = engine(provider.clone(), small_config());

        let report = engine.scan(&[instrument("GAMMA")]).await;

        let row = &report.rows[0];
        assert_eq!(row.status, ConvergenceStatus::FreshBuy);
        assert_eq!(row.signal, Some(Signal::Buy));

        // Twelve daily bars cover two calendar weeks, so the resampled
        // weekly series was too short and the native interval was used.
        assert_eq!(provider.weekly_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let provider = Arc::new(MockProvider::default().with_daily("ALPHA", falling_daily(30)));
        let engine = engine(provider, small_config());

        let report = engine
            .scan(&[instrument("ALPHA"), instrument("MISSING")])
            .await;

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].ticker, "ALPHA");
        assert_eq!(report.rows[0].status, ConvergenceStatus::AlignedBuy);
        assert_eq!(report.rows[1].ticker, "MISSING");
        assert_eq!(report.rows[1].status, ConvergenceStatus::NoData);
        assert!(report.rows[1].note.is_some());
        assert_eq!(report.no_data_rows().len(), 1);
        assert_eq!(report.signal_rows().len(), 1);
    }

    #[tokio::test]
    async fn test_short_daily_history_is_no_data() {
        let provider = Arc::new(MockProvider::default().with_daily("THIN", falling_daily(3)));
        let engine = engine(provider, small_config());

        let report = engine.scan(&[instrument("THIN")]).await;

        assert_eq!(report.rows[0].status, ConvergenceStatus::NoData);
        assert_eq!(report.rows[0].signal, None);
    }

    #[tokio::test]
    async fn test_undefined_latest_direction_is_waiting() {
        // Ten bars fetch fine but never fill the default 30-bar window,
        // so neither timeframe has a defined direction yet.
        let provider = Arc::new(
            MockProvider::default()
                .with_daily("SLOW", falling_daily(10))
                .with_weekly("SLOW", falling_weekly(10)),
        );
        let engine = engine(provider, ScanConfig::default());

        let report = engine.scan(&[instrument("SLOW")]).await;

        let row = &report.rows[0];
        assert_eq!(row.status, ConvergenceStatus::Waiting);
        assert_eq!(row.signal, Some(Signal::Wait));
        assert!(row.daily_direction.is_none());
        assert!(row.plan.is_none());
    }

    #[tokio::test]
    async fn test_cache_serves_second_scan() {
        let provider = Arc::new(MockProvider::default().with_daily("ALPHA", falling_daily(30)));
        let engine = engine(provider.clone(), small_config());
        let instruments = [instrument("ALPHA")];

        engine.scan(&instruments).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        engine.scan(&instruments).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_forces_refetch() {
        let provider = Arc::new(MockProvider::default().with_daily("ALPHA", falling_daily(30)));
        let config = ScanConfig {
            refresh: true,
            ..small_config()
        };
        let engine = engine(provider.clone(), config);
        let instruments = [instrument("ALPHA")];

        engine.scan(&instruments).await;
        engine.scan(&instruments).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_summary_counts_and_row_order() {
        let provider = Arc::new(
            MockProvider::default()
                .with_daily("ALPHA", falling_daily(30))
                .with_daily("BETA", rising_daily(30)),
        );
        let engine = engine(provider, small_config());

        let report = engine
            .scan(&[instrument("GAMMA"), instrument("BETA"), instrument("ALPHA")])
            .await;

        assert_eq!(report.summary.scanned, 3);
        assert_eq!(report.summary.buys, 1);
        assert_eq!(report.summary.sells, 1);
        assert_eq!(report.summary.waits, 0);
        assert_eq!(report.summary.no_data, 1);

        let tickers: Vec<&str> = report.rows.iter().map(|row| row.ticker.as_str()).collect();
        assert_eq!(tickers, ["ALPHA", "BETA", "GAMMA"]);
    }

    #[tokio::test]
    async fn test_bars_accessor_resamples_weekly() {
        let provider = Arc::new(MockProvider::default().with_daily("ALPHA", falling_daily(30)));
        let engine = engine(provider.clone(), small_config());

        let weekly = engine.bars("ALPHA", Timeframe::Weekly).await.unwrap();
        assert_eq!(weekly.len(), 5);
        assert_eq!(provider.weekly_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let provider = Arc::new(MockProvider::default());
        let config = ScanConfig {
            max_concurrency: 0,
            ..ScanConfig::default()
        };
        let result = ScanEngine::new(provider, config);
        assert!(matches!(result, Err(ScannerError::InvalidParameter(_))));
    }
}
