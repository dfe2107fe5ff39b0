use async_trait::async_trait;
use crate::{Bar, FetchPeriod, ScannerError, Timeframe};

/// Boundary to the remote market-data provider
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch an ascending OHLCV series for one symbol, timeframe and
    /// lookback period.
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        period: FetchPeriod,
    ) -> Result<Vec<Bar>, ScannerError>;
}
