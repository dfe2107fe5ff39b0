use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use channel_indicator::{
    compute_channel, detect_trend, latest_volatility, ChannelConfig, ChannelSeries, Trend,
    MONTHLY_WINDOW,
};
use risk_planner::{build_plan, RiskConfig, TradeDirection, TradePlan};
use scanner_core::{
    resample_weekly, AssetCategory, Bar, FetchPeriod, Instrument, MarketDataProvider, MIN_BARS,
    ScannerError, Signal, SignalDirection, Timeframe,
};

use crate::status::{classify, ConvergenceStatus, TimeframeReading};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Everything one scan run needs to know up front.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub channel: ChannelConfig,
    pub risk: RiskConfig,
    pub period: FetchPeriod,
    /// Upper bound on instruments fetched at the same time.
    pub max_concurrency: usize,
    /// Bypass cached bars and refetch everything.
    pub refresh: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            risk: RiskConfig::default(),
            period: FetchPeriod::default(),
            max_concurrency: DEFAULT_CONCURRENCY,
            refresh: false,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ScannerError> {
        self.channel.validate()?;
        self.risk.validate()?;
        if self.max_concurrency == 0 {
            return Err(ScannerError::InvalidParameter(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

type CacheKey = (String, Timeframe, FetchPeriod);

/// Session-scoped bar cache shared across scans. Entries are replaced
/// wholesale on refresh, never merged.
#[derive(Debug, Default)]
pub struct BarCache {
    entries: DashMap<CacheKey, Arc<Vec<Bar>>>,
}

impl BarCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        period: FetchPeriod,
    ) -> Option<Arc<Vec<Bar>>> {
        self.entries
            .get(&(symbol.to_string(), timeframe, period))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn insert(
        &self,
        symbol: String,
        timeframe: Timeframe,
        period: FetchPeriod,
        bars: Vec<Bar>,
    ) -> Arc<Vec<Bar>> {
        let bars = Arc::new(bars);
        self.entries
            .insert((symbol, timeframe, period), Arc::clone(&bars));
        bars
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One line of the scan results.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRow {
    pub ticker: String,
    pub name: String,
    pub category: AssetCategory,
    pub status: ConvergenceStatus,
    pub signal: Option<Signal>,
    pub last_close: Option<f64>,
    pub daily_direction: Option<SignalDirection>,
    pub weekly_direction: Option<SignalDirection>,
    /// Annualized 21-day historical volatility, percent.
    pub volatility: Option<f64>,
    pub trend: Option<Trend>,
    pub plan: Option<TradePlan>,
    /// Failure detail for rows that could not be evaluated.
    pub note: Option<String>,
}

impl ScanRow {
    fn unavailable(instrument: &Instrument, note: String) -> Self {
        Self {
            ticker: instrument.ticker.clone(),
            name: instrument.name.clone(),
            category: instrument.category,
            status: ConvergenceStatus::NoData,
            signal: None,
            last_close: None,
            daily_direction: None,
            weekly_direction: None,
            volatility: None,
            trend: None,
            plan: None,
            note: Some(note),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub buys: usize,
    pub sells: usize,
    pub waits: usize,
    pub fresh_setups: usize,
    pub no_data: usize,
}

impl ScanSummary {
    pub fn from_rows(rows: &[ScanRow]) -> Self {
        let mut summary = Self {
            scanned: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match row.status.signal() {
                Some(Signal::Buy) => summary.buys += 1,
                Some(Signal::Sell) => summary.sells += 1,
                Some(Signal::Wait) => summary.waits += 1,
                None => summary.no_data += 1,
            }
            if matches!(
                row.status,
                ConvergenceStatus::FreshBuy | ConvergenceStatus::FreshSell
            ) {
                summary.fresh_setups += 1;
            }
        }
        summary
    }
}

/// Full outcome of one batch scan, rows already sorted for display.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub period: FetchPeriod,
    pub rows: Vec<ScanRow>,
    pub summary: ScanSummary,
}

impl ScanReport {
    /// Rows that reached a classification, in display order.
    pub fn signal_rows(&self) -> Vec<&ScanRow> {
        self.rows
            .iter()
            .filter(|row| row.status != ConvergenceStatus::NoData)
            .collect()
    }

    pub fn no_data_rows(&self) -> Vec<&ScanRow> {
        self.rows
            .iter()
            .filter(|row| row.status == ConvergenceStatus::NoData)
            .collect()
    }
}

/// Batch scanner that fetches both timeframes per instrument, classifies
/// the channel convergence and attaches a trade plan to actionable rows.
///
/// Weekly bars are resampled from the cached daily series so each
/// instrument normally costs a single provider request; the provider's
/// native weekly interval is only fetched when the resampled series is
/// too short to evaluate.
#[derive(Clone)]
pub struct ScanEngine {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<BarCache>,
    config: ScanConfig,
}

impl ScanEngine {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        config: ScanConfig,
    ) -> Result<Self, ScannerError> {
        config.validate()?;
        Ok(Self {
            provider,
            cache: Arc::new(BarCache::new()),
            config,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn cache(&self) -> &BarCache {
        &self.cache
    }

    /// Scans every instrument with bounded concurrency. Individual
    /// failures become `NO DATA` rows; the batch always completes.
    pub async fn scan(&self, instruments: &[Instrument]) -> ScanReport {
        log::info!(
            "📊 Scanning {} instruments over the {} period",
            instruments.len(),
            self.config.period.label()
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut join_set = JoinSet::new();

        for instrument in instruments.iter().cloned() {
            let engine = self.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ScanRow::unavailable(&instrument, "scan cancelled".to_string())
                    }
                };
                engine.scan_one(&instrument).await
            });
        }

        let mut rows = Vec::with_capacity(instruments.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(row) => rows.push(row),
                Err(err) => log::warn!("scan task failed: {}", err),
            }
        }

        rows.sort_by(|a, b| {
            a.status
                .priority()
                .cmp(&b.status.priority())
                .then_with(|| a.ticker.cmp(&b.ticker))
        });

        let summary = ScanSummary::from_rows(&rows);
        log::info!(
            "✅ Scan complete: {} buy, {} sell, {} waiting, {} without data",
            summary.buys,
            summary.sells,
            summary.waits,
            summary.no_data
        );

        ScanReport {
            generated_at: Utc::now(),
            period: self.config.period,
            rows,
            summary,
        }
    }

    /// Evaluates a single instrument end to end.
    pub async fn scan_one(&self, instrument: &Instrument) -> ScanRow {
        let symbol = instrument.provider_symbol();

        let daily = match self.daily_bars(&symbol).await {
            Ok(bars) => bars,
            Err(err) => return self.skip(instrument, err),
        };
        let weekly = match self.weekly_bars(&symbol, &daily).await {
            Ok(bars) => bars,
            Err(err) => return self.skip(instrument, err),
        };

        let daily_series = match compute_channel(&daily, &self.config.channel) {
            Ok(series) => series,
            Err(err) => return self.skip(instrument, err),
        };
        let weekly_series = match compute_channel(&weekly, &self.config.channel) {
            Ok(series) => series,
            Err(err) => return self.skip(instrument, err),
        };

        let status = classify(reading_of(&daily_series), reading_of(&weekly_series));

        let closes: Vec<f64> = daily.iter().map(|bar| bar.close).collect();
        let last_close = closes.last().copied();
        let plan = self.plan_for(status, last_close, daily_series.last_atr());

        ScanRow {
            ticker: instrument.ticker.clone(),
            name: instrument.name.clone(),
            category: instrument.category,
            status,
            signal: status.signal(),
            last_close,
            daily_direction: daily_series.latest_direction(),
            weekly_direction: weekly_series.latest_direction(),
            volatility: latest_volatility(&closes, MONTHLY_WINDOW),
            trend: Some(detect_trend(&closes)),
            plan,
            note: None,
        }
    }

    /// Bars for one timeframe, served from the session cache. Used by
    /// callers that render charts after a scan.
    pub async fn bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Arc<Vec<Bar>>, ScannerError> {
        match timeframe {
            Timeframe::Daily => self.daily_bars(symbol).await,
            Timeframe::Weekly => {
                let daily = self.daily_bars(symbol).await?;
                self.weekly_bars(symbol, &daily).await
            }
        }
    }

    async fn daily_bars(&self, symbol: &str) -> Result<Arc<Vec<Bar>>, ScannerError> {
        if !self.config.refresh {
            if let Some(bars) = self.cache.get(symbol, Timeframe::Daily, self.config.period) {
                return Ok(bars);
            }
        }
        let bars = self
            .provider
            .fetch_bars(symbol, Timeframe::Daily, self.config.period)
            .await?;
        ensure_usable(symbol, &bars)?;
        Ok(self
            .cache
            .insert(symbol.to_string(), Timeframe::Daily, self.config.period, bars))
    }

    /// Weekly series derived from the daily bars already in hand, falling
    /// back to the provider's native weekly interval when the resampled
    /// series is too thin.
    async fn weekly_bars(
        &self,
        symbol: &str,
        daily: &[Bar],
    ) -> Result<Arc<Vec<Bar>>, ScannerError> {
        if !self.config.refresh {
            if let Some(bars) = self.cache.get(symbol, Timeframe::Weekly, self.config.period) {
                return Ok(bars);
            }
        }
        let resampled = resample_weekly(daily);
        let bars = if resampled.len() >= MIN_BARS {
            resampled
        } else {
            log::debug!(
                "{}: only {} resampled weekly bars, fetching native weekly series",
                symbol,
                resampled.len()
            );
            let native = self
                .provider
                .fetch_bars(symbol, Timeframe::Weekly, self.config.period)
                .await?;
            ensure_usable(symbol, &native)?;
            native
        };
        Ok(self
            .cache
            .insert(symbol.to_string(), Timeframe::Weekly, self.config.period, bars))
    }

    fn plan_for(
        &self,
        status: ConvergenceStatus,
        close: Option<f64>,
        atr: Option<f64>,
    ) -> Option<TradePlan> {
        let direction = match status.signal() {
            Some(Signal::Buy) => TradeDirection::Long,
            Some(Signal::Sell) => TradeDirection::Short,
            _ => return None,
        };
        let entry = close?;
        let atr = atr?;
        match build_plan(entry, atr, direction, &self.config.risk) {
            Ok(plan) => Some(plan),
            Err(err) => {
                log::debug!("trade plan skipped: {}", err);
                None
            }
        }
    }

    fn skip(&self, instrument: &Instrument, err: ScannerError) -> ScanRow {
        if err.is_data_unavailable() {
            log::warn!("{}: skipped: {}", instrument.ticker, err);
        } else {
            log::error!("{}: scan failed: {}", instrument.ticker, err);
        }
        ScanRow::unavailable(instrument, err.to_string())
    }
}

fn reading_of(series: &ChannelSeries) -> Option<TimeframeReading> {
    let direction = series.latest_direction()?;
    Some(TimeframeReading::new(direction, series.latest_crossover()))
}

fn ensure_usable(symbol: &str, bars: &[Bar]) -> Result<(), ScannerError> {
    if bars.len() < MIN_BARS {
        return Err(ScannerError::InsufficientData(format!(
            "{}: {} usable bars, need at least {}",
            symbol,
            bars.len(),
            MIN_BARS
        )));
    }
    Ok(())
}
