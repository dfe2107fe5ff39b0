use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scanner_core::{Bar, FetchPeriod, MarketDataProvider, ScannerError, Timeframe, MIN_BARS};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://query1.finance.yahoo.com";

// Yahoo throttles the default client agent hard
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:130.0) Gecko/20100101 Firefox/130.0";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let oldest = match ts.front() {
                Some(&front) => front,
                None => return,
            };
            let sleep_dur =
                (oldest + self.window).duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for a chart-endpoint slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Client for the Yahoo Finance v8 chart endpoint
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl YahooClient {
    pub fn new() -> Self {
        // The anonymous endpoint tolerates roughly one request per second;
        // set YAHOO_RATE_LIMIT to raise or lower the per-minute budget.
        let rate_limit: usize = std::env::var("YAHOO_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let base_url =
            std::env::var("YAHOO_BASE_URL").unwrap_or_else(|_| BASE_URL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ScannerError> {
        let request = builder
            .build()
            .map_err(|e| ScannerError::ProviderError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request.try_clone().ok_or_else(|| {
                ScannerError::ProviderError("Cannot clone request".to_string())
            })?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| ScannerError::ProviderError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 5u64;
            tracing::warn!(
                "Chart endpoint 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(ScannerError::ProviderError(
            "Rate limited by the chart endpoint after 3 retries".to_string(),
        ))
    }

    /// Fetch raw bars for one symbol at a given interval and range.
    /// Rows with a null close are dropped.
    pub async fn fetch_chart(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<Vec<Bar>, ScannerError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("range", range),
                ("interval", interval),
                ("events", "history"),
            ]))
            .await?;

        if response.status().as_u16() == 404 {
            return Err(ScannerError::UnknownSymbol(symbol.to_string()));
        }
        if !response.status().is_success() {
            return Err(ScannerError::ProviderError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| ScannerError::ProviderError(e.to_string()))?;

        let bars = bars_from_chart(symbol, chart)?;
        tracing::debug!("{}: {} bars at {} over {}", symbol, bars.len(), interval, range);
        Ok(bars)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        period: FetchPeriod,
    ) -> Result<Vec<Bar>, ScannerError> {
        let bars = self
            .fetch_chart(symbol, timeframe.interval_param(), period.range_param())
            .await?;
        ensure_enough(symbol, bars)
    }
}

/// Reject a series too short to analyze
pub fn ensure_enough(symbol: &str, bars: Vec<Bar>) -> Result<Vec<Bar>, ScannerError> {
    if bars.len() < MIN_BARS {
        return Err(ScannerError::InsufficientData(format!(
            "{}: {} usable bars, need at least {}",
            symbol,
            bars.len(),
            MIN_BARS
        )));
    }
    Ok(bars)
}

fn bars_from_chart(symbol: &str, response: ChartResponse) -> Result<Vec<Bar>, ScannerError> {
    if let Some(error) = response.chart.error {
        return Err(ScannerError::UnknownSymbol(format!(
            "{}: {}",
            symbol, error.description
        )));
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| {
            ScannerError::ProviderError(format!("{}: empty chart payload", symbol))
        })?;

    let quote = result.indicators.quote.into_iter().next().ok_or_else(|| {
        ScannerError::ProviderError(format!("{}: chart payload without quotes", symbol))
    })?;
    let adjclose = result
        .indicators
        .adjclose
        .and_then(|a| a.into_iter().next());

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        // A null close means a non-trading row; skip the bar entirely
        let close = match quote.close.get(i).copied().flatten() {
            Some(c) => c,
            None => continue,
        };

        bars.push(Bar {
            timestamp: DateTime::from_timestamp(*ts, 0).unwrap_or_else(Utc::now),
            open: quote.open.get(i).copied().flatten().unwrap_or(close),
            high: quote.high.get(i).copied().flatten().unwrap_or(close),
            low: quote.low.get(i).copied().flatten().unwrap_or(close),
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0.0),
            adj_close: adjclose
                .as_ref()
                .and_then(|a| a.adjclose.get(i).copied().flatten()),
        });
    }

    Ok(bars)
}

// Response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    #[allow(dead_code)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Option<Vec<ChartAdjClose>>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}
