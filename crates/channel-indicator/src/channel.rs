use scanner_core::{Bar, ScannerError, SignalDirection};
use serde::{Deserialize, Serialize};

/// Smoothing applied to the true-range series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtrSmoothing {
    /// Rolling mean of true range (the published channel formula)
    Simple,
    /// Wilder's recurrence seeded with the rolling mean
    Wilder,
}

/// Channel indicator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// SMA window over highs for the upper band
    pub upper_window: usize,
    /// SMA window over lows for the under band
    pub under_window: usize,
    /// EMA span for the fast average of closes
    pub fast_window: usize,
    pub atr_window: usize,
    pub atr_smoothing: AtrSmoothing,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            upper_window: 20,
            under_window: 30,
            fast_window: 9,
            atr_window: 14,
            atr_smoothing: AtrSmoothing::Simple,
        }
    }
}

impl ChannelConfig {
    /// Reject zero windows before any computation is attempted
    pub fn validate(&self) -> Result<(), ScannerError> {
        let windows = [
            ("upper_window", self.upper_window),
            ("under_window", self.under_window),
            ("fast_window", self.fast_window),
            ("atr_window", self.atr_window),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(ScannerError::InvalidParameter(format!(
                    "{} must be a positive number of bars",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Smallest series length whose latest entry is fully defined
    pub fn min_bars(&self) -> usize {
        self.upper_window
            .max(self.under_window)
            .max(self.fast_window)
            .max(self.atr_window)
    }
}

/// Direction flip of (mid − fast) between consecutive bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    Bullish,
    Bearish,
}

/// Output of the channel computation.
///
/// Every sequence has the same length as the bar series it derives from;
/// entries before the respective window is filled are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSeries {
    pub upper: Vec<Option<f64>>,
    pub under: Vec<Option<f64>>,
    pub mid: Vec<Option<f64>>,
    pub fast: Vec<Option<f64>>,
    pub atr: Vec<Option<f64>>,
}

impl ChannelSeries {
    pub fn len(&self) -> usize {
        self.mid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mid.is_empty()
    }

    /// Direction at one index; `None` where mid or fast is undefined
    pub fn direction(&self, index: usize) -> Option<SignalDirection> {
        let mid = self.mid.get(index).copied().flatten()?;
        let fast = self.fast.get(index).copied().flatten()?;
        Some(SignalDirection::from_levels(mid, fast))
    }

    pub fn latest_direction(&self) -> Option<SignalDirection> {
        self.len().checked_sub(1).and_then(|i| self.direction(i))
    }

    /// Crossover at one index. A bullish flip needs bearish at index−1 and
    /// bullish at index; transitions into or out of a tie do not count.
    pub fn crossover(&self, index: usize) -> Option<Crossover> {
        if index == 0 {
            return None;
        }
        let prev = self.direction(index - 1)?;
        let curr = self.direction(index)?;
        match (prev, curr) {
            (SignalDirection::Bearish, SignalDirection::Bullish) => Some(Crossover::Bullish),
            (SignalDirection::Bullish, SignalDirection::Bearish) => Some(Crossover::Bearish),
            _ => None,
        }
    }

    /// Index-aligned crossover marks, for chart overlays
    pub fn crossovers(&self) -> Vec<Option<Crossover>> {
        (0..self.len()).map(|i| self.crossover(i)).collect()
    }

    /// Whether the newest bar itself flipped the direction
    pub fn latest_crossover(&self) -> Option<Crossover> {
        self.len().checked_sub(1).and_then(|i| self.crossover(i))
    }

    /// Most recent index whose bar flipped the direction
    pub fn last_crossover(&self) -> Option<(usize, Crossover)> {
        (0..self.len())
            .rev()
            .find_map(|i| self.crossover(i).map(|c| (i, c)))
    }

    pub fn last_mid(&self) -> Option<f64> {
        self.mid.last().copied().flatten()
    }

    pub fn last_fast(&self) -> Option<f64> {
        self.fast.last().copied().flatten()
    }

    pub fn last_atr(&self) -> Option<f64> {
        self.atr.last().copied().flatten()
    }
}

/// Compute the channel over one bar series.
///
/// Pure function: the same bars and configuration always produce the same
/// series. A series shorter than a window yields undefined entries for that
/// component rather than an error; only a zero window is rejected.
pub fn compute_channel(bars: &[Bar], config: &ChannelConfig) -> Result<ChannelSeries, ScannerError> {
    config.validate()?;

    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let upper = rolling_mean(&highs, config.upper_window);
    let under = rolling_mean(&lows, config.under_window);

    let mid = upper
        .iter()
        .zip(under.iter())
        .map(|(u, l)| match (u, l) {
            (Some(u), Some(l)) => defined((u + l) / 2.0),
            _ => None,
        })
        .collect();

    let fast = seeded_ema(&closes, config.fast_window);
    let atr = smoothed_atr(bars, config.atr_window, config.atr_smoothing);

    Ok(ChannelSeries {
        upper,
        under,
        mid,
        fast,
        atr,
    })
}

/// NaN reads as undefined for that index
pub(crate) fn defined(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Index-aligned simple moving average
fn rolling_mean(data: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if window == 0 || data.len() < window {
        return result;
    }

    for i in window - 1..data.len() {
        let sum: f64 = data[i + 1 - window..=i].iter().sum();
        result[i] = defined(sum / window as f64);
    }
    result
}

/// Index-aligned EMA seeded with the SMA of the first `span` values
fn seeded_ema(data: &[f64], span: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if span == 0 || data.len() < span {
        return result;
    }

    let multiplier = 2.0 / (span as f64 + 1.0);
    let mut ema = data[..span].iter().sum::<f64>() / span as f64;
    result[span - 1] = defined(ema);

    for i in span..data.len() {
        ema = (data[i] - ema) * multiplier + ema;
        result[i] = defined(ema);
    }
    result
}

/// Index-aligned smoothed true range
fn smoothed_atr(bars: &[Bar], window: usize, smoothing: AtrSmoothing) -> Vec<Option<f64>> {
    let mut result = vec![None; bars.len()];
    if window == 0 || bars.len() < window {
        return result;
    }

    let true_ranges = true_ranges(bars);

    match smoothing {
        AtrSmoothing::Simple => {
            for i in window - 1..true_ranges.len() {
                let sum: f64 = true_ranges[i + 1 - window..=i].iter().sum();
                result[i] = defined(sum / window as f64);
            }
        }
        AtrSmoothing::Wilder => {
            let mut atr = true_ranges[..window].iter().sum::<f64>() / window as f64;
            result[window - 1] = defined(atr);
            for i in window..true_ranges.len() {
                atr = (atr * (window - 1) as f64 + true_ranges[i]) / window as f64;
                result[i] = defined(atr);
            }
        }
    }
    result
}

/// True range per bar; the first bar has no previous close, so its range
/// is high − low.
fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    let mut ranges = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let high_low = bar.high - bar.low;
        if i == 0 {
            ranges.push(high_low);
            continue;
        }
        let high_close = (bar.high - bars[i - 1].close).abs();
        let low_close = (bar.low - bars[i - 1].close).abs();
        ranges.push(high_low.max(high_close).max(low_close));
    }
    ranges
}
