use scanner_core::ScannerError;
use serde::{Deserialize, Serialize};

/// Side of a planned trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    pub fn to_label(&self) -> &'static str {
        match self {
            TradeDirection::Long => "long",
            TradeDirection::Short => "short",
        }
    }
}

/// Stop/target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// ATR multiples between entry and stop
    #[serde(default = "default_stop_multiplier")]
    pub stop_multiplier: f64,
    /// Risk multiples projected to target levels
    #[serde(default = "default_target_multipliers")]
    pub target_multipliers: Vec<f64>,
    /// The multiple that headlines the plan and the results table
    #[serde(default = "default_primary_multiplier")]
    pub primary_multiplier: f64,
}

fn default_stop_multiplier() -> f64 { 1.5 }
fn default_target_multipliers() -> Vec<f64> { vec![1.5, 2.0, 2.5, 3.0] }
fn default_primary_multiplier() -> f64 { 2.0 }

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_multiplier: default_stop_multiplier(),
            target_multipliers: default_target_multipliers(),
            primary_multiplier: default_primary_multiplier(),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ScannerError> {
        if self.stop_multiplier.is_nan() || self.stop_multiplier <= 0.0 {
            return Err(ScannerError::InvalidParameter(
                "stop multiplier must be positive".to_string(),
            ));
        }
        if self.target_multipliers.is_empty() {
            return Err(ScannerError::InvalidParameter(
                "at least one target multiplier is required".to_string(),
            ));
        }
        for &m in &self.target_multipliers {
            if m.is_nan() || m <= 0.0 {
                return Err(ScannerError::InvalidParameter(format!(
                    "target multiplier must be positive, got {}",
                    m
                )));
            }
        }
        if self.primary_multiplier.is_nan() || self.primary_multiplier <= 0.0 {
            return Err(ScannerError::InvalidParameter(
                "primary target multiplier must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// One projected exit level; the multiplier doubles as its R:R
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetLevel {
    pub multiplier: f64,
    pub price: f64,
}

/// Advisory plan for one entry, recomputed on demand and never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePlan {
    pub direction: TradeDirection,
    pub entry: f64,
    pub stop: f64,
    /// Stop distance in price, always positive
    pub risk: f64,
    pub atr: f64,
    pub targets: Vec<TargetLevel>,
    pub primary_target: f64,
    /// R:R of the primary target
    pub risk_reward: f64,
}

impl TradePlan {
    /// Signed distance from entry to the stop, in percent
    pub fn stop_percent(&self) -> f64 {
        (self.stop - self.entry) / self.entry * 100.0
    }

    /// Signed distance from entry to a price, in percent
    pub fn distance_percent(&self, price: f64) -> f64 {
        (price - self.entry) / self.entry * 100.0
    }
}

/// Position sized from account capital
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSize {
    pub shares: u64,
    pub position_value: f64,
    /// Capital lost if the stop fills
    pub risk_amount: f64,
    pub capital_fraction_percent: f64,
}
