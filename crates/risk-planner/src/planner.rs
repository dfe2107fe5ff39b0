use scanner_core::ScannerError;

use crate::models::{PositionSize, RiskConfig, TargetLevel, TradeDirection, TradePlan};

/// Build a plan from the latest close and ATR.
///
/// Rejects a non-positive entry or ATR before computing anything: with no
/// volatility there is no stop distance, and a stop equal to the entry is
/// never a valid answer.
pub fn build_plan(
    entry: f64,
    atr: f64,
    direction: TradeDirection,
    config: &RiskConfig,
) -> Result<TradePlan, ScannerError> {
    config.validate()?;

    if entry.is_nan() || entry <= 0.0 {
        return Err(ScannerError::InvalidParameter(format!(
            "entry price must be positive, got {}",
            entry
        )));
    }
    if atr.is_nan() || atr <= 0.0 {
        return Err(ScannerError::InvalidParameter(format!(
            "ATR must be positive, got {}",
            atr
        )));
    }

    let risk = config.stop_multiplier * atr;
    let stop = match direction {
        TradeDirection::Long => entry - risk,
        TradeDirection::Short => entry + risk,
    };

    let targets = config
        .target_multipliers
        .iter()
        .map(|&multiplier| TargetLevel {
            multiplier,
            price: project(entry, direction, multiplier * risk),
        })
        .collect();

    Ok(TradePlan {
        direction,
        entry,
        stop,
        risk,
        atr,
        targets,
        primary_target: project(entry, direction, config.primary_multiplier * risk),
        risk_reward: config.primary_multiplier,
    })
}

fn project(entry: f64, direction: TradeDirection, distance: f64) -> f64 {
    match direction {
        TradeDirection::Long => entry + distance,
        TradeDirection::Short => entry - distance,
    }
}

/// Shares affordable at the plan's per-share risk. Zero shares is a valid
/// answer when the budget does not cover one share of risk.
pub fn position_size(
    capital: f64,
    risk_percent: f64,
    plan: &TradePlan,
) -> Result<PositionSize, ScannerError> {
    if capital.is_nan() || capital <= 0.0 {
        return Err(ScannerError::InvalidParameter(format!(
            "capital must be positive, got {}",
            capital
        )));
    }
    if risk_percent.is_nan() || risk_percent <= 0.0 || risk_percent > 100.0 {
        return Err(ScannerError::InvalidParameter(format!(
            "risk percent must be in (0, 100], got {}",
            risk_percent
        )));
    }

    let budget = capital * risk_percent / 100.0;
    let shares = (budget / plan.risk).floor() as u64;
    let position_value = shares as f64 * plan.entry;

    Ok(PositionSize {
        shares,
        position_value,
        risk_amount: shares as f64 * plan.risk,
        capital_fraction_percent: position_value / capital * 100.0,
    })
}

/// Multi-line plan block for terminal output
pub fn format_plan(symbol: &str, plan: &TradePlan, size: Option<&PositionSize>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {} plan\n", symbol, plan.direction.to_label()));
    out.push_str(&format!("  entry  {:>10.2}\n", plan.entry));
    out.push_str(&format!(
        "  stop   {:>10.2}  ({:+.1}%, {:.1}x ATR {:.2})\n",
        plan.stop,
        plan.stop_percent(),
        plan.risk / plan.atr,
        plan.atr
    ));
    for target in &plan.targets {
        out.push_str(&format!(
            "  target {:>10.2}  ({:+.1}%)  R:R {:.1}\n",
            target.price,
            plan.distance_percent(target.price),
            target.multiplier
        ));
    }
    out.push_str(&format!("  risk per share {:.2}\n", plan.risk));
    if let Some(size) = size {
        out.push_str(&format!(
            "  position {} shares ≈ {:.2} ({:.1}% of capital, {:.2} at risk)\n",
            size.shares, size.position_value, size.capital_fraction_percent, size.risk_amount
        ));
    }
    out
}
