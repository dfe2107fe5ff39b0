use std::path::Path;

use anyhow::{Context, Result};
use convergence_engine::ScanReport;
use scanner_core::SignalDirection;

/// Writes the full scan outcome, no-data rows included, as CSV.
pub fn write_report_csv(path: &Path, report: &ScanReport) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "ticker",
        "name",
        "category",
        "status",
        "signal",
        "last_close",
        "daily_direction",
        "weekly_direction",
        "entry",
        "stop",
        "target",
        "risk_reward",
        "volatility_21d",
        "trend",
        "note",
    ])?;

    for row in &report.rows {
        let plan = row.plan.as_ref();
        writer.write_record([
            row.ticker.clone(),
            row.name.clone(),
            row.category.label().to_string(),
            row.status.to_label().to_string(),
            row.signal.map(|s| s.to_label().to_string()).unwrap_or_default(),
            decimal(row.last_close),
            direction(row.daily_direction),
            direction(row.weekly_direction),
            decimal(plan.map(|p| p.entry)),
            decimal(plan.map(|p| p.stop)),
            decimal(plan.map(|p| p.primary_target)),
            decimal(plan.map(|p| p.risk_reward)),
            decimal(row.volatility),
            row.trend.map(|t| t.to_label().to_string()).unwrap_or_default(),
            row.note.clone().unwrap_or_default(),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))
}

fn decimal(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn direction(value: Option<SignalDirection>) -> String {
    value.map(|d| d.to_label().to_string()).unwrap_or_default()
}
