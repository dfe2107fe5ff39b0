use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use plotters::coord::Shift;
use plotters::prelude::*;

use channel_indicator::{ChannelSeries, Crossover};
use risk_planner::TradePlan;
use scanner_core::Bar;

const GAIN: RGBColor = RGBColor(38, 166, 154);
const LOSS: RGBColor = RGBColor(239, 83, 80);
const UPPER_BAND: RGBColor = RGBColor(229, 57, 53);
const UNDER_BAND: RGBColor = RGBColor(67, 160, 71);
const MIDLINE: RGBColor = RGBColor(30, 136, 229);
const FAST_LINE: RGBColor = RGBColor(251, 140, 0);
const LEVEL_LINE: RGBColor = RGBColor(97, 97, 97);

/// Renders the daily and weekly candles with their channel overlays into
/// one PNG, daily on top. Trade levels and crossover markers only make
/// sense on the daily panel, so the weekly one goes without them.
pub fn render_dual_chart(
    symbol: &str,
    daily: &[Bar],
    daily_series: &ChannelSeries,
    weekly: &[Bar],
    weekly_series: &ChannelSeries,
    plan: Option<&TradePlan>,
    out_dir: &Path,
) -> Result<PathBuf> {
    if daily.is_empty() || weekly.is_empty() {
        anyhow::bail!("{}: no bars to chart", symbol);
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let path = out_dir.join(format!("{}_channel_{}.png", symbol, Utc::now().timestamp()));

    let root = BitMapBackend::new(&path, (1280, 960)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("chart render failed: {}", e))?;
    let panels = root.split_evenly((2, 1));

    draw_panel(
        &panels[0],
        &format!("{} daily", symbol),
        daily,
        daily_series,
        plan,
    )?;
    draw_panel(
        &panels[1],
        &format!("{} weekly", symbol),
        weekly,
        weekly_series,
        None,
    )?;

    root.present()
        .map_err(|e| anyhow::anyhow!("chart render failed: {}", e))?;
    drop(panels);
    drop(root);
    Ok(path)
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    caption: &str,
    bars: &[Bar],
    series: &ChannelSeries,
    plan: Option<&TradePlan>,
) -> Result<()> {
    let mut min_price = f64::MAX;
    let mut max_price = f64::MIN;
    for bar in bars {
        min_price = min_price.min(bar.low);
        max_price = max_price.max(bar.high);
    }
    if let Some(plan) = plan {
        min_price = min_price.min(plan.stop);
        max_price = max_price.max(plan.primary_target);
    }
    let pad = (max_price - min_price).max(1e-6) * 0.06;

    let dates: Vec<String> = bars
        .iter()
        .map(|bar| bar.timestamp.format("%Y-%m-%d").to_string())
        .collect();
    let last_index = bars.len() as i32 - 1;

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(28)
        .y_label_area_size(60)
        .build_cartesian_2d(-1i32..bars.len() as i32, (min_price - pad)..(max_price + pad))
        .map_err(|e| anyhow::anyhow!("chart axes: {}", e))?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|x| {
            if *x < 0 || *x > last_index {
                String::new()
            } else {
                dates[*x as usize].clone()
            }
        })
        .draw()
        .map_err(|e| anyhow::anyhow!("chart mesh: {}", e))?;

    chart
        .draw_series(bars.iter().enumerate().map(|(i, bar)| {
            CandleStick::new(
                i as i32,
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                GAIN.filled(),
                LOSS.filled(),
                3,
            )
        }))
        .map_err(|e| anyhow::anyhow!("candles: {}", e))?;

    let overlays: [(&[Option<f64>], RGBColor, &str); 4] = [
        (&series.upper, UPPER_BAND, "upper"),
        (&series.under, UNDER_BAND, "under"),
        (&series.mid, MIDLINE, "mid"),
        (&series.fast, FAST_LINE, "fast"),
    ];
    for (values, color, label) in overlays {
        let points: Vec<(i32, f64)> = values
            .iter()
            .enumerate()
            .filter_map(|(i, value)| value.map(|y| (i as i32, y)))
            .collect();
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))
            .map_err(|e| anyhow::anyhow!("overlay {}: {}", label, e))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
            });
    }

    // Triangles sit just outside the bar range, green below for bullish
    // flips and red above for bearish ones.
    let marker_offset = pad * 0.5;
    let crossovers = series.crossovers();
    chart
        .draw_series(crossovers.iter().enumerate().filter_map(|(i, cross)| {
            cross.map(|cross| {
                let (y, color) = match cross {
                    Crossover::Bullish => (bars[i].low - marker_offset, UNDER_BAND),
                    Crossover::Bearish => (bars[i].high + marker_offset, UPPER_BAND),
                };
                TriangleMarker::new((i as i32, y), 6, color.filled())
            })
        }))
        .map_err(|e| anyhow::anyhow!("crossover markers: {}", e))?;

    if let Some(plan) = plan {
        let levels = [
            (plan.entry, LEVEL_LINE, "entry"),
            (plan.stop, LOSS, "stop"),
            (plan.primary_target, GAIN, "target"),
        ];
        for (level, color, label) in levels {
            chart
                .draw_series(LineSeries::new(
                    vec![(0, level), (last_index, level)],
                    color.stroke_width(1),
                ))
                .map_err(|e| anyhow::anyhow!("level {}: {}", label, e))?
                .label(label)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(1))
                });
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| anyhow::anyhow!("legend: {}", e))?;

    Ok(())
}
