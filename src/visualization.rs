use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::error::Error;

use chrono::NaiveDate;
use ndarray::Array2;

use crate::analysis::{AssetStats, CorrelationMatrix};
use crate::table::{PriceTable, ReturnsTable};

pub fn plot_price_history(prices: &PriceTable, output_path: &str) -> Result<(), Box<dyn Error>> {
    plot_multi_line(
        output_path,
        "Historical Adjusted Close Prices",
        "Adjusted Close Price ($)",
        prices.dates(),
        prices.tickers(),
        prices.values(),
    )?;
    println!("Price history saved to {}", output_path);
    Ok(())
}

pub fn plot_cumulative_returns(
    cumulative: &ReturnsTable,
    output_path: &str,
) -> Result<(), Box<dyn Error>> {
    let percent = cumulative.values().mapv(|v| v * 100.0);
    plot_multi_line(
        output_path,
        "Cumulative Returns Over Time",
        "Cumulative Return (%)",
        cumulative.dates(),
        cumulative.tickers(),
        &percent,
    )?;
    println!("Cumulative returns saved to {}", output_path);
    Ok(())
}

/// One line per ticker over a shared date index. The x axis is the row
/// index with date tick labels, so no datetime coordinate plumbing is needed.
fn plot_multi_line(
    output_path: &str,
    caption: &str,
    y_desc: &str,
    dates: &[NaiveDate],
    tickers: &[String],
    values: &Array2<f64>,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let y_max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let pad = ((y_max - y_min) * 0.05).max(1e-6);

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..values.nrows(), (y_min - pad)..(y_max + pad))?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|idx: &usize| {
            dates
                .get(*idx)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .x_desc("Date")
        .y_desc(y_desc)
        .draw()?;

    for (i, ticker) in tickers.iter().enumerate() {
        let color = Palette99::pick(i).mix(1.0);
        chart
            .draw_series(LineSeries::new(
                values.column(i).iter().enumerate().map(|(t, v)| (t, *v)),
                color.stroke_width(2),
            ))?
            .label(ticker.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart.configure_series_labels().border_style(BLACK).draw()?;
    root.present()?;
    Ok(())
}

/// Histogram grid of daily returns, one panel per ticker (first four).
pub fn plot_returns_distribution(
    returns: &ReturnsTable,
    output_path: &str,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(output_path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let areas = root.split_evenly((2, 2));
    for (idx, ticker) in returns.tickers().iter().take(4).enumerate() {
        let percent: Vec<f64> = returns.column(idx).iter().map(|r| r * 100.0).collect();
        draw_histogram(&areas[idx], &format!("{} Daily Returns", ticker), &percent)?;
    }

    root.present()?;
    println!("Returns distribution saved to {}", output_path);
    Ok(())
}

/// Histogram of the realized weighted daily portfolio returns.
pub fn plot_portfolio_distribution(
    series: &[f64],
    output_path: &str,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let percent: Vec<f64> = series.iter().map(|r| r * 100.0).collect();
    draw_histogram(&root, "Portfolio Daily Returns", &percent)?;

    root.present()?;
    println!("Portfolio distribution saved to {}", output_path);
    Ok(())
}

fn draw_histogram(
    area: &DrawingArea<BitMapBackend, Shift>,
    caption: &str,
    returns_pct: &[f64],
) -> Result<(), Box<dyn Error>> {
    // Calculate min and max returns for the x-axis
    let min_return = returns_pct.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_return = returns_pct.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = (max_return - min_return).max(1e-9);

    // Set number of bins for hist.
    let num_bins = 50;
    let bin_width = span / num_bins as f64;

    let mut bins = vec![0i32; num_bins];
    for r in returns_pct {
        let mut bin = ((*r - min_return) / bin_width) as usize;
        if bin >= num_bins {
            bin = num_bins - 1;
        }
        bins[bin] += 1;
    }
    let max_count = bins.iter().cloned().max().unwrap_or(1);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(min_return..(min_return + span), 0..(max_count + 1))?;

    chart
        .configure_mesh()
        .x_desc("Daily Return (%)")
        .y_desc("Frequency")
        .draw()?;

    for (i, count) in bins.iter().enumerate() {
        let x0 = min_return + i as f64 * bin_width;
        let x1 = x0 + bin_width;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x0, 0), (x1, *count)],
            BLUE.filled(),
        )))?;
    }
    Ok(())
}

/// Annotated correlation heatmap, white at zero, red positive, blue negative.
pub fn plot_correlation_heatmap(
    matrix: &CorrelationMatrix,
    output_path: &str,
) -> Result<(), Box<dyn Error>> {
    let n = matrix.n_assets();
    let root = BitMapBackend::new(output_path, (800, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Returns Correlation Matrix", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..n as f64, 0f64..n as f64)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n + 1)
        .y_labels(n + 1)
        .x_label_formatter(&|x| cell_label(matrix.tickers(), *x))
        .y_label_formatter(&|y| cell_label(matrix.tickers(), *y))
        .draw()?;

    for i in 0..n {
        for j in 0..n {
            let rho = matrix.values()[[j, i]];
            let (x0, y0) = (i as f64, j as f64);
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                correlation_color(rho).filled(),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                format!("{:.2}", rho),
                (x0 + 0.35, y0 + 0.55),
                ("sans-serif", 16).into_font().color(&BLACK),
            )))?;
        }
    }

    root.present()?;
    println!("Correlation heatmap saved to {}", output_path);
    Ok(())
}

// Label a tick only when it falls on a cell boundary.
fn cell_label(tickers: &[String], pos: f64) -> String {
    let idx = pos.round() as usize;
    if (pos - idx as f64).abs() < 1e-6 {
        tickers.get(idx).cloned().unwrap_or_default()
    } else {
        String::new()
    }
}

fn correlation_color(rho: f64) -> RGBColor {
    let clamped = rho.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        let fade = (255.0 * (1.0 - clamped)) as u8;
        RGBColor(255, fade, fade)
    } else {
        let fade = (255.0 * (1.0 + clamped)) as u8;
        RGBColor(fade, fade, 255)
    }
}

/// Annualized volatility vs annualized return, one labelled point per ticker.
pub fn plot_risk_return(
    stats: &BTreeMap<String, AssetStats>,
    output_path: &str,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = stats
        .values()
        .map(|s| s.annualized_volatility * 100.0)
        .fold(0.0, f64::max)
        * 1.2;
    let x_max = x_max.max(1.0);
    let y_min = stats
        .values()
        .map(|s| s.annualized_return * 100.0)
        .fold(f64::INFINITY, f64::min);
    let y_max = stats
        .values()
        .map(|s| s.annualized_return * 100.0)
        .fold(f64::NEG_INFINITY, f64::max);
    let pad = ((y_max - y_min) * 0.2).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .caption("Risk vs Return Profile", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, (y_min - pad)..(y_max + pad))?;

    chart
        .configure_mesh()
        .x_desc("Annualized Volatility (Risk) %")
        .y_desc("Annualized Return %")
        .draw()?;

    for (ticker, s) in stats {
        let x = s.annualized_volatility * 100.0;
        let y = s.annualized_return * 100.0;
        chart.draw_series(std::iter::once(Circle::new((x, y), 6, BLUE.filled())))?;
        chart.draw_series(std::iter::once(Text::new(
            ticker.clone(),
            (x + x_max * 0.015, y),
            ("sans-serif", 15).into_font(),
        )))?;
    }

    root.present()?;
    println!("Risk/return scatter saved to {}", output_path);
    Ok(())
}
