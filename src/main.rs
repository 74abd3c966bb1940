use std::collections::BTreeMap;
use std::error::Error;

use chrono::Local;
use prettytable::{row, Table};
use tracing::info;

use crate::analysis::{AssetStats, PriceSummary};

mod analysis;
mod config;
mod data;
mod table;
mod utils;
mod visualization;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let settings = config::Settings::new().expect("Failed to load configuration");
    if !utils::validate_tickers(&settings.data_api.tickers) {
        return Err("No valid stock tickers configured under [data_api].".into());
    }

    let historical_data = data::fetch_data(&settings).await.expect("Data fetch error");
    let prices = table::PriceTable::from_records(&historical_data)?;
    info!(
        "Price table ready: {} sessions x {} tickers",
        prices.n_rows(),
        prices.n_assets()
    );

    let today = Local::now().format("%Y-%m-%d").to_string();
    let prices_path = format!("data/raw/{}/prices_{}.csv", today, settings.data_api.source);
    utils::write_prices_csv(&prices, &prices_path).expect("Failed to write prices CSV");

    // Compute statistics
    let returns = analysis::compute_returns(&prices)?;
    let asset_stats = analysis::compute_asset_stats(&returns, settings.analysis.risk_free_rate)?;
    let correlation = analysis::compute_correlation_matrix(&returns)?;
    let summary = analysis::price_summary(&prices)?;

    print_metrics_table(&asset_stats);
    print_price_summary(&summary);

    let threshold = settings.analysis.correlation_threshold;
    let pairs = analysis::find_high_correlation_pairs(&correlation, threshold);
    if pairs.is_empty() {
        println!("No ticker pairs with |correlation| >= {}", threshold);
    } else {
        println!("Ticker pairs with |correlation| >= {}:", threshold);
        for (a, b, rho) in &pairs {
            println!("  {} - {}: {:.3}", a, b, rho);
        }
    }

    // Portfolio statistics for the configured (or equal) allocation
    let weights = portfolio_weights(
        prices.tickers(),
        &settings.data_api.tickers,
        settings.analysis.weights.as_deref(),
    );
    let portfolio =
        analysis::compute_portfolio_stats(&returns, &weights, settings.analysis.risk_free_rate)?;
    println!("Portfolio weights = {:?}", weights);
    println!(
        "Portfolio Annualized Return = {:.2}%",
        portfolio.annualized_return * 100.0
    );
    println!(
        "Portfolio Annualized Volatility = {:.2}%",
        portfolio.annualized_volatility * 100.0
    );
    match portfolio.sharpe {
        Some(sharpe) => println!("Portfolio Sharpe = {:.3}", sharpe),
        None => println!("Portfolio Sharpe = undefined (zero volatility)"),
    }

    // Charts
    let cumulative = analysis::compute_cumulative_returns(&returns);
    let portfolio_series = analysis::portfolio_return_series(&returns, &weights)?;
    visualization::plot_price_history(&prices, "prices.png")?;
    visualization::plot_returns_distribution(&returns, "returns_distribution.png")?;
    visualization::plot_correlation_heatmap(&correlation, "correlation_heatmap.png")?;
    visualization::plot_risk_return(&asset_stats, "risk_return.png")?;
    visualization::plot_cumulative_returns(&cumulative, "cumulative_returns.png")?;
    visualization::plot_portfolio_distribution(&portfolio_series, "portfolio_distribution.png")?;

    let metrics_path = format!("data/raw/{}/risk_return_metrics.csv", today);
    utils::write_metrics_csv(&asset_stats, &metrics_path).expect("Failed to write metrics CSV");

    Ok(())
}

/// Map raw config weights onto the resolved price columns. Sloppy totals are
/// renormalized here, the way the original dashboard sliders behaved; the
/// engine itself only accepts vectors that already sum to 1.
fn portfolio_weights(
    tickers: &[String],
    configured_tickers: &[String],
    configured: Option<&[f64]>,
) -> BTreeMap<String, f64> {
    let equal = 1.0 / tickers.len() as f64;
    let by_ticker: BTreeMap<&String, f64> = match configured {
        Some(ws) if ws.len() == configured_tickers.len() => configured_tickers
            .iter()
            .zip(ws.iter().copied())
            .collect(),
        _ => BTreeMap::new(),
    };
    let mut weights: BTreeMap<String, f64> = tickers
        .iter()
        .map(|t| {
            (
                t.clone(),
                by_ticker.get(t).copied().unwrap_or(equal).max(0.0),
            )
        })
        .collect();
    let total: f64 = weights.values().sum();
    if total > 0.0 {
        for w in weights.values_mut() {
            *w /= total;
        }
    } else {
        for w in weights.values_mut() {
            *w = equal;
        }
    }
    weights
}

fn print_metrics_table(stats: &BTreeMap<String, AssetStats>) {
    let mut table = Table::new();
    table.add_row(row![
        "Ticker",
        "Mean Daily Return",
        "Daily Volatility",
        "Ann. Return %",
        "Ann. Volatility %",
        "Sharpe"
    ]);
    for (ticker, s) in stats {
        let sharpe = s
            .sharpe
            .map(|v| format!("{:.3}", v))
            .unwrap_or_else(|| "undefined".to_string());
        table.add_row(row![
            ticker,
            format!("{:.4}", s.mean_return),
            format!("{:.4}", s.volatility),
            format!("{:.2}", s.annualized_return * 100.0),
            format!("{:.2}", s.annualized_volatility * 100.0),
            sharpe
        ]);
    }
    println!("Risk & Return Metrics");
    table.printstd();
}

fn print_price_summary(summary: &BTreeMap<String, PriceSummary>) {
    let mut table = Table::new();
    table.add_row(row!["Ticker", "Min", "Max", "Mean", "Std"]);
    for (ticker, s) in summary {
        table.add_row(row![
            ticker,
            format!("{:.2}", s.min),
            format!("{:.2}", s.max),
            format!("{:.2}", s.mean),
            format!("{:.2}", s.std)
        ]);
    }
    println!("Price Summary");
    table.printstd();
}
