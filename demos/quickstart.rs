//! Train on two years of synthetic daily revenue and print a 30-day forecast.
//!
//! Run with `RUST_LOG=revenue_forecast=debug` for search progress.

use chrono::{Duration, NaiveDate};
use revenue_forecast::core::DEFAULT_IQR_MULTIPLIER;
use revenue_forecast::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn synthetic_totals() -> Vec<(NaiveDate, f64)> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    (0..730)
        // A few closed days leave gaps that are filled with zero.
        .filter(|i| i % 97 != 13)
        .map(|i| {
            let date = start + Duration::days(i);
            let weekend = if i % 7 >= 5 { 400.0 } else { 0.0 };
            let season = 250.0 * (2.0 * std::f64::consts::PI * i as f64 / 365.0).cos();
            let promo = if i % 61 == 0 { 9000.0 } else { 0.0 };
            (date, 2000.0 + weekend + season + promo)
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revenue_forecast=info".into()),
        )
        .init();

    let series = DailySeries::from_daily_totals(&synthetic_totals(), DEFAULT_IQR_MULTIPLIER)?;

    // A reduced grid keeps the demo fast; the default grid is the full search.
    let config = PipelineConfig::default().with_search(
        SearchConfig::default()
            .with_grid(ParamGrid {
                n_estimators: vec![100, 200],
                learning_rate: vec![0.05, 0.1],
                max_depth: vec![3, 5],
                subsample: vec![0.8, 1.0],
                colsample_bytree: vec![0.8, 1.0],
            })
            .with_n_iter(6),
    );
    let output = Pipeline::new(config)?.run(&series)?;

    println!("Selected: {}", output.model.params().key());
    println!(
        "Hold-out MAE {:.1}, RMSE {:.1}, R^2 {:.3}",
        output.metrics.mae, output.metrics.rmse, output.metrics.r_squared
    );

    println!("\n{:<12} {:>10} {:>10} {:>10}", "date", "low", "forecast", "high");
    for point in output.forecast.band(15.0)? {
        println!(
            "{:<12} {:>10.0} {:>10.0} {:>10.0}",
            point.date, point.lower, point.predicted_value, point.upper
        );
    }

    println!("\nTop 5 days:");
    for point in output.forecast.top_peaks(5) {
        println!("  {} {:.0}", point.date.format("%a %Y-%m-%d"), point.predicted_value);
    }

    let report = master_report(&series, &output.forecast);
    println!("\nReport rows: {}", report.len());
    if let Some(last) = report.last() {
        println!("{}", serde_json::to_string_pretty(last)?);
    }

    Ok(())
}
