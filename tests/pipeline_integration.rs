//! End-to-end scenarios: constant revenue, seed-history boundaries, schema
//! drift, hold-out chronology and artifact round trips.

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use revenue_forecast::config::{ParamGrid, PipelineConfig, SearchConfig};
use revenue_forecast::core::{DailySeries, TargetColumn, DEFAULT_IQR_MULTIPLIER};
use revenue_forecast::features::{build_feature_matrix, FeatureSchema, FEATURE_NAMES};
use revenue_forecast::forecasting::RecursiveForecaster;
use revenue_forecast::models::{GbmParams, GradientBoostingRegressor, Regressor};
use revenue_forecast::pipeline::Pipeline;
use revenue_forecast::report::{master_report, RecordCategory};
use revenue_forecast::training::TrainedModel;
use revenue_forecast::ForecastError;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

fn quick_config() -> PipelineConfig {
    PipelineConfig::default().with_search(
        SearchConfig::default()
            .with_grid(ParamGrid {
                n_estimators: vec![10, 20],
                learning_rate: vec![0.3],
                max_depth: vec![2, 3],
                subsample: vec![0.8, 1.0],
                colsample_bytree: vec![1.0],
            })
            .with_n_iter(3)
            .with_n_splits(3),
    )
}

fn weekly_series(n: usize) -> DailySeries {
    let values: Vec<f64> = (0..n)
        .map(|i| {
            let weekday = (i % 7) as f64;
            400.0 + 25.0 * weekday + if i % 7 == 5 { 300.0 } else { 0.0 }
        })
        .collect();
    DailySeries::from_values(start(), &values).unwrap()
}

#[test]
fn constant_revenue_forecasts_the_constant() {
    let series = DailySeries::from_values(start(), &[100.0; 400]).unwrap();

    let output = Pipeline::new(quick_config()).unwrap().run(&series).unwrap();

    assert_eq!(output.forecast.len(), 30);
    for value in output.forecast.values() {
        assert_relative_eq!(value, 100.0, epsilon = 1e-6);
    }
    assert_relative_eq!(output.metrics.mae, 0.0, epsilon = 1e-6);
}

#[test]
fn holdout_never_leaks_into_training() {
    let series = weekly_series(200);
    let matrix = build_feature_matrix(&series, TargetColumn::Clipped);

    let output = Pipeline::new(quick_config()).unwrap().run(&series).unwrap();

    let holdout_dates = output.backtest.dates();
    assert_eq!(holdout_dates, matrix.dates()[matrix.len() - 30..].to_vec());
    assert!(output.model.trained_through() < holdout_dates[0]);
    assert_eq!(
        output.model.trained_through() + Duration::days(1),
        holdout_dates[0]
    );
}

#[test]
fn weekly_pattern_is_learned() {
    let series = weekly_series(240);

    let output = Pipeline::new(quick_config()).unwrap().run(&series).unwrap();

    assert!(output.metrics.mae < 40.0, "hold-out MAE {}", output.metrics.mae);
    let peaks = output.forecast.top_peaks(4);
    assert!(peaks.iter().all(|p| p.predicted_value > 600.0));
}

#[test]
fn seed_history_boundaries() {
    let history = weekly_series(120);
    let output = Pipeline::new(quick_config()).unwrap().run(&history).unwrap();
    let forecaster = RecursiveForecaster::default();

    let thirty = history.tail(30);
    let forecast = forecaster.forecast(&output.model, &thirty).unwrap();
    assert_eq!(forecast.len(), 30);
    assert_eq!(
        forecast.first_date(),
        thirty.last_date().map(|d| d + Duration::days(1))
    );

    let twenty_nine = history.tail(29);
    assert_eq!(
        forecaster.forecast(&output.model, &twenty_nine),
        Err(ForecastError::InsufficientData { needed: 30, got: 29 })
    );
}

#[test]
fn schema_drift_is_detected_at_first_prediction() {
    let series = weekly_series(90);
    let matrix = build_feature_matrix(&series, TargetColumn::Clipped);

    // A model trained on one extra feature the transform never produces.
    let mut names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    names.push("lag_365".to_string());
    let design: Vec<Vec<f64>> = matrix
        .design()
        .into_iter()
        .map(|mut row| {
            row.push(0.0);
            row
        })
        .collect();
    let mut regressor = GradientBoostingRegressor::new(GbmParams::default().with_n_estimators(5));
    regressor.fit(&design, &matrix.labels()).unwrap();
    assert_eq!(regressor.n_features(), Some(20));
    let model = TrainedModel::new(
        regressor,
        FeatureSchema::new(names).unwrap(),
        TargetColumn::Clipped,
        matrix.last_date().unwrap(),
    )
    .unwrap();

    let result = RecursiveForecaster::default().forecast(&model, &series);
    assert_eq!(
        result,
        Err(ForecastError::SchemaMismatch {
            missing: vec!["lag_365".to_string()],
            unexpected: vec![],
        })
    );
}

#[test]
fn reloaded_model_forecasts_identically() {
    let series = weekly_series(150);
    let output = Pipeline::new(quick_config()).unwrap().run(&series).unwrap();

    let json = output.model.to_json().unwrap();
    let reloaded = TrainedModel::from_json(&json).unwrap();
    let forecast = RecursiveForecaster::default()
        .forecast(&reloaded, &series)
        .unwrap();

    for (a, b) in forecast.values().iter().zip(output.forecast.values()) {
        assert_relative_eq!(*a, b, epsilon = 1e-6, max_relative = 1e-9);
    }
}

#[test]
fn pipeline_runs_are_reproducible() {
    let series = weekly_series(130);
    let pipeline = Pipeline::new(quick_config()).unwrap();

    let a = pipeline.run(&series).unwrap();
    let b = pipeline.run(&series).unwrap();

    assert_eq!(a.model, b.model);
    assert_eq!(a.forecast, b.forecast);
    assert_eq!(a.search.best_params, b.search.best_params);
}

#[test]
fn raw_target_column_flows_through() {
    let totals: Vec<(NaiveDate, f64)> = (0..150)
        .map(|i| {
            let value = if i == 100 { 50_000.0 } else { 300.0 + (i % 7) as f64 * 20.0 };
            (start() + Duration::days(i), value)
        })
        .collect();
    let series = DailySeries::from_daily_totals(&totals, DEFAULT_IQR_MULTIPLIER).unwrap();
    assert!(series.get(100).unwrap().clipped_value < 50_000.0);

    let config = quick_config().with_target_column(TargetColumn::Raw);
    let output = Pipeline::new(config).unwrap().run(&series).unwrap();

    assert_eq!(output.model.target_column(), TargetColumn::Raw);
    assert_eq!(output.forecast.len(), 30);
}

#[test]
fn master_report_joins_history_and_forecast() {
    let series = weekly_series(100);
    let output = Pipeline::new(quick_config().with_horizon(14))
        .unwrap()
        .run(&series)
        .unwrap();

    let report = master_report(&series, &output.forecast);

    assert_eq!(report.len(), 114);
    assert_eq!(report[99].category, RecordCategory::Actual);
    assert_eq!(report[100].category, RecordCategory::Forecast);
    assert!(report.windows(2).all(|w| w[1].date == w[0].date + Duration::days(1)));

    let band = output.forecast.band(20.0).unwrap();
    assert!(band.iter().all(|b| b.lower <= b.predicted_value && b.predicted_value <= b.upper));
}
