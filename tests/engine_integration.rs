//! End-to-end scenarios through the engine's query interface.

use approx::assert_relative_eq;
use std::f64::consts::PI;
use tracing_subscriber::EnvFilter;
use weekcast::config::{EngineConfig, SelectorConfig};
use weekcast::core::{ConfidenceLevel, EntitySelector, Observation, Quarter, SalesTable};
use weekcast::engine::{ForecastEngine, ForecastRequest};
use weekcast::error::{ErrorCategory, ForecastError};
use weekcast::forecast::ForecastQuery;
use weekcast::series::SeriesBuilder;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weekcast=warn")),
        )
        .with_test_writer()
        .try_init();
}

fn engine(table: SalesTable) -> ForecastEngine {
    init_tracing();
    ForecastEngine::new(table, EngineConfig::default().with_max_concurrent_fits(2)).unwrap()
}

/// Two stores with yearly seasonality and a mild trend.
fn seasonal_table(weeks: u32) -> SalesTable {
    let mut rows = Vec::new();
    for week in 1..=weeks {
        let season = (2.0 * PI * ((week - 1) % 52) as f64 / 52.0).sin();
        let noise = ((week * 7 + 3) % 11) as f64;
        rows.push(Observation::new("north", week, 4000.0 + 900.0 * season + 25.0 * noise));
        rows.push(Observation::new(
            "south",
            week,
            2500.0 + 400.0 * season + 2.0 * week as f64 + 15.0 * noise,
        ));
    }
    SalesTable::new(rows).unwrap()
}

#[test]
fn constant_aggregate_sales_give_flat_forecast() {
    // Four stores of 250,000 each add up to 1,000,000 per week.
    let rows = (1..=104)
        .flat_map(|week| {
            ["a", "b", "c", "d"]
                .into_iter()
                .map(move |store| Observation::new(store, week, 250_000.0))
        })
        .collect();
    let engine = engine(SalesTable::new(rows).unwrap());

    let request = ForecastRequest::new(EntitySelector::All, ForecastQuery::weekly(8));
    let forecast = engine.run_forecast(&request).unwrap();
    assert_eq!(forecast.horizon(), 8);

    let stats = engine.run_statistics(&forecast, None).unwrap();
    assert_relative_eq!(stats.total, 8_000_000.0, max_relative = 1e-4);
    assert_relative_eq!(stats.mean, 1_000_000.0, max_relative = 1e-4);
    assert_relative_eq!(stats.median, 1_000_000.0, max_relative = 1e-4);
}

#[test]
fn single_observation_entity_fails_gracefully() {
    let mut rows: Vec<Observation> = (1..=60)
        .map(|week| Observation::new("big", week, 100.0 + (week % 3) as f64))
        .collect();
    rows.push(Observation::new("tiny", 1, 42.0));
    let engine = engine(SalesTable::new(rows).unwrap());

    let selector = EntitySelector::entity("tiny");
    let series = engine.actuals(&selector).unwrap();
    assert_eq!(series.len(), 1);

    let request = ForecastRequest::new(selector, ForecastQuery::weekly(4));
    match engine.run_forecast(&request) {
        Ok(result) => assert_eq!(result.horizon(), 4),
        Err(err) => assert_eq!(err.category(), ErrorCategory::ModelFit),
    }
}

#[test]
fn zero_q3_actuals_are_excluded_from_ranking() {
    // Weeks 79..=91 are offsets 27..=39 of the trailing year.
    let rows = (1..=104)
        .map(|week| {
            let sales = if (79..=91).contains(&week) {
                0.0
            } else {
                500.0 + ((week * 13) % 17) as f64
            };
            Observation::new("store", week, sales)
        })
        .collect();
    let engine = engine(SalesTable::new(rows).unwrap());

    let report = engine
        .run_comparison(&EntitySelector::entity("store"))
        .unwrap();
    let growth = report.growth.as_ref().unwrap();

    assert!(growth.record(Quarter::Q3).unwrap().growth_pct.is_none());
    assert_eq!(growth.undefined_quarters(), vec![Quarter::Q3]);
    assert_ne!(report.highest_growth_quarter().unwrap(), Quarter::Q3);
    assert_ne!(report.lowest_growth_quarter().unwrap(), Quarter::Q3);
}

#[test]
fn quarterly_mode_matches_weekly_slice() {
    let engine = engine(seasonal_table(130));
    let level = ConfidenceLevel::new(80.0).unwrap();

    let year = engine
        .run_forecast(
            &ForecastRequest::new(EntitySelector::All, ForecastQuery::weekly(52))
                .with_confidence(level),
        )
        .unwrap();

    for quarter in Quarter::ALL {
        let sliced = engine
            .run_forecast(
                &ForecastRequest::new(EntitySelector::All, ForecastQuery::quarterly(quarter))
                    .with_confidence(level),
            )
            .unwrap();
        let window = quarter.window();
        assert_eq!(sliced.horizon(), 13);
        assert_eq!(
            sliced.records(),
            &year.records()[window.first_week - 1..window.last_week]
        );
    }
}

#[test]
fn seasonal_forecast_intervals_are_ordered_and_widen_with_confidence() {
    let engine = engine(seasonal_table(156));
    let base = ForecastRequest::new(EntitySelector::entity("north"), ForecastQuery::weekly(26));

    let at80 = engine
        .run_forecast(&base.clone().with_confidence(ConfidenceLevel::new(80.0).unwrap()))
        .unwrap();
    let at95 = engine
        .run_forecast(&base.with_confidence(ConfidenceLevel::new(95.0).unwrap()))
        .unwrap();

    assert_eq!(engine.cached_models(), 1);
    for (narrow, wide) in at80.records().iter().zip(at95.records()) {
        assert!(narrow.lower <= narrow.point && narrow.point <= narrow.upper);
        assert_eq!(narrow.point, wide.point);
        assert!(wide.lower <= narrow.lower && narrow.upper <= wide.upper);
    }
    let offsets: Vec<usize> = at95.records().iter().map(|r| r.week_offset).collect();
    assert_eq!(offsets, (1..=26).collect::<Vec<_>>());
}

#[test]
fn statistics_over_a_quarter_range() {
    let engine = engine(seasonal_table(130));
    let year = engine
        .run_forecast(&ForecastRequest::new(
            EntitySelector::All,
            ForecastQuery::weekly(52),
        ))
        .unwrap();

    let q1 = engine
        .run_statistics(&year, Some(Quarter::Q1.window().offsets()))
        .unwrap();
    assert_eq!(q1.count, 13);

    let err = engine.run_statistics(&year, Some(60..=70)).unwrap_err();
    assert_eq!(err, ForecastError::EmptyRange);
    assert_eq!(err.category(), ErrorCategory::Range);
}

#[test]
fn comparison_reports_actual_and_forecast_levels() {
    let engine = engine(seasonal_table(156));
    let report = engine.run_comparison(&EntitySelector::All).unwrap();

    assert!(report.actual_mean > 0.0);
    assert!(report.forecast_mean.is_finite());
    assert!(report.highest_growth_quarter().is_ok());
    let growth = report.growth.unwrap();
    assert!(growth.highest.growth_pct >= growth.lowest.growth_pct);
}

#[test]
fn batch_runs_every_store() {
    let engine = engine(seasonal_table(110));
    let requests: Vec<ForecastRequest> = ["north", "south", "west"]
        .into_iter()
        .map(|store| ForecastRequest::new(EntitySelector::entity(store), ForecastQuery::weekly(4)))
        .collect();

    let results = engine.run_batch(&requests);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().horizon(), 4);
    assert_eq!(results[1].as_ref().unwrap().horizon(), 4);
    assert!(matches!(results[2], Err(ForecastError::UnknownEntity(_))));
}

#[test]
fn csv_table_feeds_the_engine() {
    let mut csv = String::from("entity_id,week_index,sales_amount\n");
    for week in 1..=60 {
        csv.push_str(&format!("s1, {week}, {}\n", 80.0 + (week % 5) as f64));
    }
    let table = SalesTable::from_csv_reader(csv.as_bytes()).unwrap();
    assert_eq!(table.len(), 60);

    let series = SeriesBuilder::new(&table).build().unwrap();
    assert_eq!(series.len(), 60);

    let engine = engine(table);
    let forecast = engine
        .run_forecast(&ForecastRequest::new(
            EntitySelector::entity("s1"),
            ForecastQuery::weekly(3),
        ))
        .unwrap();
    assert_eq!(forecast.horizon(), 3);
}

#[test]
fn engine_from_toml_config() {
    let config = EngineConfig::from_toml_str(
        r#"
        default_confidence = 90.0
        max_concurrent_fits = 1

        [selector]
        max_p = 1
        max_q = 1
        max_models = 10
        "#,
    )
    .unwrap();
    assert_eq!(config.selector.max_cap_p, SelectorConfig::default().max_cap_p);

    let engine = ForecastEngine::new(seasonal_table(70), config).unwrap();
    let result = engine
        .run_forecast(&ForecastRequest::new(
            EntitySelector::All,
            ForecastQuery::weekly(2),
        ))
        .unwrap();
    assert_eq!(result.level().percent(), 90.0);
}

#[test]
fn gaps_are_reported_as_input_errors() {
    let table = SalesTable::new(vec![
        Observation::new("x", 1, 1.0),
        Observation::new("x", 3, 1.0),
    ])
    .unwrap();
    let engine = engine(table);
    let err = engine
        .run_forecast(&ForecastRequest::new(
            EntitySelector::All,
            ForecastQuery::weekly(1),
        ))
        .unwrap_err();
    assert!(matches!(err, ForecastError::SeriesGap { .. }));
    assert_eq!(err.category(), ErrorCategory::InputData);
}
