//! Pairwise conflict scenarios on realistic burns
//!
//! 100 acres of wheat stubble at 2 tons/acre burned over two hours, paired
//! with a neighbour under different separations, winds and stabilities.

use burnwise_core::atmosphere::StabilityClass;
use burnwise_core::conflict::{ConflictConfig, ConflictDetector, SafetyThresholds, Severity};
use burnwise_core::core_types::{
    BurnId, BurnRequest, CropType, FarmId, FieldGeometry, GeoPoint, TimeWindow,
};
use burnwise_core::dispersion::{
    DispersionConfig, PlumePrediction, PlumePredictor, PredictionConfig, WeatherContext,
};
use chrono::{TimeZone, Utc};
use nalgebra::Vector2;

const ORIGIN: GeoPoint = GeoPoint::new(39.36, -121.95);

fn wheat_burn(id: u64, location: GeoPoint, start_hour: u32, end_hour: u32) -> BurnRequest {
    let window = TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 10, 14, start_hour, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 10, 14, end_hour, 0, 0).unwrap(),
    )
    .unwrap();
    BurnRequest::new(
        BurnId(id),
        FarmId(id),
        FieldGeometry::from_point(location).unwrap(),
        window,
        100.0,
        CropType::Wheat,
        2.0,
    )
    .unwrap()
    .with_duration_minutes(120)
}

fn predict(burns: &[BurnRequest], weather: &WeatherContext) -> Vec<PlumePrediction> {
    let dispersion = DispersionConfig::default();
    let config = PredictionConfig::default();
    let predictor = PlumePredictor::new(&dispersion, &config);
    burns
        .iter()
        .map(|b| predictor.predict(b, weather).unwrap())
        .collect()
}

fn detector(config: ConflictConfig) -> ConflictDetector {
    ConflictDetector::new(DispersionConfig::default(), SafetyThresholds::default(), config)
}

#[test]
fn close_burns_in_stable_light_wind_are_critical() {
    let burns = vec![
        wheat_burn(1, ORIGIN, 9, 11),
        wheat_burn(2, ORIGIN.translate(Vector2::new(3000.0, 0.0)), 9, 11),
    ];
    let predictions = predict(&burns, &WeatherContext::known(2.0, 270.0, StabilityClass::F));

    let records = detector(ConflictConfig::default())
        .detect(&burns, &predictions)
        .unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!((record.burn_a, record.burn_b), (BurnId(1), BurnId(2)));
    assert_eq!(record.severity, Severity::Critical);
    assert!(record.concentration > 150.0);
    assert!((record.separation - 3000.0).abs() < 5.0);
    assert_eq!(record.overlap().num_minutes(), 120);
}

#[test]
fn distant_burns_in_unstable_strong_wind_do_not_conflict() {
    let burns = vec![
        wheat_burn(1, ORIGIN, 9, 11),
        wheat_burn(2, ORIGIN.translate(Vector2::new(0.0, 10_000.0)), 9, 11),
    ];
    let predictions = predict(&burns, &WeatherContext::known(15.0, 180.0, StabilityClass::B));

    let records = detector(ConflictConfig::default())
        .detect(&burns, &predictions)
        .unwrap();
    assert!(records.is_empty(), "unexpected conflicts: {records:?}");
}

#[test]
fn windows_apart_by_more_than_the_buffer_never_conflict() {
    let burns = vec![
        wheat_burn(1, ORIGIN, 8, 10),
        wheat_burn(2, ORIGIN.translate(Vector2::new(1500.0, 0.0)), 13, 15),
    ];
    let predictions = predict(&burns, &WeatherContext::known(2.0, 270.0, StabilityClass::F));

    let strict = detector(ConflictConfig::default());
    assert!(strict.detect(&burns, &predictions).unwrap().is_empty());

    // A four hour buffer brings them back into contention.
    let wide = detector(ConflictConfig {
        time_buffer_minutes: 240,
        ..ConflictConfig::default()
    });
    let records = wide.detect(&burns, &predictions).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].overlap_seconds, 0);
}

#[test]
fn uncertain_weather_inflates_the_estimate() {
    let burns = vec![
        wheat_burn(1, ORIGIN, 9, 11),
        wheat_burn(2, ORIGIN.translate(Vector2::new(6000.0, 0.0)), 9, 11),
    ];
    let weather = WeatherContext::known(3.0, 270.0, StabilityClass::D);
    let mut predictions = predict(&burns, &weather);
    let detector = detector(ConflictConfig::default());

    let certain = detector.pair_impact(&predictions[0], &predictions[1]).unwrap();
    predictions[1].confidence = 0.5;
    let uncertain = detector.pair_impact(&predictions[0], &predictions[1]).unwrap();
    assert!((uncertain.combined / certain.combined - 1.25).abs() < 1e-9);
}

#[test]
fn records_are_ordered_by_severity_then_id() {
    // Three burns in a line: 1-2 close, 2-3 farther, 1-3 farthest.
    let burns = vec![
        wheat_burn(3, ORIGIN.translate(Vector2::new(9000.0, 0.0)), 9, 11),
        wheat_burn(1, ORIGIN, 9, 11),
        wheat_burn(2, ORIGIN.translate(Vector2::new(1000.0, 0.0)), 9, 11),
    ];
    let predictions = predict(&burns, &WeatherContext::known(2.0, 270.0, StabilityClass::E));
    let records = detector(ConflictConfig::default())
        .detect(&burns, &predictions)
        .unwrap();

    assert!(!records.is_empty());
    assert_eq!((records[0].burn_a, records[0].burn_b), (BurnId(1), BurnId(2)));
    for pair in records.windows(2) {
        assert!(pair[0].severity >= pair[1].severity);
        if pair[0].severity == pair[1].severity {
            assert!((pair[0].burn_a, pair[0].burn_b) < (pair[1].burn_a, pair[1].burn_b));
        }
    }
}

#[test]
fn mismatched_predictions_are_rejected() {
    let burns = vec![wheat_burn(1, ORIGIN, 9, 11), wheat_burn(2, ORIGIN, 9, 11)];
    let predictions = predict(&burns[..1], &WeatherContext::known(2.0, 270.0, StabilityClass::F));
    assert!(detector(ConflictConfig::default())
        .detect(&burns, &predictions)
        .is_err());
}
