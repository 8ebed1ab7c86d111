//! Scheduler behaviour on crowded days
//!
//! Burns are clustered tightly enough that every pair is Critical under
//! stable light-wind conditions, so the slot grid is the only thing keeping
//! them apart.

use burnwise_core::atmosphere::StabilityClass;
use burnwise_core::conflict::{ConflictConfig, ConflictDetector, SafetyThresholds, Severity};
use burnwise_core::core_types::{
    BurnId, BurnRequest, BurnStatus, CropType, FarmId, FieldGeometry, GeoPoint, TimeWindow,
};
use burnwise_core::dispersion::{
    DispersionConfig, PlumePrediction, PlumePredictor, PredictionConfig, WeatherContext,
};
use burnwise_core::schedule::{AnnealingConfig, ScheduleOptimizer, SlotConfig, StopReason};
use chrono::{Duration, NaiveDate, TimeZone, Timelike, Utc};
use nalgebra::Vector2;

const ORIGIN: GeoPoint = GeoPoint::new(36.75, -119.9);

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()
}

/// `count` rice burns on a 250 m lattice, all requesting 08:00-13:00.
fn cluster(count: u64) -> Vec<BurnRequest> {
    let start = Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).unwrap();
    let window = TimeWindow::new(start, start + Duration::hours(5)).unwrap();
    (0..count)
        .map(|k| {
            let offset = Vector2::new((k % 5) as f64 * 250.0, (k / 5) as f64 * 250.0);
            let mut burn = BurnRequest::new(
                BurnId(k + 1),
                FarmId(k + 1),
                FieldGeometry::from_point(ORIGIN.translate(offset)).unwrap(),
                window,
                80.0,
                CropType::Rice,
                3.0,
            )
            .unwrap()
            .with_duration_minutes(60);
            burn.priority_score = (20 + k * 3) as u8;
            burn
        })
        .collect()
}

fn predictions(burns: &[BurnRequest]) -> Vec<PlumePrediction> {
    let dispersion = DispersionConfig::default();
    let config = PredictionConfig::default();
    let predictor = PlumePredictor::new(&dispersion, &config);
    let weather = WeatherContext::known(1.5, 315.0, StabilityClass::F);
    burns
        .iter()
        .map(|b| predictor.predict(b, &weather).unwrap())
        .collect()
}

fn detector() -> ConflictDetector {
    ConflictDetector::new(
        DispersionConfig::default(),
        SafetyThresholds::default(),
        ConflictConfig {
            time_buffer_minutes: 0,
            ..ConflictConfig::default()
        },
    )
}

#[test]
fn overcrowded_window_leaves_the_excess_unplaced() {
    let burns = cluster(20);
    let predictions = predictions(&burns);
    let detector = detector();
    let optimizer = ScheduleOptimizer::new(
        date(),
        &burns,
        &predictions,
        &detector,
        &SlotConfig::default(),
        AnnealingConfig::default(),
    )
    .unwrap();

    let problem = optimizer.problem();
    for i in 0..problem.len() {
        assert_eq!(problem.burns()[i].feasible, vec![8, 9, 10, 11, 12]);
        for j in (i + 1)..problem.len() {
            assert_eq!(problem.severity(i, j), Severity::Critical);
        }
    }

    let schedule = optimizer.optimize_seeded(42).unwrap();
    assert_eq!(schedule.slots.len(), 5);
    assert_eq!(schedule.unplaced.len(), 15);
    assert!(!schedule.is_complete());
    assert!(schedule
        .conflicts
        .iter()
        .all(|c| c.severity < Severity::Critical));

    let mut hours: Vec<u32> = schedule.slots.values().map(|s| s.start.hour()).collect();
    hours.sort_unstable();
    assert_eq!(hours, vec![8, 9, 10, 11, 12]);

    // The five highest priorities win the slots.
    let placed: Vec<BurnId> = schedule.slots.keys().copied().collect();
    assert_eq!(placed, (16..=20).map(BurnId).collect::<Vec<_>>());
}

#[test]
fn same_seed_same_schedule() {
    let burns = cluster(12);
    let predictions = predictions(&burns);
    let detector = detector();
    let optimizer = ScheduleOptimizer::new(
        date(),
        &burns,
        &predictions,
        &detector,
        &SlotConfig::default(),
        AnnealingConfig::default(),
    )
    .unwrap();

    let first = optimizer.optimize_seeded(7).unwrap();
    let second = optimizer.optimize_seeded(7).unwrap();
    assert_eq!(first.slots, second.slots);
    assert_eq!(first.unplaced, second.unplaced);
    assert_eq!(first.cost, second.cost);
    assert_eq!(first.stats, second.stats);

    let multi_a = optimizer.optimize_multi_start(&[3, 1, 2]).unwrap();
    let multi_b = optimizer.optimize_multi_start(&[3, 1, 2]).unwrap();
    assert_eq!(multi_a, multi_b);
}

#[test]
fn annealing_never_ends_worse_than_greedy() {
    let burns = cluster(9);
    let predictions = predictions(&burns);
    let detector = detector();
    let optimizer = ScheduleOptimizer::new(
        date(),
        &burns,
        &predictions,
        &detector,
        &SlotConfig::default(),
        AnnealingConfig::default(),
    )
    .unwrap();

    for seed in [1, 42, 1234] {
        let schedule = optimizer.optimize_seeded(seed).unwrap();
        assert!(schedule.stats.best_cost <= schedule.stats.initial_cost + 1e-9);
        assert_eq!(schedule.cost, schedule.stats.best_cost);
        assert_eq!(schedule.stats.seed, Some(seed));
    }
}

#[test]
fn multi_start_keeps_the_cheapest_run() {
    let burns = cluster(10);
    let predictions = predictions(&burns);
    let detector = detector();
    let optimizer = ScheduleOptimizer::new(
        date(),
        &burns,
        &predictions,
        &detector,
        &SlotConfig::default(),
        AnnealingConfig::default(),
    )
    .unwrap();

    let seeds = [11, 12, 13, 14];
    let best = optimizer.optimize_multi_start(&seeds).unwrap();
    for seed in seeds {
        let single = optimizer.optimize_seeded(seed).unwrap();
        assert!(best.cost <= single.cost + 1e-9);
    }
}

fn optimizer_with<'a>(
    burns: &[BurnRequest],
    predictions: &'a [PlumePrediction],
    detector: &'a ConflictDetector,
    config: AnnealingConfig,
) -> ScheduleOptimizer<'a> {
    ScheduleOptimizer::new(date(), burns, predictions, detector, &SlotConfig::default(), config)
        .unwrap()
}

#[test]
fn exhausted_time_budget_returns_the_greedy_start() {
    let burns = cluster(12);
    let predictions = predictions(&burns);
    let detector = detector();
    let optimizer = optimizer_with(
        &burns,
        &predictions,
        &detector,
        AnnealingConfig {
            time_budget_ms: Some(0),
            ..AnnealingConfig::default()
        },
    );

    let schedule = optimizer.optimize_seeded(42).unwrap();
    assert_eq!(schedule.stats.stop_reason, StopReason::TimeBudget);
    assert_eq!(schedule.stats.iterations, 0);
    assert_eq!(schedule.stats.best_cost, schedule.stats.initial_cost);

    let greedy = optimizer.problem().greedy();
    assert_eq!(schedule.slots.len(), greedy.iter().flatten().count());
    for (i, slot) in greedy.iter().enumerate() {
        let id = optimizer.problem().burns()[i].id;
        assert_eq!(schedule.slot_of(id).map(|s| s.slot), *slot);
    }
}

#[test]
fn iteration_cap_stops_the_run() {
    let burns = cluster(12);
    let predictions = predictions(&burns);
    let detector = detector();
    let optimizer = optimizer_with(
        &burns,
        &predictions,
        &detector,
        AnnealingConfig {
            max_iterations: 5,
            ..AnnealingConfig::default()
        },
    );

    let schedule = optimizer.optimize_seeded(42).unwrap();
    assert_eq!(schedule.stats.stop_reason, StopReason::Iterations);
    assert_eq!(schedule.stats.iterations, 5);
    assert!(schedule.cost <= schedule.stats.initial_cost + 1e-9);
}

#[test]
fn fast_cooling_freezes_the_run() {
    let burns = cluster(12);
    let predictions = predictions(&burns);
    let detector = detector();
    let config = AnnealingConfig {
        cooling_rate: 0.5,
        ..AnnealingConfig::default()
    };
    assert_eq!(config.iterations_to_freeze(), 10);
    let optimizer = optimizer_with(&burns, &predictions, &detector, config);

    let schedule = optimizer.optimize_seeded(42).unwrap();
    assert_eq!(schedule.stats.stop_reason, StopReason::Frozen);
    assert_eq!(schedule.stats.iterations, 10);
    assert!(schedule.stats.final_temperature < 1.0);
    assert!(schedule.cost <= schedule.stats.initial_cost + 1e-9);
}

#[test]
fn default_run_spends_the_iteration_budget() {
    let burns = cluster(12);
    let predictions = predictions(&burns);
    let detector = detector();
    let optimizer = optimizer_with(&burns, &predictions, &detector, AnnealingConfig::default());

    let schedule = optimizer.optimize_seeded(42).unwrap();
    assert_eq!(schedule.stats.stop_reason, StopReason::Iterations);
    assert_eq!(schedule.stats.iterations, 10_000);
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut burns = cluster(3);
    let predictions = predictions(&burns);
    burns[2].id = BurnId(1);
    let detector = detector();
    assert!(ScheduleOptimizer::new(
        date(),
        &burns,
        &predictions,
        &detector,
        &SlotConfig::default(),
        AnnealingConfig::default(),
    )
    .is_err());
}

#[test]
fn spread_out_burns_all_fit() {
    // Far apart under brisk unstable air: nothing constrains anyone.
    let start = Utc.with_ymd_and_hms(2025, 11, 3, 9, 0, 0).unwrap();
    let window = TimeWindow::new(start, start + Duration::hours(4)).unwrap();
    let mut burns: Vec<BurnRequest> = (0..4u64)
        .map(|k| {
            BurnRequest::new(
                BurnId(k + 1),
                FarmId(k + 1),
                FieldGeometry::from_point(
                    ORIGIN.translate(Vector2::new(k as f64 * 40_000.0, 0.0)),
                )
                .unwrap(),
                window,
                50.0,
                CropType::Wheat,
                1.5,
            )
            .unwrap()
            .with_duration_minutes(120)
        })
        .collect();
    let dispersion = DispersionConfig::default();
    let config = PredictionConfig::default();
    let predictor = PlumePredictor::new(&dispersion, &config);
    let weather = WeatherContext::known(8.0, 270.0, StabilityClass::B);
    let predictions: Vec<PlumePrediction> = burns
        .iter()
        .map(|b| predictor.predict(b, &weather).unwrap())
        .collect();
    let detector = detector();

    let optimizer = ScheduleOptimizer::new(
        date(),
        &burns,
        &predictions,
        &detector,
        &SlotConfig::default(),
        AnnealingConfig::default(),
    )
    .unwrap();
    let schedule = optimizer.optimize_multi_start(&[]).unwrap();

    assert!(schedule.is_complete());
    assert_eq!(schedule.conflict_count, 0);
    // Everyone gets their preferred 09:00 slot.
    assert!(schedule.slots.values().all(|s| s.start == start));
    assert_eq!(schedule.cost, 0.0);

    assert_eq!(schedule.apply_to(&mut burns), 4);
    assert!(burns.iter().all(|b| b.status == BurnStatus::Scheduled));
    assert!(burns.iter().all(|b| b.preferred_start == Some(start)));
}
