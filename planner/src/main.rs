use anyhow::{Context, Result};
use burnwise_core::config::CoordinatorConfig;
use burnwise_core::core_types::{BurnRequest, WeatherObservation};
use burnwise_core::planner::{CachedWeatherSource, DailyPlan, DailyPlanner};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Smoke-aware daily burn planner
#[derive(Parser, Debug)]
#[command(name = "burnwise-planner")]
#[command(about = "Plan one day of agricultural burns without smoke conflicts", long_about = None)]
struct Args {
    /// Scenario file (JSON) with burn requests and station observations
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Coordinator configuration (TOML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Date to plan; defaults to the scenario's date
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Override the first annealing seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of annealing restarts
    #[arg(long)]
    restarts: Option<usize>,

    /// Print the full plan as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

/// Input file layout.
#[derive(Debug, Deserialize)]
struct Scenario {
    date: NaiveDate,
    /// Date the plan is made on, for urgency; defaults to `date`.
    #[serde(default)]
    today: Option<NaiveDate>,
    burns: Vec<BurnRequest>,
    #[serde(default)]
    observations: Vec<WeatherObservation>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let mut config = match &args.config {
        Some(path) => CoordinatorConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.annealing.seed = seed;
    }
    if let Some(restarts) = args.restarts {
        config.annealing.restarts = restarts;
    }

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let path = args
        .scenario
        .context("a scenario file is required (see --help)")?;
    let text = fs::read_to_string(&path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&text)
        .with_context(|| format!("parsing scenario {}", path.display()))?;
    let date = args.date.unwrap_or(scenario.date);
    let today = scenario.today.unwrap_or(date);

    info!(
        "Loaded {} burn requests and {} observations from {}",
        scenario.burns.len(),
        scenario.observations.len(),
        path.display()
    );

    let weather = CachedWeatherSource::new(
        scenario.observations,
        Duration::minutes(config.weather.cache_ttl_minutes),
    );
    let planner = DailyPlanner::new(config)?;
    let plan = planner.plan(date, today, &scenario.burns, &weather)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_summary(&plan);
    }
    Ok(())
}

fn print_summary(plan: &DailyPlan) {
    println!("=== Burn plan for {} ===\n", plan.date);

    println!("Priorities:");
    for (id, score) in &plan.priorities {
        println!("  {id}: {score}");
    }

    println!("\nPlumes:");
    for p in &plan.predictions {
        println!(
            "  {}: Q={:.1} g/s, class {}, wind {:.1} m/s from {:.0}°, reach {:.1} km, confidence {:.2}",
            p.burn_id,
            p.emission_rate,
            p.stability,
            p.wind_speed,
            p.wind_direction,
            p.max_distance / 1000.0,
            p.confidence
        );
    }
    if !plan.weather_fallbacks.is_empty() {
        let ids: Vec<String> = plan.weather_fallbacks.iter().map(ToString::to_string).collect();
        println!("  climatology used for: {}", ids.join(", "));
    }

    println!("\nConflicts at requested times: {}", plan.requested_conflicts.len());
    for c in &plan.requested_conflicts {
        println!(
            "  {} / {}: {:.1} µg/m³ ({}), {:.1} km apart",
            c.burn_a,
            c.burn_b,
            c.concentration,
            c.severity,
            c.separation / 1000.0
        );
    }

    let schedule = &plan.schedule;
    println!("\nSchedule (cost {:.1}):", schedule.cost);
    for (id, slot) in &schedule.slots {
        println!(
            "  {id}: {} - {}",
            slot.start.format("%H:%M"),
            slot.end.format("%H:%M")
        );
    }
    for id in &schedule.unplaced {
        println!("  {id}: not placed");
    }
    println!("  remaining conflicts: {}", schedule.conflict_count);
    println!(
        "  annealing: seed {:?}, {} iterations, {} accepted, stopped on {}",
        schedule.stats.seed,
        schedule.stats.iterations,
        schedule.stats.accepted,
        schedule.stats.stop_reason
    );
}
