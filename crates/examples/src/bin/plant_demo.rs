use anyhow::Result;
use clap::Parser;
use tracing::info;

use av_runtime::metrics::{MetricsRegistry, RunTimer};
use av_runtime::{init_tracing, Executor};
use av_scenarios::{report, ScenarioConfig};

const BUNDLED: &str = include_str!("../../../scenarios/data/press_line.json");

/// Runs an availability scenario and logs per-machine occupancy.
#[derive(Parser)]
#[command(name = "plant_demo")]
#[command(about = "Simulate breakdowns and maintenance for a plant", long_about = None)]
struct Cli {
    /// Scenario file; the bundled press line when omitted.
    #[arg(short, long)]
    scenario: Option<std::path::PathBuf>,

    /// Overrides the scenario horizon.
    #[arg(long)]
    hours: Option<f64>,

    /// Overrides the scenario seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the polling interval.
    #[arg(long)]
    poll: Option<f64>,

    /// Hours between progress lines.
    #[arg(long, default_value_t = 720.0)]
    report_every: f64,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.scenario {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::from_json(BUNDLED)?,
    };
    if let Some(hours) = cli.hours {
        config.horizon_hours = hours;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(poll) = cli.poll {
        config.poll_interval_hours = poll;
    }
    config.validate()?;
    anyhow::ensure!(cli.report_every > 0.0, "--report-every must be positive");
    info!(scenario = %config.name, horizon = config.horizon_hours, seed = config.seed, "plant_demo starting");

    let metrics = MetricsRegistry::default();
    let mut plant = config.build_plant()?;
    let mut exec = Executor::new(metrics.clone());
    config.install(&mut plant, &mut exec)?;

    let timer = RunTimer::start();
    let mut horizon = 0.0;
    while horizon < config.horizon_hours {
        horizon = (horizon + cli.report_every).min(config.horizon_hours);
        exec.run_until(&mut plant, horizon)?;
        for e in plant.entities() {
            info!(
                now = horizon,
                machine = %e.name(),
                state = e.current_state().unwrap_or("?"),
                backlog = ?e.calendar().backlogs(),
                next_maintenance = e.next_maintenance_start_time(),
                "progress"
            );
        }
    }

    for row in report(&plant, exec.now()) {
        info!(
            machine = %row.name,
            commitment = row.commitment,
            working_hours = row.working_hours,
            percent = ?row.percent_by_state,
            hooks = ?row.hooks,
            "occupancy"
        );
    }
    for group in plant.groups() {
        info!(master = %group.master(), members = ?group.members(), "shared maintenance group");
    }

    let snapshot = metrics.snapshot();
    println!("{}", snapshot.to_json_line(&config.name, exec.now(), Some(timer.elapsed())));
    Ok(())
}
