//! Wraith scenario runner
//!
//! Headless host for the antagonist engine. Loads a scenario, runs it at
//! a fixed tick rate on a grid navmesh and prints a JSON summary of the
//! run to stdout.
//!
//! Run with: cargo run -p wraith_sim -- scenario.toml
//!       or: WRAITH_DIFFICULTY=hard cargo run --bin wraith-sim

mod error;
mod nav_agent;
mod navmesh;
mod scenario;
mod simulation;
mod world;

use scenario::ScenarioConfig;
use simulation::Simulation;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ScenarioConfig::load()?;
    config.print_summary();

    let summary = Simulation::new(config)?.run();
    match summary.captured_by {
        Some(agent) => log::info!("Target caught by {} after {:.1}s", agent, summary.elapsed),
        None => log::info!("Target survived {:.1}s", summary.elapsed),
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
