#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the colony against a seeded simulated territory.

mod scenario;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use colony_core::{ColonyConfig, Command, Event, Host, Memory};
use colony_system_bootstrap::{Bootstrap, TickReport};
use colony_world::{self as world, query, World};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "colony=info";

/// Command-line options for a simulated run.
#[derive(Debug, Parser)]
#[command(name = "colony")]
#[command(about = "Run the colony decision core against a simulated territory")]
struct Args {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 1_000)]
    ticks: u64,

    /// Seed of the generated territory.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// TOML file overriding the default tuning.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the final memory as JSON.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Log filter directive, overriding `RUST_LOG`.
    #[arg(long)]
    log: Option<String>,
}

/// Entry point for the colony command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref());

    let config = load_config(args.config.as_deref())?;
    let bootstrap = Bootstrap::new(config);
    let mut memory = Memory::new();
    let mut hosts = [scenario::generate(args.seed)];
    info!(seed = args.seed, ticks = args.ticks, "starting simulation");

    let mut events = Vec::new();
    let mut last = None;
    for _ in 0..args.ticks {
        last = Some(bootstrap.run_tick(&mut memory, &mut hosts));
        world::apply(&mut hosts[0], Command::Tick, &mut events);
        for event in events.drain(..) {
            if let Event::WorkerSpawned { name, spawn } = event {
                debug!(worker = %name, spawn = spawn.get(), "worker ready");
            }
        }
    }

    if let Some(report) = last {
        print_summary(&report, &memory, &hosts[0]);
    }
    if let Some(path) = args.save {
        let json = memory.to_json().context("failed to encode memory")?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write memory to {}", path.display()))?;
        info!(path = %path.display(), "memory saved");
    }
    Ok(())
}

fn init_tracing(directive: Option<&str>) {
    let filter = directive.map_or_else(
        || {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
        },
        EnvFilter::new,
    );
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ColonyConfig> {
    let Some(path) = path else {
        return Ok(ColonyConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ColonyConfig::from_toml_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn print_summary(report: &TickReport, memory: &Memory, world: &World) {
    println!("tick {}", report.tick);
    for territory in &report.territories {
        let census = &territory.census;
        println!(
            "{}: {} miners, {} builders, {} structures, {} sites",
            territory.territory,
            census.miners.len(),
            census.builders.len(),
            census.structures.len(),
            census.sites.len(),
        );
        println!(
            "  energy {}/{}, extensions {}/{}, containers {}/{}",
            census.energy_available,
            census.energy_capacity,
            census.progress.extensions,
            census.progress.extension_quota,
            census.progress.containers,
            census.progress.sources,
        );
        if let Some(record) = memory.territories.get(&territory.territory) {
            println!(
                "  tech level {}, energy level {}",
                record.tech_level.get(),
                record.energy_level.get()
            );
        }
    }
    println!(
        "controller progress {} ({} ticks of grace)",
        query::controller_progress(world),
        world
            .controller()
            .map_or(0, |controller| controller.ticks_to_downgrade),
    );
}
