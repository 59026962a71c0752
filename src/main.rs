mod simulation;

use anyhow::Result;
use clap::Parser;
use log::info;

use simulation::{
    HeuristicLabelSource, SimWorld, TelemetrySink, TrafficSample,
};

#[derive(Parser)]
#[command(name = "intersection_sim")]
#[command(about = "Four-way intersection traffic simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "3600")]
    ticks: u32,

    /// Time delta per tick in milliseconds
    #[arg(long, default_value = "16.7")]
    delta: f32,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Print the terminal map alongside each summary
    #[arg(long)]
    map: bool,
}

/// Telemetry sink that surfaces samples through the log
struct LogTelemetrySink;

impl TelemetrySink for LogTelemetrySink {
    fn record(&mut self, sample: &TrafficSample) -> Result<()> {
        info!(
            "sample t={:.0}ms vehicles={} emergency={} label={}",
            sample.timestamp_ms,
            sample.vehicles_present,
            sample.emergency_present,
            sample.scheduling_label
        );
        Ok(())
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    println!("Running intersection simulation in headless mode...");
    println!("Ticks: {}, delta: {}ms", cli.ticks, cli.delta);
    println!();

    let mut world = match cli.seed {
        Some(seed) => SimWorld::new_with_seed(seed),
        None => SimWorld::new(),
    };
    world.set_label_source(Box::new(HeuristicLabelSource::new()));
    world.set_telemetry_sink(Box::new(LogTelemetrySink));
    world.start();

    // Summaries once per simulated second
    let ticks_per_second = (1000.0 / cli.delta).ceil() as u32;

    let mut tick = 0;
    while tick < cli.ticks {
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);
        for _ in 0..ticks_to_run {
            tick += 1;
            world.advance(cli.delta);
        }

        println!(
            "--- After tick {} ({:.1}s simulated time) ---",
            tick,
            world.time_ms() / 1000.0
        );
        world.print_summary();
        if cli.map {
            world.draw_map();
        }
        println!();
    }

    println!("=== Final State ===");
    world.print_summary();
    if cli.map {
        world.draw_map();
    }
    world.stop();
}
