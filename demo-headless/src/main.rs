//! Headless wildfire spread demo
//!
//! Builds a synthetic hill landscape and a constant wind forecast, then
//! runs the simulation hour by hour, printing per-hour status counts
//! and an optional ASCII map of the fire front.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wildfire_sim_core::{
    fetch_series, BurnStatus, CellCoord, DriverConfig, Frame, FrameSink, LatLon,
    SimulationDriver, SpreadConfig, SpreadEngine, StaticForecast, TerrainGrid,
};

/// Wildfire spread simulation demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "wildfire-demo")]
#[command(about = "Headless wind-driven fire spread demo", long_about = None)]
struct Args {
    /// Grid size in cells (square grid)
    #[arg(short, long, default_value_t = 40)]
    grid_size: usize,

    /// Forecast horizon in hours
    #[arg(long, default_value_t = 24)]
    hours: u32,

    /// Wind speed in km/h
    #[arg(short = 'w', long, default_value_t = 18.0)]
    wind_speed: f32,

    /// Wind "from" bearing in degrees (270 = westerly, blows east)
    #[arg(long, default_value_t = 270.0)]
    wind_direction: f32,

    /// Uniform vegetation index (0 = bare, 1 = dense dry fuel)
    #[arg(short = 'v', long, default_value_t = 0.85)]
    vegetation: f32,

    /// Ignition likelihood threshold
    #[arg(short = 't', long, default_value_t = 0.65)]
    threshold: f32,

    /// Hours a cell burns before fuel exhaustion
    #[arg(long, default_value_t = 3)]
    burn_hours: u32,

    /// Seed for the stochastic perturbation (omit for a fully
    /// deterministic run)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print an ASCII map every N hours (0 disables the map)
    #[arg(short = 'm', long, default_value_t = 4)]
    map_every: u32,
}

/// Console sink: one status line per hour plus periodic ASCII maps
struct ConsoleSink {
    grid_size: usize,
    map_every: u32,
}

impl FrameSink for ConsoleSink {
    fn emit(&mut self, frame: &Frame) {
        let counts = frame.snapshot.counts();
        println!(
            "hour {:>3} | wind {:>5.1} km/h from {:>5.1}° | igniting {:>4} burning {:>4} burned {:>5}",
            frame.hour,
            frame.wind.speed_kmh(),
            frame.wind.direction_deg(),
            counts.igniting,
            counts.burning,
            counts.burned,
        );
        if self.map_every > 0 && frame.hour % self.map_every == 0 {
            self.print_map(frame);
        }
    }
}

impl ConsoleSink {
    fn print_map(&self, frame: &Frame) {
        for row in 0..self.grid_size {
            let line: String = (0..self.grid_size)
                .map(|col| match frame.snapshot.status_of(CellCoord::new(row, col)) {
                    BurnStatus::Unburned => '.',
                    BurnStatus::Igniting => '+',
                    BurnStatus::Burning => '#',
                    BurnStatus::Burned => 'x',
                })
                .collect();
            println!("  {line}");
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Hill in the eastern half so the default westerly pushes the fire
    // uphill.
    let peak = CellCoord::new(args.grid_size / 3, (args.grid_size * 3) / 4);
    let terrain = TerrainGrid::hill(
        args.grid_size,
        args.grid_size,
        args.vegetation,
        peak,
        args.grid_size as f32 / 2.5,
        0.8,
    );

    let forecast = StaticForecast {
        speed_kmh: args.wind_speed,
        direction_deg: args.wind_direction,
    };
    let location = LatLon {
        lat: -30.86,
        lon: -64.53,
    };
    let series = fetch_series(&forecast, location, args.hours)?;

    let spread = SpreadConfig {
        ignition_threshold: args.threshold,
        seed: args.seed,
        ..SpreadConfig::default()
    };
    let engine = SpreadEngine::new(spread)?;
    let driver = SimulationDriver::new(
        engine,
        DriverConfig {
            max_burning_hours: args.burn_hours,
            ..DriverConfig::default()
        },
    );

    let ignition = CellCoord::new(args.grid_size / 2, args.grid_size / 4);
    let mut sink = ConsoleSink {
        grid_size: args.grid_size,
        map_every: args.map_every,
    };
    let report = driver.run(&terrain, &series, &[ignition], &mut sink)?;

    println!(
        "stopped after {} hour(s): {:?}",
        report.hours_run, report.stop_reason
    );
    Ok(())
}
