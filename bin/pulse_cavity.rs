//! Pulse-in-a-cavity demo
//!
//! Excites a PEC-walled vacuum box with a band-limited pulse and records a
//! time probe plus a single-frequency field capture, then prints the run
//! summary.

use clap::Parser;
use fittd::prelude::*;

/// Command-line arguments for the cavity demo
#[derive(Parser, Debug)]
#[command(name = "pulse_cavity")]
#[command(about = "FITTD demo: band-limited pulse in a PEC cavity", long_about = None)]
struct Args {
    /// Nodes per axis
    #[arg(long, default_value_t = 32)]
    size: usize,

    /// Cell size in meters
    #[arg(long, default_value_t = 1e-3)]
    cell: f64,

    /// Total timestep count
    #[arg(long, default_value_t = 2000)]
    timesteps: u64,

    /// Thread team size (0 = all cores)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Lower band edge in Hz
    #[arg(long, default_value_t = 1e9)]
    min_freq: f64,

    /// Upper band edge in Hz
    #[arg(long, default_value_t = 10e9)]
    max_freq: f64,

    /// Verbose diagnostics
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() -> fittd::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let dims = [args.size, args.size, args.size];
    let mesh = UniformMesh::homogeneous(dims, [args.cell; 3]).with_pec_hull();
    let center = [args.size / 2, args.size / 2, args.size / 2];
    let observed = 0.5 * (args.min_freq + args.max_freq);

    let settings = SolverSettings {
        total_timesteps: args.timesteps,
        threads: args.threads,
        debug: args.debug,
        ..SolverSettings::default()
    };

    let mut solver = SolverBuilder::new(dims, settings)
        .primal(mesh.surface_discretization(), mesh.edge_discretization())
        .materials(mesh.material_properties())
        .signal(SignalSpec {
            name: "band".into(),
            min_frequency: args.min_freq,
            max_frequency: args.max_freq,
        })
        .port(PortSpec {
            name: "feed".into(),
            field: FieldKind::Electric,
            axis: Axis::X,
            signal: "band".into(),
            coordinate: Some(center),
            mode: ApplyMode::Additive,
        })
        .monitor(MonitorSpec {
            name: "probe".into(),
            field: FieldKind::Electric,
            domain: PipelineDomain::Time,
            geometry: MonitorGeometry::Edge,
            quantity: MonitorQuantity::Component(Axis::X),
            volume: MonitorVolume::Point([args.size / 2 + 4, args.size / 2, args.size / 2]),
            sample_interval: 1,
            frequency: None,
            timesteps: None,
        })
        .monitor(MonitorSpec {
            name: "field-capture".into(),
            field: FieldKind::Electric,
            domain: PipelineDomain::Frequency,
            geometry: MonitorGeometry::Node,
            quantity: MonitorQuantity::Vector,
            volume: MonitorVolume::Full,
            sample_interval: 4,
            frequency: Some(observed),
            timesteps: None,
        })
        .build()?;

    let summary = solver.run();
    println!("{summary}");

    for result in solver.into_results() {
        match &result.output {
            SinkOutput::TimeSeries(series) => {
                let peak = series
                    .entries
                    .iter()
                    .flat_map(|row| row.iter())
                    .fold(0.0f32, |m, &v| m.max(v.abs()));
                println!(
                    "{}: {} samples, peak |{}| = {:.4e}",
                    result.name,
                    series.entries.len(),
                    result.labels.unit,
                    peak
                );
            }
            SinkOutput::Snapshot(snapshot) => {
                let energy: f64 = snapshot
                    .channels
                    .iter()
                    .flat_map(|ch| ch.iter())
                    .map(|c| c.norm_sqr() as f64)
                    .sum();
                println!(
                    "{}: {} channels over {:?}, total |field|^2 = {:.4e}",
                    result.name,
                    snapshot.channels.len(),
                    snapshot.extents,
                    energy
                );
            }
        }
    }
    Ok(())
}
