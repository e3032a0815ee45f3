//! Multithreaded time loop and solver assembly
//!
//! The solver owns the ports, the result pipelines and one update-loop
//! instance. A fixed rayon thread team executes each half-step over disjoint
//! z-slabs; the completion of each team pass is the full barrier separating
//! the H and E phases. Port application and pipeline execution run serially
//! on the coordinating thread after both barriers.

use crate::config::{
    MonitorGeometry, MonitorQuantity, MonitorSpec, MonitorVolume, PortSpec, SignalSpec,
    SolverSettings,
};
use crate::domain::coefficients::{CoefficientKind, CurlCoefficients};
use crate::domain::discretization::{
    EdgeDiscretization, MaterialProperties, SurfaceDiscretization,
};
use crate::domain::ports::{Excitation, Port};
use crate::engine::dof::{DegreesOfFreedom, FieldKind};
use crate::engine::grid::{Grid, SimdLevel};
use crate::engine::kernels::FieldUpdater;
use crate::error::{Result, SolverError};
use crate::pipeline::{
    AccumulatingSink, DftFilter, EdgeToNodeFilter, EveryNth, ExecutionBarrier, FieldSource,
    FilterCadence, FixedTimesteps, PipelineDomain, PipelineResult, ProgressFilter,
    ProgressReporter, ResultLabels, ResultPipeline, TimeSeriesSink,
};
use crate::report::RunSummary;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Partition `nz` slabs over `teams` threads; surplus threads get empty
/// ranges
fn partition_slabs(nz: usize, teams: usize) -> Vec<(usize, usize)> {
    let teams = teams.max(1);
    let base = nz / teams;
    let rem = nz % teams;
    let mut slabs = Vec::with_capacity(teams);
    let mut start = 0;
    for t in 0..teams {
        let len = base + usize::from(t < rem);
        slabs.push((start, start + len));
        start += len;
    }
    slabs
}

/// The time-stepping engine
pub struct Solver {
    updater: FieldUpdater,
    ports: Vec<Port>,
    pipelines: Vec<ResultPipeline>,
    pool: rayon::ThreadPool,
    slabs: Vec<(usize, usize)>,
    settings: SolverSettings,
    time: f64,
    timestep: u64,
    setup_duration: Duration,
    simulation_duration: Duration,
    signal_descriptions: Vec<String>,
    monitor_descriptions: Vec<String>,
}

impl Solver {
    /// Assemble a solver from prebuilt parts.
    ///
    /// The configuration validation of `SolverBuilder` is not repeated here;
    /// test fixtures use this entry to build minimal setups.
    pub fn from_parts(
        updater: FieldUpdater,
        ports: Vec<Port>,
        pipelines: Vec<ResultPipeline>,
        settings: SolverSettings,
    ) -> Result<Self> {
        let threads = if settings.threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            settings.threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SolverError::invalid(format!("thread pool: {e}")))?;
        let slabs = partition_slabs(updater.grid().dims()[2], threads);
        Ok(Self {
            updater,
            ports,
            pipelines,
            pool,
            slabs,
            settings,
            time: 0.0,
            timestep: 0,
            setup_duration: Duration::ZERO,
            simulation_duration: Duration::ZERO,
            signal_descriptions: Vec::new(),
            monitor_descriptions: Vec::new(),
        })
    }

    /// Grid geometry
    pub fn grid(&self) -> &Grid {
        self.updater.grid()
    }

    /// Stable time step of the run
    pub fn time_step(&self) -> f64 {
        self.updater.time_step()
    }

    /// Simulated time reached so far
    pub fn current_time(&self) -> f64 {
        self.time
    }

    /// 1-based timestep counter
    pub fn current_timestep(&self) -> u64 {
        self.timestep
    }

    /// Selected kernel variant
    pub fn kernel_name(&self) -> &'static str {
        self.updater.kernel_name()
    }

    /// Read access to the field state
    pub fn fields(&self) -> &DegreesOfFreedom {
        self.updater.dof().read()
    }

    /// Mutable field access from the coordinating thread
    pub fn fields_mut(&mut self) -> &mut DegreesOfFreedom {
        self.updater.dof_mut()
    }

    fn apply_ports_and_pipelines(&mut self) {
        let timestep = self.timestep;
        let time = self.time;
        let grid = self.updater.grid().clone();
        {
            // Ports first, so an observed sample includes this step's
            // excitation
            let dof = self.updater.dof_mut();
            for port in &mut self.ports {
                port.apply_source(dof, &grid, timestep, time);
            }
        }
        let dof = self.updater.dof().read();
        for pipeline in &mut self.pipelines {
            pipeline.execute(dof, timestep);
        }
    }

    /// One parallel timestep: H-update, barrier, E-update, barrier, then the
    /// serialized port/pipeline section
    fn step_parallel(&mut self) {
        self.timestep += 1;
        let updater = &self.updater;
        let slabs = &self.slabs;
        // Each broadcast completes on every thread before returning, which
        // is the synchronization point between the field phases.
        self.pool.broadcast(|ctx| {
            let (z0, z1) = slabs[ctx.index()];
            updater.update_h(z0, z1);
        });
        self.pool.broadcast(|ctx| {
            let (z0, z1) = slabs[ctx.index()];
            updater.update_e(z0, z1);
        });
        self.apply_ports_and_pipelines();
        self.time += self.updater.time_step();
    }

    /// Advance the simulation by `steps` timesteps with the thread team
    pub fn simulate_multiple_timesteps(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step_parallel();
        }
    }

    /// Single-thread variant with the fixed order E-update, H-update,
    /// ports, pipelines; used by deterministic fixtures
    pub fn simulate_single_timestep(&mut self) {
        self.timestep += 1;
        let nz = self.updater.grid().dims()[2];
        self.updater.update_e(0, nz);
        self.updater.update_h(0, nz);
        self.apply_ports_and_pipelines();
        self.time += self.updater.time_step();
    }

    /// Execute the configured run and report on it
    pub fn run(&mut self) -> RunSummary {
        let total = self.settings.total_timesteps;
        info!(
            total,
            kernel = self.kernel_name(),
            threads = self.slabs.len(),
            "starting simulation"
        );
        let started = Instant::now();
        self.simulate_multiple_timesteps(total);
        self.simulation_duration = started.elapsed();
        info!(elapsed = ?self.simulation_duration, "simulation finished");
        self.summary()
    }

    /// Run summary with durations and per-object descriptions
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            settings: self.settings.clone(),
            kernel: self.kernel_name().to_string(),
            node_count: self.updater.grid().node_count(),
            time_step: self.time_step(),
            simulated_timesteps: self.timestep,
            setup_duration: self.setup_duration,
            simulation_duration: self.simulation_duration,
            ports: self.ports.iter().map(Port::describe).collect(),
            signals: self.signal_descriptions.clone(),
            monitors: self.monitor_descriptions.clone(),
        }
    }

    /// Close every pipeline and hand the finished results over
    pub fn into_results(self) -> Vec<PipelineResult> {
        self.pipelines
            .into_iter()
            .map(ResultPipeline::finish)
            .collect()
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("kernel", &self.kernel_name())
            .field("ports", &self.ports.len())
            .field("pipelines", &self.pipelines.len())
            .field("timestep", &self.timestep)
            .finish()
    }
}

/// Validating assembly of a solver from host-service data.
///
/// All configuration errors surface here, before any simulation work;
/// partially built grids and coefficient sets are reclaimed on the error
/// path.
pub struct SolverBuilder {
    settings: SolverSettings,
    dims: [usize; 3],
    primal_surface: Option<SurfaceDiscretization>,
    primal_edge: Option<EdgeDiscretization>,
    dual_surface: Option<SurfaceDiscretization>,
    dual_edge: Option<EdgeDiscretization>,
    primal_materials: Option<MaterialProperties>,
    dual_materials: Option<MaterialProperties>,
    ports: Vec<PortSpec>,
    signals: Vec<SignalSpec>,
    monitors: Vec<MonitorSpec>,
    progress: Option<Box<dyn ProgressReporter>>,
}

impl SolverBuilder {
    /// Start assembling a run over a grid of `dims` nodes
    pub fn new(dims: [usize; 3], settings: SolverSettings) -> Self {
        Self {
            settings,
            dims,
            primal_surface: None,
            primal_edge: None,
            dual_surface: None,
            dual_edge: None,
            primal_materials: None,
            dual_materials: None,
            ports: Vec::new(),
            signals: Vec::new(),
            monitors: Vec::new(),
            progress: None,
        }
    }

    /// Primal-grid spacings (electric update set)
    pub fn primal(mut self, surface: SurfaceDiscretization, edge: EdgeDiscretization) -> Self {
        self.primal_surface = Some(surface);
        self.primal_edge = Some(edge);
        self
    }

    /// Dual-grid spacings (magnetic update set); defaults to the primal set
    pub fn dual(mut self, surface: SurfaceDiscretization, edge: EdgeDiscretization) -> Self {
        self.dual_surface = Some(surface);
        self.dual_edge = Some(edge);
        self
    }

    /// Primal material properties; the dual set defaults to them
    pub fn materials(mut self, materials: MaterialProperties) -> Self {
        self.primal_materials = Some(materials);
        self
    }

    /// Explicit dual material properties
    pub fn dual_materials(mut self, materials: MaterialProperties) -> Self {
        self.dual_materials = Some(materials);
        self
    }

    /// Register an excitation signal
    pub fn signal(mut self, spec: SignalSpec) -> Self {
        self.signals.push(spec);
        self
    }

    /// Register a port
    pub fn port(mut self, spec: PortSpec) -> Self {
        self.ports.push(spec);
        self
    }

    /// Register a monitor
    pub fn monitor(mut self, spec: MonitorSpec) -> Self {
        self.monitors.push(spec);
        self
    }

    /// Attach a UI progress reporter
    pub fn progress(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.progress = Some(reporter);
        self
    }

    fn monitor_volume(grid: &Grid, volume: MonitorVolume) -> Result<crate::engine::SubVolume> {
        match volume {
            MonitorVolume::Full => {
                let d = grid.dims();
                grid.sub_volume([(0, d[0]), (0, d[1]), (0, d[2])])
            }
            MonitorVolume::Point(coord) => grid.point_volume(coord),
        }
    }

    fn build_pipeline(
        grid: &Grid,
        time_step: f64,
        total: u64,
        spec: &MonitorSpec,
    ) -> Result<ResultPipeline> {
        let volume = Self::monitor_volume(grid, spec.volume)?;
        let extents = volume.extents();
        let elements = volume.len();
        let cadence = FilterCadence {
            frequency: spec.sample_interval,
            final_step: total,
        };
        let barrier: Box<dyn ExecutionBarrier> = match &spec.timesteps {
            Some(steps) => Box::new(FixedTimesteps::new(steps.iter().copied())),
            None => Box::new(EveryNth::new(spec.sample_interval, total)),
        };

        let unit = match spec.field {
            FieldKind::Electric => "V/m",
            FieldKind::Magnetic => "A/m",
        };
        let labels = ResultLabels {
            legend: spec.name.clone(),
            axis: match spec.domain {
                PipelineDomain::Time => ["t / s".into(), format!("{} / {unit}", spec.field)],
                PipelineDomain::Frequency => {
                    ["node".into(), format!("{} / {unit}", spec.field)]
                }
            },
            unit: unit.into(),
        };

        let mut pipeline = match (spec.domain, spec.quantity) {
            (PipelineDomain::Time, MonitorQuantity::Component(axis)) => {
                let source = FieldSource::scalar(volume, spec.field, axis);
                ResultPipeline::new(
                    spec.name.clone(),
                    spec.domain,
                    barrier,
                    Box::new(source),
                    Box::new(TimeSeriesSink::new(time_step)),
                )
            }
            (PipelineDomain::Time, MonitorQuantity::Vector) => {
                let source = FieldSource::vector_complex(volume, spec.field);
                ResultPipeline::new(
                    spec.name.clone(),
                    spec.domain,
                    barrier,
                    Box::new(source),
                    Box::new(TimeSeriesSink::new(time_step)),
                )
            }
            (PipelineDomain::Frequency, quantity) => {
                let frequency = spec.frequency.ok_or_else(|| {
                    SolverError::invalid(format!(
                        "monitor '{}' captures the frequency domain without a frequency",
                        spec.name
                    ))
                })?;
                let (source, channels): (Box<dyn crate::pipeline::ResultSource>, usize) =
                    match quantity {
                        MonitorQuantity::Component(axis) => (
                            Box::new(FieldSource::scalar_complex(volume, spec.field, axis)),
                            1,
                        ),
                        MonitorQuantity::Vector => {
                            (Box::new(FieldSource::vector_complex(volume, spec.field)), 3)
                        }
                    };
                let sink = AccumulatingSink::new(extents, elements, channels);
                let mut pipeline = ResultPipeline::new(
                    spec.name.clone(),
                    spec.domain,
                    barrier,
                    source,
                    Box::new(sink),
                );
                if spec.geometry == MonitorGeometry::Node {
                    let filter = match quantity {
                        MonitorQuantity::Component(axis) => {
                            EdgeToNodeFilter::scalar(axis, cadence)
                        }
                        MonitorQuantity::Vector => EdgeToNodeFilter::vector(cadence),
                    };
                    pipeline = pipeline.with_filter(Box::new(filter));
                }
                pipeline.with_filter(Box::new(DftFilter::from_frequency(
                    frequency, time_step, total, cadence,
                )))
            }
        };

        // Node-centered time capture converts before sinking
        if spec.domain == PipelineDomain::Time && spec.geometry == MonitorGeometry::Node {
            let filter = match spec.quantity {
                MonitorQuantity::Component(axis) => EdgeToNodeFilter::scalar(axis, cadence),
                MonitorQuantity::Vector => EdgeToNodeFilter::vector(cadence),
            };
            pipeline = pipeline.with_filter(Box::new(filter));
        }

        let mut pipeline = pipeline.with_labels(labels);
        pipeline.reserve(total);
        Ok(pipeline)
    }

    /// Validate the configuration and build the solver
    pub fn build(mut self) -> Result<Solver> {
        let started = Instant::now();
        if self.ports.is_empty() {
            return Err(SolverError::NoPorts);
        }
        if self.signals.is_empty() {
            return Err(SolverError::NoSignals);
        }
        let frequency_capture = self
            .monitors
            .iter()
            .any(|m| m.domain == PipelineDomain::Frequency);
        if frequency_capture && self.ports.len() > 1 {
            return Err(SolverError::MultiplePortsForFrequencyCapture(
                self.ports.len(),
            ));
        }

        let level = SimdLevel::detect(SimdLevel::from_alignment(self.settings.alignment)?);
        let grid = Grid::new(self.dims, level)?;
        debug!(?level, dims = ?self.dims, stride = grid.padded_stride(), "grid built");

        let primal_surface = self
            .primal_surface
            .take()
            .ok_or_else(|| SolverError::invalid("no primal surface discretization supplied"))?;
        let primal_edge = self
            .primal_edge
            .take()
            .ok_or_else(|| SolverError::invalid("no primal edge discretization supplied"))?;
        let materials = self
            .primal_materials
            .take()
            .ok_or_else(|| SolverError::invalid("no material properties supplied"))?;
        let dual_surface = self.dual_surface.take().unwrap_or_else(|| primal_surface.clone());
        let dual_edge = self.dual_edge.take().unwrap_or_else(|| primal_edge.clone());
        let dual_materials = self.dual_materials.take().unwrap_or_else(|| materials.clone());

        let electric = CurlCoefficients::summarize(
            &grid,
            &primal_surface,
            &primal_edge,
            &materials,
            CoefficientKind::Electric,
            self.settings.cfl,
        )?;
        let magnetic = CurlCoefficients::summarize(
            &grid,
            &dual_surface,
            &dual_edge,
            &dual_materials,
            CoefficientKind::Magnetic,
            self.settings.cfl,
        )?;
        let time_step = electric.time_step();
        let total = self.settings.total_timesteps;

        let mut ports = Vec::with_capacity(self.ports.len());
        for spec in &self.ports {
            let signal = self
                .signals
                .iter()
                .find(|s| s.name == spec.signal)
                .ok_or_else(|| {
                    SolverError::invalid(format!(
                        "port '{}' references unknown signal '{}'",
                        spec.name, spec.signal
                    ))
                })?;
            let excitation =
                Excitation::sinus_gaussian(signal.min_frequency, signal.max_frequency)?;
            let coordinate = spec
                .coordinate
                .unwrap_or([self.dims[0] / 2, self.dims[1] / 2, self.dims[2] / 2]);
            ports.push(Port::new(
                spec.name.clone(),
                coordinate,
                spec.field,
                spec.axis,
                excitation,
                spec.mode,
                &grid,
            )?);
        }

        let mut pipelines = Vec::with_capacity(self.monitors.len());
        for spec in &self.monitors {
            pipelines.push(Self::build_pipeline(&grid, time_step, total, spec)?);
        }
        if let Some(reporter) = self.progress.take() {
            match pipelines.first_mut() {
                Some(first) => {
                    let cadence = FilterCadence {
                        frequency: (total / 100).max(1),
                        final_step: total,
                    };
                    first.add_filter(Box::new(ProgressFilter::new(
                        reporter,
                        "simulation",
                        total,
                        cadence,
                    )));
                }
                None => debug!("progress reporter attached without monitors; dropped"),
            }
        }

        let updater = FieldUpdater::new(grid, electric, magnetic);
        let mut solver = Solver::from_parts(updater, ports, pipelines, self.settings)?;
        solver.signal_descriptions = self.signals.iter().map(SignalSpec::describe).collect();
        solver.monitor_descriptions = self.monitors.iter().map(MonitorSpec::describe).collect();
        solver.setup_duration = started.elapsed();
        info!(
            setup = ?solver.setup_duration,
            time_step,
            "solver assembled"
        );
        Ok(solver)
    }
}

impl std::fmt::Debug for SolverBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverBuilder")
            .field("dims", &self.dims)
            .field("ports", &self.ports.len())
            .field("signals", &self.signals.len())
            .field("monitors", &self.monitors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slab_partition_is_disjoint_and_complete() {
        for (nz, teams) in [(8, 3), (4, 8), (16, 4), (1, 2)] {
            let slabs = partition_slabs(nz, teams);
            assert_eq!(slabs.len(), teams);
            let mut covered = 0;
            let mut cursor = 0;
            for &(z0, z1) in &slabs {
                assert_eq!(z0, cursor);
                assert!(z1 >= z0);
                covered += z1 - z0;
                cursor = z1;
            }
            assert_eq!(covered, nz);
        }
    }
}
