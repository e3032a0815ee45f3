//! Composable result extraction
//!
//! A pipeline owns one source, an ordered filter chain and one sink, and is
//! gated by an execution barrier. On every qualifying timestep the source
//! snapshot flows through the filters into the sink; when the run ends the
//! sink's product is wrapped with its presentation metadata.

pub mod barrier;
pub mod container;
pub mod filter;
pub mod progress;
pub mod sink;
pub mod source;

pub use barrier::{EveryNth, ExecutionBarrier, FixedTimesteps};
pub use container::{
    ResultContainer, ScalarComplexContainer, ScalarContainer, VectorComplexContainer,
};
pub use filter::{DftFilter, EdgeToNodeFilter, FilterCadence, ProgressFilter, ResultFilter};
pub use progress::{ProgressReporter, SilentProgress, TracingProgress};
pub use sink::{AccumulatingSink, ComplexNormalize, ResultSink, SinkOutput, Snapshot, TimeSeries, TimeSeriesSink};
pub use source::{FieldSource, ResultSource, SourceShape};

use crate::engine::dof::DegreesOfFreedom;

/// Whether a pipeline captures a time series or a frequency-domain result
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PipelineDomain {
    Time,
    Frequency,
}

/// Presentation metadata attached to a finished result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLabels {
    pub legend: String,
    pub axis: [String; 2],
    pub unit: String,
}

impl Default for ResultLabels {
    fn default() -> Self {
        Self {
            legend: String::new(),
            axis: ["t / s".into(), "amplitude".into()],
            unit: String::new(),
        }
    }
}

/// Source → filter chain → sink, gated by an execution barrier
pub struct ResultPipeline {
    name: String,
    labels: ResultLabels,
    domain: PipelineDomain,
    barrier: Box<dyn ExecutionBarrier>,
    source: Box<dyn ResultSource>,
    filters: Vec<Box<dyn ResultFilter>>,
    sink: Box<dyn ResultSink>,
    executions: usize,
}

impl ResultPipeline {
    /// Assemble a pipeline; filters are applied in registration order
    pub fn new(
        name: impl Into<String>,
        domain: PipelineDomain,
        barrier: Box<dyn ExecutionBarrier>,
        source: Box<dyn ResultSource>,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        Self {
            name: name.into(),
            labels: ResultLabels::default(),
            domain,
            barrier,
            source,
            filters: Vec::new(),
            sink,
            executions: 0,
        }
    }

    /// Append a filter to the chain
    pub fn with_filter(mut self, filter: Box<dyn ResultFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append a filter to an already assembled pipeline
    pub fn add_filter(&mut self, filter: Box<dyn ResultFilter>) {
        self.filters.push(filter);
    }

    /// Override the presentation metadata
    pub fn with_labels(mut self, labels: ResultLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Pre-reserve the sink for the expected execution count
    pub fn reserve(&mut self, total_steps: u64) {
        let expected = self.barrier.expected_executions(total_steps);
        self.sink.reserve(expected);
    }

    /// Pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Captured domain
    pub fn domain(&self) -> PipelineDomain {
        self.domain
    }

    /// Qualifying timesteps processed so far
    pub fn executions(&self) -> usize {
        self.executions
    }

    /// Run the dataflow for one timestep if the barrier allows it
    pub fn execute(&mut self, dof: &DegreesOfFreedom, timestep: u64) {
        if !self.barrier.allow_execution(timestep) {
            return;
        }
        let mut container = self.source.extract(dof, timestep);
        for filter in &mut self.filters {
            filter.apply(&mut container, timestep);
        }
        self.sink.consume(container);
        self.executions += 1;
    }

    /// Close the pipeline and emit the finished result
    pub fn finish(self) -> PipelineResult {
        PipelineResult {
            name: self.name,
            labels: self.labels,
            domain: self.domain,
            executions: self.executions,
            output: self.sink.finish(),
        }
    }
}

impl std::fmt::Debug for ResultPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultPipeline")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("filters", &self.filters.len())
            .field("executions", &self.executions)
            .finish()
    }
}

/// Finished pipeline product handed to the persistence layer
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub name: String,
    pub labels: ResultLabels,
    pub domain: PipelineDomain,
    pub executions: usize,
    pub output: SinkOutput,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dof::{Axis, FieldKind};
    use crate::engine::grid::{Grid, SimdLevel};

    fn point_pipeline(grid: &Grid, interval: u64, total: u64) -> ResultPipeline {
        let source = FieldSource::scalar(
            grid.point_volume([1, 1, 1]).unwrap(),
            FieldKind::Electric,
            Axis::X,
        );
        ResultPipeline::new(
            "probe",
            PipelineDomain::Time,
            Box::new(EveryNth::new(interval, total)),
            Box::new(source),
            Box::new(TimeSeriesSink::new(1.0)),
        )
    }

    #[test]
    fn test_barrier_gates_execution() {
        let grid = Grid::new([3, 3, 3], SimdLevel::Scalar).unwrap();
        let dof = DegreesOfFreedom::new(&grid);
        let mut pipeline = point_pipeline(&grid, 4, 10);
        for t in 1..=10 {
            pipeline.execute(&dof, t);
        }
        // Steps 4, 8 and the final step 10
        assert_eq!(pipeline.executions(), 3);
    }

    #[test]
    fn test_identical_replays_produce_identical_series() {
        let grid = Grid::new([3, 3, 3], SimdLevel::Scalar).unwrap();
        let mut dof = DegreesOfFreedom::new(&grid);
        dof.component_mut(FieldKind::Electric, Axis::X)[grid.index([1, 1, 1])] = 2.0;

        let total = 20;
        let run = |dof: &DegreesOfFreedom| {
            let mut pipeline = point_pipeline(&grid, 5, total);
            pipeline.reserve(total);
            for t in 1..=total {
                pipeline.execute(dof, t);
            }
            pipeline.finish()
        };
        let first = run(&dof);
        let second = run(&dof);
        let SinkOutput::TimeSeries(a) = &first.output else {
            panic!()
        };
        let SinkOutput::TimeSeries(b) = &second.output else {
            panic!()
        };
        assert_eq!(a.entries.len(), (total as usize).div_ceil(5));
        assert_eq!(a, b);
    }
}
