//! FITTD - finite-integration time-domain electromagnetic field solver
//!
//! Advances the six electromagnetic field components on a SIMD-padded
//! staggered Cartesian lattice, injects excitation signals at ports, and
//! reduces observables online through composable result pipelines.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod report;

/// Field value type used throughout the engine
pub type Real = f32;

// Re-export commonly used types
pub use domain::solver::{Solver, SolverBuilder};
pub use engine::grid::{Grid, SimdLevel};
pub use error::{Result, SolverError};

pub mod prelude {
    //! Common imports for driving the solver
    pub use crate::config::{
        MonitorGeometry, MonitorQuantity, MonitorSpec, MonitorVolume, PortSpec, SignalSpec,
        SolverSettings,
    };
    pub use crate::domain::mesh::UniformMesh;
    pub use crate::domain::ports::{ApplyMode, Excitation, Port};
    pub use crate::domain::solver::{Solver, SolverBuilder};
    pub use crate::engine::dof::{Axis, FieldKind};
    pub use crate::engine::grid::{Grid, SimdLevel};
    pub use crate::pipeline::{PipelineDomain, PipelineResult, SinkOutput};
    pub use crate::Real;
}
