//! Physical layer of the solver
//!
//! Discretization and material views, curl-coefficient synthesis, ports,
//! the mesh helper and the time-stepping solver itself.

pub mod coefficients;
pub mod discretization;
pub mod mesh;
pub mod ports;
pub mod solver;

pub use coefficients::{CoefficientKind, CurlCoefficients, DEFAULT_CFL};
pub use discretization::{
    EdgeDiscretization, MaterialProperties, SurfaceDiscretization, C_0, EPS_0, MU_0,
};
pub use mesh::UniformMesh;
pub use ports::{ApplyMode, Excitation, Port};
pub use solver::{Solver, SolverBuilder};
