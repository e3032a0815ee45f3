//! Read-only views over externally supplied discretization and material data
//!
//! The mesh service hands over flat per-node vectors: edge lengths and face
//! areas per axis, and relative permeability/permittivity per axis. All are
//! axis-major thirds keyed by the unpadded node index; material values are
//! scaled by the vacuum constants on access.

use crate::engine::dof::Axis;
use crate::error::{Result, SolverError};

/// Vacuum permeability in H/m
pub const MU_0: f64 = 1.256_637_061_435_917_2e-6;

/// Vacuum permittivity in F/m
pub const EPS_0: f64 = 8.854_187_812_8e-12;

/// Speed of light in vacuum, m/s
pub const C_0: f64 = 299_792_458.0;

fn third(data: &[f64], axis: Axis, node: usize, nodes: usize) -> f64 {
    debug_assert!(node < nodes);
    data[axis.index() * nodes + node]
}

/// Per-node edge lengths of the lattice, one third per axis
#[derive(Debug, Clone)]
pub struct EdgeDiscretization {
    lengths: Vec<f64>,
    nodes: usize,
}

impl EdgeDiscretization {
    /// Wrap a flat axis-major edge-length vector
    pub fn new(lengths: Vec<f64>) -> Result<Self> {
        if lengths.is_empty() || lengths.len() % 3 != 0 {
            return Err(SolverError::UnevenAxisData {
                context: "edge discretization",
                len: lengths.len(),
            });
        }
        let nodes = lengths.len() / 3;
        Ok(Self { lengths, nodes })
    }

    /// Node count covered by the view
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// Edge length along `axis` at an unpadded node index
    pub fn length(&self, axis: Axis, node: usize) -> f64 {
        third(&self.lengths, axis, node, self.nodes)
    }
}

/// Per-node face areas, one third per face-normal axis
#[derive(Debug, Clone)]
pub struct SurfaceDiscretization {
    areas: Vec<f64>,
    nodes: usize,
}

impl SurfaceDiscretization {
    /// Wrap a flat axis-major face-area vector
    pub fn new(areas: Vec<f64>) -> Result<Self> {
        if areas.is_empty() || areas.len() % 3 != 0 {
            return Err(SolverError::UnevenAxisData {
                context: "surface discretization",
                len: areas.len(),
            });
        }
        let nodes = areas.len() / 3;
        Ok(Self { areas, nodes })
    }

    /// Node count covered by the view
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// Face area normal to `axis` at an unpadded node index
    pub fn area(&self, axis: Axis, node: usize) -> f64 {
        third(&self.areas, axis, node, self.nodes)
    }
}

/// Relative permeability/permittivity per axis, scaled by the vacuum
/// constants on access
#[derive(Debug, Clone)]
pub struct MaterialProperties {
    permeability: Vec<f64>,
    permittivity: Vec<f64>,
    nodes: usize,
}

impl MaterialProperties {
    /// Wrap flat axis-major relative μ and ε vectors
    pub fn new(permeability: Vec<f64>, permittivity: Vec<f64>) -> Result<Self> {
        if permeability.is_empty() || permeability.len() % 3 != 0 {
            return Err(SolverError::UnevenAxisData {
                context: "relative permeability",
                len: permeability.len(),
            });
        }
        if permittivity.len() != permeability.len() {
            return Err(SolverError::SizeMismatch {
                context: "relative permittivity",
                found: permittivity.len() / 3,
                expected: permeability.len() / 3,
            });
        }
        let nodes = permeability.len() / 3;
        Ok(Self {
            permeability,
            permittivity,
            nodes,
        })
    }

    /// Node count covered by the view
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// Absolute permeability μ₀·μᵣ along `axis`
    pub fn permeability(&self, axis: Axis, node: usize) -> f64 {
        MU_0 * third(&self.permeability, axis, node, self.nodes)
    }

    /// Absolute permittivity ε₀·εᵣ along `axis`
    pub fn permittivity(&self, axis: Axis, node: usize) -> f64 {
        EPS_0 * third(&self.permittivity, axis, node, self.nodes)
    }

    /// Unscaled relative permeability
    pub fn relative_permeability(&self, axis: Axis, node: usize) -> f64 {
        third(&self.permeability, axis, node, self.nodes)
    }

    /// Unscaled relative permittivity
    pub fn relative_permittivity(&self, axis: Axis, node: usize) -> f64 {
        third(&self.permittivity, axis, node, self.nodes)
    }

    /// True when any material component vanishes at the node (PEC/PMC)
    pub fn is_boundary(&self, node: usize) -> bool {
        Axis::ALL.iter().any(|&a| {
            self.relative_permeability(a, node) == 0.0
                || self.relative_permittivity(a, node) == 0.0
        })
    }
}
