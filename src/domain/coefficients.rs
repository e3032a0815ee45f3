//! Curl-coefficient synthesis and stable time-step selection
//!
//! Folds discretization and material data into the six per-node update
//! multipliers and the single Courant-limited time step shared by the whole
//! run. Coefficients vanish on open faces and PEC/PMC nodes.

use crate::engine::aligned::AlignedVec;
use crate::engine::dof::Axis;
use crate::engine::grid::Grid;
use crate::error::{Result, SolverError};
use crate::domain::discretization::{
    EdgeDiscretization, MaterialProperties, SurfaceDiscretization,
};
use crate::Real;
use tracing::debug;

/// Default Courant safety factor
pub const DEFAULT_CFL: f64 = 0.98;

/// Which material component governs the coefficient set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientKind {
    /// Electric-field update set (ε governs)
    Electric,
    /// Magnetic-field update set (μ governs)
    Magnetic,
}

/// Six aligned coefficient arrays plus the global stable time step.
///
/// Arrays are keyed by (component axis, curl axis) and sized to the padded
/// DoF count so the kernels can load them with the same indices as the
/// fields.
#[derive(Debug)]
pub struct CurlCoefficients {
    arrays: [AlignedVec<Real>; 6],
    time_step: f64,
    kind: CoefficientKind,
}

fn slot(component: Axis, curl: Axis) -> usize {
    debug_assert_ne!(component, curl);
    let second = curl == component.prev();
    component.index() * 2 + second as usize
}

/// Stable time step for one node: Courant limit scaled by the local
/// propagation speed. `None` when the node carries any zero spacing or
/// material value.
fn node_time_step(
    edge: &EdgeDiscretization,
    surface: &SurfaceDiscretization,
    materials: &MaterialProperties,
    node: usize,
    cfl: f64,
) -> Option<f64> {
    let mut inv_sq = 0.0;
    for axis in Axis::ALL {
        let d = edge.length(axis, node);
        if d == 0.0 || surface.area(axis, node) == 0.0 {
            return None;
        }
        inv_sq += 1.0 / (d * d);
    }
    if materials.is_boundary(node) {
        return None;
    }
    // The stiffest axis pair (fastest local speed) bounds the step.
    let mu_eps = Axis::ALL
        .iter()
        .map(|&a| materials.permeability(a, node) * materials.permittivity(a, node))
        .fold(f64::INFINITY, f64::min);
    Some(cfl * mu_eps.sqrt() / inv_sq.sqrt())
}

impl CurlCoefficients {
    /// Summarize discretization and material data into update coefficients.
    ///
    /// Fails when the inputs disagree on node count, when the grid is not
    /// truly three-dimensional, or when every node is a boundary node.
    pub fn summarize(
        grid: &Grid,
        surface: &SurfaceDiscretization,
        edge: &EdgeDiscretization,
        materials: &MaterialProperties,
        kind: CoefficientKind,
        cfl: f64,
    ) -> Result<Self> {
        let nodes = grid.node_count();
        for (context, found) in [
            ("surface discretization", surface.node_count()),
            ("edge discretization", edge.node_count()),
            ("material properties", materials.node_count()),
        ] {
            if found != nodes {
                return Err(SolverError::SizeMismatch {
                    context,
                    found,
                    expected: nodes,
                });
            }
        }
        if grid.dims().iter().any(|&d| d < 2) {
            return Err(SolverError::NotThreeDimensional(grid.dims()));
        }

        // Seed from the first non-boundary node, then keep the global
        // minimum so locally finer propagation speeds cannot destabilize
        // the run.
        let mut time_step: Option<f64> = None;
        for node in 0..nodes {
            if let Some(dt) = node_time_step(edge, surface, materials, node, cfl) {
                time_step = Some(match time_step {
                    Some(prev) => prev.min(dt),
                    None => dt,
                });
            }
        }
        let time_step = time_step.ok_or(SolverError::AllBoundaryNodes)?;
        debug!(time_step, ?kind, "selected stable time step");

        let align = grid.simd_level().alignment().max(64);
        let guard = grid.simd_level().width();
        let mut arrays: [AlignedVec<Real>; 6] =
            std::array::from_fn(|_| AlignedVec::zeroed(grid.padded_len(), align, guard));

        let dims = grid.dims();
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    let coord = [x, y, z];
                    let node = grid.unpadded_index(coord);
                    let padded = grid.index(coord);
                    for component in Axis::ALL {
                        let area = surface.area(component, node);
                        let material = match kind {
                            CoefficientKind::Electric => {
                                materials.permittivity(component, node)
                            }
                            CoefficientKind::Magnetic => {
                                materials.permeability(component, node)
                            }
                        };
                        let pec = materials.is_boundary(node);
                        for curl in [component.next(), component.prev()] {
                            let value = if area == 0.0 || material == 0.0 || pec {
                                0.0
                            } else {
                                time_step * edge.length(curl, node) / (material * area)
                            };
                            arrays[slot(component, curl)][padded] = value as Real;
                        }
                    }
                }
            }
        }

        Ok(Self {
            arrays,
            time_step,
            kind,
        })
    }

    /// The single stable time step shared by the run
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Which material component governs this set
    pub fn kind(&self) -> CoefficientKind {
        self.kind
    }

    /// Coefficient array for a component/curl axis pair
    pub fn coefficient(&self, component: Axis, curl: Axis) -> &AlignedVec<Real> {
        &self.arrays[slot(component, curl)]
    }
}
