//! Uniform Cartesian box mesh helper
//!
//! Stand-in for the external mesh service in demos and tests: produces the
//! flattened edge-length, face-area and material vectors for a uniform box
//! from per-node relative-material maps.

use crate::domain::discretization::{
    EdgeDiscretization, MaterialProperties, SurfaceDiscretization,
};
use crate::engine::dof::Axis;
use crate::error::{Result, SolverError};
use ndarray::Array3;

/// Uniform box with per-node isotropic relative materials
#[derive(Debug, Clone)]
pub struct UniformMesh {
    dims: [usize; 3],
    spacing: [f64; 3],
    permeability: Array3<f64>,
    permittivity: Array3<f64>,
}

impl UniformMesh {
    /// Homogeneous vacuum box
    pub fn homogeneous(dims: [usize; 3], spacing: [f64; 3]) -> Self {
        let shape = (dims[0], dims[1], dims[2]);
        Self {
            dims,
            spacing,
            permeability: Array3::from_elem(shape, 1.0),
            permittivity: Array3::from_elem(shape, 1.0),
        }
    }

    /// Box with explicit relative-material maps
    pub fn with_materials(
        dims: [usize; 3],
        spacing: [f64; 3],
        permeability: Array3<f64>,
        permittivity: Array3<f64>,
    ) -> Result<Self> {
        let expected = [dims[0], dims[1], dims[2]];
        for (name, map) in [("permeability", &permeability), ("permittivity", &permittivity)] {
            if map.shape() != expected {
                return Err(SolverError::invalid(format!(
                    "{name} map shape {:?} does not match grid {dims:?}",
                    map.shape()
                )));
            }
        }
        Ok(Self {
            dims,
            spacing,
            permeability,
            permittivity,
        })
    }

    /// Zero the materials on the hull, modelling a PEC enclosure
    pub fn with_pec_hull(mut self) -> Self {
        let [nx, ny, nz] = self.dims;
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let on_hull = x == 0
                        || y == 0
                        || z == 0
                        || x == nx - 1
                        || y == ny - 1
                        || z == nz - 1;
                    if on_hull {
                        self.permeability[[x, y, z]] = 0.0;
                        self.permittivity[[x, y, z]] = 0.0;
                    }
                }
            }
        }
        self
    }

    /// Grid dimensions
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Node count
    pub fn node_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Flattened edge lengths, axis-major thirds
    pub fn edge_discretization(&self) -> EdgeDiscretization {
        let n = self.node_count();
        let mut lengths = Vec::with_capacity(3 * n);
        for axis in Axis::ALL {
            lengths.extend(std::iter::repeat(self.spacing[axis.index()]).take(n));
        }
        EdgeDiscretization::new(lengths).expect("uniform edge vector is well formed")
    }

    /// Flattened face areas, one third per face-normal axis
    pub fn surface_discretization(&self) -> SurfaceDiscretization {
        let n = self.node_count();
        let mut areas = Vec::with_capacity(3 * n);
        for axis in Axis::ALL {
            let area = self.spacing[axis.next().index()] * self.spacing[axis.prev().index()];
            areas.extend(std::iter::repeat(area).take(n));
        }
        SurfaceDiscretization::new(areas).expect("uniform area vector is well formed")
    }

    /// Flattened relative-material vectors in node-index order
    pub fn material_properties(&self) -> MaterialProperties {
        let n = self.node_count();
        let mut mu = Vec::with_capacity(3 * n);
        let mut eps = Vec::with_capacity(3 * n);
        for _axis in Axis::ALL {
            for z in 0..self.dims[2] {
                for y in 0..self.dims[1] {
                    for x in 0..self.dims[0] {
                        mu.push(self.permeability[[x, y, z]]);
                        eps.push(self.permittivity[[x, y, z]]);
                    }
                }
            }
        }
        MaterialProperties::new(mu, eps).expect("uniform material vectors are well formed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grid::{Grid, SimdLevel};

    #[test]
    fn test_uniform_vectors_have_axis_thirds() {
        let mesh = UniformMesh::homogeneous([3, 3, 3], [1e-3, 2e-3, 4e-3]);
        let edges = mesh.edge_discretization();
        assert_eq!(edges.node_count(), 27);
        assert_eq!(edges.length(Axis::X, 0), 1e-3);
        assert_eq!(edges.length(Axis::Z, 26), 4e-3);
        let areas = mesh.surface_discretization();
        // Face normal to x spans the y/z spacings
        assert_eq!(areas.area(Axis::X, 0), 2e-3 * 4e-3);
    }

    #[test]
    fn test_pec_hull_zeroes_boundary_materials() {
        let mesh = UniformMesh::homogeneous([4, 4, 4], [1e-3; 3]).with_pec_hull();
        let grid = Grid::new([4, 4, 4], SimdLevel::Scalar).unwrap();
        let materials = mesh.material_properties();
        assert!(materials.is_boundary(grid.unpadded_index([0, 2, 2])));
        assert!(materials.is_boundary(grid.unpadded_index([3, 1, 1])));
        assert!(!materials.is_boundary(grid.unpadded_index([1, 2, 2])));
    }

    #[test]
    fn test_material_map_shape_validated() {
        let bad = Array3::from_elem((2, 2, 2), 1.0);
        let err = UniformMesh::with_materials([3, 3, 3], [1e-3; 3], bad.clone(), bad);
        assert!(err.is_err());
    }
}
