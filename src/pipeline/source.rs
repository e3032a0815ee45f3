//! Result sources sampling the DoF store
//!
//! A source reads one or three field components over its sub-volume
//! iterator and produces a container sized to the iterator's element count.
//! Compact zero-based indices address the container buffer while the parent
//! iterator walks the padded DoF arrays in step.

use crate::engine::dof::{Axis, DegreesOfFreedom, FieldKind};
use crate::engine::iterators::SubVolume;
use crate::pipeline::container::{
    ResultContainer, ScalarComplexContainer, ScalarContainer, VectorComplexContainer,
};
use crate::Real;

/// Shape of the container a source produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape {
    /// Single real channel
    Scalar,
    /// Single complex channel (imaginary half starts zeroed)
    ScalarComplex,
    /// Three complex channels
    VectorComplex,
}

/// Extracts observables from the DoF store on qualifying timesteps
pub trait ResultSource: Send {
    /// Read the sampled region into a fresh container
    fn extract(&mut self, dof: &DegreesOfFreedom, timestep: u64) -> ResultContainer;

    /// Elements per channel
    fn element_count(&self) -> usize;

    /// Sampled sub-volume extents
    fn extents(&self) -> [usize; 3];
}

/// Samples one field over a (sub-)volume
#[derive(Debug, Clone)]
pub struct FieldSource {
    volume: SubVolume,
    field: FieldKind,
    axis: Axis,
    shape: SourceShape,
}

impl FieldSource {
    /// Real-valued sampler of a single component
    pub fn scalar(volume: SubVolume, field: FieldKind, axis: Axis) -> Self {
        Self {
            volume,
            field,
            axis,
            shape: SourceShape::Scalar,
        }
    }

    /// Complex sampler of a single component
    pub fn scalar_complex(volume: SubVolume, field: FieldKind, axis: Axis) -> Self {
        Self {
            volume,
            field,
            axis,
            shape: SourceShape::ScalarComplex,
        }
    }

    /// Complex sampler of all three components
    pub fn vector_complex(volume: SubVolume, field: FieldKind) -> Self {
        Self {
            volume,
            field,
            // Unused by the vector shape
            axis: Axis::X,
            shape: SourceShape::VectorComplex,
        }
    }

    /// Sampled field
    pub fn field(&self) -> FieldKind {
        self.field
    }

    /// Sampled axis (vector sources report X)
    pub fn axis(&self) -> Axis {
        self.axis
    }

    fn fill_channel(&self, dof: &DegreesOfFreedom, axis: Axis, out: &mut [Real]) {
        let component = dof.component(self.field, axis);
        for (compact, padded) in self.volume.compact_iterator().zip(self.volume.iterator()) {
            out[compact] = component[padded];
        }
    }
}

impl ResultSource for FieldSource {
    fn extract(&mut self, dof: &DegreesOfFreedom, timestep: u64) -> ResultContainer {
        let n = self.volume.len();
        let extents = self.volume.extents();
        match self.shape {
            SourceShape::Scalar => {
                let mut values = vec![0.0; n];
                self.fill_channel(dof, self.axis, &mut values);
                ResultContainer::Scalar(ScalarContainer {
                    timestep,
                    extents,
                    values,
                })
            }
            SourceShape::ScalarComplex => {
                let mut real = vec![0.0; n];
                self.fill_channel(dof, self.axis, &mut real);
                ResultContainer::ScalarComplex(ScalarComplexContainer {
                    timestep,
                    extents,
                    real,
                    imag: vec![0.0; n],
                })
            }
            SourceShape::VectorComplex => {
                let mut real: [Vec<Real>; 3] = std::array::from_fn(|_| vec![0.0; n]);
                for axis in Axis::ALL {
                    self.fill_channel(dof, axis, &mut real[axis.index()]);
                }
                ResultContainer::Vector3DComplex(VectorComplexContainer {
                    timestep,
                    extents,
                    real,
                    imag: std::array::from_fn(|_| vec![0.0; n]),
                })
            }
        }
    }

    fn element_count(&self) -> usize {
        self.volume.len()
    }

    fn extents(&self) -> [usize; 3] {
        self.volume.extents()
    }
}
