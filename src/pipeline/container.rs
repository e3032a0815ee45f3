//! Result containers flowing through a pipeline
//!
//! A container is a timestep-stamped snapshot of one or more extracted
//! arrays, sized to its source iterator's element count. Ownership moves
//! from the source through the filter chain into the sink.

use crate::Real;

/// Real-valued scalar snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarContainer {
    pub timestep: u64,
    /// Sampled sub-volume extents
    pub extents: [usize; 3],
    pub values: Vec<Real>,
}

/// Complex scalar snapshot, split channels
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarComplexContainer {
    pub timestep: u64,
    pub extents: [usize; 3],
    pub real: Vec<Real>,
    pub imag: Vec<Real>,
}

/// Complex three-component vector snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct VectorComplexContainer {
    pub timestep: u64,
    pub extents: [usize; 3],
    pub real: [Vec<Real>; 3],
    pub imag: [Vec<Real>; 3],
}

/// The container variants a pipeline stage may see
#[derive(Debug, Clone, PartialEq)]
pub enum ResultContainer {
    Scalar(ScalarContainer),
    ScalarComplex(ScalarComplexContainer),
    Vector3DComplex(VectorComplexContainer),
}

impl ResultContainer {
    /// Timestep the snapshot was taken at
    pub fn timestep(&self) -> u64 {
        match self {
            ResultContainer::Scalar(c) => c.timestep,
            ResultContainer::ScalarComplex(c) => c.timestep,
            ResultContainer::Vector3DComplex(c) => c.timestep,
        }
    }

    /// Sampled sub-volume extents
    pub fn extents(&self) -> [usize; 3] {
        match self {
            ResultContainer::Scalar(c) => c.extents,
            ResultContainer::ScalarComplex(c) => c.extents,
            ResultContainer::Vector3DComplex(c) => c.extents,
        }
    }

    /// Elements per channel
    pub fn element_count(&self) -> usize {
        match self {
            ResultContainer::Scalar(c) => c.values.len(),
            ResultContainer::ScalarComplex(c) => c.real.len(),
            ResultContainer::Vector3DComplex(c) => c.real[0].len(),
        }
    }

    /// True when the container carries an imaginary channel
    pub fn is_complex(&self) -> bool {
        !matches!(self, ResultContainer::Scalar(_))
    }
}
