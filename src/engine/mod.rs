//! Core numerical engine
//!
//! Grid indexing and SIMD padding, aligned storage, the degrees-of-freedom
//! store, volume iteration, and the interchangeable update-loop kernels.

pub mod aligned;
pub mod dof;
pub mod grid;
pub mod iterators;
pub mod kernels;

pub use aligned::AlignedVec;
pub use dof::{Axis, DegreesOfFreedom, DofCell, FieldKind};
pub use grid::{Grid, IntrinsicMasks, SimdLevel};
pub use iterators::{AxisRange, SubVolume, VolumeIterator};
pub use kernels::{FieldUpdater, UpdateKernel};
