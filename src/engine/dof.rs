//! Degrees-of-freedom storage for the six field components
//!
//! Six aligned, zero-initialized arrays sized to the padded DoF count. The
//! thread team mutates them through `DofCell`, which hands out interior
//! access under the contract that concurrent writers touch disjoint index
//! ranges between barriers.

use crate::engine::aligned::AlignedVec;
use crate::engine::grid::Grid;
use crate::Real;
use std::cell::UnsafeCell;

/// Cartesian axis selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Zero-based axis number
    pub fn index(self) -> usize {
        self as usize
    }

    /// Cyclic successor (x → y → z → x)
    pub fn next(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    /// Cyclic predecessor
    pub fn prev(self) -> Axis {
        self.next().next()
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Electric or magnetic field selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FieldKind {
    Electric,
    Magnetic,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Electric => write!(f, "E"),
            FieldKind::Magnetic => write!(f, "H"),
        }
    }
}

/// The six field component arrays (Ex, Ey, Ez, Hx, Hy, Hz)
#[derive(Debug)]
pub struct DegreesOfFreedom {
    components: [AlignedVec<Real>; 6],
}

impl DegreesOfFreedom {
    /// Allocate zeroed component arrays for a grid
    pub fn new(grid: &Grid) -> Self {
        let len = grid.padded_len();
        let align = grid.simd_level().alignment().max(64);
        let guard = grid.simd_level().width();
        let components =
            std::array::from_fn(|_| AlignedVec::zeroed(len, align, guard));
        Self { components }
    }

    fn slot(field: FieldKind, axis: Axis) -> usize {
        match field {
            FieldKind::Electric => axis.index(),
            FieldKind::Magnetic => 3 + axis.index(),
        }
    }

    /// Component array for a field/axis pair
    pub fn component(&self, field: FieldKind, axis: Axis) -> &AlignedVec<Real> {
        &self.components[Self::slot(field, axis)]
    }

    /// Mutable component array for a field/axis pair
    pub fn component_mut(&mut self, field: FieldKind, axis: Axis) -> &mut AlignedVec<Real> {
        &mut self.components[Self::slot(field, axis)]
    }

    /// Electric component along an axis
    pub fn e(&self, axis: Axis) -> &AlignedVec<Real> {
        self.component(FieldKind::Electric, axis)
    }

    /// Magnetic component along an axis
    pub fn h(&self, axis: Axis) -> &AlignedVec<Real> {
        self.component(FieldKind::Magnetic, axis)
    }

    /// Reset every component to zero
    pub fn clear(&mut self) {
        for c in &mut self.components {
            c.clear();
        }
    }
}

/// Interior-mutability wrapper sharing the DoF store with the thread team.
///
/// Soundness contract: between two barriers, concurrent callers only write
/// disjoint index ranges and never read a component another thread is
/// writing in the same phase.
pub struct DofCell {
    inner: UnsafeCell<DegreesOfFreedom>,
}

unsafe impl Sync for DofCell {}

impl DofCell {
    /// Wrap a DoF store for team access
    pub fn new(dof: DegreesOfFreedom) -> Self {
        Self {
            inner: UnsafeCell::new(dof),
        }
    }

    /// Shared view; safe whenever no writer is active
    pub fn read(&self) -> &DegreesOfFreedom {
        unsafe { &*self.inner.get() }
    }

    /// Exclusive view under the disjoint-range contract
    #[allow(clippy::mut_from_ref)]
    pub fn write(&self) -> &mut DegreesOfFreedom {
        unsafe { &mut *self.inner.get() }
    }

    /// Recover sole ownership
    pub fn into_inner(self) -> DegreesOfFreedom {
        self.inner.into_inner()
    }
}

impl std::fmt::Debug for DofCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DofCell").finish_non_exhaustive()
    }
}
