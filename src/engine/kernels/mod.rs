//! Interchangeable update-loop strategies
//!
//! Three numerically interchangeable implementations of the leapfrog curl
//! update: a scalar reference loop, an 8-wide AVX2 kernel and a 16-wide
//! AVX-512 kernel. The variant is chosen once at build time from the grid's
//! detected lane width and never mixed within a run.
//!
//! All variants keep to plain multiply-then-add (no fused ops) so their
//! results are float-identical lane for lane.

mod scalar;

#[cfg(target_arch = "x86_64")]
mod avx;
#[cfg(target_arch = "x86_64")]
mod avx512;

pub use scalar::ScalarKernel;

#[cfg(target_arch = "x86_64")]
pub use avx::AvxKernel;
#[cfg(target_arch = "x86_64")]
pub use avx512::Avx512Kernel;

use crate::domain::coefficients::CurlCoefficients;
use crate::engine::dof::{Axis, DegreesOfFreedom, DofCell, FieldKind};
use crate::engine::grid::{Grid, IntrinsicMasks, SimdLevel};
use crate::Real;
use tracing::info;

/// Row geometry and lane masks shared by every kernel variant
#[derive(Debug, Clone)]
pub(crate) struct KernelPlan {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// +1 strides in Y and Z (X stride is 1)
    pub sy: usize,
    pub sz: usize,
    pub masks: IntrinsicMasks,
}

impl KernelPlan {
    pub fn new(grid: &Grid) -> Self {
        let [nx, ny, nz] = grid.dims();
        let [_, sy, sz] = grid.strides();
        Self {
            nx,
            ny,
            nz,
            sy,
            sz,
            masks: grid.masks(),
        }
    }

    /// Stride for a +1 step along an axis
    pub fn stride(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => 1,
            Axis::Y => self.sy,
            Axis::Z => self.sz,
        }
    }
}

/// Operand wiring of one component update.
///
/// Component `a` of one field reads the other field's `a.prev()` component
/// shifted along `a.next()`, and its `a.next()` component shifted along
/// `a.prev()`; the curl coefficients follow the shift axes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ComponentTerms {
    pub component: Axis,
    /// First operand: other field, axis `component.prev()`
    pub p: Axis,
    /// Second operand: other field, axis `component.next()`
    pub q: Axis,
    /// Shift axis of the first operand (`component.next()`)
    pub shift_p: Axis,
    /// Shift axis of the second operand (`component.prev()`)
    pub shift_q: Axis,
}

impl ComponentTerms {
    pub fn for_component(component: Axis) -> Self {
        Self {
            component,
            p: component.prev(),
            q: component.next(),
            shift_p: component.next(),
            shift_q: component.prev(),
        }
    }

    /// True when this component's update reads the previous X lane
    pub fn reads_x_minus(&self) -> bool {
        self.shift_p == Axis::X || self.shift_q == Axis::X
    }
}

/// Raw pointers for one component update, resolved from the DoF store and a
/// coefficient set. Lifetimes are managed by the caller; the pointed-to
/// buffers carry one-vector guard regions on both sides.
pub(crate) struct ComponentPointers {
    pub out: *mut Real,
    pub p: *const Real,
    pub q: *const Real,
    pub c1: *const Real,
    pub c2: *const Real,
}

impl ComponentPointers {
    /// Resolve pointers for updating `field`'s component per `terms`
    pub fn resolve(
        dof: &DofCell,
        coefficients: &CurlCoefficients,
        field: FieldKind,
        terms: &ComponentTerms,
    ) -> Self {
        let other = match field {
            FieldKind::Electric => FieldKind::Magnetic,
            FieldKind::Magnetic => FieldKind::Electric,
        };
        let store = dof.write();
        let out = store
            .component_mut(field, terms.component)
            .as_mut_ptr();
        let store = dof.read();
        let p = store.component(other, terms.p).as_ptr();
        let q = store.component(other, terms.q).as_ptr();
        let c1 = coefficients
            .coefficient(terms.component, terms.shift_p)
            .as_ptr();
        let c2 = coefficients
            .coefficient(terms.component, terms.shift_q)
            .as_ptr();
        Self { out, p, q, c1, c2 }
    }
}

/// Common contract of the three update-loop variants.
///
/// `update_e_slab`/`update_h_slab` advance one field over the z-slab range
/// `[z_begin, z_end)`, mutating the DoF store in place. Callers guarantee
/// that concurrent invocations cover disjoint slabs and that a full barrier
/// separates the E and H phases.
pub trait UpdateKernel: Send + Sync {
    /// Advance the electric field over a z-slab range
    fn update_e_slab(&self, dof: &DofCell, z_begin: usize, z_end: usize);

    /// Advance the magnetic field over a z-slab range
    fn update_h_slab(&self, dof: &DofCell, z_begin: usize, z_end: usize);

    /// Variant name for reporting
    fn name(&self) -> &'static str;

    /// Lane width the variant runs at
    fn simd_level(&self) -> SimdLevel;

    /// The stable time step baked into the coefficient sets
    fn time_step(&self) -> f64;
}

/// Build the kernel matching the grid's lane width.
///
/// The probe happened when the grid was constructed; no per-element
/// branching remains after this point.
pub fn build_kernel(
    grid: &Grid,
    electric: CurlCoefficients,
    magnetic: CurlCoefficients,
) -> Box<dyn UpdateKernel> {
    match grid.simd_level() {
        SimdLevel::Scalar => Box::new(ScalarKernel::new(grid, electric, magnetic)),
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Wide8 => Box::new(AvxKernel::new(grid, electric, magnetic)),
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Wide16 => Box::new(Avx512Kernel::new(grid, electric, magnetic)),
        #[cfg(not(target_arch = "x86_64"))]
        _ => Box::new(ScalarKernel::new(grid, electric, magnetic)),
    }
}

/// One update-loop instance: the selected kernel, both coefficient sets it
/// owns, and the DoF store it has exclusive use of.
pub struct FieldUpdater {
    grid: Grid,
    kernel: Box<dyn UpdateKernel>,
    dof: DofCell,
}

impl FieldUpdater {
    /// Allocate the DoF store and select the kernel for `grid`
    pub fn new(grid: Grid, electric: CurlCoefficients, magnetic: CurlCoefficients) -> Self {
        let dof = DofCell::new(DegreesOfFreedom::new(&grid));
        let kernel = build_kernel(&grid, electric, magnetic);
        info!(kernel = kernel.name(), "update loop selected");
        Self { grid, kernel, dof }
    }

    /// Grid geometry
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Shared DoF cell for the thread team
    pub fn dof(&self) -> &DofCell {
        &self.dof
    }

    /// Exclusive DoF access from the coordinating thread
    pub fn dof_mut(&mut self) -> &mut DegreesOfFreedom {
        self.dof.write()
    }

    /// Advance E over a z-slab range
    pub fn update_e(&self, z_begin: usize, z_end: usize) {
        self.kernel.update_e_slab(&self.dof, z_begin, z_end);
    }

    /// Advance H over a z-slab range
    pub fn update_h(&self, z_begin: usize, z_end: usize) {
        self.kernel.update_h_slab(&self.dof, z_begin, z_end);
    }

    /// Kernel variant name
    pub fn kernel_name(&self) -> &'static str {
        self.kernel.name()
    }

    /// Stable time step of the run
    pub fn time_step(&self) -> f64 {
        self.kernel.time_step()
    }
}

impl std::fmt::Debug for FieldUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldUpdater")
            .field("kernel", &self.kernel.name())
            .field("grid", &self.grid)
            .finish()
    }
}
