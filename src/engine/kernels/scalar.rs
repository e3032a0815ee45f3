//! Scalar reference implementation of the leapfrog curl update
//!
//! One lane, no padding. The other variants must match this loop
//! float-for-float; its boundary handling is the specification the masked
//! vector paths reproduce: the hard X boundary lane is skipped for the
//! components that read the previous lane, reads past the far X edge see
//! zero, and Y/Z boundary rows zero the neighbor difference.

use crate::domain::coefficients::CurlCoefficients;
use crate::engine::dof::{Axis, DofCell, FieldKind};
use crate::engine::grid::{Grid, SimdLevel};
use crate::engine::kernels::{ComponentPointers, ComponentTerms, KernelPlan, UpdateKernel};
use crate::Real;

/// Plain-loop update strategy
pub struct ScalarKernel {
    plan: KernelPlan,
    electric: CurlCoefficients,
    magnetic: CurlCoefficients,
}

impl ScalarKernel {
    /// Build from the grid geometry and the two coefficient sets it owns
    pub fn new(grid: &Grid, electric: CurlCoefficients, magnetic: CurlCoefficients) -> Self {
        Self {
            plan: KernelPlan::new(grid),
            electric,
            magnetic,
        }
    }

    /// Neighbor offset toward the lower boundary, zero on the boundary row
    fn minus_offset(&self, axis: Axis, y: usize, z: usize) -> usize {
        match axis {
            Axis::X => 1,
            Axis::Y if y == 0 => 0,
            Axis::Z if z == 0 => 0,
            other => self.plan.stride(other),
        }
    }

    /// Neighbor offset toward the upper boundary, zero on the boundary row
    fn plus_offset(&self, axis: Axis, y: usize, z: usize) -> usize {
        match axis {
            Axis::X => 1,
            Axis::Y if y == self.plan.ny - 1 => 0,
            Axis::Z if z == self.plan.nz - 1 => 0,
            other => self.plan.stride(other),
        }
    }

    fn component_e(&self, dof: &DofCell, terms: &ComponentTerms, z_begin: usize, z_end: usize) {
        let ptrs = ComponentPointers::resolve(dof, &self.electric, FieldKind::Electric, terms);
        let plan = &self.plan;
        let x_start = terms.reads_x_minus() as usize;
        for z in z_begin..z_end {
            for y in 0..plan.ny {
                let row = y * plan.sy + z * plan.sz;
                let op = self.minus_offset(terms.shift_p, y, z);
                let oq = self.minus_offset(terms.shift_q, y, z);
                for x in x_start..plan.nx {
                    let i = row + x;
                    unsafe {
                        let dp = *ptrs.p.add(i) - *ptrs.p.add(i - op);
                        let dq = *ptrs.q.add(i - oq) - *ptrs.q.add(i);
                        let acc = *ptrs.out.add(i) + *ptrs.c1.add(i) * dp;
                        *ptrs.out.add(i) = acc + *ptrs.c2.add(i) * dq;
                    }
                }
            }
        }
    }

    fn component_h(&self, dof: &DofCell, terms: &ComponentTerms, z_begin: usize, z_end: usize) {
        let ptrs = ComponentPointers::resolve(dof, &self.magnetic, FieldKind::Magnetic, terms);
        let plan = &self.plan;
        for z in z_begin..z_end {
            for y in 0..plan.ny {
                let row = y * plan.sy + z * plan.sz;
                let op = self.plus_offset(terms.shift_p, y, z);
                let oq = self.plus_offset(terms.shift_q, y, z);
                for x in 0..plan.nx {
                    let i = row + x;
                    unsafe {
                        let p_next = if terms.shift_p == Axis::X && x + 1 == plan.nx {
                            0.0
                        } else {
                            *ptrs.p.add(i + op)
                        };
                        let q_next = if terms.shift_q == Axis::X && x + 1 == plan.nx {
                            0.0
                        } else {
                            *ptrs.q.add(i + oq)
                        };
                        let dp: Real = *ptrs.p.add(i) - p_next;
                        let dq: Real = q_next - *ptrs.q.add(i);
                        let acc = *ptrs.out.add(i) + *ptrs.c1.add(i) * dp;
                        *ptrs.out.add(i) = acc + *ptrs.c2.add(i) * dq;
                    }
                }
            }
        }
    }
}

impl UpdateKernel for ScalarKernel {
    fn update_e_slab(&self, dof: &DofCell, z_begin: usize, z_end: usize) {
        for axis in Axis::ALL {
            self.component_e(dof, &ComponentTerms::for_component(axis), z_begin, z_end);
        }
    }

    fn update_h_slab(&self, dof: &DofCell, z_begin: usize, z_end: usize) {
        for axis in Axis::ALL {
            self.component_h(dof, &ComponentTerms::for_component(axis), z_begin, z_end);
        }
    }

    fn name(&self) -> &'static str {
        "scalar"
    }

    fn simd_level(&self) -> SimdLevel {
        SimdLevel::Scalar
    }

    fn time_step(&self) -> f64 {
        self.electric.time_step()
    }
}
