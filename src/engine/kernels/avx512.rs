//! 16-wide AVX-512F implementation of the leapfrog curl update
//!
//! Same structure as the 8-wide kernel; lane masks map directly onto
//! `__mmask16` predicated stores.

use crate::domain::coefficients::CurlCoefficients;
use crate::engine::dof::{Axis, DofCell, FieldKind};
use crate::engine::grid::{Grid, SimdLevel};
use crate::engine::kernels::{ComponentPointers, ComponentTerms, KernelPlan, UpdateKernel};
use core::arch::x86_64::*;

const LANES: usize = 16;

#[derive(Debug, Clone, Copy)]
struct StoreMasks {
    first: __mmask16,
    begin: __mmask16,
    end: __mmask16,
    first_end: __mmask16,
    begin_end: __mmask16,
}

fn to_mask(mask: &[bool]) -> __mmask16 {
    let mut bits: u16 = 0;
    for (lane, &active) in mask.iter().enumerate() {
        if active {
            bits |= 1 << lane;
        }
    }
    bits
}

/// AVX-512F update strategy
pub struct Avx512Kernel {
    plan: KernelPlan,
    electric: CurlCoefficients,
    magnetic: CurlCoefficients,
    masks: StoreMasks,
}

impl Avx512Kernel {
    /// Build from the grid geometry and the two coefficient sets it owns.
    ///
    /// Panics when the host lacks AVX-512F; the level probe upstream
    /// prevents that in normal construction.
    pub fn new(grid: &Grid, electric: CurlCoefficients, magnetic: CurlCoefficients) -> Self {
        assert!(
            is_x86_feature_detected!("avx512f"),
            "AVX-512 kernel built on a host without AVX-512F"
        );
        let plan = KernelPlan::new(grid);
        assert_eq!(plan.masks.width, LANES);
        let first = to_mask(&plan.masks.first_vector);
        let begin = to_mask(&plan.masks.begin_vector);
        let end = to_mask(&plan.masks.end_vector);
        let masks = StoreMasks {
            first,
            begin,
            end,
            first_end: first & end,
            begin_end: begin & end,
        };
        Self {
            plan,
            electric,
            magnetic,
            masks,
        }
    }

    /// Store mask for chunk `v` of a row, or `None` for unmasked interior
    fn store_mask(&self, v: usize, exclude_boundary_lane: bool) -> Option<__mmask16> {
        let last = self.plan.masks.vectors_per_row - 1;
        match (v, exclude_boundary_lane) {
            (0, true) if last == 0 => Some(self.masks.first_end),
            (0, false) if last == 0 => Some(self.masks.begin_end),
            (0, true) => Some(self.masks.first),
            (0, false) => Some(self.masks.begin),
            (v, _) if v == last => Some(self.masks.end),
            _ => None,
        }
    }

    fn minus_offset(&self, axis: Axis, y: usize, z: usize) -> usize {
        match axis {
            Axis::X => 0,
            Axis::Y if y == 0 => 0,
            Axis::Z if z == 0 => 0,
            other => self.plan.stride(other),
        }
    }

    fn plus_offset(&self, axis: Axis, y: usize, z: usize) -> usize {
        match axis {
            Axis::X => 0,
            Axis::Y if y == self.plan.ny - 1 => 0,
            Axis::Z if z == self.plan.nz - 1 => 0,
            other => self.plan.stride(other),
        }
    }

    #[target_feature(enable = "avx512f")]
    unsafe fn rows_e(
        &self,
        ptrs: &ComponentPointers,
        terms: &ComponentTerms,
        z_begin: usize,
        z_end: usize,
    ) {
        let plan = &self.plan;
        let vectors = plan.masks.vectors_per_row;
        let exclude = terms.reads_x_minus();
        let p_is_x = terms.shift_p == Axis::X;
        let q_is_x = terms.shift_q == Axis::X;
        for z in z_begin..z_end {
            for y in 0..plan.ny {
                let row = y * plan.sy + z * plan.sz;
                let op = self.minus_offset(terms.shift_p, y, z);
                let oq = self.minus_offset(terms.shift_q, y, z);
                for v in 0..vectors {
                    let base = row + v * LANES;
                    let pc = _mm512_load_ps(ptrs.p.add(base));
                    let ps = if p_is_x {
                        _mm512_loadu_ps(ptrs.p.add(base).sub(1))
                    } else {
                        _mm512_load_ps(ptrs.p.add(base - op))
                    };
                    let qc = _mm512_load_ps(ptrs.q.add(base));
                    let qs = if q_is_x {
                        _mm512_loadu_ps(ptrs.q.add(base).sub(1))
                    } else {
                        _mm512_load_ps(ptrs.q.add(base - oq))
                    };
                    let c1 = _mm512_load_ps(ptrs.c1.add(base));
                    let c2 = _mm512_load_ps(ptrs.c2.add(base));
                    let out = _mm512_load_ps(ptrs.out.add(base));
                    let acc = _mm512_add_ps(out, _mm512_mul_ps(c1, _mm512_sub_ps(pc, ps)));
                    let acc = _mm512_add_ps(acc, _mm512_mul_ps(c2, _mm512_sub_ps(qs, qc)));
                    match self.store_mask(v, exclude) {
                        Some(mask) => _mm512_mask_store_ps(ptrs.out.add(base), mask, acc),
                        None => _mm512_store_ps(ptrs.out.add(base), acc),
                    }
                }
            }
        }
    }

    #[target_feature(enable = "avx512f")]
    unsafe fn rows_h(
        &self,
        ptrs: &ComponentPointers,
        terms: &ComponentTerms,
        z_begin: usize,
        z_end: usize,
    ) {
        let plan = &self.plan;
        let vectors = plan.masks.vectors_per_row;
        let p_is_x = terms.shift_p == Axis::X;
        let q_is_x = terms.shift_q == Axis::X;
        for z in z_begin..z_end {
            for y in 0..plan.ny {
                let row = y * plan.sy + z * plan.sz;
                let op = self.plus_offset(terms.shift_p, y, z);
                let oq = self.plus_offset(terms.shift_q, y, z);
                for v in 0..vectors {
                    let base = row + v * LANES;
                    let pc = _mm512_load_ps(ptrs.p.add(base));
                    let ps = if p_is_x {
                        // +1 lane; the last domain lane reads zeroed padding
                        _mm512_loadu_ps(ptrs.p.add(base + 1))
                    } else {
                        _mm512_load_ps(ptrs.p.add(base + op))
                    };
                    let qc = _mm512_load_ps(ptrs.q.add(base));
                    let qs = if q_is_x {
                        _mm512_loadu_ps(ptrs.q.add(base + 1))
                    } else {
                        _mm512_load_ps(ptrs.q.add(base + oq))
                    };
                    let c1 = _mm512_load_ps(ptrs.c1.add(base));
                    let c2 = _mm512_load_ps(ptrs.c2.add(base));
                    let out = _mm512_load_ps(ptrs.out.add(base));
                    let acc = _mm512_add_ps(out, _mm512_mul_ps(c1, _mm512_sub_ps(pc, ps)));
                    let acc = _mm512_add_ps(acc, _mm512_mul_ps(c2, _mm512_sub_ps(qs, qc)));
                    match self.store_mask(v, false) {
                        Some(mask) => _mm512_mask_store_ps(ptrs.out.add(base), mask, acc),
                        None => _mm512_store_ps(ptrs.out.add(base), acc),
                    }
                }
            }
        }
    }
}

impl UpdateKernel for Avx512Kernel {
    fn update_e_slab(&self, dof: &DofCell, z_begin: usize, z_end: usize) {
        for axis in Axis::ALL {
            let terms = ComponentTerms::for_component(axis);
            let ptrs =
                ComponentPointers::resolve(dof, &self.electric, FieldKind::Electric, &terms);
            unsafe { self.rows_e(&ptrs, &terms, z_begin, z_end) };
        }
    }

    fn update_h_slab(&self, dof: &DofCell, z_begin: usize, z_end: usize) {
        for axis in Axis::ALL {
            let terms = ComponentTerms::for_component(axis);
            let ptrs =
                ComponentPointers::resolve(dof, &self.magnetic, FieldKind::Magnetic, &terms);
            unsafe { self.rows_h(&ptrs, &terms, z_begin, z_end) };
        }
    }

    fn name(&self) -> &'static str {
        "avx512-16"
    }

    fn simd_level(&self) -> SimdLevel {
        SimdLevel::Wide16
    }

    fn time_step(&self) -> f64 {
        self.electric.time_step()
    }
}
