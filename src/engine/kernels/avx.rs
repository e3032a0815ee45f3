//! 8-wide AVX2 implementation of the leapfrog curl update
//!
//! Interior vectors run unmasked; the first and last vector of every row use
//! the begin/end lane masks so domain edges never branch per scalar. Shifted
//! X reads use unaligned loads into the buffer guard regions; Y/Z neighbor
//! rows are selected by a per-row offset that collapses to the center row on
//! boundary rows, zeroing the difference.

use crate::domain::coefficients::CurlCoefficients;
use crate::engine::dof::{Axis, DofCell, FieldKind};
use crate::engine::grid::{Grid, SimdLevel};
use crate::engine::kernels::{ComponentPointers, ComponentTerms, KernelPlan, UpdateKernel};
use core::arch::x86_64::*;

const LANES: usize = 8;

/// Per-chunk store masks in maskstore form (high bit per active lane)
#[derive(Debug, Clone)]
struct StoreMasks {
    first: [i32; LANES],
    begin: [i32; LANES],
    end: [i32; LANES],
    first_end: [i32; LANES],
    begin_end: [i32; LANES],
}

fn to_lanes(mask: &[bool]) -> [i32; LANES] {
    let mut out = [0i32; LANES];
    for (lane, &active) in mask.iter().enumerate() {
        out[lane] = if active { -1 } else { 0 };
    }
    out
}

fn and_lanes(a: [i32; LANES], b: [i32; LANES]) -> [i32; LANES] {
    let mut out = [0i32; LANES];
    for lane in 0..LANES {
        out[lane] = a[lane] & b[lane];
    }
    out
}

/// AVX2 update strategy
pub struct AvxKernel {
    plan: KernelPlan,
    electric: CurlCoefficients,
    magnetic: CurlCoefficients,
    masks: StoreMasks,
}

impl AvxKernel {
    /// Build from the grid geometry and the two coefficient sets it owns.
    ///
    /// Panics when the host lacks AVX2; the level probe upstream prevents
    /// that in normal construction.
    pub fn new(grid: &Grid, electric: CurlCoefficients, magnetic: CurlCoefficients) -> Self {
        assert!(
            is_x86_feature_detected!("avx2"),
            "AVX2 kernel built on a host without AVX2"
        );
        let plan = KernelPlan::new(grid);
        assert_eq!(plan.masks.width, LANES);
        let first = to_lanes(&plan.masks.first_vector);
        let begin = to_lanes(&plan.masks.begin_vector);
        let end = to_lanes(&plan.masks.end_vector);
        let masks = StoreMasks {
            first,
            begin,
            end,
            first_end: and_lanes(first, end),
            begin_end: and_lanes(begin, end),
        };
        Self {
            plan,
            electric,
            magnetic,
            masks,
        }
    }

    /// Store mask for chunk `v` of a row, or `None` for unmasked interior
    fn store_mask(&self, v: usize, exclude_boundary_lane: bool) -> Option<&[i32; LANES]> {
        let last = self.plan.masks.vectors_per_row - 1;
        match (v, exclude_boundary_lane) {
            (0, true) if last == 0 => Some(&self.masks.first_end),
            (0, false) if last == 0 => Some(&self.masks.begin_end),
            (0, true) => Some(&self.masks.first),
            (0, false) => Some(&self.masks.begin),
            (v, _) if v == last => Some(&self.masks.end),
            _ => None,
        }
    }

    fn minus_offset(&self, axis: Axis, y: usize, z: usize) -> usize {
        match axis {
            Axis::X => 0, // handled by the shifted load
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

    #[target_feature(enable = "avx2")]
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
                    let pc = _mm256_load_ps(ptrs.p.add(base));
                    let ps = if p_is_x {
                        _mm256_loadu_ps(ptrs.p.add(base).sub(1))
                    } else {
                        _mm256_load_ps(ptrs.p.add(base - op))
                    };
                    let qc = _mm256_load_ps(ptrs.q.add(base));
                    let qs = if q_is_x {
                        _mm256_loadu_ps(ptrs.q.add(base).sub(1))
                    } else {
                        _mm256_load_ps(ptrs.q.add(base - oq))
                    };
                    let c1 = _mm256_load_ps(ptrs.c1.add(base));
                    let c2 = _mm256_load_ps(ptrs.c2.add(base));
                    let out = _mm256_load_ps(ptrs.out.add(base));
                    let acc = _mm256_add_ps(out, _mm256_mul_ps(c1, _mm256_sub_ps(pc, ps)));
                    let acc = _mm256_add_ps(acc, _mm256_mul_ps(c2, _mm256_sub_ps(qs, qc)));
                    match self.store_mask(v, exclude) {
                        Some(mask) => {
                            let m = _mm256_loadu_si256(mask.as_ptr() as *const __m256i);
                            _mm256_maskstore_ps(ptrs.out.add(base), m, acc);
                        }
                        None => _mm256_store_ps(ptrs.out.add(base), acc),
                    }
                }
            }
        }
    }

    #[target_feature(enable = "avx2")]
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
                    let pc = _mm256_load_ps(ptrs.p.add(base));
                    let ps = if p_is_x {
                        // +1 lane; the last domain lane reads zeroed padding
                        _mm256_loadu_ps(ptrs.p.add(base + 1))
                    } else {
                        _mm256_load_ps(ptrs.p.add(base + op))
                    };
                    let qc = _mm256_load_ps(ptrs.q.add(base));
                    let qs = if q_is_x {
                        _mm256_loadu_ps(ptrs.q.add(base + 1))
                    } else {
                        _mm256_load_ps(ptrs.q.add(base + oq))
                    };
                    let c1 = _mm256_load_ps(ptrs.c1.add(base));
                    let c2 = _mm256_load_ps(ptrs.c2.add(base));
                    let out = _mm256_load_ps(ptrs.out.add(base));
                    let acc = _mm256_add_ps(out, _mm256_mul_ps(c1, _mm256_sub_ps(pc, ps)));
                    let acc = _mm256_add_ps(acc, _mm256_mul_ps(c2, _mm256_sub_ps(qs, qc)));
                    match self.store_mask(v, false) {
                        Some(mask) => {
                            let m = _mm256_loadu_si256(mask.as_ptr() as *const __m256i);
                            _mm256_maskstore_ps(ptrs.out.add(base), m, acc);
                        }
                        None => _mm256_store_ps(ptrs.out.add(base), acc),
                    }
                }
            }
        }
    }
}

impl UpdateKernel for AvxKernel {
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
        "avx2-8"
    }

    fn simd_level(&self) -> SimdLevel {
        SimdLevel::Wide8
    }

    fn time_step(&self) -> f64 {
        self.electric.time_step()
    }
}
