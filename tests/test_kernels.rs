//! Numerical interchangeability of the update-loop variants
//!
//! The scalar, 8-lane and 16-lane strategies must produce float-identical
//! DoF arrays for the same grid, coefficients and excitation. Vector
//! variants only run where the host supports them.


use fittd::engine::dof::{Axis, FieldKind};
use fittd::engine::grid::SimdLevel;
use fittd::engine::kernels::FieldUpdater;
use test_utils::*;

/// Impulse response after `steps` leapfrog steps, read per logical
/// coordinate so differing padded strides compare cleanly
fn impulse_response(dims: [usize; 3], level: SimdLevel, steps: usize) -> Vec<Vec<f32>> {
    let mut updater = uniform_updater(dims, level);
    let grid = updater.grid().clone();
    let center = [dims[0] / 2, dims[1] / 2, dims[2] / 2];
    updater.dof_mut().component_mut(FieldKind::Electric, Axis::X)[grid.index(center)] = 1.0;

    let nz = dims[2];
    for _ in 0..steps {
        updater.update_h(0, nz);
        updater.update_e(0, nz);
    }

    let dof = updater.dof().read();
    let mut components = Vec::with_capacity(6);
    for field in [FieldKind::Electric, FieldKind::Magnetic] {
        for axis in Axis::ALL {
            let data = dof.component(field, axis);
            let mut logical = Vec::with_capacity(grid.node_count());
            for z in 0..dims[2] {
                for y in 0..dims[1] {
                    for x in 0..dims[0] {
                        logical.push(data[grid.index([x, y, z])]);
                    }
                }
            }
            components.push(logical);
        }
    }
    components
}

fn assert_levels_match(dims: [usize; 3], reference: SimdLevel, candidate: SimdLevel) {
    let steps = 10;
    let expected = impulse_response(dims, reference, steps);
    let actual = impulse_response(dims, candidate, steps);
    for (component, (a, b)) in expected.iter().zip(actual.iter()).enumerate() {
        for (node, (&va, &vb)) in a.iter().zip(b.iter()).enumerate() {
            assert_eq!(
                va, vb,
                "component {component} diverges at node {node} \
                 ({reference:?} vs {candidate:?}, dims {dims:?})"
            );
        }
    }
}

// Extents chosen to exercise partial, exact-multiple and sub-width rows
const SHAPES: [[usize; 3]; 4] = [[10, 6, 6], [16, 5, 5], [5, 4, 4], [17, 4, 4]];

#[test]
fn test_wide8_matches_scalar() {
    if SimdLevel::host() < SimdLevel::Wide8 {
        eprintln!("host lacks 8-wide support; skipping");
        return;
    }
    for dims in SHAPES {
        assert_levels_match(dims, SimdLevel::Scalar, SimdLevel::Wide8);
    }
}

#[test]
fn test_wide16_matches_scalar() {
    if SimdLevel::host() < SimdLevel::Wide16 {
        eprintln!("host lacks 16-wide support; skipping");
        return;
    }
    for dims in SHAPES {
        assert_levels_match(dims, SimdLevel::Scalar, SimdLevel::Wide16);
    }
}

#[test]
fn test_kernel_selection_follows_grid_level() {
    let updater = uniform_updater([8, 4, 4], SimdLevel::Scalar);
    assert_eq!(updater.kernel_name(), "scalar");

    if SimdLevel::host() >= SimdLevel::Wide8 {
        let updater = uniform_updater([8, 4, 4], SimdLevel::Wide8);
        assert_eq!(updater.kernel_name(), "avx2-8");
    }
    if SimdLevel::host() >= SimdLevel::Wide16 {
        let updater = uniform_updater([8, 4, 4], SimdLevel::Wide16);
        assert_eq!(updater.kernel_name(), "avx512-16");
    }
}

#[test]
fn test_energy_spreads_symmetrically() {
    // The impulse response of a centered Ex source is mirror-symmetric in y
    let dims = [9, 9, 9];
    let response = impulse_response(dims, SimdLevel::Scalar, 6);
    let ex = &response[0];
    let idx = |x: usize, y: usize, z: usize| x + dims[0] * (y + dims[1] * z);
    for dy in 1..3 {
        assert_eq!(
            ex[idx(4, 4 - dy, 4)],
            ex[idx(4, 4 + dy, 4)],
            "y mirror symmetry broken at offset {dy}"
        );
    }
}

#[test]
fn test_updater_reports_time_step() {
    let updater: FieldUpdater = uniform_updater([6, 6, 6], SimdLevel::Scalar);
    assert!(updater.time_step() > 0.0);
}
