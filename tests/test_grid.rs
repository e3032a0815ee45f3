//! Padding and lane-mask invariants across widths and extents

use fittd::engine::grid::{Grid, IntrinsicMasks, SimdLevel};

#[test]
fn test_vector_count_matches_extent() {
    for level in [SimdLevel::Wide8, SimdLevel::Wide16] {
        let w = level.width();
        for nx in 1..=3 * w + 1 {
            let grid = Grid::new([nx, 2, 2], level).unwrap();
            let masks = grid.masks();
            assert_eq!(
                masks.vectors_per_row,
                nx.div_ceil(w),
                "vector count for extent {nx} at width {w}"
            );
        }
    }
}

#[test]
fn test_mask_active_bits_follow_partial_fill() {
    for level in [SimdLevel::Wide8, SimdLevel::Wide16] {
        let w = level.width();
        for nx in 1..=3 * w + 1 {
            let grid = Grid::new([nx, 2, 2], level).unwrap();
            let masks = grid.masks();
            let tail = if nx % w == 0 { w } else { nx % w };
            assert_eq!(IntrinsicMasks::active(&masks.end_vector), tail);
            assert_eq!(IntrinsicMasks::active(&masks.begin_vector), nx.min(w));
            // The first vector drops exactly the hard boundary lane
            assert_eq!(
                IntrinsicMasks::active(&masks.first_vector),
                nx.min(w) - 1
            );
        }
    }
}

#[test]
fn test_padded_stride_always_covers_plus_one_reads() {
    for level in [SimdLevel::Wide8, SimdLevel::Wide16] {
        for nx in [7, 8, 15, 16, 24, 31] {
            let grid = Grid::new([nx, 3, 3], level).unwrap();
            // One padding lane at minimum, so x+1 reads from the last domain
            // lane stay inside the row
            assert!(grid.padded_stride() > nx);
            assert_eq!(grid.padded_stride() % level.width(), 0);
        }
    }
}

#[test]
fn test_scalar_level_needs_no_padding() {
    let grid = Grid::new([13, 5, 5], SimdLevel::Scalar).unwrap();
    assert_eq!(grid.padded_stride(), 13);
    assert_eq!(grid.masks().vectors_per_row, 13);
}

#[test]
fn test_linear_index_invariant() {
    let grid = Grid::new([7, 5, 4], SimdLevel::Wide8).unwrap();
    let stride = grid.padded_stride();
    for z in 0..4 {
        for y in 0..5 {
            for x in 0..7 {
                assert_eq!(grid.index([x, y, z]), x + stride * y + stride * 5 * z);
            }
        }
    }
}

#[test]
fn test_detect_clamps_to_host() {
    let detected = SimdLevel::detect(SimdLevel::Wide16);
    assert!(detected <= SimdLevel::host());
    assert_eq!(SimdLevel::detect(SimdLevel::Scalar), SimdLevel::Scalar);
}
