//! Grid and sub-volume traversal
//!
//! A volume iterator is three per-axis component iterators advanced
//! odometer-style: X first, then Y on X exhaustion, then Z. Sub-volumes
//! restrict each axis independently and can materialize a compact zero-based
//! iterator for small result buffers.

use crate::engine::grid::Grid;
use crate::error::{Result, SolverError};

/// One axis of a volume traversal: half-open range plus step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl AxisRange {
    /// Full axis at unit step
    pub fn full(extent: usize) -> Self {
        Self {
            start: 0,
            end: extent,
            step: 1,
        }
    }

    /// Number of visited positions
    pub fn count(&self) -> usize {
        if self.end <= self.start {
            0
        } else {
            (self.end - self.start).div_ceil(self.step)
        }
    }
}

/// Odometer traversal over a (sub-)volume, yielding linear indices
#[derive(Debug, Clone)]
pub struct VolumeIterator {
    axes: [AxisRange; 3],
    strides: [usize; 3],
    current: [usize; 3],
    exhausted: bool,
    len: usize,
}

impl VolumeIterator {
    /// Traverse `axes` through an index space with the given unit strides
    pub fn new(axes: [AxisRange; 3], strides: [usize; 3]) -> Self {
        let len = axes.iter().map(AxisRange::count).product();
        let current = [axes[0].start, axes[1].start, axes[2].start];
        Self {
            axes,
            strides,
            current,
            exhausted: len == 0,
            len,
        }
    }

    /// Total element count of the traversal
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the traversal covers no node
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Visited positions per axis
    pub fn extents(&self) -> [usize; 3] {
        [
            self.axes[0].count(),
            self.axes[1].count(),
            self.axes[2].count(),
        ]
    }

    /// Restore the odometer to its start position
    pub fn reset(&mut self) {
        self.current = [self.axes[0].start, self.axes[1].start, self.axes[2].start];
        self.exhausted = self.len == 0;
    }

    fn advance(&mut self) {
        self.current[0] += self.axes[0].step;
        if self.current[0] < self.axes[0].end {
            return;
        }
        self.current[0] = self.axes[0].start;
        self.current[1] += self.axes[1].step;
        if self.current[1] < self.axes[1].end {
            return;
        }
        self.current[1] = self.axes[1].start;
        self.current[2] += self.axes[2].step;
        if self.current[2] >= self.axes[2].end {
            self.exhausted = true;
        }
    }
}

impl Iterator for VolumeIterator {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.exhausted {
            return None;
        }
        let index = self.current[0] * self.strides[0]
            + self.current[1] * self.strides[1]
            + self.current[2] * self.strides[2];
        self.advance();
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.len))
    }
}

/// Axis-wise restriction of a grid volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubVolume {
    bounds: [(usize, usize); 3],
    strides: [usize; 3],
}

impl SubVolume {
    /// Half-open per-axis bounds within the parent grid
    pub fn bounds(&self) -> [(usize, usize); 3] {
        self.bounds
    }

    /// Visited node counts per axis
    pub fn extents(&self) -> [usize; 3] {
        [
            self.bounds[0].1 - self.bounds[0].0,
            self.bounds[1].1 - self.bounds[1].0,
            self.bounds[2].1 - self.bounds[2].0,
        ]
    }

    /// Total restricted node count
    pub fn len(&self) -> usize {
        self.extents().iter().product()
    }

    /// True when the restriction covers no node
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterator over padded parent-space indices
    pub fn iterator(&self) -> VolumeIterator {
        let axes = self.bounds.map(|(start, end)| AxisRange {
            start,
            end,
            step: 1,
        });
        VolumeIterator::new(axes, self.strides)
    }

    /// Standalone zero-based iterator addressing a compact buffer sized
    /// exactly to the restricted volume
    pub fn compact_iterator(&self) -> VolumeIterator {
        let e = self.extents();
        VolumeIterator::new(
            [
                AxisRange::full(e[0]),
                AxisRange::full(e[1]),
                AxisRange::full(e[2]),
            ],
            [1, e[0], e[0] * e[1]],
        )
    }
}

impl Grid {
    /// Iterator over every node of the padded domain, in index order
    pub fn volume_iterator(&self) -> VolumeIterator {
        let d = self.dims();
        VolumeIterator::new(
            [
                AxisRange::full(d[0]),
                AxisRange::full(d[1]),
                AxisRange::full(d[2]),
            ],
            self.strides(),
        )
    }

    /// Restrict the volume to half-open per-axis bounds
    pub fn sub_volume(&self, bounds: [(usize, usize); 3]) -> Result<SubVolume> {
        let dims = self.dims();
        for axis in 0..3 {
            let (start, end) = bounds[axis];
            if start >= end || end > dims[axis] {
                return Err(SolverError::SubVolumeOutOfBounds {
                    axis,
                    bound: bounds[axis],
                    extent: dims[axis],
                });
            }
        }
        Ok(SubVolume {
            bounds,
            strides: self.strides(),
        })
    }

    /// Single-node restriction
    pub fn point_volume(&self, coord: [usize; 3]) -> Result<SubVolume> {
        self.sub_volume([
            (coord[0], coord[0] + 1),
            (coord[1], coord[1] + 1),
            (coord[2], coord[2] + 1),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grid::SimdLevel;

    #[test]
    fn test_odometer_order() {
        let grid = Grid::new([2, 2, 2], SimdLevel::Scalar).unwrap();
        let indices: Vec<usize> = grid.volume_iterator().collect();
        let s = grid.strides();
        assert_eq!(
            indices,
            vec![
                0,
                1,
                s[1],
                s[1] + 1,
                s[2],
                s[2] + 1,
                s[2] + s[1],
                s[2] + s[1] + 1
            ]
        );
    }

    #[test]
    fn test_reset_restores_start() {
        let grid = Grid::new([3, 2, 2], SimdLevel::Scalar).unwrap();
        let mut it = grid.volume_iterator();
        let first: Vec<usize> = it.by_ref().take(5).collect();
        it.reset();
        let replay: Vec<usize> = it.by_ref().take(5).collect();
        assert_eq!(first, replay);
        assert_eq!(it.len(), 12);
    }

    #[test]
    fn test_sub_volume_validation() {
        let grid = Grid::new([4, 4, 4], SimdLevel::Scalar).unwrap();
        assert!(grid.sub_volume([(0, 5), (0, 4), (0, 4)]).is_err());
        assert!(grid.sub_volume([(2, 2), (0, 4), (0, 4)]).is_err());
        let sub = grid.sub_volume([(1, 3), (2, 4), (0, 1)]).unwrap();
        assert_eq!(sub.len(), 4);
        assert_eq!(sub.extents(), [2, 2, 1]);
    }

    #[test]
    fn test_compact_iterator_addresses_dense_buffer() {
        let grid = Grid::new([8, 4, 4], SimdLevel::Wide8).unwrap();
        let sub = grid.sub_volume([(2, 5), (1, 3), (2, 4)]).unwrap();
        let compact: Vec<usize> = sub.compact_iterator().collect();
        assert_eq!(compact.len(), sub.len());
        assert_eq!(compact[0], 0);
        assert_eq!(*compact.last().unwrap(), sub.len() - 1);
        // Dense and duplicate-free
        let mut sorted = compact.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..sub.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_parent_and_compact_walk_in_step() {
        let grid = Grid::new([6, 5, 4], SimdLevel::Wide8).unwrap();
        let sub = grid.sub_volume([(1, 4), (0, 2), (3, 4)]).unwrap();
        let parent: Vec<usize> = sub.iterator().collect();
        let compact: Vec<usize> = sub.compact_iterator().collect();
        assert_eq!(parent.len(), compact.len());
        // Same odometer order on both sides
        assert_eq!(parent[0], grid.index([1, 0, 3]));
        assert_eq!(parent[1], grid.index([2, 0, 3]));
        assert_eq!(parent[3], grid.index([1, 1, 3]));
    }
}
