//! Staggered-grid indexing and SIMD lane padding
//!
//! Maps 3D node coordinates onto a linear index space whose X stride is
//! padded to the active vector width, and derives the per-lane masks the
//! vectorized kernels use at domain edges.

use crate::error::{Result, SolverError};
use once_cell::sync::Lazy;

/// Vector width the update kernels run at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimdLevel {
    /// One lane, no padding
    Scalar,
    /// Eight f32 lanes (AVX2)
    Wide8,
    /// Sixteen f32 lanes (AVX-512F)
    Wide16,
}

// Probed once; constructors take an explicit level so tests can pin one.
static HOST_LEVEL: Lazy<SimdLevel> = Lazy::new(SimdLevel::probe_host);

impl SimdLevel {
    /// Lanes per vector
    pub fn width(self) -> usize {
        match self {
            SimdLevel::Scalar => 1,
            SimdLevel::Wide8 => 8,
            SimdLevel::Wide16 => 16,
        }
    }

    /// Required buffer alignment in bytes
    pub fn alignment(self) -> usize {
        match self {
            SimdLevel::Scalar => std::mem::align_of::<f32>(),
            SimdLevel::Wide8 => 32,
            SimdLevel::Wide16 => 64,
        }
    }

    /// Map a requested alignment preference to a lane width.
    ///
    /// 16-byte requests fall back to the scalar path (no 4-lane kernel
    /// exists); anything that is not a power-of-two float alignment is a
    /// configuration error.
    pub fn from_alignment(bytes: usize) -> Result<Self> {
        match bytes {
            64 => Ok(SimdLevel::Wide16),
            32 => Ok(SimdLevel::Wide8),
            4 | 8 | 16 => Ok(SimdLevel::Scalar),
            other => Err(SolverError::UnsupportedAlignment(other)),
        }
    }

    /// Clamp a preferred level to what the running CPU supports
    pub fn detect(preferred: SimdLevel) -> SimdLevel {
        preferred.min(*HOST_LEVEL)
    }

    /// Widest level the host can execute
    pub fn host() -> SimdLevel {
        *HOST_LEVEL
    }

    #[cfg(target_arch = "x86_64")]
    fn probe_host() -> SimdLevel {
        if is_x86_feature_detected!("avx512f") {
            SimdLevel::Wide16
        } else if is_x86_feature_detected!("avx2") {
            SimdLevel::Wide8
        } else {
            SimdLevel::Scalar
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn probe_host() -> SimdLevel {
        SimdLevel::Scalar
    }
}

/// Per-lane boolean masks the kernels apply at row edges.
///
/// `first_vector` covers the very first vector of a row with the hard
/// boundary lane excluded, `begin_vector` covers any begin vector, and
/// `end_vector` covers the final vector with trailing padding lanes
/// excluded. Interior vectors run unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrinsicMasks {
    /// Lane count the masks are sized to
    pub width: usize,
    /// Number of vectors covering one row of the domain
    pub vectors_per_row: usize,
    /// First vector of a row, boundary lane excluded
    pub first_vector: Vec<bool>,
    /// Any begin vector
    pub begin_vector: Vec<bool>,
    /// Final vector of a row, padding lanes excluded
    pub end_vector: Vec<bool>,
}

impl IntrinsicMasks {
    fn build(extent: usize, width: usize) -> Self {
        let vectors_per_row = extent.div_ceil(width);
        let head = extent.min(width);
        let tail = extent - (vectors_per_row - 1) * width;
        let first_vector = (0..width).map(|l| l >= 1 && l < head).collect();
        let begin_vector = (0..width).map(|l| l < head).collect();
        let end_vector = (0..width).map(|l| l < tail).collect();
        Self {
            width,
            vectors_per_row,
            first_vector,
            begin_vector,
            end_vector,
        }
    }

    /// Active lane count of a mask
    pub fn active(mask: &[bool]) -> usize {
        mask.iter().filter(|&&m| m).count()
    }
}

/// Immutable grid geometry: logical DoF counts plus the padded index space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    dims: [usize; 3],
    level: SimdLevel,
    padded_x: usize,
}

impl Grid {
    /// Build a grid for `dims` nodes at the given (already detected) level.
    ///
    /// The padded X stride is the smallest multiple of the lane width that
    /// still leaves at least one trailing padding lane, so +1-lane reads from
    /// the last domain lane always land in zeroed padding.
    pub fn new(dims: [usize; 3], level: SimdLevel) -> Result<Self> {
        if dims.iter().any(|&d| d == 0) {
            return Err(SolverError::invalid(format!(
                "grid dimension must be nonzero, got {dims:?}"
            )));
        }
        let width = level.width();
        let mut padded_x = dims[0].div_ceil(width) * width;
        if padded_x == dims[0] && width > 1 {
            padded_x += width;
        }
        Ok(Self {
            dims,
            level,
            padded_x,
        })
    }

    /// Logical node counts per axis
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Active vector level
    pub fn simd_level(&self) -> SimdLevel {
        self.level
    }

    /// Padded X stride (≥ Nx, multiple of the lane width)
    pub fn padded_stride(&self) -> usize {
        self.padded_x
    }

    /// Unit strides for +1 steps in X, Y, Z within the padded space
    pub fn strides(&self) -> [usize; 3] {
        [1, self.padded_x, self.padded_x * self.dims[1]]
    }

    /// Padded linear index of a node coordinate
    pub fn index(&self, coord: [usize; 3]) -> usize {
        debug_assert!(coord[0] < self.dims[0]);
        debug_assert!(coord[1] < self.dims[1]);
        debug_assert!(coord[2] < self.dims[2]);
        coord[0] + self.padded_x * (coord[1] + self.dims[1] * coord[2])
    }

    /// Unpadded linear index, used to key externally supplied per-node arrays
    pub fn unpadded_index(&self, coord: [usize; 3]) -> usize {
        coord[0] + self.dims[0] * (coord[1] + self.dims[1] * coord[2])
    }

    /// Node coordinate for an unpadded linear index
    pub fn unpadded_coord(&self, index: usize) -> [usize; 3] {
        let x = index % self.dims[0];
        let y = (index / self.dims[0]) % self.dims[1];
        let z = index / (self.dims[0] * self.dims[1]);
        [x, y, z]
    }

    /// Total padded element count of one field component array
    pub fn padded_len(&self) -> usize {
        self.padded_x * self.dims[1] * self.dims[2]
    }

    /// Logical node count (unpadded)
    pub fn node_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Lane masks for the active vector width and this grid's X extent
    pub fn masks(&self) -> IntrinsicMasks {
        IntrinsicMasks::build(self.dims[0], self.level.width())
    }
}
