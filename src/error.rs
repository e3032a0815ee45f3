//! Error types for solver setup and configuration
//!
//! All configuration problems are reported as values before any simulation
//! work begins; runtime defects inside the loop are logged/asserted instead.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SolverError>;

/// Errors raised while assembling a solver
#[derive(Error, Debug)]
pub enum SolverError {
    /// Mismatched node counts between discretization, materials and grid
    #[error("size mismatch: {context} reports {found} nodes, grid expects {expected}")]
    SizeMismatch {
        context: &'static str,
        found: usize,
        expected: usize,
    },

    /// Flat per-axis arrays must hold one third per axis
    #[error("{context}: array length {len} is not divisible by 3")]
    UnevenAxisData { context: &'static str, len: usize },

    /// The grid must have more than one node along every axis
    #[error("grid is not three-dimensional: dimensions are {0:?}")]
    NotThreeDimensional([usize; 3]),

    /// Every node carries a zero material or spacing value
    #[error("no non-boundary node found: the whole grid is PEC/PMC")]
    AllBoundaryNodes,

    /// The requested SIMD alignment maps to no supported lane width
    #[error("unsupported alignment request: {0} bytes")]
    UnsupportedAlignment(usize),

    /// Sub-volume bounds leaving the parent volume
    #[error("sub-volume bound {bound:?} exceeds parent extent {extent:?} on axis {axis}")]
    SubVolumeOutOfBounds {
        axis: usize,
        bound: (usize, usize),
        extent: usize,
    },

    /// Port coordinate outside the grid
    #[error("port '{name}' coordinate {coordinate:?} is outside the grid {dims:?}")]
    PortOutsideGrid {
        name: String,
        coordinate: [usize; 3],
        dims: [usize; 3],
    },

    /// A run needs at least one port
    #[error("no ports configured")]
    NoPorts,

    /// A run needs at least one excitation signal
    #[error("no excitation signals configured")]
    NoSignals,

    /// Frequency-domain capture supports a single port only
    #[error("frequency-domain capture requested with {0} ports; exactly one is supported")]
    MultiplePortsForFrequencyCapture(usize),

    /// Catch-all for inconsistent settings
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl SolverError {
    /// Convenience constructor for ad-hoc configuration problems
    pub fn invalid(message: impl Into<String>) -> Self {
        SolverError::InvalidConfiguration(message.into())
    }
}
