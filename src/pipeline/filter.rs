//! In-place container filters
//!
//! Filters consume and mutate a container between the source and the sink,
//! each gated by its own cadence (`timestep % frequency == 0` or the final
//! step).

use crate::engine::dof::Axis;
use crate::pipeline::container::ResultContainer;
use crate::pipeline::progress::ProgressReporter;
use crate::Real;
use tracing::warn;

/// Per-filter execution cadence
#[derive(Debug, Clone, Copy)]
pub struct FilterCadence {
    pub frequency: u64,
    pub final_step: u64,
}

impl FilterCadence {
    /// Run on every timestep
    pub fn always(final_step: u64) -> Self {
        Self {
            frequency: 1,
            final_step,
        }
    }

    /// True when the filter runs at this timestep
    pub fn due(&self, timestep: u64) -> bool {
        timestep % self.frequency.max(1) == 0 || timestep == self.final_step
    }
}

/// Mutates a container in place on qualifying timesteps
pub trait ResultFilter: Send {
    fn apply(&mut self, container: &mut ResultContainer, timestep: u64);
}

/// Single-frequency narrowband extraction.
///
/// Keeps a running (cos, sin) coefficient pair, recomputed only when the
/// timestep strictly increases, from `2π·f·t / total_steps` with `f` in
/// cycles per run. The real channel is scaled by cos and the imaginary half
/// is derived from the already-scaled real channel times sin.
#[derive(Debug, Clone)]
pub struct DftFilter {
    cycles_per_run: f64,
    total_steps: u64,
    cadence: FilterCadence,
    last_timestep: Option<u64>,
    cos_coeff: Real,
    sin_coeff: Real,
}

impl DftFilter {
    /// Extract `cycles_per_run` oscillations over a run of `total_steps`
    pub fn new(cycles_per_run: f64, total_steps: u64, cadence: FilterCadence) -> Self {
        Self {
            cycles_per_run,
            total_steps,
            cadence,
            last_timestep: None,
            cos_coeff: 1.0,
            sin_coeff: 0.0,
        }
    }

    /// Convenience constructor from a physical frequency and time step
    pub fn from_frequency(
        frequency_hz: f64,
        time_step: f64,
        total_steps: u64,
        cadence: FilterCadence,
    ) -> Self {
        let cycles = frequency_hz * time_step * total_steps as f64;
        Self::new(cycles, total_steps, cadence)
    }

    fn refresh(&mut self, timestep: u64) {
        if self.last_timestep.is_some_and(|last| timestep <= last) {
            return;
        }
        let angle = 2.0 * std::f64::consts::PI * self.cycles_per_run * timestep as f64
            / self.total_steps as f64;
        self.cos_coeff = angle.cos() as Real;
        self.sin_coeff = angle.sin() as Real;
        self.last_timestep = Some(timestep);
    }

    fn scale_channel(&self, real: &mut [Real], imag: &mut [Real]) {
        for (re, im) in real.iter_mut().zip(imag.iter_mut()) {
            *re *= self.cos_coeff;
            *im = *re * self.sin_coeff;
        }
    }
}

impl ResultFilter for DftFilter {
    fn apply(&mut self, container: &mut ResultContainer, timestep: u64) {
        if !self.cadence.due(timestep) {
            return;
        }
        self.refresh(timestep);
        match container {
            ResultContainer::ScalarComplex(c) => {
                self.scale_channel(&mut c.real, &mut c.imag);
            }
            ResultContainer::Vector3DComplex(c) => {
                for (re, im) in c.real.iter_mut().zip(c.imag.iter_mut()) {
                    for (r, i) in re.iter_mut().zip(im.iter_mut()) {
                        *r *= self.cos_coeff;
                        *i = *r * self.sin_coeff;
                    }
                }
            }
            ResultContainer::Scalar(_) => {
                warn!(timestep, "narrowband filter needs an imaginary channel; skipped");
            }
        }
    }
}

fn edge_to_node_channel(values: &mut [Real], extents: [usize; 3], axis: Axis) {
    let stride = match axis {
        Axis::X => 1,
        Axis::Y => extents[0],
        Axis::Z => extents[0] * extents[1],
    };
    // Reverse order so every predecessor read sees the original edge value
    for i in (0..values.len()).rev() {
        let coord = match axis {
            Axis::X => i % extents[0],
            Axis::Y => (i / extents[0]) % extents[1],
            Axis::Z => i / (extents[0] * extents[1]),
        };
        if coord > 0 {
            values[i] = 0.5 * (values[i] + values[i - stride]);
        }
    }
}

/// Converts edge-sampled values to node-centered ones by averaging each
/// sample with its axis predecessor; boundary nodes pass through unchanged.
#[derive(Debug, Clone)]
pub struct EdgeToNodeFilter {
    /// Averaging axis for scalar containers; vector containers always use
    /// each component's own axis
    axis: Option<Axis>,
    cadence: FilterCadence,
}

impl EdgeToNodeFilter {
    /// Average a scalar container along `axis`
    pub fn scalar(axis: Axis, cadence: FilterCadence) -> Self {
        Self {
            axis: Some(axis),
            cadence,
        }
    }

    /// Average each vector component along its own axis
    pub fn vector(cadence: FilterCadence) -> Self {
        Self {
            axis: None,
            cadence,
        }
    }
}

impl ResultFilter for EdgeToNodeFilter {
    fn apply(&mut self, container: &mut ResultContainer, timestep: u64) {
        if !self.cadence.due(timestep) {
            return;
        }
        let extents = container.extents();
        match container {
            ResultContainer::Scalar(c) => {
                let axis = self.axis.unwrap_or(Axis::X);
                edge_to_node_channel(&mut c.values, extents, axis);
            }
            ResultContainer::ScalarComplex(c) => {
                let axis = self.axis.unwrap_or(Axis::X);
                edge_to_node_channel(&mut c.real, extents, axis);
                edge_to_node_channel(&mut c.imag, extents, axis);
            }
            ResultContainer::Vector3DComplex(c) => {
                for axis in Axis::ALL {
                    let a = self.axis.unwrap_or(axis);
                    edge_to_node_channel(&mut c.real[axis.index()], extents, a);
                    edge_to_node_channel(&mut c.imag[axis.index()], extents, a);
                }
            }
        }
    }
}

/// Data no-op that drives the UI progress percentage
pub struct ProgressFilter {
    reporter: Box<dyn ProgressReporter>,
    total_steps: u64,
    cadence: FilterCadence,
}

impl ProgressFilter {
    /// Announce `label` and report percentages over `total_steps`
    pub fn new(
        mut reporter: Box<dyn ProgressReporter>,
        label: &str,
        total_steps: u64,
        cadence: FilterCadence,
    ) -> Self {
        reporter.set_progress_information(label);
        Self {
            reporter,
            total_steps,
            cadence,
        }
    }
}

impl ResultFilter for ProgressFilter {
    fn apply(&mut self, _container: &mut ResultContainer, timestep: u64) {
        if !self.cadence.due(timestep) {
            return;
        }
        let percent = 100.0 * timestep as f64 / self.total_steps.max(1) as f64;
        self.reporter.set_progress(percent);
        if timestep >= self.total_steps {
            self.reporter.close_progress_information();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::container::{ScalarComplexContainer, ScalarContainer};
    use approx::assert_relative_eq;

    fn complex_container(real: Vec<Real>, extents: [usize; 3]) -> ResultContainer {
        let n = real.len();
        ResultContainer::ScalarComplex(ScalarComplexContainer {
            timestep: 1,
            extents,
            real,
            imag: vec![0.0; n],
        })
    }

    #[test]
    fn test_dft_scales_real_then_derives_imag() {
        let mut filter = DftFilter::new(1.0, 8, FilterCadence::always(8));
        let mut container = complex_container(vec![2.0], [1, 1, 1]);
        filter.apply(&mut container, 2);
        let ResultContainer::ScalarComplex(c) = &container else {
            panic!("expected complex");
        };
        // angle = 2π·1·2/8 = π/2
        let cos = (std::f64::consts::FRAC_PI_2).cos() as Real;
        let sin = (std::f64::consts::FRAC_PI_2).sin() as Real;
        assert_relative_eq!(c.real[0], 2.0 * cos);
        assert_relative_eq!(c.imag[0], 2.0 * cos * sin);
    }

    #[test]
    fn test_dft_coefficient_cached_for_same_timestep() {
        let mut filter = DftFilter::new(1.0, 8, FilterCadence::always(8));
        let mut first = complex_container(vec![1.0], [1, 1, 1]);
        filter.apply(&mut first, 2);
        let cos_after_first = filter.cos_coeff;
        // A replayed (non-increasing) timestep must not refresh the pair
        let mut replay = complex_container(vec![1.0], [1, 1, 1]);
        filter.apply(&mut replay, 1);
        assert_eq!(filter.cos_coeff, cos_after_first);
    }

    #[test]
    fn test_dft_skips_real_only_container() {
        let mut filter = DftFilter::new(1.0, 8, FilterCadence::always(8));
        let mut container = ResultContainer::Scalar(ScalarContainer {
            timestep: 1,
            extents: [1, 1, 1],
            values: vec![3.0],
        });
        filter.apply(&mut container, 2);
        let ResultContainer::Scalar(c) = &container else {
            panic!()
        };
        assert_eq!(c.values[0], 3.0);
    }

    #[test]
    fn test_edge_to_node_averages_predecessor() {
        let mut container = ResultContainer::Scalar(ScalarContainer {
            timestep: 1,
            extents: [4, 1, 1],
            values: vec![1.0, 3.0, 5.0, 7.0],
        });
        let mut filter = EdgeToNodeFilter::scalar(Axis::X, FilterCadence::always(1));
        filter.apply(&mut container, 1);
        let ResultContainer::Scalar(c) = &container else {
            panic!()
        };
        // Boundary node passes through, the rest average with the original
        // predecessor value
        assert_eq!(c.values, vec![1.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_edge_to_node_y_axis() {
        let mut container = ResultContainer::Scalar(ScalarContainer {
            timestep: 1,
            extents: [2, 2, 1],
            values: vec![1.0, 2.0, 5.0, 8.0],
        });
        let mut filter = EdgeToNodeFilter::scalar(Axis::Y, FilterCadence::always(1));
        filter.apply(&mut container, 1);
        let ResultContainer::Scalar(c) = &container else {
            panic!()
        };
        assert_eq!(c.values, vec![1.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn test_cadence_gates_filter() {
        let mut filter = DftFilter::new(1.0, 100, FilterCadence {
            frequency: 10,
            final_step: 100,
        });
        let mut container = complex_container(vec![1.0], [1, 1, 1]);
        filter.apply(&mut container, 7);
        let ResultContainer::ScalarComplex(c) = &container else {
            panic!()
        };
        assert_eq!(c.real[0], 1.0);
        assert_eq!(c.imag[0], 0.0);
    }
}
