//! Excitation ports
//!
//! A port injects a time-varying excitation value into one field component
//! at one grid coordinate, either superimposed onto the present value or
//! overwriting it.

use crate::engine::dof::{Axis, DegreesOfFreedom, FieldKind};
use crate::engine::grid::Grid;
use crate::error::{Result, SolverError};
use crate::Real;

/// Envelope amplitude reached at ±time_shift of a band-limited pulse
pub const FADED_AMPLITUDE: f64 = 1e-3;

/// Excitation waveforms
#[derive(Debug, Clone, PartialEq)]
pub enum Excitation {
    /// Plain Gaussian pulse `exp(-(t-t0)²/σ)`
    Gaussian { t0: f64, sigma: f64 },
    /// Modulated Gaussian confined to a frequency band; carrier and envelope
    /// are derived once at construction
    SinusGaussian {
        carrier: f64,
        sigma: f64,
        time_shift: f64,
    },
}

impl Excitation {
    /// Gaussian pulse centered at `t0` with width parameter `sigma`
    pub fn gaussian(t0: f64, sigma: f64) -> Result<Self> {
        if sigma <= 0.0 {
            return Err(SolverError::invalid(format!(
                "gaussian width must be positive, got {sigma}"
            )));
        }
        Ok(Excitation::Gaussian { t0, sigma })
    }

    /// Band-limited modulated Gaussian for `[min_frequency, max_frequency]`.
    ///
    /// The carrier sits at the band center; the envelope width is chosen so
    /// the spectrum and the time envelope both fall to the faded amplitude
    /// at the band edges and at t = 0 / t = 2·time_shift respectively.
    pub fn sinus_gaussian(min_frequency: f64, max_frequency: f64) -> Result<Self> {
        if min_frequency < 0.0 || max_frequency <= min_frequency {
            return Err(SolverError::invalid(format!(
                "invalid frequency band [{min_frequency}, {max_frequency}]"
            )));
        }
        let carrier = 0.5 * (min_frequency + max_frequency);
        let half_band = 0.5 * (max_frequency - min_frequency);
        let decay = (1.0 / FADED_AMPLITUDE).ln();
        let sigma = (2.0 * decay).sqrt() / (2.0 * std::f64::consts::PI * half_band);
        let time_shift = sigma * (2.0 * decay).sqrt();
        Ok(Excitation::SinusGaussian {
            carrier,
            sigma,
            time_shift,
        })
    }

    /// Excitation value at simulated time `t`
    pub fn evaluate(&self, t: f64) -> f64 {
        match *self {
            Excitation::Gaussian { t0, sigma } => (-(t - t0).powi(2) / sigma).exp(),
            Excitation::SinusGaussian {
                carrier,
                sigma,
                time_shift,
            } => {
                let tau = t - time_shift;
                let envelope = (-tau * tau / (2.0 * sigma * sigma)).exp();
                (2.0 * std::f64::consts::PI * carrier * tau).sin() * envelope
            }
        }
    }

    /// Short description for run summaries
    pub fn describe(&self) -> String {
        match *self {
            Excitation::Gaussian { t0, sigma } => {
                format!("gaussian(t0={t0:.3e}, sigma={sigma:.3e})")
            }
            Excitation::SinusGaussian {
                carrier,
                time_shift,
                ..
            } => format!("sinus-gaussian(f0={carrier:.3e}, shift={time_shift:.3e})"),
        }
    }
}

/// How a port writes into the DoF store
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ApplyMode {
    /// Superimpose onto the existing field value
    Additive,
    /// Overwrite the field value
    Hard,
}

/// One excitation source bound to a coordinate, field and axis
#[derive(Debug, Clone)]
pub struct Port {
    name: String,
    coordinate: [usize; 3],
    field: FieldKind,
    axis: Axis,
    excitation: Excitation,
    mode: ApplyMode,
    last_value: Real,
    last_timestep: u64,
}

impl Port {
    /// Create a port, validating the coordinate against the grid
    pub fn new(
        name: impl Into<String>,
        coordinate: [usize; 3],
        field: FieldKind,
        axis: Axis,
        excitation: Excitation,
        mode: ApplyMode,
        grid: &Grid,
    ) -> Result<Self> {
        let name = name.into();
        let dims = grid.dims();
        if coordinate.iter().zip(dims.iter()).any(|(&c, &d)| c >= d) {
            return Err(SolverError::PortOutsideGrid {
                name,
                coordinate,
                dims,
            });
        }
        Ok(Self {
            name,
            coordinate,
            field,
            axis,
            excitation,
            mode,
            last_value: 0.0,
            last_timestep: 0,
        })
    }

    /// Evaluate the waveform and write it into the targeted component
    pub fn apply_source(
        &mut self,
        dof: &mut DegreesOfFreedom,
        grid: &Grid,
        timestep: u64,
        sim_time: f64,
    ) {
        let value = self.excitation.evaluate(sim_time) as Real;
        self.last_value = value;
        self.last_timestep = timestep;
        let index = grid.index(self.coordinate);
        let target = dof.component_mut(self.field, self.axis);
        match self.mode {
            ApplyMode::Additive => target[index] += value,
            ApplyMode::Hard => target[index] = value,
        }
    }

    /// Port name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target coordinate
    pub fn coordinate(&self) -> [usize; 3] {
        self.coordinate
    }

    /// Targeted field
    pub fn field(&self) -> FieldKind {
        self.field
    }

    /// Targeted axis
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Most recently injected value
    pub fn last_value(&self) -> Real {
        self.last_value
    }

    /// Timestep of the most recent injection
    pub fn last_timestep(&self) -> u64 {
        self.last_timestep
    }

    /// Description for run summaries
    pub fn describe(&self) -> String {
        format!(
            "{} -> {}{} at {:?}, {}",
            self.name,
            self.field,
            self.axis,
            self.coordinate,
            self.excitation.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grid::SimdLevel;
    use approx::assert_relative_eq;

    #[test]
    fn test_gaussian_peak_at_center() {
        let pulse = Excitation::gaussian(1.0, 0.1).unwrap();
        assert_relative_eq!(pulse.evaluate(1.0), 1.0);
        assert!(pulse.evaluate(0.0) < 1e-4);
    }

    #[test]
    fn test_sinus_gaussian_envelope_fades_at_shift() {
        let pulse = Excitation::sinus_gaussian(1e9, 3e9).unwrap();
        let Excitation::SinusGaussian {
            sigma, time_shift, ..
        } = pulse
        else {
            panic!("expected band pulse");
        };
        // Envelope alone at t = 0 (i.e. -time_shift from the center)
        let envelope = (-time_shift * time_shift / (2.0 * sigma * sigma)).exp();
        assert_relative_eq!(envelope, FADED_AMPLITUDE, max_relative = 1e-9);
    }

    #[test]
    fn test_invalid_band_rejected() {
        assert!(Excitation::sinus_gaussian(2e9, 1e9).is_err());
        assert!(Excitation::gaussian(0.0, 0.0).is_err());
    }

    #[test]
    fn test_additive_and_hard_application() {
        let grid = Grid::new([4, 4, 4], SimdLevel::Scalar).unwrap();
        let mut dof = DegreesOfFreedom::new(&grid);
        let index = grid.index([2, 2, 2]);
        dof.component_mut(FieldKind::Electric, Axis::X)[index] = 0.5;

        let pulse = Excitation::gaussian(0.0, 1.0).unwrap();
        let mut additive = Port::new(
            "add",
            [2, 2, 2],
            FieldKind::Electric,
            Axis::X,
            pulse.clone(),
            ApplyMode::Additive,
            &grid,
        )
        .unwrap();
        additive.apply_source(&mut dof, &grid, 1, 0.0);
        assert_relative_eq!(dof.e(Axis::X)[index], 1.5);
        assert_eq!(additive.last_timestep(), 1);
        assert_relative_eq!(additive.last_value(), 1.0);

        let mut hard = Port::new(
            "hard",
            [2, 2, 2],
            FieldKind::Electric,
            Axis::X,
            pulse,
            ApplyMode::Hard,
            &grid,
        )
        .unwrap();
        hard.apply_source(&mut dof, &grid, 2, 0.0);
        assert_relative_eq!(dof.e(Axis::X)[index], 1.0);
    }

    #[test]
    fn test_port_coordinate_validated() {
        let grid = Grid::new([4, 4, 4], SimdLevel::Scalar).unwrap();
        let pulse = Excitation::gaussian(0.0, 1.0).unwrap();
        let err = Port::new(
            "bad",
            [4, 0, 0],
            FieldKind::Electric,
            Axis::X,
            pulse,
            ApplyMode::Additive,
            &grid,
        );
        assert!(matches!(err, Err(SolverError::PortOutsideGrid { .. })));
    }
}
