//! Settings exchanged with the host configuration service
//!
//! Plain serde-serializable descriptions of a run: global settings, ports,
//! excitation signals and monitors. Parsing them out of a host application
//! is the collaborator's job; this module only defines the data and its
//! defaults.

use crate::domain::coefficients::DEFAULT_CFL;
use crate::domain::ports::ApplyMode;
use crate::engine::dof::{Axis, FieldKind};
use crate::pipeline::PipelineDomain;
use serde::{Deserialize, Serialize};

/// Global run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Total timestep count of the run
    pub total_timesteps: u64,
    /// Requested SIMD alignment preference in bytes
    pub alignment: usize,
    /// Thread team size; 0 uses every available core
    pub threads: usize,
    /// Courant safety factor
    pub cfl: f64,
    /// Verbose diagnostics
    pub debug: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            total_timesteps: 1000,
            alignment: 64,
            threads: 0,
            cfl: DEFAULT_CFL,
            debug: false,
        }
    }
}

/// Frequency band of one excitation signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSpec {
    pub name: String,
    pub min_frequency: f64,
    pub max_frequency: f64,
}

impl SignalSpec {
    /// Description for run summaries
    pub fn describe(&self) -> String {
        format!(
            "{}: band [{:.3e}, {:.3e}] Hz",
            self.name, self.min_frequency, self.max_frequency
        )
    }
}

fn default_mode() -> ApplyMode {
    ApplyMode::Additive
}

/// One excitation port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    pub field: FieldKind,
    pub axis: Axis,
    /// Name of the excitation signal driving the port
    pub signal: String,
    /// Explicit coordinate; defaults to the grid center
    #[serde(default)]
    pub coordinate: Option<[usize; 3]>,
    #[serde(default = "default_mode")]
    pub mode: ApplyMode,
}

/// Field sampling location of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorGeometry {
    /// Node-centered values (edge samples averaged onto nodes)
    Node,
    /// Raw edge samples
    Edge,
}

/// Observed quantity of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorQuantity {
    /// All three components
    Vector,
    /// A single component
    Component(Axis),
}

/// Observed region of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorVolume {
    /// The whole grid
    Full,
    /// A single node
    Point([usize; 3]),
}

/// One observable extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSpec {
    pub name: String,
    pub field: FieldKind,
    pub domain: PipelineDomain,
    pub geometry: MonitorGeometry,
    pub quantity: MonitorQuantity,
    pub volume: MonitorVolume,
    /// Sampling interval in timesteps
    pub sample_interval: u64,
    /// Observed frequency in Hz; required for frequency-domain capture
    #[serde(default)]
    pub frequency: Option<f64>,
    /// Explicit qualifying timesteps; overrides the sampling interval
    #[serde(default)]
    pub timesteps: Option<Vec<u64>>,
}

impl MonitorSpec {
    /// Description for run summaries
    pub fn describe(&self) -> String {
        let quantity = match self.quantity {
            MonitorQuantity::Vector => "vector".to_string(),
            MonitorQuantity::Component(axis) => format!("{}-component", axis),
        };
        let domain = match self.domain {
            PipelineDomain::Time => "time".to_string(),
            PipelineDomain::Frequency => format!(
                "frequency ({:.3e} Hz)",
                self.frequency.unwrap_or_default()
            ),
        };
        format!(
            "{}: {} {} of {}, every {} steps, {:?}",
            self.name, domain, quantity, self.field, self.sample_interval, self.volume
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = SolverSettings::default();
        assert_eq!(settings.alignment, 64);
        assert_eq!(settings.cfl, DEFAULT_CFL);
        assert_eq!(settings.threads, 0);
    }

    #[test]
    fn test_monitor_description_mentions_domain() {
        let spec = MonitorSpec {
            name: "probe".into(),
            field: FieldKind::Electric,
            domain: PipelineDomain::Frequency,
            geometry: MonitorGeometry::Edge,
            quantity: MonitorQuantity::Component(Axis::X),
            volume: MonitorVolume::Point([1, 2, 3]),
            sample_interval: 4,
            frequency: Some(2.4e9),
            timesteps: None,
        };
        let text = spec.describe();
        assert!(text.contains("frequency"));
        assert!(text.contains("x-component"));
    }
}
