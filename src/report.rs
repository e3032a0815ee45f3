//! Human-readable run summary
//!
//! Settings echo, measured durations and per-object descriptions, handed to
//! downstream collaborators after a run.

use crate::config::SolverSettings;
use std::fmt;
use std::time::Duration;

/// Summary of one finished (or assembled) run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub settings: SolverSettings,
    pub kernel: String,
    pub node_count: usize,
    pub time_step: f64,
    pub simulated_timesteps: u64,
    pub setup_duration: Duration,
    pub simulation_duration: Duration,
    pub ports: Vec<String>,
    pub signals: Vec<String>,
    pub monitors: Vec<String>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== simulation summary ===")?;
        writeln!(f, "kernel:            {}", self.kernel)?;
        writeln!(f, "nodes:             {}", self.node_count)?;
        writeln!(f, "time step:         {:.6e} s", self.time_step)?;
        writeln!(
            f,
            "timesteps:         {} / {}",
            self.simulated_timesteps, self.settings.total_timesteps
        )?;
        writeln!(
            f,
            "threads:           {}",
            if self.settings.threads == 0 {
                "auto".to_string()
            } else {
                self.settings.threads.to_string()
            }
        )?;
        writeln!(f, "alignment request: {} bytes", self.settings.alignment)?;
        writeln!(f, "cfl factor:        {}", self.settings.cfl)?;
        writeln!(f, "setup:             {:.3?}", self.setup_duration)?;
        writeln!(f, "simulation:        {:.3?}", self.simulation_duration)?;
        if !self.ports.is_empty() {
            writeln!(f, "ports:")?;
            for p in &self.ports {
                writeln!(f, "  - {p}")?;
            }
        }
        if !self.signals.is_empty() {
            writeln!(f, "signals:")?;
            for s in &self.signals {
                writeln!(f, "  - {s}")?;
            }
        }
        if !self.monitors.is_empty() {
            writeln!(f, "monitors:")?;
            for m in &self.monitors {
                writeln!(f, "  - {m}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_formats_every_section() {
        let summary = RunSummary {
            settings: SolverSettings::default(),
            kernel: "scalar".into(),
            node_count: 64,
            time_step: 1.2e-12,
            simulated_timesteps: 100,
            setup_duration: Duration::from_millis(3),
            simulation_duration: Duration::from_millis(40),
            ports: vec!["p1 -> Ex at [2, 2, 2]".into()],
            signals: vec!["s1: band [1.000e9, 2.000e9] Hz".into()],
            monitors: vec!["m1: time x-component of E".into()],
        };
        let text = summary.to_string();
        assert!(text.contains("kernel:            scalar"));
        assert!(text.contains("p1 -> Ex"));
        assert!(text.contains("monitors:"));
    }
}
