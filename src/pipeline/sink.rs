//! Result sinks
//!
//! A sink consumes the filtered container and either appends it to a
//! growing time series or folds it into a running complex accumulator, with
//! an optional normalization pass when the run finishes.

use crate::pipeline::container::ResultContainer;
use crate::Real;
use num_complex::Complex;
use num_traits::Zero;
use tracing::warn;

/// Final product of a sink
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOutput {
    TimeSeries(TimeSeries),
    Snapshot(Snapshot),
}

/// One row per qualifying timestep
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub timesteps: Vec<u64>,
    pub times: Vec<f64>,
    /// Flattened channel values per entry (real channels first)
    pub entries: Vec<Vec<Real>>,
}

/// Steady-state complex field or scalar snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub extents: [usize; 3],
    /// One channel for scalars, three for vector results
    pub channels: Vec<Vec<Complex<Real>>>,
}

/// Consumes containers at the end of a pipeline
pub trait ResultSink: Send {
    /// Pre-reserve for the expected execution count
    fn reserve(&mut self, expected_executions: usize);

    /// Fold one container in
    fn consume(&mut self, container: ResultContainer);

    /// Close the sink and emit its product
    fn finish(self: Box<Self>) -> SinkOutput;
}

fn flatten(container: &ResultContainer) -> Vec<Real> {
    match container {
        ResultContainer::Scalar(c) => c.values.clone(),
        ResultContainer::ScalarComplex(c) => {
            let mut row = c.real.clone();
            row.extend_from_slice(&c.imag);
            row
        }
        ResultContainer::Vector3DComplex(c) => {
            let mut row = Vec::with_capacity(6 * c.real[0].len());
            for ch in &c.real {
                row.extend_from_slice(ch);
            }
            for ch in &c.imag {
                row.extend_from_slice(ch);
            }
            row
        }
    }
}

/// Appends each qualifying snapshot to a time series
#[derive(Debug, Clone)]
pub struct TimeSeriesSink {
    time_step: f64,
    timesteps: Vec<u64>,
    entries: Vec<Vec<Real>>,
}

impl TimeSeriesSink {
    /// Timestamps are derived from the run's time step
    pub fn new(time_step: f64) -> Self {
        Self {
            time_step,
            timesteps: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Entries collected so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been consumed yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResultSink for TimeSeriesSink {
    fn reserve(&mut self, expected_executions: usize) {
        self.timesteps.reserve(expected_executions);
        self.entries.reserve(expected_executions);
    }

    fn consume(&mut self, container: ResultContainer) {
        self.timesteps.push(container.timestep());
        self.entries.push(flatten(&container));
    }

    fn finish(self: Box<Self>) -> SinkOutput {
        let times = self
            .timesteps
            .iter()
            .map(|&t| t as f64 * self.time_step)
            .collect();
        SinkOutput::TimeSeries(TimeSeries {
            timesteps: self.timesteps,
            times,
            entries: self.entries,
        })
    }
}

/// Divides the accumulated result by a reference channel on finish.
///
/// A divisor that is exactly zero zeroes the affected values instead of
/// producing non-finite results; a single-element reference broadcasts over
/// the whole array.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexNormalize {
    pub reference: Vec<Real>,
}

impl ComplexNormalize {
    fn divisor(&self, index: usize) -> Real {
        if self.reference.len() == 1 {
            self.reference[0]
        } else {
            self.reference[index]
        }
    }

    fn apply(&self, channels: &mut [Vec<Complex<Real>>]) {
        for channel in channels.iter_mut() {
            for (i, value) in channel.iter_mut().enumerate() {
                let d = self.divisor(i);
                *value = if d == 0.0 { Complex::zero() } else { *value / d };
            }
        }
    }
}

/// Folds complex snapshots into a running elementwise sum
pub struct AccumulatingSink {
    extents: [usize; 3],
    /// f64 accumulation keeps long runs well conditioned
    acc_real: Vec<Vec<f64>>,
    acc_imag: Vec<Vec<f64>>,
    consumed: usize,
    post: Option<ComplexNormalize>,
}

impl AccumulatingSink {
    /// Accumulator for `channels` complex channels of `element_count` values
    pub fn new(extents: [usize; 3], element_count: usize, channels: usize) -> Self {
        Self {
            extents,
            acc_real: vec![vec![0.0; element_count]; channels],
            acc_imag: vec![vec![0.0; element_count]; channels],
            consumed: 0,
            post: None,
        }
    }

    /// Attach a normalization pass executed on finish
    pub fn with_normalization(mut self, post: ComplexNormalize) -> Self {
        self.post = Some(post);
        self
    }

    /// Containers folded in so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn fold(&mut self, channel: usize, real: &[Real], imag: &[Real]) {
        for (acc, &v) in self.acc_real[channel].iter_mut().zip(real) {
            *acc += v as f64;
        }
        for (acc, &v) in self.acc_imag[channel].iter_mut().zip(imag) {
            *acc += v as f64;
        }
    }
}

impl ResultSink for AccumulatingSink {
    fn reserve(&mut self, _expected_executions: usize) {}

    fn consume(&mut self, container: ResultContainer) {
        match &container {
            ResultContainer::ScalarComplex(c) => self.fold(0, &c.real, &c.imag),
            ResultContainer::Vector3DComplex(c) => {
                for axis in 0..3 {
                    self.fold(axis, &c.real[axis], &c.imag[axis]);
                }
            }
            ResultContainer::Scalar(c) => {
                if self.acc_real.len() == 1 {
                    let zeros = vec![0.0; c.values.len()];
                    self.fold(0, &c.values, &zeros);
                } else {
                    warn!("scalar container fed to a vector accumulator; dropped");
                }
            }
        }
        self.consumed += 1;
    }

    fn finish(self: Box<Self>) -> SinkOutput {
        let mut channels: Vec<Vec<Complex<Real>>> = self
            .acc_real
            .iter()
            .zip(self.acc_imag.iter())
            .map(|(re, im)| {
                re.iter()
                    .zip(im.iter())
                    .map(|(&r, &i)| Complex::new(r as Real, i as Real))
                    .collect()
            })
            .collect();
        if let Some(post) = &self.post {
            post.apply(&mut channels);
        }
        SinkOutput::Snapshot(Snapshot {
            extents: self.extents,
            channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::container::{ScalarComplexContainer, ScalarContainer};

    fn scalar(timestep: u64, value: Real) -> ResultContainer {
        ResultContainer::Scalar(ScalarContainer {
            timestep,
            extents: [1, 1, 1],
            values: vec![value],
        })
    }

    #[test]
    fn test_time_series_appends_in_order() {
        let mut sink = TimeSeriesSink::new(2.0);
        sink.reserve(3);
        for (t, v) in [(1, 0.5), (2, 1.5), (3, 2.5)] {
            sink.consume(scalar(t, v));
        }
        let SinkOutput::TimeSeries(series) = Box::new(sink).finish() else {
            panic!("expected series");
        };
        assert_eq!(series.timesteps, vec![1, 2, 3]);
        assert_eq!(series.times, vec![2.0, 4.0, 6.0]);
        assert_eq!(series.entries[2], vec![2.5]);
    }

    #[test]
    fn test_accumulator_sums_elementwise() {
        let mut sink = AccumulatingSink::new([1, 1, 1], 1, 1);
        for t in 1..=3 {
            sink.consume(ResultContainer::ScalarComplex(ScalarComplexContainer {
                timestep: t,
                extents: [1, 1, 1],
                real: vec![1.0],
                imag: vec![2.0],
            }));
        }
        let SinkOutput::Snapshot(snap) = Box::new(sink).finish() else {
            panic!("expected snapshot");
        };
        assert_eq!(snap.channels[0][0], Complex::new(3.0, 6.0));
    }

    #[test]
    fn test_zero_divisor_zeroes_output() {
        let mut sink = AccumulatingSink::new([1, 1, 1], 2, 1)
            .with_normalization(ComplexNormalize {
                reference: vec![0.0],
            });
        sink.consume(ResultContainer::ScalarComplex(ScalarComplexContainer {
            timestep: 1,
            extents: [2, 1, 1],
            real: vec![3.0, 4.0],
            imag: vec![1.0, 2.0],
        }));
        let SinkOutput::Snapshot(snap) = Box::new(sink).finish() else {
            panic!("expected snapshot");
        };
        assert!(snap.channels[0]
            .iter()
            .all(|c| c.re == 0.0 && c.im == 0.0 && c.re.is_finite()));
    }

    #[test]
    fn test_nonzero_divisor_divides() {
        let mut sink = AccumulatingSink::new([1, 1, 1], 1, 1)
            .with_normalization(ComplexNormalize {
                reference: vec![2.0],
            });
        sink.consume(ResultContainer::ScalarComplex(ScalarComplexContainer {
            timestep: 1,
            extents: [1, 1, 1],
            real: vec![3.0],
            imag: vec![1.0],
        }));
        let SinkOutput::Snapshot(snap) = Box::new(sink).finish() else {
            panic!("expected snapshot");
        };
        assert_eq!(snap.channels[0][0], Complex::new(1.5, 0.5));
    }
}
