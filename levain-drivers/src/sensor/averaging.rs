//! Temperature averaging
//!
//! Raw RTD readings on a bread machine are noisy (motor and heater
//! switching share the supply). The averager keeps a rolling window of
//! samples and reports a trimmed mean: the window is sorted and the
//! `reject` lowest and highest samples are dropped before averaging.

use levain_core::traits::{SensorError, TemperatureSensor};

/// Smallest number of samples left after trimming
///
/// With fewer, the whole window is averaged instead.
pub const MIN_KEPT_SAMPLES: usize = 3;

/// Rolling trimmed-mean filter over a temperature sensor
///
/// Reports [`SensorError::NotReady`] until the window has filled once.
/// Failed reads of the inner sensor are passed through and don't enter
/// the window.
pub struct TemperatureAverager<S, const N: usize> {
    sensor: S,
    samples: [f32; N],
    next: usize,
    filled: bool,
    reject: usize,
}

impl<S, const N: usize> TemperatureAverager<S, N> {
    /// Wrap `sensor`, dropping `reject` samples from each end of the window
    pub fn new(sensor: S, reject: usize) -> Self {
        Self {
            sensor,
            samples: [0.0; N],
            next: 0,
            filled: false,
            reject,
        }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Check if the window has filled at least once
    pub fn is_ready(&self) -> bool {
        self.filled
    }

    /// Add a sample, returning the new average once the window is full
    pub fn push(&mut self, sample: f32) -> Option<f32> {
        if N == 0 {
            return Some(sample);
        }
        self.samples[self.next] = sample;
        self.next = (self.next + 1) % N;
        if self.next == 0 && !self.filled {
            self.filled = true;
            debug!("temperature window filled ({} samples)", N);
        }
        self.average()
    }

    /// Trimmed mean of the current window
    pub fn average(&self) -> Option<f32> {
        if !self.filled {
            return None;
        }

        let mut sorted = self.samples;
        sorted.sort_unstable_by(f32::total_cmp);

        let kept = if N >= MIN_KEPT_SAMPLES.saturating_add(self.reject.saturating_mul(2)) {
            &sorted[self.reject..N - self.reject]
        } else {
            &sorted[..]
        };
        let sum: f32 = kept.iter().sum();
        Some(sum / kept.len() as f32)
    }

    /// Forget every sample
    pub fn reset(&mut self) {
        self.next = 0;
        self.filled = false;
    }
}

impl<S: TemperatureSensor, const N: usize> TemperatureSensor for TemperatureAverager<S, N> {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let sample = self.sensor.read_celsius()?;
        self.push(sample).ok_or(SensorError::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec::Vec;

    /// Sensor replaying a fixed sequence
    struct Replay {
        readings: Vec<Result<f32, SensorError>>,
        at: usize,
    }

    impl Replay {
        fn new(readings: &[Result<f32, SensorError>]) -> Self {
            Self {
                readings: readings.to_vec(),
                at: 0,
            }
        }
    }

    impl TemperatureSensor for Replay {
        fn read_celsius(&mut self) -> Result<f32, SensorError> {
            let reading = self.readings[self.at % self.readings.len()];
            self.at += 1;
            reading
        }
    }

    #[test]
    fn test_not_ready_until_window_full() {
        let mut avg = TemperatureAverager::<_, 5>::new(Replay::new(&[Ok(20.0)]), 1);
        for _ in 0..4 {
            assert_eq!(avg.read_celsius(), Err(SensorError::NotReady));
        }
        assert_eq!(avg.read_celsius(), Ok(20.0));
        assert!(avg.is_ready());
    }

    #[test]
    fn test_outliers_rejected() {
        let mut avg = TemperatureAverager::<(), 5>::new((), 1);
        for sample in [20.0, 21.0, 22.0, 23.0] {
            assert_eq!(avg.push(sample), None);
        }
        // 100 and 20 are trimmed, leaving 21, 22, 23
        assert_eq!(avg.push(100.0), Some(22.0));
    }

    #[test]
    fn test_small_window_not_trimmed() {
        let mut avg = TemperatureAverager::<(), 4>::new((), 1);
        for sample in [20.0, 22.0, 24.0] {
            avg.push(sample);
        }
        assert_eq!(avg.push(26.0), Some(23.0));
    }

    #[test]
    fn test_huge_reject_count_not_trimmed() {
        let mut avg = TemperatureAverager::<(), 3>::new((), usize::MAX);
        for sample in [20.0, 22.0] {
            avg.push(sample);
        }
        assert_eq!(avg.push(24.0), Some(22.0));
    }

    #[test]
    fn test_window_rolls_over() {
        let mut avg = TemperatureAverager::<(), 3>::new((), 0);
        for sample in [10.0, 10.0, 10.0] {
            avg.push(sample);
        }
        // Oldest 10 replaced by 40
        assert_eq!(avg.push(40.0), Some(20.0));
    }

    #[test]
    fn test_errors_pass_through() {
        let readings = [Ok(20.0), Err(SensorError::OpenCircuit), Ok(22.0)];
        let mut avg = TemperatureAverager::<_, 2>::new(Replay::new(&readings), 0);

        assert_eq!(avg.read_celsius(), Err(SensorError::NotReady));
        assert_eq!(avg.read_celsius(), Err(SensorError::OpenCircuit));
        assert_eq!(avg.read_celsius(), Ok(21.0));
    }

    #[test]
    fn test_reset() {
        let mut avg = TemperatureAverager::<(), 2>::new((), 0);
        avg.push(20.0);
        avg.push(20.0);
        assert!(avg.is_ready());

        avg.reset();
        assert!(!avg.is_ready());
        assert_eq!(avg.average(), None);
    }

    proptest! {
        #[test]
        fn average_within_sample_range(
            samples in proptest::collection::vec(-40.0f32..250.0, 8),
            reject in 0usize..4,
        ) {
            let mut avg = TemperatureAverager::<(), 8>::new((), reject);
            let mut last = None;
            for &s in &samples {
                last = avg.push(s);
            }
            let mean = last.unwrap();
            let min = samples.iter().copied().fold(f32::INFINITY, f32::min);
            let max = samples.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            prop_assert!(mean >= min - 1e-3 && mean <= max + 1e-3);
        }
    }
}
