use serde::{Deserialize, Serialize};

/// Running statistics over a series of samples, with block averaging.
///
/// Accumulates count, mean, and variance in a single pass, and additionally
/// collapses consecutive samples into fixed-size blocks whose averages give
/// a coarse estimate of correlation-robust uncertainty. Mayer-sampling
/// series and stepper diagnostics both report through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    count: u64,
    sum: f64,
    sum_of_squares: f64,
    block_size: u64,
    block_sum: f64,
    block_count: u64,
    block_averages: Vec<f64>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::with_block_size(100_000)
    }
}

impl Accumulator {
    /// Creates an accumulator with the default block size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an accumulator collapsing `block_size` samples per block.
    ///
    /// # Arguments
    ///
    /// * `block_size` - Samples per block; must be positive.
    pub fn with_block_size(block_size: u64) -> Self {
        assert!(block_size > 0, "block size must be positive");
        Self {
            count: 0,
            sum: 0.0,
            sum_of_squares: 0.0,
            block_size,
            block_sum: 0.0,
            block_count: 0,
            block_averages: Vec::new(),
        }
    }

    /// Records one sample.
    ///
    /// # Arguments
    ///
    /// * `value` - The sample value.
    pub fn accumulate(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_of_squares += value * value;
        self.block_sum += value;
        self.block_count += 1;
        if self.block_count == self.block_size {
            self.block_averages
                .push(self.block_sum / self.block_size as f64);
            self.block_sum = 0.0;
            self.block_count = 0;
        }
    }

    /// Returns the number of samples recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the running mean, or zero before the first sample.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Returns the sample standard deviation, or zero below two samples.
    pub fn stdev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let variance = (self.sum_of_squares - self.sum * self.sum / n) / (n - 1.0);
        variance.max(0.0).sqrt()
    }

    /// Returns the completed block averages.
    pub fn block_averages(&self) -> &[f64] {
        &self.block_averages
    }

    /// Returns the standard deviation of the block-average mean, or zero
    /// below two completed blocks.
    pub fn block_stdev_of_mean(&self) -> f64 {
        let m = self.block_averages.len();
        if m < 2 {
            return 0.0;
        }
        let mean = self.block_averages.iter().sum::<f64>() / m as f64;
        let variance = self
            .block_averages
            .iter()
            .map(|b| (b - mean) * (b - mean))
            .sum::<f64>()
            / (m as f64 - 1.0);
        (variance / m as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn empty_accumulator_reports_zeros() {
        let acc = Accumulator::new();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.mean(), 0.0);
        assert_eq!(acc.stdev(), 0.0);
    }

    #[test]
    fn mean_and_stdev_match_hand_computation() {
        let mut acc = Accumulator::new();
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.accumulate(value);
        }
        assert_eq!(acc.count(), 8);
        assert!(f64_approx_equal(acc.mean(), 5.0));
        // sample stdev of the classic example set
        assert!((acc.stdev() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn blocks_collapse_at_the_configured_size() {
        let mut acc = Accumulator::with_block_size(2);
        for value in [1.0, 3.0, 5.0, 7.0, 9.0] {
            acc.accumulate(value);
        }
        assert_eq!(acc.block_averages(), &[2.0, 6.0]);
        assert!(acc.block_stdev_of_mean() > 0.0);
    }
}
