use crate::memory::{AggressorPtr, DRAMAddr, MemConfiguration};
use log::{debug, info, warn};
use std::arch::asm;
use std::arch::x86_64::{__rdtscp, _mm_mfence};

/// Number of initial refresh-interval samples discarded before
/// `count_acts_per_trefi` starts accumulating statistics, to let the
/// measurement settle.
const SKIP_FIRST_SAMPLES: usize = 50;
/// Number of samples between standard-deviation convergence checks.
const CONVERGENCE_CHECK_INTERVAL: usize = 200;
/// Standard deviation (in activations) below which the estimate is accepted.
const CONVERGENCE_STD_THRESHOLD: f64 = 3.0;
/// Hard cap on samples per threshold attempt before the threshold is raised
/// and measurement restarts.
const MAX_ROUNDS_PER_THRESHOLD: usize = 2000;
/// Amount the conflict threshold is raised by when a measurement attempt
/// fails to converge or yields an implausibly small count.
const THRESHOLD_STEP: u64 = 10;
/// Number of threshold increases to try before giving up.
const MAX_THRESHOLD_STEPS: u64 = 20;
/// A converged activation count at or below this value is treated as noise,
/// not a real measurement.
const MIN_PLAUSIBLE_ACTIVATIONS: u64 = 5;

unsafe fn clflushopt(addr: *const u8) {
    unsafe {
        asm!("clflushopt [{}]", in(reg) addr);
    }
}

/// Errors that can occur while analyzing DRAM timing characteristics.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// The acts-per-tREFI measurement failed to converge even after raising
    /// the conflict threshold repeatedly.
    #[error("acts-per-tREFI measurement did not converge after {0} threshold increases")]
    DidNotConverge(u64),
    /// The configured address-mapping functions do not produce the expected
    /// row-conflict timing signature; the supplied `MemConfiguration` is
    /// almost certainly wrong for the device under test.
    #[error("bank {bank} row {row}: access time {measured} did not exceed threshold {threshold}, config is likely wrong")]
    ConfigInconsistent { bank: usize, row: usize, measured: u64, threshold: u64 },
}

/// Measures DRAM conflict timing and the number of row activations that fit
/// within one refresh interval (tREFI).
pub struct DramAnalyzer {
    mem_config: MemConfiguration,
    base: AggressorPtr,
}

impl DramAnalyzer {
    /// Creates an analyzer operating over the memory region starting at `base`.
    pub fn new(base: AggressorPtr, mem_config: MemConfiguration) -> Self {
        DramAnalyzer { mem_config, base }
    }

    /// Measures the mean access latency, in CPU cycles, for `rounds` repeated
    /// accesses to `a1` then `a2`, flushing both from the cache after every
    /// round.
    pub fn measure_time(a1: AggressorPtr, a2: AggressorPtr, rounds: usize) -> u64 {
        let mut sum: u64 = 0;
        for _ in 0..rounds {
            unsafe {
                _mm_mfence();
                let mut aux = 0u32;
                let before = __rdtscp(&mut aux);
                std::ptr::read_volatile(a1);
                std::ptr::read_volatile(a2);
                let after = __rdtscp(&mut aux);
                _mm_mfence();
                sum += after - before;
                clflushopt(a1);
                clflushopt(a2);
            }
        }
        sum / rounds as u64
    }

    fn sample_addresses(&self) -> (AggressorPtr, AggressorPtr, AggressorPtr) {
        let bank = 0;
        let row = 0;
        let col = 0;
        let base = DRAMAddr::new(bank, row, col).to_virt(self.base, self.mem_config);
        let diff = DRAMAddr::new(bank, row, col)
            .add(&self.mem_config, 0, 1, 0)
            .to_virt(self.base, self.mem_config);
        let same = DRAMAddr::new(bank, row, col)
            .add(&self.mem_config, 0, 0, 1)
            .to_virt(self.base, self.mem_config);
        (base, diff, same)
    }

    /// Measures the bank-conflict timing threshold by comparing access
    /// latency to a same-bank, different-row address against a same-bank,
    /// same-row address.
    pub fn measure_threshold(&self, rounds: usize) -> u64 {
        let (base, diff, same) = self.sample_addresses();
        let mean_diff = Self::measure_time(base, diff, rounds);
        let mean_same = Self::measure_time(base, same, rounds);
        let threshold = mean_same + (mean_diff.saturating_sub(mean_same)) / 2;
        info!(
            "measured conflict threshold {} (mean_diff={}, mean_same={})",
            threshold, mean_diff, mean_same
        );
        threshold
    }

    /// Determines how many row activations occur within one refresh
    /// interval by watching for the latency spikes that the DRAM controller
    /// incurs while a refresh is in progress.
    ///
    /// Retries with a higher conflict threshold if the measurement doesn't
    /// converge to a stable value within [`MAX_ROUNDS_PER_THRESHOLD`] samples.
    pub fn count_acts_per_trefi(&self, initial_threshold: u64) -> Result<u64, AnalyzerError> {
        let (a, b, _) = self.sample_addresses();
        let mut threshold_step = 0;
        let mut threshold = initial_threshold;

        loop {
            match self.count_acts_per_trefi_at(a, b, threshold) {
                Some(activations) if activations > MIN_PLAUSIBLE_ACTIVATIONS => {
                    info!("determined num_acts_per_tREFI: {}", activations);
                    return Ok(activations);
                }
                _ => {
                    threshold_step += 1;
                    if threshold_step > MAX_THRESHOLD_STEPS {
                        return Err(AnalyzerError::DidNotConverge(threshold_step));
                    }
                    threshold += THRESHOLD_STEP;
                    warn!(
                        "acts-per-tREFI measurement did not converge, raising threshold to {}",
                        threshold
                    );
                }
            }
        }
    }

    /// Asserts that every `(bank, 0) <-> (bank, row)` pair, for banks
    /// `0..min(4, total_banks)` and rows `1..row_count`, has an access time
    /// above `threshold`. A pair that conflicts in less time than expected
    /// means the configured address-mapping functions don't match the
    /// device under test.
    pub fn check(&self, threshold: u64) -> Result<(), AnalyzerError> {
        let total_banks = self.mem_config.get_bank_count();
        let row_count = self.mem_config.get_row_count();
        let banks_to_check = total_banks.min(4);

        for bank in 0..banks_to_check {
            let zero_row = DRAMAddr::new(bank, 0, 0).to_virt(self.base, self.mem_config);
            for row in 1..row_count {
                let other = DRAMAddr::new(bank, row, 0).to_virt(self.base, self.mem_config);
                let measured = Self::measure_time(zero_row, other, 100);
                if measured <= threshold {
                    return Err(AnalyzerError::ConfigInconsistent { bank, row, measured, threshold });
                }
            }
        }
        Ok(())
    }

    fn count_acts_per_trefi_at(&self, a: AggressorPtr, b: AggressorPtr, threshold: u64) -> Option<u64> {
        let mut acts: Vec<u64> = Vec::new();
        let mut running_sum: u64 = 0;
        let mut activation_count: u64 = 0;
        let mut activation_count_old: u64 = 0;

        unsafe {
            std::ptr::read_volatile(a);
            std::ptr::read_volatile(b);
        }

        for i in 0..(SKIP_FIRST_SAMPLES + MAX_ROUNDS_PER_THRESHOLD * CONVERGENCE_CHECK_INTERVAL) {
            unsafe {
                clflushopt(a);
                clflushopt(b);
                _mm_mfence();

                let mut aux = 0u32;
                let before = __rdtscp(&mut aux);
                std::arch::x86_64::_mm_lfence();
                std::ptr::read_volatile(a);
                std::ptr::read_volatile(b);
                let after = __rdtscp(&mut aux);

                activation_count += 2;

                if after - before > threshold {
                    if i > SKIP_FIRST_SAMPLES && activation_count_old != 0 {
                        let value = (activation_count - activation_count_old) * 2;
                        acts.push(value);
                        running_sum += value;
                        if acts.len() % CONVERGENCE_CHECK_INTERVAL == 0 {
                            let std = compute_std(&acts, running_sum);
                            debug!("acts-per-tREFI sample std={:.3} n={}", std, acts.len());
                            if std < CONVERGENCE_STD_THRESHOLD {
                                return Some(running_sum / acts.len() as u64);
                            }
                        }
                    }
                    activation_count_old = activation_count;
                }
            }
        }
        None
    }
}

fn compute_std(values: &[u64], running_sum: u64) -> f64 {
    let mean = running_sum as f64 / values.len() as f64;
    let var: f64 = values
        .iter()
        .filter(|&&v| v as f64 >= mean)
        .map(|&v| (v as f64 - mean).powi(2))
        .sum();
    (var / values.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::compute_std;

    #[test]
    fn std_of_constant_samples_is_zero() {
        let samples = vec![100u64; 250];
        assert_eq!(compute_std(&samples, 100 * 250), 0.0);
    }

    #[test]
    fn std_ignores_below_mean_samples() {
        // every value is below the (inflated) mean except the huge outlier,
        // so only the outlier should contribute to the variance sum.
        let mut samples = vec![10u64; 199];
        samples.push(10_000);
        let sum: u64 = samples.iter().sum();
        let std = compute_std(&samples, sum);
        assert!(std > 0.0);
    }
}
