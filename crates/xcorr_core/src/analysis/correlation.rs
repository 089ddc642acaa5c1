//! Normalized cross-correlation over a bounded lag range.
//!
//! Uses the convolution theorem, `cc = IFFT(FFT(a) * conj(FFT(b)))`, with
//! enough zero padding that lags inside `[-max_lag, +max_lag]` never wrap.
//!
//! Lag convention: `cc[k] = sum_i a[i] * b[i - k]`. A positive lag means
//! channel A lags channel B by `k` samples.

use rustfft::{num_complex::Complex, FftPlanner};

use super::filtering::demean;
use super::types::{AlignedPair, CorrelationError, LagEstimate};

/// Default half-width of the lag search (samples).
pub const DEFAULT_MAX_LAG_SAMPLES: usize = 500;

/// Correlation values for every lag in `[-max_lag, +max_lag]`.
#[derive(Debug, Clone)]
pub struct LagCurve {
    max_lag: i64,
    values: Vec<f64>,
}

impl LagCurve {
    /// Largest lag magnitude covered.
    pub fn max_lag(&self) -> i64 {
        self.max_lag
    }

    /// Normalized correlation at `lag`, or `None` outside the range.
    pub fn at(&self, lag: i64) -> Option<f64> {
        if lag.abs() > self.max_lag {
            return None;
        }
        self.values.get((lag + self.max_lag) as usize).copied()
    }

    /// Lag with the largest |cc|.
    ///
    /// Ties go to the smallest |lag|, and `+k` beats `-k`.
    pub fn peak(&self) -> (i64, f64) {
        let mut best_lag = 0;
        let mut best = self.at(0).unwrap_or(0.0);

        for magnitude in 1..=self.max_lag {
            for lag in [magnitude, -magnitude] {
                let value = self.at(lag).unwrap_or(0.0);
                if value.abs() > best.abs() {
                    best_lag = lag;
                    best = value;
                }
            }
        }

        (best_lag, best)
    }
}

/// Compute the normalized correlation curve of two equal-length signals.
///
/// Both signals are demeaned and the curve is divided by
/// `sqrt(energy_a * energy_b)`. `max_lag` is clipped to `len - 1`.
pub fn correlation_curve(
    a: &[f64],
    b: &[f64],
    max_lag: usize,
) -> Result<LagCurve, CorrelationError> {
    let n = a.len().min(b.len());
    if n == 0 {
        return Err(CorrelationError::EmptyInput);
    }

    let a = demean(&a[..n]);
    let b = demean(&b[..n]);

    let energy_a: f64 = a.iter().map(|x| x * x).sum();
    let energy_b: f64 = b.iter().map(|x| x * x).sum();
    let norm = (energy_a * energy_b).sqrt();
    if !norm.is_finite() {
        return Err(CorrelationError::NonFinite);
    }
    if norm <= f64::MIN_POSITIVE {
        return Err(CorrelationError::ZeroEnergy);
    }

    let max_lag = max_lag.min(n - 1);
    let fft_len = (n + max_lag).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut spec_a: Vec<Complex<f64>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
    spec_a.resize(fft_len, Complex::new(0.0, 0.0));
    let mut spec_b: Vec<Complex<f64>> = b.iter().map(|&x| Complex::new(x, 0.0)).collect();
    spec_b.resize(fft_len, Complex::new(0.0, 0.0));

    fft.process(&mut spec_a);
    fft.process(&mut spec_b);

    let mut product: Vec<Complex<f64>> = spec_a
        .iter()
        .zip(&spec_b)
        .map(|(x, y)| x * y.conj())
        .collect();
    ifft.process(&mut product);

    // rustfft leaves the inverse unscaled.
    let scale = 1.0 / (fft_len as f64 * norm);
    let lag_bound = max_lag as i64;
    let values = (-lag_bound..=lag_bound)
        .map(|lag| {
            let index = if lag < 0 {
                fft_len - lag.unsigned_abs() as usize
            } else {
                lag as usize
            };
            product[index].re * scale
        })
        .collect();

    Ok(LagCurve {
        max_lag: lag_bound,
        values,
    })
}

/// Estimate the lag between the two halves of an aligned pair.
pub fn estimate_lag(
    pair: &AlignedPair,
    max_lag_samples: usize,
) -> Result<LagEstimate, CorrelationError> {
    let curve = correlation_curve(pair.a(), pair.b(), max_lag_samples)?;
    let (lag_samples, value) = curve.peak();
    if !value.is_finite() {
        return Err(CorrelationError::NonFinite);
    }

    Ok(LagEstimate {
        lag_samples,
        correlation: value.clamp(-1.0, 1.0),
        sample_rate: pair.sample_rate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_instant;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    fn pair(a: Vec<f64>, b: Vec<f64>) -> AlignedPair {
        AlignedPair::new(a, b, 1000.0, parse_instant("2020-001").unwrap()).unwrap()
    }

    #[test]
    fn identical_signals_peak_at_zero() {
        let signal = noise(2000, 7);
        let est = estimate_lag(&pair(signal.clone(), signal), DEFAULT_MAX_LAG_SAMPLES).unwrap();
        assert_eq!(est.lag_samples, 0);
        assert!(est.correlation > 0.999);
    }

    #[test]
    fn delayed_channel_gives_positive_lag() {
        let k = 37;
        let n = 4000;
        let base = noise(n + k, 11);
        let a = base[..n].to_vec();
        let b = base[k..n + k].to_vec();

        let est = estimate_lag(&pair(a, b), DEFAULT_MAX_LAG_SAMPLES).unwrap();
        assert_eq!(est.lag_samples, 37);
        assert!(est.correlation > 0.98, "correlation {}", est.correlation);
        assert_eq!(est.lag_ms(), 37.0);
    }

    #[test]
    fn leading_channel_gives_negative_lag() {
        let k = 120;
        let n = 4000;
        let base = noise(n + k, 3);
        let a = base[k..n + k].to_vec();
        let b = base[..n].to_vec();

        let est = estimate_lag(&pair(a, b), DEFAULT_MAX_LAG_SAMPLES).unwrap();
        assert_eq!(est.lag_samples, -120);
        assert!(est.correlation > 0.95);
    }

    #[test]
    fn inverted_signal_reports_negative_correlation() {
        let a = noise(1000, 5);
        let b: Vec<f64> = a.iter().map(|x| -x).collect();
        let est = estimate_lag(&pair(a, b), 50).unwrap();
        assert_eq!(est.lag_samples, 0);
        assert!(est.correlation < -0.999);
        assert!(est.correlation >= -1.0);
    }

    #[test]
    fn search_is_restricted_to_max_lag() {
        let k = 300;
        let n = 3000;
        let base = noise(n + k, 13);
        let a = base[..n].to_vec();
        let b = base[k..n + k].to_vec();

        let est = estimate_lag(&pair(a, b), 100).unwrap();
        assert!(est.lag_samples.abs() <= 100);
        assert!(est.correlation.abs() < 0.5);
    }

    #[test]
    fn max_lag_is_clipped_to_length() {
        let curve = correlation_curve(&[1.0, -1.0, 2.0], &[2.0, 0.0, -1.0], 500).unwrap();
        assert_eq!(curve.max_lag(), 2);
        assert!(curve.at(3).is_none());
    }

    #[test]
    fn ties_prefer_small_positive_lags() {
        let curve = LagCurve {
            max_lag: 5,
            // lags -5..=5
            values: vec![0.8, 0.1, -0.8, 0.1, 0.1, 0.2, 0.1, 0.1, 0.8, 0.1, 0.1],
        };
        assert_eq!(curve.peak(), (3, 0.8));

        let symmetric = LagCurve {
            max_lag: 2,
            values: vec![0.1, -0.6, 0.0, 0.6, 0.1],
        };
        assert_eq!(symmetric.peak(), (1, 0.6));
    }

    #[test]
    fn zero_energy_is_an_error() {
        assert_eq!(
            correlation_curve(&[3.0; 10], &[1.0; 10], 5).unwrap_err(),
            CorrelationError::ZeroEnergy
        );
    }

    #[test]
    fn non_finite_samples_are_an_error() {
        let mut a = noise(256, 3);
        a[100] = f64::NAN;
        let b = noise(256, 4);
        assert_eq!(
            estimate_lag(&pair(a, b.clone()), 20).unwrap_err(),
            CorrelationError::NonFinite
        );

        let mut c = noise(256, 5);
        c[7] = f64::INFINITY;
        assert_eq!(
            correlation_curve(&c, &b, 20).unwrap_err(),
            CorrelationError::NonFinite
        );
    }
}
