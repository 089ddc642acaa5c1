//! Fourier-domain resampling.
//!
//! The signal is treated as one period of a band-limited periodic function:
//! its spectrum is zero-padded (upsampling) or truncated (downsampling) and
//! transformed back at the new length.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::waveform::Trace;

/// Number of output samples when converting `len` samples between rates.
pub fn resampled_len(len: usize, from_rate: f64, to_rate: f64) -> usize {
    (len as f64 * to_rate / from_rate).round() as usize
}

/// Resample `samples` from `from_rate` Hz to `to_rate` Hz.
pub fn resample_fft(samples: &[f64], from_rate: f64, to_rate: f64) -> Vec<f64> {
    let n = samples.len();
    let m = resampled_len(n, from_rate, to_rate);

    if n == 0 || m == 0 {
        return Vec::new();
    }
    if m == n {
        return samples.to_vec();
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(m);

    let mut spectrum: Vec<Complex<f64>> = samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut spectrum);

    let mut output = vec![Complex::new(0.0, 0.0); m];
    let shared = n.min(m);

    // Positive frequencies (with DC) and their negative mirrors, excluding
    // the Nyquist bin of the shorter length.
    let positive = shared.div_ceil(2);
    output[..positive].copy_from_slice(&spectrum[..positive]);
    for k in 1..positive {
        output[m - k] = spectrum[n - k];
    }

    if shared % 2 == 0 {
        let nyquist = shared / 2;
        if m > n {
            // The input's Nyquist bin stands for both signs; split it.
            let half = spectrum[nyquist] * 0.5;
            output[nyquist] = half;
            output[m - nyquist] = half;
        } else {
            // Both signs fold onto the output's Nyquist bin.
            output[nyquist] = spectrum[nyquist] + spectrum[n - nyquist];
        }
    }

    ifft.process(&mut output);

    let scale = 1.0 / n as f64;
    output.iter().map(|c| c.re * scale).collect()
}

/// Resample a trace to `to_rate` Hz, keeping its start time.
pub fn resample_trace(trace: &Trace, to_rate: f64) -> Trace {
    if (trace.sample_rate - to_rate).abs() < f64::EPSILON * to_rate {
        return trace.clone();
    }
    Trace {
        location: trace.location.clone(),
        sample_rate: to_rate,
        start: trace.start,
        samples: resample_fft(&trace.samples, trace.sample_rate, to_rate),
    }
}
