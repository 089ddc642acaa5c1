//! Trace filtering for correlation preprocessing.
//!
//! Band-pass filters are a Butterworth high-pass followed by a Butterworth
//! low-pass of the same order, each realized as a cascade of biquad sections
//! (plus one first-order section for odd orders).

use std::f64::consts::PI;

use biquad::{Biquad, Coefficients, DirectForm2Transposed, Type};
use serde::{Deserialize, Serialize};

/// Filtering method to apply before correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// No filtering.
    None,
    /// Band-pass filter (isolates a frequency range).
    #[default]
    BandPass,
}

/// Configuration for trace filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Type of filter to apply.
    pub filter_type: FilterType,
    /// Low cutoff frequency (Hz).
    pub low_cutoff_hz: f64,
    /// High cutoff frequency (Hz).
    pub high_cutoff_hz: f64,
    /// Butterworth order of each edge; 4 gives 24 dB/octave outside the band.
    pub corners: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::microseism_bandpass()
    }
}

impl FilterConfig {
    /// Band of 4 to 8 second periods.
    pub fn microseism_bandpass() -> Self {
        Self {
            filter_type: FilterType::BandPass,
            low_cutoff_hz: 1.0 / 8.0,
            high_cutoff_hz: 1.0 / 4.0,
            corners: 4,
        }
    }

    /// Configuration that leaves samples untouched.
    pub fn none() -> Self {
        Self {
            filter_type: FilterType::None,
            ..Self::microseism_bandpass()
        }
    }
}

/// Apply the configured filter to samples taken at `sample_rate` Hz.
///
/// The mean is removed first so a DC offset does not ring through the
/// high-pass stage.
pub fn apply_filter(samples: &[f64], sample_rate: f64, config: &FilterConfig) -> Vec<f64> {
    match config.filter_type {
        FilterType::None => samples.to_vec(),
        FilterType::BandPass => apply_butterworth_bandpass(
            &demean(samples),
            sample_rate,
            config.low_cutoff_hz,
            config.high_cutoff_hz,
            config.corners,
        ),
    }
}

/// Subtract the arithmetic mean.
pub fn demean(samples: &[f64]) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    samples.iter().map(|x| x - mean).collect()
}

/// Q of each second-order section of an `order`-pole Butterworth filter.
fn butterworth_q_values(order: usize) -> Vec<f64> {
    (1..=order / 2)
        .map(|k| 1.0 / (2.0 * ((2 * k - 1) as f64 * PI / (2 * order) as f64).sin()))
        .collect()
}

/// First-order bilinear section with the same prewarping as the biquads.
fn first_order_section(filter: Type<f64>, sample_rate: f64, cutoff_hz: f64) -> Coefficients<f64> {
    let k = (PI * cutoff_hz / sample_rate).tan();
    let a1 = (k - 1.0) / (k + 1.0);
    match filter {
        Type::HighPass => Coefficients {
            a1,
            a2: 0.0,
            b0: 1.0 / (k + 1.0),
            b1: -1.0 / (k + 1.0),
            b2: 0.0,
        },
        _ => Coefficients {
            a1,
            a2: 0.0,
            b0: k / (k + 1.0),
            b1: k / (k + 1.0),
            b2: 0.0,
        },
    }
}

/// Coefficients for every section of one Butterworth edge.
fn butterworth_sections(
    filter: Type<f64>,
    sample_rate: f64,
    cutoff_hz: f64,
    order: usize,
) -> Result<Vec<Coefficients<f64>>, biquad::Errors> {
    // biquad's `from_params` divides by 2·fs and then multiplies by π, which
    // places the cutoff at a quarter of the requested frequency. The
    // normalized form takes f0 / (fs / 2) and yields ω = 2π·f0/fs.
    let normalized = 2.0 * cutoff_hz / sample_rate;

    let mut sections = butterworth_q_values(order)
        .into_iter()
        .map(|q| Coefficients::<f64>::from_normalized_params(filter, normalized, q))
        .collect::<Result<Vec<_>, _>>()?;

    if order % 2 == 1 {
        if !(0.0..1.0).contains(&normalized) {
            return Err(biquad::Errors::OutsideNyquist);
        }
        sections.push(first_order_section(filter, sample_rate, cutoff_hz));
    }
    Ok(sections)
}

fn apply_butterworth_stage(
    samples: &[f64],
    stage: &str,
    filter: Type<f64>,
    sample_rate: f64,
    cutoff_hz: f64,
    order: usize,
) -> Vec<f64> {
    if samples.is_empty() || order == 0 {
        return samples.to_vec();
    }

    match butterworth_sections(filter, sample_rate, cutoff_hz, order) {
        Ok(sections) => apply_cascaded_filter(samples, &sections),
        Err(e) => {
            tracing::warn!(
                "Cannot build {} stage at {} Hz for {} Hz sampling ({:?}); stage skipped",
                stage,
                cutoff_hz,
                sample_rate,
                e
            );
            samples.to_vec()
        }
    }
}

/// Apply a Butterworth band-pass filter: `corners` poles on each edge.
fn apply_butterworth_bandpass(
    samples: &[f64],
    sample_rate: f64,
    low_hz: f64,
    high_hz: f64,
    corners: usize,
) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let high_passed = apply_butterworth_stage(
        samples,
        "high-pass",
        Type::HighPass,
        sample_rate,
        low_hz,
        corners,
    );
    apply_butterworth_stage(
        &high_passed,
        "low-pass",
        Type::LowPass,
        sample_rate,
        high_hz,
        corners,
    )
}

/// Run the samples through each section in turn.
fn apply_cascaded_filter(samples: &[f64], sections: &[Coefficients<f64>]) -> Vec<f64> {
    let mut result = samples.to_vec();

    for coeffs in sections {
        let mut filter = DirectForm2Transposed::<f64>::new(*coeffs);
        for sample in &mut result {
            *sample = filter.run(*sample);
        }
    }

    result
}
