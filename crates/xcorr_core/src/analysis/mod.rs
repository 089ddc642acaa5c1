//! Stream alignment and lag estimation.
//!
//! # Architecture
//!
//! The analysis pipeline consists of pure functions that the scan loop
//! composes for every window:
//!
//! 1. **Filtering** (`filtering`): demean and band-pass each trace with a
//!    Butterworth cascade.
//!
//! 2. **Merge** (`merge`): join traces per location, zero-filling gaps.
//!
//! 3. **Resample** (`resample`): bring every trace to the common rate in the
//!    Fourier domain.
//!
//! 4. **Align** (`align`): select one trace per location and trim both to
//!    their overlap.
//!
//! 5. **Correlation** (`correlation`): normalized cross-correlation over a
//!    bounded lag range, reduced to a single lag and peak value.
//!
//! # Usage
//!
//! ```ignore
//! use xcorr_core::analysis::{align, estimate_lag, AlignConfig, DEFAULT_MAX_LAG_SAMPLES};
//!
//! let alignment = align(&stream_a, &stream_b, &AlignConfig::default())?;
//! let estimate = estimate_lag(&alignment.pair, DEFAULT_MAX_LAG_SAMPLES)?;
//! println!("lag {} ms, cc {:.3}", estimate.lag_ms(), estimate.correlation);
//! ```

mod align;
mod correlation;
pub mod filtering;
mod merge;
pub mod resample;
mod types;

pub use align::{
    align, align_traces, prepare, AlignConfig, Alignment, TraceSet, DEFAULT_TARGET_RATE,
};
pub use correlation::{correlation_curve, estimate_lag, LagCurve, DEFAULT_MAX_LAG_SAMPLES};
pub use filtering::{apply_filter, FilterConfig, FilterType};
pub use merge::merge_by_location;
pub use types::{AlignError, AlignResult, AlignedPair, CorrelationError, LagEstimate};
