//! Parameter validation errors.
//!
//! Kernels never fail on the audio path: they accept whatever they are given
//! and document the domain. Hosts that want a checked boundary call
//! [`Validate::validate`] on the control side before handing records over.

use thiserror::Error;

/// A rejected parameter record.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParamError {
    #[error("sample rate must be finite and positive, got {0}")]
    SampleRate(f64),

    #[error("{name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{name} must be finite and positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} is not a finite number")]
    NotFinite { name: &'static str },

    #[error("{name} = {value} Hz must stay below {limit} Hz at this sample rate")]
    AboveLimit {
        name: &'static str,
        value: f64,
        limit: f64,
    },

    #[error("{frequency} Hz at pulse width {pulse_width} leaves an edge shorter than one sample (needs < {limit} Hz)")]
    EdgeTooShort {
        frequency: f64,
        pulse_width: f64,
        limit: f64,
    },
}

pub type Result<T, E = ParamError> = core::result::Result<T, E>;

/// Control-side checks for a parameter record.
pub trait Validate {
    /// Check the record against the kernel's documented domain at `sample_rate`.
    fn validate(&self, sample_rate: f64) -> Result<()>;
}

// ---- Field checks shared by the parameter records ----

#[inline]
pub(crate) fn check_sample_rate(sr: f64) -> Result<()> {
    if sr.is_finite() && sr > 0.0 {
        Ok(())
    } else {
        Err(ParamError::SampleRate(sr))
    }
}

#[inline]
pub(crate) fn check_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParamError::NotFinite { name })
    }
}

#[inline]
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParamError::NotPositive { name, value })
    }
}

#[inline]
pub(crate) fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    check_finite(name, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ParamError::OutOfRange { name, value, min, max })
    }
}

/// Positive frequency strictly below `limit`.
#[inline]
pub(crate) fn check_below(name: &'static str, value: f64, limit: f64) -> Result<()> {
    check_positive(name, value)?;
    if value < limit {
        Ok(())
    } else {
        Err(ParamError::AboveLimit { name, value, limit })
    }
}
