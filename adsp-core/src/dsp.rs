//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for the loop saturator and prewarp
//! - Clean, side-effect free helpers that are easy to test
//!
//! Conventions:
//! - Kernels compute in `f64`; the conversion helpers are generic over
//!   [`num_traits::Float`] so they work for `f32` control data as well.
//! - Argument and return domains are documented per function.

#![allow(clippy::excessive_precision)]

use cfg_if::cfg_if;
use num_traits::{Float, Zero};

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // libm (C math) in no_std
    if #[cfg(feature = "no-std")] {
        #[inline] pub(crate) fn m_tan(x: f64) -> f64 { libm::tan(x) }
        #[inline] pub(crate) fn m_tanh(x: f64) -> f64 { libm::tanh(x) }
        #[inline] pub(crate) fn m_exp(x: f64) -> f64 { libm::exp(x) }
        #[inline] pub(crate) fn m_abs(x: f64) -> f64 { libm::fabs(x) }
        #[cfg(feature = "fast-math")]
        #[inline] fn m_sin(x: f64) -> f64 { libm::sin(x) }
        #[cfg(feature = "fast-math")]
        #[inline] fn m_cos(x: f64) -> f64 { libm::cos(x) }
    // std backend
    } else {
        #[inline] pub(crate) fn m_tan(x: f64) -> f64 { x.tan() }
        #[inline] pub(crate) fn m_tanh(x: f64) -> f64 { x.tanh() }
        #[inline] pub(crate) fn m_exp(x: f64) -> f64 { x.exp() }
        #[inline] pub(crate) fn m_abs(x: f64) -> f64 { x.abs() }
        #[cfg(feature = "fast-math")]
        #[inline] fn m_sin(x: f64) -> f64 { x.sin() }
        #[cfg(feature = "fast-math")]
        #[inline] fn m_cos(x: f64) -> f64 { x.cos() }
    }
}

// --------------------------------- Constants -------------------------------------

/// π
pub const PI: f64 = core::f64::consts::PI;

/// 2π
pub const TWO_PI: f64 = core::f64::consts::TAU;

/// 1/π
pub const FRAC_ONE_PI: f64 = core::f64::consts::FRAC_1_PI;

/// √2
pub const SQRT_TWO: f64 = core::f64::consts::SQRT_2;

/// 1/√2
pub const FRAC_ONE_SQRT_TWO: f64 = core::f64::consts::FRAC_1_SQRT_2;

/// Smallest positive normal `f32`. Anything closer to zero is flushed.
pub const MIN_FLOAT_VAL_POS: f64 = 1.175_494_351e-38;

/// Negative counterpart of [`MIN_FLOAT_VAL_POS`].
pub const MIN_FLOAT_VAL_NEG: f64 = -1.175_494_351e-38;

/// Minimum filter cutoff frequency: 20 Hz (lower end of human hearing).
pub const MIN_FILTER_FREQ: f64 = 20.0;

/// Maximum filter cutoff frequency: 20480 Hz (10 octaves above 20 Hz).
pub const MAX_FILTER_FREQ: f64 = 20_480.0;

#[inline]
fn lit<T: Float>(x: f64) -> T {
    T::from(x).unwrap_or_else(T::nan)
}

// --------------------------------- Denormals -------------------------------------

/// Snap values inside the `f32` subnormal band to exact zero.
///
/// Every state-register write in this crate goes through here. The band is
/// the `f32` one on purpose: host buffers are usually `f32`, and a value that
/// is harmless in `f64` turns subnormal once the host casts it down.
#[inline]
pub fn flush_denormal(x: f64) -> f64 {
    if (x > 0.0 && x < MIN_FLOAT_VAL_POS) || (x < 0.0 && x > MIN_FLOAT_VAL_NEG) {
        0.0
    } else {
        x
    }
}

// --------------------------------- Utilities -------------------------------------

/// Standard signum: 1 for positive, 0 for zero (either sign), -1 for negative.
#[inline]
pub fn sgn<T: Zero + PartialOrd>(val: T) -> i32 {
    let zero = T::zero();
    i32::from(zero < val) - i32::from(val < zero)
}

/// Clip `x` to `[min, max]`.
#[inline]
pub fn clip<T: Float>(x: T, min: T, max: T) -> T {
    x.min(max).max(min)
}

/// Clip `x` to the default bipolar interval `[-1, 1]`.
#[inline]
pub fn clip_unit<T: Float>(x: T) -> T {
    clip(x, -T::one(), T::one())
}

/// Clip in place to `[min, max]`.
#[inline]
pub fn clip_in_place<T: Float>(x: &mut T, min: T, max: T) {
    *x = clip(*x, min, max);
}

/// Map a bipolar value in [-1, 1] to [0, 1].
#[inline]
pub fn bipolar_to_unipolar<T: Float>(x: T) -> T {
    let half = lit::<T>(0.5);
    half * x + half
}

/// Map a unipolar value in [0, 1] to [-1, 1].
#[inline]
pub fn unipolar_to_bipolar<T: Float>(x: T) -> T {
    (x - lit::<T>(0.5)) * lit::<T>(2.0)
}

/// Linear mapping of `[in_min, in_max]` onto `[out_min, out_max]`.
#[inline]
pub fn lin_map<T: Float>(val: T, in_min: T, in_max: T, out_min: T, out_max: T) -> T {
    (val - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Linear mapping of a normalised value onto `[out_min, out_max]`.
///
/// `out_min > out_max` is allowed and gives a falling segment.
#[inline]
pub fn lin_map_norm<T: Float>(val: T, out_min: T, out_max: T) -> T {
    val * (out_max - out_min) + out_min
}

/// Skewed map of a value in [0, 1] onto the same interval: `val^(1/skew)`.
///
/// - `skew = 1` is linear
/// - `skew < 1` gives more resolution in the lower range
/// - `skew > 1` gives more resolution in the upper range
#[inline]
pub fn skew_normalized<T: Float>(norm_val: T, skew: T) -> T {
    norm_val.powf(T::one() / skew)
}

// --------------------------------- dB / linear -----------------------------------

/// Raw amplitude gain to decibels: `20·log10(gain)`.
#[inline]
pub fn raw_gain_to_db<T: Float>(gain: T) -> T {
    lit::<T>(20.0) * gain.log10()
}

/// Decibels to raw amplitude gain: `10^(db/20)`.
#[inline]
pub fn db_to_raw_gain<T: Float>(db: T) -> T {
    lit::<T>(10.0).powf(db / lit::<T>(20.0))
}

/// Like [`db_to_raw_gain`] but returns exactly 0 below `off_db`.
#[inline]
pub fn db_to_raw_gain_off<T: Float>(db: T, off_db: T) -> T {
    if db >= off_db {
        db_to_raw_gain(db)
    } else {
        T::zero()
    }
}

// ----------------------------- MIDI pitch / frequency ----------------------------

/// MIDI note number (fractional allowed) to frequency. Pitch 69 is A4 = 440 Hz.
#[inline]
pub fn pitch_to_freq<T: Float>(pitch: T) -> T {
    lit::<T>(440.0) * lit::<T>(2.0).powf((pitch - lit::<T>(69.0)) / lit::<T>(12.0))
}

/// Frequency to (fractional) MIDI note number.
#[inline]
pub fn freq_to_pitch<T: Float>(freq: T) -> T {
    lit::<T>(69.0) + lit::<T>(12.0) * (freq / lit::<T>(440.0)).log2()
}

// --------------------------------- Prewarping ------------------------------------

/// Normalised angular cutoff `γ = 2π·fc / sr` used by the bilinear filter bank.
///
/// The bank's coefficient formulas invert sign once `γ ≥ 2`, i.e. for
/// `fc ≥ sr/π`. Nothing here guards against that.
#[inline]
pub fn bilinear_gamma(cut_hz: f64, sr: f64) -> f64 {
    TWO_PI * cut_hz / sr
}

/// TPT prewarped integrator gain `g = tan(π·fc / sr)`.
///
/// Equal to `wa / (2·sr)` with `wa = 2·sr·tan(wd / (2·sr))`, `wd = 2π·fc`.
#[inline]
pub fn tpt_g(cut_hz: f64, sr: f64) -> f64 {
    let x = PI * (cut_hz / sr);
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            m_sin(x) / m_cos(x)
        } else {
            m_tan(x)
        }
    }
}

// --------------------------------- Nonlinearities --------------------------------

/// Bounded saturator used inside feedback loops.
///
/// With `fast-math` this is the clamped Padé approximation
/// `x·(27 + x²)/(27 + 9·x²)` on `x ∈ [-3, 3]`, which hits ±1 exactly at the
/// clamp points. Otherwise it is `tanh`.
#[inline]
pub fn saturate(x: f64) -> f64 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let x = clip(x, -3.0, 3.0);
            let x2 = x * x;
            x * (27.0 + x2) / (27.0 + 9.0 * x2)
        } else {
            m_tanh(x)
        }
    }
}

/// Fast, coarse `log2` for positive normal `f32` input (max error ≈ 5e-3).
#[inline]
pub fn fast_log2(val: f32) -> f32 {
    let mut bits = val.to_bits();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    let mut log_2 = (((bits >> 23) & 255) as i32 - 128) as f32;
    bits &= !(255 << 23);
    bits += 127 << 23;
    let m = f32::from_bits(bits);
    log_2 += ((-0.344_848_43 * m) + 2.024_665_78) * m - 0.674_877_59;
    log_2
}

// --------------------------------- Smoothing -------------------------------------

/// One-pole exponential smoother for parameter changes.
///
/// `y[n] = a0·x[n] + b1·y[n-1]`, `b1 = exp(-2π / (time·sr))`, `a0 = 1 - b1`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Smooth1P {
    a0: f64,
    b1: f64,
    z1: f64,
}

impl Smooth1P {
    /// Create a smoother with time constant `time_s` at sample rate `sr`.
    #[inline]
    pub fn new(time_s: f64, sr: f64) -> Self {
        let mut s = Self::default();
        s.reset(time_s, sr);
        s
    }

    /// Clear state and set a new time constant / sample rate.
    #[inline]
    pub fn reset(&mut self, time_s: f64, sr: f64) {
        self.b1 = m_exp(-TWO_PI / (time_s * sr));
        self.a0 = 1.0 - self.b1;
        self.z1 = 0.0;
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        self.z1 = flush_denormal(x * self.a0 + self.z1 * self.b1);
        self.z1
    }

    #[inline] pub fn value(&self) -> f64 { self.z1 }
}

// --------------------------------- Tests (std only) ------------------------------
