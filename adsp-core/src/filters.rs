//! Filters: bilinear-transform models of simple analog networks.
//!
//! Goals
//! - `no_std`-friendly, allocation free
//! - Coefficients derived analytically from one cutoff parameter
//! - Memoized: coefficients are recomputed only when the cutoff or the
//!   sample rate actually changes
//!
//! Contents
//! - `RcLp1`  : first-order RC low-pass
//! - `RcHp1`  : first-order RC high-pass
//! - `ApLp1`  : first-order all-pass built on the low-pass prototype
//! - `ApHp1`  : first-order all-pass built on the high-pass prototype
//! - `SkHp2`  : second-order Sallen-Key high-pass (unity gain)
//! - `SkLp2`  : second-order Sallen-Key low-pass (unity gain)
//!
//! Notes
//! - The analog cutoff maps through `γ = 2π·fc / sr` without the `tan`
//!   prewarp, so the digital cutoff sinks below `fc` toward Nyquist. No
//!   decramping is applied, and above `fc = sr/π` (`γ ≥ 2`) the pole flips
//!   sign. [`CutoffParams::validate`] rejects that range for checked hosts.
//! - Every filter runs a [`Biquad`] in the transposed-canonical realization
//!   so cutoff modulation stays click-free.

use core::fmt::Debug;
use core::marker::PhantomData;

use crate::biquad::{Biquad, Coefficients, Realization};
use crate::dsp::{bilinear_gamma, FRAC_ONE_PI};
use crate::error::{check_below, check_sample_rate, Result, Validate};
use crate::kernel::{Filter, Kernel, DEFAULT_SAMPLE_RATE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cutoff-only parameter record for the bilinear filter bank.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CutoffParams {
    pub cutoff_hz: f64,
}

impl Default for CutoffParams {
    fn default() -> Self {
        Self { cutoff_hz: 100.0 }
    }
}

impl Validate for CutoffParams {
    fn validate(&self, sample_rate: f64) -> Result<()> {
        check_sample_rate(sample_rate)?;
        check_below("cutoff_hz", self.cutoff_hz, sample_rate * FRAC_ONE_PI)
    }
}

/// Maps the normalized analog cutoff `γ` onto biquad coefficients.
pub trait Design: Copy + Clone + Debug + Default {
    /// Cutoff used by `Default` constructors.
    const DEFAULT_CUTOFF_HZ: f64 = 100.0;

    fn coefficients(gamma: f64) -> Coefficients;
}

/// A [`Design`] driven through a transposed-canonical [`Biquad`].
#[derive(Copy, Clone, Debug)]
pub struct Bilinear<D: Design> {
    bq: Biquad,
    params: CutoffParams,
    sr: f64,
    _design: PhantomData<D>,
}

impl<D: Design> Bilinear<D> {
    /// Create a filter with cutoff `cut_hz` at sample rate `sr`.
    #[inline]
    pub fn new(cut_hz: f64, sr: f64) -> Self {
        let mut s = Self {
            bq: Biquad::new(Realization::TransposedCanonical),
            params: CutoffParams { cutoff_hz: cut_hz },
            sr,
            _design: PhantomData,
        };
        s.update_coeffs();
        s
    }

    /// Recompute coefficients for a new rate. State is kept.
    #[inline]
    pub fn set_sample_rate(&mut self, sr: f64) {
        if sr != self.sr {
            self.sr = sr;
            self.update_coeffs();
        }
    }

    #[inline]
    pub fn set_cutoff_hz(&mut self, cut_hz: f64) {
        self.set_parameters(CutoffParams { cutoff_hz: cut_hz });
    }

    #[inline] pub fn cutoff_hz(&self) -> f64 { self.params.cutoff_hz }
    #[inline] pub fn sample_rate(&self) -> f64 { self.sr }
    #[inline] pub fn coefficients(&self) -> Coefficients { self.bq.coefficients() }

    /// The underlying evaluator, e.g. to switch realization.
    #[inline] pub fn biquad_mut(&mut self) -> &mut Biquad { &mut self.bq }

    #[inline]
    fn update_coeffs(&mut self) {
        let gamma = bilinear_gamma(self.params.cutoff_hz, self.sr);
        self.bq.set_coefficients(D::coefficients(gamma));
    }
}

impl<D: Design> Default for Bilinear<D> {
    fn default() -> Self {
        Self::new(D::DEFAULT_CUTOFF_HZ, DEFAULT_SAMPLE_RATE)
    }
}

impl<D: Design> Kernel for Bilinear<D> {
    type Params = CutoffParams;

    #[inline]
    fn reset(&mut self, sample_rate: f64) {
        self.sr = sample_rate;
        self.bq.clear();
        self.update_coeffs();
    }

    #[inline]
    fn parameters(&self) -> CutoffParams {
        self.params
    }

    #[inline]
    fn set_parameters(&mut self, params: CutoffParams) {
        if params.cutoff_hz != self.params.cutoff_hz {
            self.params = params;
            self.update_coeffs();
        }
    }
}

impl<D: Design> Filter for Bilinear<D> {
    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        self.bq.tick(x)
    }
}

// ------------------------------------ Designs ------------------------------------

/// `H(s) = wc / (s + wc)`
#[derive(Copy, Clone, Debug, Default)]
pub struct RcLowpass;

impl Design for RcLowpass {
    #[inline]
    fn coefficients(gamma: f64) -> Coefficients {
        let a = gamma / (gamma + 2.0);
        Coefficients::first_order(a, a, (gamma - 2.0) / (gamma + 2.0))
    }
}

/// `H(s) = s / (s + wc)`
#[derive(Copy, Clone, Debug, Default)]
pub struct RcHighpass;

impl Design for RcHighpass {
    #[inline]
    fn coefficients(gamma: f64) -> Coefficients {
        let a = 2.0 / (gamma + 2.0);
        Coefficients::first_order(a, -a, (gamma - 2.0) / (gamma + 2.0))
    }
}

/// `H(z) = (c + z⁻¹) / (1 + c·z⁻¹)` with `c = (γ - 2)/(γ + 2)`.
#[derive(Copy, Clone, Debug, Default)]
pub struct AllpassLowpass;

impl Design for AllpassLowpass {
    #[inline]
    fn coefficients(gamma: f64) -> Coefficients {
        let c = (gamma - 2.0) / (gamma + 2.0);
        Coefficients::first_order(c, 1.0, c)
    }
}

/// Inverted all-pass: `H(z) = -(c + z⁻¹) / (1 + c·z⁻¹)`.
#[derive(Copy, Clone, Debug, Default)]
pub struct AllpassHighpass;

impl Design for AllpassHighpass {
    const DEFAULT_CUTOFF_HZ: f64 = 4000.0;

    #[inline]
    fn coefficients(gamma: f64) -> Coefficients {
        let c = (gamma - 2.0) / (gamma + 2.0);
        Coefficients::first_order(-c, -1.0, c)
    }
}

/// Two cascaded RC poles sharing the denominator `(γ + 2)²`.
#[inline]
fn sallen_key_feedback(gamma: f64) -> (f64, f64) {
    let den = gamma + 2.0;
    let b1 = (2.0 * gamma - 4.0) / den;
    let b2 = (gamma * gamma - 4.0 * gamma + 4.0) / (den * den);
    (b1, b2)
}

/// `H(s) = s² / (s + wc)²`
#[derive(Copy, Clone, Debug, Default)]
pub struct SallenKeyHighpass;

impl Design for SallenKeyHighpass {
    #[inline]
    fn coefficients(gamma: f64) -> Coefficients {
        let den = gamma + 2.0;
        let mu = 4.0 / (den * den);
        let (b1, b2) = sallen_key_feedback(gamma);
        Coefficients { a0: mu, a1: -2.0 * mu, a2: mu, b1, b2 }
    }
}

/// `H(s) = wc² / (s + wc)²`
#[derive(Copy, Clone, Debug, Default)]
pub struct SallenKeyLowpass;

impl Design for SallenKeyLowpass {
    #[inline]
    fn coefficients(gamma: f64) -> Coefficients {
        let den = gamma + 2.0;
        let a = gamma * gamma / (den * den);
        let (b1, b2) = sallen_key_feedback(gamma);
        Coefficients { a0: a, a1: 2.0 * a, a2: a, b1, b2 }
    }
}

pub type RcLp1 = Bilinear<RcLowpass>;
pub type RcHp1 = Bilinear<RcHighpass>;
pub type ApLp1 = Bilinear<AllpassLowpass>;
pub type ApHp1 = Bilinear<AllpassHighpass>;
pub type SkHp2 = Bilinear<SallenKeyHighpass>;
pub type SkLp2 = Bilinear<SallenKeyLowpass>;

// ------------------------------------ Tests --------------------------------------
