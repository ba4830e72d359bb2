//! Second-order difference-equation evaluator.
//!
//! `y = a0·x + a1·x[-1] + a2·x[-2] − b1·y[-1] − b2·y[-2]`
//!
//! Four algebraically equivalent realizations are available. They differ in
//! how the two-sample memory is laid out and updated, which matters once
//! coefficients change mid-stream:
//! - [`Realization::Direct`]: four registers, plain equation above.
//! - [`Realization::Canonical`]: two registers holding the intermediate `w`.
//! - [`Realization::TransposedDirect`]: all-pole section first, then zeros.
//! - [`Realization::TransposedCanonical`]: two registers, zeros and poles
//!   folded into one update.
//!
//! Of the four, only the transposed canonical form is click-free under
//! coefficient modulation; transposed direct keeps a pole-section state that
//! can step when the cutoff moves.
//!
//! Register layout per realization:
//!
//! | realization           | `x_z1`, `x_z2`        | `y_z1`, `y_z2`          |
//! |-----------------------|-----------------------|-------------------------|
//! | direct                | past inputs           | past outputs            |
//! | canonical             | past `w`              | unused                  |
//! | transposed direct     | zero-section state    | pole-section state      |
//! | transposed canonical  | folded state          | unused                  |

use crate::dsp::flush_denormal;
use crate::error::{check_sample_rate, Result, Validate};
use crate::kernel::{Filter, Kernel};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Feed-forward (`a*`) and feedback (`b*`) coefficients. `b0` is implied 1.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Coefficients {
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    pub b1: f64,
    pub b2: f64,
}

impl Coefficients {
    /// Unity gain, no memory.
    pub const IDENTITY: Self = Self { a0: 1.0, a1: 0.0, a2: 0.0, b1: 0.0, b2: 0.0 };

    /// First-order section (`a2 = b2 = 0`).
    #[inline]
    pub const fn first_order(a0: f64, a1: f64, b1: f64) -> Self {
        Self { a0, a1, a2: 0.0, b1, b2: 0.0 }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        [self.a0, self.a1, self.a2, self.b1, self.b2].iter().all(|c| c.is_finite())
    }
}

/// Two-sample memory. Meaning depends on the [`Realization`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Registers {
    pub x_z1: f64,
    pub x_z2: f64,
    pub y_z1: f64,
    pub y_z2: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Realization {
    #[default]
    Direct,
    Canonical,
    /// Not click-free under coefficient changes: the pole-section state
    /// scales with `1/(1 + b1)`, so a cutoff jump can step the output.
    TransposedDirect,
    /// Output-referenced state; the one form that stays continuous when
    /// coefficients change mid-stream. The analog filter bank runs on it.
    TransposedCanonical,
}

impl Realization {
    pub const ALL: [Self; 4] = [
        Self::Direct,
        Self::Canonical,
        Self::TransposedDirect,
        Self::TransposedCanonical,
    ];

    /// Whether this is one of the two transposed forms. Only
    /// [`Realization::TransposedCanonical`] is click-free under modulation.
    #[inline]
    pub const fn is_transposed(self) -> bool {
        matches!(self, Self::TransposedDirect | Self::TransposedCanonical)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BiquadParams {
    pub realization: Realization,
}

impl Validate for BiquadParams {
    fn validate(&self, sample_rate: f64) -> Result<()> {
        check_sample_rate(sample_rate)
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Biquad {
    params: BiquadParams,
    coeffs: Coefficients,
    regs: Registers,
}

impl Biquad {
    #[inline]
    pub fn new(realization: Realization) -> Self {
        Self { params: BiquadParams { realization }, ..Self::default() }
    }

    #[inline]
    pub fn with_coefficients(realization: Realization, coeffs: Coefficients) -> Self {
        Self { params: BiquadParams { realization }, coeffs, regs: Registers::default() }
    }

    /// Zero the registers. Coefficients are kept.
    #[inline]
    pub fn clear(&mut self) {
        self.regs = Registers::default();
    }

    #[inline] pub fn coefficients(&self) -> Coefficients { self.coeffs }
    #[inline] pub fn set_coefficients(&mut self, c: Coefficients) { self.coeffs = c; }
    #[inline] pub fn registers(&self) -> Registers { self.regs }
    #[inline] pub fn realization(&self) -> Realization { self.params.realization }

    #[inline]
    pub fn tick(&mut self, x: f64) -> f64 {
        let c = &self.coeffs;
        let r = &mut self.regs;
        match self.params.realization {
            Realization::Direct => {
                let y = flush_denormal(
                    c.a0 * x + c.a1 * r.x_z1 + c.a2 * r.x_z2 - c.b1 * r.y_z1 - c.b2 * r.y_z2,
                );
                r.x_z2 = r.x_z1;
                r.x_z1 = x;
                r.y_z2 = r.y_z1;
                r.y_z1 = y;
                y
            }
            Realization::Canonical => {
                let w = x - c.b1 * r.x_z1 - c.b2 * r.x_z2;
                let y = flush_denormal(c.a0 * w + c.a1 * r.x_z1 + c.a2 * r.x_z2);
                r.x_z2 = r.x_z1;
                r.x_z1 = flush_denormal(w);
                y
            }
            Realization::TransposedDirect => {
                let w = x + r.y_z1;
                let y = flush_denormal(c.a0 * w + r.x_z1);
                r.y_z1 = flush_denormal(r.y_z2 - c.b1 * w);
                r.y_z2 = flush_denormal(-c.b2 * w);
                r.x_z1 = flush_denormal(r.x_z2 + c.a1 * w);
                r.x_z2 = flush_denormal(c.a2 * w);
                y
            }
            Realization::TransposedCanonical => {
                let y = flush_denormal(c.a0 * x + r.x_z1);
                r.x_z1 = flush_denormal(c.a1 * x - c.b1 * y + r.x_z2);
                r.x_z2 = flush_denormal(c.a2 * x - c.b2 * y);
                y
            }
        }
    }
}

impl Kernel for Biquad {
    type Params = BiquadParams;

    /// The evaluator has no sample-rate dependent state; this only clears.
    #[inline]
    fn reset(&mut self, _sample_rate: f64) {
        self.clear();
    }

    #[inline]
    fn parameters(&self) -> BiquadParams {
        self.params
    }

    /// Switching realization clears the registers, since their layout differs.
    #[inline]
    fn set_parameters(&mut self, params: BiquadParams) {
        if params.realization != self.params.realization {
            self.clear();
        }
        self.params = params;
    }
}

impl Filter for Biquad {
    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        self.tick(x)
    }
}
