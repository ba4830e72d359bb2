//! Zero-delay-feedback (TPT) one-pole stages and the feedback networks built
//! from them.
//!
//! Contents
//! - `TptLp1`   : trapezoidal one-pole low-pass
//! - `TptHp1`   : trapezoidal one-pole high-pass
//! - `Ladder4`  : four stages closed by one global feedback path
//!   (`LadderLp4`, `LadderHp4`)
//! - `SkHp2Tpt` : two high-pass stages in a Sallen-Key loop with a
//!   saturator on the loop input
//!
//! Notes
//! - `g = tan(π·fc / sr)` is cached on parameter or sample-rate change.
//! - A stage's [`ZdfStage::state`] is its integrator memory *before* the next
//!   `process` call. Networks read every stage's state first, solve the loop
//!   for the chain input `u` in closed form, then run `u` through the chain.
//! - For `N` stages with per-stage gain `G`:
//!   `S = Σ G^(N-i)·±state_i / (1 + g)`, `u = (x − k·S) / (1 + k·G^N)`.
//!   The low-pass chain sums the states as they are, the high-pass chain
//!   sums them negated.
//! - Resonance is denormalized linearly: `k = 4·res` for the ladder,
//!   `k = 2·res` for Sallen-Key. `res = 1` is the self-oscillation boundary;
//!   no clamping is applied.

use crate::dsp::{flush_denormal, saturate, tpt_g};
use crate::error::{check_below, check_range, check_sample_rate, Result, Validate};
use crate::kernel::{Filter, Kernel, DEFAULT_SAMPLE_RATE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ---------------------------------- Parameters -----------------------------------

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TptParams {
    pub cutoff_hz: f64,
}

impl Default for TptParams {
    fn default() -> Self {
        Self { cutoff_hz: 100.0 }
    }
}

impl Validate for TptParams {
    fn validate(&self, sample_rate: f64) -> Result<()> {
        check_sample_rate(sample_rate)?;
        check_below("cutoff_hz", self.cutoff_hz, 0.5 * sample_rate)
    }
}

/// Cutoff plus normalized resonance in `[0, 1]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResonantParams {
    pub cutoff_hz: f64,
    pub resonance: f64,
}

impl Default for ResonantParams {
    fn default() -> Self {
        Self { cutoff_hz: 100.0, resonance: 0.0 }
    }
}

impl Validate for ResonantParams {
    fn validate(&self, sample_rate: f64) -> Result<()> {
        TptParams { cutoff_hz: self.cutoff_hz }.validate(sample_rate)?;
        check_range("resonance", self.resonance, 0.0, 1.0)
    }
}

// ------------------------------------ Stages -------------------------------------

/// One trapezoidal integrator stage usable inside a feedback network.
pub trait ZdfStage: Filter + Kernel<Params = TptParams> + Copy + Default {
    /// Sign applied to [`ZdfStage::state`] when estimating the loop signal.
    const LOOP_SIGN: f64;

    /// Instantaneous gain `G` of the stage for prewarped `g`.
    fn stage_gain(g: f64) -> f64;

    /// Integrator memory ahead of the next `process` call.
    fn state(&self) -> f64;

    /// Load a cutoff whose `g` the owning network already computed.
    fn set_prewarped(&mut self, cutoff_hz: f64, sr: f64, g: f64);
}

/// Trapezoidal one-pole low-pass.
///
/// `v = G·(x − s)`, `y = v + s`, `s ← y + v`, with `G = g / (1 + g)`.
#[derive(Copy, Clone, Debug)]
pub struct TptLp1 {
    params: TptParams,
    sr: f64,
    big_g: f64,
    s: f64,
}

impl TptLp1 {
    #[inline]
    pub fn new(cut_hz: f64, sr: f64) -> Self {
        let mut st = Self { params: TptParams { cutoff_hz: cut_hz }, sr, big_g: 0.0, s: 0.0 };
        st.update_coeffs();
        st
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f64) {
        self.sr = sr;
        self.update_coeffs();
    }

    #[inline]
    fn update_coeffs(&mut self) {
        self.big_g = Self::stage_gain(tpt_g(self.params.cutoff_hz, self.sr));
    }
}

impl Default for TptLp1 {
    fn default() -> Self {
        Self::new(TptParams::default().cutoff_hz, DEFAULT_SAMPLE_RATE)
    }
}

impl Kernel for TptLp1 {
    type Params = TptParams;

    #[inline]
    fn reset(&mut self, sample_rate: f64) {
        self.s = 0.0;
        self.set_sample_rate(sample_rate);
    }

    #[inline]
    fn parameters(&self) -> TptParams {
        self.params
    }

    #[inline]
    fn set_parameters(&mut self, params: TptParams) {
        if params != self.params {
            self.params = params;
            self.update_coeffs();
        }
    }
}

impl Filter for TptLp1 {
    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let v = self.big_g * (x - self.s);
        let y = v + self.s;
        self.s = flush_denormal(y + v);
        y
    }
}

impl ZdfStage for TptLp1 {
    const LOOP_SIGN: f64 = 1.0;

    #[inline] fn stage_gain(g: f64) -> f64 { g / (1.0 + g) }
    #[inline] fn state(&self) -> f64 { self.s }

    #[inline]
    fn set_prewarped(&mut self, cutoff_hz: f64, sr: f64, g: f64) {
        self.params.cutoff_hz = cutoff_hz;
        self.sr = sr;
        self.big_g = Self::stage_gain(g);
    }
}

/// Trapezoidal one-pole high-pass.
///
/// `y = G·(x − s)`, `s ← s + 2g·y`, with `G = 1 / (1 + g)`. `s` is the
/// memory of the embedded low-pass integrator.
#[derive(Copy, Clone, Debug)]
pub struct TptHp1 {
    params: TptParams,
    sr: f64,
    big_g: f64,
    g2: f64,
    s: f64,
}

impl TptHp1 {
    #[inline]
    pub fn new(cut_hz: f64, sr: f64) -> Self {
        let mut st = Self {
            params: TptParams { cutoff_hz: cut_hz },
            sr,
            big_g: 0.0,
            g2: 0.0,
            s: 0.0,
        };
        st.update_coeffs();
        st
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f64) {
        self.sr = sr;
        self.update_coeffs();
    }

    #[inline]
    fn update_coeffs(&mut self) {
        let g = tpt_g(self.params.cutoff_hz, self.sr);
        self.big_g = Self::stage_gain(g);
        self.g2 = 2.0 * g;
    }
}

impl Default for TptHp1 {
    fn default() -> Self {
        Self::new(TptParams::default().cutoff_hz, DEFAULT_SAMPLE_RATE)
    }
}

impl Kernel for TptHp1 {
    type Params = TptParams;

    #[inline]
    fn reset(&mut self, sample_rate: f64) {
        self.s = 0.0;
        self.set_sample_rate(sample_rate);
    }

    #[inline]
    fn parameters(&self) -> TptParams {
        self.params
    }

    #[inline]
    fn set_parameters(&mut self, params: TptParams) {
        if params != self.params {
            self.params = params;
            self.update_coeffs();
        }
    }
}

impl Filter for TptHp1 {
    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let y = self.big_g * (x - self.s);
        self.s = flush_denormal(self.s + self.g2 * y);
        y
    }
}

impl ZdfStage for TptHp1 {
    const LOOP_SIGN: f64 = -1.0;

    #[inline] fn stage_gain(g: f64) -> f64 { 1.0 / (1.0 + g) }
    #[inline] fn state(&self) -> f64 { self.s }

    #[inline]
    fn set_prewarped(&mut self, cutoff_hz: f64, sr: f64, g: f64) {
        self.params.cutoff_hz = cutoff_hz;
        self.sr = sr;
        self.big_g = Self::stage_gain(g);
        self.g2 = 2.0 * g;
    }
}

// ------------------------------- Feedback networks -------------------------------

/// Cached loop constants shared by the networks.
#[derive(Copy, Clone, Debug, Default)]
struct LoopCoeffs {
    g: f64,
    big_g: f64,
    k: f64,
}

/// Four-stage ladder with global feedback, solved per sample without iteration.
#[derive(Copy, Clone, Debug)]
pub struct Ladder4<S: ZdfStage> {
    stages: [S; 4],
    params: ResonantParams,
    sr: f64,
    lc: LoopCoeffs,
    g4: f64,
}

pub type LadderLp4 = Ladder4<TptLp1>;
pub type LadderHp4 = Ladder4<TptHp1>;

impl<S: ZdfStage> Ladder4<S> {
    pub const FEEDBACK_SCALE: f64 = 4.0;

    #[inline]
    pub fn new(cut_hz: f64, resonance: f64, sr: f64) -> Self {
        let mut l = Self {
            stages: [S::default(); 4],
            params: ResonantParams { cutoff_hz: cut_hz, resonance },
            sr,
            lc: LoopCoeffs::default(),
            g4: 0.0,
        };
        l.update_cutoff();
        l.update_resonance();
        l
    }

    /// Recompute the stage and loop gains for a new rate. State is kept.
    #[inline]
    pub fn set_sample_rate(&mut self, sr: f64) {
        self.sr = sr;
        self.update_cutoff();
    }

    /// Feedback gain `k` currently in use.
    #[inline] pub fn feedback(&self) -> f64 { self.lc.k }

    /// Read-only view of the stage chain.
    #[inline] pub fn stages(&self) -> &[S; 4] { &self.stages }

    #[inline]
    fn update_cutoff(&mut self) {
        let g = tpt_g(self.params.cutoff_hz, self.sr);
        for st in &mut self.stages {
            st.set_prewarped(self.params.cutoff_hz, self.sr, g);
        }
        let big_g = S::stage_gain(g);
        self.lc.g = g;
        self.lc.big_g = big_g;
        self.g4 = big_g * big_g * big_g * big_g;
    }

    #[inline]
    fn update_resonance(&mut self) {
        self.lc.k = Self::FEEDBACK_SCALE * self.params.resonance;
    }
}

impl<S: ZdfStage> Default for Ladder4<S> {
    fn default() -> Self {
        let p = ResonantParams::default();
        Self::new(p.cutoff_hz, p.resonance, DEFAULT_SAMPLE_RATE)
    }
}

impl<S: ZdfStage> Kernel for Ladder4<S> {
    type Params = ResonantParams;

    #[inline]
    fn reset(&mut self, sample_rate: f64) {
        for st in &mut self.stages {
            st.reset(sample_rate);
        }
        self.set_sample_rate(sample_rate);
    }

    #[inline]
    fn parameters(&self) -> ResonantParams {
        self.params
    }

    #[inline]
    fn set_parameters(&mut self, params: ResonantParams) {
        let old = core::mem::replace(&mut self.params, params);
        if params.cutoff_hz != old.cutoff_hz {
            self.update_cutoff();
        }
        if params.resonance != old.resonance {
            self.update_resonance();
        }
    }
}

impl<S: ZdfStage> Filter for Ladder4<S> {
    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let [s1, s2, s3, s4] = self.stages.map(|st| S::LOOP_SIGN * st.state());
        let LoopCoeffs { g, big_g, k } = self.lc;

        let sum = (big_g * big_g * big_g * s1 + big_g * big_g * s2 + big_g * s3 + s4) / (1.0 + g);
        let mut u = (x - k * sum) / (1.0 + k * self.g4);

        for st in &mut self.stages {
            u = st.process(u);
        }
        u
    }
}

/// Two-pole Sallen-Key high-pass with a saturated loop input.
#[derive(Copy, Clone, Debug)]
pub struct SkHp2Tpt {
    stages: [TptHp1; 2],
    params: ResonantParams,
    sr: f64,
    lc: LoopCoeffs,
    // G − G²
    g_diff: f64,
}

impl SkHp2Tpt {
    pub const FEEDBACK_SCALE: f64 = 2.0;

    #[inline]
    pub fn new(cut_hz: f64, resonance: f64, sr: f64) -> Self {
        let mut f = Self {
            stages: [TptHp1::default(); 2],
            params: ResonantParams { cutoff_hz: cut_hz, resonance },
            sr,
            lc: LoopCoeffs::default(),
            g_diff: 0.0,
        };
        f.update_cutoff();
        f.update_resonance();
        f
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f64) {
        self.sr = sr;
        self.update_cutoff();
    }

    #[inline] pub fn feedback(&self) -> f64 { self.lc.k }
    #[inline] pub fn stages(&self) -> &[TptHp1; 2] { &self.stages }

    #[inline]
    fn update_cutoff(&mut self) {
        let g = tpt_g(self.params.cutoff_hz, self.sr);
        for st in &mut self.stages {
            st.set_prewarped(self.params.cutoff_hz, self.sr, g);
        }
        let big_g = TptHp1::stage_gain(g);
        self.lc.g = g;
        self.lc.big_g = big_g;
        self.g_diff = big_g - big_g * big_g;
    }

    #[inline]
    fn update_resonance(&mut self) {
        self.lc.k = Self::FEEDBACK_SCALE * self.params.resonance;
    }
}

impl Default for SkHp2Tpt {
    fn default() -> Self {
        let p = ResonantParams::default();
        Self::new(p.cutoff_hz, p.resonance, DEFAULT_SAMPLE_RATE)
    }
}

impl Kernel for SkHp2Tpt {
    type Params = ResonantParams;

    #[inline]
    fn reset(&mut self, sample_rate: f64) {
        for st in &mut self.stages {
            st.reset(sample_rate);
        }
        self.set_sample_rate(sample_rate);
    }

    #[inline]
    fn parameters(&self) -> ResonantParams {
        self.params
    }

    #[inline]
    fn set_parameters(&mut self, params: ResonantParams) {
        let old = core::mem::replace(&mut self.params, params);
        if params.cutoff_hz != old.cutoff_hz {
            self.update_cutoff();
        }
        if params.resonance != old.resonance {
            self.update_resonance();
        }
    }
}

impl Filter for SkHp2Tpt {
    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let s1 = TptHp1::LOOP_SIGN * self.stages[0].state();
        let s2 = TptHp1::LOOP_SIGN * self.stages[1].state();
        let LoopCoeffs { g, big_g, k } = self.lc;

        let sum = ((1.0 - big_g) * s1 + s2) / (1.0 + g);
        let mut u = saturate((x - k * sum) / (1.0 - k * self.g_diff));

        for st in &mut self.stages {
            u = st.process(u);
        }
        u
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::TWO_PI;

    const SR: f64 = 48_000.0;

    fn sine_gain<F: Filter>(f: &mut F, hz: f64) -> f64 {
        let settle = (0.4 * SR) as usize;
        let measure = (0.1 * SR) as usize;
        let (mut e_in, mut e_out) = (0.0, 0.0);
        for n in 0..settle + measure {
            let x = (TWO_PI * hz * n as f64 / SR).sin();
            let y = f.process(x);
            if n >= settle {
                e_in += x * x;
                e_out += y * y;
            }
        }
        (e_out / e_in).sqrt()
    }

    #[test]
    fn one_poles_are_exact_at_cutoff() {
        let mut lp = TptLp1::new(1000.0, SR);
        let g = sine_gain(&mut lp, 1000.0);
        assert!((g - core::f64::consts::FRAC_1_SQRT_2).abs() < 2e-3, "lp {g}");
        let mut hp = TptHp1::new(1000.0, SR);
        let g = sine_gain(&mut hp, 1000.0);
        assert!((g - core::f64::consts::FRAC_1_SQRT_2).abs() < 2e-3, "hp {g}");
    }

    #[test]
    fn state_is_pre_output_memory() {
        let mut lp = TptLp1::new(1000.0, SR);
        let y = lp.process(1.0);
        assert!(lp.state() > y, "state {} output {}", lp.state(), y);
        let mut hp = TptHp1::new(1000.0, SR);
        let y = hp.process(1.0);
        assert!((hp.state() - 2.0 * tpt_g(1000.0, SR) * y).abs() < 1e-15);
    }

    #[test]
    fn ladder_without_feedback_is_a_plain_cascade() {
        let mut ladder = LadderLp4::new(800.0, 0.0, SR);
        let mut chain = [TptLp1::new(800.0, SR); 4];
        for n in 0..2048 {
            let x = if n % 300 < 150 { 1.0 } else { -1.0 };
            let mut y = x;
            for st in &mut chain {
                y = st.process(y);
            }
            assert!((ladder.process(x) - y).abs() < 1e-15, "sample {n}");
        }
    }

    #[test]
    fn sallen_key_without_feedback_is_a_saturated_cascade() {
        let mut sk = SkHp2Tpt::new(300.0, 0.0, SR);
        let mut chain = [TptHp1::new(300.0, SR); 2];
        for n in 0..2048 {
            let x = 1.5 * (TWO_PI * 50.0 * n as f64 / SR).sin();
            let y0 = chain[0].process(saturate(x));
            let y = chain[1].process(y0);
            assert!((sk.process(x) - y).abs() < 1e-15, "sample {n}");
        }
    }

    #[test]
    fn ladder_dc_gain_drops_with_feedback() {
        let mut ladder = LadderLp4::new(1000.0, 0.5, SR);
        let mut y = 0.0;
        for _ in 0..48_000 {
            y = ladder.process(1.0);
        }
        // k = 2, unity DC through the chain: 1 / (1 + k)
        assert!((y - 1.0 / 3.0).abs() < 1e-6, "{y}");
        assert_eq!(ladder.feedback(), 2.0);
    }

    #[test]
    fn ladder_rings_at_full_resonance() {
        let mut ladder = LadderLp4::new(1000.0, 1.0, SR);
        ladder.process(1.0);
        let mut peak = 0.0_f64;
        for n in 0..48_000 {
            let y = ladder.process(0.0);
            if n > 47_000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak > 1e-4, "self-oscillation died out: {peak}");

        let mut damped = LadderLp4::new(1000.0, 0.5, SR);
        damped.process(1.0);
        let mut y = 1.0;
        for _ in 0..48_000 {
            y = damped.process(0.0);
        }
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn highpass_ladder_blocks_dc() {
        let mut ladder = LadderHp4::new(200.0, 0.7, SR);
        let mut y = 1.0;
        for _ in 0..96_000 {
            y = ladder.process(1.0);
        }
        assert!(y.abs() < 1e-6, "{y}");
    }

    #[test]
    fn sallen_key_stays_bounded_at_full_resonance() {
        let mut sk = SkHp2Tpt::new(1000.0, 1.0, SR);
        for n in 0..48_000 {
            let x = if n % 480 < 240 { 1.0 } else { -1.0 };
            let y = sk.process(x);
            assert!(y.is_finite() && y.abs() < 8.0, "sample {n}: {y}");
        }
    }

    #[test]
    fn parameter_changes_refresh_cached_gains() {
        let mut ladder = LadderLp4::default();
        ladder.set_parameters(ResonantParams { cutoff_hz: 2000.0, resonance: 0.25 });
        assert_eq!(ladder.feedback(), 1.0);
        for st in ladder.stages() {
            assert_eq!(st.parameters().cutoff_hz, 2000.0);
        }
        ladder.reset(96_000.0);
        let mut reference = TptLp1::new(2000.0, 96_000.0);
        let mut chain = ladder.stages()[0];
        assert_eq!(chain.process(0.5), reference.process(0.5));
    }

    #[test]
    fn validation_limits() {
        assert!(ResonantParams::default().validate(SR).is_ok());
        assert!(ResonantParams { cutoff_hz: 100.0, resonance: 1.2 }.validate(SR).is_err());
        assert!(TptParams { cutoff_hz: 24_000.0 }.validate(SR).is_err());
    }
}
