//! ADSR envelope generator modelled on a Eurorack-style analog envelope.
//!
//! Output is a control voltage in `[0, 8]` V. The attack segment "aims" at
//! the 12 V rail and is cut off once it crosses the 8 V peak, which gives
//! the bent rise of the analog circuit.
//!
//! Segment shapes, with `c` the segment counter running from 0 toward 1:
//! - Attack  : `start + (12 − start)·c^0.5`, `δ = 1 / (1.5·attack·sr)`
//! - Decay   : `8 + (sustain·8 − 8)·c^2`, `δ = 1 / (decay·sr)`
//! - Sustain : `sustain·8`
//! - Release : `start·(1 − c^2)`, `δ = 1 / (release·sr)`
//!
//! The counter advances before the output is computed. State transitions
//! are evaluated against the output just produced, so they take effect on
//! the following sample and the next segment starts from the last value
//! emitted.

use crate::dsp::{lin_map_norm, skew_normalized};
use crate::error::{check_positive, check_range, check_sample_rate, Result, Validate};
use crate::kernel::{Kernel, DEFAULT_SAMPLE_RATE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Envelope peak voltage.
pub const PEAK_ENV_VOLTAGE: f64 = 8.0;

/// Supply rail the attack segment aims for.
pub const MAX_SYS_VOLTAGE: f64 = 12.0;

/// Tolerance for the segment-end comparisons.
pub const VOLTAGE_MARGIN: f64 = 1e-5;

const ATTACK_TIME_SCALE: f64 = MAX_SYS_VOLTAGE / PEAK_ENV_VOLTAGE;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AdsrStage {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Segment times in seconds, sustain as a fraction of the peak.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AdsrParams {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self { attack: 0.25, decay: 0.5, sustain: 0.4, release: 1.5 }
    }
}

impl Validate for AdsrParams {
    fn validate(&self, sample_rate: f64) -> Result<()> {
        check_sample_rate(sample_rate)?;
        check_positive("attack", self.attack)?;
        check_positive("decay", self.decay)?;
        check_positive("release", self.release)?;
        check_range("sustain", self.sustain, 0.0, 1.0)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Adsr {
    params: AdsrParams,
    sr: f64,

    // state
    stage: AdsrStage,
    gate: bool,
    counter: f64,
    delta: f64,
    seg_start: f64,
    prev: f64,
}

impl Adsr {
    #[inline]
    pub fn new(params: AdsrParams, sr: f64) -> Self {
        Self {
            params,
            sr,
            stage: AdsrStage::Idle,
            gate: false,
            counter: 0.0,
            delta: 0.0,
            seg_start: 0.0,
            prev: 0.0,
        }
    }

    #[inline] pub fn set_gate(&mut self, gate: bool) { self.gate = gate; }
    #[inline] pub fn gate_on(&mut self) { self.gate = true; }
    #[inline] pub fn gate_off(&mut self) { self.gate = false; }
    #[inline] pub fn gate(&self) -> bool { self.gate }
    #[inline] pub fn stage(&self) -> AdsrStage { self.stage }

    /// Last rendered output in volts.
    #[inline] pub fn value(&self) -> f64 { self.prev }

    /// Next output sample in volts.
    #[inline]
    pub fn render(&mut self) -> f64 {
        let sustain_level = self.params.sustain * PEAK_ENV_VOLTAGE;
        let out = match self.stage {
            AdsrStage::Idle => 0.0,
            AdsrStage::Attack => {
                self.counter += self.delta;
                lin_map_norm(skew_normalized(self.counter, 2.0), self.seg_start, MAX_SYS_VOLTAGE)
            }
            AdsrStage::Decay => {
                self.counter += self.delta;
                lin_map_norm(skew_normalized(self.counter, 0.5), PEAK_ENV_VOLTAGE, sustain_level)
            }
            AdsrStage::Sustain => sustain_level,
            AdsrStage::Release => {
                self.counter += self.delta;
                lin_map_norm(skew_normalized(self.counter, 0.5), self.seg_start, 0.0)
            }
        };

        self.transition(out);
        self.prev = out;
        out
    }

    fn transition(&mut self, out: f64) {
        match self.stage {
            AdsrStage::Idle => {
                if self.gate {
                    self.enter(AdsrStage::Attack, 0.0);
                }
            }
            AdsrStage::Attack => {
                if !self.gate {
                    self.enter(AdsrStage::Release, out);
                } else if out >= PEAK_ENV_VOLTAGE - VOLTAGE_MARGIN {
                    self.enter(AdsrStage::Decay, PEAK_ENV_VOLTAGE);
                }
            }
            AdsrStage::Decay => {
                if !self.gate {
                    self.enter(AdsrStage::Release, out);
                } else if out <= self.params.sustain * PEAK_ENV_VOLTAGE + VOLTAGE_MARGIN {
                    self.stage = AdsrStage::Sustain;
                }
            }
            AdsrStage::Sustain => {
                if !self.gate {
                    self.enter(AdsrStage::Release, out);
                }
            }
            AdsrStage::Release => {
                if self.gate {
                    self.enter(AdsrStage::Attack, out);
                } else if out <= VOLTAGE_MARGIN {
                    self.stage = AdsrStage::Idle;
                }
            }
        }
    }

    #[inline]
    fn enter(&mut self, stage: AdsrStage, seg_start: f64) {
        self.stage = stage;
        self.counter = 0.0;
        self.seg_start = seg_start;
        self.update_delta();
    }

    #[inline]
    fn update_delta(&mut self) {
        let time = match self.stage {
            AdsrStage::Attack => ATTACK_TIME_SCALE * self.params.attack,
            AdsrStage::Decay => self.params.decay,
            AdsrStage::Release => self.params.release,
            AdsrStage::Idle | AdsrStage::Sustain => return,
        };
        self.delta = 1.0 / (time * self.sr);
    }
}

impl Default for Adsr {
    fn default() -> Self {
        Self::new(AdsrParams::default(), DEFAULT_SAMPLE_RATE)
    }
}

impl Kernel for Adsr {
    type Params = AdsrParams;

    /// Back to Idle with zero output. The gate is left as is.
    #[inline]
    fn reset(&mut self, sample_rate: f64) {
        self.sr = sample_rate;
        self.stage = AdsrStage::Idle;
        self.counter = 0.0;
        self.delta = 0.0;
        self.seg_start = 0.0;
        self.prev = 0.0;
    }

    #[inline]
    fn parameters(&self) -> AdsrParams {
        self.params
    }

    /// A new time for the running segment applies from the next sample.
    #[inline]
    fn set_parameters(&mut self, params: AdsrParams) {
        if params != self.params {
            self.params = params;
            self.update_delta();
        }
    }
}
