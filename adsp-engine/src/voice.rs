//! Monophonic voice: oscillator → ladder low-pass → envelope-driven VCA.
//!
//! The voice is the reference consumer of the kernel contract: it resets
//! every kernel together, forwards parameter snapshots to each of them, and
//! renders one sample per call. Parameters arrive either directly through
//! [`Voice::set_params`] or through a [`crate::params`] link.

use adsp_core::envelopes::{Adsr, AdsrParams, AdsrStage, PEAK_ENV_VOLTAGE};
use adsp_core::error::{ParamError, Validate};
use adsp_core::kernel::{Filter, Kernel, DEFAULT_SAMPLE_RATE};
use adsp_core::oscillators::{Oscillator, OscillatorKind, OscillatorParams, Waveform};
use adsp_core::tpt::{LadderLp4, ResonantParams};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::Generator;
use crate::params::{link, ParamReceiver, ParamSender};

/// Full parameter snapshot for one [`Voice`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VoiceParams {
    pub kind: OscillatorKind,
    pub waveform: Waveform,
    pub osc: OscillatorParams,
    pub filter: ResonantParams,
    pub env: AdsrParams,
    /// Linear output gain at full envelope.
    pub level: f64,
    pub gate: bool,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            kind: OscillatorKind::AntiAliased,
            waveform: Waveform::Saw,
            osc: OscillatorParams::default(),
            filter: ResonantParams { cutoff_hz: 2000.0, resonance: 0.2 },
            env: AdsrParams::default(),
            level: 0.5,
            gate: false,
        }
    }
}

impl Validate for VoiceParams {
    fn validate(&self, sample_rate: f64) -> Result<(), ParamError> {
        self.osc.validate(sample_rate)?;
        self.filter.validate(sample_rate)?;
        self.env.validate(sample_rate)?;
        if !self.level.is_finite() {
            return Err(ParamError::NotFinite { name: "level" });
        }
        if self.level < 0.0 {
            return Err(ParamError::OutOfRange {
                name: "level",
                value: self.level,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}

pub struct Voice {
    params: VoiceParams,
    sr: f64,
    osc: Oscillator,
    filter: LadderLp4,
    env: Adsr,
    rx: Option<ParamReceiver<VoiceParams>>,
}

impl Voice {
    pub fn new(params: VoiceParams) -> Self {
        let sr = DEFAULT_SAMPLE_RATE;
        let mut env = Adsr::new(params.env, sr);
        env.set_gate(params.gate);
        Self {
            params,
            sr,
            osc: Oscillator::new(params.kind, params.osc, sr),
            filter: LadderLp4::new(params.filter.cutoff_hz, params.filter.resonance, sr),
            env,
            rx: None,
        }
    }

    /// A voice fed by a parameter link; the sender goes to the control thread.
    /// `sample_rate` is the rate snapshots are validated against; keep it in
    /// step with the engine through [`ParamSender::set_sample_rate`].
    pub fn linked(
        params: VoiceParams,
        capacity: usize,
        sample_rate: f64,
    ) -> (Self, ParamSender<VoiceParams>) {
        let (tx, rx) = link(capacity, sample_rate);
        let mut voice = Self::new(params);
        voice.rx = Some(rx);
        (voice, tx)
    }

    #[inline] pub fn params(&self) -> VoiceParams { self.params }

    /// Whether the envelope is still producing output.
    #[inline] pub fn is_active(&self) -> bool { self.env.stage() != AdsrStage::Idle }

    /// Apply a snapshot. A rising gate retriggers the oscillator; a new
    /// oscillator kind swaps the core.
    pub fn set_params(&mut self, p: VoiceParams) {
        if p.kind != self.params.kind {
            self.osc = Oscillator::new(p.kind, p.osc, self.sr);
        } else {
            self.osc.set_parameters(p.osc);
        }
        self.filter.set_parameters(p.filter);
        self.env.set_parameters(p.env);
        if p.gate && !self.params.gate {
            self.osc.retrigger();
        }
        self.env.set_gate(p.gate);
        self.params = p;
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new(VoiceParams::default())
    }
}

impl Generator for Voice {
    fn reset(&mut self, sr: f64) {
        self.sr = sr;
        self.osc.reset(sr);
        self.filter.reset(sr);
        self.env.reset(sr);
    }

    #[inline]
    fn next(&mut self) -> f64 {
        if let Some(p) = self.rx.as_mut().and_then(ParamReceiver::latest) {
            self.set_params(p);
        }
        let x = self.osc.render_outputs().get(self.params.waveform);
        let y = self.filter.process(x);
        let amp = self.env.render() / PEAK_ENV_VOLTAGE;
        y * amp * self.params.level
    }
}
