#![cfg_attr(not(feature = "std"), no_std)]
//! adsp core: no_std-ready analog-modeled DSP kernels.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use the `libm` math backend
//! - `fast-math`: rational saturator and sin/cos prewarp instead of tanh/tan
//! - `serde`    : `Serialize`/`Deserialize` on every parameter record
//!
//! Modules
//! - [`dsp`]         : math backend, denormal flush, conversions, smoothing
//! - [`volt`]        : volt-per-octave pitch control
//! - [`kernel`]      : the `reset` / `set_parameters` / `process` contract
//! - [`error`]       : control-path parameter validation
//! - [`biquad`]      : second-order evaluator, four realizations
//! - [`filters`]     : bilinear RC, all-pass and Sallen-Key filters
//! - [`tpt`]         : zero-delay-feedback stages, ladder and Sallen-Key networks
//! - [`envelopes`]   : ADSR state machine
//! - [`oscillators`] : naive and EPTR oscillators, noise
//!
//! Design
//! - No heap allocations; every kernel owns its state outright
//! - Audio-rate calls never fail; validation is opt-in via [`error::Validate`]
//! - Every state-register write goes through [`dsp::flush_denormal`]

pub mod biquad;
pub mod dsp;
pub mod envelopes;
pub mod error;
pub mod filters;
pub mod kernel;
pub mod oscillators;
pub mod tpt;
pub mod volt;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::biquad::{Biquad, BiquadParams, Coefficients, Realization, Registers};
    pub use crate::dsp::{
        clip, db_to_raw_gain, flush_denormal, freq_to_pitch, pitch_to_freq, raw_gain_to_db,
        saturate, Smooth1P,
    };
    pub use crate::envelopes::{Adsr, AdsrParams, AdsrStage, PEAK_ENV_VOLTAGE};
    pub use crate::error::{ParamError, Validate};
    pub use crate::filters::{ApHp1, ApLp1, CutoffParams, RcHp1, RcLp1, SkHp2, SkLp2};
    pub use crate::kernel::{Filter, Kernel};
    pub use crate::oscillators::{
        Noise, OscEptr, OscOutputs, OscTrivial, Oscillator, OscillatorKind, OscillatorParams,
        Waveform,
    };
    pub use crate::tpt::{
        LadderHp4, LadderLp4, ResonantParams, SkHp2Tpt, TptHp1, TptLp1, TptParams, ZdfStage,
    };
    pub use crate::volt::VoltPerOct;
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let _ = db_to_raw_gain(-6.0_f64);
        let mut env = Adsr::default();
        env.gate_on();
        let _ = env.render();
        let mut lp = RcLp1::new(1000.0, 48_000.0);
        let _ = lp.process(0.1);
        let mut ladder = LadderLp4::default();
        let _ = ladder.process(0.1);
        let _ = Oscillator::default().render_outputs();
    }
}
