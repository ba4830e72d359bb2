//! Realtime generator core.
//!
//! This module defines the minimal `Generator` trait and a lightweight `Engine<G>`
//! wrapper that owns a generator (usually a [`crate::voice::Voice`]), tracks the
//! sample rate and elapsed frames, and produces one **mono** sample at a time
//! with zero heap work per sample.
//!
//! Design goals
//! - No dynamic allocations in the audio thread
//! - SR changes handled lazily (if the host reconfigures), with cheap branching
//! - Generic over the generator type, so voices can be swapped without trait objects

use adsp_core::kernel::DEFAULT_SAMPLE_RATE;
use log::{debug, info};

/// Anything that can generate one sample at a time.
pub trait Generator {
    /// Called when the engine is (re)initialized or when the sample rate changes.
    fn reset(&mut self, sr: f64);

    /// Generate the next mono sample. Implementations should assume the sample
    /// rate has been communicated via `reset`.
    fn next(&mut self) -> f64;
}

/// Lightweight realtime engine that owns a generator.
///
/// The audio callback calls `next(sr)` for every output sample. If the host
/// reports a different `sr`, the generator is `reset` once and continues.
pub struct Engine<G: Generator> {
    sr: f64,
    frames: u64,
    gen: G,
}

impl<G: Generator> Engine<G> {
    /// Construct with an already-configured generator, reset at the default rate.
    #[inline]
    pub fn new(gen: G) -> Self {
        Self::with_sample_rate(gen, DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(mut gen: G, sr: f64) -> Self {
        gen.reset(sr);
        debug!("engine created at {sr} Hz");
        Self { sr, frames: 0, gen }
    }

    /// Control-path sample-rate change.
    pub fn set_sample_rate(&mut self, sr: f64) {
        if sr != self.sr {
            debug!("engine sample rate {} Hz -> {sr} Hz", self.sr);
            self.apply_sample_rate(sr);
        }
    }

    /// Produce **one** mono sample at the given sample rate.
    #[inline]
    pub fn next(&mut self, sr: f64) -> f64 {
        if sr != self.sr {
            self.apply_sample_rate(sr);
        }
        self.frames += 1;
        self.gen.next()
    }

    /// Fill `out` at the current sample rate.
    #[inline]
    pub fn process_block(&mut self, out: &mut [f64]) {
        for s in out.iter_mut() {
            *s = self.gen.next();
        }
        self.frames += out.len() as u64;
    }

    #[inline] pub fn sample_rate(&self) -> f64 { self.sr }

    /// Frames rendered since construction.
    #[inline] pub fn frames(&self) -> u64 { self.frames }

    /// Elapsed time in seconds at the current sample rate.
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    pub fn time(&self) -> f64 {
        self.frames as f64 / self.sr
    }

    /// Replace the inner generator without allocating; the new one is reset
    /// at the current rate.
    pub fn swap_generator(&mut self, mut next: G) {
        next.reset(self.sr);
        self.gen = next;
        info!("engine generator swapped at frame {}", self.frames);
    }

    /// Mutable access for live parameter tweaks from the owning thread.
    #[inline]
    pub fn generator_mut(&mut self) -> &mut G { &mut self.gen }

    #[inline]
    fn apply_sample_rate(&mut self, sr: f64) {
        self.sr = sr;
        self.gen.reset(sr);
    }
}
