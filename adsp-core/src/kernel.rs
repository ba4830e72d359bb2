//! The per-kernel contract shared by every processor in this crate.
//!
//! Lifecycle: construct, `reset(sample_rate)` once, then `set_parameters` on
//! the control path and `process` once per sample on the audio path.

/// Sample rate assumed by `Default` constructors until `reset` is called.
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

/// Sample-rate lifecycle and parameter snapshot access.
pub trait Kernel {
    /// Plain value record holding every user-facing parameter.
    type Params: Copy + Default + PartialEq;

    /// Clear state and re-derive sample-rate dependent coefficients.
    fn reset(&mut self, sample_rate: f64);

    /// Current parameter snapshot.
    fn parameters(&self) -> Self::Params;

    /// Replace the parameter snapshot. Derived coefficients are recomputed
    /// only for fields that actually changed.
    fn set_parameters(&mut self, params: Self::Params);
}

/// Single-input single-output audio processor.
pub trait Filter: Kernel {
    fn process(&mut self, x: f64) -> f64;

    /// In-place block processing.
    #[inline]
    fn process_block(&mut self, buf: &mut [f64]) {
        for s in buf {
            *s = self.process(*s);
        }
    }
}
