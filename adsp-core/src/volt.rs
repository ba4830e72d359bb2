//! Volt-per-octave pitch control.

use num_traits::Float;

const VOLT_PER_SEMITONE: f64 = 1.0 / 12.0;
const VOLT_PER_CENT: f64 = 1.0 / 1200.0;

/// Converts between control voltage and frequency, 1 V per octave.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VoltPerOct {
    zero_volt_freq: f64,
}

impl VoltPerOct {
    /// C0
    pub const DEFAULT_ZERO_VOLT_FREQ: f64 = 16.35;

    #[inline]
    pub const fn new(zero_volt_freq: f64) -> Self {
        Self { zero_volt_freq }
    }

    #[inline] pub fn set_zero_volt_freq(&mut self, hz: f64) { self.zero_volt_freq = hz; }
    #[inline] pub fn zero_volt_freq(&self) -> f64 { self.zero_volt_freq }

    #[inline]
    pub fn volt_to_freq(&self, volt: f64) -> f64 {
        self.zero_volt_freq * Float::powf(2.0, volt)
    }

    #[inline]
    pub fn freq_to_volt(&self, freq: f64) -> f64 {
        Float::log2(freq / self.zero_volt_freq)
    }

    #[inline]
    pub fn detune_semitones(volt: f64, semitones: f64) -> f64 {
        volt + semitones * VOLT_PER_SEMITONE
    }

    #[inline]
    pub fn detune_cents(volt: f64, cents: f64) -> f64 {
        volt + cents * VOLT_PER_CENT
    }
}

impl Default for VoltPerOct {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ZERO_VOLT_FREQ)
    }
}
