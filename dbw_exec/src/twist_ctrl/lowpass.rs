//! # Low pass filter
//!
//! First order exponential smoothing of a noisy scalar signal.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An exponential low pass filter.
#[derive(Debug, Clone, Serialize)]
pub struct LowPassFilter {
    /// Smoothing coefficient, the weight given to each new sample
    a: f64,

    /// The previous filtered value, or `None` if the filter hasn't been fed
    /// a sample since construction or the last reset.
    last_val: Option<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LowPassFilter {

    /// Create a new filter from the time constant `tau_s` and the nominal
    /// sample period `ts_s`.
    ///
    /// The smoothing coefficient is `ts / (tau + ts)`. Both values shall be
    /// positive, which is checked when validating the twist control params.
    pub fn new(tau_s: f64, ts_s: f64) -> Self {
        Self {
            a: ts_s / (tau_s + ts_s),
            last_val: None
        }
    }

    /// Filter a new sample and return the filtered value.
    ///
    /// The first sample after construction or reset is passed through
    /// unchanged.
    pub fn filt(&mut self, sample: f64) -> f64 {
        let val = match self.last_val {
            Some(last) => self.a * sample + (1.0 - self.a) * last,
            None => sample
        };

        self.last_val = Some(val);

        val
    }

    /// Get the last filtered value.
    pub fn get(&self) -> Option<f64> {
        self.last_val
    }

    /// Get the smoothing coefficient.
    pub fn coeff(&self) -> f64 {
        self.a
    }

    /// Forget the previous value, so the next sample seeds the filter again.
    pub fn reset(&mut self) {
        self.last_val = None;
    }
}
