//! Slew-limited gain for click-free level changes.
//!
//! A gain that jumps between blocks produces an audible click. [`SlewedGain`]
//! ramps linearly from its current value to a new target at a bounded rate:
//! a full-scale change (0.0 to 1.0) takes `slew_time_ms`. Smaller changes take
//! proportionally less time.
//!
//! ## Usage
//!
//! ```rust
//! use mixtree_core::SlewedGain;
//!
//! let mut gain = SlewedGain::new(1.0);
//! gain.set_sample_rate(48000);
//! gain.set_slew_time_ms(20.0);
//!
//! gain.set_target(0.5);
//! for _ in 0..480 {
//!     let g = gain.next_gain();
//!     // multiply the frame by `g`
//!     # let _ = g;
//! }
//! assert!(gain.is_settled());
//! ```

/// Linear gain ramp with a rate limit expressed as full-scale slew time.
///
/// The ramp is sample-accurate: [`next_gain`](Self::next_gain) returns the
/// value for the current frame and then advances one step, so a ramp that
/// spans several blocks is continuous across block boundaries.
#[derive(Debug, Clone)]
pub struct SlewedGain {
    /// Gain for the next frame.
    current: f32,
    /// Gain being ramped towards.
    target: f32,
    /// Per-frame increment of the active ramp (signed).
    increment: f32,
    /// Frames left in the active ramp.
    frames_remaining: u32,
    /// Sample rate in Hz. Zero means "not yet bound"; changes are instant.
    sample_rate: u32,
    /// Time for a full-scale (0..1) change, in milliseconds.
    slew_time_ms: f32,
}

impl SlewedGain {
    /// Creates a settled gain at `initial` with instant changes.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            frames_remaining: 0,
            sample_rate: 0,
            slew_time_ms: 0.0,
        }
    }

    /// Creates a settled gain with a sample rate and slew time.
    pub fn with_config(initial: f32, sample_rate: u32, slew_time_ms: f32) -> Self {
        let mut gain = Self::new(initial);
        gain.sample_rate = sample_rate;
        gain.slew_time_ms = slew_time_ms;
        gain
    }

    /// Largest per-frame change, or `None` when changes are instant.
    fn max_step(&self) -> Option<f32> {
        if self.slew_time_ms <= 0.0 || self.sample_rate == 0 {
            None
        } else {
            Some(1000.0 / (self.slew_time_ms * self.sample_rate as f32))
        }
    }

    /// Sets a new target. The ramp starts from the current value.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;

        let diff = target - self.current;
        match self.max_step() {
            Some(step) if diff != 0.0 => {
                // Small bias keeps exact multiples of `step` from rounding up a frame.
                let frames = (diff.abs() / step - 1e-4).ceil().max(1.0) as u32;
                self.increment = diff / frames as f32;
                self.frames_remaining = frames;
            }
            _ => self.snap_to_target(),
        }
    }

    /// Rebinds the sample rate. An active ramp keeps its per-frame step.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Sets the full-scale slew time. `0.0` makes changes instant.
    pub fn set_slew_time_ms(&mut self, slew_time_ms: f32) {
        self.slew_time_ms = slew_time_ms.max(0.0);
        if self.slew_time_ms == 0.0 {
            self.snap_to_target();
        }
    }

    /// Returns the gain for this frame and advances the ramp by one frame.
    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        let out = self.current;
        if self.frames_remaining > 0 {
            self.frames_remaining -= 1;
            if self.frames_remaining == 0 {
                self.current = self.target;
            } else {
                self.current += self.increment;
            }
        }
        out
    }

    /// Gain the next frame will use.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// `true` once the ramp has reached its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.frames_remaining == 0
    }

    /// Jumps to the target immediately.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
        self.increment = 0.0;
        self.frames_remaining = 0;
    }
}

impl Default for SlewedGain {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_without_slew_time() {
        let mut gain = SlewedGain::with_config(1.0, 48000, 0.0);
        gain.set_target(0.25);
        assert!(gain.is_settled());
        assert_eq!(gain.next_gain(), 0.25);
    }

    #[test]
    fn instant_before_sample_rate_is_bound() {
        let mut gain = SlewedGain::new(1.0);
        gain.set_slew_time_ms(50.0);
        gain.set_target(0.0);
        assert_eq!(gain.get(), 0.0);
    }

    #[test]
    fn half_scale_takes_half_the_slew_time() {
        // 10 ms full scale at 1 kHz = 0.1 per frame.
        let mut gain = SlewedGain::with_config(1.0, 1000, 10.0);
        gain.set_target(0.5);

        let ramp: Vec<f32> = (0..5).map(|_| gain.next_gain()).collect();
        let expected = [1.0, 0.9, 0.8, 0.7, 0.6];
        for (got, want) in ramp.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "got {got}, want {want}");
        }
        assert!(gain.is_settled());
        assert_eq!(gain.get(), 0.5);
    }

    #[test]
    fn retarget_mid_ramp_starts_from_current() {
        let mut gain = SlewedGain::with_config(0.0, 1000, 10.0);
        gain.set_target(1.0);
        for _ in 0..3 {
            gain.next_gain();
        }
        let here = gain.get();
        gain.set_target(0.0);
        assert!((gain.next_gain() - here).abs() < 1e-6);
        assert!(gain.get() < here);
    }

    #[test]
    fn zeroing_slew_time_snaps() {
        let mut gain = SlewedGain::with_config(1.0, 48000, 100.0);
        gain.set_target(0.0);
        gain.next_gain();
        gain.set_slew_time_ms(0.0);
        assert!(gain.is_settled());
        assert_eq!(gain.get(), 0.0);
    }
}
