//! Vector math and level conversions for the mixing path.
//!
//! All functions are allocation-free and operate on the prefix of the slices
//! given to them, so callers can pass full-capacity channel slices together
//! with a frame count.
//!
//! # Vector operations
//!
//! - [`fmac`] - `dest += src * scale` (mix accumulate)
//! - [`fmul`] - `dest = src * scale` (overwrite)
//!
//! # Level conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`]
//! - [`frames_to_us`] / [`ms_to_frames`]

/// Fused multiply-accumulate: `dest[i] += src[i] * scale` for `i < frames`.
///
/// # Panics
///
/// Panics if either slice is shorter than `frames`.
#[inline]
pub fn fmac(src: &[f32], scale: f32, frames: usize, dest: &mut [f32]) {
    for (d, &s) in dest[..frames].iter_mut().zip(&src[..frames]) {
        *d += s * scale;
    }
}

/// Scaled copy: `dest[i] = src[i] * scale` for `i < frames`.
///
/// # Panics
///
/// Panics if either slice is shorter than `frames`.
#[inline]
pub fn fmul(src: &[f32], scale: f32, frames: usize, dest: &mut [f32]) {
    for (d, &s) in dest[..frames].iter_mut().zip(&src[..frames]) {
        *d = s * scale;
    }
}

/// Convert decibels to linear gain.
///
/// ```rust
/// use mixtree_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear gain to decibels. Values at or below zero floor at -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.max(1e-10).log10()
}

/// Convert a frame count to whole microseconds at `sample_rate`.
///
/// # Panics
///
/// Panics if `sample_rate` is zero.
#[inline]
pub fn frames_to_us(frames: usize, sample_rate: u32) -> u64 {
    assert!(sample_rate > 0, "sample rate must be bound before converting frames");
    frames as u64 * 1_000_000 / u64::from(sample_rate)
}

/// Convert milliseconds to a whole number of frames (rounded to nearest).
#[inline]
pub fn ms_to_frames(ms: f32, sample_rate: u32) -> usize {
    (ms.max(0.0) * sample_rate as f32 / 1000.0).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmac_accumulates_prefix_only() {
        let src = [1.0, 2.0, 3.0];
        let mut dest = [1.0, 1.0, 1.0];
        fmac(&src, 0.5, 2, &mut dest);
        assert_eq!(dest, [1.5, 2.0, 1.0]);
    }

    #[test]
    fn fmul_overwrites() {
        let src = [1.0, -2.0];
        let mut dest = [9.0, 9.0];
        fmul(&src, 0.25, 2, &mut dest);
        assert_eq!(dest, [0.25, -0.5]);
    }

    #[test]
    fn db_round_trip() {
        for db in [-40.0, -6.0, 0.0, 6.0] {
            assert!((linear_to_db(db_to_linear(db)) - db).abs() < 1e-3);
        }
    }

    #[test]
    fn frames_to_us_exact() {
        assert_eq!(frames_to_us(48, 48000), 1000);
        assert_eq!(frames_to_us(441, 44100), 10_000);
        assert_eq!(frames_to_us(0, 16000), 0);
    }

    #[test]
    fn ms_to_frames_rounds() {
        assert_eq!(ms_to_frames(10.0, 48000), 480);
        assert_eq!(ms_to_frames(-1.0, 48000), 0);
    }
}
