//! Additive and multiplicative perturbations: random noise, brightness
//! jitter, and a sinusoidal ripple.
//!
//! Random primitives take the generator explicitly so a caller holding
//! a seeded [`StdRng`](rand::rngs::StdRng) gets reproducible output.

use rand::Rng;
use rand::distr::{Distribution, Uniform};
use rand_distr::Normal;

use crate::buffer::PixelBuffer;
use crate::types::EngineError;

fn uniform(lo: f32, hi: f32) -> Result<Uniform<f32>, EngineError> {
    Uniform::new(lo, hi)
        .map_err(|e| EngineError::PipelineFailure(format!("invalid noise range {lo}..{hi}: {e}")))
}

/// Add independent uniform noise in `lo..hi` to every sample.
///
/// # Errors
///
/// Returns [`EngineError::PipelineFailure`] if `lo >= hi` or either
/// bound is not finite.
pub fn add_uniform_noise<R: Rng + ?Sized>(
    buf: &PixelBuffer,
    lo: f32,
    hi: f32,
    rng: &mut R,
) -> Result<PixelBuffer, EngineError> {
    let dist = uniform(lo, hi)?;
    let data = buf.samples().iter().map(|v| v + dist.sample(rng)).collect();
    Ok(buf.with_data(buf.scale(), data))
}

/// Add independent Gaussian noise with the given mean and standard
/// deviation to every sample.
///
/// # Errors
///
/// Returns [`EngineError::PipelineFailure`] if `stddev` is negative or
/// not finite.
pub fn add_gaussian_noise<R: Rng + ?Sized>(
    buf: &PixelBuffer,
    mean: f32,
    stddev: f32,
    rng: &mut R,
) -> Result<PixelBuffer, EngineError> {
    let dist = Normal::new(mean, stddev).map_err(|e| {
        EngineError::PipelineFailure(format!("invalid gaussian noise (stddev {stddev}): {e}"))
    })?;
    let data = buf.samples().iter().map(|v| v + dist.sample(rng)).collect();
    Ok(buf.with_data(buf.scale(), data))
}

/// Multiply every sample by its own random factor in `lo..hi`.
///
/// Channels are drawn independently, so the jitter shifts hue slightly
/// as well as brightness.
///
/// # Errors
///
/// Returns [`EngineError::PipelineFailure`] if `lo >= hi` or either
/// bound is not finite.
pub fn brightness_jitter<R: Rng + ?Sized>(
    buf: &PixelBuffer,
    lo: f32,
    hi: f32,
    rng: &mut R,
) -> Result<PixelBuffer, EngineError> {
    let dist = uniform(lo, hi)?;
    let data = buf.samples().iter().map(|v| v * dist.sample(rng)).collect();
    Ok(buf.with_data(buf.scale(), data))
}

/// Add `sin((x + y) / wavelength) * amplitude` to every channel.
///
/// Produces diagonal ripples. A non-positive `wavelength` leaves the
/// buffer unchanged.
#[must_use = "returns the displaced buffer"]
#[allow(clippy::cast_precision_loss)]
pub fn wave_displace(buf: &PixelBuffer, wavelength: f32, amplitude: f32) -> PixelBuffer {
    if wavelength <= 0.0 {
        return buf.clone();
    }
    buf.map_pixels(|x, y, px| {
        let offset = ((x as f32 + y as f32) / wavelength).sin() * amplitude;
        px.map(|v| v + offset)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::buffer::SampleScale;

    fn gray(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::filled(width, height, SampleScale::Unit, [0.5; 3]).unwrap()
    }

    #[test]
    fn uniform_noise_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let noisy = add_uniform_noise(&gray(32, 32), -0.03, 0.03, &mut rng).unwrap();
        for v in noisy.samples() {
            assert!((0.469..=0.531).contains(v), "sample {v} outside 0.5 ± 0.03");
        }
        assert!(noisy.samples().iter().any(|v| (v - 0.5).abs() > 1e-4));
    }

    #[test]
    fn uniform_noise_is_independent_per_channel() {
        let mut rng = StdRng::seed_from_u64(2);
        let noisy = add_uniform_noise(&gray(16, 16), -0.1, 0.1, &mut rng).unwrap();
        let differing = noisy.pixels().filter(|p| p[0] != p[1]).count();
        assert!(differing > 200, "only {differing} pixels had distinct channels");
    }

    #[test]
    fn uniform_noise_rejects_empty_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let result = add_uniform_noise(&gray(2, 2), 0.1, 0.1, &mut rng);
        assert!(matches!(result, Err(EngineError::PipelineFailure(_))));
    }

    #[test]
    fn gaussian_noise_has_roughly_requested_spread() {
        let mut rng = StdRng::seed_from_u64(4);
        let noisy = add_gaussian_noise(&gray(64, 64), 0.0, 0.05, &mut rng).unwrap();
        let deltas: Vec<f32> = noisy.samples().iter().map(|v| v - 0.5).collect();
        let n = deltas.len() as f32;
        let mean = deltas.iter().sum::<f32>() / n;
        let var = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f32>() / n;
        assert!(mean.abs() < 0.005, "mean {mean}");
        assert!((var.sqrt() - 0.05).abs() < 0.005, "stddev {}", var.sqrt());
    }

    #[test]
    fn gaussian_noise_rejects_negative_stddev() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(add_gaussian_noise(&gray(2, 2), 0.0, -1.0, &mut rng).is_err());
    }

    #[test]
    fn same_seed_same_noise() {
        let a = add_uniform_noise(&gray(8, 8), -0.5, 0.5, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = add_uniform_noise(&gray(8, 8), -0.5, 0.5, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn brightness_jitter_draws_each_channel_independently() {
        let buf = PixelBuffer::filled(8, 8, SampleScale::Unit, [0.8, 0.4, 0.2]).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let jittered = brightness_jitter(&buf, 0.9, 1.1, &mut rng).unwrap();
        let mut hue_shifted = 0;
        for p in jittered.pixels() {
            let factors = [p[0] / 0.8, p[1] / 0.4, p[2] / 0.2];
            for f in factors {
                assert!((0.899..=1.101).contains(&f), "factor {f}");
            }
            if (factors[0] - factors[1]).abs() > 1e-4 {
                hue_shifted += 1;
            }
        }
        assert!(hue_shifted > 32, "only {hue_shifted} of 64 pixels had distinct channel factors");
    }

    #[test]
    fn wave_is_zero_on_origin_and_follows_diagonals() {
        let waved = wave_displace(&gray(20, 20), 15.0, 0.1);
        assert_eq!(waved.pixel(0, 0), Some([0.5; 3]));
        // Same x + y gives the same offset.
        assert_eq!(waved.pixel(3, 7), waved.pixel(7, 3));
        let expected = 0.5 + (10.0_f32 / 15.0).sin() * 0.1;
        let [r, _, _] = waved.pixel(4, 6).unwrap();
        assert!((r - expected).abs() < 1e-6);
    }

    #[test]
    fn wave_with_non_positive_wavelength_is_identity() {
        let buf = gray(4, 4);
        assert_eq!(wave_displace(&buf, 0.0, 0.1), buf);
    }
}
