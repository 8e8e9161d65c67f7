//! The style filter engine: resolve a style, make sure its model is
//! ready, and run its pixel pipeline.
//!
//! [`StyleFilterEngine::run`] is the one-call entry point. Drivers that
//! need to report progress between the two phases (see
//! [`Studio`](crate::Studio)) call [`prepare`](StyleFilterEngine::prepare)
//! and then [`apply`] themselves.

use rand::SeedableRng;
use rand::rngs::StdRng;
use web_time::Instant;

use crate::buffer::PixelBuffer;
use crate::cache::{ModelCache, ModelHandle, ModelLoader, SimulatedLoader};
use crate::catalog::{StyleCatalog, StyleId};
use crate::diagnostics::RunDiagnostics;
use crate::styles;
use crate::types::{EngineConfig, EngineError};

/// Turns a decoded image plus a style identifier into a styled image.
///
/// The engine owns the [`ModelCache`], so one engine should be shared
/// (e.g. behind an `Arc`) by everything that runs styles.
#[derive(Debug)]
pub struct StyleFilterEngine<L = SimulatedLoader> {
    cache: ModelCache<L>,
    config: EngineConfig,
}

impl StyleFilterEngine<SimulatedLoader> {
    /// Create an engine whose models are simulated with the configured
    /// acquisition delay.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_loader(config, SimulatedLoader::new(config.acquisition))
    }
}

impl Default for StyleFilterEngine<SimulatedLoader> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<L: ModelLoader> StyleFilterEngine<L> {
    /// Create an engine backed by a custom model loader.
    ///
    /// `config.acquisition` is ignored; the loader decides its own timing.
    #[must_use]
    pub fn with_loader(config: EngineConfig, loader: L) -> Self {
        Self {
            cache: ModelCache::new(loader),
            config,
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The model readiness cache.
    #[must_use]
    pub const fn cache(&self) -> &ModelCache<L> {
        &self.cache
    }

    /// Apply the style named `style_id` to `input`.
    ///
    /// The input is only read; the result is a fresh byte-scale buffer
    /// with the same dimensions.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnsupportedStyle`] if `style_id` is not in the
    ///   catalog. No model is acquired in that case.
    /// - [`EngineError::AcquisitionFailure`] if the model cannot be made
    ///   ready.
    /// - [`EngineError::PipelineFailure`] if a pipeline stage fails.
    pub async fn run(&self, input: &PixelBuffer, style_id: &str) -> Result<PixelBuffer, EngineError> {
        let (output, _) = self.run_with_diagnostics(input, style_id).await?;
        Ok(output)
    }

    /// Like [`run`](Self::run), also reporting where the time went.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_with_diagnostics(
        &self,
        input: &PixelBuffer,
        style_id: &str,
    ) -> Result<(PixelBuffer, RunDiagnostics), EngineError> {
        let start = Instant::now();
        let style = StyleCatalog::resolve(style_id)?.id;
        let cache_hit = self.cache.is_ready(style);

        self.prepare(style).await?;
        let acquisition = start.elapsed();

        let render_start = Instant::now();
        let output = apply(input, style, self.config.noise_seed)?;
        let render = render_start.elapsed();

        let diagnostics = RunDiagnostics {
            style,
            width: output.width(),
            height: output.height(),
            cache_hit,
            acquisition,
            render,
            total: start.elapsed(),
        };
        Ok((output, diagnostics))
    }

    /// Make the model for `style` ready. This is the only suspension
    /// point of a run.
    ///
    /// # Errors
    ///
    /// [`EngineError::AcquisitionFailure`] from the loader.
    pub async fn prepare(&self, style: StyleId) -> Result<ModelHandle, EngineError> {
        self.cache.ensure_ready(style).await
    }

    /// [`apply`] with this engine's noise seed.
    ///
    /// # Errors
    ///
    /// Same as [`apply`].
    pub fn apply(&self, input: &PixelBuffer, style: StyleId) -> Result<PixelBuffer, EngineError> {
        apply(input, style, self.config.noise_seed)
    }
}

/// Run the pixel pipeline for `style`: normalize to unit scale, render,
/// then denormalize to byte scale with rounding and clipping.
///
/// Synchronous and CPU-bound. `noise_seed` of `Some` makes the noise
/// stages reproducible; `None` seeds them from the operating system.
///
/// # Errors
///
/// [`EngineError::PipelineFailure`] if the input holds a NaN or infinite
/// sample, or a pipeline stage fails.
pub fn apply(
    input: &PixelBuffer,
    style: StyleId,
    noise_seed: Option<u64>,
) -> Result<PixelBuffer, EngineError> {
    input.ensure_finite()?;
    let mut rng = noise_seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    tracing::debug!(
        %style,
        width = input.width(),
        height = input.height(),
        seeded = noise_seed.is_some(),
        "applying style pipeline",
    );
    let styled = styles::render(style, &input.normalized(), &mut rng)?;
    Ok(styled.denormalized())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::buffer::SampleScale;
    use crate::types::AcquisitionConfig;

    fn instant_engine(seed: Option<u64>) -> StyleFilterEngine {
        StyleFilterEngine::new(EngineConfig {
            acquisition: AcquisitionConfig::INSTANT,
            noise_seed: seed,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn gradient(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, SampleScale::Byte, |x, y| {
            [
                (x * 255 / width.max(2)) as f32,
                (y * 255 / height.max(2)) as f32,
                128.0,
            ]
        })
        .unwrap()
    }

    fn assert_byte_image(buf: &PixelBuffer) {
        assert_eq!(buf.scale(), SampleScale::Byte);
        for &v in buf.samples() {
            assert!((0.0..=255.0).contains(&v), "sample {v} out of range");
            assert!((v - v.round()).abs() < f32::EPSILON, "sample {v} not integral");
        }
    }

    #[tokio::test]
    async fn every_style_keeps_shape_and_byte_range() {
        let engine = instant_engine(Some(3));
        for (w, h) in [(1, 1), (3, 7), (40, 25)] {
            let input = gradient(w, h);
            for descriptor in StyleCatalog::list() {
                let out = engine.run(&input, descriptor.id.as_str()).await.unwrap();
                assert_eq!(out.dimensions(), input.dimensions(), "{}", descriptor.id);
                assert_eq!(out.samples().len(), input.samples().len());
                assert_byte_image(&out);
            }
        }
    }

    #[tokio::test]
    async fn adversarial_samples_are_clipped() {
        let engine = instant_engine(Some(4));
        let data = (0..8 * 8 * 3)
            .map(|i| if i % 2 == 0 { 10_000.0 } else { -500.0 })
            .collect();
        let input = PixelBuffer::new(8, 8, SampleScale::Byte, data).unwrap();
        for id in StyleId::ALL {
            let out = engine.run(&input, id.as_str()).await.unwrap();
            assert_byte_image(&out);
        }
    }

    #[tokio::test]
    async fn non_finite_samples_fail_every_style() {
        let engine = instant_engine(Some(4));
        let clean = PixelBuffer::filled(16, 16, SampleScale::Byte, [90.0; 3]).unwrap();
        for bad in [f32::NAN, f32::INFINITY] {
            // Buffers built through `map_pixels` skip the constructor check.
            let input = clean.map_pixels(|x, y, px| {
                if (x, y) == (5, 9) { [px[0], bad, px[2]] } else { px }
            });
            for id in StyleId::ALL {
                let err = engine.run(&input, id.as_str()).await.unwrap_err();
                assert!(matches!(err, EngineError::PipelineFailure(_)), "{id}: {err}");
            }
        }
    }

    #[tokio::test]
    async fn unknown_style_returns_no_buffer_and_acquires_nothing() {
        let engine = instant_engine(None);
        let err = engine.run(&gradient(4, 4), "cubism").await.unwrap_err();
        assert_eq!(err, EngineError::UnsupportedStyle("cubism".to_string()));
        assert_eq!(engine.cache().ready_count(), 0);
    }

    #[tokio::test]
    async fn input_is_not_mutated() {
        let engine = instant_engine(None);
        let input = gradient(16, 16);
        let before = input.clone();
        let _ = engine.run(&input, "oil-painting").await.unwrap();
        assert_eq!(input, before);
    }

    #[tokio::test]
    async fn fixed_seed_makes_runs_reproducible() {
        let engine = instant_engine(Some(42));
        let input = gradient(24, 24);
        for id in ["watercolor", "pointillism", "oil-painting"] {
            let a = engine.run(&input, id).await.unwrap();
            let b = engine.run(&input, id).await.unwrap();
            assert_eq!(a, b, "{id}");
        }
    }

    #[tokio::test]
    async fn deterministic_styles_match_free_apply() {
        let engine = instant_engine(None);
        let input = gradient(20, 20);
        let via_engine = engine.run(&input, "mosaic").await.unwrap();
        let direct = apply(&input, StyleId::Mosaic, None).unwrap();
        assert_eq!(via_engine, direct);
    }

    #[tokio::test]
    async fn unit_scale_input_is_accepted() {
        let engine = instant_engine(Some(1));
        let input = PixelBuffer::filled(6, 6, SampleScale::Unit, [0.25, 0.5, 0.75]).unwrap();
        let out = engine.run(&input, "starry-night").await.unwrap();
        assert_byte_image(&out);
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_hits_the_cache() {
        let engine = StyleFilterEngine::default();
        let input = gradient(8, 8);

        let start = tokio::time::Instant::now();
        let (_, first) = engine.run_with_diagnostics(&input, "udnie").await.unwrap();
        assert!(!first.cache_hit);
        assert!(start.elapsed() >= Duration::from_millis(1500));

        let start = tokio::time::Instant::now();
        let (_, second) = engine.run_with_diagnostics(&input, "udnie").await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!((second.width, second.height), (8, 8));
        assert_eq!(second.style, StyleId::Udnie);
    }
}
