//! Integration test: uploaded bytes through the studio and back out as PNG.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::future::Future;
use std::sync::Arc;

use brushwork_engine::color::quantize;
use brushwork_engine::{
    AcquisitionConfig, Delivery, EngineConfig, EngineError, IngestConfig, ModelLoader,
    PixelBuffer, SampleScale, SessionState, StyleCatalog, StyleFilterEngine, StyleId, Studio, raster,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn photo_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        #[allow(clippy::cast_possible_truncation)]
        image::Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn instant_engine() -> StyleFilterEngine {
    StyleFilterEngine::new(EngineConfig {
        acquisition: AcquisitionConfig::INSTANT,
        noise_seed: Some(2024),
    })
}

#[tokio::test(start_paused = true)]
async fn upload_style_download_every_style() {
    let ingest = IngestConfig {
        max_dimension: 64,
        ..IngestConfig::default()
    };
    let input = raster::ingest(&photo_png(160, 90), &ingest).unwrap();
    assert_eq!((input.width(), input.height()), (64, 36));

    let studio = Studio::new(Arc::new(StyleFilterEngine::new(EngineConfig::default())));
    studio.upload(input);

    for descriptor in StyleCatalog::list() {
        studio.select_style(descriptor.id.as_str()).unwrap();
        let delivery = studio.generate().await.unwrap();
        assert_eq!(delivery, Delivery::Applied, "{}", descriptor.id);
        assert_eq!(studio.state(), SessionState::Complete);

        let output = studio.output().unwrap();
        let png = raster::encode_png(&output).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 36));
        eprintln!(
            "{} -> {} ({} bytes)",
            descriptor.id,
            raster::download_name(descriptor.id),
            png.len(),
        );
    }
    assert_eq!(studio.engine().cache().ready_count(), StyleId::ALL.len());
}

#[tokio::test]
async fn black_image_smaller_than_a_tile_stays_black_through_mosaic() {
    let engine = instant_engine();
    let input = PixelBuffer::filled(4, 4, SampleScale::Byte, [0.0; 3]).unwrap();
    let output = engine.run(&input, "mosaic").await.unwrap();
    assert_eq!(output, input);
}

#[tokio::test]
async fn single_red_pixel_through_watercolor_stays_in_range() {
    let engine = instant_engine();
    let input = PixelBuffer::from_fn(16, 16, SampleScale::Byte, |x, y| {
        if (x, y) == (0, 0) { [255.0, 0.0, 0.0] } else { [0.0; 3] }
    })
    .unwrap();
    let output = engine.run(&input, "watercolor").await.unwrap();
    assert!(output.samples().iter().all(|v| (0.0..=255.0).contains(v)));
    // Red dominates near the origin.
    let [r, g, b] = output.pixel(0, 0).unwrap();
    assert!(r > g && r > b, "origin pixel {r} {g} {b}");
}

#[tokio::test]
async fn unknown_style_never_yields_a_buffer() {
    let engine = instant_engine();
    let input = PixelBuffer::filled(3, 3, SampleScale::Byte, [9.0; 3]).unwrap();
    let result = engine.run(&input, "identity").await;
    assert_eq!(result, Err(EngineError::UnsupportedStyle("identity".to_string())));
}

#[test]
fn quantize_is_idempotent_on_random_buffers() {
    let mut rng = StdRng::seed_from_u64(77);
    for levels in [1, 2, 5, 8, 255] {
        let buf = PixelBuffer::from_fn(9, 7, SampleScale::Unit, |_, _| {
            [rng.random(), rng.random(), rng.random()]
        })
        .unwrap();
        let once = quantize(&buf, levels);
        assert_eq!(quantize(&once, levels), once, "levels {levels}");
    }
}

/// Models that are ready the moment they are asked for.
struct ReadyLoader;

impl ModelLoader for ReadyLoader {
    fn acquire(&self, _style: StyleId) -> impl Future<Output = Result<(), EngineError>> + Send {
        std::future::ready(Ok(()))
    }
}

#[tokio::test]
async fn new_upload_while_processing_discards_the_result() {
    let engine = StyleFilterEngine::with_loader(EngineConfig::default(), ReadyLoader);
    let studio = Studio::new(Arc::new(engine));
    studio.upload(PixelBuffer::filled(256, 256, SampleScale::Byte, [120.0; 3]).unwrap());
    studio.select_style("oil-painting").unwrap();

    let replacement = PixelBuffer::filled(8, 8, SampleScale::Byte, [30.0; 3]).unwrap();
    let (delivery, ()) = tokio::join!(studio.generate(), async {
        while studio.state() != SessionState::Processing {
            tokio::task::yield_now().await;
        }
        studio.upload(replacement.clone());
        assert_eq!(studio.state(), SessionState::Idle);
    });

    assert_eq!(delivery.unwrap(), Delivery::Discarded);
    assert_eq!(studio.state(), SessionState::Idle);
    assert!(studio.output().is_none());
    assert_eq!(studio.progress().message, "Ready");
}
