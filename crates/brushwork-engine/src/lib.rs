//! brushwork-engine: turn a decoded photo plus a style identifier into
//! a styled image.
//!
//! The crate is layered leaves-first:
//!
//! - [`buffer`]: [`PixelBuffer`] and [`Mask`], the data every stage
//!   passes around.
//! - [`resize`], [`blur`], [`color`], [`edge`], [`mask`], [`noise`]:
//!   numeric filter primitives.
//! - [`catalog`]: the six styles and their wire identifiers.
//! - [`styles`]: one fixed pipeline of primitives per style.
//! - [`cache`]: simulated model acquisition with a per-style readiness
//!   cache.
//! - [`engine`]: [`StyleFilterEngine`], which resolves, prepares, and
//!   renders.
//! - [`session`] and [`studio`]: the idle → loading model → processing →
//!   complete/error state machine and its async driver with
//!   stale-result protection.
//! - [`raster`]: decoding uploads and encoding PNG downloads.
//!
//! Everything except [`raster`] is sans-IO.
//!
//! ```no_run
//! # async fn demo(bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! use brushwork_engine::{EngineConfig, IngestConfig, StyleFilterEngine, raster};
//!
//! let engine = StyleFilterEngine::new(EngineConfig::default());
//! let input = raster::ingest(bytes, &IngestConfig::default())?;
//! let styled = engine.run(&input, "starry-night").await?;
//! let png = raster::encode_png(&styled)?;
//! # let _ = png;
//! # Ok(())
//! # }
//! ```

pub mod blur;
pub mod buffer;
pub mod cache;
pub mod catalog;
pub mod color;
pub mod diagnostics;
pub mod edge;
pub mod engine;
pub mod mask;
pub mod noise;
pub mod raster;
pub mod resize;
pub mod session;
pub mod studio;
pub mod styles;
pub mod types;

pub use buffer::{CHANNELS, Mask, PixelBuffer, SampleScale};
pub use cache::{ModelCache, ModelHandle, ModelLoader, SimulatedLoader};
pub use catalog::{StyleCatalog, StyleDescriptor, StyleId};
pub use diagnostics::RunDiagnostics;
pub use engine::{StyleFilterEngine, apply};
pub use raster::{IngestConfig, RasterError, ResampleFilter};
pub use session::{Delivery, Progress, RunTicket, Session, SessionState};
pub use studio::Studio;
pub use types::{AcquisitionConfig, Dimensions, EngineConfig, EngineError};
