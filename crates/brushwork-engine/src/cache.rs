//! Model acquisition and the per-style readiness cache.
//!
//! Acquiring a style's model is the slow, asynchronous part of a run.
//! [`ModelLoader`] is the seam a real backend plugs into;
//! [`SimulatedLoader`] stands in for it by sleeping for a configured
//! base delay plus random jitter.
//!
//! [`ModelCache`] remembers which styles are ready. The first
//! [`ensure_ready`](ModelCache::ensure_ready) for a style runs the
//! loader; every later call returns the cached [`ModelHandle`]
//! immediately. Concurrent first calls for the same style share a single
//! acquisition. If the caller driving an acquisition is dropped mid-way,
//! nothing is cached and the next caller starts over.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::sync::OnceCell;
use web_time::Instant;

use crate::catalog::StyleId;
use crate::types::{AcquisitionConfig, EngineError};

/// Marker that a style's model is loaded and usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHandle {
    style: StyleId,
    ready_since: Instant,
}

impl ModelHandle {
    /// The style this model serves.
    #[must_use]
    pub const fn style(&self) -> StyleId {
        self.style
    }

    /// When the acquisition finished.
    #[must_use]
    pub const fn ready_since(&self) -> Instant {
        self.ready_since
    }
}

/// Source of style models.
///
/// Implementations perform whatever work makes a style usable (network
/// fetch, weight upload, ...). Failure is reported as
/// [`EngineError::AcquisitionFailure`].
pub trait ModelLoader: Send + Sync {
    /// Acquire the model for `style`.
    fn acquire(&self, style: StyleId) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// Loader that only waits, simulating download and initialization cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedLoader {
    config: AcquisitionConfig,
}

impl SimulatedLoader {
    /// Create a loader with the given timing.
    #[must_use]
    pub const fn new(config: AcquisitionConfig) -> Self {
        Self { config }
    }

    /// Pick one acquisition delay: `base_delay + jitter * U[0, 1)`.
    #[must_use]
    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let fraction: f64 = rng.random();
        self.config.base_delay + self.config.jitter.mul_f64(fraction)
    }
}

impl ModelLoader for SimulatedLoader {
    fn acquire(&self, style: StyleId) -> impl Future<Output = Result<(), EngineError>> + Send {
        let delay = self.sample_delay(&mut rand::rng());
        async move {
            tracing::info!(%style, ?delay, "acquiring style model");
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

type Slot = Arc<OnceCell<ModelHandle>>;

/// Per-style readiness cache with single-flight acquisition.
///
/// Handles are never evicted; they live as long as the cache.
#[derive(Debug, Default)]
pub struct ModelCache<L> {
    loader: L,
    slots: Mutex<HashMap<StyleId, Slot>>,
}

impl<L: ModelLoader> ModelCache<L> {
    /// Create an empty cache backed by `loader`.
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Make sure the model for `style` is ready, acquiring it on first use.
    ///
    /// Idempotent. While one caller is acquiring, other callers for the
    /// same style wait for that acquisition instead of starting their own.
    ///
    /// # Errors
    ///
    /// Propagates the loader's [`EngineError::AcquisitionFailure`]. Nothing
    /// is cached on failure, so a later call retries.
    pub async fn ensure_ready(&self, style: StyleId) -> Result<ModelHandle, EngineError> {
        let slot = self.slot(style);
        if let Some(handle) = slot.get() {
            tracing::debug!(%style, "style model cache hit");
            return Ok(*handle);
        }
        let handle = slot
            .get_or_try_init(|| async {
                self.loader.acquire(style).await?;
                Ok::<_, EngineError>(ModelHandle {
                    style,
                    ready_since: Instant::now(),
                })
            })
            .await?;
        Ok(*handle)
    }

    /// The cached handle for `style`, if its model is ready.
    #[must_use]
    pub fn get(&self, style: StyleId) -> Option<ModelHandle> {
        self.lock_slots()
            .get(&style)
            .and_then(|slot| slot.get().copied())
    }

    /// Whether the model for `style` is ready.
    #[must_use]
    pub fn is_ready(&self, style: StyleId) -> bool {
        self.get(style).is_some()
    }

    /// Number of styles whose model is ready.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.lock_slots()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// The loader backing this cache.
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    fn slot(&self, style: StyleId) -> Slot {
        Arc::clone(self.lock_slots().entry(style).or_default())
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<StyleId, Slot>> {
        // The map is only ever mutated by `entry().or_default()`, which
        // cannot leave it half-updated.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
