//! Per-run timing collected by
//! [`StyleFilterEngine::run_with_diagnostics`](crate::StyleFilterEngine::run_with_diagnostics).
//!
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations serialize as fractional seconds (`f64`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{StyleCatalog, StyleId};
use crate::types::duration_serde;

/// Diagnostics collected from a single engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Style that was applied.
    pub style: StyleId,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Whether the style's model was already cached when the run began.
    pub cache_hit: bool,
    /// Time spent waiting for the model (seconds).
    #[serde(with = "duration_serde")]
    pub acquisition: Duration,
    /// Time spent in normalize, pipeline, and denormalize (seconds).
    #[serde(with = "duration_serde")]
    pub render: Duration,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total: Duration,
}

impl RunDiagnostics {
    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Format as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Style Run Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Style: {} ({})",
            StyleCatalog::describe(self.style).name,
            self.style,
        ));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.width,
            self.height,
            self.pixel_count(),
        ));
        lines.push(format!(
            "Model: {}",
            if self.cache_hit { "cached" } else { "acquired" },
        ));
        lines.push(String::new());

        lines.push(format!("{:<24} {:>10} {:>10}", "Stage", "Duration", "% Total"));
        lines.push("-".repeat(48));

        let total_ms = duration_ms(self.total);
        for (name, duration) in [("Model acquisition", self.acquisition), ("Render", self.render)] {
            let ms = duration_ms(duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%"));
        }
        lines.push(format!("{:<24} {total_ms:>8.3}ms", "Total"));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
