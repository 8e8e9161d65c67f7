//! brushwork: apply an artistic style to an image file.
//!
//! Stands in for the upload, progress, and download collaborators around
//! the style filter engine: reads and validates an image, drives a
//! [`Studio`] session through its states, writes the styled PNG, and
//! prints per-run timing.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin brushwork -- --style starry-night photo.jpg
//! cargo run --release --bin brushwork -- --list-styles
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use brushwork_engine::{
    AcquisitionConfig, EngineConfig, IngestConfig, RunDiagnostics, SessionState, StyleCatalog,
    StyleFilterEngine, Studio, raster,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Apply one of brushwork's artistic styles to an image.
///
/// The first run of a style waits for its model to load; pass `--runs 2`
/// or more to see later runs hit the model cache.
#[derive(Parser)]
#[command(name = "brushwork", version)]
struct Cli {
    /// Path to the input image (JPEG, PNG, WebP).
    #[arg(required_unless_present = "list_styles")]
    image_path: Option<PathBuf>,

    /// Style identifier (see `--list-styles`).
    #[arg(long, required_unless_present = "list_styles")]
    style: Option<String>,

    /// Where to write the styled PNG. Defaults to `styled_<style>.png`
    /// in the current directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Seed for the noise stages; makes output reproducible.
    #[arg(long)]
    seed: Option<u64>,

    /// Fixed part of the simulated model loading delay, in milliseconds.
    #[arg(long, default_value_t = duration_ms(AcquisitionConfig::DEFAULT_BASE_DELAY))]
    base_delay_ms: u64,

    /// Upper bound of the random extra loading delay, in milliseconds.
    #[arg(long, default_value_t = duration_ms(AcquisitionConfig::DEFAULT_JITTER))]
    jitter_ms: u64,

    /// Longest image side after ingest; larger images are shrunk.
    #[arg(long, default_value_t = IngestConfig::DEFAULT_MAX_DIMENSION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_dimension: u32,

    /// Number of runs.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// List the available styles and exit.
    #[arg(long)]
    list_styles: bool,

    /// Full engine config as a JSON string.
    ///
    /// When provided, `--seed`, `--base-delay-ms`, and `--jitter-ms` are
    /// ignored. The JSON must be a valid `EngineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

const fn duration_ms(d: Duration) -> u64 {
    // Both defaults are well below u64::MAX milliseconds.
    #[allow(clippy::cast_possible_truncation)]
    let ms = d.as_millis() as u64;
    ms
}

/// Build an [`EngineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual engine flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<EngineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(EngineConfig {
        acquisition: AcquisitionConfig {
            base_delay: Duration::from_millis(cli.base_delay_ms),
            jitter: Duration::from_millis(cli.jitter_ms),
        },
        noise_seed: cli.seed,
    })
}

fn print_styles() {
    println!("{:<16} {:<20} Description", "Id", "Name");
    println!("{}", "-".repeat(64));
    for style in StyleCatalog::list() {
        println!("{:<16} {:<20} {}", style.id, style.name, style.description);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_styles {
        print_styles();
        return ExitCode::SUCCESS;
    }

    let (Some(image_path), Some(style_id)) = (cli.image_path.as_deref(), cli.style.as_deref()) else {
        eprintln!("An image path and --style are required");
        return ExitCode::FAILURE;
    };

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let ingest = IngestConfig {
        max_dimension: cli.max_dimension,
        ..IngestConfig::default()
    };
    let input = match raster::ingest(&image_bytes, &ingest) {
        Ok(buf) => buf,
        Err(e) => {
            eprintln!("Error loading {}: {e}", image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes, {}x{} after ingest)",
        image_path.display(),
        image_bytes.len(),
        input.width(),
        input.height(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let studio = Studio::new(Arc::new(StyleFilterEngine::new(config)));
    let style = match studio.select_style(style_id) {
        Ok(style) => style,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Run with --list-styles to see the available styles.");
            return ExitCode::FAILURE;
        }
    };
    studio.upload(input);

    let mut progress = studio.subscribe_progress();
    let progress_log = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let current = progress.borrow_and_update().clone();
            tracing::info!(state = %current.state, "{}", current.message);
        }
    });

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        if let Err(e) = studio.generate().await {
            eprintln!("Cannot start run: {e}");
            return ExitCode::FAILURE;
        }
        if studio.state() != SessionState::Complete {
            eprintln!(
                "Style error: {}",
                studio.last_error().unwrap_or_else(|| "run did not complete".to_string()),
            );
            return ExitCode::FAILURE;
        }

        if let Some(diagnostics) = studio.last_run() {
            if cli.json {
                match serde_json::to_string_pretty(&diagnostics) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Error serializing diagnostics: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{}", diagnostics.report());
            }
            all_diagnostics.push(diagnostics);
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Write the image from the last run.
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(raster::download_name(style)));
    if let Err(msg) = write_output(&studio, &output_path) {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    drop(studio);
    if let Err(e) = progress_log.await {
        eprintln!("Progress logger failed: {e}");
    }

    ExitCode::SUCCESS
}

fn write_output(studio: &Studio, path: &Path) -> Result<(), String> {
    let output = studio
        .output()
        .ok_or_else(|| "No styled output to write".to_string())?;
    let png = raster::encode_png(&output).map_err(|e| format!("Error encoding PNG: {e}"))?;
    std::fs::write(path, &png).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("Styled image written to {} ({} bytes)", path.display(), png.len());
    Ok(())
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[RunDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let totals: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total.as_secs_f64() * 1000.0)
        .collect();
    let min = totals.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = totals.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = totals.iter().sum::<f64>() / totals.len() as f64;
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    let hits = all_diagnostics.iter().filter(|d| d.cache_hit).count();
    println!("Model cache hits: {hits}/{}", all_diagnostics.len());

    let render_mean = all_diagnostics
        .iter()
        .map(|d| d.render.as_secs_f64() * 1000.0)
        .sum::<f64>()
        / all_diagnostics.len() as f64;
    println!("Render mean: {render_mean:.3}ms");
}
