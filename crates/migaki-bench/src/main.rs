//! migaki-bench: CLI tool for pipeline parameter experimentation and
//! diagnostics.
//!
//! Runs the path-cleaning pipeline on a JSON token file (or a generated
//! test path) with configurable parameters, printing detailed per-stage
//! diagnostics. Useful for:
//!
//! - Tuning the simplification threshold against point-count reduction
//! - Checking how clipping and NaN gaps restructure a path
//! - Measuring per-stage durations to identify bottlenecks
//! - Eyeballing sketch parameters via the SVG output
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin migaki-bench -- [OPTIONS]
//! ```
//!
//! The JSON input format is a serialized [`PathBuffer`]: an object with a
//! `vertices` array of `{ "cmd": "MoveTo", "x": 0.0, "y": 0.0 }` tokens.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use migaki_pipeline::diagnostics::{SystemClock, clean_staged_with_diagnostics};
use migaki_pipeline::{ClipRect, PathBuffer, PipelineConfig, SketchParams, SnapMode};

/// Pipeline parameter experimentation and diagnostics for migaki.
///
/// Cleans a path (from a JSON token file or a generated sine trace) with
/// configurable parameters and prints per-stage timing and token-count
/// diagnostics.
#[derive(Parser)]
#[command(name = "migaki-bench", version)]
struct Cli {
    /// Path to a JSON token file; omit to generate a sine test path.
    input: Option<PathBuf>,

    /// Number of vertices in the generated test path.
    #[arg(long, default_value_t = 10_000)]
    points: usize,

    /// Inject a NaN vertex every N points in the generated path
    /// (0 = none).
    #[arg(long, default_value_t = 0)]
    nan_every: usize,

    /// Clip rectangle as "X1,Y1,X2,Y2" in device pixels.
    #[arg(long, value_name = "RECT")]
    clip: Option<String>,

    /// Pixel snapping policy.
    #[arg(long, value_enum, default_value_t = SnapArg::Auto)]
    snap: SnapArg,

    /// Stroke width in pixels (its parity picks the snap offset).
    #[arg(long, default_value_t = 1.0)]
    stroke_width: f64,

    /// Disable simplification.
    #[arg(long)]
    no_simplify: bool,

    /// Simplification threshold in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SIMPLIFY_THRESHOLD)]
    threshold: f64,

    /// Sketch wiggle amplitude in pixels (0 = no sketch).
    #[arg(long, default_value_t = 0.0)]
    sketch_scale: f64,

    /// Sketch base wavelength in pixels.
    #[arg(long, default_value_t = SketchParams::DEFAULT_LENGTH)]
    sketch_length: f64,

    /// Sketch wavelength randomness factor.
    #[arg(long, default_value_t = SketchParams::DEFAULT_RANDOMNESS)]
    sketch_randomness: f64,

    /// Write the cleaned path as SVG to this file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

/// Pixel snapping policy selection.
#[derive(Clone, Copy, ValueEnum)]
enum SnapArg {
    /// Inspect the path and decide.
    Auto,
    /// Force snapping.
    Always,
    /// Never snap.
    Never,
}

impl From<SnapArg> for SnapMode {
    fn from(arg: SnapArg) -> Self {
        match arg {
            SnapArg::Auto => Self::Auto,
            SnapArg::Always => Self::Always,
            SnapArg::Never => Self::Never,
        }
    }
}

/// Parse `--clip "X1,Y1,X2,Y2"`.
fn parse_clip(spec: &str) -> Result<ClipRect, String> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    let [x1, y1, x2, y2] = parts.as_slice() else {
        return Err(format!("clip must be 'X1,Y1,X2,Y2', got: '{spec}'"));
    };
    let parse = |name: &str, s: &str| -> Result<f64, String> {
        s.parse()
            .map_err(|e| format!("invalid clip {name} '{s}': {e}"))
    };
    Ok(ClipRect::new(
        parse("x1", x1)?,
        parse("y1", y1)?,
        parse("x2", x2)?,
        parse("y2", y2)?,
    ))
}

/// A dense sine trace, optionally punctured with NaN vertices.
#[allow(clippy::cast_precision_loss)]
fn generate_sine_path(points: usize, nan_every: usize) -> PathBuffer {
    let mut path = PathBuffer::new();
    path.move_to(0.0, 300.0);
    for i in 1..points {
        let x = i as f64 * 0.1;
        if nan_every != 0 && i % nan_every == 0 {
            path.line_to(f64::NAN, f64::NAN);
        } else {
            path.line_to(x, 300.0 + (x * 0.08).sin() * 250.0);
        }
    }
    path
}

fn load_path(cli: &Cli) -> Result<PathBuffer, String> {
    match &cli.input {
        Some(input) => {
            let bytes = std::fs::read(input)
                .map_err(|e| format!("error reading {}: {e}", input.display()))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| format!("error parsing {}: {e}", input.display()))
        }
        None => Ok(generate_sine_path(cli.points, cli.nan_every)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.runs == 0 {
        eprintln!("Error: --runs must be at least 1");
        return ExitCode::FAILURE;
    }

    let clip = match cli.clip.as_deref().map(parse_clip).transpose() {
        Ok(clip) => clip,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = PipelineConfig {
        clip,
        snap_mode: cli.snap.into(),
        stroke_width: cli.stroke_width,
        simplify: !cli.no_simplify,
        simplify_threshold: cli.threshold,
        sketch: (cli.sketch_scale != 0.0).then_some(SketchParams {
            scale: cli.sketch_scale,
            length: cli.sketch_length,
            randomness: cli.sketch_randomness,
        }),
        ..PipelineConfig::default()
    };

    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let path = match load_path(&cli) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Input: {} tokens", path.len());
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut total_durations = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (cleaned, diagnostics) =
            match clean_staged_with_diagnostics(&path, &config, &SystemClock) {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("Pipeline error: {e}");
                    return ExitCode::FAILURE;
                }
            };

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

        // Write SVG on the first run only.
        if run == 0
            && let Some(ref svg_path) = cli.svg
        {
            let config_json = serde_json::to_string(&config).unwrap_or_default();
            let svg = migaki_export::to_svg(
                &cleaned,
                1000,
                600,
                &migaki_export::SvgMetadata {
                    title: cli.input.as_ref().and_then(|p| p.file_stem()?.to_str()),
                    description: Some("migaki-bench output"),
                    config_json: Some(&config_json),
                },
            );
            match std::fs::write(svg_path, &svg) {
                Ok(()) => {
                    eprintln!("SVG written to {} ({} bytes)", svg_path.display(), svg.len());
                }
                Err(e) => {
                    eprintln!("Error writing SVG to {}: {e}", svg_path.display());
                }
            }
        }

        total_durations.push(diagnostics.total_duration.as_secs_f64() * 1000.0);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        let min = total_durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
        let max = total_durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
        #[allow(clippy::cast_precision_loss)]
        let mean = total_durations.iter().sum::<f64>() / total_durations.len() as f64;
        println!();
        println!(
            "Summary ({} runs): min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms",
            total_durations.len(),
        );
    }

    ExitCode::SUCCESS
}
