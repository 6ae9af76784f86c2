//! Pipeline diagnostics: timing and token counts for each stage.
//!
//! Permanent instrumentation for parameter experimentation: the staged
//! driver below runs the pipeline one stage at a time, materializing each
//! intermediate buffer so it can count tokens and time stages. Production
//! rendering should use [`clean`](crate::clean), which streams the whole
//! chain without intermediates; the two produce identical output.
//!
//! Time is injected through the [`Clock`] trait so the crate itself
//! performs no I/O and stays testable with a fake clock. Durations are
//! serialized as fractional seconds for JSON compatibility, since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clip::Clipper;
use crate::nan::NanRemover;
use crate::pipeline::should_simplify;
use crate::simplify::Simplifier;
use crate::sketch::{Sketch, SketchParams};
use crate::snap::{PixelSnapper, SnapMode};
use crate::types::{PathBuffer, PipelineConfig, PipelineError};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A source of monotonic time.
///
/// Injected into the staged driver so the core has no ambient time
/// dependency; native callers use [`SystemClock`].
pub trait Clock {
    /// An opaque instant.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn elapsed(&self, since: &Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single staged pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: NaN removal.
    pub nan_removal: StageDiagnostics,
    /// Stage 2: rectangle clipping.
    pub clip: StageDiagnostics,
    /// Stage 3: pixel snapping.
    pub snap: StageDiagnostics,
    /// Stage 4: collinear-run simplification.
    pub simplify: StageDiagnostics,
    /// Stage 5: sketch perturbation (includes edge subdivision).
    pub sketch: StageDiagnostics,
    /// Wall-clock duration of the whole run.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Whole-run token counts.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds in JSON).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific counts and facts.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// NaN removal metrics.
    NanRemoval {
        /// Whether the stage was enabled.
        enabled: bool,
        /// Whether the slower curve-aware unit algorithm was selected.
        unit_mode: bool,
        /// Tokens in.
        vertices_in: usize,
        /// Tokens out.
        vertices_out: usize,
    },
    /// Clipping metrics.
    Clip {
        /// Whether a clip rectangle was configured.
        enabled: bool,
        /// Tokens in.
        vertices_in: usize,
        /// Tokens out.
        vertices_out: usize,
    },
    /// Snapping metrics.
    Snap {
        /// Configured policy.
        mode: SnapMode,
        /// What the inspection decided.
        snapping: bool,
        /// Stroke width the offset was derived from.
        stroke_width: f64,
        /// Tokens through the stage (snapping never changes the count).
        vertices: usize,
    },
    /// Simplification metrics.
    Simplify {
        /// Whether the stage ran (config flag and a curve-free path).
        enabled: bool,
        /// Perpendicular-distance threshold in pixels.
        threshold: f64,
        /// Tokens in.
        vertices_in: usize,
        /// Tokens out.
        vertices_out: usize,
        /// `1 - out/in`, zero for an empty input.
        reduction_ratio: f64,
    },
    /// Sketch metrics.
    Sketch {
        /// Whether a wiggle was configured.
        enabled: bool,
        /// Wiggle amplitude in pixels.
        scale: f64,
        /// Tokens in.
        vertices_in: usize,
        /// Tokens out (subdivision usually increases this).
        vertices_out: usize,
    },
}

/// Whole-run token counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Tokens in the input path.
    pub input_vertices: usize,
    /// Tokens in the cleaned output.
    pub output_vertices: usize,
}

impl PipelineDiagnostics {
    /// Format the diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Path Pipeline Diagnostics\n{}", "=".repeat(60)));
        lines.push(format!(
            "Tokens: {} in -> {} out",
            self.summary.input_vertices, self.summary.output_vertices,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(76));

        let total_ms = duration_ms(self.total_duration);
        let stages: [(&str, &StageDiagnostics); 5] = [
            ("NaN Removal", &self.nan_removal),
            ("Clip", &self.clip),
            ("Snap", &self.snap),
            ("Simplify", &self.simplify),
            ("Sketch", &self.sketch),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::NanRemoval {
            enabled,
            unit_mode,
            vertices_in,
            vertices_out,
        } => {
            if *enabled {
                let mode = if *unit_mode { "units" } else { "fast" };
                format!("{mode} {vertices_in}->{vertices_out}")
            } else {
                "off".to_owned()
            }
        }
        StageMetrics::Clip {
            enabled,
            vertices_in,
            vertices_out,
        } => {
            if *enabled {
                format!("{vertices_in}->{vertices_out}")
            } else {
                "off".to_owned()
            }
        }
        StageMetrics::Snap {
            mode,
            snapping,
            stroke_width,
            vertices,
        } => {
            format!(
                "{mode} -> {} (stroke={stroke_width}, {vertices} tokens)",
                if *snapping { "snapped" } else { "unsnapped" },
            )
        }
        StageMetrics::Simplify {
            enabled,
            threshold,
            vertices_in,
            vertices_out,
            reduction_ratio,
        } => {
            if *enabled {
                format!(
                    "thr={threshold:.3} {vertices_in}->{vertices_out} ({:.1}% reduction)",
                    reduction_ratio * 100.0,
                )
            } else {
                "off".to_owned()
            }
        }
        StageMetrics::Sketch {
            enabled,
            scale,
            vertices_in,
            vertices_out,
        } => {
            if *enabled {
                format!("scale={scale} {vertices_in}->{vertices_out}")
            } else {
                "off".to_owned()
            }
        }
    }
}

/// Ratio of removed tokens, guarding the empty input.
#[allow(clippy::cast_precision_loss)]
fn reduction(before: usize, after: usize) -> f64 {
    if before == 0 {
        0.0
    } else {
        1.0 - after as f64 / before as f64
    }
}

/// Run the pipeline stage by stage, collecting per-stage diagnostics.
///
/// Materializes every intermediate buffer, unlike the streaming
/// [`clean`](crate::clean); the final output is identical.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// [`PipelineConfig::validate`].
#[allow(clippy::too_many_lines)]
pub fn clean_staged_with_diagnostics<C: Clock>(
    path: &PathBuffer,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(PathBuffer, PipelineDiagnostics), PipelineError> {
    config.validate()?;

    let total_start = clock.now();
    let input_vertices = path.len();
    let has_codes = path.has_curves() || path.has_closes();
    let do_simplify = should_simplify(path, config);

    // Stage 1: NaN removal.
    let start = clock.now();
    let mut stage = NanRemover::new(path.clone(), config.remove_nans, has_codes);
    let nan_out = PathBuffer::collect(&mut stage);
    let nan_removal = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::NanRemoval {
            enabled: config.remove_nans,
            unit_mode: has_codes,
            vertices_in: input_vertices,
            vertices_out: nan_out.len(),
        },
    };

    // Stage 2: clipping.
    let start = clock.now();
    let clip_in = nan_out.len();
    let mut stage = Clipper::new(nan_out, config.clip.is_some(), config.clip.unwrap_or_default());
    let clip_out = PathBuffer::collect(&mut stage);
    let clip = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Clip {
            enabled: config.clip.is_some(),
            vertices_in: clip_in,
            vertices_out: clip_out.len(),
        },
    };

    // Stage 3: snapping. The auto decision uses the input path's token
    // count, exactly as the streaming chain does.
    let start = clock.now();
    let mut stage = PixelSnapper::new(
        clip_out,
        config.snap_mode,
        input_vertices,
        config.stroke_width,
    );
    let snapping = stage.is_snapping();
    let snap_out = PathBuffer::collect(&mut stage);
    let snap = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Snap {
            mode: config.snap_mode,
            snapping,
            stroke_width: config.stroke_width,
            vertices: snap_out.len(),
        },
    };

    // Stage 4: simplification.
    let start = clock.now();
    let simplify_in = snap_out.len();
    let mut stage = Simplifier::new(snap_out, do_simplify, config.simplify_threshold);
    let simplify_out = PathBuffer::collect(&mut stage);
    let simplify = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Simplify {
            enabled: do_simplify,
            threshold: config.simplify_threshold,
            vertices_in: simplify_in,
            vertices_out: simplify_out.len(),
            reduction_ratio: reduction(simplify_in, simplify_out.len()),
        },
    };

    // Stage 5: sketching.
    let start = clock.now();
    let params = config.sketch.unwrap_or(SketchParams::DISABLED);
    let sketch_in = simplify_out.len();
    let mut stage = Sketch::new(simplify_out, params);
    let output = PathBuffer::collect(&mut stage);
    let sketch = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Sketch {
            enabled: config.sketch.is_some(),
            scale: params.scale,
            vertices_in: sketch_in,
            vertices_out: output.len(),
        },
    };

    let diagnostics = PipelineDiagnostics {
        nan_removal,
        clip,
        snap,
        simplify,
        sketch,
        total_duration: clock.elapsed(&total_start),
        summary: PipelineSummary {
            input_vertices,
            output_vertices: output.len(),
        },
    };

    Ok((output, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::ClipRect;

    /// A clock that always reports the same instant; keeps tests
    /// independent of wall time.
    struct FrozenClock;

    impl Clock for FrozenClock {
        type Instant = ();

        fn now(&self) -> Self::Instant {}

        fn elapsed(&self, _since: &Self::Instant) -> Duration {
            Duration::from_millis(1)
        }
    }

    fn sample_path() -> PathBuffer {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        for i in 1..=50 {
            path.line_to(f64::from(i), 0.0);
        }
        path.line_to(50.0, 10.0);
        path
    }

    fn sample_config() -> PipelineConfig {
        PipelineConfig {
            clip: Some(ClipRect::new(0.0, 0.0, 100.0, 100.0)),
            simplify_threshold: 0.5,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn staged_output_matches_streaming_clean() {
        let path = sample_path();
        let config = sample_config();
        let (staged, _) =
            clean_staged_with_diagnostics(&path, &config, &FrozenClock).unwrap();
        let streamed = crate::clean(&path, &config).unwrap();
        assert_eq!(staged, streamed);
    }

    #[test]
    fn counts_reflect_simplification() {
        let path = sample_path();
        let (output, diag) =
            clean_staged_with_diagnostics(&path, &sample_config(), &FrozenClock).unwrap();
        assert_eq!(diag.summary.input_vertices, path.len());
        assert_eq!(diag.summary.output_vertices, output.len());
        match diag.simplify.metrics {
            StageMetrics::Simplify {
                vertices_in,
                vertices_out,
                reduction_ratio,
                ..
            } => {
                assert!(vertices_out < vertices_in);
                assert!(reduction_ratio > 0.0);
            }
            ref other => panic!("expected Simplify metrics, got {other:?}"),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig {
            stroke_width: -1.0,
            ..PipelineConfig::default()
        };
        assert!(clean_staged_with_diagnostics(&PathBuffer::new(), &config, &FrozenClock).is_err());
    }

    #[test]
    fn report_mentions_every_stage() {
        let (_, diag) =
            clean_staged_with_diagnostics(&sample_path(), &sample_config(), &FrozenClock).unwrap();
        let report = diag.report();
        for needle in ["NaN Removal", "Clip", "Snap", "Simplify", "Sketch"] {
            assert!(report.contains(needle), "report missing {needle}:\n{report}");
        }
    }

    #[test]
    fn diagnostics_serde_round_trip() {
        let (_, diag) =
            clean_staged_with_diagnostics(&sample_path(), &sample_config(), &FrozenClock).unwrap();
        let json = serde_json::to_string(&diag).unwrap();
        let back: PipelineDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.input_vertices, diag.summary.input_vertices);
        assert_eq!(back.total_duration, diag.total_duration);
    }
}
