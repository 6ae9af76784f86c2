//! Pipeline assembly: compose the five stages over a path buffer.
//!
//! The stages are generic over their upstream, so the full chain
//! monomorphizes into one concrete type with no dynamic dispatch (see
//! [`CleanChain`]). [`clean`] is the production entry point: it wires the
//! chain over an owned [`PathBuffer`] and drains it into an output
//! buffer, never materializing anything in between.

use crate::clip::Clipper;
use crate::nan::NanRemover;
use crate::simplify::Simplifier;
use crate::sketch::{Sketch, SketchParams};
use crate::snap::PixelSnapper;
use crate::types::{PathBuffer, PipelineConfig, PipelineError, VertexSource};

/// The fully composed stage stack, upstream to downstream:
/// NaN removal, clipping, snapping, simplification, sketching.
pub type CleanChain = Sketch<Simplifier<PixelSnapper<Clipper<NanRemover<PathBuffer>>>>>;

/// Whether the simplifier may run for this path under this config.
///
/// The simplification algorithm treats every vertex as a polyline point,
/// so paths carrying Bezier units are never simplified.
#[must_use]
pub fn should_simplify(path: &PathBuffer, config: &PipelineConfig) -> bool {
    config.simplify && !path.has_curves()
}

/// Compose the full stage chain over an owned path buffer.
///
/// The caller is expected to have validated `config`; [`clean`] does.
/// Snapping inspects the upstream stages' output during construction and
/// rewinds them, so the returned chain is positioned at the start of the
/// path.
#[must_use]
pub fn build_chain(path: PathBuffer, config: &PipelineConfig) -> CleanChain {
    let has_codes = path.has_curves() || path.has_closes();
    let total_vertices = path.len();
    let do_simplify = should_simplify(&path, config);

    let nan = NanRemover::new(path, config.remove_nans, has_codes);
    let clip = Clipper::new(nan, config.clip.is_some(), config.clip.unwrap_or_default());
    let snap = PixelSnapper::new(clip, config.snap_mode, total_vertices, config.stroke_width);
    let simplify = Simplifier::new(snap, do_simplify, config.simplify_threshold);
    Sketch::new(simplify, config.sketch.unwrap_or(SketchParams::DISABLED))
}

/// Run the whole pipeline over `path` and collect the cleaned tokens.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// [`PipelineConfig::validate`]. The stages themselves cannot fail.
pub fn clean(path: &PathBuffer, config: &PipelineConfig) -> Result<PathBuffer, PipelineError> {
    config.validate()?;
    let mut chain = build_chain(path.clone(), config);
    chain.rewind(0);
    Ok(PathBuffer::collect(&mut chain))
}
