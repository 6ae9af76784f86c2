//! migaki-pipeline: streaming path cleaning for plotting backends
//! (sans-IO).
//!
//! A figure renderer hands this crate a stream of path tokens (moves,
//! lines, Bezier units, closes); the pipeline filters, clips, snaps,
//! simplifies, and optionally perturbs that stream and hands an
//! equivalent stream to the rasterizer. Every stage is a lazy pull-based
//! [`VertexSource`] over its upstream, so no intermediate copy of the
//! path is ever materialized.
//!
//! Stage order, upstream to downstream:
//!
//! 1. Affine transformation (applied by the renderer, not here)
//! 2. [`NanRemover`]: drop non-finite vertices, restoring subpath
//!    structure with synthetic moves
//! 3. [`Clipper`]: clip line segments to a rectangle; also keeps
//!    coordinates in the range the rasterizer can represent
//! 4. [`PixelSnapper`]: round rectilinear paths onto the pixel grid
//! 5. [`Simplifier`]: collapse runs of near-collinear segments
//! 6. [`Sketch`]: optional hand-drawn wiggle, seeded and reproducible
//! 7. Curve flattening and stroking (downstream, not here)
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! token buffers and returns structured data. Time enters only through
//! the injected [`diagnostics::Clock`].

pub mod clip;
pub mod diagnostics;
pub mod nan;
pub mod pipeline;
mod queue;
pub mod rng;
pub mod segment;
pub mod simplify;
pub mod sketch;
pub mod snap;
pub mod types;

pub use clip::Clipper;
pub use diagnostics::{
    Clock, PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics, SystemClock,
    clean_staged_with_diagnostics,
};
pub use nan::NanRemover;
pub use pipeline::{CleanChain, build_chain, clean, should_simplify};
pub use rng::Lcg;
pub use segment::Segmenter;
pub use simplify::Simplifier;
pub use sketch::{Sketch, SketchParams};
pub use snap::{PixelSnapper, SnapMode};
pub use types::{ClipRect, PathBuffer, PathCmd, PipelineConfig, PipelineError, Vertex, VertexSource};
