//! Shared types for the migaki path-cleaning pipeline.

use serde::{Deserialize, Serialize};

use crate::sketch::SketchParams;
use crate::snap::SnapMode;

/// A path command, one per pipeline token.
///
/// Curve commands span multiple tokens: the primary token is followed by
/// a fixed number of control tokens (see [`extra_vertices`](Self::extra_vertices)).
/// [`Stop`](Self::Stop) and [`Close`](Self::Close) carry coordinates that
/// consumers must ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathCmd {
    /// End of the path.
    Stop,
    /// Start a new subpath at the token's coordinates.
    MoveTo,
    /// Straight line from the current point.
    LineTo,
    /// Quadratic Bezier; one control token follows.
    Curve3,
    /// Cubic Bezier; two control tokens follow.
    Curve4,
    /// Close the current subpath with a line back to its start.
    Close,
}

impl PathCmd {
    /// Number of additional control tokens that follow this command.
    ///
    /// Stages that drop or forward whole curve units consult this so a
    /// unit is always consumed atomically.
    #[must_use]
    pub const fn extra_vertices(self) -> usize {
        match self {
            Self::Curve3 => 1,
            Self::Curve4 => 2,
            Self::Stop | Self::MoveTo | Self::LineTo | Self::Close => 0,
        }
    }

    /// Whether this command carries meaningful coordinates.
    #[must_use]
    pub const fn is_vertex(self) -> bool {
        matches!(self, Self::MoveTo | Self::LineTo | Self::Curve3 | Self::Curve4)
    }

    /// Whether this command starts a Bezier unit.
    #[must_use]
    pub const fn is_curve(self) -> bool {
        matches!(self, Self::Curve3 | Self::Curve4)
    }
}

/// One pipeline token: a command plus its coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// The path command.
    pub cmd: PathCmd,
    /// Horizontal position in device pixels.
    pub x: f64,
    /// Vertical position in device pixels.
    pub y: f64,
}

impl Vertex {
    /// Create a token.
    #[must_use]
    pub const fn new(cmd: PathCmd, x: f64, y: f64) -> Self {
        Self { cmd, x, y }
    }

    /// A `MoveTo` token.
    #[must_use]
    pub const fn move_to(x: f64, y: f64) -> Self {
        Self::new(PathCmd::MoveTo, x, y)
    }

    /// A `LineTo` token.
    #[must_use]
    pub const fn line_to(x: f64, y: f64) -> Self {
        Self::new(PathCmd::LineTo, x, y)
    }

    /// A `Close` token. The coordinates are unused by consumers.
    #[must_use]
    pub const fn close() -> Self {
        Self::new(PathCmd::Close, 0.0, 0.0)
    }

    /// The terminal `Stop` token.
    #[must_use]
    pub const fn stop() -> Self {
        Self::new(PathCmd::Stop, 0.0, 0.0)
    }

    /// Whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A pull-based producer of path tokens.
///
/// Every pipeline stage implements this and owns its upstream, so a full
/// chain monomorphizes into direct calls with no dynamic dispatch. The
/// contract: after [`rewind`](Self::rewind), [`next`](Self::next) yields
/// the path's tokens in order followed by [`PathCmd::Stop`]; calling
/// `next` past the stop keeps yielding terminal tokens.
pub trait VertexSource {
    /// Reposition to the start of the indicated path.
    fn rewind(&mut self, path_id: u32);

    /// Produce the next token.
    fn next(&mut self) -> Vertex;
}

/// A growable token buffer that doubles as a [`VertexSource`].
///
/// Used to feed the pipeline and to collect its output. The buffer holds
/// a single flat path, so `rewind` ignores its `path_id` and always
/// returns to the first token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathBuffer {
    vertices: Vec<Vertex>,
    #[serde(skip)]
    cursor: usize,
}

// Equality ignores the replay cursor: two buffers holding the same
// tokens are the same path regardless of read position.
impl PartialEq for PathBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.vertices == other.vertices
    }
}

impl PathBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            cursor: 0,
        }
    }

    /// Create a buffer from pre-built tokens.
    #[must_use]
    pub const fn from_vertices(vertices: Vec<Vertex>) -> Self {
        Self {
            vertices,
            cursor: 0,
        }
    }

    /// Drain a source into a new buffer, up to (and excluding) the first
    /// `Stop` token.
    pub fn collect(source: &mut impl VertexSource) -> Self {
        let mut out = Self::new();
        loop {
            let v = source.next();
            if v.cmd == PathCmd::Stop {
                break;
            }
            out.push(v);
        }
        out
    }

    /// Append a raw token.
    pub fn push(&mut self, vertex: Vertex) {
        self.vertices.push(vertex);
    }

    /// Start a new subpath.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.push(Vertex::move_to(x, y));
    }

    /// Line to `(x, y)`.
    pub fn line_to(&mut self, x: f64, y: f64) {
        self.push(Vertex::line_to(x, y));
    }

    /// Quadratic Bezier via `(cx, cy)` to `(x, y)`: pushes the control
    /// token and the end token as one unit.
    pub fn curve3(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.push(Vertex::new(PathCmd::Curve3, cx, cy));
        self.push(Vertex::new(PathCmd::Curve3, x, y));
    }

    /// Cubic Bezier via two control points to `(x, y)`.
    pub fn curve4(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.push(Vertex::new(PathCmd::Curve4, c1x, c1y));
        self.push(Vertex::new(PathCmd::Curve4, c2x, c2y));
        self.push(Vertex::new(PathCmd::Curve4, x, y));
    }

    /// Close the current subpath.
    pub fn close(&mut self) {
        self.push(Vertex::close());
    }

    /// Number of stored tokens.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the buffer holds no tokens.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// All stored tokens.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Whether any token is part of a Bezier unit.
    #[must_use]
    pub fn has_curves(&self) -> bool {
        self.vertices.iter().any(|v| v.cmd.is_curve())
    }

    /// Whether any token closes a subpath.
    #[must_use]
    pub fn has_closes(&self) -> bool {
        self.vertices.iter().any(|v| v.cmd == PathCmd::Close)
    }
}

impl VertexSource for PathBuffer {
    fn rewind(&mut self, _path_id: u32) {
        self.cursor = 0;
    }

    fn next(&mut self) -> Vertex {
        match self.vertices.get(self.cursor) {
            Some(&v) => {
                self.cursor += 1;
                v
            }
            None => Vertex::stop(),
        }
    }
}

/// An axis-aligned clip rectangle `[x1, x2] x [y1, y2]` in device pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    /// Left edge.
    pub x1: f64,
    /// Top edge.
    pub y1: f64,
    /// Right edge.
    pub x2: f64,
    /// Bottom edge.
    pub y2: f64,
}

impl ClipRect {
    /// Create a rectangle from its corners.
    #[must_use]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Grow the rectangle by `margin` in every direction.
    #[must_use]
    pub fn inflated(self, margin: f64) -> Self {
        Self {
            x1: self.x1 - margin,
            y1: self.y1 - margin,
            x2: self.x2 + margin,
            y2: self.y2 + margin,
        }
    }

    /// Whether `(x, y)` lies inside or on the boundary.
    #[must_use]
    pub fn contains(self, x: f64, y: f64) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }
}

/// Configuration for one pipeline instance.
///
/// Every stage is individually defeatable; a disabled stage passes tokens
/// through verbatim. Fields are plain data so configurations round-trip
/// through serde (the bench CLI embeds them in its JSON diagnostics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Whether to strip non-finite vertices. Downstream stages assume
    /// finite coordinates, so this should stay on unless the caller
    /// guarantees a NaN-free path.
    pub remove_nans: bool,

    /// Clip rectangle in device pixels, or `None` to skip clipping.
    ///
    /// The rectangle is inflated by one pixel on every side at stage
    /// construction so strokes up to two pixels wide are not clipped at
    /// their silhouette.
    pub clip: Option<ClipRect>,

    /// Pixel-snapping policy. See [`SnapMode`].
    pub snap_mode: SnapMode,

    /// Stroke width in pixels; its rounded parity selects whether
    /// snapping targets pixel centers or pixel corners.
    pub stroke_width: f64,

    /// Whether to collapse runs of near-collinear segments.
    ///
    /// The simplifier does not understand Bezier units, so the driver
    /// suppresses it for paths that contain curves regardless of this
    /// flag.
    pub simplify: bool,

    /// Maximum perpendicular deviation, in pixels, a vertex may have from
    /// the run being built before the run is flushed.
    pub simplify_threshold: f64,

    /// Hand-drawn wiggle parameters, or `None` to leave the path exact.
    pub sketch: Option<SketchParams>,
}

impl PipelineConfig {
    /// Default simplification threshold in pixels.
    pub const DEFAULT_SIMPLIFY_THRESHOLD: f64 = 1.0 / 9.0;
    /// Default stroke width in pixels.
    pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

    /// Validate that all fields satisfy the documented invariants.
    ///
    /// The streaming stages themselves are infallible; this is the one
    /// place configuration mistakes surface.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] with a human-readable
    /// message if any invariant is violated:
    ///
    /// - `simplify_threshold` finite and non-negative
    /// - `stroke_width` finite and non-negative
    /// - `clip` (when present) finite with `x1 <= x2` and `y1 <= y2`
    /// - `sketch` parameters (when present) finite
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.simplify_threshold.is_finite() || self.simplify_threshold < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "simplify_threshold must be finite and non-negative, got {}",
                self.simplify_threshold,
            )));
        }
        if !self.stroke_width.is_finite() || self.stroke_width < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "stroke_width must be finite and non-negative, got {}",
                self.stroke_width,
            )));
        }
        if let Some(rect) = self.clip {
            let finite = rect.x1.is_finite()
                && rect.y1.is_finite()
                && rect.x2.is_finite()
                && rect.y2.is_finite();
            if !finite || rect.x1 > rect.x2 || rect.y1 > rect.y2 {
                return Err(PipelineError::InvalidConfig(format!(
                    "clip rectangle must be finite and non-inverted, got {rect:?}",
                )));
            }
        }
        if let Some(sketch) = self.sketch {
            let finite = sketch.scale.is_finite()
                && sketch.length.is_finite()
                && sketch.randomness.is_finite();
            if !finite {
                return Err(PipelineError::InvalidConfig(format!(
                    "sketch parameters must be finite, got {sketch:?}",
                )));
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            remove_nans: true,
            clip: None,
            snap_mode: SnapMode::default(),
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            simplify: true,
            simplify_threshold: Self::DEFAULT_SIMPLIFY_THRESHOLD,
            sketch: None,
        }
    }
}

/// Errors that can occur while setting up a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}
