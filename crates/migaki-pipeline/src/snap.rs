//! Pixel snapping: round vertices to pixel centers or corners.
//!
//! Rectilinear geometry (axis ticks, grid lines, bar edges) looks much
//! cleaner when nudged onto the pixel grid; anything diagonal or curved
//! is left alone. Whether to snap is decided once, at construction, by
//! inspecting the whole path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{PathCmd, Vertex, VertexSource};

/// Paths longer than this are never snapped in [`SnapMode::Auto`]; the
/// inspection cost would not pay off and long paths are rarely
/// rectilinear anyway.
const AUTO_VERTEX_LIMIT: usize = 1024;

/// Tolerance below which a segment counts as strictly horizontal or
/// vertical.
const AXIS_TOLERANCE: f64 = 1e-4;

/// Pixel-snapping policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapMode {
    /// Inspect the path: snap only if it is short, curve-free, and every
    /// line segment is strictly horizontal or vertical.
    #[default]
    Auto,
    /// Force snapping.
    Always,
    /// Never snap.
    Never,
}

impl fmt::Display for SnapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
        }
    }
}

/// Round half away from zero to an integer.
#[allow(clippy::cast_possible_truncation)]
fn round_half_up(v: f64) -> i64 {
    if v >= 0.0 {
        (v + 0.5) as i64
    } else {
        (v - 0.5) as i64
    }
}

/// Decide whether the path should be snapped.
///
/// Consumes the source; the caller is responsible for rewinding it.
fn should_snap(source: &mut impl VertexSource, mode: SnapMode, total_vertices: usize) -> bool {
    match mode {
        SnapMode::Never => false,
        SnapMode::Always => true,
        SnapMode::Auto => {
            if total_vertices > AUTO_VERTEX_LIMIT {
                return false;
            }

            let first = source.next();
            if first.cmd == PathCmd::Stop {
                return false;
            }

            let (mut x0, mut y0) = (first.x, first.y);
            loop {
                let v = source.next();
                match v.cmd {
                    PathCmd::Stop => return true,
                    PathCmd::Curve3 | PathCmd::Curve4 => return false,
                    PathCmd::LineTo => {
                        if (x0 - v.x).abs() >= AXIS_TOLERANCE && (y0 - v.y).abs() >= AXIS_TOLERANCE
                        {
                            return false;
                        }
                    }
                    PathCmd::MoveTo | PathCmd::Close => {}
                }
                x0 = v.x;
                y0 = v.y;
            }
        }
    }
}

/// Rounds vertex coordinates onto the pixel grid.
///
/// The offset depends on the stroke width: an odd rounded width snaps to
/// pixel centers (offset 0.5) so a one-pixel stroke covers exactly one
/// pixel column, an even width snaps to pixel corners.
///
/// Construction inspects and then **rewinds the source to path id 0**.
/// The containing pipeline relies on that side effect: whatever the
/// inspection consumed, the chain starts from a freshly rewound source.
#[derive(Debug)]
pub struct PixelSnapper<S> {
    source: S,
    snap: bool,
    snap_offset: f64,
}

impl<S: VertexSource> PixelSnapper<S> {
    /// Wrap `source`. `total_vertices` is the token count of the path,
    /// used by the [`SnapMode::Auto`] size cutoff.
    pub fn new(mut source: S, mode: SnapMode, total_vertices: usize, stroke_width: f64) -> Self {
        let snap = should_snap(&mut source, mode, total_vertices);
        let snap_offset = if snap && round_half_up(stroke_width) % 2 != 0 {
            0.5
        } else {
            0.0
        };
        source.rewind(0);
        Self {
            source,
            snap,
            snap_offset,
        }
    }

    /// Whether the inspection decided to snap.
    #[must_use]
    pub const fn is_snapping(&self) -> bool {
        self.snap
    }

    /// Consume the wrapped source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: VertexSource> VertexSource for PixelSnapper<S> {
    fn rewind(&mut self, path_id: u32) {
        self.source.rewind(path_id);
    }

    fn next(&mut self) -> Vertex {
        let mut v = self.source.next();
        if self.snap && v.cmd.is_vertex() {
            v.x = (v.x + 0.5).floor() + self.snap_offset;
            v.y = (v.y + 0.5).floor() + self.snap_offset;
        }
        v
    }
}
