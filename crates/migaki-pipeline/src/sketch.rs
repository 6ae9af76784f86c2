//! Sketch: perturb a path along a sinusoidal wiggle for a hand-drawn
//! look.
//!
//! Each output point is displaced perpendicular to the local segment
//! direction by `scale * sin(p * p_scale)`, where the phase `p` advances
//! at a seeded-random rate per vertex. The upstream is fed through a
//! [`Segmenter`] so the sine is sampled at least once per pixel along
//! long edges.
//!
//! A `scale` of zero short-circuits the stage entirely: tokens pass
//! through verbatim and the segmenter is bypassed, in `rewind` too.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::rng::Lcg;
use crate::segment::Segmenter;
use crate::types::{PathCmd, Vertex, VertexSource};

/// Wiggle parameters for the sketch stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SketchParams {
    /// Amplitude of the wiggle perpendicular to the line, in pixels.
    /// Zero disables sketching.
    pub scale: f64,
    /// Base wavelength of the wiggle along the line, in pixels.
    pub length: f64,
    /// Factor by which the wavelength randomly shrinks and expands.
    pub randomness: f64,
}

impl SketchParams {
    /// Default base wavelength in pixels.
    pub const DEFAULT_LENGTH: f64 = 128.0;
    /// Default wavelength randomness factor.
    pub const DEFAULT_RANDOMNESS: f64 = 16.0;

    /// Parameters that disable the stage.
    pub const DISABLED: Self = Self {
        scale: 0.0,
        length: 0.0,
        randomness: 0.0,
    };
}

impl Default for SketchParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            length: Self::DEFAULT_LENGTH,
            randomness: Self::DEFAULT_RANDOMNESS,
        }
    }
}

/// Applies the seeded wiggle to a token stream.
#[derive(Debug)]
pub struct Sketch<S> {
    segmented: Segmenter<S>,
    scale: f64,
    last_x: f64,
    last_y: f64,
    has_last: bool,
    /// Running phase along the sine wave.
    p: f64,
    rand: Lcg,
    p_scale: f64,
    log_randomness: f64,
}

impl<S: VertexSource> Sketch<S> {
    /// Wrap `source` with the given wiggle parameters.
    pub fn new(source: S, params: SketchParams) -> Self {
        // Derived values drop to zero when length or randomness are
        // degenerate, so a sketch that is constructed but never used
        // cannot divide by zero.
        let p_scale = if params.length <= f64::EPSILON || params.randomness <= f64::EPSILON {
            0.0
        } else {
            (2.0 * PI) / (params.length * params.randomness)
        };
        let log_randomness = if params.randomness <= f64::EPSILON {
            0.0
        } else {
            2.0 * params.randomness.ln()
        };

        let mut sketch = Self {
            segmented: Segmenter::new(source),
            scale: params.scale,
            last_x: 0.0,
            last_y: 0.0,
            has_last: false,
            p: 0.0,
            rand: Lcg::new(),
            p_scale,
            log_randomness,
        };
        sketch.rewind(0);
        sketch
    }

    /// Consume the stage and return the wrapped source.
    pub fn into_inner(self) -> S {
        self.segmented.into_inner()
    }
}

impl<S: VertexSource> VertexSource for Sketch<S> {
    fn rewind(&mut self, path_id: u32) {
        self.has_last = false;
        self.p = 0.0;
        if self.scale == 0.0 {
            self.segmented.get_mut().rewind(path_id);
        } else {
            self.rand.reseed(0);
            self.segmented.rewind(path_id);
        }
    }

    fn next(&mut self) -> Vertex {
        if self.scale == 0.0 {
            return self.segmented.get_mut().next();
        }

        let mut v = self.segmented.next();

        if v.cmd == PathCmd::MoveTo {
            self.has_last = false;
            self.p = 0.0;
        }

        if self.has_last {
            // The cursor along the sine moves at a random rate. The
            // original rate is randomness^(2*rand - 1); the constant -1
            // is folded into p_scale and the power computed as
            // exp(rand * 2*ln(randomness)), which costs one log at
            // construction instead of a pow per vertex.
            let d_rand = self.rand.get_double();
            self.p += (d_rand * self.log_randomness).exp();
            let den = self.last_x - v.x;
            let num = self.last_y - v.y;
            let len2 = num * num + den * den;
            self.last_x = v.x;
            self.last_y = v.y;
            if len2 != 0.0 {
                let len = len2.sqrt();
                let r = (self.p * self.p_scale).sin() * self.scale;
                let r_over_len = r / len;
                v.x += r_over_len * num;
                v.y -= r_over_len * den;
            }
        } else {
            self.last_x = v.x;
            self.last_y = v.y;
        }

        self.has_last = true;

        v
    }
}
