//! Path simplification: collapse runs of near-collinear segments.
//!
//! Dense data paths (a line plot with one vertex per sample, say) carry
//! far more segments than the screen can show. This stage merges every
//! run of segments whose vertices stay within a perpendicular-distance
//! threshold of a reference direction, emitting only the points that can
//! change a pixel: the extremes of the run along both directions of the
//! reference vector and the run's endpoint.
//!
//! The stage understands only straight segments. Close tokens are
//! rewritten to an explicit line back to the subpath start; callers must
//! disable simplification for paths containing Bezier units (the
//! [`clean`](crate::clean) driver does this automatically).
//!
//! The algorithm consumes input only until something lands in the output
//! queue, so a whole path is never materialized per draw.

use crate::queue::VertexQueue;
use crate::types::{PathCmd, Vertex, VertexSource};

// Worst case per round: a pending clip move-to plus a flushed run (two
// extrema and the endpoint) plus the end-of-path stop.
const QUEUE_SIZE: usize = 9;

/// Collapses near-collinear segment runs under a perpendicular-distance
/// threshold.
#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct Simplifier<S> {
    source: S,
    simplify: bool,
    /// Squared threshold, so per-vertex checks need no square root.
    threshold2: f64,
    queue: VertexQueue<QUEUE_SIZE>,

    moveto: bool,
    after_moveto: bool,
    /// Set while the start of the current run has not been emitted yet;
    /// the pending `MoveTo` lands when the first real segment arrives.
    clipped: bool,
    has_init: bool,
    init_x: f64,
    init_y: f64,
    last_x: f64,
    last_y: f64,

    /// Reference vector the current run is built along, anchored at
    /// `(curr_vec_start_x, curr_vec_start_y)`.
    origdx: f64,
    origdy: f64,
    /// Squared norm of the reference vector; zero means "no run yet".
    origd_norm2: f64,
    /// Largest squared parallel extent seen along the reference vector.
    dnorm2_forward_max: f64,
    /// Largest squared parallel extent seen against it.
    dnorm2_backward_max: f64,
    /// Whether the most recent vertex set the forward maximum.
    last_forward_max: bool,
    /// Whether the most recent vertex set the backward maximum.
    last_backward_max: bool,
    /// Furthest point along the reference vector.
    next_x: f64,
    next_y: f64,
    /// Furthest point against the reference vector.
    next_backward_x: f64,
    next_backward_y: f64,
    curr_vec_start_x: f64,
    curr_vec_start_y: f64,
}

impl<S: VertexSource> Simplifier<S> {
    /// Wrap `source`. `threshold` is the maximum perpendicular deviation
    /// in pixels; it is squared internally.
    pub fn new(source: S, do_simplify: bool, threshold: f64) -> Self {
        Self {
            source,
            simplify: do_simplify,
            threshold2: threshold * threshold,
            queue: VertexQueue::new(),
            moveto: true,
            after_moveto: false,
            clipped: false,
            has_init: false,
            init_x: 0.0,
            init_y: 0.0,
            last_x: 0.0,
            last_y: 0.0,
            origdx: 0.0,
            origdy: 0.0,
            origd_norm2: 0.0,
            dnorm2_forward_max: 0.0,
            dnorm2_backward_max: 0.0,
            last_forward_max: false,
            last_backward_max: false,
            next_x: 0.0,
            next_y: 0.0,
            next_backward_x: 0.0,
            next_backward_y: 0.0,
            curr_vec_start_x: 0.0,
            curr_vec_start_y: 0.0,
        }
    }

    /// Consume the wrapped source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Flush the current run to the queue and restart the reference
    /// vector from the run's endpoint towards `(x, y)`.
    fn push_run(&mut self, x: f64, y: f64) {
        let need_backward = self.dnorm2_backward_max > 0.0;

        if need_backward {
            // Both extrema go out; whichever was observed most recently
            // must be emitted last so the pen ends up there.
            if self.last_forward_max {
                self.queue
                    .push(Vertex::line_to(self.next_backward_x, self.next_backward_y));
                self.queue.push(Vertex::line_to(self.next_x, self.next_y));
            } else {
                self.queue.push(Vertex::line_to(self.next_x, self.next_y));
                self.queue
                    .push(Vertex::line_to(self.next_backward_x, self.next_backward_y));
            }
        } else {
            self.queue.push(Vertex::line_to(self.next_x, self.next_y));
        }

        if self.clipped {
            // Segments were dropped between this run and the next one, so
            // the pen must jump to the restart point.
            self.queue.push(Vertex::move_to(self.last_x, self.last_y));
        } else if !self.last_forward_max && !self.last_backward_max {
            // The run's endpoint was interior to the extremes; return to
            // it so the next segment starts from the right place. Would
            // be a move-to if not for the artifacts.
            self.queue.push(Vertex::line_to(self.last_x, self.last_y));
        }

        // Restart the reference vector from the endpoint towards the
        // vertex that broke the run, anchored at the last queued point.
        self.origdx = x - self.last_x;
        self.origdy = y - self.last_y;
        self.origd_norm2 = self.origdx * self.origdx + self.origdy * self.origdy;
        self.dnorm2_forward_max = self.origd_norm2;
        self.last_forward_max = true;
        if let Some(tail) = self.queue.last() {
            self.curr_vec_start_x = tail.x;
            self.curr_vec_start_y = tail.y;
        }
        self.next_x = x;
        self.next_y = y;
        self.last_x = x;
        self.last_y = y;
        self.dnorm2_backward_max = 0.0;
        self.last_backward_max = false;
        self.clipped = false;
    }
}

impl<S: VertexSource> VertexSource for Simplifier<S> {
    fn rewind(&mut self, path_id: u32) {
        self.queue.clear();
        self.moveto = true;
        self.after_moveto = false;
        self.clipped = false;
        self.has_init = false;
        self.origd_norm2 = 0.0;
        self.dnorm2_backward_max = 0.0;
        self.source.rewind(path_id);
    }

    #[allow(clippy::too_many_lines)]
    fn next(&mut self) -> Vertex {
        if !self.simplify {
            return self.source.next();
        }

        if let Some(v) = self.queue.pop() {
            return v;
        }

        let mut stopped = true;
        loop {
            let mut v = self.source.next();
            if v.cmd == PathCmd::Stop {
                break;
            }

            if self.moveto || v.cmd == PathCmd::MoveTo {
                // The moveto flag should be redundant (sources open every
                // subpath with a move), but is kept in case an upstream
                // stage does not.
                if self.origd_norm2 != 0.0 && !self.after_moveto {
                    // A run is in flight; the after-moveto check keeps it
                    // from being flushed twice.
                    self.push_run(v.x, v.y);
                }
                self.after_moveto = true;

                if v.is_finite() {
                    self.has_init = true;
                    self.init_x = v.x;
                    self.init_y = v.y;
                } else {
                    self.has_init = false;
                }

                self.last_x = v.x;
                self.last_y = v.y;
                self.moveto = false;
                self.origd_norm2 = 0.0;
                self.dnorm2_backward_max = 0.0;
                self.clipped = true;
                if !self.queue.is_empty() {
                    stopped = false;
                    break;
                }
                continue;
            }
            self.after_moveto = false;

            if v.cmd == PathCmd::Close {
                if self.has_init {
                    // Substitute the saved subpath start for the close's
                    // unused coordinates and treat it as a line.
                    v.x = self.init_x;
                    v.y = self.init_y;
                } else {
                    // Nothing to close back to.
                    continue;
                }
            }

            if self.origd_norm2 == 0.0 {
                // First segment out of the anchor: it defines the
                // reference vector the run is built along.
                if self.clipped {
                    self.queue.push(Vertex::move_to(self.last_x, self.last_y));
                    self.clipped = false;
                }

                self.origdx = v.x - self.last_x;
                self.origdy = v.y - self.last_y;
                self.origd_norm2 = self.origdx * self.origdx + self.origdy * self.origdy;

                self.dnorm2_forward_max = self.origd_norm2;
                self.dnorm2_backward_max = 0.0;
                self.last_forward_max = true;
                self.last_backward_max = false;

                self.curr_vec_start_x = self.last_x;
                self.curr_vec_start_y = self.last_y;
                self.next_x = v.x;
                self.next_y = v.y;
                self.last_x = v.x;
                self.last_y = v.y;
                continue;
            }

            // Perpendicular deviation of this vertex from the run: with
            // o the reference vector and t the displacement from the
            // anchor, p = t - (o.t)o/(o.o).
            let totdx = v.x - self.curr_vec_start_x;
            let totdy = v.y - self.curr_vec_start_y;
            let totdot = self.origdx * totdx + self.origdy * totdy;
            let paradx = totdot * self.origdx / self.origd_norm2;
            let parady = totdot * self.origdy / self.origd_norm2;
            let perpdx = totdx - paradx;
            let perpdy = totdy - parady;
            let perpd_norm2 = perpdx * perpdx + perpdy * perpdy;

            if perpd_norm2 < self.threshold2 {
                // Merge the vertex into the run, tracking the furthest
                // excursion in each direction along the reference vector
                // so extrema survive simplification.
                let parad_norm2 = paradx * paradx + parady * parady;
                self.last_forward_max = false;
                self.last_backward_max = false;
                if totdot > 0.0 {
                    if parad_norm2 > self.dnorm2_forward_max {
                        self.last_forward_max = true;
                        self.dnorm2_forward_max = parad_norm2;
                        self.next_x = v.x;
                        self.next_y = v.y;
                    }
                } else if parad_norm2 > self.dnorm2_backward_max {
                    self.last_backward_max = true;
                    self.dnorm2_backward_max = parad_norm2;
                    self.next_backward_x = v.x;
                    self.next_backward_y = v.y;
                }

                self.last_x = v.x;
                self.last_y = v.y;
                continue;
            }

            // Too far off line: emit the run and start the next one.
            self.push_run(v.x, v.y);
            stopped = false;
            break;
        }

        if stopped {
            // Upstream is exhausted; flush whatever run is pending.
            if self.origd_norm2 != 0.0 {
                let cmd = if self.moveto || self.after_moveto {
                    PathCmd::MoveTo
                } else {
                    PathCmd::LineTo
                };
                self.queue.push(Vertex::new(cmd, self.next_x, self.next_y));
                if self.dnorm2_backward_max > 0.0 {
                    self.queue
                        .push(Vertex::new(cmd, self.next_backward_x, self.next_backward_y));
                }
                self.moveto = false;
            }
            let cmd = if self.moveto || self.after_moveto {
                PathCmd::MoveTo
            } else {
                PathCmd::LineTo
            };
            self.queue.push(Vertex::new(cmd, self.last_x, self.last_y));
            self.moveto = false;
            self.queue.push(Vertex::stop());
        }

        self.queue.pop().unwrap_or(Vertex::stop())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::PathBuffer;

    fn run(stage: &mut impl VertexSource) -> Vec<Vertex> {
        let mut out = Vec::new();
        loop {
            let v = stage.next();
            if v.cmd == PathCmd::Stop {
                return out;
            }
            out.push(v);
        }
    }

    #[test]
    fn collinear_run_collapses_to_extremes() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 0.0);
        path.line_to(2.0, 0.0);
        path.line_to(3.0, 0.0);
        path.line_to(4.0, 0.0);
        path.line_to(4.0, 1.0);

        let mut stage = Simplifier::new(path, true, 0.5);
        assert_eq!(
            run(&mut stage),
            vec![
                Vertex::move_to(0.0, 0.0),
                Vertex::line_to(4.0, 0.0),
                Vertex::line_to(4.0, 1.0),
                // The end-of-path flush always re-emits the final point.
                Vertex::line_to(4.0, 1.0),
            ],
        );
    }

    #[test]
    fn nearly_collinear_points_within_threshold_merge() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 0.1);
        path.line_to(2.0, -0.1);
        path.line_to(3.0, 0.05);
        path.line_to(4.0, 0.0);

        let mut stage = Simplifier::new(path, true, 0.5);
        let out = run(&mut stage);
        // One merged run: move, furthest point, endpoint re-emit.
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], Vertex::move_to(0.0, 0.0));
        assert_eq!(out[1], Vertex::line_to(4.0, 0.0));
    }

    #[test]
    fn backward_excursion_is_preserved() {
        // The pen runs forward, retraces past its start, and continues:
        // both extrema must survive.
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(5.0, 0.0);
        path.line_to(-3.0, 0.0);
        path.line_to(2.0, 0.0);
        path.line_to(2.0, 5.0);

        let mut stage = Simplifier::new(path, true, 0.5);
        let out = run(&mut stage);
        assert!(
            out.contains(&Vertex::line_to(5.0, 0.0)),
            "forward extreme lost: {out:?}",
        );
        assert!(
            out.contains(&Vertex::line_to(-3.0, 0.0)),
            "backward extreme lost: {out:?}",
        );
        assert!(out.contains(&Vertex::line_to(2.0, 5.0)));
    }

    #[test]
    fn most_recent_extreme_is_emitted_last() {
        // The run ends on a backward excursion, so the backward extreme
        // must come out after the forward one.
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(5.0, 0.0);
        path.line_to(-3.0, 0.0);
        path.line_to(-3.0, 5.0);

        let mut stage = Simplifier::new(path, true, 0.5);
        let out = run(&mut stage);
        let fwd = out
            .iter()
            .position(|v| *v == Vertex::line_to(5.0, 0.0))
            .expect("forward extreme missing");
        let bwd = out
            .iter()
            .position(|v| *v == Vertex::line_to(-3.0, 0.0))
            .expect("backward extreme missing");
        assert!(fwd < bwd, "expected forward before backward in {out:?}");
    }

    #[test]
    fn zero_length_segments_are_absorbed() {
        let mut path = PathBuffer::new();
        path.move_to(1.0, 1.0);
        path.line_to(1.0, 1.0);
        path.line_to(1.0, 1.0);
        path.line_to(4.0, 1.0);
        path.line_to(4.0, 4.0);

        let mut stage = Simplifier::new(path, true, 0.5);
        let out = run(&mut stage);
        assert_eq!(out[0], Vertex::move_to(1.0, 1.0));
        assert!(out.contains(&Vertex::line_to(4.0, 1.0)));
        assert!(out.contains(&Vertex::line_to(4.0, 4.0)));
    }

    #[test]
    fn close_becomes_line_to_subpath_start() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(4.0, 0.0);
        path.line_to(4.0, 4.0);
        path.close();

        let mut stage = Simplifier::new(path, true, 0.1);
        let out = run(&mut stage);
        assert!(
            out.iter().all(|v| v.cmd != PathCmd::Close),
            "close token must not survive: {out:?}",
        );
        assert!(
            out.contains(&Vertex::line_to(0.0, 0.0)),
            "closing line back to the start missing: {out:?}",
        );
    }

    #[test]
    fn output_never_exceeds_input_vertex_count() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        for i in 1..=100 {
            let x = f64::from(i) * 0.1;
            path.line_to(x, (x * 0.7).sin());
        }
        let input_len = path.len();

        let mut stage = Simplifier::new(path, true, 0.25);
        let out = run(&mut stage);
        assert!(
            out.len() <= input_len,
            "simplification grew the path: {} -> {}",
            input_len,
            out.len(),
        );
    }

    #[test]
    fn double_application_is_stable() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 0.0);
        path.line_to(2.0, 0.0);
        path.line_to(3.0, 0.0);
        path.line_to(4.0, 0.0);
        path.line_to(4.0, 1.0);

        let mut once = Simplifier::new(path, true, 0.5);
        let first = PathBuffer::collect(&mut once);

        let mut twice = Simplifier::new(first.clone(), true, 0.5);
        assert_eq!(PathBuffer::collect(&mut twice), first);
    }

    #[test]
    fn disabled_stage_is_verbatim() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 0.0);
        path.line_to(2.0, 0.0);

        let mut stage = Simplifier::new(path.clone(), false, 10.0);
        assert_eq!(run(&mut stage), path.vertices());
    }

    #[test]
    fn multiple_subpaths_each_get_their_move_to() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 0.0);
        path.line_to(2.0, 0.0);
        path.move_to(10.0, 10.0);
        path.line_to(11.0, 10.0);
        path.line_to(12.0, 10.0);

        let mut stage = Simplifier::new(path, true, 0.5);
        let out = run(&mut stage);
        let moves: Vec<&Vertex> = out.iter().filter(|v| v.cmd == PathCmd::MoveTo).collect();
        assert_eq!(moves.len(), 2, "expected two subpath starts in {out:?}");
        assert_eq!(*moves[0], Vertex::move_to(0.0, 0.0));
        assert_eq!(*moves[1], Vertex::move_to(10.0, 10.0));
    }

    #[test]
    fn empty_path_flushes_a_bare_origin() {
        // An empty source still produces the end-of-path flush of the
        // (never-moved) pen position.
        let mut stage = Simplifier::new(PathBuffer::new(), true, 0.5);
        let out = run(&mut stage);
        assert_eq!(out, vec![Vertex::move_to(0.0, 0.0)]);
    }

    #[test]
    fn rewind_resets_the_run_state() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 0.0);
        path.line_to(2.0, 0.0);
        path.line_to(2.0, 2.0);

        let mut stage = Simplifier::new(path, true, 0.5);
        let first = run(&mut stage);
        stage.rewind(0);
        let second = run(&mut stage);
        assert_eq!(first, second);
    }
}
