//! NaN removal: strip non-finite vertices while preserving subpath
//! structure.
//!
//! A figure renderer routinely encodes "missing data" as NaN vertices.
//! This stage drops them and re-enters the path with synthetic `MoveTo`
//! tokens so everything downstream can assume finite coordinates. Curve
//! units are all-or-nothing: one non-finite control point drops the whole
//! unit.
//!
//! Two algorithms are selected at construction. The fast path handles
//! pure polylines; the slow path additionally understands curve units and
//! close tokens, rewriting a `Close` into a `LineTo` back to the subpath
//! start when an earlier NaN broke the loop.

use crate::queue::VertexQueue;
use crate::types::{PathCmd, Vertex, VertexSource};

// One full curve unit (primary + two control tokens) plus a synthetic
// move-to.
const QUEUE_SIZE: usize = 4;

/// Filters non-finite vertices out of a token stream.
#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct NanRemover<S> {
    source: S,
    remove_nans: bool,
    has_codes: bool,
    queue: VertexQueue<QUEUE_SIZE>,
    valid_segment_exists: bool,
    last_segment_valid: bool,
    was_broken: bool,
    init_x: f64,
    init_y: f64,
}

impl<S: VertexSource> NanRemover<S> {
    /// Wrap `source`.
    ///
    /// `has_codes` must be true if the path may contain curve units or
    /// close tokens; it selects the slower all-or-nothing unit algorithm.
    /// When unsure, pass true.
    pub fn new(source: S, remove_nans: bool, has_codes: bool) -> Self {
        Self {
            source,
            remove_nans,
            has_codes,
            queue: VertexQueue::new(),
            // Ignore close tokens until the first finite vertex of the
            // path has been emitted.
            valid_segment_exists: false,
            last_segment_valid: false,
            was_broken: false,
            init_x: f64::NAN,
            init_y: f64::NAN,
        }
    }

    /// Consume the wrapped source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Slow path: curve units and closes are possible.
    fn next_slow(&mut self) -> Vertex {
        if let Some(v) = self.queue.pop() {
            return v;
        }

        let mut needs_move_to = false;
        loop {
            // Each curve unit is pushed to the queue as it is read; if a
            // non-finite vertex shows up mid-unit the queue is emptied and
            // the whole unit dropped.
            let v = self.source.next();
            match v.cmd {
                // Stop and close carry unused coordinates, so NaNs there
                // are left alone.
                PathCmd::Stop => return v,
                PathCmd::Close if self.valid_segment_exists => {
                    if !self.was_broken {
                        return v;
                    }
                    if self.last_segment_valid
                        && self.init_x.is_finite()
                        && self.init_y.is_finite()
                    {
                        // The loop is broken so it cannot be closed, but
                        // both endpoints are finite: emulate the close
                        // with a line back to the start.
                        self.queue.push(Vertex::line_to(self.init_x, self.init_y));
                        break;
                    }
                    // No finite endpoint to connect; skip the close in
                    // case additional subpaths follow.
                    continue;
                }
                PathCmd::Close => continue,
                PathCmd::MoveTo => {
                    // Save the initial point so a broken loop can still
                    // be stitched shut later.
                    self.init_x = v.x;
                    self.init_y = v.y;
                    self.valid_segment_exists = true;
                    self.was_broken = false;
                    self.last_segment_valid = true;
                    return v;
                }
                PathCmd::LineTo | PathCmd::Curve3 | PathCmd::Curve4 => {}
            }

            if needs_move_to {
                self.queue.push(Vertex::move_to(v.x, v.y));
            }

            self.last_segment_valid = v.is_finite();
            self.queue.push(v);

            // The whole unit must be consumed even when an early vertex
            // already failed the finite check.
            let mut last = v;
            for _ in 0..v.cmd.extra_vertices() {
                let ctrl = self.source.next();
                self.last_segment_valid = self.last_segment_valid && ctrl.is_finite();
                self.queue.push(Vertex::new(v.cmd, ctrl.x, ctrl.y));
                last = ctrl;
            }

            if self.last_segment_valid {
                self.valid_segment_exists = true;
                break;
            }

            self.was_broken = true;
            self.queue.clear();

            // Re-enter from the last finite coordinate if there is one,
            // otherwise from the first vertex of the next unit.
            if last.is_finite() {
                self.queue.push(Vertex::move_to(last.x, last.y));
                needs_move_to = false;
            } else {
                needs_move_to = true;
            }
        }

        self.queue.pop().unwrap_or(Vertex::stop())
    }

    /// Fast path: the stream is known to hold only straight lines.
    fn next_fast(&mut self) -> Vertex {
        loop {
            let v = self.source.next();
            match v.cmd {
                PathCmd::Stop => return v,
                PathCmd::Close => {
                    if self.valid_segment_exists {
                        return v;
                    }
                    // No subpath start yet: the close refers to nothing.
                    continue;
                }
                _ => {}
            }

            if v.is_finite() {
                self.valid_segment_exists = true;
                return v;
            }

            // Skip the non-finite run, then re-enter with a move-to at
            // the next finite vertex.
            loop {
                let v = self.source.next();
                if v.cmd == PathCmd::Stop
                    || (v.cmd == PathCmd::Close && self.valid_segment_exists)
                {
                    return v;
                }
                if v.cmd != PathCmd::Close && v.is_finite() {
                    return Vertex::move_to(v.x, v.y);
                }
            }
        }
    }
}

impl<S: VertexSource> VertexSource for NanRemover<S> {
    fn rewind(&mut self, path_id: u32) {
        self.queue.clear();
        self.valid_segment_exists = false;
        self.last_segment_valid = false;
        self.was_broken = false;
        self.init_x = f64::NAN;
        self.init_y = f64::NAN;
        self.source.rewind(path_id);
    }

    fn next(&mut self) -> Vertex {
        if !self.remove_nans {
            return self.source.next();
        }
        if self.has_codes {
            self.next_slow()
        } else {
            self.next_fast()
        }
    }
}

#[cfg(test)]
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

    // --- fast mode ---

    #[test]
    fn fast_mode_identity_on_finite_polyline() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 2.0);
        path.line_to(3.0, 4.0);

        let mut stage = NanRemover::new(path.clone(), true, false);
        assert_eq!(run(&mut stage), path.vertices());
    }

    #[test]
    fn fast_mode_reenters_with_move_to_after_nan() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 1.0);
        path.line_to(f64::NAN, f64::NAN);
        path.line_to(2.0, 2.0);

        let mut stage = NanRemover::new(path, true, false);
        assert_eq!(
            run(&mut stage),
            vec![
                Vertex::move_to(0.0, 0.0),
                Vertex::line_to(1.0, 1.0),
                Vertex::move_to(2.0, 2.0),
            ],
        );
    }

    #[test]
    fn fast_mode_skips_leading_nans() {
        let mut path = PathBuffer::new();
        path.move_to(f64::NAN, 0.0);
        path.line_to(1.0, 1.0);
        path.line_to(2.0, 2.0);

        let mut stage = NanRemover::new(path, true, false);
        assert_eq!(
            run(&mut stage),
            vec![Vertex::move_to(1.0, 1.0), Vertex::line_to(2.0, 2.0)],
        );
    }

    #[test]
    fn fast_mode_drops_close_before_any_valid_vertex() {
        let mut path = PathBuffer::new();
        path.close();
        path.move_to(1.0, 1.0);
        path.line_to(2.0, 2.0);

        let mut stage = NanRemover::new(path, true, false);
        assert_eq!(
            run(&mut stage),
            vec![Vertex::move_to(1.0, 1.0), Vertex::line_to(2.0, 2.0)],
        );
    }

    #[test]
    fn fast_mode_passes_close_after_valid_vertex() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 0.0);
        path.close();

        let mut stage = NanRemover::new(path, true, false);
        let out = run(&mut stage);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].cmd, PathCmd::Close);
    }

    #[test]
    fn fast_mode_nan_run_to_end_terminates() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(f64::NAN, f64::NAN);
        path.line_to(f64::NAN, 5.0);

        let mut stage = NanRemover::new(path, true, false);
        assert_eq!(run(&mut stage), vec![Vertex::move_to(0.0, 0.0)]);
    }

    // --- slow mode ---

    #[test]
    fn slow_mode_identity_on_finite_path_with_close() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 0.0);
        path.line_to(1.0, 1.0);
        path.close();

        let mut stage = NanRemover::new(path.clone(), true, true);
        assert_eq!(run(&mut stage), path.vertices());
    }

    #[test]
    fn slow_mode_drops_whole_curve_unit_on_nan_control_point() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.curve4(1.0, 1.0, f64::NAN, 2.0, 3.0, 0.0);
        path.line_to(4.0, 0.0);

        let mut stage = NanRemover::new(path, true, true);
        assert_eq!(
            run(&mut stage),
            vec![
                Vertex::move_to(0.0, 0.0),
                // The end point of the dropped unit was finite, so it
                // becomes the re-entry point.
                Vertex::move_to(3.0, 0.0),
                Vertex::line_to(4.0, 0.0),
            ],
        );
    }

    #[test]
    fn slow_mode_keeps_finite_curve_units() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.curve3(1.0, 1.0, 2.0, 0.0);

        let mut stage = NanRemover::new(path.clone(), true, true);
        assert_eq!(run(&mut stage), path.vertices());
    }

    #[test]
    fn slow_mode_close_after_break_becomes_line_to_start() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(f64::NAN, f64::NAN);
        path.line_to(2.0, 0.0);
        path.line_to(2.0, 2.0);
        path.close();

        let mut stage = NanRemover::new(path, true, true);
        assert_eq!(
            run(&mut stage),
            vec![
                Vertex::move_to(0.0, 0.0),
                // NaN vertex dropped: it had no finite coordinate, so the
                // next unit is prefixed with a synthetic move-to.
                Vertex::move_to(2.0, 0.0),
                Vertex::line_to(2.0, 0.0),
                Vertex::line_to(2.0, 2.0),
                // The close cannot hold on a broken loop; it turns into a
                // line back to the saved initial point.
                Vertex::line_to(0.0, 0.0),
            ],
        );
    }

    #[test]
    fn slow_mode_close_dropped_when_break_left_no_finite_endpoint() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(1.0, 0.0);
        path.line_to(f64::NAN, f64::NAN);
        path.close();
        path.move_to(5.0, 5.0);
        path.line_to(6.0, 5.0);

        let mut stage = NanRemover::new(path, true, true);
        assert_eq!(
            run(&mut stage),
            vec![
                Vertex::move_to(0.0, 0.0),
                Vertex::line_to(1.0, 0.0),
                Vertex::move_to(5.0, 5.0),
                Vertex::line_to(6.0, 5.0),
            ],
        );
    }

    #[test]
    fn slow_mode_drops_close_before_any_valid_vertex() {
        let mut path = PathBuffer::new();
        path.close();
        path.move_to(1.0, 1.0);
        path.line_to(2.0, 1.0);

        let mut stage = NanRemover::new(path, true, true);
        assert_eq!(
            run(&mut stage),
            vec![Vertex::move_to(1.0, 1.0), Vertex::line_to(2.0, 1.0)],
        );
    }

    // --- shared behavior ---

    #[test]
    fn disabled_stage_is_verbatim() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(f64::NAN, f64::NAN);

        let mut stage = NanRemover::new(path.clone(), false, true);
        assert_eq!(run(&mut stage), path.vertices());
    }

    #[test]
    fn empty_path_yields_immediate_stop() {
        let mut stage = NanRemover::new(PathBuffer::new(), true, true);
        assert_eq!(stage.next().cmd, PathCmd::Stop);
    }

    #[test]
    fn rewind_replays_the_filtered_stream() {
        let mut path = PathBuffer::new();
        path.move_to(0.0, 0.0);
        path.line_to(f64::NAN, f64::NAN);
        path.line_to(2.0, 2.0);
        path.close();

        let mut stage = NanRemover::new(path, true, true);
        let first = run(&mut stage);
        stage.rewind(0);
        let second = run(&mut stage);
        assert_eq!(first, second);
    }
}
