//! migaki-export: serializers for cleaned path token streams.
//!
//! Converts the pipeline's output into interchange formats. Everything
//! here is a pure function returning a `String`; no I/O.

mod svg;

pub use svg::{SvgMetadata, to_svg};
