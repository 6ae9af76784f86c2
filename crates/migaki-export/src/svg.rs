//! SVG export serializer.
//!
//! Converts a path token stream into an SVG string with one `<path>`
//! element per subpath, using `M`/`L`/`Q`/`C`/`Z` commands. Optional
//! [`SvgMetadata`] embeds `<title>` and `<desc>` elements plus a
//! namespaced `<metadata>` block carrying the pipeline configuration
//! JSON, so exported files are self-describing.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::fmt::Write;

use migaki_pipeline::{PathBuffer, PathCmd, Vertex};

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title -- emitted as `<title>`.
    pub title: Option<&'a str>,

    /// Document description -- emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized pipeline configuration -- emitted inside a
    /// `<metadata>` element wrapped in a namespaced `<migaki:pipeline>`
    /// element, so exported files carry machine-parseable settings.
    pub config_json: Option<&'a str>,
}

/// Escape the five XML special characters for safe embedding in element
/// text content and attribute values.
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Write the SVG preamble: XML declaration, opening `<svg>` tag, and the
/// optional metadata elements.
fn write_svg_preamble(out: &mut String, width: u32, height: u32, metadata: &SvgMetadata<'_>) {
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#,
    );

    if let Some(title) = metadata.title {
        let _ = writeln!(out, "  <title>{}</title>", xml_escape(title));
    }
    if let Some(description) = metadata.description {
        let _ = writeln!(out, "  <desc>{}</desc>", xml_escape(description));
    }
    if let Some(config_json) = metadata.config_json {
        let _ = writeln!(out, "  <metadata>");
        let _ = writeln!(
            out,
            "    <migaki:pipeline xmlns:migaki=\"https://migaki.dev/ns/1\">{}</migaki:pipeline>",
            xml_escape(config_json),
        );
        let _ = writeln!(out, "  </metadata>");
    }
}

/// Build the `d` attribute for one subpath's tokens.
///
/// Returns `None` when the subpath draws nothing (a bare move, or a
/// truncated curve unit with no complete command). Coordinates are
/// formatted to 1 decimal place (0.1 px precision).
fn subpath_to_path_d(tokens: &[Vertex]) -> Option<String> {
    let mut d = String::new();
    let mut drew_something = false;
    let mut i = 0;

    while i < tokens.len() {
        let v = tokens[i];
        match v.cmd {
            PathCmd::MoveTo => {
                let _ = write!(d, "M {:.1} {:.1}", v.x, v.y);
                i += 1;
            }
            PathCmd::LineTo => {
                let _ = write!(d, " L {:.1} {:.1}", v.x, v.y);
                drew_something = true;
                i += 1;
            }
            PathCmd::Curve3 => {
                // Control token then end token.
                let end = tokens.get(i + 1)?;
                let _ = write!(d, " Q {:.1} {:.1} {:.1} {:.1}", v.x, v.y, end.x, end.y);
                drew_something = true;
                i += 2;
            }
            PathCmd::Curve4 => {
                let c2 = tokens.get(i + 1)?;
                let end = tokens.get(i + 2)?;
                let _ = write!(
                    d,
                    " C {:.1} {:.1} {:.1} {:.1} {:.1} {:.1}",
                    v.x, v.y, c2.x, c2.y, end.x, end.y,
                );
                drew_something = true;
                i += 3;
            }
            PathCmd::Close => {
                let _ = write!(d, " Z");
                drew_something = true;
                i += 1;
            }
            PathCmd::Stop => break,
        }
    }

    drew_something.then_some(d)
}

/// Serialize a cleaned token stream into an SVG document string.
///
/// Each subpath (a `MoveTo` and the commands up to the next `MoveTo`)
/// with at least one drawing command becomes a `<path>` element; bare
/// moves are skipped. The `viewBox` spans `width` x `height` so the SVG
/// coordinate space matches the device pixel grid the pipeline worked in.
///
/// # Examples
///
/// ```
/// use migaki_export::{SvgMetadata, to_svg};
/// use migaki_pipeline::PathBuffer;
///
/// let mut path = PathBuffer::new();
/// path.move_to(10.0, 15.0);
/// path.line_to(12.5, 18.3);
/// let svg = to_svg(&path, 800, 600, &SvgMetadata {
///     title: Some("demo"),
///     ..SvgMetadata::default()
/// });
/// assert!(svg.contains("viewBox=\"0 0 800 600\""));
/// assert!(svg.contains("<title>demo</title>"));
/// assert!(svg.contains("M 10.0 15.0 L 12.5 18.3"));
/// ```
#[must_use]
pub fn to_svg(path: &PathBuffer, width: u32, height: u32, metadata: &SvgMetadata<'_>) -> String {
    let mut out = String::new();

    write_svg_preamble(&mut out, width, height, metadata);

    for subpath in split_subpaths(path.vertices()) {
        if let Some(d) = subpath_to_path_d(subpath) {
            let _ = writeln!(
                out,
                r#"  <path d="{d}" fill="none" stroke="black" stroke-width="1"/>"#,
            );
        }
    }

    let _ = writeln!(out, "</svg>");

    out
}

/// Split a token slice into subpaths at `MoveTo` boundaries.
fn split_subpaths(tokens: &[Vertex]) -> impl Iterator<Item = &[Vertex]> {
    let mut starts: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, v)| v.cmd == PathCmd::MoveTo)
        .map(|(i, _)| i)
        .collect();
    // Tokens before the first move (there should be none in cleaned
    // output) form their own leading chunk.
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    starts.push(tokens.len());

    starts
        .windows(2)
        .map(|w| &tokens[w[0]..w[1]])
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .into_iter()
}
