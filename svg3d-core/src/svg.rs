//! SVG serialization of a built scene
use std::fmt::{self, Write};

use nalgebra::Point2;

use crate::affine::Affine2;
use crate::elements::{EdgeElement, FaceElement, ImageElement, LabelElement, RenderElement, RenderOutput};
use crate::overlay::{AxisArrow, Overlay, OverlayLine};

/// Decimal places of screen coordinates
const POINT_DECIMALS: i32 = 2;
/// Decimal places of transform coefficients and texture-space clip points
const MATRIX_DECIMALS: i32 = 6;

const STROKE_GROUP_OPEN: &str =
    r##"  <g stroke="#000" stroke-width="1" stroke-linecap="round" stroke-linejoin="round">"##;
const DASH_ARRAY: &str = "4 3";

/// Serialize `output` to a standalone SVG document
pub fn to_svg(output: &RenderOutput) -> String {
    SvgDocument(output).to_string()
}

/// Display adapter writing a [`RenderOutput`] as SVG markup
pub struct SvgDocument<'a>(pub &'a RenderOutput);

impl fmt::Display for SvgDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = self.0;
        let (w, h) = (f64::from(out.width), f64::from(out.height));
        writeln!(
            f,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="{} {} {} {}">"#,
            out.width,
            out.height,
            num(-w / 2.0),
            num(-h / 2.0),
            out.width,
            out.height
        )?;

        if let Some(background) = &out.background {
            writeln!(
                f,
                r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                num(-w / 2.0),
                num(-h / 2.0),
                out.width,
                out.height,
                background
            )?;
        }

        // clip ids follow the order images appear in the element list
        let images: Vec<&ImageElement> = out
            .elements
            .iter()
            .filter_map(|e| match e {
                RenderElement::Image(image) => Some(image),
                _ => None,
            })
            .collect();
        if !images.is_empty() {
            write_defs(f, &out.textures, &images)?;
        }

        let mut in_stroke_group = false;
        let mut next_clip = 0;
        for element in &out.elements {
            match element {
                RenderElement::Face(_) | RenderElement::Image(_) if !in_stroke_group => {
                    writeln!(f, "{STROKE_GROUP_OPEN}")?;
                    in_stroke_group = true;
                }
                RenderElement::Label(_) | RenderElement::Edge(_) if in_stroke_group => {
                    writeln!(f, "  </g>")?;
                    in_stroke_group = false;
                }
                _ => {}
            }

            match element {
                RenderElement::Face(face) => write_face(f, face)?,
                RenderElement::Image(image) => {
                    write_image(f, image, next_clip)?;
                    next_clip += 1;
                }
                RenderElement::Label(label) => write_label(f, label)?,
                RenderElement::Edge(edge) => write_edge(f, edge)?,
            }
        }
        if in_stroke_group {
            writeln!(f, "  </g>")?;
        }

        for overlay in &out.overlays {
            write_overlay(f, overlay)?;
        }

        f.write_str("</svg>")
    }
}

fn write_defs(f: &mut impl Write, textures: &[String], images: &[&ImageElement]) -> fmt::Result {
    writeln!(f, "  <defs>")?;
    for (id, href) in textures.iter().enumerate() {
        writeln!(
            f,
            r#"    <image id="tex{id}" href="{}" width="1" height="1" preserveAspectRatio="none" style="image-rendering:pixelated"/>"#,
            Escaped(href)
        )?;
    }
    for (id, image) in images.iter().enumerate() {
        write!(
            f,
            r#"    <clipPath id="clip{id}" clipPathUnits="objectBoundingBox"><polygon points=""#
        )?;
        write_points(f, &image.clip, MATRIX_DECIMALS)?;
        writeln!(f, r#""/></clipPath>"#)?;
    }
    writeln!(f, "  </defs>")
}

fn write_face(f: &mut impl Write, face: &FaceElement) -> fmt::Result {
    write!(f, r#"    <polygon fill="{}""#, face.fill)?;
    if !face.stroke {
        f.write_str(r#" stroke="none""#)?;
    }
    f.write_str(r#" points=""#)?;
    write_points(f, &face.points, POINT_DECIMALS)?;
    writeln!(f, r#""/>"#)
}

fn write_image(f: &mut impl Write, image: &ImageElement, clip: usize) -> fmt::Result {
    writeln!(
        f,
        r##"    <g transform="{}" clip-path="url(#clip{clip})"><use href="#tex{}"/></g>"##,
        Matrix(&image.transform),
        image.texture
    )
}

fn write_label(f: &mut impl Write, label: &LabelElement) -> fmt::Result {
    writeln!(
        f,
        r#"  <g font-family="sans-serif" font-size="14" text-anchor="middle" dominant-baseline="central" transform="{}"><text x="0" y="0" fill="{}">{}</text></g>"#,
        Matrix(&label.transform),
        label.fill,
        Escaped(&label.text)
    )
}

fn write_edge(f: &mut impl Write, edge: &EdgeElement) -> fmt::Result {
    write!(f, r#"  <polyline fill="none" stroke="{}" points=""#, edge.stroke)?;
    write_points(f, &edge.points, POINT_DECIMALS)?;
    writeln!(f, r#""/>"#)
}

fn write_overlay(f: &mut impl Write, overlay: &Overlay) -> fmt::Result {
    match overlay {
        Overlay::Grid(lines) => {
            writeln!(f, r#"  <g class="grid" stroke-width="1">"#)?;
            lines.iter().try_for_each(|line| write_line(f, line))?;
        }
        Overlay::Origin(lines) => {
            writeln!(f, r#"  <g class="origin" stroke-width="1.5">"#)?;
            lines.iter().try_for_each(|line| write_line(f, line))?;
        }
        Overlay::Axes(arrows) => {
            writeln!(
                f,
                r#"  <g class="axes" stroke-width="2" font-family="sans-serif" font-size="10" text-anchor="middle" dominant-baseline="central">"#
            )?;
            arrows.iter().try_for_each(|arrow| write_arrow(f, arrow))?;
        }
    }
    writeln!(f, "  </g>")
}

fn write_line(f: &mut impl Write, line: &OverlayLine) -> fmt::Result {
    write!(
        f,
        r#"    <line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}""#,
        num(line.from.x),
        num(line.from.y),
        num(line.to.x),
        num(line.to.y),
        line.stroke
    )?;
    if line.dashed {
        write!(f, r#" stroke-dasharray="{DASH_ARRAY}""#)?;
    }
    writeln!(f, "/>")
}

fn write_arrow(f: &mut impl Write, arrow: &AxisArrow) -> fmt::Result {
    write_line(f, &arrow.line)?;
    let color = arrow.line.stroke;
    if !arrow.head.is_empty() {
        write!(f, r#"    <polygon fill="{color}" stroke="none" points=""#)?;
        write_points(f, &arrow.head, POINT_DECIMALS)?;
        writeln!(f, r#""/>"#)?;
    }
    writeln!(
        f,
        r#"    <text x="{}" y="{}" fill="{color}" stroke="none">{}</text>"#,
        num(arrow.label_at.x),
        num(arrow.label_at.y),
        arrow.name
    )
}

fn write_points(f: &mut impl Write, points: &[Point2<f64>], decimals: i32) -> fmt::Result {
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            f.write_char(' ')?;
        }
        write!(f, "{},{}", round_to(p.x, decimals), round_to(p.y, decimals))?;
    }
    Ok(())
}

/// Round to `decimals` places; non-finite values and negative zero become `0`
fn round_to(v: f64, decimals: i32) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    let scale = 10f64.powi(decimals);
    let r = (v * scale).round() / scale;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

fn num(v: f64) -> f64 {
    round_to(v, POINT_DECIMALS)
}

/// `matrix(a b c d e f)`
struct Matrix<'a>(&'a Affine2);

impl fmt::Display for Matrix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("matrix(")?;
        for (i, c) in self.0.coefficients().into_iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{}", round_to(c, MATRIX_DECIMALS))?;
        }
        f.write_char(')')
    }
}

/// XML-escaped text, safe in both content and attribute values
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&apos;")?,
                _ => f.write_char(c)?,
            }
        }
        Ok(())
    }
}
