//! Color literals, RGBA normalization and normal-based shading
use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, space0},
    combinator::{all_consuming, map_res},
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::math::{normalize_or_zero, Vec3};

/// How much a face facing straight at (or away from) the viewer is lightened (or darkened)
const SHADE_STRENGTH: f64 = 0.4;

/// CSS basic color keywords
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("white", [255, 255, 255]),
    ("maroon", [128, 0, 0]),
    ("red", [255, 0, 0]),
    ("purple", [128, 0, 128]),
    ("fuchsia", [255, 0, 255]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("olive", [128, 128, 0]),
    ("yellow", [255, 255, 0]),
    ("navy", [0, 0, 128]),
    ("blue", [0, 0, 255]),
    ("teal", [0, 128, 128]),
    ("aqua", [0, 255, 255]),
    ("orange", [255, 165, 0]),
];

/// Normalized color: channels in `0..=255`, alpha in `0..=1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const GRAY: Rgba = Rgba::new(128.0, 128.0, 128.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Blend toward white by `f`
    pub fn lighten(&self, f: f64) -> Self {
        Self::new(
            self.r + (255.0 - self.r) * f,
            self.g + (255.0 - self.g) * f,
            self.b + (255.0 - self.b) * f,
            self.a,
        )
    }

    /// Blend toward black by `f`
    pub fn darken(&self, f: f64) -> Self {
        Self::new(
            self.r * (1.0 - f),
            self.g * (1.0 - f),
            self.b * (1.0 - f),
            self.a,
        )
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

/// CSS `rgba(r,g,b,a)` with rounded channels
impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({},{},{},{})",
            self.r.round(),
            self.g.round(),
            self.b.round(),
            self.a
        )
    }
}

/// A color as written in a scene document: a CSS-like literal or an `[r, g, b, a]` quadruple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Literal(String),
    Rgba([f64; 4]),
}

impl Color {
    pub fn to_rgba(&self) -> Rgba {
        match self {
            Color::Literal(s) => parse_color(s),
            Color::Rgba([r, g, b, a]) => Rgba::new(*r, *g, *b, *a),
        }
    }
}

impl From<&str> for Color {
    fn from(s: &str) -> Self {
        Color::Literal(s.to_string())
    }
}

impl From<Rgba> for Color {
    fn from(c: Rgba) -> Self {
        Color::Rgba([c.r, c.g, c.b, c.a])
    }
}

/// Parse a color literal. Never fails: unrecognized input is opaque black.
pub fn parse_color(literal: &str) -> Rgba {
    let s = literal.trim().to_ascii_lowercase();
    if let Ok((_, rgba)) = all_consuming(alt((hex_color, functional_color)))(s.as_str()) {
        return rgba;
    }
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == s)
        .map(|(_, [r, g, b])| Rgba::new(f64::from(*r), f64::from(*g), f64::from(*b), 1.0))
        .unwrap_or(Rgba::BLACK)
}

/// Lighten or darken `base` by the z-component of `normal`.
///
/// Non-negative z blends toward white by `0.4 * z`, negative z toward black by `0.4 * |z|`.
pub fn shade_by_normal(base: &Rgba, normal: &Vec3) -> Rgba {
    let n = normalize_or_zero(normal);
    if n.z >= 0.0 {
        base.lighten(n.z * SHADE_STRENGTH)
    } else {
        base.darken(-n.z * SHADE_STRENGTH)
    }
}

fn hex_color(input: &str) -> IResult<&str, Rgba> {
    let (input, digits) = preceded(
        char('#'),
        take_while_m_n(3, 6, |c: char| c.is_ascii_hexdigit()),
    )(input)?;
    let channel = |s: &str| u8::from_str_radix(s, 16).map(f64::from).unwrap_or(0.0);
    let rgba = match digits.len() {
        3 => {
            let expand = |i: usize| {
                let d = &digits[i..=i];
                channel(&format!("{d}{d}"))
            };
            Rgba::new(expand(0), expand(1), expand(2), 1.0)
        }
        6 => Rgba::new(
            channel(&digits[0..2]),
            channel(&digits[2..4]),
            channel(&digits[4..6]),
            1.0,
        ),
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::LengthValue,
            )))
        }
    };
    Ok((input, rgba))
}

/// `rgb(r,g,b)` or `rgba(r,g,b,a)`; missing channels default to 0 and alpha to 1
fn functional_color(input: &str) -> IResult<&str, Rgba> {
    let (input, values) = preceded(
        alt((tag("rgba"), tag("rgb"))),
        delimited(
            preceded(space0, char('(')),
            map_res(
                separated_list1(
                    delimited(space0, char(','), space0),
                    preceded(space0, double),
                ),
                |v: Vec<f64>| if v.len() <= 4 { Ok(v) } else { Err("too many channels") },
            ),
            preceded(space0, char(')')),
        ),
    )(input)?;
    let get = |i: usize, default: f64| values.get(i).copied().unwrap_or(default);
    Ok((input, Rgba::new(get(0, 0.0), get(1, 0.0), get(2, 0.0), get(3, 1.0))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_red_literals() {
        let named = parse_color("red");
        assert_eq!(named, Rgba::new(255.0, 0.0, 0.0, 1.0));
        assert_eq!(parse_color("#FF0000"), named);
        assert_eq!(parse_color("#f00"), named);
        assert_eq!(parse_color("rgba(255,0,0,1)"), named);
        assert_eq!(parse_color("rgb(255, 0, 0)"), named);
        assert_eq!(Color::Rgba([255.0, 0.0, 0.0, 1.0]).to_rgba(), named);
    }

    #[test]
    fn test_named_and_case() {
        assert_eq!(parse_color("  Orange "), Rgba::new(255.0, 165.0, 0.0, 1.0));
        assert_eq!(parse_color("grey"), parse_color("gray"));
        assert_eq!(parse_color("#AbC"), Rgba::new(170.0, 187.0, 204.0, 1.0));
    }

    #[test]
    fn test_alpha_and_spacing() {
        assert_eq!(
            parse_color("rgba( 0 , 128 , 255 , 0.8 )"),
            Rgba::new(0.0, 128.0, 255.0, 0.8)
        );
    }

    #[test]
    fn test_unparseable_is_black() {
        for s in ["", "nope", "#12", "#1234", "rgba(1,2,3,4,5)", "rgb(x,y,z)", "#gggggg"] {
            assert_eq!(parse_color(s), Rgba::BLACK, "{s}");
        }
    }

    #[test]
    fn test_css_output() {
        assert_eq!(Rgba::new(254.6, 0.2, 10.0, 0.5).to_string(), "rgba(255,0,10,0.5)");
        assert_eq!(Rgba::GRAY.to_string(), "rgba(128,128,128,1)");
    }

    #[test]
    fn test_shade_by_normal() {
        let base = Rgba::new(100.0, 100.0, 100.0, 1.0);
        let lit = shade_by_normal(&base, &Vec3::new(0.0, 0.0, 2.0));
        assert!((lit.r - (100.0 + 155.0 * 0.4)).abs() < 1e-9);
        let dark = shade_by_normal(&base, &Vec3::new(0.0, 0.0, -1.0));
        assert!((dark.r - 60.0).abs() < 1e-9);
        // Edge-on faces keep the base color
        assert_eq!(shade_by_normal(&base, &Vec3::new(1.0, 0.0, 0.0)), base);
        assert_eq!(shade_by_normal(&base, &Vec3::zeros()), base);
    }

    #[test]
    fn test_color_deserialize() {
        let c: Color = serde_json::from_str("\"#00ff00\"").unwrap();
        assert_eq!(c.to_rgba(), Rgba::new(0.0, 255.0, 0.0, 1.0));
        let c: Color = serde_json::from_str("[1, 2, 3, 0.5]").unwrap();
        assert_eq!(c.to_rgba(), Rgba::new(1.0, 2.0, 3.0, 0.5));
    }
}
