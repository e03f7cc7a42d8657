//! CSS color strings → RGBA.
//!
//! Pens store colors the way the host canvas expects them (`"#1890ff"`,
//! `"rgba(0,0,0,0.5)"`, `"transparent"`). Backends that cannot take CSS
//! strings directly parse them here. Built on `winnow` 0.7.

use winnow::ascii::space0;
use winnow::combinator::{alt, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let digits: Vec<u8> = hex.bytes().map(hex_val).collect::<Option<_>>()?;
        let channel = |hi: u8, lo: u8| f32::from(hi << 4 | lo) / 255.0;
        match digits.as_slice() {
            [r, g, b] => Some(Self::rgba(channel(*r, *r), channel(*g, *g), channel(*b, *b), 1.0)),
            [r, g, b, a] => Some(Self::rgba(
                channel(*r, *r),
                channel(*g, *g),
                channel(*b, *b),
                channel(*a, *a),
            )),
            [r1, r2, g1, g2, b1, b2] => Some(Self::rgba(
                channel(*r1, *r2),
                channel(*g1, *g2),
                channel(*b1, *b2),
                1.0,
            )),
            [r1, r2, g1, g2, b1, b2, a1, a2] => Some(Self::rgba(
                channel(*r1, *r2),
                channel(*g1, *g2),
                channel(*b1, *b2),
                channel(*a1, *a2),
            )),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Parse any supported CSS color string. Returns `None` for unknown input.
pub fn parse_css_color(input: &str) -> Option<Color> {
    let mut rest = input.trim();
    let color = alt((parse_hex_color, parse_rgb_function, parse_named_color))
        .parse_next(&mut rest)
        .ok()?;
    if rest.trim().is_empty() {
        Some(color)
    } else {
        log::warn!("trailing input after color {input:?}");
        None
    }
}

fn parse_hex_color(input: &mut &str) -> ModalResult<Color> {
    let _ = '#'.parse_next(input)?;
    let digits: &str = take_while(3..=8, |c: char| c.is_ascii_hexdigit()).parse_next(input)?;
    Color::from_hex(digits).ok_or_else(|| ErrMode::Backtrack(ContextError::new()))
}

fn parse_rgb_function(input: &mut &str) -> ModalResult<Color> {
    let _ = alt(("rgba(", "rgb(")).parse_next(input)?;
    let _ = space0.parse_next(input)?;
    let r = parse_number.parse_next(input)?;
    let g = preceded(separator, parse_number).parse_next(input)?;
    let b = preceded(separator, parse_number).parse_next(input)?;
    let a = opt(preceded(separator, parse_number)).parse_next(input)?;
    let _ = (space0, ')').parse_next(input)?;
    Ok(Color::rgba(
        (r / 255.0).clamp(0.0, 1.0),
        (g / 255.0).clamp(0.0, 1.0),
        (b / 255.0).clamp(0.0, 1.0),
        a.unwrap_or(1.0).clamp(0.0, 1.0),
    ))
}

fn parse_named_color(input: &mut &str) -> ModalResult<Color> {
    let name: &str = take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;
    let hex = match name.to_ascii_lowercase().as_str() {
        "transparent" => return Ok(Color::TRANSPARENT),
        "black" => "000000",
        "white" => "ffffff",
        "red" => "ff0000",
        "green" => "008000",
        "blue" => "0000ff",
        "yellow" => "ffff00",
        "orange" => "ffa500",
        "gray" | "grey" => "808080",
        _ => return Err(ErrMode::Backtrack(ContextError::new())),
    };
    Color::from_hex(hex).ok_or_else(|| ErrMode::Backtrack(ContextError::new()))
}

fn separator(input: &mut &str) -> ModalResult<()> {
    (space0, alt((',', ' ')), space0).void().parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<f32> {
    let start = *input;
    if input.starts_with('-') {
        *input = &input[1..];
    }
    let _ = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    if input.starts_with('.') {
        *input = &input[1..];
        let _ = take_while::<_, _, ContextError>(0.., |c: char| c.is_ascii_digit()).parse_next(input);
    }
    let matched = &start[..start.len() - input.len()];
    matched
        .parse::<f32>()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn hex_forms() {
        let c = parse_css_color("#1890ff").unwrap();
        assert_eq!(c.to_hex(), "#1890FF");
        let short = parse_css_color("#f00").unwrap();
        assert_eq!(short.to_hex(), "#FF0000");
        let alpha = parse_css_color("#FF000080").unwrap();
        assert!(close(alpha.a, 128.0 / 255.0));
    }

    #[test]
    fn rgb_functions() {
        let c = parse_css_color("rgba(255, 0, 0, 0.5)").unwrap();
        assert!(close(c.r, 1.0) && close(c.g, 0.0) && close(c.a, 0.5));
        let c = parse_css_color("rgb(0,128,255)").unwrap();
        assert!(close(c.g, 128.0 / 255.0));
        assert!(close(c.a, 1.0));
    }

    #[test]
    fn named_and_transparent() {
        assert_eq!(parse_css_color("transparent"), Some(Color::TRANSPARENT));
        assert_eq!(parse_css_color("Black"), Some(Color::BLACK));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_css_color("not-a-color"), None);
        assert_eq!(parse_css_color("#12"), None);
        assert_eq!(parse_css_color("rgb(1,2)"), None);
    }
}
