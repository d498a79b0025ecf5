//! Rectangle and rule operators

use crate::document::Color;

/// Paint settings for a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub line_width: f64,
}

impl ShapeStyle {
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            line_width: 0.0,
        }
    }

    pub fn stroked(color: Color, line_width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            line_width,
        }
    }

    pub fn filled_and_stroked(fill: Color, stroke: Color, line_width: f64) -> Self {
        Self {
            fill: Some(fill),
            stroke: Some(stroke),
            line_width,
        }
    }
}

fn push_state(ops: &mut String, style: &ShapeStyle) {
    ops.push_str("q\n");
    if let Some(fill) = style.fill {
        ops.push_str(&format!("{} {} {} rg\n", fill.r, fill.g, fill.b));
    }
    if let Some(stroke) = style.stroke {
        ops.push_str(&format!("{} {} {} RG\n", stroke.r, stroke.g, stroke.b));
        ops.push_str(&format!("{} w\n", style.line_width));
    }
}

/// Generate operators for a rectangle whose lower-left corner is `(x, y)` in PDF space
///
/// A style with neither fill nor stroke paints nothing.
pub fn generate_rect_operators(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    style: &ShapeStyle,
) -> Vec<u8> {
    let paint = match (style.fill.is_some(), style.stroke.is_some()) {
        (true, true) => "B",
        (true, false) => "f",
        (false, true) => "S",
        (false, false) => return Vec::new(),
    };

    let mut ops = String::new();
    push_state(&mut ops, style);
    ops.push_str(&format!("{x} {y} {width} {height} re\n"));
    ops.push_str(paint);
    ops.push_str("\nQ\n");
    ops.into_bytes()
}

/// Generate operators for a straight line between two PDF-space points
pub fn generate_line_operators(
    from: (f64, f64),
    to: (f64, f64),
    color: Color,
    line_width: f64,
) -> Vec<u8> {
    let mut ops = String::new();
    push_state(&mut ops, &ShapeStyle::stroked(color, line_width));
    ops.push_str(&format!("{} {} m\n", from.0, from.1));
    ops.push_str(&format!("{} {} l\n", to.0, to.1));
    ops.push_str("S\nQ\n");
    ops.into_bytes()
}
