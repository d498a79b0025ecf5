//! Text rendering utilities

use crate::document::Color;

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Text color (RGB)
    pub color: Color,
}

/// Generate PDF operators for text insertion
///
/// Creates the text operators (BT, rg, Tf, Td, Tj, ET) that draw one run of
/// already-encoded glyphs with its left edge at `x`.
///
/// # Arguments
/// * `text_hex` - Hex-encoded glyph ids (e.g., "<00410042>")
/// * `x` - X coordinate in points (PDF coordinates, from left)
/// * `y` - Baseline Y coordinate in points (PDF coordinates, from bottom)
/// * `ctx` - Text rendering context
pub fn generate_text_operators(text_hex: &str, x: f64, y: f64, ctx: &TextRenderContext) -> Vec<u8> {
    let mut ops = String::new();

    ops.push_str("BT\n");
    ops.push_str(&format!(
        "{} {} {} rg\n",
        ctx.color.r, ctx.color.g, ctx.color.b
    ));
    ops.push_str(&format!("/{} {} Tf\n", ctx.font_name, ctx.font_size));
    ops.push_str(&format!("{x} {y} Td\n"));
    ops.push_str(&format!("{text_hex} Tj\n"));
    ops.push_str("ET\n");

    ops.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(font_size: f32, color: Color) -> TextRenderContext {
        TextRenderContext {
            font_name: "F1".to_string(),
            font_size,
            color,
        }
    }

    #[test]
    fn test_generate_text_operators() {
        let ops = generate_text_operators("<00410042>", 100.0, 700.0, &ctx(12.0, Color::black()));
        let ops = String::from_utf8(ops).unwrap();

        assert_eq!(ops, "BT\n0 0 0 rg\n/F1 12 Tf\n100 700 Td\n<00410042> Tj\nET\n");
    }

    #[test]
    fn test_generate_text_operators_empty_text() {
        let ops = generate_text_operators("<>", 0.0, 0.0, &ctx(10.5, Color::black()));
        let ops = String::from_utf8(ops).unwrap();

        assert!(ops.contains("/F1 10.5 Tf"));
        assert!(ops.contains("<> Tj"));
    }

    #[test]
    fn test_generate_text_operators_with_color() {
        let orange = ctx(24.0, Color::rgb(1.0, 0.5, 0.0));
        let ops = generate_text_operators("<0001>", 50.5, 20.25, &orange);
        let ops = String::from_utf8(ops).unwrap();

        assert!(ops.contains("1 0.5 0 rg"));
        assert!(ops.contains("50.5 20.25 Td"));
    }
}
