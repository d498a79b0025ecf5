//! PNG preview rasterization of a page layout

use crate::fonts::ReceiptFonts;
use crate::layout::{Element, LineElement, PageLayout, RectElement, TextElement};
use crate::{ReceiptError, Result};
use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Rgb, RgbImage};
use pdf_core::{Color, FontWeight};
use std::io::Cursor;

/// Pixels per point of the preview image
pub const PREVIEW_SCALE: f64 = 1.5;

/// Paints a [`PageLayout`] onto a white RGB canvas
pub struct Rasterizer {
    regular: Option<FontArc>,
    bold: Option<FontArc>,
    scale: f64,
}

impl Rasterizer {
    pub fn new(fonts: &ReceiptFonts) -> Self {
        Self {
            regular: Some(fonts.regular.clone()),
            bold: fonts.bold.clone(),
            scale: PREVIEW_SCALE,
        }
    }

    /// A rasterizer without fonts; text elements are rejected
    pub fn shapes_only() -> Self {
        Self {
            regular: None,
            bold: None,
            scale: PREVIEW_SCALE,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Canvas size in pixels for a page of the given size in points
    pub fn canvas_size(&self, page: &PageLayout) -> (u32, u32) {
        (
            (page.width * self.scale).round().max(1.0) as u32,
            (page.height * self.scale).round().max(1.0) as u32,
        )
    }

    pub fn render(&self, page: &PageLayout) -> Result<RgbImage> {
        let (width, height) = self.canvas_size(page);
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

        for element in &page.elements {
            match element {
                Element::Rect(rect) => self.paint_rect(&mut canvas, rect),
                Element::Line(line) => self.paint_line(&mut canvas, line),
                Element::Text(text) => self.paint_text(&mut canvas, text)?,
            }
        }

        Ok(canvas)
    }

    /// Render and encode as PNG
    pub fn render_png(&self, page: &PageLayout) -> Result<Vec<u8>> {
        let canvas = self.render(page)?;
        let mut bytes = Vec::new();
        canvas.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn px(&self, points: f64) -> f64 {
        points * self.scale
    }

    fn stroke_px(&self, width: f64) -> i64 {
        (self.px(width).round() as i64).max(1)
    }

    fn paint_rect(&self, canvas: &mut RgbImage, rect: &RectElement) {
        let x0 = self.px(rect.x).round() as i64;
        let y0 = self.px(rect.y).round() as i64;
        let x1 = self.px(rect.x + rect.width).round() as i64;
        let y1 = self.px(rect.y + rect.height).round() as i64;

        if let Some(fill) = rect.style.fill {
            fill_span(canvas, x0, y0, x1, y1, fill);
        }
        if let Some(stroke) = rect.style.stroke {
            let t = self.stroke_px(rect.style.line_width);
            fill_span(canvas, x0, y0, x1, y0 + t, stroke);
            fill_span(canvas, x0, y1 - t, x1, y1, stroke);
            fill_span(canvas, x0, y0, x0 + t, y1, stroke);
            fill_span(canvas, x1 - t, y0, x1, y1, stroke);
        }
    }

    fn paint_line(&self, canvas: &mut RgbImage, line: &LineElement) {
        let (fx, fy) = (self.px(line.from.0), self.px(line.from.1));
        let (tx, ty) = (self.px(line.to.0), self.px(line.to.1));
        let t = self.stroke_px(line.width);
        let half = t / 2;

        let steps = (tx - fx).abs().max((ty - fy).abs()).ceil().max(1.0) as i64;
        for i in 0..=steps {
            let k = i as f64 / steps as f64;
            let x = (fx + (tx - fx) * k).round() as i64 - half;
            let y = (fy + (ty - fy) * k).round() as i64 - half;
            fill_span(canvas, x, y, x + t, y + t, line.color);
        }
    }

    fn font_for(&self, weight: FontWeight) -> Option<&FontArc> {
        match weight {
            FontWeight::Bold => self.bold.as_ref().or(self.regular.as_ref()),
            FontWeight::Regular => self.regular.as_ref(),
        }
    }

    fn paint_text(&self, canvas: &mut RgbImage, text: &TextElement) -> Result<()> {
        let font = self
            .font_for(text.weight)
            .ok_or_else(|| ReceiptError::RasterError("no font loaded for text".to_string()))?;

        // PxScale is relative to the font height, not the em square
        let px_per_em = self.px(text.size) as f32;
        let units_per_em = font.units_per_em().unwrap_or(1000.0);
        let scale = PxScale::from(px_per_em * font.height_unscaled() / units_per_em);
        let scaled = font.as_scaled(scale);

        let [r, g, b] = text.color.to_rgb8();
        let (width, height) = canvas.dimensions();
        let mut caret = self.px(text.x) as f32;
        let baseline = self.px(text.y) as f32;
        let mut previous = None;

        for c in text.text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            previous = Some(id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i64 + i64::from(gx);
                let y = bounds.min.y as i64 + i64::from(gy);
                if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                    return;
                }
                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                let alpha = coverage.clamp(0.0, 1.0);
                for (channel, ink) in pixel.0.iter_mut().zip([r, g, b]) {
                    let blended = f32::from(*channel) * (1.0 - alpha) + f32::from(ink) * alpha;
                    *channel = blended.round() as u8;
                }
            });
        }

        Ok(())
    }
}

/// Fill the half-open pixel span [x0, x1) × [y0, y1), clipped to the canvas
fn fill_span(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
    let (width, height) = canvas.dimensions();
    let x0 = x0.clamp(0, i64::from(width)) as u32;
    let x1 = x1.clamp(0, i64::from(width)) as u32;
    let y0 = y0.clamp(0, i64::from(height)) as u32;
    let y1 = y1.clamp(0, i64::from(height)) as u32;
    let pixel = Rgb(color.to_rgb8());

    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, pixel);
        }
    }
}

/// Encode PNG bytes as a `data:image/png;base64,` URI
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_core::ShapeStyle;
    use pretty_assertions::assert_eq;

    fn page_with(elements: Vec<Element>) -> PageLayout {
        PageLayout {
            width: 100.0,
            height: 50.0,
            elements,
        }
    }

    #[test]
    fn test_canvas_is_scaled_and_white() {
        let canvas = Rasterizer::shapes_only().render(&page_with(Vec::new())).unwrap();
        assert_eq!(canvas.dimensions(), (150, 75));
        assert_eq!(canvas.get_pixel(10, 10), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_filled_rect() {
        let page = page_with(vec![Element::Rect(RectElement {
            x: 10.0,
            y: 10.0,
            width: 20.0,
            height: 10.0,
            style: ShapeStyle::filled(Color::black()),
        })]);
        let canvas = Rasterizer::shapes_only().with_scale(1.0).render(&page).unwrap();
        assert_eq!(canvas.get_pixel(15, 15), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(5, 5), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(30, 15), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_stroked_rect_is_hollow() {
        let red = Color::from_rgb(255, 0, 0);
        let page = page_with(vec![Element::Rect(RectElement {
            x: 10.0,
            y: 10.0,
            width: 20.0,
            height: 20.0,
            style: ShapeStyle::stroked(red, 1.0),
        })]);
        let canvas = Rasterizer::shapes_only().with_scale(1.0).render(&page).unwrap();
        assert_eq!(canvas.get_pixel(10, 15), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(29, 15), &Rgb([255, 0, 0]));
        assert_eq!(canvas.get_pixel(20, 20), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_horizontal_line() {
        let page = page_with(vec![Element::Line(LineElement {
            from: (0.0, 20.0),
            to: (100.0, 20.0),
            color: Color::black(),
            width: 1.0,
        })]);
        let canvas = Rasterizer::shapes_only().with_scale(1.0).render(&page).unwrap();
        assert_eq!(canvas.get_pixel(50, 20), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(50, 25), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_shapes_are_clipped() {
        let page = page_with(vec![Element::Rect(RectElement {
            x: -50.0,
            y: -50.0,
            width: 500.0,
            height: 500.0,
            style: ShapeStyle::filled(Color::black()),
        })]);
        let canvas = Rasterizer::shapes_only().render(&page).unwrap();
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(149, 74), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_text_without_font_is_an_error() {
        let page = page_with(vec![Element::Text(TextElement {
            text: "領収書".to_string(),
            x: 0.0,
            y: 20.0,
            size: 12.0,
            weight: FontWeight::Regular,
            color: Color::black(),
        })]);
        let result = Rasterizer::shapes_only().render(&page);
        assert!(matches!(result, Err(ReceiptError::RasterError(_))));
    }

    #[test]
    fn test_png_data_uri() {
        let png = Rasterizer::shapes_only().render_png(&page_with(Vec::new())).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let uri = png_data_uri(&png);
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }
}
