//! Text measurement used by the layout engine

use crate::fonts::ReceiptFonts;
use pdf_core::{FontFamily, FontWeight};

/// Measures rendered text width in points
pub trait TextMeasure {
    fn text_width(&self, text: &str, size: f64, weight: FontWeight) -> f64;
}

/// Width from the glyph advances of the loaded TrueType fonts
///
/// Uses the same metrics the PDF embedder uses, so right-aligned text lands
/// exactly on its anchor in the rendered document.
pub struct FontMetrics<'a> {
    family: &'a FontFamily,
}

impl<'a> FontMetrics<'a> {
    pub fn new(fonts: &'a ReceiptFonts) -> Self {
        Self {
            family: &fonts.family,
        }
    }
}

impl TextMeasure for FontMetrics<'_> {
    fn text_width(&self, text: &str, size: f64, weight: FontWeight) -> f64 {
        f64::from(
            self.family
                .get_variant(weight)
                .text_width_points(text, size as f32),
        )
    }
}

/// Half an em for ASCII, a full em for everything else
///
/// Close to real proportions for Japanese text set in a gothic face; used
/// where no font is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAdvance;

impl TextMeasure for FixedAdvance {
    fn text_width(&self, text: &str, size: f64, _weight: FontWeight) -> f64 {
        text.chars()
            .map(|c| if c.is_ascii() { size / 2.0 } else { size })
            .sum()
    }
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn text_width(&self, text: &str, size: f64, weight: FontWeight) -> f64 {
        (**self).text_width(text, size, weight)
    }
}
