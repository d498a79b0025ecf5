//! Receipt rendering to PDF bytes and PNG previews

use crate::fonts::{ReceiptFonts, FAMILY};
use crate::layout::{layout_receipt, Element, PageLayout};
use crate::measure::FontMetrics;
use crate::model::ReceiptData;
use crate::preview::{png_data_uri, Rasterizer};
use crate::{Result, DOCUMENT_TITLE};
use chrono::NaiveDateTime;
use pdf_core::{Align, DocumentInfo, FontFamily, PdfDocument};

/// Producer written into the PDF information dictionary
pub const PRODUCER: &str = "coachdesk";

/// Renders receipts with a fixed set of fonts
#[derive(Clone)]
pub struct ReceiptRenderer {
    fonts: ReceiptFonts,
}

impl ReceiptRenderer {
    pub fn new(fonts: &ReceiptFonts) -> Self {
        Self {
            fonts: fonts.clone(),
        }
    }

    /// Lay out `data` measured with the loaded fonts
    pub fn layout(&self, data: &ReceiptData, generated_at: NaiveDateTime) -> PageLayout {
        layout_receipt(data, &FontMetrics::new(&self.fonts), generated_at)
    }

    /// Render a single-page PDF
    pub fn render_pdf(&self, data: &ReceiptData, generated_at: NaiveDateTime) -> Result<Vec<u8>> {
        let page = self.layout(data, generated_at);
        let info = DocumentInfo {
            title: Some(format!("{} {}", DOCUMENT_TITLE, data.number)),
            author: Some(data.issuer.name.clone()).filter(|name| !name.trim().is_empty()),
            producer: Some(PRODUCER.to_string()),
            creation_date: Some(generated_at.format("D:%Y%m%d%H%M%S").to_string()),
        };
        pdf_from_layout(&page, Some(&self.fonts.family), info)
    }

    /// Render the same layout as a PNG `data:` URI
    pub fn render_preview(
        &self,
        data: &ReceiptData,
        generated_at: NaiveDateTime,
    ) -> Result<String> {
        let page = self.layout(data, generated_at);
        let png = Rasterizer::new(&self.fonts).render_png(&page)?;
        Ok(png_data_uri(&png))
    }
}

/// Paint a display list onto a one-page PDF
///
/// `family` may be `None` only for layouts without text.
pub fn pdf_from_layout(
    page: &PageLayout,
    family: Option<&FontFamily>,
    info: DocumentInfo,
) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::with_page_size(page.width, page.height);
    doc.set_info(info);
    if let Some(family) = family {
        doc.add_font_family(FAMILY, family.clone())?;
    }
    let page_number = 1;

    for element in &page.elements {
        match element {
            Element::Text(text) => {
                doc.set_font(FAMILY, text.size as f32)?;
                doc.set_font_weight(text.weight);
                doc.set_text_color(text.color);
                doc.insert_text(&text.text, page_number, text.x, text.y, Align::Left)?;
            }
            Element::Rect(rect) => {
                doc.draw_rect(
                    page_number,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    &rect.style,
                )?;
            }
            Element::Line(line) => {
                doc.draw_line(page_number, line.from, line.to, line.color, line.width)?;
            }
        }
    }

    Ok(doc.to_bytes()?)
}
