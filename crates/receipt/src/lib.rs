//! Receipt - single-page receipt documents
//!
//! This crate provides:
//! - The amount/tax calculator for tax-inclusive totals
//! - The receipt data model and payment-method dictionary
//! - A fixed A4 layout engine producing a display list (`PageLayout`)
//! - PDF rendering of the display list through `pdf-core`
//! - PNG preview rasterization returned as a `data:` URI
//! - Download filename and Content-Disposition helpers
//!
//! # Example
//!
//! ```ignore
//! use receipt::{ReceiptFonts, ReceiptRenderer};
//!
//! let fonts = ReceiptFonts::load(std::fs::read("NotoSansJP-Regular.ttf")?, None)?;
//! let renderer = ReceiptRenderer::new(&fonts);
//! let pdf = renderer.render_pdf(&data, generated_at)?;
//! let preview_url = renderer.render_preview(&data, generated_at)?;
//! ```

mod filename;
mod fonts;
mod layout;
mod measure;
mod model;
mod preview;
mod renderer;
mod tax;

pub use filename::{content_disposition, document_filename, sanitize_filename_part};
pub use fonts::ReceiptFonts;
pub use layout::{
    layout_receipt, tax_label, Element, LineElement, PageLayout, RectElement, TextElement, MARGIN,
    NOTES_MAX_LINES,
};
pub use measure::{FixedAdvance, FontMetrics, TextMeasure};
pub use model::{Issuer, PaymentMethod, ReceiptData};
pub use preview::{png_data_uri, Rasterizer, PREVIEW_SCALE};
pub use renderer::{pdf_from_layout, ReceiptRenderer, PRODUCER};
pub use tax::TaxBreakdown;

/// Document type printed as the title and used in download filenames
pub const DOCUMENT_TITLE: &str = "領収書";

use thiserror::Error;

/// Errors that can occur while producing receipt documents
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Font error: {0}")]
    FontError(String),

    #[error("Raster error: {0}")]
    RasterError(String),

    #[error("PDF error: {0}")]
    PdfError(#[from] pdf_core::PdfError),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

/// Result type for receipt operations
pub type Result<T> = std::result::Result<T, ReceiptError>;
