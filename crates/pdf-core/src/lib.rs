//! PDF Core - Low-level PDF page building
//!
//! This crate provides functionality for:
//! - Creating blank single-size documents (A4 by default)
//! - Embedding TrueType fonts as subsetted Type0/CIDFontType2 fonts
//! - Inserting text at specific coordinates with alignment
//! - Drawing filled/stroked rectangles and rules
//! - Document info metadata and Flate-compressed content streams
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, FontFamilyBuilder, PdfDocument};
//!
//! let mut doc = PdfDocument::new_a4();
//! doc.register_font_family("gothic", FontFamilyBuilder::new().regular(data))?;
//! doc.set_font("gothic", 12.0)?;
//! doc.insert_text("領収書", 1, 297.64, 80.0, Align::Center)?;
//! let bytes = doc.to_bytes()?;
//! ```

mod document;
mod font;
mod shape;
mod text;

pub use document::{Color, DocumentInfo, PdfDocument, A4_HEIGHT, A4_WIDTH};
pub use font::{FontData, FontFamily, FontFamilyBuilder, FontWeight};
pub use shape::{generate_line_operators, generate_rect_operators, ShapeStyle};
pub use text::{generate_text_operators, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Font subset error: {0}")]
    FontSubsetError(String),

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Compression error: {0}")]
    CompressionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Left edge of a run of `width` anchored at `x`
    pub fn start_x(self, x: f64, width: f64) -> f64 {
        match self {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        }
    }
}
