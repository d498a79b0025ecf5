//! Fonts shared by the PDF renderer and the preview rasterizer

use crate::{ReceiptError, Result};
use ab_glyph::FontArc;
use pdf_core::{FontFamily, FontFamilyBuilder};
use std::sync::Arc;

/// Family name the receipt registers its fonts under
pub(crate) const FAMILY: &str = "gothic";

/// TrueType fonts loaded once and cloned cheaply into every render
#[derive(Clone)]
pub struct ReceiptFonts {
    pub(crate) family: FontFamily,
    pub(crate) regular: FontArc,
    pub(crate) bold: Option<FontArc>,
}

impl ReceiptFonts {
    /// Parse a regular and an optional bold TrueType font
    ///
    /// Both the PDF embedder and the rasterizer must accept the data; a font
    /// either of them rejects is an error here rather than at render time.
    pub fn load(regular: Vec<u8>, bold: Option<Vec<u8>>) -> Result<Self> {
        let regular: Arc<[u8]> = Arc::from(regular);
        let bold: Option<Arc<[u8]>> = bold.map(Arc::from);

        let mut builder = FontFamilyBuilder::new().regular(regular.clone());
        if let Some(bold) = &bold {
            builder = builder.bold(bold.clone());
        }
        let family = builder.build(FAMILY)?;

        let regular_raster = raster_font(&regular, "regular")?;
        let bold_raster = bold
            .as_deref()
            .map(|data| raster_font(data, "bold"))
            .transpose()?;

        Ok(Self {
            family,
            regular: regular_raster,
            bold: bold_raster,
        })
    }

    /// Whether a dedicated bold face was supplied
    pub fn has_bold(&self) -> bool {
        self.bold.is_some()
    }
}

fn raster_font(data: &[u8], variant: &str) -> Result<FontArc> {
    FontArc::try_from_vec(data.to_vec())
        .map_err(|e| ReceiptError::FontError(format!("{variant} font: {e}")))
}
