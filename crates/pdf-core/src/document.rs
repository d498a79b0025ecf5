//! PDF Document wrapper

use crate::shape::{generate_line_operators, generate_rect_operators, ShapeStyle};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::{Align, FontData, FontFamily, FontFamilyBuilder, FontWeight, PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;

/// A4 width in points
pub const A4_WIDTH: f64 = 595.28;
/// A4 height in points
pub const A4_HEIGHT: f64 = 841.89;

/// A buffered text operation for deferred encoding
///
/// Text is buffered during rendering and encoded during save,
/// after fonts have been subsetted and glyph IDs remapped.
#[derive(Debug, Clone)]
struct BufferedTextOp {
    text: String,
    /// Variant name (e.g., "gothic-bold")
    font_name: String,
    /// Font resource name (e.g., "F1")
    font_resource_name: String,
    /// Page number (1-indexed)
    page: usize,
    /// X coordinate (PDF coordinates, already aligned)
    x: f64,
    /// Y coordinate (PDF coordinates, already converted)
    y: f64,
    font_size: f32,
    color: Color,
}

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    /// Neutral gray, `level` 0.0 (black) to 1.0 (white)
    pub fn gray(level: f32) -> Self {
        Self::rgb(level, level, level)
    }

    /// Channels as 0-255 bytes
    pub fn to_rgb8(self) -> [u8; 3] {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b)]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Values for the document information dictionary
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    /// PDF date string, e.g. `D:20250401093000+09'00'`
    pub creation_date: Option<String>,
}

/// PDF Document wrapper providing page building operations
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Page size in points (width, height); every page shares it
    page_size: (f64, f64),
    /// Page object ids in page order
    page_ids: Vec<ObjectId>,
    /// Id of the /Pages tree node
    pages_id: ObjectId,
    /// Registered font families
    font_families: HashMap<String, FontFamily>,
    current_family: Option<String>,
    current_weight: FontWeight,
    current_font_size: f32,
    current_text_color: Color,
    /// Embedded fonts (font name -> PDF object ID)
    embedded_fonts: HashMap<String, ObjectId>,
    /// Page font resources (page number -> font name -> resource name)
    page_font_resources: HashMap<usize, BTreeMap<String, String>>,
    next_font_resource: u32,
    /// Buffered content operators per page (page number -> operators)
    page_content_buffer: BTreeMap<usize, Vec<u8>>,
    /// Buffered text operations (encoded during save after font subsetting)
    buffered_text_ops: Vec<BufferedTextOp>,
    info: DocumentInfo,
    compress: bool,
}

impl PdfDocument {
    /// Create a document with one blank A4 page
    pub fn new_a4() -> Self {
        Self::with_page_size(A4_WIDTH, A4_HEIGHT)
    }

    /// Create a document with one blank page of the given size in points
    pub fn with_page_size(width: f64, height: f64) -> Self {
        let mut inner = Document::with_version("1.7");
        let pages_id = inner.new_object_id();

        let page_id = inner.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box(width, height),
            "Resources" => Dictionary::new(),
        });

        inner.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );

        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        inner.trailer.set("Root", catalog_id);

        Self {
            inner,
            page_size: (width, height),
            page_ids: vec![page_id],
            pages_id,
            font_families: HashMap::new(),
            current_family: None,
            current_weight: FontWeight::default(),
            current_font_size: 12.0,
            current_text_color: Color::default(),
            embedded_fonts: HashMap::new(),
            page_font_resources: HashMap::new(),
            next_font_resource: 1,
            page_content_buffer: BTreeMap::new(),
            buffered_text_ops: Vec::new(),
            info: DocumentInfo::default(),
            compress: true,
        }
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Page size in points (width, height)
    pub fn page_size(&self) -> (f64, f64) {
        self.page_size
    }

    /// Append a blank page of the document's page size and return its number
    pub fn add_blank_page(&mut self) -> Result<usize> {
        let (width, height) = self.page_size;
        let page_id = self.inner.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box(width, height),
            "Resources" => Dictionary::new(),
        });
        self.page_ids.push(page_id);

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();
        let pages = self.inner.get_object_mut(self.pages_id)?.as_dict_mut()?;
        pages.set("Kids", kids);
        pages.set("Count", self.page_ids.len() as i64);

        Ok(self.page_ids.len())
    }

    /// Disable or enable Flate compression of page content streams
    pub fn set_compression(&mut self, compress: bool) {
        self.compress = compress;
    }

    /// Set the document information dictionary written on save
    pub fn set_info(&mut self, info: DocumentInfo) {
        self.info = info;
    }

    /// Register a font family with its variants
    ///
    /// # Example
    /// ```ignore
    /// doc.register_font_family("gothic",
    ///     FontFamilyBuilder::new()
    ///         .regular(std::fs::read("NotoSansJP-Regular.ttf")?)
    ///         .bold(std::fs::read("NotoSansJP-Bold.ttf")?)
    /// )?;
    /// ```
    pub fn register_font_family(&mut self, name: &str, builder: FontFamilyBuilder) -> Result<()> {
        let family = builder.build(name)?;
        self.add_font_family(name, family)
    }

    /// Register an already-parsed font family
    ///
    /// Fonts loaded once at startup can be cloned cheaply into each document.
    pub fn add_font_family(&mut self, name: &str, family: FontFamily) -> Result<()> {
        if self.font_families.contains_key(name) {
            return Err(PdfError::FontAlreadyExists(name.to_string()));
        }
        self.font_families.insert(name.to_string(), family);
        Ok(())
    }

    /// Set the current font family and size
    pub fn set_font(&mut self, family: &str, size: f32) -> Result<()> {
        if !self.font_families.contains_key(family) {
            return Err(PdfError::FontNotFound(family.to_string()));
        }

        self.current_family = Some(family.to_string());
        self.current_font_size = size;

        Ok(())
    }

    /// Set only the font size (keeps current family/weight)
    pub fn set_font_size(&mut self, size: f32) {
        self.current_font_size = size;
    }

    /// Set the font weight (keeps current family/size)
    pub fn set_font_weight(&mut self, weight: FontWeight) {
        self.current_weight = weight;
    }

    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    fn current_family(&self) -> Result<(&str, &FontFamily)> {
        let family_name = self
            .current_family
            .as_deref()
            .ok_or_else(|| PdfError::FontNotFound("No font family set".to_string()))?;
        let family = self
            .font_families
            .get(family_name)
            .ok_or_else(|| PdfError::FontNotFound(family_name.to_string()))?;
        Ok((family_name, family))
    }

    fn check_page(&self, page: usize) -> Result<()> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(PdfError::InvalidPage(page, page_count));
        }
        Ok(())
    }

    /// Insert text at a specific position
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page` - Page number (1-indexed)
    /// * `x` - X coordinate in points (anchor for `align`)
    /// * `y` - Baseline Y coordinate in points (from top)
    /// * `align` - Text alignment
    pub fn insert_text(
        &mut self,
        text: &str,
        page: usize,
        x: f64,
        y: f64,
        align: Align,
    ) -> Result<()> {
        self.check_page(page)?;

        if text.is_empty() {
            return Ok(());
        }

        let (family_name, weight, font_size) = {
            let (name, _) = self.current_family()?;
            (name.to_string(), self.current_weight, self.current_font_size)
        };

        let (font_name, width) = {
            let family = self
                .font_families
                .get_mut(&family_name)
                .ok_or_else(|| PdfError::FontNotFound(family_name.clone()))?;
            let font_data = family.get_variant_mut(weight);
            font_data.add_chars(text);
            (
                font_data.name.clone(),
                font_data.text_width_points(text, font_size) as f64,
            )
        };

        let font_resource_name = self.get_or_create_font_ref(&font_name, page);
        let start_x = align.start_x(x, width);
        let pdf_y = self.page_size.1 - y;

        self.buffered_text_ops.push(BufferedTextOp {
            text: text.to_string(),
            font_name,
            font_resource_name,
            page,
            x: start_x,
            y: pdf_y,
            font_size,
            color: self.current_text_color,
        });

        Ok(())
    }

    /// Draw a rectangle; `x`/`y` is the top-left corner measured from the page top
    pub fn draw_rect(
        &mut self,
        page: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        style: &ShapeStyle,
    ) -> Result<()> {
        self.check_page(page)?;
        let pdf_y = self.page_size.1 - y - height;
        let operators = generate_rect_operators(x, pdf_y, width, height, style);
        self.buffer_content(page, &operators);
        Ok(())
    }

    /// Draw a straight line between two top-origin points
    pub fn draw_line(
        &mut self,
        page: usize,
        from: (f64, f64),
        to: (f64, f64),
        color: Color,
        line_width: f64,
    ) -> Result<()> {
        self.check_page(page)?;
        let height = self.page_size.1;
        let operators = generate_line_operators(
            (from.0, height - from.1),
            (to.0, height - to.1),
            color,
            line_width,
        );
        self.buffer_content(page, &operators);
        Ok(())
    }

    /// Width in points of `text` in the current font and size
    pub fn get_text_width(&self, text: &str) -> Result<f64> {
        let (_, family) = self.current_family()?;
        let font_data = family.get_variant(self.current_weight);
        Ok(font_data.text_width_points(text, self.current_font_size) as f64)
    }

    /// Get font data by variant name
    fn get_font_data(&self, name: &str) -> Result<&FontData> {
        self.font_families
            .values()
            .flat_map(|family| family.variants())
            .find(|variant| variant.name == name)
            .ok_or_else(|| PdfError::FontNotFound(name.to_string()))
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        // 1. Subset fonts (creates subsets with only used glyphs)
        self.subset_fonts()?;

        // 2. Encode buffered text with remapped glyph IDs
        self.encode_buffered_text()?;

        // 3. Flush buffered content streams to pages
        self.flush_content_buffers()?;

        // 4. Embed subsetted fonts into PDF
        self.embed_fonts()?;

        self.write_info();

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Create subsets for all fonts that have been used
    fn subset_fonts(&mut self) -> Result<()> {
        for font_data in self
            .font_families
            .values_mut()
            .flat_map(|family| family.variants_mut())
        {
            if !font_data.used_chars.is_empty() && !font_data.is_subsetted() {
                font_data.create_subset()?;
            }
        }
        Ok(())
    }

    /// Encode buffered text operations and add them to the content buffers
    fn encode_buffered_text(&mut self) -> Result<()> {
        let text_ops: Vec<BufferedTextOp> = std::mem::take(&mut self.buffered_text_ops);

        for op in text_ops {
            let text_hex = self
                .get_font_data(&op.font_name)?
                .encode_text_hex_remapped(&op.text);

            let ctx = TextRenderContext {
                font_name: op.font_resource_name,
                font_size: op.font_size,
                color: op.color,
            };

            // Position was already aligned in insert_text
            let operators = generate_text_operators(&text_hex, op.x, op.y, &ctx);
            self.buffer_content(op.page, &operators);
        }

        Ok(())
    }

    /// Embed every used font and reference it from the pages that use it
    fn embed_fonts(&mut self) -> Result<()> {
        self.embedded_fonts.clear();

        let mut font_names: Vec<String> = self
            .font_families
            .values()
            .flat_map(|family| family.variants())
            .filter(|font_data| !font_data.used_chars.is_empty())
            .map(|font_data| font_data.name.clone())
            .collect();
        font_names.sort();
        font_names.dedup();

        for font_name in font_names {
            self.embed_font_object(&font_name)?;
        }

        self.finalize_page_font_resources()
    }

    /// Embed a single font object into the PDF
    fn embed_font_object(&mut self, font_name: &str) -> Result<ObjectId> {
        let font_objects = self.get_font_data(font_name)?.to_pdf_objects()?;

        let font_file_id = self.inner.add_object(font_objects.font_file_stream);

        let mut font_descriptor = font_objects.font_descriptor;
        font_descriptor.set("FontFile2", Object::Reference(font_file_id));
        let font_descriptor_id = self.inner.add_object(font_descriptor);

        let mut cid_font = font_objects.cid_font;
        cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
        let cid_font_id = self.inner.add_object(cid_font);

        let tounicode_id = self.inner.add_object(font_objects.tounicode_stream);

        let mut type0_font = font_objects.type0_font;
        type0_font.set(
            "DescendantFonts",
            Object::Array(vec![Object::Reference(cid_font_id)]),
        );
        type0_font.set("ToUnicode", Object::Reference(tounicode_id));

        let type0_font_id = self.inner.add_object(type0_font);
        self.embedded_fonts
            .insert(font_name.to_string(), type0_font_id);

        Ok(type0_font_id)
    }

    /// Get or create a font reference for a specific page
    ///
    /// Returns the resource name (e.g., "F1", "F2") for use in content streams.
    /// The font itself is embedded at save time, once all characters are known.
    fn get_or_create_font_ref(&mut self, font_name: &str, page: usize) -> String {
        let page_resources = self.page_font_resources.entry(page).or_default();

        if let Some(resource_name) = page_resources.get(font_name) {
            return resource_name.clone();
        }

        let resource_name = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;
        page_resources.insert(font_name.to_string(), resource_name.clone());

        resource_name
    }

    fn finalize_page_font_resources(&mut self) -> Result<()> {
        let page_resources: Vec<(usize, Vec<(String, String)>)> = self
            .page_font_resources
            .iter()
            .map(|(&page, fonts)| {
                let font_list = fonts
                    .iter()
                    .map(|(font_name, resource_name)| (font_name.clone(), resource_name.clone()))
                    .collect();
                (page, font_list)
            })
            .collect();

        for (page, fonts) in page_resources {
            if !fonts.is_empty() {
                self.add_fonts_to_page_resources(page, &fonts)?;
            }
        }

        Ok(())
    }

    /// Add fonts to a page's Resources dictionary in a single operation
    fn add_fonts_to_page_resources(
        &mut self,
        page: usize,
        fonts: &[(String, String)],
    ) -> Result<()> {
        let page_id = self.page_id(page)?;

        let mut font_dict = Dictionary::new();
        for (font_name, resource_name) in fonts {
            let font_ref = self
                .embedded_fonts
                .get(font_name)
                .ok_or_else(|| PdfError::FontNotFound(font_name.to_string()))?;
            font_dict.set(resource_name.as_bytes(), Object::Reference(*font_ref));
        }

        let page_dict = self.inner.get_object_mut(page_id)?.as_dict_mut()?;
        let mut resources = match page_dict.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        resources.set("Font", Object::Dictionary(font_dict));
        page_dict.set("Resources", Object::Dictionary(resources));

        Ok(())
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        page.checked_sub(1)
            .and_then(|index| self.page_ids.get(index))
            .copied()
            .ok_or(PdfError::InvalidPage(page, self.page_ids.len()))
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Buffer content operators for a page
    ///
    /// Operators are flushed once during save as a single stream per page.
    fn buffer_content(&mut self, page: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page)
            .or_default()
            .extend_from_slice(content);
    }

    /// Write every page's buffered operators as that page's content stream
    fn flush_content_buffers(&mut self) -> Result<()> {
        let buffers = std::mem::take(&mut self.page_content_buffer);

        for (page, content) in buffers {
            if content.is_empty() {
                continue;
            }
            let page_id = self.page_id(page)?;

            let stream = if self.compress {
                Stream::new(
                    dictionary! { "Filter" => "FlateDecode" },
                    deflate(&content)?,
                )
            } else {
                Stream::new(Dictionary::new(), content)
            };
            let stream_id = self.inner.add_object(stream);

            let page_dict = self.inner.get_object_mut(page_id)?.as_dict_mut()?;
            page_dict.set("Contents", Object::Reference(stream_id));
        }

        Ok(())
    }

    fn write_info(&mut self) {
        let mut dict = Dictionary::new();
        let entries = [
            ("Title", &self.info.title),
            ("Author", &self.info.author),
            ("Producer", &self.info.producer),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                dict.set(key, pdf_text_string(value));
            }
        }
        if let Some(date) = &self.info.creation_date {
            dict.set("CreationDate", Object::string_literal(date.as_bytes()));
        }
        if dict.is_empty() {
            return;
        }
        let info_id = self.inner.add_object(dict);
        self.inner.trailer.set("Info", info_id);
    }
}

fn media_box(width: f64, height: f64) -> Vec<Object> {
    vec![0.into(), 0.into(), Object::Real(width as f32), Object::Real(height as f32)]
}

/// Encode a text string for the info dictionary
///
/// ASCII stays a literal string; anything else becomes UTF-16BE with a BOM.
fn pdf_text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value.as_bytes());
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Zlib-compress a stream body for `/Filter /FlateDecode`
pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PdfError::CompressionError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| PdfError::CompressionError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_of(doc: &PdfDocument, page: usize) -> Vec<u8> {
        let page_id = doc.page_id(page).unwrap();
        let page_dict = doc.inner.get_object(page_id).unwrap().as_dict().unwrap();
        let stream_id = page_dict.get(b"Contents").unwrap().as_reference().unwrap();
        let stream = doc.inner.get_object(stream_id).unwrap().as_stream().unwrap();
        stream.decompressed_content().unwrap_or_else(|_| stream.content.clone())
    }

    #[test]
    fn test_new_a4_has_one_page() {
        let doc = PdfDocument::new_a4();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_size(), (A4_WIDTH, A4_HEIGHT));
    }

    #[test]
    fn test_add_blank_page() {
        let mut doc = PdfDocument::new_a4();
        assert_eq!(doc.add_blank_page().unwrap(), 2);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.inner().get_pages().len(), 2);
    }

    #[test]
    fn test_insert_text_without_font() {
        let mut doc = PdfDocument::new_a4();
        let err = doc.insert_text("領収書", 1, 10.0, 10.0, Align::Left);
        assert!(matches!(err, Err(PdfError::FontNotFound(_))));
    }

    #[test]
    fn test_insert_text_invalid_page() {
        let mut doc = PdfDocument::new_a4();
        let err = doc.insert_text("x", 2, 10.0, 10.0, Align::Left);
        assert!(matches!(err, Err(PdfError::InvalidPage(2, 1))));
    }

    #[test]
    fn test_set_font_unknown_family() {
        let mut doc = PdfDocument::new_a4();
        assert!(matches!(
            doc.set_font("missing", 12.0),
            Err(PdfError::FontNotFound(_))
        ));
    }

    #[test]
    fn test_draw_rect_converts_to_bottom_origin() {
        let mut doc = PdfDocument::new_a4();
        doc.set_compression(false);
        doc.draw_rect(1, 50.0, 100.0, 200.0, 40.0, &ShapeStyle::filled(Color::black()))
            .unwrap();
        doc.flush_content_buffers().unwrap();

        let content = String::from_utf8(content_of(&doc, 1)).unwrap();
        let expected_y = A4_HEIGHT - 100.0 - 40.0;
        assert!(content.contains(&format!("50 {expected_y} 200 40 re")));
        assert!(content.contains("\nf\n"));
    }

    #[test]
    fn test_draw_line() {
        let mut doc = PdfDocument::new_a4();
        doc.set_compression(false);
        doc.draw_line(1, (50.0, 41.89), (545.0, 41.89), Color::gray(0.5), 1.0)
            .unwrap();
        doc.flush_content_buffers().unwrap();

        let content = String::from_utf8(content_of(&doc, 1)).unwrap();
        let y = A4_HEIGHT - 41.89;
        assert!(content.contains(&format!("50 {y} m")));
        assert!(content.contains(&format!("545 {y} l")));
    }

    #[test]
    fn test_compressed_content_roundtrips() {
        let mut doc = PdfDocument::new_a4();
        doc.draw_rect(1, 0.0, 0.0, 10.0, 10.0, &ShapeStyle::stroked(Color::black(), 0.5))
            .unwrap();
        doc.flush_content_buffers().unwrap();

        let content = String::from_utf8(content_of(&doc, 1)).unwrap();
        assert!(content.contains(" re\nS\n"));
    }

    #[test]
    fn test_pdf_text_string() {
        assert!(matches!(
            pdf_text_string("abc"),
            Object::String(ref bytes, StringFormat::Literal) if bytes == b"abc"
        ));
        match pdf_text_string("円") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xFE, 0xFF, 0x51, 0x86]);
            }
            _ => panic!("expected a hexadecimal string"),
        }
    }

    #[test]
    fn test_color_to_rgb8() {
        assert_eq!(Color::from_rgb(12, 34, 56).to_rgb8(), [12, 34, 56]);
        assert_eq!(Color::gray(1.0).to_rgb8(), [255, 255, 255]);
    }
}
