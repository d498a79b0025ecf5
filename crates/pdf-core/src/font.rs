//! Font handling for PDF documents

use crate::document::deflate;
use crate::{PdfError, Result};
use lopdf::{Dictionary, Object, Stream};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use subsetter::GlyphRemapper;

/// Font weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

/// Font data structure for embedded fonts
///
/// The raw file is shared behind an `Arc` so that one loaded font can back
/// many documents; the `ttf_parser::Face` is re-parsed on demand instead of
/// being stored, which keeps `FontData` free of self-borrows.
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    pub name: String,
    /// Raw TTF data
    pub ttf_data: Arc<[u8]>,
    /// Characters used (for subsetting)
    pub used_chars: HashSet<char>,
    /// Subset produced at save time
    subset: Option<FontSubset>,
}

#[derive(Debug, Clone)]
struct FontSubset {
    data: Vec<u8>,
    /// original glyph id -> glyph id inside the subset
    glyph_map: BTreeMap<u16, u16>,
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFont Type2 dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (TTF data, Flate-compressed)
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

/// Font family with a regular and an optional bold variant
#[derive(Debug, Clone)]
pub struct FontFamily {
    pub regular: FontData,
    pub bold: Option<FontData>,
}

impl FontFamily {
    /// Font data for the requested weight, falling back to regular
    pub fn get_variant(&self, weight: FontWeight) -> &FontData {
        match weight {
            FontWeight::Bold => self.bold.as_ref().unwrap_or(&self.regular),
            FontWeight::Regular => &self.regular,
        }
    }

    pub fn get_variant_mut(&mut self, weight: FontWeight) -> &mut FontData {
        match weight {
            FontWeight::Bold if self.bold.is_some() => {
                self.bold.as_mut().unwrap_or(&mut self.regular)
            }
            _ => &mut self.regular,
        }
    }

    /// Internal font name for the variant actually used (for PDF resource naming)
    pub fn get_variant_name(&self, weight: FontWeight) -> &str {
        &self.get_variant(weight).name
    }

    pub fn variants(&self) -> impl Iterator<Item = &FontData> {
        std::iter::once(&self.regular).chain(self.bold.as_ref())
    }

    pub fn variants_mut(&mut self) -> impl Iterator<Item = &mut FontData> {
        std::iter::once(&mut self.regular).chain(self.bold.as_mut())
    }
}

/// Builder for registering font families
#[derive(Default)]
pub struct FontFamilyBuilder {
    regular: Option<Arc<[u8]>>,
    bold: Option<Arc<[u8]>>,
}

impl FontFamilyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regular(mut self, ttf_data: impl Into<Arc<[u8]>>) -> Self {
        self.regular = Some(ttf_data.into());
        self
    }

    pub fn bold(mut self, ttf_data: impl Into<Arc<[u8]>>) -> Self {
        self.bold = Some(ttf_data.into());
        self
    }

    /// Build the FontFamily from the provided TTF data
    pub fn build(self, family_name: &str) -> Result<FontFamily> {
        let Some(regular) = self.regular else {
            return Err(PdfError::FontParseError(
                "FontFamily must have at least a regular variant".to_string(),
            ));
        };
        let regular = FontData::from_ttf(&format!("{family_name}-regular"), regular)?;

        let bold = self
            .bold
            .map(|data| FontData::from_ttf(&format!("{family_name}-bold"), data))
            .transpose()?;

        Ok(FontFamily { regular, bold })
    }
}

impl FontData {
    /// Create font data from TTF bytes
    ///
    /// Only TrueType outlines (`glyf`) can be embedded as CIDFontType2, so
    /// CFF-flavoured OpenType files are rejected here.
    pub fn from_ttf(name: &str, ttf_data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let ttf_data = ttf_data.into();
        {
            let face = ttf_parser::Face::parse(&ttf_data, 0)
                .map_err(|e| PdfError::FontParseError(format!("{name}: {e:?}")))?;
            if face.tables().glyf.is_none() {
                return Err(PdfError::FontParseError(format!(
                    "{name}: only TrueType (glyf) outlines can be embedded"
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            ttf_data,
            used_chars: HashSet::new(),
            subset: None,
        })
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.ttf_data, 0).ok()
    }

    /// Add characters to the used set (for subsetting)
    pub fn add_chars(&mut self, text: &str) {
        self.used_chars.extend(text.chars());
    }

    /// Get glyph ID for a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face().and_then(|face| face.glyph_index(c).map(|id| id.0))
    }

    /// Check if font has a glyph for the given character
    pub fn has_glyph(&self, c: char) -> bool {
        self.glyph_id(c).map(|id| id != 0).unwrap_or(false)
    }

    /// Get glyph advance width
    pub fn glyph_advance(&self, c: char) -> Option<u16> {
        let face = self.face()?;
        let glyph_id = face.glyph_index(c)?;
        face.glyph_hor_advance(glyph_id)
    }

    /// Get font units per em
    pub fn units_per_em(&self) -> u16 {
        self.face().map(|face| face.units_per_em()).unwrap_or(1000)
    }

    /// Get font ascender
    pub fn ascender(&self) -> i16 {
        self.face().map(|face| face.ascender()).unwrap_or(800)
    }

    /// Get font descender
    pub fn descender(&self) -> i16 {
        self.face().map(|face| face.descender()).unwrap_or(-200)
    }

    /// Calculate text width in font units
    pub fn text_width(&self, text: &str) -> u32 {
        let Some(face) = self.face() else {
            return 0;
        };
        text.chars()
            .filter_map(|c| face.glyph_index(c).and_then(|g| face.glyph_hor_advance(g)))
            .map(u32::from)
            .sum()
    }

    /// Calculate text width in points for a given font size
    pub fn text_width_points(&self, text: &str, font_size: f32) -> f32 {
        let width = self.text_width(text);
        let units_per_em = self.units_per_em() as f32;
        (width as f32 / units_per_em) * font_size
    }

    /// Whether a subset has been produced for this font
    pub fn is_subsetted(&self) -> bool {
        self.subset.is_some()
    }

    /// Build a subset holding only the glyphs of `used_chars`
    ///
    /// Glyph ids are renumbered densely; `encode_text_hex_remapped` and the
    /// width/ToUnicode tables follow the new numbering afterwards.
    pub fn create_subset(&mut self) -> Result<()> {
        let subset = {
            let face = self.face().ok_or_else(|| {
                PdfError::FontSubsetError(format!("{}: font data cannot be parsed", self.name))
            })?;

            let mut gids: Vec<u16> = self
                .used_chars
                .iter()
                .filter_map(|&c| face.glyph_index(c).map(|g| g.0))
                .collect();
            gids.sort_unstable();
            gids.dedup();

            let mut remapper = GlyphRemapper::new();
            let mut glyph_map = BTreeMap::new();
            glyph_map.insert(0, remapper.remap(0));
            for gid in gids {
                glyph_map.insert(gid, remapper.remap(gid));
            }

            let data = subsetter::subset(&self.ttf_data, 0, &remapper)
                .map_err(|e| PdfError::FontSubsetError(format!("{}: {e:?}", self.name)))?;

            FontSubset { data, glyph_map }
        };

        self.subset = Some(subset);
        Ok(())
    }

    /// Glyph id written into the content stream for `c`
    fn cid_for(&self, face: Option<&ttf_parser::Face<'_>>, c: char) -> u16 {
        let gid = face
            .and_then(|face| face.glyph_index(c))
            .map(|g| g.0)
            .unwrap_or(0);
        match &self.subset {
            Some(subset) => subset.glyph_map.get(&gid).copied().unwrap_or(0),
            None => gid,
        }
    }

    /// Encode text as hex string for PDF Tj operator, using original glyph ids
    pub fn encode_text_hex(&self, text: &str) -> String {
        let face = self.face();
        let mut result = String::with_capacity(text.len() * 4 + 2);
        result.push('<');
        for c in text.chars() {
            let gid = face
                .as_ref()
                .and_then(|face| face.glyph_index(c))
                .map(|g| g.0)
                .unwrap_or(0);
            result.push_str(&format!("{gid:04X}"));
        }
        result.push('>');
        result
    }

    /// Encode text as hex string using the glyph ids of the subset, if one exists
    pub fn encode_text_hex_remapped(&self, text: &str) -> String {
        let face = self.face();
        let mut result = String::with_capacity(text.len() * 4 + 2);
        result.push('<');
        for c in text.chars() {
            let cid = self.cid_for(face.as_ref(), c);
            result.push_str(&format!("{cid:04X}"));
        }
        result.push('>');
        result
    }

    /// Convert font units into the 1000-unit glyph space PDF expects
    fn to_glyph_space(&self, value: f64) -> i64 {
        (value * 1000.0 / f64::from(self.units_per_em())).round() as i64
    }

    /// PostScript name with a subset tag derived from the glyph set
    fn base_font_name(&self) -> String {
        let clean: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let Some(subset) = &self.subset else {
            return clean;
        };

        // FNV-1a over the kept glyphs
        let mut hash: u32 = 0x811c_9dc5;
        for gid in subset.glyph_map.keys() {
            for byte in gid.to_be_bytes() {
                hash ^= u32::from(byte);
                hash = hash.wrapping_mul(0x0100_0193);
            }
        }
        let tag: String = (0..6)
            .map(|i| {
                let letter = (hash >> (i * 5)) % 26;
                char::from(b'A' + letter as u8)
            })
            .collect();
        format!("{tag}+{clean}")
    }

    /// Generate all PDF objects needed to embed this font
    pub fn to_pdf_objects(&self) -> Result<FontObjects> {
        let font_name = Object::Name(self.base_font_name().into_bytes());

        // Generate ToUnicode CMap
        let tounicode_content = self.generate_tounicode_cmap();
        let tounicode_stream = Stream::new(
            Dictionary::from_iter(vec![("Length", (tounicode_content.len() as i64).into())]),
            tounicode_content.into_bytes(),
        );

        // Generate font file stream
        let raw: &[u8] = match &self.subset {
            Some(subset) => &subset.data,
            None => &self.ttf_data,
        };
        let compressed = deflate(raw)?;
        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![
                ("Length1", (raw.len() as i64).into()),
                ("Filter", "FlateDecode".into()),
            ]),
            compressed,
        );

        let ascender = self.to_glyph_space(f64::from(self.ascender()));
        let descender = self.to_glyph_space(f64::from(self.descender()));

        // Bounding box from vertical metrics; horizontal extent of one em
        let font_bbox = vec![0.into(), descender.into(), 1000.into(), ascender.into()];

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()), // Symbolic font
            ("FontBBox", font_bbox.into()),
            ("ItalicAngle", 0.into()),
            ("Ascent", ascender.into()),
            ("Descent", descender.into()),
            ("CapHeight", ascender.into()),
            ("StemV", 80.into()),
            ("FontFile2", Object::Reference((0, 0))), // set when embedding
        ]);

        let widths_array = self.generate_widths_array();

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", 0.into()),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("FontDescriptor", Object::Reference((0, 0))), // set when embedding
            ("CIDToGIDMap", "Identity".into()),
            ("W", widths_array.into()),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
            ("DescendantFonts", vec![Object::Reference((0, 0))].into()), // set when embedding
            ("ToUnicode", Object::Reference((0, 0))), // set when embedding
        ]);

        Ok(FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        })
    }

    /// Generate /W array for glyph widths, keyed by the ids used in content streams
    fn generate_widths_array(&self) -> Vec<Object> {
        let mut widths = Vec::new();
        let Some(face) = self.face() else {
            return widths;
        };

        let mut cids: Vec<(u16, u16)> = self
            .used_chars
            .iter()
            .filter_map(|&c| {
                let gid = face.glyph_index(c)?;
                Some((self.cid_for(Some(&face), c), gid.0))
            })
            .collect();
        cids.sort_unstable();
        cids.dedup();

        // Individual mapping format: [cid1 [width1] cid2 [width2] ...]
        for (cid, gid) in cids {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .unwrap_or(self.units_per_em());
            widths.push(i64::from(cid).into());
            widths.push(vec![self.to_glyph_space(f64::from(advance)).into()].into());
        }

        widths
    }

    /// Generate ToUnicode CMap stream content
    fn generate_tounicode_cmap(&self) -> String {
        let mut cmap = String::new();

        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");

        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        // Characters without a glyph all render as .notdef and get no entry
        let face = self.face();
        let mut entries: Vec<(u16, char)> = self
            .used_chars
            .iter()
            .filter(|&&c| {
                face.as_ref()
                    .and_then(|face| face.glyph_index(c))
                    .is_some_and(|gid| gid.0 != 0)
            })
            .map(|&c| (self.cid_for(face.as_ref(), c), c))
            .filter(|&(cid, _)| cid != 0)
            .collect();
        entries.sort_unstable();
        entries.dedup_by_key(|(cid, _)| *cid);

        // bfchar sections are limited to 100 entries
        for chunk in entries.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &(cid, c) in chunk {
                cmap.push_str(&format!("<{cid:04X}> <{}>\n", utf16_hex(c)));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }
}

/// UTF-16BE code units of `c` as uppercase hex, surrogate pairs included
fn utf16_hex(c: char) -> String {
    let mut units = [0u16; 2];
    c.encode_utf16(&mut units)
        .iter()
        .map(|unit| format!("{unit:04X}"))
        .collect()
}
