//! End-to-end rendering with a real TrueType font
//!
//! The fixture is DejaVu Sans, which covers Latin and digits but no kanji, so
//! Japanese labels fall back to .notdef while amounts stay extractable.

use chrono::{NaiveDate, NaiveDateTime};
use lopdf::{Dictionary, Document, Object};
use receipt::{Issuer, PaymentMethod, ReceiptData, ReceiptFonts, ReceiptRenderer};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

fn renderer() -> ReceiptRenderer {
    let fonts = ReceiptFonts::load(
        fixture("DejaVuSans.ttf"),
        Some(fixture("DejaVuSans-Bold.ttf")),
    )
    .unwrap();
    assert!(fonts.has_bold());
    ReceiptRenderer::new(&fonts)
}

fn package_receipt() -> ReceiptData {
    ReceiptData {
        number: "R2025-0012".to_string(),
        issue_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        recipient_name: "Hanako Yamada".to_string(),
        recipient_address: None,
        description: "Coaching package (3 months)".to_string(),
        amount: 220_000,
        tax_rate: 10.0,
        payment_method: PaymentMethod::BankTransfer,
        issuer: Issuer {
            name: "Ichiro Sato".to_string(),
            title: "Life Coach".to_string(),
            address: "Minato-ku, Tokyo".to_string(),
        },
        notes: None,
    }
}

fn generated_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 9, 1)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap()
}

fn deref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    doc.dereference(obj).unwrap().1
}

fn stream_text(doc: &Document, obj: &Object) -> String {
    let stream = deref(doc, obj).as_stream().unwrap();
    let bytes = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// `<code> <utf16>` pairs of a ToUnicode CMap
fn parse_bfchar(cmap: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();
    let mut in_section = false;
    for line in cmap.lines() {
        let line = line.trim();
        if line.ends_with("beginbfchar") {
            in_section = true;
            continue;
        }
        if line == "endbfchar" {
            in_section = false;
            continue;
        }
        if !in_section {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(code), Some(unicode)) = (parts.next(), parts.next()) else {
            continue;
        };
        let code = u16::from_str_radix(code.trim_matches(['<', '>']), 16).unwrap();
        let unicode = unicode.trim_matches(['<', '>']);
        let units: Vec<u16> = (0..unicode.len())
            .step_by(4)
            .map(|i| u16::from_str_radix(&unicode[i..i + 4], 16).unwrap())
            .collect();
        map.insert(code, String::from_utf16(&units).unwrap());
    }
    map
}

/// Decode every `Tj` run on page 1 through the ToUnicode map of its font
fn extract_runs(doc: &Document, fonts: &BTreeMap<Vec<u8>, &Dictionary>) -> Vec<String> {
    let cmaps: HashMap<Vec<u8>, HashMap<u16, String>> = fonts
        .iter()
        .map(|(name, font)| {
            let cmap = stream_text(doc, font.get(b"ToUnicode").unwrap());
            (name.clone(), parse_bfchar(&cmap))
        })
        .collect();

    let page_id = doc.get_pages()[&1];
    let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();

    let mut current: Option<&HashMap<u16, String>> = None;
    let mut runs = Vec::new();
    for line in content.lines() {
        if let Some(operands) = line.strip_suffix(" Tf") {
            let name = operands.split_whitespace().next().unwrap().trim_start_matches('/');
            current = cmaps.get(name.as_bytes());
        } else if let Some(hex) = line.strip_suffix(" Tj") {
            let cmap = current.expect("Tj before Tf");
            let hex = hex.trim_matches(['<', '>']);
            let text: String = (0..hex.len())
                .step_by(4)
                .filter_map(|i| cmap.get(&u16::from_str_radix(&hex[i..i + 4], 16).unwrap()))
                .map(String::as_str)
                .collect();
            runs.push(text);
        }
    }
    runs
}

#[test]
fn test_pdf_embeds_subset_cid_font() {
    let bytes = renderer()
        .render_pdf(&package_receipt(), generated_at())
        .unwrap();
    let doc = Document::load_mem(&bytes).unwrap();

    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);

    let fonts = doc.get_page_fonts(pages[&1]);
    assert!(!fonts.is_empty());
    for font in fonts.values() {
        assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(font.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");

        let descendants = deref(&doc, font.get(b"DescendantFonts").unwrap())
            .as_array()
            .unwrap();
        let cid_font = deref(&doc, &descendants[0]).as_dict().unwrap();
        assert_eq!(cid_font.get(b"Subtype").unwrap().as_name().unwrap(), b"CIDFontType2");
        assert!(!cid_font.get(b"W").unwrap().as_array().unwrap().is_empty());

        let descriptor = deref(&doc, cid_font.get(b"FontDescriptor").unwrap())
            .as_dict()
            .unwrap();
        let font_file = deref(&doc, descriptor.get(b"FontFile2").unwrap())
            .as_stream()
            .unwrap();
        assert!(!font_file.content.is_empty());
        // The embedded program is a subset of the fixture
        assert!(font_file.content.len() < fixture("DejaVuSans.ttf").len());

        let base_font = cid_font.get(b"BaseFont").unwrap().as_name_str().unwrap();
        assert_eq!(base_font.find('+'), Some(6));
    }
}

#[test]
fn test_pdf_amount_is_extractable() {
    let bytes = renderer()
        .render_pdf(&package_receipt(), generated_at())
        .unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    let fonts = doc.get_page_fonts(doc.get_pages()[&1]);

    let cmap_text: String = fonts
        .values()
        .map(|font| stream_text(&doc, font.get(b"ToUnicode").unwrap()))
        .collect();
    for unicode in ["<0032>", "<0030>", "<002C>"] {
        assert!(cmap_text.contains(unicode), "ToUnicode misses {unicode}");
    }
    // Kanji have no glyph in the fixture and must not claim CID 0
    assert!(!cmap_text.contains("<0000> <"));

    let runs = extract_runs(&doc, &fonts);
    // 円 falls back to .notdef, leaving the digits and the separator
    assert!(runs.iter().any(|run| run.trim() == "220,000"), "runs: {runs:?}");
    assert!(runs.iter().any(|run| run.contains("R2025-0012")), "runs: {runs:?}");
    assert!(runs.iter().any(|run| run.contains("Hanako Yamada")), "runs: {runs:?}");
}

#[test]
fn test_preview_is_png_data_uri() {
    let uri = renderer()
        .render_preview(&package_receipt(), generated_at())
        .unwrap();
    assert!(uri.starts_with("data:image/png;base64,"));
    assert!(uri.len() > 1000);
}
