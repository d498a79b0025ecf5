use chrono::{NaiveDate, NaiveDateTime};
use lopdf::{Document, Object};
use pdf_core::{DocumentInfo, A4_HEIGHT, A4_WIDTH};
use pretty_assertions::assert_eq;
use receipt::{
    content_disposition, document_filename, layout_receipt, pdf_from_layout, png_data_uri,
    Element, FixedAdvance, Issuer, PageLayout, PaymentMethod, Rasterizer, ReceiptData,
    DOCUMENT_TITLE, PRODUCER,
};

fn trial_receipt() -> ReceiptData {
    ReceiptData {
        number: "R2025-0007".to_string(),
        issue_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        recipient_name: "鈴木 太郎".to_string(),
        recipient_address: None,
        description: "トライアルセッション".to_string(),
        amount: 6000,
        tax_rate: 10.0,
        payment_method: PaymentMethod::Cash,
        issuer: Issuer {
            name: "佐藤 一郎".to_string(),
            title: "ライフコーチ".to_string(),
            address: "東京都港区4-5-6 コーチングオフィス 3F".to_string(),
        },
        notes: Some("セッション料金として。「次回」は7月予定です。".to_string()),
    }
}

fn generated_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 30)
        .unwrap()
        .and_hms_opt(18, 5, 0)
        .unwrap()
}

fn shapes_only(page: &PageLayout) -> PageLayout {
    PageLayout {
        width: page.width,
        height: page.height,
        elements: page
            .elements
            .iter()
            .filter(|element| !matches!(element, Element::Text(_)))
            .cloned()
            .collect(),
    }
}

#[test]
fn test_trial_receipt_amounts() {
    let page = layout_receipt(&trial_receipt(), &FixedAdvance, generated_at());

    assert!(page.find_text("6,000 円").is_some());
    assert!(page.find_text("5,455 円").is_some());
    assert!(page.find_text("545 円").is_some());
    assert!(page.find_text("消費税（10%）").is_some());
    assert!(page.find_text("お支払方法: 現金").is_some());
    assert!(page.find_text("発行日: 2025年6月30日").is_some());
    assert!(page.find_text("発行日時: 2025/06/30 18:05").is_some());
}

#[test]
fn test_short_notes_are_not_truncated() {
    let page = layout_receipt(&trial_receipt(), &FixedAdvance, generated_at());
    assert!(page.find_text("備考").is_some());
    assert!(page.contains_text("セッション料金として。"));
    assert!(!page.contains_text("…"));
}

#[test]
fn test_display_list_to_pdf() {
    let full = layout_receipt(&trial_receipt(), &FixedAdvance, generated_at());
    let page = shapes_only(&full);
    assert!(!page.elements.is_empty());

    let info = DocumentInfo {
        title: Some(format!("{DOCUMENT_TITLE} R2025-0007")),
        producer: Some(PRODUCER.to_string()),
        ..Default::default()
    };
    let bytes = pdf_from_layout(&page, None, info).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.7"));

    let doc = Document::load_mem(&bytes).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);

    let page_id = *pages.get(&1).unwrap();
    let page_dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let media_box = page_dict.get(b"MediaBox").unwrap().as_array().unwrap();
    assert_eq!(media_box.len(), 4);
    assert!(matches!(media_box[2], Object::Real(w) if (f64::from(w) - A4_WIDTH).abs() < 0.01));
    assert!(matches!(media_box[3], Object::Real(h) if (f64::from(h) - A4_HEIGHT).abs() < 0.01));

    let content = doc.get_page_content(page_id).unwrap();
    let content = String::from_utf8_lossy(&content);
    assert!(content.contains(" re\n"));
    assert!(content.contains(" l\nS\n"));
}

#[test]
fn test_text_without_fonts_fails_to_render() {
    let page = layout_receipt(&trial_receipt(), &FixedAdvance, generated_at());
    assert!(pdf_from_layout(&page, None, DocumentInfo::default()).is_err());
    assert!(Rasterizer::shapes_only().render(&page).is_err());
}

#[test]
fn test_preview_of_display_list() {
    let full = layout_receipt(&trial_receipt(), &FixedAdvance, generated_at());
    let page = shapes_only(&full);
    let rasterizer = Rasterizer::shapes_only();

    let image = rasterizer.render(&page).unwrap();
    assert_eq!(image.dimensions(), (893, 1263));
    // Highlighted total band is light gray, the margin stays white
    assert_eq!(image.get_pixel(150, 370).0, [240, 240, 240]);
    assert_eq!(image.get_pixel(10, 10).0, [255, 255, 255]);

    let uri = png_data_uri(&rasterizer.render_png(&page).unwrap());
    assert!(uri.starts_with("data:image/png;base64,"));
}

#[test]
fn test_download_headers() {
    let data = trial_receipt();
    let filename = document_filename(DOCUMENT_TITLE, &data.number, &data.recipient_name, "pdf");
    assert_eq!(filename, "領収書_R2025-0007_鈴木 太郎.pdf");

    let header = content_disposition(&filename);
    assert!(header.starts_with("attachment; filename=\"R2025-0007.pdf\"; filename*=UTF-8''"));
    assert!(header.ends_with("%E9%88%B4%E6%9C%A8%20%E5%A4%AA%E9%83%8E.pdf"));
}
