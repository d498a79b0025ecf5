//! Fixed single-page receipt layout
//!
//! The layout engine turns a [`ReceiptData`] into a [`PageLayout`]: a list of
//! absolutely positioned text runs, rectangles and rules on an A4 page. All
//! coordinates are in points with the origin at the top-left corner; text `y`
//! is the baseline. Alignment is resolved here through the injected
//! [`TextMeasure`], so the renderers only ever draw left-anchored text.

use crate::measure::TextMeasure;
use crate::model::ReceiptData;
use crate::DOCUMENT_TITLE;
use chrono::NaiveDateTime;
use ja_text::{
    clamp_lines, format_date_ja, format_datetime_slash, format_percent, format_yen, wrap_by_width,
};
use pdf_core::{Align, Color, FontWeight, ShapeStyle, A4_HEIGHT, A4_WIDTH};

/// Page margin in points
pub const MARGIN: f64 = 50.0;
/// Notes beyond this many wrapped lines are cut with an ellipsis
pub const NOTES_MAX_LINES: usize = 5;

const LEFT: f64 = MARGIN;
const RIGHT: f64 = A4_WIDTH - MARGIN;
const CONTENT_WIDTH: f64 = RIGHT - LEFT;
/// Inner padding of table cells and boxes
const PAD: f64 = 8.0;

const TITLE_Y: f64 = MARGIN + 40.0;
const NUMBER_Y: f64 = MARGIN + 75.0;
const DATE_Y: f64 = NUMBER_Y + 15.0;
const RECIPIENT_Y: f64 = MARGIN + 125.0;
const BAND_Y: f64 = MARGIN + 170.0;
const BAND_HEIGHT: f64 = 50.0;
const DESCRIPTION_Y: f64 = BAND_Y + BAND_HEIGHT + 25.0;
const TABLE_Y: f64 = DESCRIPTION_Y + 35.0;
const TABLE_HEADER_HEIGHT: f64 = 22.0;
const TABLE_ROW_HEIGHT: f64 = 24.0;
const AMOUNT_COLUMN_X: f64 = RIGHT - 150.0;
/// Room for the item text between the left cell padding and the amount column
const ITEM_COLUMN_WIDTH: f64 = AMOUNT_COLUMN_X - LEFT - 2.0 * PAD;
const SUMMARY_LABEL_X: f64 = AMOUNT_COLUMN_X - 50.0;
const SUBTOTAL_Y: f64 = TABLE_Y + TABLE_HEADER_HEIGHT + TABLE_ROW_HEIGHT + 24.0;
const SUMMARY_LINE_HEIGHT: f64 = 18.0;
const PAYMENT_Y: f64 = SUBTOTAL_Y + 3.0 * SUMMARY_LINE_HEIGHT + 30.0;
const NOTES_Y: f64 = PAYMENT_Y + 30.0;
const NOTES_LINE_HEIGHT: f64 = 14.0;
const ISSUER_BOX_Y: f64 = NOTES_Y + 16.0 + NOTES_MAX_LINES as f64 * NOTES_LINE_HEIGHT + 20.0;
const ISSUER_BOX_WIDTH: f64 = 230.0;
const ISSUER_BOX_HEIGHT: f64 = 92.0;
const ISSUER_ADDRESS_MAX_LINES: usize = 2;
const FOOTER_Y: f64 = A4_HEIGHT - MARGIN;

const SIZE_TITLE: f64 = 24.0;
const SIZE_RECIPIENT: f64 = 16.0;
const SIZE_TOTAL: f64 = 22.0;
const SIZE_LABEL: f64 = 12.0;
const SIZE_BODY: f64 = 10.0;
const SIZE_SMALL: f64 = 9.0;
const SIZE_FOOTER: f64 = 8.0;

fn band_fill() -> Color {
    Color::from_rgb(240, 240, 240)
}

fn header_fill() -> Color {
    Color::from_rgb(230, 230, 230)
}

fn rule_color() -> Color {
    Color::from_rgb(120, 120, 120)
}

fn muted_text() -> Color {
    Color::from_rgb(90, 90, 90)
}

/// A run of text whose left edge is at `x` and baseline at `y`
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub weight: FontWeight,
    pub color: Color,
}

/// A rectangle whose top-left corner is at (`x`, `y`)
#[derive(Debug, Clone, PartialEq)]
pub struct RectElement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub style: ShapeStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineElement {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub color: Color,
    pub width: f64,
}

/// One drawing primitive of a page
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text(TextElement),
    Rect(RectElement),
    Line(LineElement),
}

/// Display list for one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<Element>,
}

impl PageLayout {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
        }
    }

    /// All text runs in drawing order
    pub fn texts(&self) -> impl Iterator<Item = &TextElement> {
        self.elements.iter().filter_map(|element| match element {
            Element::Text(text) => Some(text),
            _ => None,
        })
    }

    /// First text run equal to `text`
    pub fn find_text(&self, text: &str) -> Option<&TextElement> {
        self.texts().find(|element| element.text == text)
    }

    /// Whether any text run contains `needle`
    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|element| element.text.contains(needle))
    }
}

/// Label of the tax row, e.g. "消費税（10%）"
pub fn tax_label(rate: f64) -> String {
    format!("消費税（{}）", format_percent(rate))
}

/// Appends elements to a page, resolving alignment with the measure
struct Painter<'a, M: TextMeasure + ?Sized> {
    measure: &'a M,
    page: PageLayout,
}

impl<M: TextMeasure + ?Sized> Painter<'_, M> {
    fn width(&self, text: &str, size: f64, weight: FontWeight) -> f64 {
        self.measure.text_width(text, size, weight)
    }

    #[allow(clippy::too_many_arguments)]
    fn text_colored(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        size: f64,
        weight: FontWeight,
        align: Align,
        color: Color,
    ) {
        if text.is_empty() {
            return;
        }
        let width = self.width(text, size, weight);
        self.page.elements.push(Element::Text(TextElement {
            text: text.to_string(),
            x: align.start_x(x, width),
            y,
            size,
            weight,
            color,
        }));
    }

    /// `text` cut to a single line of `max_width`, ending in an ellipsis when cut
    fn fit(&self, text: &str, max_width: f64, size: f64, weight: FontWeight) -> String {
        let measure = |s: &str| self.width(s, size, weight);
        let lines = wrap_by_width(text, max_width, measure);
        clamp_lines(lines, 1, max_width, measure)
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    fn text(&mut self, text: &str, x: f64, y: f64, size: f64, weight: FontWeight, align: Align) {
        self.text_colored(text, x, y, size, weight, align, Color::black());
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, style: ShapeStyle) {
        self.page.elements.push(Element::Rect(RectElement {
            x,
            y,
            width,
            height,
            style,
        }));
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Color, width: f64) {
        self.page.elements.push(Element::Line(LineElement {
            from,
            to,
            color,
            width,
        }));
    }
}

/// Lay out one receipt on a fixed A4 page
///
/// `generated_at` is printed in the footer. Sections, top to bottom: title;
/// number and issue date (right-aligned); recipient; highlighted total band;
/// the description; the single-row item table; subtotal, tax and total rows;
/// payment method; optional notes; boxed issuer block; footer timestamp.
/// Free text that would cross its column is cut to one line with an ellipsis.
pub fn layout_receipt<M>(data: &ReceiptData, measure: &M, generated_at: NaiveDateTime) -> PageLayout
where
    M: TextMeasure + ?Sized,
{
    let mut p = Painter {
        measure,
        page: PageLayout::new(A4_WIDTH, A4_HEIGHT),
    };
    let tax = data.tax();
    let total = format_yen(tax.amount);

    // Title
    p.text(
        DOCUMENT_TITLE,
        A4_WIDTH / 2.0,
        TITLE_Y,
        SIZE_TITLE,
        FontWeight::Bold,
        Align::Center,
    );
    let title_width = p.width(DOCUMENT_TITLE, SIZE_TITLE, FontWeight::Bold);
    let underline_half = title_width / 2.0 + 20.0;
    p.line(
        (A4_WIDTH / 2.0 - underline_half, TITLE_Y + 8.0),
        (A4_WIDTH / 2.0 + underline_half, TITLE_Y + 8.0),
        Color::black(),
        1.0,
    );

    // Number and issue date
    let number = p.fit(
        &format!("No. {}", data.number),
        CONTENT_WIDTH / 2.0,
        SIZE_BODY,
        FontWeight::Regular,
    );
    p.text(
        &number,
        RIGHT,
        NUMBER_Y,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Right,
    );
    p.text(
        &format!("発行日: {}", format_date_ja(data.issue_date)),
        RIGHT,
        DATE_Y,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Right,
    );

    // Recipient
    let recipient = p.fit(
        &format!("{} 様", data.recipient_name.trim()),
        CONTENT_WIDTH,
        SIZE_RECIPIENT,
        FontWeight::Bold,
    );
    p.text(
        &recipient,
        LEFT,
        RECIPIENT_Y,
        SIZE_RECIPIENT,
        FontWeight::Bold,
        Align::Left,
    );
    let recipient_width = p.width(&recipient, SIZE_RECIPIENT, FontWeight::Bold);
    let underline_end = LEFT + recipient_width.max(CONTENT_WIDTH / 2.0) + 10.0;
    p.line(
        (LEFT, RECIPIENT_Y + 6.0),
        (underline_end.min(RIGHT), RECIPIENT_Y + 6.0),
        Color::black(),
        0.75,
    );
    if let Some(address) = data.recipient_address.as_deref().map(str::trim) {
        let address = p.fit(address, CONTENT_WIDTH, SIZE_SMALL, FontWeight::Regular);
        p.text_colored(
            &address,
            LEFT,
            RECIPIENT_Y + 22.0,
            SIZE_SMALL,
            FontWeight::Regular,
            Align::Left,
            muted_text(),
        );
    }

    // Total band
    p.rect(
        LEFT,
        BAND_Y,
        CONTENT_WIDTH,
        BAND_HEIGHT,
        ShapeStyle::filled_and_stroked(band_fill(), rule_color(), 0.75),
    );
    let band_baseline = BAND_Y + BAND_HEIGHT / 2.0 + 7.0;
    p.text(
        "金額",
        LEFT + 20.0,
        band_baseline,
        SIZE_LABEL,
        FontWeight::Bold,
        Align::Left,
    );
    p.text(
        &total,
        RIGHT - 20.0,
        band_baseline + 1.0,
        SIZE_TOTAL,
        FontWeight::Bold,
        Align::Right,
    );

    // Description
    let description = p.fit(
        &format!("但し: {}", data.description.trim()),
        CONTENT_WIDTH,
        SIZE_BODY + 1.0,
        FontWeight::Regular,
    );
    p.text(
        &description,
        LEFT,
        DESCRIPTION_Y,
        SIZE_BODY + 1.0,
        FontWeight::Regular,
        Align::Left,
    );

    // Item table
    let header_bottom = TABLE_Y + TABLE_HEADER_HEIGHT;
    let row_bottom = header_bottom + TABLE_ROW_HEIGHT;
    p.rect(
        LEFT,
        TABLE_Y,
        CONTENT_WIDTH,
        TABLE_HEADER_HEIGHT,
        ShapeStyle::filled_and_stroked(header_fill(), rule_color(), 0.5),
    );
    p.rect(
        LEFT,
        header_bottom,
        CONTENT_WIDTH,
        TABLE_ROW_HEIGHT,
        ShapeStyle::stroked(rule_color(), 0.5),
    );
    p.line(
        (AMOUNT_COLUMN_X, TABLE_Y),
        (AMOUNT_COLUMN_X, row_bottom),
        rule_color(),
        0.5,
    );
    p.text(
        "品目",
        LEFT + PAD,
        header_bottom - 7.0,
        SIZE_BODY,
        FontWeight::Bold,
        Align::Left,
    );
    p.text(
        "金額（税抜）",
        RIGHT - PAD,
        header_bottom - 7.0,
        SIZE_BODY,
        FontWeight::Bold,
        Align::Right,
    );
    let item = p.fit(
        data.description.trim(),
        ITEM_COLUMN_WIDTH,
        SIZE_BODY,
        FontWeight::Regular,
    );
    p.text(
        &item,
        LEFT + PAD,
        row_bottom - 8.0,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Left,
    );
    p.text(
        &format_yen(tax.exclusive_amount),
        RIGHT - PAD,
        row_bottom - 8.0,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Right,
    );

    // Summary rows
    let tax_y = SUBTOTAL_Y + SUMMARY_LINE_HEIGHT;
    let total_y = tax_y + SUMMARY_LINE_HEIGHT + 4.0;
    p.text(
        "小計",
        SUMMARY_LABEL_X,
        SUBTOTAL_Y,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Left,
    );
    p.text(
        &format_yen(tax.exclusive_amount),
        RIGHT - PAD,
        SUBTOTAL_Y,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Right,
    );
    p.text(
        &tax_label(data.tax_rate),
        SUMMARY_LABEL_X,
        tax_y,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Left,
    );
    p.text(
        &format_yen(tax.tax_amount),
        RIGHT - PAD,
        tax_y,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Right,
    );
    p.line(
        (SUMMARY_LABEL_X, tax_y + 7.0),
        (RIGHT, tax_y + 7.0),
        Color::black(),
        0.75,
    );
    p.text(
        "合計",
        SUMMARY_LABEL_X,
        total_y,
        SIZE_LABEL,
        FontWeight::Bold,
        Align::Left,
    );
    p.text(
        &total,
        RIGHT - PAD,
        total_y,
        SIZE_LABEL,
        FontWeight::Bold,
        Align::Right,
    );

    // Payment method
    p.text(
        &format!("お支払方法: {}", data.payment_method.label()),
        LEFT,
        PAYMENT_Y,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Left,
    );

    // Notes
    let notes = data.notes.as_deref().map(str::trim);
    if let Some(notes) = notes.filter(|n| !n.is_empty()) {
        p.text(
            "備考",
            LEFT,
            NOTES_Y,
            SIZE_BODY,
            FontWeight::Bold,
            Align::Left,
        );
        let measure_note = |s: &str| measure.text_width(s, SIZE_SMALL, FontWeight::Regular);
        let lines = clamp_lines(
            wrap_by_width(notes, CONTENT_WIDTH, measure_note),
            NOTES_MAX_LINES,
            CONTENT_WIDTH,
            measure_note,
        );
        for (i, line) in lines.iter().enumerate() {
            let y = NOTES_Y + 16.0 + i as f64 * NOTES_LINE_HEIGHT;
            p.text(line, LEFT, y, SIZE_SMALL, FontWeight::Regular, Align::Left);
        }
    }

    // Issuer block
    let box_x = RIGHT - ISSUER_BOX_WIDTH;
    let inner_x = box_x + PAD + 4.0;
    let inner_width = ISSUER_BOX_WIDTH - 2.0 * (PAD + 4.0);
    p.rect(
        box_x,
        ISSUER_BOX_Y,
        ISSUER_BOX_WIDTH,
        ISSUER_BOX_HEIGHT,
        ShapeStyle::stroked(rule_color(), 0.75),
    );
    p.text_colored(
        "発行者",
        inner_x,
        ISSUER_BOX_Y + 16.0,
        SIZE_SMALL,
        FontWeight::Regular,
        Align::Left,
        muted_text(),
    );
    let title = p.fit(
        data.issuer.title.trim(),
        inner_width,
        SIZE_BODY,
        FontWeight::Regular,
    );
    p.text(
        &title,
        inner_x,
        ISSUER_BOX_Y + 34.0,
        SIZE_BODY,
        FontWeight::Regular,
        Align::Left,
    );
    let name = p.fit(
        data.issuer.name.trim(),
        inner_width,
        SIZE_LABEL,
        FontWeight::Bold,
    );
    p.text(
        &name,
        inner_x,
        ISSUER_BOX_Y + 53.0,
        SIZE_LABEL,
        FontWeight::Bold,
        Align::Left,
    );
    let measure_address = |s: &str| measure.text_width(s, SIZE_SMALL, FontWeight::Regular);
    let address_lines = clamp_lines(
        wrap_by_width(data.issuer.address.trim(), inner_width, measure_address),
        ISSUER_ADDRESS_MAX_LINES,
        inner_width,
        measure_address,
    );
    for (i, line) in address_lines.iter().enumerate() {
        let y = ISSUER_BOX_Y + 70.0 + i as f64 * 12.0;
        p.text(
            line,
            inner_x,
            y,
            SIZE_SMALL,
            FontWeight::Regular,
            Align::Left,
        );
    }

    // Footer
    p.text_colored(
        &format!("発行日時: {}", format_datetime_slash(generated_at)),
        RIGHT,
        FOOTER_Y,
        SIZE_FOOTER,
        FontWeight::Regular,
        Align::Right,
        muted_text(),
    );

    p.page
}
