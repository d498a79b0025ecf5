//! Line breaking for Japanese text (kinsoku shori)

/// Appended to the last kept line when text is cut short
pub const ELLIPSIS: char = '…';

/// Check if a character may not begin a line (行頭禁則)
pub fn is_line_start_prohibited(c: char) -> bool {
    matches!(
        c,
        '、' | '。' | '，' | '．' | '・' | '：' | '；' | '？' | '！' | 'ー' | '々' | '〻'
            | 'ゝ' | 'ゞ' | 'ヽ' | 'ヾ' | '…' | '‥'
            | 'ぁ' | 'ぃ' | 'ぅ' | 'ぇ' | 'ぉ' | 'っ' | 'ゃ' | 'ゅ' | 'ょ' | 'ゎ' | 'ゕ' | 'ゖ'
            | 'ァ' | 'ィ' | 'ゥ' | 'ェ' | 'ォ' | 'ッ' | 'ャ' | 'ュ' | 'ョ' | 'ヮ' | 'ヵ' | 'ヶ'
            | '）' | '」' | '』' | '】' | '〕' | '〉' | '》' | '］' | '｝' | '’' | '”'
            | ')' | ']' | '}' | ',' | '.' | '!' | '?' | ':' | ';' | '%' | '％'
    )
}

/// Check if a character may not end a line (行末禁則)
pub fn is_line_end_prohibited(c: char) -> bool {
    matches!(
        c,
        '（' | '「' | '『' | '【' | '〔' | '〈' | '《' | '［' | '｛' | '‘' | '“'
            | '(' | '[' | '{' | '¥' | '￥' | '$' | '＄' | '#' | '＃'
    )
}

/// Check if breaking between two characters is allowed
///
/// Returns true if a line break is allowed between `left` and `right`.
/// Runs of ASCII letters and digits are kept together.
pub fn can_break_between(left: char, right: char) -> bool {
    if is_line_start_prohibited(right) || is_line_end_prohibited(left) {
        return false;
    }
    !(left.is_ascii_alphanumeric() && right.is_ascii_alphanumeric())
}

/// Wrap text so that no line is wider than `max_width`
///
/// `measure` returns the rendered width of a string in the same unit as
/// `max_width`. Explicit newlines start a new line. When a line overflows,
/// it is broken at the last position allowed by the kinsoku rules; a run
/// with no such position is broken where it overflows.
pub fn wrap_by_width<F>(text: &str, max_width: f64, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f64,
{
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph.trim_end_matches('\r'), max_width, &measure, &mut lines);
    }
    lines
}

fn wrap_paragraph<F>(paragraph: &str, max_width: f64, measure: &F, lines: &mut Vec<String>)
where
    F: Fn(&str) -> f64,
{
    let chars: Vec<char> = paragraph.chars().collect();
    if chars.is_empty() {
        lines.push(String::new());
        return;
    }

    let mut start = 0;
    while start < chars.len() {
        // Longest prefix that fits; always at least one character
        let mut end = start + 1;
        while end < chars.len() {
            let candidate: String = chars[start..=end].iter().collect();
            if measure(&candidate) > max_width {
                break;
            }
            end += 1;
        }

        if end < chars.len() {
            if let Some(pos) = (start + 1..=end)
                .rev()
                .find(|&i| can_break_between(chars[i - 1], chars[i]))
            {
                end = pos;
            }
        }

        let line: String = chars[start..end].iter().collect();
        lines.push(line.trim_end().to_string());

        start = end;
        while start < chars.len() && chars[start] == ' ' {
            start += 1;
        }
    }
}

/// Keep at most `max_lines` lines
///
/// When lines are dropped the last kept line is shortened until it fits
/// `max_width` with `ELLIPSIS` appended.
pub fn clamp_lines<F>(
    mut lines: Vec<String>,
    max_lines: usize,
    max_width: f64,
    measure: F,
) -> Vec<String>
where
    F: Fn(&str) -> f64,
{
    if lines.len() <= max_lines {
        return lines;
    }
    lines.truncate(max_lines);

    if let Some(last) = lines.last_mut() {
        let mut kept: Vec<char> = last.chars().collect();
        loop {
            let candidate: String = kept.iter().chain(std::iter::once(&ELLIPSIS)).collect();
            if kept.is_empty() || measure(&candidate) <= max_width {
                *last = candidate;
                break;
            }
            kept.pop();
        }
    }

    lines
}
