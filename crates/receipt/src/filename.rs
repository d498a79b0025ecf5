//! Download filenames and Content-Disposition values

/// Replace characters that are not allowed in filenames with `_`
pub fn sanitize_filename_part(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// `<type>_<number>_<recipient>.<ext>`, skipping empty parts
///
/// ```
/// use receipt::document_filename;
///
/// assert_eq!(
///     document_filename("領収書", "R2025-0001", "山田 花子", "pdf"),
///     "領収書_R2025-0001_山田 花子.pdf"
/// );
/// ```
pub fn document_filename(doc_type: &str, number: &str, recipient: &str, ext: &str) -> String {
    let stem = [doc_type, number, recipient]
        .iter()
        .map(|part| sanitize_filename_part(part))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let stem = if stem.is_empty() { "document".to_string() } else { stem };
    format!("{stem}.{}", ext.trim_start_matches('.'))
}

/// ASCII-only stand-in for clients that ignore `filename*`
fn ascii_fallback(filename: &str) -> String {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if ext.chars().all(|c| c.is_ascii_alphanumeric()) => (stem, Some(ext)),
        _ => (filename, None),
    };

    let mut cleaned = String::with_capacity(stem.len());
    for c in stem.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }
    let cleaned = cleaned.trim_matches('_');
    let cleaned = if cleaned.is_empty() { "download" } else { cleaned };

    match ext {
        Some(ext) => format!("{cleaned}.{ext}"),
        None => cleaned.to_string(),
    }
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(filename),
        urlencoding::encode(filename)
    )
}
