use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// RFC 5987 `attr-char` is ALPHA / DIGIT plus these; everything else is escaped.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Builds the `Content-Disposition` value that makes downloads use `filename`.
///
/// Printable ASCII names are sent as a quoted-string with `"` and `\`
/// escaped. Anything else gets an ASCII fallback plus an RFC 2231
/// `filename*` parameter carrying the UTF-8 name.
pub fn attachment_disposition(filename: &str) -> String {
    if filename.chars().all(|c| matches!(c, ' '..='~')) {
        return format!("attachment; filename=\"{}\"", quote(filename));
    }

    let fallback: String = filename
        .chars()
        .map(|c| if matches!(c, ' '..='~') { c } else { '_' })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        quote(&fallback),
        utf8_percent_encode(filename, ATTR_CHAR)
    )
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
