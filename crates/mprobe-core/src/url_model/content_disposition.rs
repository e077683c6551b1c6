//! Content-Disposition header parsing (filename and filename*) and generation.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 5987 `attr-char`: everything else in an extended value is percent-encoded.
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

/// Disposition type of a generated header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionKind {
    /// Display in place (media players probing with `Range`).
    Inline,
    /// Save as a file.
    Attachment,
}

impl DispositionKind {
    fn as_str(self) -> &'static str {
        match self {
            DispositionKind::Inline => "inline",
            DispositionKind::Attachment => "attachment",
        }
    }
}

/// Builds a Content-Disposition value carrying `filename` in both the quoted
/// ASCII form (non-ASCII replaced by `_`) and the RFC 5987 `filename*` form.
pub fn format_content_disposition(kind: DispositionKind, filename: &str) -> String {
    let mut ascii = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '"' | '\\' => {
                ascii.push('\\');
                ascii.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => ascii.push(c),
            _ => ascii.push('_'),
        }
    }
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind.as_str(),
        ascii,
        utf8_percent_encode(filename, ATTR_CHAR)
    )
}

/// Extracts the filename from a raw Content-Disposition header value.
///
/// Supports:
/// - `filename="value"` (quoted; strips quotes and unescapes)
/// - `filename=value` (token)
/// - `filename*=UTF-8''percent-encoded` (RFC 5987; decoded)
/// If both `filename` and `filename*` exist, `filename*` takes precedence.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let mut filename_from_token: Option<String> = None;

    for param in split_params(header_value.trim()) {
        let param = param.trim();
        if let Some((name, v)) = param.split_once('=') {
            let name = name.trim().to_ascii_lowercase();
            let v = v.trim();

            if name == "filename*" {
                if let Some((charset, rest)) = split_extended(v) {
                    if charset.eq_ignore_ascii_case("utf-8") {
                        let decoded = percent_decode_str(rest).decode_utf8_lossy();
                        if !decoded.is_empty() {
                            return Some(decoded.into_owned());
                        }
                    }
                }
            }

            if name == "filename" {
                let unquoted = if v.starts_with('"') && v.ends_with('"') && v.len() >= 2 {
                    decode_quoted_filename(&v[1..v.len() - 1])
                } else {
                    v.to_string()
                };
                if !unquoted.is_empty() {
                    filename_from_token = Some(unquoted);
                }
            }
        }
    }

    filename_from_token
}

/// `UTF-8'lang'value` -> (`UTF-8`, `value`).
fn split_extended(v: &str) -> Option<(&str, &str)> {
    let v = v.trim_matches('"');
    let (charset, rest) = v.split_once('\'')?;
    let (_lang, value) = rest.split_once('\'')?;
    Some((charset, value))
}

/// Splits on `;` outside quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                out.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&value[start..]);
    out
}

/// Decode backslash-escaped quotes in a quoted filename value.
fn decode_quoted_filename(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}
