//! Character decoding of fetched bodies
//!
//! Picks an encoding the way browsers do for a plain HTML response and turns
//! the raw bytes into UTF-8 text.

use encoding_rs::{Encoding, REPLACEMENT, UTF_8, WINDOWS_1252};

/// Number of leading bytes searched for a `<meta>` charset declaration and
/// checked for UTF-8 validity
const PRESCAN_BYTES: usize = 1024;

/// Decodes a response body using its declared or sniffed charset
///
/// Encoding selection order:
/// 1. byte-order mark
/// 2. `charset` parameter of the Content-Type header
/// 3. `<meta>` charset declaration in the first 1024 bytes
/// 4. UTF-8 if the first 1024 bytes are valid UTF-8, windows-1252 otherwise
///
/// A label that names no known encoding is skipped and selection moves on to
/// the next step. Malformed sequences decode to U+FFFD, so decoding always
/// produces text.
///
/// # Example
///
/// ```
/// use page_sounder::crawler::decode_body;
///
/// let text = decode_body(b"caf\xe9", Some("text/html; charset=iso-8859-1"));
/// assert_eq!(text, "café");
/// ```
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = determine_encoding(body, content_type);
    let (text, used, had_errors) = encoding.decode(body);

    if had_errors {
        tracing::debug!("Body contained malformed {} sequences", used.name());
    }

    text.into_owned()
}

/// Chooses the encoding for a body
pub fn determine_encoding(body: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return encoding;
    }

    if let Some(label) = content_type.and_then(charset_param) {
        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) if encoding != REPLACEMENT => return encoding,
            _ => tracing::debug!("Ignoring unsupported charset label {:?}", label),
        }
    }

    let head = &body[..body.len().min(PRESCAN_BYTES)];
    if let Some(encoding) = prescan_meta_charset(head) {
        return encoding;
    }

    if is_utf8_prefix(head, head.len() < body.len()) {
        UTF_8
    } else {
        WINDOWS_1252
    }
}

/// True when `head` is valid UTF-8, allowing a multi-byte sequence to be cut
/// off at the end when the body continues past it
fn is_utf8_prefix(head: &[u8], truncated: bool) -> bool {
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => truncated && e.error_len().is_none(),
    }
}

/// Extracts the `charset` parameter from a Content-Type value
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        (!value.is_empty()).then_some(value)
    })
}

/// Looks for `<meta charset=...>` or `<meta http-equiv content="...; charset=...">`
///
/// A meta declaration of a UTF-16 encoding means UTF-8, since the bytes were
/// readable as ASCII to get this far.
fn prescan_meta_charset(head: &[u8]) -> Option<&'static Encoding> {
    let lower = head.to_ascii_lowercase();
    let mut rest = lower.as_slice();

    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start..];
        let end = tag.iter().position(|&b| b == b'>').unwrap_or(tag.len());
        let tag = &tag[..end];

        if let Some(pos) = find(tag, b"charset") {
            let after = &tag[pos + b"charset".len()..];
            let skip = after.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let value = &after[skip..];
            if let Some(value) = value.strip_prefix(b"=") {
                let label = charset_label(value);
                if let Some(encoding) = Encoding::for_label(label) {
                    return Some(encoding.output_encoding());
                }
            }
        }

        rest = &rest[start + end..];
        if rest.is_empty() {
            break;
        }
        rest = &rest[1..];
    }

    None
}

/// Cuts the label out of the bytes following `charset=`
fn charset_label(value: &[u8]) -> &[u8] {
    let value = match value.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(i) => &value[i..],
        None => return &[],
    };
    let value = value
        .strip_prefix(b"\"")
        .or_else(|| value.strip_prefix(b"'"))
        .unwrap_or(value);
    let len = value
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'/' | b' ' | b'\t' | b'\n' | b'\r'))
        .unwrap_or(value.len());
    &value[..len]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
