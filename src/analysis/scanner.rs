//! Token-stream scanner for HTML documents
//!
//! The document is run through the html5ever tokenizer without a tree
//! builder: tags are seen once, in source order, and nothing is rearranged.
//! The scanner keeps only the facts it needs while the tokens stream past.
//!
//! The tokenizer keeps only the first of a repeated attribute. Input is fed
//! in chunks that each end at a `>`, so a start tag always ends where its
//! chunk ends; when the tokenizer reports a duplicate attribute, the tag's
//! source text is re-read to recover every occurrence.

use crate::analysis::headings::{HeadingCounts, HeadingLevel};
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

/// Facts collected in one forward pass over a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentScan {
    /// Text that immediately followed the last `<title>` start tag
    pub title: Option<String>,

    /// Number of `h1`..`h6` start tags per level
    pub headings: HeadingCounts,

    /// True once an `<input type="password">` was seen
    pub has_login: bool,

    /// Raw `href` values of every `<a>` start tag, in document order.
    /// An anchor without `href` contributes an empty reference; a repeated
    /// `href` contributes its last occurrence.
    pub links: Vec<String>,
}

/// Where the scanner stands with respect to the title text
#[derive(Debug)]
enum TitleCapture {
    Idle,
    /// A `<title>` start tag was the last token
    Pending,
    /// Collecting the text run that followed `<title>`
    Capturing(String),
}

struct ScanSink<'a> {
    scan: &'a mut DocumentScan,
    title: TitleCapture,
    source: &'a str,
    /// Byte offset where the chunk being tokenized ends
    chunk_end: usize,
    /// Byte offset after the last tag, comment or doctype
    markup_end: usize,
    /// The tokenizer dropped a repeated attribute of the tag it is building
    duplicate_attribute: bool,
}

impl<'a> ScanSink<'a> {
    fn new(scan: &'a mut DocumentScan, source: &'a str) -> Self {
        Self {
            scan,
            title: TitleCapture::Idle,
            source,
            chunk_end: 0,
            markup_end: 0,
            duplicate_attribute: false,
        }
    }

    /// Ends any title text run; only a run that actually captured text
    /// replaces the current title.
    fn close_title(&mut self) {
        let previous = std::mem::replace(&mut self.title, TitleCapture::Idle);
        if let TitleCapture::Capturing(text) = previous {
            self.scan.title = Some(text);
        }
    }

    fn push_text(&mut self, text: &str) {
        match self.title {
            TitleCapture::Idle => {}
            TitleCapture::Pending => self.title = TitleCapture::Capturing(text.to_string()),
            TitleCapture::Capturing(ref mut buf) => buf.push_str(text),
        }
    }

    /// Source attributes of the start tag that ends at the current chunk,
    /// repeats included
    fn source_attributes(&self, name: &str) -> Option<Vec<(String, &'a str)>> {
        let source: &'a str = self.source;
        let window = source.get(self.markup_end..self.chunk_end)?;
        window.match_indices('<').find_map(|(at, _)| {
            let raw = lex_start_tag(&window[at..])?;
            (raw.name == name && at + raw.len == window.len()).then_some(raw.attrs)
        })
    }

    fn start_tag(&mut self, tag: &Tag) -> TokenSinkResult<()> {
        let name: &str = &tag.name;
        let repeats = if self.duplicate_attribute {
            self.source_attributes(name)
        } else {
            None
        };

        match name {
            "title" => self.title = TitleCapture::Pending,
            "input" => {
                let login = match &repeats {
                    Some(attrs) => attrs
                        .iter()
                        .filter(|(attr, _)| attr == "type")
                        .any(|(_, raw)| scan_document(&format!("<input {}>", raw)).has_login),
                    None => is_password_input(tag),
                };
                if login {
                    self.scan.has_login = true;
                }
            }
            "a" => {
                let last_href = repeats
                    .as_ref()
                    .and_then(|attrs| attrs.iter().rev().find(|(attr, _)| attr == "href"))
                    .and_then(|(_, raw)| scan_document(&format!("<a {}>", raw)).links.pop());
                let href = match last_href {
                    Some(href) => href,
                    None => attribute(tag, "href").unwrap_or_default().to_string(),
                };
                self.scan.links.push(href);
            }
            _ => {
                if let Some(level) = HeadingLevel::from_tag_name(name) {
                    *self.scan.headings.entry(level).or_insert(0) += 1;
                }
            }
        }

        if tag.self_closing {
            return TokenSinkResult::Continue;
        }
        if name == "plaintext" {
            return TokenSinkResult::Plaintext;
        }
        raw_text_kind(name)
            .map(TokenSinkResult::RawData)
            .unwrap_or(TokenSinkResult::Continue)
    }
}

impl TokenSink for ScanSink<'_> {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => {
                self.push_text(&text);
                TokenSinkResult::Continue
            }
            Token::ParseError(message) => {
                if message.starts_with("Duplicate attribute") {
                    self.duplicate_attribute = true;
                }
                TokenSinkResult::Continue
            }
            Token::NullCharacterToken => TokenSinkResult::Continue,
            Token::TagToken(tag) => {
                self.close_title();
                let result = match tag.kind {
                    TagKind::StartTag => self.start_tag(&tag),
                    TagKind::EndTag => TokenSinkResult::Continue,
                };
                self.duplicate_attribute = false;
                self.markup_end = self.chunk_end;
                result
            }
            Token::CommentToken(_) | Token::DoctypeToken(_) => {
                self.close_title();
                self.markup_end = self.chunk_end;
                TokenSinkResult::Continue
            }
            Token::EOFToken => {
                self.close_title();
                TokenSinkResult::Continue
            }
        }
    }
}

/// Value of the first attribute called `name`
///
/// The tokenizer keeps only the first of a repeated attribute.
fn attribute<'t>(tag: &'t Tag, name: &str) -> Option<&'t str> {
    tag.attrs
        .iter()
        .find(|attr| &*attr.name.local == name)
        .map(|attr| &*attr.value)
}

fn is_password_input(tag: &Tag) -> bool {
    attribute(tag, "type").is_some_and(|value| value.eq_ignore_ascii_case("password"))
}

/// Elements whose content must not be tokenized as markup
///
/// `plaintext` is handled apart: everything after it is text.
fn raw_text_kind(name: &str) -> Option<RawKind> {
    match name {
        "title" | "textarea" => Some(RawKind::Rcdata),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
            Some(RawKind::Rawtext)
        }
        "script" => Some(RawKind::ScriptData),
        _ => None,
    }
}

/// Scans a decoded HTML document in a single forward pass
///
/// Malformed markup never aborts the scan; the tokenizer recovers locally and
/// the scan reports whatever it saw up to the end of the input.
///
/// # Example
///
/// ```
/// use page_sounder::analysis::{scan_document, HeadingLevel};
///
/// let scan = scan_document("<title>T</title><h2>a</h2><h2>b</h2><a href='/x'>x</a>");
/// assert_eq!(scan.title.as_deref(), Some("T"));
/// assert_eq!(scan.headings.get(&HeadingLevel::H2), Some(&2));
/// assert_eq!(scan.links, vec!["/x".to_string()]);
/// ```
pub fn scan_document(document: &str) -> DocumentScan {
    let mut scan = DocumentScan::default();

    {
        let sink = ScanSink::new(&mut scan, document);
        let mut tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
        let mut input = BufferQueue::new();
        let mut offset = 0;
        for chunk in document.split_inclusive('>') {
            offset += chunk.len();
            tokenizer.sink.chunk_end = offset;
            input.push_back(StrTendril::from_slice(chunk));
            let _ = tokenizer.feed(&mut input);
        }
        tokenizer.end();
    }

    scan
}

/// A start tag as written in the source
struct SourceTag<'s> {
    /// Lowercased tag name
    name: String,
    /// Lowercased attribute names with their `name=value` source text
    attrs: Vec<(String, &'s str)>,
    /// Byte length up to and including the closing `>`
    len: usize,
}

/// Lexes the start tag at the beginning of `text`, keeping repeated
/// attributes
fn lex_start_tag(text: &str) -> Option<SourceTag<'_>> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'<') || !bytes.get(1)?.is_ascii_alphabetic() {
        return None;
    }

    let is_space = |b: u8| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c');
    let mut i = 1;
    while i < bytes.len() && !is_space(bytes[i]) && !matches!(bytes[i], b'/' | b'>') {
        i += 1;
    }
    let name = text[1..i].to_ascii_lowercase();
    let mut attrs = Vec::new();

    loop {
        while i < bytes.len() && (is_space(bytes[i]) || bytes[i] == b'/') {
            i += 1;
        }
        match *bytes.get(i)? {
            b'>' => {
                return Some(SourceTag {
                    name,
                    attrs,
                    len: i + 1,
                })
            }
            _ => {
                let start = i;
                i += 1;
                while i < bytes.len()
                    && !is_space(bytes[i])
                    && !matches!(bytes[i], b'/' | b'>' | b'=')
                {
                    i += 1;
                }
                let attr = text[start..i].to_ascii_lowercase();

                let mut j = i;
                while j < bytes.len() && is_space(bytes[j]) {
                    j += 1;
                }
                if bytes.get(j) == Some(&b'=') {
                    j += 1;
                    while j < bytes.len() && is_space(bytes[j]) {
                        j += 1;
                    }
                    match *bytes.get(j)? {
                        quote @ (b'"' | b'\'') => {
                            let close = bytes[j + 1..].iter().position(|&b| b == quote)?;
                            j += close + 2;
                        }
                        _ => {
                            while j < bytes.len() && !is_space(bytes[j]) && bytes[j] != b'>' {
                                j += 1;
                            }
                        }
                    }
                    i = j;
                }
                attrs.push((attr, &text[start..i]));
            }
        }
    }
}
