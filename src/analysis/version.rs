use std::fmt;

/// Markup generation declared by a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlVersion {
    Html5,
    Html401,
    Unknown,
}

impl HtmlVersion {
    /// The label stored on the crawl record
    pub fn label(&self) -> &'static str {
        match self {
            Self::Html5 => "HTML5",
            Self::Html401 => "HTML 4.01",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for HtmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies the document's markup generation by plain substring search
///
/// The HTML5 marker is matched case-sensitively; lowercase `<!doctype html>`
/// is reported as `Unknown`. No doctype parsing happens here.
///
/// # Examples
///
/// ```
/// use page_sounder::analysis::{detect_html_version, HtmlVersion};
///
/// assert_eq!(detect_html_version("<!DOCTYPE html><html></html>"), HtmlVersion::Html5);
/// assert_eq!(detect_html_version("<html></html>"), HtmlVersion::Unknown);
/// ```
pub fn detect_html_version(document: &str) -> HtmlVersion {
    if document.contains("<!DOCTYPE html>") {
        HtmlVersion::Html5
    } else if document.contains("HTML 4.01") {
        HtmlVersion::Html401
    } else {
        HtmlVersion::Unknown
    }
}
