//! Record report formatting
//!
//! Human-readable renderings of stored crawl records: a compact table for
//! listings and a markdown detail view for a single record.

use crate::storage::{BrokenLinkRecord, CrawlRecord, HeadingRecord};

/// Widest title shown in a listing row before it is shortened
const TABLE_TITLE_WIDTH: usize = 40;

/// A record together with the rows it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    pub record: CrawlRecord,
    pub headings: Vec<HeadingRecord>,
    pub broken_links: Vec<BrokenLinkRecord>,
}

/// Formats records as a fixed-width table, one row per record
pub fn format_record_table(records: &[CrawlRecord]) -> String {
    if records.is_empty() {
        return "No crawl records.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{:>6}  {:<8}  {:<10}  {:>5}  {:>5}  {:<5}  {:<w$}  {}\n",
        "ID",
        "STATUS",
        "VERSION",
        "INT",
        "EXT",
        "LOGIN",
        "TITLE",
        "URL",
        w = TABLE_TITLE_WIDTH
    ));

    for record in records {
        out.push_str(&format!(
            "{:>6}  {:<8}  {:<10}  {:>5}  {:>5}  {:<5}  {:<w$}  {}\n",
            record.id,
            record.status.to_string(),
            display_or_dash(&record.html_version),
            record.internal_links,
            record.external_links,
            if record.has_login { "yes" } else { "no" },
            shorten(&record.title, TABLE_TITLE_WIDTH),
            record.url,
            w = TABLE_TITLE_WIDTH
        ));
    }

    out
}

/// Formats one record with its headings and broken links as markdown
pub fn format_record_detail(report: &RecordReport) -> String {
    let record = &report.record;
    let mut md = String::new();

    md.push_str(&format!("# Crawl {}\n\n", record.id));
    md.push_str(&format!("- **URL**: {}\n", record.url));
    md.push_str(&format!("- **Status**: {}\n", record.status));
    md.push_str(&format!("- **Title**: {}\n", display_or_dash(&record.title)));
    md.push_str(&format!(
        "- **HTML Version**: {}\n",
        display_or_dash(&record.html_version)
    ));
    md.push_str(&format!(
        "- **Login Form**: {}\n",
        if record.has_login { "yes" } else { "no" }
    ));
    md.push_str(&format!("- **Internal Links**: {}\n", record.internal_links));
    md.push_str(&format!("- **External Links**: {}\n", record.external_links));
    md.push_str(&format!("- **Created**: {}\n", record.created_at));
    md.push_str(&format!(
        "- **Last Crawled**: {}\n\n",
        record.last_crawled.as_deref().unwrap_or("-")
    ));

    md.push_str("## Headings\n\n");
    if report.headings.is_empty() {
        md.push_str("None\n\n");
    } else {
        md.push_str("| Level | Count |\n");
        md.push_str("|-------|-------|\n");
        for heading in &report.headings {
            md.push_str(&format!("| {} | {} |\n", heading.level, heading.count));
        }
        md.push('\n');
    }

    md.push_str(&format!("## Broken Links ({})\n\n", report.broken_links.len()));
    if report.broken_links.is_empty() {
        md.push_str("None\n");
    } else {
        md.push_str("| Status | Link |\n");
        md.push_str("|--------|------|\n");
        for link in &report.broken_links {
            md.push_str(&format!("| {} | {} |\n", link.status, link.link));
        }
    }

    md
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

/// Cuts `text` to `width` characters, marking the cut with "..."
fn shorten(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return display_or_dash(text).to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
