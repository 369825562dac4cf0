// Document extraction
// Turns uploaded files into plain text ready for chunking


use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use tracing::debug;

use crate::{RagError, Result};

/// Elements whose text never reaches the index
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

/// Elements that start a new line of text
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "br",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "td",
    "th",
    "tr",
    "ul",
];

/// How a file's bytes are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Markdown,
    Html,
    PlainText,
}

impl DocumentFormat {
    /// Pick a format from the file extension, ignoring case
    #[inline]
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("md" | "markdown") => Self::Markdown,
            Some("html" | "htm") => Self::Html,
            _ => Self::PlainText,
        }
    }
}

/// Read a file and return its readable text
#[inline]
pub fn extract_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8(bytes).map_err(|e| {
        RagError::Extraction(format!(
            "{} is not valid UTF-8 text (invalid byte at offset {})",
            path.display(),
            e.utf8_error().valid_up_to()
        ))
    })?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let format = DocumentFormat::from_path(path);
    let text = match format {
        DocumentFormat::Markdown => markdown_to_text(content),
        DocumentFormat::Html => html_to_text(content),
        DocumentFormat::PlainText => content.to_string(),
    };

    debug!(
        "Extracted {} chars of {:?} text from {}",
        text.len(),
        format,
        path.display()
    );
    Ok(text)
}

/// Render markdown as plain text, one line per block
#[inline]
pub fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(content) | Event::Code(content) => text.push_str(&content),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak | Event::Rule => text.push('\n'),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote(_)
                | TagEnd::TableRow
                | TagEnd::TableCell,
            ) => text.push('\n'),
            _ => {}
        }
    }

    text.trim().to_string()
}

/// Text of the document body, without scripts or styles
#[inline]
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut text = String::new();
    collect_text(root, &mut text);
    text.trim().to_string()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(content) = child.value().as_text() {
            out.push_str(content);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED_ELEMENTS.contains(&name) {
                continue;
            }

            let is_block = BLOCK_ELEMENTS.contains(&name);
            if is_block {
                out.push('\n');
            }
            collect_text(child_element, out);
            if is_block {
                out.push('\n');
            }
        }
    }
}
