//! Markdown conversion boundary.
//!
//! The pipeline treats Markdown as an opaque text-to-HTML function; the
//! page renderer applies it to the rendered `page_content` block when a
//! page's source format is Markdown. [`CmarkRender`] is the default
//! implementation.

use pulldown_cmark::{Options, Parser, html};

pub type MarkdownError = Box<dyn std::error::Error + Send + Sync>;

pub trait MarkdownRender {
    fn render(&self, text: &str) -> Result<String, MarkdownError>;
}

/// pulldown-cmark renderer with the extensions pages expect: tables,
/// strikethrough, task lists, footnotes, smart punctuation, and heading
/// attributes.
#[derive(Debug, Clone)]
pub struct CmarkRender {
    options: Options,
}

impl Default for CmarkRender {
    fn default() -> Self {
        Self::new()
    }
}

impl CmarkRender {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        Self { options }
    }
}

impl MarkdownRender for CmarkRender {
    fn render(&self, text: &str) -> Result<String, MarkdownError> {
        let parser = Parser::new_ext(text, self.options);
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}
