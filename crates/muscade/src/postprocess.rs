//! Canonical re-serialization of rendered markup.
//!
//! The rendered page is tokenized again (with the same void-tag
//! configuration as preprocessing) and written back out in one canonical
//! form: attributes re-quoted, comments dropped, closing tags synthesized.
//! One structural rewrite applies on the way: stray blockquote content is
//! folded into a sibling `details` element, turning quoted asides into a
//! collapsible widget.

use std::collections::HashSet;
use std::fmt::Write;

use muscade_html::{TagToken, Token, TokenizeError, Tokenizer};

/// Attributes that serialize as a bare name when their value is empty.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "selected",
];

pub struct Postprocessor {
    tokenizer: Tokenizer,
    boolean_attrs: HashSet<&'static str>,
}

impl Default for Postprocessor {
    fn default() -> Self {
        Self::new(Tokenizer::new())
    }
}

impl Postprocessor {
    /// The tokenizer should carry the same void-tag configuration used for
    /// preprocessing, so both passes see the same tree shape.
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            boolean_attrs: BOOLEAN_ATTRIBUTES.iter().copied().collect(),
        }
    }

    pub fn postprocess(&self, content: &str) -> Result<String, TokenizeError> {
        let root = self.tokenizer.tokenize(content)?;

        let mut out = String::new();
        self.serialize_tokens(&root.children, &mut out);
        Ok(out)
    }

    fn serialize_tokens(&self, tokens: &[Token], out: &mut String) {
        for token in tokens {
            self.serialize_token(token, out);
        }
    }

    fn serialize_token(&self, token: &Token, out: &mut String) {
        match token {
            Token::Doctype(t) | Token::Text(t) => out.push_str(&t.raw),
            Token::Comment(_) => {}
            Token::Tag(tag) => {
                if tag.name.eq_ignore_ascii_case("blockquote") {
                    if let Some(folded) = fold_blockquote(tag) {
                        self.serialize_tag(&folded, out);
                        return;
                    }
                }
                self.serialize_tag(tag, out);
            }
            Token::EndTag(end) => {
                out.push_str("</");
                out.push_str(&end.name);
                out.push('>');
            }
        }
    }

    fn serialize_tag(&self, tag: &TagToken, out: &mut String) {
        out.push('<');
        out.push_str(&tag.name);

        for (key, value) in &tag.attrs {
            out.push(' ');
            if value.is_empty() && self.boolean_attrs.contains(key.to_ascii_lowercase().as_str()) {
                out.push_str(key);
            } else {
                // String-literal escaping, one canonical quoting style.
                let _ = write!(out, "{key}={value:?}");
            }
        }

        if tag.self_closing {
            out.push_str("/>");
            return;
        }
        out.push('>');

        self.serialize_tokens(&tag.children, out);

        out.push_str("</");
        out.push_str(&tag.name);
        out.push('>');
    }
}

/// Fold a blockquote's stray children into its `details` child: every
/// non-details child moves, in original order, to the end of the details
/// element. Returns `None` when there is no details child.
fn fold_blockquote(tag: &TagToken) -> Option<TagToken> {
    let mut details: Option<TagToken> = None;
    let mut others = Vec::new();

    for child in &tag.children {
        match child {
            Token::Tag(child_tag) if child_tag.name.eq_ignore_ascii_case("details") => {
                details = Some(child_tag.clone());
            }
            other => others.push(other.clone()),
        }
    }

    let mut details = details?;
    details.children.extend(others);

    let mut folded = tag.clone();
    folded.children = vec![Token::Tag(details)];
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postprocess(content: &str) -> String {
        Postprocessor::default().postprocess(content).unwrap()
    }

    #[test]
    fn test_tags_rewritten_canonically() {
        assert_eq!(
            postprocess("<div   class='x'\n id=y>text</div>"),
            r#"<div class="x" id="y">text</div>"#
        );
    }

    #[test]
    fn test_closing_tags_synthesized() {
        assert_eq!(postprocess("<p>dangling"), "<p>dangling</p>");
    }

    #[test]
    fn test_comments_dropped() {
        assert_eq!(postprocess("a<!-- gone -->b"), "ab");
    }

    #[test]
    fn test_doctype_passes_raw() {
        assert_eq!(
            postprocess("<!DOCTYPE html><html></html>"),
            "<!DOCTYPE html><html></html>"
        );
    }

    #[test]
    fn test_void_tag_serializes_self_closing() {
        assert_eq!(postprocess(r#"<img src="x">"#), r#"<img src="x"/>"#);
    }

    #[test]
    fn test_boolean_attribute_bare() {
        assert_eq!(
            postprocess("<input disabled value=''>"),
            r#"<input disabled value=""/>"#
        );
    }

    #[test]
    fn test_stray_end_tag_serialized() {
        assert_eq!(postprocess("</p>x"), "</p>x");
    }

    #[test]
    fn test_attribute_value_escaping() {
        assert_eq!(
            postprocess(r#"<a title='say "hi"'>x</a>"#),
            r#"<a title="say \"hi\"">x</a>"#
        );
    }

    #[test]
    fn test_blockquote_details_fold() {
        let out = postprocess(
            "<blockquote><p>x</p><details><summary>s</summary></details><p>y</p></blockquote>",
        );
        assert_eq!(
            out,
            "<blockquote><details><summary>s</summary><p>x</p><p>y</p></details></blockquote>"
        );
    }

    #[test]
    fn test_blockquote_without_details_untouched() {
        assert_eq!(
            postprocess("<blockquote><p>x</p><p>y</p></blockquote>"),
            "<blockquote><p>x</p><p>y</p></blockquote>"
        );
    }

    #[test]
    fn test_second_pass_parses_identically() {
        let input = r#"<div class="a"><p>one</p><span data-x="1">two</span></div>"#;
        let once = postprocess(input);
        let twice = postprocess(&once);

        let tokenizer = Tokenizer::new();
        assert_eq!(
            tokenizer.tokenize(&once).unwrap(),
            tokenizer.tokenize(&twice).unwrap()
        );
    }
}
