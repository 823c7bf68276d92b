//! Macro preprocessing.
//!
//! Walks the token tree and lowers macro tags — tags whose name begins with
//! an uppercase ASCII letter — into hoisted definitions plus inline call
//! sites. Plain markup passes through byte-for-byte.

use std::collections::HashSet;

use muscade_html::{TagToken, Token, Tokenizer};

use crate::error::PreprocessError;
use crate::lower::MacroLowering;

/// The two output streams of a preprocessing pass. `extras` holds hoisted
/// definitions and is emitted ahead of page content; `content` is the inline
/// markup with call sites substituted. Both are append-only and never
/// interleave.
#[derive(Debug, Default)]
struct RenderAccumulator {
    extras: String,
    content: String,
}

impl RenderAccumulator {
    fn new() -> Self {
        Self::default()
    }
}

/// One preprocessor per page render: the macro-id counter is owned by the
/// instance, so distinct invocations in one pass always get distinct ids and
/// nothing is shared between renders.
pub struct Preprocessor {
    lowering: Box<dyn MacroLowering>,
    tokenizer: Tokenizer,
    extra_void: Vec<String>,
    always_close: HashSet<String>,
    counter: u64,
}

impl Preprocessor {
    pub fn new(lowering: impl MacroLowering + 'static) -> Self {
        Self {
            lowering: Box::new(lowering),
            tokenizer: Tokenizer::new(),
            extra_void: Vec::new(),
            always_close: HashSet::new(),
            counter: 0,
        }
    }

    /// Additional tag names the tokenizer treats as void.
    pub fn with_extra_void_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_void
            .extend(tags.into_iter().map(|t| t.into().to_ascii_lowercase()));
        self.rebuild_tokenizer();
        self
    }

    /// Tags treated as void (they never take children) but still given a
    /// synthesized closing tag on output.
    pub fn with_always_close_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_close
            .extend(tags.into_iter().map(|t| t.into().to_ascii_lowercase()));
        self.rebuild_tokenizer();
        self
    }

    fn rebuild_tokenizer(&mut self) {
        let extra = self.extra_void.iter().chain(self.always_close.iter());
        self.tokenizer = Tokenizer::with_extra_void_tags(extra.cloned());
    }

    /// Lower `content` into `(extras, content)`.
    pub fn preprocess(&mut self, content: &str) -> Result<(String, String), PreprocessError> {
        let root = self.tokenizer.tokenize(content)?;

        let mut acc = RenderAccumulator::new();
        self.render_tokens(&root.children, &mut acc)?;

        Ok((acc.extras, acc.content))
    }

    fn render_tokens(
        &mut self,
        tokens: &[Token],
        acc: &mut RenderAccumulator,
    ) -> Result<(), PreprocessError> {
        for token in tokens {
            self.render_token(token, acc)?;
        }
        Ok(())
    }

    fn render_token(
        &mut self,
        token: &Token,
        acc: &mut RenderAccumulator,
    ) -> Result<(), PreprocessError> {
        match token {
            Token::Text(text) => {
                acc.content.push_str(&text.raw);
                Ok(())
            }
            Token::Comment(_) => Ok(()),
            Token::Tag(tag) if is_macro_tag(&tag.name) => self.render_macro_tag(tag, acc),
            Token::Tag(tag) => self.render_plain_tag(tag, acc),
            Token::Doctype(_) => Err(PreprocessError::UnexpectedToken { kind: "doctype" }),
            Token::EndTag(_) => Err(PreprocessError::UnexpectedToken { kind: "end tag" }),
        }
    }

    fn render_plain_tag(
        &mut self,
        tag: &TagToken,
        acc: &mut RenderAccumulator,
    ) -> Result<(), PreprocessError> {
        acc.content.push_str(&tag.raw);

        self.render_tokens(&tag.children, acc)?;

        if !tag.self_closing || self.always_close.contains(&tag.name.to_ascii_lowercase()) {
            acc.content.push_str("</");
            acc.content.push_str(&tag.name);
            acc.content.push('>');
        }

        Ok(())
    }

    fn render_macro_tag(
        &mut self,
        tag: &TagToken,
        acc: &mut RenderAccumulator,
    ) -> Result<(), PreprocessError> {
        let mut child_acc = RenderAccumulator::new();
        self.render_tokens(&tag.children, &mut child_acc)?;

        self.counter += 1;
        let unique = format!("Content__Macro__{}__{}", tag.name, self.counter);

        let attrs = tag
            .attrs
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        let lowered = self
            .lowering
            .lower(&tag.name, &unique, &attrs)
            .map_err(|source| PreprocessError::MacroLowering {
                name: tag.name.clone(),
                source,
            })?;

        // The macro's rendered inner markup is hoisted into the definition
        // bracket; definitions from nested macros follow it. The call site
        // is all that remains in the document flow.
        acc.extras.push_str(&lowered.before);
        acc.extras.push_str(&child_acc.content);
        acc.extras.push_str(&lowered.after);
        acc.extras.push_str(&child_acc.extras);
        acc.content.push_str(&lowered.call);

        Ok(())
    }
}

/// A macro tag begins with an uppercase ASCII letter.
fn is_macro_tag(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::{DefineLowering, Lowered, MacroLowering};
    use serde_json::{Map, Value};

    /// Lowering that records what it was asked to lower.
    struct SpyLowering;

    impl MacroLowering for SpyLowering {
        fn lower(
            &self,
            name: &str,
            unique: &str,
            attrs: &Map<String, Value>,
        ) -> Result<Lowered, crate::lower::LowerError> {
            let attrs = serde_json::to_string(attrs)?;
            Ok(Lowered {
                before: format!("[def {unique}]"),
                after: "[/def]".to_string(),
                call: format!("[call {name} {unique} {attrs}]"),
            })
        }
    }

    fn preprocess(content: &str) -> (String, String) {
        Preprocessor::new(SpyLowering).preprocess(content).unwrap()
    }

    #[test]
    fn test_plain_markup_passes_through() {
        let (extras, content) = preprocess("<div class=\"x\"><p>text</p></div>");
        assert_eq!(extras, "");
        assert_eq!(content, "<div class=\"x\"><p>text</p></div>");
    }

    #[test]
    fn test_plain_tag_closing_synthesized() {
        // The closing tag is rebuilt even when the source omitted it.
        let (_, content) = preprocess("<div>text");
        assert_eq!(content, "<div>text</div>");
    }

    #[test]
    fn test_void_tag_not_closed() {
        let (_, content) = preprocess(r#"<img src="x">"#);
        assert_eq!(content, r#"<img src="x">"#);
    }

    #[test]
    fn test_always_close_tag() {
        let mut preprocessor =
            Preprocessor::new(SpyLowering).with_always_close_tags(["no"]);
        let (_, content) = preprocessor.preprocess("<no>rest").unwrap();
        // `no` is void (takes no children) but still emits a closing tag.
        assert_eq!(content, "<no></no>rest");
    }

    #[test]
    fn test_macro_tag_is_lowered() {
        let (extras, content) = preprocess(r#"<Card title="Intro">inner</Card>"#);
        assert_eq!(
            extras,
            "[def Content__Macro__Card__1]inner[/def]"
        );
        assert_eq!(
            content,
            r#"[call Card Content__Macro__Card__1 {"title":"Intro"}]"#
        );
        // The macro name never appears as literal markup.
        assert!(!content.contains("<Card"));
    }

    #[test]
    fn test_plain_tag_never_lowered() {
        let (extras, content) = preprocess("<div>x</div>");
        assert_eq!(extras, "");
        assert!(content.contains("<div>"));
        assert!(content.contains("</div>"));
    }

    #[test]
    fn test_unique_ids_distinct() {
        let (extras, content) = preprocess("<Card>a</Card><Card>b</Card>");
        assert!(extras.contains("Content__Macro__Card__1"));
        assert!(extras.contains("Content__Macro__Card__2"));
        assert!(content.contains("Content__Macro__Card__1"));
        assert!(content.contains("Content__Macro__Card__2"));
    }

    #[test]
    fn test_nested_macro_hoisting_order() {
        let (extras, content) = preprocess("<Outer><Inner>deep</Inner></Outer>");
        // Children render first, so the inner macro takes the lower id; its
        // definition lands after the outer macro's wrapper.
        assert_eq!(
            extras,
            "[def Content__Macro__Outer__2][call Inner Content__Macro__Inner__1 {}][/def][def Content__Macro__Inner__1]deep[/def]"
        );
        assert_eq!(content, "[call Outer Content__Macro__Outer__2 {}]");
    }

    #[test]
    fn test_macro_inside_plain_tag() {
        let (extras, content) = preprocess("<div><Badge/></div>");
        assert!(extras.contains("[def Content__Macro__Badge__1][/def]"));
        assert_eq!(
            content,
            "<div>[call Badge Content__Macro__Badge__1 {}]</div>"
        );
    }

    #[test]
    fn test_comments_contribute_nothing() {
        let (extras, content) = preprocess("<div><!-- hidden --></div>");
        assert_eq!(extras, "");
        assert_eq!(content, "<div></div>");
    }

    #[test]
    fn test_doctype_in_content_rejected() {
        let err = Preprocessor::new(SpyLowering)
            .preprocess("<!DOCTYPE html><p>x</p>")
            .unwrap_err();
        assert!(matches!(err, PreprocessError::UnexpectedToken { kind } if kind == "doctype"));
    }

    #[test]
    fn test_define_lowering_end_to_end() {
        let (extras, content) = Preprocessor::new(DefineLowering)
            .preprocess(r#"<Card title="t">body</Card>"#)
            .unwrap();
        assert_eq!(
            extras,
            r#"{{- define "Content__Macro__Card__1" }}body{{ end -}}"#
        );
        assert_eq!(
            content,
            r#"{{ macro_render "Card" "Content__Macro__Card__1" ("{\"title\":\"t\"}"|json_parse) }}"#
        );
    }
}
