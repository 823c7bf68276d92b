//! Recursive-descent tree builder over the raw lexer.

use std::collections::HashSet;

use crate::lexer::{Lexer, RawKind, RawLexToken, TokenizeError};
use crate::token::{EndTagToken, RawToken, TagToken, Token};

/// Elements that never have content and never consume a closing tag.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Builds a token tree from markup.
///
/// The void set is the standard HTML void elements plus any caller extras.
/// Tokenizing shares no state between calls; the returned tree is
/// independently owned.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    void_tags: HashSet<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            void_tags: VOID_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Extend the void set with caller-supplied tag names.
    pub fn with_extra_void_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokenizer = Self::new();
        tokenizer
            .void_tags
            .extend(tags.into_iter().map(|t| t.into().to_ascii_lowercase()));
        tokenizer
    }

    /// Tokenize `input` into a tree rooted at a synthetic tag that owns the
    /// document-level token list. End of input is not an error; malformed
    /// constructs the lexer cannot finish are.
    pub fn tokenize(&self, input: &str) -> Result<TagToken, TokenizeError> {
        let mut state = State {
            lexer: Lexer::new(input),
            pushback: None,
            depth: 0,
            void_tags: &self.void_tags,
        };

        let mut children = Vec::new();
        while let Some(raw) = state.next_raw()? {
            children.push(state.parse_token(raw)?);
        }

        Ok(TagToken {
            name: String::new(),
            attrs: Vec::new(),
            self_closing: false,
            children,
            end_raw: None,
            raw: String::new(),
            depth: 0,
        })
    }
}

struct State<'a> {
    lexer: Lexer<'a>,
    /// One-token lookahead buffer holding a pushed-back end tag.
    pushback: Option<RawLexToken>,
    depth: usize,
    void_tags: &'a HashSet<String>,
}

impl State<'_> {
    fn next_raw(&mut self) -> Result<Option<RawLexToken>, TokenizeError> {
        if let Some(buffered) = self.pushback.take() {
            return Ok(Some(buffered));
        }
        self.lexer.next_token()
    }

    fn parse_token(&mut self, raw: RawLexToken) -> Result<Token, TokenizeError> {
        match raw.kind {
            RawKind::Doctype => Ok(Token::Doctype(RawToken {
                raw: raw.raw,
                depth: self.depth,
            })),
            RawKind::Comment => Ok(Token::Comment(RawToken {
                raw: raw.raw,
                depth: self.depth,
            })),
            RawKind::Text => Ok(Token::Text(RawToken {
                raw: raw.raw,
                depth: self.depth,
            })),
            RawKind::StartTag {
                name,
                attrs,
                self_closing,
            } => self
                .parse_tag(name, attrs, self_closing, raw.raw)
                .map(Token::Tag),
            RawKind::EndTag { name } => Ok(Token::EndTag(EndTagToken {
                name,
                raw: raw.raw,
                depth: self.depth,
            })),
        }
    }

    fn parse_tag(
        &mut self,
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
        raw: String,
    ) -> Result<TagToken, TokenizeError> {
        let depth = self.depth;

        // Void elements and `<x/>` syntax take no children and never consume
        // an end tag, even a matching one immediately following.
        if self_closing || self.void_tags.contains(&name.to_ascii_lowercase()) {
            return Ok(TagToken {
                name,
                attrs,
                self_closing: true,
                children: Vec::new(),
                end_raw: None,
                raw,
                depth,
            });
        }

        self.depth += 1;

        let mut children = Vec::new();
        let mut end_raw = None;

        loop {
            let Some(next) = self.next_raw()? else {
                break;
            };

            if let RawKind::EndTag { name: ref end_name } = next.kind {
                if end_name.eq_ignore_ascii_case(&name) {
                    end_raw = Some(next.raw);
                } else {
                    // Mismatched end tag auto-closes this element; leave the
                    // token for an enclosing tag to claim.
                    self.pushback = Some(next);
                }
                break;
            }

            children.push(self.parse_token(next)?);
        }

        self.depth -= 1;

        Ok(TagToken {
            name,
            attrs,
            self_closing: false,
            children,
            end_raw,
            raw,
            depth,
        })
    }
}
