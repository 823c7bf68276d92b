//! Token tree produced by the tokenizer.
//!
//! Tokens own their children; there are no parent back-references. Ancestry
//! can be reconstructed with a traversal stack where a caller needs it.

/// A typed token with its raw source text.
///
/// `depth` counts enclosing tags: document-level tokens sit at depth 0,
/// children of a tag at depth d sit at depth d + 1.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Doctype(RawToken),
    Comment(RawToken),
    Text(RawToken),
    Tag(TagToken),
    EndTag(EndTagToken),
}

impl Token {
    /// Raw source text of this token (opening tag only for `Tag`).
    pub fn raw(&self) -> &str {
        match self {
            Token::Doctype(t) | Token::Comment(t) | Token::Text(t) => &t.raw,
            Token::Tag(t) => &t.raw,
            Token::EndTag(t) => &t.raw,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Token::Doctype(t) | Token::Comment(t) | Token::Text(t) => t.depth,
            Token::Tag(t) => t.depth,
            Token::EndTag(t) => t.depth,
        }
    }

    pub fn as_tag(&self) -> Option<&TagToken> {
        match self {
            Token::Tag(t) => Some(t),
            _ => None,
        }
    }
}

/// A leaf token: doctype, comment, or text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub raw: String,
    pub depth: usize,
}

/// A start tag together with the subtree it encloses.
#[derive(Debug, Clone, PartialEq)]
pub struct TagToken {
    /// Tag name as written in the source. Matching against end tags and the
    /// void set is ASCII-case-insensitive; the original casing is preserved
    /// because capitalized names carry meaning downstream.
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
    pub children: Vec<Token>,
    /// Raw text of the consumed matching end tag, if one was consumed.
    pub end_raw: Option<String>,
    /// Raw text of the opening tag.
    pub raw: String,
    pub depth: usize,
}

impl TagToken {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A standalone end tag that closed nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct EndTagToken {
    pub name: String,
    pub raw: String,
    pub depth: usize,
}
