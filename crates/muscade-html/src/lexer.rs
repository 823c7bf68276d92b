//! Raw HTML lexer.
//!
//! Produces a flat stream of raw tokens over a byte-position cursor. The
//! lexer is tolerant of real-world markup: unquoted and valueless
//! attributes, stray `<` in text, uppercase tag names. Structure (nesting,
//! void elements) is the tree builder's job.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TokenizeError {
    #[error("unterminated comment starting at byte {pos}")]
    UnterminatedComment { pos: usize },
    #[error("unterminated markup declaration starting at byte {pos}")]
    UnterminatedDeclaration { pos: usize },
    #[error("unterminated tag starting at byte {pos}")]
    UnterminatedTag { pos: usize },
    #[error("unterminated attribute value in tag starting at byte {pos}")]
    UnterminatedAttribute { pos: usize },
}

/// A flat token straight off the input, before tree building.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawLexToken {
    pub kind: RawKind,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawKind {
    Doctype,
    Comment,
    Text,
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
}

pub(crate) struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.source[self.pos..].starts_with(pat)
    }

    /// Next raw token, or `None` at clean end of input.
    pub fn next_token(&mut self) -> Result<Option<RawLexToken>, TokenizeError> {
        if self.pos >= self.source.len() {
            return Ok(None);
        }

        if self.starts_with("<!--") {
            return self.lex_comment().map(Some);
        }
        if self.starts_with("<!") {
            return self.lex_declaration().map(Some);
        }
        if self.starts_with("</") {
            return self.lex_end_tag().map(Some);
        }
        if self.peek() == Some('<') && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
            return self.lex_start_tag().map(Some);
        }

        self.lex_text().map(Some)
    }

    /// Text runs until the next construct that could open a tag. A `<` not
    /// followed by `!`, `/`, or an ASCII letter is plain text.
    fn lex_text(&mut self) -> Result<RawLexToken, TokenizeError> {
        let start = self.pos;

        // Always consume at least one char so a leading stray `<` makes progress.
        self.advance();

        while let Some(c) = self.peek() {
            if c == '<'
                && self
                    .peek_at(1)
                    .is_some_and(|n| n == '!' || n == '/' || n.is_ascii_alphabetic())
            {
                break;
            }
            self.advance();
        }

        Ok(RawLexToken {
            kind: RawKind::Text,
            raw: self.source[start..self.pos].to_string(),
        })
    }

    fn lex_comment(&mut self) -> Result<RawLexToken, TokenizeError> {
        let start = self.pos;
        self.pos += 4; // <!--

        match self.source[self.pos..].find("-->") {
            Some(rel) => {
                self.pos += rel + 3;
                Ok(RawLexToken {
                    kind: RawKind::Comment,
                    raw: self.source[start..self.pos].to_string(),
                })
            }
            None => Err(TokenizeError::UnterminatedComment { pos: start }),
        }
    }

    /// `<!DOCTYPE …>` and any other markup declaration.
    fn lex_declaration(&mut self) -> Result<RawLexToken, TokenizeError> {
        let start = self.pos;
        self.pos += 2; // <!

        match self.source[self.pos..].find('>') {
            Some(rel) => {
                self.pos += rel + 1;
                Ok(RawLexToken {
                    kind: RawKind::Doctype,
                    raw: self.source[start..self.pos].to_string(),
                })
            }
            None => Err(TokenizeError::UnterminatedDeclaration { pos: start }),
        }
    }

    fn lex_end_tag(&mut self) -> Result<RawLexToken, TokenizeError> {
        let start = self.pos;
        self.pos += 2; // </

        let name = self.lex_name();

        loop {
            match self.advance() {
                Some('>') => break,
                Some(_) => {}
                None => return Err(TokenizeError::UnterminatedTag { pos: start }),
            }
        }

        Ok(RawLexToken {
            kind: RawKind::EndTag { name },
            raw: self.source[start..self.pos].to_string(),
        })
    }

    fn lex_start_tag(&mut self) -> Result<RawLexToken, TokenizeError> {
        let start = self.pos;
        self.pos += 1; // <

        let name = self.lex_name();
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();

            match self.peek() {
                None => return Err(TokenizeError::UnterminatedTag { pos: start }),
                Some('>') => {
                    self.advance();
                    break;
                }
                Some('/') => {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        self_closing = true;
                        break;
                    }
                    // Stray slash inside a tag; keep scanning.
                }
                Some(_) => {
                    let attr = self.lex_attribute(start)?;
                    attrs.push(attr);
                }
            }
        }

        Ok(RawLexToken {
            kind: RawKind::StartTag {
                name,
                attrs,
                self_closing,
            },
            raw: self.source[start..self.pos].to_string(),
        })
    }

    fn lex_attribute(&mut self, tag_start: usize) -> Result<(String, String), TokenizeError> {
        let key_start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '=' || c == '>' || c == '/' {
                break;
            }
            self.advance();
        }
        let key = self.source[key_start..self.pos].to_string();

        self.skip_whitespace();
        if self.peek() != Some('=') {
            // Valueless attribute.
            return Ok((key, String::new()));
        }
        self.advance();
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.advance();
                let value_start = self.pos;
                loop {
                    match self.peek() {
                        Some(c) if c == quote => break,
                        Some(_) => {
                            self.advance();
                        }
                        None => {
                            return Err(TokenizeError::UnterminatedAttribute { pos: tag_start });
                        }
                    }
                }
                let value = self.source[value_start..self.pos].to_string();
                self.advance(); // closing quote
                value
            }
            _ => {
                let value_start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' {
                        break;
                    }
                    self.advance();
                }
                self.source[value_start..self.pos].to_string()
            }
        };

        Ok((key, value))
    }

    fn lex_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance();
            } else {
                break;
            }
        }
        self.source[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }
}
