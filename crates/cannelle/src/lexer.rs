//! Lexer for the template language.
//!
//! Alternates between raw-text mode and code mode inside `{{ … }}` actions.
//! Trim markers (`{{-` and `-}}`) are resolved here: the lexer produces the
//! full token list with whitespace already stripped from the neighboring
//! text tokens, so the parser never sees them.

use miette::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
}

impl Token {
    fn new(kind: TokenKind, offset: usize, len: usize) -> Self {
        Self {
            kind,
            span: SourceSpan::new(offset.into(), len),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Raw text between actions.
    Text(String),

    Open,  // {{ or {{-
    Close, // }} or -}}

    // Keywords
    Define,
    End,
    If,
    Else,
    Range,

    // Terms
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Field path: `.a.b` → ["a", "b"]; bare `.` → [].
    Field(Vec<String>),

    Pipe,
    LParen,
    RParen,

    Eof,
    Error(String),
}

impl TokenKind {
    fn from_ident(s: &str) -> TokenKind {
        match s {
            "define" => TokenKind::Define,
            "end" => TokenKind::End,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "range" => TokenKind::Range,
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => TokenKind::Ident(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Trim {
    None,
    /// `{{-`: strip trailing whitespace from the preceding text.
    Before,
    /// `-}}`: strip leading whitespace from the following text.
    After,
}

/// Lex the whole source, trim markers already applied. Never fails; lexical
/// problems surface as `TokenKind::Error` for the parser to report with a
/// span.
pub(crate) fn lex(source: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        source,
        pos: 0,
        in_code: false,
    };

    let mut tokens: Vec<Token> = Vec::new();
    let mut trim_next_text = false;

    loop {
        let (mut token, trim) = lexer.next_token();

        if let TokenKind::Text(text) = &mut token.kind {
            if trim_next_text {
                *text = text.trim_start().to_string();
            }
            if text.is_empty() {
                continue;
            }
        }
        // Trimming only reaches the text immediately after the `-}}`.
        trim_next_text = false;

        match trim {
            Trim::Before => {
                if let Some(prev) = tokens.last_mut() {
                    if let TokenKind::Text(text) = &mut prev.kind {
                        text.truncate(text.trim_end().len());
                    }
                }
            }
            Trim::After => trim_next_text = true,
            Trim::None => {}
        }

        let eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if eof {
            break;
        }
    }
    tokens
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    in_code: bool,
}

impl Lexer<'_> {
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

    fn next_token(&mut self) -> (Token, Trim) {
        if self.in_code {
            self.lex_code()
        } else {
            self.lex_text()
        }
    }

    fn lex_text(&mut self) -> (Token, Trim) {
        let start = self.pos;

        if self.starts_with("{{") {
            self.pos += 2;
            self.in_code = true;
            // `{{-` is a trim marker only when followed by whitespace, so
            // negative numbers right after the delimiter still lex.
            if self.peek() == Some('-') && self.peek_at(1).is_some_and(|c| c.is_whitespace()) {
                self.pos += 1;
                return (Token::new(TokenKind::Open, start, 3), Trim::Before);
            }
            return (Token::new(TokenKind::Open, start, 2), Trim::None);
        }

        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '{' && self.starts_with("{{") {
                break;
            }
            text.push(self.advance().unwrap());
        }

        if text.is_empty() {
            (Token::new(TokenKind::Eof, start, 0), Trim::None)
        } else {
            (
                Token::new(TokenKind::Text(text), start, self.pos - start),
                Trim::None,
            )
        }
    }

    fn lex_code(&mut self) -> (Token, Trim) {
        self.skip_whitespace();
        let start = self.pos;

        if self.starts_with("-}}") {
            self.pos += 3;
            self.in_code = false;
            return (Token::new(TokenKind::Close, start, 3), Trim::After);
        }
        if self.starts_with("}}") {
            self.pos += 2;
            self.in_code = false;
            return (Token::new(TokenKind::Close, start, 2), Trim::None);
        }

        let token = match self.peek() {
            None => Token::new(TokenKind::Eof, start, 0),
            Some(c) => match c {
                '|' => {
                    self.advance();
                    Token::new(TokenKind::Pipe, start, 1)
                }
                '(' => {
                    self.advance();
                    Token::new(TokenKind::LParen, start, 1)
                }
                ')' => {
                    self.advance();
                    Token::new(TokenKind::RParen, start, 1)
                }
                '"' | '\'' => self.lex_string(c),
                '.' => self.lex_field(),
                '-' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
                '0'..='9' => self.lex_number(),
                c if c.is_alphabetic() || c == '_' => self.lex_ident(),
                _ => {
                    self.advance();
                    Token::new(
                        TokenKind::Error(format!("unexpected character '{c}'")),
                        start,
                        1,
                    )
                }
            },
        };
        (token, Trim::None)
    }

    fn lex_string(&mut self, quote: char) -> Token {
        let start = self.pos;
        self.advance();

        let mut value = String::new();
        loop {
            match self.advance() {
                None => {
                    return Token::new(
                        TokenKind::Error("unclosed string".to_string()),
                        start,
                        self.pos - start,
                    );
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some(c) if c == quote => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => break,
                },
                Some(c) => value.push(c),
            }
        }

        Token::new(TokenKind::Str(value), start, self.pos - start)
    }

    fn lex_field(&mut self) -> Token {
        let start = self.pos;
        self.advance(); // consume `.`

        let mut path = Vec::new();
        loop {
            let seg_start = self.pos;
            while let Some(c) = self.peek() {
                let field_char = c.is_alphanumeric() || c == '_' || c == '-';
                if !field_char || self.starts_with("-}}") {
                    break;
                }
                self.advance();
            }
            if self.pos == seg_start {
                break;
            }
            path.push(self.source[seg_start..self.pos].to_string());

            if self.peek() == Some('.')
                && self
                    .peek_at(1)
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
            {
                self.advance();
            } else {
                break;
            }
        }

        Token::new(TokenKind::Field(path), start, self.pos - start)
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !is_float && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) {
                is_float = true;
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.pos];
        let kind = if is_float {
            match text.parse::<f64>() {
                Ok(v) => TokenKind::Float(v),
                Err(_) => TokenKind::Error(format!("bad number '{text}'")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => TokenKind::Int(v),
                Err(_) => TokenKind::Error(format!("bad number '{text}'")),
            }
        };
        Token::new(kind, start, self.pos - start)
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        Token::new(
            TokenKind::from_ident(&self.source[start..self.pos]),
            start,
            self.pos - start,
        )
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

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_text_only() {
        assert_eq!(
            kinds("hello"),
            vec![TokenKind::Text("hello".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_simple_action() {
        assert_eq!(
            kinds("{{ render \"header\" }}"),
            vec![
                TokenKind::Open,
                TokenKind::Ident("render".to_string()),
                TokenKind::Str("header".to_string()),
                TokenKind::Close,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_field_path() {
        assert_eq!(
            kinds("{{ .page.title }}"),
            vec![
                TokenKind::Open,
                TokenKind::Field(vec!["page".to_string(), "title".to_string()]),
                TokenKind::Close,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bare_dot() {
        assert_eq!(
            kinds("{{ . }}"),
            vec![
                TokenKind::Open,
                TokenKind::Field(vec![]),
                TokenKind::Close,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_trim_markers() {
        assert_eq!(
            kinds("a  {{- if .x }} b {{ end -}}  c"),
            vec![
                TokenKind::Text("a".to_string()),
                TokenKind::Open,
                TokenKind::If,
                TokenKind::Field(vec!["x".to_string()]),
                TokenKind::Close,
                TokenKind::Text(" b ".to_string()),
                TokenKind::Open,
                TokenKind::End,
                TokenKind::Close,
                TokenKind::Text("c".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_pipeline_with_parens() {
        assert_eq!(
            kinds(r#"{{ macro_render "Card" "id" ("{}"|json_parse) }}"#),
            vec![
                TokenKind::Open,
                TokenKind::Ident("macro_render".to_string()),
                TokenKind::Str("Card".to_string()),
                TokenKind::Str("id".to_string()),
                TokenKind::LParen,
                TokenKind::Str("{}".to_string()),
                TokenKind::Pipe,
                TokenKind::Ident("json_parse".to_string()),
                TokenKind::RParen,
                TokenKind::Close,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"{{ "a\"b\\c" }}"#),
            vec![
                TokenKind::Open,
                TokenKind::Str(r#"a"b\c"#.to_string()),
                TokenKind::Close,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("{{ f 12 -3 4.5 }}"),
            vec![
                TokenKind::Open,
                TokenKind::Ident("f".to_string()),
                TokenKind::Int(12),
                TokenKind::Int(-3),
                TokenKind::Float(4.5),
                TokenKind::Close,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unclosed_string_is_error_token() {
        let kinds = kinds("{{ \"oops }}");
        assert!(matches!(&kinds[1], TokenKind::Error(_)));
    }
}
