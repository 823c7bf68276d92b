//! Recursive-descent parser for the template language.
//!
//! Produces the top-level body plus the map of `define`d blocks. Defining a
//! name twice keeps the later definition; the engine merges these maps into
//! its namespace with the same overwrite rule.

use std::collections::HashMap;

use miette::{NamedSource, SourceSpan};

use crate::ast::{Command, Node, Pipeline, Term};
use crate::error::SyntaxError;
use crate::lexer::{self, Token, TokenKind};

#[derive(Debug)]
pub(crate) struct Parsed {
    pub body: Vec<Node>,
    pub blocks: HashMap<String, Vec<Node>>,
}

pub(crate) fn parse(name: &str, source: &str) -> Result<Parsed, SyntaxError> {
    let tokens = lexer::lex(source);
    let mut parser = Parser {
        name,
        source,
        tokens,
        pos: 0,
        blocks: HashMap::new(),
    };

    let (body, terminator) = parser.parse_body()?;
    match terminator {
        Terminator::Eof => Ok(Parsed {
            body,
            blocks: parser.blocks,
        }),
        Terminator::End => Err(parser.error_at_previous("an open action", "{{ end }}")),
        Terminator::Else => Err(parser.error_at_previous("an open action", "{{ else }}")),
    }
}

/// How a body stopped parsing.
enum Terminator {
    Eof,
    End,
    Else,
}

struct Parser<'a> {
    name: &'a str,
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    blocks: HashMap<String, Vec<Node>>,
}

impl Parser<'_> {
    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error(&self, expected: &str, token: &Token) -> SyntaxError {
        SyntaxError {
            expected: expected.to_string(),
            found: describe(&token.kind),
            span: token.span,
            src: NamedSource::new(self.name, self.source.to_string()),
        }
    }

    fn error_at_previous(&self, expected: &str, found: &str) -> SyntaxError {
        let span = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span)
            .unwrap_or_else(|| SourceSpan::new(0.into(), 0));
        SyntaxError {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
            src: NamedSource::new(self.name, self.source.to_string()),
        }
    }

    fn expect_close(&mut self) -> Result<(), SyntaxError> {
        match &self.current().kind {
            TokenKind::Close => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error("}}", self.current())),
        }
    }

    /// Parse nodes until `{{ end }}`, `{{ else }}`, or end of input.
    fn parse_body(&mut self) -> Result<(Vec<Node>, Terminator), SyntaxError> {
        let mut nodes = Vec::new();

        loop {
            match &self.current().kind {
                TokenKind::Eof => return Ok((nodes, Terminator::Eof)),
                TokenKind::Text(text) => {
                    let text = text.clone();
                    self.advance();
                    nodes.push(Node::Text(text));
                }
                TokenKind::Open => {
                    self.advance();
                    match &self.current().kind {
                        TokenKind::End => {
                            self.advance();
                            self.expect_close()?;
                            return Ok((nodes, Terminator::End));
                        }
                        TokenKind::Else => {
                            self.advance();
                            self.expect_close()?;
                            return Ok((nodes, Terminator::Else));
                        }
                        TokenKind::Define => {
                            self.advance();
                            self.parse_define()?;
                        }
                        TokenKind::If => {
                            self.advance();
                            nodes.push(self.parse_if()?);
                        }
                        TokenKind::Range => {
                            self.advance();
                            nodes.push(self.parse_range()?);
                        }
                        _ => {
                            let pipe = self.parse_pipeline()?;
                            self.expect_close()?;
                            nodes.push(Node::Print(pipe));
                        }
                    }
                }
                _ => return Err(self.error("text or {{", self.current())),
            }
        }
    }

    fn parse_define(&mut self) -> Result<(), SyntaxError> {
        let name = match &self.current().kind {
            TokenKind::Str(name) => name.clone(),
            _ => return Err(self.error("a quoted block name", self.current())),
        };
        self.advance();
        self.expect_close()?;

        let (body, terminator) = self.parse_body()?;
        match terminator {
            Terminator::End => {
                // Last definition wins, matching the engine's namespace rule.
                self.blocks.insert(name, body);
                Ok(())
            }
            _ => Err(self.error_at_previous("{{ end }} closing the define", "end of input")),
        }
    }

    fn parse_if(&mut self) -> Result<Node, SyntaxError> {
        let cond = self.parse_pipeline()?;
        self.expect_close()?;

        let (then_body, terminator) = self.parse_body()?;
        let else_body = match terminator {
            Terminator::End => Vec::new(),
            Terminator::Else => {
                let (else_body, terminator) = self.parse_body()?;
                match terminator {
                    Terminator::End => else_body,
                    _ => {
                        return Err(
                            self.error_at_previous("{{ end }} closing the if", "end of input")
                        );
                    }
                }
            }
            Terminator::Eof => {
                return Err(self.error_at_previous("{{ end }} closing the if", "end of input"));
            }
        };

        Ok(Node::If {
            cond,
            then_body,
            else_body,
        })
    }

    fn parse_range(&mut self) -> Result<Node, SyntaxError> {
        let over = self.parse_pipeline()?;
        self.expect_close()?;

        let (body, terminator) = self.parse_body()?;
        let else_body = match terminator {
            Terminator::End => Vec::new(),
            Terminator::Else => {
                let (else_body, terminator) = self.parse_body()?;
                match terminator {
                    Terminator::End => else_body,
                    _ => {
                        return Err(
                            self.error_at_previous("{{ end }} closing the range", "end of input")
                        );
                    }
                }
            }
            Terminator::Eof => {
                return Err(self.error_at_previous("{{ end }} closing the range", "end of input"));
            }
        };

        Ok(Node::Range {
            over,
            body,
            else_body,
        })
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline, SyntaxError> {
        let mut cmds = vec![self.parse_command()?];

        while self.current().kind == TokenKind::Pipe {
            self.advance();
            cmds.push(self.parse_command()?);
        }

        Ok(Pipeline { cmds })
    }

    fn parse_command(&mut self) -> Result<Command, SyntaxError> {
        let head = self.parse_term()?;

        let mut args = Vec::new();
        while self.term_ahead() {
            args.push(self.parse_term()?);
        }

        if !args.is_empty() && !matches!(head, Term::Func(_)) {
            return Err(self.error_at_previous(
                "a function name before arguments",
                "a literal or field path",
            ));
        }

        Ok(Command { head, args })
    }

    fn term_ahead(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Ident(_)
                | TokenKind::Str(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Bool(_)
                | TokenKind::Field(_)
                | TokenKind::LParen
        )
    }

    fn parse_term(&mut self) -> Result<Term, SyntaxError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Str(value) => {
                self.advance();
                Ok(Term::Literal(serde_json::Value::String(value)))
            }
            TokenKind::Int(value) => {
                self.advance();
                Ok(Term::Literal(serde_json::Value::from(value)))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Term::Literal(serde_json::Value::from(value)))
            }
            TokenKind::Bool(value) => {
                self.advance();
                Ok(Term::Literal(serde_json::Value::Bool(value)))
            }
            TokenKind::Field(path) => {
                self.advance();
                Ok(Term::Path(path))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Term::Func(name))
            }
            TokenKind::LParen => {
                self.advance();
                let pipe = self.parse_pipeline()?;
                match self.current().kind {
                    TokenKind::RParen => {
                        self.advance();
                        Ok(Term::Paren(Box::new(pipe)))
                    }
                    _ => Err(self.error(")", self.current())),
                }
            }
            TokenKind::Error(ref message) => Err(SyntaxError {
                expected: "a valid token".to_string(),
                found: message.clone(),
                span: token.span,
                src: NamedSource::new(self.name, self.source.to_string()),
            }),
            _ => Err(self.error("a term", &token)),
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Text(_) => "text".to_string(),
        TokenKind::Open => "{{".to_string(),
        TokenKind::Close => "}}".to_string(),
        TokenKind::Define => "define".to_string(),
        TokenKind::End => "end".to_string(),
        TokenKind::If => "if".to_string(),
        TokenKind::Else => "else".to_string(),
        TokenKind::Range => "range".to_string(),
        TokenKind::Ident(name) => format!("identifier '{name}'"),
        TokenKind::Str(_) => "string literal".to_string(),
        TokenKind::Int(_) | TokenKind::Float(_) => "number".to_string(),
        TokenKind::Bool(_) => "boolean".to_string(),
        TokenKind::Field(_) => "field path".to_string(),
        TokenKind::Pipe => "|".to_string(),
        TokenKind::LParen => "(".to_string(),
        TokenKind::RParen => ")".to_string(),
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::Error(message) => message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text() {
        let parsed = parse("test", "Hello, world!").unwrap();
        assert_eq!(parsed.body, vec![Node::Text("Hello, world!".to_string())]);
        assert!(parsed.blocks.is_empty());
    }

    #[test]
    fn test_parse_print() {
        let parsed = parse("test", "{{ .title }}").unwrap();
        assert_eq!(parsed.body.len(), 1);
        assert!(matches!(&parsed.body[0], Node::Print(_)));
    }

    #[test]
    fn test_parse_define_lifts_block() {
        let parsed = parse("test", r#"before {{ define "header" }}<h1>{{ .t }}</h1>{{ end }}after"#)
            .unwrap();
        assert_eq!(
            parsed.body,
            vec![
                Node::Text("before ".to_string()),
                Node::Text("after".to_string()),
            ]
        );
        assert!(parsed.blocks.contains_key("header"));
        assert_eq!(parsed.blocks["header"].len(), 3);
    }

    #[test]
    fn test_parse_define_twice_keeps_last() {
        let parsed = parse(
            "test",
            r#"{{ define "x" }}one{{ end }}{{ define "x" }}two{{ end }}"#,
        )
        .unwrap();
        assert_eq!(parsed.blocks["x"], vec![Node::Text("two".to_string())]);
    }

    #[test]
    fn test_parse_if_else() {
        let parsed = parse("test", "{{ if .ok }}yes{{ else }}no{{ end }}").unwrap();
        let Node::If {
            then_body,
            else_body,
            ..
        } = &parsed.body[0]
        else {
            panic!("expected if node");
        };
        assert_eq!(then_body, &vec![Node::Text("yes".to_string())]);
        assert_eq!(else_body, &vec![Node::Text("no".to_string())]);
    }

    #[test]
    fn test_parse_range() {
        let parsed = parse("test", "{{ range .items }}{{ . }}{{ end }}").unwrap();
        assert!(matches!(&parsed.body[0], Node::Range { .. }));
    }

    #[test]
    fn test_parse_pipeline() {
        let parsed = parse("test", r#"{{ "{}" | json_parse }}"#).unwrap();
        let Node::Print(pipe) = &parsed.body[0] else {
            panic!("expected print node");
        };
        assert_eq!(pipe.cmds.len(), 2);
        assert!(matches!(&pipe.cmds[0].head, Term::Literal(_)));
        assert!(matches!(&pipe.cmds[1].head, Term::Func(name) if name == "json_parse"));
    }

    #[test]
    fn test_parse_call_with_paren_arg() {
        let parsed =
            parse("test", r#"{{ macro_render "Card" "id" ("{}"|json_parse) }}"#).unwrap();
        let Node::Print(pipe) = &parsed.body[0] else {
            panic!("expected print node");
        };
        let cmd = &pipe.cmds[0];
        assert!(matches!(&cmd.head, Term::Func(name) if name == "macro_render"));
        assert_eq!(cmd.args.len(), 3);
        assert!(matches!(&cmd.args[2], Term::Paren(_)));
    }

    #[test]
    fn test_unclosed_define_errors() {
        let err = parse("test", r#"{{ define "x" }}body"#).unwrap_err();
        assert!(err.expected.contains("end"));
    }

    #[test]
    fn test_stray_end_errors() {
        assert!(parse("test", "{{ end }}").is_err());
    }

    #[test]
    fn test_args_after_literal_errors() {
        assert!(parse("test", r#"{{ "a" "b" }}"#).is_err());
    }
}
