//! Macro lowering strategy.
//!
//! The preprocessor hands every macro invocation to a [`MacroLowering`],
//! which decides what the hoisted definition and the inline call site look
//! like. The default strategy targets the template engine: the macro's
//! inner markup becomes a block definition keyed by the unique id, and the
//! call site becomes a `macro_render` invocation carrying the attributes as
//! a JSON payload.

use serde_json::{Map, Value};

pub type LowerError = Box<dyn std::error::Error + Send + Sync>;

/// Byte sequences bracketing the hoisted inner markup (`before`/`after`)
/// and replacing the call site in the document flow (`call`).
#[derive(Debug, Clone, PartialEq)]
pub struct Lowered {
    pub before: String,
    pub after: String,
    pub call: String,
}

pub trait MacroLowering {
    fn lower(
        &self,
        name: &str,
        unique: &str,
        attrs: &Map<String, Value>,
    ) -> Result<Lowered, LowerError>;
}

/// The standard lowering: a `define` wrapper plus a `macro_render` call.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefineLowering;

impl MacroLowering for DefineLowering {
    fn lower(
        &self,
        name: &str,
        unique: &str,
        attrs: &Map<String, Value>,
    ) -> Result<Lowered, LowerError> {
        let attrs_json = serde_json::to_string(attrs)?;

        Ok(Lowered {
            before: format!("{{{{- define {} }}}}", quote(unique)),
            after: "{{ end -}}".to_string(),
            call: format!(
                "{{{{ macro_render {} {} ({}|json_parse) }}}}",
                quote(name),
                quote(unique),
                quote(&attrs_json),
            ),
        })
    }
}

/// Quote as a template string literal, matching the engine lexer's escapes.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_define_lowering_shape() {
        let mut attrs = Map::new();
        attrs.insert("title".to_string(), json!("Intro"));

        let lowered = DefineLowering
            .lower("Card", "Content__Macro__Card__1", &attrs)
            .unwrap();

        assert_eq!(lowered.before, r#"{{- define "Content__Macro__Card__1" }}"#);
        assert_eq!(lowered.after, "{{ end -}}");
        assert_eq!(
            lowered.call,
            r#"{{ macro_render "Card" "Content__Macro__Card__1" ("{\"title\":\"Intro\"}"|json_parse) }}"#
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(quote("line\nbreak"), r#""line\nbreak""#);
    }
}
