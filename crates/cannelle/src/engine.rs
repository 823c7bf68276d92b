//! The template engine.
//!
//! One engine instance holds one shared namespace: every parse call merges
//! block definitions into a single flat map, and parsing a name twice keeps
//! the later definition. That overwrite rule is load-bearing — page content
//! overrides layout defaults by being parsed after the layout — so blocks
//! are deliberately not lexically scoped.
//!
//! An engine is built per render and holds interior mutable state
//! (namespace, import cache, current data); it is not meant to be shared
//! across concurrent renders.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::ast::{Command, Node, Pipeline, Term};
use crate::error::{EngineError, SyntaxError};
use crate::loader::{LoadKind, Loader};
use crate::parser;
use crate::value::{display, is_truthy, lookup};

/// Error type for caller-registered template functions.
pub type FunctionError = Box<dyn std::error::Error + Send + Sync>;

/// A caller-registered template function. Receives the engine (so it can
/// render blocks or include templates) and the evaluated arguments.
pub type TemplateFn = Box<dyn Fn(&Engine, &[Value]) -> Result<Value, FunctionError>>;

pub struct Engine {
    name: String,
    loader: Box<dyn Loader>,
    cancel: CancellationToken,
    namespace: RefCell<HashMap<String, Vec<Node>>>,
    imported: RefCell<HashSet<String>>,
    data: RefCell<Value>,
    extra: HashMap<String, TemplateFn>,
}

impl Engine {
    pub fn new(name: impl Into<String>, loader: impl Loader + 'static) -> Self {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            cancel: CancellationToken::new(),
            namespace: RefCell::new(HashMap::new()),
            imported: RefCell::new(HashSet::new()),
            data: RefCell::new(Value::Null),
            extra: HashMap::new(),
        }
    }

    /// Register an extra template-visible function. Registrations override
    /// same-named builtins, matching the order they would have been added.
    pub fn with_function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Engine, &[Value]) -> Result<Value, FunctionError> + 'static,
    {
        self.extra.insert(name.into(), Box::new(f));
        self
    }

    /// Cancellation is checked at the loader boundary, between imports.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether `content` defines any named block beyond the implicit
    /// top-level body. Parses into a throwaway namespace.
    pub fn has_blocks(&self, content: &str) -> Result<bool, EngineError> {
        let parsed = self.parse(&self.name, content)?;
        Ok(!parsed.blocks.is_empty())
    }

    /// Render `content` into `layout` (no layout when empty) against `data`.
    ///
    /// The layout is imported (cached) first, then `content` is parsed into
    /// the same namespace so its block definitions win. Output is the
    /// top-level body of `content` followed by the layout's `"layout"`
    /// block, when a layout was given.
    pub fn execute(&self, layout: &str, content: &str, data: Value) -> Result<String, EngineError> {
        debug!(engine = %self.name, layout, "execute template");

        *self.data.borrow_mut() = data;

        let mut out = String::new();

        if !layout.is_empty() {
            self.import(LoadKind::Layout, layout, true)
                .map_err(|source| EngineError::Layout {
                    name: layout.to_string(),
                    source: Box::new(source),
                })?;
        }

        let body = self.parse_and_register(&self.name, content)?;
        let data = self.data.borrow().clone();
        self.exec_nodes(&body, &data, &mut out)?;

        if !layout.is_empty() {
            let rendered = self
                .render("layout")
                .map_err(|source| EngineError::Layout {
                    name: layout.to_string(),
                    source: Box::new(source),
                })?;
            out.push_str(&rendered);
        }

        Ok(out)
    }

    /// Render a named block against the last-set data.
    pub fn render(&self, name: &str) -> Result<String, EngineError> {
        let data = self.data.borrow().clone();
        self.render_block(name, &data)
    }

    /// Render a named block against explicit data.
    pub fn render_block(&self, name: &str, data: &Value) -> Result<String, EngineError> {
        let nodes = self
            .namespace
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::BlockNotDefined(name.to_string()))?;

        let mut out = String::new();
        self.exec_nodes(&nodes, data, &mut out)?;
        Ok(out)
    }

    /// Load and parse a template source into the namespace. Produces no
    /// output of its own; the return value is always empty. With caching, a
    /// `(kind, name)` already imported by this engine is skipped entirely —
    /// layouts and declared imports parse once per render.
    pub fn import(
        &self,
        kind: LoadKind,
        name: &str,
        with_cache: bool,
    ) -> Result<String, EngineError> {
        let key = format!("{kind}::{name}");

        if with_cache && self.imported.borrow().contains(&key) {
            trace!(%kind, name, "import cache hit");
            return Ok(String::new());
        }

        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        trace!(%kind, name, "import template");

        let content = self
            .loader
            .load(kind, name)
            .map_err(|source| EngineError::Load {
                kind,
                name: name.to_string(),
                source,
            })?;

        self.parse_and_register(name, &content)?;

        if with_cache {
            self.imported.borrow_mut().insert(key);
        }

        Ok(String::new())
    }

    /// Import (uncached) and render the block of the same name. Includes are
    /// never cached so repeated includes with different data re-render.
    pub fn include(&self, name: &str, data: &Value) -> Result<String, EngineError> {
        self.import(LoadKind::Include, name, false)
            .map_err(|source| EngineError::Include {
                name: name.to_string(),
                source: Box::new(source),
            })?;

        self.render_block(name, data)
            .map_err(|source| EngineError::Include {
                name: name.to_string(),
                source: Box::new(source),
            })
    }

    fn parse(&self, source_name: &str, content: &str) -> Result<parser::Parsed, EngineError> {
        parser::parse(source_name, content).map_err(|source: SyntaxError| EngineError::Parse {
            name: source_name.to_string(),
            source: Box::new(source),
        })
    }

    /// Parse and merge the source's blocks into the namespace (overwrite),
    /// returning its top-level body.
    fn parse_and_register(
        &self,
        source_name: &str,
        content: &str,
    ) -> Result<Vec<Node>, EngineError> {
        let parsed = self.parse(source_name, content)?;
        let mut namespace = self.namespace.borrow_mut();
        for (name, body) in parsed.blocks {
            namespace.insert(name, body);
        }
        Ok(parsed.body)
    }

    // --- execution ---

    fn exec_nodes(&self, nodes: &[Node], data: &Value, out: &mut String) -> Result<(), EngineError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Print(pipe) => {
                    let value = self.eval_pipeline(pipe, data)?;
                    out.push_str(&display(&value));
                }
                Node::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    let branch = if is_truthy(&self.eval_pipeline(cond, data)?) {
                        then_body
                    } else {
                        else_body
                    };
                    self.exec_nodes(branch, data, out)?;
                }
                Node::Range {
                    over,
                    body,
                    else_body,
                } => {
                    let value = self.eval_pipeline(over, data)?;
                    let items: Vec<Value> = match value {
                        Value::Array(items) => items,
                        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
                        Value::Null => Vec::new(),
                        other => {
                            return Err(EngineError::Eval(format!(
                                "range over non-sequence value {}",
                                display(&other)
                            )));
                        }
                    };

                    if items.is_empty() {
                        self.exec_nodes(else_body, data, out)?;
                    } else {
                        for item in &items {
                            self.exec_nodes(body, item, out)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn eval_pipeline(&self, pipe: &Pipeline, data: &Value) -> Result<Value, EngineError> {
        let mut piped: Option<Value> = None;
        for cmd in &pipe.cmds {
            piped = Some(self.eval_command(cmd, data, piped)?);
        }
        Ok(piped.unwrap_or(Value::Null))
    }

    fn eval_command(
        &self,
        cmd: &Command,
        data: &Value,
        piped: Option<Value>,
    ) -> Result<Value, EngineError> {
        match &cmd.head {
            Term::Func(name) => {
                let mut args = Vec::with_capacity(cmd.args.len() + 1);
                for arg in &cmd.args {
                    args.push(self.eval_term(arg, data)?);
                }
                if let Some(piped) = piped {
                    args.push(piped);
                }
                self.call_function(name, args)
            }
            head => {
                if piped.is_some() {
                    return Err(EngineError::Eval(
                        "cannot pipe into a literal or field path".to_string(),
                    ));
                }
                self.eval_term(head, data)
            }
        }
    }

    fn eval_term(&self, term: &Term, data: &Value) -> Result<Value, EngineError> {
        match term {
            Term::Literal(value) => Ok(value.clone()),
            Term::Path(path) => Ok(lookup(data, path)),
            Term::Func(name) => self.call_function(name, Vec::new()),
            Term::Paren(pipe) => self.eval_pipeline(pipe, data),
        }
    }

    fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, EngineError> {
        if let Some(f) = self.extra.get(name) {
            return f(self, &args).map_err(|source| EngineError::Function {
                name: name.to_string(),
                source,
            });
        }

        match name {
            "dict" => dict(args),
            "json_parse" => {
                let text = str_arg(&args, 0, "json_parse")?;
                Ok(serde_json::from_str(text)?)
            }
            "has_prefix" => {
                let s = str_arg(&args, 0, "has_prefix")?;
                let prefix = str_arg(&args, 1, "has_prefix")?;
                Ok(Value::Bool(s.starts_with(prefix)))
            }
            "has_suffix" => {
                let s = str_arg(&args, 0, "has_suffix")?;
                let suffix = str_arg(&args, 1, "has_suffix")?;
                Ok(Value::Bool(s.ends_with(suffix)))
            }
            "extends" => {
                let name = str_arg(&args, 0, "extends")?;
                self.import(LoadKind::Layout, name, true)?;
                Ok(Value::String(String::new()))
            }
            "import" => {
                let name = str_arg(&args, 0, "import")?;
                self.import(LoadKind::Import, name, true)?;
                Ok(Value::String(String::new()))
            }
            "include" => {
                let name = str_arg(&args, 0, "include")?.to_string();
                let data = args.get(1).cloned().unwrap_or(Value::Null);
                Ok(Value::String(self.include(&name, &data)?))
            }
            "render" => {
                let name = str_arg(&args, 0, "render")?;
                Ok(Value::String(self.render(name)?))
            }
            "macro_render" => self.macro_render(args),
            _ => Err(EngineError::UnknownFunction(name.to_string())),
        }
    }

    /// Resolution point for preprocessor call sites: render the hoisted
    /// inner content at `unique`, expose it as `content` in the data, then
    /// render the theme-declared implementation block `macro:<name>`.
    fn macro_render(&self, args: Vec<Value>) -> Result<Value, EngineError> {
        let name = str_arg(&args, 0, "macro_render")?.to_string();
        let unique = str_arg(&args, 1, "macro_render")?.to_string();

        let wrap = |source: EngineError| EngineError::Macro {
            name: name.clone(),
            unique: unique.clone(),
            source: Box::new(source),
        };

        let content = self.render(&unique).map_err(&wrap)?;

        let mut data = match args.get(2) {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(other) => {
                return Err(EngineError::Eval(format!(
                    "macro_render data must be a map, got {}",
                    display(other)
                )));
            }
        };
        data.insert("content".to_string(), Value::String(content));

        let out = self
            .render_block(&format!("macro:{name}"), &Value::Object(data))
            .map_err(&wrap)?;
        Ok(Value::String(out))
    }
}

fn dict(args: Vec<Value>) -> Result<Value, EngineError> {
    if args.len() % 2 != 0 {
        return Err(EngineError::DictOddArgs(args.len()));
    }

    let mut map = Map::with_capacity(args.len() / 2);
    let mut iter = args.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        let Value::String(key) = key else {
            return Err(EngineError::DictKeyNotString);
        };
        map.insert(key, value);
    }
    Ok(Value::Object(map))
}

fn str_arg<'a>(args: &'a [Value], index: usize, func: &str) -> Result<&'a str, EngineError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(EngineError::Eval(format!(
            "{func}: argument {index} must be a string, got {}",
            display(other)
        ))),
        None => Err(EngineError::Eval(format!(
            "{func}: missing argument {index}"
        ))),
    }
}
