//! The page render entry point.
//!
//! One call per page: raw markup goes through macro preprocessing, the
//! template engine (with layout inheritance and the configured imports),
//! and canonical re-serialization. Every render builds a fresh engine and
//! preprocessor, so nothing — namespace, import cache, macro counter — is
//! shared between pages.

use std::sync::Arc;

use cannelle::{CancellationToken, Engine, FunctionError, LoadKind, Loader, Value};
use muscade_html::Tokenizer;
use serde_json::Map;
use tracing::debug_span;

use crate::error::RenderError;
use crate::lower::DefineLowering;
use crate::markdown::{CmarkRender, MarkdownRender};
use crate::postprocess::Postprocessor;
use crate::preprocess::Preprocessor;

pub struct PageRenderer {
    name: String,
    loader: Arc<dyn Loader>,
    markdown: Arc<dyn MarkdownRender>,
    extra_void: Vec<String>,
    always_close: Vec<String>,
    imports: Vec<String>,
    cancel: CancellationToken,
}

impl PageRenderer {
    pub fn new(name: impl Into<String>, loader: impl Loader + 'static) -> Self {
        Self {
            name: name.into(),
            loader: Arc::new(loader),
            markdown: Arc::new(CmarkRender::new()),
            extra_void: Vec::new(),
            always_close: Vec::new(),
            imports: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_markdown(mut self, markdown: impl MarkdownRender + 'static) -> Self {
        self.markdown = Arc::new(markdown);
        self
    }

    /// Extra tag names the tokenizer treats as void, for both the
    /// preprocessing and postprocessing passes.
    pub fn with_extra_void_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_void.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Tags treated as void but still closed on output.
    pub fn with_always_close_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_close.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Template names imported (cached) into every render before the page
    /// content is parsed — the place themes declare their macro libraries.
    pub fn with_imports<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Render one page. `layout` may be empty for layout-less pages;
    /// `is_markdown` converts the rendered `page_content` block through the
    /// Markdown renderer.
    pub fn render(
        &self,
        layout: &str,
        content: &str,
        data: Map<String, Value>,
        is_markdown: bool,
    ) -> Result<String, RenderError> {
        let _span = debug_span!("render_page", renderer = %self.name, layout).entered();

        let engine = self.build_engine(is_markdown, &data);

        for name in &self.imports {
            engine
                .import(LoadKind::Import, name, true)
                .map_err(|source| RenderError::Import {
                    name: name.clone(),
                    source,
                })?;
        }

        let mut preprocessor = Preprocessor::new(DefineLowering)
            .with_extra_void_tags(self.extra_void.iter().cloned())
            .with_always_close_tags(self.always_close.iter().cloned());
        let (extras, mut content) = preprocessor.preprocess(content)?;

        // Raw markup without block definitions becomes the page_content
        // block, so layouts can always render it by name.
        if !engine.has_blocks(&content)? {
            content = format!("{{{{- define \"page_content\" -}}}}{content}{{{{- end -}}}}");
        }

        let combined = format!("{extras}{content}");
        let executed = engine.execute(layout, &combined, Value::Object(data))?;

        Postprocessor::new(self.tokenizer())
            .postprocess(&executed)
            .map_err(RenderError::Postprocess)
    }

    fn tokenizer(&self) -> Tokenizer {
        Tokenizer::with_extra_void_tags(
            self.extra_void
                .iter()
                .chain(self.always_close.iter())
                .cloned(),
        )
    }

    fn build_engine(&self, is_markdown: bool, data: &Map<String, Value>) -> Engine {
        let page_markdown = Arc::clone(&self.markdown);
        let text_markdown = Arc::clone(&self.markdown);
        let include_data = Value::Object(data.clone());

        Engine::new(self.name.clone(), Arc::clone(&self.loader))
            .with_cancellation(self.cancel.clone())
            .with_function("page_content", move |engine, _args| {
                let rendered = engine.render("page_content")?;
                if is_markdown {
                    Ok(Value::String(page_markdown.render(&rendered)?))
                } else {
                    Ok(Value::String(rendered))
                }
            })
            .with_function("markdown", move |_engine, args| {
                let Some(Value::String(text)) = args.first() else {
                    return Err("markdown expects a string argument".into());
                };
                Ok(Value::String(text_markdown.render(text)?))
            })
            .with_function("includes", move |engine, args| {
                let Some(Value::Array(entries)) = args.first() else {
                    return Err("includes expects a list".into());
                };
                let mut out = String::new();
                for entry in entries {
                    out.push_str(&engine.include(include_name(entry)?, &include_data)?);
                }
                Ok(Value::String(out))
            })
    }
}

/// Include entries are either a plain name or an object carrying one.
fn include_name(entry: &Value) -> Result<&str, FunctionError> {
    match entry {
        Value::String(name) => Ok(name),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "include entry missing 'name'".into()),
        _ => Err("include entry must be a name or an object with 'name'".into()),
    }
}
