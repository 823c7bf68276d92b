//! cannelle - a shared-namespace block template engine
//!
//! A small template language built for page rendering: named blocks live in
//! one flat namespace per engine instance, layouts are imported and cached,
//! includes re-render per call, and macros resolve dynamically at execution
//! time.
//!
//! # Syntax overview
//!
//! ```text
//! {{ .field.path }}                 - print a value from the render data
//! {{ define "name" }}…{{ end }}     - named block (last definition wins)
//! {{ if .cond }}…{{ else }}…{{ end }}
//! {{ range .items }}…{{ end }}      - `.` rebinds to each element
//! {{ render "name" }}               - execute a named block
//! {{ include "name" . }}            - import + render, uncached
//! {{ extends "base" }}              - import a layout (cached)
//! {{ "…" | json_parse }}            - pipelines; piped value is the last arg
//! {{- … -}}                         - trim whitespace around the action
//! ```
//!
//! # Example
//!
//! ```
//! use cannelle::{Engine, LoadKind, MapLoader};
//! use serde_json::json;
//!
//! let loader = MapLoader::new().insert(
//!     LoadKind::Layout,
//!     "base",
//!     r#"{{ define "layout" }}<body>{{ render "page_content" }}</body>{{ end }}"#,
//! );
//!
//! let engine = Engine::new("site", loader);
//! let html = engine
//!     .execute(
//!         "base",
//!         r#"{{ define "page_content" }}Hello, {{ .name }}!{{ end }}"#,
//!         json!({"name": "world"}),
//!     )
//!     .unwrap();
//! assert_eq!(html, "<body>Hello, world!</body>");
//! ```

mod ast;
mod engine;
mod error;
mod lexer;
mod loader;
mod parser;
mod value;

pub use engine::{Engine, FunctionError, TemplateFn};
pub use error::{EngineError, SyntaxError};
pub use loader::{FsLoader, LoadError, LoadKind, Loader, MapLoader};

// Re-exports for callers assembling render data and wiring cancellation.
pub use serde_json::Value;
pub use tokio_util::sync::CancellationToken;
