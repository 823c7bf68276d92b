//! muscade - page rendering core
//!
//! Renders a single page's raw markup — HTML mixed with capitalized
//! component tags and a block template language — into final, canonical
//! HTML. Four stages, leaf-first:
//!
//! 1. tokenize (via `muscade-html`)
//! 2. lower macro tags into hoisted block definitions + call sites
//! 3. execute through the template engine (via `cannelle`): layout
//!    inheritance, cached imports, includes, dynamic macro resolution
//! 4. re-serialize into canonical HTML
//!
//! # Example
//!
//! ```
//! use cannelle::{LoadKind, MapLoader};
//! use muscade::PageRenderer;
//! use serde_json::Map;
//!
//! let loader = MapLoader::new()
//!     .insert(
//!         LoadKind::Layout,
//!         "base",
//!         r#"{{ define "layout" }}<main>{{ page_content }}</main>{{ end }}"#,
//!     );
//!
//! let renderer = PageRenderer::new("site", loader);
//! let html = renderer
//!     .render("base", "<p>hello</p>", Map::new(), false)
//!     .unwrap();
//! assert_eq!(html, "<main><p>hello</p></main>");
//! ```

mod error;
mod lower;
mod markdown;
mod page;
mod postprocess;
mod preprocess;

pub use error::{PreprocessError, RenderError};
pub use lower::{DefineLowering, LowerError, Lowered, MacroLowering};
pub use markdown::{CmarkRender, MarkdownError, MarkdownRender};
pub use page::PageRenderer;
pub use postprocess::{BOOLEAN_ATTRIBUTES, Postprocessor};
pub use preprocess::Preprocessor;
