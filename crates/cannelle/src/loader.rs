//! Template source loading.
//!
//! The engine resolves `(kind, name)` pairs through a [`Loader`]; how names
//! map onto storage is the caller's concern. [`FsLoader`] implements the
//! standard layout: an ordered search path per kind, first hit wins, with a
//! configurable extension list.

use std::collections::HashMap;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// What a template source is being loaded for. Layouts and imports are
/// cached by the engine; includes are re-rendered per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKind {
    Layout,
    Import,
    Include,
}

impl fmt::Display for LoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadKind::Layout => "layout",
            LoadKind::Import => "import",
            LoadKind::Include => "include",
        })
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("load kind not registered: {0}")]
    KindNotFound(LoadKind),

    #[error("template not found: {kind} '{name}'")]
    NotFound { kind: LoadKind, name: String },

    #[error("read {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait Loader {
    fn load(&self, kind: LoadKind, name: &str) -> Result<String, LoadError>;
}

// Shared loaders: one loader can feed many per-render engines.
impl<L: Loader + ?Sized> Loader for std::sync::Arc<L> {
    fn load(&self, kind: LoadKind, name: &str) -> Result<String, LoadError> {
        (**self).load(kind, name)
    }
}

/// In-memory loader, useful for tests and generated sources.
#[derive(Debug, Default, Clone)]
pub struct MapLoader {
    templates: HashMap<LoadKind, HashMap<String, String>>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        mut self,
        kind: LoadKind,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        self.templates
            .entry(kind)
            .or_default()
            .insert(name.into(), source.into());
        self
    }
}

impl Loader for MapLoader {
    fn load(&self, kind: LoadKind, name: &str) -> Result<String, LoadError> {
        let templates = self
            .templates
            .get(&kind)
            .ok_or(LoadError::KindNotFound(kind))?;
        templates
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                kind,
                name: name.to_string(),
            })
    }
}

/// Filesystem loader over per-kind search paths.
#[derive(Debug, Clone)]
pub struct FsLoader {
    search_paths: HashMap<LoadKind, Vec<Utf8PathBuf>>,
    extensions: Vec<String>,
}

impl FsLoader {
    pub fn new(search_paths: HashMap<LoadKind, Vec<Utf8PathBuf>>) -> Self {
        Self {
            search_paths,
            extensions: vec![".html.tmpl".to_string()],
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(|e| e.into()).collect();
        self
    }

    fn candidates<'a>(
        &'a self,
        paths: &'a [Utf8PathBuf],
        name: &'a str,
    ) -> impl Iterator<Item = Utf8PathBuf> + 'a {
        paths.iter().flat_map(move |dir| {
            self.extensions
                .iter()
                .map(move |ext| dir.join(format!("{name}{ext}")))
        })
    }
}

impl Loader for FsLoader {
    fn load(&self, kind: LoadKind, name: &str) -> Result<String, LoadError> {
        let paths = self
            .search_paths
            .get(&kind)
            .ok_or(LoadError::KindNotFound(kind))?;

        for candidate in self.candidates(paths, name) {
            if !candidate.is_file() {
                continue;
            }
            return read_file(&candidate);
        }

        Err(LoadError::NotFound {
            kind,
            name: name.to_string(),
        })
    }
}

fn read_file(path: &Utf8Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })
}
