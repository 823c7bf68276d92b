//! Error types for parsing and execution.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::loader::{LoadError, LoadKind};

/// A template parse error with the offending source attached.
#[derive(Debug, Error, Diagnostic)]
#[error("expected {expected}, found {found}")]
#[diagnostic(code(cannelle::syntax))]
pub struct SyntaxError {
    pub expected: String,
    pub found: String,
    #[label("here")]
    pub span: SourceSpan,
    #[source_code]
    pub src: NamedSource<String>,
}

/// Anything that can go wrong while importing or executing templates.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("load {kind} '{name}'")]
    Load {
        kind: LoadKind,
        name: String,
        #[source]
        source: LoadError,
    },

    #[error("parse template '{name}'")]
    Parse {
        name: String,
        #[source]
        source: Box<SyntaxError>,
    },

    #[error("block '{0}' is not defined")]
    BlockNotDefined(String),

    #[error("dict requires an even number of arguments, got {0}")]
    DictOddArgs(usize),

    #[error("dict keys must be strings")]
    DictKeyNotString,

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("json parse")]
    Json(#[from] serde_json::Error),

    #[error("render cancelled")]
    Cancelled,

    #[error("function '{name}'")]
    Function {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("macro '{name}' ('{unique}')")]
    Macro {
        name: String,
        unique: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("include layout '{name}'")]
    Layout {
        name: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("include '{name}'")]
    Include {
        name: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("eval: {0}")]
    Eval(String),
}
