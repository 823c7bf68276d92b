//! Error types for the rendering pipeline.

use cannelle::EngineError;
use muscade_html::TokenizeError;
use thiserror::Error;

use crate::lower::LowerError;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("tokenize content")]
    Tokenize(#[from] TokenizeError),

    /// Token kinds the preprocessor has no rendering for. Page content is a
    /// fragment: doctypes and stray end tags don't belong in it.
    #[error("unexpected {kind} token in content")]
    UnexpectedToken { kind: &'static str },

    #[error("lower macro '{name}'")]
    MacroLowering {
        name: String,
        #[source]
        source: LowerError,
    },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("preprocess content")]
    Preprocess(#[from] PreprocessError),

    #[error("import '{name}'")]
    Import {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("render template")]
    Engine(#[from] EngineError),

    #[error("postprocess rendered output")]
    Postprocess(#[source] TokenizeError),
}
