//! muscade-html - tolerant HTML tokenizer
//!
//! Turns a markup stream into a tree of typed tokens. Built for page
//! rendering pipelines rather than browsers: it round-trips well-formed-ish
//! documents, knows the void elements, and treats tag soup gently
//! (mismatched end tags auto-close the current element instead of erroring).
//!
//! ```
//! use muscade_html::Tokenizer;
//!
//! let root = Tokenizer::new().tokenize("<p>hello</p>").unwrap();
//! let p = root.children[0].as_tag().unwrap();
//! assert_eq!(p.name, "p");
//! ```

mod lexer;
mod token;
mod tokenizer;

pub use lexer::TokenizeError;
pub use token::{EndTagToken, RawToken, TagToken, Token};
pub use tokenizer::{Tokenizer, VOID_TAGS};
