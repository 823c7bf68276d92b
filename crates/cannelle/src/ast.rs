//! Parsed template nodes.
//!
//! Parsed once per source, executed many times. `define` blocks never appear
//! here: the parser lifts them into the engine's namespace and they are
//! executed by name.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    /// Raw text, passed through unchanged.
    Text(String),
    /// `{{ pipeline }}`
    Print(Pipeline),
    /// `{{ if pipeline }} … {{ else }} … {{ end }}`
    If {
        cond: Pipeline,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
    /// `{{ range pipeline }} … {{ else }} … {{ end }}`; `.` rebinds to each
    /// element in the body, the else arm runs when the sequence is empty.
    Range {
        over: Pipeline,
        body: Vec<Node>,
        else_body: Vec<Node>,
    },
}

/// `cmd | cmd | …` — the value of each command is appended as the final
/// argument of the next.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub cmds: Vec<Command>,
}

/// A single command: a head term plus argument terms. A command with
/// arguments (or a piped input) must head with a function name.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub head: Term,
    pub args: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Term {
    Literal(Value),
    /// `.a.b`; an empty path is the whole render data.
    Path(Vec<String>),
    /// A function by name. In argument position it is called with no
    /// arguments.
    Func(String),
    Paren(Box<Pipeline>),
}
