//! Template node tree and the parser that builds it.

pub mod node;
pub mod parser;

pub use node::{InlineScript, InterpolationOriginals, Node, NodeData, NodeKind, ParsedTemplate, ScriptToken};
pub use parser::{ParseError, parse};
