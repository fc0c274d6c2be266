pub mod token;
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod error;
pub mod interpreter;

pub use error::{Error, ErrorKind, Result};
pub use ast::{AstNode, NodeKind};
pub use lexer::Lexer;
pub use parser::parse;
pub use interpreter::{Interpreter, Value, DEFAULT_MAX_CALL_DEPTH};
