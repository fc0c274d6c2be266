mod environment;
mod evaluator;
pub mod value;

use std::io::{BufRead, Write};
use log::{debug, error, info};
use crate::language::ast::AstNode;
use crate::language::error::Result;
use crate::language::parser;
use evaluator::Evaluator;
pub use value::Value;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Runs parsed programs against an input stream (answers to `READ`) and an
/// output stream (`PRINT` and `READ` prompts).
#[derive(Debug)]
pub struct Interpreter<R: BufRead, W: Write> {
    input: R,
    output: W,
    max_call_depth: usize,
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Interpreter {
            input,
            output,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn run(&mut self, program: &AstNode) -> Result<Value> {
        info!("Running program ({} top-level nodes)", program.children.len());
        debug!("Maximum call depth: {}", self.max_call_depth);

        let result = {
            let mut evaluator = Evaluator::new(&mut self.input, &mut self.output, self.max_call_depth);
            evaluator.evaluate(program)
        };
        self.output.flush()?;

        match result {
            Ok(value) => {
                info!("Program finished");
                Ok(value)
            }
            Err(e) => {
                error!("Program failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn run_source(&mut self, source: &str) -> Result<Value> {
        let program = parser::parse(source)?;
        self.run(&program)
    }
}
