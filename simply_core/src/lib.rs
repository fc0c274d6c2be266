use std::io::{BufRead, Write};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

pub mod language;

use language::interpreter::{Interpreter, Value, DEFAULT_MAX_CALL_DEPTH};
use language::error::Result;

fn default_max_call_depth() -> usize {
    DEFAULT_MAX_CALL_DEPTH
}

/// Knobs for a single program run. Deserializable so a front end can read it
/// straight out of its configuration file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RunOptions {
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
    /// Write the parsed tree to the output instead of running the program.
    pub print_tree: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            print_tree: false,
        }
    }
}

/// Parses and runs `source`, reading `READ` answers from `input` and writing
/// everything the program prints to `output`.
pub fn execute<R: BufRead, W: Write>(source: &str, options: &RunOptions, input: R, mut output: W) -> Result<Value> {
    info!("Executing program ({} bytes)", source.len());
    debug!("Run options: {:?}", options);

    let ast = match language::parser::parse(source) {
        Ok(ast) => ast,
        Err(e) => {
            error!("Failed to parse program: {}", e);
            return Err(e);
        }
    };

    if options.print_tree {
        write!(output, "{}", ast)?;
        output.flush()?;
        return Ok(Value::None);
    }

    let mut interpreter = Interpreter::new(input, output).with_max_call_depth(options.max_call_depth);
    interpreter.run(&ast)
}
