use std::fmt;
use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[display("Parser")]
    Parser,
    #[display("Runtime")]
    Runtime,
    #[display("I/O")]
    Io,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.line, &self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{} error at line {}, column {}: {}", self.kind, line, column, self.message)
            }
            (Some(line), None) => {
                write!(f, "{} error on line {}: {}", self.kind, line, self.message)
            }
            _ => {
                write!(f, "{} error: {}", self.kind, self.message)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            message: e.to_string(),
            line: None,
            column: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[macro_export]
macro_rules! parser_error {
    ($msg:expr, $line:expr, $col:expr) => {
        Err($crate::language::error::Error {
            kind: $crate::language::error::ErrorKind::Parser,
            message: $msg.to_string(),
            line: Some($line),
            column: Some($col),
        })
    };
}

#[macro_export]
macro_rules! runtime_error {
    ($msg:expr) => {
        Err($crate::language::error::Error {
            kind: $crate::language::error::ErrorKind::Runtime,
            message: $msg.to_string(),
            line: None,
            column: None,
        })
    };
    ($msg:expr, $line:expr) => {
        Err($crate::language::error::Error {
            kind: $crate::language::error::ErrorKind::Runtime,
            message: $msg.to_string(),
            line: Some($line),
            column: None,
        })
    };
}

#[macro_export]
macro_rules! io_error {
    ($msg:expr, $line:expr) => {
        Err($crate::language::error::Error {
            kind: $crate::language::error::ErrorKind::Io,
            message: $msg.to_string(),
            line: Some($line),
            column: None,
        })
    };
}
