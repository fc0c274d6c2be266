use std::fmt;
use derive_more::Display;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Display)]
pub enum TokenKind {
    #[display("SWAP")]
    Swap,               // :=:
    #[display("ASSIGN")]
    Assign,             // :=
    #[display("LBRACKET")]
    LBracket,           // [
    #[display("RBRACKET")]
    RBracket,           // ]
    #[display("CLOSED_BRACKET")]
    ClosedBracket,      // []
    #[display("COMMA")]
    Comma,              // ,
    #[display("EQUAL")]
    Equal,              // =
    #[display("NOT_EQUAL_TO")]
    NotEqualTo,         // ~=
    #[display("LESS_THAN")]
    LessThan,           // <
    #[display("LESS_THAN_OR_EQUAL")]
    LessThanOrEqual,    // <=
    #[display("GREATER_THAN")]
    GreaterThan,        // >
    #[display("GREATER_THAN_OR_EQUAL")]
    GreaterThanOrEqual, // >=
    #[display("PLUS")]
    Plus,               // +
    #[display("MINUS")]
    Minus,              // -
    #[display("TIMES")]
    Times,              // *
    #[display("DIVIDE")]
    Divide,             // /
    #[display("POW")]
    Pow,                // **
    #[display("LPAREN")]
    LParen,             // (
    #[display("RPAREN")]
    RParen,             // )
    // -------- //
    #[display("INTLIT")]
    IntLit,             // 123
    #[display("FLOATLIT")]
    FloatLit,           // 1.5
    #[display("CHARLIT")]
    CharLit,            // 'a'
    #[display("STRINGLIT")]
    StringLit,          // "..."
    #[display("ID")]
    Id,
    // -------- //
    #[display("PROC")]
    Proc,
    #[display("BEGIN")]
    Begin,
    #[display("END")]
    End,
    #[display("NUMBER")]
    Number,
    #[display("CHARACTER")]
    Character,
    #[display("BOOL")]
    Bool,
    #[display("STRING")]
    String,
    #[display("IF")]
    If,
    #[display("ELSE")]
    Else,
    #[display("WHILE")]
    While,
    #[display("PRINT")]
    Print,
    #[display("READ")]
    Read,
    #[display("RETURN")]
    Return,
    #[display("IMPORT")]
    Import,
    #[display("BREAK")]
    Break,
    #[display("SPLIT")]
    Split,
    #[display("DEF")]
    Def,
    // -------- //
    #[display("INVALID")]
    Invalid,
    #[display("EOF")]
    Eof,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "PROC" => TokenKind::Proc,
            "BEGIN" => TokenKind::Begin,
            "END" => TokenKind::End,
            "NUMBER" => TokenKind::Number,
            "CHARACTER" => TokenKind::Character,
            "BOOL" => TokenKind::Bool,
            "STRING" => TokenKind::String,
            "IF" => TokenKind::If,
            "ELSE" => TokenKind::Else,
            "WHILE" => TokenKind::While,
            "PRINT" => TokenKind::Print,
            "READ" => TokenKind::Read,
            "RETURN" => TokenKind::Return,
            "IMPORT" => TokenKind::Import,
            "BREAK" => TokenKind::Break,
            "SPLIT" => TokenKind::Split,
            "DEF" => TokenKind::Def,
            _ => return None,
        };
        Some(kind)
    }

    /// `NUMBER`, `CHARACTER`, `BOOL` or `STRING`.
    pub fn is_type(self) -> bool {
        matches!(self, TokenKind::Number | TokenKind::Character | TokenKind::Bool | TokenKind::String)
    }
}

/// Decoded value of a literal token.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub value: Option<Literal>,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            value: None,
            line,
            column,
        }
    }

    pub fn with_value(mut self, value: Literal) -> Self {
        self.value = Some(value);
        self
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            _ => write!(f, "{} '{}'", self.kind, self.lexeme),
        }
    }
}

/// Pull-based producer of tokens consumed by the parser.
pub trait TokenSource {
    /// Scans and returns the next token. Keeps returning `EOF` once the input is exhausted.
    fn next_token(&mut self) -> Token;
}

impl TokenSource for std::vec::IntoIter<Token> {
    fn next_token(&mut self) -> Token {
        self.next().unwrap_or_else(|| Token::new(TokenKind::Eof, "", 0, 0))
    }
}
