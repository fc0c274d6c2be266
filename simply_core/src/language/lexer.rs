use log::trace;
use crate::language::token::{Literal, Token, TokenKind, TokenSource};

/// Single-character tokens which are not the prefix of any other token.
const SINGLE: &[(char, TokenKind)] = &[
    (']', TokenKind::RBracket),
    (',', TokenKind::Comma),
    ('+', TokenKind::Plus),
    ('-', TokenKind::Minus),
    ('/', TokenKind::Divide),
    ('(', TokenKind::LParen),
    (')', TokenKind::RParen),
    ('=', TokenKind::Equal),
];

/// Fixed-width tokens that may share a prefix with each other.
const MULTI_FIXED: &[(&str, TokenKind)] = &[
    ("*", TokenKind::Times),
    ("**", TokenKind::Pow),
    (">", TokenKind::GreaterThan),
    (">=", TokenKind::GreaterThanOrEqual),
    ("<", TokenKind::LessThan),
    ("<=", TokenKind::LessThanOrEqual),
    (":=:", TokenKind::Swap),
    (":=", TokenKind::Assign),
    ("[", TokenKind::LBracket),
    ("[]", TokenKind::ClosedBracket),
    ("~=", TokenKind::NotEqualTo),
];

pub struct Lexer {
    pub(crate) input: Vec<char>,
    pub(crate) position: usize,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    pub fn consume(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    pub fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.consume();
                }
            } else if ch.is_whitespace() {
                self.consume();
            } else {
                break;
            }
        }
    }

    fn lex_single(&mut self, ch: char, line: usize, column: usize) -> Option<Token> {
        let (_, kind) = SINGLE.iter().find(|(c, _)| *c == ch)?;
        self.consume();
        Some(Token::new(*kind, ch.to_string(), line, column))
    }

    /// Longest match over the fixed multi-character tokens. Characters are accumulated
    /// while at least one candidate is still consistent with them.
    fn lex_multi_fixed(&mut self, line: usize, column: usize) -> Option<Token> {
        let mut lexeme = String::new();

        while let Some(ch) = self.peek() {
            let mut trial = lexeme.clone();
            trial.push(ch);
            if !MULTI_FIXED.iter().any(|(text, _)| text.starts_with(trial.as_str())) {
                break;
            }
            lexeme = trial;
            self.consume();
        }

        if lexeme.is_empty() {
            return None;
        }

        let kind = MULTI_FIXED
            .iter()
            .find(|(text, _)| *text == lexeme)
            .map(|(_, kind)| *kind)
            .unwrap_or(TokenKind::Invalid);

        Some(Token::new(kind, lexeme, line, column))
    }

    fn read_number(&mut self, line: usize, column: usize) -> Token {
        let mut lexeme = String::new();

        while let Some(ch) = self.peek().filter(|c| c.is_ascii_digit()) {
            lexeme.push(ch);
            self.consume();
        }

        if self.peek() != Some('.') {
            return match lexeme.parse::<i64>() {
                Ok(n) => Token::new(TokenKind::IntLit, lexeme, line, column).with_value(Literal::Int(n)),
                Err(_) => Token::new(TokenKind::Invalid, lexeme, line, column),
            };
        }

        lexeme.push('.');
        self.consume();
        while let Some(ch) = self.peek().filter(|c| c.is_ascii_digit()) {
            lexeme.push(ch);
            self.consume();
        }

        if lexeme.ends_with('.') {
            return Token::new(TokenKind::Invalid, lexeme, line, column);
        }

        match lexeme.parse::<f64>() {
            Ok(x) => Token::new(TokenKind::FloatLit, lexeme, line, column).with_value(Literal::Float(x)),
            Err(_) => Token::new(TokenKind::Invalid, lexeme, line, column),
        }
    }

    fn read_identifier(&mut self, line: usize, column: usize) -> Token {
        let mut identifier = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.consume();
            } else {
                break;
            }
        }

        let kind = TokenKind::keyword(&identifier).unwrap_or(TokenKind::Id);
        Token::new(kind, identifier, line, column)
    }

    /// Consumes the character after a backslash and decodes it.
    fn read_escape(&mut self, lexeme: &mut String) -> Option<char> {
        let ch = self.consume()?;
        lexeme.push(ch);
        match ch {
            'n' => Some('\n'),
            't' => Some('\t'),
            '\'' => Some('\''),
            '"' => Some('"'),
            _ => None,
        }
    }

    fn read_char(&mut self, line: usize, column: usize) -> Token {
        let mut lexeme = String::new();
        self.consume();
        lexeme.push('\'');

        let decoded = match self.consume() {
            Some('\\') => {
                lexeme.push('\\');
                self.read_escape(&mut lexeme)
            }
            Some('\n') | None => None,
            Some(ch) => {
                lexeme.push(ch);
                Some(ch)
            }
        };

        match (decoded, self.peek()) {
            (Some(ch), Some('\'')) => {
                self.consume();
                lexeme.push('\'');
                Token::new(TokenKind::CharLit, lexeme, line, column).with_value(Literal::Char(ch))
            }
            _ => {
                if let Some(ch) = self.peek().filter(|c| *c != '\n') {
                    lexeme.push(ch);
                    self.consume();
                }
                Token::new(TokenKind::Invalid, lexeme, line, column)
            }
        }
    }

    fn read_string(&mut self, line: usize, column: usize) -> Token {
        let mut lexeme = String::from("\"");
        let mut value = String::new();
        self.consume();

        loop {
            match self.peek() {
                Some('"') => {
                    self.consume();
                    lexeme.push('"');
                    return Token::new(TokenKind::StringLit, lexeme, line, column).with_value(Literal::Str(value));
                }
                Some('\\') => {
                    self.consume();
                    lexeme.push('\\');
                    match self.read_escape(&mut lexeme) {
                        Some(ch) => value.push(ch),
                        None => return Token::new(TokenKind::Invalid, lexeme, line, column),
                    }
                }
                Some('\n') | None => {
                    return Token::new(TokenKind::Invalid, lexeme, line, column);
                }
                Some(ch) => {
                    self.consume();
                    lexeme.push(ch);
                    value.push(ch);
                }
            }
        }
    }

    fn scan(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;

        let Some(ch) = self.peek() else {
            return Token::new(TokenKind::Eof, "", line, column);
        };

        if let Some(token) = self.lex_single(ch, line, column) {
            return token;
        }
        if let Some(token) = self.lex_multi_fixed(line, column) {
            return token;
        }

        match ch {
            _ if ch.is_ascii_digit() => self.read_number(line, column),
            _ if ch.is_alphabetic() || ch == '_' => self.read_identifier(line, column),
            '\'' => self.read_char(line, column),
            '"' => self.read_string(line, column),
            _ => {
                self.consume();
                Token::new(TokenKind::Invalid, ch.to_string(), line, column)
            }
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        tokens
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Token {
        let token = self.scan();
        trace!("token {:?} '{}' at {}:{}", token.kind, token.lexeme, token.line, token.column);
        token
    }
}
