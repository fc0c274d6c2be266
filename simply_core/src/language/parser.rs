use log::{debug, error, info, trace};
use crate::language::token::{Token, TokenKind, TokenSource};
use crate::language::ast::{AstNode, NodeKind};
use crate::language::lexer::Lexer;
use crate::language::error::Result;
use crate::parser_error;

/// Tokens that may begin a statement inside a statement list.
const STATEMENT_START: &[TokenKind] = &[
    TokenKind::Id,
    TokenKind::If,
    TokenKind::While,
    TokenKind::LParen,
    TokenKind::IntLit,
    TokenKind::FloatLit,
    TokenKind::CharLit,
    TokenKind::StringLit,
    TokenKind::Print,
    TokenKind::Read,
    TokenKind::Break,
    TokenKind::Return,
];

pub struct Parser<S: TokenSource> {
    source: S,
    current: Token,
}

impl<S: TokenSource> Parser<S> {
    pub fn new(mut source: S) -> Self {
        let current = source.next_token();
        Parser { source, current }
    }

    /// Parses one compilation unit. The whole token stream must be consumed.
    pub fn parse(&mut self) -> Result<AstNode> {
        let mut program = AstNode::new(NodeKind::Program, self.current.clone());
        self.program(&mut program)?;
        self.must_be(TokenKind::Eof)?;
        debug!("Program parsed with {} top-level nodes", program.children.len());
        Ok(program)
    }

    fn advance(&mut self) -> Token {
        let next = self.source.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn has(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn has_type(&self) -> bool {
        self.current.kind.is_type()
    }

    fn must_be(&self, kind: TokenKind) -> Result<()> {
        if self.has(kind) {
            return Ok(());
        }
        parser_error!(
            format!("expected token {}, received token {}", kind, self.current.kind),
            self.current.line,
            self.current.column
        )
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        self.must_be(kind)?;
        Ok(self.advance())
    }

    fn expect_type(&mut self) -> Result<Token> {
        if self.has_type() {
            return Ok(self.advance());
        }
        self.expect(TokenKind::String)
    }

    fn program(&mut self, program: &mut AstNode) -> Result<()> {
        if self.has(TokenKind::Begin) {
            program.children.push(self.block()?);
            Ok(())
        } else if self.has_type() {
            while self.has_type() {
                program.children.push(self.declaration()?);
            }
            while self.has(TokenKind::Def) {
                program.children.push(self.function()?);
            }
            program.children.push(self.block()?);
            Ok(())
        } else {
            self.must_be(TokenKind::Def)?;
            while self.has(TokenKind::Def) {
                program.children.push(self.function()?);
            }
            self.program(program)
        }
    }

    /// `type ID` or `type ID [ bounds ]`.
    fn declaration(&mut self) -> Result<AstNode> {
        let type_token = self.expect_type()?;
        let id = self.expect(TokenKind::Id)?;
        let decl = AstNode::atomic(type_token).with_child(AstNode::atomic(id));

        if !self.has(TokenKind::LBracket) {
            return Ok(decl);
        }

        let bracket = self.advance();
        let array = AstNode::new(NodeKind::Array, bracket).with_child(decl);
        let mut bounds = AstNode::new(NodeKind::Bounds, self.current.clone());
        bounds.children.push(AstNode::atomic(self.expect(TokenKind::IntLit)?));
        if self.has(TokenKind::Comma) {
            self.advance();
            bounds.children.push(AstNode::atomic(self.expect(TokenKind::IntLit)?));
        }
        self.expect(TokenKind::RBracket)?;

        Ok(array.with_child(bounds))
    }

    /// `DEF (PROC | type) ID ( [param-list] ) block`
    fn function(&mut self) -> Result<AstNode> {
        let def = AstNode::new(NodeKind::Def, self.expect(TokenKind::Def)?);

        let kind_token = if self.has(TokenKind::Proc) {
            self.advance()
        } else {
            self.expect_type()?
        };
        let id = self.expect(TokenKind::Id)?;
        trace!("Parsing function '{}' at line {}", id.lexeme, id.line);
        let signature = AstNode::atomic(kind_token).with_child(AstNode::atomic(id));

        self.expect(TokenKind::LParen)?;
        let mut params = AstNode::new(NodeKind::ParamList, self.current.clone());
        if !self.has(TokenKind::RParen) {
            params.children.push(self.parameter()?);
            while self.has(TokenKind::Comma) {
                self.advance();
                params.children.push(self.parameter()?);
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.block()?;
        Ok(def.with_child(signature).with_child(params).with_child(body))
    }

    /// `type ID` or `type [] ID`.
    fn parameter(&mut self) -> Result<AstNode> {
        let param = AstNode::atomic(self.expect_type()?);
        if self.has(TokenKind::Id) {
            return Ok(param.with_child(AstNode::atomic(self.advance())));
        }
        let bracket = self.expect(TokenKind::ClosedBracket)?;
        let id = self.expect(TokenKind::Id)?;
        let array = AstNode::new(NodeKind::Array, bracket).with_child(AstNode::atomic(id));
        Ok(param.with_child(array))
    }

    /// `BEGIN declaration* statement-list END`
    fn block(&mut self) -> Result<AstNode> {
        let mut block = AstNode::new(NodeKind::Block, self.expect(TokenKind::Begin)?);

        while self.has_type() {
            block.children.push(self.declaration()?);
        }

        let mut list = AstNode::new(NodeKind::StatementList, self.current.clone());
        loop {
            let statement = AstNode::new(NodeKind::Statement, self.current.clone());
            list.children.push(statement.with_child(self.statement()?));
            if !STATEMENT_START.contains(&self.current.kind) {
                break;
            }
        }
        block.children.push(list);

        self.expect(TokenKind::End)?;
        Ok(block)
    }

    fn statement(&mut self) -> Result<AstNode> {
        match self.current.kind {
            TokenKind::Id => {
                let left = AstNode::atomic(self.advance());
                self.identifier_statement(left)
            }
            TokenKind::If => {
                let if_token = self.advance();
                let condition = self.condition()?;
                let then_branch = self.block()?;
                if self.has(TokenKind::Else) {
                    let else_token = self.advance();
                    let else_branch = self.block()?;
                    return Ok(AstNode::new(NodeKind::IfElse, else_token)
                        .with_child(condition)
                        .with_child(then_branch)
                        .with_child(else_branch));
                }
                Ok(AstNode::new(NodeKind::If, if_token).with_child(condition).with_child(then_branch))
            }
            TokenKind::While => {
                let node = AstNode::new(NodeKind::While, self.advance());
                let condition = self.condition()?;
                let body = self.block()?;
                Ok(node.with_child(condition).with_child(body))
            }
            TokenKind::LParen => {
                self.advance();
                let node = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(node)
            }
            TokenKind::IntLit | TokenKind::FloatLit | TokenKind::CharLit | TokenKind::StringLit => self.expression(),
            TokenKind::Print => {
                let node = AstNode::new(NodeKind::Print, self.advance());
                Ok(node.with_child(self.arg_list()?))
            }
            TokenKind::Read => {
                let node = AstNode::new(NodeKind::Read, self.advance());
                Ok(node.with_child(self.ref_list()?))
            }
            TokenKind::Break => Ok(AstNode::new(NodeKind::Break, self.advance())),
            _ => {
                let node = AstNode::new(NodeKind::Return, self.expect(TokenKind::Return)?);
                Ok(node.with_child(self.expression()?))
            }
        }
    }

    /// Everything that may follow a leading identifier in statement position.
    fn identifier_statement(&mut self, left: AstNode) -> Result<AstNode> {
        match self.current.kind {
            TokenKind::Assign => {
                let node = AstNode::new(NodeKind::Assign, self.advance()).with_child(left);
                if self.has(TokenKind::Import) {
                    let import = AstNode::new(NodeKind::Import, self.advance());
                    let path = if self.has(TokenKind::StringLit) {
                        AstNode::atomic(self.advance())
                    } else {
                        self.reference()?
                    };
                    return Ok(node.with_child(import.with_child(path)));
                }
                Ok(node.with_child(self.expression()?))
            }
            TokenKind::Swap => {
                let target = AstNode::new(NodeKind::Ref, left.token.clone()).with_child(left);
                let node = AstNode::new(NodeKind::Swap, self.advance());
                Ok(node.with_child(target).with_child(self.reference()?))
            }
            TokenKind::LBracket => {
                self.advance();
                let target = AstNode::new(NodeKind::Ref, left.token.clone())
                    .with_child(left)
                    .with_child(self.arg_list()?);
                self.expect(TokenKind::RBracket)?;
                if self.has(TokenKind::Assign) {
                    let node = AstNode::new(NodeKind::Assign, self.advance());
                    return Ok(node.with_child(target).with_child(self.expression()?));
                }
                let node = AstNode::new(NodeKind::Swap, self.expect(TokenKind::Swap)?);
                Ok(node.with_child(target).with_child(self.reference()?))
            }
            TokenKind::LParen => {
                self.advance();
                self.call(left)
            }
            TokenKind::ClosedBracket => {
                self.advance();
                let node = AstNode::new(NodeKind::Assign, self.expect(TokenKind::Assign)?).with_child(left);
                let split = AstNode::new(NodeKind::Split, self.expect(TokenKind::Split)?);
                self.expect(TokenKind::LParen)?;
                let subject = if self.has(TokenKind::CharLit) || self.has(TokenKind::StringLit) {
                    AstNode::atomic(self.advance())
                } else {
                    self.reference()?
                };
                self.expect(TokenKind::RParen)?;
                let delimiter = AstNode::atomic(self.expect(TokenKind::StringLit)?);
                Ok(node.with_child(split.with_child(subject).with_child(delimiter)))
            }
            _ => Ok(AstNode::new(NodeKind::Ref, left.token.clone()).with_child(left)),
        }
    }

    /// `expression relop expression`
    fn condition(&mut self) -> Result<AstNode> {
        let left = self.expression()?;
        let kind = match self.current.kind {
            TokenKind::Equal => NodeKind::Eq,
            TokenKind::NotEqualTo => NodeKind::Ne,
            TokenKind::LessThan => NodeKind::Lt,
            TokenKind::LessThanOrEqual => NodeKind::Lte,
            TokenKind::GreaterThan => NodeKind::Gt,
            _ => {
                self.must_be(TokenKind::GreaterThanOrEqual)?;
                NodeKind::Gte
            }
        };
        let node = AstNode::new(kind, self.advance());
        let right = self.expression()?;
        Ok(node.with_child(left).with_child(right))
    }

    fn expression(&mut self) -> Result<AstNode> {
        let left = self.term()?;
        match self.expression_rest()? {
            Some(node) => self.splice(node, left),
            None => Ok(left),
        }
    }

    /// `(+|-) term expression-rest`, returned with its left operand slot still open.
    fn expression_rest(&mut self) -> Result<Option<AstNode>> {
        let kind = match self.current.kind {
            TokenKind::Plus => NodeKind::Add,
            TokenKind::Minus => NodeKind::Sub,
            _ => return Ok(None),
        };
        let node = AstNode::new(kind, self.advance()).with_child(self.term()?);
        match self.expression_rest()? {
            Some(rest) => self.splice(rest, node).map(Some),
            None => Ok(Some(node)),
        }
    }

    fn term(&mut self) -> Result<AstNode> {
        let left = self.factor()?;
        match self.term_rest()? {
            Some(node) => self.splice(node, left),
            None => Ok(left),
        }
    }

    /// `(*|/) factor term-rest`, returned with its left operand slot still open.
    fn term_rest(&mut self) -> Result<Option<AstNode>> {
        let kind = match self.current.kind {
            TokenKind::Times => NodeKind::Mul,
            TokenKind::Divide => NodeKind::Div,
            _ => return Ok(None),
        };
        let node = AstNode::new(kind, self.advance()).with_child(self.factor()?);
        match self.term_rest()? {
            Some(rest) => self.splice(rest, node).map(Some),
            None => Ok(Some(node)),
        }
    }

    fn splice(&self, mut node: AstNode, left: AstNode) -> Result<AstNode> {
        match node.insert_left_leaf(left) {
            Ok(()) => Ok(node),
            Err(left) => parser_error!(
                format!("no open operand slot in {} for {}", node.kind, left.kind),
                node.token.line,
                node.token.column
            ),
        }
    }

    /// `[-] exponent (** factor)?`. Recursing on `factor` makes `**` right-associative.
    fn factor(&mut self) -> Result<AstNode> {
        let left = if self.has(TokenKind::Minus) {
            let neg = AstNode::new(NodeKind::Neg, self.advance());
            neg.with_child(self.exponent()?)
        } else {
            self.exponent()?
        };

        if !self.has(TokenKind::Pow) {
            return Ok(left);
        }
        let mut node = AstNode::new(NodeKind::Pow, self.advance());
        node.children.push(self.factor()?);
        node.children.insert(0, left);
        Ok(node)
    }

    fn exponent(&mut self) -> Result<AstNode> {
        match self.current.kind {
            TokenKind::LParen => {
                self.advance();
                let node = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(node)
            }
            TokenKind::Id => {
                let leaf = AstNode::atomic(self.advance());
                if self.has(TokenKind::LParen) {
                    self.advance();
                    return self.call(leaf);
                }
                let node = AstNode::new(NodeKind::Ref, leaf.token.clone()).with_child(leaf);
                self.index_suffix(node)
            }
            TokenKind::IntLit | TokenKind::FloatLit | TokenKind::CharLit => Ok(AstNode::atomic(self.advance())),
            _ => Ok(AstNode::atomic(self.expect(TokenKind::StringLit)?)),
        }
    }

    /// Called after the opening parenthesis has been consumed.
    fn call(&mut self, callee: AstNode) -> Result<AstNode> {
        let node = AstNode::new(NodeKind::Call, callee.token.clone()).with_child(callee);
        let args = if self.has(TokenKind::RParen) {
            AstNode::new(NodeKind::ArgList, self.current.clone())
        } else {
            self.arg_list()?
        };
        self.expect(TokenKind::RParen)?;
        Ok(node.with_child(args))
    }

    fn arg_list(&mut self) -> Result<AstNode> {
        let mut node = AstNode::new(NodeKind::ArgList, self.current.clone());
        node.children.push(self.expression()?);
        while self.has(TokenKind::Comma) {
            self.advance();
            node.children.push(self.expression()?);
        }
        Ok(node)
    }

    fn ref_list(&mut self) -> Result<AstNode> {
        let mut node = AstNode::new(NodeKind::RefList, self.current.clone());
        node.children.push(self.reference()?);
        while self.has(TokenKind::Comma) {
            self.advance();
            node.children.push(self.reference()?);
        }
        Ok(node)
    }

    /// `ID` or `ID [ arg-list ]`
    fn reference(&mut self) -> Result<AstNode> {
        let id = self.expect(TokenKind::Id)?;
        let node = AstNode::new(NodeKind::Ref, id.clone()).with_child(AstNode::atomic(id));
        self.index_suffix(node)
    }

    fn index_suffix(&mut self, mut node: AstNode) -> Result<AstNode> {
        if self.has(TokenKind::LBracket) {
            self.advance();
            node.children.push(self.arg_list()?);
            self.expect(TokenKind::RBracket)?;
        }
        Ok(node)
    }
}

/// Parses a program from any token source.
pub fn parse_tokens<S: TokenSource>(source: S) -> Result<AstNode> {
    let mut parser = Parser::new(source);
    parser.parse()
}

pub fn parse(input: &str) -> Result<AstNode> {
    debug!("Starting to parse {} bytes of source", input.len());

    match parse_tokens(Lexer::new(input)) {
        Ok(ast) => {
            info!("Parsing successful");
            Ok(ast)
        }
        Err(e) => {
            error!("Parsing failed: {}", e);
            Err(e)
        }
    }
}
