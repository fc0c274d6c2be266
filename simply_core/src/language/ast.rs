use std::fmt;
use derive_more::Display;
use crate::language::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NodeKind {
    #[display("PROGRAM")]
    Program,
    #[display("ATOMIC")]
    Atomic,
    #[display("ASSIGN")]
    Assign,
    #[display("ADD")]
    Add,
    #[display("SUB")]
    Sub,
    #[display("MUL")]
    Mul,
    #[display("DIV")]
    Div,
    #[display("POW")]
    Pow,
    #[display("NEG")]
    Neg,
    #[display("IF")]
    If,
    #[display("IFELSE")]
    IfElse,
    #[display("LT")]
    Lt,
    #[display("ET")]
    Eq,
    #[display("NE")]
    Ne,
    #[display("LTE")]
    Lte,
    #[display("GT")]
    Gt,
    #[display("GTE")]
    Gte,
    #[display("PRINT")]
    Print,
    #[display("CALL")]
    Call,
    #[display("RETURN")]
    Return,
    #[display("ARRAY")]
    Array,
    #[display("BLOCK")]
    Block,
    #[display("STATEMENT")]
    Statement,
    #[display("STATEMENT_LIST")]
    StatementList,
    #[display("WHILE")]
    While,
    #[display("IMPORT")]
    Import,
    #[display("SPLIT")]
    Split,
    #[display("PARAMLIST")]
    ParamList,
    #[display("BREAK")]
    Break,
    #[display("READ")]
    Read,
    #[display("ARGLIST")]
    ArgList,
    #[display("REFLIST")]
    RefList,
    #[display("REF")]
    Ref,
    #[display("DEF")]
    Def,
    #[display("BOUNDS")]
    Bounds,
    #[display("SWAP")]
    Swap,
}

impl NodeKind {
    /// Declared child count of the node kinds that take part in left-recursion
    /// elimination. List-shaped and statement kinds have none.
    pub fn arity(self) -> Option<usize> {
        match self {
            NodeKind::Atomic => Some(0),
            NodeKind::Assign
            | NodeKind::Add
            | NodeKind::Sub
            | NodeKind::Mul
            | NodeKind::Div
            | NodeKind::Pow
            | NodeKind::If
            | NodeKind::Lt
            | NodeKind::Eq => Some(2),
            NodeKind::IfElse => Some(3),
            NodeKind::Neg | NodeKind::Print | NodeKind::Call | NodeKind::Return => Some(1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: NodeKind,
    pub token: Token,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(kind: NodeKind, token: Token) -> Self {
        AstNode {
            kind,
            token,
            children: Vec::new(),
        }
    }

    pub fn atomic(token: Token) -> Self {
        AstNode::new(NodeKind::Atomic, token)
    }

    pub fn with_child(mut self, child: AstNode) -> Self {
        self.children.push(child);
        self
    }

    /// Inserts `leaf` at the leftmost slot that is still open, walking down the
    /// leftmost child chain until a node below its declared arity is found.
    /// Hands the leaf back when the chain has no open slot.
    pub fn insert_left_leaf(&mut self, leaf: AstNode) -> Result<(), AstNode> {
        let mut node = self;
        loop {
            let Some(arity) = node.kind.arity() else {
                return Err(leaf);
            };
            if node.children.len() < arity {
                node.children.insert(0, leaf);
                return Ok(());
            }
            match node.children.first_mut() {
                Some(first) => node = first,
                None => return Err(leaf),
            }
        }
    }

    /// Identifier text of an atomic leaf, or of the leaf under a type node / reference.
    pub fn name(&self) -> &str {
        match self.kind {
            NodeKind::Atomic if self.token.kind == TokenKind::Id => &self.token.lexeme,
            _ => self.children.first().map(|c| c.name()).unwrap_or(&self.token.lexeme),
        }
    }

    pub fn line(&self) -> usize {
        self.token.line
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter, level: usize) -> fmt::Result {
        let indent = "   ".repeat(level);
        match self.kind {
            NodeKind::Atomic => writeln!(f, "{}{}", indent, self.token.lexeme)?,
            kind => writeln!(f, "{}{}", indent, kind)?,
        }
        for child in &self.children {
            child.fmt_tree(f, level + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
