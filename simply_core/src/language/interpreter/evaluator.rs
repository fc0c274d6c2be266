use std::io::{BufRead, Write};
use log::{debug, trace};
use crate::language::ast::{AstNode, NodeKind};
use crate::language::error::Result;
use crate::language::token::{Literal, TokenKind};
use crate::{io_error, runtime_error};
use super::environment::{CellId, Environment, Reference};
use super::value::{ArrayRef, Value};

/// Remaining stack below which evaluation continues on a freshly allocated segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Upper bound on the number of elements a single array declaration may allocate.
const MAX_ARRAY_ELEMENTS: usize = 1 << 24;

/// A location a value can be read from and written to.
enum Place {
    Cell(CellId),
    Element(ArrayRef, usize),
}

fn child(node: &AstNode, index: usize) -> Result<&AstNode> {
    match node.children.get(index) {
        Some(c) => Ok(c),
        None => runtime_error!(format!("Malformed {} node: missing child {}", node.kind, index), node.line()),
    }
}

fn literal(node: &AstNode) -> Result<Value> {
    match &node.token.value {
        Some(Literal::Int(n)) => Ok(Value::Int(*n)),
        Some(Literal::Float(x)) => Ok(Value::Float(*x)),
        Some(Literal::Char(c)) => Ok(Value::Char(*c)),
        Some(Literal::Str(s)) => Ok(Value::Str(s.clone())),
        None => runtime_error!(format!("Literal '{}' has no value", node.token.lexeme), node.line()),
    }
}

fn index(value: &Value, len: usize, line: usize) -> Result<usize> {
    match value {
        Value::Int(n) if *n >= 0 && (*n as usize) < len => Ok(*n as usize),
        Value::Int(n) => runtime_error!(format!("Index {} out of range for length {}", n, len), line),
        other => runtime_error!(format!("Array index must be an integer, got {}", other.type_name()), line),
    }
}

pub struct Evaluator<'a, R: BufRead, W: Write> {
    env: Environment<'a>,
    input: &'a mut R,
    output: &'a mut W,
    max_call_depth: usize,
}

impl<'a, R: BufRead, W: Write> Evaluator<'a, R, W> {
    pub fn new(input: &'a mut R, output: &'a mut W, max_call_depth: usize) -> Self {
        Evaluator {
            env: Environment::new(),
            input,
            output,
            max_call_depth,
        }
    }

    /// Evaluates `node`, growing the stack when recursion runs deep so that only
    /// the call-depth limit ends a runaway recursion.
    pub fn evaluate(&mut self, node: &'a AstNode) -> Result<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.evaluate_node(node))
    }

    fn evaluate_node(&mut self, node: &'a AstNode) -> Result<Value> {
        trace!("Evaluating {} at line {}", node.kind, node.line());
        match node.kind {
            NodeKind::Program | NodeKind::Block | NodeKind::StatementList => self.evaluate_sequence(node),
            NodeKind::Statement => {
                if self.env.break_pending() {
                    return Ok(Value::None);
                }
                self.evaluate(child(node, 0)?)
            }
            NodeKind::Atomic => self.evaluate_atomic(node),
            NodeKind::Assign => self.evaluate_assign(node),
            NodeKind::Add | NodeKind::Sub | NodeKind::Mul | NodeKind::Div | NodeKind::Pow => self.evaluate_arithmetic(node),
            NodeKind::Neg => self.evaluate_negation(node),
            NodeKind::If | NodeKind::IfElse => self.evaluate_branch(node),
            NodeKind::Lt | NodeKind::Eq | NodeKind::Ne | NodeKind::Lte | NodeKind::Gt | NodeKind::Gte => {
                self.evaluate_relational(node)
            }
            NodeKind::Print => self.evaluate_print(node),
            NodeKind::Call => self.evaluate_call(node),
            NodeKind::Return => {
                let value = self.evaluate(child(node, 0)?)?;
                self.env.set_return(value.clone());
                Ok(value)
            }
            NodeKind::Array => self.evaluate_array_declaration(node),
            NodeKind::While => self.evaluate_while(node),
            NodeKind::Import => self.evaluate_import(node),
            NodeKind::Split => self.evaluate_split(node),
            NodeKind::ParamList => {
                let names = self.parameter_names(node)?;
                Ok(Value::from_strings(names.into_iter().map(String::from)))
            }
            NodeKind::Break => {
                self.env.set_break();
                Ok(Value::None)
            }
            NodeKind::Read => self.evaluate_read(node),
            NodeKind::ArgList | NodeKind::RefList => {
                Ok(Value::from_values(self.evaluate_values(node)?))
            }
            NodeKind::Ref => {
                let place = self.resolve_place(node)?;
                self.read_place(&place)
            }
            NodeKind::Def => {
                let name = node.name();
                debug!("Defining function '{}'", name);
                self.env.declare(name, Reference::Function(node));
                Ok(Value::None)
            }
            NodeKind::Bounds => {
                let extents = self.bounds(node)?;
                Ok(Value::from_values(extents.into_iter().map(|n| Value::Int(n as i64)).collect()))
            }
            NodeKind::Swap => self.evaluate_swap(node),
        }
    }

    /// Runs children in order, stopping once a break or return is pending.
    /// Yields the pending return value, or the last non-none child result.
    fn evaluate_sequence(&mut self, node: &'a AstNode) -> Result<Value> {
        let mut result = Value::None;

        for c in &node.children {
            if self.env.break_pending() {
                break;
            }
            let value = self.evaluate(c)?;
            if !value.is_none() {
                result = value;
            }
            if let Some(value) = self.env.return_value() {
                return Ok(value.clone());
            }
        }

        Ok(result)
    }

    fn evaluate_values(&mut self, list: &'a AstNode) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(list.children.len());
        for c in &list.children {
            values.push(self.evaluate(c)?);
        }
        Ok(values)
    }

    fn evaluate_atomic(&mut self, node: &'a AstNode) -> Result<Value> {
        match node.token.kind {
            TokenKind::IntLit | TokenKind::FloatLit | TokenKind::CharLit | TokenKind::StringLit => literal(node),
            kind if kind.is_type() => {
                let name = child(node, 0)?.name();
                trace!("Declaring variable '{}'", name);
                self.env.declare(name, Reference::Variable(Value::None));
                Ok(Value::None)
            }
            TokenKind::Id => {
                let id = self.variable_cell(&node.token.lexeme, node.line())?;
                self.read_place(&Place::Cell(id))
            }
            _ => runtime_error!(format!("Unexpected {} in expression", node.token), node.line()),
        }
    }

    fn variable_cell(&self, name: &str, line: usize) -> Result<CellId> {
        match self.env.lookup(name) {
            None => runtime_error!(format!("Undefined variable {}", name), line),
            Some(id) => match self.env.get(id) {
                Reference::Variable(_) => Ok(id),
                Reference::Function(_) => runtime_error!(format!("{} is not a variable", name), line),
            },
        }
    }

    fn resolve_place(&mut self, node: &'a AstNode) -> Result<Place> {
        match (node.kind, node.children.len()) {
            (NodeKind::Atomic, _) => Ok(Place::Cell(self.variable_cell(node.name(), node.line())?)),
            (NodeKind::Ref, 1) => self.resolve_place(child(node, 0)?),
            (NodeKind::Ref, _) => {
                let indices = self.evaluate_values(child(node, 1)?)?;
                self.resolve_element(node.name(), &indices, node.line())
            }
            _ => runtime_error!(format!("{} cannot be assigned to", node.kind), node.line()),
        }
    }

    fn resolve_element(&self, name: &str, indices: &[Value], line: usize) -> Result<Place> {
        let id = self.variable_cell(name, line)?;
        let Value::Array(items) = self.read_place(&Place::Cell(id))? else {
            return runtime_error!(format!("{} is not an array", name), line);
        };

        match indices {
            [i] => {
                let i = index(i, items.borrow().len(), line)?;
                Ok(Place::Element(items, i))
            }
            [i, j] => {
                let i = index(i, items.borrow().len(), line)?;
                let row = items.borrow()[i].clone();
                let Value::Array(row) = row else {
                    return runtime_error!(format!("{}[{}] is not an array", name, i), line);
                };
                let j = index(j, row.borrow().len(), line)?;
                Ok(Place::Element(row, j))
            }
            _ => runtime_error!(format!("{} takes 1 or 2 indices, got {}", name, indices.len()), line),
        }
    }

    fn read_place(&self, place: &Place) -> Result<Value> {
        match place {
            Place::Cell(id) => match self.env.get(*id) {
                Reference::Variable(value) => Ok(value.clone()),
                Reference::Function(def) => runtime_error!(format!("{} is not a variable", def.name()), def.line()),
            },
            Place::Element(items, i) => Ok(items.borrow()[*i].clone()),
        }
    }

    fn write_place(&mut self, place: &Place, value: Value) {
        match place {
            Place::Cell(id) => *self.env.get_mut(*id) = Reference::Variable(value),
            Place::Element(items, i) => items.borrow_mut()[*i] = value,
        }
    }

    fn evaluate_assign(&mut self, node: &'a AstNode) -> Result<Value> {
        let place = self.resolve_place(child(node, 0)?)?;
        let value = self.evaluate(child(node, 1)?)?;
        self.write_place(&place, value);
        Ok(Value::None)
    }

    fn evaluate_swap(&mut self, node: &'a AstNode) -> Result<Value> {
        let left = self.resolve_place(child(node, 0)?)?;
        let right = self.resolve_place(child(node, 1)?)?;
        let left_value = self.read_place(&left)?;
        let right_value = self.read_place(&right)?;
        self.write_place(&left, right_value);
        self.write_place(&right, left_value);
        Ok(Value::None)
    }

    fn evaluate_arithmetic(&mut self, node: &'a AstNode) -> Result<Value> {
        let left = self.evaluate(child(node, 0)?)?;
        let right = self.evaluate(child(node, 1)?)?;
        let line = node.line();

        if node.kind == NodeKind::Div && right.as_f64() == Some(0.0) {
            return runtime_error!("Division by 0", line);
        }
        if !left.is_numeric() || !right.is_numeric() {
            let verb = match node.kind {
                NodeKind::Add => "add",
                NodeKind::Sub => "subtract",
                NodeKind::Mul => "multiply",
                NodeKind::Div => "divide",
                _ => "perform power on",
            };
            return runtime_error!(format!("Cannot {} these types: {} and {}", verb, left.type_name(), right.type_name()), line);
        }

        let result = match (node.kind, &left, &right) {
            (NodeKind::Add, Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int),
            (NodeKind::Sub, Value::Int(a), Value::Int(b)) => a.checked_sub(*b).map(Value::Int),
            (NodeKind::Mul, Value::Int(a), Value::Int(b)) => a.checked_mul(*b).map(Value::Int),
            (NodeKind::Pow, Value::Int(a), Value::Int(b)) if *b >= 0 => {
                u32::try_from(*b).ok().and_then(|b| a.checked_pow(b)).map(Value::Int)
            }
            _ => {
                let (a, b) = match (left.as_f64(), right.as_f64()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return runtime_error!("Non-numeric operand", line),
                };
                match node.kind {
                    NodeKind::Add => Some(Value::Float(a + b)),
                    NodeKind::Sub => Some(Value::Float(a - b)),
                    NodeKind::Mul => Some(Value::Float(a * b)),
                    NodeKind::Div => Some(Value::Float(a / b)),
                    _ if a == 0.0 && b < 0.0 => return runtime_error!("Division by 0", line),
                    _ => Some(Value::Float(a.powf(b))),
                }
            }
        };

        match result {
            Some(value) => Ok(value),
            None => runtime_error!(format!("Integer overflow in {} {} {}", left, node.token.lexeme, right), line),
        }
    }

    fn evaluate_negation(&mut self, node: &'a AstNode) -> Result<Value> {
        match self.evaluate(child(node, 0)?)? {
            Value::Int(n) => match n.checked_neg() {
                Some(n) => Ok(Value::Int(n)),
                None => runtime_error!(format!("Integer overflow in -{}", n), node.line()),
            },
            Value::Float(x) => Ok(Value::Float(-x)),
            other => runtime_error!(format!("Cannot negate this type: {}", other.type_name()), node.line()),
        }
    }

    fn evaluate_relational(&mut self, node: &'a AstNode) -> Result<Value> {
        let left = self.evaluate(child(node, 0)?)?;
        let right = self.evaluate(child(node, 1)?)?;

        let result = match node.kind {
            NodeKind::Eq => left.loosely_equals(&right),
            NodeKind::Ne => !left.loosely_equals(&right),
            kind => {
                let Some(ordering) = left.compare(&right) else {
                    return runtime_error!(
                        format!("Cannot compare {} and {}", left.type_name(), right.type_name()),
                        node.line()
                    );
                };
                match kind {
                    NodeKind::Lt => ordering.is_lt(),
                    NodeKind::Lte => ordering.is_le(),
                    NodeKind::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }
            }
        };

        Ok(Value::Bool(result))
    }

    fn evaluate_branch(&mut self, node: &'a AstNode) -> Result<Value> {
        if self.evaluate(child(node, 0)?)?.is_truthy() {
            self.evaluate(child(node, 1)?)?;
        } else if node.kind == NodeKind::IfElse {
            self.evaluate(child(node, 2)?)?;
        }
        Ok(Value::None)
    }

    /// Re-tests the condition before each pass; a pending break or return ends the
    /// loop first. The break flag never outlives the loop.
    fn evaluate_while(&mut self, node: &'a AstNode) -> Result<Value> {
        let condition = child(node, 0)?;
        let body = child(node, 1)?;

        while !self.env.break_pending() && !self.env.return_pending() {
            if !self.evaluate(condition)?.is_truthy() {
                break;
            }
            self.evaluate(body)?;
        }

        self.env.clear_break();
        Ok(Value::None)
    }

    fn evaluate_print(&mut self, node: &'a AstNode) -> Result<Value> {
        for value in self.evaluate_values(child(node, 0)?)? {
            match &value {
                Value::Array(items) => {
                    for item in items.borrow().iter() {
                        writeln!(self.output, "{}", item)?;
                    }
                }
                _ => writeln!(self.output, "{}", value)?,
            }
        }
        Ok(Value::None)
    }

    fn parameter_names(&self, params: &'a AstNode) -> Result<Vec<&'a str>> {
        params.children.iter().map(|p| Ok(child(p, 0)?.name())).collect()
    }

    fn evaluate_call(&mut self, node: &'a AstNode) -> Result<Value> {
        let name = child(node, 0)?.name();
        let line = node.line();
        let args = self.evaluate_values(child(node, 1)?)?;

        let def = match self.env.lookup(name).map(|id| self.env.get(id)) {
            None => return runtime_error!(format!("Call to undefined function {}", name), line),
            Some(Reference::Variable(_)) => return runtime_error!(format!("Call to non-function {}", name), line),
            Some(Reference::Function(def)) => *def,
        };

        let params = self.parameter_names(child(def, 1)?)?;
        if params.len() != args.len() {
            return runtime_error!(
                format!("Wrong number of parameters to function {}: expected {}, received {}", name, params.len(), args.len()),
                line
            );
        }
        // the root scope is not a call
        let call_depth = self.env.depth() - 1;
        if call_depth >= self.max_call_depth {
            return runtime_error!(format!("Maximum call depth of {} exceeded calling {}", self.max_call_depth, name), line);
        }

        debug!("Calling '{}' with {} arguments at depth {}", name, args.len(), call_depth + 1);
        self.env.push_scope();
        for (param, arg) in params.into_iter().zip(args) {
            self.env.declare(param, Reference::Variable(arg));
        }

        let result = self.evaluate(child(def, 2)?);
        let returned = self.env.take_return();
        self.env.pop_scope();

        result?;
        Ok(returned.unwrap_or_default())
    }

    fn bounds(&self, node: &'a AstNode) -> Result<Vec<usize>> {
        node.children
            .iter()
            .map(|extent| match literal(extent)? {
                Value::Int(n) if n >= 0 => Ok(n as usize),
                _ => runtime_error!(format!("Invalid array bound {}", extent.token.lexeme), extent.line()),
            })
            .collect()
    }

    fn evaluate_array_declaration(&mut self, node: &'a AstNode) -> Result<Value> {
        let name = child(node, 0)?.name();
        let extents = self.bounds(child(node, 1)?)?;

        let elements = extents.iter().try_fold(1usize, |total, extent| total.checked_mul(*extent));
        if !matches!(elements, Some(n) if n <= MAX_ARRAY_ELEMENTS) {
            return runtime_error!(
                format!("Array {} is too large: at most {} elements are allowed", name, MAX_ARRAY_ELEMENTS),
                node.line()
            );
        }

        let array = match extents.as_slice() {
            [len] => Value::new_array(*len),
            [rows, columns] => Value::new_matrix(*rows, *columns),
            _ => return runtime_error!(format!("Array {} must have 1 or 2 bounds", name), node.line()),
        };

        trace!("Declaring array '{}' with bounds {:?}", name, extents);
        self.env.declare(name, Reference::Variable(array));
        Ok(Value::None)
    }

    fn prompt(&mut self, text: &str, line: usize) -> Result<Value> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut response = String::new();
        if self.input.read_line(&mut response)? == 0 {
            return runtime_error!(format!("Unexpected end of input at prompt '{}'", text.trim_end()), line);
        }
        let response = response.trim_end_matches(['\n', '\r']);
        Ok(Value::from_input(response))
    }

    fn evaluate_read(&mut self, node: &'a AstNode) -> Result<Value> {
        let line = node.line();

        for reference in &child(node, 0)?.children {
            let name = reference.name();

            if reference.children.len() > 1 {
                let indices = self.evaluate_values(child(reference, 1)?)?;
                let place = self.resolve_element(name, &indices, line)?;
                let shown: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                let value = self.prompt(&format!("{}[{}] := ", name, shown.join(",")), line)?;
                self.write_place(&place, value);
                continue;
            }

            let id = self.variable_cell(name, line)?;
            let current = self.read_place(&Place::Cell(id))?;
            let rank = current.rank();
            match current {
                Value::Array(items) => {
                    let rows: Vec<Value> = items.borrow().clone();
                    for (r, row) in rows.into_iter().enumerate() {
                        match row {
                            Value::Array(cells) if rank == 2 => {
                                let len = cells.borrow().len();
                                for c in 0..len {
                                    let value = self.prompt(&format!("{}[{},{}] := ", name, r, c), line)?;
                                    cells.borrow_mut()[c] = value;
                                }
                            }
                            _ => {
                                let value = self.prompt(&format!("{}[{}] := ", name, r), line)?;
                                items.borrow_mut()[r] = value;
                            }
                        }
                    }
                }
                _ => {
                    let value = self.prompt(&format!("{} := ", name), line)?;
                    self.write_place(&Place::Cell(id), value);
                }
            }
        }

        Ok(Value::None)
    }

    fn evaluate_text(&mut self, node: &'a AstNode, what: &str) -> Result<String> {
        let value = self.evaluate(node)?;
        match value.as_text() {
            Some(text) => Ok(text),
            None => runtime_error!(format!("{} expects a string, got {}", what, value.type_name()), node.line()),
        }
    }

    fn evaluate_import(&mut self, node: &'a AstNode) -> Result<Value> {
        let path = self.evaluate_text(child(node, 0)?, "IMPORT")?;
        debug!("Importing '{}'", path);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Value::Str(contents)),
            Err(e) => io_error!(format!("Cannot import '{}': {}", path, e), node.line()),
        }
    }

    fn evaluate_split(&mut self, node: &'a AstNode) -> Result<Value> {
        let subject = self.evaluate_text(child(node, 0)?, "SPLIT")?;
        let delimiter = self.evaluate_text(child(node, 1)?, "SPLIT")?;
        if delimiter.is_empty() {
            return runtime_error!("Empty SPLIT delimiter", node.line());
        }
        Ok(Value::from_strings(subject.split(delimiter.as_str()).map(String::from)))
    }
}
