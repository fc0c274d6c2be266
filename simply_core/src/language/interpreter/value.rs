use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable array storage. Passing or assigning an array aliases it.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Str(String),
    Char(char),
    Bool(bool),
    Array(ArrayRef),
}

impl Value {
    pub fn new_array(len: usize) -> Value {
        Value::Array(Rc::new(RefCell::new(vec![Value::None; len])))
    }

    pub fn new_matrix(rows: usize, columns: usize) -> Value {
        let rows = (0..rows).map(|_| Value::new_array(columns)).collect();
        Value::Array(Rc::new(RefCell::new(rows)))
    }

    pub fn from_values(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn from_strings<I: IntoIterator<Item = String>>(items: I) -> Value {
        let items = items.into_iter().map(Value::Str).collect();
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Text of strings and characters.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Char(c) => Some(c.to_string()),
            _ => None,
        }
    }

    /// 0 for scalars, 1 for a flat array, 2 for an array of arrays.
    pub fn rank(&self) -> usize {
        match self {
            Value::Array(items) => match items.borrow().first() {
                Some(Value::Array(_)) => 2,
                _ => 1,
            },
            _ => 0,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Char(_) => true,
            Value::Array(items) => !items.borrow().is_empty(),
        }
    }

    /// Value equality used by `=` and `~=`. Values of unrelated types are unequal.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        self.equals_tracking(other, &mut Vec::new())
    }

    /// `comparing` holds the array pairs already under comparison further up; meeting
    /// one again means an array contains itself, and that branch is taken as equal.
    fn equals_tracking(&self, other: &Value, comparing: &mut Vec<(ArrayPtr, ArrayPtr)>) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
                if Rc::ptr_eq(a, b) || comparing.contains(&pair) {
                    return true;
                }
                comparing.push(pair);
                let equal = {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals_tracking(y, comparing))
                };
                comparing.pop();
                equal
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => match (self.as_text(), other.as_text()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                },
            },
        }
    }

    /// Ordering used by `< <= > >=`; `None` when the values cannot be ordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => match (self.as_text(), other.as_text()) {
                    (Some(a), Some(b)) => Some(a.cmp(&b)),
                    _ => None,
                },
            },
        }
    }

    /// Coerces a line typed in response to `READ`: all digits become an integer,
    /// anything that parses as a float becomes a float, the rest stays text.
    pub fn from_input(text: &str) -> Value {
        if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = text.parse::<i64>() {
                return Value::Int(n);
            }
        }
        match text.trim().parse::<f64>() {
            Ok(x) => Value::Float(x),
            Err(_) => Value::Str(text.to_string()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Char(_) => "character",
            Value::Bool(_) => "boolean",
            Value::Array(_) => "array",
        }
    }
}

/// Renders a float the way the host language's `repr` does: shortest round-trip
/// digits, `.0` on integral values, exponent form outside `1e-4 <= |x| < 1e16`.
fn fmt_float(f: &mut fmt::Formatter, x: f64) -> fmt::Result {
    if x.is_nan() {
        return write!(f, "nan");
    }
    if x.is_infinite() || x == 0.0 {
        return write!(f, "{:.1}", x);
    }

    let scientific = format!("{:e}", x);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return write!(f, "{}", scientific);
    };
    let exponent: i32 = exponent.parse().map_err(|_| fmt::Error)?;

    if (-4..16).contains(&exponent) {
        if x.fract() == 0.0 {
            write!(f, "{:.1}", x)
        } else {
            write!(f, "{}", x)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(f, "{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

type ArrayPtr = *const RefCell<Vec<Value>>;

/// Writes `[a, b, ...]`, printing an array that is already being written further
/// up as `[...]`.
fn fmt_array(f: &mut fmt::Formatter, items: &ArrayRef, rendering: &mut Vec<ArrayPtr>) -> fmt::Result {
    let ptr = Rc::as_ptr(items);
    if rendering.contains(&ptr) {
        return write!(f, "[...]");
    }
    rendering.push(ptr);

    write!(f, "[")?;
    for (i, item) in items.borrow().iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match item {
            Value::Array(inner) => fmt_array(f, inner, rendering)?,
            other => write!(f, "{}", other)?,
        }
    }
    rendering.pop();
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => fmt_float(f, *x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Char(c) => write!(f, "{}", c),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Array(items) => fmt_array(f, items, &mut Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_coercion() {
        assert!(matches!(Value::from_input("42"), Value::Int(42)));
        assert!(matches!(Value::from_input("-42"), Value::Float(x) if x == -42.0));
        assert!(matches!(Value::from_input("2.5"), Value::Float(x) if x == 2.5));
        assert!(matches!(Value::from_input("hello"), Value::Str(ref s) if s == "hello"));
        assert!(matches!(Value::from_input(""), Value::Str(ref s) if s.is_empty()));
    }

    #[test]
    fn floats_render_like_host_numbers() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
        assert_eq!(Value::Float(-0.25).to_string(), "-0.25");
        assert_eq!(Value::Int(-7).to_string(), "-7");
    }

    #[test]
    fn floats_switch_to_exponent_form_at_the_extremes() {
        assert_eq!(Value::Float(1e16).to_string(), "1e+16");
        assert_eq!(Value::Float(1.5e16).to_string(), "1.5e+16");
        assert_eq!(Value::Float(1e15).to_string(), "1000000000000000.0");
        assert_eq!(Value::Float(0.00001).to_string(), "1e-05");
        assert_eq!(Value::Float(-1.25e-7).to_string(), "-1.25e-07");
        assert_eq!(Value::Float(0.0001).to_string(), "0.0001");
        assert_eq!(Value::Float(123456789.5).to_string(), "123456789.5");
        assert_eq!(Value::Float(0.0).to_string(), "0.0");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Float(f64::NAN).to_string(), "nan");
    }

    #[test]
    fn self_containing_arrays_render_and_compare() {
        let array = Value::new_array(2);
        if let Value::Array(items) = &array {
            items.borrow_mut()[0] = array.clone();
        }
        assert_eq!(array.to_string(), "[[...], None]");
        assert!(array.loosely_equals(&array));

        let other = Value::new_array(2);
        if let Value::Array(items) = &other {
            items.borrow_mut()[0] = other.clone();
        }
        assert!(array.loosely_equals(&other));

        // break the cycles so the test does not leak them
        for value in [&array, &other] {
            if let Value::Array(items) = value {
                items.borrow_mut().clear();
            }
        }
    }

    #[test]
    fn arrays_alias_and_render() {
        let grid = Value::new_matrix(2, 3);
        assert_eq!(grid.rank(), 2);
        assert_eq!(grid.to_string(), "[[None, None, None], [None, None, None]]");

        let alias = grid.clone();
        if let Value::Array(rows) = &alias {
            if let Value::Array(row) = &rows.borrow()[1] {
                row.borrow_mut()[2] = Value::Int(9);
            }
        }
        assert_eq!(grid.to_string(), "[[None, None, None], [None, None, 9]]");
    }

    #[test]
    fn mixed_comparisons() {
        assert!(Value::Int(1).loosely_equals(&Value::Float(1.0)));
        assert!(Value::Char('a').loosely_equals(&Value::Str("a".to_string())));
        assert!(!Value::Int(1).loosely_equals(&Value::Str("1".to_string())));
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Str("b".into()).compare(&Value::Str("a".into())), Some(Ordering::Greater));
        assert_eq!(Value::None.compare(&Value::Int(1)), None);
    }
}
