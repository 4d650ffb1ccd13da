// ABOUTME: Tagged Lisp values: datum variants, source spans, printers, equality

use crate::context::ExecContext;
use crate::env::Environment;
use crate::error::{LispError, Result};
use crate::hash::KeyedTable;
use crate::port::Port;
use num_bigint::BigInt;
use num_rational::BigRational;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Source position of a value: the start of the token it was read from.
/// Synthetic values carry no file and row/col 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub file: Option<Rc<str>>,
    pub row: u32,
    pub col: u32,
}

impl Span {
    pub fn new(file: Rc<str>, row: u32, col: u32) -> Self {
        Span {
            file: Some(file),
            row,
            col,
        }
    }

    pub fn synthetic() -> Self {
        Span::default()
    }
}

/// Sentinel values returned by the readers instead of raising.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// Clean end of input.
    Eof,
    /// Input was syntactically invalid.
    Read,
    /// Input ended mid-form; more text may complete it.
    Incomplete,
}

impl Sentinel {
    pub fn name(self) -> &'static str {
        match self {
            Sentinel::Eof => "eof",
            Sentinel::Read => "read",
            Sentinel::Incomplete => "incomplete",
        }
    }
}

/// A mutable cons cell. Shared: every holder of the pair observes
/// `set-car!`/`set-cdr!`, and cycles are possible.
#[derive(Debug)]
pub struct Pair {
    pub car: Value,
    pub cdr: Value,
}

/// Native entry point: receives the execution context and the already
/// evaluated argument list, and performs its own arity/type checks.
pub type NativeFn = fn(&mut ExecContext, &[Value]) -> Result<Value>;

/// A function value: built-in, lambda closure, or macro.
#[derive(Debug)]
pub enum Callable {
    Native(NativeFn),
    Lambda {
        formals: Value,
        body: Value,
        env: Rc<Environment>,
    },
    Macro {
        formals: Value,
        body: Value,
        env: Rc<Environment>,
    },
}

impl Callable {
    pub fn is_native(&self) -> bool {
        matches!(self, Callable::Native(_))
    }
}

/// The datum payload of a value. The tag is fixed at construction.
#[derive(Debug, Clone)]
pub enum Datum {
    Null,
    Bool(bool),
    Char(u8),
    Int(BigInt),
    Rational(BigRational),
    Float(f64),
    Symbol(Rc<str>),
    Str(Rc<str>),
    Pair(Rc<RefCell<Pair>>),
    Hash(Rc<RefCell<KeyedTable>>),
    Port(Rc<RefCell<Port>>),
    Fn(Rc<Callable>),
    Err(Sentinel),
}

/// A Lisp value: datum plus source position plus the symbol it was most
/// recently `define`d to (diagnostics only).
#[derive(Debug, Clone)]
pub struct Value {
    pub datum: Datum,
    pub span: Span,
    pub bound: Option<Rc<str>>,
}

impl Value {
    fn from_datum(datum: Datum) -> Self {
        Value {
            datum,
            span: Span::synthetic(),
            bound: None,
        }
    }

    pub fn null() -> Self {
        Value::from_datum(Datum::Null)
    }

    pub fn bool(v: bool) -> Self {
        Value::from_datum(Datum::Bool(v))
    }

    pub fn char(c: u8) -> Self {
        Value::from_datum(Datum::Char(c))
    }

    pub fn int(v: i64) -> Self {
        Value::from_datum(Datum::Int(BigInt::from(v)))
    }

    pub fn integer(v: BigInt) -> Self {
        Value::from_datum(Datum::Int(v))
    }

    pub fn rational(v: BigRational) -> Self {
        Value::from_datum(Datum::Rational(v))
    }

    pub fn float(v: f64) -> Self {
        Value::from_datum(Datum::Float(v))
    }

    pub fn symbol(name: &str) -> Self {
        Value::from_datum(Datum::Symbol(Rc::from(name)))
    }

    pub fn string(text: &str) -> Self {
        Value::from_datum(Datum::Str(Rc::from(text)))
    }

    pub fn pair(car: Value, cdr: Value) -> Self {
        Value::from_datum(Datum::Pair(Rc::new(RefCell::new(Pair { car, cdr }))))
    }

    pub fn hash(table: KeyedTable) -> Self {
        Value::from_datum(Datum::Hash(Rc::new(RefCell::new(table))))
    }

    pub fn port(port: Port) -> Self {
        Value::from_datum(Datum::Port(Rc::new(RefCell::new(port))))
    }

    pub fn native_fn(f: NativeFn) -> Self {
        Value::from_datum(Datum::Fn(Rc::new(Callable::Native(f))))
    }

    pub fn lambda(formals: Value, body: Value, env: Rc<Environment>) -> Self {
        Value::from_datum(Datum::Fn(Rc::new(Callable::Lambda { formals, body, env })))
    }

    pub fn macro_fn(formals: Value, body: Value, env: Rc<Environment>) -> Self {
        Value::from_datum(Datum::Fn(Rc::new(Callable::Macro { formals, body, env })))
    }

    pub fn err(sentinel: Sentinel) -> Self {
        Value::from_datum(Datum::Err(sentinel))
    }

    /// Stamp row/col/file information, as the reader does on every value it
    /// constructs.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Short tag name, matching the error and `inspect` output.
    pub fn type_name(&self) -> &'static str {
        match &self.datum {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Char(_) => "char",
            Datum::Int(_) => "int",
            Datum::Rational(_) => "rational",
            Datum::Float(_) => "float",
            Datum::Symbol(_) => "sym",
            Datum::Str(_) => "str",
            Datum::Pair(_) => "pair",
            Datum::Hash(_) => "hash",
            Datum::Port(_) => "port",
            Datum::Fn(_) => "fn",
            Datum::Err(_) => "err",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.datum, Datum::Null)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self.datum, Datum::Pair(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self.datum, Datum::Symbol(_))
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.datum {
            Datum::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match &self.datum {
            Datum::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<&Rc<RefCell<Pair>>> {
        match &self.datum {
            Datum::Pair(p) => Some(p),
            _ => None,
        }
    }

    /// Car of a pair; `type` error otherwise.
    pub fn car(&self) -> Result<Value> {
        match &self.datum {
            Datum::Pair(p) => Ok(p.borrow().car.clone()),
            _ => Err(LispError::type_error("car on non-list")),
        }
    }

    /// Cdr of a pair; `type` error otherwise.
    pub fn cdr(&self) -> Result<Value> {
        match &self.datum {
            Datum::Pair(p) => Ok(p.borrow().cdr.clone()),
            _ => Err(LispError::type_error("cdr on non-list")),
        }
    }

    /// Build a proper list from a vector of values.
    pub fn list(items: Vec<Value>) -> Self {
        let mut result = Value::null();
        for item in items.into_iter().rev() {
            result = Value::pair(item, result);
        }
        result
    }

    /// Collect a proper list into a vector. `type` error on an improper
    /// list or a non-list.
    pub fn list_to_vec(&self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut current = self.clone();
        loop {
            match current.datum {
                Datum::Null => return Ok(items),
                Datum::Pair(ref p) => {
                    let (car, cdr) = {
                        let cell = p.borrow();
                        (cell.car.clone(), cell.cdr.clone())
                    };
                    items.push(car);
                    current = cdr;
                }
                _ => return Err(LispError::type_error("expecting proper list")),
            }
        }
    }

    /// Length of a proper list.
    pub fn list_length(&self) -> Result<usize> {
        let mut count = 0;
        let mut current = self.clone();
        loop {
            match current.datum {
                Datum::Null => return Ok(count),
                Datum::Pair(ref p) => {
                    count += 1;
                    let next = p.borrow().cdr.clone();
                    current = next;
                }
                _ => return Err(LispError::type_error("expecting proper list")),
            }
        }
    }

    /// Printed form with string quoting and `#\xHH` characters, suitable
    /// for re-reading.
    pub fn write_string(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, false);
        out
    }

    /// `display` form: raw string contents and raw characters.
    pub fn display_string(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, true);
        out
    }

    fn write_into(&self, out: &mut String, display: bool) {
        match &self.datum {
            Datum::Null => out.push_str("()"),
            Datum::Bool(b) => out.push_str(if *b { "#t" } else { "#f" }),
            Datum::Char(c) => {
                if display {
                    out.push(*c as char);
                } else {
                    out.push_str(&format!("#\\x{:02x}", c));
                }
            }
            Datum::Int(i) => out.push_str(&i.to_string()),
            Datum::Rational(r) => out.push_str(&r.to_string()),
            Datum::Float(f) => out.push_str(&f.to_string()),
            Datum::Symbol(s) => out.push_str(s),
            Datum::Str(s) => {
                if display {
                    out.push_str(s);
                } else {
                    out.push('"');
                    for c in s.chars() {
                        match c {
                            '"' => out.push_str("\\\""),
                            '\\' => out.push_str("\\\\"),
                            '\n' => out.push_str("\\n"),
                            '\r' => out.push_str("\\r"),
                            '\t' => out.push_str("\\t"),
                            _ => out.push(c),
                        }
                    }
                    out.push('"');
                }
            }
            Datum::Pair(cell) => {
                out.push('(');
                let mut current = cell.clone();
                loop {
                    let (car, cdr) = {
                        let p = current.borrow();
                        (p.car.clone(), p.cdr.clone())
                    };
                    car.write_into(out, display);
                    match &cdr.datum {
                        Datum::Null => break,
                        Datum::Pair(next) => {
                            out.push(' ');
                            let next = next.clone();
                            current = next;
                        }
                        _ => {
                            out.push_str(" . ");
                            cdr.write_into(out, display);
                            break;
                        }
                    }
                }
                out.push(')');
            }
            Datum::Hash(h) => out.push_str(&format!("<hash@{:p}>", Rc::as_ptr(h))),
            Datum::Port(p) => out.push_str(&format!("<port@{:p}>", Rc::as_ptr(p))),
            Datum::Fn(f) => {
                if f.is_native() {
                    out.push_str(&format!("<built-in@{:p}>", Rc::as_ptr(f)));
                } else {
                    out.push_str(&format!("<lambda@{:p}>", Rc::as_ptr(f)));
                }
            }
            Datum::Err(s) => out.push_str(&format!("<err:{}>", s.name())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.write_string())
    }
}

/// Structural equality: same tag, and same scalar value, same bytes, or
/// recursively equal pairs. Hashes, ports, and functions compare by
/// identity.
pub fn equal_values(a: &Value, b: &Value) -> bool {
    match (&a.datum, &b.datum) {
        (Datum::Null, Datum::Null) => true,
        (Datum::Bool(x), Datum::Bool(y)) => x == y,
        (Datum::Char(x), Datum::Char(y)) => x == y,
        (Datum::Int(x), Datum::Int(y)) => x == y,
        (Datum::Rational(x), Datum::Rational(y)) => x == y,
        (Datum::Float(x), Datum::Float(y)) => x == y,
        (Datum::Symbol(x), Datum::Symbol(y)) => x == y,
        (Datum::Str(x), Datum::Str(y)) => x == y,
        (Datum::Hash(x), Datum::Hash(y)) => Rc::ptr_eq(x, y),
        (Datum::Port(x), Datum::Port(y)) => Rc::ptr_eq(x, y),
        (Datum::Fn(x), Datum::Fn(y)) => Rc::ptr_eq(x, y),
        (Datum::Err(x), Datum::Err(y)) => x == y,
        (Datum::Pair(x), Datum::Pair(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (xa, xd) = {
                let cell = x.borrow();
                (cell.car.clone(), cell.cdr.clone())
            };
            let (ya, yd) = {
                let cell = y.borrow();
                (cell.car.clone(), cell.cdr.clone())
            };
            equal_values(&xa, &ya) && equal_values(&xd, &yd)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_prints_as_empty_list() {
        assert_eq!(Value::null().write_string(), "()");
    }

    #[test]
    fn test_proper_list_printing() {
        let v = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(v.write_string(), "(1 2 3)");
    }

    #[test]
    fn test_improper_list_printing() {
        let v = Value::pair(Value::int(1), Value::int(2));
        assert_eq!(v.write_string(), "(1 . 2)");

        let v = Value::pair(Value::int(1), Value::pair(Value::int(2), Value::int(3)));
        assert_eq!(v.write_string(), "(1 2 . 3)");
    }

    #[test]
    fn test_string_write_vs_display() {
        let v = Value::string("a\nb\"c");
        assert_eq!(v.write_string(), "\"a\\nb\\\"c\"");
        assert_eq!(v.display_string(), "a\nb\"c");
    }

    #[test]
    fn test_char_write_vs_display() {
        let v = Value::char(b'A');
        assert_eq!(v.write_string(), "#\\x41");
        assert_eq!(v.display_string(), "A");
    }

    #[test]
    fn test_bool_printing() {
        assert_eq!(Value::bool(true).write_string(), "#t");
        assert_eq!(Value::bool(false).write_string(), "#f");
    }

    #[test]
    fn test_list_round_trip_helpers() {
        let v = Value::list(vec![Value::int(1), Value::symbol("x")]);
        let items = v.list_to_vec().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(v.list_length().unwrap(), 2);
    }

    #[test]
    fn test_improper_list_length_fails() {
        let v = Value::pair(Value::int(1), Value::int(2));
        assert!(v.list_length().is_err());
    }

    #[test]
    fn test_equal_scalars() {
        assert!(equal_values(&Value::int(4), &Value::int(4)));
        assert!(!equal_values(&Value::int(4), &Value::int(5)));
        assert!(!equal_values(&Value::int(4), &Value::float(4.0)));
        assert!(equal_values(&Value::bool(false), &Value::bool(false)));
        assert!(!equal_values(&Value::bool(true), &Value::bool(false)));
        assert!(equal_values(&Value::symbol("a"), &Value::symbol("a")));
        assert!(!equal_values(&Value::symbol("a"), &Value::string("a")));
    }

    #[test]
    fn test_equal_recursive_pairs() {
        let a = Value::list(vec![Value::int(1), Value::list(vec![Value::int(2)])]);
        let b = Value::list(vec![Value::int(1), Value::list(vec![Value::int(2)])]);
        assert!(equal_values(&a, &b));

        let c = Value::list(vec![Value::int(1), Value::list(vec![Value::int(3)])]);
        assert!(!equal_values(&a, &c));
    }

    #[test]
    fn test_pair_mutation_is_shared() {
        let p = Value::pair(Value::int(1), Value::null());
        let alias = p.clone();
        if let Datum::Pair(cell) = &p.datum {
            cell.borrow_mut().car = Value::int(99);
        }
        assert_eq!(alias.car().unwrap().write_string(), "99");
    }

    #[test]
    fn test_hash_values_compare_by_identity() {
        let mut t = KeyedTable::new();
        t.insert("k", Value::int(1));
        let a = Value::hash(t);
        let b = a.clone();
        assert!(equal_values(&a, &b));
        assert!(a.write_string().starts_with("<hash@"));

        let other = Value::hash(KeyedTable::new());
        assert!(!equal_values(&a, &other));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::null().type_name(), "null");
        assert_eq!(Value::int(1).type_name(), "int");
        assert_eq!(Value::symbol("x").type_name(), "sym");
        assert_eq!(Value::err(Sentinel::Eof).type_name(), "err");
    }
}
