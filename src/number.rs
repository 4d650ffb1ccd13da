// ABOUTME: Numeric tower: promotion, accumulating ops, comparisons, rounding

use crate::error::{LispError, Result};
use crate::value::{Datum, Value};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::str::FromStr;

/// A numeric operand lifted out of a value, ordered by width:
/// int < rational < float.
#[derive(Debug, Clone)]
pub enum Num {
    Int(BigInt),
    Rational(BigRational),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

fn big_to_f64(n: &BigInt) -> f64 {
    n.to_f64().unwrap_or(if n.is_negative() {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    })
}

fn ratio_to_f64(r: &BigRational) -> f64 {
    r.to_f64().unwrap_or(if r.is_negative() {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    })
}

impl Num {
    pub fn from_value(v: &Value) -> Result<Num> {
        match &v.datum {
            Datum::Int(i) => Ok(Num::Int(i.clone())),
            Datum::Rational(r) => Ok(Num::Rational(r.clone())),
            Datum::Float(f) => Ok(Num::Float(*f)),
            _ => Err(LispError::type_error("expecting numeric arguments")),
        }
    }

    fn width(&self) -> u8 {
        match self {
            Num::Int(_) => 0,
            Num::Rational(_) => 1,
            Num::Float(_) => 2,
        }
    }

    fn promote_to(self, width: u8) -> Num {
        match (self, width) {
            (Num::Int(i), 1) => Num::Rational(BigRational::from_integer(i)),
            (Num::Int(i), 2) => Num::Float(big_to_f64(&i)),
            (Num::Rational(r), 2) => Num::Float(ratio_to_f64(&r)),
            (n, _) => n,
        }
    }

    /// Back into a value. Rationals reduce automatically; one whose
    /// denominator is 1 collapses to an integer, keeping the result tag
    /// equal to the wider operand tag.
    pub fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::integer(i),
            Num::Rational(r) => {
                if r.is_integer() {
                    Value::integer(r.to_integer())
                } else {
                    Value::rational(r)
                }
            }
            Num::Float(f) => Value::float(f),
        }
    }
}

/// Promote both operands to the wider of their two tags.
fn promote_pair(a: Num, b: Num) -> (Num, Num) {
    let width = a.width().max(b.width());
    (a.promote_to(width), b.promote_to(width))
}

fn apply_op(acc: Num, arg: Num, op: ArithOp) -> Result<Num> {
    let (acc, arg) = promote_pair(acc, arg);
    match (acc, arg) {
        (Num::Int(a), Num::Int(b)) => match op {
            ArithOp::Add => Ok(Num::Int(a + b)),
            ArithOp::Sub => Ok(Num::Int(a - b)),
            ArithOp::Mul => Ok(Num::Int(a * b)),
            ArithOp::Div => {
                if b.is_zero() {
                    return Err(LispError::div("attempt to divide by zero"));
                }
                // Exact integer division stays integer; anything else
                // promotes both operands to rational.
                if (&a % &b).is_zero() {
                    Ok(Num::Int(a / b))
                } else {
                    Ok(Num::Rational(
                        BigRational::from_integer(a) / BigRational::from_integer(b),
                    ))
                }
            }
        },
        (Num::Rational(a), Num::Rational(b)) => match op {
            ArithOp::Add => Ok(Num::Rational(a + b)),
            ArithOp::Sub => Ok(Num::Rational(a - b)),
            ArithOp::Mul => Ok(Num::Rational(a * b)),
            ArithOp::Div => {
                if b.is_zero() {
                    return Err(LispError::div("attempt to divide by zero"));
                }
                Ok(Num::Rational(a / b))
            }
        },
        (Num::Float(a), Num::Float(b)) => match op {
            ArithOp::Add => Ok(Num::Float(a + b)),
            ArithOp::Sub => Ok(Num::Float(a - b)),
            ArithOp::Mul => Ok(Num::Float(a * b)),
            ArithOp::Div => Ok(Num::Float(a / b)),
        },
        _ => Err(LispError::internal("operands not promoted")),
    }
}

/// Rolling accumulation for `+`, `-`, `*`, `/`.
///
/// `+`/`-` seed with integer 0, `*`/`/` with rational 1; `-` and `/`
/// require at least one argument and re-seed with the first operand when
/// given two or more, which leaves the single-argument forms as negation
/// and reciprocal.
pub fn accum_op(args: &[Value], op: ArithOp) -> Result<Value> {
    if matches!(op, ArithOp::Sub | ArithOp::Div) && args.is_empty() {
        return Err(LispError::arity("expecting more arguments"));
    }

    let mut acc = match op {
        ArithOp::Add | ArithOp::Sub => Num::Int(BigInt::zero()),
        ArithOp::Mul | ArithOp::Div => Num::Rational(BigRational::one()),
    };

    let mut rest = args;
    if matches!(op, ArithOp::Sub | ArithOp::Div) && args.len() > 1 {
        acc = Num::from_value(&args[0])?;
        rest = &args[1..];
    }

    for arg in rest {
        let operand = Num::from_value(arg)?;
        acc = apply_op(acc, operand, op)?;
    }

    Ok(acc.into_value())
}

/// Two-operand numeric comparison with promotion.
pub fn comp_op(args: &[Value], op: CompOp) -> Result<Value> {
    if args.len() != 2 {
        return Err(LispError::arity("expecting 2 arguments"));
    }

    let a = Num::from_value(&args[0])?;
    let b = Num::from_value(&args[1])?;
    let (a, b) = promote_pair(a, b);

    let ordering = match (&a, &b) {
        (Num::Int(x), Num::Int(y)) => x.partial_cmp(y),
        (Num::Rational(x), Num::Rational(y)) => x.partial_cmp(y),
        (Num::Float(x), Num::Float(y)) => x.partial_cmp(y),
        _ => return Err(LispError::internal("operands not promoted")),
    };

    let result = match ordering {
        Some(ord) => match op {
            CompOp::Eq => ord == std::cmp::Ordering::Equal,
            CompOp::Lt => ord == std::cmp::Ordering::Less,
            CompOp::Gt => ord == std::cmp::Ordering::Greater,
            CompOp::Le => ord != std::cmp::Ordering::Greater,
            CompOp::Ge => ord != std::cmp::Ordering::Less,
        },
        None => false, // NaN compares false under every operator
    };

    Ok(Value::bool(result))
}

fn as_int(v: &Value) -> Result<BigInt> {
    match &v.datum {
        Datum::Int(i) => Ok(i.clone()),
        _ => Err(LispError::type_error("expecting integer arguments")),
    }
}

/// Truncating integer division.
pub fn quotient(a: &Value, b: &Value) -> Result<Value> {
    let (a, b) = (as_int(a)?, as_int(b)?);
    if b.is_zero() {
        return Err(LispError::div("attempt to divide by zero"));
    }
    Ok(Value::integer(a / b))
}

/// Remainder of the truncating division; sign follows the dividend.
pub fn remainder(a: &Value, b: &Value) -> Result<Value> {
    let (a, b) = (as_int(a)?, as_int(b)?);
    if b.is_zero() {
        return Err(LispError::div("attempt to divide by zero"));
    }
    Ok(Value::integer(a % b))
}

/// Flooring modulus; sign follows the divisor.
pub fn modulo(a: &Value, b: &Value) -> Result<Value> {
    let (a, b) = (as_int(a)?, as_int(b)?);
    if b.is_zero() {
        return Err(LispError::div("attempt to divide by zero"));
    }
    Ok(Value::integer(a.mod_floor(&b)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundMode {
    Floor,
    Ceiling,
    Truncate,
    Round,
}

fn round_rational_half_even(r: &BigRational) -> BigInt {
    let floor = r.floor().to_integer();
    let frac = r - BigRational::from_integer(floor.clone());
    let half = BigRational::new(BigInt::one(), BigInt::from(2));
    match frac.cmp(&half) {
        std::cmp::Ordering::Less => floor,
        std::cmp::Ordering::Greater => floor + 1,
        std::cmp::Ordering::Equal => {
            if floor.is_even() {
                floor
            } else {
                floor + 1
            }
        }
    }
}

/// `floor`/`ceiling`/`truncate`/`round`. Integers pass through, rationals
/// become integers, floats stay floats. `round` breaks ties to even.
pub fn round_value(v: &Value, mode: RoundMode) -> Result<Value> {
    match &v.datum {
        Datum::Int(_) => Ok(v.clone()),
        Datum::Rational(r) => {
            let i = match mode {
                RoundMode::Floor => r.floor().to_integer(),
                RoundMode::Ceiling => r.ceil().to_integer(),
                RoundMode::Truncate => r.trunc().to_integer(),
                RoundMode::Round => round_rational_half_even(r),
            };
            Ok(Value::integer(i))
        }
        Datum::Float(f) => {
            let rounded = match mode {
                RoundMode::Floor => f.floor(),
                RoundMode::Ceiling => f.ceil(),
                RoundMode::Truncate => f.trunc(),
                RoundMode::Round => f.round_ties_even(),
            };
            Ok(Value::float(rounded))
        }
        _ => Err(LispError::type_error("expecting numeric arguments")),
    }
}

/// Parse an INTEGER token.
pub fn int_from_literal(text: &str) -> Result<Value> {
    BigInt::from_str(text)
        .map(Value::integer)
        .map_err(|_| LispError::syntax("malformed integer literal"))
}

/// Parse a RATIONAL token of the form `p/q`, reducing to canonical form.
pub fn rational_from_literal(text: &str) -> Result<Value> {
    let (numer, denom) = text
        .split_once('/')
        .ok_or_else(|| LispError::syntax("malformed rational literal"))?;
    let n = BigInt::from_str(numer)
        .map_err(|_| LispError::syntax("malformed rational literal"))?;
    let d = BigInt::from_str(denom)
        .map_err(|_| LispError::syntax("malformed rational literal"))?;
    if d.is_zero() {
        return Err(LispError::syntax("zero denominator in rational literal"));
    }
    Ok(Num::Rational(BigRational::new(n, d)).into_value())
}

/// Parse a FLOAT token.
pub fn float_from_literal(text: &str) -> Result<Value> {
    f64::from_str(text)
        .map(Value::float)
        .map_err(|_| LispError::syntax("malformed float literal"))
}
