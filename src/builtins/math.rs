//! Numeric natives: tower predicates, comparisons, accumulating arithmetic,
//! integer division, rounding.

use super::expect_arity;
use crate::context::ExecContext;
use crate::env::Environment;
use crate::error::Result;
use crate::number::{self, ArithOp, CompOp, RoundMode};
use crate::value::{Datum, Value};

pub fn p_integerp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(matches!(args[0].datum, Datum::Int(_))))
}

pub fn p_rationalp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(matches!(args[0].datum, Datum::Rational(_))))
}

pub fn p_floatp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(matches!(args[0].datum, Datum::Float(_))))
}

/// Ints and rationals are exact; floats are not.
pub fn p_exactp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(matches!(
        args[0].datum,
        Datum::Int(_) | Datum::Rational(_)
    )))
}

pub fn p_inexactp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(matches!(args[0].datum, Datum::Float(_))))
}

pub fn p_plus(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    number::accum_op(args, ArithOp::Add)
}

pub fn p_minus(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    number::accum_op(args, ArithOp::Sub)
}

pub fn p_mul(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    number::accum_op(args, ArithOp::Mul)
}

pub fn p_div(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    number::accum_op(args, ArithOp::Div)
}

pub fn p_eq(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    number::comp_op(args, CompOp::Eq)
}

pub fn p_lt(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    number::comp_op(args, CompOp::Lt)
}

pub fn p_gt(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    number::comp_op(args, CompOp::Gt)
}

pub fn p_lte(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    number::comp_op(args, CompOp::Le)
}

pub fn p_gte(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    number::comp_op(args, CompOp::Ge)
}

pub fn p_quotient(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    number::quotient(&args[0], &args[1])
}

pub fn p_remainder(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    number::remainder(&args[0], &args[1])
}

pub fn p_modulo(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    number::modulo(&args[0], &args[1])
}

pub fn p_floor(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    number::round_value(&args[0], RoundMode::Floor)
}

pub fn p_ceiling(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    number::round_value(&args[0], RoundMode::Ceiling)
}

pub fn p_truncate(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    number::round_value(&args[0], RoundMode::Truncate)
}

pub fn p_round(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    number::round_value(&args[0], RoundMode::Round)
}

pub fn register(env: &Environment) {
    env.define("p-integer?", Value::native_fn(p_integerp));
    env.define("p-rational?", Value::native_fn(p_rationalp));
    env.define("p-float?", Value::native_fn(p_floatp));
    env.define("p-exact?", Value::native_fn(p_exactp));
    env.define("p-inexact?", Value::native_fn(p_inexactp));
    env.define("p-+", Value::native_fn(p_plus));
    env.define("p--", Value::native_fn(p_minus));
    env.define("p-*", Value::native_fn(p_mul));
    env.define("p-/", Value::native_fn(p_div));
    env.define("p-=", Value::native_fn(p_eq));
    env.define("p-<", Value::native_fn(p_lt));
    env.define("p->", Value::native_fn(p_gt));
    env.define("p-<=", Value::native_fn(p_lte));
    env.define("p->=", Value::native_fn(p_gte));
    env.define("p-quotient", Value::native_fn(p_quotient));
    env.define("p-remainder", Value::native_fn(p_remainder));
    env.define("p-modulo", Value::native_fn(p_modulo));
    env.define("p-floor", Value::native_fn(p_floor));
    env.define("p-ceiling", Value::native_fn(p_ceiling));
    env.define("p-truncate", Value::native_fn(p_truncate));
    env.define("p-round", Value::native_fn(p_round));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecContext {
        ExecContext::bare()
    }

    #[test]
    fn test_exactness_predicates() {
        let mut c = ctx();
        assert_eq!(
            p_exactp(&mut c, &[Value::int(1)]).unwrap().write_string(),
            "#t"
        );
        assert_eq!(
            p_exactp(&mut c, &[Value::float(1.0)]).unwrap().write_string(),
            "#f"
        );
        assert_eq!(
            p_inexactp(&mut c, &[Value::float(1.0)])
                .unwrap()
                .write_string(),
            "#t"
        );
    }

    #[test]
    fn test_tower_predicates() {
        let mut c = ctx();
        assert_eq!(
            p_integerp(&mut c, &[Value::int(1)]).unwrap().write_string(),
            "#t"
        );
        assert_eq!(
            p_integerp(&mut c, &[Value::float(1.0)])
                .unwrap()
                .write_string(),
            "#f"
        );
        assert_eq!(
            p_floatp(&mut c, &[Value::float(1.0)]).unwrap().write_string(),
            "#t"
        );
    }

    #[test]
    fn test_accumulators_dispatch() {
        let mut c = ctx();
        let v = p_plus(&mut c, &[Value::int(1), Value::int(2), Value::int(3)]).unwrap();
        assert_eq!(v.write_string(), "6");
        let v = p_div(&mut c, &[Value::int(1), Value::int(3)]).unwrap();
        assert_eq!(v.write_string(), "1/3");
    }

    #[test]
    fn test_comparison_dispatch() {
        let mut c = ctx();
        let v = p_lt(&mut c, &[Value::int(1), Value::int(2)]).unwrap();
        assert_eq!(v.write_string(), "#t");
    }
}
