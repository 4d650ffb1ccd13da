//! Type predicates and structural equality: null?, pair?, cons?, atom?,
//! list?, symbol?, equal?, not.

use super::expect_arity;
use crate::context::ExecContext;
use crate::env::Environment;
use crate::error::{LispError, Result};
use crate::value::{equal_values, Datum, Value};

pub fn p_nullp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(args[0].is_null()))
}

pub fn p_pairp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(args[0].is_pair()))
}

/// `cons?` is an alias for `pair?` in the primitive layer.
pub fn p_consp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(args[0].is_pair()))
}

/// Anything that is not a pair is an atom, the empty list included.
pub fn p_atomp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(!args[0].is_pair()))
}

pub fn p_listp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let is_list = args[0].is_pair() || args[0].is_null();
    Ok(Value::bool(is_list))
}

pub fn p_symbolp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(args[0].is_symbol()))
}

pub fn p_equalp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    Ok(Value::bool(equal_values(&args[0], &args[1])))
}

pub fn p_not(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    match args[0].datum {
        Datum::Bool(b) => Ok(Value::bool(!b)),
        _ => Err(LispError::type_error("expecting bool")),
    }
}

pub fn register(env: &Environment) {
    env.define("p-null?", Value::native_fn(p_nullp));
    env.define("p-pair?", Value::native_fn(p_pairp));
    env.define("p-cons?", Value::native_fn(p_consp));
    env.define("p-atom?", Value::native_fn(p_atomp));
    env.define("p-list?", Value::native_fn(p_listp));
    env.define("p-symbol?", Value::native_fn(p_symbolp));
    env.define("p-equal?", Value::native_fn(p_equalp));
    env.define("p-not", Value::native_fn(p_not));
}
