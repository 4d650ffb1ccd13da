//! Pair and list operations: cons, car, cdr, set-car!, set-cdr!, length,
//! list, append, reverse, list-tail, list-ref.

use super::expect_arity;
use crate::context::ExecContext;
use crate::env::Environment;
use crate::error::{LispError, Result};
use crate::value::{Datum, Value};
use num_traits::ToPrimitive;

pub fn p_cons(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    Ok(Value::pair(args[0].clone(), args[1].clone()))
}

pub fn p_car(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    args[0].car()
}

pub fn p_cdr(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    args[0].cdr()
}

pub fn p_set_car(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    let cell = args[0]
        .as_pair()
        .ok_or_else(|| LispError::type_error("set-car! on non-pair"))?;
    cell.borrow_mut().car = args[1].clone();
    Ok(Value::null())
}

pub fn p_set_cdr(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    let cell = args[0]
        .as_pair()
        .ok_or_else(|| LispError::type_error("set-cdr! on non-pair"))?;
    cell.borrow_mut().cdr = args[1].clone();
    Ok(Value::null())
}

pub fn p_length(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let len = args[0].list_length()?;
    Ok(Value::int(len as i64))
}

pub fn p_list(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    Ok(Value::list(args.to_vec()))
}

/// Concatenate lists. Takes at least two arguments; every argument but the
/// last is copied, the last is shared, so no caller's tail is ever extended
/// in place.
pub fn p_append(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    if args.len() < 2 {
        return Err(LispError::arity("expecting at least 2 arguments"));
    }

    let mut result = args[args.len() - 1].clone();
    for arg in args[..args.len() - 1].iter().rev() {
        let items = arg.list_to_vec()?;
        for item in items.into_iter().rev() {
            result = Value::pair(item, result);
        }
    }
    Ok(result)
}

pub fn p_reverse(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let mut items = args[0].list_to_vec()?;
    items.reverse();
    Ok(Value::list(items))
}

fn nth_tail(list: &Value, k: &Value) -> Result<Value> {
    let k = match &k.datum {
        Datum::Int(i) => i
            .to_usize()
            .ok_or_else(|| LispError::type_error("list too short"))?,
        _ => return Err(LispError::type_error("expecting int as arg1")),
    };
    if !list.is_pair() {
        return Err(LispError::type_error("expecting list as arg0"));
    }

    let mut current = list.clone();
    for _ in 0..k {
        match &current.datum {
            Datum::Pair(cell) => {
                let next = cell.borrow().cdr.clone();
                current = next;
            }
            _ => return Err(LispError::type_error("list too short")),
        }
    }
    Ok(current)
}

/// The sublist obtained by dropping the first k elements.
pub fn p_list_tail(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    nth_tail(&args[0], &args[1])
}

/// The kth element, `(car (list-tail list k))`.
pub fn p_list_ref(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    let tail = nth_tail(&args[0], &args[1])?;
    match tail.datum {
        Datum::Pair(_) => tail.car(),
        _ => Err(LispError::type_error("list too short")),
    }
}

pub fn register(env: &Environment) {
    env.define("p-cons", Value::native_fn(p_cons));
    env.define("p-car", Value::native_fn(p_car));
    env.define("p-cdr", Value::native_fn(p_cdr));
    env.define("p-set-car!", Value::native_fn(p_set_car));
    env.define("p-set-cdr!", Value::native_fn(p_set_cdr));
    env.define("p-length", Value::native_fn(p_length));
    env.define("p-list", Value::native_fn(p_list));
    env.define("p-append", Value::native_fn(p_append));
    env.define("p-reverse", Value::native_fn(p_reverse));
    env.define("p-list-tail", Value::native_fn(p_list_tail));
    env.define("p-list-ref", Value::native_fn(p_list_ref));
}
