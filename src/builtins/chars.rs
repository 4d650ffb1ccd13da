//! Character natives: char?, the comparison family, char->integer.

use super::expect_arity;
use crate::context::ExecContext;
use crate::env::Environment;
use crate::error::{LispError, Result};
use crate::value::{Datum, Value};

#[derive(Debug, Clone, Copy)]
enum CharComp {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

pub fn p_charp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    Ok(Value::bool(matches!(args[0].datum, Datum::Char(_))))
}

fn char_comp(args: &[Value], how: CharComp) -> Result<Value> {
    expect_arity(args, 2)?;
    let (a, b) = match (&args[0].datum, &args[1].datum) {
        (Datum::Char(a), Datum::Char(b)) => (*a, *b),
        _ => return Err(LispError::type_error("expecting char types")),
    };

    let result = match how {
        CharComp::Eq => a == b,
        CharComp::Lt => a < b,
        CharComp::Gt => a > b,
        CharComp::Le => a <= b,
        CharComp::Ge => a >= b,
    };
    Ok(Value::bool(result))
}

pub fn p_charequalp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    char_comp(args, CharComp::Eq)
}

pub fn p_charltp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    char_comp(args, CharComp::Lt)
}

pub fn p_chargtp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    char_comp(args, CharComp::Gt)
}

pub fn p_charltep(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    char_comp(args, CharComp::Le)
}

pub fn p_chargtep(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    char_comp(args, CharComp::Ge)
}

pub fn p_char_integer(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    match args[0].datum {
        Datum::Char(c) => Ok(Value::int(c as i64)),
        _ => Err(LispError::type_error("expecting char type")),
    }
}

pub fn register(env: &Environment) {
    env.define("p-char?", Value::native_fn(p_charp));
    env.define("p-char=?", Value::native_fn(p_charequalp));
    env.define("p-char<?", Value::native_fn(p_charltp));
    env.define("p-char>?", Value::native_fn(p_chargtp));
    env.define("p-char<=?", Value::native_fn(p_charltep));
    env.define("p-char>=?", Value::native_fn(p_chargtep));
    env.define("p-char->integer", Value::native_fn(p_char_integer));
}
