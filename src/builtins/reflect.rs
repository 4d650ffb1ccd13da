//! Reflection and control natives: inspect, gensym, load, eval, apply,
//! map, assert, warn.

use super::expect_arity;
use crate::context::ExecContext;
use crate::env::Environment;
use crate::error::{ErrorKind, LispError, Result};
use crate::eval;
use crate::reader;
use crate::value::{Datum, Value};
use std::cell::Cell;

thread_local! {
    static GENSYM_COUNTER: Cell<u64> = const { Cell::new(0) };
}

/// `(inspect v)`: a one-line description of a value's type, origin, and
/// binding.
pub fn p_inspect(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let arg = &args[0];

    let mut out = String::from("type: ");
    let mut show_line = true;

    match &arg.datum {
        Datum::Fn(c) if c.is_native() => {
            out.push_str("built-in function");
            show_line = false;
        }
        Datum::Fn(_) => out.push_str("lambda, declared at"),
        _ => out.push_str(arg.type_name()),
    }

    if show_line {
        match &arg.span.file {
            Some(f) => out.push_str(&format!(" {}:{}:{}", f, arg.span.row, arg.span.col)),
            None => out.push_str(" <synthetic>:0:0"),
        }
    }

    if let Some(bound) = &arg.bound {
        out.push_str(&format!(", bound to: {}", bound));
    }

    Ok(Value::string(&out))
}

/// `(gensym)`: a fresh symbol from a monotonic counter.
pub fn p_gensym(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 0)?;
    let n = GENSYM_COUNTER.with(|c| {
        let n = c.get();
        c.set(n + 1);
        n
    });
    Ok(Value::symbol(&format!("<gensym-{:05}>", n)))
}

/// `(load file)`: parse the whole file, then evaluate its forms in order.
/// Both parse and eval errors propagate to the caller.
pub fn p_load(ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let path = args[0]
        .as_string()
        .ok_or_else(|| LispError::type_error("filename must be string"))?
        .to_string();
    let forms = reader::parse_file_forms(&path)?;
    eval::sequential_eval(ctx, &forms)
}

/// `(eval form)`: evaluate a form in the current environment.
pub fn p_eval(ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    eval::eval(ctx, &args[0])
}

/// `(apply f args)`: call a function with a list of arguments.
pub fn p_apply(ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    let call_args = args[1]
        .list_to_vec()
        .map_err(|_| LispError::type_error("apply to non-list"))?;
    eval::apply(ctx, &args[0], call_args)
}

/// `(map f list)`: apply a function to each element, collecting the
/// results.
pub fn p_map(ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 2)?;
    if !matches!(args[0].datum, Datum::Fn(_)) {
        return Err(LispError::type_error("map with non-function"));
    }
    let items = args[1]
        .list_to_vec()
        .map_err(|_| LispError::type_error("map to non-list"))?;

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(eval::apply(ctx, &args[0], vec![item])?);
    }
    Ok(Value::list(out))
}

/// `(assert bool)`: raise `raise` when the condition is false.
pub fn p_assert(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    match args[0].datum {
        Datum::Bool(true) => Ok(Value::null()),
        Datum::Bool(false) => Err(LispError::new(ErrorKind::Raise, "assertion failed")),
        _ => Err(LispError::type_error("assert not bool")),
    }
}

/// `(warn bool)`: like assert but raises `warn`.
pub fn p_warn(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    match args[0].datum {
        Datum::Bool(true) => Ok(Value::null()),
        Datum::Bool(false) => Err(LispError::new(ErrorKind::Warn, "warning raised")),
        _ => Err(LispError::type_error("warn not bool")),
    }
}

pub fn register(env: &Environment) {
    env.define("p-inspect", Value::native_fn(p_inspect));
    env.define("p-gensym", Value::native_fn(p_gensym));
    env.define("p-load", Value::native_fn(p_load));
    env.define("p-eval", Value::native_fn(p_eval));
    env.define("p-apply", Value::native_fn(p_apply));
    env.define("p-map", Value::native_fn(p_map));
    env.define("p-assert", Value::native_fn(p_assert));
    env.define("p-warn", Value::native_fn(p_warn));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecContext {
        let mut c = ExecContext::new();
        c.set_error_hook(Box::new(|_, _| {}));
        c
    }

    #[test]
    fn test_gensym_is_monotonic() {
        let mut c = ctx();
        let a = p_gensym(&mut c, &[]).unwrap();
        let b = p_gensym(&mut c, &[]).unwrap();
        assert_ne!(a.write_string(), b.write_string());
        assert!(a.write_string().starts_with("<gensym-"));
    }

    #[test]
    fn test_eval_native() {
        let mut c = ctx();
        let form = Value::list(vec![Value::symbol("+"), Value::int(1), Value::int(2)]);
        let v = p_eval(&mut c, &[form]).unwrap();
        assert_eq!(v.write_string(), "3");
    }

    #[test]
    fn test_apply_native() {
        let mut c = ctx();
        let f = c.env.lookup("+").unwrap();
        let args_list = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        let v = p_apply(&mut c, &[f, args_list]).unwrap();
        assert_eq!(v.write_string(), "6");
    }

    #[test]
    fn test_map_applies_elementwise() {
        let mut c = ctx();
        let forms = reader::parse_string(&mut c, "(map (lambda (x) (* x x)) '(1 2 3))");
        let v = c.execute(&forms).unwrap();
        assert_eq!(v.write_string(), "(1 4 9)");
    }

    #[test]
    fn test_map_empty_list() {
        let mut c = ctx();
        let f = c.env.lookup("+").unwrap();
        let v = p_map(&mut c, &[f, Value::null()]).unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn test_assert_and_warn_kinds() {
        let mut c = ctx();
        assert!(p_assert(&mut c, &[Value::bool(true)]).unwrap().is_null());
        let err = p_assert(&mut c, &[Value::bool(false)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Raise);
        let err = p_warn(&mut c, &[Value::bool(false)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Warn);
        let err = p_assert(&mut c, &[Value::int(1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_inspect_output() {
        let mut c = ctx();
        let v = p_inspect(&mut c, &[Value::int(3)]).unwrap();
        assert!(v.display_string().starts_with("type: int"));

        let f = c.env.lookup("car").unwrap();
        let v = p_inspect(&mut c, &[f]).unwrap();
        assert!(v.display_string().contains("built-in function"));
    }

    #[test]
    fn test_load_missing_file_propagates() {
        let mut c = ctx();
        let err = p_load(&mut c, &[Value::string("/no/such/file.scm")]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::System);
    }

    #[test]
    fn test_load_evaluates_file() {
        let mut c = ctx();
        let dir = std::env::temp_dir();
        let path = dir.join("minilisp-load-test.scm");
        std::fs::write(&path, "(define loaded-value 42)\nloaded-value\n").unwrap();

        let v = p_load(&mut c, &[Value::string(&path.to_string_lossy())]).unwrap();
        assert_eq!(v.write_string(), "42");
        assert!(c.env.lookup("loaded-value").is_some());

        let _ = std::fs::remove_file(&path);
    }
}
