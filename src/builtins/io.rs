//! Port and output natives: predicates, open/close, read-char, peek-char,
//! read, display, format, string output ports.

use super::expect_arity;
use crate::context::ExecContext;
use crate::env::Environment;
use crate::error::{LispError, Result};
use crate::port::Port;
use crate::reader;
use crate::value::{Datum, Value};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

fn port_of(v: &Value) -> Result<Rc<RefCell<Port>>> {
    match &v.datum {
        Datum::Port(p) => Ok(p.clone()),
        _ => Err(LispError::type_error("expecting port")),
    }
}

fn input_port_of(v: &Value) -> Result<Rc<RefCell<Port>>> {
    let port = port_of(v)?;
    if !port.borrow().is_input() {
        return Err(LispError::type_error("expecting input port"));
    }
    Ok(port)
}

fn string_arg(v: &Value, what: &str) -> Result<String> {
    v.as_string()
        .map(str::to_string)
        .ok_or_else(|| LispError::type_error(what.to_string()))
}

pub fn p_input_portp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let is_input = match &args[0].datum {
        Datum::Port(p) => p.borrow().is_input(),
        _ => false,
    };
    Ok(Value::bool(is_input))
}

pub fn p_output_portp(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let is_output = match &args[0].datum {
        Datum::Port(p) => p.borrow().is_output(),
        _ => false,
    };
    Ok(Value::bool(is_output))
}

pub fn p_open_input_file(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let path = string_arg(&args[0], "filename requires string")?;
    Ok(Value::port(Port::open_input_file(&path)?))
}

pub fn p_open_output_file(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let path = string_arg(&args[0], "filename requires string")?;
    Ok(Value::port(Port::open_output_file(&path)?))
}

pub fn p_open_input_string(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let text = string_arg(&args[0], "expecting string")?;
    Ok(Value::port(Port::open_input_string(&text)))
}

pub fn p_open_output_string(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 0)?;
    Ok(Value::port(Port::open_output_string()))
}

pub fn p_get_output_string(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let port = port_of(&args[0])?;
    let text = port.borrow().output_string()?;
    Ok(Value::string(&text))
}

pub fn p_close_input_port(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let port = port_of(&args[0])?;
    if !port.borrow().is_input() {
        return Err(LispError::type_error("not an input port"));
    }
    port.borrow_mut().close();
    Ok(Value::null())
}

pub fn p_close_output_port(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let port = port_of(&args[0])?;
    if !port.borrow().is_output() {
        return Err(LispError::type_error("not an output port"));
    }
    port.borrow_mut().close();
    Ok(Value::null())
}

/// `(read-char port)`: the next character, or null at end of input.
pub fn p_read_char(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let port = input_port_of(&args[0])?;
    let c = port.borrow_mut().read_char()?;
    Ok(match c {
        Some(c) => Value::char(c),
        None => Value::null(),
    })
}

/// `(peek-char port)`: like read-char but leaves the character buffered.
pub fn p_peek_char(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let port = input_port_of(&args[0])?;
    let c = port.borrow_mut().peek_char()?;
    Ok(match c {
        Some(c) => Value::char(c),
        None => Value::null(),
    })
}

/// `(read port)`: parse one datum from the port.
pub fn p_read(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    let port = input_port_of(&args[0])?;
    reader::parse(&port)
}

/// `(display v)`: print the display form to stdout.
pub fn p_display(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    expect_arity(args, 1)?;
    print!("{}", args[0].display_string());
    let _ = std::io::stdout().flush();
    Ok(Value::null())
}

/// `(format fmt args ...)`: build a string from a `~`-directive template.
/// `~A` is the display form, `~S` the write form, `~~` a literal tilde,
/// `~%` a newline. Unconsumed or missing arguments are arity errors.
pub fn p_format(_ctx: &mut ExecContext, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(LispError::arity("expecting format string"));
    }
    let template = string_arg(&args[0], "bad format specifier")?;

    let mut out = String::new();
    let mut rest = &args[1..];
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('A') => {
                let (value, more) = rest
                    .split_first()
                    .ok_or_else(|| LispError::arity("insufficient args"))?;
                out.push_str(&value.display_string());
                rest = more;
            }
            Some('S') => {
                let (value, more) = rest
                    .split_first()
                    .ok_or_else(|| LispError::arity("insufficient args"))?;
                out.push_str(&value.write_string());
                rest = more;
            }
            Some('~') => out.push('~'),
            Some('%') => out.push('\n'),
            _ => return Err(LispError::syntax("bad format specifier")),
        }
    }

    if !rest.is_empty() {
        return Err(LispError::arity("too many args for format"));
    }

    Ok(Value::string(&out))
}

pub fn register(env: &Environment) {
    env.define("p-input-port?", Value::native_fn(p_input_portp));
    env.define("p-output-port?", Value::native_fn(p_output_portp));
    env.define("p-open-input-file", Value::native_fn(p_open_input_file));
    env.define("p-open-output-file", Value::native_fn(p_open_output_file));
    env.define("p-open-input-string", Value::native_fn(p_open_input_string));
    env.define("p-open-output-string", Value::native_fn(p_open_output_string));
    env.define("p-get-output-string", Value::native_fn(p_get_output_string));
    env.define("p-close-input-port", Value::native_fn(p_close_input_port));
    env.define("p-close-output-port", Value::native_fn(p_close_output_port));
    env.define("p-read-char", Value::native_fn(p_read_char));
    env.define("p-peek-char", Value::native_fn(p_peek_char));
    env.define("p-read", Value::native_fn(p_read));
    env.define("p-display", Value::native_fn(p_display));
    env.define("p-format", Value::native_fn(p_format));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::Sentinel;

    fn ctx() -> ExecContext {
        ExecContext::bare()
    }

    fn input(text: &str) -> Value {
        Value::port(Port::open_input_string(text))
    }

    #[test]
    fn test_port_predicates() {
        let mut c = ctx();
        let p = input("x");
        assert_eq!(
            p_input_portp(&mut c, &[p.clone()]).unwrap().write_string(),
            "#t"
        );
        assert_eq!(p_output_portp(&mut c, &[p]).unwrap().write_string(), "#f");
        assert_eq!(
            p_input_portp(&mut c, &[Value::int(1)]).unwrap().write_string(),
            "#f"
        );
    }

    #[test]
    fn test_read_and_peek_char() {
        let mut c = ctx();
        let p = input("ab");
        let peeked = p_peek_char(&mut c, &[p.clone()]).unwrap();
        assert!(matches!(peeked.datum, Datum::Char(b'a')));
        let read = p_read_char(&mut c, &[p.clone()]).unwrap();
        assert!(matches!(read.datum, Datum::Char(b'a')));
        p_read_char(&mut c, &[p.clone()]).unwrap();
        // End of input reads as null.
        assert!(p_read_char(&mut c, &[p]).unwrap().is_null());
    }

    #[test]
    fn test_read_parses_data() {
        let mut c = ctx();
        let p = input("(+ 1 2) next");
        let form = p_read(&mut c, &[p.clone()]).unwrap();
        assert_eq!(form.write_string(), "(+ 1 2)");
        let next = p_read(&mut c, &[p.clone()]).unwrap();
        assert_eq!(next.write_string(), "next");
        let end = p_read(&mut c, &[p]).unwrap();
        assert!(matches!(end.datum, Datum::Err(Sentinel::Eof)));
    }

    #[test]
    fn test_output_string_ports() {
        let mut c = ctx();
        let p = p_open_output_string(&mut c, &[]).unwrap();
        let rc = port_of(&p).unwrap();
        rc.borrow_mut().write_str("written").unwrap();
        let s = p_get_output_string(&mut c, &[p]).unwrap();
        assert_eq!(s.write_string(), "\"written\"");
    }

    #[test]
    fn test_close_direction_checks() {
        let mut c = ctx();
        let p = input("x");
        let err = p_close_output_port(&mut c, &[p.clone()]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
        p_close_input_port(&mut c, &[p]).unwrap();
    }

    #[test]
    fn test_format_directives() {
        let mut c = ctx();
        let v = p_format(
            &mut c,
            &[
                Value::string("~A and ~S~%tilde: ~~"),
                Value::string("raw"),
                Value::string("quoted"),
            ],
        )
        .unwrap();
        assert_eq!(
            v.display_string(),
            "raw and \"quoted\"\ntilde: ~"
        );
    }

    #[test]
    fn test_format_arity_errors() {
        let mut c = ctx();
        let err = p_format(&mut c, &[Value::string("~A")]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);

        let err = p_format(
            &mut c,
            &[Value::string("no directives"), Value::int(1)],
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);

        let err = p_format(&mut c, &[Value::string("~Q"), Value::int(1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }
}
