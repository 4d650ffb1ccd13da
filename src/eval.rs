// ABOUTME: Evaluator: special forms, application, macro expansion, quasiquote

use crate::context::ExecContext;
use crate::env::Environment;
use crate::error::{LispError, Result};
use crate::value::{Callable, Datum, Value};

/// Evaluate one form. Symbols are looked up (raising `lookup` when unbound),
/// other atoms self-evaluate, pairs dispatch on their head for special forms
/// and otherwise map-eval into an application.
pub fn eval(ctx: &mut ExecContext, v: &Value) -> Result<Value> {
    if let Some(name) = v.as_symbol() {
        return ctx
            .env
            .lookup(name)
            .ok_or_else(|| LispError::lookup(format!("undefined symbol '{}'", name)));
    }

    if !v.is_pair() {
        return Ok(v.clone());
    }

    let head = v.car()?;
    let rest = v.cdr()?;

    if let Some(sym) = head.as_symbol() {
        match sym {
            "quote" => return special_quote(&rest),
            "define" => return special_define(ctx, &rest),
            "lambda" => return special_lambda(ctx, v, &rest),
            "defmacro" => return special_defmacro(ctx, &rest),
            "begin" => return special_begin(ctx, &rest),
            "if" => return special_if(ctx, &rest),
            "let" => return special_let(ctx, &rest, false),
            "let*" => return special_let(ctx, &rest, true),
            "quasiquote" => return special_quasiquote(ctx, &rest),
            _ => {}
        }
    }

    // Evaluate every element; the head of the result is the function, the
    // tail the arguments.
    let elements = v.list_to_vec()?;
    let mut evaluated = Vec::with_capacity(elements.len());
    for element in &elements {
        evaluated.push(eval(ctx, element)?);
    }
    let func = evaluated.remove(0);
    apply(ctx, &func, evaluated)
}

/// Evaluate each form of a list in order, returning the last result (null
/// for an empty list).
pub fn sequential_eval(ctx: &mut ExecContext, forms: &Value) -> Result<Value> {
    let mut result = Value::null();
    for form in forms.list_to_vec()? {
        result = eval(ctx, &form)?;
    }
    Ok(result)
}

/// Apply a function value to already-evaluated arguments. The function is
/// pushed on the evaluation stack for the duration; on failure the frame is
/// deliberately left in place so the handler can format a backtrace.
pub fn apply(ctx: &mut ExecContext, func: &Value, args: Vec<Value>) -> Result<Value> {
    let callable = match &func.datum {
        Datum::Fn(c) => c.clone(),
        _ => return Err(LispError::type_error("eval a non-function")),
    };

    ctx.push_eval(func.clone());

    let result = match &*callable {
        Callable::Native(f) => f(ctx, &args),
        Callable::Lambda { formals, body, env } => {
            let frame = Environment::with_parent(env.clone());
            bind_formals(&frame, formals, &args)?;
            ctx.push_env(frame);
            let value = eval(ctx, body)?;
            ctx.pop_env();
            Ok(value)
        }
        Callable::Macro { formals, body, env } => {
            let frame = Environment::with_parent(env.clone());
            bind_formals(&frame, formals, &args)?;
            ctx.push_env(frame);
            // Expand once, then evaluate the expansion under the same
            // extended environment.
            let expansion = eval(ctx, body)?;
            let value = eval(ctx, &expansion)?;
            ctx.pop_env();
            Ok(value)
        }
    };

    match result {
        Ok(v) => {
            ctx.pop_eval();
            Ok(v)
        }
        Err(e) => Err(e),
    }
}

/// Bind a formal list against arguments in the given frame. Shapes:
/// `()` exact-zero, `(a b c)` positional, `(a b . rest)` or a bare symbol
/// for rest-binding.
fn bind_formals(frame: &Environment, formals: &Value, args: &[Value]) -> Result<()> {
    let mut current = formals.clone();
    let mut index = 0;

    loop {
        match &current.datum {
            Datum::Null => {
                if index != args.len() {
                    return Err(LispError::arity("too many arguments"));
                }
                return Ok(());
            }
            Datum::Symbol(name) => {
                frame.define(name, Value::list(args[index..].to_vec()));
                return Ok(());
            }
            Datum::Pair(cell) => {
                let (car, cdr) = {
                    let p = cell.borrow();
                    (p.car.clone(), p.cdr.clone())
                };
                let name = car
                    .as_symbol()
                    .ok_or_else(|| LispError::type_error("unexpected formal type"))?;
                if index >= args.len() {
                    return Err(LispError::arity("not enough arguments"));
                }
                frame.define(name, args[index].clone());
                index += 1;
                current = cdr;
            }
            _ => return Err(LispError::type_error("unexpected formal type")),
        }
    }
}

fn expect_n(rest: &Value, n: usize, msg: &str) -> Result<Vec<Value>> {
    let items = rest
        .list_to_vec()
        .map_err(|_| LispError::syntax(msg.to_string()))?;
    if items.len() != n {
        return Err(LispError::arity(msg.to_string()));
    }
    Ok(items)
}

fn special_quote(rest: &Value) -> Result<Value> {
    let items = expect_n(rest, 1, "quote arity")?;
    Ok(items[0].clone())
}

fn special_define(ctx: &mut ExecContext, rest: &Value) -> Result<Value> {
    let items = expect_n(rest, 2, "define arity")?;

    match &items[0].datum {
        Datum::Symbol(name) => {
            let mut value = eval(ctx, &items[1])?;
            if value.bound.is_none() {
                value.bound = Some(name.clone());
            }
            ctx.env.define(name, value);
            Ok(Value::null())
        }
        // (define (name . formals) body) sugar.
        Datum::Pair(cell) => {
            let (head, formals) = {
                let p = cell.borrow();
                (p.car.clone(), p.cdr.clone())
            };
            let name = head
                .as_symbol()
                .ok_or_else(|| LispError::type_error("cannot define non-symbol"))?
                .to_string();
            check_formals(&formals)?;
            let mut lambda = Value::lambda(formals, items[1].clone(), ctx.env.clone())
                .with_span(items[0].span.clone());
            lambda.bound = Some(name.as_str().into());
            ctx.env.define(&name, lambda);
            Ok(Value::null())
        }
        _ => Err(LispError::type_error("cannot define non-symbol")),
    }
}

fn check_formals(formals: &Value) -> Result<()> {
    match formals.datum {
        Datum::Pair(_) | Datum::Null | Datum::Symbol(_) => Ok(()),
        _ => Err(LispError::type_error(
            "formals must be a list, symbol, or ()",
        )),
    }
}

fn special_lambda(ctx: &mut ExecContext, whole: &Value, rest: &Value) -> Result<Value> {
    let items = expect_n(rest, 2, "lambda arity")?;
    check_formals(&items[0])?;
    Ok(
        Value::lambda(items[0].clone(), items[1].clone(), ctx.env.clone())
            .with_span(whole.span.clone()),
    )
}

fn special_defmacro(ctx: &mut ExecContext, rest: &Value) -> Result<Value> {
    let items = expect_n(rest, 3, "defmacro arity")?;
    let name = items[0]
        .as_symbol()
        .ok_or_else(|| LispError::type_error("defmacro wrong type for name"))?
        .to_string();
    check_formals(&items[1])?;
    let mac = Value::macro_fn(items[1].clone(), items[2].clone(), ctx.env.clone());
    ctx.env.define(&name, mac);
    Ok(Value::null())
}

fn special_begin(ctx: &mut ExecContext, rest: &Value) -> Result<Value> {
    if rest.is_null() {
        return Err(LispError::arity("begin arity"));
    }
    sequential_eval(ctx, rest)
}

fn special_if(ctx: &mut ExecContext, rest: &Value) -> Result<Value> {
    let items = expect_n(rest, 3, "if arity")?;
    let condition = eval(ctx, &items[0])?;
    // Only #f selects the else branch; every other value is true.
    if matches!(condition.datum, Datum::Bool(false)) {
        eval(ctx, &items[2])
    } else {
        eval(ctx, &items[1])
    }
}

fn binding_pair(binding: &Value) -> Result<(String, Value)> {
    let kv = binding
        .list_to_vec()
        .map_err(|_| LispError::type_error("let arg type"))?;
    if kv.len() != 2 {
        return Err(LispError::arity("let arg arity"));
    }
    let name = kv[0]
        .as_symbol()
        .ok_or_else(|| LispError::type_error("let binding name must be a symbol"))?;
    Ok((name.to_string(), kv[1].clone()))
}

fn special_let(ctx: &mut ExecContext, rest: &Value, star: bool) -> Result<Value> {
    let items = expect_n(rest, 2, "let arity")?;
    let bindings = items[0]
        .list_to_vec()
        .map_err(|_| LispError::type_error("let arg type"))?;
    let body = &items[1];

    let frame = Environment::with_parent(ctx.env.clone());

    if star {
        // let*: each init expression sees the bindings before it.
        ctx.push_env(frame.clone());
        for binding in &bindings {
            let (name, init) = binding_pair(binding)?;
            let value = eval(ctx, &init)?;
            frame.define(&name, value);
        }
        let result = eval(ctx, body)?;
        ctx.pop_env();
        Ok(result)
    } else {
        // let: init expressions evaluate in the enclosing environment.
        let mut bound = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            let (name, init) = binding_pair(binding)?;
            let value = eval(ctx, &init)?;
            bound.push((name, value));
        }
        for (name, value) in bound {
            frame.define(&name, value);
        }
        ctx.push_env(frame);
        let result = eval(ctx, body)?;
        ctx.pop_env();
        Ok(result)
    }
}

fn special_quasiquote(ctx: &mut ExecContext, rest: &Value) -> Result<Value> {
    let items = expect_n(rest, 1, "quasiquote arity")?;
    quasiquote(ctx, &items[0])
}

fn head_symbol_is(v: &Value, name: &str) -> bool {
    v.as_pair()
        .map(|cell| {
            cell.borrow()
                .car
                .as_symbol()
                .is_some_and(|s| s == name)
        })
        .unwrap_or(false)
}

/// Walk a quasiquote template one level deep: `(unquote e)` evaluates,
/// children of the form `(unquote-splicing e)` must evaluate to lists and
/// are spliced in place, everything else recurses.
fn quasiquote(ctx: &mut ExecContext, template: &Value) -> Result<Value> {
    if !template.is_pair() {
        return Ok(template.clone());
    }

    if head_symbol_is(template, "unquote") {
        let args = template.cdr()?;
        let items = expect_n(&args, 1, "unquote arity")?;
        return eval(ctx, &items[0]);
    }

    let mut out: Vec<Value> = Vec::new();
    let mut current = template.clone();
    loop {
        match &current.datum {
            Datum::Pair(cell) => {
                let (car, cdr) = {
                    let p = cell.borrow();
                    (p.car.clone(), p.cdr.clone())
                };
                if head_symbol_is(&car, "unquote-splicing") {
                    let args = car.cdr()?;
                    let items = expect_n(&args, 1, "unquote-splicing arity")?;
                    let spliced = eval(ctx, &items[0])?;
                    match spliced.datum {
                        Datum::Null => {}
                        Datum::Pair(_) => {
                            // Copy the elements: never share a tail that is
                            // about to be extended.
                            out.extend(spliced.list_to_vec()?);
                        }
                        _ => {
                            return Err(LispError::type_error(
                                "unquote-splicing expects list",
                            ))
                        }
                    }
                } else {
                    out.push(quasiquote(ctx, &car)?);
                }
                current = cdr;
            }
            Datum::Null => return Ok(Value::list(out)),
            _ => {
                // Improper template tail.
                let tail = quasiquote(ctx, &current)?;
                let mut result = tail;
                for item in out.into_iter().rev() {
                    result = Value::pair(item, result);
                }
                return Ok(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecContext;
    use crate::error::ErrorKind;
    use crate::reader;

    fn ctx() -> ExecContext {
        let mut ctx = ExecContext::new();
        ctx.set_error_hook(Box::new(|_, _| {}));
        ctx
    }

    fn run(ctx: &mut ExecContext, src: &str) -> Result<Value> {
        let forms = reader::parse_string(ctx, src);
        ctx.execute(&forms)
    }

    fn run_ok(src: &str) -> String {
        let mut c = ctx();
        run(&mut c, src).unwrap().write_string()
    }

    fn run_err(src: &str) -> ErrorKind {
        let mut c = ctx();
        run(&mut c, src).unwrap_err().kind
    }

    #[test]
    fn test_atoms_self_evaluate() {
        assert_eq!(run_ok("42"), "42");
        assert_eq!(run_ok("#t"), "#t");
        assert_eq!(run_ok("\"hi\""), "\"hi\"");
    }

    #[test]
    fn test_unbound_symbol_raises_lookup() {
        assert_eq!(run_err("nowhere-bound"), ErrorKind::Lookup);
    }

    #[test]
    fn test_quote() {
        assert_eq!(run_ok("(quote (1 2 3))"), "(1 2 3)");
        assert_eq!(run_ok("'sym"), "sym");
        assert_eq!(run_err("(quote 1 2)"), ErrorKind::Arity);
    }

    #[test]
    fn test_define_and_lookup() {
        let mut c = ctx();
        let v = run(&mut c, "(define x 42)").unwrap();
        assert!(v.is_null());
        assert_eq!(run(&mut c, "x").unwrap().write_string(), "42");
    }

    #[test]
    fn test_define_stamps_bound() {
        let mut c = ctx();
        run(&mut c, "(define f (lambda (x) x))").unwrap();
        let f = c.env.lookup("f").unwrap();
        assert_eq!(f.bound.as_deref(), Some("f"));
    }

    #[test]
    fn test_define_function_sugar() {
        let mut c = ctx();
        run(&mut c, "(define (twice x) (* 2 x))").unwrap();
        assert_eq!(run(&mut c, "(twice 21)").unwrap().write_string(), "42");
    }

    #[test]
    fn test_lambda_application() {
        assert_eq!(run_ok("((lambda (x) x) 42)"), "42");
        assert_eq!(run_ok("((lambda (x y) (+ x y)) 1 2)"), "3");
        assert_eq!(run_ok("((lambda () 9))"), "9");
    }

    #[test]
    fn test_lambda_rest_args() {
        assert_eq!(run_ok("((lambda (x . rest) (length rest)) 1 2 3 4)"), "3");
        assert_eq!(run_ok("((lambda args (length args)) 1 2 3)"), "3");
        assert_eq!(run_ok("((lambda (x . rest) rest) 1)"), "()");
    }

    #[test]
    fn test_arity_errors() {
        assert_eq!(run_err("((lambda (x) x))"), ErrorKind::Arity);
        assert_eq!(run_err("((lambda (x) x) 1 2)"), ErrorKind::Arity);
        assert_eq!(run_err("((lambda () 1) 9)"), ErrorKind::Arity);
    }

    #[test]
    fn test_apply_non_function_is_type_error() {
        assert_eq!(run_err("(4 5)"), ErrorKind::Type);
    }

    #[test]
    fn test_closures_capture_environment() {
        let mut c = ctx();
        run(&mut c, "(define (make-adder n) (lambda (x) (+ x n)))").unwrap();
        run(&mut c, "(define add5 (make-adder 5))").unwrap();
        assert_eq!(run(&mut c, "(add5 10)").unwrap().write_string(), "15");
    }

    #[test]
    fn test_recursion() {
        let mut c = ctx();
        run(
            &mut c,
            "(define (fact n) (if (= n 0) 1 (* n (fact (- n 1)))))",
        )
        .unwrap();
        assert_eq!(run(&mut c, "(fact 10)").unwrap().write_string(), "3628800");
    }

    #[test]
    fn test_begin() {
        assert_eq!(run_ok("(begin 1 2 3)"), "3");
        assert_eq!(run_err("(begin)"), ErrorKind::Arity);
    }

    #[test]
    fn test_if_only_false_is_false() {
        assert_eq!(run_ok("(if #t 1 2)"), "1");
        assert_eq!(run_ok("(if #f 1 2)"), "2");
        // Any non-#f value selects the then branch, including 0 and ().
        assert_eq!(run_ok("(if 0 1 2)"), "1");
        assert_eq!(run_ok("(if '() 1 2)"), "1");
        assert_eq!(run_err("(if #t 1)"), ErrorKind::Arity);
    }

    #[test]
    fn test_let_binds_in_enclosing_env() {
        assert_eq!(run_ok("(let ((x 2) (y 3)) (* x y))"), "6");

        // The init of y must not see the new x.
        let mut c = ctx();
        run(&mut c, "(define x 10)").unwrap();
        assert_eq!(
            run(&mut c, "(let ((x 1) (y x)) y)").unwrap().write_string(),
            "10"
        );
    }

    #[test]
    fn test_let_star_sees_earlier_bindings() {
        assert_eq!(run_ok("(let* ((x 2) (y (* x 3))) y)"), "6");
    }

    #[test]
    fn test_let_shadowing_restored() {
        let mut c = ctx();
        run(&mut c, "(define x 1)").unwrap();
        assert_eq!(run(&mut c, "(let ((x 2)) x)").unwrap().write_string(), "2");
        assert_eq!(run(&mut c, "x").unwrap().write_string(), "1");
    }

    #[test]
    fn test_quasiquote_plain() {
        assert_eq!(run_ok("`(1 2 3)"), "(1 2 3)");
        assert_eq!(run_ok("`x"), "x");
    }

    #[test]
    fn test_quasiquote_unquote() {
        assert_eq!(run_ok("`(1 ,(+ 1 1) 3)"), "(1 2 3)");
        assert_eq!(run_ok("`(a (b ,(+ 1 2)))"), "(a (b 3))");
    }

    #[test]
    fn test_quasiquote_splicing() {
        assert_eq!(run_ok("`(1 ,(+ 1 1) ,@(list 3 4) 5)"), "(1 2 3 4 5)");
        assert_eq!(run_ok("`(,@(list 1 2))"), "(1 2)");
        assert_eq!(run_ok("`(a ,@'() b)"), "(a b)");
        assert_eq!(run_err("`(1 ,@2)"), ErrorKind::Type);
    }

    #[test]
    fn test_defmacro() {
        let mut c = ctx();
        run(&mut c, "(defmacro swap (a b) `(list ,b ,a))").unwrap();
        assert_eq!(run(&mut c, "(swap 1 2)").unwrap().write_string(), "(2 1)");
    }

    #[test]
    fn test_macro_arguments_are_pre_evaluated() {
        let mut c = ctx();
        // The whole call form is map-evaluated before dispatch, so macro
        // formals bind the already-evaluated arguments.
        run(&mut c, "(defmacro keep (form) `(quote ,form))").unwrap();
        assert_eq!(run(&mut c, "(keep (+ 1 2))").unwrap().write_string(), "3");
    }

    #[test]
    fn test_macro_expansion_is_evaluated() {
        let mut c = ctx();
        // The expansion (<fn> 3 '()) is itself evaluated, so the macro call
        // produces the cons cell, not the expansion form.
        run(&mut c, "(defmacro wrap (v) `(cons ,v '()))").unwrap();
        assert_eq!(run(&mut c, "(wrap 3)").unwrap().write_string(), "(3)");
    }

    #[test]
    fn test_formal_binding_shapes() {
        // Dotted formals bind positionally then collect the rest.
        assert_eq!(
            run_ok("((lambda (a b . rest) (list a b rest)) 1 2 3 4)"),
            "(1 2 (3 4))"
        );
        assert_eq!(
            run_ok("((lambda (a b . rest) rest) 1 2)"),
            "()"
        );
        assert_eq!(run_err("((lambda (a b . rest) rest) 1)"), ErrorKind::Arity);
    }
}
