// ABOUTME: Execution context: env/exception/eval stacks, error hook, top-level execute

use crate::builtins;
use crate::env::Environment;
use crate::error::{LispError, Result};
use crate::eval;
use crate::hash::KeyedTable;
use crate::reader;
use crate::value::{Datum, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// The bootstrap source that builds the user-visible standard environment
/// over the `p-` primitive layer.
const BOOTSTRAP: &str = include_str!("boot/r5.scm");

thread_local! {
    /// The bootstrapped base frame, built once per thread and shared by
    /// every session environment layered over it.
    static BASE_FRAME: RefCell<Option<Rc<RefCell<KeyedTable>>>> =
        const { RefCell::new(None) };
}

pub type ErrorHook = Box<dyn Fn(&ExecContext, &LispError)>;

/// One active application, kept for backtraces. The function value carries
/// its own span and `bound` name.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub target: Value,
}

/// A registered non-local-exit target: enough state to restore the context
/// to the moment the handler was pushed.
struct Handler {
    env_depth: usize,
    eval_depth: usize,
    env: Rc<Environment>,
}

/// The per-session machine the evaluator runs against: current environment,
/// the three stacks, the last failure, and the error-emit hook.
pub struct ExecContext {
    pub env: Rc<Environment>,
    env_stack: Vec<Rc<Environment>>,
    ex_stack: Vec<Handler>,
    eval_stack: Vec<CallFrame>,
    pub last_error: Option<LispError>,
    emit: ErrorHook,
}

fn default_error_hook(ctx: &ExecContext, err: &LispError) {
    eprintln!("{} error: {}", err.kind, err.message);
    eprint!("{}", ctx.backtrace());
}

/// Build the primitive frame, layer a fresh frame over it, and run the
/// bootstrap source. The primitive layer drops away afterwards; only the
/// bootstrap frame (whose closures still capture the primitives) survives.
fn build_base_frame() -> Rc<RefCell<KeyedTable>> {
    let prim = Environment::new();
    builtins::register_primitives(&prim);

    let boot = Environment::with_parent(prim);
    let mut ctx = ExecContext::with_env(boot.clone());

    let forms = reader::parse_string(&mut ctx, BOOTSTRAP);
    match forms.datum {
        Datum::Err(_) => {
            eprintln!("warning: failed to parse bootstrap environment");
        }
        _ => {
            if let Err(e) = eval::sequential_eval(&mut ctx, &forms) {
                eprintln!("warning: failed to load bootstrap environment: {}", e);
            }
        }
    }

    boot.frame()
}

/// The cached default starting environment: the bootstrap frame, shared.
/// Callers layer their own writable frame over it.
pub fn default_environment() -> Rc<Environment> {
    BASE_FRAME.with(|cell| {
        let mut slot = cell.borrow_mut();
        let frame = slot.get_or_insert_with(build_base_frame).clone();
        Environment::from_frame(frame)
    })
}

impl ExecContext {
    /// A fresh session: a writable frame layered over the cached default
    /// environment, with the backtrace-printing error hook.
    pub fn new() -> Self {
        ExecContext::with_env(Environment::with_parent(default_environment()))
    }

    /// A context over an explicit environment.
    pub fn with_env(env: Rc<Environment>) -> Self {
        ExecContext {
            env,
            env_stack: Vec::new(),
            ex_stack: Vec::new(),
            eval_stack: Vec::new(),
            last_error: None,
            emit: Box::new(default_error_hook),
        }
    }

    /// An empty context with a silent error hook. Used by tests that drive
    /// components directly without the standard environment.
    pub fn bare() -> Self {
        let mut ctx = ExecContext::with_env(Environment::new());
        ctx.emit = Box::new(|_, _| {});
        ctx
    }

    /// Replace the error-emit hook.
    pub fn set_error_hook(&mut self, hook: ErrorHook) {
        self.emit = hook;
    }

    pub fn push_env(&mut self, env: Rc<Environment>) {
        self.env_stack.push(self.env.clone());
        self.env = env;
    }

    pub fn pop_env(&mut self) {
        if let Some(prev) = self.env_stack.pop() {
            self.env = prev;
        }
    }

    pub fn push_eval(&mut self, target: Value) {
        self.eval_stack.push(CallFrame { target });
    }

    pub fn pop_eval(&mut self) {
        self.eval_stack.pop();
    }

    pub fn eval_depth(&self) -> usize {
        self.eval_stack.len()
    }

    /// Register a non-local-exit target at the current stack depths.
    pub fn push_handler(&mut self) {
        self.ex_stack.push(Handler {
            env_depth: self.env_stack.len(),
            eval_depth: self.eval_stack.len(),
            env: self.env.clone(),
        });
    }

    pub fn pop_handler(&mut self) {
        self.ex_stack.pop();
    }

    /// Unwind to the most recently pushed handler: restore its environment
    /// and truncate the env/eval stacks to the recorded depths.
    pub fn unwind(&mut self) {
        if let Some(h) = self.ex_stack.pop() {
            self.env = h.env;
            self.env_stack.truncate(h.env_depth);
            self.eval_stack.truncate(h.eval_depth);
        }
    }

    /// Record a failure and call the emit hook once.
    pub fn record_and_emit(&mut self, err: LispError) {
        self.last_error = Some(err.clone());
        (self.emit)(self, &err);
    }

    /// Format the evaluation stack innermost-to-outermost.
    pub fn backtrace(&self) -> String {
        let mut out = String::new();
        for (index, frame) in self.eval_stack.iter().rev().enumerate() {
            let target = &frame.target;
            let mut line = match &target.datum {
                Datum::Fn(c) if c.is_native() => "built-in function".to_string(),
                Datum::Fn(_) => {
                    let origin = match &target.span.file {
                        Some(f) => {
                            format!("{}:{}:{}", f, target.span.row, target.span.col)
                        }
                        None => "built-in".to_string(),
                    };
                    format!("lambda, declared at {}", origin)
                }
                _ => target.type_name().to_string(),
            };
            if let Some(bound) = &target.bound {
                line.push_str(&format!(", bound to '{}'", bound));
            }
            out.push_str(&format!("{}: {}\n", index, line));
        }
        out
    }

    /// Top-level driver: reset the per-run stacks, register a handler, and
    /// sequentially evaluate a list of forms. An uncaught failure is
    /// recorded, emitted exactly once, and unwound; the error is returned
    /// so callers can map it to an exit code.
    pub fn execute(&mut self, forms: &Value) -> Result<Value> {
        self.ex_stack.clear();
        self.eval_stack.clear();
        self.last_error = None;

        self.push_handler();
        match eval::sequential_eval(self, forms) {
            Ok(v) => {
                self.pop_handler();
                Ok(v)
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                (self.emit)(self, &e);
                self.unwind();
                Err(e)
            }
        }
    }
}

impl Default for ExecContext {
    fn default() -> Self {
        ExecContext::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn run(ctx: &mut ExecContext, src: &str) -> Result<Value> {
        let forms = reader::parse_string(ctx, src);
        ctx.execute(&forms)
    }

    fn quiet() -> ExecContext {
        let mut ctx = ExecContext::new();
        ctx.set_error_hook(Box::new(|_, _| {}));
        ctx
    }

    #[test]
    fn test_default_environment_has_user_names() {
        let env = default_environment();
        assert!(env.lookup("+").is_some());
        assert!(env.lookup("car").is_some());
        assert!(env.lookup("null?").is_some());
    }

    #[test]
    fn test_sessions_do_not_leak_into_base() {
        let mut a = quiet();
        run(&mut a, "(define session-only 1)").unwrap();
        let b = ExecContext::new();
        assert!(b.env.lookup("session-only").is_none());
    }

    #[test]
    fn test_execute_returns_last_value() {
        let mut ctx = quiet();
        let v = run(&mut ctx, "1 2 3").unwrap();
        assert_eq!(v.write_string(), "3");
    }

    #[test]
    fn test_execute_records_error_and_unwinds() {
        let mut ctx = quiet();
        let err = run(&mut ctx, "(car '())").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(ctx.last_error.as_ref().map(|e| e.kind), Some(ErrorKind::Type));
        assert_eq!(ctx.eval_depth(), 0);
    }

    #[test]
    fn test_error_hook_called_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        let count = Rc::new(Cell::new(0));
        let seen = count.clone();

        let mut ctx = ExecContext::new();
        ctx.set_error_hook(Box::new(move |_, _| {
            seen.set(seen.get() + 1);
        }));

        let _ = run(&mut ctx, "(undefined-symbol)");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_backtrace_names_bound_lambda() {
        let mut ctx = quiet();
        run(&mut ctx, "(define (boom x) (car x))").unwrap();

        let forms = reader::parse_string(&mut ctx, "(boom 4)");
        let mut trace = String::new();
        {
            // Capture the backtrace from inside the hook, where the eval
            // stack is still populated.
            use std::cell::RefCell;
            use std::rc::Rc;
            let captured: Rc<RefCell<String>> = Rc::new(RefCell::new(String::new()));
            let sink = captured.clone();
            ctx.set_error_hook(Box::new(move |c, _| {
                *sink.borrow_mut() = c.backtrace();
            }));
            let _ = ctx.execute(&forms);
            trace.push_str(&captured.borrow());
        }
        assert!(trace.contains("bound to 'boom'"), "trace was: {}", trace);
        assert!(trace.contains("lambda, declared at"), "trace was: {}", trace);
    }

    #[test]
    fn test_env_restored_after_error_in_let() {
        let mut ctx = quiet();
        run(&mut ctx, "(define x 1)").unwrap();
        let _ = run(&mut ctx, "(let ((x 2)) (car x))");
        // The handler restored the session environment.
        let v = run(&mut ctx, "x").unwrap();
        assert_eq!(v.write_string(), "1");
    }
}
