//! # Native primitive library
//!
//! Each sub-module covers one category and exposes a `register` function
//! that binds its natives into an environment frame under `p-` names
//! (`p-+`, `p-null?`, …). The user-visible names are bound by the
//! bootstrap source `boot/r5.scm`, which layers the standard environment
//! over the primitive frame.
//!
//! Every native receives the execution context and the already-evaluated
//! argument list, and performs its own arity and type checks.

use crate::env::Environment;
use crate::error::{LispError, Result};
use crate::value::Value;

pub mod chars;
pub mod io;
pub mod lists;
pub mod math;
pub mod predicates;
pub mod reflect;

/// Register the whole primitive library into `env`'s innermost frame.
pub fn register_primitives(env: &Environment) {
    predicates::register(env);
    lists::register(env);
    math::register(env);
    chars::register(env);
    io::register(env);
    reflect::register(env);
}

/// Exact-arity guard shared by the natives.
pub(crate) fn expect_arity(args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        let plural = if n == 1 { "" } else { "s" };
        return Err(LispError::arity(format!(
            "expecting {} argument{}",
            n, plural
        )));
    }
    Ok(())
}
