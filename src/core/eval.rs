//! Sandboxed script evaluation behind the `eval` admin command.
//!
//! Scripts run on a raw `rhai` engine: no standard packages, no module resolver and
//! only a handful of registered math helpers, so a script cannot reach the process,
//! the network or the bot state. Operation count, call depth, expression depth and
//! value sizes are bounded. The value of the last statement is the result.
//!
//! ```
//! use academy_bot::core::eval::evaluate;
//!
//! let value = evaluate("let a = 1 + 2; let b = a * 2; a + b").unwrap();
//! assert_eq!(value, "9");
//! ```

use crate::errors::{Error, Result};
use rhai::{Dynamic, Engine, EvalAltResult, FLOAT, INT, ImmutableString, Position};

/// Longest accepted input, in characters.
pub const MAX_INPUT_LENGTH: usize = 4000;
/// Operations a script may run before it is aborted.
pub const MAX_OPERATIONS: u64 = 100_000;
/// Deepest nesting of function calls.
pub const MAX_CALL_LEVELS: usize = 16;
/// Deepest nesting of expressions, at global level and inside functions.
pub const MAX_EXPR_DEPTHS: (usize, usize) = (64, 32);
/// Largest string a script may build.
pub const MAX_STRING_SIZE: usize = 10_000;
/// Largest array or map a script may build.
pub const MAX_COLLECTION_SIZE: usize = 1_000;

type FnResult<T> = std::result::Result<T, Box<EvalAltResult>>;

/// Evaluates `source` and renders the value of its last statement.
///
/// Strings are rendered quoted, a script ending in a statement renders as `()`.
pub fn evaluate(source: &str) -> Result<String> {
    if source.chars().count() > MAX_INPUT_LENGTH {
        return Err(Error::Eval {
            message: format!("input is longer than {MAX_INPUT_LENGTH} characters"),
        });
    }

    let value = sandbox()
        .eval::<Dynamic>(source)
        .map_err(|e| Error::Eval {
            message: e.to_string(),
        })?;

    if value.is_unit() {
        return Ok("()".to_string());
    }
    Ok(match value.clone().try_cast::<ImmutableString>() {
        Some(text) => format!("{:?}", text.as_str()),
        None => value.to_string(),
    })
}

/// Engine with limits and the registered math helpers.
fn sandbox() -> Engine {
    let mut engine = Engine::new_raw();
    engine
        .set_max_operations(MAX_OPERATIONS)
        .set_max_call_levels(MAX_CALL_LEVELS)
        .set_max_expr_depths(MAX_EXPR_DEPTHS.0, MAX_EXPR_DEPTHS.1)
        .set_max_string_size(MAX_STRING_SIZE)
        .set_max_array_size(MAX_COLLECTION_SIZE)
        .set_max_map_size(MAX_COLLECTION_SIZE)
        // registered `%` overloads must win over the built-in truncating remainder
        .set_fast_operators(false);

    engine
        .register_fn("%", floored_rem)
        .register_fn("%", floored_rem_float)
        .register_fn("%", |a: INT, b: FLOAT| floored_rem_float(to_float(a), b))
        .register_fn("%", |a: FLOAT, b: INT| floored_rem_float(a, to_float(b)))
        .register_fn("abs", INT::saturating_abs)
        .register_fn("abs", FLOAT::abs)
        .register_fn("sqrt", FLOAT::sqrt)
        .register_fn("sqrt", |n: INT| to_float(n).sqrt())
        .register_fn("floor", FLOAT::floor)
        .register_fn("ceil", FLOAT::ceil)
        .register_fn("round", FLOAT::round)
        .register_fn("min", |a: INT, b: INT| a.min(b))
        .register_fn("min", FLOAT::min)
        .register_fn("max", |a: INT, b: INT| a.max(b))
        .register_fn("max", FLOAT::max)
        .register_fn("len", |s: ImmutableString| {
            INT::try_from(s.chars().count()).unwrap_or(INT::MAX)
        });
    engine
}

#[allow(clippy::cast_precision_loss)]
const fn to_float(n: INT) -> FLOAT {
    n as FLOAT
}

/// Remainder with the sign of the divisor, so `7 % -3 == -2`.
fn floored_rem(a: INT, b: INT) -> FnResult<INT> {
    let rem = a.checked_rem(b).ok_or_else(|| {
        EvalAltResult::ErrorArithmetic(
            format!("remainder of {a} by {b} is undefined"),
            Position::NONE,
        )
    })?;
    Ok(if rem != 0 && (rem < 0) != (b < 0) {
        rem + b
    } else {
        rem
    })
}

#[allow(clippy::float_cmp)]
fn floored_rem_float(a: FLOAT, b: FLOAT) -> FnResult<FLOAT> {
    if b == 0.0 {
        return Err(EvalAltResult::ErrorArithmetic(
            "remainder by zero".to_string(),
            Position::NONE,
        )
        .into());
    }
    Ok(a - b * (a / b).floor())
}
