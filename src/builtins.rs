//! The generic prelude: bindings, laziness helpers, list helpers, arithmetic,
//! comparison and logic.
//!
//! Game‑specific methods live in host code and register the same way.

use std::cmp::Ordering;

use log::info;

use crate::converter::{converter, Name};
use crate::environment::Environment;
use crate::error::{ExprError, Result};
use crate::evaluator::Evaluator;
use crate::method::NativeMethod;
use crate::options::Options;
use crate::value::{Deferred, Value};

/// Name of the transient bound to the current element by `filter` and `map`.
pub const IT: &str = "$it";

/// Register the prelude in the current frame of `env`.
pub fn install(env: &mut Environment) -> Result<()> {
    info!("Installing prelude");

    env.set("true", true)?;
    env.set("false", false)?;
    env.set("_", Value::Placeholder)?;

    env.add_converter(converter(|value: &Value| match value {
        Value::Int(n) => Some(*n as f64),
        _ => None,
    }));
    env.add_converter(converter(|value: &Value| match value {
        Value::Text(s) => Some(Name(s.clone())),
        _ => None,
    }));

    env.add_method(NativeMethod::new("set", 2, set))?;
    env.add_method(NativeMethod::new("if", 3, if_))?;
    env.add_method(NativeMethod::new("run", 1, run))?;
    env.add_method(NativeMethod::with_rest("list", 0, list))?;
    env.add_method(NativeMethod::new("count", 1, count))?;
    env.add_method(NativeMethod::new("filter", 2, filter))?;
    env.add_method(NativeMethod::new("map", 2, map))?;
    env.add_method(NativeMethod::with_rest("join", 0, join))?;
    env.add_method(NativeMethod::new("not", 1, not))?;
    env.add_method(NativeMethod::new("and", 2, and))?;
    env.add_method(NativeMethod::new("or", 2, or))?;

    for op in [Arith::Add, Arith::Sub, Arith::Mul, Arith::Div, Arith::Rem] {
        env.add_method(NativeMethod::new(op.symbol(), 2, move |env, _, params, _, _| {
            arithmetic(env, op, params)
        }))?;
    }

    for cmp in [Compare::Lt, Compare::Le, Compare::Gt, Compare::Ge] {
        env.add_method(NativeMethod::new(cmp.symbol(), 2, move |env, _, params, _, _| {
            compare(env, cmp, params)
        }))?;
    }

    env.add_method(NativeMethod::new("==", 2, |env, _, params, _, _| {
        let [left, right] = args(params)?;
        Ok(Value::Bool(equals(env, &left, &right)))
    }))?;
    env.add_method(NativeMethod::new("!=", 2, |env, _, params, _, _| {
        let [left, right] = args(params)?;
        Ok(Value::Bool(!equals(env, &left, &right)))
    }))?;

    Ok(())
}

/// Split the evaluator‑supplied params into a fixed‑size array.
fn args<const N: usize>(params: Vec<Value>) -> Result<[Value; N]> {
    <[Value; N]>::try_from(params).map_err(|params| {
        ExprError::failure(format!(
            "Expected {} argument(s), got {}",
            N,
            params.len()
        ))
    })
}

// ───────────────────────────── bindings & laziness ──────────────────────────

fn set(
    env: &mut Environment,
    _: &Evaluator,
    params: Vec<Value>,
    _: &mut Options,
    _: Vec<Value>,
) -> Result<Value> {
    let [name, value] = args(params)?;
    let name: Name = env.expect_convert(&name)?;

    env.set(name.0, value)?;

    Ok(Value::Empty)
}

fn if_(
    env: &mut Environment,
    eval: &Evaluator,
    params: Vec<Value>,
    _: &mut Options,
    _: Vec<Value>,
) -> Result<Value> {
    let [condition, then, otherwise] = args(params)?;
    let chosen: Value = if env.expect_convert::<bool>(&condition)? {
        then
    } else {
        otherwise
    };

    if chosen.is_placeholder() {
        return Ok(Value::Empty);
    }

    eval.force(env, chosen)
}

fn run(
    env: &mut Environment,
    eval: &Evaluator,
    params: Vec<Value>,
    _: &mut Options,
    _: Vec<Value>,
) -> Result<Value> {
    let [value] = args(params)?;

    eval.force(env, value)
}

// ───────────────────────────── lists ────────────────────────────────────────

fn list(
    _: &mut Environment,
    _: &Evaluator,
    _: Vec<Value>,
    _: &mut Options,
    rest: Vec<Value>,
) -> Result<Value> {
    Ok(Value::List(rest))
}

fn count(
    env: &mut Environment,
    _: &Evaluator,
    params: Vec<Value>,
    _: &mut Options,
    _: Vec<Value>,
) -> Result<Value> {
    let [items] = args(params)?;
    let items: Vec<Value> = env.expect_convert(&items)?;

    Ok(Value::Int(items.len() as i64))
}

fn filter(
    env: &mut Environment,
    eval: &Evaluator,
    params: Vec<Value>,
    _: &mut Options,
    _: Vec<Value>,
) -> Result<Value> {
    let [items, predicate] = args(params)?;
    let items: Vec<Value> = env.expect_convert(&items)?;
    let predicate: Deferred = env.expect_convert(&predicate)?;

    let mut kept: Vec<Value> = Vec::new();

    for item in items {
        let verdict: Value = eval
            .extend([(IT, item.clone())])
            .evaluate_deferred(env, &predicate)?;

        if env.expect_convert::<bool>(&verdict)? {
            kept.push(item);
        }
    }

    Ok(Value::List(kept))
}

fn map(
    env: &mut Environment,
    eval: &Evaluator,
    params: Vec<Value>,
    _: &mut Options,
    _: Vec<Value>,
) -> Result<Value> {
    let [items, body] = args(params)?;
    let items: Vec<Value> = env.expect_convert(&items)?;
    let body: Deferred = env.expect_convert(&body)?;

    items
        .into_iter()
        .map(|item| eval.extend([(IT, item)]).evaluate_deferred(env, &body))
        .collect::<Result<Vec<Value>>>()
        .map(Value::List)
}

/// `join a b c --sep ", "`; list arguments contribute their elements.
fn join(
    env: &mut Environment,
    _: &Evaluator,
    _: Vec<Value>,
    options: &mut Options,
    rest: Vec<Value>,
) -> Result<Value> {
    let separator: String = match options.get("sep").cloned() {
        Some(sep) => env.expect_convert(&sep)?,
        None => String::new(),
    };

    let parts: Vec<String> = rest
        .into_iter()
        .flat_map(|value| match value {
            Value::List(items) => items,
            single => vec![single],
        })
        .map(|value| value.to_string())
        .collect();

    Ok(Value::Text(parts.join(&separator)))
}

// ───────────────────────────── logic ────────────────────────────────────────

fn not(
    env: &mut Environment,
    _: &Evaluator,
    params: Vec<Value>,
    _: &mut Options,
    _: Vec<Value>,
) -> Result<Value> {
    let [value] = args(params)?;

    Ok(Value::Bool(!env.expect_convert::<bool>(&value)?))
}

/// `and a 'b` only evaluates `b` when `a` holds.
fn and(
    env: &mut Environment,
    eval: &Evaluator,
    params: Vec<Value>,
    _: &mut Options,
    _: Vec<Value>,
) -> Result<Value> {
    let [left, right] = args(params)?;

    if !env.expect_convert::<bool>(&left)? {
        return Ok(Value::Bool(false));
    }

    let right: Value = eval.force(env, right)?;

    Ok(Value::Bool(env.expect_convert::<bool>(&right)?))
}

/// `or a 'b` only evaluates `b` when `a` fails.
fn or(
    env: &mut Environment,
    eval: &Evaluator,
    params: Vec<Value>,
    _: &mut Options,
    _: Vec<Value>,
) -> Result<Value> {
    let [left, right] = args(params)?;

    if env.expect_convert::<bool>(&left)? {
        return Ok(Value::Bool(true));
    }

    let right: Value = eval.force(env, right)?;

    Ok(Value::Bool(env.expect_convert::<bool>(&right)?))
}

// ───────────────────────────── arithmetic ───────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Arith {
    fn symbol(self) -> &'static str {
        match self {
            Arith::Add => "+",
            Arith::Sub => "-",
            Arith::Mul => "*",
            Arith::Div => "/",
            Arith::Rem => "%",
        }
    }

    fn divides(self) -> bool {
        matches!(self, Arith::Div | Arith::Rem)
    }
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(n) => n as f64,
            Numeric::Float(n) => n,
        }
    }
}

fn numeric(env: &Environment, value: &Value) -> Result<Numeric> {
    match value {
        Value::Int(n) => Ok(Numeric::Int(*n)),
        other => Ok(Numeric::Float(env.expect_convert::<f64>(other)?)),
    }
}

/// Integers stay integers; anything involving a float is computed in `f64`.
/// `+` with a text operand concatenates.
fn arithmetic(env: &Environment, op: Arith, params: Vec<Value>) -> Result<Value> {
    let [left, right] = args(params)?;

    if matches!(op, Arith::Add)
        && (matches!(left, Value::Text(_)) || matches!(right, Value::Text(_)))
    {
        return Ok(Value::Text(format!("{}{}", left, right)));
    }

    match (numeric(env, &left)?, numeric(env, &right)?) {
        (Numeric::Int(a), Numeric::Int(b)) => {
            if op.divides() && b == 0 {
                return Err(ExprError::failure("Division by zero"));
            }

            let result: Option<i64> = match op {
                Arith::Add => a.checked_add(b),
                Arith::Sub => a.checked_sub(b),
                Arith::Mul => a.checked_mul(b),
                Arith::Div => a.checked_div(b),
                Arith::Rem => a.checked_rem(b),
            };

            result.map(Value::Int).ok_or_else(|| {
                ExprError::failure(format!("Integer overflow in {} {} {}", op.symbol(), a, b))
            })
        }

        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());

            if op.divides() && b == 0.0 {
                return Err(ExprError::failure("Division by zero"));
            }

            Ok(Value::Float(match op {
                Arith::Add => a + b,
                Arith::Sub => a - b,
                Arith::Mul => a * b,
                Arith::Div => a / b,
                Arith::Rem => a % b,
            }))
        }
    }
}

// ───────────────────────────── comparison ───────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Compare {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Compare {
    fn symbol(self) -> &'static str {
        match self {
            Compare::Lt => "<",
            Compare::Le => "<=",
            Compare::Gt => ">",
            Compare::Ge => ">=",
        }
    }
}

fn compare(env: &Environment, cmp: Compare, params: Vec<Value>) -> Result<Value> {
    let [left, right] = args(params)?;

    let ordering: Option<Ordering> = match (&left, &right) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        _ => numeric(env, &left)?
            .as_f64()
            .partial_cmp(&numeric(env, &right)?.as_f64()),
    };

    let ordering: Ordering = ordering.ok_or_else(|| {
        ExprError::failure(format!("Cannot compare {} with {}", left, right))
    })?;

    Ok(Value::Bool(match cmp {
        Compare::Lt => ordering.is_lt(),
        Compare::Le => ordering.is_le(),
        Compare::Gt => ordering.is_gt(),
        Compare::Ge => ordering.is_ge(),
    }))
}

/// Numbers compare by value across int/float; everything else structurally.
fn equals(env: &Environment, left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            match (numeric(env, left), numeric(env, right)) {
                (Ok(a), Ok(b)) => a.as_f64() == b.as_f64(),
                _ => false,
            }
        }
        _ => left == right,
    }
}
