//! An embedded chain‑expression language for encoding game behaviour as data.
//!
//! ```rust
//! use cardexpr::{Environment, Evaluator, Value};
//!
//! let mut env = Environment::with_prelude();
//! let eval = Evaluator::new();
//!
//! assert_eq!(eval.evaluate_source(&mut env, "+ 1 * 2 3"), Ok(Value::Int(7)));
//! ```

pub mod builtins;
pub mod converter;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod method;
pub mod options;
pub mod parser;
pub mod printer;
pub mod scanner;
mod stack;
pub mod token;
pub mod value;

pub use converter::{converter, Converter, FromValue, Name};
pub use environment::Environment;
pub use error::{ExprError, Result};
pub use evaluator::Evaluator;
pub use expr::Expr;
pub use method::{Method, NativeMethod};
pub use options::Options;
pub use parser::parse;
pub use value::{Deferred, HostValue, Value};

/// Evaluate `code` against `env` with a fresh [`Evaluator`].
pub fn evaluate(env: &mut Environment, code: &str) -> Result<Value> {
    Evaluator::new().evaluate_source(env, code)
}
