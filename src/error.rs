//! Centralised error hierarchy for the **chain-expression language**.
//!
//! Every stage (scanner, parser, environment, evaluator, host methods) reports
//! failures through [`ExprError`]. Host code catches this one type to show a
//! script author which sub-expression failed, without crashing the session.
//!
//! The module **does not** print diagnostics itself.

use thiserror::Error;

use log::info;

use crate::token::Position;

/// Canonical error type used throughout the crate.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ExprError {
    /// Malformed source text.
    #[error("[{pos}] Parse error: {message}")]
    Parse {
        /// Human‑readable description.
        message: String,

        /// Where the scanner or parser gave up.
        pos: Position,
    },

    /// An identifier matched no transient, variable or method.
    #[error("[{pos}] Unknown identifier '{name}'")]
    Resolve { name: String, pos: Position },

    /// A method found fewer values to its right than it declares.
    #[error("[{pos}] Method '{method}' expects {expected} argument(s) but got {actual}")]
    Arity {
        method: String,
        expected: usize,
        actual: usize,
        pos: Position,
    },

    /// `--name` with nothing after it to consume.
    #[error("[{pos}] Option '--{name}' has no value")]
    MissingOptionValue { name: String, pos: Position },

    /// The same option given twice to one call.
    #[error("[{pos}] Option '--{name}' supplied more than once")]
    DuplicateOption { name: String, pos: Position },

    /// Options handed to a method that never read them (usually a typo).
    #[error("[{pos}] Method '{method}' does not accept option(s): {}", format_options(.names))]
    UnusedOptions {
        method: String,
        names: Vec<String>,
        pos: Position,
    },

    /// Options left over at the end of a chain with no method to receive them.
    #[error("[{pos}] No method consumed option(s): {}", format_options(.names))]
    DanglingOptions { names: Vec<String>, pos: Position },

    /// A chain that did not reduce to exactly one value.
    #[error("[{pos}] Expression left {leftover} value(s) unconsumed; expected exactly one")]
    Chain { leftover: usize, pos: Position },

    /// A failure raised inside a method body, tagged with the call site.
    #[error("[{pos}] Error in '{method}': {message}")]
    Method {
        method: String,
        message: String,
        pos: Position,
    },

    /// A name declared twice in the same scope frame.
    #[error("{kind} '{name}' is already declared in this scope")]
    Redeclared { kind: &'static str, name: String },

    /// Raised by method bodies; wrapped into [`ExprError::Method`] at the call site.
    #[error("{0}")]
    Failure(String),

    /// No converter could produce the requested type.
    #[error("Cannot convert {found} to {expected}")]
    Conversion {
        expected: &'static str,
        found: &'static str,
    },

    /// The user backed out of an in-progress evaluation.
    #[error("Evaluation canceled")]
    Canceled,
}

fn format_options(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("--{}", name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ExprError {
    /// Helper constructor for the **scanner** and **parser**.
    pub fn parse<S: Into<String>>(pos: Position, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: pos={}, msg={}", pos, message);

        ExprError::Parse { message, pos }
    }

    /// Helper constructor for **method bodies**.
    pub fn failure<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Failure: msg={}", message);

        ExprError::Failure(message)
    }

    /// Source position of the failing sub-expression, when known.
    pub fn position(&self) -> Option<Position> {
        match self {
            ExprError::Parse { pos, .. }
            | ExprError::Resolve { pos, .. }
            | ExprError::Arity { pos, .. }
            | ExprError::MissingOptionValue { pos, .. }
            | ExprError::DuplicateOption { pos, .. }
            | ExprError::UnusedOptions { pos, .. }
            | ExprError::DanglingOptions { pos, .. }
            | ExprError::Chain { pos, .. }
            | ExprError::Method { pos, .. } => Some(*pos),
            ExprError::Redeclared { .. }
            | ExprError::Failure(_)
            | ExprError::Conversion { .. }
            | ExprError::Canceled => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, ExprError::Canceled)
    }

    /// Attach a call site to an error escaping a method body.
    ///
    /// Positioned errors and cancellation pass through untouched so the most
    /// specific diagnostic wins.
    pub(crate) fn at_call(self, method: &str, pos: Position) -> Self {
        match self {
            ExprError::Failure(message) => ExprError::Method {
                method: method.to_string(),
                message,
                pos,
            },

            ExprError::Conversion { .. } | ExprError::Redeclared { .. } => ExprError::Method {
                method: method.to_string(),
                message: self.to_string(),
                pos,
            },

            other => other,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, ExprError>;
