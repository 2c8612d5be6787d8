use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::printer::Printer;
use crate::token::{Number, Position};
use crate::value::Value;

/// **Abstract‑Syntax‑Tree node** for the chain language.
///
/// Trees are immutable once parsed: a host may keep one around (a card's
/// "play action", say) and evaluate it many times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// A double‑quoted string literal.
    Text(String),

    /// An integer or decimal literal.
    Number(Number),

    /// A bare word: a transient, a variable, or a method call.
    Identifier { name: String, pos: Position },

    /// `--name`: binds the value to its right as a named argument.
    Option { name: String, pos: Position },

    /// `'expr`: evaluates to the expression itself rather than its result.
    Deferred(Rc<Expr>),

    /// Space‑separated terms, resolved right‑to‑left.
    Chain(Vec<Expr>),

    /// `( chain )`: a nested chain evaluated as one term.
    Block(Box<Expr>),

    /// A value injected by host code, bypassing the parser.
    #[serde(skip_serializing)]
    Stub(Value),
}

impl Expr {
    pub fn identifier<S: Into<String>>(name: S, pos: Position) -> Self {
        Expr::Identifier {
            name: name.into(),
            pos,
        }
    }

    pub fn stub<V: Into<Value>>(value: V) -> Self {
        Expr::Stub(value.into())
    }

    /// First source position found in this subtree, searching left to right.
    pub fn position(&self) -> Option<Position> {
        match self {
            Expr::Identifier { pos, .. } | Expr::Option { pos, .. } => Some(*pos),
            Expr::Deferred(inner) => inner.position(),
            Expr::Block(inner) => inner.position(),
            Expr::Chain(exprs) => exprs.iter().find_map(Expr::position),
            Expr::Text(_) | Expr::Number(_) | Expr::Stub(_) => None,
        }
    }

    /// The name if this is a bare identifier.
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Printer.print(self))
    }
}
