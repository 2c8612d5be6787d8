use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use crate::evaluator::Transients;
use crate::expr::Expr;

/// The language's single dynamic value type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// What a method returns when it has nothing to return.
    Empty,

    /// Stands in for an argument the script deliberately leaves out (`_`).
    Placeholder,

    Bool(bool),

    Int(i64),

    Float(f64),

    Text(String),

    List(Vec<Value>),

    /// An unevaluated expression plus the transient bindings visible where
    /// it was written.
    Deferred(Deferred),

    /// An opaque host object such as a card or a pile.
    Host(HostValue),
}

impl Value {
    /// Wrap a host object.
    pub fn host<T: Any>(value: T) -> Self {
        Value::Host(HostValue::new(value))
    }

    /// Short name of the payload's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Placeholder => "placeholder",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Deferred(_) => "deferred",
            Value::Host(host) => host.type_name(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Value::Placeholder)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "empty"),

            Value::Placeholder => write!(f, "_"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Int(n) => {
                let mut buf: itoa::Buffer = itoa::Buffer::new();
                f.write_str(buf.format(*n))
            }

            Value::Float(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::Text(s) => write!(f, "{}", s),

            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }

            Value::Deferred(deferred) => write!(f, "'{}", deferred.expr()),

            Value::Host(host) => write!(f, "<{}>", host.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Deferred> for Value {
    fn from(deferred: Deferred) -> Self {
        Value::Deferred(deferred)
    }
}

/// A deferred (quoted) expression together with its captured transients.
#[derive(Clone)]
pub struct Deferred {
    expr: Rc<Expr>,
    captured: Rc<Transients>,
}

impl Deferred {
    pub(crate) fn new(expr: Rc<Expr>, captured: Rc<Transients>) -> Self {
        Self { expr, captured }
    }

    /// A deferred expression that captured nothing, for host‑built lambdas.
    pub fn detached(expr: Expr) -> Self {
        Self {
            expr: Rc::new(expr),
            captured: Rc::default(),
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub(crate) fn captured(&self) -> &Rc<Transients> {
        &self.captured
    }

    /// The name when the deferred expression is a bare identifier (`'x`).
    pub fn identifier(&self) -> Option<&str> {
        self.expr.as_identifier()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Deferred").field(&self.expr).finish()
    }
}

/// Two deferred values are equal when they quote equal expressions.
impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

/// A reference‑counted host object with its type name kept for diagnostics.
#[derive(Clone)]
pub struct HostValue {
    type_name: &'static str,
    inner: Rc<dyn Any>,
}

impl HostValue {
    pub fn new<T: Any>(value: T) -> Self {
        Self::from_rc(Rc::new(value))
    }

    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        Self {
            type_name: type_name::<T>(),
            inner: value,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.inner).downcast::<T>().ok()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostValue<{}>", self.type_name)
    }
}

/// Host objects compare by identity.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }
}
