//! Type‑directed coercion between [`Value`] and the typed host values that
//! methods expect.
//!
//! Two layers cooperate:
//!
//! * [`FromValue`] is the *instance check*: "is this value already a `T`?".
//!   Scalars check the variant; `Vec<T>` checks that every element is a `T`.
//! * [`Converter`]s are registered per scope in an [`Environment`] and are
//!   tried, most local scope first, when the instance check fails. A converter
//!   that returns `None` is not an error; the next one gets a turn.
//!
//! When both fail, [`FromValue::coerce`] gets a last structural attempt; for
//! lists this wraps a single item into a list of one, converting each element
//! through the environment.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::value::{Deferred, HostValue, Value};

/// Instance check and extraction for a host type.
pub trait FromValue: Sized + 'static {
    /// `Some` when `value` already holds a `Self`.
    fn from_value(value: &Value) -> Option<Self>;

    /// Structural fallback, consulted after registered converters.
    fn coerce(_value: &Value, _env: &Environment) -> Option<Self> {
        None
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for Deferred {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Deferred(deferred) => Some(deferred.clone()),
            _ => None,
        }
    }
}

impl FromValue for HostValue {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Host(host) => Some(host.clone()),
            _ => None,
        }
    }
}

/// Host objects come back out as the `Rc` they were stored in.
impl<T: Any> FromValue for Rc<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Host(host) => host.downcast::<T>(),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }

    fn coerce(value: &Value, env: &Environment) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(|item| env.convert::<T>(item)).collect(),
            single => env.convert::<T>(single).map(|item| vec![item]),
        }
    }
}

/// The name a binding method such as `set` declares.
///
/// A quoted bare identifier (`'x`) is already a `Name`; other sources (text,
/// for instance) need a registered converter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl Name {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromValue for Name {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Deferred(deferred) => deferred.identifier().map(|name| Name(name.to_string())),
            _ => None,
        }
    }
}

/// A pluggable conversion from [`Value`] to one target type.
pub trait Converter {
    fn target(&self) -> TypeId;

    fn target_name(&self) -> &'static str;

    /// The converted payload boxed as `Any`, or `None` to decline.
    fn convert(&self, value: &Value) -> Option<Box<dyn Any>>;
}

/// A [`Converter`] backed by a closure.
pub struct FnConverter<T, F> {
    func: F,
    _target: PhantomData<fn() -> T>,
}

impl<T, F> FnConverter<T, F>
where
    T: Any,
    F: Fn(&Value) -> Option<T>,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _target: PhantomData,
        }
    }
}

impl<T, F> Converter for FnConverter<T, F>
where
    T: Any,
    F: Fn(&Value) -> Option<T>,
{
    fn target(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn target_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn convert(&self, value: &Value) -> Option<Box<dyn Any>> {
        (self.func)(value).map(|converted| Box::new(converted) as Box<dyn Any>)
    }
}

/// Shorthand for [`FnConverter::new`].
pub fn converter<T, F>(func: F) -> FnConverter<T, F>
where
    T: Any,
    F: Fn(&Value) -> Option<T>,
{
    FnConverter::new(func)
}

/// The converters registered in one scope frame, grouped by target type and
/// kept in registration order.
#[derive(Default, Clone)]
pub struct Converters {
    by_target: HashMap<TypeId, Vec<Rc<dyn Converter>>>,
}

impl Converters {
    pub fn add(&mut self, converter: Rc<dyn Converter>) {
        debug!("Registering converter to {}", converter.target_name());

        self.by_target
            .entry(converter.target())
            .or_default()
            .push(converter);
    }

    /// First successful conversion to `T` in this frame.
    pub fn convert<T: Any>(&self, value: &Value) -> Option<T> {
        let candidates = self.by_target.get(&TypeId::of::<T>())?;

        candidates
            .iter()
            .filter_map(|converter| converter.convert(value))
            .find_map(|converted| converted.downcast::<T>().ok())
            .map(|converted| *converted)
    }

    pub fn len(&self) -> usize {
        self.by_target.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converters")
            .field("count", &self.len())
            .finish()
    }
}
