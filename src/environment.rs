use std::any::type_name;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use log::{debug, info};

use crate::builtins;
use crate::converter::{Converter, Converters, FromValue};
use crate::error::{ExprError, Result};
use crate::method::Method;
use crate::value::Value;

/// One scope frame. Maps are allocated on first write.
#[derive(Default)]
struct Scope {
    methods: Option<HashMap<String, Rc<dyn Method>>>,
    variables: Option<HashMap<String, Value>>,
    converters: Option<Converters>,
}

/// Lexically scoped bindings for variables, methods and converters.
///
/// The root ("ground") frame always exists. Lookups walk from the most local
/// frame down and the first match wins.
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An environment with nothing registered.
    pub fn new() -> Self {
        info!("Creating Environment");

        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// An environment with the builtin prelude installed in the ground frame.
    pub fn with_prelude() -> Self {
        let mut env = Self::new();
        builtins::install(&mut env).expect("Prelude names collide in a fresh environment?");
        env
    }

    /// Number of frames, the ground frame included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());

        debug!("Pushed scope, depth now {}", self.scopes.len());
    }

    /// Pop the most local frame.
    ///
    /// # Panics
    ///
    /// Popping the ground frame is a programming error and panics.
    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "Attempted to pop the ground scope");

        self.scopes.pop();

        debug!("Popped scope, depth now {}", self.scopes.len());
    }

    /// Push a frame that is popped when the guard drops, however the
    /// enclosing code exits.
    pub fn scope(&mut self) -> ScopeGuard<'_> {
        self.push_scope();

        ScopeGuard { env: self }
    }

    /// Run `f` inside a fresh frame.
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Environment) -> R) -> R {
        let mut guard = self.scope();
        f(&mut guard)
    }

    fn top(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    // ───────────────────────────── registration ────────────────────────────

    /// Register `method` in the current frame.
    pub fn add_method<M: Method + 'static>(&mut self, method: M) -> Result<()> {
        self.add_method_rc(Rc::new(method))
    }

    pub fn add_method_rc(&mut self, method: Rc<dyn Method>) -> Result<()> {
        let name = method.name().to_string();
        let methods = self.top().methods.get_or_insert_with(HashMap::new);

        if methods.contains_key(&name) {
            return Err(ExprError::Redeclared {
                kind: "Method",
                name,
            });
        }

        debug!("Registering method '{}'", name);

        methods.insert(name, method);

        Ok(())
    }

    /// Register `converter` in the current frame.
    pub fn add_converter<C: Converter + 'static>(&mut self, converter: C) {
        self.top()
            .converters
            .get_or_insert_with(Converters::default)
            .add(Rc::new(converter));
    }

    /// Declare `name` in the current frame.
    pub fn set<S: Into<String>, V: Into<Value>>(&mut self, name: S, value: V) -> Result<()> {
        let name: String = name.into();
        let variables = self.top().variables.get_or_insert_with(HashMap::new);

        if variables.contains_key(&name) {
            return Err(ExprError::Redeclared {
                kind: "Variable",
                name,
            });
        }

        let value: Value = value.into();

        debug!("Declaring variable '{}' = {}", name, value);

        variables.insert(name, value);

        Ok(())
    }

    // ───────────────────────────── lookup ──────────────────────────────────

    pub fn get_method(&self, name: &str) -> Option<Rc<dyn Method>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.methods.as_ref()?.get(name))
            .cloned()
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.variables.as_ref()?.get(name))
    }

    // ───────────────────────────── conversion ──────────────────────────────

    /// Convert `value` to a `T`: directly when it already is one, else via
    /// the most local converter that succeeds, else via `T`'s structural
    /// fallback.
    pub fn convert<T: FromValue>(&self, value: &Value) -> Option<T> {
        if let Some(direct) = T::from_value(value) {
            return Some(direct);
        }

        let converted: Option<T> = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.converters.as_ref()?.convert::<T>(value));

        converted.or_else(|| T::coerce(value, self))
    }

    /// Like [`Environment::convert`], failing with [`ExprError::Conversion`].
    pub fn expect_convert<T: FromValue>(&self, value: &Value) -> Result<T> {
        self.convert::<T>(value).ok_or_else(|| {
            debug!(
                "No conversion from {} to {}",
                value.type_name(),
                type_name::<T>()
            );

            ExprError::Conversion {
                expected: type_name::<T>(),
                found: value.type_name(),
            }
        })
    }
}

/// Pops the frame pushed by [`Environment::scope`] on drop.
pub struct ScopeGuard<'a> {
    env: &'a mut Environment,
}

impl Deref for ScopeGuard<'_> {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        self.env
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Environment {
        self.env
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.env.pop_scope();
    }
}
