use std::fmt;

use crate::environment::Environment;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::options::Options;
use crate::value::Value;

/// Something a chain can call.
///
/// The evaluator hands a method exactly `num_args` positional `params` (the
/// values to its right, nearest first), every remaining value as `rest` when
/// `consume_rest` is set, and the `--options` collected so far. Options the
/// method never reads are reported as errors after it returns.
pub trait Method {
    fn name(&self) -> &str;

    fn num_args(&self) -> usize;

    fn consume_rest(&self) -> bool {
        false
    }

    fn invoke(
        &self,
        env: &mut Environment,
        eval: &Evaluator,
        params: Vec<Value>,
        options: &mut Options,
        rest: Vec<Value>,
    ) -> Result<Value>;
}

/// Signature of the function behind a [`NativeMethod`].
pub type MethodFn =
    dyn Fn(&mut Environment, &Evaluator, Vec<Value>, &mut Options, Vec<Value>) -> Result<Value>;

/// A [`Method`] backed by a plain function or closure.
pub struct NativeMethod {
    name: String,
    num_args: usize,
    consume_rest: bool,
    func: Box<MethodFn>,
}

impl NativeMethod {
    pub fn new<S, F>(name: S, num_args: usize, func: F) -> Self
    where
        S: Into<String>,
        F: Fn(&mut Environment, &Evaluator, Vec<Value>, &mut Options, Vec<Value>) -> Result<Value>
            + 'static,
    {
        Self {
            name: name.into(),
            num_args,
            consume_rest: false,
            func: Box::new(func),
        }
    }

    /// Like [`NativeMethod::new`], but also absorbs every remaining value.
    pub fn with_rest<S, F>(name: S, num_args: usize, func: F) -> Self
    where
        S: Into<String>,
        F: Fn(&mut Environment, &Evaluator, Vec<Value>, &mut Options, Vec<Value>) -> Result<Value>
            + 'static,
    {
        Self {
            consume_rest: true,
            ..Self::new(name, num_args, func)
        }
    }
}

impl Method for NativeMethod {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_args(&self) -> usize {
        self.num_args
    }

    fn consume_rest(&self) -> bool {
        self.consume_rest
    }

    fn invoke(
        &self,
        env: &mut Environment,
        eval: &Evaluator,
        params: Vec<Value>,
        options: &mut Options,
        rest: Vec<Value>,
    ) -> Result<Value> {
        (self.func)(env, eval, params, options, rest)
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<native method {}/{}{}>",
            self.name,
            self.num_args,
            if self.consume_rest { "+" } else { "" }
        )
    }
}
