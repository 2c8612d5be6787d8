//! Tree‑walking evaluator for the chain language.
//!
//! # Chain resolution
//!
//! A chain such as `+ 1 * 2 3` is walked **right to left**. Plain terms are
//! evaluated and pushed onto the front of an `evaluated` deque; an identifier
//! that names a method pops its arguments off the front of that deque and
//! pushes its result back. `--name` options pop one value into a pending
//! options map that the next method to the left receives. Exactly one value
//! must remain when the walk ends.
//!
//! ```text
//! + 1 * 2 3      evaluated (front first)
//!         3      [3]
//!       2        [2, 3]
//!     *          [6]            * takes 2, 3
//!   1            [1, 6]
//! +              [7]            + takes 1, 6
//! ```
//!
//! # Deferred expressions and transients
//!
//! `'expr` evaluates to a [`Deferred`] value that remembers the transient
//! bindings visible where it was written. A method such as `filter` later
//! runs it through [`Evaluator::extend`] + [`Evaluator::evaluate_deferred`],
//! binding `$it` for that one evaluation. The caller's own transients never
//! leak into the deferred body, and nothing is written to the
//! [`Environment`], so the binding is gone once the call returns.

use std::collections::{HashMap, VecDeque};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::environment::Environment;
use crate::error::{ExprError, Result};
use crate::expr::Expr;
use crate::method::Method;
use crate::options::Options;
use crate::parser;
use crate::stack;
use crate::token::{Number, Position};
use crate::value::{Deferred, Value};

/// How many deferred evaluations may nest before evaluation gives up.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// One layer of transient bindings plus the layer it was captured over.
#[derive(Debug, Default)]
pub struct Transients {
    vars: HashMap<String, Value>,
    parent: Option<Rc<Transients>>,
}

impl Transients {
    fn lookup(&self, name: &str) -> Option<&Value> {
        match self.vars.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_deref()?.lookup(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    scope: Rc<Transients>,
    /// Set by `extend`: the own layer is handed to the next deferred evaluation.
    extended: bool,
    depth: usize,
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// An evaluator that allows at most `max_depth` nested deferred evaluations.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            scope: Rc::default(),
            extended: false,
            depth: 0,
            max_depth,
        }
    }

    /// A child evaluator whose only own transients are `bindings`.
    ///
    /// It keeps this evaluator's depth accounting but none of its transient
    /// bindings.
    pub fn extend<I, K>(&self, bindings: I) -> Evaluator
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let vars: HashMap<String, Value> = bindings
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();

        debug!("Extending evaluator with transients {:?}", vars.keys());

        Evaluator {
            scope: Rc::new(Transients { vars, parent: None }),
            extended: true,
            depth: self.depth,
            max_depth: self.max_depth,
        }
    }

    /// Look up a transient binding visible to this evaluator.
    pub fn transient(&self, name: &str) -> Option<&Value> {
        self.scope.lookup(name)
    }

    // ───────────────────────── entry points ──────────────────────────

    /// Parse `code` and evaluate it.
    pub fn evaluate_source(&self, env: &mut Environment, code: &str) -> Result<Value> {
        info!("Evaluating source ({} bytes)", code.len());

        let expr: Expr = parser::parse(code)?;

        self.evaluate(env, &expr)
    }

    /// Evaluate a parsed expression.
    pub fn evaluate(&self, env: &mut Environment, expr: &Expr) -> Result<Value> {
        stack::ensure_sufficient_stack(|| self.evaluate_expr(env, expr))
    }

    fn evaluate_expr(&self, env: &mut Environment, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Text(s) => Ok(Value::Text(s.clone())),

            Expr::Number(Number::Int(n)) => Ok(Value::Int(*n)),

            Expr::Number(Number::Decimal(n)) => Ok(Value::Float(*n)),

            Expr::Identifier { .. } | Expr::Option { .. } => {
                self.evaluate_chain(env, std::slice::from_ref(expr))
            }

            Expr::Deferred(inner) => Ok(Value::Deferred(Deferred::new(
                Rc::clone(inner),
                Rc::clone(&self.scope),
            ))),

            Expr::Chain(exprs) => self.evaluate_chain(env, exprs),

            Expr::Block(inner) => self.evaluate(env, inner),

            Expr::Stub(value) => Ok(value.clone()),
        }
    }

    /// Evaluate a deferred expression with the bindings given to
    /// [`Evaluator::extend`] layered over the transients it captured.
    pub fn evaluate_deferred(&self, env: &mut Environment, deferred: &Deferred) -> Result<Value> {
        if self.depth >= self.max_depth {
            return Err(ExprError::failure(format!(
                "Deferred evaluation nested deeper than {} levels",
                self.max_depth
            )));
        }

        debug!("Evaluating deferred {} at depth {}", deferred.expr(), self.depth);

        let vars: HashMap<String, Value> = if self.extended {
            self.scope.vars.clone()
        } else {
            HashMap::new()
        };

        let inner = Evaluator {
            scope: Rc::new(Transients {
                vars,
                parent: Some(Rc::clone(deferred.captured())),
            }),
            extended: false,
            depth: self.depth + 1,
            max_depth: self.max_depth,
        };

        inner.evaluate(env, deferred.expr())
    }

    /// Evaluate `value` if it is deferred; return anything else unchanged.
    pub fn force(&self, env: &mut Environment, value: Value) -> Result<Value> {
        match value {
            Value::Deferred(deferred) => self.evaluate_deferred(env, &deferred),
            other => Ok(other),
        }
    }

    /// Invoke the method `name` with already‑evaluated arguments, going
    /// through the same resolution and checks as script code.
    pub fn call(&self, env: &mut Environment, name: &str, args: Vec<Value>) -> Result<Value> {
        let mut exprs: Vec<Expr> = Vec::with_capacity(args.len() + 1);
        exprs.push(Expr::identifier(name, Position::default()));
        exprs.extend(args.into_iter().map(Expr::Stub));

        self.evaluate(env, &Expr::Chain(exprs))
    }

    // ───────────────────────── chain resolution ──────────────────────

    fn evaluate_chain(&self, env: &mut Environment, exprs: &[Expr]) -> Result<Value> {
        let chain_pos: Position = exprs.iter().find_map(Expr::position).unwrap_or_default();

        debug!("Evaluating chain of {} term(s) at {}", exprs.len(), chain_pos);

        let mut evaluated: VecDeque<Value> = VecDeque::with_capacity(exprs.len());
        let mut options: HashMap<String, Value> = HashMap::new();
        let mut options_pos: Position = chain_pos;

        for expr in exprs.iter().rev() {
            match expr {
                Expr::Identifier { name, pos } => {
                    let value: Value =
                        self.resolve(env, name, *pos, &mut evaluated, &mut options)?;

                    evaluated.push_front(value);
                }

                Expr::Option { name, pos } => {
                    let value: Value =
                        evaluated
                            .pop_front()
                            .ok_or_else(|| ExprError::MissingOptionValue {
                                name: name.clone(),
                                pos: *pos,
                            })?;

                    debug!("Option --{} = {}", name, value);

                    if options.insert(name.clone(), value).is_some() {
                        return Err(ExprError::DuplicateOption {
                            name: name.clone(),
                            pos: *pos,
                        });
                    }

                    options_pos = *pos;
                }

                other => {
                    let value: Value = self.evaluate(env, other)?;

                    evaluated.push_front(value);
                }
            }
        }

        if !options.is_empty() {
            let mut names: Vec<String> = options.into_keys().collect();
            names.sort();

            return Err(ExprError::DanglingOptions {
                names,
                pos: options_pos,
            });
        }

        match (evaluated.pop_front(), evaluated.len()) {
            (Some(value), 0) => {
                debug!("Chain at {} evaluated to {}", chain_pos, value);

                Ok(value)
            }

            (first, remaining) => Err(ExprError::Chain {
                leftover: remaining + usize::from(first.is_some()),
                pos: chain_pos,
            }),
        }
    }

    /// Resolve one identifier: transients, then variables, then methods.
    fn resolve(
        &self,
        env: &mut Environment,
        name: &str,
        pos: Position,
        evaluated: &mut VecDeque<Value>,
        options: &mut HashMap<String, Value>,
    ) -> Result<Value> {
        if let Some(value) = self.scope.lookup(name) {
            debug!("'{}' resolved to transient {}", name, value);

            return Ok(value.clone());
        }

        if let Some(value) = env.get_value(name) {
            debug!("'{}' resolved to variable {}", name, value);

            return Ok(value.clone());
        }

        if let Some(method) = env.get_method(name) {
            return self.invoke(env, method.as_ref(), pos, evaluated, mem::take(options));
        }

        debug!("'{}' did not resolve", name);

        Err(ExprError::Resolve {
            name: name.to_string(),
            pos,
        })
    }

    fn invoke(
        &self,
        env: &mut Environment,
        method: &dyn Method,
        pos: Position,
        evaluated: &mut VecDeque<Value>,
        options: HashMap<String, Value>,
    ) -> Result<Value> {
        let name: &str = method.name();
        let num_args: usize = method.num_args();

        if evaluated.len() < num_args {
            return Err(ExprError::Arity {
                method: name.to_string(),
                expected: num_args,
                actual: evaluated.len(),
                pos,
            });
        }

        let params: Vec<Value> = evaluated.drain(..num_args).collect();
        let rest: Vec<Value> = if method.consume_rest() {
            evaluated.drain(..).collect()
        } else {
            Vec::new()
        };

        debug!(
            "Invoking '{}' with {} param(s), {} rest, {} option(s)",
            name,
            params.len(),
            rest.len(),
            options.len()
        );

        let mut options = Options::new(options);

        let result: Value = method
            .invoke(env, self, params, &mut options, rest)
            .map_err(|e| e.at_call(name, pos))?;

        let unused: Vec<String> = options.unused();

        if !unused.is_empty() {
            return Err(ExprError::UnusedOptions {
                method: name.to_string(),
                names: unused,
                pos,
            });
        }

        debug!("'{}' returned {}", name, result);

        Ok(result)
    }
}
