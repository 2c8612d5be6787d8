#[cfg(test)]
mod evaluator_tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use cardexpr::builtins::IT;
    use cardexpr::error::ExprError;
use cardexpr::evaluator::DEFAULT_MAX_DEPTH;
use cardexpr::parser::MAX_NESTING;
    use cardexpr::token::Position;
    use cardexpr::{Deferred, Environment, Evaluator, NativeMethod, Value};

    #[derive(Debug)]
    struct Card {
        cost: i64,
    }

    fn eval(env: &mut Environment, source: &str) -> Result<Value, ExprError> {
        Evaluator::new().evaluate_source(env, source)
    }

    fn assert_evaluates(source: &str, expected: Value) {
        let mut env = Environment::with_prelude();

        assert_eq!(eval(&mut env, source), Ok(expected), "source: {}", source);
    }

    fn ints(items: &[i64]) -> Value {
        Value::List(items.iter().copied().map(Value::Int).collect())
    }

    /// `with VALUE 'BODY` evaluates BODY with `$x` bound to VALUE.
    fn with_x() -> NativeMethod {
        NativeMethod::new("with", 2, |env, eval, params, _, _| {
            let value: Value = params[0].clone();
            let body: Deferred = env.expect_convert(&params[1])?;

            eval.extend([("$x", value)]).evaluate_deferred(env, &body)
        })
    }

    #[test]
    fn test_evaluator_01_right_to_left_chain() {
        assert_evaluates("+ 1 * 2 3", Value::Int(7));
        assert_evaluates("- 10 - 4 1", Value::Int(7));
        assert_evaluates("* (+ 1 2) 3", Value::Int(9));
        assert_evaluates("42", Value::Int(42));
        assert_evaluates("\"plain\"", Value::from("plain"));
    }

    #[test]
    fn test_evaluator_02_arity_is_checked() {
        let mut env = Environment::with_prelude();

        assert_eq!(eval(&mut env, "+ 1 2"), Ok(Value::Int(3)));

        match eval(&mut env, "+ 1") {
            Err(ExprError::Arity {
                method,
                expected,
                actual,
                pos,
            }) => {
                assert_eq!(method, "+");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
                assert_eq!(pos, Position::new(0, 1));
            }
            other => panic!("Expected arity error, got {:?}", other),
        }
    }

    #[test]
    fn test_evaluator_03_standalone_deferred_is_the_expression() {
        let mut env = Environment::with_prelude();

        let Ok(Value::Deferred(deferred)) = eval(&mut env, "'(>= $it 3)") else {
            panic!("Expected a deferred value");
        };

        assert_eq!(deferred.expr().to_string(), "(>= $it 3)");

        let verdict = Evaluator::new()
            .extend([(IT, Value::Int(5))])
            .evaluate_deferred(&mut env, &deferred);

        assert_eq!(verdict, Ok(Value::Bool(true)));
    }

    #[test]
    fn test_evaluator_04_variables_persist_in_environment() {
        let mut env = Environment::with_prelude();

        assert_eq!(eval(&mut env, "set 'x 12"), Ok(Value::Empty));
        assert_eq!(eval(&mut env, "+ x 3"), Ok(Value::Int(15)));
        assert_eq!(env.get_value("x"), Some(&Value::Int(12)));
    }

    #[test]
    fn test_evaluator_05_if_only_runs_chosen_branch() {
        assert_evaluates("if true '3 '(this would crash if run)", Value::Int(3));
        assert_evaluates("if false '(this would crash if run) '4", Value::Int(4));
        assert_evaluates("if false '1 _", Value::Empty);
        assert_evaluates("if (< 1 2) \"yes\" \"no\"", Value::from("yes"));

        // The else branch is the one forced here, and `run` inside it finds nothing to run.
        let mut env = Environment::with_prelude();
        assert!(matches!(
            eval(&mut env, "if false '3 '(this would crash if run)"),
            Err(ExprError::Arity { method, expected: 1, actual: 0, .. }) if method == "run"
        ));
    }

    #[test]
    fn test_evaluator_06_filter_binds_it_transiently() {
        let mut env = Environment::with_prelude();

        assert_eq!(
            eval(&mut env, "filter (list 1 2 3 4 5) '(>= $it 3)"),
            Ok(ints(&[3, 4, 5]))
        );
        assert_eq!(env.get_value(IT), None);
        assert!(matches!(
            eval(&mut env, "$it"),
            Err(ExprError::Resolve { name, .. }) if name == "$it"
        ));
    }

    #[test]
    fn test_evaluator_07_transients_shadow_variables() {
        let mut env = Environment::with_prelude();
        env.set(IT, 100_i64).unwrap();

        assert_eq!(
            eval(&mut env, "map (list 1 2) '(+ $it 1)"),
            Ok(ints(&[2, 3]))
        );
        assert_eq!(eval(&mut env, "$it"), Ok(Value::Int(100)));
    }

    #[test]
    fn test_evaluator_08_nested_deferred_captures_outer_transients() {
        let mut env = Environment::with_prelude();
        env.add_method(with_x()).unwrap();

        assert_eq!(
            eval(&mut env, "map (list 1 2) '(with 10 '(+ $it $x))"),
            Ok(ints(&[11, 12]))
        );
    }

    #[test]
    fn test_evaluator_09_forced_value_does_not_see_callers_transients() {
        let mut env = Environment::with_prelude();
        env.add_method(with_x()).unwrap();

        eval(&mut env, "set 'peek '$x").unwrap();

        assert!(matches!(
            eval(&mut env, "with 1 '(run peek)"),
            Err(ExprError::Resolve { name, .. }) if name == "$x"
        ));
    }

    #[test]
    fn test_evaluator_10_unused_and_dangling_options() {
        let mut env = Environment::with_prelude();

        assert_eq!(
            eval(&mut env, "join --sep \", \" (list 1 2) 3"),
            Ok(Value::from("1, 2, 3"))
        );

        match eval(&mut env, "count --limit 3 (list 1 2)") {
            Err(ExprError::UnusedOptions { method, names, .. }) => {
                assert_eq!(method, "count");
                assert_eq!(names, vec!["limit".to_string()]);
            }
            other => panic!("Expected unused options, got {:?}", other),
        }

        assert!(matches!(
            eval(&mut env, "1 --sep \",\""),
            Err(ExprError::DanglingOptions { names, .. }) if names == ["sep"]
        ));
        assert!(matches!(
            eval(&mut env, "join \"a\" --sep"),
            Err(ExprError::MissingOptionValue { name, .. }) if name == "sep"
        ));
        assert!(matches!(
            eval(&mut env, "join --sep \",\" --sep \";\" \"a\""),
            Err(ExprError::DuplicateOption { name, .. }) if name == "sep"
        ));
    }

    #[test]
    fn test_evaluator_11_chain_must_reduce_to_one_value() {
        let mut env = Environment::with_prelude();

        assert!(matches!(
            eval(&mut env, "1 2 3"),
            Err(ExprError::Chain { leftover: 3, .. })
        ));
        assert!(matches!(
            eval(&mut env, "(set 'y 1) 2"),
            Err(ExprError::Chain { leftover: 2, .. })
        ));
    }

    #[test]
    fn test_evaluator_12_method_failures_carry_call_site() {
        let mut env = Environment::with_prelude();

        match eval(&mut env, "+ 1 / 4 0") {
            Err(ExprError::Method {
                method,
                message,
                pos,
            }) => {
                assert_eq!(method, "/");
                assert_eq!(message, "Division by zero");
                assert_eq!(pos, Position::new(4, 1));
            }
            other => panic!("Expected method error, got {:?}", other),
        }

        assert!(matches!(
            eval(&mut env, "not 3"),
            Err(ExprError::Method { method, .. }) if method == "not"
        ));
    }

    #[test]
    fn test_evaluator_13_cancel_propagates_untouched() {
        let mut env = Environment::with_prelude();
        env.add_method(NativeMethod::new("choose", 0, |_, _, _, _, _| {
            Err(ExprError::Canceled)
        }))
        .unwrap();

        let result = eval(&mut env, "map (list 1 2) '(+ $it choose)");

        assert_eq!(result, Err(ExprError::Canceled));
        assert!(result.unwrap_err().is_canceled());
    }

    #[test]
    fn test_evaluator_14_depth_limit() {
        let mut env = Environment::with_prelude();
        let eval = Evaluator::with_max_depth(32);

        eval.evaluate_source(&mut env, "set 'loop '(run loop)").unwrap();

        match eval.evaluate_source(&mut env, "run loop") {
            Err(ExprError::Method { method, message, .. }) => {
                assert_eq!(method, "run");
                assert!(message.contains("32"));
            }
            other => panic!("Expected depth failure, got {:?}", other),
        }
    }

    #[test]
    fn test_evaluator_15_host_call_with_stub_arguments() {
        let mut env = Environment::with_prelude();
        env.add_method(NativeMethod::new("cost", 1, |env, _, params, _, _| {
            let card: Rc<Card> = env.expect_convert(&params[0])?;
            Ok(Value::Int(card.cost))
        }))
        .unwrap();

        let eval = Evaluator::new();
        let card = Value::host(Card { cost: 4 });

        assert_eq!(
            eval.call(&mut env, "cost", vec![card.clone()]),
            Ok(Value::Int(4))
        );
        assert_eq!(
            eval.call(&mut env, "+", vec![Value::Int(2), Value::Int(3)]),
            Ok(Value::Int(5))
        );
        assert!(matches!(
            eval.call(&mut env, "cost", vec![Value::Int(1)]),
            Err(ExprError::Method { method, .. }) if method == "cost"
        ));
        assert!(matches!(
            eval.call(&mut env, "missing", vec![]),
            Err(ExprError::Resolve { .. })
        ));
    }

    #[test]
    fn test_evaluator_16_rest_consumes_remaining_values() {
        assert_evaluates("list", Value::List(vec![]));
        assert_evaluates("count list 1 2 3", Value::Int(3));
        assert_evaluates("count 7", Value::Int(1));
    }

    #[test]
    fn test_evaluator_17_methods_do_not_run_twice() {
        let mut env = Environment::with_prelude();
        let calls: Rc<Cell<i64>> = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        env.add_method(NativeMethod::new("tick", 0, move |_, _, _, _, _| {
            counter.set(counter.get() + 1);
            Ok(Value::Int(counter.get()))
        }))
        .unwrap();

        assert_eq!(eval(&mut env, "+ tick tick"), Ok(Value::Int(3)));
        assert_eq!(calls.get(), 2);

        eval(&mut env, "if false 'tick '0").unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_evaluator_18_parsed_tree_is_reusable() {
        let mut env = Environment::with_prelude();
        let source = "count (filter (list 1 2 3 4) '(> $it 2))";

        let first = cardexpr::parse(source).unwrap();
        let second = cardexpr::parse(source).unwrap();
        assert_eq!(first, second);

        let eval = Evaluator::new();
        assert_eq!(eval.evaluate(&mut env, &first), Ok(Value::Int(2)));
        assert_eq!(eval.evaluate(&mut env, &first), Ok(Value::Int(2)));
        assert_eq!(eval.evaluate(&mut env, &second), Ok(Value::Int(2)));
    }

    #[test]
    fn test_evaluator_19_default_depth_limit_is_an_error() {
        let mut env = Environment::with_prelude();
        let eval = Evaluator::new();

        eval.evaluate_source(&mut env, "set 'loop '(run loop)").unwrap();

        match eval.evaluate_source(&mut env, "run loop") {
            Err(ExprError::Method { method, message, .. }) => {
                assert_eq!(method, "run");
                assert!(message.contains(&DEFAULT_MAX_DEPTH.to_string()));
            }
            other => panic!("Expected depth failure, got {:?}", other),
        }

        assert_eq!(eval.evaluate_source(&mut env, "+ 1 1"), Ok(Value::Int(2)));
    }

    #[test]
    fn test_evaluator_20_deep_blocks_evaluate() {
        let mut env = Environment::with_prelude();
        let source = format!("{}+ 1 2{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));

        assert_eq!(eval(&mut env, &source), Ok(Value::Int(3)));
    }
}
