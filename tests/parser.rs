#[cfg(test)]
mod parser_tests {
    use std::rc::Rc;

    use cardexpr::error::ExprError;
    use cardexpr::expr::Expr;
    use cardexpr::parser::{parse, MAX_NESTING};
    use cardexpr::printer::Printer;
    use cardexpr::token::{Number, Position};

    fn assert_round_trip(source: &str) {
        let expr: Expr = parse(source).expect("parse");

        assert_eq!(Printer.print(&expr), source);
        assert_eq!(parse(&Printer.print(&expr)).expect("reparse"), expr);
    }

    fn assert_parse_error(source: &str, fragment: &str) {
        match parse(source) {
            Err(ExprError::Parse { message, .. }) => assert!(
                message.contains(fragment),
                "Expected '{}' in '{}'",
                fragment,
                message
            ),
            other => panic!("Expected parse error for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_parser_01_program_is_flat_chain() {
        let expr: Expr = parse("+ 1 * 2 3").expect("parse");

        assert_eq!(
            expr,
            Expr::Chain(vec![
                Expr::identifier("+", Position::new(0, 1)),
                Expr::Number(Number::Int(1)),
                Expr::identifier("*", Position::new(4, 1)),
                Expr::Number(Number::Int(2)),
                Expr::Number(Number::Int(3)),
            ])
        );
    }

    #[test]
    fn test_parser_02_blocks_and_deferred() {
        let expr: Expr = parse("filter (list 1) '(>= $it 3)").expect("parse");

        let Expr::Chain(terms) = expr else {
            panic!("Program should be a chain");
        };

        assert_eq!(terms.len(), 3);
        assert_eq!(terms[0].as_identifier(), Some("filter"));

        match &terms[1] {
            Expr::Block(inner) => {
                assert!(matches!(inner.as_ref(), Expr::Chain(items) if items.len() == 2))
            }
            other => panic!("Expected block, got {:?}", other),
        }

        match &terms[2] {
            Expr::Deferred(inner) => match inner.as_ref() {
                Expr::Block(chain) => assert_eq!(chain.to_string(), ">= $it 3"),
                other => panic!("Expected deferred block, got {:?}", other),
            },
            other => panic!("Expected deferred, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_03_quote_binds_one_term() {
        let expr: Expr = parse("set 'x 12").expect("parse");

        assert_eq!(
            expr,
            Expr::Chain(vec![
                Expr::identifier("set", Position::new(0, 1)),
                Expr::Deferred(Rc::new(Expr::identifier("x", Position::new(5, 1)))),
                Expr::Number(Number::Int(12)),
            ])
        );
    }

    #[test]
    fn test_parser_04_options_are_terms() {
        let expr: Expr = parse("join --sep \", \" a").expect("parse");

        let Expr::Chain(terms) = expr else {
            panic!("Program should be a chain");
        };

        assert!(matches!(&terms[1], Expr::Option { name, pos } if name == "sep" && pos.offset == 5));
        assert_eq!(terms[2], Expr::Text(", ".to_string()));
    }

    #[test]
    fn test_parser_05_canonical_round_trip() {
        assert_round_trip("+ 1 * 2 3");
        assert_round_trip("filter (list 1 2 3 4 5) '(>= $it 3)");
        assert_round_trip("if (== x -2.5) ''y _");
        assert_round_trip("join --sep \"\\\"\\n\" (list \"a\\\\b\" 4.0)");
    }

    #[test]
    fn test_parser_06_errors() {
        assert_parse_error("", "Expected expression");
        assert_parse_error("   \n ", "Expected expression");
        assert_parse_error("+ 1 2)", "Unexpected ')'");
        assert_parse_error("()", "Empty expression");
        assert_parse_error("(list 1 2", "Unbalanced '('");
        assert_parse_error("set 'x '", "after quote");
        assert_parse_error("(run ')", "after quote");
    }

    #[test]
    fn test_parser_07_error_positions() {
        let err: ExprError = parse("list\n(count 1").unwrap_err();

        assert_eq!(err.position(), Some(Position::new(5, 2)));
    }

    #[test]
    fn test_parser_08_lex_errors_surface() {
        assert_parse_error("list \"abc", "Unterminated string");
    }

    #[test]
    fn test_parser_09_position_of_subtree() {
        let expr: Expr = parse("\"a\" 1 (b c)").expect("parse");

        assert_eq!(expr.position(), Some(Position::new(7, 1)));
    }

    #[test]
    fn test_parser_10_nesting_limit() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));

        assert!(parse(&nested(MAX_NESTING)).is_ok());

        match parse(&nested(5000)) {
            Err(ExprError::Parse { message, pos }) => {
                assert!(message.contains("nested deeper"));
                assert_eq!(pos, Position::new(MAX_NESTING, 1));
            }
            other => panic!("Expected nesting error, got {:?}", other.map(|_| ())),
        }

        let quoted = format!("{}x", "'".repeat(5000));
        assert!(matches!(parse(&quoted), Err(ExprError::Parse { .. })));
    }
}
