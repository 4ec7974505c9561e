//! End-to-end parses over the fixture grammars.
//!
//! Each test drives the full pipeline (mode-stack lexer, token stream,
//! predictive parser, tree builder) and checks the resulting tree shape
//! through its s-expression rendering.

use lexparse::testing::{ARITH, CAST, TEMPLATE};
use lexparse::{parse, EngineError, RuleId};

fn start(grammar: &lexparse::Grammar, rule: &str) -> RuleId {
    grammar.rule_id(rule).expect("fixture rule exists")
}

#[test]
fn test_arithmetic_chain_builds_flat_repetition() {
    let outcome = parse(&ARITH, "a+b", start(&ARITH, "expr")).unwrap();
    assert!(outcome.is_clean(), "diagnostics: {:?}", outcome.diagnostics);
    insta::assert_snapshot!(
        outcome.tree.to_sexpr(&ARITH),
        @"(expr (term a) + (term b))"
    );
}

#[test]
fn test_nested_parentheses_recurse_through_term() {
    let outcome = parse(&ARITH, "1 + (x + 2)", start(&ARITH, "expr")).unwrap();
    assert!(outcome.is_clean());
    insta::assert_snapshot!(
        outcome.tree.to_sexpr(&ARITH),
        @"(expr (term 1) + (term ( (expr (term x) + (term 2)) )))"
    );
}

#[test]
fn test_interpolated_template_switches_lexer_modes() {
    let outcome = parse(&TEMPLATE, "\"x={y}\"", start(&TEMPLATE, "template")).unwrap();
    assert!(outcome.is_clean(), "diagnostics: {:?}", outcome.diagnostics);
    insta::assert_snapshot!(
        outcome.tree.to_sexpr(&TEMPLATE),
        @r#"(template " (part x=) (part (interp { y })) ")"#
    );
}

#[test]
fn test_template_with_plain_text_only() {
    let outcome = parse(&TEMPLATE, "\"hello\"", start(&TEMPLATE, "template")).unwrap();
    assert!(outcome.is_clean());
    insta::assert_snapshot!(
        outcome.tree.to_sexpr(&TEMPLATE),
        @r#"(template " (part hello) ")"#
    );
}

#[test]
fn test_cast_reading_chosen_when_predicate_holds() {
    let outcome = parse(&CAST, "(Type)x", start(&CAST, "expr")).unwrap();
    assert!(outcome.is_clean(), "diagnostics: {:?}", outcome.diagnostics);
    insta::assert_snapshot!(
        outcome.tree.to_sexpr(&CAST),
        @"(expr ( Type ) (expr x))"
    );
}

#[test]
fn test_grouping_reading_chosen_when_predicate_fails() {
    let outcome = parse(&CAST, "(x)", start(&CAST, "expr")).unwrap();
    assert!(outcome.is_clean(), "diagnostics: {:?}", outcome.diagnostics);
    insta::assert_snapshot!(
        outcome.tree.to_sexpr(&CAST),
        @"(expr ( (expr x) ))"
    );
}

#[test]
fn test_unterminated_interpolation_is_fatal_with_position() {
    // End of input inside the expression mode violates mode balance; the
    // engine aborts with the exact position instead of producing a tree.
    let err = parse(&TEMPLATE, "\"x={y", start(&TEMPLATE, "template")).unwrap_err();
    let EngineError::InternalConsistency {
        line,
        column,
        offset,
        ..
    } = err;
    assert_eq!((line, column, offset), (1, 6, 5));
}

#[test]
fn test_parsing_is_deterministic() {
    let first = parse(&ARITH, "a + (b+c) + 12", start(&ARITH, "expr")).unwrap();
    let second = parse(&ARITH, "a + (b+c) + 12", start(&ARITH, "expr")).unwrap();
    assert_eq!(first.tree.to_sexpr(&ARITH), second.tree.to_sexpr(&ARITH));
    assert_eq!(first.diagnostics, second.diagnostics);
}
