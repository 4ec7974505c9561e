//! Parser error recovery: every malformed input yields a tree plus ordered
//! diagnostics, and parsing always terminates.

use lexparse::testing::{ARITH, CAST};
use lexparse::{parse, DiagnosticKind, Parser, ParserConfig, RuleId};
use proptest::prelude::*;
use rstest::rstest;

fn expr() -> RuleId {
    ARITH.rule_id("expr").expect("fixture rule exists")
}

#[rstest]
#[case::clean("a+b", 0)]
#[case::doubled_operator("a++b", 1)]
#[case::trailing_operator("a+", 1)]
#[case::leading_operator("+a", 1)]
#[case::unclosed_group("(a", 1)]
fn test_recovery_produces_expected_diagnostic_count(
    #[case] source: &str,
    #[case] expected: usize,
) {
    let outcome = parse(&ARITH, source, expr()).unwrap();
    assert_eq!(
        outcome.diagnostics.len(),
        expected,
        "source {:?} produced {:?}",
        source,
        outcome.diagnostics
    );
}

#[test]
fn test_unclosed_group_inserts_missing_paren() {
    let outcome = parse(&ARITH, "(a", expr()).unwrap();
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::MissingToken);
    assert_eq!(outcome.diagnostics[0].expected, vec!["RPAREN".to_string()]);
    // The inserted token appears in the tree as an error leaf.
    assert!(outcome.tree.to_sexpr(&ARITH).contains("missing:RPAREN"));
}

#[test]
fn test_diagnostics_are_ordered_by_offset() {
    let outcome = parse(&ARITH, "a + # + (b", expr()).unwrap();
    assert!(outcome.diagnostics.len() >= 2);
    let offsets: Vec<_> = outcome.diagnostics.iter().map(|d| d.offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted);
    // Lexical and syntactic diagnostics are interleaved in one list.
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::Lexical));
}

#[test]
fn test_no_viable_alternative_names_rule_and_expected_set() {
    let outcome = parse(&ARITH, "+", expr()).unwrap();
    let diag = outcome
        .diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::NoViableAlternative)
        .expect("a no-viable diagnostic");
    assert_eq!(diag.rule.as_deref(), Some("term"));
    assert!(diag.expected.contains(&"NUMBER".to_string()));
    assert!(diag.expected.contains(&"IDENT".to_string()));
}

#[test]
fn test_exhausted_lookahead_budget_reports_ambiguity_when_asked() {
    let config = ParserConfig {
        max_lookahead: 1,
        report_ambiguities: true,
        ..ParserConfig::default()
    };
    let start = CAST.rule_id("expr").unwrap();
    let outcome = Parser::new(&CAST)
        .with_config(config)
        .parse("(Type)x", start)
        .unwrap();
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::Ambiguity));
}

#[test]
fn test_disabling_the_decision_cache_does_not_change_results() {
    let source = "(a+b) + (a+b) + (a+b)";
    let cached = parse(&ARITH, source, expr()).unwrap();
    let uncached = Parser::new(&ARITH)
        .with_config(ParserConfig {
            enable_decision_cache: false,
            ..ParserConfig::default()
        })
        .parse(source, expr())
        .unwrap();
    assert_eq!(cached.tree.to_sexpr(&ARITH), uncached.tree.to_sexpr(&ARITH));
    assert_eq!(cached.diagnostics, uncached.diagnostics);
}

proptest! {
    /// Whatever the input, the parse terminates with a tree; garbage is
    /// reflected in diagnostics, never in a panic or a hang.
    #[test]
    fn prop_parse_is_total_over_ascii(source in "[a-z0-9+() #]{0,48}") {
        let outcome = parse(&ARITH, &source, expr()).unwrap();
        let _ = outcome.tree.to_sexpr(&ARITH);
    }

    /// Clean inputs stay clean: a parse of a well-formed expression yields
    /// no diagnostics.
    #[test]
    fn prop_well_formed_sums_are_clean(
        terms in prop::collection::vec("[a-z][a-z0-9]{0,3}|[0-9]{1,4}", 1..6)
    ) {
        let source = terms.join(" + ");
        let outcome = parse(&ARITH, &source, expr()).unwrap();
        prop_assert!(outcome.is_clean(), "diagnostics: {:?}", outcome.diagnostics);
    }

    /// Error locality: one corrupt character injected into a well-formed
    /// expression yields exactly one diagnostic, at the corruption, and the
    /// regions around it parse as they did before the corruption.
    #[test]
    fn prop_single_corruption_yields_one_local_diagnostic(
        terms in prop::collection::vec("[a-z][a-z0-9]{0,3}|[0-9]{1,4}", 2..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let source = terms.join(" + ");
        let clean = parse(&ARITH, &source, expr()).unwrap();
        prop_assert!(clean.is_clean());

        // Corrupt one inter-token position so the damage cannot merge with
        // a neighboring token.
        let gaps: Vec<usize> = source
            .char_indices()
            .filter(|(_, c)| *c == ' ')
            .map(|(i, _)| i)
            .collect();
        let at = gaps[pick.index(gaps.len())];
        let mut corrupted = source.clone();
        corrupted.insert(at, '#');

        let outcome = parse(&ARITH, &corrupted, expr()).unwrap();
        prop_assert_eq!(
            outcome.diagnostics.len(),
            1,
            "corrupted {:?}: {:?}",
            corrupted,
            outcome.diagnostics
        );
        prop_assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::Lexical);
        prop_assert_eq!(outcome.diagnostics[0].offset, at);
        // Every valid region survives: the tree shape matches the clean
        // parse of the uncorrupted input.
        prop_assert_eq!(
            outcome.tree.to_sexpr(&ARITH),
            clean.tree.to_sexpr(&ARITH)
        );
    }
}
