//! Shared grammar fixtures for tests.
//!
//!     Three small but representative grammars: left-to-right arithmetic,
//!     a string-interpolation language exercising the lexer mode stack, and
//!     a cast-versus-parenthesis ambiguity resolved by a semantic predicate.
//!     Each is built once and shared; grammars are immutable after `build`.

use crate::grammar::{Grammar, GrammarBuilder, LexAction, Sym, DEFAULT_MODE};
use crate::parsing::PredicateContext;
use crate::token::Channel;
use once_cell::sync::Lazy;

/// expr := term (PLUS term)* ; term := NUMBER | IDENT | LPAREN expr RPAREN
pub static ARITH: Lazy<Grammar> = Lazy::new(|| {
    let mut g = GrammarBuilder::new("Arith");
    let number = g.token("NUMBER");
    let ident = g.token("IDENT");
    let plus = g.token("PLUS");
    let lparen = g.token("LPAREN");
    let rparen = g.token("RPAREN");
    let ws = g.token("WS");
    g.lex_rule(DEFAULT_MODE, "NUMBER", number, "[0-9]+").unwrap();
    g.lex_rule(DEFAULT_MODE, "IDENT", ident, "[a-zA-Z][a-zA-Z0-9]*")
        .unwrap();
    g.lex_rule(DEFAULT_MODE, "PLUS", plus, r"\+").unwrap();
    g.lex_rule(DEFAULT_MODE, "LPAREN", lparen, r"\(").unwrap();
    g.lex_rule(DEFAULT_MODE, "RPAREN", rparen, r"\)").unwrap();
    g.hidden_rule(DEFAULT_MODE, "WS", ws, r"[ \t\r\n]+").unwrap();

    let expr = g.rule("expr");
    let term = g.rule("term");
    g.alt(
        expr,
        vec![
            Sym::Rule(term),
            Sym::Star(vec![Sym::Token(plus), Sym::Rule(term)]),
        ],
    );
    g.alt(term, vec![Sym::Token(number)]);
    g.alt(term, vec![Sym::Token(ident)]);
    g.alt(
        term,
        vec![Sym::Token(lparen), Sym::Rule(expr), Sym::Token(rparen)],
    );
    g.build().expect("arith fixture grammar is well-formed")
});

/// String templates with interpolated expressions. A double quote pushes the
/// string mode; `{` pushes the expression mode inside it; the matching
/// closers pop. template := QUOTE part* ENDQUOTE ; part := TEXT | interp ;
/// interp := LBRACE IDENT RBRACE
pub static TEMPLATE: Lazy<Grammar> = Lazy::new(|| {
    let mut g = GrammarBuilder::new("Template");
    let quote = g.token("QUOTE");
    let endquote = g.token("ENDQUOTE");
    let text = g.token("TEXT");
    let lbrace = g.token("LBRACE");
    let rbrace = g.token("RBRACE");
    let ident = g.token("IDENT");
    let ws = g.token("WS");

    let string_mode = g.mode("STRING");
    let expr_mode = g.mode("EXPR");

    g.lex_rule_full(
        DEFAULT_MODE,
        "QUOTE",
        quote,
        "\"",
        Channel::Default,
        Some(LexAction::PushMode(string_mode)),
    )
    .unwrap();
    g.lex_rule_full(
        string_mode,
        "ENDQUOTE",
        endquote,
        "\"",
        Channel::Default,
        Some(LexAction::PopMode),
    )
    .unwrap();
    g.lex_rule_full(
        string_mode,
        "LBRACE",
        lbrace,
        r"\{",
        Channel::Default,
        Some(LexAction::PushMode(expr_mode)),
    )
    .unwrap();
    g.lex_rule(string_mode, "TEXT", text, "[^\"{]+").unwrap();
    g.lex_rule_full(
        expr_mode,
        "RBRACE",
        rbrace,
        r"\}",
        Channel::Default,
        Some(LexAction::PopMode),
    )
    .unwrap();
    g.lex_rule(expr_mode, "IDENT", ident, "[a-zA-Z][a-zA-Z0-9]*")
        .unwrap();
    g.hidden_rule(expr_mode, "WS", ws, " +").unwrap();

    let template = g.rule("template");
    let part = g.rule("part");
    let interp = g.rule("interp");
    g.alt(
        template,
        vec![
            Sym::Token(quote),
            Sym::Star(vec![Sym::Rule(part)]),
            Sym::Token(endquote),
        ],
    );
    g.alt(part, vec![Sym::Token(text)]);
    g.alt(part, vec![Sym::Rule(interp)]);
    g.alt(
        interp,
        vec![Sym::Token(lbrace), Sym::Token(ident), Sym::Token(rbrace)],
    );
    g.build().expect("template fixture grammar is well-formed")
});

fn second_token_is_type_name(ctx: &PredicateContext<'_>) -> bool {
    ctx.lt(2)
        .map(|t| t.text.chars().next().is_some_and(|c| c.is_uppercase()))
        .unwrap_or(false)
}

/// The classic cast-versus-parenthesized-expression ambiguity: both start
/// with `(`, and a semantic predicate (the name after `(` looks like a type)
/// picks the cast reading.
/// expr := {is_type}? LPAREN IDENT RPAREN expr | LPAREN expr RPAREN | IDENT
pub static CAST: Lazy<Grammar> = Lazy::new(|| {
    let mut g = GrammarBuilder::new("Cast");
    let lparen = g.token("LPAREN");
    let rparen = g.token("RPAREN");
    let ident = g.token("IDENT");
    let ws = g.token("WS");
    g.lex_rule(DEFAULT_MODE, "LPAREN", lparen, r"\(").unwrap();
    g.lex_rule(DEFAULT_MODE, "RPAREN", rparen, r"\)").unwrap();
    g.lex_rule(DEFAULT_MODE, "IDENT", ident, "[a-zA-Z][a-zA-Z0-9]*")
        .unwrap();
    g.hidden_rule(DEFAULT_MODE, "WS", ws, " +").unwrap();
    let is_type = g.predicate("is_type", second_token_is_type_name);

    let expr = g.rule("expr");
    g.alt(
        expr,
        vec![
            Sym::Pred(is_type),
            Sym::Token(lparen),
            Sym::Token(ident),
            Sym::Token(rparen),
            Sym::Rule(expr),
        ],
    );
    g.alt(
        expr,
        vec![Sym::Token(lparen), Sym::Rule(expr), Sym::Token(rparen)],
    );
    g.alt(expr, vec![Sym::Token(ident)]);
    g.build().expect("cast fixture grammar is well-formed")
});
