//! Tests for the rule field-path matcher.

use sinktrace::taint::matcher::{match_field, match_fsig};
use sinktrace::test_utils::{call, ident, lit_str, member, this_expr};

#[test]
fn test_exact_chain_match() {
    let chain = member(member(ident("a"), "b"), "c");
    assert!(match_fsig(&chain, "a.b.c"));
    assert!(!match_fsig(&chain, "a.b.d"));
    assert!(!match_fsig(&chain, "a.b"));
}

#[test]
fn test_trailing_star_prefix_match() {
    let chain = member(member(ident("a"), "b"), "anything");
    assert!(match_fsig(&chain, "a.b.*"));
    assert!(!match_fsig(&member(member(ident("a"), "c"), "anything"), "a.b.*"));
}

#[test]
fn test_double_star_matches_any_chain() {
    assert!(match_fsig(&ident("whatever"), "**"));
    assert!(match_fsig(&member(member(ident("x"), "y"), "z"), "**"));

    // `**` in tail position swallows any remainder.
    let deep = member(member(member(ident("req"), "body"), "user"), "name");
    assert!(match_fsig(&deep, "req.**"));
}

#[test]
fn test_root_binds_leftmost_segment() {
    // `wrapper.a.b` ends like `a.b` but its root is `wrapper`.
    let chain = member(member(ident("wrapper"), "a"), "b");
    assert!(!match_fsig(&chain, "a.b"));
}

#[test]
fn test_this_and_literal_roots() {
    let chain = member(this_expr(), "field");
    assert!(match_fsig(&chain, "this.field"));

    assert!(match_fsig(&lit_str("template"), "template"));
    assert!(!match_fsig(&lit_str("template"), "a.template"));
}

#[test]
fn test_call_in_chain_is_transparent() {
    // `db.connect().query` — the call result carries its callee's chain.
    let connect_call = call(member(ident("db"), "connect"), vec![]);
    let chain = member(connect_call, "query");
    assert!(match_fsig(&chain, "db.connect.query"));
}

#[test]
fn test_match_field_index_form() {
    let chain = member(ident("a"), "b");
    let segments = ["a", "b"];
    assert!(match_field(&chain, &segments, 1));
    assert!(!match_field(&chain, &segments, 0));
}
