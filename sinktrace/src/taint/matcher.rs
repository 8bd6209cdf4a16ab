//! Rule field-path matcher.
//!
//! Matches a member-access chain right-to-left against a dotted rule
//! pattern. `**` at any position matches the remainder unconditionally; a
//! trailing `*` on a segment is a prefix match. Identifier, literal and
//! `this` nodes only match at index 0, so a pattern binds its leftmost
//! segment to the actual root of the chain rather than to an arbitrary
//! sub-expression that happens to end the same way.

use crate::ast::{LiteralValue, Node, NodeKind};

/// Matches a node against a whole dotted signature pattern.
#[must_use]
pub fn match_fsig(node: &Node, fsig: &str) -> bool {
    let segments: Vec<&str> = fsig.split('.').collect();
    match segments.len() {
        0 => false,
        len => match_field(node, &segments, len - 1),
    }
}

/// Matches a member-access chain against `segments[..=index]`, rightmost
/// segment first.
#[must_use]
pub fn match_field(node: &Node, segments: &[&str], index: usize) -> bool {
    let Some(pattern) = segments.get(index) else {
        return false;
    };
    if *pattern == "**" {
        return true;
    }

    match &node.kind {
        NodeKind::Member {
            object,
            property,
            computed,
        } => {
            if *computed {
                return false;
            }
            let NodeKind::Identifier { name } = &property.kind else {
                return false;
            };
            if !segment_matches(pattern, name) {
                return false;
            }
            if index == 0 {
                // The chain is longer than the pattern; its root cannot bind.
                return false;
            }
            match_field(object, segments, index - 1)
        }
        NodeKind::Identifier { name } => index == 0 && segment_matches(pattern, name),
        NodeKind::This => index == 0 && segment_matches(pattern, "this"),
        NodeKind::Literal { value } => {
            let LiteralValue::Str(text) = value else {
                return false;
            };
            index == 0 && segment_matches(pattern, text)
        }
        // `a.b().c` — the call result carries its callee's chain.
        NodeKind::Call { callee, .. } => match_field(callee, segments, index),
        _ => false,
    }
}

fn segment_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ident, member};

    #[test]
    fn test_trailing_star_is_prefix_match() {
        let chain = member(member(ident("a"), "b"), "anything");
        assert!(match_fsig(&chain, "a.b.*"));
        assert!(match_fsig(&chain, "a.b.any*"));
        assert!(!match_fsig(&chain, "a.b.x*"));
    }

    #[test]
    fn test_root_must_bind() {
        // `x.a.b` must not match `a.b` even though the chain ends the same.
        let chain = member(member(ident("x"), "a"), "b");
        assert!(!match_fsig(&chain, "a.b"));
    }
}
