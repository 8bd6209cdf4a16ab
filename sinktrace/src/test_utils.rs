//! Compact AST builders used by the test suites.
//!
//! Front ends normally hand the engine JSON trees; tests build the same
//! interchange nodes directly. Every builder stamps a fresh synthetic
//! location so location-keyed dedup behaves as it would on real input.

use crate::ast::{Loc, LiteralValue, Node, NodeKind, NodeRef, Property};
use compact_str::CompactString;
use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;

thread_local! {
    static NEXT_LINE: Cell<usize> = const { Cell::new(1) };
}

/// The synthetic source file all builder nodes claim to come from.
#[must_use]
pub fn test_file() -> Arc<PathBuf> {
    Arc::new(PathBuf::from("fixtures/app.js"))
}

fn next_loc() -> Loc {
    let line = NEXT_LINE.with(|counter| {
        let line = counter.get();
        counter.set(line + 1);
        line
    });
    Loc {
        file: test_file(),
        start_line: line,
        start_col: 1,
        end_line: line,
        end_col: 80,
    }
}

fn node(kind: NodeKind) -> NodeRef {
    Arc::new(Node {
        kind,
        loc: next_loc(),
    })
}

/// A whole module.
#[must_use]
pub fn program(body: Vec<NodeRef>) -> NodeRef {
    node(NodeKind::Program { body })
}

/// A function declaration with identifier parameters.
#[must_use]
pub fn func_def(name: &str, params: &[&str], body: Vec<NodeRef>) -> NodeRef {
    node(NodeKind::FunctionDef {
        name: CompactString::from(name),
        params: params.iter().map(|param| ident(param)).collect(),
        body,
        is_async: false,
    })
}

/// A call expression.
#[must_use]
pub fn call(callee: NodeRef, arguments: Vec<NodeRef>) -> NodeRef {
    node(NodeKind::Call { callee, arguments })
}

/// A non-computed member access.
#[must_use]
pub fn member(object: NodeRef, prop: &str) -> NodeRef {
    node(NodeKind::Member {
        object,
        property: ident(prop),
        computed: false,
    })
}

/// An identifier reference.
#[must_use]
pub fn ident(name: &str) -> NodeRef {
    node(NodeKind::Identifier {
        name: CompactString::from(name),
    })
}

/// A string literal.
#[must_use]
pub fn lit_str(text: &str) -> NodeRef {
    node(NodeKind::Literal {
        value: LiteralValue::Str(text.to_owned()),
    })
}

/// A numeric literal.
#[must_use]
pub fn lit_num(number: f64) -> NodeRef {
    node(NodeKind::Literal {
        value: LiteralValue::Num(number),
    })
}

/// A `this` expression.
#[must_use]
pub fn this_expr() -> NodeRef {
    node(NodeKind::This)
}

/// A binary operation.
#[must_use]
pub fn binary(operator: &str, left: NodeRef, right: NodeRef) -> NodeRef {
    node(NodeKind::Binary {
        operator: CompactString::from(operator),
        left,
        right,
    })
}

/// A single-target assignment.
#[must_use]
pub fn assign(target: NodeRef, value: NodeRef) -> NodeRef {
    node(NodeKind::Assign { target, value })
}

/// A destructuring assignment over identifier targets.
#[must_use]
pub fn destructure(targets: &[&str], value: NodeRef) -> NodeRef {
    node(NodeKind::DestructuringAssign {
        targets: targets.iter().map(|target| ident(target)).collect(),
        value,
    })
}

/// A return statement.
#[must_use]
pub fn ret(value: Option<NodeRef>) -> NodeRef {
    node(NodeKind::Return { value })
}

/// A two-way branch.
#[must_use]
pub fn if_stmt(test: NodeRef, then_body: Vec<NodeRef>, else_body: Vec<NodeRef>) -> NodeRef {
    node(NodeKind::If {
        test,
        then_body,
        else_body,
    })
}

/// An object literal.
#[must_use]
pub fn object_lit(properties: Vec<(&str, NodeRef)>) -> NodeRef {
    node(NodeKind::ObjectLiteral {
        properties: properties
            .into_iter()
            .map(|(key, value)| Property {
                key: CompactString::from(key),
                value,
            })
            .collect(),
    })
}

/// An array literal.
#[must_use]
pub fn array_lit(elements: Vec<NodeRef>) -> NodeRef {
    node(NodeKind::ArrayLiteral { elements })
}
