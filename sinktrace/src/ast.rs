//! Front-end AST interchange model.
//!
//! The core never parses source text. Per-language front ends (JavaScript,
//! Java, Go, Python) hand over their trees in this estree-shaped form, either
//! in process or as JSON. Every node carries a `type` discriminant and a
//! source location; type-specific children follow the usual names (`callee`,
//! `arguments`, `object`/`property`, `operator`/`left`/`right`).

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared handle to an AST node. Nodes are immutable once built; values keep
/// these as provenance references.
pub type NodeRef = Arc<Node>;

/// Source location of a node: file plus 1-indexed line/column span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loc {
    /// Source file the node came from.
    pub file: Arc<PathBuf>,
    /// First line of the node (1-indexed).
    pub start_line: usize,
    /// First column of the node (1-indexed).
    #[serde(default)]
    pub start_col: usize,
    /// Last line of the node (1-indexed).
    pub end_line: usize,
    /// Last column of the node (1-indexed).
    #[serde(default)]
    pub end_col: usize,
}

/// A single AST node: discriminant plus location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// The node discriminant and its children.
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Where the node sits in its source file.
    pub loc: Loc,
}

/// Literal payloads carried by `NodeKind::Literal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    /// String literal.
    Str(String),
    /// Numeric literal.
    Num(f64),
    /// Boolean literal.
    Bool(bool),
    /// Null/None/nil literal.
    Null,
}

/// One `key: value` entry of an object literal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    /// Property name.
    pub key: CompactString,
    /// Property value expression.
    pub value: NodeRef,
}

/// The node discriminant, tagged `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// A whole module/file.
    Program {
        /// Top-level statements.
        body: Vec<NodeRef>,
    },
    /// Function declaration.
    FunctionDef {
        /// Declared name.
        name: CompactString,
        /// Parameter identifiers.
        params: Vec<NodeRef>,
        /// Body statements.
        body: Vec<NodeRef>,
        /// Whether the front end flagged this as async.
        #[serde(default)]
        is_async: bool,
    },
    /// Call expression.
    Call {
        /// Callee expression.
        callee: NodeRef,
        /// Positional arguments.
        arguments: Vec<NodeRef>,
    },
    /// Member access `object.property` (or `object[property]` when computed).
    Member {
        /// Receiver expression.
        object: NodeRef,
        /// Property expression (an identifier unless computed).
        property: NodeRef,
        /// True for subscript-style access.
        #[serde(default)]
        computed: bool,
    },
    /// Plain identifier reference.
    Identifier {
        /// The referenced name.
        name: CompactString,
    },
    /// Literal value.
    Literal {
        /// The literal payload.
        value: LiteralValue,
    },
    /// `this`/`self` expression.
    This,
    /// Binary operation.
    Binary {
        /// Operator token as written (`+`, `==`, `matches`, ...).
        operator: CompactString,
        /// Left operand.
        left: NodeRef,
        /// Right operand.
        right: NodeRef,
    },
    /// Single-target assignment.
    Assign {
        /// Assignment target (identifier or member chain).
        target: NodeRef,
        /// Assigned expression.
        value: NodeRef,
    },
    /// Destructuring assignment: one value, several targets.
    DestructuringAssign {
        /// Target identifiers, in declaration order.
        targets: Vec<NodeRef>,
        /// The destructured expression.
        value: NodeRef,
    },
    /// Return statement.
    Return {
        /// Returned expression, if any.
        value: Option<NodeRef>,
    },
    /// Two-way branch.
    If {
        /// Branch condition.
        test: NodeRef,
        /// Statements of the then-branch.
        then_body: Vec<NodeRef>,
        /// Statements of the else-branch (may be empty).
        #[serde(default)]
        else_body: Vec<NodeRef>,
    },
    /// Object literal.
    ObjectLiteral {
        /// Key/value entries.
        properties: Vec<Property>,
    },
    /// Array literal.
    ArrayLiteral {
        /// Element expressions.
        elements: Vec<NodeRef>,
    },
}

impl Node {
    /// Dotted name of a member-access chain rooted at an identifier or
    /// `this`, e.g. `req.body.name`. `None` for chains the engine cannot
    /// name statically (computed access, call results, literal roots).
    #[must_use]
    pub fn chain_name(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Identifier { name } => Some(name.to_string()),
            NodeKind::This => Some("this".to_owned()),
            NodeKind::Member {
                object,
                property,
                computed,
            } => {
                if *computed {
                    return None;
                }
                let prop = match &property.kind {
                    NodeKind::Identifier { name } => name.as_str(),
                    _ => return None,
                };
                object.chain_name().map(|base| format!("{base}.{prop}"))
            }
            _ => None,
        }
    }

    /// Call-site-boundary identity of this node: source file plus line span.
    #[must_use]
    pub fn boundary_id(&self) -> CompactString {
        CompactString::from(format!(
            "{}:{}-{}",
            self.loc.file.display(),
            self.loc.start_line,
            self.loc.end_line
        ))
    }

    /// Stable dedup key for this node's location, including the column.
    #[must_use]
    pub fn loc_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.loc.file.display(),
            self.loc.start_line,
            self.loc.start_col
        )
    }
}
