//! Call-graph construction.
//!
//! Nodes are call-site-boundary identities (a function symbol, or file plus
//! line span); edges are caller→callee pairs discovered during a dedicated
//! dry pass over the ASTs. No checkers run during recording and no taint
//! state is touched — the graph exists solely so boundary entry points can be
//! derived when no explicit ones are declared.

use crate::ast::{Node, NodeKind, NodeRef};
use crate::constants::MAX_WALK_DEPTH;
use compact_str::CompactString;
use rustc_hash::FxHashMap;

pub mod boundary;

pub use boundary::resolve_boundary_entry_points;

/// A node of the call graph.
#[derive(Debug, Clone)]
pub struct CallGraphNode {
    /// Boundary identity of this node.
    pub id: CompactString,
    /// Function definition site, when the node corresponds to a declared
    /// function. Nodes without a definition never become entry points.
    pub definition: Option<NodeRef>,
    /// True for nodes fabricated during recording (module pseudo-frames,
    /// unresolved callees) rather than declared functions.
    pub synthetic: bool,
}

/// A caller→callee edge with its originating call site.
#[derive(Debug, Clone)]
pub struct CallEdge {
    /// Caller node id.
    pub caller: CompactString,
    /// Callee node id.
    pub callee: CompactString,
    /// The call expression that produced this edge.
    pub call_site: NodeRef,
}

/// Directed call graph built incrementally during the recording pass.
#[derive(Default)]
pub struct CallGraph {
    /// All known nodes by id.
    pub nodes: FxHashMap<CompactString, CallGraphNode>,
    /// All recorded edges.
    pub edges: Vec<CallEdge>,
    callers: FxHashMap<CompactString, Vec<CompactString>>,
}

impl CallGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node, upgrading a synthetic placeholder in place when the
    /// real declaration shows up later.
    pub fn add_node(&mut self, id: &str, definition: Option<NodeRef>, synthetic: bool) {
        let key = CompactString::from(id);
        match self.nodes.get_mut(&key) {
            Some(existing) => {
                if existing.synthetic && !synthetic {
                    existing.synthetic = false;
                    existing.definition = definition;
                }
            }
            None => {
                self.nodes.insert(
                    key.clone(),
                    CallGraphNode {
                        id: key,
                        definition,
                        synthetic,
                    },
                );
            }
        }
    }

    /// Records a caller→callee invocation. Unknown endpoints are created as
    /// synthetic placeholders.
    pub fn record_invocation(&mut self, caller: &str, callee: &str, call_site: NodeRef) {
        if !self.nodes.contains_key(caller) {
            self.add_node(caller, None, true);
        }
        if !self.nodes.contains_key(callee) {
            self.add_node(callee, None, true);
        }
        let caller = CompactString::from(caller);
        let callee = CompactString::from(callee);
        self.callers
            .entry(callee.clone())
            .or_default()
            .push(caller.clone());
        self.edges.push(CallEdge {
            caller,
            callee,
            call_site,
        });
    }

    /// Ids of every caller of `id`, in recording order.
    #[must_use]
    pub fn callers_of(&self, id: &str) -> &[CompactString] {
        self.callers.get(id).map_or(&[], Vec::as_slice)
    }

    /// Ids of non-synthetic callers of `id`.
    #[must_use]
    pub fn concrete_callers_of(&self, id: &str) -> Vec<CompactString> {
        self.callers_of(id)
            .iter()
            .filter(|caller| {
                self.nodes
                    .get(caller.as_str())
                    .is_some_and(|node| !node.synthetic)
            })
            .cloned()
            .collect()
    }

    /// Dry recording pass over one module's AST.
    ///
    /// First declares every function (nested ones under dotted names), then
    /// walks each body collecting call expressions. Calls inside a nested
    /// function belong to that function, not to its parent.
    pub fn record_program(&mut self, program: &NodeRef) {
        let NodeKind::Program { body } = &program.kind else {
            return;
        };
        let module = module_name(program);

        self.declare_functions(body, &module, 0);

        // Module top level is a synthetic pseudo-frame: its calls are
        // recorded but do not disqualify a callee from being a boundary.
        self.add_node(&module, None, true);
        let mut declared: Vec<(CompactString, NodeRef)> = Vec::new();
        collect_declared(body, &module, &mut declared, 0);

        self.record_calls_in(body, &module, &module, 0);
        for (symbol, definition) in &declared {
            if let NodeKind::FunctionDef {
                body: function_body,
                ..
            } = &definition.kind
            {
                self.record_calls_in(function_body, symbol, &module, 0);
            }
        }
    }

    fn declare_functions(&mut self, body: &[NodeRef], qualifier: &str, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            return;
        }
        for stmt in body {
            if let NodeKind::FunctionDef {
                name,
                body: nested,
                ..
            } = &stmt.kind
            {
                let symbol = format!("{qualifier}.{name}");
                self.add_node(&symbol, Some(std::sync::Arc::clone(stmt)), false);
                self.declare_functions(nested, &symbol, depth + 1);
            }
        }
    }

    fn record_calls_in(&mut self, body: &[NodeRef], caller: &str, module: &str, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            return;
        }
        for stmt in body {
            self.record_calls_in_node(stmt, caller, module, depth);
        }
    }

    fn record_calls_in_node(&mut self, node: &NodeRef, caller: &str, module: &str, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            return;
        }
        match &node.kind {
            // Nested definitions record their own calls in their own turn.
            NodeKind::FunctionDef { .. } => {}
            NodeKind::Call { callee, arguments } => {
                if let Some(name) = callee.chain_name() {
                    let resolved = self.resolve_callee(&name, module);
                    self.record_invocation(caller, &resolved, std::sync::Arc::clone(node));
                }
                self.record_calls_in_node(callee, caller, module, depth + 1);
                for argument in arguments {
                    self.record_calls_in_node(argument, caller, module, depth + 1);
                }
            }
            NodeKind::Member { object, .. } => {
                self.record_calls_in_node(object, caller, module, depth + 1);
            }
            NodeKind::Binary { left, right, .. } => {
                self.record_calls_in_node(left, caller, module, depth + 1);
                self.record_calls_in_node(right, caller, module, depth + 1);
            }
            NodeKind::Assign { target, value } => {
                self.record_calls_in_node(target, caller, module, depth + 1);
                self.record_calls_in_node(value, caller, module, depth + 1);
            }
            NodeKind::DestructuringAssign { value, .. } => {
                self.record_calls_in_node(value, caller, module, depth + 1);
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.record_calls_in_node(value, caller, module, depth + 1);
                }
            }
            NodeKind::If {
                test,
                then_body,
                else_body,
            } => {
                self.record_calls_in_node(test, caller, module, depth + 1);
                self.record_calls_in(then_body, caller, module, depth + 1);
                self.record_calls_in(else_body, caller, module, depth + 1);
            }
            NodeKind::ObjectLiteral { properties } => {
                for property in properties {
                    self.record_calls_in_node(&property.value, caller, module, depth + 1);
                }
            }
            NodeKind::ArrayLiteral { elements } => {
                for element in elements {
                    self.record_calls_in_node(element, caller, module, depth + 1);
                }
            }
            _ => {}
        }
    }

    /// Resolves a callee name to a declared symbol in this module when one
    /// exists; otherwise keeps the name as a synthetic endpoint.
    fn resolve_callee(&self, name: &str, module: &str) -> String {
        let qualified = format!("{module}.{name}");
        if self.nodes.contains_key(qualified.as_str()) {
            qualified
        } else {
            name.to_owned()
        }
    }
}

/// Module identity of a program node: its file stem.
#[must_use]
pub fn module_name(program: &Node) -> String {
    program
        .loc
        .file
        .file_stem()
        .map_or_else(|| "module".to_owned(), |stem| stem.to_string_lossy().into_owned())
}

fn collect_declared(
    body: &[NodeRef],
    qualifier: &str,
    out: &mut Vec<(CompactString, NodeRef)>,
    depth: usize,
) {
    if depth > MAX_WALK_DEPTH {
        return;
    }
    for stmt in body {
        if let NodeKind::FunctionDef {
            name,
            body: nested,
            ..
        } = &stmt.kind
        {
            let symbol = CompactString::from(format!("{qualifier}.{name}"));
            out.push((symbol.clone(), std::sync::Arc::clone(stmt)));
            collect_declared(nested, &symbol, out, depth + 1);
        }
    }
}
