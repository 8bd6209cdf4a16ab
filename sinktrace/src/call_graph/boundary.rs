//! Boundary entry-point resolution.
//!
//! A boundary entry point is a node never targeted by an edge from a
//! non-synthetic source — equivalently, never reached as a callee except
//! possibly through a cycle. These are the heuristic roots used as the
//! full-fallback entry-point set when no explicit entry points exist.

use super::CallGraph;
use compact_str::CompactString;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// Resolves the full boundary entry-point set of a graph.
///
/// Each unresolved node seeds one [`trace_callers`] traversal; a global
/// resolved set prevents re-expanding nodes across traversals. Results are
/// returned in deterministic (sorted-seed) order.
#[must_use]
pub fn resolve_boundary_entry_points(graph: &CallGraph) -> Vec<CompactString> {
    let mut already_resolved: FxHashSet<CompactString> = FxHashSet::default();
    let mut boundaries: Vec<CompactString> = Vec::new();

    let mut seeds: Vec<&CompactString> = graph.nodes.keys().collect();
    seeds.sort();

    for seed in seeds {
        if already_resolved.contains(seed) {
            continue;
        }
        trace_callers(graph, seed, &mut already_resolved, &mut boundaries);
    }

    boundaries
}

/// Cycle-safe reverse-BFS from `start` toward its ultimate callers.
///
/// Two visited sets guarantee termination on recursive and mutually
/// recursive call graphs: `already_resolved` is global across the whole
/// resolution, `on_current_path` detects cycles within this traversal only.
/// A node revisited within the same traversal is treated as a terminal — it
/// is pushed into the results when it carries a function definition and is
/// reached through the cycle alone — rather than expanded again.
pub fn trace_callers(
    graph: &CallGraph,
    start: &CompactString,
    already_resolved: &mut FxHashSet<CompactString>,
    out: &mut Vec<CompactString>,
) {
    let mut queue: VecDeque<CompactString> = VecDeque::new();
    queue.push_back(start.clone());
    let mut on_current_path: FxHashSet<CompactString> = FxHashSet::default();

    while let Some(current) = queue.pop_front() {
        if !on_current_path.insert(current.clone()) {
            continue;
        }
        already_resolved.insert(current.clone());

        let callers = graph.concrete_callers_of(&current);
        if callers.is_empty() {
            let is_concrete = graph
                .nodes
                .get(&current)
                .is_some_and(|node| !node.synthetic);
            if is_concrete {
                push_unique(out, current);
            }
            continue;
        }

        for caller in callers {
            if on_current_path.contains(&caller) {
                // Revisit within this traversal: the caller sits on a cycle.
                // It only qualifies as a boundary when nothing outside the
                // cycle reaches it and it has a real definition.
                let has_definition = graph
                    .nodes
                    .get(&caller)
                    .is_some_and(|node| node.definition.is_some());
                let cycle_only = graph
                    .concrete_callers_of(&caller)
                    .iter()
                    .all(|upstream| on_current_path.contains(upstream));
                if has_definition && cycle_only {
                    push_unique(out, caller);
                }
            } else if !already_resolved.contains(&caller) {
                queue.push_back(caller);
            }
        }
    }
}

fn push_unique(out: &mut Vec<CompactString>, id: CompactString) {
    if !out.contains(&id) {
        out.push(id);
    }
}
