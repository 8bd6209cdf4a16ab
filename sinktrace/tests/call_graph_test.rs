//! Tests for call-graph recording and boundary entry-point resolution.

use sinktrace::call_graph::{resolve_boundary_entry_points, CallGraph};
use sinktrace::test_utils::{assign, call, func_def, ident, member, program, ret};

fn site() -> sinktrace::ast::NodeRef {
    call(ident("g"), vec![])
}

#[test]
fn test_cycle_reachable_from_root_yields_only_root() {
    // f -> g, g -> h, h -> g: the 2-cycle is reachable only from f.
    let mut graph = CallGraph::new();
    graph.add_node("f", Some(func_def("f", &[], vec![])), false);
    graph.add_node("g", Some(func_def("g", &[], vec![])), false);
    graph.add_node("h", Some(func_def("h", &[], vec![])), false);
    graph.record_invocation("f", "g", site());
    graph.record_invocation("g", "h", site());
    graph.record_invocation("h", "g", site());

    let boundaries = resolve_boundary_entry_points(&graph);
    assert_eq!(boundaries, vec!["f"]);
}

#[test]
fn test_isolated_cycle_yields_one_terminal() {
    let mut graph = CallGraph::new();
    graph.add_node("g", Some(func_def("g", &[], vec![])), false);
    graph.add_node("h", Some(func_def("h", &[], vec![])), false);
    graph.record_invocation("g", "h", site());
    graph.record_invocation("h", "g", site());

    let boundaries = resolve_boundary_entry_points(&graph);
    assert_eq!(boundaries.len(), 1);
    assert!(boundaries[0] == "g" || boundaries[0] == "h");
}

#[test]
fn test_self_recursion_terminates() {
    let mut graph = CallGraph::new();
    graph.add_node("f", Some(func_def("f", &[], vec![])), false);
    graph.record_invocation("f", "f", site());

    let boundaries = resolve_boundary_entry_points(&graph);
    assert_eq!(boundaries, vec!["f"]);
}

#[test]
fn test_synthetic_callers_do_not_disqualify() {
    // An edge from a synthetic source (an unresolved callee placeholder used
    // as a caller) must not stop the target from being a boundary.
    let mut graph = CallGraph::new();
    graph.add_node("real", Some(func_def("real", &[], vec![])), false);
    graph.add_node("phantom", None, true);
    graph.record_invocation("phantom", "real", site());

    let boundaries = resolve_boundary_entry_points(&graph);
    assert_eq!(boundaries, vec!["real"]);
}

#[test]
fn test_synthetic_roots_are_not_boundaries() {
    let mut graph = CallGraph::new();
    graph.add_node("console.log", None, true);
    let boundaries = resolve_boundary_entry_points(&graph);
    assert!(boundaries.is_empty());
}

#[test]
fn test_record_program_builds_edges_and_boundaries() {
    // main() calls helper(); nothing calls main.
    let helper = func_def(
        "helper",
        &["x"],
        vec![ret(Some(ident("x")))],
    );
    let main = func_def(
        "main",
        &[],
        vec![assign(ident("r"), call(ident("helper"), vec![]))],
    );
    let module = program(vec![helper, main]);

    let mut graph = CallGraph::new();
    graph.record_program(&module);

    // Module stem of the builders' synthetic file is `app`.
    assert!(graph.nodes.contains_key("app.main"));
    assert!(graph.nodes.contains_key("app.helper"));
    assert!(graph
        .edges
        .iter()
        .any(|edge| edge.caller == "app.main" && edge.callee == "app.helper"));

    let boundaries = resolve_boundary_entry_points(&graph);
    assert!(boundaries.contains(&"app.main".into()));
    assert!(!boundaries.contains(&"app.helper".into()));
}

#[test]
fn test_record_program_method_calls_stay_synthetic() {
    let main = func_def(
        "main",
        &[],
        vec![call(member(ident("db"), "run"), vec![])],
    );
    let module = program(vec![main]);

    let mut graph = CallGraph::new();
    graph.record_program(&module);

    let callee = graph.nodes.get("db.run").map(|node| node.synthetic);
    assert_eq!(callee, Some(true));
}
