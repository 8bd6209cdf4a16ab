//! End-to-end interpreter tests: source→sink flows, sanitizer suppression,
//! promise modeling, branch merging and entry-point isolation.

use compact_str::CompactString;
use sinktrace::interp::{EntryPointDescriptor, Interpreter};
use sinktrace::taint::rules::RuleFile;
use sinktrace::test_utils::{
    assign, call, destructure, func_def, ident, if_stmt, lit_str, member, program, test_file,
};
use sinktrace::value::Value;
use std::rc::Rc;

fn interp_with(rules_json: &str) -> Interpreter {
    let rules: RuleFile = serde_json::from_str(rules_json).unwrap();
    Interpreter::new(Rc::new(rules), 10_000)
}

fn entry(function_name: &str) -> EntryPointDescriptor {
    EntryPointDescriptor {
        file_path: test_file(),
        function_name: CompactString::from(function_name),
        attribute: None,
        entry_point_symbol: None,
        scope_value: None,
        argument_values: Vec::new(),
    }
}

fn untainted_request() -> Vec<sinktrace::ValueRef> {
    vec![Value::object("req").into_ref()]
}

const FLOW_RULES: &str = r#"{
    "sources": [{"name": "http-param", "fsig": "req.query.**"}],
    "sinks": {"FuncCallTaintSink": [{"name": "sql-exec", "fsig": "db.run", "args": [0]}]}
}"#;

#[test]
fn test_source_to_sink_flow() {
    let handler = func_def(
        "handler",
        &["req"],
        vec![
            assign(
                ident("q"),
                member(member(ident("req"), "query"), "name"),
            ),
            call(member(ident("db"), "run"), vec![ident("q")]),
        ],
    );
    let mut interp = interp_with(FLOW_RULES);
    interp.load_program(&program(vec![handler]));

    let mut handler_entry = entry("handler");
    handler_entry.argument_values = untainted_request();
    let findings = interp.run(&[handler_entry]);

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].checker_id, "FuncCallTaintSink");
    assert_eq!(findings[0].source_tag, "http-param");
    assert_eq!(findings[0].sink_rule_name, "sql-exec");
}

#[test]
fn test_entry_params_are_conservatively_tainted() {
    let rules = r#"{
        "sinks": {"FuncCallTaintSink": [{"name": "exec", "fsig": "db.run", "args": [0]}]}
    }"#;
    let handler = func_def(
        "handler",
        &["payload"],
        vec![call(member(ident("db"), "run"), vec![ident("payload")])],
    );
    let mut interp = interp_with(rules);
    interp.load_program(&program(vec![handler]));

    let findings = interp.run(&[entry("handler")]);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].source_tag, "param:payload");
}

#[test]
fn test_validate_by_call_suppresses_sink() {
    let rules = r#"{
        "sources": [{"name": "http-param", "fsig": "req.query.**"}],
        "sanitizers": [{
            "id": "escape",
            "sanitizerType": "FunctionCallSanitizer",
            "sanitizerScenario": "ValidateByCall",
            "calleeType": "validator.escape"
        }],
        "sinks": {"FuncCallTaintSink": [{
            "name": "sql-exec", "fsig": "db.run", "args": [0],
            "sanitizerIds": ["escape"]
        }]}
    }"#;

    let sanitized = func_def(
        "sanitized",
        &["req"],
        vec![
            assign(ident("q"), member(member(ident("req"), "query"), "a")),
            assign(
                ident("s"),
                call(member(ident("validator"), "escape"), vec![ident("q")]),
            ),
            call(member(ident("db"), "run"), vec![ident("s")]),
        ],
    );
    let raw = func_def(
        "raw",
        &["req"],
        vec![
            assign(ident("q"), member(member(ident("req"), "query"), "b")),
            call(member(ident("db"), "run"), vec![ident("q")]),
        ],
    );
    let mut interp = interp_with(rules);
    interp.load_program(&program(vec![sanitized, raw]));

    let mut sanitized_entry = entry("sanitized");
    sanitized_entry.argument_values = untainted_request();
    let mut raw_entry = entry("raw");
    raw_entry.argument_values = untainted_request();

    let findings = interp.run(&[sanitized_entry, raw_entry]);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].source_tag, "http-param");
}

#[test]
fn test_callstack_sanitizer_does_not_leak_across_entry_points() {
    let rules = r#"{
        "sources": [{"name": "http-param", "fsig": "req.query.**"}],
        "sanitizers": [{
            "id": "ctx",
            "sanitizerType": "FunctionCallSanitizer",
            "sanitizerScenario": "CallstackHasCall",
            "calleeType": "enterSafeMode"
        }],
        "sinks": {"FuncCallTaintSink": [{
            "name": "sql-exec", "fsig": "db.run", "args": [0],
            "sanitizerIds": ["ctx"]
        }]}
    }"#;

    let guarded = func_def(
        "guarded",
        &["req"],
        vec![
            call(ident("enterSafeMode"), vec![]),
            call(
                member(ident("db"), "run"),
                vec![member(member(ident("req"), "query"), "a")],
            ),
        ],
    );
    let unguarded = func_def(
        "unguarded",
        &["req"],
        vec![call(
            member(ident("db"), "run"),
            vec![member(member(ident("req"), "query"), "b")],
        )],
    );
    let mut interp = interp_with(rules);
    interp.load_program(&program(vec![guarded, unguarded]));

    let mut guarded_entry = entry("guarded");
    guarded_entry.argument_values = untainted_request();
    let mut unguarded_entry = entry("unguarded");
    unguarded_entry.argument_values = untainted_request();

    // The guarded entry point runs first and records the callstack tag; the
    // unguarded one must not see it.
    let findings = interp.run(&[guarded_entry, unguarded_entry]);
    assert_eq!(findings.len(), 1);
}

#[test]
fn test_promise_handlers_run_synchronously() {
    let rules = r#"{
        "sinks": {"FuncCallTaintSink": [{"name": "exec", "fsig": "db.run", "args": [0]}]}
    }"#;

    let consume = func_def(
        "consume",
        &["data"],
        vec![call(member(ident("db"), "run"), vec![ident("data")])],
    );
    let handler = func_def(
        "handler",
        &["input"],
        vec![
            assign(
                ident("p"),
                call(member(ident("Promise"), "resolve"), vec![ident("input")]),
            ),
            call(member(ident("p"), "then"), vec![ident("consume")]),
        ],
    );
    let mut interp = interp_with(rules);
    interp.load_program(&program(vec![consume, handler]));

    let findings = interp.run(&[entry("handler")]);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].source_tag, "param:input");
    // The sink fires inside the handler invoked through `.then`.
    assert_eq!(findings[0].callstack.len(), 2);
}

#[test]
fn test_catch_handler_skipped_on_resolved_promise() {
    let rules = r#"{
        "sinks": {"FuncCallTaintSink": [{"name": "exec", "fsig": "db.run", "args": [0]}]}
    }"#;

    let consume = func_def(
        "consume",
        &["data"],
        vec![call(member(ident("db"), "run"), vec![ident("data")])],
    );
    let handler = func_def(
        "handler",
        &["input"],
        vec![
            assign(
                ident("p"),
                call(member(ident("Promise"), "resolve"), vec![ident("input")]),
            ),
            call(member(ident("p"), "catch"), vec![ident("consume")]),
        ],
    );
    let mut interp = interp_with(rules);
    interp.load_program(&program(vec![consume, handler]));

    let findings = interp.run(&[entry("handler")]);
    assert!(findings.is_empty());
}

#[test]
fn test_entry_point_failures_are_isolated() {
    let handler = func_def(
        "handler",
        &["req"],
        vec![
            assign(ident("q"), member(member(ident("req"), "query"), "x")),
            call(member(ident("db"), "run"), vec![ident("q")]),
        ],
    );
    let mut interp = interp_with(FLOW_RULES);
    interp.load_program(&program(vec![handler]));

    let mut good = entry("handler");
    good.argument_values = untainted_request();
    // The first entry point names a function that does not exist; the scan
    // must continue past it.
    let findings = interp.run(&[entry("no_such_function"), good]);
    assert_eq!(findings.len(), 1);
}

#[test]
fn test_branch_merge_keeps_tainted_path() {
    let handler = func_def(
        "handler",
        &["req"],
        vec![
            if_stmt(
                ident("cond"),
                vec![assign(
                    ident("x"),
                    member(member(ident("req"), "query"), "a"),
                )],
                vec![assign(ident("x"), lit_str("safe"))],
            ),
            call(member(ident("db"), "run"), vec![ident("x")]),
        ],
    );
    let mut interp = interp_with(FLOW_RULES);
    interp.load_program(&program(vec![handler]));

    let mut handler_entry = entry("handler");
    handler_entry.argument_values = untainted_request();
    let findings = interp.run(&[handler_entry]);

    // One branch assigns untrusted data: the merged union must keep it.
    assert_eq!(findings.len(), 1);
}

#[test]
fn test_destructuring_binds_tainted_fields() {
    let handler = func_def(
        "handler",
        &["req"],
        vec![
            destructure(&["name", "email"], member(ident("req"), "query")),
            call(member(ident("db"), "run"), vec![ident("name")]),
        ],
    );
    let mut interp = interp_with(FLOW_RULES);
    interp.load_program(&program(vec![handler]));

    let mut handler_entry = entry("handler");
    handler_entry.argument_values = untainted_request();
    let findings = interp.run(&[handler_entry]);
    assert_eq!(findings.len(), 1);
}

#[test]
fn test_object_taint_sink_fires_on_tainted_receiver() {
    let rules = r#"{
        "sources": [{"name": "http-param", "fsig": "req.query.**"}],
        "sinks": {"ObjectTaintFuncCallSink": [{"name": "render", "fsig": "res.send"}]}
    }"#;
    let handler = func_def(
        "handler",
        &["req"],
        vec![
            assign(
                ident("res"),
                member(member(ident("req"), "query"), "raw"),
            ),
            call(member(ident("res"), "send"), vec![lit_str("ok")]),
        ],
    );
    let mut interp = interp_with(rules);
    interp.load_program(&program(vec![handler]));

    let mut handler_entry = entry("handler");
    handler_entry.argument_values = untainted_request();
    let findings = interp.run(&[handler_entry]);

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].checker_id, "ObjectTaintFuncCallSink");
}

#[test]
fn test_same_flow_reported_once_per_entry_point() {
    let rules = r#"{
        "sinks": {"FuncCallTaintSink": [{"name": "exec", "fsig": "db.run", "args": [0]}]}
    }"#;
    let helper = func_def(
        "helper",
        &["data"],
        vec![call(member(ident("db"), "run"), vec![ident("data")])],
    );
    let handler = func_def(
        "handler",
        &["payload"],
        vec![
            call(ident("helper"), vec![ident("payload")]),
            call(ident("helper"), vec![ident("payload")]),
        ],
    );
    let mut interp = interp_with(rules);
    interp.load_program(&program(vec![helper, handler]));

    let findings = interp.run(&[entry("handler")]);
    assert_eq!(findings.len(), 1);
}

#[test]
fn test_exhausted_budget_degrades_quietly() {
    let handler = func_def(
        "handler",
        &["req"],
        vec![
            assign(ident("q"), member(member(ident("req"), "query"), "x")),
            call(member(ident("db"), "run"), vec![ident("q")]),
        ],
    );
    let rules: RuleFile = serde_json::from_str(FLOW_RULES).unwrap();
    let mut interp = Interpreter::new(Rc::new(rules), 2);
    interp.load_program(&program(vec![handler]));

    let mut handler_entry = entry("handler");
    handler_entry.argument_values = untainted_request();
    let findings = interp.run(&[handler_entry]);
    assert!(findings.is_empty());
}
