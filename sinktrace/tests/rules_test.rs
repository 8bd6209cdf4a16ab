//! Tests for rule-file parsing and loading.

use sinktrace::errors::EngineError;
use sinktrace::taint::rules::{load_rules, RuleFile, Severity};
use sinktrace::taint::tags::{SanitizerKind, SanitizerScenario};
use std::io::Write;

const SAMPLE_RULES: &str = r#"{
    "sources": [
        {"name": "http-param", "fsig": "req.query.**"},
        {"name": "cli-arg", "fsig": "process.argv"}
    ],
    "sanitizers": [
        {
            "id": "escape-html",
            "sanitizerType": "FunctionCallSanitizer",
            "sanitizerScenario": "ValidateByCall",
            "calleeType": "validator.escape",
            "args": [0]
        },
        {
            "id": "regex-guard",
            "sanitizerType": "BinaryOperationSanitizer",
            "sanitizerScenario": "ValidateByBinaryOp",
            "operator": "matches",
            "targetValue": "^\\^"
        },
        {
            "id": "implicit",
            "sanitizerType": "FunctionCallSanitizer",
            "calleeType": "audit.log"
        }
    ],
    "sinks": {
        "FuncCallTaintSink": [
            {
                "name": "sql-exec",
                "fsig": "db.query",
                "args": [0],
                "sanitizerIds": ["escape-html"],
                "severity": "Critical",
                "remediation": "Use parameterized queries."
            }
        ],
        "ObjectTaintFuncCallSink": [
            {"name": "render", "fsig": "res.send"}
        ]
    }
}"#;

#[test]
fn test_rule_file_parses() {
    let rules: RuleFile = serde_json::from_str(SAMPLE_RULES).unwrap();

    assert_eq!(rules.sources.len(), 2);
    assert_eq!(rules.sanitizers.len(), 3);
    assert_eq!(rules.sinks.func_call.len(), 1);
    assert_eq!(rules.sinks.object_func_call.len(), 1);

    let escape = &rules.sanitizers[0];
    assert_eq!(escape.sanitizer_type, SanitizerKind::FunctionCallSanitizer);
    assert_eq!(escape.scenario, SanitizerScenario::ValidateByCall);
    assert_eq!(escape.args.as_deref(), Some(&[0][..]));

    // Unspecified scenario deserializes to Default.
    assert_eq!(rules.sanitizers[2].scenario, SanitizerScenario::Default);

    let sink = &rules.sinks.func_call[0];
    assert_eq!(sink.severity, Severity::Critical);
    assert_eq!(sink.sanitizer_ids, vec!["escape-html"]);

    // Severity defaults to High when omitted.
    assert_eq!(rules.sinks.object_func_call[0].severity, Severity::High);
}

#[test]
fn test_empty_rule_file_is_valid() {
    let rules: RuleFile = serde_json::from_str("{}").unwrap();
    assert!(rules.sources.is_empty());
    assert!(rules.sanitizers.is_empty());
    assert!(rules.sinks.func_call.is_empty());
}

#[test]
fn test_load_rules_from_disk() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(SAMPLE_RULES.as_bytes())?;

    let rules = load_rules(file.path()).unwrap();
    assert_eq!(rules.sources.len(), 2);
    Ok(())
}

#[test]
fn test_unparsable_rules_are_an_error() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(b"{ not json")?;

    match load_rules(file.path()) {
        Err(EngineError::RuleParse(message)) => assert!(message.contains(".")),
        other => panic!("expected RuleParse error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_missing_rule_file_is_io_error() {
    match load_rules(std::path::Path::new("no/such/rules.json")) {
        Err(EngineError::Io(_)) => {}
        other => panic!("expected Io error, got {other:?}"),
    }
}
