//! Taint Tag & Sanitizer Engine
//!
//! Tag attachment and propagation, the sanitizer-scenario state machine,
//! callstack-scoped sanitizer sets and the rule field-path matcher.

pub mod findings;
pub mod matcher;
pub mod rules;
pub mod sanitizers;
pub mod tags;

pub use findings::{Finding, FindingLog};
pub use rules::{load_rules, RuleFile, SanitizerRule, Severity, SinkRule, SourceRule};
pub use sanitizers::SanitizerEngine;
pub use tags::{SanitizerKind, SanitizerScenario, SourceLabel, TaintState, TaintTag};
