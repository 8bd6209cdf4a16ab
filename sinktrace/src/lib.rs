//! sinktrace — symbolic value model and taint-propagation core for
//! multi-language static taint analysis.
//!
//! Per-language front ends (JavaScript, Java, Go, Python) feed the engine
//! estree-shaped ASTs and rule files; the engine abstractly interprets the
//! program over a symbolic value graph, propagating taint tags and sanitizer
//! evidence from untrusted sources toward dangerous sinks, and reports each
//! unsanitized flow as a finding.
//!
//! # Structure
//! - [`value`]: the tagged value model, field/scope resolution and the union
//!   merge engine
//! - [`taint`]: tags, rules, the sanitizer-scenario engine, the field-path
//!   matcher and findings
//! - [`call_graph`]: call-graph recording and boundary entry-point resolution
//! - [`interp`]: the tree-walking abstract interpreter and entry-point loop

pub mod ast;
pub mod call_graph;
pub mod cli;
pub mod config;
pub mod constants;
pub mod entry_point;
pub mod errors;
pub mod interp;
pub mod output;
pub mod taint;
pub mod test_utils;
pub mod utils;
pub mod value;

pub use interp::{EntryPointDescriptor, Interpreter};
pub use taint::{Finding, RuleFile, SanitizerEngine};
pub use value::{Value, ValueKind, ValueRef};
