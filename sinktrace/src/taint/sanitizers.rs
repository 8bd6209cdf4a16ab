//! Sanitizer-scenario engine.
//!
//! Each matched sanitizer rule records its effect according to its scenario:
//! on the matched argument values, on the call's return value, or in the
//! callstack-scoped set that represents "currently executing inside a
//! sanitizing context". The callstack-scoped set is owned here and cleared at
//! every entry point, so sanitizer evidence never leaks between unrelated
//! analysis runs.

use crate::ast::{LiteralValue, Node, NodeKind, NodeRef};
use crate::constants::{MAX_SANITIZER_LOOKUP_DEPTH, MAX_WALK_DEPTH};
use crate::errors::report_non_fatal;
use crate::taint::matcher::match_fsig;
use crate::taint::rules::{RuleFile, SanitizerRule};
use crate::taint::tags::{SanitizerKind, SanitizerScenario, TaintTag};
use crate::value::{ValueKind, ValueRef};
use compact_str::CompactString;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::{Rc, Weak};

/// The sanitizer-scenario state machine and its callstack-scoped tag set.
pub struct SanitizerEngine {
    rules: Rc<RuleFile>,
    /// Tags recorded for the current entry point's callstack; queried by sink
    /// checks, cleared by [`SanitizerEngine::begin_entry_point`].
    pub callstack_tags: Vec<TaintTag>,
    regex_cache: FxHashMap<String, Option<Regex>>,
}

impl SanitizerEngine {
    /// Creates an engine over a loaded rule set.
    #[must_use]
    pub fn new(rules: Rc<RuleFile>) -> Self {
        Self {
            rules,
            callstack_tags: Vec::new(),
            regex_cache: FxHashMap::default(),
        }
    }

    /// Entry-point boundary hook: clears the callstack-scoped set. The cost
    /// is re-deriving config sanitizers per entry point; the gain is that no
    /// tag from one entry point is ever visible to another's sink checks.
    pub fn begin_entry_point(&mut self) {
        self.callstack_tags.clear();
    }

    /// Function-call hook: dispatches every matching call sanitizer rule.
    pub fn on_call(
        &mut self,
        call_node: &NodeRef,
        callee_node: &Node,
        args: &[ValueRef],
        ret: &ValueRef,
        callstack: &[CompactString],
    ) {
        let rules = Rc::clone(&self.rules);
        for rule in &rules.sanitizers {
            if rule.sanitizer_type != SanitizerKind::FunctionCallSanitizer {
                continue;
            }
            let Some(pattern) = &rule.callee else {
                continue;
            };
            if !match_fsig(callee_node, pattern) {
                continue;
            }

            let tag = make_tag(rule, Some(call_node), callstack);
            match rule.scenario {
                SanitizerScenario::ValidateByCall => {
                    attach_to_args(rule, args, &tag);
                }
                SanitizerScenario::ConfigByCall => {
                    ret.borrow_mut().attach_tag(tag);
                }
                SanitizerScenario::FilterByCall => {
                    if !args.is_empty() {
                        ret.borrow_mut().attach_tag(tag);
                    }
                }
                SanitizerScenario::ValidateByBinaryOp => {}
                SanitizerScenario::CallstackHasCall | SanitizerScenario::Default => {
                    self.callstack_tags.push(tag);
                }
            }
        }
    }

    /// Binary-operation hook: `ValidateByBinaryOp` rules match an operator
    /// plus a literal-regex pattern on one operand and tag the other.
    #[allow(clippy::too_many_arguments)]
    pub fn on_binary_op(
        &mut self,
        bin_node: &NodeRef,
        operator: &str,
        left_node: &Node,
        right_node: &Node,
        left_value: &ValueRef,
        right_value: &ValueRef,
        callstack: &[CompactString],
    ) {
        let rules = Rc::clone(&self.rules);
        for rule in &rules.sanitizers {
            if rule.sanitizer_type != SanitizerKind::BinaryOperationSanitizer {
                continue;
            }
            if rule.operator.as_deref() != Some(operator) {
                continue;
            }
            let Some(pattern) = &rule.target_value else {
                continue;
            };
            let Some(regex) = self.compiled(pattern) else {
                continue;
            };

            let tag = make_tag(rule, Some(bin_node), callstack);
            if literal_matches(left_node, &regex) {
                right_value.borrow_mut().attach_tag(tag);
            } else if literal_matches(right_node, &regex) {
                left_value.borrow_mut().attach_tag(tag);
            }
        }
    }

    /// Collects every sanitizer tag a sink check at this point may consult:
    /// the callstack-scoped set, config tags reachable through the callee's
    /// receiver object graph (bounded depth), and flow tags on the argument
    /// value and its ancestors.
    #[must_use]
    pub fn find_matched_sanitizers(
        &self,
        receiver: Option<&ValueRef>,
        argument: &ValueRef,
    ) -> Vec<TaintTag> {
        let mut matched = self.callstack_tags.clone();
        if let Some(receiver) = receiver {
            collect_config_tags(receiver, &mut matched);
        }
        collect_flow_tags(argument, &mut matched);
        matched
    }

    /// Compiles and caches a rule regex; a malformed pattern is reported once
    /// and the rule is skipped from then on.
    fn compiled(&mut self, pattern: &str) -> Option<Regex> {
        if let Some(cached) = self.regex_cache.get(pattern) {
            return cached.clone();
        }
        let compiled = match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                report_non_fatal("rules", &format!("bad sanitizer regex '{pattern}': {e}"));
                None
            }
        };
        self.regex_cache
            .insert(pattern.to_owned(), compiled.clone());
        compiled
    }
}

fn make_tag(rule: &SanitizerRule, origin: Option<&NodeRef>, callstack: &[CompactString]) -> TaintTag {
    TaintTag {
        sanitizer_id: CompactString::from(rule.id.as_str()),
        kind: rule.sanitizer_type,
        scenario: rule.scenario,
        origin: origin.map(std::sync::Arc::clone),
        callstack_snapshot: callstack.to_vec(),
    }
}

fn attach_to_args(rule: &SanitizerRule, args: &[ValueRef], tag: &TaintTag) {
    match rule.args.as_deref() {
        Some(positions) if !positions.is_empty() => {
            for position in positions {
                if let Some(arg) = args.get(*position) {
                    arg.borrow_mut().attach_tag(tag.clone());
                }
            }
        }
        _ => {
            for arg in args {
                arg.borrow_mut().attach_tag(tag.clone());
            }
        }
    }
}

fn literal_matches(node: &Node, regex: &Regex) -> bool {
    match &node.kind {
        NodeKind::Literal {
            value: LiteralValue::Str(text),
        } => regex.is_match(text),
        _ => false,
    }
}

/// Walks the receiver's object graph breadth-first, collecting tags attached
/// by `ConfigByCall` rules, up to the configured depth.
fn collect_config_tags(receiver: &ValueRef, out: &mut Vec<TaintTag>) {
    let mut visited: FxHashSet<usize> = FxHashSet::default();
    let mut queue: Vec<(ValueRef, usize)> = vec![(Rc::clone(receiver), 0)];

    while let Some((value, depth)) = queue.pop() {
        if !visited.insert(Rc::as_ptr(&value) as usize) {
            continue;
        }
        {
            let v = value.borrow();
            for tag in &v.taint.tags {
                if tag.scenario == SanitizerScenario::ConfigByCall {
                    out.push(tag.clone());
                }
            }
            if let ValueKind::Union(union) = &v.kind {
                for member in &union.members {
                    queue.push((Rc::clone(member), depth));
                }
            }
        }
        if depth >= MAX_SANITIZER_LOOKUP_DEPTH {
            continue;
        }
        let fields = Rc::clone(&value.borrow().fields);
        for child in fields.borrow().values() {
            queue.push((Rc::clone(child), depth + 1));
        }
    }
}

/// Collects value-attached tags from the argument and its parent chain.
fn collect_flow_tags(argument: &ValueRef, out: &mut Vec<TaintTag>) {
    let mut current = Rc::clone(argument);
    for _ in 0..MAX_WALK_DEPTH {
        let next = {
            let v = current.borrow();
            for tag in &v.taint.tags {
                out.push(tag.clone());
            }
            v.parent.as_ref().and_then(Weak::upgrade)
        };
        match next {
            Some(parent) => current = parent,
            None => break,
        }
    }
}
