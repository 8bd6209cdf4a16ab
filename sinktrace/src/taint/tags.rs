//! Taint tags and per-value taint state.
//!
//! A tag records that a value was cleared (or configured) by a specific
//! sanitizer rule; a source label records where untrusted data entered.
//! Tags are append-only: once created they are never mutated.

use crate::ast::NodeRef;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Which syntactic form a sanitizer rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SanitizerKind {
    /// Sanitizer triggered by a function call.
    FunctionCallSanitizer,
    /// Sanitizer triggered by a binary operation.
    BinaryOperationSanitizer,
}

/// Where a matched sanitizer's effect is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SanitizerScenario {
    /// Tag is attached directly to the matched argument value(s).
    ValidateByCall,
    /// Tag is attached to the call's return value, marking it as a
    /// sanitizer-producing config object for later structural lookup.
    ConfigByCall,
    /// Tag is added to the callstack-scoped set, not to any value.
    CallstackHasCall,
    /// Tag is attached to the return value only for calls with arguments.
    FilterByCall,
    /// Tag is attached to the operand opposite the matched literal.
    ValidateByBinaryOp,
    /// Unspecified scenario; treated as `CallstackHasCall`.
    #[default]
    Default,
}

/// A sanitizer tag attached to a value or to the callstack-scoped set.
#[derive(Debug, Clone)]
pub struct TaintTag {
    /// Id of the sanitizer rule that produced this tag.
    pub sanitizer_id: CompactString,
    /// The rule's syntactic kind.
    pub kind: SanitizerKind,
    /// Where the rule recorded its effect.
    pub scenario: SanitizerScenario,
    /// The AST node that triggered the rule.
    pub origin: Option<NodeRef>,
    /// Callstack frame identities at the moment the tag was created.
    pub callstack_snapshot: Vec<CompactString>,
}

/// Where untrusted data entered the program.
#[derive(Debug, Clone)]
pub struct SourceLabel {
    /// Name of the source rule (or synthesized parameter source).
    pub name: CompactString,
    /// The AST node where the data entered.
    pub origin: Option<NodeRef>,
}

impl SourceLabel {
    /// Creates a label for a named source.
    #[must_use]
    pub fn new(name: &str, origin: Option<NodeRef>) -> Self {
        Self {
            name: CompactString::from(name),
            origin,
        }
    }
}

/// Taint state carried by a value: source labels, sanitizer tags and a
/// human-readable trace chain.
#[derive(Debug, Clone, Default)]
pub struct TaintState {
    /// Source labels; a value is tainted iff this is non-empty.
    pub sources: SmallVec<[SourceLabel; 1]>,
    /// Sanitizer tags attached to the value (append-only).
    pub tags: Vec<TaintTag>,
    /// Human-readable propagation trace, oldest first.
    pub trace: Vec<String>,
}

impl TaintState {
    /// Whether the value carries untrusted data.
    #[must_use]
    pub fn is_tainted(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Whether there is any taint posture at all (labels, tags or trace).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.tags.is_empty() && self.trace.is_empty()
    }

    /// Merges another taint state into this one, keeping everything.
    pub fn absorb(&mut self, other: &TaintState) {
        self.sources.extend(other.sources.iter().cloned());
        self.tags.extend(other.tags.iter().cloned());
        self.trace.extend(other.trace.iter().cloned());
    }

    /// Extends the trace chain with one propagation step.
    pub fn push_step(&mut self, step: impl Into<String>) {
        self.trace.push(step.into());
    }
}
