//! Findings emitted by the sink checkers, with per-entry-point dedup.

use crate::ast::{Loc, NodeRef};
use crate::taint::rules::Severity;
use rustc_hash::FxHashSet;
use serde::{Serialize, Serializer};

/// Serialize a node reference as its source location for JSON output.
fn serialize_node_loc<S>(node: &NodeRef, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    node.loc.serialize(serializer)
}

/// Serialize an optional node reference as its source location.
fn serialize_opt_node_loc<S>(node: &Option<NodeRef>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match node {
        Some(node) => serializer.serialize_some(&node.loc),
        None => serializer.serialize_none(),
    }
}

/// A single source→sink flow reported by a checker.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Which checker produced this finding.
    pub checker_id: String,
    /// Name of the source rule the tainted data came from.
    pub source_tag: String,
    /// Name of the matched sink rule.
    pub sink_rule_name: String,
    /// Ids of sanitizer tags that matched but did not apply to this sink.
    pub sanitizer_tags: Vec<String>,
    /// Where the tainted data entered.
    #[serde(serialize_with = "serialize_opt_node_loc")]
    pub source_node: Option<NodeRef>,
    /// The sink call site.
    #[serde(serialize_with = "serialize_node_loc")]
    pub sink_node: NodeRef,
    /// Callstack frame identities at the sink.
    pub callstack: Vec<String>,
    /// Severity from the sink rule.
    pub severity: Severity,
    /// Remediation advice from the sink rule.
    pub remediation: String,
    /// Human-readable propagation trace, oldest step first.
    pub flow_path: Vec<String>,
}

impl Finding {
    /// Display location of the sink.
    #[must_use]
    pub fn sink_loc(&self) -> &Loc {
        &self.sink_node.loc
    }
}

/// Collects findings across entry points and guarantees that the same
/// `(sink node, source trace)` pair is reported at most once per
/// entry-point run.
#[derive(Default)]
pub struct FindingLog {
    findings: Vec<Finding>,
    seen: FxHashSet<(String, String)>,
}

impl FindingLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry-point boundary hook: resets the dedup scope while keeping the
    /// findings gathered so far.
    pub fn begin_entry_point(&mut self) {
        self.seen.clear();
    }

    /// Records a finding unless its `(sink, source trace)` pair was already
    /// reported in this entry-point run. Returns whether it was kept.
    pub fn push(&mut self, finding: Finding) -> bool {
        let key = (
            finding.sink_node.loc_key(),
            format!("{}|{}", finding.source_tag, finding.flow_path.join(" -> ")),
        );
        if !self.seen.insert(key) {
            return false;
        }
        self.findings.push(finding);
        true
    }

    /// All findings recorded so far.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Number of findings recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Whether no findings were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Drains the log, returning the accumulated findings.
    pub fn take(&mut self) -> Vec<Finding> {
        self.seen.clear();
        std::mem::take(&mut self.findings)
    }
}
