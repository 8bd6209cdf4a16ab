//! Rule objects consumed from the rule-file loader.
//!
//! Rules arrive as JSON: source patterns, sanitizer descriptions and sink
//! tables keyed by checker. Field names on the wire follow the rule-file
//! format (`sanitizerType`, `sanitizerScenario`, `fsig`, ...).

use crate::errors::EngineError;
use crate::taint::tags::{SanitizerKind, SanitizerScenario};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Severity level of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Severity {
    /// Directly exploitable.
    Critical,
    /// Likely exploitable.
    #[default]
    High,
    /// Exploitable under conditions.
    Medium,
    /// Hardening concern.
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "CRITICAL"),
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// A complete rule file: sources, sanitizers and sink tables.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RuleFile {
    /// Taint source patterns.
    #[serde(default)]
    pub sources: Vec<SourceRule>,
    /// Sanitizer descriptions.
    #[serde(default)]
    pub sanitizers: Vec<SanitizerRule>,
    /// Sink tables, keyed by checker.
    #[serde(default)]
    pub sinks: SinkRules,
}

/// A taint source pattern: data matching `fsig` is untrusted.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRule {
    /// Source name, used as the finding's source tag.
    pub name: String,
    /// Dotted signature pattern, e.g. `req.body.**`.
    pub fsig: String,
}

/// A sanitizer rule.
#[derive(Debug, Clone, Deserialize)]
pub struct SanitizerRule {
    /// Rule id; sinks reference it to declare which sanitizers apply.
    pub id: String,
    /// Syntactic kind of the sanitizer.
    #[serde(rename = "sanitizerType")]
    pub sanitizer_type: SanitizerKind,
    /// Where the effect is recorded; missing means `Default`.
    #[serde(rename = "sanitizerScenario", default)]
    pub scenario: SanitizerScenario,
    /// Dotted callee pattern for call sanitizers.
    #[serde(rename = "calleeType", default)]
    pub callee: Option<String>,
    /// Operator token for binary-operation sanitizers.
    #[serde(default)]
    pub operator: Option<String>,
    /// Regex the literal operand must match for binary-operation sanitizers.
    #[serde(rename = "targetValue", default)]
    pub target_value: Option<String>,
    /// Argument positions tagged by `ValidateByCall`; missing means all.
    #[serde(default)]
    pub args: Option<Vec<usize>>,
}

/// Sink tables keyed by checker id.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SinkRules {
    /// Sinks fired by a tainted call argument.
    #[serde(rename = "FuncCallTaintSink", default)]
    pub func_call: Vec<SinkRule>,
    /// Sinks fired by a call on a tainted receiver object.
    #[serde(rename = "ObjectTaintFuncCallSink", default)]
    pub object_func_call: Vec<SinkRule>,
}

/// One sink entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkRule {
    /// Rule name reported in findings.
    pub name: String,
    /// Dotted function signature pattern.
    pub fsig: String,
    /// Dangerous argument positions (0-indexed); empty means all.
    #[serde(default)]
    pub args: Vec<usize>,
    /// Sanitizer ids that clear this sink. Empty means any matched
    /// sanitizer suppresses the finding.
    #[serde(rename = "sanitizerIds", default)]
    pub sanitizer_ids: Vec<String>,
    /// Severity of a resulting finding.
    #[serde(default)]
    pub severity: Severity,
    /// Suggested remediation.
    #[serde(default)]
    pub remediation: String,
}

/// Loads a rule file from disk.
///
/// # Errors
///
/// Returns an error when the file cannot be read or the JSON cannot be
/// parsed at all. Callers at startup treat that as fatal; everything past
/// startup degrades instead.
pub fn load_rules(path: &Path) -> Result<RuleFile, EngineError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| EngineError::RuleParse(format!("{}: {e}", path.display())))
}
