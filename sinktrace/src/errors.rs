//! Engine error taxonomy and the centralized non-fatal reporter.
//!
//! Malformed input degrades to safe defaults; only entirely unparsable rules
//! at startup are fatal. Gaps in the value model (unresolved receivers, calls
//! to unmodeled functions) are not errors at all and never surface here.

use colored::Colorize;

/// Engine error
#[derive(Debug)]
pub enum EngineError {
    /// The rule file could not be parsed at all.
    RuleParse(String),
    /// Malformed analysis input (bad AST file, bad descriptor).
    MalformedInput(String),
    /// Interpretation of a single entry point failed.
    EntryPoint {
        /// Identity of the offending entry-point symbol.
        symbol: String,
        /// What went wrong.
        message: String,
    },
    /// IO error
    Io(std::io::Error),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuleParse(msg) => write!(f, "Rule parse error: {msg}"),
            Self::MalformedInput(msg) => write!(f, "Malformed input: {msg}"),
            Self::EntryPoint { symbol, message } => {
                write!(f, "Entry point '{symbol}' failed: {message}")
            }
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Reports a recoverable condition and returns to the caller.
///
/// Execution continues with a safe default after every call to this function;
/// it exists so degraded inputs are visible without aborting the scan.
pub fn report_non_fatal(context: &str, message: &str) {
    eprintln!("{} [{context}] {message}", "warning:".yellow().bold());
}
