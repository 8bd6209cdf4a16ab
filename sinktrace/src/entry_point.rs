//! Shared analysis driver.
//!
//! Every binary delegates here so behavior stays identical across entry
//! points: load configuration and rules (unparsable rules are fatal), load
//! the AST files, build the call graph, resolve or synthesize the analysis
//! entry points and run the interpreter over them.

use crate::ast::NodeRef;
use crate::call_graph::{resolve_boundary_entry_points, CallGraph};
use crate::cli::Cli;
use crate::config::Config;
use crate::constants::MAX_INTERP_NODE_BUDGET;
use crate::errors::{report_non_fatal, EngineError};
use crate::interp::{EntryPointDescriptor, Interpreter};
use crate::taint::rules::{load_rules, RuleFile};
use anyhow::{Context, Result};
use clap::Parser;
use compact_str::CompactString;
use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

/// Entry point descriptor as produced by framework-specific collectors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPointSpec {
    /// Source file holding the entry function.
    pub file_path: PathBuf,
    /// Function name within its module scope.
    pub function_name: String,
    /// Framework attribute/decorator, if any.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Full symbol identity, if known.
    #[serde(default)]
    pub entry_point_symbol: Option<String>,
}

/// Parses the command line and runs the driver.
pub fn run_with_args() -> Result<()> {
    run(Cli::parse())
}

/// Runs the driver over parsed options.
pub fn run(cli: Cli) -> Result<()> {
    let start = cli
        .paths
        .first()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let config = Config::load_from_path(&start);

    // Entirely unparsable rules abort the scan; everything else degrades.
    let rules = match cli.rules.clone().or_else(|| config.sinktrace.rules_file.clone()) {
        Some(path) => load_rules(&path)
            .with_context(|| format!("loading rules from {}", path.display()))?,
        None => RuleFile::default(),
    };
    let budget = cli
        .node_budget
        .or(config.sinktrace.node_budget)
        .unwrap_or(MAX_INTERP_NODE_BUDGET);

    let mut programs: Vec<NodeRef> = Vec::new();
    for path in &cli.paths {
        match load_program_file(path) {
            Ok(program) => programs.push(program),
            Err(e) => report_non_fatal("input", &e.to_string()),
        }
    }

    let mut graph = CallGraph::new();
    for program in &programs {
        graph.record_program(program);
    }

    if cli.call_graph {
        for id in resolve_boundary_entry_points(&graph) {
            println!("{id}");
        }
        return Ok(());
    }

    let mut interp = Interpreter::new(Rc::new(rules), budget);
    for program in &programs {
        interp.load_program(program);
    }

    let entries = match &cli.entry_points {
        Some(path) => load_entry_specs(path)?,
        None => synthesize_entry_points(&graph),
    };
    let findings = interp.run(&entries);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
    } else {
        crate::output::print_findings(&findings, cli.quiet);
    }
    Ok(())
}

fn load_program_file(path: &Path) -> Result<NodeRef, EngineError> {
    let content = std::fs::read_to_string(path)?;
    let node: crate::ast::Node = serde_json::from_str(&content)
        .map_err(|e| EngineError::MalformedInput(format!("{}: {e}", path.display())))?;
    Ok(Arc::new(node))
}

fn load_entry_specs(path: &Path) -> Result<Vec<EntryPointDescriptor>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading entry points from {}", path.display()))?;
    let specs: Vec<EntryPointSpec> = serde_json::from_str(&content)
        .with_context(|| format!("parsing entry points from {}", path.display()))?;
    Ok(specs
        .into_iter()
        .map(|spec| EntryPointDescriptor {
            file_path: Arc::new(spec.file_path),
            function_name: CompactString::from(spec.function_name),
            attribute: spec.attribute.map(CompactString::from),
            entry_point_symbol: spec.entry_point_symbol.map(CompactString::from),
            scope_value: None,
            argument_values: Vec::new(),
        })
        .collect())
}

/// Full-fallback entry-point synthesis from the boundary set, used when no
/// collector declared explicit entry points.
fn synthesize_entry_points(graph: &CallGraph) -> Vec<EntryPointDescriptor> {
    resolve_boundary_entry_points(graph)
        .into_iter()
        .filter_map(|id| {
            let node = graph.nodes.get(&id)?;
            let definition = node.definition.as_ref()?;
            let function_name = id
                .split_once('.')
                .map_or_else(|| id.to_string(), |(_, rest)| rest.to_owned());
            Some(EntryPointDescriptor {
                file_path: Arc::clone(&definition.loc.file),
                function_name: CompactString::from(function_name),
                attribute: None,
                entry_point_symbol: Some(id),
                scope_value: None,
                argument_values: Vec::new(),
            })
        })
        .collect()
}
