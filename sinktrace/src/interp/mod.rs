//! Abstract-interpretation runtime.
//!
//! Single-threaded, synchronous, depth-first tree-walking interpretation over
//! the front-end AST. There is no scheduler and no suspension point;
//! concurrency constructs in analyzed code are modeled, not executed. The
//! interpreter owns the value graph, the callstack, the sanitizer engine and
//! the findings log, and drives one entry point at a time with per-entry
//! error isolation.

use crate::ast::{NodeKind, NodeRef};
use crate::errors::{report_non_fatal, EngineError};
use crate::taint::findings::{Finding, FindingLog};
use crate::taint::rules::RuleFile;
use crate::taint::sanitizers::SanitizerEngine;
use crate::taint::tags::SourceLabel;
use crate::value::union::merge_candidates;
use crate::value::{fields, Value, ValueKind, ValueRef};
use compact_str::CompactString;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

mod builtins;
mod walker;

/// Native model hook for built-in functions. Receives the interpreter and
/// the evaluated arguments; returns the call's result value.
pub type NativeExecute = fn(&mut Interpreter, &[ValueRef]) -> ValueRef;

/// One frame of the interpretation callstack.
pub struct CallFrame {
    /// Boundary/symbol identity of the called function.
    pub id: CompactString,
    /// Human-readable name.
    pub display: CompactString,
    /// The function value being executed.
    pub function: ValueRef,
    /// Return values collected while the frame was live.
    pub returns: Vec<ValueRef>,
}

/// An analysis entry point, produced by a framework collector or synthesized
/// from the call-graph boundary set.
pub struct EntryPointDescriptor {
    /// Source file holding the entry function.
    pub file_path: Arc<PathBuf>,
    /// Function name within its module scope; may be dotted.
    pub function_name: CompactString,
    /// Framework attribute/decorator that marked this entry, if any.
    pub attribute: Option<CompactString>,
    /// Full symbol identity, when known.
    pub entry_point_symbol: Option<CompactString>,
    /// Scope to resolve the function in; defaults to the file's module scope.
    pub scope_value: Option<ValueRef>,
    /// Pre-built argument values; synthesized as tainted parameters when
    /// empty.
    pub argument_values: Vec<ValueRef>,
}

impl EntryPointDescriptor {
    /// Identity used in logs when this entry point fails.
    #[must_use]
    pub fn symbol(&self) -> String {
        self.entry_point_symbol
            .as_ref()
            .map_or_else(|| self.function_name.to_string(), ToString::to_string)
    }
}

/// The taint-propagation interpreter.
pub struct Interpreter {
    /// The global scope value; parent of every module scope.
    pub global: ValueRef,
    /// Loaded rule set.
    pub rules: Rc<RuleFile>,
    /// Sanitizer-scenario engine with the callstack-scoped tag set.
    pub sanitizers: SanitizerEngine,
    /// Findings gathered so far.
    pub findings: FindingLog,
    /// Module scopes by source-file path.
    pub modules: FxHashMap<String, ValueRef>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) budget: usize,
    node_budget: usize,
}

impl Interpreter {
    /// Creates an interpreter over a rule set with the given per-entry-point
    /// node budget.
    #[must_use]
    pub fn new(rules: Rc<RuleFile>, node_budget: usize) -> Self {
        let global = Value::scope("global", None).into_ref();
        builtins::install(&global);
        Self {
            global,
            sanitizers: SanitizerEngine::new(Rc::clone(&rules)),
            rules,
            findings: FindingLog::new(),
            modules: FxHashMap::default(),
            frames: Vec::new(),
            budget: node_budget,
            node_budget,
        }
    }

    /// Loads one module: creates its scope under the global scope and
    /// interprets its top-level statements. Returns the module scope.
    pub fn load_program(&mut self, program: &NodeRef) -> ValueRef {
        let name = crate::call_graph::module_name(program);
        let file_key = program.loc.file.display().to_string();

        let mut scope = Value::scope(&name, Some(&self.global));
        scope.identity.qualified_id = Some(CompactString::from(name.as_str()));
        scope.origin = Some(Arc::clone(program));
        let scope = scope.into_ref();

        fields::set_field(&self.global, &name, Rc::clone(&scope));
        self.modules.insert(file_key, Rc::clone(&scope));

        if let NodeKind::Program { body } = &program.kind {
            for stmt in body {
                self.eval(stmt, &scope);
            }
        }
        scope
    }

    /// Entry-point boundary hook.
    ///
    /// Clears the callstack, the callstack-scoped sanitizer set and the
    /// findings dedup scope, and restores the node budget. Nothing recorded
    /// for a previous entry point survives into the next one.
    pub fn before_entry_point(&mut self) {
        self.frames.clear();
        self.sanitizers.begin_entry_point();
        self.findings.begin_entry_point();
        self.budget = self.node_budget;
    }

    /// Runs every entry point, isolating failures: one bad entry point is
    /// reported and skipped, never aborting the whole scan.
    pub fn run(&mut self, entries: &[EntryPointDescriptor]) -> Vec<Finding> {
        for entry in entries {
            self.before_entry_point();
            if let Err(e) = self.run_entry_point(entry) {
                report_non_fatal("entry-point", &format!("{}: {e}", entry.symbol()));
            }
        }
        self.findings.take()
    }

    fn run_entry_point(&mut self, entry: &EntryPointDescriptor) -> Result<(), EngineError> {
        let scope = match &entry.scope_value {
            Some(scope) => Rc::clone(scope),
            None => {
                let file_key = entry.file_path.display().to_string();
                match self.modules.get(&file_key) {
                    Some(module) => Rc::clone(module),
                    None => Rc::clone(&self.global),
                }
            }
        };

        let function = fields::get_field(&scope, &entry.function_name, false)
            .filter(|value| matches!(value.borrow().kind, ValueKind::Function(_)))
            .ok_or_else(|| EngineError::EntryPoint {
                symbol: entry.symbol(),
                message: "function not found in scope".to_owned(),
            })?;

        let definition = match &function.borrow().kind {
            ValueKind::Function(data) => data.definition.clone(),
            _ => None,
        };
        let Some(definition) = definition else {
            return Err(EngineError::EntryPoint {
                symbol: entry.symbol(),
                message: "entry function has no definition".to_owned(),
            });
        };

        let args = if entry.argument_values.is_empty() {
            synthesize_tainted_arguments(&definition)
        } else {
            entry.argument_values.clone()
        };

        self.call_function(&function, &args, &definition, None);
        Ok(())
    }

    /// Frame identities of the current callstack, outermost first.
    #[must_use]
    pub fn callstack_ids(&self) -> Vec<CompactString> {
        self.frames.iter().map(|frame| frame.id.clone()).collect()
    }

    /// Calls a function value with evaluated arguments.
    ///
    /// Native hooks take precedence; a function without definition or hook is
    /// an unmodeled gap and yields Undefined. User functions keep one
    /// persistent activation scope (the function value itself): parameters
    /// are union-merged across call sites, which makes interpretation
    /// flow-insensitive and context-insensitive per function. Recursive
    /// re-entry returns Undefined instead of descending.
    pub fn call_function(
        &mut self,
        function: &ValueRef,
        args: &[ValueRef],
        call_node: &NodeRef,
        receiver: Option<&ValueRef>,
    ) -> ValueRef {
        let (native, definition) = match &function.borrow().kind {
            ValueKind::Function(data) => (data.native, data.definition.clone()),
            _ => (None, None),
        };

        if let Some(native) = native {
            return native(self, args);
        }
        let Some(definition) = definition else {
            return Value::undefined().into_ref();
        };
        if self
            .frames
            .iter()
            .any(|frame| Rc::ptr_eq(&frame.function, function))
        {
            return Value::undefined().into_ref();
        }

        if let Some(receiver) = receiver {
            if let ValueKind::Function(data) = &mut function.borrow_mut().kind {
                data.bound_receiver = Some(Rc::clone(receiver));
            }
        }

        let (name, params, body) = match &definition.kind {
            NodeKind::FunctionDef {
                name, params, body, ..
            } => (name.clone(), params.clone(), body.clone()),
            _ => return Value::undefined().into_ref(),
        };

        for (param, arg) in params.iter().zip(args) {
            if let NodeKind::Identifier { name: param_name } = &param.kind {
                self.bind_param(function, param_name, arg);
            }
        }

        let id = function
            .borrow()
            .identity
            .qualified_id
            .clone()
            .unwrap_or_else(|| call_node.boundary_id());
        self.frames.push(CallFrame {
            id,
            display: name,
            function: Rc::clone(function),
            returns: Vec::new(),
        });

        for stmt in &body {
            self.eval(stmt, function);
        }

        let frame = self.frames.pop();
        let returns = frame.map(|frame| frame.returns).unwrap_or_default();
        merge_candidates(&returns)
    }

    /// Binds one argument to a parameter field on the persistent activation
    /// scope, union-merging with values from earlier call sites.
    fn bind_param(&mut self, function: &ValueRef, name: &str, arg: &ValueRef) {
        let existing = fields::get_field(function, name, false);
        match existing {
            None => fields::set_field(function, name, Rc::clone(arg)),
            Some(existing) => {
                if matches!(existing.borrow().kind, ValueKind::Union(_)) {
                    crate::value::union::append(&existing, arg, true);
                } else {
                    let merged = merge_candidates(&[existing, Rc::clone(arg)]);
                    fields::set_field(function, name, merged);
                }
            }
        }
    }
}

/// Synthesizes conservative tainted arguments for an entry function: every
/// declared parameter is assumed attacker-controlled.
fn synthesize_tainted_arguments(definition: &NodeRef) -> Vec<ValueRef> {
    let NodeKind::FunctionDef { params, .. } = &definition.kind else {
        return Vec::new();
    };
    params
        .iter()
        .map(|param| {
            let name = match &param.kind {
                NodeKind::Identifier { name } => name.as_str(),
                _ => "arg",
            };
            let mut value = Value::object(name);
            value.origin = Some(Arc::clone(param));
            value.mark_tainted(SourceLabel {
                name: CompactString::from(format!("param:{name}")),
                origin: Some(Arc::clone(param)),
            });
            value.into_ref()
        })
        .collect()
}
