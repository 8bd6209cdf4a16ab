//! The AST tree walk: evaluation of every node form, with the taint,
//! sanitizer and sink hooks invoked at calls and binary operations.

use super::{builtins, Interpreter};
use crate::ast::{LiteralValue, NodeKind, NodeRef, Property};
use crate::taint::matcher::match_fsig;
use crate::taint::rules::SinkRule;
use crate::taint::tags::SourceLabel;
use crate::value::union::merge_candidates;
use crate::value::{fields, Value, ValueKind, ValueRef};
use compact_str::CompactString;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use std::sync::Arc;

impl Interpreter {
    /// Evaluates one node in a scope, returning its symbolic value.
    ///
    /// Statements evaluate to Undefined. When the per-entry-point node budget
    /// is exhausted the walker stops descending and returns Undefined,
    /// retaining whatever taint state was gathered so far.
    pub(crate) fn eval(&mut self, node: &NodeRef, scope: &ValueRef) -> ValueRef {
        if self.budget == 0 {
            return Value::undefined().into_ref();
        }
        self.budget -= 1;

        match &node.kind {
            NodeKind::Program { body } => {
                for stmt in body {
                    self.eval(stmt, scope);
                }
                Value::undefined().into_ref()
            }
            NodeKind::FunctionDef { name, .. } => self.eval_function_def(node, name, scope),
            NodeKind::Call { callee, arguments } => self.eval_call(node, callee, arguments, scope),
            NodeKind::Member {
                object,
                property,
                computed,
            } => self.eval_member(node, object, property, *computed, scope),
            NodeKind::Identifier { name } => {
                let value = fields::lookup(scope, name)
                    .unwrap_or_else(|| Value::undefined().into_ref());
                self.apply_source_rules(node, &value);
                value
            }
            NodeKind::Literal { value } => {
                let mut primitive = Value::primitive(value.clone());
                primitive.origin = Some(Arc::clone(node));
                primitive.into_ref()
            }
            NodeKind::This => fields::resolve_this(scope),
            NodeKind::Binary {
                operator,
                left,
                right,
            } => self.eval_binary(node, operator, left, right, scope),
            NodeKind::Assign { target, value } => self.eval_assign(target, value, scope),
            NodeKind::DestructuringAssign { targets, value } => {
                self.eval_destructuring(targets, value, scope)
            }
            NodeKind::Return { value } => {
                let result = value
                    .as_ref()
                    .map_or_else(|| Value::undefined().into_ref(), |v| self.eval(v, scope));
                if let Some(frame) = self.frames.last_mut() {
                    frame.returns.push(Rc::clone(&result));
                }
                result
            }
            NodeKind::If {
                test,
                then_body,
                else_body,
            } => self.eval_if(test, then_body, else_body, scope),
            NodeKind::ObjectLiteral { properties } => {
                self.eval_object_literal(node, properties, scope)
            }
            NodeKind::ArrayLiteral { elements } => self.eval_array_literal(node, elements, scope),
        }
    }

    /// Declares a function once in its lexical scope. A redeclaration under
    /// the same name becomes an overload on the existing function value.
    fn eval_function_def(&mut self, node: &NodeRef, name: &str, scope: &ValueRef) -> ValueRef {
        let existing = {
            let map = Rc::clone(&scope.borrow().fields);
            let found = map.borrow().get(name).cloned();
            found
        };
        if let Some(existing) = existing {
            if let ValueKind::Function(data) = &mut existing.borrow_mut().kind {
                data.overloads.push(Arc::clone(node));
            }
            return existing;
        }

        let qualified = {
            let s = scope.borrow();
            let base = s
                .identity
                .qualified_id
                .as_deref()
                .or_else(|| s.effective_id())
                .unwrap_or("");
            crate::utils::join_qualified(base, name)
        };
        let mut function = Value::function(name, Arc::clone(node));
        function.identity.qualified_id = Some(CompactString::from(qualified.as_str()));
        function.parent = Some(Rc::downgrade(scope));
        let function = function.into_ref();
        fields::set_field(scope, name, Rc::clone(&function));
        function
    }

    fn eval_call(
        &mut self,
        node: &NodeRef,
        callee: &NodeRef,
        arguments: &[NodeRef],
        scope: &ValueRef,
    ) -> ValueRef {
        let args: Vec<ValueRef> = arguments.iter().map(|arg| self.eval(arg, scope)).collect();

        let mut receiver: Option<ValueRef> = None;
        let mut promise_result: Option<ValueRef> = None;
        let callee_value: Option<ValueRef> = match &callee.kind {
            NodeKind::Member {
                object,
                property,
                computed,
            } => {
                let object_value = self.eval(object, scope);
                let resolved = prop_name(property, *computed).and_then(|prop| {
                    promise_result =
                        builtins::invoke_promise_handler(self, &object_value, &prop, &args, node);
                    fields::get_field(&object_value, &prop, true)
                });
                receiver = Some(object_value);
                resolved
            }
            NodeKind::Identifier { name } => fields::lookup(scope, name),
            _ => Some(self.eval(callee, scope)),
        };

        // Sink checks consult the pre-call taint state; a sanitizer matched
        // on this very call must not clear its own sink.
        self.check_call_sinks(node, callee, &args, receiver.as_ref());

        let ret = if let Some(result) = promise_result {
            result
        } else {
            self.execute_callee(callee_value.as_ref(), &args, node, receiver.as_ref())
        };

        let callstack = self.callstack_ids();
        self.sanitizers.on_call(node, callee, &args, &ret, &callstack);

        // An unmodeled callee with a tainted argument conservatively yields a
        // tainted result: a missing model must not drop a flow. Runs after
        // the sanitizer hook so a freshly attached argument tag carries over.
        let ret = if matches!(ret.borrow().kind, ValueKind::Undefined) {
            match args.iter().find(|arg| arg.borrow().is_tainted()) {
                Some(tainted) => {
                    let mut value = Value::object("call-result");
                    value.taint = tainted.borrow().taint.clone();
                    value.taint.push_step(format!(
                        "through unmodeled call at line {}",
                        node.loc.start_line
                    ));
                    value.origin = Some(Arc::clone(node));
                    value.into_ref()
                }
                None => ret,
            }
        } else {
            ret
        };

        self.apply_source_rules(callee, &ret);
        ret
    }

    fn execute_callee(
        &mut self,
        callee_value: Option<&ValueRef>,
        args: &[ValueRef],
        call_node: &NodeRef,
        receiver: Option<&ValueRef>,
    ) -> ValueRef {
        let Some(value) = callee_value else {
            return Value::undefined().into_ref();
        };

        if matches!(value.borrow().kind, ValueKind::Function(_)) {
            return self.call_function(value, args, call_node, receiver);
        }

        // Overload ambiguity: a union callee calls every function member and
        // joins the results.
        let members = match &value.borrow().kind {
            ValueKind::Union(union) => Some(union.members.clone()),
            _ => None,
        };
        if let Some(members) = members {
            let results: Vec<ValueRef> = members
                .iter()
                .filter(|member| matches!(member.borrow().kind, ValueKind::Function(_)))
                .map(|member| self.call_function(member, args, call_node, receiver))
                .collect();
            return merge_candidates(&results);
        }

        Value::undefined().into_ref()
    }

    fn eval_member(
        &mut self,
        node: &NodeRef,
        object: &NodeRef,
        property: &NodeRef,
        computed: bool,
        scope: &ValueRef,
    ) -> ValueRef {
        let receiver = self.eval(object, scope);
        let Some(prop) = prop_name(property, computed) else {
            return Value::undefined().into_ref();
        };
        let value = fields::get_field(&receiver, &prop, true)
            .unwrap_or_else(|| Value::undefined().into_ref());
        self.apply_source_rules(node, &value);
        value
    }

    fn eval_binary(
        &mut self,
        node: &NodeRef,
        operator: &str,
        left: &NodeRef,
        right: &NodeRef,
        scope: &ValueRef,
    ) -> ValueRef {
        let left_value = self.eval(left, scope);
        let right_value = self.eval(right, scope);

        let callstack = self.callstack_ids();
        self.sanitizers.on_binary_op(
            node,
            operator,
            left,
            right,
            &left_value,
            &right_value,
            &callstack,
        );

        let mut result = Value::symbol(operator, Some(Arc::clone(node)));
        result.origin = Some(Arc::clone(node));
        result.taint.absorb(&left_value.borrow().taint);
        result.taint.absorb(&right_value.borrow().taint);
        if result.taint.is_tainted() {
            result
                .taint
                .push_step(format!("'{operator}' at line {}", node.loc.start_line));
        }
        result.into_ref()
    }

    fn eval_assign(&mut self, target: &NodeRef, value: &NodeRef, scope: &ValueRef) -> ValueRef {
        let assigned = self.eval(value, scope);
        match &target.kind {
            NodeKind::Identifier { name } => {
                if assigned.borrow().identity.local_id.is_none() {
                    assigned.borrow_mut().identity.local_id = Some(name.clone());
                }
                fields::set_field(scope, name, Rc::clone(&assigned));
            }
            NodeKind::Member {
                object,
                property,
                computed,
            } => {
                let receiver = self.eval(object, scope);
                if let Some(prop) = prop_name(property, *computed) {
                    fields::set_field(&receiver, &prop, Rc::clone(&assigned));
                }
            }
            _ => {}
        }
        assigned
    }

    /// One syntactic assignment yielding several bindings. When the value is
    /// a union the per-target candidates are joined member-wise; the whole
    /// result is an Aggregate keyed by target index.
    fn eval_destructuring(
        &mut self,
        targets: &[NodeRef],
        value: &NodeRef,
        scope: &ValueRef,
    ) -> ValueRef {
        let source = self.eval(value, scope);
        let union_members = match &source.borrow().kind {
            ValueKind::Union(union) => Some(union.members.clone()),
            _ => None,
        };

        let mut bindings: Vec<ValueRef> = Vec::new();
        for target in targets {
            let NodeKind::Identifier { name } = &target.kind else {
                continue;
            };
            let bound = match &union_members {
                Some(members) => {
                    let candidates: Vec<ValueRef> = members
                        .iter()
                        .filter_map(|member| fields::get_field(member, name, true))
                        .collect();
                    merge_candidates(&candidates)
                }
                None => fields::get_field(&source, name, true)
                    .unwrap_or_else(|| Value::undefined().into_ref()),
            };
            fields::set_field(scope, name, Rc::clone(&bound));
            bindings.push(bound);
        }
        Value::aggregate(bindings).into_ref()
    }

    /// Path-sensitive branch join: both bodies run against the pre-branch
    /// bindings, then every binding that diverged becomes a union of its
    /// per-branch candidates.
    fn eval_if(
        &mut self,
        test: &NodeRef,
        then_body: &[NodeRef],
        else_body: &[NodeRef],
        scope: &ValueRef,
    ) -> ValueRef {
        self.eval(test, scope);

        let scope_fields = Rc::clone(&scope.borrow().fields);
        let before = scope_fields.borrow().clone();

        for stmt in then_body {
            self.eval(stmt, scope);
        }
        let then_map = scope_fields.borrow().clone();

        *scope_fields.borrow_mut() = before;
        for stmt in else_body {
            self.eval(stmt, scope);
        }
        let else_map = scope_fields.borrow().clone();

        let mut merged: FxHashMap<CompactString, ValueRef> = FxHashMap::default();
        for (key, then_value) in &then_map {
            match else_map.get(key) {
                Some(else_value) if Rc::ptr_eq(then_value, else_value) => {
                    merged.insert(key.clone(), Rc::clone(then_value));
                }
                Some(else_value) => {
                    merged.insert(
                        key.clone(),
                        merge_candidates(&[Rc::clone(then_value), Rc::clone(else_value)]),
                    );
                }
                None => {
                    // Assigned in the then-branch only: possibly undefined.
                    merged.insert(
                        key.clone(),
                        merge_candidates(&[
                            Rc::clone(then_value),
                            Value::undefined().into_ref(),
                        ]),
                    );
                }
            }
        }
        for (key, else_value) in &else_map {
            if !merged.contains_key(key) {
                merged.insert(
                    key.clone(),
                    merge_candidates(&[Rc::clone(else_value), Value::undefined().into_ref()]),
                );
            }
        }
        *scope_fields.borrow_mut() = merged;

        Value::undefined().into_ref()
    }

    fn eval_object_literal(
        &mut self,
        node: &NodeRef,
        properties: &[Property],
        scope: &ValueRef,
    ) -> ValueRef {
        let mut object = Value::new(ValueKind::Object);
        object.origin = Some(Arc::clone(node));
        let object = object.into_ref();
        for property in properties {
            let value = self.eval(&property.value, scope);
            let map = Rc::clone(&object.borrow().fields);
            map.borrow_mut().insert(property.key.clone(), value);
        }
        object
    }

    fn eval_array_literal(
        &mut self,
        node: &NodeRef,
        elements: &[NodeRef],
        scope: &ValueRef,
    ) -> ValueRef {
        let mut array = Value::new(ValueKind::Object);
        array.origin = Some(Arc::clone(node));
        let array = array.into_ref();
        for (index, element) in elements.iter().enumerate() {
            let value = self.eval(element, scope);
            // Subscript reads are usually computed and unresolvable, so the
            // container absorbs its elements' taint.
            let element_taint = value.borrow().taint.clone();
            array.borrow_mut().taint.absorb(&element_taint);
            let map = Rc::clone(&array.borrow().fields);
            map.borrow_mut()
                .insert(CompactString::from(index.to_string()), value);
        }
        array
    }

    /// Marks a value tainted when the node matches a source rule.
    fn apply_source_rules(&mut self, node: &NodeRef, value: &ValueRef) {
        let rules = Rc::clone(&self.rules);
        for rule in &rules.sources {
            if match_fsig(node, &rule.fsig) {
                value.borrow_mut().mark_tainted(SourceLabel {
                    name: CompactString::from(rule.name.as_str()),
                    origin: Some(Arc::clone(node)),
                });
            }
        }
    }

    /// Runs every sink rule against a call: `FuncCallTaintSink` over the
    /// dangerous argument positions, `ObjectTaintFuncCallSink` over the
    /// receiver object.
    fn check_call_sinks(
        &mut self,
        call_node: &NodeRef,
        callee_node: &NodeRef,
        args: &[ValueRef],
        receiver: Option<&ValueRef>,
    ) {
        let rules = Rc::clone(&self.rules);

        for rule in &rules.sinks.func_call {
            if !match_fsig(callee_node, &rule.fsig) {
                continue;
            }
            if rule.args.is_empty() {
                for arg in args {
                    self.report_if_unsanitized("FuncCallTaintSink", rule, arg, receiver, call_node);
                }
            } else {
                for position in &rule.args {
                    if let Some(arg) = args.get(*position) {
                        self.report_if_unsanitized(
                            "FuncCallTaintSink",
                            rule,
                            arg,
                            receiver,
                            call_node,
                        );
                    }
                }
            }
        }

        for rule in &rules.sinks.object_func_call {
            if !match_fsig(callee_node, &rule.fsig) {
                continue;
            }
            if let Some(object) = receiver {
                self.report_if_unsanitized(
                    "ObjectTaintFuncCallSink",
                    rule,
                    object,
                    receiver,
                    call_node,
                );
            }
        }
    }

    /// Emits a finding for a tainted argument unless an applicable sanitizer
    /// tag is visible at this sink. Unions and aggregates are searched for
    /// their first tainted constituent so a merged branch value cannot hide
    /// a flow.
    fn report_if_unsanitized(
        &mut self,
        checker_id: &str,
        rule: &SinkRule,
        argument: &ValueRef,
        receiver: Option<&ValueRef>,
        call_node: &NodeRef,
    ) {
        let Some(argument) = crate::value::first_tainted(argument) else {
            return;
        };
        let argument = &argument;

        let matched = self.sanitizers.find_matched_sanitizers(receiver, argument);
        let suppressed = if rule.sanitizer_ids.is_empty() {
            !matched.is_empty()
        } else {
            matched
                .iter()
                .any(|tag| rule.sanitizer_ids.iter().any(|id| id == tag.sanitizer_id.as_str()))
        };
        if suppressed {
            return;
        }

        let (source_tag, source_node, flow_path) = {
            let value = argument.borrow();
            let label = value.taint.sources.first();
            (
                label.map_or_else(String::new, |label| label.name.to_string()),
                label.and_then(|label| label.origin.clone()),
                value.taint.trace.clone(),
            )
        };

        let finding = crate::taint::findings::Finding {
            checker_id: checker_id.to_owned(),
            source_tag,
            sink_rule_name: rule.name.clone(),
            sanitizer_tags: matched
                .iter()
                .map(|tag| tag.sanitizer_id.to_string())
                .collect(),
            source_node,
            sink_node: Arc::clone(call_node),
            callstack: self
                .callstack_ids()
                .iter()
                .map(ToString::to_string)
                .collect(),
            severity: rule.severity,
            remediation: rule.remediation.clone(),
            flow_path,
        };
        self.findings.push(finding);
    }
}

/// Property name of a member access: a plain identifier, or a literal when
/// the access is computed. `None` means the access is unresolvable.
fn prop_name(property: &NodeRef, computed: bool) -> Option<String> {
    match &property.kind {
        NodeKind::Identifier { name } if !computed => Some(name.to_string()),
        NodeKind::Literal { value } if computed => match value {
            LiteralValue::Str(text) => Some(text.clone()),
            LiteralValue::Num(number) => Some(format!("{number}")),
            _ => None,
        },
        _ => None,
    }
}
