//! Native models for built-ins the engine must understand structurally.
//!
//! Promises are the important case: a promise value records its resolve or
//! reject arguments in the `misc` side-channel, and `.then`/`.catch` handlers
//! run synchronously and immediately against the recorded values. Ignoring
//! real scheduling order is a deliberate over-approximation.

use super::Interpreter;
use crate::ast::NodeRef;
use crate::value::{fields, MiscValue, Value, ValueKind, ValueRef};
use compact_str::CompactString;
use std::rc::Rc;

const PROMISE_STATE: &str = "promise_state";
const PROMISE_VALUES: &str = "promise_values";

/// Installs native built-ins into the global scope.
pub(super) fn install(global: &ValueRef) {
    let promise = Value::package("Promise").into_ref();
    fields::set_field(
        &promise,
        "resolve",
        Value::native_function("resolve", native_promise_resolve).into_ref(),
    );
    fields::set_field(
        &promise,
        "reject",
        Value::native_function("reject", native_promise_reject).into_ref(),
    );
    fields::set_field(global, "Promise", promise);
}

fn native_promise_resolve(_interp: &mut Interpreter, args: &[ValueRef]) -> ValueRef {
    make_promise("resolved", args)
}

fn native_promise_reject(_interp: &mut Interpreter, args: &[ValueRef]) -> ValueRef {
    make_promise("rejected", args)
}

fn make_promise(state: &str, values: &[ValueRef]) -> ValueRef {
    let mut promise = Value::object("promise");
    promise.misc.insert(
        CompactString::from(PROMISE_STATE),
        MiscValue::Str(CompactString::from(state)),
    );
    promise.misc.insert(
        CompactString::from(PROMISE_VALUES),
        MiscValue::Values(values.to_vec()),
    );
    promise.into_ref()
}

/// Models `.then`/`.catch` on a promise-shaped receiver.
///
/// Returns `None` when the receiver carries no promise state, letting the
/// caller fall through to ordinary call handling. A handler matching the
/// recorded state is invoked synchronously with the recorded values; a
/// mismatched handler is skipped and the promise flows through for chaining.
pub(super) fn invoke_promise_handler(
    interp: &mut Interpreter,
    receiver: &ValueRef,
    prop: &str,
    args: &[ValueRef],
    call_node: &NodeRef,
) -> Option<ValueRef> {
    let wants = match prop {
        "then" => "resolved",
        "catch" => "rejected",
        _ => return None,
    };

    let (state, values) = {
        let value = receiver.borrow();
        let state = match value.misc.get(PROMISE_STATE) {
            Some(MiscValue::Str(state)) => state.clone(),
            _ => return None,
        };
        let values = match value.misc.get(PROMISE_VALUES) {
            Some(MiscValue::Values(values)) => values.clone(),
            _ => Vec::new(),
        };
        (state, values)
    };

    if state != wants {
        return Some(Rc::clone(receiver));
    }

    let result = match args.first() {
        Some(handler) if matches!(handler.borrow().kind, ValueKind::Function(_)) => {
            interp.call_function(handler, &values, call_node, None)
        }
        _ => Value::undefined().into_ref(),
    };
    Some(make_promise("resolved", &[result]))
}
