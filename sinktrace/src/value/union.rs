//! Union merge engine: path-sensitive join of candidate values with
//! de-duplication and cycle suppression.

use super::{Value, ValueKind, ValueRef};
use std::mem::discriminant;
use std::rc::Rc;

/// Appends a candidate value to a union.
///
/// Rules, in order: nested unions are flattened (a union never stores a
/// union); appending a union to itself is a no-op; an Aggregate whose nested
/// union members already reference the target's field map is refused (the
/// insertion would close a cycle in the value graph); with `dedupe` set,
/// structurally equal members and repeat references are suppressed.
///
/// Joins are commutative and idempotent under repeated appends of the same
/// value when `dedupe` is true. Insertion order is preserved for first-match
/// consumers. A non-union target makes the call a silent no-op — invariant
/// violations must not corrupt the graph, and must not halt the scan either.
pub fn append(target: &ValueRef, incoming: &ValueRef, dedupe: bool) {
    if Rc::ptr_eq(target, incoming) {
        return;
    }

    let nested = match &incoming.borrow().kind {
        ValueKind::Union(union) => Some(union.members.clone()),
        _ => None,
    };
    if let Some(members) = nested {
        for member in &members {
            append(target, member, dedupe);
        }
        return;
    }

    if aggregate_reaches(target, incoming) {
        return;
    }

    let mut target_value = target.borrow_mut();
    let ValueKind::Union(union) = &mut target_value.kind else {
        return;
    };

    let address = Rc::as_ptr(incoming) as usize;
    if dedupe {
        if union.seen.contains(&address) {
            return;
        }
        for member in &union.members {
            if structurally_equal(member, incoming) {
                return;
            }
        }
    }

    union.members.push(Rc::clone(incoming));
    union.seen.insert(address);
}

/// Appends several candidates, flattening the slice.
pub fn append_many(target: &ValueRef, incoming: &[ValueRef], dedupe: bool) {
    for value in incoming {
        append(target, value, dedupe);
    }
}

/// Joins candidate values into one: a single candidate passes through
/// unchanged, several become a deduplicated union, none becomes Undefined.
#[must_use]
pub fn merge_candidates(candidates: &[ValueRef]) -> ValueRef {
    match candidates {
        [] => Value::undefined().into_ref(),
        [single] => Rc::clone(single),
        _ => {
            let merged = Value::union().into_ref();
            append_many(&merged, candidates, true);
            let sole_member = match &merged.borrow().kind {
                ValueKind::Union(union) if union.members.len() == 1 => {
                    Some(Rc::clone(&union.members[0]))
                }
                _ => None,
            };
            sole_member.unwrap_or(merged)
        }
    }
}

/// Structural equality used for union de-duplication.
///
/// Same-kind Symbol values at the same declaration site count as duplicates;
/// primitives compare by payload; other kinds compare by shared field map or
/// matching effective identity.
#[must_use]
pub fn structurally_equal(a: &ValueRef, b: &ValueRef) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    let av = a.borrow();
    let bv = b.borrow();
    match (&av.kind, &bv.kind) {
        (ValueKind::Primitive(x), ValueKind::Primitive(y)) => x == y,
        (ValueKind::Symbol, ValueKind::Symbol) => {
            same_declaration_site(av.declared_at.as_deref(), bv.declared_at.as_deref())
                && av.identity.symbolic_id == bv.identity.symbolic_id
        }
        (x, y) if discriminant(x) == discriminant(y) => {
            Rc::ptr_eq(&av.fields, &bv.fields)
                || (av.effective_id().is_some() && av.effective_id() == bv.effective_id())
        }
        _ => false,
    }
}

/// Anti-cycle guard: true when `incoming` is an Aggregate whose nested union
/// members already reference `target`'s field map.
///
/// This inspects immediate children only. The dominant real-world trigger is
/// a recursive object literal assembled from branch merges, which this
/// catches; deeper aggregate nesting is bounded by the walk-depth caps
/// instead.
fn aggregate_reaches(target: &ValueRef, incoming: &ValueRef) -> bool {
    let target_fields = Rc::as_ptr(&target.borrow().fields);
    let incoming_value = incoming.borrow();
    let ValueKind::Aggregate(aggregate) = &incoming_value.kind else {
        return false;
    };
    for child in &aggregate.children {
        let child_value = child.borrow();
        if let ValueKind::Union(union) = &child_value.kind {
            for member in &union.members {
                if Rc::as_ptr(&member.borrow().fields) == target_fields {
                    return true;
                }
            }
        }
    }
    false
}

fn same_declaration_site(a: Option<&crate::ast::Node>, b: Option<&crate::ast::Node>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x.loc_key() == y.loc_key(),
        _ => false,
    }
}
