//! Field and scope resolution: qualified-name identity, lazy field
//! auto-vivification and parent-chain lookup.

use super::{Value, ValueKind, ValueRef};
use crate::constants::MAX_WALK_DEPTH;
use crate::errors::report_non_fatal;
use crate::utils::{join_qualified, split_field_path};
use compact_str::CompactString;
use std::rc::{Rc, Weak};

/// Resolves a dotted field path on a value.
///
/// Splits the path and walks the nested field maps. A missing segment with
/// `create_if_absent = false` returns `None`: the caller must treat that as
/// "unknown", not as an error. With `create_if_absent = true` a missing
/// segment is synthesized as an Object value whose qualified id extends the
/// parent's, and which inherits the parent's taint posture — accessing a
/// field of a tainted object yields a tainted value.
///
/// A malformed path is reported through the non-fatal handler and yields a
/// fresh Undefined value so evaluation can continue.
#[must_use]
pub fn get_field(value: &ValueRef, path: &str, create_if_absent: bool) -> Option<ValueRef> {
    let Some(segments) = split_field_path(path) else {
        report_non_fatal("value", &format!("malformed field path '{path}'"));
        return Some(Value::undefined().into_ref());
    };

    let mut current = Rc::clone(value);
    for segment in segments {
        let fields = Rc::clone(&current.borrow().fields);
        let existing = fields.borrow().get(segment).cloned();
        let next = match existing {
            Some(child) => child,
            None => {
                if !create_if_absent {
                    return None;
                }
                let vivified = vivify(&current, segment);
                fields
                    .borrow_mut()
                    .insert(CompactString::from(segment), Rc::clone(&vivified));
                vivified
            }
        };
        current = next;
    }
    Some(current)
}

/// Writes a value at a dotted field path.
///
/// Intermediate segments are auto-vivified as Object values; the final
/// segment is a raw map overwrite with no merge.
pub fn set_field(value: &ValueRef, path: &str, incoming: ValueRef) {
    let Some(segments) = split_field_path(path) else {
        report_non_fatal("value", &format!("malformed field path '{path}'"));
        return;
    };
    let Some((last, intermediate)) = segments.split_last() else {
        return;
    };

    let mut current = Rc::clone(value);
    for segment in intermediate {
        let fields = Rc::clone(&current.borrow().fields);
        let existing = fields.borrow().get(*segment).cloned();
        let next = match existing {
            Some(child) => child,
            None => {
                let vivified = vivify(&current, segment);
                fields
                    .borrow_mut()
                    .insert(CompactString::from(*segment), Rc::clone(&vivified));
                vivified
            }
        };
        current = next;
    }

    let fields = Rc::clone(&current.borrow().fields);
    fields
        .borrow_mut()
        .insert(CompactString::from(*last), incoming);
}

/// Looks a name up through the scope chain, innermost first.
#[must_use]
pub fn lookup(scope: &ValueRef, name: &str) -> Option<ValueRef> {
    let mut current = Rc::clone(scope);
    for _ in 0..MAX_WALK_DEPTH {
        let found = {
            let fields = Rc::clone(&current.borrow().fields);
            let child = fields.borrow().get(name).cloned();
            child
        };
        if found.is_some() {
            return found;
        }
        let parent = current.borrow().parent.as_ref().and_then(Weak::upgrade);
        match parent {
            Some(next) => current = next,
            None => return None,
        }
    }
    None
}

/// Resolves the receiver (`this`) for a value.
///
/// Walks the parent/binding chain for an explicit receiver binding. When none
/// exists, Object-kind values fall back to themselves and every other kind is
/// returned unchanged — absence of `this` is a legitimate terminal state for
/// free functions, never an error.
#[must_use]
pub fn resolve_this(value: &ValueRef) -> ValueRef {
    let mut current = Rc::clone(value);
    for _ in 0..MAX_WALK_DEPTH {
        let next = {
            let v = current.borrow();
            if let ValueKind::Function(data) = &v.kind {
                if let Some(receiver) = &data.bound_receiver {
                    return Rc::clone(receiver);
                }
            }
            v.parent.as_ref().and_then(Weak::upgrade)
        };
        match next {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Rc::clone(value)
}

/// Synthesizes a missing field as an Object value under `parent`.
fn vivify(parent: &ValueRef, segment: &str) -> ValueRef {
    let (qualified, taint, origin) = {
        let p = parent.borrow();
        let base = p
            .identity
            .qualified_id
            .as_deref()
            .or_else(|| p.effective_id())
            .unwrap_or("");
        (join_qualified(base, segment), p.taint.clone(), p.origin.clone())
    };

    let mut child = Value::object(segment);
    child.identity.qualified_id = Some(CompactString::from(qualified.as_str()));
    child.origin = origin;
    child.parent = Some(Rc::downgrade(parent));
    if !taint.is_empty() {
        // Field access on a tainted object yields a tainted value.
        child.taint = taint;
        child.taint.push_step(format!("{qualified} <- tainted parent"));
    }
    child.into_ref()
}
