//! Symbolic value model.
//!
//! Every entity the engine reasons about — scopes, objects, functions,
//! primitives, packages, unions of possibilities — is a [`Value`]. Field maps
//! are shared by reference: multiple scope chains may alias one map, which is
//! how shared object references are modeled without a concrete heap. Cloning
//! a value therefore never deep-copies fields implicitly; [`clone_deep`]
//! exists for the rare pass-by-value cases and is depth-bounded.

use crate::ast::{LiteralValue, NodeRef};
use crate::taint::tags::{SourceLabel, TaintState, TaintTag};
use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

pub mod fields;
pub mod union;

/// Shared, interior-mutable handle to a value. Scope chains alias these;
/// a mutation through one handle is visible through all of them.
pub type ValueRef = Rc<RefCell<Value>>;

/// Non-owning back-reference used for parent links, so child scopes never
/// keep their parents alive (closure chains would otherwise cycle).
pub type WeakValueRef = Weak<RefCell<Value>>;

/// The shared named-field container of a value.
pub type FieldMap = Rc<RefCell<FxHashMap<CompactString, ValueRef>>>;

/// Three cooperating identifiers of a value, resolved by precedence
/// local → symbolic → qualified.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Unqualified name, e.g. `handler`.
    pub local_id: Option<CompactString>,
    /// Dotted globally-meaningful path, e.g. `pkg.Class.handler`.
    pub qualified_id: Option<CompactString>,
    /// Fallback identity when neither name is known.
    pub symbolic_id: Option<CompactString>,
}

impl Identity {
    /// Resolves the effective identifier by precedence.
    #[must_use]
    pub fn effective(&self) -> Option<&str> {
        self.local_id
            .as_deref()
            .or(self.symbolic_id.as_deref())
            .or(self.qualified_id.as_deref())
    }
}

/// Function-specific payload of a [`ValueKind::Function`] value.
#[derive(Clone, Default)]
pub struct FunctionData {
    /// AST definition site, absent for purely native functions.
    pub definition: Option<NodeRef>,
    /// Native model for built-ins; takes precedence over `definition`.
    pub native: Option<crate::interp::NativeExecute>,
    /// Explicit receiver binding (`this`), when known.
    pub bound_receiver: Option<ValueRef>,
    /// Additional definition sites for languages with several signatures
    /// under one name.
    pub overloads: Vec<NodeRef>,
}

/// Union-specific payload: insertion-ordered members plus a weak-identity
/// address set for O(1) repeat-reference rejection.
#[derive(Clone, Default)]
pub struct UnionData {
    /// Member values in insertion order; first-match consumers rely on it.
    pub members: Vec<ValueRef>,
    pub(crate) seen: FxHashSet<usize>,
}

/// Aggregate payload: a transient multi-binding container whose children are
/// keyed by disambiguation index, not by name.
#[derive(Clone, Default)]
pub struct AggregateData {
    /// Child bindings in disambiguation order.
    pub children: Vec<ValueRef>,
}

/// The closed sum of every value shape the engine models.
#[derive(Clone)]
pub enum ValueKind {
    /// Lexical scope (module, class, function activation).
    Scope,
    /// Plain object.
    Object,
    /// Concrete primitive with its literal payload.
    Primitive(LiteralValue),
    /// Function, with definition/native/binding data.
    Function(FunctionData),
    /// Imported package/module stub.
    Package,
    /// Symbol: a name whose value is unknown but whose identity matters.
    Symbol,
    /// Known-absent value.
    Undefined,
    /// Declared but never assigned.
    Uninitialized,
    /// One of several possible concrete values.
    Union(UnionData),
    /// Multi-binding container for destructuring across branches.
    Aggregate(AggregateData),
}

impl ValueKind {
    /// Short discriminant name for traces and debug output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scope => "Scope",
            Self::Object => "Object",
            Self::Primitive(_) => "Primitive",
            Self::Function(_) => "Function",
            Self::Package => "Package",
            Self::Symbol => "Symbol",
            Self::Undefined => "Undefined",
            Self::Uninitialized => "Uninitialized",
            Self::Union(_) => "Union",
            Self::Aggregate(_) => "Aggregate",
        }
    }
}

/// Open key→value side-channel entries for per-checker scratch data.
#[derive(Debug, Clone)]
pub enum MiscValue {
    /// String datum.
    Str(CompactString),
    /// Boolean flag.
    Flag(bool),
    /// A single value reference (e.g. a resolved promise handler).
    Value(ValueRef),
    /// Several value references (e.g. recorded promise resolution args).
    Values(Vec<ValueRef>),
}

/// A symbolic runtime entity.
pub struct Value {
    /// Shape discriminant with variant payload.
    pub kind: ValueKind,
    /// Shared named sub-values. Never implicitly deep-copied.
    pub fields: FieldMap,
    /// Identity triple.
    pub identity: Identity,
    /// AST node this value originated from.
    pub origin: Option<NodeRef>,
    /// AST node of the declaration site, when distinct from `origin`.
    pub declared_at: Option<NodeRef>,
    /// Taint posture: source labels, sanitizer tags, trace chain.
    pub taint: TaintState,
    /// Per-checker scratch data; cleared by [`Value::reset`].
    pub misc: FxHashMap<CompactString, MiscValue>,
    /// Lexical/scope-chain link; `None` only at the global scope.
    pub parent: Option<WeakValueRef>,
    /// Human-readable scope name.
    pub display_name: Option<CompactString>,
}

impl Value {
    /// Creates a bare value of the given kind.
    #[must_use]
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            fields: Rc::new(RefCell::new(FxHashMap::default())),
            identity: Identity::default(),
            origin: None,
            declared_at: None,
            taint: TaintState::default(),
            misc: FxHashMap::default(),
            parent: None,
            display_name: None,
        }
    }

    /// Wraps this value into a shared handle.
    #[must_use]
    pub fn into_ref(self) -> ValueRef {
        Rc::new(RefCell::new(self))
    }

    /// Creates an object value with a local id.
    #[must_use]
    pub fn object(local_id: &str) -> Self {
        let mut value = Self::new(ValueKind::Object);
        value.identity.local_id = Some(CompactString::from(local_id));
        value
    }

    /// Creates a scope value. Parent is absent only for the global scope.
    #[must_use]
    pub fn scope(display_name: &str, parent: Option<&ValueRef>) -> Self {
        let mut value = Self::new(ValueKind::Scope);
        value.display_name = Some(CompactString::from(display_name));
        value.identity.local_id = Some(CompactString::from(display_name));
        value.parent = parent.map(Rc::downgrade);
        value
    }

    /// Creates a function value from its definition site.
    #[must_use]
    pub fn function(name: &str, definition: NodeRef) -> Self {
        let mut value = Self::new(ValueKind::Function(FunctionData {
            definition: Some(std::sync::Arc::clone(&definition)),
            ..FunctionData::default()
        }));
        value.identity.local_id = Some(CompactString::from(name));
        value.display_name = Some(CompactString::from(name));
        value.declared_at = Some(definition);
        value
    }

    /// Creates a native function value backed by an `execute` hook.
    #[must_use]
    pub fn native_function(name: &str, native: crate::interp::NativeExecute) -> Self {
        let mut value = Self::new(ValueKind::Function(FunctionData {
            native: Some(native),
            ..FunctionData::default()
        }));
        value.identity.local_id = Some(CompactString::from(name));
        value.display_name = Some(CompactString::from(name));
        value
    }

    /// Creates an undefined value.
    #[must_use]
    pub fn undefined() -> Self {
        Self::new(ValueKind::Undefined)
    }

    /// Creates an uninitialized value.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::new(ValueKind::Uninitialized)
    }

    /// Creates a primitive value from a literal payload.
    #[must_use]
    pub fn primitive(literal: LiteralValue) -> Self {
        Self::new(ValueKind::Primitive(literal))
    }

    /// Creates a symbol value anchored at its declaration site.
    #[must_use]
    pub fn symbol(name: &str, declared_at: Option<NodeRef>) -> Self {
        let mut value = Self::new(ValueKind::Symbol);
        value.identity.symbolic_id = Some(CompactString::from(name));
        value.declared_at = declared_at;
        value
    }

    /// Creates a package/module stub value.
    #[must_use]
    pub fn package(name: &str) -> Self {
        let mut value = Self::new(ValueKind::Package);
        value.identity.local_id = Some(CompactString::from(name));
        value.identity.qualified_id = Some(CompactString::from(name));
        value
    }

    /// Creates an empty union value.
    #[must_use]
    pub fn union() -> Self {
        Self::new(ValueKind::Union(UnionData::default()))
    }

    /// Creates an aggregate value over the given children.
    #[must_use]
    pub fn aggregate(children: Vec<ValueRef>) -> Self {
        Self::new(ValueKind::Aggregate(AggregateData { children }))
    }

    /// Effective identifier by precedence local → symbolic → qualified.
    #[must_use]
    pub fn effective_id(&self) -> Option<&str> {
        self.identity.effective()
    }

    /// Whether the value currently carries untrusted data.
    #[must_use]
    pub fn is_tainted(&self) -> bool {
        self.taint.is_tainted()
    }

    /// Marks the value as tainted by the given source.
    pub fn mark_tainted(&mut self, label: SourceLabel) {
        self.taint
            .push_step(format!("{} <- {}", self.describe(), label.name));
        self.taint.sources.push(label);
    }

    /// Attaches a sanitizer tag to the value's append-only tag set.
    pub fn attach_tag(&mut self, tag: TaintTag) {
        self.taint.tags.push(tag);
    }

    /// Clears the per-checker scratch side-channel.
    pub fn reset(&mut self) {
        self.misc.clear();
    }

    /// Shallow clone: shares the field map. This is the intentional aliasing
    /// clone used for this-binding.
    #[must_use]
    pub fn clone_shallow(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            fields: Rc::clone(&self.fields),
            identity: self.identity.clone(),
            origin: self.origin.clone(),
            declared_at: self.declared_at.clone(),
            taint: self.taint.clone(),
            misc: self.misc.clone(),
            parent: self.parent.clone(),
            display_name: self.display_name.clone(),
        }
    }

    /// Short human-readable description for traces.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.effective_id() {
            Some(id) => format!("{}({id})", self.kind.name()),
            None => self.kind.name().to_owned(),
        }
    }
}

impl fmt::Debug for Value {
    // Field maps may alias and even cycle; a derived Debug would recurse.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("kind", &self.kind.name())
            .field("id", &self.effective_id())
            .field("fields", &self.fields.borrow().len())
            .field("tainted", &self.is_tainted())
            .finish()
    }
}

/// Finds the first tainted constituent of a value, in insertion order:
/// the value itself, or — for unions and aggregates — the first member
/// carrying taint. Depth-bounded; first-match order is the same one union
/// consumers rely on.
#[must_use]
pub fn first_tainted(value: &ValueRef) -> Option<ValueRef> {
    first_tainted_bounded(value, crate::constants::MAX_SANITIZER_LOOKUP_DEPTH)
}

fn first_tainted_bounded(value: &ValueRef, depth: usize) -> Option<ValueRef> {
    if depth == 0 {
        return None;
    }
    if value.borrow().is_tainted() {
        return Some(Rc::clone(value));
    }
    let children = match &value.borrow().kind {
        ValueKind::Union(union) => union.members.clone(),
        ValueKind::Aggregate(aggregate) => aggregate.children.clone(),
        _ => return None,
    };
    children
        .iter()
        .find_map(|child| first_tainted_bounded(child, depth - 1))
}

/// Deep clone for explicit pass-by-value semantics: copies the field map
/// recursively down to `depth` levels, sharing anything deeper.
#[must_use]
pub fn clone_deep(value: &ValueRef, depth: usize) -> ValueRef {
    let cloned = value.borrow().clone_shallow().into_ref();
    if depth == 0 {
        return cloned;
    }
    let source_fields = Rc::clone(&value.borrow().fields);
    let copied: FxHashMap<CompactString, ValueRef> = source_fields
        .borrow()
        .iter()
        .map(|(key, child)| (key.clone(), clone_deep(child, depth - 1)))
        .collect();
    cloned.borrow_mut().fields = Rc::new(RefCell::new(copied));
    cloned
}
