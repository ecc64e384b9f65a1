//! Class registry and the inferred-type model
//!
//! Types are nominal: a class is a registry entry with a qualified name,
//! base classes, and a member table. An [`InferredType`] is one possible
//! runtime value an expression may evaluate to; candidate sequences of these
//! are what the oracle hands back to the checkers.

use indexmap::IndexMap;

use crate::hir::{ExprId, StmtId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// Context-wide class arena. Holds library stubs, user classes discovered
/// per file, and synthesized builder/manager classes. Append-only.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassInfo>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, info: ClassInfo) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(info);
        id
    }

    pub fn get(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut ClassInfo {
        &mut self.classes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[derive(Debug)]
pub struct ClassInfo {
    pub name: String,
    pub qname: String,
    pub bases: Vec<BaseSlot>,
    pub members: IndexMap<String, MemberDef>,
    /// Set on synthesized classes; links the builder/manager pair back to
    /// the model they were synthesized for.
    pub family: Option<SynthFamily>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>, qname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qname: qname.into(),
            bases: Vec::new(),
            members: IndexMap::new(),
            family: None,
        }
    }

    pub fn with_base(mut self, base: ClassId) -> Self {
        self.bases.push(BaseSlot::Resolved(base));
        self
    }
}

/// A base-class reference. User classes start out unresolved; the resolver
/// fills the slot in on first subtype query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseSlot {
    Resolved(ClassId),
    Unresolved(ExprId),
    Failed,
}

/// Late-binding links from a synthesized class back to its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthFamily {
    pub model: ClassId,
    pub queryset: ClassId,
    pub manager_instance: ClassId,
}

/// A member of a class, declared or synthetic.
#[derive(Debug, Clone)]
pub enum MemberDef {
    /// Synthetic or stub method with a fixed return contract.
    Method { contract: ReturnContract },
    /// Synthetic read-only property.
    Property { contract: ReturnContract },
    /// Attribute with an already-known type (overlay injections).
    Attr { ty: InferredType },
    /// Class-body assignment in user code; the value is inferred on demand.
    Binding { value: ExprId },
    /// Method defined in user code. No return contract is known.
    UserMethod { def: StmtId },
}

/// Declared return contract of a synthetic builder method. Contracts are
/// fixed by the library's documented semantics and late-bound to the
/// receiver's model when a call is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnContract {
    /// A fresh builder instance.
    FreshBuilder,
    /// An instance of the domain model.
    ModelInstance,
    /// A row/object count.
    Count,
    /// A boolean.
    Truth,
    /// A sequence of dates.
    DateSeq,
    /// A sequence of datetimes.
    DateTimeSeq,
    /// A mapping keyed by primary key.
    PkMap,
    /// A sequence of model instances.
    InstanceSeq,
    /// An iterator over the cached result sequence.
    ResultIter,
    /// A raw-query builder.
    RawBuilder,
    /// A manager bound to this model.
    BoundManager,
    /// (deleted count, per-type mapping) pair.
    DeleteSummary,
    /// Boolean combination threads the other operand through unchanged.
    OtherOperand,
    /// Nothing useful can be said about the result.
    Opaque,
}

/// One possible runtime value of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum InferredType {
    /// The class object itself.
    Class(ClassId),
    /// An instance of the class.
    Instance(ClassId),
    /// A method bound to a receiver, with its declared return contract.
    BoundMethod {
        receiver: ClassId,
        contract: ReturnContract,
    },
    Function(FunctionRef),
    /// A module reference (dotted import path).
    Module(String),
    Scalar(ScalarKind),
    Collection(CollectionKind),
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionRef {
    /// Function defined in the analyzed file.
    User { def: StmtId, name: String },
    /// Library function known only by qualified name.
    Library { qname: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Float,
    Str,
    Bytes,
    Bool,
    NoneType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    Tuple,
    Dict,
    Iter,
}
