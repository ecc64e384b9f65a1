//! Synthetic type model
//!
//! The ORM assembles its query surface at run time, so no declared type
//! carries the builder methods. This module synthesizes the missing types on
//! demand: a builder-method mixin with fixed return contracts and a concrete
//! builder class combining the mixin with the native builder base. The
//! fragment is a template: every contract late-binds to the model/manager
//! classes discovered at the call site, so inference results point at the
//! caller's actual classes.

use indexmap::IndexMap;

use crate::types::{
    ClassId, ClassInfo, ClassRegistry, MemberDef, ReturnContract, SynthFamily,
};

/// Builder-method mixin: every method the manager and builder both expose,
/// with its declared return contract. Contracts come from the library's
/// documented semantics, not from computation.
pub const BUILDER_METHODS: &[(&str, ReturnContract)] = &[
    ("iterator", ReturnContract::ResultIter),
    ("aggregate", ReturnContract::FreshBuilder),
    ("count", ReturnContract::Count),
    ("get", ReturnContract::ModelInstance),
    ("create", ReturnContract::ModelInstance),
    ("bulk_create", ReturnContract::InstanceSeq),
    ("get_or_create", ReturnContract::ModelInstance),
    ("update_or_create", ReturnContract::ModelInstance),
    ("earliest", ReturnContract::ModelInstance),
    ("latest", ReturnContract::ModelInstance),
    ("first", ReturnContract::ModelInstance),
    ("last", ReturnContract::ModelInstance),
    ("in_bulk", ReturnContract::PkMap),
    ("update", ReturnContract::Count),
    ("exists", ReturnContract::Truth),
    ("raw", ReturnContract::RawBuilder),
    ("values", ReturnContract::FreshBuilder),
    ("values_list", ReturnContract::FreshBuilder),
    ("dates", ReturnContract::DateSeq),
    ("datetimes", ReturnContract::DateTimeSeq),
    ("none", ReturnContract::FreshBuilder),
    ("all", ReturnContract::FreshBuilder),
    ("filter", ReturnContract::FreshBuilder),
    ("exclude", ReturnContract::FreshBuilder),
    ("union", ReturnContract::FreshBuilder),
    ("intersection", ReturnContract::FreshBuilder),
    ("difference", ReturnContract::FreshBuilder),
    ("select_for_update", ReturnContract::FreshBuilder),
    ("select_related", ReturnContract::FreshBuilder),
    ("prefetch_related", ReturnContract::FreshBuilder),
    ("annotate", ReturnContract::FreshBuilder),
    ("order_by", ReturnContract::FreshBuilder),
    ("distinct", ReturnContract::FreshBuilder),
    ("extra", ReturnContract::FreshBuilder),
    ("reverse", ReturnContract::FreshBuilder),
    ("defer", ReturnContract::FreshBuilder),
    ("only", ReturnContract::FreshBuilder),
    ("using", ReturnContract::FreshBuilder),
];

pub fn is_builder_method(name: &str) -> bool {
    BUILDER_METHODS.iter().any(|(m, _)| *m == name)
}

/// Methods documented to hand back a lazy query object. This is the trigger
/// set for the call-result override rule; it is narrower than the mixin
/// (`get`, `count`, `exists`, ... are excluded) and taken from the library's
/// queryset reference.
pub const BUILDER_EXPRESSION_METHODS: &[&str] = &[
    "filter",
    "exclude",
    "annotate",
    "order_by",
    "reverse",
    "distinct",
    "values",
    "values_list",
    "dates",
    "datetimes",
    "none",
    "all",
    "union",
    "intersection",
    "difference",
    "select_related",
    "prefetch_related",
    "extra",
    "defer",
    "only",
    "using",
    "select_for_update",
    "raw",
];

pub fn is_builder_producing(name: &str) -> bool {
    BUILDER_EXPRESSION_METHODS.contains(&name)
}

/// Operator and lifecycle members of the concrete builder type. Iteration
/// yields the cached result sequence, truthiness reflects a non-empty cache,
/// indexing materializes a fresh builder and takes the first element, and
/// `&`/`|` thread the other operand through unchanged.
const BUILDER_PROTOCOL: &[(&str, ReturnContract)] = &[
    ("__iter__", ReturnContract::ResultIter),
    ("__bool__", ReturnContract::Truth),
    ("__len__", ReturnContract::Count),
    ("__getitem__", ReturnContract::ModelInstance),
    ("__and__", ReturnContract::OtherOperand),
    ("__or__", ReturnContract::OtherOperand),
    ("as_manager", ReturnContract::BoundManager),
    ("delete", ReturnContract::DeleteSummary),
];

/// Ephemeral fragment synthesized for one (model, manager) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticModule {
    pub model: ClassId,
    pub manager: ClassId,
    /// Concrete builder class: mixin + native builder base.
    pub queryset: ClassId,
    /// Instance type of the model's manager attribute.
    pub manager_instance: ClassId,
}

/// Memoized synthesis results, keyed by (model qname, manager qname).
#[derive(Debug, Default)]
pub struct SynthCache {
    modules: IndexMap<(String, String), SyntheticModule>,
}

impl SynthCache {
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Build (or fetch) the synthetic fragment for a (model, manager) pair.
///
/// Repeated calls with the same key return the identical fragment; no class
/// or member is ever registered twice.
pub fn synthesize(
    classes: &mut ClassRegistry,
    cache: &mut SynthCache,
    builder_base: ClassId,
    model: ClassId,
    manager: ClassId,
) -> SyntheticModule {
    let key = (
        classes.get(model).qname.clone(),
        classes.get(manager).qname.clone(),
    );
    if let Some(module) = cache.modules.get(&key) {
        return *module;
    }

    let model_name = classes.get(model).name.clone();
    let model_qname = classes.get(model).qname.clone();
    let manager_name = classes.get(manager).name.clone();

    let mut queryset_info = ClassInfo::new(
        format!("{model_name}QuerySet"),
        format!("{model_qname}.QuerySet"),
    )
    .with_base(builder_base);
    for (name, contract) in BUILDER_METHODS.iter().chain(BUILDER_PROTOCOL) {
        queryset_info
            .members
            .insert(name.to_string(), MemberDef::Method { contract: *contract });
    }
    queryset_info.members.insert(
        "ordered".to_string(),
        MemberDef::Property { contract: ReturnContract::Truth },
    );
    queryset_info.members.insert(
        "db".to_string(),
        MemberDef::Property { contract: ReturnContract::Opaque },
    );
    let queryset = classes.add(queryset_info);

    let manager_instance_info = ClassInfo::new(
        format!("{model_name}{manager_name}"),
        format!("{model_qname}.{manager_name}"),
    )
    .with_base(manager);
    let manager_instance = classes.add(manager_instance_info);

    let family = SynthFamily {
        model,
        queryset,
        manager_instance,
    };
    classes.get_mut(queryset).family = Some(family);
    classes.get_mut(manager_instance).family = Some(family);

    let module = SyntheticModule {
        model,
        manager,
        queryset,
        manager_instance,
    };
    cache.modules.insert(key, module);
    tracing::debug!(
        model = %model_qname,
        manager = %manager_name,
        "synthesized builder fragment"
    );
    module
}
