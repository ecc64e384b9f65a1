//! Pattern-triggered transform rules
//!
//! Rules are consulted by the oracle when it visits a matching node shape
//! during a query; there is no pre-pass over the tree. A rule either
//! augments the symbol overlay and/or overrides the node's inferred result,
//! or declines so default inference proceeds.

use std::rc::Rc;

use crate::hir::{ExprId, ExprKind};
use crate::resolver::Resolver;
use crate::stubs::{BASE_MANAGER_QNAME, MANAGER_QNAME, MODEL_QNAME, QUERYSET_QNAME};
use crate::synthetic::is_builder_producing;
use crate::types::{ClassId, InferredType, MemberDef};

/// Node shape a rule triggers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Call,
    ClassDef,
}

#[derive(Debug, Clone, Copy)]
pub enum TransformTarget {
    Call(ExprId),
    Class(ClassId),
}

pub enum TransformOutcome {
    /// The overlay was mutated and the node's inferred result is overridden.
    Inferred(InferredType),
    /// The overlay was mutated; default inference proceeds.
    Augmented,
    /// No override; default inference proceeds.
    Declined,
}

pub trait TransformRule {
    fn name(&self) -> &'static str;
    fn shape(&self) -> NodeShape;
    /// Shape predicate. May itself run inference queries.
    fn matches(&self, target: TransformTarget, resolver: &mut Resolver) -> bool;
    fn apply(&self, target: TransformTarget, resolver: &mut Resolver) -> TransformOutcome;
}

/// Registered rules, consulted in registration order.
#[derive(Default)]
pub struct TransformRegistry {
    rules: Vec<Rc<dyn TransformRule>>,
}

impl TransformRegistry {
    pub fn register(&mut self, rule: Rc<dyn TransformRule>) {
        tracing::debug!(rule = rule.name(), "registered transform rule");
        self.rules.push(rule);
    }

    /// Rules for one shape. Cloned out so the resolver can re-borrow itself
    /// while dispatching.
    pub fn rules_for(&self, shape: NodeShape) -> Vec<Rc<dyn TransformRule>> {
        self.rules
            .iter()
            .filter(|r| r.shape() == shape)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Install the three stock rules.
pub fn register_default_rules(registry: &mut TransformRegistry) {
    registry.register(Rc::new(ManagerAttributeRule));
    registry.register(Rc::new(DefaultManagerRule));
    registry.register(Rc::new(BuilderCallOverrideRule));
}

/// `objects = SomeManager()` inside a domain-model class body: synthesize
/// the builder fragment for (model, manager) and copy every builder method
/// into the manager instance's own symbol table.
struct ManagerAttributeRule;

impl ManagerAttributeRule {
    /// The model class and manager class of a matching assignment.
    fn classify(
        &self,
        call: ExprId,
        resolver: &mut Resolver,
    ) -> Option<(ClassId, ClassId)> {
        let assign = resolver.module().class_attr_calls.get(&call)?.clone();
        let model = resolver.class_for_stmt(assign.class_def)?;
        if !resolver.class_is_subtype(model, MODEL_QNAME) {
            return None;
        }
        let func = match &resolver.module().expr(call).kind {
            ExprKind::Call { func, .. } => *func,
            _ => return None,
        };
        let callee = resolver.resolve(func).ok()?;
        // only the first candidate is consulted
        match callee.first() {
            Some(InferredType::Class(manager))
                if resolver.class_is_subtype(*manager, MANAGER_QNAME) =>
            {
                Some((model, *manager))
            }
            _ => None,
        }
    }
}

impl TransformRule for ManagerAttributeRule {
    fn name(&self) -> &'static str {
        "manager-attribute-augmentation"
    }

    fn shape(&self) -> NodeShape {
        NodeShape::Call
    }

    fn matches(&self, target: TransformTarget, resolver: &mut Resolver) -> bool {
        match target {
            TransformTarget::Call(call) => self.classify(call, resolver).is_some(),
            TransformTarget::Class(_) => false,
        }
    }

    fn apply(&self, target: TransformTarget, resolver: &mut Resolver) -> TransformOutcome {
        let TransformTarget::Call(call) = target else {
            return TransformOutcome::Declined;
        };
        let Some((model, manager)) = self.classify(call, resolver) else {
            return TransformOutcome::Declined;
        };
        let module = resolver.synthesize(model, manager);
        resolver.install_builder_members(module.manager_instance);
        TransformOutcome::Inferred(InferredType::Instance(module.manager_instance))
    }
}

/// Domain-model subclass with no manager attribute, locally or inherited:
/// attach a default manager instance with all builder methods present.
struct DefaultManagerRule;

impl TransformRule for DefaultManagerRule {
    fn name(&self) -> &'static str {
        "default-manager-injection"
    }

    fn shape(&self) -> NodeShape {
        NodeShape::ClassDef
    }

    fn matches(&self, target: TransformTarget, resolver: &mut Resolver) -> bool {
        let TransformTarget::Class(class) = target else {
            return false;
        };
        resolver.class_is_subtype(class, MODEL_QNAME)
            && resolver.member_lookup(class, "objects").is_none()
    }

    fn apply(&self, target: TransformTarget, resolver: &mut Resolver) -> TransformOutcome {
        let TransformTarget::Class(class) = target else {
            return TransformOutcome::Declined;
        };
        let manager = resolver.ctx().prelude.manager;
        let module = resolver.synthesize(class, manager);
        resolver.install_builder_members(module.manager_instance);
        resolver.ctx_mut().overlay.insert(
            class,
            "objects",
            MemberDef::Attr {
                ty: InferredType::Instance(module.manager_instance),
            },
        );
        TransformOutcome::Augmented
    }
}

/// Call of a known builder-producing method on a manager-or-builder
/// receiver: force the result to a fresh builder instance, bypassing
/// whatever default inference would make of the chain.
struct BuilderCallOverrideRule;

impl BuilderCallOverrideRule {
    fn receiver(&self, call: ExprId, resolver: &mut Resolver) -> Option<ClassId> {
        let func = match &resolver.module().expr(call).kind {
            ExprKind::Call { func, .. } => *func,
            _ => return None,
        };
        let callee_name = match &resolver.module().expr(func).kind {
            ExprKind::Attribute { attr, .. } => attr.clone(),
            ExprKind::Name { id, .. } => id.clone(),
            _ => return None,
        };
        if !is_builder_producing(&callee_name) {
            return None;
        }
        let candidates = resolver.resolve(func).ok()?;
        let first = candidates.first()?;
        let receiver = resolver.is_bound_receiver(first)?;
        let manager_or_builder = resolver.class_is_subtype(receiver, BASE_MANAGER_QNAME)
            || resolver.class_is_subtype(receiver, QUERYSET_QNAME);
        manager_or_builder.then_some(receiver)
    }
}

impl TransformRule for BuilderCallOverrideRule {
    fn name(&self) -> &'static str {
        "builder-call-override"
    }

    fn shape(&self) -> NodeShape {
        NodeShape::Call
    }

    fn matches(&self, target: TransformTarget, resolver: &mut Resolver) -> bool {
        match target {
            TransformTarget::Call(call) => self.receiver(call, resolver).is_some(),
            TransformTarget::Class(_) => false,
        }
    }

    fn apply(&self, target: TransformTarget, resolver: &mut Resolver) -> TransformOutcome {
        let TransformTarget::Call(call) = target else {
            return TransformOutcome::Declined;
        };
        let Some(receiver) = self.receiver(call, resolver) else {
            return TransformOutcome::Declined;
        };
        TransformOutcome::Inferred(InferredType::Instance(
            resolver.builder_for_receiver(receiver),
        ))
    }
}
