//! Reference inference oracle
//!
//! Best-effort, lazy, single-file resolution over the lowered HIR. Names
//! resolve through the lexical scope tables built during lowering; members
//! resolve through the augmentation overlay first, then declared members,
//! then base classes. Transform rules are consulted whenever a matching node
//! shape is visited mid-query, which is what makes the synthesized library
//! surface appear to exist.
//!
//! The resolver makes no soundness claim. It enumerates candidates in
//! binding order, stops following an expression that is already being
//! inferred (rebindings like `qs = qs.order_by(...)` would otherwise
//! recurse), and reports an explicit failure when a name has no usable
//! binding.

use std::collections::{HashMap, HashSet};

use smallvec::smallvec;

use crate::context::AnalysisContext;
use crate::hir::{
    BinOpKind, Binding, ExprId, ExprKind, HirModule, LiteralKind, ScopeId, ScopeKind, StmtId,
    StmtKind,
};
use crate::oracle::{Candidates, InferenceError, InferenceOracle};
use crate::synthetic::{self, SyntheticModule, BUILDER_METHODS};
use crate::transforms::{NodeShape, TransformOutcome, TransformRule, TransformTarget};
use crate::types::{
    BaseSlot, ClassId, ClassInfo, CollectionKind, FunctionRef, InferredType, MemberDef,
    ReturnContract, ScalarKind, SynthFamily,
};

pub struct Resolver<'a> {
    ctx: &'a mut AnalysisContext,
    module: &'a HirModule,
    /// Class-definition statements of this file, registered up front.
    user_classes: HashMap<StmtId, ClassId>,
    /// Expressions currently being inferred (cycle guard).
    in_flight: HashSet<ExprId>,
}

impl<'a> Resolver<'a> {
    pub fn new(ctx: &'a mut AnalysisContext, module: &'a HirModule) -> Self {
        let user_classes = register_user_classes(ctx, module);
        Self {
            ctx,
            module,
            user_classes,
            in_flight: HashSet::new(),
        }
    }

    pub fn ctx(&self) -> &AnalysisContext {
        self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut AnalysisContext {
        self.ctx
    }

    pub fn module(&self) -> &HirModule {
        self.module
    }

    pub fn class_for_stmt(&self, def: StmtId) -> Option<ClassId> {
        self.user_classes.get(&def).copied()
    }

    /// Candidate types of an expression, in preference order.
    pub fn resolve(&mut self, expr: ExprId) -> Result<Candidates, InferenceError> {
        self.infer_expr(expr)
    }

    fn infer_expr(&mut self, expr: ExprId) -> Result<Candidates, InferenceError> {
        if !self.in_flight.insert(expr) {
            return Err(InferenceError::Recursion);
        }
        let result = self.infer_expr_inner(expr);
        self.in_flight.remove(&expr);
        result
    }

    fn infer_expr_inner(&mut self, expr: ExprId) -> Result<Candidates, InferenceError> {
        let module = self.module;
        let node = module.expr(expr);
        match &node.kind {
            ExprKind::Name { id } => self.infer_name(node.scope, id),
            ExprKind::Attribute { value, attr } => self.infer_attribute(*value, attr),
            ExprKind::Call { .. } => self.infer_call(expr),
            ExprKind::Literal { kind } => Ok(smallvec![literal_type(*kind)]),
            ExprKind::List { .. } => Ok(smallvec![InferredType::Collection(CollectionKind::List)]),
            ExprKind::Tuple { .. } => Ok(smallvec![InferredType::Collection(CollectionKind::Tuple)]),
            ExprKind::Dict { .. } => Ok(smallvec![InferredType::Collection(CollectionKind::Dict)]),
            ExprKind::BinOp { left, op, right } => self.infer_binop(*left, *op, *right),
            ExprKind::BoolOp { values } => {
                let values = values.clone();
                let mut out = Candidates::new();
                for value in values {
                    if let Ok(cands) = self.infer_expr(value) {
                        out.extend(cands);
                    }
                }
                Ok(out)
            }
            ExprKind::Subscript { value, .. } => self.infer_subscript(*value),
            ExprKind::Opaque { .. } => Ok(smallvec![InferredType::Unknown]),
        }
    }

    fn infer_name(&mut self, scope: ScopeId, name: &str) -> Result<Candidates, InferenceError> {
        let module = self.module;
        let origin = scope;
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            let scope_info = module.scope(scope_id);
            // class bodies are invisible to nested function scopes
            let skip =
                scope_id != origin && matches!(scope_info.kind, ScopeKind::Class { .. });
            if !skip {
                if let Some(bindings) = scope_info.bindings.get(name) {
                    let bindings = bindings.clone();
                    let mut out = Candidates::new();
                    for binding in &bindings {
                        self.binding_candidates(binding, scope_id, &mut out);
                    }
                    if out.is_empty() {
                        return Err(InferenceError::Unresolved(name.to_string()));
                    }
                    return Ok(out);
                }
            }
            current = scope_info.parent;
        }
        Err(InferenceError::Unresolved(name.to_string()))
    }

    fn binding_candidates(&mut self, binding: &Binding, scope: ScopeId, out: &mut Candidates) {
        match binding {
            Binding::Import { path } => out.push(InferredType::Module(path.clone())),
            Binding::ImportFrom { qname } => out.push(self.lookup_qualified(qname)),
            Binding::Class { def } => {
                if let Some(class) = self.class_for_stmt(*def) {
                    out.push(InferredType::Class(class));
                }
            }
            Binding::Function { def } => {
                if let StmtKind::FunctionDef { name, .. } = &self.module.stmt(*def).kind {
                    out.push(InferredType::Function(FunctionRef::User {
                        def: *def,
                        name: name.clone(),
                    }));
                }
            }
            Binding::Assign { value } => {
                if let Ok(cands) = self.infer_expr(*value) {
                    out.extend(cands);
                }
            }
            Binding::AnnAssign { annotation, value } => {
                if let Some(value) = value {
                    if let Ok(cands) = self.infer_expr(*value) {
                        out.extend(cands);
                        return;
                    }
                }
                if let Some(ty) = self.annotated_instance(*annotation) {
                    out.push(ty);
                }
            }
            Binding::Param { index, annotation } => {
                if *index == 0 {
                    if let ScopeKind::Function {
                        method_of: Some(class_def),
                        ..
                    } = &self.module.scope(scope).kind
                    {
                        if let Some(class) = self.class_for_stmt(*class_def) {
                            out.push(InferredType::Instance(class));
                            return;
                        }
                    }
                }
                if let Some(annotation) = annotation {
                    if let Some(ty) = self.annotated_instance(*annotation) {
                        out.push(ty);
                        return;
                    }
                }
                out.push(InferredType::Unknown);
            }
        }
    }

    /// `x: SomeClass` infers the parameter or attribute as an instance.
    fn annotated_instance(&mut self, annotation: ExprId) -> Option<InferredType> {
        let cands = self.infer_expr(annotation).ok()?;
        match cands.first() {
            Some(InferredType::Class(class)) => Some(InferredType::Instance(*class)),
            _ => None,
        }
    }

    fn lookup_qualified(&mut self, qname: &str) -> InferredType {
        use crate::stubs::PreludeEntry;
        match self.ctx.prelude.lookup(qname) {
            Some(PreludeEntry::Class(class)) => InferredType::Class(*class),
            Some(PreludeEntry::Function(canonical)) => {
                InferredType::Function(FunctionRef::Library {
                    qname: canonical.clone(),
                })
            }
            Some(PreludeEntry::Module) => InferredType::Module(qname.to_string()),
            None => InferredType::Unknown,
        }
    }

    fn infer_attribute(
        &mut self,
        value: ExprId,
        attr: &str,
    ) -> Result<Candidates, InferenceError> {
        let base = self.infer_expr(value)?;
        let mut out = Candidates::new();
        for candidate in base {
            match candidate {
                InferredType::Module(path) => {
                    out.push(self.lookup_qualified(&format!("{path}.{attr}")));
                }
                InferredType::Class(class) | InferredType::Instance(class) => {
                    self.ensure_class_transforms(class);
                    if let Some(member) = self.member_lookup(class, attr) {
                        let types = self.member_types(class, member);
                        out.extend(types);
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn infer_call(&mut self, expr: ExprId) -> Result<Candidates, InferenceError> {
        if let Some(forced) = self.consult_call_rules(expr) {
            return Ok(smallvec![forced]);
        }
        let func = match &self.module.expr(expr).kind {
            ExprKind::Call { func, .. } => *func,
            _ => return Err(InferenceError::Unsupported),
        };
        let callee = self.infer_expr(func)?;
        let mut out = Candidates::new();
        for candidate in callee {
            match candidate {
                InferredType::Class(class) => {
                    self.ensure_class_transforms(class);
                    out.push(InferredType::Instance(class));
                }
                InferredType::BoundMethod { receiver, contract } => {
                    match self.contract_result(receiver, contract) {
                        Some(ty) => out.push(ty),
                        None => out.push(InferredType::Unknown),
                    }
                }
                _ => out.push(InferredType::Unknown),
            }
        }
        Ok(out)
    }

    fn infer_binop(
        &mut self,
        left: ExprId,
        op: BinOpKind,
        right: ExprId,
    ) -> Result<Candidates, InferenceError> {
        let dunder = match op {
            BinOpKind::BitAnd => "__and__",
            BinOpKind::BitOr => "__or__",
            BinOpKind::Other => return Ok(smallvec![InferredType::Unknown]),
        };
        let left_cands = self.infer_expr(left).unwrap_or_default();
        if let Some(InferredType::Instance(class)) = left_cands.first() {
            let class = *class;
            if matches!(
                self.member_lookup(class, dunder),
                Some(MemberDef::Method {
                    contract: ReturnContract::OtherOperand
                })
            ) {
                // combination threads the other operand through unchanged
                return self.infer_expr(right);
            }
        }
        Ok(smallvec![InferredType::Unknown])
    }

    fn infer_subscript(&mut self, value: ExprId) -> Result<Candidates, InferenceError> {
        let base = self.infer_expr(value).unwrap_or_default();
        if let Some(InferredType::Instance(class)) = base.first() {
            let class = *class;
            if let Some(MemberDef::Method { contract }) = self.member_lookup(class, "__getitem__")
            {
                if let Some(ty) = self.contract_result(class, contract) {
                    return Ok(smallvec![ty]);
                }
            }
        }
        Ok(smallvec![InferredType::Unknown])
    }

    /// Overlay first, then declared members, then base classes.
    pub fn member_lookup(&mut self, class: ClassId, name: &str) -> Option<MemberDef> {
        let mut seen = HashSet::new();
        self.member_lookup_guarded(class, name, &mut seen)
    }

    fn member_lookup_guarded(
        &mut self,
        class: ClassId,
        name: &str,
        seen: &mut HashSet<ClassId>,
    ) -> Option<MemberDef> {
        if !seen.insert(class) {
            return None;
        }
        if let Some(member) = self.ctx.overlay.get(class, name) {
            return Some(member.clone());
        }
        if let Some(member) = self.ctx.classes.get(class).members.get(name) {
            return Some(member.clone());
        }
        for base in self.resolved_bases(class) {
            if let Some(member) = self.member_lookup_guarded(base, name, seen) {
                return Some(member);
            }
        }
        None
    }

    fn member_types(&mut self, receiver: ClassId, member: MemberDef) -> Candidates {
        match member {
            MemberDef::Method { contract } => {
                smallvec![InferredType::BoundMethod { receiver, contract }]
            }
            MemberDef::UserMethod { .. } => smallvec![InferredType::BoundMethod {
                receiver,
                contract: ReturnContract::Opaque,
            }],
            MemberDef::Property { contract } => match self.contract_result(receiver, contract) {
                Some(ty) => smallvec![ty],
                None => smallvec![InferredType::Unknown],
            },
            MemberDef::Attr { ty } => smallvec![ty],
            MemberDef::Binding { value } => self.infer_expr(value).unwrap_or_default(),
        }
    }

    /// Evaluate a declared return contract against the receiver it was
    /// looked up on. Contracts late-bind: a synthesized receiver resolves to
    /// its own model/builder classes, anything else to the generic stubs.
    fn contract_result(
        &mut self,
        receiver: ClassId,
        contract: ReturnContract,
    ) -> Option<InferredType> {
        let family = self.family_of(receiver);
        let prelude = &self.ctx.prelude;
        let ty = match contract {
            ReturnContract::FreshBuilder => InferredType::Instance(
                family.map(|f| f.queryset).unwrap_or(prelude.queryset),
            ),
            ReturnContract::ModelInstance => {
                InferredType::Instance(family.map(|f| f.model).unwrap_or(prelude.model))
            }
            ReturnContract::Count => InferredType::Scalar(ScalarKind::Int),
            ReturnContract::Truth => InferredType::Scalar(ScalarKind::Bool),
            ReturnContract::DateSeq | ReturnContract::DateTimeSeq | ReturnContract::InstanceSeq => {
                InferredType::Collection(CollectionKind::List)
            }
            ReturnContract::ResultIter => InferredType::Collection(CollectionKind::Iter),
            ReturnContract::PkMap => InferredType::Collection(CollectionKind::Dict),
            ReturnContract::RawBuilder => InferredType::Instance(prelude.raw_queryset),
            ReturnContract::BoundManager => InferredType::Instance(
                family
                    .map(|f| f.manager_instance)
                    .unwrap_or(prelude.base_manager),
            ),
            ReturnContract::DeleteSummary => InferredType::Collection(CollectionKind::Tuple),
            ReturnContract::OtherOperand => return None,
            ReturnContract::Opaque => InferredType::Unknown,
        };
        Some(ty)
    }

    fn family_of(&mut self, class: ClassId) -> Option<SynthFamily> {
        let mut seen = HashSet::new();
        let mut queue = vec![class];
        while let Some(current) = queue.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(family) = self.ctx.classes.get(current).family {
                return Some(family);
            }
            queue.extend(self.resolved_bases(current));
        }
        None
    }

    /// Base classes, resolving unresolved slots on first use.
    fn resolved_bases(&mut self, class: ClassId) -> Vec<ClassId> {
        let slots = self.ctx.classes.get(class).bases.clone();
        let mut out = Vec::new();
        for (index, slot) in slots.iter().enumerate() {
            match slot {
                BaseSlot::Resolved(base) => out.push(*base),
                BaseSlot::Failed => {}
                BaseSlot::Unresolved(expr) => {
                    let resolved = self.infer_expr(*expr).ok().and_then(|cands| {
                        cands.iter().find_map(|t| match t {
                            InferredType::Class(base) => Some(*base),
                            _ => None,
                        })
                    });
                    let new_slot = match resolved {
                        Some(base) => {
                            out.push(base);
                            BaseSlot::Resolved(base)
                        }
                        None => BaseSlot::Failed,
                    };
                    self.ctx.classes.get_mut(class).bases[index] = new_slot;
                }
            }
        }
        out
    }

    pub fn class_is_subtype(&mut self, class: ClassId, qname: &str) -> bool {
        let mut seen = HashSet::new();
        let mut queue = vec![class];
        while let Some(current) = queue.pop() {
            if !seen.insert(current) {
                continue;
            }
            if self.ctx.classes.get(current).qname == qname {
                return true;
            }
            queue.extend(self.resolved_bases(current));
        }
        false
    }

    /// Consult call-shaped transform rules; first non-declining rule wins.
    fn consult_call_rules(&mut self, call: ExprId) -> Option<InferredType> {
        let rules = self.ctx.transforms.rules_for(NodeShape::Call);
        let target = TransformTarget::Call(call);
        for rule in rules {
            if !rule.matches(target, self) {
                continue;
            }
            match rule.apply(target, self) {
                TransformOutcome::Inferred(ty) => {
                    tracing::trace!(rule = rule.name(), "call result overridden");
                    return Some(ty);
                }
                TransformOutcome::Augmented => return None,
                TransformOutcome::Declined => {}
            }
        }
        None
    }

    /// Run class-shaped transform rules once per class, lazily, at first use.
    pub fn ensure_class_transforms(&mut self, class: ClassId) {
        if !self.ctx.augmented.insert(class) {
            return;
        }
        let rules = self.ctx.transforms.rules_for(NodeShape::ClassDef);
        let target = TransformTarget::Class(class);
        for rule in rules {
            if !rule.matches(target, self) {
                continue;
            }
            match rule.apply(target, self) {
                TransformOutcome::Declined => {}
                _ => {
                    tracing::trace!(rule = rule.name(), "class augmented");
                    break;
                }
            }
        }
    }

    // -- helpers used by the transform rules --

    pub fn synthesize(&mut self, model: ClassId, manager: ClassId) -> SyntheticModule {
        synthetic::synthesize(
            &mut self.ctx.classes,
            &mut self.ctx.synth,
            self.ctx.prelude.queryset,
            model,
            manager,
        )
    }

    /// Copy the builder-method mixin into `target`'s overlay table,
    /// overwriting on name collision.
    pub fn install_builder_members(&mut self, target: ClassId) {
        for (name, contract) in BUILDER_METHODS {
            self.ctx
                .overlay
                .insert(target, *name, MemberDef::Method { contract: *contract });
        }
    }

    pub fn is_bound_receiver(&self, ty: &InferredType) -> Option<ClassId> {
        match ty {
            InferredType::BoundMethod { receiver, .. } => Some(*receiver),
            _ => None,
        }
    }

    /// The builder class a forced call result should be an instance of.
    pub fn builder_for_receiver(&mut self, receiver: ClassId) -> ClassId {
        self.family_of(receiver)
            .map(|f| f.queryset)
            .unwrap_or(self.ctx.prelude.queryset)
    }
}

impl InferenceOracle for Resolver<'_> {
    fn resolve_types(&mut self, node: ExprId) -> Result<Candidates, InferenceError> {
        self.resolve(node)
    }

    fn lookup_binding(&self, scope: ScopeId, name: &str) -> Option<Binding> {
        let module = self.module;
        let origin = scope;
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            let scope_info = module.scope(scope_id);
            let skip =
                scope_id != origin && matches!(scope_info.kind, ScopeKind::Class { .. });
            if !skip {
                if let Some(bindings) = scope_info.bindings.get(name) {
                    return bindings.first().cloned();
                }
            }
            current = scope_info.parent;
        }
        None
    }

    fn subtype_of(&mut self, ty: &InferredType, qname: &str) -> bool {
        match ty {
            InferredType::Class(class) | InferredType::Instance(class) => {
                self.class_is_subtype(*class, qname)
            }
            _ => false,
        }
    }

    fn is_bound_method(&self, ty: &InferredType) -> Option<ClassId> {
        self.is_bound_receiver(ty)
    }
}

/// Register every class defined in the file, with unresolved base slots and
/// declared members taken from the class body.
fn register_user_classes(
    ctx: &mut AnalysisContext,
    module: &HirModule,
) -> HashMap<StmtId, ClassId> {
    let mut user_classes = HashMap::new();
    for stmt_id in module.stmt_ids() {
        let StmtKind::ClassDef {
            name, bases, body, ..
        } = &module.stmt(stmt_id).kind
        else {
            continue;
        };
        let mut info = ClassInfo::new(name.clone(), format!("{}.{}", module.name, name));
        info.bases = bases.iter().map(|b| BaseSlot::Unresolved(*b)).collect();
        for &member_stmt in body {
            match &module.stmt(member_stmt).kind {
                StmtKind::FunctionDef { name, .. } => {
                    info.members
                        .insert(name.clone(), MemberDef::UserMethod { def: member_stmt });
                }
                StmtKind::Assign { targets, value } => {
                    for target in targets {
                        if let ExprKind::Name { id } = &module.expr(*target).kind {
                            info.members
                                .insert(id.clone(), MemberDef::Binding { value: *value });
                        }
                    }
                }
                StmtKind::AnnAssign {
                    target,
                    value: Some(value),
                    ..
                } => {
                    if let ExprKind::Name { id } = &module.expr(*target).kind {
                        info.members
                            .insert(id.clone(), MemberDef::Binding { value: *value });
                    }
                }
                _ => {}
            }
        }
        let class = ctx.classes.add(info);
        user_classes.insert(stmt_id, class);
    }
    user_classes
}

fn literal_type(kind: LiteralKind) -> InferredType {
    match kind {
        LiteralKind::Int => InferredType::Scalar(ScalarKind::Int),
        LiteralKind::Float => InferredType::Scalar(ScalarKind::Float),
        LiteralKind::Str => InferredType::Scalar(ScalarKind::Str),
        LiteralKind::Bytes => InferredType::Scalar(ScalarKind::Bytes),
        LiteralKind::Bool => InferredType::Scalar(ScalarKind::Bool),
        LiteralKind::None => InferredType::Scalar(ScalarKind::NoneType),
        LiteralKind::Ellipsis => InferredType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_bridge::parse_module;
    use crate::context::install;
    use crate::stubs::{CELERY_APP_QNAME, MODEL_QNAME, QUERYSET_QNAME};

    /// Candidates of the value expression of the last `probe = ...`
    /// assignment at module level.
    fn resolve_probe(source: &str) -> (Candidates, bool) {
        let mut ctx = install();
        let module = parse_module(source, "m").unwrap();
        let mut resolver = Resolver::new(&mut ctx, &module);
        let mut probe = None;
        for stmt_id in module.body.iter().rev() {
            if let StmtKind::Assign { targets, value } = &module.stmt(*stmt_id).kind {
                if let ExprKind::Name { id } = &module.expr(targets[0]).kind {
                    if id == "probe" {
                        probe = Some(*value);
                        break;
                    }
                }
            }
        }
        let probe = probe.expect("no `probe = ...` assignment in test source");
        let cands = resolver.resolve(probe).unwrap_or_default();
        let is_queryset = cands
            .first()
            .map(|t| resolver.subtype_of(t, QUERYSET_QNAME))
            .unwrap_or(false);
        (cands, is_queryset)
    }

    #[test]
    fn test_import_resolves_to_class() {
        let (cands, _) = resolve_probe("from django.contrib.auth.models import User\nprobe = User\n");
        assert!(matches!(cands.first(), Some(InferredType::Class(_))));
    }

    #[test]
    fn test_declared_manager_attribute_is_builder_source() {
        let source = "\
from django.db import models

class Person(models.Model):
    objects = models.Manager()

probe = Person.objects.filter(x=1)
";
        let (_, is_queryset) = resolve_probe(source);
        assert!(is_queryset);
    }

    #[test]
    fn test_default_manager_is_injected() {
        let source = "\
from django.db import models

class Person(models.Model):
    pass

probe = Person.objects.all()
";
        let (_, is_queryset) = resolve_probe(source);
        assert!(is_queryset);
    }

    #[test]
    fn test_get_returns_model_instance_not_builder() {
        let source = "\
from django.db import models

class Person(models.Model):
    pass

probe = Person.objects.get(pk=1)
";
        let mut ctx = install();
        let module = parse_module(source, "m").unwrap();
        let mut resolver = Resolver::new(&mut ctx, &module);
        let value = match &module.stmt(*module.body.last().unwrap()).kind {
            StmtKind::Assign { value, .. } => *value,
            _ => unreachable!(),
        };
        let cands = resolver.resolve(value).unwrap();
        let first = cands.first().unwrap().clone();
        assert!(resolver.subtype_of(&first, MODEL_QNAME));
        assert!(!resolver.subtype_of(&first, QUERYSET_QNAME));
    }

    #[test]
    fn test_rebinding_refinement_does_not_recurse() {
        let source = "\
from django.contrib.auth.models import User

qs = User.objects.all()
qs = qs.order_by('name')
probe = qs.filter(x=1)
";
        let (_, is_queryset) = resolve_probe(source);
        assert!(is_queryset);
    }

    #[test]
    fn test_app_decorator_attribute_is_bound_to_celery() {
        let source = "\
from celery import Celery

app = Celery('proj')
probe = app.task
";
        let mut ctx = install();
        let module = parse_module(source, "m").unwrap();
        let mut resolver = Resolver::new(&mut ctx, &module);
        let value = match &module.stmt(*module.body.last().unwrap()).kind {
            StmtKind::Assign { value, .. } => *value,
            _ => unreachable!(),
        };
        let cands = resolver.resolve(value).unwrap();
        let receiver = resolver
            .is_bound_method(cands.first().unwrap())
            .expect("bound method");
        assert!(resolver.class_is_subtype(receiver, CELERY_APP_QNAME));
    }

    #[test]
    fn test_unresolved_name_is_an_inference_error() {
        let mut ctx = install();
        let module = parse_module("probe = never_bound\n", "m").unwrap();
        let mut resolver = Resolver::new(&mut ctx, &module);
        let value = match &module.stmt(module.body[0]).kind {
            StmtKind::Assign { value, .. } => *value,
            _ => unreachable!(),
        };
        assert!(matches!(
            resolver.resolve(value),
            Err(InferenceError::Unresolved(_))
        ));
    }

    #[test]
    fn test_queryset_and_threads_other_operand() {
        let source = "\
from django.contrib.auth.models import User

left = User.objects.filter(a=1)
probe = left & User.objects.filter(b=2)
";
        let (_, is_queryset) = resolve_probe(source);
        assert!(is_queryset);
    }

    #[test]
    fn test_indexing_builder_yields_model_instance() {
        let source = "\
from django.contrib.auth.models import User

probe = User.objects.all()[0]
";
        let mut ctx = install();
        let module = parse_module(source, "m").unwrap();
        let mut resolver = Resolver::new(&mut ctx, &module);
        let value = match &module.stmt(*module.body.last().unwrap()).kind {
            StmtKind::Assign { value, .. } => *value,
            _ => unreachable!(),
        };
        let cands = resolver.resolve(value).unwrap();
        let first = cands.first().unwrap().clone();
        assert!(resolver.subtype_of(&first, MODEL_QNAME));
    }

    #[test]
    fn test_self_in_queryset_subclass_method() {
        let source = "\
from django.db import models

class PersonQuerySet(models.QuerySet):
    def editors(self):
        return self.filter(role='E')

probe = 1
";
        let mut ctx = install();
        let module = parse_module(source, "m").unwrap();
        let mut resolver = Resolver::new(&mut ctx, &module);
        // find the `self.filter(...)` call inside the method body
        let call = module
            .expr_ids()
            .find(|id| {
                matches!(&module.expr(*id).kind, ExprKind::Call { func, .. }
                    if matches!(&module.expr(*func).kind, ExprKind::Attribute { attr, .. } if attr == "filter"))
            })
            .expect("filter call");
        let cands = resolver.resolve(call).unwrap();
        assert!(resolver.subtype_of(cands.first().unwrap(), QUERYSET_QNAME));
    }
}
