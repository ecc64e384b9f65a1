//! Task-argument-safety checker
//!
//! Task functions run in another process with serialized arguments, so two
//! argument kinds are unsafe at every dispatch site: a live model instance
//! (stale by the time the task runs) and an un-evaluated queryset (not
//! meaningfully transferable). The checker classifies task functions by
//! their decorators during the same traversal that visits the call sites,
//! so a task decorated lexically after a call that references it is not yet
//! known there. That limitation is preserved, not an accident.

use std::collections::HashSet;

use querylint_core::hir::{ExprId, ExprKind, HirKeyword, HirModule, StmtId, StmtKind};
use querylint_core::oracle::InferenceOracle;
use querylint_core::stubs::{CELERY_APP_QNAME, MODEL_QNAME, QUERYSET_QNAME, SHARED_TASK_QNAME};
use querylint_core::types::{FunctionRef, InferredType};

use crate::findings::{Finding, ReportSink};

const TASK_DECORATOR_NAMES: &[&str] = &["task", "shared_task"];
// From the task library's calling-convention reference
const TASK_DIRECT_CALLS: &[&str] = &["delay", "si", "s", "signature"];
const TASK_ARGS_CALLS: &[&str] = &["apply", "apply_async", "retry"];

/// Shapes a callee expression can take. Anything else is skipped.
enum CalleeShape {
    Attribute { receiver: ExprId, name: String },
    Named { name: String },
    Other,
}

fn callee_shape(module: &HirModule, func: ExprId) -> CalleeShape {
    match &module.expr(func).kind {
        ExprKind::Attribute { value, attr } => CalleeShape::Attribute {
            receiver: *value,
            name: attr.clone(),
        },
        ExprKind::Name { id } => CalleeShape::Named { name: id.clone() },
        _ => CalleeShape::Other,
    }
}

#[derive(Debug, Default)]
pub struct TaskArgsChecker {
    /// Function definitions classified as tasks so far in this file.
    /// Append-only within one traversal; never pre-populated.
    tasks: HashSet<StmtId>,
}

impl TaskArgsChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a function definition by its decorators. The first
    /// decorator with a matching name wins; an inference failure while
    /// classifying aborts the whole function.
    pub fn on_function_definition(
        &mut self,
        module: &HirModule,
        stmt: StmtId,
        oracle: &mut dyn InferenceOracle,
    ) {
        let StmtKind::FunctionDef { decorators, .. } = &module.stmt(stmt).kind else {
            return;
        };
        for &decorator in decorators {
            let name = match &module.expr(decorator).kind {
                ExprKind::Attribute { attr, .. } => attr.as_str(),
                ExprKind::Name { id } => id.as_str(),
                _ => continue,
            };
            if !TASK_DECORATOR_NAMES.contains(&name) {
                continue;
            }
            let candidates = match oracle.resolve_types(decorator) {
                Ok(candidates) => candidates,
                Err(_) => return,
            };
            for candidate in candidates {
                if let Some(receiver) = oracle.is_bound_method(&candidate) {
                    if oracle.subtype_of(&InferredType::Instance(receiver), CELERY_APP_QNAME) {
                        tracing::debug!(?stmt, "registered task (app decorator)");
                        self.tasks.insert(stmt);
                        return;
                    }
                } else if let InferredType::Function(FunctionRef::Library { qname }) = &candidate {
                    if qname == SHARED_TASK_QNAME {
                        tracing::debug!(?stmt, "registered task (shared decorator)");
                        self.tasks.insert(stmt);
                        return;
                    }
                }
            }
        }
    }

    /// Check a call site whose callee may be a task dispatch method.
    pub fn on_call_expression(
        &mut self,
        module: &HirModule,
        call: ExprId,
        oracle: &mut dyn InferenceOracle,
        sink: &mut dyn ReportSink,
    ) {
        let ExprKind::Call {
            func,
            args,
            keywords,
        } = &module.expr(call).kind
        else {
            return;
        };
        let (receiver, name) = match callee_shape(module, *func) {
            CalleeShape::Attribute { receiver, name } => (receiver, name),
            // dispatch methods are attributes; a bare name cannot be one
            CalleeShape::Named { .. } | CalleeShape::Other => return,
        };
        let direct = TASK_DIRECT_CALLS.contains(&name.as_str());
        let args_call = TASK_ARGS_CALLS.contains(&name.as_str());
        if !direct && !args_call {
            return;
        }
        let candidates = match oracle.resolve_types(receiver) {
            Ok(candidates) => candidates,
            Err(_) => return,
        };
        let is_task = candidates.iter().any(|candidate| {
            matches!(candidate, InferredType::Function(FunctionRef::User { def, .. })
                if self.tasks.contains(def))
        });
        if !is_task {
            return;
        }
        let candidate_args: Vec<ExprId> = if direct {
            args.iter()
                .copied()
                .chain(keywords.iter().map(|k| k.value))
                .collect()
        } else {
            extract_args_call(module, args, keywords)
        };
        self.inspect_arguments(module, call, &candidate_args, oracle, sink);
    }

    /// Scanning stops at the first unsafe argument; later unsafe arguments
    /// in the same call are not reported.
    fn inspect_arguments(
        &self,
        module: &HirModule,
        call: ExprId,
        args: &[ExprId],
        oracle: &mut dyn InferenceOracle,
        sink: &mut dyn ReportSink,
    ) {
        let location = module.line_index.location(module.expr(call).span.start);
        for &arg in args {
            let candidates = match oracle.resolve_types(arg) {
                Ok(candidates) => candidates,
                Err(_) => return,
            };
            for candidate in candidates {
                if oracle.subtype_of(&candidate, QUERYSET_QNAME) {
                    sink.report(Finding::task_call_with_queryset(location));
                    return;
                } else if oracle.subtype_of(&candidate, MODEL_QNAME) {
                    sink.report(Finding::task_call_with_model_instance(location));
                    return;
                }
            }
        }
    }
}

/// Argument extraction for `apply`/`apply_async`/`retry`: the task's
/// positional arguments are the first positional argument when it is
/// literally a list/tuple (else a literal `args=` keyword), keyword
/// arguments analogously from the second positional or `kwargs=`. An opaque
/// variable in either position yields nothing; never guess.
fn extract_args_call(
    module: &HirModule,
    args: &[ExprId],
    keywords: &[HirKeyword],
) -> Vec<ExprId> {
    let mut task_args: Vec<ExprId> = Vec::new();
    let mut task_kwargs: Vec<ExprId> = Vec::new();

    if let Some(first) = args.first() {
        if let ExprKind::List { elts } | ExprKind::Tuple { elts } = &module.expr(*first).kind {
            task_args = elts.clone();
        }
    }
    if let Some(second) = args.get(1) {
        if let ExprKind::Dict { values, .. } = &module.expr(*second).kind {
            task_kwargs = values.clone();
        }
    }
    if task_args.is_empty() {
        for keyword in keywords {
            if keyword.arg.as_deref() == Some("args") {
                if let ExprKind::List { elts } | ExprKind::Tuple { elts } =
                    &module.expr(keyword.value).kind
                {
                    task_args = elts.clone();
                    break;
                }
            }
        }
    }
    if task_kwargs.is_empty() {
        for keyword in keywords {
            if keyword.arg.as_deref() == Some("kwargs") {
                if let ExprKind::Dict { values, .. } = &module.expr(keyword.value).kind {
                    task_kwargs = values.clone();
                    break;
                }
            }
        }
    }

    task_args.extend(task_kwargs);
    task_args
}
