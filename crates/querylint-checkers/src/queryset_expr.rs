//! Unassigned-builder-expression checker
//!
//! A queryset chain evaluated as a bare statement does nothing: builders are
//! inert until consumed, so the computed query is silently thrown away.
//! This checker flags any expression statement wrapping a call whose
//! inferred type is a queryset. Stateless beyond the oracle.

use querylint_core::hir::{ExprKind, HirModule, StmtId, StmtKind};
use querylint_core::oracle::InferenceOracle;
use querylint_core::stubs::QUERYSET_QNAME;

use crate::findings::{Finding, ReportSink};

#[derive(Debug, Default)]
pub struct QuerysetExprChecker;

impl QuerysetExprChecker {
    pub fn new() -> Self {
        Self
    }

    /// At most one finding per statement; only the first matching candidate
    /// is considered, and an inference failure is not a defect.
    pub fn on_expression_statement(
        &self,
        module: &HirModule,
        stmt: StmtId,
        oracle: &mut dyn InferenceOracle,
        sink: &mut dyn ReportSink,
    ) {
        let StmtKind::Expr { value } = &module.stmt(stmt).kind else {
            return;
        };
        if !matches!(module.expr(*value).kind, ExprKind::Call { .. }) {
            return;
        }
        let candidates = match oracle.resolve_types(*value) {
            Ok(candidates) => candidates,
            Err(_) => return,
        };
        for candidate in candidates {
            if oracle.subtype_of(&candidate, QUERYSET_QNAME) {
                let location = module.line_index.location(module.stmt(stmt).span.start);
                sink.report(Finding::unassigned_query_expr(location));
                return;
            }
        }
    }
}
