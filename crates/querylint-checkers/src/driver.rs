//! Per-file driver
//!
//! One strictly pre-order traversal per file. At each expression statement,
//! function definition, and call expression the checkers are invoked with
//! the shared oracle; findings come back in source order. The traversal
//! order is load-bearing: task classification happens in the same pass as
//! call checking, which is what produces the decorator-order limitation.

use thiserror::Error;

use querylint_core::context::AnalysisContext;
use querylint_core::hir::{ExprId, ExprKind, HirModule, StmtId, StmtKind};
use querylint_core::resolver::Resolver;
use querylint_core::{parse_module, CoreError};

use crate::findings::Finding;
use crate::queryset_expr::QuerysetExprChecker;
use crate::task_args::TaskArgsChecker;

#[derive(Debug, Error)]
pub enum LintError {
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Lints one file at a time against a shared analysis context.
pub struct FileLinter<'ctx> {
    ctx: &'ctx mut AnalysisContext,
}

impl<'ctx> FileLinter<'ctx> {
    pub fn new(ctx: &'ctx mut AnalysisContext) -> Self {
        Self { ctx }
    }

    pub fn lint_source(
        &mut self,
        source: &str,
        module_name: &str,
    ) -> Result<Vec<Finding>, LintError> {
        let module = parse_module(source, module_name)?;
        tracing::debug!(module = module_name, "linting");
        let mut resolver = Resolver::new(self.ctx, &module);
        let mut walker = Walker {
            module: &module,
            queryset: QuerysetExprChecker::new(),
            tasks: TaskArgsChecker::new(),
            findings: Vec::new(),
        };
        let body = module.body.clone();
        walker.walk_stmts(&body, &mut resolver);
        Ok(walker.findings)
    }
}

struct Walker<'m> {
    module: &'m HirModule,
    queryset: QuerysetExprChecker,
    tasks: TaskArgsChecker,
    findings: Vec<Finding>,
}

impl Walker<'_> {
    fn walk_stmts(&mut self, stmts: &[StmtId], resolver: &mut Resolver) {
        for &stmt in stmts {
            self.walk_stmt(stmt, resolver);
        }
    }

    fn walk_stmt(&mut self, stmt: StmtId, resolver: &mut Resolver) {
        let module = self.module;
        match &module.stmt(stmt).kind {
            StmtKind::Expr { value } => {
                self.queryset
                    .on_expression_statement(module, stmt, resolver, &mut self.findings);
                self.walk_expr(*value, resolver);
            }
            StmtKind::FunctionDef {
                decorators, body, ..
            } => {
                self.tasks.on_function_definition(module, stmt, resolver);
                for &decorator in decorators {
                    self.walk_expr(decorator, resolver);
                }
                self.walk_stmts(body, resolver);
            }
            StmtKind::ClassDef { bases, body, .. } => {
                for &base in bases {
                    self.walk_expr(base, resolver);
                }
                self.walk_stmts(body, resolver);
            }
            StmtKind::Assign { targets, value } => {
                self.walk_expr(*value, resolver);
                for &target in targets {
                    self.walk_expr(target, resolver);
                }
            }
            StmtKind::AugAssign { target, value } => {
                self.walk_expr(*value, resolver);
                self.walk_expr(*target, resolver);
            }
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                if let Some(value) = value {
                    self.walk_expr(*value, resolver);
                }
                self.walk_expr(*annotation, resolver);
                self.walk_expr(*target, resolver);
            }
            StmtKind::Return { value } => {
                if let Some(value) = value {
                    self.walk_expr(*value, resolver);
                }
            }
            StmtKind::If { test, body, orelse }
            | StmtKind::While { test, body, orelse } => {
                self.walk_expr(*test, resolver);
                self.walk_stmts(body, resolver);
                self.walk_stmts(orelse, resolver);
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.walk_expr(*iter, resolver);
                self.walk_expr(*target, resolver);
                self.walk_stmts(body, resolver);
                self.walk_stmts(orelse, resolver);
            }
            StmtKind::With { items, body } => {
                for (ctx_expr, vars) in items {
                    self.walk_expr(*ctx_expr, resolver);
                    if let Some(vars) = vars {
                        self.walk_expr(*vars, resolver);
                    }
                }
                self.walk_stmts(body, resolver);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.walk_stmts(body, resolver);
                for handler in handlers {
                    self.walk_stmts(handler, resolver);
                }
                self.walk_stmts(orelse, resolver);
                self.walk_stmts(finalbody, resolver);
            }
            StmtKind::Other { exprs } => {
                for &expr in exprs {
                    self.walk_expr(expr, resolver);
                }
            }
            StmtKind::Import | StmtKind::Pass => {}
        }
    }

    fn walk_expr(&mut self, expr: ExprId, resolver: &mut Resolver) {
        let module = self.module;
        match &module.expr(expr).kind {
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                self.tasks
                    .on_call_expression(module, expr, resolver, &mut self.findings);
                self.walk_expr(*func, resolver);
                for &arg in args {
                    self.walk_expr(arg, resolver);
                }
                for keyword in keywords {
                    self.walk_expr(keyword.value, resolver);
                }
            }
            ExprKind::Attribute { value, .. } => self.walk_expr(*value, resolver),
            ExprKind::List { elts } | ExprKind::Tuple { elts } => {
                for &elt in elts {
                    self.walk_expr(elt, resolver);
                }
            }
            ExprKind::Dict { keys, values } => {
                for key in keys.iter().flatten() {
                    self.walk_expr(*key, resolver);
                }
                for &value in values {
                    self.walk_expr(value, resolver);
                }
            }
            ExprKind::BinOp { left, right, .. } => {
                self.walk_expr(*left, resolver);
                self.walk_expr(*right, resolver);
            }
            ExprKind::BoolOp { values } => {
                for &value in values {
                    self.walk_expr(value, resolver);
                }
            }
            ExprKind::Subscript { value, index } => {
                self.walk_expr(*value, resolver);
                self.walk_expr(*index, resolver);
            }
            ExprKind::Opaque { children } => {
                for &child in children {
                    self.walk_expr(child, resolver);
                }
            }
            ExprKind::Name { .. } | ExprKind::Literal { .. } => {}
        }
    }
}
