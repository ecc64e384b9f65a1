//! Lowering from the upstream Python AST into the lint HIR
//!
//! This is the only module that touches `rustpython_ast` types. Everything
//! downstream works on [`crate::hir`] ids. The lowering also builds the
//! scope/binding tables the reference oracle resolves names against, and
//! records the class-body assignment shapes the transform rules trigger on.

use rustpython_ast::{self as ast, Ranged};
use rustpython_parser::Parse;

use crate::hir::{
    Binding, ClassAttrAssign, ExprId, ExprKind, HirExpr, HirKeyword, HirModule, HirStmt,
    LiteralKind, Param, Scope, ScopeId, ScopeKind, StmtId, StmtKind,
};
use crate::span::{LineIndex, Span};
use crate::CoreError;

/// Parse one Python source file and lower it.
pub fn parse_module(source: &str, module_name: &str) -> Result<HirModule, CoreError> {
    let suite = ast::Suite::parse(source, module_name)
        .map_err(|e| CoreError::Parse(e.to_string()))?;
    let mut bridge = AstBridge::new(module_name, source);
    Ok(bridge.lower(suite))
}

struct AstBridge {
    module: HirModule,
}

impl AstBridge {
    fn new(module_name: &str, source: &str) -> Self {
        Self {
            module: HirModule::new(module_name.to_string(), LineIndex::new(source)),
        }
    }

    fn lower(mut self, suite: Vec<ast::Stmt>) -> HirModule {
        let root = self.module.alloc_scope(Scope::new(None, ScopeKind::Module));
        let body = self.lower_body(suite, root);
        self.module.body = body;
        self.module
    }

    fn lower_body(&mut self, stmts: Vec<ast::Stmt>, scope: ScopeId) -> Vec<StmtId> {
        stmts.into_iter().map(|s| self.lower_stmt(s, scope)).collect()
    }

    /// Reserve the statement slot before lowering children so that nested
    /// scopes can refer back to the definition's id.
    fn reserve_stmt(&mut self, span: Span, scope: ScopeId) -> StmtId {
        self.module.alloc_stmt(HirStmt {
            span,
            scope,
            kind: StmtKind::Pass,
        })
    }

    fn lower_stmt(&mut self, stmt: ast::Stmt, scope: ScopeId) -> StmtId {
        let span = span_of(&stmt);
        let id = self.reserve_stmt(span, scope);
        let kind = match stmt {
            ast::Stmt::FunctionDef(f) => self.lower_function_def(
                id,
                scope,
                f.name.to_string(),
                *f.args,
                f.body,
                f.decorator_list,
            ),
            ast::Stmt::AsyncFunctionDef(f) => self.lower_function_def(
                id,
                scope,
                f.name.to_string(),
                *f.args,
                f.body,
                f.decorator_list,
            ),
            ast::Stmt::ClassDef(c) => {
                let name = c.name.to_string();
                let bases: Vec<ExprId> =
                    c.bases.into_iter().map(|b| self.lower_expr(b, scope)).collect();
                self.module.add_binding(scope, &name, Binding::Class { def: id });
                let inner_scope = self
                    .module
                    .alloc_scope(Scope::new(Some(scope), ScopeKind::Class { def: id }));
                let body = self.lower_body(c.body, inner_scope);
                self.record_class_attr_calls(id, &body);
                StmtKind::ClassDef {
                    name,
                    bases,
                    body,
                    inner_scope,
                }
            }
            ast::Stmt::Assign(a) => {
                let value = self.lower_expr(*a.value, scope);
                let targets: Vec<ExprId> =
                    a.targets.into_iter().map(|t| self.lower_expr(t, scope)).collect();
                for target in &targets {
                    if let ExprKind::Name { id: name } = &self.module.expr(*target).kind {
                        let name = name.clone();
                        self.module.add_binding(scope, &name, Binding::Assign { value });
                    }
                }
                StmtKind::Assign { targets, value }
            }
            ast::Stmt::AugAssign(a) => StmtKind::AugAssign {
                target: self.lower_expr(*a.target, scope),
                value: self.lower_expr(*a.value, scope),
            },
            ast::Stmt::AnnAssign(a) => {
                let annotation = self.lower_expr(*a.annotation, scope);
                let value = a.value.map(|v| self.lower_expr(*v, scope));
                let target = self.lower_expr(*a.target, scope);
                if let ExprKind::Name { id: name } = &self.module.expr(target).kind {
                    let name = name.clone();
                    self.module
                        .add_binding(scope, &name, Binding::AnnAssign { annotation, value });
                }
                StmtKind::AnnAssign {
                    target,
                    annotation,
                    value,
                }
            }
            ast::Stmt::Return(r) => StmtKind::Return {
                value: r.value.map(|v| self.lower_expr(*v, scope)),
            },
            ast::Stmt::Expr(e) => StmtKind::Expr {
                value: self.lower_expr(*e.value, scope),
            },
            ast::Stmt::If(s) => StmtKind::If {
                test: self.lower_expr(*s.test, scope),
                body: self.lower_body(s.body, scope),
                orelse: self.lower_body(s.orelse, scope),
            },
            ast::Stmt::While(s) => StmtKind::While {
                test: self.lower_expr(*s.test, scope),
                body: self.lower_body(s.body, scope),
                orelse: self.lower_body(s.orelse, scope),
            },
            ast::Stmt::For(s) => StmtKind::For {
                target: self.lower_expr(*s.target, scope),
                iter: self.lower_expr(*s.iter, scope),
                body: self.lower_body(s.body, scope),
                orelse: self.lower_body(s.orelse, scope),
            },
            ast::Stmt::AsyncFor(s) => StmtKind::For {
                target: self.lower_expr(*s.target, scope),
                iter: self.lower_expr(*s.iter, scope),
                body: self.lower_body(s.body, scope),
                orelse: self.lower_body(s.orelse, scope),
            },
            ast::Stmt::With(s) => self.lower_with(s.items, s.body, scope),
            ast::Stmt::AsyncWith(s) => self.lower_with(s.items, s.body, scope),
            ast::Stmt::Try(s) => {
                let body = self.lower_body(s.body, scope);
                let handlers = s
                    .handlers
                    .into_iter()
                    .map(|h| {
                        let ast::ExceptHandler::ExceptHandler(h) = h;
                        self.lower_body(h.body, scope)
                    })
                    .collect();
                let orelse = self.lower_body(s.orelse, scope);
                let finalbody = self.lower_body(s.finalbody, scope);
                StmtKind::Try {
                    body,
                    handlers,
                    orelse,
                    finalbody,
                }
            }
            ast::Stmt::Import(s) => {
                for alias in s.names {
                    let dotted = alias.name.to_string();
                    match alias.asname {
                        Some(asname) => {
                            self.module.add_binding(
                                scope,
                                asname.as_str(),
                                Binding::Import { path: dotted },
                            );
                        }
                        None => {
                            // `import a.b` binds only the root package name
                            let root =
                                dotted.split('.').next().unwrap_or(dotted.as_str()).to_string();
                            self.module
                                .add_binding(scope, &root, Binding::Import { path: root.clone() });
                        }
                    }
                }
                StmtKind::Import
            }
            ast::Stmt::ImportFrom(s) => {
                // Relative imports cannot be resolved in single-file analysis
                let level = s.level.map_or(0, |l| l.to_u32());
                if level == 0 {
                    if let Some(module) = s.module {
                        for alias in s.names {
                            if alias.name.as_str() == "*" {
                                continue;
                            }
                            let qname = format!("{}.{}", module.as_str(), alias.name.as_str());
                            let bound = alias
                                .asname
                                .map(|a| a.to_string())
                                .unwrap_or_else(|| alias.name.to_string());
                            self.module
                                .add_binding(scope, &bound, Binding::ImportFrom { qname });
                        }
                    }
                }
                StmtKind::Import
            }
            ast::Stmt::Raise(s) => {
                let mut exprs = Vec::new();
                if let Some(exc) = s.exc {
                    exprs.push(self.lower_expr(*exc, scope));
                }
                if let Some(cause) = s.cause {
                    exprs.push(self.lower_expr(*cause, scope));
                }
                StmtKind::Other { exprs }
            }
            ast::Stmt::Assert(s) => {
                let mut exprs = vec![self.lower_expr(*s.test, scope)];
                if let Some(msg) = s.msg {
                    exprs.push(self.lower_expr(*msg, scope));
                }
                StmtKind::Other { exprs }
            }
            ast::Stmt::Delete(s) => StmtKind::Other {
                exprs: s.targets.into_iter().map(|t| self.lower_expr(t, scope)).collect(),
            },
            ast::Stmt::Pass(_) => StmtKind::Pass,
            _ => StmtKind::Pass,
        };
        self.module.stmt_mut(id).kind = kind;
        id
    }

    fn lower_function_def(
        &mut self,
        id: StmtId,
        scope: ScopeId,
        name: String,
        args: ast::Arguments,
        body: Vec<ast::Stmt>,
        decorator_list: Vec<ast::Expr>,
    ) -> StmtKind {
        let decorators: Vec<ExprId> = decorator_list
            .into_iter()
            .map(|d| self.lower_expr(d, scope))
            .collect();

        // Annotations evaluate in the enclosing scope
        let mut params = Vec::new();
        for arg in args.posonlyargs.into_iter().chain(args.args) {
            let annotation = arg
                .def
                .annotation
                .map(|a| self.lower_expr(*a, scope));
            params.push(Param {
                name: arg.def.arg.to_string(),
                annotation,
            });
        }

        self.module.add_binding(scope, &name, Binding::Function { def: id });

        let method_of = match self.module.scope(scope).kind {
            ScopeKind::Class { def } => Some(def),
            _ => None,
        };
        let inner_scope = self.module.alloc_scope(Scope::new(
            Some(scope),
            ScopeKind::Function {
                def: id,
                method_of,
                first_param: params.first().map(|p| p.name.clone()),
            },
        ));
        for (index, param) in params.iter().enumerate() {
            self.module.add_binding(
                inner_scope,
                &param.name,
                Binding::Param {
                    index,
                    annotation: param.annotation,
                },
            );
        }
        let body = self.lower_body(body, inner_scope);
        StmtKind::FunctionDef {
            name,
            decorators,
            params,
            body,
            inner_scope,
        }
    }

    fn lower_with(
        &mut self,
        items: Vec<ast::WithItem>,
        body: Vec<ast::Stmt>,
        scope: ScopeId,
    ) -> StmtKind {
        let items = items
            .into_iter()
            .map(|item| {
                let ctx = self.lower_expr(item.context_expr, scope);
                let vars = item.optional_vars.map(|v| self.lower_expr(*v, scope));
                (ctx, vars)
            })
            .collect();
        StmtKind::With {
            items,
            body: self.lower_body(body, scope),
        }
    }

    /// Record `attr = SomeCall(...)` assignments directly in a class body.
    /// Multiple-assignment targets are deliberately not handled.
    fn record_class_attr_calls(&mut self, class_def: StmtId, body: &[StmtId]) {
        let mut found = Vec::new();
        for &stmt in body {
            if let StmtKind::Assign { targets, value } = &self.module.stmt(stmt).kind {
                if targets.len() != 1 {
                    continue;
                }
                let is_call = matches!(self.module.expr(*value).kind, ExprKind::Call { .. });
                if !is_call {
                    continue;
                }
                if let ExprKind::Name { id: attr } = &self.module.expr(targets[0]).kind {
                    found.push((*value, attr.clone()));
                }
            }
        }
        for (value, attr) in found {
            self.module
                .class_attr_calls
                .insert(value, ClassAttrAssign { class_def, attr });
        }
    }

    fn lower_expr(&mut self, expr: ast::Expr, scope: ScopeId) -> ExprId {
        let span = span_of(&expr);
        let kind = match expr {
            ast::Expr::Name(n) => ExprKind::Name { id: n.id.to_string() },
            ast::Expr::Attribute(a) => ExprKind::Attribute {
                value: self.lower_expr(*a.value, scope),
                attr: a.attr.to_string(),
            },
            ast::Expr::Call(c) => {
                let func = self.lower_expr(*c.func, scope);
                let args = c.args.into_iter().map(|a| self.lower_expr(a, scope)).collect();
                let keywords = c
                    .keywords
                    .into_iter()
                    .map(|k| HirKeyword {
                        arg: k.arg.map(|a| a.to_string()),
                        value: self.lower_expr(k.value, scope),
                    })
                    .collect();
                ExprKind::Call {
                    func,
                    args,
                    keywords,
                }
            }
            ast::Expr::Constant(c) => match c.value {
                // An all-constant tuple parses as a constant; keep the tuple
                // shape so argument extraction sees it as a literal sequence.
                ast::Constant::Tuple(_) => ExprKind::Tuple { elts: vec![] },
                value => ExprKind::Literal {
                    kind: literal_kind(&value),
                },
            },
            ast::Expr::List(l) => ExprKind::List {
                elts: l.elts.into_iter().map(|e| self.lower_expr(e, scope)).collect(),
            },
            ast::Expr::Tuple(t) => ExprKind::Tuple {
                elts: t.elts.into_iter().map(|e| self.lower_expr(e, scope)).collect(),
            },
            ast::Expr::Dict(d) => {
                let keys = d
                    .keys
                    .into_iter()
                    .map(|k| k.map(|k| self.lower_expr(k, scope)))
                    .collect();
                let values = d
                    .values
                    .into_iter()
                    .map(|v| self.lower_expr(v, scope))
                    .collect();
                ExprKind::Dict { keys, values }
            }
            ast::Expr::BinOp(b) => ExprKind::BinOp {
                left: self.lower_expr(*b.left, scope),
                op: match b.op {
                    ast::Operator::BitAnd => crate::hir::BinOpKind::BitAnd,
                    ast::Operator::BitOr => crate::hir::BinOpKind::BitOr,
                    _ => crate::hir::BinOpKind::Other,
                },
                right: self.lower_expr(*b.right, scope),
            },
            ast::Expr::BoolOp(b) => ExprKind::BoolOp {
                values: b.values.into_iter().map(|v| self.lower_expr(v, scope)).collect(),
            },
            ast::Expr::Subscript(s) => ExprKind::Subscript {
                value: self.lower_expr(*s.value, scope),
                index: self.lower_expr(*s.slice, scope),
            },
            ast::Expr::Starred(s) => ExprKind::Opaque {
                children: vec![self.lower_expr(*s.value, scope)],
            },
            ast::Expr::Await(a) => ExprKind::Opaque {
                children: vec![self.lower_expr(*a.value, scope)],
            },
            ast::Expr::UnaryOp(u) => ExprKind::Opaque {
                children: vec![self.lower_expr(*u.operand, scope)],
            },
            ast::Expr::Compare(c) => {
                let mut children = vec![self.lower_expr(*c.left, scope)];
                children.extend(c.comparators.into_iter().map(|e| self.lower_expr(e, scope)));
                ExprKind::Opaque { children }
            }
            ast::Expr::IfExp(e) => ExprKind::Opaque {
                children: vec![
                    self.lower_expr(*e.test, scope),
                    self.lower_expr(*e.body, scope),
                    self.lower_expr(*e.orelse, scope),
                ],
            },
            ast::Expr::NamedExpr(e) => ExprKind::Opaque {
                children: vec![self.lower_expr(*e.value, scope)],
            },
            ast::Expr::JoinedStr(j) => ExprKind::Opaque {
                children: j.values.into_iter().map(|v| self.lower_expr(v, scope)).collect(),
            },
            ast::Expr::FormattedValue(f) => ExprKind::Opaque {
                children: vec![self.lower_expr(*f.value, scope)],
            },
            ast::Expr::Set(s) => ExprKind::Opaque {
                children: s.elts.into_iter().map(|e| self.lower_expr(e, scope)).collect(),
            },
            // Comprehensions and lambdas introduce their own scopes; their
            // bodies are not analyzed.
            _ => ExprKind::Opaque { children: vec![] },
        };
        self.module.alloc_expr(HirExpr { span, scope, kind })
    }
}

fn span_of(node: &impl Ranged) -> Span {
    let range = node.range();
    Span::new(u32::from(range.start()), u32::from(range.end()))
}

fn literal_kind(value: &ast::Constant) -> LiteralKind {
    match value {
        ast::Constant::None => LiteralKind::None,
        ast::Constant::Bool(_) => LiteralKind::Bool,
        ast::Constant::Str(_) => LiteralKind::Str,
        ast::Constant::Bytes(_) => LiteralKind::Bytes,
        ast::Constant::Int(_) => LiteralKind::Int,
        ast::Constant::Float(_) | ast::Constant::Complex { .. } => LiteralKind::Float,
        ast::Constant::Ellipsis | ast::Constant::Tuple(_) => LiteralKind::Ellipsis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::{ExprKind, StmtKind};

    fn lower(source: &str) -> HirModule {
        parse_module(source, "m").unwrap()
    }

    #[test]
    fn test_lower_simple_assign() {
        let module = lower("x = 1\n");
        assert_eq!(module.body.len(), 1);
        let stmt = module.stmt(module.body[0]);
        assert!(matches!(stmt.kind, StmtKind::Assign { .. }));
        let root = stmt.scope;
        let bindings = &module.scope(root).bindings;
        assert!(bindings.contains_key("x"));
    }

    #[test]
    fn test_lower_class_attr_call_recorded() {
        let module = lower("class A:\n    objects = Manager()\n");
        assert_eq!(module.class_attr_calls.len(), 1);
        let assign = module.class_attr_calls.values().next().unwrap();
        assert_eq!(assign.attr, "objects");
    }

    #[test]
    fn test_lower_class_attr_multi_target_skipped() {
        let module = lower("class A:\n    a = b = Manager()\n");
        assert!(module.class_attr_calls.is_empty());
    }

    #[test]
    fn test_import_bindings() {
        let module = lower("import celery\nfrom celery import Celery as C\n");
        let root = module.stmt(module.body[0]).scope;
        let bindings = &module.scope(root).bindings;
        assert!(bindings.contains_key("celery"));
        assert!(bindings.contains_key("C"));
    }

    #[test]
    fn test_method_scope_tracks_class() {
        let module = lower("class A:\n    def m(self):\n        pass\n");
        let class_stmt = module.body[0];
        let StmtKind::ClassDef { body, .. } = &module.stmt(class_stmt).kind else {
            panic!("expected class");
        };
        let StmtKind::FunctionDef { inner_scope, .. } = &module.stmt(body[0]).kind else {
            panic!("expected method");
        };
        match &module.scope(*inner_scope).kind {
            crate::hir::ScopeKind::Function {
                method_of,
                first_param,
                ..
            } => {
                assert_eq!(*method_of, Some(class_stmt));
                assert_eq!(first_param.as_deref(), Some("self"));
            }
            other => panic!("unexpected scope kind: {other:?}"),
        }
    }

    #[test]
    fn test_opaque_children_still_reachable() {
        let module = lower("assert foo(1) == bar(2)\n");
        let calls = module
            .expr_ids()
            .filter(|id| matches!(module.expr(*id).kind, ExprKind::Call { .. }))
            .count();
        assert_eq!(calls, 2);
    }
}
